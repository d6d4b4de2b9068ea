//! CPU execution of the transform kernel

use std::sync::Arc;

use kernel::rotate_project;
use rayon::prelude::*;
use shared::{Point3D, ScreenCoord, ThreadId, TransformParams};

use crate::{check_output_len, error::CrateResult, BackendInfo, TransformRunner};

/// Points per rayon task; small clouds stay on one thread.
const CHUNK_SIZE: usize = 4096;

/// CPU-based runner using the native Rust kernel
pub struct CpuRunner {
    points: Arc<[Point3D]>,
}

impl CpuRunner {
    pub fn new(points: Arc<[Point3D]>) -> Self {
        Self { points }
    }
}

impl TransformRunner for CpuRunner {
    fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            runner: "cpu",
            api: Some("Native"),
            adapter: None,
            driver: None,
        }
    }

    fn num_points(&self) -> usize {
        self.points.len()
    }

    fn transform_into(
        &mut self,
        angle: f32,
        focal: f32,
        out: &mut [ScreenCoord],
    ) -> CrateResult<()> {
        check_output_len(self.points.len(), out)?;
        let params = TransformParams::new(angle, focal, self.points.len() as u32);

        // Each chunk simulates the invocations for its own index range.
        out.par_chunks_mut(CHUNK_SIZE)
            .zip(self.points.par_chunks(CHUNK_SIZE))
            .for_each(|(out_chunk, in_chunk)| {
                let chunk_params = TransformParams::new(
                    params.angle,
                    params.focal,
                    in_chunk.len() as u32,
                );
                for thread_idx in 0..in_chunk.len() as u32 {
                    rotate_project(
                        ThreadId::new(thread_idx),
                        in_chunk,
                        out_chunk,
                        &chunk_params,
                    );
                }
            });
        Ok(())
    }
}
