//! Per-frame transform over the point cloud, on the accelerator or the host

use std::sync::Arc;

use shared::{Point3D, ScreenCoord};
use tracing::{info, warn};

use crate::{
    error::{CrateResult, SphereError},
    BackendInfo, CpuRunner, TransformRunner,
};

/// Owns the read-only point cloud and both ways of transforming it.
///
/// The accelerator is optional. When present, [`FrameTransformer::transform_accelerated`]
/// may fail for a single call; the host path never depends on it.
pub struct FrameTransformer {
    points: Arc<[Point3D]>,
    accelerator: Option<Box<dyn TransformRunner>>,
    fallback: CpuRunner,
}

impl FrameTransformer {
    /// Host-only transformer.
    pub fn new(points: Arc<[Point3D]>) -> Self {
        Self {
            fallback: CpuRunner::new(points.clone()),
            points,
            accelerator: None,
        }
    }

    /// Transformer with an already-built accelerator runner for the same cloud.
    pub fn with_accelerator(
        points: Arc<[Point3D]>,
        accelerator: Box<dyn TransformRunner>,
    ) -> CrateResult<Self> {
        if accelerator.num_points() != points.len() {
            return Err(SphereError::InvalidArgument(format!(
                "accelerator built for {} points, cloud has {}",
                accelerator.num_points(),
                points.len()
            )));
        }
        let mut transformer = Self::new(points);
        transformer.accelerator = Some(accelerator);
        Ok(transformer)
    }

    /// Try to bring up the wgpu accelerator; fall back to host-only on any
    /// initialization failure.
    #[cfg(feature = "wgpu")]
    pub fn initialize(points: Arc<[Point3D]>, options: &crate::AcceleratorOptions) -> Self {
        match crate::WgpuRunner::new(&points, options) {
            Ok(runner) => {
                info!("Using accelerator: {}", runner.backend_info());
                Self {
                    fallback: CpuRunner::new(points.clone()),
                    points,
                    accelerator: Some(Box::new(runner)),
                }
            }
            Err(e) => {
                warn!("Accelerator unavailable, running on the host: {e}");
                Self::new(points)
            }
        }
    }

    /// Without the `wgpu` feature there is never an accelerator.
    #[cfg(not(feature = "wgpu"))]
    pub fn initialize(points: Arc<[Point3D]>) -> Self {
        warn!("Built without accelerator support, running on the host");
        Self::new(points)
    }

    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn has_accelerator(&self) -> bool {
        self.accelerator.is_some()
    }

    pub fn accelerator_info(&self) -> Option<BackendInfo> {
        self.accelerator.as_ref().map(|a| a.backend_info())
    }

    pub fn fallback_info(&self) -> BackendInfo {
        self.fallback.backend_info()
    }

    /// Drop the accelerator and its device resources for the rest of the run.
    pub fn disable_accelerator(&mut self) {
        if let Some(accelerator) = self.accelerator.take() {
            info!("Accelerator disabled: {}", accelerator.backend_info());
        }
    }

    /// Run the kernel on the accelerator. Fails with a dispatch error when
    /// there is no accelerator or the device reports a problem.
    pub fn transform_accelerated(
        &mut self,
        angle: f32,
        focal: f32,
        out: &mut [ScreenCoord],
    ) -> CrateResult<()> {
        match self.accelerator.as_mut() {
            Some(accelerator) => accelerator.transform_into(angle, focal, out),
            None => Err(SphereError::Dispatch("no accelerator available".into())),
        }
    }

    /// Run the same transform on the host.
    pub fn transform_fallback(
        &mut self,
        angle: f32,
        focal: f32,
        out: &mut [ScreenCoord],
    ) -> CrateResult<()> {
        self.fallback.transform_into(angle, focal, out)
    }

    /// One coordinate per input point, from the accelerator when present.
    ///
    /// Accelerator failures are returned, not retried on the host; deciding
    /// what to do about them is the frame loop's job.
    pub fn transform(&mut self, angle: f32, focal: f32) -> CrateResult<Vec<ScreenCoord>> {
        let mut out = vec![ScreenCoord::default(); self.points.len()];
        if self.has_accelerator() {
            self.transform_accelerated(angle, focal, &mut out)?;
        } else {
            self.transform_fallback(angle, focal, &mut out)?;
        }
        Ok(out)
    }
}
