//! Fixed-cadence tick: advance the angle, transform, hand off to the renderer

use std::{
    f32::consts::TAU,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use shared::{ScreenCoord, ANGLE_STEP, DEFAULT_FOCAL};
use tracing::{debug, error, warn};

use crate::{render::FrameSink, transformer::FrameTransformer};

/// Target tick period (~60 Hz).
pub const FRAME_PERIOD: Duration = Duration::from_millis(16);

/// Advance `angle` by `step` and wrap into [0, 2π).
#[inline]
pub fn advance_angle(angle: f32, step: f32) -> f32 {
    let wrapped = (angle + step).rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Mutable state carried from tick to tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RunState {
    /// Current rotation in radians, always in [0, 2π).
    pub angle: f32,
    /// Cleared for good after the first accelerator failure.
    pub accelerator_available: bool,
}

/// Which path produced a tick's coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComputePath {
    Accelerator,
    Fallback,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub angle: f32,
    pub path: ComputePath,
}

/// Drives one transform per tick and delivers the result to a [`FrameSink`].
///
/// `tick` takes `&mut self`, so ticks are serialized and the output buffer is
/// never read while a transform is writing it.
pub struct FrameLoop {
    transformer: FrameTransformer,
    state: RunState,
    focal: f32,
    coords: Vec<ScreenCoord>,
    frame: u64,
}

impl FrameLoop {
    pub fn new(transformer: FrameTransformer) -> Self {
        let state = RunState {
            angle: 0.0,
            accelerator_available: transformer.has_accelerator(),
        };
        Self {
            coords: vec![ScreenCoord::default(); transformer.num_points()],
            transformer,
            state,
            focal: DEFAULT_FOCAL,
            frame: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Coordinates from the last completed tick.
    pub fn coords(&self) -> &[ScreenCoord] {
        &self.coords
    }

    pub fn transformer(&self) -> &FrameTransformer {
        &self.transformer
    }

    /// Advance, recompute every coordinate, then present them.
    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> TickReport {
        self.state.angle = advance_angle(self.state.angle, ANGLE_STEP);
        let path = self.compute();
        self.frame += 1;

        sink.present(&self.coords);

        debug!(
            "Frame {}: angle {:.3} via {path:?}",
            self.frame, self.state.angle
        );
        TickReport {
            frame: self.frame,
            angle: self.state.angle,
            path,
        }
    }

    fn compute(&mut self) -> ComputePath {
        let angle = self.state.angle;

        if self.state.accelerator_available {
            match self
                .transformer
                .transform_accelerated(angle, self.focal, &mut self.coords)
            {
                Ok(()) => return ComputePath::Accelerator,
                Err(e) => {
                    warn!(
                        "Accelerator failed on frame {}, using the host from now on: {e}",
                        self.frame + 1
                    );
                    self.state.accelerator_available = false;
                    self.transformer.disable_accelerator();
                }
            }
        }

        if let Err(e) = self
            .transformer
            .transform_fallback(angle, self.focal, &mut self.coords)
        {
            // Only reachable if the buffer and cloud disagree in length.
            error!("Host transform failed: {e}");
        }
        ComputePath::Fallback
    }
}

/// Calls [`FrameLoop::tick`] at a fixed period until stopped.
pub struct FrameScheduler {
    period: Duration,
    max_frames: Option<u64>,
}

impl FrameScheduler {
    pub fn new(period: Duration, max_frames: Option<u64>) -> Self {
        Self { period, max_frames }
    }

    /// Run ticks until `stop` is set or `max_frames` ticks have run.
    ///
    /// A tick that overruns its slot pushes the schedule back rather than
    /// triggering catch-up ticks. Returns the number of ticks run.
    pub fn run(
        &self,
        frame_loop: &mut FrameLoop,
        sink: &mut dyn FrameSink,
        stop: &AtomicBool,
    ) -> u64 {
        let mut ticks = 0;
        let mut next = Instant::now();

        while !stop.load(Ordering::Relaxed) && self.max_frames.map_or(true, |max| ticks < max) {
            frame_loop.tick(sink);
            ticks += 1;

            next += self.period;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                next = now;
            }
        }
        ticks
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(FRAME_PERIOD, None)
    }
}
