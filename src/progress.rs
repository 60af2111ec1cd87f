//! Progress reporting and cooperative cancellation
//!
//! The analysis reports its fractional completion before every frame. A sink
//! that answers `false` stops the run before that frame is analyzed; it
//! then returns [`PitchError::Cancelled`](crate::PitchError::Cancelled) and
//! no contour.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiver of progress reports
pub trait Progress {
    /// Report completion `fraction` in `[0, 1]` with a status message.
    /// Return `false` to request cancellation.
    fn update(&mut self, fraction: f64, message: &str) -> bool;
}

impl<F> Progress for F
where
    F: FnMut(f64, &str) -> bool,
{
    fn update(&mut self, fraction: f64, message: &str) -> bool {
        self(fraction, message)
    }
}

/// Sink that ignores reports and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _fraction: f64, _message: &str) -> bool {
        true
    }
}

/// Shared cancellation flag
///
/// Clones share one flag, so another thread can cancel a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Progress for CancelFlag {
    fn update(&mut self, _fraction: f64, _message: &str) -> bool {
        !self.is_cancelled()
    }
}
