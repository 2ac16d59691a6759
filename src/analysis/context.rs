//! Per-run engine context
//!
//! Owns everything a single analysis run needs beyond its inputs: spectral
//! scratch space, the cancel token, the progress callback and the clock that
//! schedules suspension points. The context is created when a run starts and
//! dropped when it ends, on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::AnalysisError;
use crate::features::spectral::stft::StftScratch;

/// Default interval between yields to the host
pub const DEFAULT_TIME_SLICE: Duration = Duration::from_millis(100);

/// Progress callback: `(phase_name, fraction in [0, 1])`
pub type ProgressCallback = Box<dyn FnMut(&str, f32) + Send>;

/// Hook invoked at a suspension point once a time slice has elapsed
pub type YieldHook = Box<dyn FnMut() + Send>;

/// Suspension point used inside long loops
///
/// Components call `checkpoint` once per unit of work (frame, onset, bin).
/// An implementation may yield to the host and must report cancellation.
pub trait Suspend {
    /// Check for cancellation and yield if the time slice is used up
    fn checkpoint(&mut self) -> Result<(), AnalysisError>;
}

/// Suspension point that never yields and never cancels
///
/// Used when a component is called directly as a pure function.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSuspend;

impl Suspend for NoSuspend {
    fn checkpoint(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// Cooperative cancellation flag shared between the caller and a run
///
/// # Example
///
/// ```
/// use stratum_studio::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scheduling state of one run: cancellation, progress and time slicing
pub struct RunControl {
    cancel: Option<CancelToken>,
    progress: Option<ProgressCallback>,
    yield_hook: Option<YieldHook>,
    time_slice: Duration,
    last_yield: Instant,
    suspensions: u64,
}

impl RunControl {
    /// Create run control with the default 100 ms time slice
    pub fn new(cancel: Option<CancelToken>, progress: Option<ProgressCallback>) -> Self {
        Self {
            cancel,
            progress,
            yield_hook: None,
            time_slice: DEFAULT_TIME_SLICE,
            last_yield: Instant::now(),
            suspensions: 0,
        }
    }

    /// Replace the action taken when a time slice elapses
    ///
    /// Without a hook the run yields the current thread.
    pub fn with_yield_hook(mut self, hook: YieldHook) -> Self {
        self.yield_hook = Some(hook);
        self
    }

    /// Override the time slice
    pub fn with_time_slice(mut self, slice: Duration) -> Self {
        self.time_slice = slice;
        self
    }

    /// Number of times the run yielded to the host
    pub fn suspensions(&self) -> u64 {
        self.suspensions
    }

    /// True if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Report progress for a phase and pass a suspension point
    pub fn report(&mut self, phase: &str, fraction: f32) -> Result<(), AnalysisError> {
        self.checkpoint()?;
        let fraction = fraction.clamp(0.0, 1.0);
        log::debug!("Progress: {} {:.0}%", phase, fraction * 100.0);
        if let Some(callback) = self.progress.as_mut() {
            callback(phase, fraction);
        }
        Ok(())
    }
}

impl Suspend for RunControl {
    fn checkpoint(&mut self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        if self.last_yield.elapsed() >= self.time_slice {
            match self.yield_hook.as_mut() {
                Some(hook) => hook(),
                None => std::thread::yield_now(),
            }
            self.suspensions += 1;
            self.last_yield = Instant::now();
            if self.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
        }
        Ok(())
    }
}

/// Engine context owned by the orchestrator for the duration of one run
pub struct EngineContext {
    scratch: StftScratch,
    control: RunControl,
}

impl EngineContext {
    /// Acquire a context for a new run
    pub fn new(control: RunControl) -> Self {
        Self {
            scratch: StftScratch::new(),
            control,
        }
    }

    /// Run control only
    pub fn control(&mut self) -> &mut RunControl {
        &mut self.control
    }

    /// Borrow scratch space and run control together
    pub fn split(&mut self) -> (&mut StftScratch, &mut RunControl) {
        (&mut self.scratch, &mut self.control)
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        log::debug!(
            "Releasing engine context ({} suspension(s))",
            self.control.suspensions
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_checkpoint_reports_cancellation() {
        let token = CancelToken::new();
        let mut control = RunControl::new(Some(token.clone()), None);
        assert!(control.checkpoint().is_ok());
        token.cancel();
        assert_eq!(control.checkpoint(), Err(AnalysisError::Cancelled));
    }

    #[test]
    fn test_yield_hook_runs_after_time_slice() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let mut control = RunControl::new(None, None)
            .with_time_slice(Duration::from_millis(0))
            .with_yield_hook(Box::new(move || {
                if let Ok(mut n) = counter.lock() {
                    *n += 1;
                }
            }));

        control.checkpoint().unwrap();
        control.checkpoint().unwrap();
        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(control.suspensions(), 2);
    }

    #[test]
    fn test_report_clamps_and_forwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut control = RunControl::new(
            None,
            Some(Box::new(move |phase: &str, fraction: f32| {
                if let Ok(mut v) = sink.lock() {
                    v.push((phase.to_string(), fraction));
                }
            })),
        );
        control.report("rhythm", 1.5).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("rhythm".to_string(), 1.0)]);
    }

    #[test]
    fn test_no_suspend_never_fails() {
        let mut s = NoSuspend;
        for _ in 0..10 {
            assert!(s.checkpoint().is_ok());
        }
    }
}
