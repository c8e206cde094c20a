use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::foundation::error::{AvatarError, AvatarResult};

/// Phase advance per step of the oscillator.
pub const SIM_PHASE_STEP: f64 = 0.1;
/// Time between oscillator steps.
pub const SIM_PERIOD: Duration = Duration::from_millis(50);

/// Level the oscillator reports at phase `t`: `(sin(t) + 1) / 2`.
pub fn simulated_level(t: f64) -> f32 {
    ((t.sin() + 1.0) / 2.0) as f32
}

/// Background oscillator standing in for a microphone.
///
/// Calls the callback every [`SIM_PERIOD`] with the next level until stopped or dropped.
#[derive(Debug)]
pub struct SimulatedSource {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    /// Spawn the oscillator thread.
    pub fn start<F>(callback: F) -> AvatarResult<Self>
    where
        F: Fn(f32) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("avatarcast-audio-sim".to_string())
            .spawn(move || {
                let mut t = 0.0f64;
                while !flag.load(Ordering::Acquire) {
                    t += SIM_PHASE_STEP;
                    callback(simulated_level(t));
                    thread::sleep(SIM_PERIOD);
                }
            })
            .map_err(|e| AvatarError::render(format!("failed to spawn audio thread: {e}")))?;
        debug!("simulated audio source started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the oscillator and wait for its thread.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("simulated audio thread panicked");
        }
    }

    /// Whether the oscillator thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/simulated.rs"]
mod tests;
