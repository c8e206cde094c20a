use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{debug, info, warn};

use crate::audio::level::{BlockMeter, CAPTURE_BLOCK, downmix_mono};
use crate::foundation::error::{AvatarError, AvatarResult};

const OPEN_TIMEOUT: Duration = Duration::from_secs(5);
const RECV_POLL: Duration = Duration::from_millis(100);

/// Names of the host's input devices.
pub fn input_device_names() -> AvatarResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("list input devices")?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Microphone capture reporting one level per [`CAPTURE_BLOCK`] mono samples.
///
/// The stream lives on its own thread; the callback receives [`rms_level`] values
/// (`min(1, rms * 10)`) and is never called after [`MicSource::stop`] returns.
///
/// [`rms_level`]: crate::rms_level
#[derive(Debug)]
pub struct MicSource {
    device: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MicSource {
    /// Open `device` (the host default when `None`) and start capturing.
    ///
    /// Fails when the device does not exist or its stream cannot be started.
    pub fn start<F>(device: Option<&str>, callback: F) -> AvatarResult<Self>
    where
        F: Fn(f32) + Send + 'static,
    {
        let wanted = device.map(str::to_owned);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String, String>>();

        let handle = thread::Builder::new()
            .name("avatarcast-mic".to_string())
            .spawn(move || {
                let (samples_tx, samples_rx) = mpsc::channel::<Vec<f32>>();
                let (stream, name) = match open_stream(wanted.as_deref(), samples_tx) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{e:#}")));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(name));

                let mut meter = BlockMeter::new(CAPTURE_BLOCK);
                while !flag.load(Ordering::Acquire) {
                    match samples_rx.recv_timeout(RECV_POLL) {
                        Ok(samples) => meter.push(&samples, &callback),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                drop(stream);
            })
            .map_err(|e| AvatarError::render(format!("failed to spawn mic thread: {e}")))?;

        let opened = ready_rx
            .recv_timeout(OPEN_TIMEOUT)
            .map_err(|_| anyhow!("input device did not open in time"));
        match opened {
            Ok(Ok(name)) => {
                info!(device = %name, "microphone capture started");
                Ok(Self {
                    device: name,
                    stop,
                    handle: Some(handle),
                })
            }
            Ok(Err(msg)) => {
                let _ = handle.join();
                Err(AvatarError::asset(msg))
            }
            Err(e) => {
                stop.store(true, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Name of the device being captured.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Stop capturing and close the stream.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("mic thread panicked");
            }
            debug!(device = %self.device, "microphone capture stopped");
        }
    }

    /// Whether the capture thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(
    wanted: Option<&str>,
    tx: mpsc::Sender<Vec<f32>>,
) -> anyhow::Result<(cpal::Stream, String)> {
    let host = cpal::default_host();
    let device = match wanted {
        None => host
            .default_input_device()
            .context("no default input device")?,
        Some(name) => host
            .input_devices()
            .context("list input devices")?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .with_context(|| format!("input device '{name}' not found"))?,
    };
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device
        .default_input_config()
        .with_context(|| format!("query input config of '{name}'"))?;
    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    debug!(
        device = %name,
        channels = config.channels,
        sample_rate = config.sample_rate.0,
        ?format,
        "opening input stream"
    );

    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, tx)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, tx)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, tx)?,
        other => anyhow::bail!("unsupported sample format {other:?}"),
    };
    stream.play().context("start input stream")?;
    Ok((stream, name))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::Sender<Vec<f32>>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels);
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
            // The receiver only goes away while the stream is being dropped.
            let _ = tx.send(downmix_mono(&samples, channels));
        },
        |e| warn!(error = %e, "input stream error"),
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mic.rs"]
mod tests;
