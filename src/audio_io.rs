use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::engine::SharedState;
use crate::error::{Error, Result};

/// Name of the thread that owns the output stream.
pub const AUDIO_THREAD_NAME: &str = "focus-noise-audio";

/// Something that can run a real-time output stream driven by a [`FrameRenderer`].
pub trait AudioBackend: Send {
    /// Start the stream. Must not return until the stream is running or has failed.
    fn start(&mut self, renderer: FrameRenderer) -> Result<()>;
    /// Tear the stream down. No callback may run after this returns.
    fn stop(&mut self);
}

/// Body of the real-time callback.
pub struct FrameRenderer {
    shared: Arc<Mutex<SharedState>>,
}

impl FrameRenderer {
    pub(crate) fn new(shared: Arc<Mutex<SharedState>>) -> Self {
        Self { shared }
    }

    /// One mono sample, volume applied. The guard is held only for this frame.
    #[inline]
    pub fn next_frame(&mut self) -> f32 {
        let mut st = self.shared.lock();
        match st.active_variant {
            Some(variant) => {
                let volume = st.volume;
                st.generator.next_sample(variant) * volume
            }
            None => 0.0,
        }
    }

    /// Fill an interleaved buffer, writing each mono frame to every channel.
    pub fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = channels.max(1);
        for frame in data.chunks_mut(channels) {
            let value = T::from_sample(self.next_frame());
            frame.fill(value);
        }
    }
}

/// Device selection for [`CpalBackend`].
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Output device name; the host default when `None`
    pub device_name: Option<String>,
    /// Fixed buffer size in frames; the device default when `None`
    pub buffer_frames: Option<u32>,
}

struct RunningStream {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// cpal output. The stream lives on its own thread because cpal streams are not `Send`.
pub struct CpalBackend {
    config: BackendConfig,
    running: Option<RunningStream>,
}

impl CpalBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }
}

impl AudioBackend for CpalBackend {
    fn start(&mut self, renderer: FrameRenderer) -> Result<()> {
        self.stop();

        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name(AUDIO_THREAD_NAME.to_string())
            .spawn(move || {
                let stream = match open_stream(&config, renderer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Keep the stream alive until a stop signal is received
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("Audio thread released output stream");
            })
            .map_err(|e| Error::AudioBackendStart(format!("failed to spawn audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.running = Some(RunningStream { stop_tx, thread });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::AudioBackendStart(
                    "audio thread exited before the stream started".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(());
            if running.thread.join().is_err() {
                log::error!("Audio thread panicked during shutdown");
            }
        }
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        None => host.default_output_device().ok_or(Error::NoOutputDevice),
        Some(wanted) => host
            .output_devices()
            .map_err(|e| Error::AudioBackendStart(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| Error::DeviceNotFound(wanted.to_string())),
    }
}

fn open_stream(config: &BackendConfig, renderer: FrameRenderer) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = find_device(&host, config.device_name.as_deref())?;
    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioBackendStart(format!("no default output config: {e}")))?;
    let sample_format = supported.sample_format();
    let mut stream_config: StreamConfig = supported.into();
    if let Some(frames) = config.buffer_frames {
        stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
    }

    log::info!(
        "Opening output stream on '{}' ({:?}): {} Hz, {} channels, {:?}",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        host.id(),
        stream_config.sample_rate.0,
        stream_config.channels,
        sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, renderer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, renderer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, renderer)?,
        other => return Err(Error::UnsupportedSampleFormat(format!("{other:?}"))),
    };
    stream
        .play()
        .map_err(|e| Error::AudioBackendStart(format!("failed to play stream: {e}")))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: FrameRenderer,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| renderer.render(data, channels),
            |err| log::error!("stream error: {err}"),
            None,
        )
        .map_err(|e| Error::AudioBackendStart(format!("failed to build output stream: {e}")))
}

/// Names of the host's output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| Error::AudioBackendStart(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}
