//! CPAL device wrapper for buffered playback.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig as CpalStreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use crate::engine::OutputEngine;
use crate::format::StreamDescriptor;
use crate::pool::{AudioBuffer, CompletionNotifier};
use crate::{EngineError, SubmitError};

/// Plays submitted buffers on a CPAL output device.
///
/// Buffers travel to the audio callback through a lock-free SPSC queue. The
/// callback copies their bytes straight into the device buffer, notifies
/// completion as each one drains, and pads underruns with silence. The
/// descriptor must match a format the device accepts natively; no
/// conversion is performed.
///
/// `CpalEngine` is not `Send` on every platform, so the session that owns
/// it must stay on one thread.
#[must_use]
pub struct CpalEngine {
    device: Device,
    output: Option<CpalOutput>,
}

struct CpalOutput {
    /// Dropping the stream stops the callback for good.
    stream: Option<Stream>,
    producer: ringbuf::HeapProd<AudioBuffer>,
    playback: Arc<Mutex<Playback>>,
}

/// Callback-side state: the queue of submitted buffers and the buffer being
/// drained.
struct Playback {
    consumer: ringbuf::HeapCons<AudioBuffer>,
    current: Option<AudioBuffer>,
    offset: usize,
    silence: u8,
    notifier: CompletionNotifier,
}

impl Playback {
    /// Fills `out` from queued buffers, completing each one that drains.
    fn render(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            if self.current.is_none() {
                self.current = self.consumer.try_pop();
                self.offset = 0;
            }
            let Some(buffer) = self.current.as_ref() else {
                out[written..].fill(self.silence);
                return;
            };

            let bytes = &buffer.as_bytes()[self.offset..];
            let n = bytes.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&bytes[..n]);
            written += n;
            self.offset += n;

            if self.offset >= buffer.len() {
                if let Some(done) = self.current.take() {
                    self.notifier.notify(done);
                }
            }
        }
    }

    /// Takes every buffer the callback still holds, oldest first.
    fn take_pending(&mut self) -> Vec<AudioBuffer> {
        let mut pending: Vec<AudioBuffer> = self.current.take().into_iter().collect();
        while let Some(buffer) = self.consumer.try_pop() {
            pending.push(buffer);
        }
        pending
    }
}

impl CpalEngine {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if no default output device is configured.
    pub fn open_default() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::device_unavailable("no default output device"))?;

        Ok(Self {
            device,
            output: None,
        })
    }

    /// Opens a specific output device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| EngineError::backend(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(Self {
                        device,
                        output: None,
                    });
                }
            }
        }

        Err(EngineError::device_unavailable(format!(
            "output device not found: {name}"
        )))
    }

    /// Returns the device name.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    fn output_mut(&mut self) -> Result<&mut CpalOutput, EngineError> {
        self.output.as_mut().ok_or(EngineError::NoOutput)
    }
}

/// Maps a linear PCM descriptor onto a CPAL sample format.
fn sample_format_for(descriptor: &StreamDescriptor) -> Result<SampleFormat, EngineError> {
    let flags = descriptor.flags;
    if flags.big_endian != cfg!(target_endian = "big") {
        return Err(EngineError::UnsupportedDescriptor {
            reason: "non-native byte order".to_string(),
        });
    }

    let format = match (flags.float, flags.signed_integer, descriptor.bits_per_channel) {
        (true, _, 32) => SampleFormat::F32,
        (true, _, 64) => SampleFormat::F64,
        (false, true, 16) => SampleFormat::I16,
        (false, true, 32) => SampleFormat::I32,
        (false, false, 8) => SampleFormat::U8,
        (float, signed, bits) => {
            return Err(EngineError::UnsupportedDescriptor {
                reason: format!("{bits}-bit samples (float: {float}, signed: {signed})"),
            });
        }
    };
    Ok(format)
}

fn stream_config_for(descriptor: &StreamDescriptor) -> Result<CpalStreamConfig, EngineError> {
    let channels = u16::try_from(descriptor.channels_per_frame).map_err(|_| {
        EngineError::UnsupportedDescriptor {
            reason: format!("{} channels", descriptor.channels_per_frame),
        }
    })?;

    Ok(CpalStreamConfig {
        channels,
        sample_rate: SampleRate(descriptor.sample_rate.round() as u32),
        buffer_size: BufferSize::Default,
    })
}

impl OutputEngine for CpalEngine {
    fn name(&self) -> &str {
        "cpal"
    }

    fn create_output(
        &mut self,
        descriptor: &StreamDescriptor,
        capacity_hint: usize,
        notifier: CompletionNotifier,
    ) -> Result<(), EngineError> {
        let sample_format = sample_format_for(descriptor)?;
        let config = stream_config_for(descriptor)?;

        let (producer, consumer) = HeapRb::<AudioBuffer>::new(capacity_hint.max(1)).split();
        let playback = Arc::new(Mutex::new(Playback {
            consumer,
            current: None,
            offset: 0,
            silence: if sample_format == SampleFormat::U8 { 0x80 } else { 0 },
            notifier: notifier.clone(),
        }));

        let callback_playback = Arc::clone(&playback);
        let stream = self
            .device
            .build_output_stream_raw(
                &config,
                sample_format,
                move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                    callback_playback.lock().render(data.bytes_mut());
                },
                move |err| {
                    notifier.report_stream_error(err.to_string());
                },
                None,
            )
            .map_err(|e| EngineError::backend(e.to_string()))?;

        // Some hosts start streams on creation; playback waits for start().
        if let Err(err) = stream.pause() {
            tracing::debug!("could not pause new output stream: {}", err);
        }

        tracing::debug!(
            device = %self.device_name(),
            ?sample_format,
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            "created cpal output"
        );

        self.output = Some(CpalOutput {
            stream: Some(stream),
            producer,
            playback,
        });
        Ok(())
    }

    fn allocate_buffer(&mut self, capacity: usize) -> Result<Vec<u8>, EngineError> {
        Ok(vec![0u8; capacity])
    }

    fn free_buffer(&mut self, buffer: AudioBuffer) {
        drop(buffer.into_memory());
    }

    fn submit(&mut self, buffer: AudioBuffer) -> Result<(), SubmitError> {
        let Some(output) = self.output.as_mut() else {
            return Err(SubmitError::new(buffer, EngineError::NoOutput));
        };
        if output.stream.is_none() {
            return Err(SubmitError::new(
                buffer,
                EngineError::rejected("output is stopped"),
            ));
        }
        output.producer.try_push(buffer).map_err(|buffer| {
            SubmitError::new(buffer, EngineError::rejected("playback queue full"))
        })
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let output = self.output_mut()?;
        let stream = output
            .stream
            .as_ref()
            .ok_or_else(|| EngineError::rejected("output is stopped"))?;
        stream
            .play()
            .map_err(|e| EngineError::backend(e.to_string()))
    }

    fn stop(&mut self) -> Result<Vec<AudioBuffer>, EngineError> {
        let output = self.output_mut()?;
        if let Some(stream) = output.stream.take() {
            if let Err(err) = stream.pause() {
                tracing::debug!("could not pause output stream: {}", err);
            }
            // Dropping the stream joins the callback; nothing can notify after this.
            drop(stream);
        }
        Ok(output.playback.lock().take_pending())
    }

    fn dispose_output(&mut self) {
        self.output = None;
    }
}
