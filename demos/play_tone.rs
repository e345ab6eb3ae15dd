//! Tone playback example.
//!
//! Plays a two-second 440 Hz sine wave through the default output device,
//! writing one buffer at a time. Each `write()` blocks while all buffers are
//! queued, so the loop runs at the device's playback rate.
//!
//! Run with: cargo run --example play_tone

use std::time::Instant;

use queued_audio_out::{list_output_devices, AudioFormat, CpalEngine, OutputSession, SampleFormat};

const BUFFER_COUNT: usize = 4;
const FRAMES_PER_BUFFER: usize = 2048;
const FREQUENCY_HZ: f32 = 440.0;
const DURATION_SECS: u32 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Output devices:");
    for name in list_output_devices()? {
        println!("  - {name}");
    }

    let format = AudioFormat::new(44_100, 2, SampleFormat::I16);
    let engine = CpalEngine::open_default()?;
    println!("Playing on: {}", engine.device_name());

    let mut session = OutputSession::builder(engine)
        .on_event(|e| tracing::warn!(?e, "output event"))
        .build();

    session.open(&format, BUFFER_COUNT, format.bytes_for_frames(FRAMES_PER_BUFFER))?;
    session.play()?;

    let total_frames = (format.sample_rate * DURATION_SECS) as usize;
    let started = Instant::now();
    let mut frame = 0;
    let mut payload = Vec::with_capacity(format.bytes_for_frames(FRAMES_PER_BUFFER));

    while frame < total_frames {
        payload.clear();
        let frames = FRAMES_PER_BUFFER.min(total_frames - frame);
        for i in frame..frame + frames {
            let t = i as f32 / format.sample_rate as f32;
            let sample = ((t * FREQUENCY_HZ * std::f32::consts::TAU).sin() * 8000.0) as i16;
            for _ in 0..format.channels {
                payload.extend_from_slice(&sample.to_ne_bytes());
            }
        }
        session.write(&payload)?;
        frame += frames;
    }

    // close() stops immediately; let the queued tail play out first
    while session.in_flight_buffers() > 0 {
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    let stats = session.stats();
    session.close()?;

    println!(
        "Queued {} buffers ({} bytes) in {:.2?}",
        stats.buffers_submitted,
        stats.bytes_submitted,
        started.elapsed()
    );
    Ok(())
}
