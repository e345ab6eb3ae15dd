//! Engine-native stream descriptors and format resolution.

use crate::format::AudioFormat;
use crate::OutputError;

/// Sample layout flags of a linear PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags {
    /// Samples are IEEE floats.
    pub float: bool,
    /// Integer samples are signed.
    pub signed_integer: bool,
    /// Samples occupy every bit of their container.
    pub packed: bool,
    /// Samples are big endian.
    pub big_endian: bool,
}

/// Engine-native description of an interleaved linear PCM stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamDescriptor {
    /// Frames per second.
    pub sample_rate: f64,
    /// Sample layout.
    pub flags: FormatFlags,
    /// Frames in each packet. Always 1 for linear PCM.
    pub frames_per_packet: u32,
    /// Bytes in each packet.
    pub bytes_per_packet: u32,
    /// Bytes in each frame.
    pub bytes_per_frame: u32,
    /// Interleaved channels per frame.
    pub channels_per_frame: u32,
    /// Bits in each sample.
    pub bits_per_channel: u32,
}

impl StreamDescriptor {
    /// Bytes of audio per second of playback.
    pub fn bytes_per_second(&self) -> f64 {
        self.sample_rate * f64::from(self.bytes_per_frame)
    }
}

/// Turns a logical [`AudioFormat`] into a [`StreamDescriptor`].
///
/// Implement this to plug in engine-specific negotiation; the session uses
/// [`LinearPcmResolver`] unless told otherwise.
pub trait FormatResolver: Send + Sync {
    /// Resolves `format`, or fails with
    /// [`OutputError::FormatUnsupported`].
    fn resolve(&self, format: &AudioFormat) -> Result<StreamDescriptor, OutputError>;
}

/// Resolves any non-degenerate format to packed native-endian linear PCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPcmResolver;

impl FormatResolver for LinearPcmResolver {
    fn resolve(&self, format: &AudioFormat) -> Result<StreamDescriptor, OutputError> {
        if format.sample_rate == 0 {
            return Err(OutputError::FormatUnsupported {
                reason: "sample rate is zero".to_string(),
            });
        }
        if format.channels == 0 {
            return Err(OutputError::FormatUnsupported {
                reason: "channel count is zero".to_string(),
            });
        }

        let sample_format = format.sample_format;
        let flags = FormatFlags {
            float: sample_format.is_float(),
            signed_integer: !sample_format.is_float() && !sample_format.is_unsigned(),
            packed: true,
            big_endian: cfg!(target_endian = "big"),
        };

        let frames_per_packet = 1;
        let bytes_per_frame = format.bytes_per_frame() as u32;

        Ok(StreamDescriptor {
            sample_rate: f64::from(format.sample_rate),
            flags,
            frames_per_packet,
            bytes_per_packet: bytes_per_frame * frames_per_packet,
            bytes_per_frame,
            channels_per_frame: u32::from(format.channels),
            bits_per_channel: format.bytes_per_sample() as u32 * 8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SampleFormat;

    #[test]
    fn test_resolve_cd_quality() {
        let desc = LinearPcmResolver
            .resolve(&AudioFormat::cd_quality())
            .unwrap();
        assert!((desc.sample_rate - 44100.0).abs() < f64::EPSILON);
        assert_eq!(desc.channels_per_frame, 2);
        assert_eq!(desc.bits_per_channel, 16);
        assert_eq!(desc.bytes_per_frame, 4);
        assert_eq!(desc.bytes_per_packet, 4);
        assert_eq!(desc.frames_per_packet, 1);
        assert!(desc.flags.signed_integer);
        assert!(desc.flags.packed);
        assert!(!desc.flags.float);
    }

    #[test]
    fn test_resolve_float() {
        let desc = LinearPcmResolver
            .resolve(&AudioFormat::float_stereo(48000))
            .unwrap();
        assert!(desc.flags.float);
        assert!(!desc.flags.signed_integer);
        assert_eq!(desc.bits_per_channel, 32);
        assert!((desc.bytes_per_second() - 384_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_unsigned() {
        let desc = LinearPcmResolver
            .resolve(&AudioFormat::new(8000, 1, SampleFormat::U8))
            .unwrap();
        assert!(!desc.flags.float);
        assert!(!desc.flags.signed_integer);
        assert_eq!(desc.bits_per_channel, 8);
    }

    #[test]
    fn test_resolve_rejects_degenerate_formats() {
        let no_rate = AudioFormat::new(0, 2, SampleFormat::I16);
        let no_channels = AudioFormat::new(44100, 0, SampleFormat::I16);

        assert!(matches!(
            LinearPcmResolver.resolve(&no_rate),
            Err(OutputError::FormatUnsupported { .. })
        ));
        assert!(matches!(
            LinearPcmResolver.resolve(&no_channels),
            Err(OutputError::FormatUnsupported { .. })
        ));
    }
}
