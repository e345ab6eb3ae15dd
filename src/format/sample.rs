//! Logical audio format negotiated by the player pipeline.

/// PCM sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl SampleFormat {
    /// Size of one sample in bytes.
    #[must_use]
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Returns `true` for floating point encodings.
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns `true` for unsigned integer encodings.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        matches!(self, Self::U8)
    }
}

/// Interleaved PCM format of the payloads passed to
/// [`OutputSession::write`](crate::OutputSession::write).
///
/// The core never inspects payload bytes; the format only determines the
/// stream descriptor handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u16,
    /// Encoding of each sample.
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    /// Creates a format from its parts.
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /// 44.1kHz stereo signed 16-bit.
    pub fn cd_quality() -> Self {
        Self::new(44100, 2, SampleFormat::I16)
    }

    /// Stereo 32-bit float at the given rate.
    pub fn float_stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2, SampleFormat::F32)
    }

    /// Size of one sample in bytes.
    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    /// Size of one frame (one sample per channel) in bytes.
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }

    /// Bytes needed to hold `frames` frames.
    pub fn bytes_for_frames(&self, frames: usize) -> usize {
        frames * self.bytes_per_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_frame() {
        assert_eq!(AudioFormat::cd_quality().bytes_per_frame(), 4);
        assert_eq!(AudioFormat::float_stereo(48000).bytes_per_frame(), 8);
        assert_eq!(AudioFormat::new(8000, 1, SampleFormat::U8).bytes_per_frame(), 1);
        assert_eq!(AudioFormat::new(48000, 6, SampleFormat::F64).bytes_per_frame(), 48);
    }

    #[test]
    fn test_bytes_for_frames() {
        assert_eq!(AudioFormat::cd_quality().bytes_for_frames(1024), 4096);
    }

    #[test]
    fn test_sample_format_kinds() {
        assert!(SampleFormat::F32.is_float());
        assert!(!SampleFormat::I16.is_float());
        assert!(SampleFormat::U8.is_unsigned());
        assert!(!SampleFormat::I32.is_unsigned());
    }
}
