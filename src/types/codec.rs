//! Codec variants and the interface the reframer drives them through

use serde::{Deserialize, Serialize};

use crate::format::tables;

/// Framing behavior of one speech codec.
///
/// The reframer, the seek index builder and the playback clock only ever see
/// a codec through this trait. Selection happens once, at format detection.
pub trait SpeechCodec: Send + Sync + 'static {
    /// Short codec name used in stream properties and logs.
    fn name(&self) -> &'static str;

    /// Bytes following `indicator` in the frame it starts, 0 if it starts none.
    fn frame_size(&self, indicator: u8) -> u32;

    /// Native sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Samples represented by one frame.
    fn samples_per_frame(&self) -> u32;

    /// Largest value [`SpeechCodec::frame_size`] returns.
    fn max_frame_size(&self) -> u32 {
        (0..=u8::MAX).map(|indicator| self.frame_size(indicator)).max().unwrap_or(0)
    }
}

/// Speech codecs carried in `#!`-prefixed storage files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecVariant {
    /// AMR narrowband (RFC 4867 storage format)
    Amr,
    /// AMR wideband
    AmrWb,
    /// EVRC (RFC 3558 storage format)
    Evrc,
    /// SMV
    Smv,
}

impl CodecVariant {
    pub const ALL: [CodecVariant; 4] =
        [CodecVariant::Amr, CodecVariant::AmrWb, CodecVariant::Evrc, CodecVariant::Smv];

    /// Storage header that introduces a stream of this codec.
    pub fn marker(self) -> &'static [u8] {
        match self {
            CodecVariant::Amr => b"#!AMR\n",
            CodecVariant::AmrWb => b"#!AMR-WB\n",
            CodecVariant::Evrc => b"#!EVRC\n",
            CodecVariant::Smv => b"#!SMV\n",
        }
    }

    /// Offset of the first frame indicator in a stream of this codec.
    pub fn data_offset(self) -> usize {
        self.marker().len()
    }
}

impl SpeechCodec for CodecVariant {
    fn name(&self) -> &'static str {
        match self {
            CodecVariant::Amr => "AMR",
            CodecVariant::AmrWb => "AMR-WB",
            CodecVariant::Evrc => "EVRC",
            CodecVariant::Smv => "SMV",
        }
    }

    fn frame_size(&self, indicator: u8) -> u32 {
        tables::frame_size(*self, indicator)
    }

    fn sample_rate(&self) -> u32 {
        match self {
            CodecVariant::AmrWb => 16000,
            _ => 8000,
        }
    }

    fn samples_per_frame(&self) -> u32 {
        match self {
            CodecVariant::AmrWb => 320,
            _ => 160,
        }
    }

    fn max_frame_size(&self) -> u32 {
        tables::max_frame_size(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_frames_twenty_milliseconds() {
        for variant in CodecVariant::ALL {
            let ms = variant.samples_per_frame() as u64 * 1000 / variant.sample_rate() as u64;
            assert_eq!(ms, 20, "{} frame duration", variant.name());
        }
    }

    #[test]
    fn trait_default_max_matches_tables() {
        struct Wrapped(CodecVariant);
        impl SpeechCodec for Wrapped {
            fn name(&self) -> &'static str {
                self.0.name()
            }
            fn frame_size(&self, indicator: u8) -> u32 {
                self.0.frame_size(indicator)
            }
            fn sample_rate(&self) -> u32 {
                self.0.sample_rate()
            }
            fn samples_per_frame(&self) -> u32 {
                self.0.samples_per_frame()
            }
        }
        for variant in CodecVariant::ALL {
            assert_eq!(Wrapped(variant).max_frame_size(), variant.max_frame_size());
        }
    }

    #[test]
    fn serde_names_are_stable() {
        let yaml = serde_yaml_ng::to_string(&CodecVariant::AmrWb).unwrap();
        assert_eq!(yaml.trim(), "AmrWb");
    }
}
