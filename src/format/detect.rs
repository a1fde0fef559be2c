//! Stream header classification.

use crate::types::{CodecVariant, SpeechCodec};
use crate::{ReframeError, Result};
use tracing::{debug, info};

/// Number of leading bytes the detector wants before classifying.
pub const PROBE_LEN: usize = 20;

/// Outcome of a successful header match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedFormat {
    pub variant: CodecVariant,
    /// Offset of the first frame indicator.
    pub data_offset: usize,
}

enum Marker {
    Supported(CodecVariant),
    Multichannel(&'static str),
}

// Longer markers sharing a prefix with shorter ones come first.
const MARKERS: [(&[u8], Marker); 6] = [
    (b"#!AMR-WB_MC1.0\n", Marker::Multichannel("AMR-WB multichannel")),
    (b"#!AMR_MC1.0\n", Marker::Multichannel("AMR multichannel")),
    (b"#!AMR-WB\n", Marker::Supported(CodecVariant::AmrWb)),
    (b"#!AMR\n", Marker::Supported(CodecVariant::Amr)),
    (b"#!EVRC\n", Marker::Supported(CodecVariant::Evrc)),
    (b"#!SMV\n", Marker::Supported(CodecVariant::Smv)),
];

/// Classifies a speech stream from its leading bytes.
pub struct FormatDetector;

impl FormatDetector {
    /// Match `prefix` against the known storage-format markers.
    ///
    /// Matching is ASCII case-insensitive. A marker only matches when the
    /// prefix holds all of its bytes, so a truncated header is reported as
    /// unrecognized rather than guessed.
    pub fn detect(prefix: &[u8]) -> Result<DetectedFormat> {
        for (marker, kind) in MARKERS.iter() {
            if prefix.len() < marker.len() || !prefix[..marker.len()].eq_ignore_ascii_case(marker)
            {
                continue;
            }
            return match kind {
                Marker::Supported(variant) => {
                    info!(codec = variant.name(), data_offset = marker.len(), "Detected speech stream");
                    Ok(DetectedFormat { variant: *variant, data_offset: marker.len() })
                }
                Marker::Multichannel(name) => {
                    debug!("Rejecting {} storage", name);
                    Err(ReframeError::unsupported_format(*name))
                }
            };
        }

        Err(ReframeError::unrecognized_format(format!(
            "no speech storage marker in {} byte prefix",
            prefix.len()
        )))
    }

    /// [`FormatDetector::detect`] reshaped for the reframer's detection hook.
    pub fn detect_codec(prefix: &[u8]) -> Result<(CodecVariant, usize)> {
        Self::detect(prefix).map(|detected| (detected.variant, detected.data_offset))
    }
}
