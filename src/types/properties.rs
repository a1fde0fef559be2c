//! Stream-level properties declared to the downstream consumer

use serde::{Deserialize, Serialize};

/// Total stream length as a sample count over the native sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDuration {
    pub samples: u64,
    pub sample_rate: u32,
}

impl StreamDuration {
    pub fn as_secs_f64(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / self.sample_rate as f64
    }
}

/// Description of the elementary stream being reframed.
///
/// Declared once when the format is known and again whenever the total
/// duration changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamProperties {
    /// Codec name (`AMR`, `AMR-WB`, `EVRC`, `SMV`, or a custom codec's name)
    pub codec: String,
    pub sample_rate: u32,
    pub samples_per_frame: u32,
    /// Speech storage files are always mono.
    pub channels: u32,
    /// Units per second of frame timestamps
    pub timescale: u32,
    /// Known only after a seek index scan
    pub duration: Option<StreamDuration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_seconds() {
        let duration = StreamDuration { samples: 24000, sample_rate: 8000 };
        assert_eq!(duration.as_secs_f64(), 3.0);
        assert_eq!(StreamDuration { samples: 10, sample_rate: 0 }.as_secs_f64(), 0.0);
    }

    #[test]
    fn properties_round_trip_through_yaml() {
        let properties = StreamProperties {
            codec: "AMR-WB".to_string(),
            sample_rate: 16000,
            samples_per_frame: 320,
            channels: 1,
            timescale: 16000,
            duration: Some(StreamDuration { samples: 32000, sample_rate: 16000 }),
        };
        let yaml = serde_yaml_ng::to_string(&properties).unwrap();
        assert!(yaml.contains("codec: AMR-WB"));
        let parsed: StreamProperties = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, properties);
    }
}
