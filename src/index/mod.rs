//! Duration-indexed seek table
//!
//! A [`SeekIndex`] maps playback time to the byte position of a frame
//! indicator. It is built once per stream by a forward scan
//! ([`SeekIndexBuilder`]) and only read afterwards.

mod builder;

pub use builder::SeekIndexBuilder;

use crate::types::StreamDuration;

/// One recorded seek point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    /// Offset of the frame indicator byte
    pub byte_position: u64,

    /// Seconds of audio before the frame at `byte_position`
    pub cumulative_duration: f64,

    /// Number of frames before the frame at `byte_position`
    pub frame_number: u64,
}

/// Sparse time to byte-position table for one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekIndex {
    entries: Vec<IndexEntry>,
    total_samples: u64,
    total_frames: u64,
    sample_rate: u32,
    data_offset: u64,
    complete: bool,
}

impl SeekIndex {
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset of the first frame indicator.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Complete frames seen by the scan.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Duration of every complete frame seen by the scan.
    pub fn total_duration(&self) -> StreamDuration {
        StreamDuration { samples: self.total_samples, sample_rate: self.sample_rate }
    }

    /// Whether the scan reached the end of the stream.
    ///
    /// An invalid indicator stops the scan early; entries before it stay valid.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Greatest entry whose duration does not exceed `target` seconds.
    ///
    /// Targets past the end resolve to the last entry; targets before the
    /// first entry resolve to nothing.
    pub fn lookup(&self, target: f64) -> Option<&IndexEntry> {
        if target.is_nan() {
            return None;
        }
        let after = self.entries.partition_point(|entry| entry.cumulative_duration <= target);
        after.checked_sub(1).map(|i| &self.entries[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SeekIndex {
        let entries = (1..=3)
            .map(|i| IndexEntry {
                byte_position: 6 + i * 100,
                cumulative_duration: i as f64,
                frame_number: i * 50,
            })
            .collect();
        SeekIndex {
            entries,
            total_samples: 8000 * 4,
            total_frames: 200,
            sample_rate: 8000,
            data_offset: 6,
            complete: true,
        }
    }

    #[test]
    fn lookup_picks_greatest_entry_not_after_target() {
        let index = index();
        assert_eq!(index.lookup(0.5), None);
        assert_eq!(index.lookup(1.0).map(|e| e.frame_number), Some(50));
        assert_eq!(index.lookup(2.7).map(|e| e.frame_number), Some(100));
        assert_eq!(index.lookup(3.0).map(|e| e.frame_number), Some(150));
    }

    #[test]
    fn lookup_clamps_past_the_end() {
        let index = index();
        assert_eq!(index.lookup(1e9).map(|e| e.byte_position), Some(306));
        assert_eq!(index.lookup(f64::NAN), None);
        assert_eq!(index.total_duration().as_secs_f64(), 4.0);
    }
}
