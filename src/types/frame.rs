//! Access units emitted by the reframer

use std::sync::Arc;

/// One complete speech frame.
///
/// `data` holds the indicator byte followed by the codec payload, exactly as
/// stored in the source. Frames are immutable once emitted; cloning shares
/// the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Indicator byte plus payload (zero-copy via Arc)
    pub data: Arc<[u8]>,

    /// Presentation timestamp in the active time scale
    pub timestamp: u64,

    /// Duration in the active time scale
    pub duration: u32,

    /// First frame emitted since the last play request
    pub is_first: bool,

    /// Frame ends exactly where the source reported its last byte
    pub is_last: bool,

    /// Position of the indicator byte in the source, when the source tracks offsets
    pub byte_offset: Option<u64>,
}

impl Frame {
    /// Create a frame from its stored bytes.
    pub fn new(data: impl Into<Arc<[u8]>>, timestamp: u64, duration: u32) -> Self {
        Self {
            data: data.into(),
            timestamp,
            duration,
            is_first: false,
            is_last: false,
            byte_offset: None,
        }
    }

    /// The frame-type indicator that introduced this frame.
    pub fn indicator(&self) -> u8 {
        self.data[0]
    }

    /// Payload bytes following the indicator.
    pub fn body(&self) -> &[u8] {
        &self.data[1..]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Timestamp one frame duration after this frame starts.
    pub fn end_timestamp(&self) -> u64 {
        self.timestamp + self.duration as u64
    }

    /// Whether `timestamp` falls inside `[timestamp, timestamp + duration)`.
    pub fn contains(&self, timestamp: u64) -> bool {
        timestamp >= self.timestamp && timestamp < self.end_timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_skips_indicator() {
        let frame = Frame::new(vec![0x3C, 1, 2, 3], 160, 160);
        assert_eq!(frame.indicator(), 0x3C);
        assert_eq!(frame.body(), &[1, 2, 3]);
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.end_timestamp(), 320);
        assert!(frame.contains(160));
        assert!(frame.contains(319));
        assert!(!frame.contains(320));
    }

    #[test]
    fn clones_share_data() {
        let frame = Frame::new(vec![0x04; 13], 0, 160);
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.data, &copy.data));
    }
}
