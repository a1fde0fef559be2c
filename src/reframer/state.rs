//! Reframer states, statuses and counters

use serde::Serialize;

/// Lifecycle of one reframed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamState {
    /// Waiting for enough leading bytes to detect the format
    Idle,
    /// Codec known and properties declared; no play request yet
    Configured,
    /// Emitting frames in stream order
    Playing,
    /// Computing and discarding frames up to a seek target
    Seeking,
    /// Emission suppressed until the next play request
    Stopped,
}

impl StreamState {
    /// Whether frames flow in this state (possibly discarded while seeking).
    pub fn is_active(self) -> bool {
        matches!(self, StreamState::Playing | StreamState::Seeking)
    }
}

/// Outcome of one [`crate::Reframer::process`] call.
///
/// Every variant is a point where the caller decides when to call again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessStatus {
    /// The source had no bytes ready
    Pending,
    /// The chunk was consumed and a partial frame awaits more bytes
    NeedMore,
    /// The chunk was consumed completely
    Consumed,
    /// The sink asked for a pause; the next call resumes where this one stopped
    WouldBlock,
    /// Configured but not yet asked to play
    Paused,
    /// Stopped by a control event
    Stopped,
    /// The source ended and end of stream was signaled downstream
    EndOfStream,
}

/// Scan state carried between `process` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReframerState {
    /// Leading bytes of a frame that continues in a later chunk
    pub pending_bytes: Vec<u8>,

    /// Bytes still missing from the pending frame, 0 when none is pending
    pub pending_frame_remainder: u32,

    /// Source position of the pending frame's indicator
    pub pending_byte_offset: Option<u64>,

    /// The pending frame falls before the seek target
    pub pending_discard: bool,

    /// Where scanning of a held chunk resumes after backpressure
    pub resume_offset: usize,

    pub in_seek_skip: bool,
    pub is_playing: bool,

    /// End of stream was signaled downstream since the last play request
    pub end_of_stream: bool,
}

impl ReframerState {
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame_remainder > 0
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending_bytes.clear();
        self.pending_frame_remainder = 0;
        self.pending_byte_offset = None;
        self.pending_discard = false;
        self.resume_offset = 0;
    }
}

/// Counters for one stream instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReframerStats {
    pub chunks: u64,
    pub frames_emitted: u64,
    pub frames_discarded: u64,
    pub bytes_resynced: u64,
    pub backpressure_pauses: u64,
}
