//! A stream whose codec is known: clock, seek index and the carry-over scan

use tracing::{debug, info, trace, warn};

use super::state::{ProcessStatus, ReframerState, ReframerStats, StreamState};
use crate::clock::PlaybackClock;
use crate::config::ReframerConfig;
use crate::index::{SeekIndex, SeekIndexBuilder};
use crate::sink::{Flow, FrameSink};
use crate::source::{ByteSource, Chunk, Reposition, SourcePoll};
use crate::types::{Frame, SpeechCodec, StreamProperties};
use crate::Result;

pub(crate) struct Session<C> {
    pub(crate) codec: C,
    pub(crate) data_offset: usize,
    pub(crate) clock: PlaybackClock,
    pub(crate) index: Option<SeekIndex>,
    pub(crate) properties: StreamProperties,
    pub(crate) state: StreamState,
    pub(crate) rs: ReframerState,
    pub(crate) stats: ReframerStats,
    seekable: bool,
    held: Option<Chunk>,
    skip_header: usize,
    seek_target: u64,
    initial_play_done: bool,
    emitted_since_play: u64,
}

impl<C: SpeechCodec> Session<C> {
    /// Establish the output representation for a detected stream.
    ///
    /// `held` is the detection probe; its first `data_offset` bytes are the
    /// storage header.
    pub(crate) fn bind<S, K>(
        codec: C,
        data_offset: usize,
        held: Option<Chunk>,
        preset_index: Option<SeekIndex>,
        config: &ReframerConfig,
        source: &S,
        sink: &mut K,
    ) -> Self
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let clock = PlaybackClock::new(
            codec.sample_rate(),
            codec.samples_per_frame(),
            config.timescale.or(source.timescale()),
        );
        let properties = StreamProperties {
            codec: codec.name().to_string(),
            sample_rate: codec.sample_rate(),
            samples_per_frame: codec.samples_per_frame(),
            channels: 1,
            timescale: clock.timescale(),
            duration: None,
        };
        info!(
            codec = codec.name(),
            sample_rate = properties.sample_rate,
            timescale = properties.timescale,
            data_offset,
            "Stream configured"
        );
        sink.declare_properties(&properties);

        let mut session = Self {
            codec,
            data_offset,
            clock,
            index: None,
            properties,
            state: StreamState::Configured,
            rs: ReframerState::default(),
            stats: ReframerStats::default(),
            seekable: source.length().is_some(),
            skip_header: if held.is_some() { data_offset } else { 0 },
            held,
            seek_target: 0,
            initial_play_done: false,
            emitted_since_play: 0,
        };

        match preset_index {
            Some(index) => session.adopt_index(index, sink),
            None => session.build_index(config.index_window, source, sink),
        }
        session
    }

    fn build_index<S, K>(&mut self, window: f64, source: &S, sink: &mut K)
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        if self.clock.is_external() {
            debug!("External time scale in effect, not indexing");
            return;
        }
        let Some(path) = source.path() else {
            debug!("Source has no stable path, not indexing");
            return;
        };

        match SeekIndexBuilder::new(window).build_from_path(&self.codec, path, self.data_offset as u64) {
            Ok(index) => self.adopt_index(index, sink),
            Err(e) => warn!(error = %e, "Seek index scan failed, seeking will discard from stream start"),
        }
    }

    fn adopt_index<K: FrameSink + ?Sized>(&mut self, index: SeekIndex, sink: &mut K) {
        let duration = index.total_duration();
        if self.properties.duration != Some(duration) {
            self.properties.duration = Some(duration);
            sink.declare_properties(&self.properties);
        }
        self.index = Some(index);
    }

    /// Enter playback at `start` seconds, repositioning the source when useful.
    pub(crate) fn start_playback<S>(&mut self, start: f64, source: &mut S) -> Result<()>
    where
        S: ByteSource + ?Sized,
    {
        let first = !self.initial_play_done;
        self.initial_play_done = true;
        self.emitted_since_play = 0;
        self.rs.end_of_stream = false;
        self.rs.is_playing = true;

        if !self.seekable {
            // live sources continue where they are, framing state intact
            if start > 0.0 {
                debug!(start, "Source cannot seek, playing from current position");
            }
            if first {
                self.clock.reset_to(0);
            }
            self.enter(StreamState::Playing);
            return Ok(());
        }

        let entry = if start > 0.0 {
            self.index.as_ref().and_then(|index| index.lookup(start)).copied()
        } else {
            None
        };
        let (position, timestamp) = match entry {
            Some(entry) => (entry.byte_position, self.clock.timestamp_of_frame(entry.frame_number)),
            None => (self.data_offset as u64, 0),
        };

        self.rs.clear_pending();
        if !(first && entry.is_none()) {
            self.held = None;
            self.skip_header = 0;
            match source.reposition(position)? {
                Reposition::Done => debug!(position, timestamp, "Source repositioned"),
                Reposition::Unsupported => warn!(position, "Source refused reposition, continuing"),
            }
        }
        self.clock.reset_to(timestamp);

        let target = self.clock.seconds_to_ticks(start);
        if target > 0 {
            self.seek_target = target;
            self.rs.in_seek_skip = true;
            debug!(start, target, from = timestamp, "Seeking");
            self.enter(StreamState::Seeking);
        } else {
            self.enter(StreamState::Playing);
        }
        Ok(())
    }

    pub(crate) fn stop(&mut self) {
        self.rs.is_playing = false;
        self.rs.in_seek_skip = false;
        self.rs.end_of_stream = false;
        self.enter(StreamState::Stopped);
    }

    fn enter(&mut self, state: StreamState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "State transition");
            self.state = state;
        }
        if state == StreamState::Playing {
            self.rs.in_seek_skip = false;
        }
    }

    pub(crate) fn process<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<ProcessStatus>
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        match self.state {
            StreamState::Idle | StreamState::Configured => return Ok(ProcessStatus::Paused),
            StreamState::Stopped => {
                if !self.rs.end_of_stream {
                    sink.signal_end_of_stream();
                    self.rs.end_of_stream = true;
                }
                return Ok(ProcessStatus::Stopped);
            }
            StreamState::Playing | StreamState::Seeking => {}
        }

        let chunk = match self.held.take() {
            Some(chunk) => chunk,
            None => match source.next_chunk()? {
                SourcePoll::Chunk(chunk) => chunk,
                SourcePoll::Pending => return Ok(ProcessStatus::Pending),
                SourcePoll::EndOfStream => return Ok(self.finish(sink)),
            },
        };
        Ok(self.scan(chunk, sink))
    }

    fn finish<K: FrameSink + ?Sized>(&mut self, sink: &mut K) -> ProcessStatus {
        if self.rs.has_pending_frame() {
            warn!(
                missing = self.rs.pending_frame_remainder,
                buffered = self.rs.pending_bytes.len(),
                "Dropping incomplete frame at end of stream"
            );
            self.rs.clear_pending();
        }
        if !self.rs.end_of_stream {
            info!(frames = self.stats.frames_emitted, "End of stream");
            sink.signal_end_of_stream();
            self.rs.end_of_stream = true;
        }
        ProcessStatus::EndOfStream
    }

    /// Frame as much of `chunk` as the sink allows.
    fn scan<K: FrameSink + ?Sized>(&mut self, chunk: Chunk, sink: &mut K) -> ProcessStatus {
        let data = chunk.data.as_slice();
        let resuming = self.rs.resume_offset > 0;
        let mut pos = std::mem::take(&mut self.rs.resume_offset);

        if !resuming {
            self.stats.chunks += 1;
            let mut flow = Flow::Continue;

            if self.rs.has_pending_frame() {
                let take = (self.rs.pending_frame_remainder as usize).min(data.len());
                self.rs.pending_bytes.extend_from_slice(&data[..take]);
                self.rs.pending_frame_remainder -= take as u32;
                pos = take;
                if self.rs.has_pending_frame() {
                    trace!(missing = self.rs.pending_frame_remainder, "Frame still incomplete");
                    return ProcessStatus::NeedMore;
                }

                let bytes = std::mem::take(&mut self.rs.pending_bytes);
                let offset = self.rs.pending_byte_offset.take();
                let discard = std::mem::take(&mut self.rs.pending_discard);
                let is_last = chunk.is_last && pos == data.len();
                flow = self.complete_frame(bytes, offset, discard, is_last, sink);
            }

            if self.clock.is_external() {
                if let Some(timestamp) = chunk.timestamp {
                    self.clock.reanchor(timestamp);
                }
            }

            if flow == Flow::WouldBlock {
                return self.suspend(chunk, pos);
            }

            if self.skip_header > 0 {
                let skip = self.skip_header.min(data.len() - pos);
                pos += skip;
                self.skip_header -= skip;
            }
        }

        let mut skipped = 0usize;
        while pos < data.len() {
            let size = self.codec.frame_size(data[pos]) as usize;
            if size == 0 {
                skipped += 1;
                pos += 1;
                continue;
            }
            let offset = chunk.byte_offset.map(|base| base + pos as u64);
            if skipped > 0 {
                self.note_resync(skipped, offset);
                skipped = 0;
            }

            let discard = self.discard_next_frame();
            let frame_len = size + 1;
            let available = data.len() - pos;
            if frame_len > available {
                self.rs.pending_bytes.clear();
                self.rs.pending_bytes.extend_from_slice(&data[pos..]);
                self.rs.pending_frame_remainder = (frame_len - available) as u32;
                self.rs.pending_byte_offset = offset;
                self.rs.pending_discard = discard;
                trace!(buffered = available, missing = frame_len - available, "Frame continues in next chunk");
                return ProcessStatus::NeedMore;
            }

            let bytes = data[pos..pos + frame_len].to_vec();
            pos += frame_len;
            let is_last = chunk.is_last && pos == data.len();
            if self.complete_frame(bytes, offset, discard, is_last, sink) == Flow::WouldBlock {
                return self.suspend(chunk, pos);
            }
        }

        if skipped > 0 {
            self.stats.bytes_resynced += skipped as u64;
            warn!(skipped, "No frame indicator found before end of chunk");
        }
        ProcessStatus::Consumed
    }

    /// Park `chunk` until the sink has room again.
    fn suspend(&mut self, chunk: Chunk, pos: usize) -> ProcessStatus {
        self.stats.backpressure_pauses += 1;
        if pos < chunk.data.len() {
            trace!(resume_offset = pos, "Sink would block, holding chunk");
            self.rs.resume_offset = pos;
            self.held = Some(chunk);
        }
        ProcessStatus::WouldBlock
    }

    fn note_resync(&mut self, skipped: usize, at: Option<u64>) {
        self.stats.bytes_resynced += skipped as u64;
        warn!(skipped, byte_offset = ?at, "Broken frame indicator, resynchronized");
    }

    /// Decide at the start of a frame whether seeking discards it.
    fn discard_next_frame(&mut self) -> bool {
        if self.state != StreamState::Seeking {
            return false;
        }
        let frame_end = self.clock.current_timestamp() + self.clock.frame_duration();
        if frame_end > self.seek_target {
            debug!(target = self.seek_target, timestamp = self.clock.current_timestamp(), "Seek target reached");
            self.enter(StreamState::Playing);
            false
        } else {
            true
        }
    }

    fn complete_frame<K: FrameSink + ?Sized>(
        &mut self,
        data: Vec<u8>,
        byte_offset: Option<u64>,
        discard: bool,
        is_last: bool,
        sink: &mut K,
    ) -> Flow {
        let flow = if discard {
            self.stats.frames_discarded += 1;
            Flow::Continue
        } else {
            let duration = u32::try_from(self.clock.frame_duration()).unwrap_or(u32::MAX);
            let mut frame = Frame::new(data, self.clock.current_timestamp(), duration);
            frame.is_first = self.emitted_since_play == 0;
            frame.is_last = is_last;
            frame.byte_offset = byte_offset;
            trace!(
                timestamp = frame.timestamp,
                len = frame.len(),
                byte_offset = ?frame.byte_offset,
                "Emitting frame"
            );
            self.emitted_since_play += 1;
            self.stats.frames_emitted += 1;
            sink.accept(frame)
        };
        self.clock.advance_frame();
        flow
    }
}
