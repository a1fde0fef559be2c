//! Resumable, backpressure-aware speech frame extraction
//!
//! The [`Reframer`] turns arbitrarily chunked stream bytes into complete,
//! timestamped frames. It never blocks: each [`Reframer::process`] call
//! handles at most one chunk and reports why it returned, so the caller's
//! scheduler decides when to call again.
//!
//! ```rust
//! use speechframe::sources::MemorySource;
//! use speechframe::{CollectingSink, ControlEvent, ProcessStatus, Reframer, ReframerConfig};
//!
//! // AMR header followed by two 12.2 kbit/s frames
//! let mut stream = b"#!AMR\n".to_vec();
//! for _ in 0..2 {
//!     stream.push(0x3C);
//!     stream.extend_from_slice(&[0u8; 31]);
//! }
//!
//! let mut source = MemorySource::new(stream).with_chunk_sizes(&[7]);
//! let mut sink = CollectingSink::new();
//! let mut reframer = Reframer::new(ReframerConfig::default());
//! reframer.handle_event(ControlEvent::Play { start: 0.0 });
//!
//! while reframer.process(&mut source, &mut sink)? != ProcessStatus::EndOfStream {}
//!
//! let timestamps: Vec<u64> = sink.frames.iter().map(|f| f.timestamp).collect();
//! assert_eq!(timestamps, vec![0, 160]);
//! # Ok::<(), speechframe::ReframeError>(())
//! ```

mod session;
mod state;

pub use state::{ProcessStatus, ReframerState, ReframerStats, StreamState};

use tracing::debug;

use crate::config::ReframerConfig;
use crate::format::FormatDetector;
use crate::index::SeekIndex;
use crate::sink::FrameSink;
use crate::source::{ByteSource, Chunk, SourcePoll};
use crate::types::{CodecVariant, ControlEvent, SpeechCodec, StreamProperties};
use crate::{ReframeError, Result};
use session::Session;

/// Classifies a stream prefix into a codec and the offset of its first frame.
pub type Detector<C> = fn(&[u8]) -> Result<(C, usize)>;

/// Speech stream reframer.
///
/// Generic over the codec so tests and embedders can drive synthetic
/// framings; the default detects the `#!` storage formats.
pub struct Reframer<C: SpeechCodec = CodecVariant> {
    config: ReframerConfig,
    detector: Option<Detector<C>>,
    preset_codec: Option<C>,
    preset_index: Option<SeekIndex>,
    probe: Option<Chunk>,
    pending_play: Option<f64>,
    session: Option<Session<C>>,
}

impl Reframer<CodecVariant> {
    /// Reframer for `#!AMR`, `#!AMR-WB`, `#!EVRC` and `#!SMV` streams.
    pub fn new(config: ReframerConfig) -> Self {
        Self::with_detector(config, FormatDetector::detect_codec)
    }
}

impl<C: SpeechCodec> Reframer<C> {
    /// Reframer that classifies the stream with `detector`.
    pub fn with_detector(config: ReframerConfig, detector: Detector<C>) -> Self {
        Self {
            config,
            detector: Some(detector),
            preset_codec: None,
            preset_index: None,
            probe: None,
            pending_play: None,
            session: None,
        }
    }

    /// Reframer for a headerless stream of `codec` frames.
    pub fn with_codec(codec: C, config: ReframerConfig) -> Self {
        Self {
            config,
            detector: None,
            preset_codec: Some(codec),
            preset_index: None,
            probe: None,
            pending_play: None,
            session: None,
        }
    }

    /// Use a prebuilt seek index instead of scanning the source.
    pub fn with_seek_index(mut self, index: SeekIndex) -> Self {
        self.preset_index = Some(index);
        self
    }

    /// Apply a control event.
    ///
    /// A play request takes effect on the next [`Reframer::process`] call,
    /// which owns the source it may need to reposition.
    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Play { start } => {
                debug!(start, "Play requested");
                self.pending_play = Some(start);
            }
            ControlEvent::Stop => {
                debug!("Stop requested");
                self.pending_play = None;
                if let Some(session) = self.session.as_mut() {
                    session.stop();
                }
            }
            ControlEvent::SetSpeed(rate) => {
                debug!(rate, "Speed change does not affect framing");
            }
        }
    }

    /// Process at most one chunk from `source`, emitting frames into `sink`.
    pub fn process<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<ProcessStatus>
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        if self.session.is_none() {
            match self.bind(source, sink)? {
                Some(session) => self.session = Some(session),
                None => return Ok(ProcessStatus::Pending),
            }
        }

        let pending_play = self.pending_play.take();
        let Some(session) = self.session.as_mut() else {
            return Err(ReframeError::invalid_state("process", StreamState::Idle));
        };
        if let Some(start) = pending_play {
            session.start_playback(start, source)?;
        }
        session.process(source, sink)
    }

    fn bind<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<Option<Session<C>>>
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let (codec, data_offset, held) = match self.preset_codec.take() {
            Some(codec) => (codec, 0, None),
            None => match self.detect(source)? {
                Some((codec, data_offset, probe)) => (codec, data_offset, Some(probe)),
                None => return Ok(None),
            },
        };
        Ok(Some(Session::bind(
            codec,
            data_offset,
            held,
            self.preset_index.take(),
            &self.config,
            source,
            sink,
        )))
    }

    /// Gather the probe prefix and classify it.
    fn detect<S>(&mut self, source: &mut S) -> Result<Option<(C, usize, Chunk)>>
    where
        S: ByteSource + ?Sized,
    {
        let Some(detector) = self.detector else {
            return Err(ReframeError::invalid_state("detect", StreamState::Idle));
        };

        loop {
            let gathered = self.probe.as_ref().map_or(0, Chunk::len);
            if gathered >= self.config.probe_len {
                break;
            }
            match source.next_chunk()? {
                SourcePoll::Pending => return Ok(None),
                SourcePoll::EndOfStream if gathered == 0 => {
                    return Err(ReframeError::unrecognized_format("stream ended before any header bytes"));
                }
                // short streams are classified on what they have
                SourcePoll::EndOfStream => break,
                SourcePoll::Chunk(chunk) => match self.probe.as_mut() {
                    Some(probe) => {
                        probe.data.extend_from_slice(&chunk.data);
                        probe.is_last = chunk.is_last;
                    }
                    None => self.probe = Some(chunk),
                },
            }
        }

        let Some(probe) = self.probe.take() else {
            return Ok(None);
        };
        let (codec, data_offset) = detector(&probe.data)?;
        Ok(Some((codec, data_offset, probe)))
    }

    pub fn stream_state(&self) -> StreamState {
        match &self.session {
            Some(session) => session.state,
            None if self.preset_codec.is_some() => StreamState::Configured,
            None => StreamState::Idle,
        }
    }

    /// The detected (or preset) codec.
    pub fn codec(&self) -> Option<&C> {
        match &self.session {
            Some(session) => Some(&session.codec),
            None => self.preset_codec.as_ref(),
        }
    }

    /// Offset of the first frame indicator, once detected.
    pub fn data_offset(&self) -> Option<usize> {
        self.session.as_ref().map(|session| session.data_offset)
    }

    pub fn properties(&self) -> Option<&StreamProperties> {
        self.session.as_ref().map(|session| &session.properties)
    }

    pub fn seek_index(&self) -> Option<&SeekIndex> {
        self.session.as_ref().and_then(|session| session.index.as_ref())
    }

    /// Timestamp the next emitted frame will carry.
    pub fn current_timestamp(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.clock.current_timestamp())
    }

    pub fn reframer_state(&self) -> Option<&ReframerState> {
        self.session.as_ref().map(|session| &session.rs)
    }

    pub fn stats(&self) -> ReframerStats {
        self.session.as_ref().map(|session| session.stats).unwrap_or_default()
    }
}
