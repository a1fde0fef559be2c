//! Downstream consumers of reframed frames

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

use crate::types::{Frame, StreamProperties};
use crate::{ReframeError, Result};

/// Answer of a sink to an offered frame.
///
/// The frame is taken either way; `WouldBlock` asks the producer to stop
/// offering until the sink has room again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    WouldBlock,
}

/// Trait for downstream frame consumers
pub trait FrameSink {
    /// Take ownership of an emitted frame.
    fn accept(&mut self, frame: Frame) -> Flow;

    /// No frames follow until the next play request.
    fn signal_end_of_stream(&mut self);

    /// Stream description, sent after detection and whenever the duration changes.
    fn declare_properties(&mut self, properties: &StreamProperties);
}

/// Vec-backed sink for tests and offline use.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub frames: Vec<Frame>,
    pub properties: Vec<StreamProperties>,
    pub end_of_stream_count: usize,
    would_block_every: Option<usize>,
    accepted: usize,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `WouldBlock` after every `n`th accepted frame.
    pub fn with_would_block_every(n: usize) -> Self {
        Self { would_block_every: Some(n.max(1)), ..Self::default() }
    }

    /// Concatenated stored bytes of every collected frame.
    pub fn concatenated(&self) -> Vec<u8> {
        self.frames.iter().flat_map(|frame| frame.data.iter().copied()).collect()
    }

    /// Most recently declared properties.
    pub fn latest_properties(&self) -> Option<&StreamProperties> {
        self.properties.last()
    }
}

impl FrameSink for CollectingSink {
    fn accept(&mut self, frame: Frame) -> Flow {
        self.frames.push(frame);
        self.accepted += 1;
        match self.would_block_every {
            Some(n) if self.accepted % n == 0 => Flow::WouldBlock,
            _ => Flow::Continue,
        }
    }

    fn signal_end_of_stream(&mut self) {
        self.end_of_stream_count += 1;
    }

    fn declare_properties(&mut self, properties: &StreamProperties) {
        self.properties.push(properties.clone());
    }
}

/// Sink feeding a bounded tokio channel.
///
/// Frames that arrive while the channel is full are parked until
/// [`ChannelSink::ready`] moves them across, so `accept` never loses a frame.
pub struct ChannelSink {
    frames: mpsc::Sender<Frame>,
    properties: watch::Sender<Option<Arc<StreamProperties>>>,
    overflow: VecDeque<Frame>,
    end_of_stream: bool,
    closed: bool,
}

impl ChannelSink {
    pub fn new(
        frames: mpsc::Sender<Frame>,
        properties: watch::Sender<Option<Arc<StreamProperties>>>,
    ) -> Self {
        Self { frames, properties, overflow: VecDeque::new(), end_of_stream: false, closed: false }
    }

    /// Whether the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed || self.frames.is_closed()
    }

    /// Whether end of stream was signaled since the last frame.
    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    pub fn parked(&self) -> usize {
        self.overflow.len()
    }

    /// Move parked frames into the channel, waiting for room as needed.
    pub async fn flush(&mut self) -> Result<()> {
        while let Some(frame) = self.overflow.pop_front() {
            if self.frames.send(frame).await.is_err() {
                self.closed = true;
                self.overflow.clear();
                return Err(ReframeError::channel_closed("frames"));
            }
        }
        Ok(())
    }

    /// Wait until the channel can take at least one more frame.
    pub async fn ready(&mut self) -> Result<()> {
        self.flush().await?;
        match self.frames.reserve().await {
            // the permit is released immediately; only the wait matters
            Ok(_permit) => Ok(()),
            Err(_) => {
                self.closed = true;
                Err(ReframeError::channel_closed("frames"))
            }
        }
    }
}

impl FrameSink for ChannelSink {
    fn accept(&mut self, frame: Frame) -> Flow {
        self.end_of_stream = false;
        if !self.overflow.is_empty() {
            self.overflow.push_back(frame);
            return Flow::WouldBlock;
        }
        match self.frames.try_send(frame) {
            Ok(()) if self.frames.capacity() == 0 => Flow::WouldBlock,
            Ok(()) => Flow::Continue,
            Err(TrySendError::Full(frame)) => {
                trace!("Frame channel full, parking frame");
                self.overflow.push_back(frame);
                Flow::WouldBlock
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Frame receiver dropped");
                self.closed = true;
                Flow::WouldBlock
            }
        }
    }

    fn signal_end_of_stream(&mut self) {
        self.end_of_stream = true;
    }

    fn declare_properties(&mut self, properties: &StreamProperties) {
        // send_replace keeps the value even with no receiver attached yet
        self.properties.send_replace(Some(Arc::new(properties.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ts: u64) -> Frame {
        Frame::new(vec![0x00; 11], ts, 160)
    }

    fn properties() -> StreamProperties {
        StreamProperties {
            codec: "AMR".to_string(),
            sample_rate: 8000,
            samples_per_frame: 160,
            channels: 1,
            timescale: 8000,
            duration: None,
        }
    }

    #[test]
    fn collecting_sink_blocks_on_cadence() {
        let mut sink = CollectingSink::with_would_block_every(2);
        assert_eq!(sink.accept(frame(0)), Flow::Continue);
        assert_eq!(sink.accept(frame(160)), Flow::WouldBlock);
        assert_eq!(sink.accept(frame(320)), Flow::Continue);
        assert_eq!(sink.frames.len(), 3);
        assert_eq!(sink.concatenated().len(), 33);
    }

    #[tokio::test]
    async fn channel_sink_parks_when_full_and_flushes_in_order() {
        let (tx, mut rx) = mpsc::channel(2);
        let (props_tx, props_rx) = watch::channel(None);
        let mut sink = ChannelSink::new(tx, props_tx);

        sink.declare_properties(&properties());
        assert_eq!(props_rx.borrow().as_ref().map(|p| p.codec.clone()), Some("AMR".to_string()));

        assert_eq!(sink.accept(frame(0)), Flow::Continue);
        assert_eq!(sink.accept(frame(160)), Flow::WouldBlock);
        assert_eq!(sink.accept(frame(320)), Flow::WouldBlock);
        assert_eq!(sink.parked(), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.timestamp, 0);
        sink.flush().await.unwrap();
        assert_eq!(sink.parked(), 0);

        let rest: Vec<u64> = vec![rx.recv().await.unwrap().timestamp, rx.recv().await.unwrap().timestamp];
        assert_eq!(rest, vec![160, 320]);
    }

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        let (props_tx, _props_rx) = watch::channel(None);
        let mut sink = ChannelSink::new(tx, props_tx);
        drop(rx);

        assert_eq!(sink.accept(frame(0)), Flow::WouldBlock);
        assert!(sink.is_closed());
        let err = sink.ready().await.unwrap_err();
        assert!(matches!(err, ReframeError::ChannelClosed { .. }));
    }
}
