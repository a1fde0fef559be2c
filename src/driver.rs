//! Driver spawns and manages the reframing task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::DriverConfig;
use crate::reframer::{ProcessStatus, Reframer};
use crate::sink::ChannelSink;
use crate::source::ByteSource;
use crate::types::{ControlEvent, Frame, SpeechCodec, StreamProperties};

/// Lifecycle of the reframing task as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverStatus {
    /// Reading the stream header
    Starting,
    /// Format detected; frames flow on play requests
    Running,
    /// The source ended and every frame was delivered
    Finished,
    /// The task stopped on an error
    Failed(String),
}

impl DriverStatus {
    /// Whether the task has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverStatus::Finished | DriverStatus::Failed(_))
    }
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Receiver for reframed frames; closes after end of stream
    pub frames: mpsc::Receiver<Frame>,
    /// Receiver for stream property declarations
    pub properties: watch::Receiver<Option<Arc<StreamProperties>>>,
    /// Receiver for task status changes
    pub status: watch::Receiver<DriverStatus>,
    /// Sender for play/stop/speed requests
    pub control: mpsc::UnboundedSender<ControlEvent>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the reframing task
///
/// The task owns the reframer and its source and turns every
/// [`ProcessStatus`] into a scheduling decision: wait for bytes, wait for
/// the consumer, or wait for a control event.
pub struct Driver;

impl Driver {
    /// Spawn the reframing task for `source`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C, S>(reframer: Reframer<C>, source: S, config: &DriverConfig) -> DriverChannels
    where
        C: SpeechCodec,
        S: ByteSource + Send + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (props_tx, props_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(DriverStatus::Starting);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let sink = ChannelSink::new(frame_tx, props_tx);
        let task = ReframeTask {
            reframer,
            source,
            sink,
            control: control_rx,
            control_open: true,
            status: status_tx,
            cancel: cancel.clone(),
            poll_interval: config.poll_interval(),
        };

        tokio::spawn(task.run());

        DriverChannels {
            frames: frame_rx,
            properties: props_rx,
            status: status_rx,
            control: control_tx,
            cancel,
        }
    }
}

/// Everything the reframing task owns.
struct ReframeTask<C: SpeechCodec, S> {
    reframer: Reframer<C>,
    source: S,
    sink: ChannelSink,
    control: mpsc::UnboundedReceiver<ControlEvent>,
    control_open: bool,
    status: watch::Sender<DriverStatus>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

/// What the task loop does after one wait.
enum Next {
    Continue,
    Exit,
}

impl<C, S> ReframeTask<C, S>
where
    C: SpeechCodec,
    S: ByteSource + Send + 'static,
{
    async fn run(mut self) {
        info!("Reframe task started");
        let mut passes = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                info!("Reframe task cancelled");
                break;
            }
            self.drain_control();

            let status = match self.reframer.process(&mut self.source, &mut self.sink) {
                Ok(status) => status,
                Err(e) => {
                    error!(error = %e, "Reframing failed");
                    self.status.send_replace(DriverStatus::Failed(e.to_string()));
                    break;
                }
            };
            passes += 1;
            trace!(?status, passes, "Process pass");

            if *self.status.borrow() == DriverStatus::Starting && self.reframer.properties().is_some() {
                self.status.send_replace(DriverStatus::Running);
            }
            if self.sink.is_closed() {
                debug!("Frame receiver dropped, shutting down");
                break;
            }

            let next = match status {
                ProcessStatus::NeedMore | ProcessStatus::Consumed => {
                    // file sources are always ready; give other tasks a turn
                    tokio::task::yield_now().await;
                    Next::Continue
                }
                ProcessStatus::Pending => self.wait_for_source().await,
                ProcessStatus::WouldBlock => self.wait_for_consumer().await,
                ProcessStatus::Paused | ProcessStatus::Stopped => self.wait_for_control().await,
                ProcessStatus::EndOfStream => {
                    self.finish().await;
                    Next::Exit
                }
            };
            if let Next::Exit = next {
                break;
            }
        }

        let stats = self.reframer.stats();
        info!(
            frames = stats.frames_emitted,
            discarded = stats.frames_discarded,
            resynced = stats.bytes_resynced,
            "Reframe task ended"
        );
    }

    /// Apply every control event already queued.
    fn drain_control(&mut self) {
        while let Ok(event) = self.control.try_recv() {
            self.reframer.handle_event(event);
        }
    }

    fn on_control(&mut self, event: Option<ControlEvent>) -> Next {
        match event {
            Some(event) => {
                self.reframer.handle_event(event);
                Next::Continue
            }
            None => {
                debug!("Control sender dropped");
                self.control_open = false;
                Next::Continue
            }
        }
    }

    async fn wait_for_source(&mut self) -> Next {
        tokio::select! {
            _ = self.cancel.cancelled() => Next::Exit,
            event = self.control.recv(), if self.control_open => self.on_control(event),
            _ = tokio::time::sleep(self.poll_interval) => Next::Continue,
        }
    }

    async fn wait_for_consumer(&mut self) -> Next {
        tokio::select! {
            _ = self.cancel.cancelled() => Next::Exit,
            ready = self.sink.ready() => match ready {
                Ok(()) => Next::Continue,
                Err(_) => {
                    debug!("Frame receiver dropped while waiting for room");
                    Next::Exit
                }
            },
        }
    }

    async fn wait_for_control(&mut self) -> Next {
        if !self.control_open {
            debug!("No control sender left to resume playback");
            return Next::Exit;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Next::Exit,
            event = self.control.recv() => match event {
                Some(event) => {
                    self.reframer.handle_event(event);
                    Next::Continue
                }
                None => {
                    debug!("Control sender dropped while paused");
                    Next::Exit
                }
            },
        }
    }

    /// Deliver parked frames, then let the frame channel close.
    async fn finish(&mut self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            flushed = self.sink.flush() => {
                if flushed.is_err() {
                    debug!("Frame receiver dropped before end of stream");
                }
            }
        }
        info!("Source ended");
        self.status.send_replace(DriverStatus::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReframerConfig;
    use crate::sources::MemorySource;
    use crate::test_utils::{TestCodec, init_tracing, test_stream};

    fn driver_config(capacity: usize) -> DriverConfig {
        DriverConfig { channel_capacity: capacity, poll_interval_ms: 1, open_timeout_ms: 1000 }
    }

    async fn collect(mut frames: mpsc::Receiver<Frame>) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Some(frame) = frames.recv().await {
            out.push(frame);
        }
        out
    }

    #[tokio::test]
    async fn delivers_every_frame_through_a_small_channel() {
        init_tracing();
        let indicators: Vec<u8> = (0..50).map(|i| if i % 3 == 0 { 0x08 } else { 0x00 }).collect();
        let stream = test_stream(&indicators);
        let source = MemorySource::new(stream.clone()).with_chunk_sizes(&[7, 64]);
        let reframer = Reframer::with_codec(TestCodec, ReframerConfig::default());

        let channels = Driver::spawn(reframer, source, &driver_config(2));
        channels.control.send(ControlEvent::Play { start: 0.0 }).unwrap();

        let frames = collect(channels.frames).await;
        assert_eq!(frames.len(), indicators.len());
        let bytes: Vec<u8> = frames.iter().flat_map(|f| f.data.iter().copied()).collect();
        assert_eq!(bytes, stream);
        assert_eq!(*channels.status.borrow(), DriverStatus::Finished);
    }

    #[tokio::test]
    async fn waits_for_play_before_emitting() {
        let source = MemorySource::new(test_stream(&[0x00, 0x00]));
        let reframer = Reframer::with_codec(TestCodec, ReframerConfig::default());
        let mut channels = Driver::spawn(reframer, source, &driver_config(4));

        let mut props = channels.properties.clone();
        props.wait_for(Option::is_some).await.unwrap();
        assert!(channels.frames.try_recv().is_err());

        channels.control.send(ControlEvent::Play { start: 0.0 }).unwrap();
        let frames = collect(channels.frames).await;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_first);
    }

    #[tokio::test]
    async fn unrecognized_header_fails_the_task() {
        let source = MemorySource::new(b"RIFF....WAVEfmt ".to_vec());
        let channels = Driver::spawn(Reframer::new(ReframerConfig::default()), source, &driver_config(4));

        let mut status = channels.status.clone();
        let failed = status.wait_for(DriverStatus::is_terminal).await.unwrap().clone();
        match failed {
            DriverStatus::Failed(reason) => assert!(reason.contains("Unrecognized"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pending_source_is_polled_again() {
        let source = MemorySource::new(test_stream(&[0x00, 0x08, 0x00])).with_chunk_sizes(&[5]).with_pending_every(2);
        let reframer = Reframer::with_codec(TestCodec, ReframerConfig::default());
        let channels = Driver::spawn(reframer, source, &driver_config(8));
        channels.control.send(ControlEvent::Play { start: 0.0 }).unwrap();

        let frames = collect(channels.frames).await;
        assert_eq!(frames.iter().map(|f| f.timestamp).collect::<Vec<_>>(), vec![0, 160, 320]);
    }

    #[tokio::test]
    async fn cancel_stops_a_paused_task() {
        let source = MemorySource::new(test_stream(&[0x00]));
        let reframer = Reframer::with_codec(TestCodec, ReframerConfig::default());
        let channels = Driver::spawn(reframer, source, &driver_config(4));

        channels.cancel.cancel();
        // the task drops its sink on exit, closing the frame channel
        assert!(collect(channels.frames).await.is_empty());
    }
}
