//! Connections that reframe a stream on a background task

use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::driver::{Driver, DriverStatus};
use crate::reframer::Reframer;
use crate::source::ByteSource;
use crate::sources::{FileSource, PipeSource};
use crate::stream::{PaceExt, clamp_speed};
use crate::types::{ControlEvent, Frame, StreamProperties};
use crate::{ReframeError, Result};

/// A stream being reframed by a driver task.
///
/// Opening waits until the format is detected, then the connection sits in
/// the configured state until [`StreamConnection::play`] is called.
pub struct StreamConnection {
    /// Frame receiver, until taken by the consumer
    frames: Option<mpsc::Receiver<Frame>>,

    /// Stream properties watch receiver
    properties: watch::Receiver<Option<Arc<StreamProperties>>>,

    /// Driver status watch receiver
    status: watch::Receiver<DriverStatus>,

    control: mpsc::UnboundedSender<ControlEvent>,

    /// Playback rate shared with paced frame streams
    speed: watch::Sender<f64>,

    /// Cancellation token for stopping the driver task
    cancel: CancellationToken,
}

impl StreamConnection {
    /// Open a speech storage file.
    pub async fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening speech file: {}", path.display());
        config.validate()?;

        let source = FileSource::with_config(path, &config.file)?;
        Self::from_source(source, config).await
    }

    /// Open a named pipe (`pipe://name`).
    ///
    /// The driver task must never block, so the pipe is always read in
    /// non-blocking mode here.
    pub async fn open_pipe(url: &str, config: &Config) -> Result<Self> {
        info!("Opening pipe: {}", url);
        config.validate()?;

        let mut pipe_config = config.pipe.clone();
        if pipe_config.blocking {
            debug!("Reading pipe in non-blocking mode under the driver");
            pipe_config.blocking = false;
        }
        let source = PipeSource::open(url, &pipe_config)?;
        Self::from_source(source, config).await
    }

    /// Reframe an arbitrary byte source.
    pub async fn from_source<S>(source: S, config: &Config) -> Result<Self>
    where
        S: ByteSource + Send + 'static,
    {
        let reframer = Reframer::new(config.reframer.clone());
        let channels = Driver::spawn(reframer, source, &config.driver);

        // Wait for format detection before handing out the connection
        let mut props_rx = channels.properties.clone();
        let mut status_rx = channels.status.clone();
        let wait_result = tokio::time::timeout(config.driver.open_timeout(), async {
            loop {
                if props_rx.borrow_and_update().is_some() {
                    return Ok(());
                }
                match &*status_rx.borrow_and_update() {
                    DriverStatus::Failed(reason) => return Err(ReframeError::driver_failed(reason.clone())),
                    DriverStatus::Finished => {
                        return Err(ReframeError::driver_failed("stream ended before format detection"));
                    }
                    DriverStatus::Starting | DriverStatus::Running => {}
                }
                let changed = tokio::select! {
                    changed = props_rx.changed() => changed,
                    changed = status_rx.changed() => changed,
                };
                if changed.is_err() {
                    return Err(match &*status_rx.borrow() {
                        DriverStatus::Failed(reason) => ReframeError::driver_failed(reason.clone()),
                        _ => ReframeError::channel_closed("status"),
                    });
                }
            }
        })
        .await;

        match wait_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                channels.cancel.cancel();
                return Err(e);
            }
            // live sources may not have written a header yet
            Err(_) => warn!("Timeout waiting for stream format detection"),
        }

        if let Some(properties) = channels.properties.borrow().as_ref() {
            info!(
                codec = %properties.codec,
                sample_rate = properties.sample_rate,
                "Stream connection opened"
            );
        }

        let (speed, _) = watch::channel(1.0);
        Ok(Self {
            frames: Some(channels.frames),
            properties: channels.properties,
            status: channels.status,
            control: channels.control,
            speed,
            cancel: channels.cancel,
        })
    }

    /// Take the frame stream. Frames arrive as fast as the consumer reads.
    ///
    /// The stream ends after the last frame of the source.
    pub fn take_frames(&mut self) -> Result<impl Stream<Item = Frame> + Unpin + 'static + use<>> {
        match self.frames.take() {
            Some(frames) => Ok(ReceiverStream::new(frames)),
            None => Err(ReframeError::invalid_state("take_frames", "frames already taken")),
        }
    }

    /// Take the frame stream released in real time at the current speed.
    pub fn take_paced_frames(&mut self) -> Result<impl Stream<Item = Frame> + 'static + use<>> {
        let Some(timescale) = self.properties().map(|p| p.timescale) else {
            return Err(ReframeError::invalid_state("take_paced_frames", "format not detected"));
        };
        let frames = self.take_frames()?;
        Ok(frames.paced(timescale, self.speed.subscribe()))
    }

    /// Get stream property declarations as a stream
    pub fn property_updates(&self) -> impl Stream<Item = Arc<StreamProperties>> + 'static + use<> {
        WatchStream::new(self.properties.clone()).filter_map(|opt| async move { opt })
    }

    /// Latest declared stream properties (if the format is known)
    pub fn properties(&self) -> Option<Arc<StreamProperties>> {
        self.properties.borrow().clone()
    }

    pub fn status(&self) -> DriverStatus {
        self.status.borrow().clone()
    }

    /// Start or restart playback at `start` seconds.
    pub fn play(&self, start: f64) -> Result<()> {
        self.send(ControlEvent::Play { start })
    }

    /// Stop emitting frames until the next [`StreamConnection::play`].
    pub fn stop(&self) -> Result<()> {
        self.send(ControlEvent::Stop)
    }

    /// Change the playback rate of paced frame streams.
    pub fn set_speed(&self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ReframeError::config_error("speed", format!("must be positive, got {rate}")));
        }
        self.speed.send_replace(clamp_speed(rate));
        self.send(ControlEvent::SetSpeed(rate))
    }

    pub fn speed(&self) -> f64 {
        *self.speed.borrow()
    }

    fn send(&self, event: ControlEvent) -> Result<()> {
        self.control.send(event).map_err(|_| ReframeError::channel_closed("control"))
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        debug!("Dropping stream connection");
        self.cancel.cancel();
    }
}
