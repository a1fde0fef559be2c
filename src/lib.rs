//! Frame-accurate reframing of AMR, AMR-WB, EVRC and SMV speech streams.
//!
//! Speechframe turns the `#!`-prefixed speech storage formats into a flow of
//! complete, timestamped frames, whatever the chunking of the input.
//!
//! # Features
//!
//! - **Format detection**: `#!AMR`, `#!AMR-WB`, `#!EVRC` and `#!SMV` headers
//! - **Resumable reframing**: frames split across chunks are reassembled and
//!   downstream backpressure pauses scanning without losing a byte
//! - **Seeking**: a coarse seek index lets playback start at any time
//! - **Async delivery**: a driver task feeds frames to a tokio stream,
//!   optionally paced in real time
//!
//! ## Example (file playback)
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use speechframe::Speechframe;
//!
//! #[tokio::main]
//! async fn main() -> speechframe::Result<()> {
//!     let mut connection = Speechframe::open("/path/to/voice.amr").await?;
//!     let mut frames = connection.take_frames()?;
//!     connection.play(0.0)?;
//!
//!     while let Some(frame) = frames.next().await {
//!         println!("{} bytes at {}", frame.len(), frame.timestamp);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod clock;
pub mod config;
mod error;
pub mod format;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Synchronous reframing
pub mod index;
pub mod reframer;
pub mod sink;
pub mod source;
pub mod sources;

// Async delivery
pub mod connection;
pub mod driver;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

pub use clock::PlaybackClock;
pub use config::{Config, DriverConfig, FileConfig, PipeConfig, ReframerConfig};
pub use format::{DetectedFormat, FormatDetector};
pub use index::{IndexEntry, SeekIndex, SeekIndexBuilder};
pub use reframer::{ProcessStatus, Reframer, ReframerState, ReframerStats, StreamState};
pub use sink::{ChannelSink, CollectingSink, Flow, FrameSink};
pub use source::{ByteSource, Chunk, Reposition, SourcePoll};

// Main API exports
pub use connection::StreamConnection;
pub use driver::{Driver, DriverChannels, DriverStatus};
pub use stream::PaceExt;

/// Unified entry point for speech stream connections.
///
/// # Examples
///
/// ## Storage file
/// ```rust,no_run
/// use speechframe::Speechframe;
///
/// #[tokio::main]
/// async fn main() -> speechframe::Result<()> {
///     let connection = Speechframe::open("voice.amr").await?;
///     println!("{:?}", connection.properties());
///     Ok(())
/// }
/// ```
///
/// ## Named pipe
/// ```rust,no_run
/// use speechframe::Speechframe;
///
/// #[tokio::main]
/// async fn main() -> speechframe::Result<()> {
///     let connection = Speechframe::open_pipe("pipe:///tmp/voice").await?;
///     connection.play(0.0)?;
///     Ok(())
/// }
/// ```
pub struct Speechframe;

impl Speechframe {
    /// Open a speech storage file with the default configuration.
    ///
    /// Waits until the format is detected. The returned connection is
    /// paused until [`StreamConnection::play`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist or is not readable
    /// - The header is not one of the supported formats
    pub async fn open<P: AsRef<std::path::Path>>(path: P) -> Result<StreamConnection> {
        StreamConnection::open(path, &Config::default()).await
    }

    /// Open a speech storage file with an explicit configuration.
    pub async fn open_with_config<P: AsRef<std::path::Path>>(
        path: P,
        config: &Config,
    ) -> Result<StreamConnection> {
        StreamConnection::open(path, config).await
    }

    /// Open a named pipe (`pipe://path`) with the default configuration.
    ///
    /// Pipes are live: they are never indexed and ignore seek requests.
    pub async fn open_pipe(url: &str) -> Result<StreamConnection> {
        StreamConnection::open_pipe(url, &Config::default()).await
    }

    pub async fn open_pipe_with_config(url: &str, config: &Config) -> Result<StreamConnection> {
        StreamConnection::open_pipe(url, config).await
    }
}
