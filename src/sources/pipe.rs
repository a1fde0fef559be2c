//! Named pipe source
//!
//! Pipes are live: they cannot reposition, have no length and expose no path,
//! so a piped stream never gets a seek index.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::config::PipeConfig;
use crate::source::{ByteSource, Chunk, Reposition, SourcePoll};
use crate::{ReframeError, Result};

/// Resolve a `pipe://name`, `pipe:name` or plain path to a filesystem path.
///
/// Fragment (`#...`) and query (`?...`) suffixes are dropped. Any other URL
/// scheme is rejected.
pub fn pipe_path(url: &str) -> Result<PathBuf> {
    let lower = url.to_ascii_lowercase();
    let stripped = if lower.starts_with("pipe://") {
        &url[7..]
    } else if lower.starts_with("pipe:") {
        &url[5..]
    } else if url.contains("://") {
        return Err(ReframeError::unsupported_format(format!("not a pipe URL: {}", url)));
    } else {
        url
    };

    let end = stripped.find(['#', '?']).unwrap_or(stripped.len());
    let path = &stripped[..end];
    if path.is_empty() {
        return Err(ReframeError::config_error("pipe", format!("empty pipe name in {}", url)));
    }
    Ok(PathBuf::from(path))
}

/// Reads a named pipe in fixed-size blocks.
pub struct PipeSource {
    file: File,
    path: PathBuf,
    config: PipeConfig,
    bytes_read: u64,
    is_first: bool,
    ended: bool,
    owns_pipe: bool,
}

impl PipeSource {
    /// Open the pipe named by `url`.
    pub fn open(url: &str, config: &PipeConfig) -> Result<Self> {
        let path = pipe_path(url)?;

        let mut owns_pipe = false;
        if !path.exists() && config.create {
            make_fifo(&path)?;
            owns_pipe = true;
        }

        let file = open_for_read(&path, config.blocking).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to open pipe");
            if owns_pipe {
                let _ = std::fs::remove_file(&path);
            }
            ReframeError::source_error(path.clone(), e)
        })?;

        info!(
            path = %path.display(),
            blocking = config.blocking,
            keep_open = config.keep_open,
            "Opened pipe source"
        );

        Ok(Self {
            file,
            path,
            config: config.clone(),
            bytes_read: 0,
            is_first: true,
            ended: false,
            owns_pipe,
        })
    }

    /// Filesystem location of the pipe.
    pub fn pipe_path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[cfg(unix)]
fn make_fifo(path: &Path) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        ReframeError::config_error("pipe", format!("path contains NUL: {}", path.display()))
    })?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
    if rc != 0 {
        return Err(ReframeError::source_error(
            path.to_path_buf(),
            std::io::Error::last_os_error(),
        ));
    }
    debug!(path = %path.display(), "Created FIFO");
    Ok(())
}

#[cfg(not(unix))]
fn make_fifo(path: &Path) -> Result<()> {
    Err(ReframeError::source_error(
        path.to_path_buf(),
        std::io::Error::new(ErrorKind::Unsupported, "FIFO creation requires a unix platform"),
    ))
}

#[cfg(unix)]
fn open_for_read(path: &Path, blocking: bool) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let flags = if blocking { 0 } else { libc::O_NONBLOCK };
    OpenOptions::new().read(true).custom_flags(flags).open(path)
}

#[cfg(not(unix))]
fn open_for_read(path: &Path, _blocking: bool) -> std::io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

impl ByteSource for PipeSource {
    fn next_chunk(&mut self) -> Result<SourcePoll> {
        if self.ended {
            return Ok(SourcePoll::EndOfStream);
        }

        let mut data = vec![0u8; self.config.block_size.max(1)];
        match self.file.read(&mut data) {
            Ok(0) => {
                if self.config.keep_open {
                    return Ok(SourcePoll::Pending);
                }
                // a non-blocking FIFO reads empty until its first writer connects
                if !self.config.blocking && self.bytes_read == 0 {
                    trace!(path = %self.path.display(), "Pipe waiting for a writer");
                    return Ok(SourcePoll::Pending);
                }
                debug!(path = %self.path.display(), bytes = self.bytes_read, "Pipe end of stream detected");
                self.ended = true;
                Ok(SourcePoll::EndOfStream)
            }
            Ok(read) => {
                data.truncate(read);
                let chunk = Chunk {
                    data,
                    byte_offset: Some(self.bytes_read),
                    timestamp: None,
                    is_first: self.is_first,
                    is_last: false,
                };
                self.bytes_read += read as u64;
                self.is_first = false;
                trace!(len = read, total = self.bytes_read, "Pipe chunk");
                Ok(SourcePoll::Chunk(chunk))
            }
            // non-blocking pipe with writers active
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                Ok(SourcePoll::Pending)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read pipe");
                Err(ReframeError::source_error(self.path.clone(), e))
            }
        }
    }

    fn reposition(&mut self, byte_offset: u64) -> Result<Reposition> {
        warn!(byte_offset, "Seek request not possible on pipes, ignoring");
        Ok(Reposition::Unsupported)
    }

    fn length(&self) -> Option<u64> {
        None
    }
}

impl Drop for PipeSource {
    fn drop(&mut self) {
        if self.owns_pipe {
            debug!(path = %self.path.display(), "Removing FIFO");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
