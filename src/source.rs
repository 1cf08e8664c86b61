//! Byte streams the pipeline drains: an ffmpeg subprocess or any reader.

use std::ffi::OsString;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::preprocessing::build_decode_vf;

/// A polled, non-blocking byte stream produced by some decoder.
pub trait ByteSource {
    /// Read whatever is available. `Ok(0)` means nothing right now, or end of stream.
    fn poll_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether the producer may still write more data.
    fn is_running(&mut self) -> bool;

    /// Whether end of stream has been observed.
    fn is_exhausted(&self) -> bool;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn poll_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).poll_read(buf)
    }

    fn is_running(&mut self) -> bool {
        (**self).is_running()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

fn read_available<R: Read>(reader: &mut R, buf: &mut [u8], exhausted: &mut bool) -> io::Result<usize> {
    if *exhausted {
        return Ok(0);
    }
    match reader.read(buf) {
        Ok(0) => {
            *exhausted = true;
            Ok(0)
        }
        Ok(n) => Ok(n),
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Wraps an in-process reader, such as stdin carrying an `image2pipe` stream.
#[derive(Debug)]
pub struct ReaderSource<R: Read> {
    inner: R,
    exhausted: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, exhausted: false }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn poll_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_available(&mut self.inner, buf, &mut self.exhausted)
    }

    fn is_running(&mut self) -> bool {
        false
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// ffmpeg decoding a video into a stream of encoded images on its stdout.
#[derive(Debug)]
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    exhausted: bool,
    exit_reported: bool,
}

impl FfmpegSource {
    /// Launch ffmpeg for `input`.
    ///
    /// Fails with [`Error::SourceNotFound`] before spawning anything when the
    /// input does not exist, and with [`Error::SubprocessStart`] when ffmpeg
    /// cannot be launched.
    pub fn spawn(input: &Path, settings: &Settings) -> Result<Self> {
        if !input.exists() {
            return Err(Error::SourceNotFound(input.to_path_buf()));
        }

        let args = ffmpeg_args(input, settings);
        log::debug!("spawning {} {:?}", settings.ffmpeg, args);

        let mut child = Command::new(&settings.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::SubprocessStart { program: settings.ffmpeg.clone(), source })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::SubprocessStart {
                program: settings.ffmpeg.clone(),
                source: io::Error::new(ErrorKind::BrokenPipe, "stdout was not captured"),
            });
        };
        if let Err(e) = set_nonblocking(&stdout) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        log::info!("ffmpeg started (pid {}) for {}", child.id(), input.display());
        Ok(Self { child, stdout, exhausted: false, exit_reported: false })
    }
}

impl ByteSource for FfmpegSource {
    fn poll_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_available(&mut self.stdout, buf, &mut self.exhausted)
    }

    fn is_running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                if !self.exit_reported {
                    self.exit_reported = true;
                    if status.success() {
                        log::info!("ffmpeg finished");
                    } else {
                        log::warn!("ffmpeg exited with {}", status);
                    }
                }
                false
            }
            Err(e) => {
                log::warn!("could not query ffmpeg status: {}", e);
                false
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Command line for decoding `input` into an `image2pipe` stream on stdout.
pub fn ffmpeg_args(input: &Path, settings: &Settings) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into(), "-nostdin".into()];

    if let Some(hw) = settings.hwaccel.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        args.push("-hwaccel".into());
        args.push(hw.into());
    }

    args.push("-i".into());
    args.push(input.as_os_str().to_owned());

    let vf = build_decode_vf(settings.fps, settings.resolution, settings.preprocess.as_deref());
    args.push("-vf".into());
    args.push(vf.into());

    for a in ["-an", "-f", "image2pipe", "-vcodec", settings.frame_format.ffmpeg_codec(), "pipe:1"] {
        args.push(a.into());
    }
    args
}

#[cfg(unix)]
fn set_nonblocking(stdout: &ChildStdout) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = stdout.as_raw_fd();
    // SAFETY: `fd` belongs to `stdout`, which outlives both calls.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

// Pipes stay blocking elsewhere; reads then only return 0 at end of stream.
#[cfg(not(unix))]
fn set_nonblocking(_stdout: &ChildStdout) -> io::Result<()> {
    Ok(())
}
