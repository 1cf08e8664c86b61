//! Drives a byte source through scanning, decoding and rasterizing into a sink.

use std::thread;
use std::time::Duration;

use crate::config::Settings;
use crate::error::Result;
use crate::raster::{FrameDecoder, ImageDecoder};
use crate::rasterizer::Rasterizer;
use crate::scanner::BoundaryScanner;
use crate::sink::FrameSink;
use crate::source::ByteSource;

const READ_CHUNK: usize = 64 * 1024;

/// One run of the frame pipeline.
///
/// Owns the accumulation buffer and the frame counter. Everything happens on
/// the calling thread: read, scan, decode, rasterize, hand to the sink.
pub struct Pipeline<D: FrameDecoder = ImageDecoder> {
    scanner: BoundaryScanner,
    decoder: D,
    rasterizer: Rasterizer,
    buffer: Vec<u8>,
    frames: u64,
    idle_backoff: Duration,
}

impl Pipeline<ImageDecoder> {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_decoder(settings, ImageDecoder::new(settings.frame_format))
    }
}

impl<D: FrameDecoder> Pipeline<D> {
    pub fn with_decoder(settings: &Settings, decoder: D) -> Result<Self> {
        settings.validate()?;
        let rasterizer = Rasterizer::new(settings.block_width, settings.block_height, settings.gradient()?)?;
        Ok(Self {
            scanner: BoundaryScanner::new(settings.frame_format.markers()),
            decoder,
            rasterizer,
            buffer: Vec::with_capacity(READ_CHUNK * 4),
            frames: 0,
            idle_backoff: Duration::from_millis(settings.idle_backoff_ms),
        })
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run until the source is drained; returns the number of frames delivered.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<u64>
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        self.run_with_progress(source, sink, |_| {})
    }

    /// Like [`Pipeline::run`], calling `progress` with the running count after every frame.
    ///
    /// The first frame that fails to decode aborts the run.
    pub fn run_with_progress<S, K, F>(&mut self, source: &mut S, sink: &mut K, mut progress: F) -> Result<u64>
    where
        S: ByteSource + ?Sized,
        K: FrameSink + ?Sized,
        F: FnMut(u64),
    {
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut discarded = 0usize;

        loop {
            let n = source.poll_read(&mut chunk)?;
            if n > 0 {
                self.buffer.extend_from_slice(&chunk[..n]);
                let Self { scanner, decoder, rasterizer, buffer, frames, .. } = self;
                let report = scanner.scan(buffer, |raw| -> Result<()> {
                    let raster = decoder.decode(raw)?;
                    let frame = rasterizer.rasterize(&raster)?;
                    sink.accept(&frame)?;
                    *frames += 1;
                    log::debug!(
                        "frame {}: {} bytes -> {}x{}",
                        frames,
                        raw.len(),
                        frame.columns(),
                        frame.rows()
                    );
                    progress(*frames);
                    Ok(())
                })?;
                discarded += report.discarded;
                continue;
            }

            if source.is_exhausted() && !source.is_running() {
                break;
            }
            thread::sleep(self.idle_backoff);
        }

        sink.finish()?;

        if discarded > 0 {
            log::debug!("skipped {} stray bytes between frames", discarded);
        }
        if !self.buffer.is_empty() {
            log::debug!("dropping {} bytes of an unterminated frame", self.buffer.len());
            self.buffer.clear();
        }
        self.scanner.reset();
        log::info!("pipeline finished after {} frames", self.frames);
        Ok(self.frames)
    }
}
