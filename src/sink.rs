//! Where finished frames go: the terminal, or a container file.

use crossterm::{cursor, queue, style::Print};
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use crate::codec::ContainerWriter;
use crate::error::Result;
use crate::pacer::Pacer;
use crate::rasterizer::AsciiFrame;

/// Receives frames in production order.
pub trait FrameSink {
    fn accept(&mut self, frame: &AsciiFrame) -> Result<()>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Paced live output: each frame overwrites the previous one from the top-left corner.
pub struct TerminalSink<W: Write> {
    out: W,
    pacer: Pacer,
    rendered: u64,
    cursor_hidden: bool,
}

impl TerminalSink<Stdout> {
    pub fn stdout(fps: u32) -> Self {
        Self::new(io::stdout(), fps)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, fps: u32) -> Self {
        Self { out, pacer: Pacer::new(fps), rendered: 0, cursor_hidden: false }
    }

    /// Frames written so far.
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn restore_cursor(&mut self) -> io::Result<()> {
        if self.cursor_hidden {
            queue!(self.out, cursor::Show, Print("\n"))?;
            self.out.flush()?;
            self.cursor_hidden = false;
        }
        Ok(())
    }
}

impl<W: Write> FrameSink for TerminalSink<W> {
    fn accept(&mut self, frame: &AsciiFrame) -> Result<()> {
        if !self.cursor_hidden {
            queue!(self.out, cursor::Hide)?;
            self.cursor_hidden = true;
        }
        let out = &mut self.out;
        self.pacer.pace(|| -> io::Result<()> {
            queue!(out, cursor::MoveTo(0, 0), Print(frame.text()))?;
            out.flush()
        })?;
        self.rendered += 1;
        log::trace!("rendered frame {}", self.rendered);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.restore_cursor()?;
        Ok(())
    }
}

impl<W: Write> Drop for TerminalSink<W> {
    fn drop(&mut self) {
        let _ = self.restore_cursor();
    }
}

/// Persists frames as container records; nothing is rendered.
#[derive(Debug)]
pub struct FileSink<W: Write> {
    writer: ContainerWriter<W>,
}

impl FileSink<BufWriter<File>> {
    /// Create (or truncate) the destination file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FileSink<W> {
    pub fn new(inner: W) -> Self {
        Self { writer: ContainerWriter::new(inner) }
    }

    pub fn records(&self) -> u64 {
        self.writer.records()
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner()
    }
}

impl<W: Write> FrameSink for FileSink<W> {
    fn accept(&mut self, frame: &AsciiFrame) -> Result<()> {
        self.writer.append(frame.text())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
