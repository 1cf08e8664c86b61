//! Splits the decoder's byte stream into complete encoded images.
//!
//! ffmpeg's `image2pipe` output is a plain concatenation of image files, and
//! pipe reads return whatever happens to be available. The scanner works on
//! an accumulating buffer: it hands out every complete frame it can find and
//! compacts the buffer down to the bytes of the unfinished trailing frame.

/// Byte sequences that open and close one encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMarkers {
    pub start: &'static [u8],
    pub end: &'static [u8],
}

/// PNG signature and the `IEND` chunk (type + CRC) that terminates every PNG.
pub const PNG_MARKERS: FrameMarkers = FrameMarkers {
    start: b"\x89PNG\r\n\x1a\n",
    end: b"IEND\xAE\x42\x60\x82",
};

/// JPEG start-of-image and end-of-image markers.
pub const JPEG_MARKERS: FrameMarkers = FrameMarkers {
    start: &[0xFF, 0xD8, 0xFF],
    end: &[0xFF, 0xD9],
};

/// Outcome of one [`BoundaryScanner::scan`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Complete frames handed to the callback
    pub frames: usize,
    /// Stray bytes dropped because they preceded a start marker
    pub discarded: usize,
}

/// Stateful frame splitter for one byte stream.
///
/// Remembers how far the unterminated frame at the head of the buffer has
/// already been searched, so a frame arriving over many reads is scanned once.
/// Use one scanner per buffer, or [`BoundaryScanner::reset`] before reusing it.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryScanner {
    markers: FrameMarkers,
    /// Bytes after the head frame's start marker known not to begin an end marker
    resume: usize,
}

impl BoundaryScanner {
    pub fn new(markers: FrameMarkers) -> Self {
        debug_assert!(!markers.start.is_empty() && !markers.end.is_empty());
        Self { markers, resume: 0 }
    }

    pub fn markers(&self) -> FrameMarkers {
        self.markers
    }

    /// Forget the search position, e.g. after the buffer was cleared.
    pub fn reset(&mut self) {
        self.resume = 0;
    }

    /// Extract every complete frame from `buffer`, in order.
    ///
    /// Each frame is the inclusive span from a start marker to the end of the
    /// next end marker. Bytes before a start marker are dropped. On return
    /// `buffer` holds only what may still become a frame: an unterminated
    /// frame, or a tail that could be the beginning of a split start marker.
    ///
    /// An error from `on_frame` stops the scan and is returned as is.
    pub fn scan<E, F>(&mut self, buffer: &mut Vec<u8>, mut on_frame: F) -> Result<ScanReport, E>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        let FrameMarkers { start: open, end: close } = self.markers;
        let mut report = ScanReport::default();
        let mut pos = 0usize;
        let mut resume = std::mem::take(&mut self.resume);

        let outcome = loop {
            let rest = &buffer[pos..];
            let Some(offset) = find(rest, open) else {
                let keep = partial_prefix_len(rest, open);
                report.discarded += rest.len() - keep;
                pos = buffer.len() - keep;
                break Ok(());
            };
            report.discarded += offset;
            pos += offset;

            let body = pos + open.len();
            // Only the frame left at the head by the previous call was searched before.
            let skip = if pos == 0 { resume.min(buffer.len() - body) } else { 0 };
            resume = 0;
            let Some(end) = find(&buffer[body + skip..], close) else {
                // An end marker may straddle the next read.
                self.resume = (buffer.len() - body).saturating_sub(close.len() - 1);
                break Ok(());
            };
            let frame_end = body + skip + end + close.len();

            if let Err(e) = on_frame(&buffer[pos..frame_end]) {
                break Err(e);
            }
            report.frames += 1;
            pos = frame_end;
        };

        buffer.drain(..pos);
        outcome.map(|()| report)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest suffix of `haystack` that is a proper prefix of `needle`.
fn partial_prefix_len(haystack: &[u8], needle: &[u8]) -> usize {
    let max = needle.len().saturating_sub(1).min(haystack.len());
    (1..=max)
        .rev()
        .find(|&k| haystack.ends_with(&needle[..k]))
        .unwrap_or(0)
}
