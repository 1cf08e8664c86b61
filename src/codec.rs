//! Line-oriented container for rendered frames.
//!
//! Every frame is one line: the frame text, zlib-compressed, then base64
//! encoded. Lines are in playback order. There is no header, frame count or
//! checksum; the playback frame rate is chosen by whoever reads the file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::rasterizer::AsciiFrame;

/// Encode one frame as a container line, including the trailing newline.
pub fn encode_record(text: &str) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(text.len() / 4), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let compressed = encoder.finish()?;
    let mut line = STANDARD.encode(compressed);
    line.push('\n');
    Ok(line)
}

/// Decode one container line (with or without its line terminator).
pub fn decode_record(line: &str) -> Result<String> {
    let payload = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
    if payload.is_empty() {
        return Err(Error::decode("empty record"));
    }
    let compressed = STANDARD
        .decode(payload)
        .map_err(|e| Error::decode(format!("invalid base64: {}", e)))?;
    let mut text = String::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| Error::decode(format!("corrupt compressed frame: {}", e)))?;
    Ok(text)
}

/// Appends records to any writer, one per frame.
#[derive(Debug)]
pub struct ContainerWriter<W: Write> {
    inner: W,
    records: u64,
}

impl<W: Write> ContainerWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0 }
    }

    pub fn append(&mut self, text: &str) -> Result<()> {
        let line = encode_record(text)?;
        self.inner.write_all(line.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Iterates over the frames of a container, in file order.
///
/// Yields an error for the first record that fails to decode; callers are
/// expected to abort there.
#[derive(Debug)]
pub struct ContainerReader<R: BufRead> {
    inner: R,
    line: Vec<u8>,
    index: u64,
}

impl<R: BufRead> ContainerReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, line: Vec::new(), index: 0 }
    }
}

impl ContainerReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for ContainerReader<R> {
    type Item = Result<AsciiFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line.clear();
        // Raw bytes, so a line that is not UTF-8 counts as a bad record rather than an I/O error.
        match self.inner.read_until(b'\n', &mut self.line) {
            Ok(0) => None,
            Ok(_) => {
                self.index += 1;
                let index = self.index;
                Some(
                    std::str::from_utf8(&self.line)
                        .map_err(|e| Error::decode(format!("not valid UTF-8: {}", e)))
                        .and_then(decode_record)
                        .map(AsciiFrame::from_text)
                        .map_err(|e| match e {
                            Error::DecodeFailure(msg) => Error::decode(format!("record {}: {}", index, msg)),
                            other => other,
                        }),
                )
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Read a whole container; any bad record fails the entire read.
pub fn read_container(path: &Path) -> Result<Vec<AsciiFrame>> {
    ContainerReader::open(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn record_round_trip() {
        for text in ["", "@", " .:\n-=+\n*#@", "%".repeat(10_000).as_str()] {
            let line = encode_record(text).unwrap();
            assert!(line.ends_with('\n'));
            assert_eq!(line.matches('\n').count(), 1);
            assert_eq!(decode_record(&line).unwrap(), text);
        }
    }

    #[test]
    fn crlf_line_is_accepted() {
        let line = encode_record("ab\ncd").unwrap();
        let crlf = format!("{}\r\n", line.trim_end());
        assert_eq!(decode_record(&crlf).unwrap(), "ab\ncd");
    }

    #[test]
    fn bad_base64_is_a_decode_failure() {
        assert!(matches!(decode_record("!!!not base64!!!\n"), Err(Error::DecodeFailure(_))));
    }

    #[test]
    fn empty_line_is_a_decode_failure() {
        assert!(matches!(decode_record("\n"), Err(Error::DecodeFailure(_))));
    }

    #[test]
    fn bad_compressed_payload_is_a_decode_failure() {
        let line = format!("{}\n", STANDARD.encode(b"definitely not zlib"));
        assert!(matches!(decode_record(&line), Err(Error::DecodeFailure(_))));
    }

    #[test]
    fn writer_and_reader_preserve_order() {
        let mut writer = ContainerWriter::new(Vec::new());
        for text in ["one", "two", "three"] {
            writer.append(text).unwrap();
        }
        assert_eq!(writer.records(), 3);
        let bytes = writer.into_inner().unwrap();

        let frames: Vec<String> = ContainerReader::new(Cursor::new(bytes))
            .map(|f| f.unwrap().into_text())
            .collect();
        assert_eq!(frames, vec!["one", "two", "three"]);
    }

    #[test]
    fn reader_reports_failing_record_number() {
        let mut bytes = encode_record("fine").unwrap().into_bytes();
        bytes.extend_from_slice(b"garbage\n");
        let results: Vec<_> = ContainerReader::new(Cursor::new(bytes)).collect();
        assert!(results[0].is_ok());
        match &results[1] {
            Err(Error::DecodeFailure(msg)) => assert!(msg.starts_with("record 2:"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_utf8_line_is_a_decode_failure() {
        let mut bytes = encode_record("ok").unwrap().into_bytes();
        bytes.extend_from_slice(b"\xff\xfe\xfd garbage\n");
        let results: Vec<_> = ContainerReader::new(Cursor::new(bytes.clone())).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().text(), "ok");
        match &results[1] {
            Err(Error::DecodeFailure(msg)) => assert!(msg.starts_with("record 2:"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.avid");
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(read_container(&path), Err(Error::DecodeFailure(_))));
    }
}
