//! Container files: writing, replaying and inspecting them.

use asciivid::error::Error;
use asciivid::{
    play_records, read_container, AsciiPlayer, ContainerWriter, FileSink, Pipeline, ReaderSource, Settings,
    TerminalSink,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Write};
use std::path::Path;

fn write_container(path: &Path, frames: &[&str]) {
    let mut writer = ContainerWriter::new(File::create(path).unwrap());
    for text in frames {
        writer.append(text).unwrap();
    }
    writer.into_inner().unwrap();
}

fn png(width: u32, height: u32, luma: u8) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([luma])))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn play_renders_every_record_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three.avid");
    write_container(&path, &["AAA\nAAA", "BBB\nBBB", "CCC\nCCC"]);

    let mut sink = TerminalSink::new(Vec::new(), 1000);
    let played = play_records(BufReader::new(File::open(&path).unwrap()), &mut sink).unwrap();
    assert_eq!(played, 3);
    assert_eq!(sink.rendered(), 3);

    let out = String::from_utf8(sink.get_ref().clone()).unwrap();
    let positions: Vec<usize> = ["AAA\nAAA", "BBB\nBBB", "CCC\nCCC"]
        .iter()
        .map(|f| out.find(f).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn corrupt_record_stops_playback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.avid");
    write_container(&path, &["one"]);
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"%%% not base64 %%%\n").unwrap();
    drop(file);

    let mut sink = TerminalSink::new(Vec::new(), 1000);
    let err = play_records(BufReader::new(File::open(&path).unwrap()), &mut sink).unwrap_err();
    assert!(matches!(err, Error::DecodeFailure(_)));
    assert_eq!(sink.rendered(), 1);

    assert!(matches!(read_container(&path), Err(Error::DecodeFailure(_))));
}

#[test]
fn info_reports_frames_and_grid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.avid");
    write_container(&path, &["abcd\nefgh\nijkl", "mnop\nqrst\nuvwx"]);

    let info = AsciiPlayer::new().info(&path).unwrap();
    assert_eq!(info.frames, 2);
    assert_eq!((info.columns, info.rows), (4, 3));
}

#[test]
fn info_on_corrupt_file_keeps_the_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.avid");
    fs::write(&path, "\n").unwrap();

    let err = AsciiPlayer::new().info(&path).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DecodeFailure(_))), "{err:#}");
}

#[test]
fn binary_garbage_is_a_corrupt_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binary.avid");
    write_container(&path, &["ok"]);
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"\xff\xfe\xfd garbage\n").unwrap();
    drop(file);

    let mut sink = TerminalSink::new(Vec::new(), 1000);
    let err = play_records(BufReader::new(File::open(&path).unwrap()), &mut sink).unwrap_err();
    assert!(matches!(err, Error::DecodeFailure(_)), "{err}");
    assert_eq!(sink.rendered(), 1);

    let err = AsciiPlayer::new().info(&path).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DecodeFailure(_))), "{err:#}");
}

#[test]
fn encoded_stream_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.avid");
    let settings = Settings::default().with_blocks(2, 2).with_palette(" #");

    let stream = [png(4, 2, 255), png(4, 2, 0)].concat();
    let mut pipeline = Pipeline::new(&settings).unwrap();
    let mut sink = FileSink::create(&path).unwrap();
    let count = pipeline.run(&mut ReaderSource::new(Cursor::new(stream)), &mut sink).unwrap();
    assert_eq!(count, 2);
    drop(sink);

    let frames: Vec<String> = read_container(&path).unwrap().into_iter().map(|f| f.into_text()).collect();
    assert_eq!(frames, vec!["##", "  "]);
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
}

#[test]
fn missing_source_is_reported_after_creating_the_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.avid");
    let err = AsciiPlayer::new()
        .encode(&dir.path().join("missing.mp4"), &dest, &Settings::default())
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SourceNotFound(_))), "{err:#}");
    assert!(dest.exists());
}

#[test]
fn unwritable_destination_fails_before_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("no/such/dir/out.avid");
    let err = AsciiPlayer::new()
        .encode(&dir.path().join("missing.mp4"), &dest, &Settings::default())
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Io(_))), "{err:#}");
}

#[test]
fn play_rejects_zero_fps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.avid");
    write_container(&path, &["x"]);
    assert!(AsciiPlayer::new().play(&path, 0).is_err());
}
