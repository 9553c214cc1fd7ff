use std::io::{self, BufRead, Read, Seek, SeekFrom};

use mimewalk::*;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

fn read_all(mut view: SectionView) -> Vec<u8> {
    let mut out = Vec::new();
    view.read_to_end(&mut out).unwrap();
    out
}

struct FailingReader {
    served: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served >= 100 {
            return Err(io::Error::other("source went away"));
        }
        let n = buf.len().min(10);
        buf[..n].fill(b'x');
        self.served += n;
        Ok(n)
    }
}

// --- Memory backing ---

#[test]
fn test_small_body_stays_in_memory() {
    let data = b"hello".to_vec();
    let buffer = SectionBuffer::from_reader(data.as_slice(), 1024).unwrap();

    assert!(!buffer.is_spilled());
    assert_eq!(buffer.size(), 5);
    assert_eq!(read_all(buffer.view(0, buffer.size())), data);
}

#[test]
fn test_body_at_threshold_stays_in_memory() {
    let data = sample(64);
    let buffer = SectionBuffer::from_reader(data.as_slice(), 64).unwrap();

    assert!(!buffer.is_spilled());
    assert_eq!(buffer.as_bytes(), data.as_slice());
}

#[test]
fn test_empty_source() {
    let buffer = SectionBuffer::from_reader(io::empty(), 0).unwrap();
    assert!(buffer.is_empty());
    assert!(!buffer.is_spilled());
    assert!(read_all(buffer.reader()).is_empty());
}

// --- Spill backing ---

#[test]
fn test_large_body_spills_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let data = sample(200_000);
    let buffer = SectionBuffer::from_reader_in(data.as_slice(), 1024, dir.path()).unwrap();

    assert!(buffer.is_spilled());
    assert_eq!(buffer.size(), data.len() as u64);
    assert_eq!(read_all(buffer.view(0, buffer.size())), data);
}

#[test]
fn test_one_byte_over_threshold_spills() {
    let data = sample(65);
    let buffer = SectionBuffer::from_reader(data.as_slice(), 64).unwrap();

    assert!(buffer.is_spilled());
    assert_eq!(buffer.as_bytes(), data.as_slice());
}

#[test]
fn test_spill_leaves_no_named_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let data = sample(4096);
    let buffer = SectionBuffer::from_reader_in(data.as_slice(), 16, dir.path()).unwrap();

    assert!(buffer.is_spilled());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// --- Failures ---

#[test]
fn test_source_error_propagates() {
    let err = SectionBuffer::from_reader(FailingReader { served: 0 }, 1 << 20).unwrap_err();
    assert_eq!(err.to_string(), "source went away");
}

#[test]
fn test_source_error_after_spill_propagates() {
    assert!(SectionBuffer::from_reader(FailingReader { served: 0 }, 20).is_err());
}

#[test]
fn test_missing_spill_dir_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let data = sample(100);
    assert!(SectionBuffer::from_reader_in(data.as_slice(), 10, &missing).is_err());
}

// --- Views ---

#[test]
fn test_views_have_independent_cursors() {
    let data = sample(1000);
    let buffer = SectionBuffer::from_reader(data.as_slice(), 10).unwrap();
    let mut a = buffer.view(0, 1000);
    let mut b = buffer.view(0, 1000);

    let mut chunk = [0u8; 100];
    a.read_exact(&mut chunk).unwrap();
    assert_eq!(&chunk[..], &data[..100]);
    b.read_exact(&mut chunk).unwrap();
    assert_eq!(&chunk[..], &data[..100]);
    a.read_exact(&mut chunk).unwrap();
    assert_eq!(&chunk[..], &data[100..200]);
}

#[test]
fn test_view_of_subrange() {
    let data = sample(500);
    let buffer = SectionBuffer::from_reader(data.as_slice(), 1024).unwrap();
    let view = buffer.view(100, 50);

    assert_eq!(view.size(), 50);
    assert_eq!(read_all(view), &data[100..150]);
}

#[test]
fn test_view_is_clamped_to_buffer() {
    let buffer = SectionBuffer::from_vec(b"0123456789".to_vec());

    assert_eq!(read_all(buffer.view(7, 100)), b"789");
    assert!(buffer.view(50, 10).is_empty());
}

#[test]
fn test_view_seek() {
    let buffer = SectionBuffer::from_vec(b"0123456789".to_vec());
    let mut view = buffer.view(2, 6);

    assert_eq!(view.seek(SeekFrom::End(-2)).unwrap(), 4);
    let mut rest = String::new();
    view.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "67");

    view.seek(SeekFrom::Start(0)).unwrap();
    view.seek(SeekFrom::Current(1)).unwrap();
    let mut one = [0u8; 1];
    view.read_exact(&mut one).unwrap();
    assert_eq!(&one, b"3");

    assert!(view.seek(SeekFrom::Current(-10)).is_err());
}

#[test]
fn test_view_seek_past_end_reads_nothing() {
    let buffer = SectionBuffer::from_vec(b"abc".to_vec());
    let mut view = buffer.reader();
    view.seek(SeekFrom::Start(10)).unwrap();
    let mut out = Vec::new();
    assert_eq!(view.read_to_end(&mut out).unwrap(), 0);
}

#[test]
fn test_view_buf_read_lines() {
    let buffer = SectionBuffer::from_vec(b"one\ntwo\nthree".to_vec());
    let lines: Vec<String> = buffer.reader().lines().map(std::result::Result::unwrap).collect();
    assert_eq!(lines, vec!["one", "two", "three"]);
}

#[test]
fn test_read_at() {
    let buffer = SectionBuffer::from_vec(b"0123456789".to_vec());
    let mut buf = [0u8; 4];

    assert_eq!(buffer.read_at(&mut buf, 8), 2);
    assert_eq!(&buf[..2], b"89");
    assert_eq!(buffer.read_at(&mut buf, 10), 0);
}

#[test]
fn test_concurrent_reads_from_spilled_buffer() {
    let data = sample(300_000);
    let buffer = SectionBuffer::from_reader(data.as_slice(), 4096).unwrap();
    assert!(buffer.is_spilled());

    std::thread::scope(|s| {
        for i in 0..4u64 {
            let view = buffer.view(i * 50_000, 100_000);
            let expected = &data[(i * 50_000) as usize..(i * 50_000 + 100_000) as usize];
            s.spawn(move || assert_eq!(read_all(view), expected));
        }
    });
}
