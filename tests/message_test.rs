use std::io::{self, Read};
use std::ops::ControlFlow;

use mimewalk::*;

const RAW: &[u8] = b"From: sender@example.com\r\n\
    Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
    \r\n\
    --outer\r\n\
    Content-Type: text/plain\r\n\
    \r\n\
    hello\r\n\
    --outer--\r\n";

fn bodies(message: &Message) -> Vec<(String, Vec<u8>)> {
    let mut seen = Vec::new();
    message
        .walk(&WalkConfig::default(), false, |part| {
            let mut body = Vec::new();
            part.body().read_to_end(&mut body)?;
            seen.push((part.media_type.clone(), body));
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
    seen
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("header source gone"))
    }
}

// --- From a stream ---

#[test]
fn test_from_reader_matches_bytes() {
    let message = Message::from_reader(RAW).unwrap();
    assert_eq!(message.as_bytes(), RAW);
    assert_eq!(message, Message::from(RAW.to_vec()));

    let seen = bodies(&message);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "text/plain");
    assert_eq!(seen[0].1, b"hello");
}

#[test]
fn test_from_reader_error() {
    let result = Message::from_reader(FailingReader);
    assert!(matches!(result, Err(WalkError::Read(_))));
}

#[test]
fn test_parse() {
    let message = Message::from_bytes(RAW.to_vec());
    let parsed = message.parse().unwrap();
    assert_eq!(parsed.subparts.len(), 1);
}

// --- From headers and a body ---

#[test]
fn test_from_headers_writes_fields_in_order() {
    let mut headers = Headers::new();
    headers.add("subject", "first");
    headers.add("x-tag", "a");
    headers.add("x-tag", "b");
    let message = Message::from_headers(&headers, &b"body"[..]).unwrap();

    assert_eq!(
        message.into_bytes(),
        b"Subject: first\r\nX-Tag: a\r\nX-Tag: b\r\n\r\nbody".to_vec()
    );
}

#[test]
fn test_from_headers_lowercases_transfer_encoding() {
    let mut headers = Headers::new();
    headers.add("Content-Type", "text/plain");
    headers.add("Content-Transfer-Encoding", "BASE64");
    let message = Message::from_headers(&headers, &b"aGVsbG8="[..]).unwrap();

    let mut encodings = Vec::new();
    let mut decoded = Vec::new();
    message
        .walk(&WalkConfig::default(), false, |part| {
            encodings.push(part.header.get("Content-Transfer-Encoding").map(str::to_string));
            part.body().read_to_end(&mut decoded)?;
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();

    assert_eq!(encodings, vec![Some("base64".to_string())]);
    assert_eq!(decoded, b"hello");
}

#[test]
fn test_from_readers() {
    let header = b"Subject: split\r\nContent-Type: text/html\r\n\r\n";
    let message = Message::from_readers(&header[..], &b"<p>hi</p>"[..]).unwrap();

    let seen = bodies(&message);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "text/html");
    assert_eq!(seen[0].1, b"<p>hi</p>");
}

#[test]
fn test_from_readers_without_blank_line() {
    let header = b"Content-Type: text/plain\r\n";
    let message = Message::from_readers(&header[..], &b"body"[..]).unwrap();
    assert_eq!(message.as_bytes(), b"Content-Type: text/plain\r\n\r\nbody");
}

#[test]
fn test_from_readers_header_error() {
    let result = Message::from_readers(FailingReader, &b"body"[..]);
    assert!(matches!(result, Err(WalkError::Read(_))));
}
