//! Owned raw messages
//!
//! A [`Message`] holds the bytes every [`crate::Entity`] of a walk borrows
//! from. It can be read from a stream, or assembled from a header block and
//! a body that arrive separately.

use std::io::Read;

use mailparse::ParsedMail;

use crate::config::WalkConfig;
use crate::entity::parse_message;
use crate::error::{Result, WalkError};
use crate::header::Headers;
use crate::part::Part;
use crate::walker::{Outline, VisitResult, walk_message};

/// Most bytes [`Message::from_readers`] reads from a header source.
pub const MAX_HEADER_BLOCK: u64 = 1 << 20;

const TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";

/// A complete raw message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    raw: Vec<u8>,
}

impl Message {
    #[must_use]
    pub const fn from_bytes(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Reads a complete message up to the end of `source`.
    pub fn from_reader<R: Read>(mut source: R) -> Result<Self> {
        let mut raw = Vec::new();
        source.read_to_end(&mut raw)?;
        Ok(Self { raw })
    }

    /// Assembles a message from header fields and a body.
    ///
    /// Fields are written in order. `Content-Transfer-Encoding` values are
    /// lower-cased.
    pub fn from_headers<R: Read>(headers: &Headers, mut body: R) -> Result<Self> {
        let mut raw = Vec::new();
        for (key, value) in headers.iter() {
            raw.extend_from_slice(key.as_bytes());
            raw.extend_from_slice(b": ");
            if key.eq_ignore_ascii_case(TRANSFER_ENCODING) {
                raw.extend_from_slice(value.trim().to_ascii_lowercase().as_bytes());
            } else {
                raw.extend_from_slice(value.as_bytes());
            }
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n");
        body.read_to_end(&mut raw)?;
        Ok(Self { raw })
    }

    /// Assembles a message from a header block and a body read from
    /// separate sources. At most [`MAX_HEADER_BLOCK`] bytes of `header` are
    /// read.
    pub fn from_readers<H: Read, B: Read>(header: H, body: B) -> Result<Self> {
        let mut block = Vec::new();
        header.take(MAX_HEADER_BLOCK).read_to_end(&mut block)?;
        let (fields, _) = mailparse::parse_headers(&block)?;
        Self::from_headers(&Headers::project(&fields), body)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }

    pub fn parse(&self) -> Result<ParsedMail<'_>> {
        parse_message(&self.raw).map_err(WalkError::from)
    }

    /// Same as [`walk_message`] over the held bytes.
    pub fn walk<F>(&self, config: &WalkConfig, stop_at_top_level: bool, visit: F) -> Result<Outline>
    where
        F: FnMut(&Part<'_>) -> VisitResult,
    {
        walk_message(&self.raw, config, stop_at_top_level, visit)
    }
}

impl From<Vec<u8>> for Message {
    fn from(raw: Vec<u8>) -> Self {
        Self::from_bytes(raw)
    }
}
