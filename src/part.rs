//! One node of a message tree

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::buffer::{SectionBuffer, SectionView};
use crate::config::WalkConfig;
use crate::entity::Entity;
use crate::error::{Result, WalkError};
use crate::hash::{HASH_KEY_NAME, HashingReader};
use crate::header::Headers;

/// Media type assumed when an entity declares no `Content-Type`.
pub const DEFAULT_MEDIA_TYPE: &str = "message/rfc822";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Next process-wide part sequence number; never returns the same value
/// twice.
fn next_seq() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1
}

// RFC 2045 token "/" token
static MEDIA_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+.^_`|~-]+/[A-Za-z0-9!#$%&'*+.^_`|~-]+$").unwrap()
});

/// A parsed `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    /// Lower-cased `type/subtype`
    pub media_type: String,

    /// Parameters, keys lower-cased
    pub params: BTreeMap<String, String>,
}

impl ContentType {
    /// Parses a declared header value; `None` or a blank value yields
    /// [`DEFAULT_MEDIA_TYPE`].
    ///
    /// Returns the offending value when the media type is not of the form
    /// `type/subtype`.
    pub fn parse(value: Option<&str>) -> std::result::Result<Self, String> {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return Ok(Self {
                media_type: DEFAULT_MEDIA_TYPE.to_string(),
                params: BTreeMap::new(),
            });
        };
        let media_type = value.split(';').next().unwrap_or_default().trim();
        if !MEDIA_TYPE_REGEX.is_match(media_type) {
            return Err(value.to_string());
        }
        Ok(Self {
            media_type: media_type.to_ascii_lowercase(),
            params: mailparse::parse_content_type(value).params,
        })
    }

    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.params
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// A multipart with a declared boundary: its children carry the content.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.is_multipart() && self.boundary().is_some()
    }
}

/// A message or MIME part with its position in the tree.
///
/// `parent` holds the parent's sequence number, which is also the key of
/// the parent's node in the [`crate::Outline`] of the walk that produced
/// this part.
#[derive(Debug, Clone)]
pub struct Part<'a> {
    entity: Option<Entity<'a>>,
    body: SectionBuffer,

    /// Projected headers, plus the digest and file name stamps
    pub header: Headers,

    /// Lower-cased `type/subtype`
    pub media_type: String,

    /// `Content-Type` parameters
    pub media_params: BTreeMap<String, String>,

    /// The declared `Content-Type` value, or the default media type
    pub content_type: String,

    /// Sequence number of the parent part
    pub parent: Option<u64>,

    /// 0 for a root, parent depth + 1 otherwise
    pub depth: usize,

    /// Process-wide unique, increasing
    pub seq: u64,

    /// Sanitized file name, set when the part is handed to a visitor
    pub file_name: Option<String>,
}

impl Part<'static> {
    /// A root part: depth 0, no parent, empty body.
    #[must_use]
    pub fn root() -> Self {
        Self::blank(None, 0)
    }
}

impl<'a> Part<'a> {
    fn blank(parent: Option<u64>, depth: usize) -> Self {
        Self {
            entity: None,
            body: SectionBuffer::default(),
            header: Headers::new(),
            media_type: String::new(),
            media_params: BTreeMap::new(),
            content_type: String::new(),
            parent,
            depth,
            seq: next_seq(),
            file_name: None,
        }
    }

    /// A child of this part: one level deeper, with a fresh sequence number.
    #[must_use]
    pub fn spawn<'b>(&self) -> Part<'b> {
        Part::blank(Some(self.seq), self.depth + 1)
    }

    /// Populates the part from a parsed entity.
    ///
    /// The body is decoded, hashed and buffered in one pass. The digest is
    /// stamped as [`HASH_KEY_NAME`] unless the entity already carries one.
    pub fn with_entity<'b>(self, entity: Entity<'b>, config: &WalkConfig) -> Result<Part<'b>> {
        let declared = entity.content_type_header();
        let ctype = ContentType::parse(declared.as_deref()).map_err(|value| {
            keep_bad_input(entity, config);
            WalkError::ContentType {
                part: self.to_string(),
                value,
            }
        })?;

        let mut part = Part {
            entity: Some(entity),
            body: SectionBuffer::default(),
            header: Headers::project(entity.headers()),
            media_type: ctype.media_type,
            media_params: ctype.params,
            content_type: declared.unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
            parent: self.parent,
            depth: self.depth,
            seq: self.seq,
            file_name: self.file_name,
        };

        let body = entity.body(config.check_encoding).map_err(|source| {
            keep_bad_input(entity, config);
            WalkError::Decode {
                part: part.to_string(),
                source,
            }
        })?;
        part.buffer_body(Cursor::new(body), config)?;
        Ok(part)
    }

    /// Replaces only the body; headers and identity are kept.
    pub fn with_body<R: Read>(mut self, body: R, config: &WalkConfig) -> Result<Self> {
        self.buffer_body(body, config)?;
        Ok(self)
    }

    fn buffer_body<R: Read>(&mut self, body: R, config: &WalkConfig) -> Result<()> {
        let mut tee = HashingReader::new(body);
        let buffered = match &config.temp_dir {
            Some(dir) => SectionBuffer::from_reader_in(&mut tee, config.body_threshold, dir),
            None => SectionBuffer::from_reader(&mut tee, config.body_threshold),
        }
        .map_err(|source| WalkError::Io {
            part: self.to_string(),
            source,
        })?;
        let digest = tee.finalize();
        trace!(seq = self.seq, size = buffered.size(), %digest, "buffered body");

        self.body = buffered;
        if !self.header.contains(HASH_KEY_NAME) {
            self.header.add(HASH_KEY_NAME, digest);
        }
        Ok(())
    }

    /// The entity this part was built from.
    #[must_use]
    pub const fn entity(&self) -> Option<Entity<'a>> {
        self.entity
    }

    /// An intact view over the whole body, starting at offset 0.
    #[must_use]
    pub fn body(&self) -> SectionView {
        self.body.reader()
    }

    #[must_use]
    pub const fn body_buffer(&self) -> &SectionBuffer {
        &self.body
    }

    /// The body digest stamped on this part.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.header.get(HASH_KEY_NAME)
    }

    /// The `Content-Disposition` file name, as declared.
    #[must_use]
    pub fn declared_file_name(&self) -> Option<String> {
        self.entity.and_then(|e| e.declared_file_name())
    }
}

impl fmt::Display for Part<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self.parent.map_or_else(|| "-".to_string(), |seq| seq.to_string());
        write!(f, "{parent}:::{}", self.seq)?;
        if !self.media_type.is_empty() {
            write!(f, " {}", self.media_type)?;
            for (k, v) in &self.media_params {
                write!(f, "; {k}={v}")?;
            }
        }
        Ok(())
    }
}

/// Persists a copy of an entity that failed to parse or decode, when the
/// configuration asks for it. Failures here are logged, never returned.
pub(crate) fn keep_bad_input(entity: Entity<'_>, config: &WalkConfig) {
    if !config.save_bad_input {
        return;
    }
    match save_bad_input(&entity.raw_dump(), config) {
        Ok(path) => error!(path = %path.display(), "kept bad input"),
        Err(e) => error!(error = %e, "cannot keep bad input"),
    }
}

fn save_bad_input(raw: &[u8], config: &WalkConfig) -> std::io::Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("bad-part-").suffix(".eml");
    let mut file = match &config.temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(raw)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}
