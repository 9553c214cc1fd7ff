//! Thin adapter over `mailparse` entities
//!
//! The parser does the RFC 5322/2045 work; this module only exposes the
//! pieces the walker needs: header accessors, the transfer-decoded body,
//! and the child entities in order.

use mailparse::body::Body;
use mailparse::{MailHeader, MailHeaderMap, MailParseError, ParsedMail};
use tracing::warn;

/// Parses a complete message.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMail<'_>, MailParseError> {
    mailparse::parse_mail(raw)
}

/// Borrowed handle on one parsed message or MIME part.
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    mail: &'a ParsedMail<'a>,
}

impl<'a> Entity<'a> {
    #[must_use]
    pub const fn new(mail: &'a ParsedMail<'a>) -> Self {
        Self { mail }
    }

    /// The underlying parsed entity.
    #[must_use]
    pub const fn parsed(&self) -> &'a ParsedMail<'a> {
        self.mail
    }

    #[must_use]
    pub fn headers(&self) -> &'a [MailHeader<'a>] {
        &self.mail.headers
    }

    /// The declared `Content-Type` value, if any. A blank value counts as
    /// undeclared.
    #[must_use]
    pub fn content_type_header(&self) -> Option<String> {
        self.mail
            .headers
            .get_first_value("Content-Type")
            .filter(|value| !value.trim().is_empty())
    }

    /// The `filename` parameter of `Content-Disposition`, if declared and
    /// non-empty.
    #[must_use]
    pub fn declared_file_name(&self) -> Option<String> {
        self.mail.headers.get_first_header("Content-Disposition")?;
        self.mail
            .get_content_disposition()
            .params
            .get("filename")
            .filter(|name| !name.is_empty())
            .cloned()
    }

    /// Sub-entities in declaration order.
    pub fn children(&self) -> impl Iterator<Item = Entity<'a>> + use<'a> {
        self.mail.subparts.iter().map(Entity::new)
    }

    /// The body with its transfer encoding reversed.
    ///
    /// A multipart body is returned as written, boundaries and all. With
    /// `check_encoding` a body that does not decode is an error; without it
    /// the still-encoded bytes are returned instead.
    ///
    /// The whole body is materialized here; `mailparse` has no incremental
    /// decoder.
    pub fn body(&self, check_encoding: bool) -> Result<Vec<u8>, MailParseError> {
        if self.is_multipart() {
            return Ok(self.raw_body().to_vec());
        }
        match self.mail.get_body_raw() {
            Ok(body) => Ok(body),
            Err(e) if check_encoding => Err(e),
            Err(e) => {
                warn!(error = %e, "body does not decode, keeping it encoded");
                Ok(self.encoded_body())
            }
        }
    }

    fn encoded_body(&self) -> Vec<u8> {
        match self.mail.get_body_encoded() {
            Body::Base64(body) | Body::QuotedPrintable(body) => body.get_raw().to_vec(),
            Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().to_vec(),
            Body::Binary(body) => body.get_raw().to_vec(),
        }
    }

    /// The entity exactly as it appeared in the message, for keeping a copy
    /// of bad input.
    #[must_use]
    pub fn raw_dump(&self) -> Vec<u8> {
        self.mail.raw_bytes.to_vec()
    }

    fn is_multipart(&self) -> bool {
        self.mail.ctype.mimetype.starts_with("multipart/")
    }

    // Bytes after the header block. For a multipart the parser's own body
    // stops at the first boundary.
    fn raw_body(&self) -> &'a [u8] {
        let header_len = self.mail.get_headers().get_raw_bytes().len();
        &self.mail.raw_bytes[header_len..]
    }
}
