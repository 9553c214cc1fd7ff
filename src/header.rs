//! Ordered, multi-valued header map projected from parsed headers

use std::borrow::Cow;

use mailparse::MailHeader;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Header fields in their original order, duplicates kept.
///
/// Keys are stored in canonical form (`content-type` becomes
/// `Content-Type`) and looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Projects parser headers into an ordered map.
    ///
    /// Values are unfolded but encoded words are left alone; see
    /// [`Self::decode`]. A value that is not valid UTF-8 is kept as its raw
    /// bytes, lossily converted.
    #[must_use]
    pub fn project(headers: &[MailHeader<'_>]) -> Self {
        let fields = headers
            .iter()
            .map(|h| {
                let raw = h.get_value_raw();
                let value = match std::str::from_utf8(raw) {
                    Ok(text) => unfold(text),
                    Err(_) => {
                        trace!(
                            key = %h.get_key_ref(),
                            "header value is not UTF-8, keeping raw bytes"
                        );
                        String::from_utf8_lossy(raw).into_owned()
                    }
                };
                (canonical_key(&h.get_key_ref()), value)
            })
            .collect();
        Self { fields }
    }

    /// Decodes RFC 2047 encoded words in every value, in place.
    ///
    /// Values are decoded one by one; a value that cannot be decoded is left
    /// unchanged.
    pub fn decode(&mut self) -> &mut Self {
        for (_, value) in &mut self.fields {
            let decoded = match decode_value(value) {
                Cow::Owned(decoded) => Some(decoded),
                Cow::Borrowed(_) => None,
            };
            if let Some(decoded) = decoded {
                *value = decoded;
            }
        }
        self
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Appends a value, keeping any existing ones.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.fields.push((canonical_key(key), value.into()));
    }

    /// Replaces every value of `key` with a single one, at the position of
    /// the first existing value (or at the end).
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter().position(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(first) => {
                self.fields[first].1 = value;
                let mut index = 0;
                self.fields.retain(|(k, _)| {
                    let keep = index <= first || !k.eq_ignore_ascii_case(key);
                    index += 1;
                    keep
                });
            }
            None => self.add(key, value),
        }
    }

    /// Removes every value of `key`.
    pub fn remove(&mut self, key: &str) {
        self.fields.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
    }

    #[allow(clippy::iter_without_into_iter)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Canonical MIME header key: the first letter and every letter after a
/// hyphen upper-cased, the rest lower-cased. Keys holding characters that
/// are not valid in a field name are returned unchanged.
#[must_use]
pub fn canonical_key(key: &str) -> String {
    if !key.bytes().all(is_field_name_byte) {
        return key.to_string();
    }
    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

const fn is_field_name_byte(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
        | b'`' | b'|' | b'~' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// Decodes RFC 2047 encoded words in a single header value.
///
/// Returns the input borrowed when there is nothing to decode or the value
/// cannot be re-parsed as a header.
#[must_use]
pub fn decode_value(value: &str) -> Cow<'_, str> {
    if !value.contains("=?") {
        return Cow::Borrowed(value);
    }
    let line = format!("X: {value}\r\n");
    match mailparse::parse_header(line.as_bytes()) {
        Ok((header, _)) => Cow::Owned(header.get_value()),
        Err(e) => {
            trace!(error = %e, "cannot decode header value, keeping it as is");
            Cow::Borrowed(value)
        }
    }
}

/// Joins folded lines: CRLF (or LF) followed by whitespace becomes a single
/// space.
fn unfold(text: &str) -> String {
    if !text.contains('\n') {
        return text.trim().to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        let line = line.trim_end_matches('\r');
        if i == 0 {
            out.push_str(line.trim_end());
        } else {
            let rest = line.trim();
            if !rest.is_empty() {
                out.push(' ');
                out.push_str(rest);
            }
        }
    }
    out.trim().to_string()
}
