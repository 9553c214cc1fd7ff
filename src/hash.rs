//! Content digests for part bodies

use std::io::{self, Read};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha512_224};

/// Header carrying the digest of a part body.
pub const HASH_KEY_NAME: &str = "X-HashOfFullMessage";

/// Length of the raw digest in bytes (224 bits).
pub const DIGEST_LEN: usize = 28;

/// Returns the digest of `data` rendered as URL-safe base64 without padding.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Incremental SHA-512/224 hasher producing the same string as [`hash_bytes`].
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha512_224,
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consumes the hasher and renders the digest.
    #[must_use]
    pub fn finalize(self) -> String {
        URL_SAFE_NO_PAD.encode(self.inner.finalize())
    }
}

/// Reader that hashes every byte it hands out.
///
/// Wrapping a body source in this while it is copied into a
/// [`crate::SectionBuffer`] yields the digest without a second pass.
#[derive(Debug)]
pub struct HashingReader<R> {
    inner: R,
    hasher: ContentHasher,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    /// Returns the digest of everything read so far.
    #[must_use]
    pub fn finalize(self) -> String {
        self.hasher.finalize()
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
