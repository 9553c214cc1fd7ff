//! Bounded section buffer
//!
//! Drains a byte stream once into an immutable store that can be read back
//! any number of times through independent views. Streams up to the
//! threshold stay in memory; longer ones spill to an anonymous temp file
//! which is memory-mapped once fully written and removed when the last
//! handle is dropped.

use std::fs::File;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::debug;

/// Default in-memory limit for a single body (1 MiB).
pub const DEFAULT_THRESHOLD: usize = 1 << 20;

#[derive(Debug)]
enum Backing {
    Memory(Vec<u8>),
    // The map keeps the unlinked file's pages reachable; the handle is held
    // so the descriptor outlives the mapping on every platform.
    Spilled { map: Mmap, _file: File },
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Memory(bytes) => bytes.as_slice(),
            Self::Spilled { map, .. } => &map[..],
        }
    }
}

/// Immutable, cheaply clonable byte store with random-access views.
#[derive(Debug, Clone)]
pub struct SectionBuffer {
    backing: Arc<Backing>,
}

impl Default for SectionBuffer {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl SectionBuffer {
    /// Wraps bytes that are already in memory.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            backing: Arc::new(Backing::Memory(bytes)),
        }
    }

    /// Reads `source` to completion, spilling to the system temp directory
    /// once more than `threshold` bytes have been seen.
    pub fn from_reader<R: Read>(source: R, threshold: usize) -> io::Result<Self> {
        Self::drain(source, threshold, None)
    }

    /// Like [`Self::from_reader`] but spills into `dir`.
    pub fn from_reader_in<R: Read>(source: R, threshold: usize, dir: &Path) -> io::Result<Self> {
        Self::drain(source, threshold, Some(dir))
    }

    fn drain<R: Read>(mut source: R, threshold: usize, dir: Option<&Path>) -> io::Result<Self> {
        let limit = u64::try_from(threshold).unwrap_or(u64::MAX).saturating_add(1);
        let mut head = Vec::new();
        source.by_ref().take(limit).read_to_end(&mut head)?;
        if head.len() <= threshold {
            return Ok(Self::from_vec(head));
        }

        let mut file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        file.write_all(&head)?;
        drop(head);
        let copied = io::copy(&mut source, &mut file)?;
        file.flush()?;
        debug!(
            threshold,
            size = limit + copied,
            "body exceeded threshold, spilled to temp file"
        );

        // SAFETY: the file is anonymous and owned by this buffer; nothing
        // else holds a handle that could truncate or rewrite it.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self {
            backing: Arc::new(Backing::Spilled { map, _file: file }),
        })
    }

    /// Total number of bytes stored.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.as_bytes().len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Whether the content lives in a temp file rather than on the heap.
    #[must_use]
    pub fn is_spilled(&self) -> bool {
        matches!(*self.backing, Backing::Spilled { .. })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    /// Returns a reader over `[offset, offset + length)`, clamped to the
    /// buffer's size. Views share the storage but not their cursor.
    #[must_use]
    pub fn view(&self, offset: u64, length: u64) -> SectionView {
        let size = self.size();
        let start = offset.min(size);
        let end = start.saturating_add(length).min(size);
        SectionView {
            buffer: self.clone(),
            start,
            len: end - start,
            pos: 0,
        }
    }

    /// Returns a view over the whole buffer.
    #[must_use]
    pub fn reader(&self) -> SectionView {
        self.view(0, self.size())
    }

    /// Copies bytes starting at `offset` into `buf` without touching any
    /// cursor; returns how many were copied.
    #[must_use]
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> usize {
        let bytes = self.as_bytes();
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= bytes.len() {
            return 0;
        }
        let n = buf.len().min(bytes.len() - start);
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        n
    }
}

/// Independent cursor over a slice of a [`SectionBuffer`].
#[derive(Debug, Clone)]
pub struct SectionView {
    buffer: SectionBuffer,
    start: u64,
    len: u64,
    pos: u64,
}

impl SectionView {
    /// Length of the viewed section.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes covered by this view, regardless of the cursor.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_bytes(&self) -> &[u8] {
        // start and len are clamped to the buffer size, which fits in usize
        let start = self.start as usize;
        &self.buffer.as_bytes()[start..start + self.len as usize]
    }

    #[allow(clippy::cast_possible_truncation)]
    fn remaining(&self) -> &[u8] {
        let pos = self.pos.min(self.len) as usize;
        &self.as_bytes()[pos..]
    }
}

impl Read for SectionView {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl BufRead for SectionView {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.remaining())
    }

    fn consume(&mut self, amt: usize) {
        self.pos = self.pos.saturating_add(amt as u64).min(self.len);
    }
}

impl Seek for SectionView {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(n) => self.len.checked_add_signed(n),
            SeekFrom::Current(n) => self.pos.checked_add_signed(n),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        self.pos = target;
        Ok(target)
    }
}
