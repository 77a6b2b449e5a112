//! Chunk boundary planning.
//!
//! [`ChunkPlan`] maps a batch length and chunk size to the ordered windows the
//! dispatcher delivers: every full `[offset, offset + chunk_size)` window, then
//! the `[offset, len)` remainder when it is non-empty. The plan is pure and
//! holds no reference to the batch itself.

use std::iter::FusedIterator;
use std::num::NonZeroUsize;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// Exactly `chunk_size` items
    Full,
    /// The trailing `len % chunk_size` items
    Remainder,
}

/// One contiguous window of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Zero-based position of the chunk in delivery order
    pub index: usize,
    /// Item range of the chunk within the batch
    pub range: Range<usize>,
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn offset(&self) -> usize {
        self.range.start
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_remainder(&self) -> bool {
        self.kind == ChunkKind::Remainder
    }
}

/// Cursor over the chunk windows of a batch.
///
/// The plan's position is the dispatch offset: [`current`](ChunkPlan::current)
/// peeks at the window starting at the offset and [`advance`](ChunkPlan::advance)
/// moves past it. Iterating yields each window once.
///
/// # Examples
///
/// ```no_run
/// use dispatcher::ChunkPlan;
/// use std::num::NonZeroUsize;
///
/// let plan = ChunkPlan::new(100, NonZeroUsize::new(13).unwrap());
/// assert_eq!(plan.full_chunks(), 7);
/// assert_eq!(plan.remainder(), Some(91..100));
/// assert_eq!(plan.count(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    len: usize,
    chunk_size: NonZeroUsize,
    offset: usize,
    index: usize,
}

impl ChunkPlan {
    pub fn new(len: usize, chunk_size: NonZeroUsize) -> Self {
        Self {
            len,
            chunk_size,
            offset: 0,
            index: 0,
        }
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    /// Start of the next undelivered window.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total number of full windows in the batch.
    pub fn full_chunks(&self) -> usize {
        self.len / self.chunk_size.get()
    }

    /// The trailing partial window, if the chunk size does not divide the length.
    pub fn remainder(&self) -> Option<Range<usize>> {
        let start = self.full_chunks() * self.chunk_size.get();
        (start < self.len).then_some(start..self.len)
    }

    /// Whether `offset + chunk_size <= len`, i.e. a full window is still ahead.
    pub fn has_full_chunk(&self) -> bool {
        self.len - self.offset >= self.chunk_size.get()
    }

    /// The window starting at the current offset, without moving past it.
    pub fn current(&self) -> Option<Chunk> {
        let remaining = self.len - self.offset;
        if remaining == 0 {
            return None;
        }

        let (end, kind) = if remaining >= self.chunk_size.get() {
            (self.offset + self.chunk_size.get(), ChunkKind::Full)
        } else {
            (self.len, ChunkKind::Remainder)
        };

        Some(Chunk {
            index: self.index,
            range: self.offset..end,
            kind,
        })
    }

    /// Moves the offset past the current window.
    pub fn advance(&mut self) {
        if let Some(chunk) = self.current() {
            self.offset = chunk.range.end;
            self.index += 1;
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let chunk = self.current()?;
        self.advance();
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.offset).div_ceil(self.chunk_size.get());
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPlan {}

impl FusedIterator for ChunkPlan {}
