//! Byte offsets into the template source.

use std::ops::{Index, Range};

/// A half-open byte range `m..n` of the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub m: usize,
    pub n: usize,
}

impl Span {
    /// The smallest span covering both spans.
    pub fn combine(self, other: Self) -> Self {
        Self {
            m: self.m.min(other.m),
            n: self.n.max(other.n),
        }
    }

    fn range(self) -> Range<usize> {
        self.m..self.n
    }
}

impl Index<Span> for str {
    type Output = str;

    fn index(&self, span: Span) -> &str {
        &self[span.range()]
    }
}

impl From<Range<usize>> for Span {
    fn from(Range { start, end }: Range<usize>) -> Self {
        Self { m: start, n: end }
    }
}
