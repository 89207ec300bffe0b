//! The literal text of a template lives in one contiguous buffer;
//! markers and components only hold offsets into it.

use crate::error::CompileError;

/// A byte range in a template's literal buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Span { start, len: end - start }
    }
    pub fn end(self) -> u32 {
        self.start + self.len
    }
    pub fn is_empty(self) -> bool {
        self.len == 0
    }
    pub fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end() as usize
    }
}

/// Builder for the literal buffer while compiling.
#[derive(Debug, Default)]
pub struct LiteralArena {
    buf: Vec<u8>,
}

impl LiteralArena {
    pub fn with_capacity(n: usize) -> Self {
        LiteralArena { buf: Vec::with_capacity(n) }
    }

    /// Current end of the buffer, i.e. the offset the next pushed
    /// byte will get.
    pub fn pos(&self) -> u32 {
        // push() keeps the length within u32
        self.buf.len() as u32
    }

    pub fn push(&mut self, b: u8) -> Result<u32, CompileError> {
        let pos = self.pos();
        if pos == u32::MAX {
            return Err(CompileError::TemplateTooLarge)
        }
        self.buf.push(b);
        Ok(pos)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Box<[u8]> {
        self.buf.into_boxed_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_span() {
        let s = Span::new(3, 7);
        assert_eq!(s.len, 4);
        assert_eq!(s.end(), 7);
        assert_eq!(s.range(), 3..7);
        assert!(Span::new(5, 5).is_empty());
    }

    #[test]
    fn t_arena() {
        let mut a = LiteralArena::with_capacity(4);
        for b in b"<p>" {
            a.push(*b).unwrap();
        }
        assert_eq!(a.pos(), 3);
        assert_eq!(&*a.freeze(), b"<p>");
    }
}
