//! Reusable decode target for the baseline-image codec.
//!
//! The buffer only ever grows: it keeps the largest size requested so
//! far, so a steady stream of same-sized frames never reallocates.
//! Peak memory is bounded by the largest frame seen in the session.

#[derive(Debug, Default)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow exactly `len` bytes, growing the backing storage if needed.
    /// Contents are whatever the previous decode left behind.
    pub fn acquire(&mut self, len: usize) -> &mut [u8] {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
        &mut self.buf[..len]
    }

    /// Bytes currently held.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_but_never_shrinks() {
        let mut s = ScratchBuffer::new();
        assert_eq!(s.acquire(16).len(), 16);
        assert_eq!(s.acquire(4).len(), 4);
        assert_eq!(s.capacity(), 16);
        s.acquire(64);
        assert_eq!(s.capacity(), 64);
    }
}
