//! Bounds-checked byte cursors.
//!
//! Codecs never see raw pointers: decoding reads through a [`ReadCursor`]
//! and encoding writes through a [`WriteCursor`]. Both advance sequentially
//! and fail instead of reading or writing out of bounds.

use crate::CodecError;

/// Sequential reader over an input buffer.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ReadCursor { data, pos: 0 }
    }

    /// Start reading at `offset`.
    ///
    /// An offset past the end of the buffer is an underrun: there is not even
    /// an empty tail to read from.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        if offset > data.len() {
            return Err(CodecError::BufferUnderrun {
                needed: offset,
                remaining: data.len(),
            });
        }
        Ok(ReadCursor { data, pos: offset })
    }

    /// Absolute position inside the underlying buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The unread tail, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Consume `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::BufferUnderrun {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Mark `len` bytes of the tail as consumed after reading them via [`rest`](Self::rest).
    pub fn advance(&mut self, len: usize) -> Result<(), CodecError> {
        self.take(len).map(|_| ())
    }
}

/// Sequential writer over a pre-sized output buffer.
#[derive(Debug)]
pub struct WriteCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        WriteCursor { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let available = self.remaining();
        if bytes.len() > available {
            return Err(CodecError::BufferOverrun {
                needed: bytes.len(),
                available,
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn put_u8(&mut self, byte: u8) -> Result<(), CodecError> {
        self.put(&[byte])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_cursor_takes_in_order() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = ReadCursor::at(&data, 1).unwrap();

        assert_eq!(cursor.remaining(), 4);
        assert_eq!(cursor.take(2).unwrap(), &[2, 3]);
        assert_eq!(cursor.take_array::<2>().unwrap(), [4, 5]);
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn read_cursor_underrun() {
        let data = [1u8, 2];
        let mut cursor = ReadCursor::new(&data);

        assert_eq!(
            cursor.take(3),
            Err(CodecError::BufferUnderrun {
                needed: 3,
                remaining: 2
            })
        );
        // a failed take does not consume anything
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    fn read_cursor_offset_past_end() {
        let data = [0u8; 4];
        assert!(ReadCursor::at(&data, 4).is_ok());
        assert!(matches!(
            ReadCursor::at(&data, 5),
            Err(CodecError::BufferUnderrun { .. })
        ));
    }

    #[test]
    fn write_cursor_overrun() {
        let mut buf = [0u8; 3];
        let mut cursor = WriteCursor::new(&mut buf);

        cursor.put(&[9, 8]).unwrap();
        assert_eq!(
            cursor.put(&[7, 6]),
            Err(CodecError::BufferOverrun {
                needed: 2,
                available: 1
            })
        );
        cursor.put_u8(7).unwrap();
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(buf, [9, 8, 7]);
    }
}
