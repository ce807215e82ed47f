/// Fixed-capacity byte sink over a caller-owned slice.
///
/// The buffer never grows: callers size the slice up front with
/// [`varint_size_in_bytes`] and [`utf8_size_in_bytes`]. Writing past the end
/// of the slice panics.
pub struct WriteBuffer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteBuffer<'a> {
    /// Start writing at `pos` within `buf`.
    pub fn new(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current write position, as an absolute offset into the underlying slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn write_byte(&mut self, byte: u8) -> &mut Self {
        self.buf[self.pos] = byte;
        self.pos += 1;
        self
    }

    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        self
    }

    /// LEB128: seven bits per byte, least significant group first.
    pub fn write_varint(&mut self, mut value: u64) -> &mut Self {
        while value >= 0x80 {
            self.write_byte((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.write_byte(value as u8)
    }

    pub fn write_u64_le(&mut self, value: u64) -> &mut Self {
        self.write(&value.to_le_bytes())
    }

    pub fn write_utf8(&mut self, value: &str) -> &mut Self {
        self.write(value.as_bytes())
    }
}

/// Number of bytes [`WriteBuffer::write_varint`] emits for `value`.
pub fn varint_size_in_bytes(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Number of bytes [`WriteBuffer::write_utf8`] emits for `value`.
pub fn utf8_size_in_bytes(value: &str) -> usize {
    value.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(value: u64) -> Vec<u8> {
        let mut out = vec![0u8; varint_size_in_bytes(value)];
        let mut b = WriteBuffer::new(&mut out, 0);
        b.write_varint(value);
        let written = b.pos();
        assert_eq!(written, out.len());
        out
    }

    #[test]
    fn varint_sizes() {
        assert_eq!(varint_size_in_bytes(0), 1);
        assert_eq!(varint_size_in_bytes(127), 1);
        assert_eq!(varint_size_in_bytes(128), 2);
        assert_eq!(varint_size_in_bytes(16_383), 2);
        assert_eq!(varint_size_in_bytes(16_384), 3);
        assert_eq!(varint_size_in_bytes(2_097_152), 4);
        assert_eq!(varint_size_in_bytes(u32::MAX as u64), 5);
        assert_eq!(varint_size_in_bytes(u64::MAX), 10);
    }

    #[test]
    fn varint_bytes() {
        assert_eq!(varint(0), [0x00]);
        assert_eq!(varint(1), [0x01]);
        assert_eq!(varint(150), [0x96, 0x01]);
        assert_eq!(varint(300), [0xac, 0x02]);
        assert_eq!(varint(207_000), [0x98, 0xd1, 0x0c]);
        assert_eq!(
            varint(u64::MAX),
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn utf8_size_counts_bytes_not_chars() {
        assert_eq!(utf8_size_in_bytes(""), 0);
        assert_eq!(utf8_size_in_bytes("12345678"), 8);
        assert_eq!(utf8_size_in_bytes("个人信息服务"), 18);
        assert_eq!(utf8_size_in_bytes("🍻"), 4);
    }

    #[test]
    fn writes_at_offset() {
        let mut out = [0xeeu8; 12];
        let mut b = WriteBuffer::new(&mut out, 2);
        b.write_byte(0x09).write_u64_le(0x0102030405060708);
        assert_eq!(b.pos(), 11);
        assert_eq!(
            out,
            [0xee, 0xee, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0xee]
        );
    }

    #[test]
    #[should_panic]
    fn overrun_panics() {
        let mut out = [0u8; 2];
        WriteBuffer::new(&mut out, 0).write_utf8("abc");
    }
}
