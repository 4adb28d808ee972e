//! Primitives for the canonical binary ("forged") encoding of operations.
//!
//! Natural numbers use the zarith encoding: little-endian groups of 7 bits with
//! the high bit of every byte but the last set. Signed integers reserve bit 6 of
//! the first byte for the sign.
use super::Base58Error;
use thiserror::Error;

/// Error thrown while forging or unforging binary data
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Input ended before a complete value was read
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),
    /// An unknown tag byte was encountered
    #[error("invalid {what} tag 0x{tag:02x}")]
    InvalidTag { what: &'static str, tag: u8 },
    /// A zarith number does not fit in the target integer
    #[error("integer overflow while decoding zarith number")]
    Overflow,
    /// Bytes were left over after a complete value was decoded
    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),
    /// A string field was not valid UTF-8
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    /// A base58 field (branch, address, key) could not be decoded
    #[error(transparent)]
    Base58(#[from] Base58Error),
    /// The value cannot be represented in the binary format
    #[error("{0}")]
    InvalidValue(String),
}

/// Appends `value` as a zarith natural number.
pub fn write_zarith(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return
        }
        out.push(byte | 0x80);
    }
}

/// Appends `value` as a zarith signed integer.
pub fn write_zarith_signed(out: &mut Vec<u8>, value: i128) {
    let mut abs = value.unsigned_abs();
    let mut first = (abs & 0x3f) as u8;
    if value < 0 {
        first |= 0x40;
    }
    abs >>= 6;
    if abs != 0 {
        first |= 0x80;
    }
    out.push(first);
    while abs != 0 {
        let mut byte = (abs & 0x7f) as u8;
        abs >>= 7;
        if abs != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}

/// Appends `bytes` behind a 4 byte big-endian length.
pub fn write_dynamic(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), ForgeError> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| ForgeError::InvalidValue("field exceeds 4 GiB".to_owned()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Appends an optional-field marker: `0xff` when present, `0x00` otherwise.
pub fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(if value { 0xff } else { 0x00 });
}

/// Cursor over forged bytes.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current offset into the input
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, ForgeError> {
        let byte = *self.bytes.get(self.pos).ok_or(ForgeError::UnexpectedEnd(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ForgeError> {
        let end = self.pos.checked_add(len).ok_or(ForgeError::UnexpectedEnd(self.pos))?;
        let slice = self.bytes.get(self.pos..end).ok_or(ForgeError::UnexpectedEnd(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ForgeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads an optional-field marker written by [`write_bool`]
    pub fn read_bool(&mut self) -> Result<bool, ForgeError> {
        match self.read_u8()? {
            0x00 => Ok(false),
            0xff => Ok(true),
            tag => Err(ForgeError::InvalidTag { what: "boolean", tag }),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, ForgeError> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    /// Reads a field written by [`write_dynamic`]
    pub fn read_dynamic(&mut self) -> Result<&'a [u8], ForgeError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub fn read_zarith(&mut self) -> Result<u64, ForgeError> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let bits = u64::from(byte & 0x7f);
            if shift >= 64 || (shift > 0 && bits >> (64 - shift) != 0) {
                return Err(ForgeError::Overflow)
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value)
            }
            shift += 7;
        }
    }

    pub fn read_zarith_signed(&mut self) -> Result<i128, ForgeError> {
        let first = self.read_u8()?;
        let negative = first & 0x40 != 0;
        let mut abs = u128::from(first & 0x3f);
        let mut more = first & 0x80 != 0;
        let mut shift = 6u32;
        while more {
            let byte = self.read_u8()?;
            let bits = u128::from(byte & 0x7f);
            if shift >= 128 || bits >> (128 - shift) != 0 {
                return Err(ForgeError::Overflow)
            }
            abs |= bits << shift;
            more = byte & 0x80 != 0;
            shift += 7;
        }
        if negative {
            // i128::MIN has no positive counterpart
            if abs > i128::MAX as u128 + 1 {
                return Err(ForgeError::Overflow)
            }
            Ok((abs as i128).wrapping_neg())
        } else {
            i128::try_from(abs).map_err(|_| ForgeError::Overflow)
        }
    }

    /// Fails if any input is left unread.
    pub fn finish(self) -> Result<(), ForgeError> {
        match self.bytes.len().saturating_sub(self.pos) {
            0 => Ok(()),
            left => Err(ForgeError::TrailingBytes(left)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zarith(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_zarith(&mut out, value);
        out
    }

    #[test]
    fn zarith_known_values() {
        assert_eq!(zarith(0), vec![0x00]);
        assert_eq!(zarith(127), vec![0x7f]);
        assert_eq!(zarith(128), vec![0x80, 0x01]);
        assert_eq!(zarith(10_000), vec![0x90, 0x4e]);
        assert_eq!(zarith(1_420), vec![0x8c, 0x0b]);
    }

    #[test]
    fn zarith_extremes_decode() {
        let bytes = zarith(u64::MAX);
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_zarith().unwrap(), u64::MAX);
        reader.finish().unwrap();

        let too_big = [0xff; 11];
        assert!(matches!(Reader::new(&too_big).read_zarith(), Err(ForgeError::Overflow)));
    }

    #[test]
    fn signed_zarith_known_values() {
        let encode = |value| {
            let mut out = Vec::new();
            write_zarith_signed(&mut out, value);
            out
        };
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(-1), vec![0x41]);
        assert_eq!(encode(63), vec![0x3f]);
        assert_eq!(encode(64), vec![0x80, 0x01]);
        assert_eq!(encode(-64), vec![0xc0, 0x01]);

        for value in [i128::MIN, -1_000_000, 42, i128::MAX] {
            let bytes = encode(value);
            assert_eq!(Reader::new(&bytes).read_zarith_signed().unwrap(), value);
        }
    }

    #[test]
    fn reader_reports_truncation_and_trailing_bytes() {
        let mut reader = Reader::new(&[0x80]);
        assert!(matches!(reader.read_zarith(), Err(ForgeError::UnexpectedEnd(1))));

        let mut reader = Reader::new(&[0x00, 0x01]);
        reader.read_u8().unwrap();
        assert!(matches!(reader.finish(), Err(ForgeError::TrailingBytes(1))));

        assert!(matches!(
            Reader::new(&[0x01]).read_bool(),
            Err(ForgeError::InvalidTag { what: "boolean", tag: 0x01 })
        ));
    }
}
