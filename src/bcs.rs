//! Canonical binary encoding (BCS) for the protocol data model.
//!
//! Fixed-width little-endian integers, ULEB128 length prefixes and enum tags,
//! structs as their fields in declaration order. Every value has exactly one
//! valid encoding, so decoding rejects non-canonical input.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::BcsError;

/// Sequences longer than this cannot be encoded.
pub const MAX_SEQUENCE_LENGTH: usize = (1 << 31) - 1;

/// Nesting limit for recursive types such as `TypeTag`.
pub const MAX_CONTAINER_DEPTH: usize = 500;

/// A value with a canonical byte layout.
pub trait BcsEncode {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError>;
}

/// A value that can be read back from its canonical byte layout.
pub trait BcsDecode: Sized {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError>;
}

/// Serialize a value.
pub fn to_bytes<T: BcsEncode + ?Sized>(value: &T) -> Result<Vec<u8>, BcsError> {
    let mut w = BcsWriter::new();
    value.encode(&mut w)?;
    Ok(w.into_bytes())
}

/// Serialize a value, failing with [`BcsError::SizeExceeded`] when the
/// output is larger than `max` bytes.
pub fn to_bytes_with_limit<T: BcsEncode + ?Sized>(
    value: &T,
    max: usize,
) -> Result<Vec<u8>, BcsError> {
    let bytes = to_bytes(value)?;
    if bytes.len() > max {
        return Err(BcsError::SizeExceeded {
            size: bytes.len(),
            max,
        });
    }
    Ok(bytes)
}

/// Deserialize a value, rejecting trailing bytes.
pub fn from_bytes<T: BcsDecode>(bytes: &[u8]) -> Result<T, BcsError> {
    let mut r = BcsReader::new(bytes);
    let value = T::decode(&mut r)?;
    r.finish()?;
    Ok(value)
}

#[derive(Debug, Default)]
pub struct BcsWriter {
    buf: Vec<u8>,
}

impl BcsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), BcsError> {
        self.buf.push(v);
        Ok(())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), BcsError> {
        self.write_u8(v as u8)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), BcsError> {
        self.buf.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), BcsError> {
        self.buf.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), BcsError> {
        self.buf.write_u64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u128(&mut self, v: u128) -> Result<(), BcsError> {
        self.buf.write_u128::<LittleEndian>(v)?;
        Ok(())
    }

    /// Raw bytes with no length prefix (fixed arrays).
    pub fn write_fixed(&mut self, bytes: &[u8]) -> Result<(), BcsError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_uleb128(&mut self, mut val: u64) -> Result<(), BcsError> {
        loop {
            let mut byte = (val & 0x7F) as u8;
            val >>= 7;
            if val != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if val == 0 {
                break;
            }
        }
        Ok(())
    }

    pub fn write_length(&mut self, len: usize) -> Result<(), BcsError> {
        if len > MAX_SEQUENCE_LENGTH {
            return Err(BcsError::SequenceTooLong(len));
        }
        self.write_uleb128(len as u64)
    }

    pub fn write_variant(&mut self, tag: u32) -> Result<(), BcsError> {
        self.write_uleb128(u64::from(tag))
    }

    /// `vector<u8>`: length prefix followed by the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BcsError> {
        self.write_length(bytes.len())?;
        self.write_fixed(bytes)
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), BcsError> {
        self.write_bytes(s.as_bytes())
    }

    pub fn write_seq<T: BcsEncode>(&mut self, items: &[T]) -> Result<(), BcsError> {
        self.write_length(items.len())?;
        for item in items {
            item.encode(self)?;
        }
        Ok(())
    }
}

pub struct BcsReader<'a> {
    cursor: Cursor<&'a [u8]>,
    depth: usize,
}

impl<'a> BcsReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            depth: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    pub fn finish(&self) -> Result<(), BcsError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(BcsError::TrailingBytes(n)),
        }
    }

    /// Enter a nested container. Pair with [`leave`](Self::leave).
    pub fn enter(&mut self) -> Result<(), BcsError> {
        self.depth += 1;
        if self.depth > MAX_CONTAINER_DEPTH {
            return Err(BcsError::DepthExceeded);
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn read_u8(&mut self) -> Result<u8, BcsError> {
        self.cursor.read_u8().map_err(eof)
    }

    pub fn read_bool(&mut self) -> Result<bool, BcsError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(BcsError::InvalidBool(b)),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, BcsError> {
        self.cursor.read_u16::<LittleEndian>().map_err(eof)
    }

    pub fn read_u32(&mut self) -> Result<u32, BcsError> {
        self.cursor.read_u32::<LittleEndian>().map_err(eof)
    }

    pub fn read_u64(&mut self) -> Result<u64, BcsError> {
        self.cursor.read_u64::<LittleEndian>().map_err(eof)
    }

    pub fn read_u128(&mut self) -> Result<u128, BcsError> {
        self.cursor.read_u128::<LittleEndian>().map_err(eof)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], BcsError> {
        let mut out = [0u8; N];
        std::io::Read::read_exact(&mut self.cursor, &mut out).map_err(eof)?;
        Ok(out)
    }

    /// Rejects overlong encodings and values above `u32::MAX`.
    pub fn read_uleb128(&mut self) -> Result<u64, BcsError> {
        let mut value: u64 = 0;
        for shift in (0..32).step_by(7) {
            let byte = self.read_u8()?;
            let digit = u64::from(byte & 0x7F);
            value |= digit << shift;
            if byte & 0x80 == 0 {
                if shift > 0 && digit == 0 {
                    return Err(BcsError::InvalidUleb128);
                }
                if value > u64::from(u32::MAX) {
                    return Err(BcsError::InvalidUleb128);
                }
                return Ok(value);
            }
        }
        Err(BcsError::InvalidUleb128)
    }

    pub fn read_length(&mut self) -> Result<usize, BcsError> {
        let len = self.read_uleb128()? as usize;
        if len > MAX_SEQUENCE_LENGTH {
            return Err(BcsError::SequenceTooLong(len));
        }
        Ok(len)
    }

    pub fn read_variant(&mut self) -> Result<u32, BcsError> {
        Ok(self.read_uleb128()? as u32)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, BcsError> {
        let len = self.read_length()?;
        if len > self.remaining() {
            return Err(BcsError::UnexpectedEof);
        }
        let mut out = vec![0u8; len];
        std::io::Read::read_exact(&mut self.cursor, &mut out).map_err(eof)?;
        Ok(out)
    }

    pub fn read_string(&mut self) -> Result<String, BcsError> {
        String::from_utf8(self.read_bytes()?).map_err(|_| BcsError::InvalidUtf8)
    }

    pub fn read_seq<T: BcsDecode>(&mut self) -> Result<Vec<T>, BcsError> {
        let len = self.read_length()?;
        // every element takes at least one byte
        if len > self.remaining() {
            return Err(BcsError::UnexpectedEof);
        }
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(T::decode(self)?);
        }
        Ok(out)
    }
}

fn eof(e: std::io::Error) -> BcsError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BcsError::UnexpectedEof
    } else {
        BcsError::Io(e)
    }
}

macro_rules! impl_int {
    ($ty:ty, $write:ident, $read:ident) => {
        impl BcsEncode for $ty {
            fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
                w.$write(*self)
            }
        }

        impl BcsDecode for $ty {
            fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
                r.$read()
            }
        }
    };
}

impl_int!(u8, write_u8, read_u8);
impl_int!(u16, write_u16, read_u16);
impl_int!(u32, write_u32, read_u32);
impl_int!(u64, write_u64, read_u64);
impl_int!(u128, write_u128, read_u128);
impl_int!(bool, write_bool, read_bool);

impl BcsEncode for str {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_str(self)
    }
}

impl BcsEncode for String {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_str(self)
    }
}

impl BcsDecode for String {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        r.read_string()
    }
}

impl<T: BcsEncode> BcsEncode for [T] {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_seq(self)
    }
}

impl<T: BcsEncode> BcsEncode for Vec<T> {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_seq(self)
    }
}

impl<T: BcsDecode> BcsDecode for Vec<T> {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        r.read_seq()
    }
}

impl<const N: usize> BcsEncode for [u8; N] {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        w.write_fixed(self)
    }
}

impl<const N: usize> BcsDecode for [u8; N] {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        r.read_fixed()
    }
}

/// `Option<T>` is the enum `{ None, Some(T) }`.
impl<T: BcsEncode> BcsEncode for Option<T> {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        match self {
            None => w.write_variant(0),
            Some(v) => {
                w.write_variant(1)?;
                v.encode(w)
            }
        }
    }
}

impl<T: BcsDecode> BcsDecode for Option<T> {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        match r.read_variant()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(r)?)),
            tag => Err(BcsError::InvalidVariant {
                type_name: "Option",
                tag,
            }),
        }
    }
}

impl<T: BcsEncode + ?Sized> BcsEncode for Box<T> {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        (**self).encode(w)
    }
}

impl<T: BcsDecode> BcsDecode for Box<T> {
    fn decode(r: &mut BcsReader<'_>) -> Result<Self, BcsError> {
        Ok(Box::new(T::decode(r)?))
    }
}

impl<T: BcsEncode + ?Sized> BcsEncode for &T {
    fn encode(&self, w: &mut BcsWriter) -> Result<(), BcsError> {
        (**self).encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uleb(v: u64) -> Vec<u8> {
        let mut w = BcsWriter::new();
        w.write_uleb128(v).unwrap();
        w.into_bytes()
    }

    #[test]
    fn uleb128_encoding() {
        assert_eq!(uleb(0), vec![0]);
        assert_eq!(uleb(127), vec![127]);
        assert_eq!(uleb(128), vec![0x80, 0x01]);
        assert_eq!(uleb(300), vec![0xAC, 0x02]);
        assert_eq!(uleb(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn uleb128_decodes_what_it_encodes() {
        for v in [0u64, 1, 127, 128, 255, 300, 16383, 16384, u64::from(u32::MAX)] {
            let bytes = uleb(v);
            let mut r = BcsReader::new(&bytes);
            assert_eq!(r.read_uleb128().unwrap(), v);
            r.finish().unwrap();
        }
    }

    #[test]
    fn uleb128_rejects_overlong() {
        // 1 encoded in two bytes
        let mut r = BcsReader::new(&[0x81, 0x00]);
        assert!(matches!(r.read_uleb128(), Err(BcsError::InvalidUleb128)));
    }

    #[test]
    fn uleb128_rejects_above_u32() {
        let mut r = BcsReader::new(&[0x80, 0x80, 0x80, 0x80, 0x10]);
        assert!(matches!(r.read_uleb128(), Err(BcsError::InvalidUleb128)));
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(to_bytes(&0x0102u16).unwrap(), vec![0x02, 0x01]);
        assert_eq!(
            to_bytes(&1_000_000u64).unwrap(),
            vec![0x40, 0x42, 0x0F, 0, 0, 0, 0, 0]
        );
        assert_eq!(to_bytes(&1u128).unwrap().len(), 16);
    }

    #[test]
    fn vectors_have_length_prefix_arrays_do_not() {
        assert_eq!(to_bytes(&vec![1u8, 2, 3]).unwrap(), vec![3, 1, 2, 3]);
        assert_eq!(to_bytes(&[1u8, 2, 3]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn option_is_two_variant_enum() {
        assert_eq!(to_bytes(&None::<u8>).unwrap(), vec![0]);
        assert_eq!(to_bytes(&Some(7u8)).unwrap(), vec![1, 7]);
        assert_eq!(from_bytes::<Option<u8>>(&[1, 7]).unwrap(), Some(7));
        assert!(matches!(
            from_bytes::<Option<u8>>(&[2]),
            Err(BcsError::InvalidVariant { tag: 2, .. })
        ));
    }

    #[test]
    fn strings_are_utf8_bytes() {
        assert_eq!(to_bytes("hi").unwrap(), vec![2, b'h', b'i']);
        assert!(matches!(
            from_bytes::<String>(&[1, 0xFF]),
            Err(BcsError::InvalidUtf8)
        ));
    }

    #[test]
    fn bool_must_be_zero_or_one() {
        assert!(matches!(from_bytes::<bool>(&[2]), Err(BcsError::InvalidBool(2))));
    }

    #[test]
    fn trailing_bytes_rejected() {
        assert!(matches!(
            from_bytes::<u8>(&[1, 2]),
            Err(BcsError::TrailingBytes(1))
        ));
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(matches!(
            from_bytes::<u64>(&[1, 2, 3]),
            Err(BcsError::UnexpectedEof)
        ));
        // claims 5 bytes, has 2
        assert!(matches!(
            from_bytes::<Vec<u8>>(&[5, 1, 2]),
            Err(BcsError::UnexpectedEof)
        ));
    }

    #[test]
    fn size_limit_is_checked_after_serialization() {
        let value = vec![0u8; 10];
        assert_eq!(to_bytes_with_limit(&value, 11).unwrap().len(), 11);
        assert!(matches!(
            to_bytes_with_limit(&value, 10),
            Err(BcsError::SizeExceeded { size: 11, max: 10 })
        ));
    }

    #[test]
    fn depth_guard() {
        let mut r = BcsReader::new(&[]);
        for _ in 0..MAX_CONTAINER_DEPTH {
            r.enter().unwrap();
        }
        assert!(matches!(r.enter(), Err(BcsError::DepthExceeded)));
    }
}
