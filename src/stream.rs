use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use sha2::{Digest, Sha256};
use std::fmt;

use super::errors::StreamError;

/// A 256-bit hash value.
///
/// Stored in display (big-endian) byte order; the wire carries the bytes
/// reversed. [`Hash256::from_wire`] and [`Hash256::to_wire`] convert.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Builds a hash from its wire (byte-reversed) form.
    pub fn from_wire(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Hash256(bytes)
    }

    /// Returns the wire (byte-reversed) form.
    pub fn to_wire(&self) -> [u8; 32] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

/// Computes SHA256(SHA256(data)), the protocol's hash construction for
/// checksums, block identifiers and merkle nodes.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(Sha256::digest(data));

    let mut buffer = [0u8; 32];
    buffer.copy_from_slice(&hash);
    buffer
}

/// Cursor over a byte buffer.
///
/// Every read either returns a value and advances, or fails with
/// [`StreamError`] and leaves the enclosing decode to abort. No read can
/// move past the end of the buffer.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        self.bytes
            .read_u8()
            .map_err(|_| StreamError::TruncatedInput("u8"))
    }

    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_u8()? != 0x00)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, StreamError> {
        self.bytes
            .read_u16::<LittleEndian>()
            .map_err(|_| StreamError::TruncatedInput("u16"))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, StreamError> {
        self.bytes
            .read_u16::<BigEndian>()
            .map_err(|_| StreamError::TruncatedInput("u16"))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, StreamError> {
        self.bytes
            .read_u32::<LittleEndian>()
            .map_err(|_| StreamError::TruncatedInput("u32"))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, StreamError> {
        self.bytes
            .read_i32::<LittleEndian>()
            .map_err(|_| StreamError::TruncatedInput("i32"))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, StreamError> {
        self.bytes
            .read_u64::<LittleEndian>()
            .map_err(|_| StreamError::TruncatedInput("u64"))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, StreamError> {
        self.bytes
            .read_i64::<LittleEndian>()
            .map_err(|_| StreamError::TruncatedInput("i64"))
    }

    /// Reads a var-int: one byte below 0xFD, otherwise a 0xFD/0xFE/0xFF
    /// prefix followed by a 16/32/64-bit little-endian value.
    ///
    /// Non-minimal encodings are rejected so every length field has exactly
    /// one valid representation.
    pub fn read_var_int(&mut self) -> Result<u64, StreamError> {
        let prefix = self
            .read_u8()
            .map_err(|_| StreamError::TruncatedInput("var-int"))?;

        match prefix {
            0xFD => {
                let value = self
                    .read_u16_le()
                    .map_err(|_| StreamError::TruncatedInput("var-int"))?;
                if value < 0xFD {
                    return Err(StreamError::InvalidEncoding("non-minimal var-int"));
                }
                Ok(value as u64)
            }
            0xFE => {
                let value = self
                    .read_u32_le()
                    .map_err(|_| StreamError::TruncatedInput("var-int"))?;
                if value <= 0xFFFF {
                    return Err(StreamError::InvalidEncoding("non-minimal var-int"));
                }
                Ok(value as u64)
            }
            0xFF => {
                let value = self
                    .read_u64_le()
                    .map_err(|_| StreamError::TruncatedInput("var-int"))?;
                if value <= 0xFFFF_FFFF {
                    return Err(StreamError::InvalidEncoding("non-minimal var-int"));
                }
                Ok(value)
            }
            value => Ok(value as u64),
        }
    }

    /// Reads a var-int length prefix followed by that many raw bytes.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, StreamError> {
        let length = self.read_var_int()? as usize;
        self.read_bytes(length)
    }

    /// Reads a var-int length prefix followed by that many UTF-8 bytes.
    /// Zero length is a valid empty string.
    pub fn read_var_string(&mut self) -> Result<String, StreamError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| StreamError::InvalidEncoding("var-string"))
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>, StreamError> {
        Ok(self.read_slice(length)?.to_vec())
    }

    pub fn read_slice(&mut self, length: usize) -> Result<&'a [u8], StreamError> {
        if self.bytes.len() < length {
            return Err(StreamError::TruncatedInput("bytes"));
        }
        let (head, tail) = self.bytes.split_at(length);
        self.bytes = tail;
        Ok(head)
    }

    pub fn read_hash256(&mut self) -> Result<Hash256, StreamError> {
        let slice = self
            .read_slice(32)
            .map_err(|_| StreamError::TruncatedInput("hash256"))?;

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Hash256::from_wire(bytes))
    }
}

/// Output buffer builder, the write-side counterpart of [`ByteReader`].
///
/// Writing into an in-memory buffer cannot fail, so every method is
/// infallible and encoding is a pure function of the message value.
#[derive(Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(value.into());
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16_be(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32_le(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64_le(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a var-int in its minimal form.
    pub fn write_var_int(&mut self, value: u64) {
        match value {
            0..=0xFC => self.write_u8(value as u8),
            0xFD..=0xFFFF => {
                self.write_u8(0xFD);
                self.write_u16_le(value as u16);
            }
            0x1_0000..=0xFFFF_FFFF => {
                self.write_u8(0xFE);
                self.write_u32_le(value as u32);
            }
            _ => {
                self.write_u8(0xFF);
                self.write_u64_le(value);
            }
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_int(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn write_var_string(&mut self, value: &str) {
        self.write_var_bytes(value.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_hash256(&mut self, hash: &Hash256) {
        self.buffer.extend_from_slice(&hash.to_wire());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn var_int_bytes(value: u64) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_var_int(value);
        writer.into_bytes()
    }

    #[quickcheck]
    fn var_int_round_trip(value: u64) {
        let bytes = var_int_bytes(value);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_var_int().unwrap(), value);
        assert!(reader.is_empty());
    }

    #[test]
    fn var_int_boundary_values() {
        let cases: [(u64, &[u8]); 7] = [
            (0, &[0x00]),
            (0xFC, &[0xFC]),
            (0xFD, &[0xFD, 0xFD, 0x00]),
            (0xFFFF, &[0xFD, 0xFF, 0xFF]),
            (0x1_0000, &[0xFE, 0x00, 0x00, 0x01, 0x00]),
            (0xFFFF_FFFF, &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF]),
            (
                0x1_0000_0000,
                &[0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(var_int_bytes(value), expected, "encoding of {}", value);
            let mut reader = ByteReader::new(expected);
            assert_eq!(reader.read_var_int().unwrap(), value);
        }
    }

    #[test]
    fn var_int_rejects_non_minimal_forms() {
        let cases: [&[u8]; 3] = [
            &[0xFD, 0x05, 0x00],
            &[0xFE, 0xFF, 0xFF, 0x00, 0x00],
            &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00],
        ];

        for bytes in cases {
            let mut reader = ByteReader::new(bytes);
            assert_eq!(
                reader.read_var_int(),
                Err(StreamError::InvalidEncoding("non-minimal var-int")),
            );
        }
    }

    #[test]
    fn var_int_rejects_truncated_tail() {
        let mut reader = ByteReader::new(&[0xFD, 0x01]);
        assert_eq!(
            reader.read_var_int(),
            Err(StreamError::TruncatedInput("var-int")),
        );
    }

    #[test]
    fn var_string_round_trip() {
        for value in ["", "/Satoshi:0.9.1/", "日本語"] {
            let mut writer = ByteWriter::new();
            writer.write_var_string(value);
            let bytes = writer.into_bytes();

            let mut reader = ByteReader::new(&bytes);
            assert_eq!(reader.read_var_string().unwrap(), value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn var_string_rejects_invalid_utf8() {
        let mut reader = ByteReader::new(&[0x02, 0xFF, 0xFE]);
        assert_eq!(
            reader.read_var_string(),
            Err(StreamError::InvalidEncoding("var-string")),
        );
    }

    #[test]
    fn fixed_width_endianness() {
        let mut writer = ByteWriter::new();
        writer.write_u32_le(0x0a000001);
        writer.write_u16_be(8333);
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0x01, 0x00, 0x00, 0x0a, 0x20, 0x8d]);

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u32_le().unwrap(), 0x0a000001);
        assert_eq!(reader.read_u16_be().unwrap(), 8333);
    }

    #[test]
    fn hash256_reverses_wire_order() {
        let mut wire = [0u8; 32];
        for (i, byte) in wire.iter_mut().enumerate() {
            *byte = i as u8;
        }

        let mut reader = ByteReader::new(&wire);
        let hash = reader.read_hash256().unwrap();
        assert_eq!(hash.0[0], 31);
        assert_eq!(hash.0[31], 0);

        let mut writer = ByteWriter::new();
        writer.write_hash256(&hash);
        assert_eq!(writer.into_bytes(), wire.to_vec());
    }

    #[test]
    fn reads_never_move_past_the_buffer() {
        let mut reader = ByteReader::new(&[0x01, 0x02]);
        assert_eq!(
            reader.read_u32_le(),
            Err(StreamError::TruncatedInput("u32")),
        );
        assert_eq!(
            reader.read_bytes(3),
            Err(StreamError::TruncatedInput("bytes")),
        );
    }

    #[test]
    fn read_bool_accepts_any_nonzero_byte() {
        let mut reader = ByteReader::new(&[0x00, 0x01, 0x7F]);
        assert!(!reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
        assert!(reader.read_bool().unwrap());
    }
}
