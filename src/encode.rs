use super::errors::DecodeError;
use super::stream::{ByteReader, ByteWriter};

/// Implemented by every value with a wire encoding.
pub trait Encodable {
    fn encode(&self, writer: &mut ByteWriter);

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.encode(&mut writer);
        writer.into_bytes()
    }
}

/// Implemented by every value that can be decoded from wire bytes.
pub trait Decodable {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError>
    where
        Self: Sized;

    /// Decodes from a byte buffer. Bytes left unconsumed after a successful
    /// decode are tolerated so peers can append fields in later protocol
    /// versions.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized,
    {
        Self::decode(&mut ByteReader::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::field;

    #[derive(Debug, PartialEq)]
    struct Probe {
        value: u32,
    }

    impl Encodable for Probe {
        fn encode(&self, writer: &mut ByteWriter) {
            writer.write_u32_le(self.value);
        }
    }

    impl Decodable for Probe {
        fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
            let value = reader.read_u32_le().map_err(field("value"))?;
            Ok(Self { value })
        }
    }

    #[test]
    fn test_encode_decode() {
        let probe = Probe { value: 256 };
        let bytes = probe.to_bytes();
        let decoded = Probe::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, probe);
    }

    #[test]
    fn trailing_bytes_are_tolerated() {
        let decoded = Probe::from_bytes(&[0x01, 0x00, 0x00, 0x00, 0xAA, 0xBB]).unwrap();
        assert_eq!(decoded, Probe { value: 1 });
    }

    #[test]
    fn truncated_input_names_the_field() {
        let err = Probe::from_bytes(&[0x01, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::Field { name: "value", .. }));
    }
}
