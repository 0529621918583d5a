use super::encode::{Decodable, Encodable};
use super::errors::{field, DecodeError, StreamError};
use super::stream::{ByteReader, ByteWriter, Hash256};

/// Maximum number of entries in an inv, getdata or notfound message.
pub const MAX_INVENTORY_ENTRIES: usize = 50000;

/// Object type advertised by an inventory vector, serialized as a
/// little-endian u32.
///
/// Unassigned values are preserved rather than rejected so newer peers'
/// advertisements decode without data loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryType {
    Error,
    Transaction,
    Block,
    FilteredBlock,
    CompactBlock,
    Unknown(u32),
}

impl InventoryType {
    pub fn to_u32(self) -> u32 {
        match self {
            InventoryType::Error => 0,
            InventoryType::Transaction => 1,
            InventoryType::Block => 2,
            InventoryType::FilteredBlock => 3,
            InventoryType::CompactBlock => 4,
            InventoryType::Unknown(raw) => raw,
        }
    }

    pub fn from_u32(raw: u32) -> Self {
        match raw {
            0 => InventoryType::Error,
            1 => InventoryType::Transaction,
            2 => InventoryType::Block,
            3 => InventoryType::FilteredBlock,
            4 => InventoryType::CompactBlock,
            raw => InventoryType::Unknown(raw),
        }
    }
}

/// One advertised object: its type and identifying hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryVector {
    pub inv_type: InventoryType,
    pub hash: Hash256,
}

impl Encodable for InventoryVector {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u32_le(self.inv_type.to_u32());
        writer.write_hash256(&self.hash);
    }
}

impl Decodable for InventoryVector {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let inv_type = InventoryType::from_u32(reader.read_u32_le().map_err(field("type"))?);
        let hash = reader.read_hash256().map_err(field("hash"))?;
        Ok(Self { inv_type, hash })
    }
}

/// Payload shared by inv, getdata and notfound: a counted list of
/// inventory vectors. The enclosing command tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryMessage {
    pub inventory: Vec<InventoryVector>,
}

impl InventoryMessage {
    pub fn new(inventory: Vec<InventoryVector>) -> Self {
        Self { inventory }
    }
}

impl Encodable for InventoryMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_int(self.inventory.len() as u64);
        for entry in &self.inventory {
            entry.encode(writer);
        }
    }
}

impl Decodable for InventoryMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_var_int().map_err(field("count"))? as usize;
        if count > MAX_INVENTORY_ENTRIES {
            return Err(DecodeError::OutOfRange("count"));
        }

        let mut inventory = Vec::with_capacity(count);
        for _ in 0..count {
            inventory.push(InventoryVector::decode(reader)?);
        }

        Ok(Self { inventory })
    }
}

/// Payload shared by getblocks and getheaders: a block locator walking
/// back from the caller's tip, and the hash to stop at (zero for "as many
/// as possible").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocatorMessage {
    pub protocol_version: u32,
    pub block_locator_hashes: Vec<Hash256>,
    pub hash_stop: Hash256,
}

impl Encodable for BlockLocatorMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u32_le(self.protocol_version);
        writer.write_var_int(self.block_locator_hashes.len() as u64);
        for hash in &self.block_locator_hashes {
            writer.write_hash256(hash);
        }
        writer.write_hash256(&self.hash_stop);
    }
}

impl Decodable for BlockLocatorMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let protocol_version = reader.read_u32_le().map_err(field("protocol_version"))?;

        let count = reader
            .read_var_int()
            .map_err(field("block_locator_hashes"))? as usize;
        // A count the remaining bytes cannot possibly hold is truncated
        // input, caught before reserving any space for it.
        if count > reader.remaining() / 32 {
            return Err(field("block_locator_hashes")(StreamError::TruncatedInput(
                "hash256",
            )));
        }

        let mut block_locator_hashes = Vec::with_capacity(count);
        for _ in 0..count {
            block_locator_hashes.push(
                reader
                    .read_hash256()
                    .map_err(field("block_locator_hashes"))?,
            );
        }

        let hash_stop = reader.read_hash256().map_err(field("hash_stop"))?;

        Ok(Self {
            protocol_version,
            block_locator_hashes,
            hash_stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hash(seed: u8) -> Hash256 {
        Hash256([seed; 32])
    }

    #[test]
    fn inventory_round_trip() {
        let message = InventoryMessage::new(vec![
            InventoryVector {
                inv_type: InventoryType::Transaction,
                hash: sample_hash(0x11),
            },
            InventoryVector {
                inv_type: InventoryType::FilteredBlock,
                hash: sample_hash(0x22),
            },
        ]);

        let bytes = message.to_bytes();
        assert_eq!(bytes.len(), 1 + 2 * 36);
        assert_eq!(InventoryMessage::from_bytes(&bytes).unwrap(), message);
    }

    #[test]
    fn unknown_inventory_type_is_preserved() {
        let message = InventoryMessage::new(vec![InventoryVector {
            inv_type: InventoryType::Unknown(0x40000001),
            hash: sample_hash(0x33),
        }]);

        let decoded = InventoryMessage::from_bytes(&message.to_bytes()).unwrap();
        assert_eq!(decoded.inventory[0].inv_type.to_u32(), 0x40000001);
    }

    #[test]
    fn inventory_rejects_excessive_count() {
        let mut bytes = Vec::new();
        bytes.push(0xFD);
        bytes.extend_from_slice(&50001u16.to_le_bytes());
        assert_eq!(
            InventoryMessage::from_bytes(&bytes),
            Err(DecodeError::OutOfRange("count")),
        );
    }

    #[test]
    fn inventory_truncated_entry_fails() {
        let message = InventoryMessage::new(vec![InventoryVector {
            inv_type: InventoryType::Block,
            hash: sample_hash(0x44),
        }]);
        let mut bytes = message.to_bytes();
        bytes.truncate(bytes.len() - 5);
        assert!(InventoryMessage::from_bytes(&bytes).is_err());
    }

    #[test]
    fn block_locator_round_trip() {
        let message = BlockLocatorMessage {
            protocol_version: 70002,
            block_locator_hashes: vec![sample_hash(0xAA), sample_hash(0xBB)],
            hash_stop: Hash256::ZERO,
        };

        let bytes = message.to_bytes();
        assert_eq!(bytes.len(), 4 + 1 + 2 * 32 + 32);
        assert_eq!(BlockLocatorMessage::from_bytes(&bytes).unwrap(), message);
    }

    #[test]
    fn block_locator_rejects_impossible_count() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&70002u32.to_le_bytes());
        bytes.push(0xFD);
        bytes.extend_from_slice(&1000u16.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 32]); // room for far fewer than 1000 hashes
        assert!(BlockLocatorMessage::from_bytes(&bytes).is_err());
    }
}
