use super::encode::{Decodable, Encodable};
use super::errors::{field, DecodeError, MerkleError, StreamError};
use super::merkle;
use super::stream::{double_sha256, ByteReader, ByteWriter, Hash256};
use super::transaction::Transaction;

/// Maximum number of entries in a headers message.
pub const MAX_HEADERS_ENTRIES: usize = 2000;

/// A block header, exactly 80 bytes on the wire:
///
/// ```text
/// 4  bytes  version
/// 32 bytes  previous block hash
/// 32 bytes  merkle root
/// 4  bytes  timestamp (Unix epoch)
/// 4  bytes  compact difficulty target
/// 4  bytes  nonce
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub previous_block_hash: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: u32,
    pub compact_difficulty: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// Computes the block identifier: SHA256(SHA256(header bytes)).
    pub fn hash(&self) -> Hash256 {
        Hash256::from_wire(double_sha256(&self.to_bytes()))
    }
}

impl Encodable for BlockHeader {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_i32_le(self.version);
        writer.write_hash256(&self.previous_block_hash);
        writer.write_hash256(&self.merkle_root);
        writer.write_u32_le(self.timestamp);
        writer.write_u32_le(self.compact_difficulty);
        writer.write_u32_le(self.nonce);
    }
}

impl Decodable for BlockHeader {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let version = reader.read_i32_le().map_err(field("version"))?;
        let previous_block_hash = reader
            .read_hash256()
            .map_err(field("previous_block_hash"))?;
        let merkle_root = reader.read_hash256().map_err(field("merkle_root"))?;
        let timestamp = reader.read_u32_le().map_err(field("timestamp"))?;
        let compact_difficulty = reader
            .read_u32_le()
            .map_err(field("compact_difficulty"))?;
        let nonce = reader.read_u32_le().map_err(field("nonce"))?;

        Ok(Self {
            version,
            previous_block_hash,
            merkle_root,
            timestamp,
            compact_difficulty,
            nonce,
        })
    }
}

/// A full block: header plus every transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

// Smallest possible serialized transaction, for bounding the count.
const MIN_TRANSACTION_SIZE: usize = 10;

impl Block {
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }
}

impl Encodable for Block {
    fn encode(&self, writer: &mut ByteWriter) {
        self.header.encode(writer);
        writer.write_var_int(self.transactions.len() as u64);
        for transaction in &self.transactions {
            transaction.encode(writer);
        }
    }
}

impl Decodable for Block {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let header = BlockHeader::decode(reader)?;

        let count = reader.read_var_int().map_err(field("transactions"))? as usize;
        if count > reader.remaining() / MIN_TRANSACTION_SIZE {
            return Err(field("transactions")(StreamError::TruncatedInput(
                "transaction",
            )));
        }

        let mut transactions = Vec::with_capacity(count);
        for _ in 0..count {
            transactions.push(Transaction::decode(reader)?);
        }

        Ok(Self {
            header,
            transactions,
        })
    }
}

/// A headers message: block headers each trailed by the always-zero
/// transaction count byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersMessage {
    pub headers: Vec<BlockHeader>,
}

impl Encodable for HeadersMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_int(self.headers.len() as u64);
        for header in &self.headers {
            header.encode(writer);
            writer.write_var_int(0);
        }
    }
}

impl Decodable for HeadersMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_var_int().map_err(field("count"))? as usize;
        if count > MAX_HEADERS_ENTRIES {
            return Err(DecodeError::OutOfRange("count"));
        }

        let mut headers = Vec::with_capacity(count);
        for _ in 0..count {
            headers.push(BlockHeader::decode(reader)?);
            // transaction count, zero in a headers message
            reader.read_var_int().map_err(field("transaction_count"))?;
        }

        Ok(Self { headers })
    }
}

/// A filtered block, sent in reply to a getdata for a filtered-block
/// inventory entry: the header, the transaction count of the full block,
/// and a partial merkle tree over those transactions as a sparse hash
/// list plus traversal flag bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredBlock {
    pub header: BlockHeader,
    /// Number of transactions in the full block, not the length of
    /// `hashes`. Determines the shape of the partial merkle tree.
    pub total_transactions: u32,
    pub hashes: Vec<Hash256>,
    pub flags: Vec<u8>,
}

impl FilteredBlock {
    /// Verifies the partial merkle tree against the header's merkle root.
    ///
    /// On success returns the matched transaction hashes in tree order.
    /// A structurally invalid proof is [`MerkleError::MalformedProof`]; a
    /// well-formed proof deriving a different root is
    /// [`MerkleError::MerkleMismatch`].
    pub fn verify_merkle_proof(&self) -> Result<Vec<Hash256>, MerkleError> {
        let (root, matches) =
            merkle::extract_matches(self.total_transactions, &self.hashes, &self.flags)?;
        if root != self.header.merkle_root {
            return Err(MerkleError::MerkleMismatch);
        }
        Ok(matches)
    }
}

impl Encodable for FilteredBlock {
    fn encode(&self, writer: &mut ByteWriter) {
        self.header.encode(writer);
        writer.write_u32_le(self.total_transactions);
        writer.write_var_int(self.hashes.len() as u64);
        for hash in &self.hashes {
            writer.write_hash256(hash);
        }
        writer.write_var_bytes(&self.flags);
    }
}

impl Decodable for FilteredBlock {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let header = BlockHeader::decode(reader)?;
        let total_transactions = reader
            .read_u32_le()
            .map_err(field("total_transactions"))?;

        let count = reader.read_var_int().map_err(field("hashes"))? as usize;
        if count > reader.remaining() / 32 {
            return Err(field("hashes")(StreamError::TruncatedInput("hash256")));
        }
        let mut hashes = Vec::with_capacity(count);
        for _ in 0..count {
            hashes.push(reader.read_hash256().map_err(field("hashes"))?);
        }

        let flags = reader.read_var_bytes().map_err(field("flags"))?;

        Ok(Self {
            header,
            total_transactions,
            hashes,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn hash_from_hex(hex: &str) -> Hash256 {
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).unwrap();
        }
        Hash256(bytes)
    }

    const FILTERED_BLOCK_BYTES: [u8; 119] = [
        0x01, 0x00, 0x00, 0x00, // version: 1
        0x79, 0xcd, 0xa8, 0x56, 0xb1, 0x43, 0xd9, 0xdb, //
        0x2c, 0x1c, 0xaf, 0xf0, 0x1d, 0x1a, 0xec, 0xc8, //
        0x63, 0x0d, 0x30, 0x62, 0x5d, 0x10, 0xe8, 0xb4, //
        0xb8, 0xb0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // previous block hash
        0xb5, 0x0c, 0xc0, 0x69, 0xd6, 0xa3, 0xe3, 0x3e, //
        0x3f, 0xf8, 0x4a, 0x5c, 0x41, 0xd9, 0xd3, 0xfe, //
        0xbe, 0x7c, 0x77, 0x0f, 0xdc, 0xc9, 0x6b, 0x2c, //
        0x3f, 0xf6, 0x0a, 0xbe, 0x18, 0x4f, 0x19, 0x63, // merkle root
        0x67, 0x29, 0x1b, 0x4d, // timestamp
        0x4c, 0x86, 0x04, 0x1b, // difficulty bits
        0x8f, 0xa4, 0x5d, 0x63, // nonce
        0x01, 0x00, 0x00, 0x00, // num transactions in full block: 1
        0x01, // num hashes
        0xb5, 0x0c, 0xc0, 0x69, 0xd6, 0xa3, 0xe3, 0x3e, //
        0x3f, 0xf8, 0x4a, 0x5c, 0x41, 0xd9, 0xd3, 0xfe, //
        0xbe, 0x7c, 0x77, 0x0f, 0xdc, 0xc9, 0x6b, 0x2c, //
        0x3f, 0xf6, 0x0a, 0xbe, 0x18, 0x4f, 0x19, 0x63, // tx hash
        0x01, // num flag bytes: 1
        0x01, // flag bytes
    ];

    fn fixture_filtered_block() -> FilteredBlock {
        let merkle_root =
            hash_from_hex("63194f18be0af63f2c6bc9dc0f777cbefed3d9415c4af83f3ee3a3d669c00cb5");
        FilteredBlock {
            header: BlockHeader {
                version: 1,
                previous_block_hash: hash_from_hex(
                    "000000000000b0b8b4e8105d62300d63c8ec1a1df0af1c2cdbd943b156a8cd79",
                ),
                merkle_root,
                timestamp: 1293625703,
                compact_difficulty: 0x1b04864c,
                nonce: 0x635da48f,
            },
            total_transactions: 1,
            hashes: vec![merkle_root],
            flags: vec![0x01],
        }
    }

    #[test]
    fn filtered_block_encoding_matches_fixture() {
        assert_eq!(fixture_filtered_block().to_bytes(), FILTERED_BLOCK_BYTES);
    }

    #[test]
    fn filtered_block_decoding_matches_fixture() {
        let mut reader = ByteReader::new(&FILTERED_BLOCK_BYTES);
        let decoded = FilteredBlock::decode(&mut reader).unwrap();
        assert_eq!(decoded, fixture_filtered_block());
        assert!(reader.is_empty());
    }

    #[test]
    fn filtered_block_fixture_proof_verifies() {
        let block = fixture_filtered_block();
        let matches = block.verify_merkle_proof().unwrap();
        assert_eq!(matches, vec![block.header.merkle_root]);
    }

    #[test]
    fn block_header_is_80_bytes() {
        let header = fixture_filtered_block().header;
        assert_eq!(header.to_bytes().len(), 80);
    }

    #[test]
    fn genesis_header_hash() {
        let header = BlockHeader {
            version: 1,
            previous_block_hash: Hash256::ZERO,
            merkle_root: hash_from_hex(
                "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            ),
            timestamp: 1231006505,
            compact_difficulty: 0x1d00ffff,
            nonce: 2083236893,
        };

        assert_eq!(
            header.hash(),
            hash_from_hex("000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"),
        );
    }

    #[test]
    fn headers_message_round_trip() {
        let header = fixture_filtered_block().header;
        let message = HeadersMessage {
            headers: vec![header, header],
        };

        let bytes = message.to_bytes();
        assert_eq!(bytes.len(), 1 + 2 * 81);
        assert_eq!(HeadersMessage::from_bytes(&bytes).unwrap(), message);
    }

    #[test]
    fn headers_message_rejects_excessive_count() {
        let mut bytes = Vec::new();
        bytes.push(0xFD);
        bytes.extend_from_slice(&2001u16.to_le_bytes());
        assert_eq!(
            HeadersMessage::from_bytes(&bytes),
            Err(DecodeError::OutOfRange("count")),
        );
    }

    #[test]
    fn block_round_trip() {
        let block = Block {
            header: fixture_filtered_block().header,
            transactions: vec![Transaction {
                version: 1,
                inputs: vec![],
                outputs: vec![],
                lock_time: 0,
            }],
        };

        let bytes = block.to_bytes();
        assert_eq!(Block::from_bytes(&bytes).unwrap(), block);
        assert_eq!(block.hash(), block.header.hash());
    }

    #[test]
    fn filtered_block_truncated_hash_list_fails() {
        let mut bytes = FILTERED_BLOCK_BYTES.to_vec();
        bytes.truncate(100);
        assert!(FilteredBlock::from_bytes(&bytes).is_err());
    }
}
