//! Bitcoin SPV p2p protocol implementation
//!
//! This crate provides a pure Rust implementation of the Bitcoin wire
//! protocol for lightweight (SPV) clients: message codecs, the framing
//! envelope, the version/verack handshake, and partial merkle tree
//! verification for filtered blocks.

mod address;
mod block;
mod command;
mod connection;
mod encode;
mod errors;
mod filter;
mod inventory;
mod merkle;
mod message;
mod network;
mod payload;
mod stream;
mod transaction;

pub use address::{IpAddress, PeerAddress, ServiceFlags};
pub use block::{Block, BlockHeader, FilteredBlock, HeadersMessage, MAX_HEADERS_ENTRIES};
pub use command::Command;
pub use connection::{
    DisconnectReason, PeerConnection, PeerConnectionDelegate, PeerConnectionState,
};
pub use encode::{Decodable, Encodable};
pub use errors::{
    ConnectionError, DecodeError, Error, FramingError, MerkleError, Result, StreamError,
};
pub use filter::{
    FilterAddMessage, FilterLoadMessage, BLOOM_UPDATE_ALL, BLOOM_UPDATE_NONE,
    BLOOM_UPDATE_P2PUBKEY_ONLY, MAX_FILTER_ADD_DATA_SIZE, MAX_FILTER_HASH_FUNCTIONS,
    MAX_FILTER_LOAD_SIZE,
};
pub use inventory::{
    BlockLocatorMessage, InventoryMessage, InventoryType, InventoryVector, MAX_INVENTORY_ENTRIES,
};
pub use merkle::extract_matches;
pub use message::Message;
pub use network::Network;
pub use payload::{
    AddressMessage, AlertMessage, Payload, RejectMessage, VersionMessage, MAX_ADDRESSES,
    REJECT_CHECKPOINT, REJECT_DUPLICATE, REJECT_DUST, REJECT_INSUFFICIENT_FEE, REJECT_INVALID,
    REJECT_MALFORMED, REJECT_NONSTANDARD, REJECT_OBSOLETE,
};
pub use stream::{double_sha256, ByteReader, ByteWriter, Hash256};
pub use transaction::{OutPoint, Transaction, TransactionInput, TransactionOutput};

/// Protocol version advertised in outgoing version messages.
pub const PROTOCOL_VERSION: u32 = 70002;
