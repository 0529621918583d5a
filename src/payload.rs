use std::time::{SystemTime, UNIX_EPOCH};

use super::address::{PeerAddress, ServiceFlags};
use super::block::{Block, FilteredBlock, HeadersMessage};
use super::command::Command;
use super::encode::{Decodable, Encodable};
use super::errors::{field, DecodeError};
use super::filter::{FilterAddMessage, FilterLoadMessage};
use super::inventory::{BlockLocatorMessage, InventoryMessage};
use super::stream::{ByteReader, ByteWriter};
use super::transaction::Transaction;
use super::PROTOCOL_VERSION;

/// Maximum number of entries in an addr message.
pub const MAX_ADDRESSES: usize = 1000;

/// The transaction or block was rejected as structurally invalid.
pub const REJECT_MALFORMED: u8 = 0x01;
pub const REJECT_INVALID: u8 = 0x10;
pub const REJECT_OBSOLETE: u8 = 0x11;
pub const REJECT_DUPLICATE: u8 = 0x12;
pub const REJECT_NONSTANDARD: u8 = 0x40;
pub const REJECT_DUST: u8 = 0x41;
pub const REJECT_INSUFFICIENT_FEE: u8 = 0x42;
pub const REJECT_CHECKPOINT: u8 = 0x43;

/// Payload represents the payload of a message.
/// The inner type encapsulates all the different payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Version(VersionMessage),
    VerAck,
    Addr(AddressMessage),
    Inv(InventoryMessage),
    GetData(InventoryMessage),
    NotFound(InventoryMessage),
    GetBlocks(BlockLocatorMessage),
    GetHeaders(BlockLocatorMessage),
    Tx(Transaction),
    Block(Block),
    Headers(HeadersMessage),
    GetAddr,
    Mempool,
    Ping(u64),
    Pong(u64),
    Reject(RejectMessage),
    FilterLoad(FilterLoadMessage),
    FilterAdd(FilterAddMessage),
    FilterClear,
    MerkleBlock(FilteredBlock),
    Alert(AlertMessage),
}

impl Payload {
    /// The command this payload travels under.
    pub fn command(&self) -> Command {
        match self {
            Payload::Version(_) => Command::Version,
            Payload::VerAck => Command::VerAck,
            Payload::Addr(_) => Command::Addr,
            Payload::Inv(_) => Command::Inv,
            Payload::GetData(_) => Command::GetData,
            Payload::NotFound(_) => Command::NotFound,
            Payload::GetBlocks(_) => Command::GetBlocks,
            Payload::GetHeaders(_) => Command::GetHeaders,
            Payload::Tx(_) => Command::Tx,
            Payload::Block(_) => Command::Block,
            Payload::Headers(_) => Command::Headers,
            Payload::GetAddr => Command::GetAddr,
            Payload::Mempool => Command::Mempool,
            Payload::Ping(_) => Command::Ping,
            Payload::Pong(_) => Command::Pong,
            Payload::Reject(_) => Command::Reject,
            Payload::FilterLoad(_) => Command::FilterLoad,
            Payload::FilterAdd(_) => Command::FilterAdd,
            Payload::FilterClear => Command::FilterClear,
            Payload::MerkleBlock(_) => Command::MerkleBlock,
            Payload::Alert(_) => Command::Alert,
        }
    }

    /// to_bytes converts the payload to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Version(message) => message.to_bytes(),
            Payload::VerAck | Payload::GetAddr | Payload::Mempool | Payload::FilterClear => {
                vec![]
            }
            Payload::Addr(message) => message.to_bytes(),
            Payload::Inv(message) | Payload::GetData(message) | Payload::NotFound(message) => {
                message.to_bytes()
            }
            Payload::GetBlocks(message) | Payload::GetHeaders(message) => message.to_bytes(),
            Payload::Tx(message) => message.to_bytes(),
            Payload::Block(message) => message.to_bytes(),
            Payload::Headers(message) => message.to_bytes(),
            Payload::Ping(nonce) | Payload::Pong(nonce) => nonce.to_le_bytes().to_vec(),
            Payload::Reject(message) => message.to_bytes(),
            Payload::FilterLoad(message) => message.to_bytes(),
            Payload::FilterAdd(message) => message.to_bytes(),
            Payload::MerkleBlock(message) => message.to_bytes(),
            Payload::Alert(message) => message.to_bytes(),
        }
    }

    /// from_bytes converts bytes to a payload.
    /// The command selects the variant decoder.
    pub fn from_bytes(command: Command, bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::dispatch(command, bytes).map_err(|error| {
            tracing::warn!(command = command.name(), %error, "failed to decode payload");
            error
        })
    }

    fn dispatch(command: Command, bytes: &[u8]) -> Result<Self, DecodeError> {
        let content_required = !matches!(
            command,
            Command::VerAck | Command::GetAddr | Command::Mempool | Command::FilterClear
        );
        if content_required && bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        Ok(match command {
            Command::Version => Payload::Version(VersionMessage::from_bytes(bytes)?),
            Command::VerAck => Payload::VerAck,
            Command::Addr => Payload::Addr(AddressMessage::from_bytes(bytes)?),
            Command::Inv => Payload::Inv(InventoryMessage::from_bytes(bytes)?),
            Command::GetData => Payload::GetData(InventoryMessage::from_bytes(bytes)?),
            Command::NotFound => Payload::NotFound(InventoryMessage::from_bytes(bytes)?),
            Command::GetBlocks => Payload::GetBlocks(BlockLocatorMessage::from_bytes(bytes)?),
            Command::GetHeaders => Payload::GetHeaders(BlockLocatorMessage::from_bytes(bytes)?),
            Command::Tx => Payload::Tx(Transaction::from_bytes(bytes)?),
            Command::Block => Payload::Block(Block::from_bytes(bytes)?),
            Command::Headers => Payload::Headers(HeadersMessage::from_bytes(bytes)?),
            Command::GetAddr => Payload::GetAddr,
            Command::Mempool => Payload::Mempool,
            Command::Ping => Payload::Ping(read_nonce(bytes)?),
            Command::Pong => Payload::Pong(read_nonce(bytes)?),
            Command::Reject => Payload::Reject(RejectMessage::from_bytes(bytes)?),
            Command::FilterLoad => Payload::FilterLoad(FilterLoadMessage::from_bytes(bytes)?),
            Command::FilterAdd => Payload::FilterAdd(FilterAddMessage::from_bytes(bytes)?),
            Command::FilterClear => Payload::FilterClear,
            Command::MerkleBlock => Payload::MerkleBlock(FilteredBlock::from_bytes(bytes)?),
            Command::Alert => Payload::Alert(AlertMessage::from_bytes(bytes)?),
        })
    }
}

fn read_nonce(bytes: &[u8]) -> Result<u64, DecodeError> {
    ByteReader::new(bytes).read_u64_le().map_err(field("nonce"))
}

/// Message payload for the version command. A node advertises its version
/// immediately after opening a connection, and no other traffic is
/// accepted until both sides have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub protocol_version: u32,
    pub services: ServiceFlags,
    pub timestamp: i64,
    /// The address of the node receiving this message, as seen by the
    /// sender. No timestamp in this context.
    pub receiver_address: PeerAddress,
    /// The address of the sending node.
    pub sender_address: PeerAddress,
    /// Random nonce which lets a node detect a connection to itself.
    pub nonce: u64,
    pub user_agent: String,
    /// The height of the transmitting node's best chain.
    pub block_start_height: i32,
    /// Transaction relay flag, absent before protocol version 70001.
    pub relay: Option<bool>,
}

impl VersionMessage {
    /// Builds an outgoing version message with the current time and this
    /// crate's user agent.
    pub fn build(
        services: ServiceFlags,
        receiver_address: PeerAddress,
        sender_address: PeerAddress,
        nonce: u64,
        block_start_height: i32,
        relay: bool,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default();

        const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
        const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");
        let user_agent = format!("/{}:{}/", CARGO_PKG_NAME, CARGO_PKG_VERSION);

        Self {
            protocol_version: PROTOCOL_VERSION,
            services,
            timestamp,
            receiver_address,
            sender_address,
            nonce,
            user_agent,
            block_start_height,
            relay: Some(relay),
        }
    }
}

impl Encodable for VersionMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u32_le(self.protocol_version);
        writer.write_u64_le(self.services.to_u64());
        writer.write_i64_le(self.timestamp);
        self.receiver_address.write(writer, false);
        self.sender_address.write(writer, false);
        writer.write_u64_le(self.nonce);
        writer.write_var_string(&self.user_agent);
        writer.write_i32_le(self.block_start_height);
        if let Some(relay) = self.relay {
            writer.write_bool(relay);
        }
    }
}

impl Decodable for VersionMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let protocol_version = reader.read_u32_le().map_err(field("protocol_version"))?;
        let services = ServiceFlags::from_u64(reader.read_u64_le().map_err(field("services"))?);
        let timestamp = reader.read_i64_le().map_err(field("timestamp"))?;
        let receiver_address =
            PeerAddress::read(reader, false).map_err(field("receiver_address"))?;
        let sender_address = PeerAddress::read(reader, false).map_err(field("sender_address"))?;
        let nonce = reader.read_u64_le().map_err(field("nonce"))?;
        let user_agent = reader.read_var_string().map_err(field("user_agent"))?;
        let block_start_height = reader.read_i32_le().map_err(field("block_start_height"))?;
        let relay = if reader.is_empty() {
            None
        } else {
            Some(reader.read_bool().map_err(field("relay"))?)
        };

        Ok(Self {
            protocol_version,
            services,
            timestamp,
            receiver_address,
            sender_address,
            nonce,
            user_agent,
            block_start_height,
            relay,
        })
    }
}

/// Known peers gossiped in an addr message; every entry carries a
/// last-seen timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMessage {
    pub peer_addresses: Vec<PeerAddress>,
}

impl AddressMessage {
    pub fn new(peer_addresses: Vec<PeerAddress>) -> Self {
        Self { peer_addresses }
    }
}

impl Encodable for AddressMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_int(self.peer_addresses.len() as u64);
        for address in &self.peer_addresses {
            address.write(writer, true);
        }
    }
}

impl Decodable for AddressMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_var_int().map_err(field("count"))? as usize;
        if count > MAX_ADDRESSES {
            return Err(DecodeError::OutOfRange("count"));
        }

        let mut peer_addresses = Vec::with_capacity(count);
        for _ in 0..count {
            peer_addresses.push(PeerAddress::read(reader, true).map_err(field("peer_addresses"))?);
        }

        Ok(Self { peer_addresses })
    }
}

/// A rejected message notice: which command was rejected, a machine code,
/// a free-form reason and optional extra data (typically the hash of the
/// rejected object).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectMessage {
    pub message: String,
    pub code: u8,
    pub reason: String,
    pub data: Vec<u8>,
}

impl Encodable for RejectMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_string(&self.message);
        writer.write_u8(self.code);
        writer.write_var_string(&self.reason);
        writer.write_bytes(&self.data);
    }
}

impl Decodable for RejectMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let message = reader.read_var_string().map_err(field("message"))?;
        let code = reader.read_u8().map_err(field("code"))?;
        let reason = reader.read_var_string().map_err(field("reason"))?;
        let data = reader
            .read_bytes(reader.remaining())
            .map_err(field("data"))?;

        Ok(Self {
            message,
            code,
            reason,
            data,
        })
    }
}

/// A signed network alert. The signature is carried, not verified;
/// alert handling policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Encodable for AlertMessage {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_var_bytes(&self.message);
        writer.write_var_bytes(&self.signature);
    }
}

impl Decodable for AlertMessage {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let message = reader.read_var_bytes().map_err(field("message"))?;
        let signature = reader.read_var_bytes().map_err(field("signature"))?;
        Ok(Self { message, signature })
    }
}
