use super::errors::DecodeError;

/// Size of the command field in the message header.
pub const COMMAND_NAME_SIZE: usize = 12;

/// The closed set of protocol commands.
///
/// Each command maps to exactly one ASCII name, NUL-padded to 12 bytes on
/// the wire. Decoding a name outside this set is an
/// [`DecodeError::UnsupportedCommand`] outcome, never a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Version,
    VerAck,
    Addr,
    Inv,
    GetData,
    NotFound,
    GetBlocks,
    GetHeaders,
    Tx,
    Block,
    Headers,
    GetAddr,
    Mempool,
    Ping,
    Pong,
    Reject,
    FilterLoad,
    FilterAdd,
    FilterClear,
    MerkleBlock,
    Alert,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::VerAck => "verack",
            Command::Addr => "addr",
            Command::Inv => "inv",
            Command::GetData => "getdata",
            Command::NotFound => "notfound",
            Command::GetBlocks => "getblocks",
            Command::GetHeaders => "getheaders",
            Command::Tx => "tx",
            Command::Block => "block",
            Command::Headers => "headers",
            Command::GetAddr => "getaddr",
            Command::Mempool => "mempool",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Reject => "reject",
            Command::FilterLoad => "filterload",
            Command::FilterAdd => "filteradd",
            Command::FilterClear => "filterclear",
            Command::MerkleBlock => "merkleblock",
            Command::Alert => "alert",
        }
    }

    /// Returns the command field NUL-padded to 12 bytes.
    pub fn to_bytes(&self) -> [u8; COMMAND_NAME_SIZE] {
        let name = self.name().as_bytes();
        let mut padded = [0u8; COMMAND_NAME_SIZE];
        padded[..name.len()].copy_from_slice(name);
        padded
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let name = String::from_utf8_lossy(bytes).replace('\0', "");

        Ok(match name.as_str() {
            "version" => Self::Version,
            "verack" => Self::VerAck,
            "addr" => Self::Addr,
            "inv" => Self::Inv,
            "getdata" => Self::GetData,
            "notfound" => Self::NotFound,
            "getblocks" => Self::GetBlocks,
            "getheaders" => Self::GetHeaders,
            "tx" => Self::Tx,
            "block" => Self::Block,
            "headers" => Self::Headers,
            "getaddr" => Self::GetAddr,
            "mempool" => Self::Mempool,
            "ping" => Self::Ping,
            "pong" => Self::Pong,
            "reject" => Self::Reject,
            "filterload" => Self::FilterLoad,
            "filteradd" => Self::FilterAdd,
            "filterclear" => Self::FilterClear,
            "merkleblock" => Self::MerkleBlock,
            "alert" => Self::Alert,
            _ => return Err(DecodeError::UnsupportedCommand(name)),
        })
    }
}
