use super::errors::FramingError;

/// Represents the network to which a message belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Mainnet
    /// Default Port 8333
    MainNet,

    /// Testnet
    /// Default Port 18333
    TestNet,

    /// Regtest
    /// Default Port 18444
    RegTest,
}

impl Network {
    /// The 4-byte magic value that starts every message on this network.
    pub fn magic(&self) -> [u8; 4] {
        match self {
            Network::MainNet => [0xf9, 0xbe, 0xb4, 0xd9],
            Network::TestNet => [0x0b, 0x11, 0x09, 0x07],
            Network::RegTest => [0xfa, 0xbf, 0xb5, 0xda],
        }
    }

    pub fn from_magic(bytes: [u8; 4]) -> Result<Self, FramingError> {
        match bytes {
            [0xf9, 0xbe, 0xb4, 0xd9] => Ok(Self::MainNet),
            [0x0b, 0x11, 0x09, 0x07] => Ok(Self::TestNet),
            [0xfa, 0xbf, 0xb5, 0xda] => Ok(Self::RegTest),
            _ => Err(FramingError::BadMagic),
        }
    }
}
