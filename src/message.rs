use super::command::{Command, COMMAND_NAME_SIZE};
use super::errors::{FramingError, Result};
use super::network::Network;
use super::payload::Payload;
use super::stream::double_sha256;

const START_STRING_SIZE: usize = 4;
const PAYLOAD_LEN_SIZE: usize = 4;
const CHECKSUM_SIZE: usize = 4;
pub(crate) const HEADER_SIZE: usize =
    START_STRING_SIZE + COMMAND_NAME_SIZE + PAYLOAD_LEN_SIZE + CHECKSUM_SIZE;

// 32 MB
pub(crate) const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

const HEADER_START_STRING_RANGE: std::ops::Range<usize> = 0..4;
const HEADER_COMMAND_NAME_RANGE: std::ops::Range<usize> = 4..16;
const HEADER_PAYLOAD_LEN_RANGE: std::ops::Range<usize> = 16..20;
const HEADER_CHECKSUM_RANGE: std::ops::Range<usize> = 20..24;

/// A framed protocol message: network magic, command, payload length,
/// payload checksum, payload. The command comes from the payload variant,
/// so a mismatched pair cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub network: Network,
    pub payload: Payload,
}

impl Message {
    pub fn new(network: Network, payload: Payload) -> Self {
        Self { network, payload }
    }

    pub fn command(&self) -> Command {
        self.payload.command()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // https://developer.bitcoin.org/reference/p2p_networking.html#message-headers
        let payload_bytes = self.payload.to_bytes();
        let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());

        // start string char[4]
        buffer.extend_from_slice(&self.network.magic());

        // command name char[12], NUL padded
        buffer.extend_from_slice(&self.command().to_bytes());

        // payload length uint32 (4 bytes)
        buffer.extend_from_slice(&(payload_bytes.len() as u32).to_le_bytes());

        // checksum char[4]
        buffer.extend_from_slice(&checksum(&payload_bytes));

        // 24 bytes written so far

        // payload char[..] (variable length)
        buffer.extend_from_slice(&payload_bytes);

        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(bytes)?;

        let available = &bytes[HEADER_SIZE..];
        if available.len() < header.payload_length {
            return Err(FramingError::LengthMismatch.into());
        }
        let payload_bytes = &available[..header.payload_length];

        if header.checksum != checksum(payload_bytes) {
            return Err(FramingError::BadChecksum.into());
        }

        let command = Command::from_bytes(&header.command_bytes)?;
        let payload = Payload::from_bytes(command, payload_bytes)?;

        Ok(Self {
            network: header.network,
            payload,
        })
    }
}

/// The fixed-size header fields of one frame, parsed before the payload
/// is available so the connection can wait for exactly the right number
/// of bytes. The declared length is validated against [`MAX_PAYLOAD_SIZE`]
/// here, before anything proportional to it is allocated.
pub(crate) struct FrameHeader {
    pub(crate) network: Network,
    pub(crate) command_bytes: [u8; COMMAND_NAME_SIZE],
    pub(crate) payload_length: usize,
    pub(crate) checksum: [u8; CHECKSUM_SIZE],
}

impl FrameHeader {
    pub(crate) fn parse(bytes: &[u8]) -> std::result::Result<Self, FramingError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FramingError::TruncatedHeader);
        }

        let mut magic = [0u8; START_STRING_SIZE];
        magic.copy_from_slice(&bytes[HEADER_START_STRING_RANGE]);
        let network = Network::from_magic(magic)?;

        let mut command_bytes = [0u8; COMMAND_NAME_SIZE];
        command_bytes.copy_from_slice(&bytes[HEADER_COMMAND_NAME_RANGE]);

        let mut length_bytes = [0u8; PAYLOAD_LEN_SIZE];
        length_bytes.copy_from_slice(&bytes[HEADER_PAYLOAD_LEN_RANGE]);
        let payload_length = u32::from_le_bytes(length_bytes) as usize;
        if payload_length > MAX_PAYLOAD_SIZE {
            return Err(FramingError::PayloadTooLarge);
        }

        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&bytes[HEADER_CHECKSUM_RANGE]);

        Ok(Self {
            network,
            command_bytes,
            payload_length,
            checksum,
        })
    }
}

/// First 4 bytes of SHA256(SHA256(data)).
pub(crate) fn checksum(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let hash = double_sha256(data);

    let mut buffer = [0u8; CHECKSUM_SIZE];
    buffer.copy_from_slice(&hash[..CHECKSUM_SIZE]);

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DecodeError, Error};
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn envelope_round_trip(network: Network, nonce: u64) {
        let message = Message::new(network, Payload::Ping(nonce));
        let bytes = message.to_bytes();
        let decoded = Message::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn verack_frame_layout() {
        let message = Message::new(Network::MainNet, Payload::VerAck);
        let bytes = message.to_bytes();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &[0xf9, 0xbe, 0xb4, 0xd9]);
        assert_eq!(&bytes[4..10], b"verack");
        assert_eq!(&bytes[10..16], &[0u8; 6]);
        assert_eq!(&bytes[16..20], &[0u8; 4]);
        // checksum of the empty payload
        assert_eq!(&bytes[20..24], &[0x5d, 0xf6, 0xe0, 0xe2]);
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = Message::new(Network::MainNet, Payload::VerAck).to_bytes();
        let err = Message::from_bytes(&bytes[..HEADER_SIZE - 1]).unwrap_err();
        assert!(matches!(
            err,
            Error::Framing(FramingError::TruncatedHeader)
        ));
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut bytes = Message::new(Network::MainNet, Payload::Ping(7)).to_bytes();
        bytes[0] = 0xde;
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Framing(FramingError::BadMagic)));
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut bytes = Message::new(Network::MainNet, Payload::Ping(7)).to_bytes();
        bytes[20] ^= 0xFF;
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Framing(FramingError::BadChecksum)));
    }

    #[test]
    fn rejects_corrupted_payload() {
        let mut bytes = Message::new(Network::MainNet, Payload::Ping(7)).to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Framing(FramingError::BadChecksum)));
    }

    #[test]
    fn rejects_declared_length_beyond_available_bytes() {
        let mut bytes = Message::new(Network::MainNet, Payload::Ping(7)).to_bytes();
        bytes[16] = 0x09; // declare 9 payload bytes, only 8 present
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Framing(FramingError::LengthMismatch)
        ));
    }

    #[test]
    fn rejects_implausibly_large_declared_length() {
        let mut bytes = Message::new(Network::MainNet, Payload::VerAck).to_bytes();
        bytes[16..20].copy_from_slice(&(33u32 * 1024 * 1024).to_le_bytes());
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Framing(FramingError::PayloadTooLarge)
        ));
    }

    #[test]
    fn unknown_command_is_a_decode_error() {
        let mut bytes = Message::new(Network::MainNet, Payload::VerAck).to_bytes();
        bytes[4..16].copy_from_slice(b"wtfmessage\0\0");
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnsupportedCommand(name)) if name == "wtfmessage"
        ));
    }

    #[test]
    fn checksum_is_truncated_double_sha256() {
        assert_eq!(checksum(&[]), [0x5d, 0xf6, 0xe0, 0xe2]);
    }
}
