use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::BitOr;

use super::errors::StreamError;
use super::stream::{ByteReader, ByteWriter};

/// ServiceFlags represents the service flags of a node,
/// a u64 bitfield transmitted in version and addr messages.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ServiceFlags(u64);

impl ServiceFlags {
    /// This node is not a full node. It may not be able to provide any data
    /// except for the transactions it originates.
    pub const UNNAMED: ServiceFlags = ServiceFlags(0);

    /// This is a full node and can be asked for full blocks.
    pub const NODE_NETWORK: ServiceFlags = ServiceFlags(0x1);

    /// This is a full node capable of responding to the getutxo protocol
    /// request.
    pub const NODE_GETUTXO: ServiceFlags = ServiceFlags(0x2);

    /// This is a full node capable and willing to handle bloom-filtered
    /// connections.
    pub const NODE_BLOOM: ServiceFlags = ServiceFlags(0x4);

    /// This is a full node that can be asked for blocks and transactions
    /// including witness data.
    pub const NODE_WITNESS: ServiceFlags = ServiceFlags(0x8);

    /// Same as NODE_NETWORK but the node guarantees at least the last 288
    /// blocks.
    pub const NODE_NETWORK_LIMITED: ServiceFlags = ServiceFlags(0x0400);

    /// Gets the integer representation of this ServiceFlags
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Gets the ServiceFlags from an integer representation
    pub const fn from_u64(n: u64) -> Self {
        ServiceFlags(n)
    }

    /// Returns true if all bits in `other` are set.
    pub const fn contains(self, other: ServiceFlags) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for ServiceFlags {
    fn from(n: u64) -> Self {
        ServiceFlags(n)
    }
}

impl BitOr for ServiceFlags {
    type Output = ServiceFlags;

    fn bitor(self, rhs: ServiceFlags) -> ServiceFlags {
        ServiceFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "ServiceFlags(UNNAMED)");
        }

        let named = [
            (Self::NODE_NETWORK, "NODE_NETWORK"),
            (Self::NODE_GETUTXO, "NODE_GETUTXO"),
            (Self::NODE_BLOOM, "NODE_BLOOM"),
            (Self::NODE_WITNESS, "NODE_WITNESS"),
            (Self::NODE_NETWORK_LIMITED, "NODE_NETWORK_LIMITED"),
        ];
        let names: Vec<&str> = named
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        write!(f, "ServiceFlags({}) [0x{:016x}]", names.join(" | "), self.0)
    }
}

/// IP address of a peer. Both variants share one 16-byte field on the
/// wire; IPv4 uses the `::ffff:`-mapped form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

const IPV4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF];

impl IpAddress {
    fn to_wire(self) -> [u8; 16] {
        match self {
            IpAddress::V4(ip) => ip.to_ipv6_mapped().octets(),
            IpAddress::V6(ip) => ip.octets(),
        }
    }

    fn from_wire(bytes: [u8; 16]) -> Self {
        if bytes[..12] == IPV4_MAPPED_PREFIX {
            IpAddress::V4(Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]))
        } else {
            IpAddress::V6(Ipv6Addr::from(bytes))
        }
    }
}

impl From<IpAddr> for IpAddress {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => IpAddress::V4(ip),
            IpAddr::V6(ip) => IpAddress::V6(ip),
        }
    }
}

/// A peer address record: service bitmask, IP and port, with an optional
/// last-seen timestamp.
///
/// Encodes to 26 bytes without the timestamp (version messages) or 30
/// bytes with it (addr messages). The port is in network byte order;
/// everything else is little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddress {
    pub services: ServiceFlags,
    pub ip: IpAddress,
    pub port: u16,
    pub timestamp: Option<u32>,
}

impl PeerAddress {
    pub fn new(services: ServiceFlags, ip: IpAddress, port: u16) -> Self {
        Self {
            services,
            ip,
            port,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn from_socket_addr(services: ServiceFlags, socket: SocketAddr) -> Self {
        Self::new(services, socket.ip().into(), socket.port())
    }

    pub fn write(&self, writer: &mut ByteWriter, include_timestamp: bool) {
        if include_timestamp {
            writer.write_u32_le(self.timestamp.unwrap_or(0));
        }
        writer.write_u64_le(self.services.to_u64());
        writer.write_bytes(&self.ip.to_wire());
        writer.write_u16_be(self.port);
    }

    pub fn read(
        reader: &mut ByteReader<'_>,
        include_timestamp: bool,
    ) -> Result<Self, StreamError> {
        let timestamp = if include_timestamp {
            Some(reader.read_u32_le()?)
        } else {
            None
        };

        let services = ServiceFlags::from_u64(reader.read_u64_le()?);

        let mut ip_bytes = [0u8; 16];
        ip_bytes.copy_from_slice(reader.read_slice(16)?);
        let ip = IpAddress::from_wire(ip_bytes);

        let port = reader.read_u16_be()?;

        Ok(Self {
            services,
            ip,
            port,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One addr-message entry: timestamp, NODE_NETWORK, ::ffff:10.0.0.1, 8333.
    const PEER_ADDRESS_BYTES: [u8; 30] = [
        0x11, 0xb2, 0xd0, 0x50, // Tue Dec 18 10:12:33 PST 2012
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 1 (NODE_NETWORK services)
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0xff, 0xff, 0x0a, 0x00, 0x00, 0x01, // IP of 10.0.0.1
        0x20, 0x8d, // Port 8333
    ];

    #[test]
    fn decodes_timestamped_address() {
        let mut reader = ByteReader::new(&PEER_ADDRESS_BYTES);
        let address = PeerAddress::read(&mut reader, true).unwrap();

        assert_eq!(address.timestamp, Some(1355854353));
        assert_eq!(address.services, ServiceFlags::NODE_NETWORK);
        assert_eq!(address.ip, IpAddress::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(address.port, 8333);
        assert!(reader.is_empty());
    }

    #[test]
    fn reencodes_timestamped_address_byte_exact() {
        let address = PeerAddress::new(
            ServiceFlags::NODE_NETWORK,
            IpAddress::V4(Ipv4Addr::new(10, 0, 0, 1)),
            8333,
        )
        .with_timestamp(1355854353);

        let mut writer = ByteWriter::new();
        address.write(&mut writer, true);
        assert_eq!(writer.into_bytes(), PEER_ADDRESS_BYTES.to_vec());
    }

    #[test]
    fn version_form_is_26_bytes() {
        let address = PeerAddress::new(
            ServiceFlags::NODE_NETWORK,
            IpAddress::V4(Ipv4Addr::new(10, 0, 0, 1)),
            8333,
        );

        let mut writer = ByteWriter::new();
        address.write(&mut writer, false);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 26);

        let mut reader = ByteReader::new(&bytes);
        let decoded = PeerAddress::read(&mut reader, false).unwrap();
        assert_eq!(decoded, address);
    }

    #[test]
    fn ipv6_round_trip() {
        let ip = Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 1);
        let address = PeerAddress::new(ServiceFlags::NODE_WITNESS, IpAddress::V6(ip), 8333);

        let mut writer = ByteWriter::new();
        address.write(&mut writer, false);
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        let decoded = PeerAddress::read(&mut reader, false).unwrap();
        assert_eq!(decoded.ip, IpAddress::V6(ip));
    }

    #[test]
    fn truncated_record_fails() {
        let mut reader = ByteReader::new(&PEER_ADDRESS_BYTES[..20]);
        assert!(PeerAddress::read(&mut reader, true).is_err());
    }

    #[test]
    fn service_flag_names() {
        let flags = ServiceFlags::NODE_NETWORK | ServiceFlags::NODE_BLOOM;
        assert!(flags.contains(ServiceFlags::NODE_NETWORK));
        assert!(flags.contains(ServiceFlags::NODE_BLOOM));
        assert!(!flags.contains(ServiceFlags::NODE_WITNESS));
        let rendered = format!("{:?}", flags);
        assert!(rendered.contains("NODE_NETWORK | NODE_BLOOM"));
    }
}
