use btc_spv::{
    DisconnectReason, Network, Payload, PeerAddress, PeerConnection, PeerConnectionDelegate,
    PeerConnectionState, ServiceFlags, VersionMessage,
};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// This example drives a full PeerConnection session against a live node:
/// handshake, then a few decoded messages, then a clean close.
const BTC_SEED: &str = "seed.bitcoin.sipa.be";

/// The port of the Bitcoin node.
const BTC_NODE_PORT: u16 = 8333;

/// How many decoded messages to print before closing.
const MESSAGE_BUDGET: usize = 5;

#[derive(Default)]
struct LoggingDelegate {
    messages_seen: usize,
}

impl PeerConnectionDelegate for LoggingDelegate {
    fn on_connected(&mut self, remote_version: &VersionMessage) {
        tracing::info!(
            user_agent = %remote_version.user_agent,
            start_height = remote_version.block_start_height,
            "handshake completed",
        );
    }

    fn on_disconnected(&mut self, reason: &DisconnectReason) {
        tracing::info!(?reason, "connection closed");
    }

    fn on_message(&mut self, payload: Payload) {
        self.messages_seen += 1;
        tracing::info!(command = payload.command().name(), "message received");
    }

    fn on_decode_warning(&mut self, command: &str, error: &btc_spv::DecodeError) {
        tracing::warn!(command, %error, "undecodable message skipped");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let socket = (BTC_SEED, BTC_NODE_PORT)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("no address for {}", BTC_SEED))?;

    tracing::info!("Connecting to {}", socket);
    let stream = TcpStream::connect_timeout(&socket, Duration::from_secs(5))?;
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    stream.set_write_timeout(Some(Duration::from_secs(10)))?;
    let local_addr = stream.local_addr()?;

    let version = VersionMessage::build(
        ServiceFlags::NODE_NETWORK,
        PeerAddress::from_socket_addr(ServiceFlags::NODE_NETWORK, socket),
        PeerAddress::from_socket_addr(ServiceFlags::NODE_NETWORK, local_addr),
        rand::random(),
        0x0,
        true,
    );

    let mut connection = PeerConnection::new(Network::MainNet, LoggingDelegate::default());
    connection.connect(stream, version)?;

    while connection.state() != PeerConnectionState::Disconnected
        && connection.delegate().messages_seen < MESSAGE_BUDGET
    {
        connection.receive()?;
    }

    connection.close();
    Ok(())
}
