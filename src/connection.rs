use std::io::{self, Read, Write};

use super::command::Command;
use super::errors::{ConnectionError, DecodeError, FramingError, Result};
use super::message::{checksum, FrameHeader, Message, HEADER_SIZE};
use super::network::Network;
use super::payload::{Payload, VersionMessage};

/// Handshake state of a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    Disconnected,
    Connecting,
    AwaitingRemoteVersion,
    AwaitingVerAck,
    Connected,
}

/// Why a connection ended.
#[derive(Debug)]
pub enum DisconnectReason {
    /// Local caller asked for the close.
    Requested,
    /// The remote side closed the transport.
    RemoteClosed,
    TransportError(io::Error),
    /// The byte stream could no longer be trusted (bad magic, bad
    /// checksum, oversized frame).
    FatalFraming(FramingError),
}

/// Receives connection lifecycle and traffic notifications.
///
/// All methods default to no-ops so a delegate implements only what it
/// cares about. The connection never hands out `&mut self` access to
/// itself; a delegate that wants to reply records the intent and sends
/// after the `receive` call returns.
pub trait PeerConnectionDelegate {
    /// The handshake completed; normal traffic may flow.
    fn on_connected(&mut self, _remote_version: &VersionMessage) {}

    /// The connection reached `Disconnected`. Called exactly once per
    /// established connection, whatever the cause.
    fn on_disconnected(&mut self, _reason: &DisconnectReason) {}

    /// A fully decoded message arrived while connected.
    fn on_message(&mut self, _payload: Payload) {}

    /// A frame was carved but its payload could not be decoded, or its
    /// command is unknown. The connection keeps running.
    fn on_decode_warning(&mut self, _command: &str, _error: &DecodeError) {}
}

/// One peer connection: owns the transport and the receive buffer, drives
/// the version/verack handshake, frames outgoing messages and carves
/// incoming ones.
///
/// The transport is any blocking duplex byte channel; opening it (TCP,
/// proxies, timeouts) is the caller's concern. All reads and sends go
/// through `&mut self`, which serializes them: bytes are processed in
/// arrival order and outgoing frames are never interleaved.
pub struct PeerConnection<T, D> {
    network: Network,
    transport: Option<T>,
    state: PeerConnectionState,
    recv_buffer: Vec<u8>,
    remote_version: Option<VersionMessage>,
    delegate: D,
}

impl<T: Read + Write, D: PeerConnectionDelegate> PeerConnection<T, D> {
    pub fn new(network: Network, delegate: D) -> Self {
        Self {
            network,
            transport: None,
            state: PeerConnectionState::Disconnected,
            recv_buffer: Vec::new(),
            remote_version: None,
            delegate,
        }
    }

    pub fn state(&self) -> PeerConnectionState {
        self.state
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The remote peer's version message, once received.
    pub fn remote_version(&self) -> Option<&VersionMessage> {
        self.remote_version.as_ref()
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Starts the handshake over an opened transport: sends the local
    /// version message and waits for the remote one.
    pub fn connect(&mut self, transport: T, version: VersionMessage) -> Result<()> {
        if self.transport.is_some() || self.state != PeerConnectionState::Disconnected {
            return Err(ConnectionError::AlreadyConnected.into());
        }

        self.state = PeerConnectionState::Connecting;
        self.transport = Some(transport);
        self.recv_buffer.clear();
        self.remote_version = None;

        if let Err(error) = self.write_message(Payload::Version(version)) {
            let returned = io::Error::new(error.kind(), error.to_string());
            self.teardown(DisconnectReason::TransportError(error));
            return Err(ConnectionError::Io(returned).into());
        }

        self.state = PeerConnectionState::AwaitingRemoteVersion;
        Ok(())
    }

    /// Sends one message. Callers should wait for `Connected` before
    /// sending anything beyond the handshake.
    pub fn send(&mut self, payload: Payload) -> Result<()> {
        if self.transport.is_none() {
            return Err(ConnectionError::NotConnected.into());
        }

        if let Err(error) = self.write_message(payload) {
            let returned = io::Error::new(error.kind(), error.to_string());
            self.teardown(DisconnectReason::TransportError(error));
            return Err(ConnectionError::Io(returned).into());
        }
        Ok(())
    }

    /// Performs one transport read and processes every complete frame the
    /// new bytes finish. Messages split across reads are reassembled;
    /// several messages arriving in one read are all dispatched.
    pub fn receive(&mut self) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(ConnectionError::NotConnected.into());
        };

        let mut chunk = [0u8; 4096];
        match transport.read(&mut chunk) {
            Ok(0) => {
                self.teardown(DisconnectReason::RemoteClosed);
                Ok(())
            }
            Ok(read) => {
                self.recv_buffer.extend_from_slice(&chunk[..read]);
                self.process_buffer();
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => Ok(()),
            Err(error) => {
                let returned = io::Error::new(error.kind(), error.to_string());
                self.teardown(DisconnectReason::TransportError(error));
                Err(ConnectionError::Io(returned).into())
            }
        }
    }

    /// Drives [`Self::receive`] until the connection is torn down.
    pub fn run(&mut self) -> Result<()> {
        while self.transport.is_some() {
            self.receive()?;
        }
        Ok(())
    }

    /// Closes the connection. Safe to call in any state and repeatedly;
    /// the delegate hears about it once.
    pub fn close(&mut self) {
        self.teardown(DisconnectReason::Requested);
    }

    fn write_message(&mut self, payload: Payload) -> io::Result<()> {
        let bytes = Message::new(self.network, payload).to_bytes();
        let Some(transport) = self.transport.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no transport"));
        };
        transport.write_all(&bytes)
    }

    fn process_buffer(&mut self) {
        while self.recv_buffer.len() >= HEADER_SIZE {
            let header = match FrameHeader::parse(&self.recv_buffer) {
                Ok(header) => header,
                Err(error) => {
                    self.teardown(DisconnectReason::FatalFraming(error));
                    return;
                }
            };
            if header.network != self.network {
                self.teardown(DisconnectReason::FatalFraming(FramingError::BadMagic));
                return;
            }

            let frame_length = HEADER_SIZE + header.payload_length;
            if self.recv_buffer.len() < frame_length {
                // Partial frame; the declared length is already bounded, so
                // waiting for the rest cannot grow the buffer unboundedly.
                return;
            }

            let payload_bytes = self.recv_buffer[HEADER_SIZE..frame_length].to_vec();
            self.recv_buffer.drain(..frame_length);

            if header.checksum != checksum(&payload_bytes) {
                self.teardown(DisconnectReason::FatalFraming(FramingError::BadChecksum));
                return;
            }

            let command = match Command::from_bytes(&header.command_bytes) {
                Ok(command) => command,
                Err(error) => {
                    let name = String::from_utf8_lossy(&header.command_bytes).replace('\0', "");
                    tracing::warn!(command = name.as_str(), "skipping unsupported command");
                    self.delegate.on_decode_warning(&name, &error);
                    continue;
                }
            };

            match Payload::from_bytes(command, &payload_bytes) {
                Ok(payload) => self.handle_message(payload),
                Err(error) => self.delegate.on_decode_warning(command.name(), &error),
            }
        }
    }

    fn handle_message(&mut self, payload: Payload) {
        match self.state {
            PeerConnectionState::AwaitingRemoteVersion => match payload {
                Payload::Version(version) => {
                    self.remote_version = Some(version);
                    if let Err(error) = self.write_message(Payload::VerAck) {
                        self.teardown(DisconnectReason::TransportError(error));
                        return;
                    }
                    self.state = PeerConnectionState::AwaitingVerAck;
                }
                other => self.discard_before_connected(other),
            },
            PeerConnectionState::AwaitingVerAck => match payload {
                Payload::VerAck => {
                    self.state = PeerConnectionState::Connected;
                    if let Some(version) = &self.remote_version {
                        self.delegate.on_connected(version);
                    }
                }
                other => self.discard_before_connected(other),
            },
            PeerConnectionState::Connected => self.delegate.on_message(payload),
            PeerConnectionState::Disconnected | PeerConnectionState::Connecting => {
                self.discard_before_connected(payload)
            }
        }
    }

    fn discard_before_connected(&mut self, payload: Payload) {
        tracing::warn!(
            command = payload.command().name(),
            state = ?self.state,
            "discarding message received before handshake completed",
        );
    }

    fn teardown(&mut self, reason: DisconnectReason) {
        if self.transport.is_none() && self.state == PeerConnectionState::Disconnected {
            return;
        }

        // Dropping the transport closes it.
        self.transport = None;
        self.state = PeerConnectionState::Disconnected;
        self.recv_buffer.clear();

        if !matches!(reason, DisconnectReason::Requested) {
            tracing::warn!(reason = ?reason, "peer connection lost");
        }
        self.delegate.on_disconnected(&reason);
    }
}
