//! Session state machine over a transport
//!
//! A [`Connection`] owns the transport and the [`Session`] and performs one
//! request/response exchange at a time. Every method takes `&mut self`, so
//! nothing is ever pipelined.

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace, warn};

use zkbio_core::constants::MAX_FRAME_SIZE;
use zkbio_core::{Command, Packet, Session, SessionState, auth};
use zkbio_transport::Transport;

use crate::config::{ConnectVariant, DeviceConfig};
use crate::error::{Error, Result};
use crate::trace::PacketTrace;

/// A session with one device
pub struct Connection {
    transport: Box<dyn Transport>,
    session: Session,
    variant: ConnectVariant,
    comm_key: u32,
    trace: Option<Arc<dyn PacketTrace>>,
}

impl Connection {
    pub fn new(transport: Box<dyn Transport>, config: &DeviceConfig) -> Self {
        Self {
            transport,
            session: Session::new(),
            variant: config.variant,
            comm_key: config.comm_key,
            trace: config.trace.clone(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Check if commands may be sent
    pub fn is_connected(&self) -> bool {
        self.session.is_ready() && self.transport.is_connected()
    }

    pub fn remote_addr(&self) -> String {
        self.transport.remote_addr()
    }

    /// Open the transport and run the connect (and login) handshake
    ///
    /// An existing connection is closed first. On failure the transport is
    /// closed again and the session is left `Disconnected`.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.state() != SessionState::Disconnected || self.transport.is_connected() {
            self.disconnect().await?;
        }

        info!("Connecting to {}...", self.transport.remote_addr());

        self.transport.connect().await?;
        self.session.begin_connect()?;

        match self.handshake().await {
            Ok(()) => {
                info!(
                    "Connected successfully (session_key=0x{:04X})",
                    self.session.session_key()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Connect handshake failed: {}", e);
                self.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<()> {
        let response = self.exchange(Command::Connect, Bytes::new()).await?;
        Self::verify_response(&response, &[self.variant.expected_reply()])
            .map_err(|e| Error::Protocol(format!("connect refused: {e}")))?;

        self.session.exchange_key(response.session_key)?;
        debug!("Session key assigned: 0x{:04X}", response.session_key);

        if self.comm_key != 0 {
            debug!("Device has a comm key, logging in...");

            let payload = auth::make_commkey(self.comm_key, response.session_key, auth::draw_mask());
            let response = self.exchange(Command::Login, payload).await?;
            Self::verify_response(&response, &[Command::Ack])?;

            self.session.authenticate()?;
        }

        self.session.mark_ready()?;
        Ok(())
    }

    /// Close the connection
    ///
    /// Sends a best-effort `disconnect`; its failure is logged, never
    /// returned. The transport is always closed.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.is_connected() {
            info!("Disconnecting from {}...", self.transport.remote_addr());

            if let Err(e) = self.send_command(Command::Disconnect, Bytes::new(), &[Command::Ack]).await {
                warn!("Failed to send disconnect command: {}", e);
            }
        }

        self.close().await;

        info!("Disconnected");
        Ok(())
    }

    /// Drop the session and close the transport without a farewell
    pub async fn close(&mut self) {
        self.session.close();
        if let Err(e) = self.transport.disconnect().await {
            warn!("Failed to close transport: {}", e);
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    /// Send one request and return the reply, whatever its command
    pub async fn send_then_receive(&mut self, command: Command, payload: impl Into<Bytes>) -> Result<Packet> {
        self.ensure_connected()?;
        self.exchange(command, payload.into()).await
    }

    /// Send one request and check the reply is one of `expected`
    pub async fn send_command(
        &mut self,
        command: Command,
        payload: impl Into<Bytes>,
        expected: &[Command],
    ) -> Result<Packet> {
        let response = self.send_then_receive(command, payload).await?;
        Self::verify_response(&response, expected)?;
        Ok(response)
    }

    /// Send one request that must be acknowledged
    pub async fn send_ack(&mut self, command: Command, payload: impl Into<Bytes>) -> Result<Packet> {
        self.send_command(command, payload, &[Command::Ack]).await
    }

    /// Read one more frame of a multi-frame reply
    pub async fn receive_packet(&mut self) -> Result<Packet> {
        self.ensure_connected()?;
        let result = self.read_packet().await;
        self.check_link(result).await
    }

    /// Read one more frame and check its command
    pub async fn receive_expected(&mut self, expected: &[Command]) -> Result<Packet> {
        let packet = self.receive_packet().await?;
        Self::verify_response(&packet, expected)?;
        Ok(packet)
    }

    /// Fail with [`Error::UnexpectedResponse`] unless the reply is one of `expected`
    pub fn verify_response(packet: &Packet, expected: &[Command]) -> Result<()> {
        if expected.iter().any(|&command| packet.is(command)) {
            return Ok(());
        }
        Err(Error::UnexpectedResponse {
            expected: expected.to_vec(),
            received: packet.command,
        })
    }

    async fn exchange(&mut self, command: Command, payload: Bytes) -> Result<Packet> {
        let packet = Packet::with_payload(
            command,
            self.session.session_key(),
            self.session.next_sequence(),
            payload,
        );

        debug!("Sending {}", packet);

        let result = match self.send_packet(&packet).await {
            Ok(()) => self.read_packet().await,
            Err(e) => Err(e),
        };
        self.check_link(result).await
    }

    /// A lost link ends the session
    async fn check_link<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connection_lost() {
                warn!("Connection lost: {}", e);
                self.close().await;
            }
        }
        result
    }

    async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        trace!("Sending: {:?}", packet);

        let data = packet.encode();
        if let Some(sink) = &self.trace {
            sink.outbound(&data);
        }
        self.transport.send(&data).await?;

        Ok(())
    }

    async fn read_packet(&mut self) -> Result<Packet> {
        let header = self.transport.receive_exact(Packet::PREFIX_SIZE).await?;
        let prefix = Packet::parse(&header);

        if !prefix.is_valid(false, false) {
            return Err(invalid(format!("bad magic {:02X?}", prefix.magic.as_ref())));
        }

        let size = prefix.size as usize;
        if size < Packet::PREFIX_SIZE {
            return Err(invalid(format!("size field {size} shorter than a header")));
        }
        if size > MAX_FRAME_SIZE {
            return Err(invalid(format!("size field {size} exceeds {MAX_FRAME_SIZE}")));
        }

        let body = self.transport.receive_exact(size).await?;

        let mut frame = BytesMut::with_capacity(Packet::PREFIX_SIZE + size);
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&body);

        if let Some(sink) = &self.trace {
            sink.inbound(&frame);
        }

        let packet = Packet::parse(&frame);
        if !packet.is_valid(true, false) {
            return Err(invalid(format!(
                "checksum mismatch: received 0x{:04X}, computed 0x{:04X}",
                packet.checksum,
                packet.compute_checksum()
            )));
        }

        trace!("Received: {:?}", packet);
        Ok(packet)
    }

    /// Suspend the device's own input handling
    ///
    /// `timeout_secs` of 0 keeps it disabled until [`Connection::enable_device`].
    pub async fn disable_device(&mut self, timeout_secs: u32) -> Result<()> {
        debug!("Disabling device...");
        self.send_ack(Command::Disable, Bytes::copy_from_slice(&timeout_secs.to_le_bytes()))
            .await?;
        Ok(())
    }

    pub async fn enable_device(&mut self) -> Result<()> {
        debug!("Enabling device...");
        self.send_ack(Command::Enable, Bytes::new()).await?;
        Ok(())
    }

    /// Close a disable/enable bracket
    ///
    /// Always sends `enable`. An error from the bracketed operation wins
    /// over an error from `enable`, which is then only logged.
    ///
    /// ```ignore
    /// conn.disable_device(0).await?;
    /// let outcome = do_work(&mut conn).await;
    /// conn.release(outcome).await
    /// ```
    pub async fn release<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match (outcome, self.enable_device().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(enable_error)) => Err(enable_error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(enable_error)) => {
                warn!("Failed to re-enable device after error ({}): {}", error, enable_error);
                Err(error)
            }
        }
    }

    /// Persist pending changes on the device
    pub async fn save_data(&mut self) -> Result<()> {
        self.send_ack(Command::SaveData, Bytes::new()).await?;
        Ok(())
    }

    /// Hash of the last uploaded buffer, as computed by the device
    pub async fn check_hash(&mut self) -> Result<u32> {
        let response = self.send_ack(Command::CheckHash, Bytes::new()).await?;
        read_u32(&response.payload, 0, "check_hash reply")
    }
}

fn invalid(reason: String) -> Error {
    Error::Core(zkbio_core::Error::InvalidPacket(reason))
}

/// Read a LE u32 at `offset`, failing with a protocol error on short payloads
pub(crate) fn read_u32(payload: &[u8], offset: usize, what: &str) -> Result<u32> {
    payload
        .get(offset..offset + 4)
        .map(LittleEndian::read_u32)
        .ok_or_else(|| {
            Error::Protocol(format!(
                "{what}: expected at least {} bytes, got {}",
                offset + 4,
                payload.len()
            ))
        })
}
