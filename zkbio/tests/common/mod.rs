//! In-memory terminal used by the integration tests
//!
//! `FakeDevice` implements `Transport`: every frame written to it is decoded
//! and answered immediately, and the answers are queued for `receive_exact`.
//! Clones share state, so a test keeps one clone for assertions.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;

use zkbio::{Command, DeviceConfig, Packet, SegmentedBuffer, TextEncoding};
use zkbio_core::auth::make_commkey;
use zkbio_core::hash::rolling_hash;
use zkbio_transport::{Error as TransportError, Result as TransportResult, Transport};

#[derive(Default)]
pub struct FakeState {
    pub connected: bool,
    pub session_key: u16,
    pub comm_key: u32,
    pub accept_conn: bool,

    /// Every request received, in order
    pub requests: Vec<Packet>,

    pub properties: HashMap<String, String>,

    /// Bulk tables by data id, including the device's length prefix
    pub tables: HashMap<u32, SegmentedBuffer>,

    /// Single streamed objects by request command code
    pub streams: HashMap<u16, Bytes>,

    /// Fixed replies by request command code
    pub replies: HashMap<u16, (Command, Bytes)>,

    /// Answer `check_hash` with this instead of the real hash
    pub hash_override: Option<u32>,

    /// Drop the link when this command arrives
    pub hang_up_on: Option<Command>,

    pub upload: BytesMut,

    streaming: Option<u32>,
    outbox: VecDeque<u8>,
}

#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn new(session_key: u16) -> Self {
        let device = Self::default();
        device.state.lock().session_key = session_key;
        device
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn set_property(&self, key: &str, value: &str) {
        self.with(|s| s.properties.insert(key.to_string(), value.to_string()));
    }

    /// Serve `records` for `data_id`, behind a 4-byte length prefix
    pub fn set_table(&self, data_id: u32, records: &[u8]) {
        let mut buffer = SegmentedBuffer::from_bytes(records, TextEncoding::Latin1);
        buffer.add_leading_length(4).unwrap();
        self.with(|s| s.tables.insert(data_id, buffer));
    }

    /// Serve `data` for `data_id` exactly as given
    pub fn set_raw_table(&self, data_id: u32, data: &[u8]) {
        let buffer = SegmentedBuffer::from_bytes(data, TextEncoding::Latin1);
        self.with(|s| s.tables.insert(data_id, buffer));
    }

    pub fn set_stream(&self, command: Command, content: impl Into<Bytes>) {
        self.with(|s| s.streams.insert(command.code(), content.into()));
    }

    pub fn set_reply(&self, request: Command, reply: Command, payload: impl Into<Bytes>) {
        self.with(|s| s.replies.insert(request.code(), (reply, payload.into())));
    }

    pub fn requests(&self) -> Vec<Packet> {
        self.with(|s| s.requests.clone())
    }

    /// Commands received, in order
    pub fn commands(&self) -> Vec<Command> {
        self.requests()
            .iter()
            .filter_map(|p| p.kind())
            .collect()
    }

    pub fn last_request(&self, command: Command) -> Option<Packet> {
        self.requests().into_iter().rev().find(|p| p.is(command))
    }

    pub fn count(&self, command: Command) -> usize {
        self.requests().iter().filter(|p| p.is(command)).count()
    }
}

impl FakeState {
    fn reply(&mut self, request: &Packet, command: Command, payload: impl Into<Bytes>) {
        let packet = Packet::with_payload(command, self.session_key, request.sequence, payload.into());
        self.outbox.extend(packet.encode().iter());
    }

    fn handle(&mut self, request: &Packet) {
        let Some(command) = request.kind() else {
            self.reply(request, Command::NotSupport, Bytes::new());
            return;
        };

        if let Some((reply, payload)) = self.replies.get(&command.code()).cloned() {
            self.reply(request, reply, payload);
            return;
        }

        match command {
            Command::Connect => {
                let reply = if self.accept_conn { Command::AcceptConn } else { Command::Ack };
                self.reply(request, reply, Bytes::new());
            }
            Command::Login => {
                let mask = request.payload.get(2).copied().unwrap_or_default();
                let expected = make_commkey(self.comm_key, self.session_key, mask);
                let reply = if request.payload == expected { Command::Ack } else { Command::Nak };
                self.reply(request, reply, Bytes::new());
            }
            Command::GetData => {
                let key = String::from_utf8_lossy(&request.payload)
                    .trim_end_matches('\0')
                    .to_string();
                match self.properties.get(&key).cloned() {
                    Some(value) => {
                        let text = format!("{key}={value}\0");
                        self.reply(request, Command::Ack, text.into_bytes());
                    }
                    None => self.reply(request, Command::NoSysOp, Bytes::new()),
                }
            }
            Command::SetData => {
                let text = String::from_utf8_lossy(&request.payload).to_string();
                if let Some((key, value)) = text.split_once('=') {
                    self.properties.insert(key.to_string(), value.to_string());
                }
                self.reply(request, Command::Ack, Bytes::new());
            }
            Command::StartBuffStream => {
                let data_id = u32::from_le_bytes([
                    request.payload[0],
                    request.payload[1],
                    request.payload[2],
                    request.payload[3],
                ]);
                match self.tables.get(&data_id).map(|t| t.len() as u32) {
                    Some(total) => {
                        let mut payload = BytesMut::new();
                        payload.put_u8(0);
                        payload.put_u32_le(total);
                        payload.put_bytes(0, 4);
                        self.streaming = Some(data_id);
                        self.reply(request, Command::Ack, payload.freeze());
                    }
                    None => self.reply(request, Command::NoData, Bytes::new()),
                }
            }
            Command::BuffStream => {
                let offset = u32::from_le_bytes(request.payload[0..4].try_into().unwrap()) as usize;
                let length = u32::from_le_bytes(request.payload[4..8].try_into().unwrap()) as usize;
                let data_id = self.streaming.expect("buff_stream outside a download");
                let segment = Bytes::copy_from_slice(self.tables[&data_id].segment(offset, length));

                let mut header = BytesMut::new();
                header.put_u32_le(segment.len() as u32);
                self.reply(request, Command::RecvBuffHeader, header.freeze());
                self.reply(request, Command::RecvBuffContent, segment);
                self.reply(request, Command::Ack, Bytes::new());
            }
            Command::EndBuffStream => {
                self.streaming = None;
                self.reply(request, Command::Ack, Bytes::new());
            }
            Command::RecvBuffHeader => {
                self.upload.clear();
                self.reply(request, Command::Ack, Bytes::new());
            }
            Command::RecvBuffContent => {
                self.upload.extend_from_slice(&request.payload);
                self.reply(request, Command::Ack, Bytes::new());
            }
            Command::CheckHash => {
                let hash = self.hash_override.unwrap_or_else(|| rolling_hash(&self.upload));
                self.reply(request, Command::Ack, hash.to_le_bytes().to_vec());
            }
            Command::GetFpEx
            | Command::GetFp
            | Command::GetFace
            | Command::GetUserPic
            | Command::GetTableStruct => match self.streams.get(&command.code()).cloned() {
                Some(content) => {
                    let mut header = BytesMut::new();
                    header.put_u32_le(content.len() as u32);
                    header.put_u32_le(0);
                    self.reply(request, Command::RecvBuffHeader, header.freeze());
                    self.reply(request, Command::RecvBuffContent, content);
                    self.reply(request, Command::Ack, Bytes::new());
                }
                None => self.reply(request, Command::Nak, Bytes::new()),
            },
            _ => self.reply(request, Command::Ack, Bytes::new()),
        }
    }
}

#[async_trait]
impl Transport for FakeDevice {
    async fn connect(&mut self) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.connected {
            return Err(TransportError::AlreadyConnected);
        }
        state.connected = true;
        state.outbox.clear();
        Ok(())
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        let mut state = self.state.lock();
        state.connected = false;
        state.outbox.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn send(&mut self, data: &[u8]) -> TransportResult<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }

        let request = Packet::decode(data).expect("client sent an invalid frame");
        state.requests.push(request.clone());

        if state.hang_up_on.is_some_and(|c| request.is(c)) {
            return Ok(());
        }

        state.handle(&request);
        Ok(())
    }

    async fn receive_exact(&mut self, len: usize) -> TransportResult<BytesMut> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.outbox.len() < len {
            return Err(TransportError::ConnectionClosed);
        }

        let mut out = BytesMut::with_capacity(len);
        out.extend(state.outbox.drain(..len));
        Ok(out)
    }

    fn remote_addr(&self) -> String {
        "fake:4370".to_string()
    }
}

pub fn config() -> DeviceConfig {
    DeviceConfig::new("fake", 4370)
}
