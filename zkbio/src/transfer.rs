//! Bulk transfers
//!
//! Downloads announce a total size and are pulled in [`ChunkPlan`] ranges,
//! each range arriving as `recv_buff_header`, `recv_buff_content`, `ack`.
//! Uploads push a header and the content, then compare the device's
//! `check_hash` against the local rolling hash.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use zkbio_core::hash::rolling_hash;
use zkbio_core::{ChunkPlan, Command, Packet, SegmentedBuffer};
use zkbio_types::TextEncoding;

use crate::connection::{Connection, read_u32};
use crate::error::{Error, Result};

/// Replies that open a bulk download
const DOWNLOAD_REPLIES: &[Command] = &[
    Command::Ack,
    Command::Nak,
    Command::RecvBuffContent,
    Command::NoRecord,
    Command::NoData,
];

/// `nak` or a "nothing there" status
fn is_empty_reply(packet: &Packet) -> bool {
    packet.is(Command::Nak) || packet.kind().is_some_and(Command::is_empty_status)
}

/// A single streamed reply: the header's payload and the content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedReply {
    pub header: Bytes,
    pub content: Bytes,
}

impl StreamedReply {
    /// Size announced by the header, if it carries one
    pub fn announced_len(&self) -> Option<u32> {
        read_u32(&self.header, 0, "recv_buff_header").ok()
    }
}

impl Connection {
    /// Download the table identified by `data_id`
    ///
    /// Devices with nothing to send reply `nak`, `no_record` or `no_data`,
    /// which yields an empty buffer. A small table may come back inline as
    /// `recv_buff_content`. The result still carries the device's 4-byte
    /// length prefix.
    pub async fn download_buffer(&mut self, data_id: u32, encoding: TextEncoding) -> Result<SegmentedBuffer> {
        let mut buffer = SegmentedBuffer::new(encoding);

        let mut request = BytesMut::with_capacity(11);
        request.put_u32_le(data_id);
        request.put_bytes(0, 7);

        let response = self
            .send_command(Command::StartBuffStream, request.freeze(), DOWNLOAD_REPLIES)
            .await?;

        if is_empty_reply(&response) {
            debug!("Table 0x{:X} is empty", data_id);
            return Ok(buffer);
        }
        if response.is(Command::RecvBuffContent) {
            debug!("Table 0x{:X} delivered inline ({} bytes)", data_id, response.payload.len());
            buffer.append(&response.payload);
            return Ok(buffer);
        }

        let total = read_u32(&response.payload, 1, "start_buff_stream reply")?;
        let mut plan = ChunkPlan::new(total);

        debug!(
            "Downloading table 0x{:X}: {} bytes in {} chunk(s)",
            data_id,
            total,
            plan.chunk_count()
        );

        while let Some(chunk) = plan.next_request() {
            let header = self
                .send_command(
                    Command::BuffStream,
                    Bytes::copy_from_slice(&chunk.to_payload()),
                    &[Command::RecvBuffHeader],
                )
                .await?;

            let announced = read_u32(&header.payload, 0, "recv_buff_header")?;
            if announced == 0 {
                return Err(Error::Protocol(format!(
                    "device announced an empty chunk at offset {}",
                    chunk.offset
                )));
            }

            let content = self.receive_expected(&[Command::RecvBuffContent]).await?;
            buffer.append(&content.payload);
            self.receive_expected(&[Command::Ack]).await?;

            plan.advance(announced);
            trace!("Chunk at {} done, {} bytes remaining", chunk.offset, plan.remaining());
        }

        self.send_ack(Command::EndBuffStream, Bytes::new()).await?;

        Ok(buffer)
    }

    /// Push `data` into the device's receive buffer and verify it arrived intact
    ///
    /// The caller sends the command that applies the buffer afterwards; it
    /// must not do so when this fails with [`Error::IntegrityError`].
    pub async fn upload_buffer(&mut self, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            Error::Core(zkbio_core::Error::PayloadTooLarge {
                size: data.len(),
                max: u32::MAX as usize,
            })
        })?;

        debug!("Uploading {} bytes", len);

        self.send_ack(Command::RecvBuffHeader, Bytes::copy_from_slice(&len.to_le_bytes()))
            .await?;
        self.send_ack(Command::RecvBuffContent, Bytes::copy_from_slice(data))
            .await?;

        let local = rolling_hash(data);
        let remote = self.check_hash().await?;
        if local != remote {
            return Err(Error::IntegrityError { local, remote });
        }

        Ok(())
    }

    /// Request a single streamed object
    ///
    /// Returns `None` when the device answers with one of `empty_signals`
    /// instead of `recv_buff_header`. Only `nak` and the "nothing there"
    /// statuses count as empty; any other signal is an unexpected response.
    pub async fn fetch_stream(
        &mut self,
        command: Command,
        payload: impl Into<Bytes>,
        empty_signals: &[Command],
    ) -> Result<Option<StreamedReply>> {
        let mut expected = Vec::with_capacity(empty_signals.len() + 1);
        expected.push(Command::RecvBuffHeader);
        expected.extend_from_slice(empty_signals);

        let header = self.send_command(command, payload, &expected).await?;
        if is_empty_reply(&header) {
            return Ok(None);
        }
        Connection::verify_response(&header, &[Command::RecvBuffHeader])?;

        let content = self.receive_expected(&[Command::RecvBuffContent]).await?;
        self.receive_expected(&[Command::Ack]).await?;

        Ok(Some(StreamedReply {
            header: header.payload,
            content: content.payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_replies() {
        for command in [Command::Nak, Command::NoRecord, Command::NoData, Command::NoPic] {
            assert!(is_empty_reply(&Packet::new(command, 1, 1)), "{}", command.name());
        }
        for command in [Command::Ack, Command::RecvBuffContent, Command::RecvBuffHeader] {
            assert!(!is_empty_reply(&Packet::new(command, 1, 1)), "{}", command.name());
        }
        assert!(!is_empty_reply(&Packet::from_raw(0xBEEF, 1, 1, Bytes::new())));
    }

    #[test]
    fn test_announced_len() {
        let reply = StreamedReply {
            header: Bytes::from_static(&[0x10, 0x27, 0, 0]),
            content: Bytes::new(),
        };
        assert_eq!(reply.announced_len(), Some(10_000));

        let short = StreamedReply {
            header: Bytes::from_static(&[1]),
            content: Bytes::new(),
        };
        assert_eq!(short.announced_len(), None);
    }
}
