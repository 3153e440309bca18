//! Fingerprint templates, face templates, user photos and file uploads
//!
//! Every operation here runs inside a disable/enable bracket. Writes upload
//! the blob first, then send the command that applies it.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use zkbio_core::Command;
use zkbio_core::constants::{DEFAULT_FACE_ID, FILE_NAME_WIDTH, FILE_SEND_TAG, PERSON_ID_WIDTH};
use zkbio_types::FingerprintRecord;

use crate::device::Device;
use crate::error::{Error, Result};

/// Bytes after the template in a `get_fp_ex` reply; the last one is the enabled flag
const FP_EX_TRAILER: usize = 7;

/// Bytes after the template in a `get_fp` reply
const FP_TRAILER: usize = 6;

/// Size of every face request
const FACE_REQUEST_SIZE: usize = 28;

const EMPTY_STREAM: &[Command] = &[Command::Nak, Command::NoData];

impl Device {
    // Fingerprints

    /// Fetch one fingerprint, `None` if the user has no template for that finger
    pub async fn get_fingerprint(&mut self, user_id: u16, finger: u8) -> Result<Option<FingerprintRecord>> {
        debug!("Getting fingerprint {}/{}", user_id, finger);

        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .fetch_stream(Command::GetFpEx, finger_request(user_id, finger), EMPTY_STREAM)
            .await;
        let Some(reply) = self.conn.release(outcome).await? else {
            return Ok(None);
        };

        let data = &reply.content;
        if data.len() < FP_EX_TRAILER {
            return Err(Error::Protocol(format!(
                "get_fp_ex reply of {} bytes is shorter than its trailer",
                data.len()
            )));
        }

        Ok(Some(FingerprintRecord {
            user_id,
            finger_index: finger,
            enabled: data[data.len() - 1] != 0,
            template: reply.content.slice(..data.len() - FP_EX_TRAILER),
        }))
    }

    /// Fetch only the template bytes of one fingerprint, empty if there is none
    pub async fn get_fingerprint_data(&mut self, user_id: u16, finger: u8) -> Result<Bytes> {
        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .fetch_stream(Command::GetFp, finger_request(user_id, finger), EMPTY_STREAM)
            .await;
        let reply = self.conn.release(outcome).await?;

        Ok(reply
            .map(|reply| {
                let end = reply.content.len().saturating_sub(FP_TRAILER);
                reply.content.slice(..end)
            })
            .unwrap_or_default())
    }

    /// Store one fingerprint and commit
    pub async fn set_fingerprint(&mut self, fingerprint: &FingerprintRecord) -> Result<()> {
        self.set_fingerprints(std::slice::from_ref(fingerprint)).await
    }

    /// Store several fingerprints in one bracket, then commit once
    pub async fn set_fingerprints(&mut self, fingerprints: &[FingerprintRecord]) -> Result<()> {
        self.conn.disable_device(0).await?;
        let outcome = self.upload_fingerprints(fingerprints).await;
        self.conn.release(outcome).await?;
        self.conn.save_data().await
    }

    async fn upload_fingerprints(&mut self, fingerprints: &[FingerprintRecord]) -> Result<()> {
        for fingerprint in fingerprints {
            debug!(
                "Uploading fingerprint {}/{} ({} bytes)",
                fingerprint.user_id,
                fingerprint.finger_index,
                fingerprint.template.len()
            );

            let len = u16::try_from(fingerprint.template.len()).map_err(|_| {
                Error::InvalidArgument(format!(
                    "fingerprint template of {} bytes is too large",
                    fingerprint.template.len()
                ))
            })?;

            self.conn.upload_buffer(&fingerprint.template).await?;

            let mut payload = BytesMut::with_capacity(6);
            payload.put_u16_le(fingerprint.user_id);
            payload.put_u8(fingerprint.finger_index);
            payload.put_u8(u8::from(fingerprint.enabled));
            payload.put_u16_le(len);

            self.conn.send_ack(Command::SetFpEx, payload.freeze()).await?;
            self.conn.send_ack(Command::EndBuffStream, Bytes::new()).await?;
        }
        Ok(())
    }

    /// Delete one fingerprint by person id
    ///
    /// Returns `false` if the device had nothing to delete. Person ids
    /// longer than 24 bytes are truncated.
    pub async fn delete_fingerprint(&mut self, person_id: &str, finger: u8) -> Result<bool> {
        let mut payload = [0u8; PERSON_ID_WIDTH + 1];
        let id = self.encoding.encode(person_id)?;
        let len = id.len().min(PERSON_ID_WIDTH);
        payload[..len].copy_from_slice(&id[..len]);
        payload[PERSON_ID_WIDTH] = finger;

        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .send_command(
                Command::DelFpEx,
                Bytes::copy_from_slice(&payload),
                &[Command::Ack, Command::Nak, Command::NoFp],
            )
            .await;
        let deleted = self.conn.release(outcome).await?.is(Command::Ack);

        if deleted {
            self.conn.save_data().await?;
        }
        Ok(deleted)
    }

    // Faces

    /// Fetch a face template, `None` if there is none
    pub async fn get_face(&mut self, person_id: &str, face_id: u8) -> Result<Option<Bytes>> {
        let mut payload = self.face_request(person_id)?;
        payload[PERSON_ID_WIDTH + 1] = face_id;

        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .fetch_stream(Command::GetFace, Bytes::copy_from_slice(&payload), EMPTY_STREAM)
            .await;
        let reply = self.conn.release(outcome).await?;

        Ok(reply.map(|reply| reply.content))
    }

    /// Store a face template and commit
    ///
    /// Most firmware keeps a single face under [`DEFAULT_FACE_ID`].
    pub async fn set_face(&mut self, person_id: &str, data: &[u8], face_id: u8) -> Result<()> {
        let len = u16::try_from(data.len()).map_err(|_| {
            Error::InvalidArgument(format!("face template of {} bytes is too large", data.len()))
        })?;

        let mut payload = self.face_request(person_id)?;
        payload[PERSON_ID_WIDTH + 1] = face_id;
        payload[PERSON_ID_WIDTH + 2..].copy_from_slice(&len.to_le_bytes());

        self.conn.disable_device(0).await?;
        let outcome = self.apply_upload(data, Command::SetFace, &payload).await;
        self.conn.release(outcome).await?;
        self.conn.save_data().await
    }

    /// Delete a face template and commit
    pub async fn delete_face(&mut self, person_id: &str, face_id: u8) -> Result<()> {
        let mut payload = [0u8; FACE_REQUEST_SIZE];
        let id = self.encoding.encode(person_id)?;
        let len = id.len().min(PERSON_ID_WIDTH);
        payload[..len].copy_from_slice(&id[..len]);
        payload[PERSON_ID_WIDTH + 1] = face_id;

        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .send_ack(Command::DelFace, Bytes::copy_from_slice(&payload))
            .await
            .map(drop);
        self.conn.release(outcome).await?;
        self.conn.save_data().await
    }

    /// Delete the default face template
    pub async fn delete_default_face(&mut self, person_id: &str) -> Result<()> {
        self.delete_face(person_id, DEFAULT_FACE_ID).await
    }

    /// Person id padded to 24 bytes, one zero, then three bytes for the caller
    fn face_request(&self, person_id: &str) -> Result<[u8; FACE_REQUEST_SIZE]> {
        let id = self.encoding.encode(person_id)?;
        if id.len() > PERSON_ID_WIDTH {
            return Err(Error::InvalidArgument(format!(
                "person id {person_id:?} is longer than {PERSON_ID_WIDTH} bytes"
            )));
        }

        let mut payload = [0u8; FACE_REQUEST_SIZE];
        payload[..id.len()].copy_from_slice(&id);
        Ok(payload)
    }

    // User photos

    /// Fetch a user's photo, `None` if there is none
    ///
    /// The size announced by the stream header must match the content.
    pub async fn get_user_photo(&mut self, person_id: &str) -> Result<Option<Bytes>> {
        let mut payload = self.photo_name(person_id)?;
        payload.push(0);

        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .fetch_stream(Command::GetUserPic, payload, &[Command::Nak, Command::NoPic])
            .await;
        let Some(reply) = self.conn.release(outcome).await? else {
            return Ok(None);
        };

        let announced = reply
            .announced_len()
            .ok_or_else(|| Error::Protocol("get_user_pic header carries no size".into()))?;
        if announced as usize != reply.content.len() {
            return Err(Error::SizeMismatch {
                expected: announced as usize,
                actual: reply.content.len(),
            });
        }

        Ok(Some(reply.content))
    }

    /// Store a user's photo (JPEG) and commit
    pub async fn set_user_photo(&mut self, person_id: &str, data: &[u8]) -> Result<()> {
        let name = self.photo_name(person_id)?;
        let mut payload = padded_name(&name)?;
        payload.put_bytes(0, 4);

        self.conn.disable_device(0).await?;
        let outcome = self.apply_upload(data, Command::SetUserPic, &payload).await;
        self.conn.release(outcome).await?;
        self.conn.save_data().await
    }

    /// Delete a user's photo; `false` if there was none
    pub async fn delete_user_photo(&mut self, person_id: &str) -> Result<bool> {
        let mut payload = self.photo_name(person_id)?;
        payload.push(0);

        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .send_command(Command::DelUserPic, payload, &[Command::Ack, Command::NoPic])
            .await;
        let outcome = self.conn.release(outcome).await;
        let saved = self.conn.save_data().await;

        let deleted = !outcome?.is(Command::NoPic);
        saved?;
        Ok(deleted)
    }

    fn photo_name(&self, person_id: &str) -> Result<Vec<u8>> {
        let mut name = self.encoding.encode(person_id)?.into_owned();
        name.extend_from_slice(b".jpg");
        Ok(name)
    }

    // Files

    /// Push a file to the device and commit
    ///
    /// Fails with [`Error::OperationRejected`] if the device refuses it.
    pub async fn send_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let encoded = self.encoding.encode(name)?;

        let mut payload = BytesMut::with_capacity(4 + FILE_NAME_WIDTH);
        payload.put_u32_le(FILE_SEND_TAG);
        payload.put_slice(&padded_name(&encoded)?);

        self.conn.disable_device(0).await?;
        let outcome = self.push_file(name, data, payload.freeze()).await;
        self.conn.release(outcome).await?;
        self.conn.save_data().await
    }

    async fn push_file(&mut self, name: &str, data: &[u8], payload: Bytes) -> Result<()> {
        self.conn.upload_buffer(data).await?;

        let response = self
            .conn
            .send_command(Command::SendFile, payload, &[Command::Ack, Command::Nak])
            .await?;
        self.conn.send_ack(Command::EndBuffStream, Bytes::new()).await?;

        if response.is(Command::Nak) {
            return Err(Error::OperationRejected(format!("send_file {name}")));
        }
        Ok(())
    }

    /// Upload `data`, apply it with `command`, close the buffer stream
    async fn apply_upload(&mut self, data: &[u8], command: Command, payload: &[u8]) -> Result<()> {
        self.conn.upload_buffer(data).await?;
        self.conn.send_ack(command, Bytes::copy_from_slice(payload)).await?;
        self.conn.send_ack(Command::EndBuffStream, Bytes::new()).await?;
        Ok(())
    }
}

/// `<HB` request shared by `get_fp` and `get_fp_ex`
fn finger_request(user_id: u16, finger: u8) -> Bytes {
    let mut payload = BytesMut::with_capacity(3);
    payload.put_u16_le(user_id);
    payload.put_u8(finger);
    payload.freeze()
}

/// File name zero-padded to its fixed width
fn padded_name(name: &[u8]) -> Result<BytesMut> {
    if name.len() > FILE_NAME_WIDTH {
        return Err(Error::InvalidArgument(format!(
            "file name of {} bytes is longer than {FILE_NAME_WIDTH}",
            name.len()
        )));
    }

    let mut out = BytesMut::with_capacity(FILE_NAME_WIDTH + 4);
    out.put_slice(name);
    out.put_bytes(0, FILE_NAME_WIDTH - name.len());
    Ok(out)
}
