//! High-level device interface

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use zkbio_core::constants::{data_ids, table_ids};
use zkbio_core::{Command, SegmentedBuffer, SessionState};
use zkbio_transport::{TcpTransport, Transport};
use zkbio_types::{
    AttendanceLogRecord, DeviceInfo, DeviceTime, FingerprintRecord, MachineStateRecord,
    OperationLogRecord, TextEncoding, UserRecord,
};

use crate::config::DeviceConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::property::DeviceProperty;

/// Length prefix the device puts in front of every downloaded table
const TABLE_PREFIX_SIZE: usize = 4;

/// Default `query_sys_op` request: every option the SDK asks for on startup
pub const DEFAULT_SYSTEM_QUERY: &str = "~OS=?,ExtendFmt=?,~ExtendFmt=?,ExtendOPLog=?,~ExtendOPLog=?,\
~Platform=?,~ZKFPVersion=?,WorkCode=?,~SSR=?,~PIN2Width=?,~UserExtFmt=?,BuildVersion=?,\
AttPhotoForSDK=?,~IsOnlyRFMachine=?,CameraOpen=?,CompatOldFirmware=?,IsSupportPull=?,\
Language=?,~SerialNumber=?,FaceFunOn=?,~DeviceName=?";

/// Biometric terminal
///
/// Typed operations over one [`Connection`]. Destructive and bulk operations
/// disable the device for their duration and always re-enable it afterwards.
///
/// # Examples
///
/// ```no_run
/// use zkbio::Device;
///
/// #[tokio::main]
/// async fn main() -> zkbio::Result<()> {
///     let mut device = Device::new("192.168.1.201", 4370);
///
///     device.connect().await?;
///     println!("Connected!");
///
///     let info = device.get_device_info().await?;
///     println!("Device: {}", info);
///
///     for user in device.get_users().await? {
///         println!("{} {}", user.person_id, user.name);
///     }
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    pub(crate) conn: Connection,
    pub(crate) encoding: TextEncoding,
}

impl Device {
    /// Create a device on the default TCP transport with default settings
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(DeviceConfig::new(host, port))
    }

    pub fn from_config(config: DeviceConfig) -> Self {
        let transport = TcpTransport::new(config.host.clone(), config.port)
            .with_connect_timeout(config.connect_timeout)
            .with_read_timeout(config.read_timeout);
        Self::with_transport(Box::new(transport), &config)
    }

    /// Create a device over any transport
    pub fn with_transport(transport: Box<dyn Transport>, config: &DeviceConfig) -> Self {
        Self {
            conn: Connection::new(transport, config),
            encoding: config.encoding,
        }
    }

    /// Access the underlying connection for raw commands
    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn state(&self) -> SessionState {
        self.conn.state()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Connect to device
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - Device doesn't acknowledge `connect`
    /// - The comm key is rejected
    pub async fn connect(&mut self) -> Result<()> {
        self.conn.connect().await
    }

    /// Disconnect from device; never fails because of the farewell command
    pub async fn disconnect(&mut self) -> Result<()> {
        self.conn.disconnect().await
    }

    // Properties

    /// Read a property, `None` if the device does not know the key
    ///
    /// Accepts a [`DeviceProperty`] or any raw key.
    pub async fn get_property(&mut self, key: impl AsRef<str>) -> Result<Option<String>> {
        let key = key.as_ref();
        debug!("Getting property {}...", key);

        let mut payload = BytesMut::with_capacity(key.len() + 1);
        payload.put_slice(key.as_bytes());
        payload.put_u8(0);

        let response = self
            .conn
            .send_command(Command::GetData, payload.freeze(), &[Command::Ack, Command::NoSysOp])
            .await?;
        if response.is(Command::NoSysOp) {
            return Ok(None);
        }

        let text = TextEncoding::Latin1.decode(&response.payload)?;
        let value = text
            .split('=')
            .nth(1)
            .ok_or_else(|| Error::Protocol(format!("get_data reply for {key} has no '=': {text:?}")))?;

        Ok(Some(trim_reply(value).to_string()))
    }

    /// Write a property and commit it
    pub async fn set_property(&mut self, key: impl AsRef<str>, value: &str) -> Result<()> {
        let key = key.as_ref();
        debug!("Setting property {}...", key);

        // Property lines are Latin-1 whatever the record encoding
        let line = format!("{key}={value}");
        let payload = Bytes::copy_from_slice(&TextEncoding::Latin1.encode(&line)?);

        self.conn.send_ack(Command::SetData, payload).await?;
        self.conn.save_data().await
    }

    /// Collect the identifying properties and the firmware version
    pub async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        debug!("Getting device info...");

        let info = DeviceInfo {
            serial_number: self.get_property(DeviceProperty::SerialNumber).await?,
            firmware_version: Some(self.software_version().await?),
            platform: self.get_property(DeviceProperty::Platform).await?,
            device_name: self.get_property(DeviceProperty::DeviceName).await?,
            mac_address: self.get_property(DeviceProperty::Mac).await?,
            vendor: self.get_property(DeviceProperty::OemVendor).await?,
        };

        debug!("Device info: {}", info);
        Ok(info)
    }

    pub async fn software_version(&mut self) -> Result<String> {
        let response = self.conn.send_ack(Command::SoftVer, Bytes::new()).await?;
        let text = TextEncoding::Latin1.decode(&response.payload)?;
        Ok(trim_reply(&text).to_string())
    }

    /// Ask for several options at once, e.g. [`DEFAULT_SYSTEM_QUERY`]
    ///
    /// Returns the raw `key=value,...` reply.
    pub async fn query_system_options(&mut self, query: &str) -> Result<String> {
        let payload = Bytes::copy_from_slice(&TextEncoding::Latin1.encode(query)?);
        let response = self.conn.send_ack(Command::QuerySysOp, payload).await?;
        Ok(TextEncoding::Latin1.decode(&response.payload)?)
    }

    // Clock

    pub async fn get_time(&mut self) -> Result<DeviceTime> {
        let response = self.conn.send_ack(Command::GetTime, Bytes::new()).await?;
        let raw = crate::connection::read_u32(&response.payload, 0, "get_time reply")?;
        Ok(DeviceTime::decode(raw))
    }

    pub async fn set_time(&mut self, time: DeviceTime) -> Result<()> {
        info!("Setting device time to {}", time);
        self.conn
            .send_ack(Command::SetTime, Bytes::copy_from_slice(&time.encode().to_le_bytes()))
            .await?;
        self.conn.save_data().await
    }

    /// Read time zone `index` as a string of two-digit fields
    ///
    /// `None` if the device answers for a different index.
    pub async fn get_timezone(&mut self, index: u32) -> Result<Option<String>> {
        let response = self
            .conn
            .send_ack(Command::GetTz, Bytes::copy_from_slice(&index.to_le_bytes()))
            .await?;

        let payload = &response.payload;
        if payload.len() < 2 || u32::from(LittleEndian::read_u16(&payload[..2])) != index {
            return Ok(None);
        }

        let fields = payload.get(2..payload.len().saturating_sub(2)).unwrap_or_default();
        Ok(Some(fields.iter().map(|b| format!("{b:02}")).collect()))
    }

    /// Write time zone `index` from a string of two-digit fields
    pub async fn set_timezone(&mut self, index: u16, value: &str) -> Result<()> {
        let fields = parse_digit_pairs(value)?;

        let mut payload = BytesMut::with_capacity(2 + fields.len());
        payload.put_u16_le(index);
        payload.put_slice(&fields);

        self.conn.send_ack(Command::SetTz, payload.freeze()).await?;
        Ok(())
    }

    // Power

    pub async fn reboot(&mut self) -> Result<()> {
        warn!("Restarting device...");
        self.conn.send_ack(Command::Reboot, Bytes::new()).await?;

        // Device will drop the link while restarting
        self.conn.close().await;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        warn!("Powering off device...");
        self.conn.send_ack(Command::Shutdown, Bytes::new()).await?;
        self.conn.close().await;
        Ok(())
    }

    /// Suspend input on the device; `timeout_secs` of 0 means until enabled
    pub async fn disable_device(&mut self, timeout_secs: u32) -> Result<()> {
        self.conn.disable_device(timeout_secs).await
    }

    pub async fn enable_device(&mut self) -> Result<()> {
        self.conn.enable_device().await
    }

    // Clearing

    /// Clear the table with the given id and commit
    pub async fn clear_data(&mut self, table_id: u8) -> Result<()> {
        warn!("Clearing table 0x{:02X}...", table_id);
        self.conn.send_ack(Command::ClsData, Bytes::copy_from_slice(&[table_id])).await?;
        self.conn.save_data().await
    }

    pub async fn clear_users(&mut self) -> Result<()> {
        self.clear_data(table_ids::USERS).await
    }

    pub async fn clear_fingerprints(&mut self) -> Result<()> {
        self.clear_data(table_ids::FINGERPRINTS).await
    }

    pub async fn clear_att_logs(&mut self) -> Result<()> {
        warn!("Clearing attendance logs...");
        self.conn.disable_device(0).await?;
        let outcome = self.conn.send_ack(Command::DelLogs, Bytes::new()).await;
        self.conn.release(outcome).await?;
        self.conn.save_data().await
    }

    pub async fn clear_op_logs(&mut self) -> Result<()> {
        warn!("Clearing operation logs...");
        self.conn.send_ack(Command::ClearOpLog, Bytes::new()).await?;
        self.conn.save_data().await
    }

    pub async fn clear_admins(&mut self) -> Result<()> {
        warn!("Clearing administrators...");
        self.conn.send_ack(Command::ClsAdmins, Bytes::new()).await?;
        self.conn.save_data().await
    }

    // Users

    /// Create or overwrite the user in slot `user.id`
    ///
    /// The slot number decides which record is written; reusing one
    /// overwrites that user.
    pub async fn set_user(&mut self, user: &UserRecord) -> Result<()> {
        debug!("Setting user {} ({})", user.id, user.person_id);
        let payload = user.encode(self.encoding)?;
        self.conn.send_ack(Command::SetUser, payload).await?;
        Ok(())
    }

    pub async fn delete_user(&mut self, id: u16) -> Result<()> {
        debug!("Deleting user {}", id);
        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .send_ack(Command::DelUser, Bytes::copy_from_slice(&id.to_le_bytes()))
            .await
            .map(drop);
        self.conn.release(outcome).await
    }

    pub async fn get_users(&mut self) -> Result<Vec<UserRecord>> {
        let buffer = self.download_table(data_ids::USERS).await?;
        buffer
            .as_user_records()?
            .ok_or_else(|| misaligned("user", buffer.len(), UserRecord::SIZE))
    }

    // Logs

    pub async fn get_att_logs(&mut self) -> Result<Vec<AttendanceLogRecord>> {
        let buffer = self.download_table(data_ids::ATT_LOGS).await?;
        buffer
            .as_attendance_logs()?
            .ok_or_else(|| misaligned("attendance log", buffer.len(), AttendanceLogRecord::SIZE))
    }

    pub async fn get_op_logs(&mut self) -> Result<Vec<OperationLogRecord>> {
        let buffer = self.download_table(data_ids::OP_LOGS).await?;
        buffer
            .as_operation_logs()?
            .ok_or_else(|| misaligned("operation log", buffer.len(), OperationLogRecord::SIZE))
    }

    pub async fn get_fingerprints(&mut self) -> Result<Vec<FingerprintRecord>> {
        let buffer = self.download_table(data_ids::FINGERPRINTS).await?;
        Ok(buffer.as_fingerprint_records()?)
    }

    /// Bracketed bulk download with the device's length prefix removed
    async fn download_table(&mut self, data_id: u32) -> Result<SegmentedBuffer> {
        self.conn.disable_device(0).await?;
        let outcome = self.conn.download_buffer(data_id, self.encoding).await;
        let mut buffer = self.conn.release(outcome).await?;

        if buffer.len() <= TABLE_PREFIX_SIZE {
            return Ok(SegmentedBuffer::new(self.encoding));
        }
        buffer.remove_leading(TABLE_PREFIX_SIZE);

        debug!("Table 0x{:X}: {} bytes", data_id, buffer.len());
        Ok(buffer)
    }

    // Status

    pub async fn get_photo_count(&mut self) -> Result<u32> {
        let response = self.conn.send_ack(Command::GetPhotoCount, Bytes::new()).await?;
        let payload = &response.payload;
        match payload.len() {
            1 => Ok(u32::from(payload[0])),
            2 => Ok(u32::from(LittleEndian::read_u16(payload))),
            4 => Ok(LittleEndian::read_u32(payload)),
            n => Err(Error::Protocol(format!("photo count reply of {n} bytes"))),
        }
    }

    /// Record counters and capacities
    pub async fn get_machine_state(&mut self) -> Result<MachineStateRecord> {
        self.conn.disable_device(0).await?;
        let outcome = self.conn.send_ack(Command::LogsCount, Bytes::new()).await;
        let response = self.conn.release(outcome).await?;
        Ok(MachineStateRecord::decode(&response.payload)?)
    }

    /// Table layout description as reported by the firmware
    pub async fn database_structure(&mut self) -> Result<String> {
        self.conn.disable_device(0).await?;
        let outcome = self
            .conn
            .fetch_stream(Command::GetTableStruct, Bytes::new(), &[])
            .await;
        let reply = self.conn.release(outcome).await?;

        match reply {
            Some(reply) => Ok(TextEncoding::Latin1.decode(&reply.content)?),
            None => Err(Error::Protocol("get_table_struct returned no stream".into())),
        }
    }

    /// Device-side hash of its receive buffer
    pub async fn check_hash(&mut self) -> Result<u32> {
        self.conn.check_hash().await
    }
}

fn trim_reply(text: &str) -> &str {
    text.trim_matches(|c| c == ' ' || c == '\0')
}

fn misaligned(record: &str, len: usize, size: usize) -> Error {
    Error::Protocol(format!(
        "{record} table of {len} bytes is not a multiple of {size}"
    ))
}

/// "0812" -> [8, 12]
fn parse_digit_pairs(value: &str) -> Result<Vec<u8>> {
    if value.len() % 2 != 0 {
        return Err(Error::InvalidArgument(format!(
            "time zone string must have an even length, got {}",
            value.len()
        )));
    }

    value
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
                .ok_or_else(|| Error::InvalidArgument(format!("bad time zone field in {value:?}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_device_create() {
        let device = Device::new("192.168.1.201", 4370);
        assert!(!device.is_connected());
        assert_eq!(device.state(), SessionState::Disconnected);
        assert_eq!(device.encoding(), TextEncoding::Latin1);
    }

    #[test]
    fn test_trim_reply() {
        assert_eq!(trim_reply(" 42\0\0"), "42");
        assert_eq!(trim_reply("Ver 6.60 Apr 28 2017\0"), "Ver 6.60 Apr 28 2017");
    }

    #[test]
    fn test_parse_digit_pairs() {
        assert_eq!(parse_digit_pairs("0812172300").unwrap(), vec![8, 12, 17, 23, 0]);
        assert_eq!(parse_digit_pairs("").unwrap(), Vec::<u8>::new());
        assert!(matches!(parse_digit_pairs("081"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_digit_pairs("0x12"), Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let mut device = Device::new("192.168.1.201", 4370);
        assert!(matches!(device.get_time().await, Err(Error::NotConnected)));
        assert!(matches!(device.get_users().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    #[ignore] // Only run with real device
    async fn test_device_connect() {
        let mut device = Device::new("192.168.1.201", 4370);

        device.connect().await.unwrap();
        assert!(device.is_connected());

        device.disconnect().await.unwrap();
        assert!(!device.is_connected());
    }

    #[tokio::test]
    #[ignore] // Only run with real device
    async fn test_device_get_info() {
        let mut device = Device::new("192.168.1.201", 4370);
        device.connect().await.unwrap();

        let info = device.get_device_info().await.unwrap();
        println!("{:?}", info);

        device.disconnect().await.unwrap();
    }
}
