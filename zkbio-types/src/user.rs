//! User record (72 bytes)
//!
//! ```text
//! offset  size  field
//! 0       2     id (LE u16)
//! 2       1     flags: bit0 = disabled, bits1.. = raw privilege code
//! 3       8     password (null-terminated)
//! 11      24    name (null-terminated)
//! 35      4     card number (LE u32)
//! 39      1     marker (always 1)
//! 40      8     reserved
//! 48      24    person id (null-terminated)
//! ```

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::text::{TextEncoding, read_cstr, write_cstr};

/// Privilege level of a user
///
/// The device stores a raw code that is not the level itself:
/// levels 0, 1, 2, 3 are stored as 0, 1, 3, 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Privilege {
    #[default]
    User = 0,
    Enroller = 1,
    Admin = 2,
    SuperAdmin = 3,
}

impl Privilege {
    /// Raw code stored in the flags byte
    pub fn raw_code(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Enroller => 1,
            Self::Admin => 3,
            Self::SuperAdmin => 7,
        }
    }

    /// Unknown raw codes fall back to [`Privilege::User`]
    pub fn from_raw_code(code: u8) -> Self {
        match code {
            1 => Self::Enroller,
            3 => Self::Admin,
            7 => Self::SuperAdmin,
            _ => Self::User,
        }
    }

    /// Numeric level (0..=3)
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// A user enrolled on the device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserRecord {
    /// Internal slot number; writing a record with an existing id overwrites it
    pub id: u16,
    pub enabled: bool,
    pub privilege: Privilege,
    pub password: String,
    pub name: String,
    pub card_number: u32,
    /// External person identifier (the "PIN" printed on reports)
    pub person_id: String,
}

impl UserRecord {
    pub const SIZE: usize = 72;

    const MARKER: u8 = 1;

    pub fn new(id: u16, person_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            enabled: true,
            person_id: person_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decode a record; bytes past [`UserRecord::SIZE`] are ignored
    pub fn decode(data: &[u8], encoding: TextEncoding) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::truncated("user", Self::SIZE, data.len()));
        }

        let flags = data[2];

        Ok(Self {
            id: LittleEndian::read_u16(&data[0..2]),
            enabled: flags & 1 == 0,
            privilege: Privilege::from_raw_code(flags >> 1),
            password: read_cstr(&data[3..11], encoding)?,
            name: read_cstr(&data[11..35], encoding)?,
            card_number: LittleEndian::read_u32(&data[35..39]),
            person_id: read_cstr(&data[48..Self::SIZE], encoding)?,
        })
    }

    pub fn encode(&self, encoding: TextEncoding) -> Result<Bytes> {
        let mut out = [0u8; Self::SIZE];

        LittleEndian::write_u16(&mut out[0..2], self.id);
        out[2] = (self.privilege.raw_code() << 1) | u8::from(!self.enabled);
        write_cstr(&mut out[3..11], "password", &self.password, encoding)?;
        write_cstr(&mut out[11..35], "name", &self.name, encoding)?;
        LittleEndian::write_u32(&mut out[35..39], self.card_number);
        out[39] = Self::MARKER;
        write_cstr(&mut out[48..Self::SIZE], "person_id", &self.person_id, encoding)?;

        Ok(Bytes::copy_from_slice(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sample() -> UserRecord {
        UserRecord {
            id: 5,
            enabled: false,
            privilege: Privilege::Admin,
            password: "123".into(),
            name: "Ali".into(),
            card_number: 42,
            person_id: "1001".into(),
        }
    }

    #[test]
    fn test_encode_layout() {
        let bytes = sample().encode(TextEncoding::Latin1).unwrap();

        assert_eq!(bytes.len(), UserRecord::SIZE);
        assert_eq!(&bytes[0..3], &[0x05, 0x00, 0x07]);
        assert_eq!(&bytes[3..7], b"123\0");
        assert_eq!(&bytes[11..15], b"Ali\0");
        assert_eq!(&bytes[35..40], &[0x2A, 0, 0, 0, 0x01]);
        assert_eq!(&bytes[40..48], &[0u8; 8]);
        assert_eq!(&bytes[48..53], b"1001\0");
    }

    #[test]
    fn test_privilege_codes_are_not_monotonic() {
        assert_eq!(Privilege::Admin.raw_code(), 3);
        assert_eq!(Privilege::SuperAdmin.raw_code(), 7);

        let mut user = sample();
        user.enabled = true;
        user.privilege = Privilege::SuperAdmin;
        let bytes = user.encode(TextEncoding::Latin1).unwrap();
        assert_eq!(bytes[2], 7 << 1);

        user.privilege = Privilege::Admin;
        let bytes = user.encode(TextEncoding::Latin1).unwrap();
        assert_eq!(bytes[2], 3 << 1);
    }

    #[test]
    fn test_unknown_raw_privilege_is_user() {
        assert_eq!(Privilege::from_raw_code(2), Privilege::User);
        assert_eq!(Privilege::from_raw_code(5), Privilege::User);
    }

    #[test]
    fn test_roundtrip_all_privileges() {
        for privilege in [
            Privilege::User,
            Privilege::Enroller,
            Privilege::Admin,
            Privilege::SuperAdmin,
        ] {
            for enabled in [true, false] {
                let user = UserRecord {
                    privilege,
                    enabled,
                    ..sample()
                };
                let bytes = user.encode(TextEncoding::Latin1).unwrap();
                assert_eq!(UserRecord::decode(&bytes, TextEncoding::Latin1).unwrap(), user);
            }
        }
    }

    #[test]
    fn test_full_width_name_has_no_terminator() {
        let mut user = sample();
        user.name = "A".repeat(24);
        let bytes = user.encode(TextEncoding::Latin1).unwrap();
        let decoded = UserRecord::decode(&bytes, TextEncoding::Latin1).unwrap();
        assert_eq!(decoded.name, user.name);
    }

    #[test]
    fn test_name_too_long() {
        let mut user = sample();
        user.name = "A".repeat(25);
        assert!(matches!(
            user.encode(TextEncoding::Latin1),
            Err(Error::FieldTooLong { field: "name", .. })
        ));
    }

    #[test]
    fn test_truncated() {
        let result = UserRecord::decode(&[0u8; 71], TextEncoding::Latin1);
        assert!(matches!(
            result,
            Err(Error::TruncatedRecord { expected: 72, actual: 71, .. })
        ));
    }

    #[test]
    fn test_cp1256_name() {
        let enc = TextEncoding::for_label("cp1256").unwrap();
        let user = UserRecord::new(9, "77", "محمد");
        let bytes = user.encode(enc).unwrap();
        assert_eq!(UserRecord::decode(&bytes, enc).unwrap().name, "محمد");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            id in any::<u16>(),
            enabled in any::<bool>(),
            level in 0u8..=3,
            password in "[0-9]{0,8}",
            name in "[A-Za-z ]{0,24}",
            card_number in any::<u32>(),
            person_id in "[0-9A-Z]{0,24}",
        ) {
            let privilege = [
                Privilege::User,
                Privilege::Enroller,
                Privilege::Admin,
                Privilege::SuperAdmin,
            ][usize::from(level)];
            let user = UserRecord { id, enabled, privilege, password, name, card_number, person_id };
            let bytes = user.encode(TextEncoding::Latin1).unwrap();
            prop_assert_eq!(UserRecord::decode(&bytes, TextEncoding::Latin1).unwrap(), user);
        }
    }
}
