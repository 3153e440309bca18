//! Protocol command codes
//!
//! The table below is the wire contract shared by every terminal firmware
//! this crate talks to. Request codes, reply codes and status codes live in
//! the same `u16` space.

use std::fmt;

use crate::error::{Error, Result};

macro_rules! commands {
    ($($variant:ident = $code:literal => $name:literal,)+) => {
        /// Protocol command codes
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Command {
            $($variant = $code,)+
        }

        impl Command {
            /// Every command in table order
            pub const ALL: &'static [Command] = &[$(Self::$variant,)+];

            /// Symbolic name as used in protocol documentation
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Look a command up by its symbolic name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    "del_user_fp" => Some(Self::DEL_USER_FP),
                    _ => None,
                }
            }
        }

        impl TryFrom<u16> for Command {
            type Error = Error;

            fn try_from(value: u16) -> Result<Self> {
                match value {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(Error::UnknownCommand(value)),
                }
            }
        }
    };
}

commands! {
    ReadDb = 0x0007 => "read_db",
    SetUser = 0x0008 => "set_user",
    GetFp = 0x0009 => "get_fp",
    SetFp = 0x000A => "set_fp",
    GetData = 0x000B => "get_data",
    SetData = 0x000C => "set_data",
    ReadLatestLog = 0x000D => "read_latest_log",
    ClsData = 0x000E => "cls_data",
    DelLogs = 0x000F => "del_logs",
    AppendFp = 0x0011 => "append_fp",
    DelUser = 0x0012 => "del_user",
    DelFp = 0x0013 => "del_fp",
    ClsAdmins = 0x0014 => "cls_admins",
    GetUserGroup = 0x0015 => "get_user_group",
    SetUserGroup = 0x0016 => "set_user_group",
    GetUserTz = 0x0017 => "get_user_tz",
    SetUserTz = 0x0018 => "set_user_tz",
    GetGroupTz = 0x0019 => "get_group_tz",
    SetGroupTz = 0x001A => "set_group_tz",
    GetTz = 0x001B => "get_tz",
    SetTz = 0x001C => "set_tz",
    GetUnlockGroup = 0x001D => "get_unlock_group",
    SetLockComb = 0x001E => "set_lock_comb",
    Unlock = 0x001F => "unlock",
    ClearOpLog = 0x0021 => "clear_op_log",
    ReadOpLog = 0x0022 => "read_op_log",
    SsrReadAttRole = 0x0023 => "ssr_read_att_role",
    SsrReadDepart = 0x0024 => "ssr_read_depart",
    SsrReadTurn = 0x0025 => "ssr_read_turn",
    LogsCount = 0x0032 => "logs_count",
    EndEnroll = 0x003C => "end_enroll",
    StartEnroll = 0x003D => "start_enroll",
    CancelOp = 0x003E => "cancel_op",
    QueryState = 0x0040 => "query_state",
    WriteLcd = 0x0042 => "write_LCD",
    ClearLcd = 0x0043 => "clear_LCD",
    GetPinWidth = 0x0045 => "get_pin_width",
    GetSmsId = 0x0047 => "get_sms_id",
    SetUserSmsId = 0x0049 => "set_user_sms_id",
    GetDoorState = 0x004B => "get_door_state",
    SetWorkcode = 0x0052 => "set_workcode",
    GetWorkcode = 0x0053 => "get_workcode",
    SetFpEx = 0x0057 => "set_fp_ex",
    GetFpEx = 0x0058 => "get_fp_ex",
    ReadRtLog = 0x005A => "read_rt_log",
    GetHolidayTz = 0x005B => "get_holiday_tz",
    SetHolidayTz = 0x005C => "set_holiday_tz",
    SendFile = 0x006E => "send_file",
    CheckHash = 0x0077 => "check_hash",
    SsrDelUserExt = 0x0085 => "ssr_del_user_ext",
    DelFpEx = 0x0086 => "del_fp_ex",
    GetFace = 0x0096 => "get_face",
    SetFace = 0x0097 => "set_face",
    DelFace = 0x0098 => "del_face",
    GetTime = 0x00C9 => "get_time",
    SetTime = 0x00CA => "set_time",
    GetHoliday = 0x012C => "get_holiday",
    SetHoliday = 0x012D => "set_holiday",
    RegEvent = 0x01F4 => "reg_event",
    QuerySysOp = 0x01F5 => "query_sys_op",
    Connect = 0x03E8 => "connect",
    Disconnect = 0x03E9 => "disconnect",
    Enable = 0x03EA => "enable",
    Disable = 0x03EB => "disable",
    Reboot = 0x03EC => "reboot",
    Shutdown = 0x03ED => "shutdown",
    Sleep = 0x03EE => "sleep",
    Resume = 0x03EF => "resume",
    CaptureImage = 0x03F4 => "capture_image",
    SaveData = 0x03F5 => "save_data",
    PlayVoice = 0x03F9 => "play_voice",
    Beep = 0x03FC => "beep",
    Suspend = 0x03FE => "suspend",
    SoftVer = 0x044C => "soft_ver",
    Login = 0x044E => "login",
    RecvBuffHeader = 0x05DC => "recv_buff_header",
    RecvBuffContent = 0x05DD => "recv_buff_content",
    EndBuffStream = 0x05DE => "end_buff_stream",
    StartBuffStream = 0x05DF => "start_buff_stream",
    BuffStream = 0x05E0 => "buff_stream",
    UpdateLangById = 0x06A5 => "update_lang_by_id",
    SetCustomAttState = 0x06A7 => "set_custom_att_state",
    SetCustomVoice = 0x06A8 => "set_custom_voice",
    EnableCustomVoice = 0x06AA => "enable_custom_voice",
    UpdateFile = 0x06AD => "update_file",
    Ack = 0x07D0 => "ack",
    Nak = 0x07D1 => "nak",
    AcceptConn = 0x07D5 => "accept_conn",
    GetPhotoCount = 0x07DD => "get_photo_count",
    GetPhotoByName = 0x07DE => "get_photo_by_name",
    ClearPhotoByTime = 0x07DF => "clear_photo_by_time",
    GetPhotoNamesByTime = 0x07E0 => "get_photo_names_by_time",
    ReadLargeTmp = 0x07E1 => "read_large_tmp",
    ReadTempData = 0x08AD => "read_temp_data",
    NoPic = 0x1379 => "no_pic",
    NoRecord = 0x137D => "no_record",
    NoFp = 0x137F => "no_fp",
    NoData = 0x1381 => "no_data",
    EmptyUploadBuffer = 0x1383 => "empty_upload_buffer",
    NoSysOp = 0x1387 => "no_sys_op",
    GetTableStruct = 0x2710 => "get_table_struct",
    SetUserPic = 0x2719 => "set_user_pic",
    GetUserPic = 0x271A => "get_user_pic",
    DelUserPic = 0x271B => "del_user_pic",
    NotSupport = 0xFFFF => "not_support",
}

impl Command {
    /// `del_user_fp` shares its code with `del_fp_ex`
    pub const DEL_USER_FP: Command = Command::DelFpEx;

    /// Code as sent on the wire
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Check if this code is only ever sent by the device
    pub fn is_reply(self) -> bool {
        matches!(
            self,
            Self::Ack
                | Self::Nak
                | Self::AcceptConn
                | Self::NoPic
                | Self::NoRecord
                | Self::NoFp
                | Self::NoData
                | Self::EmptyUploadBuffer
                | Self::NoSysOp
                | Self::NotSupport
        )
    }

    /// Check if this is a "nothing there" status reply
    pub fn is_empty_status(self) -> bool {
        matches!(
            self,
            Self::NoPic | Self::NoRecord | Self::NoFp | Self::NoData | Self::NoSysOp
        )
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), self.code())
    }
}
