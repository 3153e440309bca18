//! Named device properties read with `get_data` and written with `set_data`

use std::fmt;

macro_rules! properties {
    ($($(#[$meta:meta])* $variant:ident => $key:literal,)+) => {
        /// A well-known property key
        ///
        /// Keys with a leading `~` are read-only on most firmware.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum DeviceProperty {
            $($(#[$meta])* $variant,)+
        }

        impl DeviceProperty {
            pub const ALL: &'static [DeviceProperty] = &[$(Self::$variant,)+];

            /// Key as sent on the wire
            pub fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

properties! {
    DeviceId => "DeviceID",
    DeviceName => "~DeviceName",
    DeviceType => "DeviceType",
    ProductTime => "~ProductTime",
    SerialNumber => "~SerialNumber",
    Language => "Language",
    CompatOldFirmware => "CompatOldFirmware",
    IsSupportPull => "IsSupportPull",
    CameraOpen => "CameraOpen",
    FingerFunOn => "FingerFunOn",
    FaceFunOn => "FaceFunOn",
    FaceVersion => "ZKFaceVersion",
    BiometricType => "BiometricType",
    BuildVersion => "BuildVersion",
    AttPhotoForSdk => "AttPhotoForSDK",
    IsOnlyRfMachine => "~IsOnlyRFMachine",
    Ssr => "~SSR",
    Pin2Width => "~PIN2Width",
    OemVendor => "~OEMVendor",
    Platform => "~Platform",
    Os => "~OS",
    ExtendFmtFixed => "~ExtendFmt",
    ExtendFmt => "ExtendFmt",
    ExtendOpLogFixed => "~ExtendOPLog",
    ExtendOpLog => "ExtendOPLog",
    UserExtFmt => "~UserExtFmt",
    FingerprintVersion => "~ZKFPVersion",
    WorkCode => "WorkCode",
    /// MAC address of the network interface
    Mac => "MAC",
    IpAddress => "IPAddress",
    CommKey => "COMKey",
    UdpPort => "UDPPort",
    DaylightSavingTimeOn => "DaylightSavingTimeOn",
    DaylightSavingTime => "DaylightSavingTime",
    StandardTime => "StandardTime",
}

impl fmt::Display for DeviceProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl AsRef<str> for DeviceProperty {
    fn as_ref(&self) -> &str {
        self.key()
    }
}
