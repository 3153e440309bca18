//! Device identity summary

use std::fmt;

/// Identity strings read from a terminal's system options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    pub serial_number: Option<String>,

    pub firmware_version: Option<String>,

    pub platform: Option<String>,

    /// User-assigned device name
    pub device_name: Option<String>,

    pub mac_address: Option<String>,

    pub vendor: Option<String>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "Device[SN: {}, FW: {}, Platform: {}]",
            or_unknown(&self.serial_number),
            or_unknown(&self.firmware_version),
            or_unknown(&self.platform),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_missing_fields() {
        let info = DeviceInfo {
            serial_number: Some("A1B2".into()),
            ..Default::default()
        };
        assert_eq!(info.to_string(), "Device[SN: A1B2, FW: ?, Platform: ?]");
    }
}
