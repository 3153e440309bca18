//! Text encodings for strings embedded in device records
//!
//! Devices store names, person IDs and file names in whatever code page the
//! terminal was localized with. Nothing is assumed to be UTF-8: the caller
//! picks the encoding once and every record codec goes through it.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Text encoding used for embedded strings
///
/// # Examples
///
/// ```
/// use zkbio_types::TextEncoding;
///
/// let arabic = TextEncoding::for_label("cp1256").unwrap();
/// assert_eq!(arabic.name(), "windows-1256");
///
/// let latin = TextEncoding::default();
/// assert_eq!(latin.decode(&[0x41, 0xE9]).unwrap(), "Aé");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// ISO-8859-1: every byte maps to the code point of the same value
    #[default]
    Latin1,

    /// Any encoding of the WHATWG Encoding Standard
    Whatwg(&'static Encoding),
}

const LATIN1_LABELS: &[&str] = &["latin1", "latin-1", "l1", "iso-8859-1", "iso8859-1", "iso_8859-1"];

impl TextEncoding {
    /// Resolve an encoding from a label such as `"cp1256"` or `"utf-8"`
    pub fn for_label(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase();

        if LATIN1_LABELS.contains(&normalized.as_str()) {
            return Ok(Self::Latin1);
        }

        Encoding::for_label(normalized.as_bytes())
            .map(Self::Whatwg)
            .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
    }

    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Whatwg(encoding) => encoding.name(),
        }
    }

    /// Decode bytes, failing on sequences the encoding cannot map
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Whatwg(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned)
                .ok_or_else(|| Error::Encoding {
                    encoding: encoding.name(),
                    reason: format!("malformed byte sequence in {} bytes", bytes.len()),
                }),
        }
    }

    /// Encode text, failing on characters the encoding cannot represent
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        match self {
            Self::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| Error::Encoding {
                        encoding: "ISO-8859-1",
                        reason: format!("character {c:?} is outside U+0000..U+00FF"),
                    })
                })
                .collect::<Result<Vec<u8>>>()
                .map(Cow::Owned),
            Self::Whatwg(encoding) => {
                let (bytes, _, had_errors) = encoding.encode(text);
                if had_errors {
                    return Err(Error::Encoding {
                        encoding: encoding.name(),
                        reason: format!("unmappable character in {text:?}"),
                    });
                }
                Ok(bytes)
            }
        }
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::for_label(s)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read a null-terminated string from a fixed field window
///
/// Bytes up to the first zero are decoded; a window without a zero byte is
/// decoded whole.
pub fn read_cstr(window: &[u8], encoding: TextEncoding) -> Result<String> {
    let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
    encoding.decode(&window[..end])
}

/// Write a string into a zero-filled fixed field window
///
/// The encoded text may occupy the whole window, in which case it carries no
/// terminator.
pub fn write_cstr(
    window: &mut [u8],
    field: &'static str,
    value: &str,
    encoding: TextEncoding,
) -> Result<()> {
    let bytes = encoding.encode(value)?;
    if bytes.len() > window.len() {
        return Err(Error::FieldTooLong {
            field,
            max: window.len(),
            actual: bytes.len(),
        });
    }

    window[..bytes.len()].copy_from_slice(&bytes);
    window[bytes.len()..].fill(0);
    Ok(())
}
