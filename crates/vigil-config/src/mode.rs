//! Octal permission bits for the committed file.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MAX_MODE: u32 = 0o7777;

/// Unix permission bits, written and displayed in octal (`0440`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    /// Wraps raw permission bits. Bits above `0o7777` are discarded.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits & MAX_MODE)
    }

    /// Raw permission bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Errors raised while parsing a [`FileMode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileModeParseError {
    /// The text was empty.
    #[error("file mode must not be empty")]
    Empty,
    /// The text contained something other than octal digits.
    #[error("file mode '{0}' is not an octal number")]
    NotOctal(String),
    /// The value does not fit in the permission bits.
    #[error("file mode '{0}' exceeds 7777")]
    OutOfRange(String),
}

impl FromStr for FileMode {
    type Err = FileModeParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(FileModeParseError::Empty);
        }
        if !digits.bytes().all(|byte| (b'0'..=b'7').contains(&byte)) {
            return Err(FileModeParseError::NotOctal(text.to_owned()));
        }
        let bits = u32::from_str_radix(digits, 8)
            .map_err(|_| FileModeParseError::OutOfRange(text.to_owned()))?;
        if bits > MAX_MODE {
            return Err(FileModeParseError::OutOfRange(text.to_owned()));
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FileModeVisitor)
    }
}

struct FileModeVisitor;

impl Visitor<'_> for FileModeVisitor {
    type Value = FileMode;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an octal file mode such as \"0440\"")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        value.parse().map_err(E::custom)
    }

    // Environment layers hand `0440` over as the integer 440; its decimal
    // digits are read as octal digits.
    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        value.to_string().parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        value.to_string().parse().map_err(E::custom)
    }
}
