use std::{fmt, str::FromStr};

/// Unix permission bits of a written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FileModeError {
    #[error("file mode is empty")]
    Empty,
    #[error("{0:?} is not an octal number")]
    NotOctal(String),
    #[error("{0:#o} is larger than 0o7777")]
    OutOfRange(u32),
    #[error("{0:?} is larger than 0o7777")]
    TooLong(String),
}

impl FileMode {
    /// Owner read only
    pub const DEFAULT: Self = Self(0o400);
    pub const OWNER_RW: Self = Self(0o600);

    pub const fn new(bits: u32) -> Result<Self, FileModeError> {
        if bits > 0o7777 {
            return Err(FileModeError::OutOfRange(bits));
        }
        Ok(Self(bits))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Accepts `0600`, `600` and `0o600`
impl FromStr for FileMode {
    type Err = FileModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(FileModeError::Empty);
        }
        if !digits.bytes().all(|b| matches!(b, b'0'..=b'7')) {
            return Err(FileModeError::NotOctal(s.to_owned()));
        }
        // only overflow is left after the digit check
        let bits =
            u32::from_str_radix(digits, 8).map_err(|_| FileModeError::TooLong(s.to_owned()))?;
        Self::new(bits)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}
