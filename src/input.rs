use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Prefixes and postfixes longer than this are rejected
pub const AFFIX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeError {
    #[error("no x in image size")]
    NoSeparator,
    #[error("image size must be an integer")]
    NotAnInteger,
    #[error("image size must be positive")]
    NotPositive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AffixError {
    #[error("input too long")]
    TooLong,
    #[error("invalid character: {0:?}")]
    InvalidChar(char),
}

/// Target image dimensions in pixels, written as `WxH` on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Size {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s.split_once('x').ok_or(SizeError::NoSeparator)?;
        if height.contains('x') {
            return Err(SizeError::NoSeparator);
        }

        Ok(Size {
            width: parse_dimension(width)?,
            height: parse_dimension(height)?,
        })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn parse_dimension(s: &str) -> Result<u32, SizeError> {
    // Parse signed first so "-640" reports as non-positive rather than garbage
    let value: i64 = s.parse().map_err(|_| SizeError::NotAnInteger)?;
    if value <= 0 {
        return Err(SizeError::NotPositive);
    }
    u32::try_from(value).map_err(|_| SizeError::NotAnInteger)
}

/// Check a filename prefix or postfix: short, and only `[A-Za-z0-9-_.]`
pub fn validate_affix(s: &str) -> Result<(), AffixError> {
    if s.len() > AFFIX_LIMIT {
        return Err(AffixError::TooLong);
    }
    match s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        Some(c) => Err(AffixError::InvalidChar(c)),
        None => Ok(()),
    }
}
