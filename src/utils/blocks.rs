//! Block reference parsing for user-supplied scan bounds

use std::fmt;
use std::str::FromStr;

use crate::models::errors::AppError;

/// A block bound as typed by a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Number(u64),
    Earliest,
    Latest,
    Pending,
}

impl BlockRef {
    /// Concrete block number, or `None` for "use the current head"
    pub fn resolve(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Earliest => Some(0),
            Self::Latest | Self::Pending => None,
        }
    }
}

impl FromStr for BlockRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "latest" => return Ok(Self::Latest),
            "earliest" => return Ok(Self::Earliest),
            "pending" => return Ok(Self::Pending),
            _ => {}
        }

        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(Self::Number)
            .map_err(|_| AppError::invalid_config(format!("Invalid block reference: {}", s)))
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Earliest => f.write_str("earliest"),
            Self::Latest => f.write_str("latest"),
            Self::Pending => f.write_str("pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_parse_forms() {
        assert_eq!("1234".parse::<BlockRef>().unwrap(), BlockRef::Number(1234));
        assert_eq!("0x10".parse::<BlockRef>().unwrap(), BlockRef::Number(16));
        assert_eq!("Latest".parse::<BlockRef>().unwrap(), BlockRef::Latest);
        assert_eq!("earliest".parse::<BlockRef>().unwrap().resolve(), Some(0));
        assert_eq!("pending".parse::<BlockRef>().unwrap().resolve(), None);
    }

    #[test]
    fn test_garbage_is_config_error() {
        let err = "yesterday".parse::<BlockRef>().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert!("-5".parse::<BlockRef>().is_err());
        assert!("0xzz".parse::<BlockRef>().is_err());
    }
}
