use anyhow::{Result, bail};

/// Session seed requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedInput {
    Fixed(u64),
    /// Let the coordinator derive a seed from the wall clock.
    Time,
}

impl SeedInput {
    /// Parse a CLI seed token.
    ///
    /// Supports decimal integers (negative values use their magnitude),
    /// `0x`-prefixed hex, and the keyword `time`.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("time") {
            return Ok(Self::Time);
        }

        if let Ok(value) = token.parse::<u64>() {
            return Ok(Self::Fixed(value));
        }

        if let Ok(value) = token.parse::<i64>() {
            return Ok(Self::Fixed(value.unsigned_abs()));
        }

        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            && let Ok(value) = u64::from_str_radix(hex, 16)
        {
            return Ok(Self::Fixed(value));
        }

        bail!("Unrecognized seed token: {token}");
    }

    #[must_use]
    pub const fn seed(self) -> Option<u64> {
        match self {
            Self::Fixed(seed) => Some(seed),
            Self::Time => None,
        }
    }
}
