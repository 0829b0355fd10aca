//! Text decoding of input addresses and the final-report writer.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::stats::StatsSnapshot;

/// Per-line decode failure. In file mode the line is skipped; in
/// single-address mode it becomes a fatal usage error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("not a number: {0}")]
    Malformed(String),
    #[error("address {0} is not representable in 32 bits")]
    OutOfRange(u64),
}

fn is_hex(text: &str) -> bool {
    text.len() > 2 && (text.starts_with("0x") || text.starts_with("0X"))
}

/// Decode one address: hexadecimal with a `0x`/`0X` prefix, decimal
/// otherwise. Values at or above 2^32 are rejected.
pub fn parse_address(text: &str) -> Result<u32, AddressError> {
    let value = if is_hex(text) {
        u64::from_str_radix(&text[2..], 16)
    } else {
        text.parse::<u64>()
    }
    .map_err(|_| AddressError::Malformed(text.to_string()))?;

    u32::try_from(value).map_err(|_| AddressError::OutOfRange(value))
}

/// Write the aggregate counters once at the end of the run.
pub fn write_report<P: AsRef<Path>>(path: P, stats: &StatsSnapshot) -> std::io::Result<()> {
    fs::write(path.as_ref(), stats.to_string())
}
