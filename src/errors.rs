//! # Error Types
//!
//! Defines error types and a result alias used throughout the [crate].
//!
//! This module centralizes every failure condition that can occur while configuring or running a
//! disassembly, using [thiserror] to define error types with detailed messages.

use thiserror::Error;

use crate::addr::Addr;

/// Type alias for Results returned by romdis functions
pub type Result<T> = std::result::Result<T, DisassemblerError>;

/// Comprehensive error type for the disassembler
///
/// # Examples
///
/// ```
/// use romdis::errors::{DisassemblerError, Result};
///
/// fn example_function() -> Result<()> {
///     let _file = std::fs::File::open("nonexistent_file")?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
#[allow(missing_docs)] // its just error types
pub enum DisassemblerError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse integer: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("Could not format: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("Unknown CPU tag: {0}")]
    UnknownCpu(String),
    #[error("Disassembly address {0} is outside of the valid range")]
    EntryOutOfRange(Addr),
    #[error("No ROM file given")]
    MissingRomFile,
    #[error("Address range already classified: {0}")]
    AlreadyClassifiedRange(Addr),
    #[error("{0} flag requires an ADDRESS and a LABEL")]
    MissingLabelArgument(&'static str),
    #[error("{0} flag requires a PORTNUM and a LABEL")]
    MissingPortArgument(&'static str),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_int_converts() {
        let err: DisassemblerError = "not a number".parse::<i64>().unwrap_err().into();
        assert!(matches!(err, DisassemblerError::ParseInt(_)));
    }
}
