//! Error kinds shared by every PSI/SI parsing stage.

use thiserror::Error;

/// A parsing failure local to a single section. Every variant maps to one of
/// the rejection counters in [`crate::psi::store::Stats`]; none of them are
/// fatal to the demultiplex loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("expected buffer or table reference was absent")]
    NullPointer,

    #[error("first byte of section did not match the expected table_id")]
    InvalidTableId,

    #[error("section_length exceeded the syntax-dependent cap")]
    InvalidSectionLength,

    #[error("section_number already present in the current version's bitmap")]
    DuplicateData,

    #[error("bit reader ran past the end of the buffer")]
    TruncatedInput,

    #[error("trailing CRC-32 did not match the computed checksum")]
    CrcMismatch,
}

pub type Result<T> = std::result::Result<T, Error>;
