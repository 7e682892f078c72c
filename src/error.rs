//! Error types shared by every stage of the pipeline.

use std::io;

use thiserror::Error;

/// Everything that can go wrong between opening the file and lifting a
/// compile unit.
///
/// File, header and section errors are fatal for the whole run. DWARF
/// structural errors abort the reader. Semantic errors only take down the
/// user type or compile unit being lifted.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("file is empty")]
    EmptyFile,

    /// The ELF identification or header sizes are not what we support.
    #[error("invalid ELF header: {0}")]
    Header(&'static str),

    #[error("malformed ELF file: {0}")]
    Object(#[from] object::read::Error),

    #[error("missing section {0}")]
    MissingSection(&'static str),

    /// A primitive read ran past the end of its buffer.
    #[error("short read: {0}")]
    Read(#[from] gimli::Error),

    #[error("entry at 0x{offset:x} overruns its length")]
    EntryOverrun { offset: usize },

    #[error("unknown attribute form 0x{form:x} at 0x{offset:x}")]
    UnknownForm { offset: usize, form: u16 },

    #[error("unknown type modifier 0x{modifier:x} in attribute at 0x{offset:x}")]
    UnknownModifier { offset: usize, modifier: u8 },

    /// A type reference does not point at a user type of the compile unit.
    #[error("unresolved type reference 0x{offset:x}")]
    UnresolvedType { offset: u32 },

    #[error("unsupported array type at 0x{offset:x}: {reason}")]
    UnsupportedArray { offset: usize, reason: &'static str },

    #[error("unknown enum byte size {size} at 0x{offset:x}")]
    EnumSize { offset: usize, size: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_offsets() {
        let message = Error::UnknownForm { offset: 0x40, form: 0xb }.to_string();
        assert!(message.contains("0xb"));
        assert!(message.contains("0x40"));

        let message = Error::EnumSize { offset: 0x10, size: 3 }.to_string();
        assert!(message.contains("size 3"));
    }

    #[test]
    fn io_errors_convert() {
        let error: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(error, Error::Io(_)));
    }
}
