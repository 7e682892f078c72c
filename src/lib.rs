//! Reconstruct C++ declarations from the DWARF version 1 debugging
//! information of a 32-bit ELF object.
//!
//! The pipeline is [`elf::ElfFile`] → [`dwarf::Dwarf`] → [`cpp::Files`] →
//! [`printer::Printer`]:
//!
//! ```no_run
//! # fn main() -> dwarf1cpp::Result<()> {
//! let data = std::fs::read("game.elf")?;
//! let files = dwarf1cpp::Files::parse(&data)?;
//! for file in &files {
//!     print!("{}", file.display(dwarf1cpp::PrintOptions::default()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cpp;
pub mod dwarf;
pub mod elf;
pub mod error;
mod parser;
pub mod printer;

use tracing::info;

pub use crate::cpp::{File, Files};
pub use crate::dwarf::Dwarf;
pub use crate::elf::ElfFile;
pub use crate::error::{Error, Result};
pub use crate::printer::{PrintOptions, Printer};

impl Files {
    /// Run the whole pipeline over the bytes of an ELF file.
    pub fn parse(data: &[u8]) -> Result<Files> {
        let elf = ElfFile::parse(data)?;
        let dwarf = Dwarf::load(&elf)?;
        Ok(Files::from(&dwarf))
    }
}

impl<'a, 'data> From<&'a Dwarf<'data>> for Files {
    /// Lift every compile unit. Units that fail are logged and keep what was
    /// lifted before the failure.
    fn from(dwarf: &'a Dwarf<'data>) -> Files {
        let files = parser::parse(dwarf);
        info!(files = files.len(), "converted DWARF to C++");
        files
    }
}
