//! ELF32 container access.
//!
//! Only the section header table is consulted: the DWARF v1 data lives in
//! the `.debug` and `.line` sections and is located by name.

use std::mem;

use gimli::{EndianSlice, RunTimeEndian};
use object::elf;
use object::read::elf::{FileHeader, SectionHeader, SectionTable};
use object::{Endian, Endianness};
use tracing::debug;

use crate::error::{Error, Result};

type Header = elf::FileHeader32<Endianness>;

/// Length of `e_ident` and the positions read from it.
const IDENT_SIZE: usize = 16;
const IDENT_CLASS: usize = 4;
const IDENT_DATA: usize = 5;
const IDENT_VERSION: usize = 6;

/// A byte reader that honours the byte order declared by the file.
pub type Reader<'data> = EndianSlice<'data, RunTimeEndian>;

pub struct ElfFile<'data> {
    data: &'data [u8],
    endian: Endianness,
    sections: SectionTable<'data, Header>,
}

impl<'data> ElfFile<'data> {
    /// Validate the identification and header of `data` and index its
    /// section headers.
    pub fn parse(data: &'data [u8]) -> Result<ElfFile<'data>> {
        if data.is_empty() {
            return Err(Error::EmptyFile);
        }

        let ident = data.get(..IDENT_SIZE).ok_or(Error::Header("truncated identification"))?;
        if ident[..4] != elf::ELFMAG {
            return Err(Error::Header("bad magic"));
        }
        if ident[IDENT_CLASS] != elf::ELFCLASS32 {
            return Err(Error::Header("not a 32-bit object"));
        }
        if ident[IDENT_DATA] == elf::ELFDATANONE {
            return Err(Error::Header("no data encoding"));
        }
        if ident[IDENT_VERSION] != elf::EV_CURRENT {
            return Err(Error::Header("unsupported identification version"));
        }

        let header = Header::parse(data).map_err(|_| Error::Header("truncated header"))?;
        let endian = header.endian()?;

        if usize::from(header.e_ehsize(endian)) != mem::size_of::<Header>() {
            return Err(Error::Header("unexpected ELF header size"));
        }
        if usize::from(header.e_shentsize(endian)) != mem::size_of::<elf::SectionHeader32<Endianness>>() {
            return Err(Error::Header("unexpected section header size"));
        }
        if header.e_version(endian) == u32::from(elf::EV_NONE) {
            return Err(Error::Header("invalid version"));
        }

        let sections = header.sections(endian, data)?;
        debug!(sections = sections.len(), big_endian = endian.is_big_endian(), "parsed ELF header");

        Ok(ElfFile {
            data: data,
            endian: endian,
            sections: sections,
        })
    }

    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn endian(&self) -> RunTimeEndian {
        match self.endian {
            Endianness::Little => RunTimeEndian::Little,
            Endianness::Big => RunTimeEndian::Big,
        }
    }

    /// Contents of the first section called `name`, if there is one.
    pub fn section_data(&self, name: &str) -> Result<Option<&'data [u8]>> {
        match self.sections.section_by_name(self.endian, name.as_bytes()) {
            Some((_, section)) => Ok(Some(section.data(self.endian, self.data)?)),
            None => Ok(None),
        }
    }

    /// Wrap `bytes` in a reader using the file's byte order.
    pub fn reader(&self, bytes: &'data [u8]) -> Reader<'data> {
        EndianSlice::new(bytes, self.endian())
    }
}
