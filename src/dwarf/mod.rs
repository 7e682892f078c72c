//! DWARF version 1 reader.
//!
//! Version 1 has no abbreviation tables and no explicit tree structure:
//! `.debug` is a flat list of length-prefixed entries and the tree is
//! recovered from `DW_AT_sibling` references.

pub mod constants;
mod entry;
mod line;

use std::collections::HashMap;

use fallible_iterator::FallibleIterator;
use tracing::{debug, warn};

pub use self::entry::{parse_attribute, Attribute, AttributeValue, Entries, Entry, NULL_ENTRY_LENGTH};
pub use self::line::{LineEntry, LineRows, LineTable};

use self::constants::DW_AT_sibling;
use crate::elf::{ElfFile, Reader};
use crate::error::{Error, Result};

pub struct Dwarf<'data> {
    section: Reader<'data>,
    entries: Vec<Entry<'data>>,
    /// `.debug` offset to index in `entries`.
    offsets: HashMap<usize, usize>,
    lines: LineTable,
}

impl<'data> Dwarf<'data> {
    /// Read `.debug` and, when present, `.line` from `elf`.
    pub fn load(elf: &ElfFile<'data>) -> Result<Dwarf<'data>> {
        let debug = elf.section_data(".debug")?.ok_or(Error::MissingSection(".debug"))?;
        let line = elf.section_data(".line")?;
        if line.is_none() {
            warn!("no .line section, functions will have no line numbers");
        }

        Dwarf::parse(elf.reader(debug), line.map(|line| elf.reader(line)))
    }

    pub fn parse(debug: Reader<'data>, line: Option<Reader<'data>>) -> Result<Dwarf<'data>> {
        let entries: Vec<Entry> = Entries::new(debug).collect()?;
        let offsets = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.offset, index))
            .collect();

        let mut lines = LineTable::default();
        if let Some(line) = line {
            let rows = LineRows::new(line).for_each(|row| {
                lines.insert(row);
                Ok(())
            });
            if let Err(err) = rows {
                warn!("stopped reading .line after {} rows: {}", lines.len(), err);
            }
        }

        debug!(entries = entries.len(), lines = lines.len(), "loaded DWARF");

        Ok(Dwarf {
            section: debug,
            entries: entries,
            offsets: offsets,
            lines: lines,
        })
    }

    pub fn entries(&self) -> &[Entry<'data>] {
        &self.entries
    }

    /// The entry at `index` in file order.
    ///
    /// Panics if `index` is out of range; indices come from this reader.
    pub fn entry(&self, index: usize) -> &Entry<'data> {
        &self.entries[index]
    }

    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    /// Index of the entry starting at `offset`.
    pub fn resolve(&self, offset: u32) -> Option<usize> {
        self.offsets.get(&(offset as usize)).copied()
    }

    /// Decode an attribute embedded in a block of this section, such as the
    /// element type at the end of `DW_AT_subscr_data`.
    pub fn read_attribute(&self, input: &mut Reader<'data>) -> Result<Attribute<'data>> {
        parse_attribute(input, &self.section)
    }

    /// The entry following `index` at the same depth.
    ///
    /// This is the `DW_AT_sibling` target when it resolves to a later entry,
    /// otherwise simply the next entry.
    pub fn sibling(&self, index: usize) -> Option<usize> {
        if index + 1 >= self.entries.len() {
            return None;
        }

        let target = self.entries[index]
            .attr(DW_AT_sibling)
            .and_then(Attribute::reference)
            .and_then(|offset| self.resolve(offset));

        match target {
            Some(target) if target > index => Some(target),
            _ => Some(index + 1),
        }
    }

    /// `first` and every entry reachable from it through `sibling`.
    pub fn siblings(&self, first: usize) -> Siblings<'_, 'data> {
        Siblings {
            dwarf: self,
            next: Some(first).filter(|&first| first < self.entries.len()),
            end: usize::MAX,
        }
    }

    /// The direct children of `index`: the sibling chain that starts right
    /// after it and stops at its own sibling.
    pub fn children(&self, index: usize) -> Siblings<'_, 'data> {
        let entry = &self.entries[index];

        // The sibling of the last compile unit is the end of `.debug` and
        // names no entry. `sibling` would fall back to the next entry there
        // and leave the unit without children, so bound by the raw offset.
        let end = match entry.attr(DW_AT_sibling).and_then(Attribute::reference) {
            Some(offset) => offset as usize,
            None => self
                .sibling(index)
                .map_or(usize::MAX, |sibling| self.entries[sibling].offset),
        };

        Siblings {
            dwarf: self,
            next: Some(index + 1).filter(|&next| next < self.entries.len()),
            end: end.max(entry.offset),
        }
    }
}

/// Entry indices along a sibling chain.
#[derive(Clone)]
pub struct Siblings<'a, 'data> {
    dwarf: &'a Dwarf<'data>,
    next: Option<usize>,
    /// Offset at which the chain stops.
    end: usize,
}

impl<'a, 'data> Iterator for Siblings<'a, 'data> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        if self.dwarf.entries[current].offset >= self.end {
            self.next = None;
            return None;
        }

        self.next = self.dwarf.sibling(current);
        Some(current)
    }
}
