use std::collections::BTreeMap;

use fallible_iterator::FallibleIterator;
use gimli::Reader as _;

use crate::elf::Reader;
use crate::error::{Error, Result};

/// One row of the `.line` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    /// Start address of the function this row belongs to.
    pub function_address: u32,
    /// Zero marks the end of the function.
    pub line: u32,
    pub character: u16,
    /// Offset of the row's code from `function_address`.
    pub pc_offset: u32,
}

impl LineEntry {
    pub fn is_end(&self) -> bool {
        self.line == 0
    }

    pub fn address(&self) -> u32 {
        self.function_address.wrapping_add(self.pc_offset)
    }
}

#[derive(Debug, Clone, Copy)]
struct Chunk {
    function_address: u32,
    end: usize,
}

/// Rows of the `.line` section, chunk after chunk.
///
/// Each chunk starts with `{ byte size, function address }` and is followed
/// by `{ line, character, pc offset }` triples until either the chunk size
/// is used up or a line-zero terminator is read. The next chunk header
/// follows the last row that was read.
#[derive(Debug, Clone)]
pub struct LineRows<'data> {
    section: Reader<'data>,
    input: Reader<'data>,
    chunk: Option<Chunk>,
}

impl<'data> LineRows<'data> {
    pub fn new(section: Reader<'data>) -> LineRows<'data> {
        LineRows {
            section: section,
            input: section,
            chunk: None,
        }
    }

    fn offset(&self) -> usize {
        self.input.offset_from(self.section)
    }

    fn parse_row(&mut self, chunk: Chunk) -> Result<LineEntry> {
        let row = LineEntry {
            function_address: chunk.function_address,
            line: self.input.read_u32()?,
            character: self.input.read_u16()?,
            pc_offset: self.input.read_u32()?,
        };
        if row.is_end() {
            self.chunk = None;
        }
        Ok(row)
    }

    fn parse_next(&mut self) -> Result<Option<LineEntry>> {
        loop {
            if let Some(chunk) = self.chunk {
                if self.offset() < chunk.end {
                    return self.parse_row(chunk).map(Some);
                }
                self.chunk = None;
            }

            if self.input.is_empty() {
                return Ok(None);
            }

            let start = self.offset();
            let size = self.input.read_u32()?;
            let function_address = self.input.read_u32()?;
            self.chunk = Some(Chunk {
                function_address: function_address,
                end: start.saturating_add(size as usize),
            });
        }
    }
}

impl<'data> FallibleIterator for LineRows<'data> {
    type Item = LineEntry;
    type Error = Error;

    fn next(&mut self) -> Result<Option<LineEntry>> {
        let result = self.parse_next();
        if result.is_err() {
            self.input.empty();
        }
        result
    }
}

/// Line rows grouped by the address of the function they describe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    rows: BTreeMap<u32, Vec<LineEntry>>,
}

impl LineTable {
    pub fn insert(&mut self, row: LineEntry) {
        self.rows.entry(row.function_address).or_default().push(row);
    }

    /// Rows for the function starting at `address`, in section order,
    /// terminator included.
    pub fn rows(&self, address: u32) -> &[LineEntry] {
        self.rows.get(&address).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
