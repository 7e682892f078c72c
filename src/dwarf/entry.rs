use fallible_iterator::FallibleIterator;
use gimli::Reader as _;
use tracing::trace;

use super::constants::*;
use crate::elf::Reader;
use crate::error::{Error, Result};

/// Entries shorter than this carry no tag and mark padding or the end of a
/// sibling chain.
pub const NULL_ENTRY_LENGTH: u32 = 8;

/// A decoded attribute value. The variant follows the attribute's form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue<'data> {
    Address(u32),
    /// Byte offset of another entry in `.debug`.
    Reference(u32),
    Block(Reader<'data>),
    Data2(u16),
    Data4(u32),
    Data8(u64),
    /// Without its NUL terminator.
    String(Reader<'data>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'data> {
    /// Offset of the attribute name in `.debug`.
    pub offset: usize,
    pub name: DwAt,
    pub value: AttributeValue<'data>,
}

impl<'data> Attribute<'data> {
    pub fn form(&self) -> DwForm {
        self.name.form()
    }

    /// Size of the encoded value, excluding the name and any block length.
    pub fn size(&self) -> usize {
        match self.value {
            AttributeValue::Address(_) | AttributeValue::Reference(_) | AttributeValue::Data4(_) => 4,
            AttributeValue::Data2(_) => 2,
            AttributeValue::Data8(_) => 8,
            AttributeValue::Block(block) => block.len(),
            AttributeValue::String(string) => string.len() + 1,
        }
    }

    pub fn reference(&self) -> Option<u32> {
        match self.value {
            AttributeValue::Reference(offset) => Some(offset),
            _ => None,
        }
    }

    /// The value of any fixed-size numeric form.
    pub fn udata(&self) -> Option<u64> {
        match self.value {
            AttributeValue::Address(value) => Some(u64::from(value)),
            AttributeValue::Data2(value) => Some(u64::from(value)),
            AttributeValue::Data4(value) => Some(u64::from(value)),
            AttributeValue::Data8(value) => Some(value),
            _ => None,
        }
    }

    pub fn block(&self) -> Option<Reader<'data>> {
        match self.value {
            AttributeValue::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<String> {
        match self.value {
            AttributeValue::String(string) => Some(String::from_utf8_lossy(string.slice()).into_owned()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'data> {
    pub offset: usize,
    /// Includes the four bytes of the length itself.
    pub length: u32,
    /// `DW_TAG_padding` for null entries.
    pub tag: DwTag,
    pub attributes: Vec<Attribute<'data>>,
}

impl<'data> Entry<'data> {
    pub fn is_null(&self) -> bool {
        self.length < NULL_ENTRY_LENGTH
    }

    pub fn attr(&self, name: DwAt) -> Option<&Attribute<'data>> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn name(&self) -> Option<String> {
        self.attr(DW_AT_name).and_then(Attribute::string)
    }

    /// The first attribute that describes this entry's type.
    pub fn type_attr(&self) -> Option<&Attribute<'data>> {
        self.attributes.iter().find(|attr| attr.name.is_type())
    }
}

/// Decode one attribute from `input`. `section` is the whole `.debug`
/// section and only serves to compute offsets.
pub fn parse_attribute<'data>(input: &mut Reader<'data>, section: &Reader<'data>) -> Result<Attribute<'data>> {
    let offset = input.offset_from(*section);
    let name = DwAt(input.read_u16()?);

    let value = match name.form() {
        DW_FORM_addr => AttributeValue::Address(input.read_u32()?),
        DW_FORM_ref => AttributeValue::Reference(input.read_u32()?),
        DW_FORM_block2 => {
            let length = input.read_u16()?;
            AttributeValue::Block(input.split(usize::from(length))?)
        }
        DW_FORM_block4 => {
            let length = input.read_u32()?;
            AttributeValue::Block(input.split(length as usize)?)
        }
        DW_FORM_data2 => AttributeValue::Data2(input.read_u16()?),
        DW_FORM_data4 => AttributeValue::Data4(input.read_u32()?),
        DW_FORM_data8 => AttributeValue::Data8(input.read_u64()?),
        DW_FORM_string => AttributeValue::String(input.read_null_terminated_slice()?),
        form => return Err(Error::UnknownForm { offset: offset, form: form.0 }),
    };

    Ok(Attribute {
        offset: offset,
        name: name,
        value: value,
    })
}

/// The `.debug` section as a flat stream of entries in file order.
#[derive(Debug, Clone)]
pub struct Entries<'data> {
    section: Reader<'data>,
    input: Reader<'data>,
}

impl<'data> Entries<'data> {
    pub fn new(section: Reader<'data>) -> Entries<'data> {
        Entries {
            section: section,
            input: section,
        }
    }

    fn parse_entry(&mut self) -> Result<Entry<'data>> {
        let offset = self.input.offset_from(self.section);
        let length = self.input.read_u32()?;

        if length < NULL_ENTRY_LENGTH {
            // the length word is already consumed; never step backwards
            let rest = (length as usize).saturating_sub(4).min(self.input.len());
            self.input.skip(rest)?;
            return Ok(Entry {
                offset: offset,
                length: length,
                tag: DW_TAG_padding,
                attributes: Vec::new(),
            });
        }

        let mut body = self
            .input
            .split(length as usize - 4)
            .map_err(|_| Error::EntryOverrun { offset: offset })?;
        let tag = DwTag(body.read_u16()?);

        let mut attributes = Vec::new();
        while !body.is_empty() {
            let attribute = parse_attribute(&mut body, &self.section).map_err(|err| match err {
                Error::Read(_) => Error::EntryOverrun { offset: offset },
                err => err,
            })?;
            attributes.push(attribute);
        }

        trace!(offset, %tag, attributes = attributes.len(), "entry");

        Ok(Entry {
            offset: offset,
            length: length,
            tag: tag,
            attributes: attributes,
        })
    }
}

impl<'data> FallibleIterator for Entries<'data> {
    type Item = Entry<'data>;
    type Error = Error;

    fn next(&mut self) -> Result<Option<Entry<'data>>> {
        if self.input.is_empty() {
            return Ok(None);
        }

        match self.parse_entry() {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                self.input.empty();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimli::{EndianSlice, RunTimeEndian};

    fn reader(bytes: &[u8]) -> Reader {
        EndianSlice::new(bytes, RunTimeEndian::Little)
    }

    #[test]
    fn decodes_every_form() {
        let bytes = [
            0x11, 0x01, 0x00, 0x10, 0x00, 0x80, // low_pc addr
            0x12, 0x00, 0x40, 0x00, 0x00, 0x00, // sibling ref
            0x55, 0x00, 0x07, 0x00, // fund_type data2
            0xb6, 0x00, 0x08, 0x00, 0x00, 0x00, // byte_size data4
            0x23, 0x00, 0x02, 0x00, 0xaa, 0xbb, // location block2
            0xf4, 0x00, 0x01, 0x00, 0x00, 0x00, 0xcc, // element_list block4
            0x38, 0x00, b'f', b'o', b'o', 0x00, // name string
        ];
        let section = reader(&bytes);
        let mut input = section;

        let attrs: Vec<_> = (0..7)
            .map(|_| parse_attribute(&mut input, &section).unwrap())
            .collect();
        assert!(input.is_empty());

        assert_eq!(attrs[0].name, DW_AT_low_pc);
        assert_eq!(attrs[0].udata(), Some(0x8000_1000));
        assert_eq!(attrs[1].reference(), Some(0x40));
        assert_eq!(attrs[1].offset, 6);
        assert_eq!(attrs[2].value, AttributeValue::Data2(7));
        assert_eq!(attrs[3].udata(), Some(8));
        assert_eq!(attrs[4].block().unwrap().slice(), &[0xaa, 0xbb]);
        assert_eq!(attrs[4].size(), 2);
        assert_eq!(attrs[5].block().unwrap().slice(), &[0xcc]);
        assert_eq!(attrs[6].string().as_deref(), Some("foo"));
        assert_eq!(attrs[6].size(), 4);
    }

    #[test]
    fn rejects_unknown_form() {
        let bytes = [0x09, 0x00, 0x00, 0x00];
        let section = reader(&bytes);
        let mut input = section;
        match parse_attribute(&mut input, &section) {
            Err(Error::UnknownForm { offset: 0, form: 9 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn null_entries_advance_by_length() {
        let bytes = [
            0x04, 0x00, 0x00, 0x00, // null entry of length 4
            0x06, 0x00, 0x00, 0x00, 0xee, 0xee, // null entry of length 6
            0x0a, 0x00, 0x00, 0x00, 0x11, 0x00, 0x55, 0x00, 0x07, 0x00, // compile unit
        ];
        let entries: Vec<_> = Entries::new(reader(&bytes)).collect().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_null());
        assert!(entries[1].is_null());
        assert_eq!(entries[1].offset, 4);
        assert_eq!(entries[2].offset, 10);
        assert_eq!(entries[2].tag, DW_TAG_compile_unit);
        assert_eq!(entries[2].attributes.len(), 1);
    }

    #[test]
    fn zero_length_does_not_loop() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let entries: Vec<_> = Entries::new(reader(&bytes)).collect().unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn overrun_is_fatal() {
        // length claims 10 bytes but the data4 value needs 4 after its name
        let bytes = [
            0x0a, 0x00, 0x00, 0x00, 0x11, 0x00, 0xb6, 0x00, 0x01, 0x00, 0x00, 0x00,
        ];
        let result: Result<Vec<_>> = Entries::new(reader(&bytes)).collect();
        match result {
            Err(Error::EntryOverrun { offset: 0 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn truncated_entry_is_an_overrun() {
        let bytes = [0x20, 0x00, 0x00, 0x00, 0x11, 0x00];
        let result: Result<Vec<_>> = Entries::new(reader(&bytes)).collect();
        assert!(matches!(result, Err(Error::EntryOverrun { offset: 0 })));
    }
}
