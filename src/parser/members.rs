use tracing::debug;

use super::*;

impl<'file, 'data> Parser<'file, 'data> {
    /// Body of a class, struct or union: its size plus the members and base
    /// classes found among its children.
    pub fn parse_class(&self, index: usize) -> Result<ClassType> {
        let dwarf = self.dwarf;
        let entry = dwarf.entry(index);

        let mut class = ClassType {
            size: entry.attr(DW_AT_byte_size).and_then(Attribute::udata).unwrap_or(0) as u32,
            ..ClassType::default()
        };

        for child in dwarf.children(index) {
            let child = dwarf.entry(child);
            match child.tag {
                DW_TAG_member => class.members.push(self.parse_member(child)?),
                DW_TAG_inheritance => class.inheritances.push(Inheritance {
                    offset: self.parse_location(child)?,
                    ty: self.parse_type(child)?,
                }),
                _ => {}
            }
        }

        if class.size > 0 {
            for member in &class.members {
                let end = member.offset.saturating_add(self.file.byte_size(&member.ty));
                if end > class.size {
                    debug!(
                        offset = entry.offset,
                        member = %member.name,
                        end,
                        size = class.size,
                        "member overruns its class"
                    );
                }
            }
        }

        Ok(class)
    }

    fn parse_member(&self, entry: &Entry<'data>) -> Result<Member> {
        let bits = |name| entry.attr(name).and_then(Attribute::udata).map(|value| value as u32);

        Ok(Member {
            offset: self.parse_location(entry)?,
            name: self.parse_name(entry),
            ty: self.parse_type(entry)?,
            bit_offset: bits(DW_AT_bit_offset),
            bit_size: bits(DW_AT_bit_size),
        })
    }

    /// The byte offset encoded in `DW_AT_location`, zero when absent.
    fn parse_location(&self, entry: &Entry<'data>) -> Result<u32> {
        match entry.attr(DW_AT_location).and_then(Attribute::block) {
            Some(block) => Ok(location_constant(block)?.unwrap_or(0)),
            None => Ok(0),
        }
    }
}
