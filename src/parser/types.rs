use gimli::Reader as _;
use tracing::trace;

use super::*;

impl<'file, 'data> Parser<'file, 'data> {
    /// Allocate an unfilled user type for every type entry directly below
    /// `unit`, so references resolve no matter where their target appears.
    pub fn preallocate(&mut self, unit: usize) {
        let dwarf = self.dwarf;

        for child in dwarf.children(unit) {
            let entry = dwarf.entry(child);
            let kind = match entry.tag {
                DW_TAG_class_type => UserTypeKind::Class(ClassType::default()),
                DW_TAG_structure_type => UserTypeKind::Struct(ClassType::default()),
                DW_TAG_union_type => UserTypeKind::Union(ClassType::default()),
                DW_TAG_enumeration_type => UserTypeKind::Enum(EnumType::default()),
                DW_TAG_array_type => UserTypeKind::Array(ArrayType::default()),
                DW_TAG_subroutine_type => UserTypeKind::Function(FunctionType::default()),
                _ => continue,
            };

            let id = self.file.add_type(UserType {
                name: self.parse_name(entry),
                kind: kind,
            });
            self.user_types.insert(child, id);
        }
    }

    pub fn parse_user_type(&mut self, index: usize, id: UserTypeId) -> Result<()> {
        let dwarf = self.dwarf;
        let entry = dwarf.entry(index);

        let kind = match entry.tag {
            DW_TAG_class_type => UserTypeKind::Class(self.parse_class(index)?),
            DW_TAG_structure_type => UserTypeKind::Struct(self.parse_class(index)?),
            DW_TAG_union_type => UserTypeKind::Union(self.parse_class(index)?),
            DW_TAG_enumeration_type => UserTypeKind::Enum(self.parse_enum(entry)?),
            DW_TAG_array_type => UserTypeKind::Array(self.parse_array(entry)?),
            DW_TAG_subroutine_type => UserTypeKind::Function(self.parse_function_type(index)?),
            _ => return Ok(()),
        };

        trace!(offset = entry.offset, name = %self.file[id].name, "user type");
        self.file[id].kind = kind;
        Ok(())
    }

    fn parse_enum(&self, entry: &Entry<'data>) -> Result<EnumType> {
        let size = entry.attr(DW_AT_byte_size).and_then(Attribute::udata).unwrap_or(0) as u32;
        let base = match size {
            1 => Fundamental::UnsignedChar,
            2 => Fundamental::UnsignedShort,
            4 => Fundamental::Int,
            8 => Fundamental::Long,
            _ => {
                return Err(Error::EnumSize {
                    offset: entry.offset,
                    size: size,
                })
            }
        };

        let mut elements = Vec::new();
        if let Some(mut block) = entry.attr(DW_AT_element_list).and_then(Attribute::block) {
            while !block.is_empty() {
                let value = match size {
                    1 => i64::from(block.read_i8()?),
                    2 => i64::from(block.read_i16()?),
                    4 => i64::from(block.read_i32()?),
                    _ => block.read_i64()?,
                };
                let name = block.read_null_terminated_slice()?;
                elements.push(Enumerator {
                    name: clean_name(&String::from_utf8_lossy(name.slice())),
                    value: value,
                });
            }
        }

        Ok(EnumType {
            base: base,
            elements: elements,
        })
    }

    /// Only row-major arrays whose dimensions are indexed by `long` from
    /// zero are representable.
    fn parse_array(&self, entry: &Entry<'data>) -> Result<ArrayType> {
        let unsupported = |reason| Error::UnsupportedArray {
            offset: entry.offset,
            reason: reason,
        };

        if let Some(ordering) = entry.attr(DW_AT_ordering).and_then(Attribute::udata) {
            if ordering != u64::from(DW_ORD_row_major.0) {
                return Err(unsupported("not row-major"));
            }
        }

        let mut block = entry
            .attr(DW_AT_subscr_data)
            .and_then(Attribute::block)
            .ok_or_else(|| unsupported("no subscript data"))?;

        let mut array = ArrayType::default();
        while !block.is_empty() {
            match DwFmt(block.read_u8()?) {
                DW_FMT_FT_C_C => {
                    let index = DwFt(block.read_u16()?);
                    let lower = block.read_u32()?;
                    let upper = block.read_u32()?;
                    if index != DW_FT_long && index != DW_FT_signed_long {
                        return Err(unsupported("index type is not long"));
                    }
                    if lower != 0 {
                        return Err(unsupported("lower bound is not zero"));
                    }
                    array.dimensions.push(upper.wrapping_add(1));
                }
                DW_FMT_ET => {
                    let attr = self.dwarf.read_attribute(&mut block)?;
                    array.element = self.parse_type_attr(&attr)?;
                    break;
                }
                _ => return Err(unsupported("subscript format")),
            }
        }

        Ok(array)
    }
}
