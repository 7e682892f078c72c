use gimli::Reader as _;

use super::*;

/// Names from this producer use `@` for compiler-generated parts.
pub fn clean_name(name: &str) -> String {
    name.replace('@', "_")
}

/// The operand of the first `DW_OP_const` in a location expression.
///
/// Other opcodes are stepped over together with their operands.
pub fn location_constant(mut block: Reader) -> Result<Option<u32>> {
    while !block.is_empty() {
        let op = DwOp(block.read_u8()?);
        if op == DW_OP_const {
            return Ok(Some(block.read_u32()?));
        }
        block.skip(op.operand_size())?;
    }
    Ok(None)
}

/// Split the modifier bytes off a `DW_AT_mod_*` block, leaving the
/// `trailer` bytes of the base type in `block`.
fn parse_modifiers(block: &mut Reader, trailer: usize, offset: usize) -> Result<Vec<Modifier>> {
    let count = block.len().saturating_sub(trailer);
    let mut modifiers = Vec::with_capacity(count);
    for _ in 0..count {
        modifiers.push(Modifier::parse(DwMod(block.read_u8()?), offset)?);
    }
    Ok(modifiers)
}

impl<'file, 'data> Parser<'file, 'data> {
    pub fn parse_name(&self, entry: &Entry<'data>) -> String {
        entry.name().map(|name| clean_name(&name)).unwrap_or_default()
    }

    pub fn parse_type(&self, entry: &Entry<'data>) -> Result<Type> {
        match entry.type_attr() {
            Some(attr) => self.parse_type_attr(attr),
            None => Ok(Type::default()),
        }
    }

    pub fn parse_type_attr(&self, attr: &Attribute<'data>) -> Result<Type> {
        match (attr.name, attr.value) {
            (DW_AT_fund_type, AttributeValue::Data2(ft)) => Ok(Type::fundamental(DwFt(ft).into())),
            (DW_AT_user_def_type, AttributeValue::Reference(offset)) => {
                Ok(Type::user(self.user_type_at(offset)?))
            }
            (DW_AT_mod_fund_type, AttributeValue::Block(mut block)) => {
                let modifiers = parse_modifiers(&mut block, 2, attr.offset)?;
                let ft = DwFt(block.read_u16()?);
                Ok(Type {
                    base: BaseType::Fundamental(ft.into()),
                    modifiers: modifiers,
                })
            }
            (DW_AT_mod_u_d_type, AttributeValue::Block(mut block)) => {
                let modifiers = parse_modifiers(&mut block, 4, attr.offset)?;
                let offset = block.read_u32()?;
                Ok(Type {
                    base: BaseType::User(self.user_type_at(offset)?),
                    modifiers: modifiers,
                })
            }
            _ => Err(Error::UnknownForm {
                offset: attr.offset,
                form: attr.form().0,
            }),
        }
    }

    /// The user type allocated for the entry at `.debug` offset `offset`.
    fn user_type_at(&self, offset: u32) -> Result<UserTypeId> {
        self.dwarf
            .resolve(offset)
            .and_then(|index| self.user_types.get(&index))
            .copied()
            .ok_or(Error::UnresolvedType { offset: offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimli::{EndianSlice, Reader as _, RunTimeEndian};

    fn block(bytes: &[u8]) -> Reader {
        EndianSlice::new(bytes, RunTimeEndian::Big)
    }

    #[test]
    fn finds_constant_after_other_ops() {
        // the basereg operand ends in a byte that looks like DW_OP_const
        let bytes = [0x02, 0x00, 0x00, 0x00, 0x04, 0x04, 0x00, 0x00, 0x00, 0x18, 0x07];
        assert_eq!(location_constant(block(&bytes)).unwrap(), Some(0x18));
    }

    #[test]
    fn no_constant() {
        assert_eq!(location_constant(block(&[0x07, 0x06])).unwrap(), None);
        assert_eq!(location_constant(block(&[])).unwrap(), None);
    }

    #[test]
    fn truncated_constant_is_an_error() {
        assert!(location_constant(block(&[0x04, 0x00])).is_err());
    }

    #[test]
    fn cleans_names() {
        assert_eq!(clean_name("@class@1"), "_class_1");
    }

    #[test]
    fn modifier_bytes_keep_their_order() {
        let bytes = [0x01, 0x03, 0x00, 0x07];
        let mut reader = block(&bytes);
        let modifiers = parse_modifiers(&mut reader, 2, 0).unwrap();
        assert_eq!(modifiers, vec![Modifier::PointerTo, Modifier::Const]);
        assert_eq!(reader.read_u16().unwrap(), 7);
    }
}
