use tracing::trace;

use super::*;

/// The class a mangled member function name belongs to.
///
/// The producer mangles `Class::name` as `name__<len><Class>F<params>`; the
/// digits after the last `__` give the length of the class name, which must
/// be followed by `F`.
pub fn mangled_class_name(mangled: &str) -> Option<&str> {
    let start = mangled.rfind("__")? + 2;
    let digits = mangled[start..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let length: usize = mangled[start..start + digits].parse().ok()?;
    let name_start = start + digits;
    let name_end = name_start.checked_add(length)?;
    if length == 0 || mangled.as_bytes().get(name_end) != Some(&b'F') {
        return None;
    }

    mangled.get(name_start..name_end)
}

impl<'file, 'data> Parser<'file, 'data> {
    pub fn parse_variable(&self, entry: &Entry<'data>) -> Result<Variable> {
        Ok(Variable {
            name: self.parse_name(entry),
            ty: self.parse_type(entry)?,
            is_global: entry.tag == DW_TAG_global_variable,
        })
    }

    /// Return type and parameters of a subroutine or subroutine type.
    pub fn parse_function_type(&self, index: usize) -> Result<FunctionType> {
        let dwarf = self.dwarf;

        let mut function = FunctionType {
            return_type: self.parse_type(dwarf.entry(index))?,
            ..FunctionType::default()
        };

        for child in dwarf.children(index) {
            let child = dwarf.entry(child);
            match child.tag {
                DW_TAG_formal_parameter => function.parameters.push(Parameter {
                    name: Some(self.parse_name(child)).filter(|name| !name.is_empty()),
                    ty: self.parse_type(child)?,
                }),
                DW_TAG_unspecified_parameters => function.variadic = true,
                _ => {}
            }
        }

        Ok(function)
    }

    pub fn parse_subprogram(&mut self, index: usize) -> Result<FunctionId> {
        let dwarf = self.dwarf;
        let entry = dwarf.entry(index);

        let mut signature = self.parse_function_type(index)?;
        let mut variables = Vec::new();
        self.parse_block(index, &mut variables)?;

        let start_address = entry.attr(DW_AT_low_pc).and_then(Attribute::udata).unwrap_or(0) as u32;
        let mangled_name = entry.attr(DW_AT_mangled_name).and_then(Attribute::string).unwrap_or_default();
        let owner = self.parse_owner(&mut signature, &mangled_name);

        let function = Function {
            signature: signature,
            is_global: entry.tag == DW_TAG_global_subroutine,
            name: self.parse_name(entry),
            mangled_name: mangled_name,
            start_address: start_address,
            variables: variables,
            owner: owner,
            lines: dwarf.lines().rows(start_address).to_vec(),
        };
        trace!(offset = entry.offset, name = %function.name, "subprogram");

        let id = self.file.add_function(function);
        if let Some(class) = owner.and_then(|owner| self.file[owner].kind.class_mut()) {
            class.functions.push(id);
        }
        Ok(id)
    }

    /// Collect the variables of a subroutine or lexical block, descending
    /// into nested blocks.
    fn parse_block(&self, index: usize, variables: &mut Vec<Variable>) -> Result<()> {
        let dwarf = self.dwarf;

        for child in dwarf.children(index) {
            let entry = dwarf.entry(child);
            match entry.tag {
                DW_TAG_local_variable | DW_TAG_global_variable => variables.push(self.parse_variable(entry)?),
                DW_TAG_lexical_block => self.parse_block(child, variables)?,
                _ => {}
            }
        }

        Ok(())
    }

    /// The class a subroutine belongs to. A leading `this` parameter of class
    /// type decides it and is dropped; otherwise the mangled name is tried.
    fn parse_owner(&self, signature: &mut FunctionType, mangled_name: &str) -> Option<UserTypeId> {
        let this = signature
            .parameters
            .first()
            .filter(|parameter| parameter.name.as_deref() == Some("this"))
            .and_then(|parameter| parameter.ty.user_type())
            .filter(|&id| self.file[id].kind.class().is_some());

        if let Some(owner) = this {
            signature.parameters.remove(0);
            return Some(owner);
        }

        mangled_class_name(mangled_name).and_then(|name| self.file.find_class(name))
    }
}
