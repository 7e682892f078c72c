//! Rendering of a lifted [`File`] as C++ source text.

use std::fmt::{self, Write};

use crate::cpp::*;

/// Output switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Class sizes, member offsets and `GLOBAL`/`LOCAL` markers as comments.
    pub comments: bool,
    /// Stop after the user type definitions.
    pub types_only: bool,
}

/// Displays a file as declarations. Printing does not modify the model, so
/// the same file always renders to the same text.
pub struct Printer<'a> {
    file: &'a File,
    options: PrintOptions,
}

impl File {
    pub fn display(&self, options: PrintOptions) -> Printer<'_> {
        Printer::new(self, options)
    }
}

fn hex(value: i64) -> String {
    if value < 0 {
        format!("-0x{:x}", value.unsigned_abs())
    } else {
        format!("0x{:x}", value)
    }
}

fn qualifier(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Const => "const",
        Modifier::Volatile => "volatile",
        Modifier::PointerTo => "*",
        Modifier::ReferenceTo => "&",
    }
}

/// Split `modifiers` (outermost first) into the qualifiers of the base type
/// itself, in source order, and the `*`/`&` suffix with the qualifiers that
/// follow each indirection.
fn split_modifiers(modifiers: &[Modifier]) -> (Vec<Modifier>, String) {
    let mut qualifiers = Vec::new();
    let mut suffix = String::new();

    // innermost first
    for &modifier in modifiers.iter().rev() {
        if modifier.is_indirection() {
            suffix.push_str(qualifier(modifier));
        } else if suffix.is_empty() {
            qualifiers.push(modifier);
        } else {
            suffix.push(' ');
            suffix.push_str(qualifier(modifier));
        }
    }

    qualifiers.reverse();
    (qualifiers, suffix)
}

/// `name` behind an indirection suffix such as `*` or `* const`.
fn pointer_declarator(indirection: &str, name: &str) -> String {
    if name.is_empty() || indirection.is_empty() || indirection.ends_with(['*', '&']) {
        format!("{}{}", indirection, name)
    } else {
        format!("{} {}", indirection, name)
    }
}

impl<'a> Printer<'a> {
    pub fn new(file: &'a File, options: PrintOptions) -> Printer<'a> {
        Printer {
            file: file,
            options: options,
        }
    }

    /// `ty` without a declarator. Qualifiers written before the first
    /// indirection lead, later ones trail the `*` or `&` they apply to.
    pub fn type_name(&self, ty: &Type) -> String {
        let base = match ty.base {
            BaseType::Fundamental(kind) => kind.name(),
            BaseType::User(id) => self.file[id].name.clone(),
        };

        let (qualifiers, suffix) = split_modifiers(&ty.modifiers);
        let mut words: Vec<&str> = qualifiers.iter().map(|&q| qualifier(q)).collect();
        words.push(&base);
        words.join(" ") + &suffix
    }

    /// `ty` declaring `name`, which may be empty for unnamed parameters.
    pub fn declaration(&self, ty: &Type, name: &str) -> String {
        self.declaration_at(ty, name, 0)
    }

    fn declaration_at(&self, ty: &Type, name: &str, depth: usize) -> String {
        if let (BaseType::User(id), true) = (ty.base, depth <= MAX_TYPE_DEPTH) {
            let (qualifiers, indirection) = split_modifiers(&ty.modifiers);
            match self.file[id].kind {
                UserTypeKind::Array(ref array) => {
                    let mut declarator = if indirection.is_empty() {
                        name.to_string()
                    } else {
                        format!("({})", pointer_declarator(&indirection, name))
                    };
                    for dimension in &array.dimensions {
                        let _ = write!(declarator, "[{}]", dimension);
                    }

                    // a qualified array is an array of qualified elements
                    let element = Type {
                        base: array.element.base,
                        modifiers: qualifiers.into_iter().chain(array.element.modifiers.iter().copied()).collect(),
                    };
                    return self.declaration_at(&element, &declarator, depth + 1);
                }
                UserTypeKind::Function(ref function) => {
                    return format!(
                        "{} (*{}){}",
                        self.type_name(&function.return_type),
                        pointer_declarator(&indirection, name),
                        self.parameters(function, depth + 1)
                    );
                }
                _ => {}
            }
        }

        let ty = self.type_name(ty);
        if name.is_empty() {
            ty
        } else {
            format!("{} {}", ty, name)
        }
    }

    fn parameters(&self, function: &FunctionType, depth: usize) -> String {
        let mut parameters: Vec<String> = function
            .parameters
            .iter()
            .map(|parameter| {
                let name = parameter.name.as_deref().unwrap_or("");
                self.declaration_at(&parameter.ty, name, depth)
            })
            .collect();
        if function.variadic {
            parameters.push("...".to_string());
        }
        format!("({})", parameters.join(", "))
    }

    /// `qualified` prefixes member functions with their class.
    fn signature(&self, function: &Function, qualified: bool) -> String {
        let name = match function.owner {
            Some(owner) if qualified => format!("{}::{}", self.file[owner].name, function.name),
            _ => function.name.clone(),
        };
        format!(
            "{} {}{}",
            self.type_name(&function.signature.return_type),
            name,
            self.parameters(&function.signature, 0)
        )
    }

    fn scope_comment(&self, f: &mut fmt::Formatter, is_global: bool) -> fmt::Result {
        if self.options.comments {
            f.write_str(if is_global { "/* GLOBAL */ " } else { "/* LOCAL */ " })?;
        }
        Ok(())
    }

    fn member(&self, member: &Member) -> String {
        let mut line = String::new();
        if self.options.comments {
            let _ = write!(line, "/* 0x{:x} */ ", member.offset);
        }
        line += &self.declaration(&member.ty, &member.name);
        if let Some(bits) = member.bit_size {
            let _ = write!(line, " : {}", bits);
        }
        line
    }

    fn write_class(&self, f: &mut fmt::Formatter, user_type: &UserType, class: &ClassType) -> fmt::Result {
        let keyword = user_type.kind.keyword().unwrap_or("struct");
        write!(f, "{} {}", keyword, user_type.name)?;
        for (i, inheritance) in class.inheritances.iter().enumerate() {
            f.write_str(if i == 0 { " : " } else { ", " })?;
            f.write_str(&self.type_name(&inheritance.ty))?;
        }
        if self.options.comments {
            write!(f, " /* 0x{:x} */", class.size)?;
        }
        f.write_str("\n{\n")?;

        // members sharing an offset overlap; a union has nothing else
        let overlaps = !matches!(user_type.kind, UserTypeKind::Union(_));
        let members = &class.members;
        let mut start = 0;
        while start < members.len() {
            let offset = members[start].offset;
            let run = members[start..].iter().take_while(|m| m.offset == offset).count();
            let group = &members[start..start + run];

            if overlaps && run > 1 {
                let keyword = if group.iter().any(|m| m.bit_size.is_some()) {
                    "struct"
                } else {
                    "union"
                };
                write!(f, "\t{}\n\t{{\n", keyword)?;
                for member in group {
                    writeln!(f, "\t\t{};", self.member(member))?;
                }
                f.write_str("\t};\n")?;
            } else {
                for member in group {
                    writeln!(f, "\t{};", self.member(member))?;
                }
            }
            start += run;
        }

        for &function in &class.functions {
            writeln!(f, "\t{};", self.signature(self.file.function(function), false))?;
        }

        f.write_str("};")
    }

    fn write_enum(&self, f: &mut fmt::Formatter, name: &str, enumeration: &EnumType) -> fmt::Result {
        write!(f, "enum {} : {}\n{{\n", name, enumeration.base.name())?;

        let mut last: i64 = -1;
        for (i, element) in enumeration.elements.iter().enumerate() {
            write!(f, "\t{}", element.name)?;
            if last.checked_add(1) != Some(element.value) {
                write!(f, " = {}", hex(element.value))?;
            }
            if i + 1 != enumeration.elements.len() {
                f.write_str(",")?;
            }
            f.write_str("\n")?;
            last = element.value;
        }

        f.write_str("};")
    }

    fn write_definition(&self, f: &mut fmt::Formatter, function: &Function) -> fmt::Result {
        if !function.mangled_name.is_empty() {
            writeln!(f, "// {}", function.mangled_name)?;
        }
        writeln!(f, "// Start address: 0x{:x}", function.start_address)?;
        writeln!(f, "{}", self.signature(function, true))?;
        f.write_str("{\n")?;

        for variable in &function.variables {
            writeln!(f, "\t{};", self.declaration(&variable.ty, &variable.name))?;
        }
        for line in function.lines.iter().filter(|line| !line.is_end()) {
            writeln!(
                f,
                "\t// Line {}, Character {}, Address: 0x{:x}, Func Offset: 0x{:x}",
                line.line,
                line.character,
                line.address(),
                line.pc_offset
            )?;
        }

        f.write_str("}")
    }
}

impl<'a> fmt::Display for Printer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let file = self.file;

        for (_, user_type) in file.listed() {
            if let Some(keyword) = user_type.kind.keyword() {
                writeln!(f, "typedef {} {};", keyword, user_type.name)?;
            }
        }
        f.write_str("\n")?;

        for (id, user_type) in file.listed() {
            if let UserTypeKind::Function(_) = user_type.kind {
                writeln!(f, "typedef {};", self.declaration(&Type::user(id), &user_type.name))?;
            }
        }
        f.write_str("\n")?;

        for (id, user_type) in file.listed() {
            if let UserTypeKind::Array(_) = user_type.kind {
                writeln!(f, "typedef {};", self.declaration(&Type::user(id), &user_type.name))?;
            }
        }
        f.write_str("\n")?;

        for (_, user_type) in file.listed() {
            match user_type.kind {
                UserTypeKind::Class(ref class)
                | UserTypeKind::Struct(ref class)
                | UserTypeKind::Union(ref class) => self.write_class(f, user_type, class)?,
                UserTypeKind::Enum(ref enumeration) => self.write_enum(f, &user_type.name, enumeration)?,
                UserTypeKind::Array(_) | UserTypeKind::Function(_) => continue,
            }
            f.write_str("\n\n")?;
        }

        if self.options.types_only {
            return Ok(());
        }

        for variable in &file.variables {
            self.scope_comment(f, variable.is_global)?;
            writeln!(f, "{};", self.declaration(&variable.ty, &variable.name))?;
        }
        f.write_str("\n")?;

        // member functions are declared inside their class
        for function in file.functions.iter().filter(|function| function.owner.is_none()) {
            self.scope_comment(f, function.is_global)?;
            writeln!(f, "{};", self.signature(function, false))?;
        }
        f.write_str("\n")?;

        for function in &file.functions {
            self.write_definition(f, function)?;
            f.write_str("\n\n")?;
        }

        Ok(())
    }
}
