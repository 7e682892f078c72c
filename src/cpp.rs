//! The C++-like program model the lifter produces and the printer consumes.
//!
//! User types live in a per-file arena and refer to each other through
//! [`UserTypeId`], so a class can hold a member whose type is the class
//! itself without any ownership cycle.

use std::ops::{Index, IndexMut};
use std::path::{Component, Path, PathBuf};

use crate::dwarf::constants::*;
use crate::dwarf::LineEntry;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fundamental {
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    SignedShort,
    UnsignedShort,
    Int,
    SignedInt,
    UnsignedInt,
    Long,
    SignedLong,
    UnsignedLong,
    Float,
    Double,
    LongDouble,
    Void,
    Bool,
    LongLong,
    SignedLongLong,
    UnsignedLongLong,
    /// A code this producer is not known to emit.
    Unknown(u16),
}

impl From<DwFt> for Fundamental {
    fn from(ft: DwFt) -> Fundamental {
        match ft {
            DW_FT_char => Fundamental::Char,
            DW_FT_signed_char => Fundamental::SignedChar,
            DW_FT_unsigned_char => Fundamental::UnsignedChar,
            DW_FT_short => Fundamental::Short,
            DW_FT_signed_short => Fundamental::SignedShort,
            DW_FT_unsigned_short => Fundamental::UnsignedShort,
            DW_FT_integer => Fundamental::Int,
            DW_FT_signed_integer => Fundamental::SignedInt,
            DW_FT_unsigned_integer => Fundamental::UnsignedInt,
            DW_FT_long => Fundamental::Long,
            DW_FT_signed_long => Fundamental::SignedLong,
            DW_FT_unsigned_long => Fundamental::UnsignedLong,
            DW_FT_float => Fundamental::Float,
            DW_FT_dbl_prec_float => Fundamental::Double,
            DW_FT_ext_prec_float => Fundamental::LongDouble,
            DW_FT_void => Fundamental::Void,
            DW_FT_boolean => Fundamental::Bool,
            DW_FT_long_long => Fundamental::LongLong,
            DW_FT_signed_long_long => Fundamental::SignedLongLong,
            DW_FT_unsigned_long_long => Fundamental::UnsignedLongLong,
            DwFt(code) => Fundamental::Unknown(code),
        }
    }
}

impl Fundamental {
    /// The canonical C spelling. Explicitly signed kinds collapse onto the
    /// plain ones.
    pub fn name(self) -> String {
        let name = match self {
            Fundamental::Char | Fundamental::SignedChar => "char",
            Fundamental::UnsignedChar => "unsigned char",
            Fundamental::Short | Fundamental::SignedShort => "short",
            Fundamental::UnsignedShort => "unsigned short",
            Fundamental::Int | Fundamental::SignedInt => "int",
            Fundamental::UnsignedInt => "unsigned int",
            Fundamental::Long | Fundamental::SignedLong => "long",
            Fundamental::UnsignedLong => "unsigned long",
            Fundamental::Float => "float",
            Fundamental::Double => "double",
            Fundamental::LongDouble => "long double",
            Fundamental::Void => "void",
            Fundamental::Bool => "bool",
            Fundamental::LongLong | Fundamental::SignedLongLong => "long long",
            Fundamental::UnsignedLongLong => "unsigned long long",
            Fundamental::Unknown(code) => return format!("<unknown type (0x{:x})>", code),
        };
        name.to_string()
    }

    /// Size in bytes on the target. `long` is 8 bytes and `void` 4 there.
    pub fn size(self) -> u32 {
        match self {
            Fundamental::Char
            | Fundamental::SignedChar
            | Fundamental::UnsignedChar
            | Fundamental::Bool => 1,
            Fundamental::Short | Fundamental::SignedShort | Fundamental::UnsignedShort => 2,
            Fundamental::Int
            | Fundamental::SignedInt
            | Fundamental::UnsignedInt
            | Fundamental::Float
            | Fundamental::Void => 4,
            Fundamental::Long
            | Fundamental::SignedLong
            | Fundamental::UnsignedLong
            | Fundamental::Double
            | Fundamental::LongDouble
            | Fundamental::LongLong
            | Fundamental::SignedLongLong
            | Fundamental::UnsignedLongLong => 8,
            Fundamental::Unknown(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Const,
    Volatile,
    PointerTo,
    ReferenceTo,
}

impl Modifier {
    /// Decode a modifier byte of the type attribute starting at `offset`.
    pub fn parse(code: DwMod, offset: usize) -> Result<Modifier> {
        match code {
            DW_MOD_pointer_to => Ok(Modifier::PointerTo),
            DW_MOD_reference_to => Ok(Modifier::ReferenceTo),
            DW_MOD_const => Ok(Modifier::Const),
            DW_MOD_volatile => Ok(Modifier::Volatile),
            DwMod(modifier) => Err(Error::UnknownModifier { offset: offset, modifier: modifier }),
        }
    }

    pub fn is_indirection(self) -> bool {
        matches!(self, Modifier::PointerTo | Modifier::ReferenceTo)
    }
}

/// Index of a user type in its file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserTypeId(pub usize);

/// Index of a function in its file's function list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Fundamental(Fundamental),
    User(UserTypeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    /// Outermost first, as encoded in the type attribute.
    pub modifiers: Vec<Modifier>,
}

impl Type {
    pub fn fundamental(kind: Fundamental) -> Type {
        Type {
            base: BaseType::Fundamental(kind),
            modifiers: Vec::new(),
        }
    }

    pub fn user(id: UserTypeId) -> Type {
        Type {
            base: BaseType::User(id),
            modifiers: Vec::new(),
        }
    }

    pub fn user_type(&self) -> Option<UserTypeId> {
        match self.base {
            BaseType::User(id) => Some(id),
            BaseType::Fundamental(_) => None,
        }
    }
}

impl Default for Type {
    fn default() -> Type {
        Type::fundamental(Fundamental::Void)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Byte offset from the start of the enclosing type.
    pub offset: u32,
    pub name: String,
    pub ty: Type,
    pub bit_offset: Option<u32>,
    pub bit_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inheritance {
    pub offset: u32,
    pub ty: Type,
}

/// Body of a class, struct or union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassType {
    pub size: u32,
    pub members: Vec<Member>,
    pub inheritances: Vec<Inheritance>,
    pub functions: Vec<FunctionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub base: Fundamental,
    pub elements: Vec<Enumerator>,
}

impl Default for EnumType {
    fn default() -> EnumType {
        EnumType {
            base: Fundamental::Int,
            elements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayType {
    pub element: Type,
    /// Element count per dimension, outermost first.
    pub dimensions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
    pub ty: Type,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionType {
    pub return_type: Type,
    pub parameters: Vec<Parameter>,
    /// Trailing `...`.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserTypeKind {
    Class(ClassType),
    Struct(ClassType),
    Union(ClassType),
    Enum(EnumType),
    Array(ArrayType),
    Function(FunctionType),
}

impl UserTypeKind {
    pub fn class(&self) -> Option<&ClassType> {
        match *self {
            UserTypeKind::Class(ref class)
            | UserTypeKind::Struct(ref class)
            | UserTypeKind::Union(ref class) => Some(class),
            _ => None,
        }
    }

    pub fn class_mut(&mut self) -> Option<&mut ClassType> {
        match *self {
            UserTypeKind::Class(ref mut class)
            | UserTypeKind::Struct(ref mut class)
            | UserTypeKind::Union(ref mut class) => Some(class),
            _ => None,
        }
    }

    /// The keyword introducing a definition of this kind, if it has one.
    pub fn keyword(&self) -> Option<&'static str> {
        match *self {
            UserTypeKind::Class(_) => Some("class"),
            UserTypeKind::Struct(_) => Some("struct"),
            UserTypeKind::Union(_) => Some("union"),
            UserTypeKind::Enum(_) => Some("enum"),
            UserTypeKind::Array(_) | UserTypeKind::Function(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserType {
    pub name: String,
    pub kind: UserTypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub is_global: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub signature: FunctionType,
    pub is_global: bool,
    pub name: String,
    pub mangled_name: String,
    pub start_address: u32,
    /// Locals, including those of nested lexical blocks.
    pub variables: Vec<Variable>,
    pub owner: Option<UserTypeId>,
    /// Rows of `.line` for `start_address`, terminator included.
    pub lines: Vec<LineEntry>,
}

/// Everything lifted from the compile units that share one file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    pub filename: String,
    types: Vec<UserType>,
    /// Successfully lifted user types in source order.
    pub user_types: Vec<UserTypeId>,
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
}

impl File {
    pub fn new(filename: &str) -> File {
        File {
            filename: filename.to_string(),
            ..File::default()
        }
    }

    /// Reserve an arena slot. The type is not listed until `list` is called.
    pub fn add_type(&mut self, user_type: UserType) -> UserTypeId {
        self.types.push(user_type);
        UserTypeId(self.types.len() - 1)
    }

    pub fn list(&mut self, id: UserTypeId) {
        self.user_types.push(id);
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() - 1)
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    /// Listed user types paired with their ids.
    pub fn listed(&self) -> impl Iterator<Item = (UserTypeId, &UserType)> + '_ {
        self.user_types.iter().map(move |&id| (id, &self[id]))
    }

    /// The first listed class, struct or union called `name`.
    pub fn find_class(&self, name: &str) -> Option<UserTypeId> {
        self.listed()
            .find(|(_, user_type)| user_type.name == name && user_type.kind.class().is_some())
            .map(|(id, _)| id)
    }

    /// Size of `ty` in bytes. Indirections are 4 bytes wide.
    pub fn byte_size(&self, ty: &Type) -> u32 {
        self.byte_size_at(ty, 0)
    }

    fn byte_size_at(&self, ty: &Type, depth: usize) -> u32 {
        if ty.modifiers.iter().any(|m| m.is_indirection()) {
            return 4;
        }

        let id = match ty.base {
            BaseType::Fundamental(kind) => return kind.size(),
            BaseType::User(id) => id,
        };

        match self[id].kind {
            UserTypeKind::Class(ref class)
            | UserTypeKind::Struct(ref class)
            | UserTypeKind::Union(ref class) => class.size,
            UserTypeKind::Enum(ref enumeration) => enumeration.base.size(),
            UserTypeKind::Function(_) => 4,
            UserTypeKind::Array(ref array) => {
                if depth > MAX_TYPE_DEPTH {
                    return 0;
                }
                array
                    .dimensions
                    .iter()
                    .fold(self.byte_size_at(&array.element, depth + 1), |size, &count| {
                        size.saturating_mul(count)
                    })
            }
        }
    }

    /// Where this file goes below an output directory: backslashes become
    /// separators and any root or drive prefix is dropped.
    pub fn output_path(&self) -> PathBuf {
        let filename = self.filename.replace('\\', "/");
        let path: PathBuf = Path::new(&filename)
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .filter(|part| !part.to_string_lossy().ends_with(':'))
            .collect();

        if path.as_os_str().is_empty() {
            PathBuf::from("unnamed")
        } else {
            path
        }
    }
}

/// Bound on nested array and function type expansion, for malformed
/// self-referencing input.
pub(crate) const MAX_TYPE_DEPTH: usize = 16;

impl Index<UserTypeId> for File {
    type Output = UserType;

    fn index(&self, id: UserTypeId) -> &UserType {
        &self.types[id.0]
    }
}

impl IndexMut<UserTypeId> for File {
    fn index_mut(&mut self, id: UserTypeId) -> &mut UserType {
        &mut self.types[id.0]
    }
}

/// All output files, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files {
    pub files: Vec<File>,
}

impl Files {
    /// The file called `filename`, created if this is its first compile unit.
    pub fn get_or_insert(&mut self, filename: &str) -> &mut File {
        let index = match self.files.iter().position(|file| file.filename == filename) {
            Some(index) => index,
            None => {
                self.files.push(File::new(filename));
                self.files.len() - 1
            }
        };
        &mut self.files[index]
    }

    pub fn get(&self, filename: &str) -> Option<&File> {
        self.files.iter().find(|file| file.filename == filename)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, File> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<'a> IntoIterator for &'a Files {
    type Item = &'a File;
    type IntoIter = std::slice::Iter<'a, File>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
