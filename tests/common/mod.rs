//! Builders for synthetic ELF32 images carrying DWARF v1 sections.

#![allow(dead_code)]

use std::collections::HashMap;

use dwarf1cpp::dwarf::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, out: &mut Vec<u8>, value: u16) {
        match self {
            Endian::Little => out.extend_from_slice(&value.to_le_bytes()),
            Endian::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn u32(self, out: &mut Vec<u8>, value: u32) {
        match self {
            Endian::Little => out.extend_from_slice(&value.to_le_bytes()),
            Endian::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn patch_u32(self, out: &mut [u8], at: usize, value: u32) {
        let bytes = match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        out[at..at + 4].copy_from_slice(&bytes);
    }
}

/// An attribute value. References name a node label.
#[derive(Debug, Clone)]
pub enum Value {
    Addr(u32),
    Data2(u16),
    Data4(u32),
    Str(String),
    Ref(&'static str),
    /// A raw block; the length width follows the attribute form.
    Block(Vec<u8>),
    /// Signed values of the given width, each followed by a name.
    Elements(usize, Vec<(i64, &'static str)>),
    /// `DW_OP_const <offset>`.
    Location(u32),
    ModFund(Vec<DwMod>, DwFt),
    ModUser(Vec<DwMod>, &'static str),
    /// `(index type, lower, upper)` dimensions, then the element type.
    Subscripts(Vec<(DwFt, u32, u32)>, Box<(DwAt, Value)>),
}

#[derive(Debug, Clone)]
pub struct Node {
    tag: DwTag,
    label: Option<&'static str>,
    attributes: Vec<(DwAt, Value)>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(tag: DwTag) -> Node {
        Node {
            tag: tag,
            label: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn label(mut self, label: &'static str) -> Node {
        self.label = Some(label);
        self
    }

    pub fn attr(mut self, name: DwAt, value: Value) -> Node {
        self.attributes.push((name, value));
        self
    }

    pub fn name(self, name: &str) -> Node {
        self.attr(DW_AT_name, Value::Str(name.to_string()))
    }

    pub fn fund(self, ft: DwFt) -> Node {
        self.attr(DW_AT_fund_type, Value::Data2(ft.0))
    }

    pub fn user(self, label: &'static str) -> Node {
        self.attr(DW_AT_user_def_type, Value::Ref(label))
    }

    pub fn byte_size(self, size: u32) -> Node {
        self.attr(DW_AT_byte_size, Value::Data4(size))
    }

    pub fn location(self, offset: u32) -> Node {
        self.attr(DW_AT_location, Value::Location(offset))
    }

    pub fn child(mut self, child: Node) -> Node {
        self.children.push(child);
        self
    }
}

pub fn compile_unit(name: &str) -> Node {
    Node::new(DW_TAG_compile_unit).name(name)
}

pub fn member(name: &str, ft: DwFt, offset: u32) -> Node {
    Node::new(DW_TAG_member).name(name).fund(ft).location(offset)
}

pub fn parameter(name: &str, ft: DwFt) -> Node {
    Node::new(DW_TAG_formal_parameter).name(name).fund(ft)
}

/// Encodes a forest of nodes as a `.debug` section. Every node gets a
/// `DW_AT_sibling` pointing past its subtree, and children are followed by
/// a null entry.
pub struct DebugBuilder {
    endian: Endian,
    labels: HashMap<&'static str, u32>,
}

impl DebugBuilder {
    pub fn new(endian: Endian) -> DebugBuilder {
        DebugBuilder {
            endian: endian,
            labels: HashMap::new(),
        }
    }

    pub fn build(mut self, nodes: &[Node]) -> Vec<u8> {
        // the first pass only collects label offsets; sizes never depend on them
        let mut out = Vec::new();
        for node in nodes {
            self.node(node, &mut out);
        }

        let mut out = Vec::new();
        for node in nodes {
            self.node(node, &mut out);
        }
        out
    }

    fn node(&mut self, node: &Node, out: &mut Vec<u8>) {
        let start = out.len();
        if let Some(label) = node.label {
            self.labels.insert(label, start as u32);
        }

        self.endian.u32(out, 0);
        self.endian.u16(out, node.tag.0);
        self.endian.u16(out, DW_AT_sibling.0);
        let sibling = out.len();
        self.endian.u32(out, 0);
        for (name, value) in &node.attributes {
            self.endian.u16(out, name.0);
            self.value(*name, value, out);
        }
        let length = (out.len() - start) as u32;
        self.endian.patch_u32(out, start, length);

        if !node.children.is_empty() {
            for child in &node.children {
                self.node(child, out);
            }
            self.endian.u32(out, 4);
        }

        let end = out.len() as u32;
        self.endian.patch_u32(out, sibling, end);
    }

    fn reference(&self, label: &str) -> u32 {
        self.labels.get(label).copied().unwrap_or(0)
    }

    fn value(&self, name: DwAt, value: &Value, out: &mut Vec<u8>) {
        let endian = self.endian;
        match *value {
            Value::Addr(value) | Value::Data4(value) => endian.u32(out, value),
            Value::Data2(value) => endian.u16(out, value),
            Value::Str(ref string) => {
                out.extend_from_slice(string.as_bytes());
                out.push(0);
            }
            Value::Ref(label) => endian.u32(out, self.reference(label)),
            _ => {
                let block = self.block(value);
                if name.form() == DW_FORM_block4 {
                    endian.u32(out, block.len() as u32);
                } else {
                    endian.u16(out, block.len() as u16);
                }
                out.extend(block);
            }
        }
    }

    fn block(&self, value: &Value) -> Vec<u8> {
        let endian = self.endian;
        let mut block = Vec::new();
        match *value {
            Value::Block(ref bytes) => block.extend_from_slice(bytes),
            Value::Elements(width, ref elements) => {
                for &(value, name) in elements {
                    match endian {
                        Endian::Little => block.extend_from_slice(&value.to_le_bytes()[..width]),
                        Endian::Big => block.extend_from_slice(&value.to_be_bytes()[8 - width..]),
                    }
                    block.extend_from_slice(name.as_bytes());
                    block.push(0);
                }
            }
            Value::Location(offset) => {
                block.push(DW_OP_const.0);
                endian.u32(&mut block, offset);
            }
            Value::ModFund(ref modifiers, ft) => {
                block.extend(modifiers.iter().map(|m| m.0));
                endian.u16(&mut block, ft.0);
            }
            Value::ModUser(ref modifiers, label) => {
                block.extend(modifiers.iter().map(|m| m.0));
                endian.u32(&mut block, self.reference(label));
            }
            Value::Subscripts(ref dimensions, ref element) => {
                for &(ft, lower, upper) in dimensions {
                    block.push(DW_FMT_FT_C_C.0);
                    endian.u16(&mut block, ft.0);
                    endian.u32(&mut block, lower);
                    endian.u32(&mut block, upper);
                }
                block.push(DW_FMT_ET.0);
                endian.u16(&mut block, element.0 .0);
                self.value(element.0, &element.1, &mut block);
            }
            _ => unreachable!("not a block value"),
        }
        block
    }
}

/// One `.line` chunk: `(line, character, pc offset)` rows for the function
/// at `address`, with a terminator appended.
pub fn line_chunk(endian: Endian, address: u32, rows: &[(u32, u16, u32)], end: u32) -> Vec<u8> {
    let mut out = Vec::new();
    endian.u32(&mut out, 8 + 10 * (rows.len() as u32 + 1));
    endian.u32(&mut out, address);
    for &(line, character, pc) in rows.iter().chain(std::iter::once(&(0, 0, end))) {
        endian.u32(&mut out, line);
        endian.u16(&mut out, character);
        endian.u32(&mut out, pc);
    }
    out
}

/// A minimal ELF32 executable holding `sections` and a section name table.
pub fn elf(endian: Endian, sections: &[(&str, Vec<u8>)]) -> Vec<u8> {
    const EHSIZE: usize = 52;
    const SHENTSIZE: usize = 40;

    let mut out = vec![0x7f, b'E', b'L', b'F', 1];
    out.push(match endian {
        Endian::Little => 1,
        Endian::Big => 2,
    });
    out.push(1);
    out.resize(16, 0);

    let mut names = vec![0u8];
    let mut name_offsets = Vec::new();
    for (name, _) in sections {
        name_offsets.push(names.len() as u32);
        names.extend_from_slice(name.as_bytes());
        names.push(0);
    }
    let shstrtab_name = names.len() as u32;
    names.extend_from_slice(b".shstrtab\0");

    // data follows the header, then the name table, then the headers
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (_, bytes) in sections {
        offsets.push((EHSIZE + data.len()) as u32);
        data.extend_from_slice(bytes);
    }
    let shstrtab_offset = (EHSIZE + data.len()) as u32;
    data.extend_from_slice(&names);
    while (EHSIZE + data.len()) % 4 != 0 {
        data.push(0);
    }
    let shoff = (EHSIZE + data.len()) as u32;
    let shnum = sections.len() as u16 + 2;

    endian.u16(&mut out, 2); // e_type: executable
    endian.u16(&mut out, 20); // e_machine: PowerPC
    endian.u32(&mut out, 1); // e_version
    endian.u32(&mut out, 0); // e_entry
    endian.u32(&mut out, 0); // e_phoff
    endian.u32(&mut out, shoff);
    endian.u32(&mut out, 0); // e_flags
    endian.u16(&mut out, EHSIZE as u16);
    endian.u16(&mut out, 0); // e_phentsize
    endian.u16(&mut out, 0); // e_phnum
    endian.u16(&mut out, SHENTSIZE as u16);
    endian.u16(&mut out, shnum);
    endian.u16(&mut out, shnum - 1); // e_shstrndx
    assert_eq!(out.len(), EHSIZE);

    out.extend_from_slice(&data);

    let header = |out: &mut Vec<u8>, name: u32, kind: u32, offset: u32, size: u32| {
        for value in [name, kind, 0, 0, offset, size, 0, 0, 1, 0] {
            endian.u32(out, value);
        }
    };
    header(&mut out, 0, 0, 0, 0);
    for (i, (_, bytes)) in sections.iter().enumerate() {
        header(&mut out, name_offsets[i], 1, offsets[i], bytes.len() as u32);
    }
    header(&mut out, shstrtab_name, 3, shstrtab_offset, names.len() as u32);

    out
}

/// `.debug` and `.line` sections wrapped in an ELF image.
pub fn image(endian: Endian, nodes: &[Node], line: Option<Vec<u8>>) -> Vec<u8> {
    let mut sections = vec![(".debug", DebugBuilder::new(endian).build(nodes))];
    if let Some(line) = line {
        sections.push((".line", line));
    }
    elf(endian, &sections)
}
