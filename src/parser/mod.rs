mod members;
mod shared;
mod subprogram;
mod types;

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::cpp::*;
use crate::dwarf::constants::*;
use crate::dwarf::{Attribute, AttributeValue, Dwarf, Entry};
use crate::elf::Reader;
use crate::error::{Error, Result};

use self::shared::*;

/// Lifts one compile unit into its file model.
struct Parser<'file, 'data> {
    dwarf: &'file Dwarf<'data>,
    file: &'file mut File,
    /// Entry index to the user type allocated for it.
    user_types: HashMap<usize, UserTypeId>,
}

/// Lift every compile unit of `dwarf`. A compile unit that fails keeps
/// whatever was lifted before the failure.
pub fn parse(dwarf: &Dwarf) -> Files {
    let mut files = Files::default();

    for index in dwarf.siblings(0) {
        let entry = dwarf.entry(index);
        if entry.tag != DW_TAG_compile_unit {
            continue;
        }

        let filename = entry.name().unwrap_or_default();
        if let Some(language) = entry.attr(DW_AT_language).and_then(Attribute::udata) {
            debug!(file = %filename, language = %DwLang(language as u32), "compile unit");
        }
        let mut parser = Parser::new(dwarf, files.get_or_insert(&filename));
        let first = parser.file.user_types.len();

        if let Err(err) = parser.parse_unit(index) {
            warn!(offset = entry.offset, file = %filename, "aborted compile unit: {}", err);
        }
        parser.disambiguate(first);
    }

    files
}

impl<'file, 'data> Parser<'file, 'data> {
    fn new(dwarf: &'file Dwarf<'data>, file: &'file mut File) -> Parser<'file, 'data> {
        Parser {
            dwarf: dwarf,
            file: file,
            user_types: HashMap::new(),
        }
    }

    fn parse_unit(&mut self, unit: usize) -> Result<()> {
        let dwarf = self.dwarf;
        self.preallocate(unit);

        // user types first so that owner lookups by name see filled types
        for child in dwarf.children(unit) {
            let id = match self.user_types.get(&child) {
                Some(&id) => id,
                None => continue,
            };
            match self.parse_user_type(child, id) {
                Ok(()) => self.file.list(id),
                Err(err) => warn!(offset = dwarf.entry(child).offset, "dropping user type: {}", err),
            }
        }

        for child in dwarf.children(unit) {
            let entry = dwarf.entry(child);
            match entry.tag {
                DW_TAG_global_variable | DW_TAG_local_variable => {
                    let variable = self.parse_variable(entry)?;
                    self.file.variables.push(variable);
                }
                DW_TAG_global_subroutine | DW_TAG_subroutine | DW_TAG_inlined_subroutine => {
                    self.parse_subprogram(child)?;
                }
                _ => {}
            }
        }

        debug!(
            file = %self.file.filename,
            types = self.file.user_types.len(),
            variables = self.file.variables.len(),
            functions = self.file.functions.len(),
            "lifted compile unit"
        );
        Ok(())
    }

    /// Give every user type listed since `first` a unique, non-empty name.
    /// Empty names become `type`, and every name that is empty or shared
    /// gets the lowest `_N` suffix in list order that no other type of the
    /// unit is already called.
    fn disambiguate(&mut self, first: usize) {
        let mut groups: Vec<(String, Vec<UserTypeId>)> = Vec::new();
        for &id in &self.file.user_types[first..] {
            let name = &self.file[id].name;
            match groups.iter_mut().find(|(group, _)| group == name) {
                Some((_, ids)) => ids.push(id),
                None => groups.push((name.clone(), vec![id])),
            }
        }

        let is_unique = |name: &str, ids: &[UserTypeId]| !name.is_empty() && ids.len() == 1;
        let mut taken: HashSet<String> = groups
            .iter()
            .filter(|(name, ids)| is_unique(name, ids))
            .map(|(name, _)| name.clone())
            .collect();

        for (name, ids) in groups {
            if is_unique(&name, &ids) {
                continue;
            }
            let base = if name.is_empty() { "type" } else { name.as_str() };
            let mut suffix = 0usize;
            for id in ids {
                let unique = loop {
                    let candidate = format!("{}_{}", base, suffix);
                    suffix += 1;
                    if taken.insert(candidate.clone()) {
                        break candidate;
                    }
                };
                self.file[id].name = unique;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimli::{EndianSlice, RunTimeEndian};

    fn named(file: &mut File, name: &str) -> UserTypeId {
        let id = file.add_type(UserType {
            name: name.to_string(),
            kind: UserTypeKind::Struct(ClassType::default()),
        });
        file.list(id);
        id
    }

    #[test]
    fn disambiguates_empty_and_shared_names() {
        let dwarf = Dwarf::parse(EndianSlice::new(&[], RunTimeEndian::Little), None).unwrap();
        let mut file = File::new("a.cpp");
        let a = named(&mut file, "Foo");
        let b = named(&mut file, "");
        let c = named(&mut file, "Foo");
        let d = named(&mut file, "Bar");

        Parser::new(&dwarf, &mut file).disambiguate(0);

        assert_eq!(file[a].name, "Foo_0");
        assert_eq!(file[b].name, "type_0");
        assert_eq!(file[c].name, "Foo_1");
        assert_eq!(file[d].name, "Bar");
    }

    #[test]
    fn suffixes_skip_names_in_use() {
        let dwarf = Dwarf::parse(EndianSlice::new(&[], RunTimeEndian::Little), None).unwrap();
        let mut file = File::new("a.cpp");
        let a = named(&mut file, "Foo");
        let b = named(&mut file, "Foo_0");
        let c = named(&mut file, "Foo");
        let d = named(&mut file, "type_1");
        let e = named(&mut file, "");
        let f = named(&mut file, "");

        Parser::new(&dwarf, &mut file).disambiguate(0);

        assert_eq!(file[a].name, "Foo_1");
        assert_eq!(file[b].name, "Foo_0");
        assert_eq!(file[c].name, "Foo_2");
        assert_eq!(file[d].name, "type_1");
        assert_eq!(file[e].name, "type_0");
        assert_eq!(file[f].name, "type_2");

        let names: HashSet<_> = file.listed().map(|(_, user_type)| user_type.name.clone()).collect();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn disambiguates_only_the_new_unit() {
        let dwarf = Dwarf::parse(EndianSlice::new(&[], RunTimeEndian::Little), None).unwrap();
        let mut file = File::new("a.cpp");
        let old = named(&mut file, "");
        let new = named(&mut file, "");

        Parser::new(&dwarf, &mut file).disambiguate(1);

        assert_eq!(file[old].name, "");
        assert_eq!(file[new].name, "type_0");
    }
}
