// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory debug information attached to compiled object code.
//!
//! A [`DebugInfoBuilder`] is filled append-only by the front end and frozen
//! with [`DebugInfoBuilder::build`], which validates the tables and builds the
//! lookup indexes. The resulting [`DebugInfo`] has no mutating methods.
//!
//! Types live in a table of named definitions. Pointers, arrays and struct
//! fields refer to other types by name ([`TypeRef`]) and are resolved only when
//! queried, so a struct holding a pointer to itself is a plain table entry.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DebugInfoError, SymbolError};
use crate::section::DebugSection;

/// A position in a section of the owning object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DebugAddress {
    pub section: String,
    pub offset: u64,
}

impl DebugAddress {
    pub fn new(section: impl Into<String>, offset: u64) -> Self {
        Self {
            section: section.into(),
            offset,
        }
    }
}

impl fmt::Display for DebugAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+0x{:x}", self.section, self.offset)
    }
}

/// A source range as produced by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl SourceLocation {
    pub fn new(filename: impl Into<String>, line: u32, column: u32, length: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
            length,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugLocation {
    pub location: SourceLocation,
    pub address: DebugAddress,
}

impl DebugLocation {
    pub fn new(location: SourceLocation, address: DebugAddress) -> Self {
        Self { location, address }
    }
}

/// Reference to a named entry of the type table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseKind {
    SignedInt,
    UnsignedInt,
    Float,
    Bool,
    Char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: TypeRef,
    pub offset: u64,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>, offset: u64) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Base { encoding: BaseKind, size: u64 },
    Pointer { pointee: TypeRef },
    Array { element: TypeRef, length: u64 },
    Struct { fields: Vec<StructField>, size: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugType {
    pub name: String,
    #[serde(flatten)]
    pub kind: TypeKind,
}

impl DebugType {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.name.clone())
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        match &self.kind {
            TypeKind::Struct { fields, .. } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    fn references(&self) -> Vec<&TypeRef> {
        match &self.kind {
            TypeKind::Base { .. } => Vec::new(),
            TypeKind::Pointer { pointee } => vec![pointee],
            TypeKind::Array { element, .. } => vec![element],
            TypeKind::Struct { fields, .. } => fields.iter().map(|f| &f.ty).collect(),
        }
    }
}

/// Where a variable lives: at a fixed address, or at an offset from the frame base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    Global(DebugAddress),
    Frame(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugVariable {
    pub name: String,
    pub ty: TypeRef,
    pub storage: Storage,
}

impl DebugVariable {
    pub fn global(name: impl Into<String>, ty: impl Into<TypeRef>, address: DebugAddress) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            storage: Storage::Global(address),
        }
    }

    pub fn local(name: impl Into<String>, ty: impl Into<TypeRef>, frame_offset: i64) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            storage: Storage::Frame(frame_offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugFunction {
    pub name: String,
    pub begin: DebugAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub parameters: Vec<DebugVariable>,
    #[serde(default)]
    pub locals: Vec<DebugVariable>,
}

impl DebugFunction {
    pub fn new(name: impl Into<String>, begin: DebugAddress) -> Self {
        Self {
            name: name.into(),
            begin,
            return_type: None,
            parameters: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn returning(mut self, ty: impl Into<TypeRef>) -> Self {
        self.return_type = Some(ty.into());
        self
    }

    pub fn with_parameter(mut self, param: DebugVariable) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_local(mut self, local: DebugVariable) -> Self {
        self.locals.push(local);
        self
    }

    /// Locals first, then parameters.
    pub fn local_named(&self, name: &str) -> Option<&DebugVariable> {
        self.locals
            .iter()
            .chain(self.parameters.iter())
            .find(|v| v.name == name)
    }
}

/// Every kind of entry a compiled unit can contribute.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugEntry {
    Section(DebugSection),
    Location(DebugLocation),
    Function(DebugFunction),
    Variable(DebugVariable),
    Type(DebugType),
}

impl From<DebugSection> for DebugEntry {
    fn from(s: DebugSection) -> Self {
        DebugEntry::Section(s)
    }
}

impl From<DebugLocation> for DebugEntry {
    fn from(l: DebugLocation) -> Self {
        DebugEntry::Location(l)
    }
}

impl From<DebugFunction> for DebugEntry {
    fn from(f: DebugFunction) -> Self {
        DebugEntry::Function(f)
    }
}

impl From<DebugVariable> for DebugEntry {
    fn from(v: DebugVariable) -> Self {
        DebugEntry::Variable(v)
    }
}

impl From<DebugType> for DebugEntry {
    fn from(t: DebugType) -> Self {
        DebugEntry::Type(t)
    }
}

/// Lookup scope for [`DebugInfo::variable_named`].
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Global,
    Function(&'a DebugFunction),
}

pub const DEFAULT_ADDRESS_SIZE: u8 = 4;

/// The raw tables. This is exactly what the text form stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DebugTables {
    pub address_size: u8,
    #[serde(default)]
    pub sections: Vec<DebugSection>,
    #[serde(default)]
    pub types: Vec<DebugType>,
    #[serde(default)]
    pub locations: Vec<DebugLocation>,
    #[serde(default)]
    pub functions: Vec<DebugFunction>,
    #[serde(default)]
    pub variables: Vec<DebugVariable>,
}

impl DebugTables {
    fn new(address_size: u8) -> Self {
        Self {
            address_size,
            sections: Vec::new(),
            types: Vec::new(),
            locations: Vec::new(),
            functions: Vec::new(),
            variables: Vec::new(),
        }
    }
}

/// Append-only collector used while a unit is compiled.
#[derive(Debug, Clone)]
pub struct DebugInfoBuilder {
    tables: DebugTables,
}

impl Default for DebugInfoBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS_SIZE)
    }
}

impl DebugInfoBuilder {
    pub fn new(address_size: u8) -> Self {
        Self {
            tables: DebugTables::new(address_size),
        }
    }

    pub fn add(&mut self, entry: impl Into<DebugEntry>) -> &mut Self {
        match entry.into() {
            DebugEntry::Section(s) => self.tables.sections.push(s),
            DebugEntry::Location(l) => self.tables.locations.push(l),
            DebugEntry::Function(f) => self.tables.functions.push(f),
            DebugEntry::Variable(v) => self.tables.variables.push(v),
            DebugEntry::Type(t) => self.tables.types.push(t),
        }
        self
    }

    fn has_type(&self, name: &str) -> bool {
        self.tables.types.iter().any(|t| t.name == name)
    }

    fn intern_type(&mut self, name: String, kind: TypeKind) -> TypeRef {
        if !self.has_type(&name) {
            self.tables.types.push(DebugType::new(name.clone(), kind));
        }
        TypeRef::new(name)
    }

    /// Registers a scalar type unless one with that name exists already.
    pub fn base_type(&mut self, name: &str, encoding: BaseKind, size: u64) -> TypeRef {
        self.intern_type(name.to_string(), TypeKind::Base { encoding, size })
    }

    /// Pointer type named `<pointee>*`. The pointee may be defined later.
    pub fn pointer_to(&mut self, pointee: &TypeRef) -> TypeRef {
        self.intern_type(
            format!("{}*", pointee.name()),
            TypeKind::Pointer {
                pointee: pointee.clone(),
            },
        )
    }

    /// Array type named `<element>[<length>]`.
    pub fn array_of(&mut self, element: &TypeRef, length: u64) -> TypeRef {
        self.intern_type(
            format!("{}[{}]", element.name(), length),
            TypeKind::Array {
                element: element.clone(),
                length,
            },
        )
    }

    pub fn struct_type(&mut self, name: &str, fields: Vec<StructField>, size: u64) -> TypeRef {
        self.intern_type(name.to_string(), TypeKind::Struct { fields, size })
    }

    /// Freeze the tables. Every address must name a known section and every
    /// type reference must resolve.
    pub fn build(self) -> Result<DebugInfo, DebugInfoError> {
        DebugInfo::from_tables(self.tables)
    }
}

#[derive(Debug, Clone, Default)]
struct DebugIndex {
    sections: HashMap<String, usize>,
    types: HashMap<String, usize>,
    functions_by_entry: BTreeMap<DebugAddress, usize>,
    locations_by_address: BTreeMap<DebugAddress, usize>,
    globals: HashMap<String, usize>,
}

/// Frozen debug information for one unit or for a whole linked program.
#[derive(Debug, Clone)]
pub struct DebugInfo {
    tables: DebugTables,
    index: DebugIndex,
}

impl PartialEq for DebugInfo {
    fn eq(&self, other: &Self) -> bool {
        self.tables == other.tables
    }
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self {
            tables: DebugTables::new(DEFAULT_ADDRESS_SIZE),
            index: DebugIndex::default(),
        }
    }
}

impl DebugInfo {
    pub fn builder(address_size: u8) -> DebugInfoBuilder {
        DebugInfoBuilder::new(address_size)
    }

    pub(crate) fn tables(&self) -> &DebugTables {
        &self.tables
    }

    pub(crate) fn from_tables(tables: DebugTables) -> Result<Self, DebugInfoError> {
        let mut index = DebugIndex::default();

        for (i, s) in tables.sections.iter().enumerate() {
            if index.sections.insert(s.name.clone(), i).is_some() {
                return Err(DebugInfoError::DuplicateSection(s.name.clone()));
            }
            if !s.fits_address_space() {
                return Err(DebugInfoError::SectionOverflow(s.name.clone()));
            }
        }
        for (i, t) in tables.types.iter().enumerate() {
            if index.types.insert(t.name.clone(), i).is_some() {
                return Err(DebugInfoError::DuplicateType(t.name.clone()));
            }
        }

        let check_address = |addr: &DebugAddress| {
            if index.sections.contains_key(&addr.section) {
                Ok(())
            } else {
                Err(DebugInfoError::UnknownSection(addr.section.clone()))
            }
        };
        let check_type = |ty: &TypeRef| {
            if index.types.contains_key(ty.name()) {
                Ok(())
            } else {
                Err(DebugInfoError::UnknownType(ty.name().to_string()))
            }
        };

        for t in &tables.types {
            for r in t.references() {
                check_type(r)?;
            }
        }
        for loc in &tables.locations {
            check_address(&loc.address)?;
        }
        for var in &tables.variables {
            check_type(&var.ty)?;
            match &var.storage {
                Storage::Global(addr) => check_address(addr)?,
                Storage::Frame(_) => return Err(DebugInfoError::FrameRelativeGlobal(var.name.clone())),
            }
        }
        for func in &tables.functions {
            check_address(&func.begin)?;
            if let Some(ret) = &func.return_type {
                check_type(ret)?;
            }
            let mut seen = HashSet::new();
            for var in func.parameters.iter().chain(func.locals.iter()) {
                check_type(&var.ty)?;
                if !seen.insert(var.name.as_str()) {
                    return Err(DebugInfoError::DuplicateLocal {
                        function: func.name.clone(),
                        local: var.name.clone(),
                    });
                }
            }
        }

        for (i, func) in tables.functions.iter().enumerate() {
            index
                .functions_by_entry
                .entry(func.begin.clone())
                .or_insert(i);
        }
        for (i, loc) in tables.locations.iter().enumerate() {
            index
                .locations_by_address
                .entry(loc.address.clone())
                .or_insert(i);
        }
        for (i, var) in tables.variables.iter().enumerate() {
            index.globals.entry(var.name.clone()).or_insert(i);
        }

        Ok(Self { tables, index })
    }

    pub fn address_size(&self) -> u8 {
        self.tables.address_size
    }

    pub fn sections(&self) -> &[DebugSection] {
        &self.tables.sections
    }

    pub fn section(&self, name: &str) -> Option<&DebugSection> {
        self.index.sections.get(name).map(|&i| &self.tables.sections[i])
    }

    pub fn types(&self) -> &[DebugType] {
        &self.tables.types
    }

    pub fn locations(&self) -> &[DebugLocation] {
        &self.tables.locations
    }

    pub fn functions(&self) -> &[DebugFunction] {
        &self.tables.functions
    }

    pub fn variables(&self) -> &[DebugVariable] {
        &self.tables.variables
    }

    pub fn locations_in<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a DebugLocation> + 'a {
        self.tables
            .locations
            .iter()
            .filter(move |l| l.address.section == section)
    }

    /// The function with the greatest entry address at or below `address`,
    /// within the same section.
    pub fn function_containing(&self, address: &DebugAddress) -> Option<&DebugFunction> {
        let lower = DebugAddress::new(address.section.clone(), 0);
        self.index
            .functions_by_entry
            .range(lower..=address.clone())
            .next_back()
            .map(|(_, &i)| &self.tables.functions[i])
    }

    /// The location with the greatest address at or below `address`, within
    /// the same section.
    pub fn location_at(&self, address: &DebugAddress) -> Option<&DebugLocation> {
        let lower = DebugAddress::new(address.section.clone(), 0);
        self.index
            .locations_by_address
            .range(lower..=address.clone())
            .next_back()
            .map(|(_, &i)| &self.tables.locations[i])
    }

    pub fn function_named(&self, name: &str) -> Option<&DebugFunction> {
        self.tables.functions.iter().find(|f| f.name == name)
    }

    pub fn variable_named<'a>(&'a self, scope: Scope<'a>, name: &str) -> Option<&'a DebugVariable> {
        match scope {
            Scope::Global => self.index.globals.get(name).map(|&i| &self.tables.variables[i]),
            Scope::Function(func) => func.local_named(name),
        }
    }

    pub fn type_named(&self, ty: &TypeRef) -> Result<&DebugType, SymbolError> {
        self.index
            .types
            .get(ty.name())
            .map(|&i| &self.tables.types[i])
            .ok_or_else(|| SymbolError::UnknownType(ty.name().to_string()))
    }

    /// Byte size of a type. Pointers stop the walk, so only arrays recurse.
    pub fn size_of(&self, ty: &TypeRef) -> Result<u64, SymbolError> {
        let mut visiting = Vec::new();
        self.size_of_inner(ty, &mut visiting)
    }

    fn size_of_inner<'a>(&'a self, ty: &'a TypeRef, visiting: &mut Vec<&'a str>) -> Result<u64, SymbolError> {
        if visiting.contains(&ty.name()) {
            return Err(SymbolError::CyclicType(ty.name().to_string()));
        }
        let def = self.type_named(ty)?;
        match &def.kind {
            TypeKind::Base { size, .. } => Ok(*size),
            TypeKind::Pointer { .. } => Ok(u64::from(self.address_size())),
            TypeKind::Struct { size, .. } => Ok(*size),
            TypeKind::Array { element, length } => {
                visiting.push(ty.name());
                let elem = self.size_of_inner(element, visiting)?;
                visiting.pop();
                Ok(elem.saturating_mul(*length))
            }
        }
    }

    /// Load address of a debug address, given the section table.
    pub fn absolute_address(&self, address: &DebugAddress) -> Option<u64> {
        self.section(&address.section)
            .map(|s| s.address.wrapping_add(address.offset))
    }

    /// Map a load address back into the section that holds it.
    pub fn resolve_absolute(&self, address: u64) -> Option<DebugAddress> {
        self.tables
            .sections
            .iter()
            .find(|s| s.contains(address))
            .map(|s| DebugAddress::new(s.name.clone(), address - s.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DebugInfo {
        let mut b = DebugInfo::builder(4);
        b.add(DebugSection::new("code", 0x100, 0x40));
        b.add(DebugSection::new("data", 0x2000, 0x20));
        let int = b.base_type("int", BaseKind::SignedInt, 4);
        b.add(DebugVariable::global("Xa", int.clone(), DebugAddress::new("data", 0)));
        b.add(
            DebugFunction::new("sum", DebugAddress::new("code", 0))
                .returning(int.clone())
                .with_parameter(DebugVariable::local("a", int.clone(), 8))
                .with_local(DebugVariable::local("Xa", int.clone(), -4)),
        );
        b.add(DebugFunction::new("main", DebugAddress::new("code", 0x20)));
        b.add(DebugLocation::new(
            SourceLocation::new("main.c", 3, 1, 4),
            DebugAddress::new("code", 0x4),
        ));
        b.build().unwrap()
    }

    #[test]
    fn function_containing_picks_greatest_entry_below() {
        let info = sample();
        let at = |off| info.function_containing(&DebugAddress::new("code", off)).map(|f| f.name.as_str());
        assert_eq!(at(0), Some("sum"));
        assert_eq!(at(0x1f), Some("sum"));
        assert_eq!(at(0x20), Some("main"));
        assert_eq!(at(0x3f), Some("main"));
        assert!(info.function_containing(&DebugAddress::new("data", 4)).is_none());
    }

    #[test]
    fn variable_lookup_respects_scope() {
        let info = sample();
        let sum = info.function_named("sum").unwrap();
        let global = info.variable_named(Scope::Global, "Xa").unwrap();
        assert!(matches!(global.storage, Storage::Global(_)));
        let local = info.variable_named(Scope::Function(sum), "Xa").unwrap();
        assert_eq!(local.storage, Storage::Frame(-4));
        assert!(info.variable_named(Scope::Function(sum), "a").is_some());
        assert!(info.variable_named(Scope::Global, "a").is_none());
    }

    #[test]
    fn self_referential_struct_resolves_lazily() {
        let mut b = DebugInfo::builder(4);
        let int = b.base_type("int", BaseKind::SignedInt, 4);
        let node = TypeRef::new("node_t");
        let node_ptr = b.pointer_to(&node);
        b.struct_type(
            "node_t",
            vec![
                StructField::new("payload", int, 0),
                StructField::new("next", node_ptr.clone(), 4),
            ],
            8,
        );
        let info = b.build().unwrap();
        let def = info.type_named(&node).unwrap();
        let next = def.field("next").unwrap();
        let ptr = info.type_named(&next.ty).unwrap();
        assert_eq!(ptr.kind, TypeKind::Pointer { pointee: node.clone() });
        assert_eq!(info.size_of(&node_ptr).unwrap(), 4);
        assert_eq!(info.size_of(&node).unwrap(), 8);
    }

    #[test]
    fn array_of_itself_is_reported() {
        let mut b = DebugInfo::builder(4);
        b.add(DebugType::new(
            "loop",
            TypeKind::Array {
                element: TypeRef::new("loop"),
                length: 2,
            },
        ));
        let info = b.build().unwrap();
        assert_eq!(
            info.size_of(&TypeRef::new("loop")),
            Err(SymbolError::CyclicType("loop".into()))
        );
    }

    #[test]
    fn build_rejects_unknown_section_and_type() {
        let mut b = DebugInfo::builder(4);
        b.add(DebugLocation::new(
            SourceLocation::new("a.c", 1, 1, 1),
            DebugAddress::new("code", 0),
        ));
        assert!(matches!(b.build(), Err(DebugInfoError::UnknownSection(s)) if s == "code"));

        let mut b = DebugInfo::builder(4);
        b.add(DebugSection::new("data", 0, 4));
        b.add(DebugVariable::global("x", "missing_t", DebugAddress::new("data", 0)));
        assert!(matches!(b.build(), Err(DebugInfoError::UnknownType(t)) if t == "missing_t"));
    }

    #[test]
    fn build_rejects_wrapping_sections_and_frame_globals() {
        let mut b = DebugInfo::builder(8);
        b.add(DebugSection::new("high", u64::MAX, 16));
        assert!(matches!(b.build(), Err(DebugInfoError::SectionOverflow(s)) if s == "high"));

        let mut b = DebugInfo::builder(4);
        let int = b.base_type("int", BaseKind::SignedInt, 4);
        b.add(DebugVariable::local("stray", int, -4));
        assert!(matches!(b.build(), Err(DebugInfoError::FrameRelativeGlobal(v)) if v == "stray"));
    }

    #[test]
    fn address_at_top_of_memory_resolves() {
        let mut b = DebugInfo::builder(8);
        b.add(DebugSection::new("high", u64::MAX - 15, 16));
        let info = b.build().unwrap();
        assert_eq!(info.resolve_absolute(u64::MAX), Some(DebugAddress::new("high", 15)));
        assert_eq!(info.resolve_absolute(0), None);
    }

    #[test]
    fn build_rejects_duplicate_locals() {
        let mut b = DebugInfo::builder(4);
        b.add(DebugSection::new("code", 0, 4));
        let int = b.base_type("int", BaseKind::SignedInt, 4);
        b.add(
            DebugFunction::new("f", DebugAddress::new("code", 0))
                .with_parameter(DebugVariable::local("a", int.clone(), 8))
                .with_local(DebugVariable::local("a", int, -4)),
        );
        assert!(matches!(b.build(), Err(DebugInfoError::DuplicateLocal { .. })));
    }

    #[test]
    fn absolute_addresses_round_trip_through_sections() {
        let info = sample();
        let addr = DebugAddress::new("data", 0x10);
        assert_eq!(info.absolute_address(&addr), Some(0x2010));
        assert_eq!(info.resolve_absolute(0x2010), Some(addr));
        assert_eq!(info.resolve_absolute(0x3000), None);
        assert_eq!(info.locations_in("code").count(), 1);
        assert_eq!(info.locations_in("data").count(), 0);
    }
}
