//! Portable text forms of a [`DebugInfo`].
//!
//! The primary form is a versioned JSON document. Every table is an ordered
//! list, so the same model always produces the same bytes, and types are
//! written as a flat table whose entries refer to each other by name. A
//! self-referential type therefore serializes as one finite entry.
//!
//! The ldb form is an export-only listing of absolute addresses for external
//! tooling.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::debuginfo::{DebugAddress, DebugInfo, DebugTables, Storage};
use crate::error::DebugInfoError;

pub const FORMAT_NAME: &str = "debuginfo";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentOut<'a> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    tables: &'a DebugTables,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(flatten)]
    tables: DebugTables,
}

/// Render the model as pretty-printed, deterministic JSON.
pub fn serialize(info: &DebugInfo) -> Result<String, DebugInfoError> {
    let doc = DocumentOut {
        format: FORMAT_NAME,
        version: FORMAT_VERSION,
        tables: info.tables(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse a document produced by [`serialize`] and re-validate it.
pub fn deserialize(text: &str) -> Result<DebugInfo, DebugInfoError> {
    let header: Header = serde_json::from_str(text)?;
    if header.version != FORMAT_VERSION {
        return Err(DebugInfoError::UnsupportedVersion(header.version));
    }
    let doc: DocumentIn = serde_json::from_str(text)?;
    DebugInfo::from_tables(doc.tables)
}

pub fn write_debug_info<W: Write>(info: &DebugInfo, writer: &mut W) -> Result<(), DebugInfoError> {
    writer.write_all(serialize(info)?.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn read_debug_info<R: Read>(reader: &mut R) -> Result<DebugInfo, DebugInfoError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    deserialize(&text)
}

/// Export locations, functions and globals in ldb form with absolute addresses.
pub fn export_ldb<W: Write>(info: &DebugInfo, writer: &mut W) -> Result<(), DebugInfoError> {
    let absolute = |addr: &DebugAddress| {
        info.absolute_address(addr)
            .ok_or_else(|| DebugInfoError::UnknownSection(addr.section.clone()))
    };
    for loc in info.locations() {
        writeln!(
            writer,
            "line: \"{}\":{} @ 0x{:08X}",
            loc.location.filename,
            loc.location.line,
            absolute(&loc.address)?
        )?;
    }
    for func in info.functions() {
        writeln!(writer, "function: {} <0> @ 0x{:08X}", func.name, absolute(&func.begin)?)?;
    }
    for var in info.variables() {
        if let Storage::Global(addr) = &var.storage {
            writeln!(writer, "global: {} <0> @ 0x{:08X}", var.name, absolute(addr)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debuginfo::{
        BaseKind, DebugFunction, DebugLocation, DebugVariable, SourceLocation,
        StructField, TypeRef,
    };
    use crate::section::DebugSection;

    fn linked_list_program() -> DebugInfo {
        let mut b = DebugInfo::builder(4);
        b.add(DebugSection::new("code", 0x8000, 0x40));
        b.add(DebugSection::new("data", 0x2000, 0x10));
        let int = b.base_type("int", BaseKind::SignedInt, 4);
        let node = TypeRef::new("node_t");
        let node_ptr = b.pointer_to(&node);
        b.struct_type(
            "node_t",
            vec![
                StructField::new("payload", int.clone(), 0),
                StructField::new("next", node_ptr.clone(), 4),
            ],
            8,
        );
        b.add(DebugVariable::global("root", node_ptr, DebugAddress::new("data", 0)));
        b.add(DebugVariable::global("Xa", int.clone(), DebugAddress::new("data", 4)));
        b.add(
            DebugFunction::new("sum", DebugAddress::new("code", 0))
                .returning(int.clone())
                .with_parameter(DebugVariable::local("a", int.clone(), 8))
                .with_parameter(DebugVariable::local("b", int.clone(), 12))
                .with_local(DebugVariable::local("sum", int, -4)),
        );
        b.add(DebugLocation::new(
            SourceLocation::new("x.c3", 7, 13, 22),
            DebugAddress::new("code", 0x0c),
        ));
        b.build().unwrap()
    }

    #[test]
    fn round_trip_preserves_structure() {
        let info = linked_list_program();
        let text = serialize(&info).unwrap();
        let back = deserialize(&text).unwrap();
        assert_eq!(back, info);
        // Deterministic output
        assert_eq!(serialize(&back).unwrap(), text);
    }

    #[test]
    fn recursive_type_is_written_by_name() {
        let text = serialize(&linked_list_program()).unwrap();
        assert!(text.contains("\"pointee\": \"node_t\""));
        assert_eq!(text.matches("\"name\": \"node_t\"").count(), 1);
    }

    #[test]
    fn empty_model_round_trips() {
        let info = DebugInfo::builder(8).build().unwrap();
        assert_eq!(deserialize(&serialize(&info).unwrap()).unwrap(), info);
    }

    #[test]
    fn rejects_other_versions() {
        let text = serialize(&linked_list_program())
            .unwrap()
            .replace("\"version\": 1", "\"version\": 99");
        assert!(matches!(deserialize(&text), Err(DebugInfoError::UnsupportedVersion(99))));
    }

    #[test]
    fn rejects_dangling_type_references() {
        let text = serialize(&linked_list_program())
            .unwrap()
            .replace("\"pointee\": \"node_t\"", "\"pointee\": \"gone_t\"");
        assert!(matches!(deserialize(&text), Err(DebugInfoError::UnknownType(t)) if t == "gone_t"));
    }

    #[test]
    fn ldb_export_uses_absolute_addresses() {
        let mut out = Vec::new();
        export_ldb(&linked_list_program(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "line: \"x.c3\":7 @ 0x0000800C\n\
             function: sum <0> @ 0x00008000\n\
             global: root <0> @ 0x00002000\n\
             global: Xa <0> @ 0x00002004\n"
        );
    }
}
