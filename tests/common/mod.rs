#![allow(dead_code)]

//! Common test utilities shared across integration tests

use std::io::{self, Cursor, Read, Write};

use target_debug::debuginfo::{
    BaseKind, DebugAddress, DebugFunction, DebugInfo, DebugLocation, DebugVariable,
    SourceLocation, StructField,
};
use target_debug::dummy::DummyDriver;
use target_debug::section::DebugSection;
use target_debug::{Arch, Debugger};

pub const CODE_BASE: u64 = 0x8000;
pub const DATA_BASE: u64 = 0x2000;
pub const FRAME_BASE: u64 = 0x3000;

/// Debug info of a small program:
///
/// ```text
/// int Xa;            // data+0x00
/// int B[10];         // data+0x04
/// point_t C[4];      // data+0x30, point_t { int g; int f; }
/// int *D;            // data+0x50
/// void main();       // code+0x00
/// int sum(int a) { int Xa, b; ... }   // code+0x20
/// ```
pub fn sample_program() -> DebugInfo {
    let mut b = DebugInfo::builder(4);
    b.add(DebugSection::new("code", CODE_BASE, 0x40));
    b.add(DebugSection::new("data", DATA_BASE, 0x100));

    let int = b.base_type("int", BaseKind::SignedInt, 4);
    let ints = b.array_of(&int, 10);
    let point = b.struct_type(
        "point_t",
        vec![
            StructField::new("g", int.clone(), 0),
            StructField::new("f", int.clone(), 4),
        ],
        8,
    );
    let points = b.array_of(&point, 4);
    let int_ptr = b.pointer_to(&int);

    b.add(DebugVariable::global("Xa", int.clone(), DebugAddress::new("data", 0)));
    b.add(DebugVariable::global("B", ints, DebugAddress::new("data", 0x04)));
    b.add(DebugVariable::global("C", points, DebugAddress::new("data", 0x30)));
    b.add(DebugVariable::global("D", int_ptr, DebugAddress::new("data", 0x50)));

    b.add(DebugFunction::new("main", DebugAddress::new("code", 0)));
    b.add(
        DebugFunction::new("sum", DebugAddress::new("code", 0x20))
            .returning(int.clone())
            .with_parameter(DebugVariable::local("a", int.clone(), 8))
            .with_local(DebugVariable::local("Xa", int.clone(), -4))
            .with_local(DebugVariable::local("b", int, -8)),
    );

    for (line, offset) in [(3, 0x04), (5, 0x10), (9, 0x24)] {
        b.add(DebugLocation::new(
            SourceLocation::new("main.c", line, 5, 10),
            DebugAddress::new("code", offset),
        ));
    }
    b.build().expect("sample program is valid")
}

/// A session over a zero-filled in-memory target with the sample program loaded.
pub fn session() -> Debugger<DummyDriver> {
    let mut dbg = Debugger::new(DummyDriver::new(Arch::arm()).with_entry(CODE_BASE), Arch::arm());
    dbg.load_symbols(sample_program());
    dbg
}

/// Byte stream replaying canned stub output and recording what was written.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    /// Delivered after one read has timed out on the drained `input`.
    late: Option<Vec<u8>>,
    pub written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Cursor::new(input.into()),
            late: None,
            written: Vec::new(),
        }
    }

    /// Replays `input`, then times out once like a socket with a read
    /// timeout, then replays `late`.
    pub fn stalling(input: impl Into<Vec<u8>>, late: impl Into<Vec<u8>>) -> Self {
        Self {
            late: Some(late.into()),
            ..Self::new(input)
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.input.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(late) = self.late.take() {
                self.input = Cursor::new(late);
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "read timed out"));
            }
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
