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

//! Error taxonomy shared by the debug-info model, the linker, the remote protocol
//! driver and the debugger core.

use std::io;

/// Failures on the wire. Never retried by the driver; the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("checksum mismatch for packet '{payload}': expected {expected:02x}, got {actual:02x}")]
    ChecksumMismatch {
        expected: u8,
        actual: u8,
        payload: String,
    },

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("remote stub rejected the last packet")]
    PacketRejected,

    #[error("unexpected reply to '{command}': '{reply}'")]
    UnexpectedReply { command: String, reply: String },

    #[error("stub reported error E{code:02x} for '{command}'")]
    ErrorReply { command: String, code: u8 },

    #[error("stub does not support '{0}'")]
    Unsupported(String),

    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    #[error("connection closed by remote stub")]
    ConnectionClosed,

    #[error("timed out waiting for the remote stub")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProtocolError::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(err),
        }
    }
}

/// Failures resolving or evaluating source-level symbols. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolError {
    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),

    #[error("cannot read aggregate value of '{0}'")]
    AggregateValue(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("no code at {file}:{line}")]
    NoCodeAtLocation { file: String, line: u32 },

    #[error("no breakpoint at {file}:{line}")]
    NoBreakpoint { file: String, line: u32 },

    #[error("cannot take the address of '{0}'")]
    NotAddressable(String),

    #[error("cannot dereference '{0}': not a pointer")]
    NotAPointer(String),

    #[error("cannot index '{0}': not an array or pointer")]
    NotIndexable(String),

    #[error("cannot access a field of '{0}': not a struct")]
    NotAStruct(String),

    #[error("type '{ty}' has no field '{field}'")]
    NoSuchField { field: String, ty: String },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{0}' contains itself")]
    CyclicType(String),

    #[error("syntax error at column {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("no debug information loaded")]
    NoSymbols,
}

/// Validation and text-form failures of a single debug-info model.
#[derive(Debug, thiserror::Error)]
pub enum DebugInfoError {
    #[error("address refers to unknown section '{0}'")]
    UnknownSection(String),

    #[error("reference to unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{0}' defined twice")]
    DuplicateType(String),

    #[error("section '{0}' defined twice")]
    DuplicateSection(String),

    #[error("section '{0}' wraps past the end of the address space")]
    SectionOverflow(String),

    #[error("global '{0}' has frame-relative storage")]
    FrameRelativeGlobal(String),

    #[error("local '{local}' declared twice in function '{function}'")]
    DuplicateLocal { function: String, local: String },

    #[error("unsupported debug info version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed debug info: {0}")]
    Format(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failures merging debug info at link time. The link must abort.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("unit {unit}: section '{section}' has no placement in the output")]
    UnplacedSection { unit: usize, section: String },

    #[error("offset 0x{offset:x} lies outside section '{section}' (size 0x{size:x})")]
    OffsetOutOfRange {
        section: String,
        offset: u64,
        size: u64,
    },

    #[error("placement targets unknown output section '{0}'")]
    UnknownOutputSection(String),

    #[error("type '{0}' is defined differently by two units")]
    ConflictingType(String),

    #[error("units disagree on address size ({0} vs {1} bytes)")]
    AddressSizeMismatch(u8, u8),

    #[error("merged debug info is invalid: {0}")]
    Invalid(#[from] DebugInfoError),
}

/// Errors surfaced by debugger core and evaluator operations.
#[derive(Debug, thiserror::Error)]
pub enum DebuggerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error("operation '{operation}' not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

pub type Result<T, E = DebuggerError> = std::result::Result<T, E>;
