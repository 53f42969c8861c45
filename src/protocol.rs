//! Remote stub commands and the decoding of their replies.
use std::fmt;

use crate::error::ProtocolError;
use crate::utils::{from_hex, to_hex};

/// Every request the driver sends to the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    ReadMemory { address: u64, length: usize },
    WriteMemory { address: u64, data: Vec<u8> },
    ReadRegisters,
    /// `value` is already laid out in target byte order.
    WriteRegister { index: usize, value: Vec<u8> },
    Continue,
    Step,
    InsertBreakpoint { address: u64, kind: u8 },
    RemoveBreakpoint { address: u64, kind: u8 },
    QueryHaltReason,
    Restart,
    Detach,
}

impl RemoteCommand {
    /// The packet payload for this command.
    pub fn encode(&self) -> String {
        match self {
            RemoteCommand::ReadMemory { address, length } => format!("m{:x},{:x}", address, length),
            RemoteCommand::WriteMemory { address, data } => {
                format!("M{:x},{:x}:{}", address, data.len(), to_hex(data))
            }
            RemoteCommand::ReadRegisters => "g".to_string(),
            RemoteCommand::WriteRegister { index, value } => format!("P{:x}={}", index, to_hex(value)),
            RemoteCommand::Continue => "c".to_string(),
            RemoteCommand::Step => "s".to_string(),
            RemoteCommand::InsertBreakpoint { address, kind } => format!("Z0,{:x},{:x}", address, kind),
            RemoteCommand::RemoveBreakpoint { address, kind } => format!("z0,{:x},{:x}", address, kind),
            RemoteCommand::QueryHaltReason => "?".to_string(),
            RemoteCommand::Restart => "R00".to_string(),
            RemoteCommand::Detach => "D".to_string(),
        }
    }

    /// What the stub answers with.
    pub fn reply_kind(&self) -> ReplyKind {
        match self {
            RemoteCommand::ReadMemory { .. } | RemoteCommand::ReadRegisters => ReplyKind::Hex,
            RemoteCommand::WriteMemory { .. }
            | RemoteCommand::WriteRegister { .. }
            | RemoteCommand::InsertBreakpoint { .. }
            | RemoteCommand::RemoveBreakpoint { .. }
            | RemoteCommand::Detach => ReplyKind::Ok,
            RemoteCommand::Continue | RemoteCommand::Step | RemoteCommand::QueryHaltReason => {
                ReplyKind::Stop
            }
            RemoteCommand::Restart => ReplyKind::None,
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Hex-encoded data
    Hex,
    /// `OK`
    Ok,
    /// A stop reply
    Stop,
    /// No reply is sent
    None,
}

/// Why the target stopped, decoded from an `S`, `T`, `W` or `X` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Signal(u8),
    Exited(u8),
    Terminated(u8),
}

impl StopReason {
    /// Program exit leaves nothing to inspect.
    pub fn is_exit(&self) -> bool {
        matches!(self, StopReason::Exited(_) | StopReason::Terminated(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal(sig) => write!(f, "stopped by signal {}", sig),
            StopReason::Exited(code) => write!(f, "exited with code {}", code),
            StopReason::Terminated(sig) => write!(f, "terminated by signal {}", sig),
        }
    }
}

/// A decoded reply packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Empty,
    Error(u8),
    Stop(StopReason),
    /// Console output from the target (`O<hex>`)
    Output(String),
    Data(String),
}

fn hex_byte(text: &str) -> Option<u8> {
    text.get(..2).and_then(|h| u8::from_str_radix(h, 16).ok())
}

/// Classify a reply payload. Stop and output replies are only recognized
/// where `kind` expects them, because hex data may start with the same letters.
pub fn parse_reply(payload: &str, kind: ReplyKind) -> Reply {
    if payload.is_empty() {
        return Reply::Empty;
    }
    if payload == "OK" {
        return Reply::Ok;
    }
    if payload.len() == 3 && payload.starts_with('E') {
        if let Some(code) = payload.get(1..).and_then(hex_byte) {
            return Reply::Error(code);
        }
    }
    if kind == ReplyKind::Stop {
        let rest = payload.get(1..).unwrap_or("");
        let stop = match payload.as_bytes()[0] {
            b'S' | b'T' => hex_byte(rest).map(StopReason::Signal),
            b'W' => hex_byte(rest).map(StopReason::Exited),
            b'X' => hex_byte(rest).map(StopReason::Terminated),
            b'O' => {
                let text = from_hex(rest).map(|b| String::from_utf8_lossy(&b).into_owned());
                if let Some(text) = text {
                    return Reply::Output(text);
                }
                None
            }
            _ => None,
        };
        if let Some(stop) = stop {
            return Reply::Stop(stop);
        }
    }
    Reply::Data(payload.to_string())
}

/// Turn a reply into an error unless it is the expected `OK`.
pub fn expect_ok(command: &RemoteCommand, reply: Reply) -> Result<(), ProtocolError> {
    match reply {
        Reply::Ok => Ok(()),
        other => Err(unexpected(command, other)),
    }
}

pub fn unexpected(command: &RemoteCommand, reply: Reply) -> ProtocolError {
    match reply {
        Reply::Error(code) => ProtocolError::ErrorReply {
            command: command.encode(),
            code,
        },
        Reply::Empty => ProtocolError::Unsupported(command.encode()),
        Reply::Ok => ProtocolError::UnexpectedReply {
            command: command.encode(),
            reply: "OK".to_string(),
        },
        Reply::Stop(reason) => ProtocolError::UnexpectedReply {
            command: command.encode(),
            reply: reason.to_string(),
        },
        Reply::Output(text) | Reply::Data(text) => ProtocolError::UnexpectedReply {
            command: command.encode(),
            reply: text,
        },
    }
}
