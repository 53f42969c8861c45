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

//! Target control. The debugger core talks to the target only through
//! [`DebugDriver`]; [`GdbDriver`] implements it over the remote stub protocol.

use std::io::{Read, Write};
use std::net::TcpStream;

use log::{debug, info};

use crate::arch::{Arch, RegisterSet};
use crate::error::ProtocolError;
use crate::protocol::{expect_ok, parse_reply, unexpected, RemoteCommand, Reply, ReplyKind, StopReason};
use crate::transport::PacketTransport;
use crate::utils::from_hex;

/// Operations the debugger core needs from a target. Blocking calls return
/// once the stub's reply is fully received.
pub trait DebugDriver {
    fn read_memory(&mut self, address: u64, length: usize) -> Result<Vec<u8>, ProtocolError>;
    fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), ProtocolError>;
    fn get_registers(&mut self) -> Result<RegisterSet, ProtocolError>;
    fn set_register(&mut self, name: &str, value: u64) -> Result<(), ProtocolError>;
    /// Resume and wait for the next stop.
    fn continue_execution(&mut self) -> Result<StopReason, ProtocolError>;
    fn single_step(&mut self) -> Result<StopReason, ProtocolError>;
    /// Interrupt the target and wait for it to report the stop.
    fn stop(&mut self) -> Result<StopReason, ProtocolError>;
    fn set_breakpoint(&mut self, address: u64) -> Result<(), ProtocolError>;
    fn clear_breakpoint(&mut self, address: u64) -> Result<(), ProtocolError>;
    /// Put the program back at its entry point.
    fn restart(&mut self) -> Result<(), ProtocolError>;
}

const INTERRUPT: u8 = 0x03;

/// Client for a remote stub, owning its connection.
pub struct GdbDriver<S: Read + Write = TcpStream> {
    transport: PacketTransport<S>,
    arch: Arch,
}

impl<S: Read + Write> GdbDriver<S> {
    pub fn new(transport: PacketTransport<S>, arch: Arch) -> Self {
        Self { transport, arch }
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn transport(&self) -> &PacketTransport<S> {
        &self.transport
    }

    /// Read packets until one that is not console output.
    fn read_reply(&mut self, kind: ReplyKind) -> Result<Reply, ProtocolError> {
        loop {
            let payload = self.transport.read_packet()?;
            match parse_reply(&payload, kind) {
                Reply::Output(text) => info!("target: {}", text.trim_end()),
                reply => return Ok(reply),
            }
        }
    }

    fn request(&mut self, command: &RemoteCommand) -> Result<Reply, ProtocolError> {
        debug!("request {}", command);
        self.transport.send(&command.encode())?;
        match command.reply_kind() {
            ReplyKind::None => Ok(Reply::Empty),
            kind => self.read_reply(kind),
        }
    }

    fn request_ok(&mut self, command: RemoteCommand) -> Result<(), ProtocolError> {
        let reply = self.request(&command)?;
        expect_ok(&command, reply)
    }

    fn request_hex(&mut self, command: RemoteCommand) -> Result<String, ProtocolError> {
        match self.request(&command)? {
            Reply::Data(hex) => Ok(hex),
            other => Err(unexpected(&command, other)),
        }
    }

    fn request_stop(&mut self, command: RemoteCommand) -> Result<StopReason, ProtocolError> {
        match self.request(&command)? {
            Reply::Stop(reason) => {
                debug!("target {}", reason);
                Ok(reason)
            }
            other => Err(unexpected(&command, other)),
        }
    }

    pub fn query_halt_reason(&mut self) -> Result<StopReason, ProtocolError> {
        self.request_stop(RemoteCommand::QueryHaltReason)
    }

    /// Detach from the stub and close the connection.
    pub fn detach(mut self) -> Result<(), ProtocolError> {
        self.request_ok(RemoteCommand::Detach)
    }

    fn decode_registers(&self, hex: &str) -> Result<RegisterSet, ProtocolError> {
        let mut regs = RegisterSet::new();
        let mut pos = 0usize;
        for reg in &self.arch.registers {
            let end = pos + reg.size * 2;
            let Some(field) = hex.get(pos..end) else {
                break;
            };
            pos = end;
            // 'x' digits mark a register the stub cannot read
            if field.contains('x') {
                continue;
            }
            let bytes = from_hex(field).ok_or_else(|| ProtocolError::UnexpectedReply {
                command: "g".to_string(),
                reply: hex.to_string(),
            })?;
            regs.insert(reg.name, self.arch.decode_value(&bytes));
        }
        Ok(regs)
    }
}

impl<S: Read + Write> DebugDriver for GdbDriver<S> {
    fn read_memory(&mut self, address: u64, length: usize) -> Result<Vec<u8>, ProtocolError> {
        let command = RemoteCommand::ReadMemory { address, length };
        let hex = self.request_hex(command.clone())?;
        let data = from_hex(&hex).ok_or_else(|| ProtocolError::UnexpectedReply {
            command: command.encode(),
            reply: hex.clone(),
        })?;
        if data.len() != length {
            return Err(ProtocolError::UnexpectedReply {
                command: command.encode(),
                reply: hex,
            });
        }
        Ok(data)
    }

    fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), ProtocolError> {
        self.request_ok(RemoteCommand::WriteMemory {
            address,
            data: data.to_vec(),
        })
    }

    fn get_registers(&mut self) -> Result<RegisterSet, ProtocolError> {
        let hex = self.request_hex(RemoteCommand::ReadRegisters)?;
        self.decode_registers(&hex)
    }

    fn set_register(&mut self, name: &str, value: u64) -> Result<(), ProtocolError> {
        let index = self
            .arch
            .register_index(name)
            .ok_or_else(|| ProtocolError::UnknownRegister(name.to_string()))?;
        let size = self.arch.registers[index].size;
        let value = self.arch.encode_value(value, size);
        self.request_ok(RemoteCommand::WriteRegister { index, value })
    }

    fn continue_execution(&mut self) -> Result<StopReason, ProtocolError> {
        self.request_stop(RemoteCommand::Continue)
    }

    fn single_step(&mut self) -> Result<StopReason, ProtocolError> {
        self.request_stop(RemoteCommand::Step)
    }

    fn stop(&mut self) -> Result<StopReason, ProtocolError> {
        debug!("interrupting target");
        self.transport.write_raw(&[INTERRUPT])?;
        match self.read_reply(ReplyKind::Stop)? {
            Reply::Stop(reason) => Ok(reason),
            other => Err(unexpected(&RemoteCommand::QueryHaltReason, other)),
        }
    }

    fn set_breakpoint(&mut self, address: u64) -> Result<(), ProtocolError> {
        self.request_ok(RemoteCommand::InsertBreakpoint {
            address,
            kind: self.arch.breakpoint_kind,
        })
    }

    fn clear_breakpoint(&mut self, address: u64) -> Result<(), ProtocolError> {
        self.request_ok(RemoteCommand::RemoveBreakpoint {
            address,
            kind: self.arch.breakpoint_kind,
        })
    }

    fn restart(&mut self) -> Result<(), ProtocolError> {
        self.request(&RemoteCommand::Restart).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests::MockStream;
    use crate::transport::{pack, AckMode};

    fn driver(replies: &[&str]) -> GdbDriver<MockStream> {
        let input: String = replies.iter().map(|r| pack(r)).collect();
        let transport = PacketTransport::new(MockStream::new(input.as_bytes())).with_ack_mode(AckMode::NoAck);
        GdbDriver::new(transport, Arch::arm())
    }

    fn sent(d: &GdbDriver<MockStream>) -> String {
        String::from_utf8(d.transport().get_ref().output.clone()).unwrap()
    }

    #[test]
    fn read_memory_decodes_hex() {
        let mut d = driver(&["deadbeef"]);
        assert_eq!(d.read_memory(0x100, 4).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(sent(&d), pack("m100,4"));
    }

    #[test]
    fn read_memory_surfaces_stub_error() {
        let mut d = driver(&["E14"]);
        assert!(matches!(d.read_memory(0, 4), Err(ProtocolError::ErrorReply { code: 0x14, .. })));
    }

    #[test]
    fn short_memory_reply_is_rejected() {
        let mut d = driver(&["de"]);
        assert!(matches!(d.read_memory(0, 4), Err(ProtocolError::UnexpectedReply { .. })));
    }

    #[test]
    fn registers_decode_in_layout_order() {
        // r0 = 1, r1 = 1000, r2 unavailable, rest truncated
        let mut d = driver(&["01000000e8030000xxxxxxxx"]);
        let regs = d.get_registers().unwrap();
        assert_eq!(regs.get("r0"), Some(1));
        assert_eq!(regs.get("r1"), Some(1000));
        assert_eq!(regs.get("r2"), None);
        assert_eq!(regs.len(), 2);
    }

    #[test]
    fn set_register_uses_layout_index() {
        let mut d = driver(&["OK"]);
        d.set_register("pc", 0x8004).unwrap();
        assert_eq!(sent(&d), pack("Pf=04800000"));
        assert!(matches!(d.set_register("xyz", 0), Err(ProtocolError::UnknownRegister(_))));
    }

    #[test]
    fn continue_skips_console_output() {
        let mut d = driver(&["O68690a", "T05thread:01;"]);
        assert_eq!(d.continue_execution().unwrap(), StopReason::Signal(5));
        assert_eq!(sent(&d), pack("c"));
    }

    #[test]
    fn stop_sends_interrupt_byte() {
        let mut d = driver(&["S02"]);
        assert_eq!(d.stop().unwrap(), StopReason::Signal(2));
        assert_eq!(d.transport().get_ref().output, vec![INTERRUPT]);
    }

    #[test]
    fn breakpoints_use_arch_kind() {
        let mut d = driver(&["OK", "OK"]);
        d.set_breakpoint(0x8004).unwrap();
        d.clear_breakpoint(0x8004).unwrap();
        assert_eq!(sent(&d), format!("{}{}", pack("Z0,8004,4"), pack("z0,8004,4")));
    }

    #[test]
    fn unsupported_breakpoint_is_reported() {
        let mut d = driver(&[""]);
        assert!(matches!(d.set_breakpoint(4), Err(ProtocolError::Unsupported(_))));
    }

    #[test]
    fn step_with_unexpected_reply_fails() {
        let mut d = driver(&["OK"]);
        assert!(matches!(d.single_step(), Err(ProtocolError::UnexpectedReply { .. })));
    }

    #[test]
    fn restart_expects_no_reply() {
        let mut d = driver(&[]);
        d.restart().unwrap();
        assert_eq!(sent(&d), pack("R00"));
    }
}
