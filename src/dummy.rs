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

//! An in-memory target. Sessions run against it without a live stub, and
//! tests use its call log to observe exactly what the core asked for.

use std::collections::{BTreeMap, BTreeSet};

use crate::arch::{Arch, RegisterSet};
use crate::driver::DebugDriver;
use crate::error::ProtocolError;
use crate::protocol::StopReason;

const SIGTRAP: u8 = 5;
const SIGINT: u8 = 2;

/// One recorded driver request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    ReadMemory(u64, usize),
    WriteMemory(u64, Vec<u8>),
    GetRegisters,
    SetRegister(String, u64),
    Continue,
    Step,
    Stop,
    SetBreakpoint(u64),
    ClearBreakpoint(u64),
    Restart,
}

#[derive(Debug, Clone)]
pub struct DummyDriver {
    arch: Arch,
    memory: BTreeMap<u64, u8>,
    registers: RegisterSet,
    breakpoints: BTreeSet<u64>,
    entry: u64,
    stop_replies: Vec<StopReason>,
    pub calls: Vec<DriverCall>,
}

impl DummyDriver {
    /// Fresh target: memory reads as zero and every register is zero.
    pub fn new(arch: Arch) -> Self {
        let registers = arch.registers.iter().map(|r| (r.name.to_string(), 0)).collect();
        Self {
            arch,
            memory: BTreeMap::new(),
            registers,
            breakpoints: BTreeSet::new(),
            entry: 0,
            stop_replies: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    /// PC value restored by `restart`.
    pub fn with_entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self.registers.insert(self.arch.pc, entry);
        self
    }

    /// Store bytes without logging a call.
    pub fn poke(&mut self, address: u64, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.memory.insert(address.wrapping_add(i as u64), *b);
        }
    }

    /// Store an integer in target byte order.
    pub fn poke_value(&mut self, address: u64, value: u64, size: usize) {
        let bytes = self.arch.encode_value(value, size);
        self.poke(address, &bytes);
    }

    pub fn poke_register(&mut self, name: &str, value: u64) {
        self.registers.insert(name, value);
    }

    /// Queue the reason reported by the next continue or step. Without one,
    /// the target reports a trap.
    pub fn queue_stop(&mut self, reason: StopReason) {
        self.stop_replies.push(reason);
    }

    pub fn has_breakpoint(&self, address: u64) -> bool {
        self.breakpoints.contains(&address)
    }

    fn next_stop(&mut self) -> StopReason {
        if self.stop_replies.is_empty() {
            StopReason::Signal(SIGTRAP)
        } else {
            self.stop_replies.remove(0)
        }
    }
}

impl DebugDriver for DummyDriver {
    fn read_memory(&mut self, address: u64, length: usize) -> Result<Vec<u8>, ProtocolError> {
        self.calls.push(DriverCall::ReadMemory(address, length));
        Ok((0..length as u64)
            .map(|i| self.memory.get(&address.wrapping_add(i)).copied().unwrap_or(0))
            .collect())
    }

    fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), ProtocolError> {
        self.calls.push(DriverCall::WriteMemory(address, data.to_vec()));
        self.poke(address, data);
        Ok(())
    }

    fn get_registers(&mut self) -> Result<RegisterSet, ProtocolError> {
        self.calls.push(DriverCall::GetRegisters);
        Ok(self.registers.clone())
    }

    fn set_register(&mut self, name: &str, value: u64) -> Result<(), ProtocolError> {
        self.calls.push(DriverCall::SetRegister(name.to_string(), value));
        if self.arch.register(name).is_none() {
            return Err(ProtocolError::UnknownRegister(name.to_string()));
        }
        self.registers.insert(name, value);
        Ok(())
    }

    fn continue_execution(&mut self) -> Result<StopReason, ProtocolError> {
        self.calls.push(DriverCall::Continue);
        Ok(self.next_stop())
    }

    fn single_step(&mut self) -> Result<StopReason, ProtocolError> {
        self.calls.push(DriverCall::Step);
        Ok(self.next_stop())
    }

    fn stop(&mut self) -> Result<StopReason, ProtocolError> {
        self.calls.push(DriverCall::Stop);
        Ok(StopReason::Signal(SIGINT))
    }

    fn set_breakpoint(&mut self, address: u64) -> Result<(), ProtocolError> {
        self.calls.push(DriverCall::SetBreakpoint(address));
        self.breakpoints.insert(address);
        Ok(())
    }

    fn clear_breakpoint(&mut self, address: u64) -> Result<(), ProtocolError> {
        self.calls.push(DriverCall::ClearBreakpoint(address));
        self.breakpoints.remove(&address);
        Ok(())
    }

    fn restart(&mut self) -> Result<(), ProtocolError> {
        self.calls.push(DriverCall::Restart);
        let entry = self.entry;
        self.registers.insert(self.arch.pc, entry);
        Ok(())
    }
}
