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

//! Register layouts of the supported targets, in the order the stub sends
//! them in a `g` reply.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub name: &'static str,
    /// Size in bytes
    pub size: usize,
}

const fn reg(name: &'static str, size: usize) -> RegisterInfo {
    RegisterInfo { name, size }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arch {
    pub name: &'static str,
    pub endian: Endian,
    pub registers: Vec<RegisterInfo>,
    pub pc: &'static str,
    /// Register holding the frame base that local variable offsets are relative to.
    pub frame_pointer: &'static str,
    /// Software breakpoint kind for `Z0`/`z0`.
    pub breakpoint_kind: u8,
    pub address_size: u8,
}

impl Arch {
    pub fn arm() -> Self {
        let mut registers: Vec<RegisterInfo> = [
            "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp",
            "lr", "pc",
        ]
        .into_iter()
        .map(|name| reg(name, 4))
        .collect();
        registers.push(reg("cpsr", 4));
        Self {
            name: "arm",
            endian: Endian::Little,
            registers,
            pc: "pc",
            frame_pointer: "r11",
            breakpoint_kind: 4,
            address_size: 4,
        }
    }

    pub fn x86_64() -> Self {
        let mut registers: Vec<RegisterInfo> = [
            "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "r8", "r9", "r10", "r11", "r12",
            "r13", "r14", "r15", "rip",
        ]
        .into_iter()
        .map(|name| reg(name, 8))
        .collect();
        for name in ["eflags", "cs", "ss", "ds", "es", "fs", "gs"] {
            registers.push(reg(name, 4));
        }
        Self {
            name: "x86_64",
            endian: Endian::Little,
            registers,
            pc: "rip",
            frame_pointer: "rbp",
            breakpoint_kind: 1,
            address_size: 8,
        }
    }

    pub fn register_index(&self, name: &str) -> Option<usize> {
        self.registers.iter().position(|r| r.name == name)
    }

    pub fn register(&self, name: &str) -> Option<&RegisterInfo> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Encode a register value in target byte order.
    pub fn encode_value(&self, value: u64, size: usize) -> Vec<u8> {
        let bytes = value.to_le_bytes();
        let mut out: Vec<u8> = bytes.iter().copied().take(size).collect();
        out.resize(size, 0);
        if self.endian == Endian::Big {
            out.reverse();
        }
        out
    }

    /// Decode up to eight bytes of target-order data.
    pub fn decode_value(&self, bytes: &[u8]) -> u64 {
        let mut value = 0u64;
        let ordered: Vec<u8> = match self.endian {
            Endian::Little => bytes.iter().rev().copied().collect(),
            Endian::Big => bytes.to_vec(),
        };
        for b in ordered.iter().take(8) {
            value = (value << 8) | u64::from(*b);
        }
        value
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(Arch::arm()),
            "x86_64" | "x86-64" | "amd64" => Ok(Arch::x86_64()),
            other => Err(format!("unknown architecture '{}'", other)),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Register values in layout order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSet {
    values: Vec<(String, u64)>,
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: u64) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, u64)> for RegisterSet {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        let mut set = RegisterSet::new();
        for (name, value) in iter {
            set.insert(&name, value);
        }
        set
    }
}
