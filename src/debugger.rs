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

//! The debugger core: one session over one driver.
//!
//! Owns the loaded symbols, the breakpoint table and a cached PC lookup. All
//! target access goes through the [`DebugDriver`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::arch::{Arch, RegisterSet};
use crate::debuginfo::{DebugAddress, DebugFunction, DebugInfo, SourceLocation};
use crate::driver::DebugDriver;
use crate::error::{DebuggerError, ProtocolError, Result, SymbolError};
use crate::eval::{Evaluator, Frame, Value};
use crate::expr;
use crate::line_table::LineTable;
use crate::protocol::StopReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerState {
    Idle,
    Running,
    Stopped,
}

impl DebuggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebuggerState::Idle => "idle",
            DebuggerState::Running => "running",
            DebuggerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for DebuggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub location: SourceLocation,
    pub address: DebugAddress,
    /// Load address handed to the driver
    pub target_address: u64,
}

/// Result of resolving the program counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcLookup {
    Mapped {
        pc: u64,
        address: DebugAddress,
        function: Option<String>,
        location: Option<SourceLocation>,
    },
    /// The PC lies outside any code described by the loaded symbols.
    Unknown { pc: u64 },
}

impl PcLookup {
    pub fn pc(&self) -> u64 {
        match self {
            PcLookup::Mapped { pc, .. } | PcLookup::Unknown { pc } => *pc,
        }
    }

    pub fn address(&self) -> Option<&DebugAddress> {
        match self {
            PcLookup::Mapped { address, .. } => Some(address),
            PcLookup::Unknown { .. } => None,
        }
    }
}

impl fmt::Display for PcLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PcLookup::Mapped {
                pc,
                function,
                location,
                ..
            } => {
                write!(f, "0x{:08x}", pc)?;
                if let Some(func) = function {
                    write!(f, " in {}", func)?;
                }
                if let Some(loc) = location {
                    write!(f, " at {}", loc)?;
                }
                Ok(())
            }
            PcLookup::Unknown { pc } => write!(f, "0x{:08x} (no debug info)", pc),
        }
    }
}

#[derive(Debug, Clone)]
struct PcCache {
    lookup: PcLookup,
    frame_base: Option<u64>,
}

pub struct Debugger<D: DebugDriver> {
    arch: Arch,
    driver: D,
    debug_info: Option<Arc<DebugInfo>>,
    lines: LineTable,
    state: DebuggerState,
    breakpoints: BTreeMap<u64, Breakpoint>,
    pc_cache: Option<PcCache>,
}

impl<D: DebugDriver> Debugger<D> {
    pub fn new(driver: D, arch: Arch) -> Self {
        Self {
            arch,
            driver,
            debug_info: None,
            lines: LineTable::default(),
            state: DebuggerState::Idle,
            breakpoints: BTreeMap::new(),
            pc_cache: None,
        }
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn state(&self) -> DebuggerState {
        self.state
    }

    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug_info.as_deref()
    }

    /// Breakpoints in address order.
    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// Attach the debug info of the program on the target. Breakpoints set
    /// against the previous symbols are removed.
    pub fn load_symbols(&mut self, debug_info: impl Into<Arc<DebugInfo>>) {
        let debug_info = debug_info.into();
        if debug_info.address_size() != self.arch.address_size {
            warn!(
                "debug info uses {}-byte addresses but {} has {}",
                debug_info.address_size(),
                self.arch,
                self.arch.address_size
            );
        }
        for addr in std::mem::take(&mut self.breakpoints).into_keys() {
            if let Err(err) = self.driver.clear_breakpoint(addr) {
                warn!("could not remove breakpoint at 0x{:x}: {}", addr, err);
            }
        }
        self.lines = LineTable::from_locations(debug_info.locations());
        info!(
            "loaded symbols: {} functions, {} variables, {} locations in {} files",
            debug_info.functions().len(),
            debug_info.variables().len(),
            debug_info.locations().len(),
            self.lines.file_count()
        );
        self.debug_info = Some(debug_info);
        self.pc_cache = None;
    }

    fn symbols(&self) -> Result<&Arc<DebugInfo>, SymbolError> {
        self.debug_info.as_ref().ok_or(SymbolError::NoSymbols)
    }

    fn invalid(&self, operation: &'static str) -> DebuggerError {
        DebuggerError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }

    fn resolve_pc(&self, pc: u64) -> PcLookup {
        let Some(info) = self.debug_info.as_deref() else {
            return PcLookup::Unknown { pc };
        };
        let Some(address) = info.resolve_absolute(pc) else {
            return PcLookup::Unknown { pc };
        };
        let function = info.function_containing(&address).map(|f| f.name.clone());
        let location = info.location_at(&address).map(|l| l.location.clone());
        if function.is_none() && location.is_none() {
            return PcLookup::Unknown { pc };
        }
        PcLookup::Mapped {
            pc,
            address,
            function,
            location,
        }
    }

    fn refresh_pc(&mut self) -> Result<PcCache> {
        if let Some(cache) = &self.pc_cache {
            return Ok(cache.clone());
        }
        let regs = self.driver.get_registers()?;
        let pc = regs
            .get(self.arch.pc)
            .ok_or_else(|| ProtocolError::UnknownRegister(self.arch.pc.to_string()))?;
        let lookup = self.resolve_pc(pc);
        debug!("pc {}", lookup);
        let cache = PcCache {
            lookup,
            frame_base: regs.get(self.arch.frame_pointer),
        };
        self.pc_cache = Some(cache.clone());
        Ok(cache)
    }

    /// Where the program counter is, in source terms. An address outside the
    /// known code yields [`PcLookup::Unknown`], not an error.
    pub fn find_pc(&mut self) -> Result<PcLookup> {
        Ok(self.refresh_pc()?.lookup)
    }

    /// The address of the first code generated for `line` of `filename`, or for
    /// the next line after it that has code.
    pub fn find_address(&self, filename: &str, line: u32) -> Option<DebugAddress> {
        let info = self.debug_info.as_deref()?;
        let index = self.lines.find(filename, line)?;
        info.locations().get(index).map(|l| l.address.clone())
    }

    fn resolve_breakpoint(&self, filename: &str, line: u32) -> Result<(DebugAddress, SourceLocation, u64), SymbolError> {
        let info = self.symbols()?;
        let no_code = || SymbolError::NoCodeAtLocation {
            file: filename.to_string(),
            line,
        };
        let index = self.lines.find(filename, line).ok_or_else(no_code)?;
        let loc = info.locations().get(index).ok_or_else(no_code)?;
        let target = info.absolute_address(&loc.address).ok_or_else(no_code)?;
        Ok((loc.address.clone(), loc.location.clone(), target))
    }

    /// Returns the load address the breakpoint was placed at.
    pub fn set_breakpoint(&mut self, filename: &str, line: u32) -> Result<u64> {
        let (address, location, target) = self.resolve_breakpoint(filename, line)?;
        if self.breakpoints.contains_key(&target) {
            debug!("breakpoint at 0x{:x} already set", target);
            return Ok(target);
        }
        self.driver.set_breakpoint(target)?;
        info!("breakpoint set at {} (0x{:08x})", location, target);
        self.breakpoints.insert(
            target,
            Breakpoint {
                location,
                address,
                target_address: target,
            },
        );
        Ok(target)
    }

    pub fn clear_breakpoint(&mut self, filename: &str, line: u32) -> Result<u64> {
        let (_, _, target) = self.resolve_breakpoint(filename, line)?;
        if !self.breakpoints.contains_key(&target) {
            return Err(SymbolError::NoBreakpoint {
                file: filename.to_string(),
                line,
            }
            .into());
        }
        self.driver.clear_breakpoint(target)?;
        self.breakpoints.remove(&target);
        info!("breakpoint cleared at 0x{:08x}", target);
        Ok(target)
    }

    /// The function the program counter is in.
    pub fn current_function(&mut self) -> Result<Option<&DebugFunction>> {
        let address = match self.find_pc()? {
            PcLookup::Mapped { address, .. } => address,
            PcLookup::Unknown { .. } => return Ok(None),
        };
        Ok(self
            .debug_info
            .as_deref()
            .and_then(|info| info.function_containing(&address)))
    }

    fn stopped(&mut self, reason: StopReason) -> StopReason {
        self.pc_cache = None;
        self.state = if reason.is_exit() {
            DebuggerState::Idle
        } else {
            DebuggerState::Stopped
        };
        info!("target {}", reason);
        reason
    }

    /// Hand control to the target until it reports a stop. A failed exchange
    /// leaves the session in the state it had before, so the caller may retry.
    fn resume(
        &mut self,
        operation: &'static str,
        exchange: impl FnOnce(&mut D) -> Result<StopReason, ProtocolError>,
    ) -> Result<StopReason> {
        if self.state == DebuggerState::Running {
            return Err(self.invalid(operation));
        }
        let previous = self.state;
        self.pc_cache = None;
        self.state = DebuggerState::Running;
        match exchange(&mut self.driver) {
            Ok(reason) => Ok(self.stopped(reason)),
            Err(err) => {
                warn!("{} failed: {}", operation, err);
                self.state = previous;
                Err(err.into())
            }
        }
    }

    /// Resume the target and block until it stops again.
    pub fn run(&mut self) -> Result<StopReason> {
        self.resume("run", |driver| driver.continue_execution())
    }

    pub fn step(&mut self) -> Result<StopReason> {
        self.resume("step", |driver| driver.single_step())
    }

    /// Interrupt a running target. Does nothing when the target is not running.
    pub fn stop(&mut self) -> Result<Option<StopReason>> {
        if self.state != DebuggerState::Running {
            debug!("stop ignored: target is {}", self.state);
            return Ok(None);
        }
        let reason = self.driver.stop()?;
        Ok(Some(self.stopped(reason)))
    }

    /// Reset the target to its entry point and run it again.
    pub fn restart(&mut self) -> Result<StopReason> {
        self.pc_cache = None;
        self.driver.restart()?;
        self.state = DebuggerState::Idle;
        self.run()
    }

    pub fn read_memory(&mut self, address: u64, length: usize) -> Result<Vec<u8>> {
        Ok(self.driver.read_memory(address, length)?)
    }

    pub fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<()> {
        self.driver.write_memory(address, data)?;
        Ok(())
    }

    pub fn get_registers(&mut self) -> Result<RegisterSet> {
        Ok(self.driver.get_registers()?)
    }

    /// Evaluate a source expression. When the program counter is inside a known
    /// function, its locals shadow globals. A running target has no frame.
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let parsed = expr::parse(source)?;
        let info = Arc::clone(self.symbols()?);

        let mut frame_of = None;
        if self.state != DebuggerState::Running {
            let cache = self.refresh_pc()?;
            if let (Some(address), Some(base)) = (cache.lookup.address(), cache.frame_base) {
                frame_of = info.function_containing(address).map(|function| (function, base));
            }
        }
        let frame = frame_of.map(|(function, base)| Frame { function, base });

        Evaluator::new(&info, &self.arch, &mut self.driver)
            .with_frame(frame)
            .evaluate(&parsed)
    }
}
