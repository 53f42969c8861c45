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

//! Merging debug information of several object units into one.
//!
//! The section layout itself is decided by the linker. What this module
//! consumes is, per unit, where each of its input sections ended up: the name
//! of the output section and the base offset inside it, alignment padding
//! included. Every address is rewritten as `base_offset + original_offset`.

use std::collections::HashMap;

use log::debug;

use crate::debuginfo::{
    DebugAddress, DebugFunction, DebugInfo, DebugInfoBuilder, DebugLocation, DebugType,
    DebugVariable, Storage,
};
use crate::error::LinkError;
use crate::section::DebugSection;

/// Where one input section of a unit was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlacement {
    pub input_section: String,
    pub output_section: String,
    pub base_offset: u64,
    pub size: u64,
}

impl SectionPlacement {
    /// An offset is valid up to and including the input section size, so labels
    /// that mark the end of a section still resolve.
    pub fn holds_offset(&self, offset: u64) -> bool {
        offset <= self.size
    }
}

/// A merged output section with its final load address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSection {
    pub name: String,
    pub address: u64,
    pub size: u64,
}

/// One unit's debug info together with the placement of its sections.
#[derive(Debug, Clone)]
pub struct LinkInput<'a> {
    pub debug_info: &'a DebugInfo,
    pub placements: Vec<SectionPlacement>,
}

/// Minimal sequential layout: input sections are appended to their output
/// section, each aligned up to its own alignment.
#[derive(Debug, Default)]
pub struct SectionLayout {
    outputs: Vec<OutputSection>,
}

impl SectionLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an output section at a load address.
    pub fn output(&mut self, name: &str, address: u64) -> &mut Self {
        if !self.outputs.iter().any(|o| o.name == name) {
            self.outputs.push(OutputSection {
                name: name.to_string(),
                address,
                size: 0,
            });
        }
        self
    }

    /// Append an input section to `output`, creating the output at address 0
    /// if it was not declared.
    pub fn place(&mut self, output: &str, input: &str, size: u64, alignment: u64) -> SectionPlacement {
        let idx = match self.outputs.iter().position(|o| o.name == output) {
            Some(idx) => idx,
            None => {
                self.output(output, 0);
                self.outputs.len() - 1
            }
        };
        let out = &mut self.outputs[idx];
        let base_offset = align_up(out.size, alignment);
        out.size = base_offset + size;
        SectionPlacement {
            input_section: input.to_string(),
            output_section: output.to_string(),
            base_offset,
            size,
        }
    }

    pub fn output_sections(&self) -> &[OutputSection] {
        &self.outputs
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

struct Relocator<'a> {
    unit: usize,
    placements: &'a [SectionPlacement],
}

impl Relocator<'_> {
    fn rewrite(&self, addr: &DebugAddress) -> Result<DebugAddress, LinkError> {
        let placement = self
            .placements
            .iter()
            .find(|p| p.input_section == addr.section)
            .ok_or_else(|| LinkError::UnplacedSection {
                unit: self.unit,
                section: addr.section.clone(),
            })?;
        let out_of_range = || LinkError::OffsetOutOfRange {
            section: addr.section.clone(),
            offset: addr.offset,
            size: placement.size,
        };
        if !placement.holds_offset(addr.offset) {
            return Err(out_of_range());
        }
        let offset = placement
            .base_offset
            .checked_add(addr.offset)
            .ok_or_else(out_of_range)?;
        Ok(DebugAddress::new(placement.output_section.clone(), offset))
    }

    fn variable(&self, var: &DebugVariable) -> Result<DebugVariable, LinkError> {
        let storage = match &var.storage {
            Storage::Global(addr) => Storage::Global(self.rewrite(addr)?),
            Storage::Frame(off) => Storage::Frame(*off),
        };
        Ok(DebugVariable {
            name: var.name.clone(),
            ty: var.ty.clone(),
            storage,
        })
    }

    fn function(&self, func: &DebugFunction) -> Result<DebugFunction, LinkError> {
        Ok(DebugFunction {
            begin: self.rewrite(&func.begin)?,
            ..func.clone()
        })
    }
}

/// Merge N units into the debug info of the final binary.
///
/// Functions and variables keep one entry per unit even when names collide.
/// Named types are shared: identical definitions collapse to one entry and
/// different definitions under one name abort the link.
pub fn link_debug_info(inputs: &[LinkInput<'_>], outputs: &[OutputSection]) -> Result<DebugInfo, LinkError> {
    let address_size = match inputs.first() {
        Some(first) => first.debug_info.address_size(),
        None => crate::debuginfo::DEFAULT_ADDRESS_SIZE,
    };

    let mut builder = DebugInfoBuilder::new(address_size);
    for out in outputs {
        builder.add(DebugSection::new(out.name.clone(), out.address, out.size));
    }

    let mut types: HashMap<String, DebugType> = HashMap::new();
    let mut type_order: Vec<String> = Vec::new();

    for (unit, input) in inputs.iter().enumerate() {
        let info = input.debug_info;
        if info.address_size() != address_size {
            return Err(LinkError::AddressSizeMismatch(address_size, info.address_size()));
        }
        for p in &input.placements {
            if !outputs.iter().any(|o| o.name == p.output_section) {
                return Err(LinkError::UnknownOutputSection(p.output_section.clone()));
            }
        }
        let reloc = Relocator {
            unit,
            placements: &input.placements,
        };

        for loc in info.locations() {
            builder.add(DebugLocation::new(loc.location.clone(), reloc.rewrite(&loc.address)?));
        }
        for func in info.functions() {
            builder.add(reloc.function(func)?);
        }
        for var in info.variables() {
            builder.add(reloc.variable(var)?);
        }
        for ty in info.types() {
            match types.get(&ty.name) {
                Some(existing) if existing == ty => {}
                Some(_) => return Err(LinkError::ConflictingType(ty.name.clone())),
                None => {
                    types.insert(ty.name.clone(), ty.clone());
                    type_order.push(ty.name.clone());
                }
            }
        }
        debug!(
            "merged unit {}: {} locations, {} functions, {} variables",
            unit,
            info.locations().len(),
            info.functions().len(),
            info.variables().len()
        );
    }

    for name in type_order {
        if let Some(ty) = types.remove(&name) {
            builder.add(ty);
        }
    }

    Ok(builder.build()?)
}
