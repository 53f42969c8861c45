use serde::{Deserialize, Serialize};

/// A section of the object that owns a debug-info model. Units coming out of
/// the front end carry their sections at address 0; after linking, each merged
/// output section carries its final load address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSection {
    pub name: String,
    pub address: u64,
    pub size: u64,
}

impl DebugSection {
    pub fn new(name: impl Into<String>, address: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            address,
            size,
        }
    }

    /// True when the absolute address falls inside the loaded section.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.address && addr - self.address < self.size
    }

    /// False when the section would wrap past the top of the address space.
    /// A section may end exactly at the top.
    pub fn fits_address_space(&self) -> bool {
        self.size == 0 || self.address.checked_add(self.size - 1).is_some()
    }
}
