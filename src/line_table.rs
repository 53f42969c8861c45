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

use std::collections::BTreeMap;

use crate::debuginfo::DebugLocation;
use crate::utils::canonicalize_path;

/// Interns canonical source paths to small ids.
#[derive(Debug, Default)]
pub struct FileTable {
    id_by_file: BTreeMap<String, u32>,
    next_id: u32,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            id_by_file: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn intern(&mut self, path: &str) -> u32 {
        let fp = canonicalize_path(path);
        if let Some(&id) = self.id_by_file.get(&fp) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.id_by_file.insert(fp, id);
        id
    }

    pub fn get_by_path(&self, path: &str) -> Option<u32> {
        if let Some(&id) = self.id_by_file.get(path) {
            return Some(id);
        }
        self.id_by_file.get(&canonicalize_path(path)).copied()
    }
}

/// Reverse index from (file, line) to the locations recorded for that line,
/// kept in the order the debug info lists them.
#[derive(Debug, Default)]
pub struct LineTable {
    files: FileTable,
    lines: BTreeMap<u32, BTreeMap<u32, Vec<usize>>>,
}

impl LineTable {
    pub fn from_locations(locations: &[DebugLocation]) -> Self {
        let mut table = Self {
            files: FileTable::new(),
            lines: BTreeMap::new(),
        };
        for (i, loc) in locations.iter().enumerate() {
            let file_id = table.files.intern(&loc.location.filename);
            table
                .lines
                .entry(file_id)
                .or_default()
                .entry(loc.location.line)
                .or_default()
                .push(i);
        }
        table
    }

    /// Index of the first location on the first mapped line at or after `line`
    /// in `file`.
    pub fn find(&self, file: &str, line: u32) -> Option<usize> {
        let file_id = self.files.get_by_path(file)?;
        self.lines
            .get(&file_id)?
            .range(line..)
            .next()
            .and_then(|(_, locs)| locs.first().copied())
    }

    pub fn file_count(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debuginfo::{DebugAddress, SourceLocation};

    fn loc(file: &str, line: u32, offset: u64) -> DebugLocation {
        DebugLocation::new(
            SourceLocation::new(file, line, 1, 1),
            DebugAddress::new("code", offset),
        )
    }

    #[test]
    fn finds_exact_then_next_line() {
        let locs = vec![
            loc("main.c", 3, 0x10),
            loc("main.c", 3, 0x14),
            loc("main.c", 7, 0x20),
            loc("util.c", 4, 0x40),
        ];
        let table = LineTable::from_locations(&locs);
        assert_eq!(table.file_count(), 2);
        assert_eq!(table.find("main.c", 3), Some(0));
        assert_eq!(table.find("main.c", 4), Some(2));
        assert_eq!(table.find("main.c", 8), None);
        assert_eq!(table.find("util.c", 1), Some(3));
        assert_eq!(table.find("other.c", 3), None);
    }

    #[test]
    fn file_ids_are_stable() {
        let mut files = FileTable::new();
        let a = files.intern("a.c");
        assert_eq!(files.intern("./a.c"), a);
        assert_ne!(files.intern("b.c"), a);
        assert_eq!(files.get_by_path("a.c"), Some(a));
    }
}
