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

//! Logger setup for the binary. The library itself only uses the `log` macros.

use std::sync::OnceLock;

use anyhow::Result;
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Whether `--debug` was given. False until [`init_logging`] runs.
pub fn is_debug() -> bool {
    *DEBUG_ENABLED.get().unwrap_or(&false)
}

fn default_spec(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Start logging to stderr. `RUST_LOG` overrides the level chosen by `debug`.
/// The returned handle must stay alive for as long as logging is wanted.
pub fn init_logging(debug: bool) -> Result<LoggerHandle> {
    DEBUG_ENABLED.set(debug).ok();
    let handle = Logger::try_with_env_or_str(default_spec(debug))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
        .map_err(|e: FlexiLoggerError| anyhow::anyhow!("cannot start logger: {}", e))?;
    Ok(handle)
}
