// Crate root: declare modules and control visibility
pub mod arch;
pub mod commands;
pub mod debugger;
pub mod debuginfo;
pub mod driver;
pub mod dummy;
pub mod error;
pub mod eval;
pub mod expr;
pub mod line_table;
pub mod link;
pub mod logging;
pub mod protocol;
pub mod section;
pub mod serialize;
pub mod transport;
pub mod utils;

// Re-export commonly used API from the library for binaries/tests
pub use arch::Arch;
pub use debugger::{Debugger, DebuggerState, PcLookup};
pub use debuginfo::{DebugAddress, DebugInfo, DebugInfoBuilder};
pub use driver::{DebugDriver, GdbDriver};
pub use error::{DebuggerError, LinkError, ProtocolError, SymbolError};
