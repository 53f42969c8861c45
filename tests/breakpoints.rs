mod common;

use common::{session, CODE_BASE};
use target_debug::debuginfo::DebugAddress;
use target_debug::dummy::DriverCall;
use target_debug::{DebuggerError, PcLookup, SymbolError};

#[test]
fn set_breakpoint_issues_exactly_one_driver_call() {
    let mut dbg = session();
    let address = dbg.set_breakpoint("main.c", 3).unwrap();
    assert_eq!(address, CODE_BASE + 0x04);
    assert_eq!(dbg.driver().calls, vec![DriverCall::SetBreakpoint(CODE_BASE + 0x04)]);

    let bp = dbg.breakpoints().next().unwrap();
    assert_eq!(bp.address, DebugAddress::new("code", 0x04));
    assert_eq!(bp.location.line, 3);
}

#[test]
fn unmapped_line_has_no_code() {
    let mut dbg = session();
    let err = dbg.set_breakpoint("main.c", 42).unwrap_err();
    assert!(matches!(
        err,
        DebuggerError::Symbol(SymbolError::NoCodeAtLocation { ref file, line: 42 }) if file == "main.c"
    ));
    assert_eq!(err.to_string(), "no code at main.c:42");
    assert!(dbg.driver().calls.is_empty());

    assert!(matches!(
        dbg.set_breakpoint("nowhere.c", 3),
        Err(DebuggerError::Symbol(SymbolError::NoCodeAtLocation { .. }))
    ));
}

#[test]
fn line_without_code_resolves_to_next_mapped_line() {
    let mut dbg = session();
    assert_eq!(dbg.find_address("main.c", 4), Some(DebugAddress::new("code", 0x10)));
    assert_eq!(dbg.set_breakpoint("main.c", 6).unwrap(), CODE_BASE + 0x24);
}

#[test]
fn hitting_a_breakpoint_reports_its_location() {
    let mut dbg = session();
    dbg.set_breakpoint("main.c", 9).unwrap();
    dbg.driver_mut().poke_register("pc", CODE_BASE + 0x24);
    dbg.run().unwrap();
    match dbg.find_pc().unwrap() {
        PcLookup::Mapped {
            function, location, ..
        } => {
            assert_eq!(function.as_deref(), Some("sum"));
            assert_eq!(location.map(|l| l.line), Some(9));
        }
        other => panic!("unexpected {:?}", other),
    }
}
