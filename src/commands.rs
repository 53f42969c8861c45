//! Line-oriented shell commands. Parsing is pure; [`execute`] maps a command
//! onto the debugger's public operations and formats the result.

use std::io::Write;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;

use crate::debugger::{Debugger, DebuggerState};
use crate::driver::DebugDriver;
use crate::protocol::StopReason;
use crate::utils::{from_hex, parse_address};

const DISASM_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run,
    Step,
    Stop,
    Restart,
    Read { address: u64, length: usize },
    Write { address: u64, data: Vec<u8> },
    SetBreakpoint { file: String, line: u32 },
    ClearBreakpoint { file: String, line: u32 },
    Registers,
    Print(String),
    Info,
    Disasm,
    Help,
    Quit,
    Empty,
    /// A known command with unusable arguments
    Invalid(String),
    Unknown(String),
}

/// What the shell loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// `<a>, <b>` argument pairs
fn pair_pattern() -> &'static Regex {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    PAIR.get_or_init(|| Regex::new(r"^([^,\s]+)\s*,\s*([^,\s]+)$").unwrap())
}

fn pair(args: &str) -> Option<(&str, &str)> {
    let caps = pair_pattern().captures(args)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn location(cmd: &str, args: &str) -> Result<(String, u32), Command> {
    let usage = || Command::Invalid(format!("usage: {} <file>, <line>", cmd));
    let (file, line) = pair(args).ok_or_else(usage)?;
    let line = line.parse::<u32>().map_err(|_| usage())?;
    Ok((file.to_string(), line))
}

pub fn parse(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() || input.starts_with('#') {
        return Command::Empty;
    }
    let (cmd, args) = match input.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (input, ""),
    };

    match cmd {
        "run" | "r" | "continue" | "c" => Command::Run,
        "step" | "s" => Command::Step,
        "stop" => Command::Stop,
        "restart" => Command::Restart,
        "regs" => Command::Registers,
        "info" => Command::Info,
        "disasm" => Command::Disasm,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        "print" | "p" if !args.is_empty() => Command::Print(args.to_string()),
        "print" | "p" => Command::Invalid("usage: print <expr>".into()),
        "read" => {
            let parsed = pair(args).and_then(|(a, n)| Some((parse_address(a)?, n.parse::<usize>().ok()?)));
            match parsed {
                Some((address, length)) => Command::Read { address, length },
                None => Command::Invalid("usage: read <address>, <length>".into()),
            }
        }
        "write" => {
            let parsed = pair(args).and_then(|(a, hex)| Some((parse_address(a)?, from_hex(hex)?)));
            match parsed {
                Some((address, data)) => Command::Write { address, data },
                None => Command::Invalid("usage: write <address>, <hex bytes>".into()),
            }
        }
        "setbrk" | "b" => match location("setbrk", args) {
            Ok((file, line)) => Command::SetBreakpoint { file, line },
            Err(invalid) => invalid,
        },
        "clrbrk" => match location("clrbrk", args) {
            Ok((file, line)) => Command::ClearBreakpoint { file, line },
            Err(invalid) => invalid,
        },
        other => Command::Unknown(other.to_string()),
    }
}

fn hexdump(out: &mut impl Write, address: u64, data: &[u8]) -> std::io::Result<()> {
    for (i, chunk) in data.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        writeln!(out, "0x{:08x}: {}", address + (i * 16) as u64, bytes.join(" "))?;
    }
    Ok(())
}

fn report_stop<D: DebugDriver>(
    dbg: &mut Debugger<D>,
    reason: &StopReason,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "target {}", reason)?;
    if dbg.state() == DebuggerState::Stopped {
        writeln!(out, "at {}", dbg.find_pc()?)?;
    }
    Ok(())
}

const HELP: &str = "\
run                      resume the target
step                     single-step one instruction
stop                     interrupt a running target
restart                  reset to the entry point and run
read <addr>, <len>       dump target memory
write <addr>, <hex>      write bytes to target memory
setbrk <file>, <line>    set a breakpoint
clrbrk <file>, <line>    clear a breakpoint
regs                     list registers
print <expr>             evaluate an expression
info                     show session state
disasm                   dump the bytes at the program counter
quit                     leave the debugger
";

/// Run one command. Errors are the caller's to report; none of them end the
/// session.
pub fn execute<D: DebugDriver>(dbg: &mut Debugger<D>, command: Command, out: &mut impl Write) -> Result<Flow> {
    match command {
        Command::Empty => {}
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => out.write_all(HELP.as_bytes())?,
        Command::Run => {
            let reason = dbg.run()?;
            report_stop(dbg, &reason, out)?;
        }
        Command::Step => {
            let reason = dbg.step()?;
            report_stop(dbg, &reason, out)?;
        }
        Command::Stop => match dbg.stop()? {
            Some(reason) => report_stop(dbg, &reason, out)?,
            None => writeln!(out, "target is not running")?,
        },
        Command::Restart => {
            let reason = dbg.restart()?;
            report_stop(dbg, &reason, out)?;
        }
        Command::Read { address, length } => {
            let data = dbg.read_memory(address, length)?;
            hexdump(out, address, &data)?;
        }
        Command::Write { address, data } => dbg.write_memory(address, &data)?,
        Command::SetBreakpoint { file, line } => {
            let address = dbg.set_breakpoint(&file, line)?;
            writeln!(out, "breakpoint at {}:{} (0x{:08x})", file, line, address)?;
        }
        Command::ClearBreakpoint { file, line } => {
            dbg.clear_breakpoint(&file, line)?;
            writeln!(out, "cleared breakpoint at {}:{}", file, line)?;
        }
        Command::Registers => {
            for (name, value) in dbg.get_registers()?.iter() {
                writeln!(out, "{} : {}", name, value)?;
            }
        }
        Command::Print(source) => {
            let value = dbg.eval(&source)?;
            writeln!(out, "{} = {}", source, value)?;
        }
        Command::Info => {
            writeln!(out, "arch: {}", dbg.arch())?;
            writeln!(out, "state: {}", dbg.state())?;
            match dbg.debug_info() {
                Some(info) => writeln!(
                    out,
                    "symbols: {} functions, {} variables, {} locations",
                    info.functions().len(),
                    info.variables().len(),
                    info.locations().len()
                )?,
                None => writeln!(out, "symbols: none")?,
            }
            if dbg.state() == DebuggerState::Stopped {
                writeln!(out, "pc: {}", dbg.find_pc()?)?;
            }
            for bp in dbg.breakpoints() {
                writeln!(out, "breakpoint: {} (0x{:08x})", bp.location, bp.target_address)?;
            }
        }
        Command::Disasm => {
            let pc = dbg.find_pc()?.pc();
            let data = dbg.read_memory(pc, DISASM_BYTES)?;
            hexdump(out, pc, &data)?;
        }
        Command::Invalid(message) => writeln!(out, "{}", message)?,
        Command::Unknown(name) => writeln!(out, "unknown command '{}', try 'help'", name)?,
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arch;
    use crate::dummy::{DriverCall, DummyDriver};

    fn debugger() -> Debugger<DummyDriver> {
        let mut driver = DummyDriver::new(Arch::arm());
        driver.poke_register("r1", 1);
        driver.poke_register("r2", 1000);
        Debugger::new(driver, Arch::arm())
    }

    fn run(dbg: &mut Debugger<DummyDriver>, line: &str) -> String {
        let mut out = Vec::new();
        execute(dbg, parse(line), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_argument_pairs() {
        assert_eq!(parse("read 100, 16"), Command::Read { address: 100, length: 16 });
        assert_eq!(
            parse("write 100, aabbccdd"),
            Command::Write { address: 100, data: vec![0xaa, 0xbb, 0xcc, 0xdd] }
        );
        assert_eq!(
            parse("setbrk main.c, 3"),
            Command::SetBreakpoint { file: "main.c".into(), line: 3 }
        );
        assert_eq!(
            parse("clrbrk main.c,3"),
            Command::ClearBreakpoint { file: "main.c".into(), line: 3 }
        );
        assert_eq!(parse("read 0x64,4"), Command::Read { address: 0x64, length: 4 });
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(parse("read 100"), Command::Invalid(_)));
        assert!(matches!(parse("write 100, abc"), Command::Invalid(_)));
        assert!(matches!(parse("setbrk main.c, x"), Command::Invalid(_)));
        assert!(matches!(parse("print"), Command::Invalid(_)));
        assert_eq!(parse("frobnicate"), Command::Unknown("frobnicate".into()));
        assert_eq!(parse("   "), Command::Empty);
    }

    #[test]
    fn simple_commands_map_to_driver_calls() {
        let mut dbg = debugger();
        run(&mut dbg, "run");
        run(&mut dbg, "step");
        run(&mut dbg, "restart");
        assert_eq!(
            dbg.driver().calls,
            vec![
                DriverCall::Continue,
                DriverCall::GetRegisters,
                DriverCall::Step,
                DriverCall::GetRegisters,
                DriverCall::Restart,
                DriverCall::Continue,
                DriverCall::GetRegisters,
            ]
        );
    }

    #[test]
    fn memory_commands() {
        let mut dbg = debugger();
        run(&mut dbg, "write 100, aabbccdd");
        let dump = run(&mut dbg, "read 100, 4");
        assert_eq!(dump, "0x00000064: aa bb cc dd\n");
        assert_eq!(
            dbg.driver().calls,
            vec![
                DriverCall::WriteMemory(100, vec![0xaa, 0xbb, 0xcc, 0xdd]),
                DriverCall::ReadMemory(100, 4),
            ]
        );
    }

    #[test]
    fn registers_print_name_and_value() {
        let mut dbg = debugger();
        let out = run(&mut dbg, "regs");
        assert!(out.starts_with("r0 : 0\nr1 : 1\nr2 : 1000\n"));
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut dbg = debugger();
        assert_eq!(execute(&mut dbg, Command::Quit, &mut Vec::new()).unwrap(), Flow::Quit);
        assert_eq!(execute(&mut dbg, Command::Info, &mut Vec::new()).unwrap(), Flow::Continue);
    }
}
