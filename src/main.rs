use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use target_debug::commands::{self, Flow};
use target_debug::dummy::DummyDriver;
use target_debug::logging::{init_logging, is_debug};
use target_debug::serialize::read_debug_info;
use target_debug::transport::{AckMode, PacketTransport};
use target_debug::{Arch, DebugDriver, DebugInfo, Debugger, GdbDriver};

/// Source-level debugger for targets behind a remote stub
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Remote stub address (host:port). Without it, an in-memory target is used
    #[arg(short = 'r', long = "remote")]
    remote: Option<String>,

    /// Debug information of the program, in serialized form
    #[arg(short = 's', long = "symbols")]
    symbols: Option<PathBuf>,

    /// Target architecture
    #[arg(short = 'a', long = "arch", default_value = "arm")]
    arch: Arch,

    /// Socket read timeout in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Do not acknowledge received packets
    #[arg(long = "no-ack", default_value_t = false)]
    no_ack: bool,

    /// Enable debug output
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,
}

fn load_symbols(path: &Path) -> Result<DebugInfo> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let info = read_debug_info(&mut BufReader::new(file))
        .with_context(|| format!("cannot read debug info from {}", path.display()))?;
    Ok(info)
}

fn session<D: DebugDriver>(dbg: &mut Debugger<D>, symbols: Option<DebugInfo>) -> Result<()> {
    if let Some(info) = symbols {
        dbg.load_symbols(info);
    }
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "(dbg) ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match commands::execute(dbg, commands::parse(&line), &mut stdout) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) if is_debug() => eprintln!("error: {:?}", err),
            Err(err) => eprintln!("error: {:#}", err),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = init_logging(args.debug)?;

    let symbols = args.symbols.as_deref().map(load_symbols).transpose()?;

    match &args.remote {
        Some(addr) => {
            let timeout = args.timeout_ms.map(Duration::from_millis);
            let ack = if args.no_ack { AckMode::NoAck } else { AckMode::Ack };
            let transport = PacketTransport::connect(addr.as_str(), timeout)
                .with_context(|| format!("cannot connect to {}", addr))?
                .with_ack_mode(ack);
            let mut driver = GdbDriver::new(transport, args.arch.clone());
            match driver.query_halt_reason() {
                Ok(reason) => info!("connected to {}: target {}", addr, reason),
                Err(err) => warn!("connected to {}, halt reason unavailable: {}", addr, err),
            }
            let mut dbg = Debugger::new(driver, args.arch);
            session(&mut dbg, symbols)?;
            if let Err(err) = dbg.into_driver().detach() {
                warn!("detach failed: {}", err);
            }
        }
        None => {
            info!("no remote given, using the in-memory target");
            let mut dbg = Debugger::new(DummyDriver::new(args.arch.clone()), args.arch);
            session(&mut dbg, symbols)?;
        }
    }
    Ok(())
}
