//! Reads one textual IP address or `addr/mask` per line from one or more input files (or stdin,
//! with `-`) and writes the resulting set in binary format v1.
//!
//! A thin demonstration front-end: all parsing here is `std::net`'s own `FromStr`, not a
//! hand-rolled textual format (that parsing/formatting layer is explicitly out of scope for this
//! crate; see `SPEC_FULL.md` §1).

use clap::Parser;
use ipset_bdd::engine::Engine;
use ipset_bdd::set::IpSet;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(name = "ipset-build")]
#[command(about = "Build a binary IP set from textual addresses/networks", long_about = None)]
struct Args {
    /// Input files, one address or addr/mask per line ("-" for stdin)
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file ("-" for stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

fn open_input(path: &PathBuf) -> io::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn open_output(path: &Option<PathBuf>) -> io::Result<Box<dyn Write>> {
    match path {
        None => Ok(Box::new(io::stdout())),
        Some(p) if p.as_os_str() == "-" => Ok(Box::new(io::stdout())),
        Some(p) => Ok(Box::new(File::create(p)?)),
    }
}

/// Parses one line as an address (host, implicit maximal netmask) or `addr/mask`.
fn parse_line(line: &str) -> Option<(IpAddr, u8)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some((addr, mask)) = line.split_once('/') {
        let netmask: u8 = mask.parse().ok()?;
        let addr: IpAddr = addr.parse().ok()?;
        Some((addr, netmask))
    } else {
        let addr: IpAddr = line.parse().ok()?;
        let netmask = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        Some((addr, netmask))
    }
}

fn main() {
    let args = Args::parse();
    env_logger::init();

    let engine = Rc::new(RefCell::new(Engine::new()));
    let mut set = IpSet::new(engine);

    for path in &args.inputs {
        let display_name = path.display().to_string();
        eprintln!("Opening {}...", display_name);
        let reader = match open_input(path) {
            Ok(reader) => reader,
            Err(err) => {
                eprintln!("Cannot open file {}:\n  {}", display_name, err);
                process::exit(1);
            }
        };

        let mut count = 0u64;
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    eprintln!("Error reading from {}:\n  {}", display_name, err);
                    process::exit(1);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Some((IpAddr::V4(addr), mask)) => {
                    set.add_v4(addr, mask);
                    count += 1;
                }
                Some((IpAddr::V6(addr), mask)) => {
                    set.add_v6(addr, mask);
                    count += 1;
                }
                None => {
                    eprintln!("\"{}\" is not a valid IP address or network.", line);
                    process::exit(1);
                }
            }
        }
        eprintln!("Read {} entries from {}.", count, display_name);
    }

    eprintln!("Set uses {} bytes of memory.", set.memory_size());

    let mut writer = match open_output(&args.output) {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("Cannot open output file:\n  {}", err);
            process::exit(1);
        }
    };
    if let Err(err) = set.save(&mut writer) {
        eprintln!("Error saving IP set:\n  {}", err);
        process::exit(1);
    }
}
