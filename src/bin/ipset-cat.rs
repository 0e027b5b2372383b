//! Reads a binary IP set (format v1) and prints its contents as one address or `addr/mask` per
//! line. `-n`/`--networks` switches to CIDR-summarized output.

use clap::Parser;
use ipset_bdd::engine::Engine;
use ipset_bdd::set::IpSet;
use ipset_bdd::set_iterator::SetIterator;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(name = "ipset-cat")]
#[command(about = "Print the contents of a binary IP set", long_about = None)]
struct Args {
    /// Input file ("-" for stdin)
    #[arg(short = 'i', long = "input", default_value = "-")]
    input: PathBuf,

    /// Output file ("-" for stdout)
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: PathBuf,

    /// Print CIDR network blocks instead of individual addresses
    #[arg(short = 'n', long = "networks")]
    networks: bool,
}

fn open_input(path: &PathBuf) -> io::Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn open_output(path: &PathBuf) -> io::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        Ok(Box::new(File::create(path)?))
    }
}

fn main() {
    let args = Args::parse();
    env_logger::init();

    let display_name = args.input.display().to_string();
    let mut reader = match open_input(&args.input) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("Cannot open file {}:\n  {}", display_name, err);
            process::exit(1);
        }
    };

    let engine = Rc::new(RefCell::new(Engine::new()));
    let set = match IpSet::load(engine, &mut reader) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("Error reading {}:\n  {}", display_name, err);
            process::exit(1);
        }
    };

    let mut writer = match open_output(&args.output) {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("Cannot open output file:\n  {}", err);
            process::exit(1);
        }
    };

    for (addr, netmask) in SetIterator::new(&set, 1, args.networks) {
        let line = if args.networks { format!("{}/{}\n", addr, netmask) } else { format!("{}\n", addr) };
        if let Err(err) = writer.write_all(line.as_bytes()) {
            eprintln!("Cannot write to output file:\n  {}", err);
            process::exit(1);
        }
    }
}
