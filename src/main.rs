use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use vterm::locations::default_data_dir;
use vterm::log::init_logging;
use vterm::{Result, Storage, Terminal};

// Allow the binary to return its version with a --version flag
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
struct Opts {
    #[clap(short, long)]
    version: bool,
    #[clap(short, long)]
    debug: bool,
    #[clap(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();
    if opts.version {
        println!("{}", VERSION);
        return Ok(());
    }
    let data_dir = opts.data_dir.unwrap_or_else(default_data_dir);
    let _guard = init_logging(&data_dir, opts.debug);
    let storage = Storage::open(data_dir.join("db"))?;
    let mut terminal = Terminal::load(storage)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("{}", terminal.prompt());
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        for result in terminal.process_line(&line) {
            for text in result.output {
                println!("{}", text);
            }
        }
        print!("{}", terminal.prompt());
        stdout.flush()?;
    }
    println!();
    Ok(())
}
