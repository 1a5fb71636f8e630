use clap::Parser;
use fsmscan::Cli;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = cli.run() {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}
