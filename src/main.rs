use clap::Parser;
use crossbot::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
