use clap::Parser;
use team_hours::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = team_hours::cli::run(cli) {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
