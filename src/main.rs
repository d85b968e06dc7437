use clap::Parser;
use tracing_subscriber::EnvFilter;

fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() {
    let cli = apisim::cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apisim={}", level(cli.verbose))));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = apisim::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
