//! `subc` binary entry point.

use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use subc::driver::cli::Args;
use subc::driver::session::CompileSession;

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if args.verbose { "info" } else { "warn" })
        }))
        .with_target(false)
        .without_time()
        .init();

    let session = CompileSession::new(&args.source, args.verbose);
    match session.compile(&args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}
