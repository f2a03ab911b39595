use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mailseal::adapters::keyring::directory::KeyDirectory;
use mailseal::config::AgentPaths;
use mailseal::service::facade::Facade;
use mailseal::service::server;

/// Mail encryption agent speaking JSON over stdin and stdout.
#[derive(Parser, Debug)]
#[command(name = "mailseald", version, about)]
struct Cli {
    /// Serve the request protocol on stdin and stdout.
    #[arg(long)]
    pipe: bool,

    /// Log at debug level, including request and response traffic.
    #[arg(long)]
    debug: bool,

    /// Agent state directory (defaults to ~/.mailseal).
    #[arg(long, env = "MAILSEAL_HOME")]
    home: Option<PathBuf>,
}

fn main() {
    let args = Cli::parse();
    if let Err(e) = run(&args) {
        eprintln!("mailseald: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Cli) -> mailseal::core::errors::Result<()> {
    if !args.pipe {
        eprintln!("mailseald only serves on a pipe; pass --pipe");
        std::process::exit(2);
    }

    let paths = AgentPaths::resolve(args.home.as_deref())?;
    paths.ensure()?;
    init_logging(&paths, args.debug)?;
    tracing::info!(home = %paths.home.display(), "starting");

    let directory = Arc::new(KeyDirectory::new(&paths));
    directory.load()?;

    let facade = Facade::new(directory);
    let stdin = io::stdin();
    let stdout = io::stdout();
    server::serve(&facade, stdin.lock(), stdout.lock())
}

/// Logs go to a file in the agent directory; stdout belongs to the
/// protocol and must stay clean.
fn init_logging(paths: &AgentPaths, debug: bool) -> mailseal::core::errors::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_file)?;
    let writer = Mutex::new(file);

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(())
}
