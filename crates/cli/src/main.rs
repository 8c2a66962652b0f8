mod config;
mod demo;
mod runner;

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::ReplConfig;
use crate::demo::Session;

fn main() -> Result<ExitCode> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let registry = demo::registry();
    let session = Session::default();
    let mut command = demo::tree(&session, false).context("failed to build the command tree")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let ok = runner::run_command(&mut command, &registry, &session, &args, &mut out)?;

    if ok && session.repl_requested() {
        let config = ReplConfig::load()?;
        let stdin = io::stdin();
        runner::run_repl(
            |session| demo::tree(session, true),
            &registry,
            &config,
            stdin.lock(),
            &mut out,
        )?;
    }
    out.flush()?;

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}
