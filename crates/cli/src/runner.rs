use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use argtree::tokenizer::is_parameter_key;
use argtree::{Command, ConfigError, ParserRegistry, split_command_line};
use argtree_metadata::help;

use crate::config::ReplConfig;
use crate::demo::{PROGRAM, Session};

const HELP_FLAGS: [&str; 2] = ["-h", "--help"];

/// Subcommand path whose help was asked for, if any.
///
/// `help build` and `build --help` both yield `["build"]`. Help flags after
/// `--` are plain values.
fn help_path(args: &[String]) -> Option<Vec<&str>> {
    if args.first().is_some_and(|a| a == "help") {
        return Some(args[1..].iter().map(String::as_str).collect());
    }
    let at = args
        .iter()
        .take_while(|a| *a != "--")
        .position(|a| HELP_FLAGS.contains(&a.as_str()))?;
    Some(
        args[..at]
            .iter()
            .map(String::as_str)
            .take_while(|a| !is_parameter_key(a))
            .collect(),
    )
}

/// Run one invocation and render its result to `out`.
///
/// Returns whether the command succeeded.
pub fn run_command<W: Write>(
    command: &mut Command,
    registry: &ParserRegistry,
    session: &Session,
    args: &[String],
    out: &mut W,
) -> io::Result<bool> {
    if let Some(path) = help_path(args) {
        let schema = command.schema(PROGRAM);
        return match schema.find(&path) {
            Some(found) => {
                let mut invocation = vec![PROGRAM];
                invocation.extend(&path);
                write!(out, "{}", help(found, &invocation.join(" ")))?;
                Ok(true)
            }
            None => {
                writeln!(out, "No help is available for `{}`.", path.join(" "))?;
                Ok(false)
            }
        };
    }

    tracing::debug!(?args, "running command");
    let msg = command.parse_and_execute_with(registry, args.iter().cloned());
    out.write_all(session.take_output().as_bytes())?;
    if msg.is_error() {
        tracing::debug!(?msg, "command failed");
        writeln!(out, "{}", msg.plain_text())?;
        return Ok(false);
    }
    Ok(true)
}

/// Read lines from `input` until EOF or the exit word, running each one
/// against a freshly built tree.
pub fn run_repl<F, R, W>(
    mut factory: F,
    registry: &ParserRegistry,
    config: &ReplConfig,
    mut input: R,
    out: &mut W,
) -> Result<()>
where
    F: FnMut(&Session) -> Result<Command, ConfigError>,
    R: BufRead,
    W: Write,
{
    tracing::debug!("entering REPL");
    loop {
        write!(out, "{}", config.prompt)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            writeln!(out)?;
            break;
        }
        let line = line.trim();
        if line == config.exit {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let session = Session::default();
        let mut command = factory(&session).context("failed to build the command tree")?;
        run_command(
            &mut command,
            registry,
            &session,
            &split_command_line(line),
            out,
        )?;
        writeln!(out)?;
    }
    Ok(())
}
