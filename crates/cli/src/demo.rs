//! The command tree served by the `argtree` binary.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use argtree::{
    ArrayParameter, Command, ConfigError, EnumValue, Parameter, ParameterSet, ParserRegistry,
};
use argtree_metadata::{SchemaDocument, help};

pub const PROGRAM: &str = "argtree";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Debug,
    Release,
}

impl EnumValue for Mode {
    fn variants() -> &'static [(&'static str, Self)] {
        &[("debug", Mode::Debug), ("release", Mode::Release)]
    }
}

/// Built-in parsers plus the demo's own types.
pub fn registry() -> ParserRegistry {
    let mut registry = ParserRegistry::with_builtins();
    registry.register_enum::<Mode>();
    registry
}

/// State shared between the tree's actions and the runner.
#[derive(Debug, Clone, Default)]
pub struct Session {
    output: Rc<RefCell<String>>,
    repl: Rc<Cell<bool>>,
}

impl Session {
    pub fn line(&self, text: impl AsRef<str>) {
        let mut output = self.output.borrow_mut();
        output.push_str(text.as_ref());
        output.push('\n');
    }

    /// Text written by actions since the last call.
    pub fn take_output(&self) -> String {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    pub fn repl_requested(&self) -> bool {
        self.repl.get()
    }
}

/// Build the demo tree.
///
/// `interactive` trees are used inside the REPL and have no `repl`
/// subcommand.
pub fn tree(session: &Session, interactive: bool) -> Result<Command, ConfigError> {
    let mut root = Command::new().with_description("Demo program for the argtree engine");

    add_build(&mut root, session)?;
    add_greet(&mut root, session)?;
    root.add_subcommand(
        "schema",
        Command::new().with_description("Print the command tree as JSON"),
    )?;
    if !interactive {
        let repl = Rc::clone(&session.repl);
        root.add_subcommand(
            "repl",
            Command::action(move || repl.set(true))
                .with_description("Read commands from standard input"),
        )?;
    }

    let schema = root.schema(PROGRAM);
    let usage = help(&schema, PROGRAM);
    let json = SchemaDocument::new(schema)
        .to_json_pretty()
        .unwrap_or_else(|err| format!("{{\"error\": \"{err}\"}}"));

    let out = session.clone();
    root.on_execute(move |_| out.line(usage.trim_end()));
    if let Some(schema) = root.subcommand_mut("schema") {
        let out = session.clone();
        schema.on_execute(move |_| out.line(&json));
    }

    Ok(root)
}

fn add_build(root: &mut Command, session: &Session) -> Result<(), ConfigError> {
    let build = root.add_subcommand(
        "build",
        Command::new().with_description("Pretend to build a target"),
    )?;

    let target = build.add(
        Parameter::<String>::new("--target")
            .alias("-t")
            .description("Target name")
            .required()
            .validate_regex_with(
                r"^[A-Za-z0-9_.\-]+$",
                "The target may only contain letters, digits, '_', '.' and '-'.",
            )?,
    )?;
    let flags = build.add(
        ArrayParameter::<String>::array("--flag")
            .alias("-f")
            .description("Extra build flags"),
    )?;
    let jobs = build.add(
        Parameter::<u8>::new("--jobs")
            .alias("-j")
            .description("Parallel jobs")
            .default_value(1)
            .validate_if(|n| *n > 0, "The [Yellow:--jobs] value must be at least 1."),
    )?;
    let mode = build.add(
        Parameter::with_value("--mode", Mode::Debug)
            .alias("-m")
            .description("Build profile (debug or release)")
            .default_value(Mode::Debug)
            .ignore_case(),
    )?;

    let out = session.clone();
    build.on_execute(move |params: &ParameterSet| {
        let (Some(target), Some(jobs), Some(mode)) =
            (params.get(target), params.get(jobs), params.get(mode))
        else {
            return;
        };
        let mode = match mode {
            Mode::Debug => "debug",
            Mode::Release => "release",
        };
        out.line(format!("Building {target} ({mode}, {jobs} job(s))"));
        if let Some(flags) = params.get(flags).filter(|f| !f.is_empty()) {
            out.line(format!("Flags: {}", flags.join(" ")));
        }
    });
    Ok(())
}

fn add_greet(root: &mut Command, session: &Session) -> Result<(), ConfigError> {
    let greet = root.add_subcommand("greet", Command::new().with_description("Say hello"))?;

    let names = greet.add_no_name(
        ArrayParameter::<String>::array("names")
            .description("People to greet")
            .validate_each_if(
                |name| name.chars().all(char::is_alphabetic),
                "Names may only contain letters.",
            ),
    )?;
    let shout = greet.add(
        Parameter::flag("--shout")
            .alias("-s")
            .description("Greet in upper case"),
    )?;

    let out = session.clone();
    greet.on_execute(move |params: &ParameterSet| {
        let shout = params.get(shout).copied().unwrap_or(false);
        let names = params.get(names).cloned().unwrap_or_default();
        let names = if names.is_empty() {
            vec!["world".to_string()]
        } else {
            names
        };
        for name in names {
            let text = format!("Hello, {name}!");
            out.line(if shout { text.to_uppercase() } else { text });
        }
    });
    Ok(())
}
