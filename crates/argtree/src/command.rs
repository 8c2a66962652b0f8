//! Command trees and the resolution state machine.

use std::fmt;
use std::marker::PhantomData;

use argtree_metadata::CommandSchema;
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::ConfigError;
use crate::message::{Alternative, ArgumentKind, Message};
use crate::parameter::{DynParameter, Parameter};
use crate::parsers::ParserRegistry;
use crate::tokenizer::{ArgumentStack, is_parameter_key, split_command_line, tokenize};

/// Typed handle to a parameter registered on a [`Command`].
pub struct Param<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Param<T> {}

impl<T> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Param").field(&self.index).finish()
    }
}

/// The parameters of one command, with the key table pointing into them.
#[derive(Default)]
pub struct ParameterSet {
    parameters: Vec<Box<dyn DynParameter>>,
    aliases: IndexMap<String, usize>,
    no_name: Option<usize>,
}

impl ParameterSet {
    fn insert<T>(&mut self, parameter: Parameter<T>, no_name: bool) -> Result<Param<T>, ConfigError>
    where
        T: Clone + fmt::Debug + 'static,
    {
        if let Some(err) = parameter.setup_error() {
            return Err(err.clone());
        }
        if no_name && let Some(existing) = self.no_name {
            return Err(ConfigError::DuplicateNoName {
                existing: self.parameters[existing].name().to_string(),
            });
        }

        let mut keys: Vec<String> = Vec::new();
        if !no_name {
            keys.push(parameter.name().to_string());
        }
        keys.extend(parameter.alternatives().iter().cloned());

        for (i, key) in keys.iter().enumerate() {
            if !is_parameter_key(key) {
                return Err(ConfigError::InvalidAlias {
                    alias: key.clone(),
                    parameter: parameter.name().to_string(),
                });
            }
            if let Some(&owner) = self.aliases.get(key) {
                return Err(ConfigError::DuplicateAlias {
                    alias: key.clone(),
                    existing: self.parameters[owner].name().to_string(),
                });
            }
            if keys[..i].contains(key) {
                return Err(ConfigError::DuplicateAlias {
                    alias: key.clone(),
                    existing: parameter.name().to_string(),
                });
            }
        }

        let index = self.parameters.len();
        for key in keys {
            self.aliases.insert(key, index);
        }
        if no_name {
            self.no_name = Some(index);
        }
        self.parameters.push(Box::new(parameter));

        Ok(Param {
            index,
            _marker: PhantomData,
        })
    }

    /// The registered parameter behind `param`.
    pub fn parameter<T: 'static>(&self, param: Param<T>) -> Option<&Parameter<T>> {
        self.parameters
            .get(param.index)?
            .as_any()
            .downcast_ref::<Parameter<T>>()
    }

    /// Current value of a parameter, whether parsed or default.
    pub fn get<T: 'static>(&self, param: Param<T>) -> Option<&T> {
        self.parameter(param).map(Parameter::value)
    }

    pub fn is_set<T: 'static>(&self, param: Param<T>) -> bool {
        self.parameter(param).is_some_and(Parameter::is_set)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn has_no_name(&self) -> bool {
        self.no_name.is_some()
    }

    /// One `name[type] = value` line per parameter, in declaration order.
    pub fn summary(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.summary()).collect()
    }

    fn lookup(&self, key: &str) -> Option<usize> {
        self.aliases.get(key).copied()
    }

    fn keys_of(&self, index: usize) -> Vec<String> {
        self.aliases
            .iter()
            .filter(|(_, owner)| **owner == index)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn alternatives(&self) -> Vec<Alternative> {
        (0..self.parameters.len())
            .filter_map(|index| {
                let names = self.keys_of(index);
                if names.is_empty() {
                    return None;
                }
                let description = self.parameters[index].description();
                let description = (!description.is_empty()).then(|| description.to_string());
                Some(Alternative::new(names, description))
            })
            .collect()
    }

    fn required(&self) -> Vec<usize> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_required())
            .map(|(index, _)| index)
            .collect()
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSet")
            .field("parameters", &self.summary())
            .field("no_name", &self.no_name)
            .finish()
    }
}

type Hook = Box<dyn Fn(&ParameterSet) -> Message>;
type Action = Box<dyn FnMut(&ParameterSet)>;

/// A node of the command tree.
///
/// ```
/// use argtree::{Command, Message, Parameter};
///
/// let mut root = Command::new();
/// let build = root.add_subcommand("build", Command::new()).unwrap();
/// let target = build
///     .add(Parameter::<String>::new("--target").alias("-t").required())
///     .unwrap();
/// build.on_execute(move |params| {
///     assert_eq!(params.get(target).map(String::as_str), Some("x64"));
/// });
///
/// assert_eq!(root.parse_and_execute(["build", "-t", "x64"]), Message::NoError);
/// ```
#[derive(Default)]
pub struct Command {
    description: String,
    parameters: ParameterSet,
    subcommands: IndexMap<String, Command>,
    validate_start: Option<Hook>,
    validate: Option<Hook>,
    execute: Option<Action>,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    /// A leaf command that only runs `action`.
    pub fn action(mut action: impl FnMut() + 'static) -> Self {
        let mut command = Self::new();
        command.on_execute(move |_| action());
        command
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Register a keyed parameter under its name and aliases.
    pub fn add<T>(&mut self, parameter: Parameter<T>) -> Result<Param<T>, ConfigError>
    where
        T: Clone + fmt::Debug + 'static,
    {
        self.parameters.insert(parameter, false)
    }

    /// Register the parameter that receives untagged values.
    ///
    /// Its name is only used for messages and help; aliases still work as
    /// keys.
    pub fn add_no_name<T>(&mut self, parameter: Parameter<T>) -> Result<Param<T>, ConfigError>
    where
        T: Clone + fmt::Debug + 'static,
    {
        if !self.subcommands.is_empty() {
            return Err(ConfigError::NoNameWithSubcommands);
        }
        self.parameters.insert(parameter, true)
    }

    pub fn add_subcommand(
        &mut self,
        name: impl Into<String>,
        command: Command,
    ) -> Result<&mut Command, ConfigError> {
        let name = name.into();
        if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidSubcommandName(name));
        }
        if self.parameters.has_no_name() {
            return Err(ConfigError::NoNameWithSubcommands);
        }
        match self.subcommands.entry(name) {
            Entry::Occupied(entry) => Err(ConfigError::DuplicateSubcommand(entry.key().clone())),
            Entry::Vacant(entry) => Ok(entry.insert(command)),
        }
    }

    pub fn add_action(
        &mut self,
        name: impl Into<String>,
        action: impl FnMut() + 'static,
    ) -> Result<&mut Command, ConfigError> {
        self.add_subcommand(name, Command::action(action))
    }

    /// Runs before any parameter is consumed; an error aborts the parse.
    pub fn on_validate_start(
        &mut self,
        hook: impl Fn(&ParameterSet) -> Message + 'static,
    ) -> &mut Self {
        self.validate_start = Some(Box::new(hook));
        self
    }

    /// Cross-parameter check, run after the required check.
    pub fn on_validate(&mut self, hook: impl Fn(&ParameterSet) -> Message + 'static) -> &mut Self {
        self.validate = Some(Box::new(hook));
        self
    }

    pub fn on_execute(&mut self, action: impl FnMut(&ParameterSet) + 'static) -> &mut Self {
        self.execute = Some(Box::new(action));
        self
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn subcommand(&self, name: &str) -> Option<&Command> {
        self.subcommands.get(name)
    }

    pub fn subcommand_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.subcommands.get_mut(name)
    }

    pub fn subcommand_names(&self) -> impl Iterator<Item = &str> {
        self.subcommands.keys().map(String::as_str)
    }

    /// Parse `args` with the built-in parsers and run the selected command.
    pub fn parse_and_execute<I, S>(&mut self, args: I) -> Message
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse_and_execute_with(ParserRegistry::builtin(), args)
    }

    pub fn parse_and_execute_with<I, S>(&mut self, registry: &ParserRegistry, args: I) -> Message
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stack = ArgumentStack::new(tokenize(args));
        self.resolve(&mut stack, registry)
    }

    /// Split a free-text line and parse it.
    pub fn parse_and_execute_str(&mut self, input: &str) -> Message {
        self.parse_and_execute(split_command_line(input))
    }

    /// Serializable snapshot of this command and its subtree.
    pub fn schema(&self, name: impl Into<String>) -> CommandSchema {
        CommandSchema {
            name: name.into(),
            description: self.description.clone(),
            parameters: self
                .parameters
                .parameters
                .iter()
                .enumerate()
                .map(|(index, p)| p.schema(self.parameters.no_name == Some(index)))
                .collect(),
            subcommands: self
                .subcommands
                .iter()
                .map(|(name, command)| command.schema(name.as_str()))
                .collect(),
        }
    }

    fn resolve(&mut self, stack: &mut ArgumentStack, registry: &ParserRegistry) -> Message {
        if !self.subcommands.is_empty()
            && let Some(argument) = stack.pop_if(|a| !a.is_parameter())
        {
            let (name, _) = argument.into_parts();
            return match self.subcommands.get_mut(&name) {
                Some(subcommand) => {
                    tracing::debug!(subcommand = %name, "descending into subcommand");
                    subcommand.resolve(stack, registry)
                }
                None => {
                    tracing::debug!(token = %name, "unknown subcommand");
                    Message::UnknownArgument {
                        kind: ArgumentKind::SubCommand,
                        token: name,
                        alternatives: self
                            .subcommands
                            .keys()
                            .map(|k| Alternative::new(vec![k.clone()], None))
                            .collect(),
                    }
                }
            };
        }

        if let Some(hook) = &self.validate_start {
            let msg = hook(&self.parameters);
            if msg.is_error() {
                tracing::debug!("start validation rejected the command");
                return msg;
            }
        }

        let mut required = self.parameters.required();

        while let Some(argument) = stack.pop() {
            let (index, values) = if argument.is_parameter() {
                let (key, values) = argument.into_parts();
                match self.parameters.lookup(&key) {
                    Some(index) => (index, values),
                    None => return self.unknown_parameter(key),
                }
            } else if let Some(index) = self.parameters.no_name {
                let (first, rest) = argument.into_parts();
                let mut values = vec![first];
                values.extend(rest);
                while let Some(next) = stack.pop_if(|a| !a.is_parameter()) {
                    let (value, rest) = next.into_parts();
                    values.push(value);
                    values.extend(rest);
                }
                (index, values)
            } else {
                let (key, _) = argument.into_parts();
                return self.unknown_parameter(key);
            };

            required.retain(|&r| r != index);
            let parameter = &mut self.parameters.parameters[index];
            tracing::trace!(parameter = parameter.name(), ?values, "handling parameter");
            let msg = parameter.handle(&values, registry);
            if msg.is_error() {
                tracing::debug!(parameter = parameter.name(), "parameter rejected its values");
                return msg;
            }
        }

        if let Some(&missing) = required.first() {
            let parameter = &self.parameters.parameters[missing];
            tracing::debug!(parameter = parameter.name(), "required parameter missing");
            return parameter.required_message();
        }

        if let Some(hook) = &self.validate {
            let msg = hook(&self.parameters);
            if msg.is_error() {
                return msg;
            }
        }

        if let Some(action) = self.execute.as_mut() {
            action(&self.parameters);
        }
        Message::NoError
    }

    fn unknown_parameter(&self, token: String) -> Message {
        tracing::debug!(token = %token, "unknown parameter");
        Message::UnknownArgument {
            kind: ArgumentKind::Parameter,
            token,
            alternatives: self.parameters.alternatives(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("subcommands", &self.subcommands)
            .finish_non_exhaustive()
    }
}
