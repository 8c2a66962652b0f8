//! Typed argument resolution and subcommand dispatch.
//!
//! A program builds a tree of [`Command`]s, registers typed [`Parameter`]s
//! on them, then hands the raw argument list to
//! [`Command::parse_and_execute`]. The result is always a [`Message`]:
//! `NoError` after the selected command ran, or the first error found.
//!
//! The engine never prints. Rendering a failed [`Message`] is up to the
//! caller; [`Message::plain_text`] gives the text without color markup.

pub mod command;
pub mod error;
pub mod message;
pub mod parameter;
pub mod parsers;
pub mod tokenizer;
pub mod validator;

pub use command::{Command, Param, ParameterSet};
pub use error::ConfigError;
pub use message::{Alternative, ArgumentKind, Message, escape_markup, strip_markup};
pub use parameter::{ArrayParameter, Parameter, Required};
pub use parsers::{EnumValue, Parser, ParserRegistry, Parses, enum_parser, from_str_parser};
pub use tokenizer::{Argument, ArgumentStack, split_command_line, tokenize};
pub use validator::Validator;
