//! The result carrier returned by every parsing stage.
//!
//! Message text uses a small color markup, `[Color:text]`, that renderers
//! may turn into terminal colors. [`Message::plain_text`] strips it.
//! Text taken from user input is passed through [`escape_markup`] first,
//! so `\[`, `\]` and `\\` stand for literal characters.

use std::fmt;

use crate::error::ConfigError;

/// Which lookup table an unrecognized token was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    SubCommand,
    Parameter,
}

/// A suggestion attached to [`Message::UnknownArgument`].
///
/// All keys of one parameter are grouped into a single alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub names: Vec<String>,
    pub description: Option<String>,
}

impl Alternative {
    pub fn new(names: Vec<String>, description: Option<String>) -> Self {
        Self { names, description }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NoError,
    UnknownArgument {
        kind: ArgumentKind,
        token: String,
        alternatives: Vec<Alternative>,
    },
    TypeError {
        parameter: String,
        type_name: String,
        raw_value: String,
    },
    /// Caller-supplied text, usually produced by a validator.
    ValidationError(String),
    RequiredMissing {
        parameter: String,
        /// Replaces the default wording when set.
        text: Option<String>,
    },
    /// A scalar parameter received no value or more than one.
    ArgumentCount { parameter: String, found: usize },
    /// The command tree is broken; not caused by user input.
    Misconfigured(ConfigError),
}

impl Message {
    pub fn is_error(&self) -> bool {
        !matches!(self, Message::NoError)
    }

    pub fn validation(text: impl Into<String>) -> Self {
        Message::ValidationError(text.into())
    }

    pub fn type_error(
        parameter: impl Into<String>,
        type_name: impl Into<String>,
        raw_value: impl Into<String>,
    ) -> Self {
        Message::TypeError {
            parameter: parameter.into(),
            type_name: type_name.into(),
            raw_value: raw_value.into(),
        }
    }

    pub fn required_missing(parameter: impl Into<String>) -> Self {
        Message::RequiredMissing {
            parameter: parameter.into(),
            text: None,
        }
    }

    /// Convert into a `Result`, keeping the error message.
    pub fn into_result(self) -> Result<(), Message> {
        if self.is_error() { Err(self) } else { Ok(()) }
    }

    /// The message text with color markup removed.
    pub fn plain_text(&self) -> String {
        strip_markup(&self.to_string())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::NoError => Ok(()),
            Message::UnknownArgument {
                kind,
                token,
                alternatives,
            } => {
                let (what, header) = match kind {
                    ArgumentKind::SubCommand => ("command", "Available commands"),
                    ArgumentKind::Parameter => ("parameter", "Available parameters"),
                };
                let token = escape_markup(token);
                write!(f, "The {what} [Yellow:{token}] was not recognized.")?;
                if alternatives.is_empty() {
                    return Ok(());
                }
                write!(f, "\n{header}:")?;
                for alt in alternatives {
                    let names = alt
                        .names
                        .iter()
                        .map(|name| escape_markup(name))
                        .collect::<Vec<_>>()
                        .join(", ");
                    match &alt.description {
                        Some(desc) => write!(f, "\n  [Cyan:{names}]: {desc}")?,
                        None => write!(f, "\n  [Cyan:{names}]")?,
                    }
                }
                Ok(())
            }
            Message::TypeError {
                parameter,
                type_name,
                raw_value,
            } => write!(
                f,
                "The value [Cyan:\"{}\"] is not a valid [Yellow:{}] for parameter [Yellow:{}].",
                escape_markup(raw_value),
                escape_markup(type_name),
                escape_markup(parameter)
            ),
            Message::ValidationError(text) => f.write_str(text),
            Message::RequiredMissing { text: Some(text), .. } => f.write_str(text),
            Message::RequiredMissing {
                parameter,
                text: None,
            } => write!(
                f,
                "No value was given for the required parameter [Yellow:{}].",
                escape_markup(parameter)
            ),
            Message::ArgumentCount {
                parameter,
                found: 0,
            } => write!(
                f,
                "The parameter [Yellow:{}] requires a value.",
                escape_markup(parameter)
            ),
            Message::ArgumentCount { parameter, found } => write!(
                f,
                "The parameter [Yellow:{}] takes a single value, but {found} were given.",
                escape_markup(parameter)
            ),
            Message::Misconfigured(err) => write!(
                f,
                "Configuration error: {}",
                escape_markup(&err.to_string())
            ),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::ValidationError(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::ValidationError(text)
    }
}

impl From<ConfigError> for Message {
    fn from(err: ConfigError) -> Self {
        Message::Misconfigured(err)
    }
}

/// Escape `[`, `]` and `\` so `text` is never read as markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Remove `[Color:text]` markup, keeping the inner text.
///
/// Escaped characters are unescaped. Brackets that do not open a markup
/// span are kept as they are.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if ch == '\\'
            && let Some(next) = rest[1..].chars().next().filter(|c| matches!(c, '[' | ']' | '\\'))
        {
            out.push(next);
            rest = &rest[2..];
            continue;
        }
        if ch == '[' {
            let tag_len = rest[1..]
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len() - 1);
            if tag_len > 0 && rest[1 + tag_len..].starts_with(':') {
                depth += 1;
                rest = &rest[tag_len + 2..];
                continue;
            }
        } else if ch == ']' && depth > 0 {
            depth -= 1;
            rest = &rest[1..];
            continue;
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}
