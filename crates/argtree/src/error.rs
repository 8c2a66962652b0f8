//! Construction-time errors.
//!
//! These describe a badly built command tree. They are returned by the
//! builder calls that detect them and never depend on user input.

/// A command tree that cannot be parsed against.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Two parameters of one command share a key.
    #[error("alias `{alias}` is already registered by parameter `{existing}`")]
    DuplicateAlias {
        /// The key registered twice.
        alias: String,
        /// Name of the parameter that owns the key.
        existing: String,
    },

    /// A keyed parameter alias that the tokenizer would never produce.
    #[error("alias `{alias}` of parameter `{parameter}` must start with `-`")]
    InvalidAlias { alias: String, parameter: String },

    #[error("a command cannot declare both a no-name parameter and subcommands")]
    NoNameWithSubcommands,

    #[error("no-name parameter `{existing}` is already declared")]
    DuplicateNoName { existing: String },

    #[error("subcommand `{0}` is already registered")]
    DuplicateSubcommand(String),

    #[error("subcommand name `{0}` must not be empty or start with `-`")]
    InvalidSubcommandName(String),

    /// A scalar-only builder call made on an array parameter.
    #[error("`{setting}` cannot be used on array parameter `{parameter}`")]
    ArraySetting {
        setting: &'static str,
        parameter: String,
    },

    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// Raised on first use of a parameter whose type has no parser.
    #[error("no parser is registered for type `{type_name}`")]
    NoParser { type_name: String },
}
