//! Splitting raw input into `(key, values)` arguments.

/// Prefix that marks a parameter key.
pub const PARAMETER_PREFIX: char = '-';

/// Separator that ends key recognition; every later token is a value.
pub const END_OF_KEYS: &str = "--";

/// One key with the values that followed it.
///
/// Tokens that precede the first parameter key produce arguments with no
/// values; those are subcommand names or positional values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    key: String,
    values: Vec<String>,
    literal: bool,
}

impl Argument {
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            values,
            literal: false,
        }
    }

    /// A positional token read after `--`; never treated as a key.
    pub fn literal(token: impl Into<String>) -> Self {
        Self {
            key: token.into(),
            values: Vec::new(),
            literal: true,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether the key is a parameter key rather than a name or a value.
    pub fn is_parameter(&self) -> bool {
        !self.literal && is_parameter_key(&self.key)
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.key, self.values)
    }
}

/// `-x`, `--name`; a lone `-` is a value.
pub fn is_parameter_key(token: &str) -> bool {
    token.len() > 1 && token.starts_with(PARAMETER_PREFIX)
}

/// Group raw tokens into arguments, preserving input order.
///
/// - `--key=value` becomes key `--key` with the first value `value`.
/// - After `--` no token is treated as a key.
pub fn tokenize<I, S>(args: I) -> Vec<Argument>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<Argument> = Vec::new();
    let mut open = false;
    let mut literal = false;

    for token in args {
        let token: String = token.into();

        if !literal && token == END_OF_KEYS {
            literal = true;
            continue;
        }

        if !literal && is_parameter_key(&token) {
            let argument = match token.split_once('=') {
                Some((key, value)) if key.starts_with(END_OF_KEYS) && key.len() > 2 => {
                    Argument::new(key, vec![value.to_string()])
                }
                _ => Argument::new(token, Vec::new()),
            };
            out.push(argument);
            open = true;
            continue;
        }

        match out.last_mut() {
            Some(last) if open => last.values.push(token),
            _ if literal => out.push(Argument::literal(token)),
            _ => out.push(Argument::new(token, Vec::new())),
        }
    }

    out
}

/// Split a free-text command line into tokens.
///
/// Whitespace separates tokens; a double-quoted span is one token with the
/// quotes removed. Empty quotes and an unmatched quote produce nothing.
pub fn split_command_line(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim();

    while let Some(ch) = rest.chars().next() {
        if ch.is_whitespace() {
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        if ch == '"' {
            let inner = &rest[1..];
            match inner.find('"') {
                Some(0) => rest = &inner[1..],
                Some(end) => {
                    tokens.push(inner[..end].to_string());
                    rest = &inner[end + 1..];
                }
                None => rest = inner,
            }
            continue;
        }

        let end = rest
            .find(|c: char| c.is_whitespace() || c == '"')
            .unwrap_or(rest.len());
        tokens.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    tokens
}

/// Arguments in consumption order, read with stack semantics.
#[derive(Debug, Clone, Default)]
pub struct ArgumentStack {
    // Reversed: the next argument is the last element.
    items: Vec<Argument>,
}

impl ArgumentStack {
    pub fn new(mut arguments: Vec<Argument>) -> Self {
        arguments.reverse();
        Self { items: arguments }
    }

    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(tokenize(args))
    }

    pub fn peek(&self) -> Option<&Argument> {
        self.items.last()
    }

    pub fn pop(&mut self) -> Option<Argument> {
        self.items.pop()
    }

    /// Pop the next argument only when `predicate` accepts it.
    pub fn pop_if(&mut self, predicate: impl FnOnce(&Argument) -> bool) -> Option<Argument> {
        if predicate(self.peek()?) {
            self.items.pop()
        } else {
            None
        }
    }

    pub fn push(&mut self, argument: Argument) {
        self.items.push(argument);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
