//! Typed parameter slots.
//!
//! A [`Parameter`] owns its parsed value. [`Parameter::array`] builds the
//! array variant, which parses every raw value on its own.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use argtree_metadata::ParameterSchema;
use regex::Regex;

use crate::error::ConfigError;
use crate::message::{Message, escape_markup};
use crate::parsers::{Parser, ParserRegistry, Parses, display_type_name};
use crate::validator::Validator;

/// How a parameter treats a missing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Required {
    /// Must be given on every invocation.
    Yes,
    /// Optional; starts from the type's initial value.
    #[default]
    No,
    /// Optional, with an explicit default value.
    Default,
}

/// Converts raw values for the array variant.
trait ConvertEach<T> {
    fn convert(
        &self,
        parameter: &str,
        values: &[String],
        registry: &ParserRegistry,
        ignore_case: bool,
    ) -> Result<T, Message>;
}

struct Each<E> {
    parser: Option<Parser<E>>,
}

impl<E: 'static> ConvertEach<Vec<E>> for Each<E> {
    fn convert(
        &self,
        parameter: &str,
        values: &[String],
        registry: &ParserRegistry,
        ignore_case: bool,
    ) -> Result<Vec<E>, Message> {
        let parser = match &self.parser {
            Some(parser) => Arc::clone(parser),
            None => registry.get_parser::<E>(ignore_case)?,
        };

        let mut parsed = Vec::with_capacity(values.len());
        for raw in values {
            match parser.try_parse(raw) {
                Some(value) => parsed.push(value),
                None => {
                    return Err(Message::type_error(
                        parameter,
                        display_type_name::<E>(),
                        raw.as_str(),
                    ));
                }
            }
        }
        Ok(parsed)
    }
}

enum Conversion<T> {
    Scalar {
        parser: Option<Parser<T>>,
        /// Used when the key is given without a value.
        implicit: Option<T>,
    },
    Array(Box<dyn ConvertEach<T>>),
}

impl<T: Clone + 'static> Conversion<T> {
    fn convert(
        &self,
        parameter: &str,
        values: &[String],
        registry: &ParserRegistry,
        ignore_case: bool,
    ) -> Result<T, Message> {
        match self {
            Conversion::Array(each) => each.convert(parameter, values, registry, ignore_case),
            Conversion::Scalar { parser, implicit } => match values {
                [] => implicit.clone().ok_or_else(|| Message::ArgumentCount {
                    parameter: parameter.to_string(),
                    found: 0,
                }),
                [raw] => {
                    let parser = match parser {
                        Some(parser) => Arc::clone(parser),
                        None => registry.get_parser::<T>(ignore_case)?,
                    };
                    parser.try_parse(raw).ok_or_else(|| {
                        Message::type_error(parameter, display_type_name::<T>(), raw.as_str())
                    })
                }
                _ => Err(Message::ArgumentCount {
                    parameter: parameter.to_string(),
                    found: values.len(),
                }),
            },
        }
    }
}

/// A named, typed, validated input slot.
///
/// ```
/// use argtree::Parameter;
///
/// let jobs = Parameter::<u8>::new("--jobs")
///     .alias("-j")
///     .description("Parallel jobs")
///     .default_value(1)
///     .validate_if(|n| *n > 0, "At least one job is needed.");
/// assert_eq!(*jobs.value(), 1);
/// assert!(!jobs.is_set());
/// ```
pub struct Parameter<T> {
    name: String,
    alternatives: Vec<String>,
    description: String,
    required: Required,
    required_message: Option<String>,
    value: T,
    is_set: bool,
    ignore_case: bool,
    validator: Validator<T>,
    conversion: Conversion<T>,
    on_change: Option<Box<dyn FnMut(&T)>>,
    setup_error: Option<ConfigError>,
}

/// The array variant of [`Parameter`].
pub type ArrayParameter<E> = Parameter<Vec<E>>;

impl<T: Default> Parameter<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_value(name, T::default())
    }
}

impl Parameter<bool> {
    /// A boolean parameter that is `true` when its key is given alone.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name).implicit_value(true)
    }
}

impl<E: 'static> Parameter<Vec<E>> {
    /// A parameter that parses each of its values independently.
    pub fn array(name: impl Into<String>) -> Self {
        let mut parameter = Self::with_value(name, Vec::new());
        parameter.conversion = Conversion::Array(Box::new(Each::<E> { parser: None }));
        parameter
    }

    /// Parser used for every element instead of the registry's.
    pub fn element_parser(mut self, parser: impl Parses<E> + 'static) -> Self {
        let parser: Parser<E> = Arc::new(parser);
        self.conversion = Conversion::Array(Box::new(Each {
            parser: Some(parser),
        }));
        self
    }

    /// Run `check` on every element, in order.
    pub fn validate_each(self, check: impl Fn(&E) -> Message + 'static) -> Self {
        self.validate(move |values: &Vec<E>| {
            for value in values {
                let msg = check(value);
                if msg.is_error() {
                    return msg;
                }
            }
            Message::NoError
        })
    }

    pub fn validate_each_if(
        self,
        predicate: impl Fn(&E) -> bool + 'static,
        message: impl Into<Message>,
    ) -> Self {
        let message = message.into();
        self.validate_each(move |value| {
            if predicate(value) {
                Message::NoError
            } else {
                message.clone()
            }
        })
    }
}

impl<T> Parameter<T> {
    /// A parameter starting from `value`, for types without `Default`.
    pub fn with_value(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            alternatives: Vec::new(),
            description: String::new(),
            required: Required::No,
            required_message: None,
            value,
            is_set: false,
            ignore_case: false,
            validator: Validator::new(),
            conversion: Conversion::Scalar {
                parser: None,
                implicit: None,
            },
            on_change: None,
            setup_error: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alternatives.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = Required::Yes;
        self
    }

    /// Required, reporting `text` when the key is missing.
    pub fn required_with_message(mut self, text: impl Into<String>) -> Self {
        self.required = Required::Yes;
        self.required_message = Some(text.into());
        self
    }

    pub fn default_value(mut self, value: T) -> Self {
        self.required = Required::Default;
        self.value = value;
        self
    }

    /// Match enum names without regard to case.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Parser used instead of the registry's.
    ///
    /// Array parameters take [`Parameter::element_parser`] instead; calling
    /// this on one makes the parameter fail to register.
    pub fn parser(mut self, parser: impl Parses<T> + 'static) -> Self {
        let parser: Parser<T> = Arc::new(parser);
        match &mut self.conversion {
            Conversion::Scalar { parser: slot, .. } => *slot = Some(parser),
            Conversion::Array(_) => self.reject_on_array("parser"),
        }
        self
    }

    /// Value committed when the key is given without values.
    ///
    /// Not available on array parameters.
    pub fn implicit_value(mut self, value: T) -> Self {
        match &mut self.conversion {
            Conversion::Scalar { implicit, .. } => *implicit = Some(value),
            Conversion::Array(_) => self.reject_on_array("implicit_value"),
        }
        self
    }

    fn reject_on_array(&mut self, setting: &'static str) {
        self.setup_error.get_or_insert_with(|| ConfigError::ArraySetting {
            setting,
            parameter: self.name.clone(),
        });
    }

    /// The first builder call that left this parameter unusable.
    pub(crate) fn setup_error(&self) -> Option<&ConfigError> {
        self.setup_error.as_ref()
    }

    /// Called with the new value after every successful handle.
    pub fn on_change(mut self, callback: impl FnMut(&T) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn validate(mut self, check: impl Fn(&T) -> Message + 'static) -> Self {
        self.validator.add(check);
        self
    }

    /// Reject values for which `predicate` is false.
    pub fn validate_if(
        self,
        predicate: impl Fn(&T) -> bool + 'static,
        message: impl Into<Message>,
    ) -> Self {
        let message = message.into();
        self.validate(move |value| {
            if predicate(value) {
                Message::NoError
            } else {
                message.clone()
            }
        })
    }

    /// Like [`Parameter::validate_if`], building the message from the value.
    pub fn validate_with(
        self,
        predicate: impl Fn(&T) -> bool + 'static,
        message: impl Fn(&T) -> Message + 'static,
    ) -> Self {
        self.validate(move |value| {
            if predicate(value) {
                Message::NoError
            } else {
                message(value)
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn required_kind(&self) -> Required {
        self.required
    }

    pub fn is_required(&self) -> bool {
        self.required == Required::Yes
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Whether the value came from the command line rather than a default.
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub fn validator(&self) -> &Validator<T> {
        &self.validator
    }

    pub fn is_array(&self) -> bool {
        matches!(self.conversion, Conversion::Array(_))
    }

    pub fn into_value(self) -> T {
        self.value
    }

    fn required_message(&self) -> Message {
        Message::RequiredMissing {
            parameter: self.name.clone(),
            text: self.required_message.clone(),
        }
    }
}

impl Parameter<String> {
    /// Require the value to match `pattern`.
    pub fn validate_regex(self, pattern: &str) -> Result<Self, ConfigError> {
        let regex = compile(pattern)?;
        let text = format!(
            "The \"{}\" parameter value must match the regex: [Cyan:{}]",
            escape_markup(&self.name),
            escape_markup(regex.as_str())
        );
        Ok(self.validate(move |value: &String| {
            if regex.is_match(value) {
                Message::NoError
            } else {
                Message::validation(text.clone())
            }
        }))
    }

    pub fn validate_regex_with(
        self,
        pattern: &str,
        message: impl Into<Message>,
    ) -> Result<Self, ConfigError> {
        let regex = compile(pattern)?;
        Ok(self.validate_if(move |value: &String| regex.is_match(value), message))
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|err| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

impl<T: Clone + 'static> Parameter<T> {
    /// Parse, validate and commit `values`.
    ///
    /// Nothing changes unless the whole call succeeds.
    pub fn handle(&mut self, values: &[String], registry: &ParserRegistry) -> Message {
        if let Some(err) = &self.setup_error {
            return Message::Misconfigured(err.clone());
        }
        let candidate =
            match self
                .conversion
                .convert(&self.name, values, registry, self.ignore_case)
            {
                Ok(candidate) => candidate,
                Err(msg) => return msg,
            };

        let msg = self.validator.validate(&candidate);
        if msg.is_error() {
            return msg;
        }

        self.value = candidate;
        self.is_set = true;
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.value);
        }
        Message::NoError
    }
}

impl<T: fmt::Debug> fmt::Display for Parameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] = {:?}{}",
            self.name,
            display_type_name::<T>(),
            self.value,
            if self.is_set { "" } else { " (default)" }
        )
    }
}

impl<T: fmt::Debug> fmt::Debug for Parameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("alternatives", &self.alternatives)
            .field("required", &self.required)
            .field("value", &self.value)
            .field("is_set", &self.is_set)
            .finish_non_exhaustive()
    }
}

/// Type-erased view a command keeps of its parameters.
pub(crate) trait DynParameter {
    fn name(&self) -> &str;
    fn alternatives(&self) -> &[String];
    fn description(&self) -> &str;
    fn is_required(&self) -> bool;
    fn handle(&mut self, values: &[String], registry: &ParserRegistry) -> Message;
    fn required_message(&self) -> Message;
    fn schema(&self, positional: bool) -> ParameterSchema;
    fn summary(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Clone + fmt::Debug + 'static> DynParameter for Parameter<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_required(&self) -> bool {
        Parameter::is_required(self)
    }

    fn handle(&mut self, values: &[String], registry: &ParserRegistry) -> Message {
        Parameter::handle(self, values, registry)
    }

    fn required_message(&self) -> Message {
        Parameter::required_message(self)
    }

    fn schema(&self, positional: bool) -> ParameterSchema {
        let (value_type, multiple, flag) = match &self.conversion {
            Conversion::Array(_) => {
                let full = display_type_name::<T>();
                let element = full
                    .strip_prefix("Vec<")
                    .and_then(|s| s.strip_suffix('>'))
                    .map(str::to_string)
                    .unwrap_or(full);
                (element, true, false)
            }
            Conversion::Scalar { implicit, .. } => {
                (display_type_name::<T>(), false, implicit.is_some())
            }
        };
        ParameterSchema {
            name: self.name.clone(),
            aliases: self.alternatives.clone(),
            description: self.description.clone(),
            required: self.is_required(),
            default_value: (self.required == Required::Default)
                .then(|| format!("{:?}", self.value)),
            value_type,
            multiple,
            flag,
            positional,
        }
    }

    fn summary(&self) -> String {
        self.to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn builtin() -> &'static ParserRegistry {
        ParserRegistry::builtin()
    }

    #[test]
    fn scalar_handle_commits_parsed_value() {
        let mut p = Parameter::<i32>::new("--count");
        assert_eq!(p.handle(&raw(&["12"]), builtin()), Message::NoError);
        assert_eq!(*p.value(), 12);
        assert!(p.is_set());
    }

    #[test]
    fn scalar_type_error_leaves_state_untouched() {
        let mut p = Parameter::<i32>::new("--count").default_value(3);
        let msg = p.handle(&raw(&["abc"]), builtin());
        assert_eq!(msg, Message::type_error("--count", "i32", "abc"));
        assert_eq!(*p.value(), 3);
        assert!(!p.is_set());
    }

    #[test]
    fn scalar_rejects_wrong_value_counts() {
        let mut p = Parameter::<String>::new("--name");
        assert_eq!(
            p.handle(&raw(&[]), builtin()),
            Message::ArgumentCount {
                parameter: "--name".to_string(),
                found: 0
            }
        );
        assert_eq!(
            p.handle(&raw(&["a", "b"]), builtin()),
            Message::ArgumentCount {
                parameter: "--name".to_string(),
                found: 2
            }
        );
        assert!(!p.is_set());
    }

    #[test]
    fn flags_take_an_implicit_value() {
        let mut p = Parameter::flag("--verbose");
        assert_eq!(p.handle(&raw(&[]), builtin()), Message::NoError);
        assert!(*p.value());

        assert_eq!(p.handle(&raw(&["false"]), builtin()), Message::NoError);
        assert!(!*p.value());
    }

    #[test]
    fn validator_failure_is_returned_unmodified() {
        let mut p = Parameter::<u8>::new("--jobs")
            .validate_if(|n| *n > 0, "At least one job.")
            .validate_with(
                |n| *n <= 16,
                |n| Message::validation(format!("{n} jobs is too many.")),
            );
        assert_eq!(
            p.handle(&raw(&["0"]), builtin()),
            Message::validation("At least one job.")
        );
        assert_eq!(
            p.handle(&raw(&["40"]), builtin()),
            Message::validation("40 jobs is too many.")
        );
        assert!(!p.is_set());
        assert_eq!(p.handle(&raw(&["8"]), builtin()), Message::NoError);
        assert_eq!(*p.value(), 8);
    }

    #[test]
    fn explicit_parser_overrides_registry() {
        let mut p = Parameter::<i32>::new("--hex")
            .parser(|s: &str| i32::from_str_radix(s.trim_start_matches("0x"), 16).ok());
        assert_eq!(p.handle(&raw(&["0xff"]), builtin()), Message::NoError);
        assert_eq!(*p.value(), 255);
    }

    #[test]
    fn array_parses_each_value_in_order() {
        let mut p = ArrayParameter::<u16>::array("--ports");
        assert!(p.is_array());
        assert_eq!(p.handle(&raw(&["80", "443"]), builtin()), Message::NoError);
        assert_eq!(p.value(), &vec![80, 443]);
    }

    #[test]
    fn array_failure_names_offending_value_and_keeps_prior_value() {
        let mut p = ArrayParameter::<u16>::array("--ports");
        assert_eq!(p.handle(&raw(&["1", "2"]), builtin()), Message::NoError);

        let msg = p.handle(&raw(&["3", "http", "5"]), builtin());
        assert_eq!(msg, Message::type_error("--ports", "u16", "http"));
        assert_eq!(p.value(), &vec![1, 2]);
        assert!(p.is_set());
    }

    #[test]
    fn array_replaces_instead_of_appending() {
        let mut p = ArrayParameter::<String>::array("--flag");
        p.handle(&raw(&["a", "b"]), builtin());
        p.handle(&raw(&["c"]), builtin());
        assert_eq!(p.value(), &vec!["c".to_string()]);
    }

    #[test]
    fn array_validate_each_checks_elements() {
        let mut p = ArrayParameter::<i64>::array("--n")
            .validate_each_if(|n| *n % 2 == 0, "Only even numbers.");
        assert_eq!(
            p.handle(&raw(&["2", "3"]), builtin()),
            Message::validation("Only even numbers.")
        );
        assert!(p.value().is_empty());
        assert_eq!(p.handle(&raw(&["2", "4"]), builtin()), Message::NoError);
    }

    #[test]
    fn array_element_parser_is_used() {
        let mut p = ArrayParameter::<String>::array("--upper")
            .element_parser(|s: &str| Some(s.to_uppercase()));
        p.handle(&raw(&["a", "b"]), builtin());
        assert_eq!(p.value(), &vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn regex_validation() {
        let mut p = Parameter::<String>::new("--id")
            .validate_regex(r"^id-\d+$")
            .unwrap();
        assert_eq!(p.handle(&raw(&["id-42"]), builtin()), Message::NoError);
        let msg = p.handle(&raw(&["id-x"]), builtin());
        assert_eq!(
            msg.plain_text(),
            r#"The "--id" parameter value must match the regex: ^id-\d+$"#
        );
        assert_eq!(*p.value(), "id-42");

        let mut p = Parameter::<String>::new("--id")
            .validate_regex_with("^[a-z]+$", "Lowercase letters only.")
            .unwrap();
        assert_eq!(
            p.handle(&raw(&["ABC"]), builtin()),
            Message::validation("Lowercase letters only.")
        );

        let err = Parameter::<String>::new("--id")
            .validate_regex("(")
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));
    }

    #[test]
    fn regex_message_shows_character_classes() {
        let mut p = Parameter::<String>::new("--id")
            .validate_regex("^[a-z]+$")
            .unwrap();
        let msg = p.handle(&raw(&["ABC"]), builtin());
        assert_eq!(
            msg.plain_text(),
            r#"The "--id" parameter value must match the regex: ^[a-z]+$"#
        );
    }

    #[test]
    fn scalar_settings_are_rejected_on_arrays() {
        let mut p = ArrayParameter::<u16>::array("--ports")
            .parser(|_: &str| Some(vec![7u16]));
        let err = p.setup_error().cloned().unwrap();
        assert_eq!(
            err,
            ConfigError::ArraySetting {
                setting: "parser",
                parameter: "--ports".to_string(),
            }
        );
        assert_eq!(
            p.handle(&raw(&["1", "2"]), builtin()),
            Message::Misconfigured(err)
        );
        assert!(p.value().is_empty());
        assert!(!p.is_set());

        let p = ArrayParameter::<String>::array("--tags").implicit_value(vec![]);
        assert!(matches!(
            p.setup_error(),
            Some(ConfigError::ArraySetting {
                setting: "implicit_value",
                ..
            })
        ));
    }

    #[test]
    fn change_callback_sees_committed_values_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut p = Parameter::<i32>::new("--n").on_change(move |v| sink.borrow_mut().push(*v));
        p.handle(&raw(&["1"]), builtin());
        p.handle(&raw(&["x"]), builtin());
        p.handle(&raw(&["2"]), builtin());
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn handling_is_idempotent() {
        let mut p = Parameter::<f64>::new("--ratio");
        p.handle(&raw(&["0.5"]), builtin());
        let first = *p.value();
        p.handle(&raw(&["0.5"]), builtin());
        assert_eq!(*p.value(), first);
    }

    #[test]
    fn display_marks_defaults() {
        let mut p = Parameter::<i32>::new("--n").default_value(4);
        assert_eq!(p.to_string(), "--n[i32] = 4 (default)");
        p.handle(&raw(&["9"]), builtin());
        assert_eq!(p.to_string(), "--n[i32] = 9");
    }

    #[test]
    fn schema_describes_the_parameter() {
        let p = ArrayParameter::<String>::array("--flag")
            .alias("-f")
            .description("Extra flags");
        let schema = DynParameter::schema(&p, false);
        assert_eq!(schema.value_type, "String");
        assert!(schema.multiple);
        assert_eq!(schema.aliases, vec!["-f".to_string()]);

        let p = Parameter::<u8>::new("--jobs").default_value(2);
        let schema = DynParameter::schema(&p, false);
        assert_eq!(schema.default_value.as_deref(), Some("2"));
        assert!(!schema.flag);

        assert!(DynParameter::schema(&Parameter::flag("--v"), false).flag);
    }
}
