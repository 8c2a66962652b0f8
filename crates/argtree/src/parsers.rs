//! String to value conversion, keyed by target type.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::error::ConfigError;

/// Converts one raw string into a `T`, or reports that it cannot.
pub trait Parses<T>: Send + Sync {
    fn try_parse(&self, raw: &str) -> Option<T>;
}

impl<T, F> Parses<T> for F
where
    F: Fn(&str) -> Option<T> + Send + Sync,
{
    fn try_parse(&self, raw: &str) -> Option<T> {
        self(raw)
    }
}

/// Shared handle to a parser.
pub type Parser<T> = Arc<dyn Parses<T>>;

/// An enum whose values are selected by name on the command line.
///
/// ```
/// use argtree::EnumValue;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Mode {
///     Debug,
///     Release,
/// }
///
/// impl EnumValue for Mode {
///     fn variants() -> &'static [(&'static str, Self)] {
///         &[("Debug", Mode::Debug), ("Release", Mode::Release)]
///     }
/// }
/// ```
pub trait EnumValue: Sized + Clone + Send + Sync + 'static {
    fn variants() -> &'static [(&'static str, Self)];
}

/// Build a name lookup parser for an enum.
pub fn enum_parser<E: EnumValue>(ignore_case: bool) -> Parser<E> {
    Arc::new(move |raw: &str| {
        E::variants()
            .iter()
            .find(|(name, _)| {
                if ignore_case {
                    name.eq_ignore_ascii_case(raw)
                } else {
                    *name == raw
                }
            })
            .map(|(_, value)| value.clone())
    })
}

/// Wrap a `FromStr` implementation as a parser.
pub fn from_str_parser<T>() -> Parser<T>
where
    T: FromStr + 'static,
{
    Arc::new(|raw: &str| raw.parse::<T>().ok())
}

struct EnumParsers<T> {
    exact: Parser<T>,
    ignore_case: Parser<T>,
}

/// Type to parser table.
///
/// Explicit registrations take precedence over enum tables, so an enum can
/// be given a custom parser without removing its variant list.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    enums: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.parsers.len())
            .field("enums", &self.enums.len())
            .finish()
    }
}

macro_rules! register_from_str {
    ($registry:expr, $($ty:ty),* $(,)?) => {
        $( $registry.register_from_str::<$ty>(); )*
    };
}

impl ParserRegistry {
    /// An empty registry with no built-in parsers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in parsers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_from_str!(
            registry, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
        );
        registry.register::<String>(|raw: &str| Some(raw.to_string()));
        registry.register::<PathBuf>(|raw: &str| Some(PathBuf::from(raw)));
        registry.register::<char>(|raw: &str| {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        });
        registry.register::<bool>(|raw: &str| {
            if raw.eq_ignore_ascii_case("true") {
                Some(true)
            } else if raw.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        });
        registry
    }

    /// Shared built-in registry, used when a parse is not given one.
    pub fn builtin() -> &'static ParserRegistry {
        static BUILTIN: OnceLock<ParserRegistry> = OnceLock::new();
        BUILTIN.get_or_init(ParserRegistry::with_builtins)
    }

    /// Register (or replace) the parser for `T`.
    pub fn register<T: 'static>(&mut self, parser: impl Parses<T> + 'static) -> &mut Self {
        let parser: Parser<T> = Arc::new(parser);
        self.parsers.insert(TypeId::of::<T>(), Arc::new(parser));
        self
    }

    pub fn register_from_str<T>(&mut self) -> &mut Self
    where
        T: FromStr + 'static,
    {
        let parser = from_str_parser::<T>();
        self.parsers.insert(TypeId::of::<T>(), Arc::new(parser));
        self
    }

    /// Register an enum for name lookups.
    pub fn register_enum<E: EnumValue>(&mut self) -> &mut Self {
        let parsers = EnumParsers {
            exact: enum_parser::<E>(false),
            ignore_case: enum_parser::<E>(true),
        };
        self.enums.insert(TypeId::of::<E>(), Arc::new(parsers));
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.parsers.contains_key(&id) || self.enums.contains_key(&id)
    }

    /// Resolve the parser for `T`.
    ///
    /// `ignore_case` only applies to enum lookups.
    pub fn get_parser<T: 'static>(&self, ignore_case: bool) -> Result<Parser<T>, ConfigError> {
        let id = TypeId::of::<T>();

        if let Some(parser) = self
            .parsers
            .get(&id)
            .and_then(|p| p.downcast_ref::<Parser<T>>())
        {
            return Ok(Arc::clone(parser));
        }

        if let Some(parsers) = self
            .enums
            .get(&id)
            .and_then(|p| p.downcast_ref::<EnumParsers<T>>())
        {
            let parser = if ignore_case {
                &parsers.ignore_case
            } else {
                &parsers.exact
            };
            return Ok(Arc::clone(parser));
        }

        Err(ConfigError::NoParser {
            type_name: display_type_name::<T>(),
        })
    }
}

/// `type_name` with module paths removed (`Vec<String>` rather than
/// `alloc::vec::Vec<alloc::string::String>`).
pub fn display_type_name<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut word = String::new();

    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            word.push(ch);
        } else {
            out.push_str(word.rsplit("::").next().unwrap_or_default());
            word.clear();
            out.push(ch);
        }
    }
    out.push_str(word.rsplit("::").next().unwrap_or_default());

    out
}
