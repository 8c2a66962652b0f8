//! Shared schema model for argtree command trees.
//!
//! The engine exports a [`CommandSchema`] snapshot of a built command tree.
//! The types here are plain data and are used for:
//! - JSON dumps of a command tree (`argtree schema`)
//! - help text rendering without touching the engine

use serde::{Deserialize, Serialize};

/// Version written into [`SchemaDocument::format_version`].
pub const SCHEMA_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub value_type: String,
    /// Accepts several values after one key.
    #[serde(default)]
    pub multiple: bool,
    /// Can be given without a value (`--verbose`).
    #[serde(default)]
    pub flag: bool,
    /// Receives the values that are not tagged with a key.
    #[serde(default)]
    pub positional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CommandSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandSchema>,
}

impl CommandSchema {
    /// Walk down the subcommand path, returning `None` on the first unknown name.
    pub fn find(&self, path: &[&str]) -> Option<&CommandSchema> {
        let mut current = self;
        for name in path {
            current = current.subcommands.iter().find(|c| c.name == *name)?;
        }
        Some(current)
    }

    pub fn positional(&self) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.positional)
    }
}

/// JSON document written by schema dumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaDocument {
    pub format_version: u32,
    pub command: CommandSchema,
}

impl SchemaDocument {
    pub fn new(command: CommandSchema) -> Self {
        Self {
            format_version: SCHEMA_FORMAT_VERSION,
            command,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

fn format_value_name(param: &ParameterSchema) -> String {
    if param.multiple {
        format!("<{}>...", param.value_type.to_ascii_uppercase())
    } else {
        format!("<{}>", param.value_type.to_ascii_uppercase())
    }
}

fn format_parameter_left(param: &ParameterSchema) -> String {
    if param.positional {
        let n = if param.multiple {
            format!("{}...", param.name.to_ascii_uppercase())
        } else {
            param.name.to_ascii_uppercase()
        };
        return if param.required {
            format!("<{n}>")
        } else {
            format!("[{n}]")
        };
    }

    let mut names = vec![param.name.clone()];
    names.extend(param.aliases.iter().cloned());
    let mut out = names.join(", ");
    if !param.flag {
        out.push(' ');
        out.push_str(&format_value_name(param));
    }
    out
}

fn format_parameter_help(param: &ParameterSchema) -> String {
    let mut out = param.description.trim().to_string();
    if param.required && !param.positional {
        if out.is_empty() {
            out.push_str("required");
        } else {
            out.push_str(" (required)");
        }
    }
    if let Some(default_value) = &param.default_value {
        if out.is_empty() {
            out.push_str(&format!("[default: {default_value}]"));
        } else {
            out.push_str(&format!(" [default: {default_value}]"));
        }
    }
    out
}

fn push_rows(out: &mut String, title: &str, rows: Vec<(String, String)>) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {}\n", left));
        } else {
            out.push_str(&format!("  {:width$}  {}\n", left, help, width = width));
        }
    }
}

/// Render a help message for one command of the tree.
///
/// `path` is the full invocation prefix shown in the usage line
/// (e.g. `argtree build`).
pub fn help(schema: &CommandSchema, path: &str) -> String {
    let mut out = String::new();
    if schema.description.trim().is_empty() {
        out.push_str(path);
        out.push('\n');
    } else {
        out.push_str(&format!("{} - {}\n", path, schema.description.trim()));
    }

    let mut usage = path.to_string();
    if !schema.subcommands.is_empty() {
        usage.push_str(" <COMMAND>");
    }
    if schema.parameters.iter().any(|p| !p.positional) {
        usage.push_str(" [OPTIONS]");
    }
    if let Some(positional) = schema.positional() {
        usage.push(' ');
        usage.push_str(&format_parameter_left(positional));
    }
    out.push_str(&format!("\nUsage: {usage}\n"));

    let commands: Vec<(String, String)> = schema
        .subcommands
        .iter()
        .map(|c| (c.name.clone(), c.description.trim().to_string()))
        .collect();
    push_rows(&mut out, "Commands", commands);

    let arguments: Vec<(String, String)> = schema
        .parameters
        .iter()
        .filter(|p| p.positional)
        .map(|p| (format_parameter_left(p), format_parameter_help(p)))
        .collect();
    push_rows(&mut out, "Arguments", arguments);

    let options: Vec<(String, String)> = schema
        .parameters
        .iter()
        .filter(|p| !p.positional)
        .map(|p| (format_parameter_left(p), format_parameter_help(p)))
        .collect();
    push_rows(&mut out, "Options", options);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CommandSchema {
        CommandSchema {
            name: "tool".to_string(),
            description: "Sample tool".to_string(),
            parameters: Vec::new(),
            subcommands: vec![
                CommandSchema {
                    name: "build".to_string(),
                    description: "Build a target".to_string(),
                    parameters: vec![
                        ParameterSchema {
                            name: "--target".to_string(),
                            aliases: vec!["-t".to_string()],
                            description: "Target triple".to_string(),
                            required: true,
                            value_type: "String".to_string(),
                            ..Default::default()
                        },
                        ParameterSchema {
                            name: "--jobs".to_string(),
                            default_value: Some("1".to_string()),
                            value_type: "u8".to_string(),
                            ..Default::default()
                        },
                        ParameterSchema {
                            name: "--verbose".to_string(),
                            value_type: "bool".to_string(),
                            flag: true,
                            ..Default::default()
                        },
                    ],
                    subcommands: Vec::new(),
                },
                CommandSchema {
                    name: "greet".to_string(),
                    parameters: vec![ParameterSchema {
                        name: "names".to_string(),
                        value_type: "String".to_string(),
                        multiple: true,
                        positional: true,
                        required: true,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn find_walks_subcommand_path() {
        let schema = sample();
        assert_eq!(schema.find(&[]).map(|c| c.name.as_str()), Some("tool"));
        assert_eq!(
            schema.find(&["greet"]).map(|c| c.name.as_str()),
            Some("greet")
        );
        assert!(schema.find(&["deploy"]).is_none());
    }

    #[test]
    fn help_lists_subcommands() {
        let text = help(&sample(), "tool");
        assert!(text.starts_with("tool - Sample tool\n"));
        assert!(text.contains("Usage: tool <COMMAND>"));
        assert!(text.contains("Commands:"));
        assert!(text.contains("build  Build a target"));
        assert!(text.contains("greet"));
    }

    #[test]
    fn help_renders_options_with_required_and_default() {
        let schema = sample();
        let build = schema.find(&["build"]).unwrap();
        let text = help(build, "tool build");
        assert!(text.contains("Usage: tool build [OPTIONS]"));
        assert!(text.contains("--target, -t <STRING>"));
        assert!(text.contains("Target triple (required)"));
        assert!(text.contains("[default: 1]"));
        assert!(text.contains("--verbose"));
        assert!(!text.contains("--verbose <BOOL>"));
    }

    #[test]
    fn help_renders_positional_usage() {
        let schema = sample();
        let greet = schema.find(&["greet"]).unwrap();
        let text = help(greet, "tool greet");
        assert!(text.contains("Usage: tool greet <NAMES...>"));
        assert!(text.contains("Arguments:"));
    }

    #[test]
    fn schema_document_round_trips() {
        let doc = SchemaDocument::new(sample());
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("\"format-version\": 1"));
        assert!(json.contains("\"value-type\": \"String\""));
        let decoded = SchemaDocument::from_json(&json).unwrap();
        assert_eq!(decoded.format_version, SCHEMA_FORMAT_VERSION);
        assert_eq!(decoded.command, sample());
    }
}
