/// Pasted command input
///
/// Keybindings and scripts hand over a command in one of three shapes:
///
/// ```json
/// "pytest {file}"
/// [{"pattern": "*.py", "command": "python {file}"}, {"pattern": "*.rs", "command": "cargo run"}]
/// {"command": "make test", "autoExecute": true}
/// ```
///
/// Each is turned into a single `CommandRequest` up front. Placeholders are
/// left alone here so the user can still see and edit them.

use crate::core::context::{basename, ActiveDocument};
use crate::error::{QuickTermError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A command chosen by the active file's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCommand {
    pub pattern: String,
    pub command: String,
}

/// Either a literal command or a list of per-file-type commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Text(String),
    Patterns(Vec<PatternCommand>),
}

/// Everything accepted by `paste`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PasteInput {
    Text(String),
    Patterns(Vec<PatternCommand>),
    Detailed {
        command: CommandSpec,
        #[serde(rename = "autoExecute")]
        auto_execute: bool,
    },
}

/// The canonical form handed to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub auto_execute: bool,
}

impl PasteInput {
    /// Parse a JSON value; text that is not JSON at all counts as a command
    pub fn parse(raw: &str) -> Result<Self> {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => serde_json::from_value(value).map_err(invalid_shape),
            Err(_) => Ok(PasteInput::Text(raw.to_string())),
        }
    }

    /// Parse strictly as JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(invalid_shape)
    }

    /// Pick the command for `document`
    pub fn into_request(self, document: Option<&ActiveDocument>) -> CommandRequest {
        match self {
            PasteInput::Text(command) => CommandRequest {
                command,
                auto_execute: false,
            },
            PasteInput::Patterns(patterns) => CommandRequest {
                command: select_by_pattern(&patterns, document),
                auto_execute: false,
            },
            PasteInput::Detailed {
                command,
                auto_execute,
            } => {
                let command = match command {
                    CommandSpec::Text(text) => text,
                    CommandSpec::Patterns(patterns) => select_by_pattern(&patterns, document),
                };
                CommandRequest {
                    command,
                    auto_execute,
                }
            }
        }
    }
}

fn invalid_shape(e: serde_json::Error) -> QuickTermError {
    QuickTermError::Configuration(format!(
        "expected a command string, a pattern list or {{\"command\", \"autoExecute\"}}: {}",
        e
    ))
}

/// First command whose glob matches the active file name
///
/// Without a local file, or when nothing matches, the first command is used.
pub fn select_by_pattern(patterns: &[PatternCommand], document: Option<&ActiveDocument>) -> String {
    let fallback = || patterns.first().map(|p| p.command.clone()).unwrap_or_default();

    let file_name = match document {
        Some(doc) if doc.is_local() => basename(&doc.path),
        _ => return fallback(),
    };

    let matched = patterns.iter().find(|item| match glob_regex(&item.pattern) {
        Ok(re) => re.is_match(&file_name),
        Err(e) => {
            log::warn!("{}", e.user_message());
            false
        }
    });

    match matched {
        Some(item) => {
            log::debug!("Pattern '{}' matched '{}'", item.pattern, file_name);
            item.command.clone()
        }
        None => fallback(),
    }
}

/// Case-insensitive, anchored regex for a `*`/`?` glob
pub fn glob_regex(pattern: &str) -> Result<Regex> {
    let mut source = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|_| QuickTermError::InvalidPattern(pattern.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> Vec<PatternCommand> {
        vec![
            PatternCommand {
                pattern: "*.py".to_string(),
                command: "python {file}".to_string(),
            },
            PatternCommand {
                pattern: "test_?.rs".to_string(),
                command: "cargo test".to_string(),
            },
        ]
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(
            PasteInput::from_json("\"ls -la\"").unwrap(),
            PasteInput::Text("ls -la".to_string())
        );

        let list = PasteInput::from_json(r#"[{"pattern": "*.py", "command": "python {file}"}]"#).unwrap();
        assert!(matches!(list, PasteInput::Patterns(ref p) if p.len() == 1));

        let detailed = PasteInput::from_json(r#"{"command": "make", "autoExecute": true}"#).unwrap();
        assert_eq!(
            detailed.into_request(None),
            CommandRequest {
                command: "make".to_string(),
                auto_execute: true
            }
        );
    }

    #[test]
    fn test_invalid_shapes_are_configuration_errors() {
        for raw in [r#"{"command": "make"}"#, "42", r#"{"autoExecute": true}"#, "[1, 2]"] {
            let err = PasteInput::from_json(raw).unwrap_err();
            assert!(matches!(err, QuickTermError::Configuration(_)), "{}", raw);
        }
    }

    #[test]
    fn test_plain_text_is_a_command() {
        assert_eq!(
            PasteInput::parse("npm run build").unwrap(),
            PasteInput::Text("npm run build".to_string())
        );
        assert_eq!(
            PasteInput::parse("{pythonPath} app.py").unwrap(),
            PasteInput::Text("{pythonPath} app.py".to_string())
        );
        assert!(PasteInput::parse("{\"command\": 1}").is_err());
    }

    #[test]
    fn test_select_by_pattern() {
        let py = ActiveDocument::local("/ws/Main.PY");
        let rs = ActiveDocument::local("/ws/tests/test_1.rs");
        let other = ActiveDocument::local("/ws/README.md");
        let untitled = ActiveDocument::local("scratch.rs").with_scheme("untitled");

        assert_eq!(select_by_pattern(&patterns(), Some(&py)), "python {file}");
        assert_eq!(select_by_pattern(&patterns(), Some(&rs)), "cargo test");
        assert_eq!(select_by_pattern(&patterns(), Some(&other)), "python {file}");
        assert_eq!(select_by_pattern(&patterns(), Some(&untitled)), "python {file}");
        assert_eq!(select_by_pattern(&patterns(), None), "python {file}");
        assert_eq!(select_by_pattern(&[], Some(&py)), "");
    }

    #[test]
    fn test_glob_regex_escapes_literals() {
        let re = glob_regex("file(1).[ch]").unwrap();
        assert!(re.is_match("FILE(1).[CH]"));
        assert!(!re.is_match("file1.c"));
    }

    #[test]
    fn test_detailed_with_patterns() {
        let input = PasteInput::from_json(
            r#"{"command": [{"pattern": "*.rs", "command": "cargo run"}], "autoExecute": false}"#,
        )
        .unwrap();
        let doc = ActiveDocument::local("/ws/src/main.rs");

        assert_eq!(
            input.into_request(Some(&doc)),
            CommandRequest {
                command: "cargo run".to_string(),
                auto_execute: false
            }
        );
    }
}
