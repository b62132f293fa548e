/// Placeholder resolution
///
/// Expands `{placeholder}` tokens in a command template into literal text.
/// The stages run in a fixed order:
///
/// 1. auto-cd prefix, computed from the still unexpanded template
/// 2. legacy aliases (`{filename}`, `{workspace}`, ...) are normalised
/// 3. file tokens, with `{fileDirname}/x` handled before `{fileDirname}`
/// 4. workspace tokens, with `{workspaceFolder}/x` handled first
/// 5. system, environment, configuration and interpreter tokens
///
/// Missing context never fails resolution. Tokens that cannot be filled are
/// left in place and reported as warnings.

use crate::core::context::{FileInfo, ResolutionContext, LOCAL_FILE_SCHEME};
use crate::core::escape::escape;
use crate::core::interpreter::{fallback_command, find_interpreter};
use crate::core::project_detector::ProjectDetector;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Old token names and the tokens they stand for
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("{filename}", "{fileBasename}"),
    ("{filestem}", "{fileBasenameNoExtension}"),
    ("{filepath}", "{file}"),
    ("{fileext}", "{fileExtname}"),
    ("{dirname}", "{fileDirname}"),
    ("{relativepath}", "{relativeFile}"),
    ("{workspace}", "{workspaceFolder}"),
    ("{workspacename}", "{workspaceFolderBasename}"),
];

const FILE_TOKENS: &[&str] = &[
    "{fileBasename}",
    "{fileBasenameNoExtension}",
    "{file}",
    "{fileDirname}",
    "{dir}",
    "{fileExtname}",
    "{relativeFile}",
    "{fileWorkspaceFolder}",
    "{relativeFileDirname}",
    "{fileDirnameBasename}",
    "{lineNumber}",
    "{columnNumber}",
    "{selectedText}",
];

const WORKSPACE_TOKENS: &[&str] = &["{workspaceFolder}", "{workspaceFolderBasename}"];

// Tokens that need a real file on disk
const LOCAL_PATH_TOKENS: &[&str] = &[
    "{file}",
    "{fileDirname}",
    "{dir}",
    "{relativeFile}",
    "{fileWorkspaceFolder}",
    "{relativeFileDirname}",
    "{fileDirnameBasename}",
];

lazy_static! {
    static ref FILE_DIRNAME_JOIN_RE: Regex = Regex::new(r"\{fileDirname\}/(\S+)").unwrap();
    static ref DIR_JOIN_RE: Regex = Regex::new(r"\{dir\}/(\S+)").unwrap();
    static ref WORKSPACE_JOIN_RE: Regex = Regex::new(r"\{workspaceFolder\}/(\S+)").unwrap();
    static ref ENV_RE: Regex = Regex::new(r"\{env:([^}]+)\}").unwrap();
    static ref CONFIG_RE: Regex = Regex::new(r"\{config:([^}]+)\}").unwrap();
    static ref RESIDUAL_RE: Regex = Regex::new(r"\{[^}]+\}").unwrap();
}

/// A non-fatal problem found while resolving a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    /// File tokens were used but no document is active
    NoActiveFile,
    /// Workspace tokens were used but no folder is open
    NoWorkspace,
    /// File path tokens were used on a document that is not on disk
    UnsupportedScheme { scheme: String },
    /// Tokens still present after every stage ran
    Unresolved { tokens: Vec<String> },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::NoActiveFile => {
                write!(f, "File placeholders are used, but there is no active file")
            }
            ResolutionWarning::NoWorkspace => {
                write!(f, "Workspace placeholders are used, but no workspace is open")
            }
            ResolutionWarning::UnsupportedScheme { scheme } => write!(
                f,
                "File path placeholders are not available for non-file documents ({}:)",
                scheme
            ),
            ResolutionWarning::Unresolved { tokens } => {
                write!(f, "Unresolved placeholders: {}", tokens.join(", "))
            }
        }
    }
}

/// Resolved command text plus everything worth telling the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved_text: String,
    pub warnings: Vec<ResolutionWarning>,
}

/// Expands templates against a `ResolutionContext`
pub struct PlaceholderResolver<'c, 'a> {
    context: &'c ResolutionContext<'a>,
}

impl<'c, 'a> PlaceholderResolver<'c, 'a> {
    pub fn new(context: &'c ResolutionContext<'a>) -> Self {
        Self { context }
    }

    /// Resolve every token in `template`
    ///
    /// Never fails: each lookup that goes wrong keeps its token verbatim.
    pub fn resolve(&self, template: &str) -> Resolution {
        let mut warnings = self.context_warnings(&normalize_aliases(template));

        let mut text = self.apply_auto_cd(template);
        text = normalize_aliases(&text);
        text = self.replace_file_tokens(&text);
        text = self.replace_workspace_tokens(&text);
        text = self.replace_system_tokens(&text);

        let leftovers = unresolved_tokens(&text);
        if !leftovers.is_empty() {
            log::debug!("Unresolved placeholders in '{}': {:?}", text, leftovers);
            warnings.push(ResolutionWarning::Unresolved { tokens: leftovers });
        }

        Resolution {
            resolved_text: text,
            warnings,
        }
    }

    fn context_warnings(&self, template: &str) -> Vec<ResolutionWarning> {
        let uses_any = |tokens: &[&str]| tokens.iter().any(|token| template.contains(token));
        let mut warnings = Vec::new();

        match &self.context.active_document {
            None if uses_any(FILE_TOKENS) => warnings.push(ResolutionWarning::NoActiveFile),
            Some(doc) if !doc.is_local() && uses_any(LOCAL_PATH_TOKENS) => {
                warnings.push(ResolutionWarning::UnsupportedScheme {
                    scheme: doc.scheme.clone(),
                })
            }
            _ => {}
        }

        if self.context.workspace_folders.is_empty() && uses_any(WORKSPACE_TOKENS) {
            warnings.push(ResolutionWarning::NoWorkspace);
        }

        warnings
    }

    fn apply_auto_cd(&self, template: &str) -> String {
        let info = match self.context.file_info() {
            Some(info) => info,
            None => return template.to_string(),
        };

        let workspace_root = self.context.primary_workspace().map(|folder| folder.path_str());
        ProjectDetector::new(self.context.fs).apply(
            self.context.auto_cd,
            template,
            &info.file_dirname,
            workspace_root.as_deref(),
        )
    }

    fn replace_file_tokens(&self, text: &str) -> String {
        let document = match &self.context.active_document {
            Some(document) => document,
            None => return text.to_string(),
        };

        if document.scheme != LOCAL_FILE_SCHEME {
            return replace_basic_file_tokens(text, &FileInfo::basic(document));
        }

        match self.context.file_info() {
            Some(info) => replace_local_file_tokens(text, &info),
            None => text.to_string(),
        }
    }

    fn replace_workspace_tokens(&self, text: &str) -> String {
        let folder = match self.context.primary_workspace() {
            Some(folder) => folder,
            None => return text.to_string(),
        };
        let root = folder.path_str();

        let result = replace_joined(&WORKSPACE_JOIN_RE, text, &root);
        result
            .replace("{workspaceFolder}", &escape(&root))
            .replace("{workspaceFolderBasename}", &escape(&folder.name))
    }

    fn replace_system_tokens(&self, text: &str) -> String {
        let separator = self.context.path_separator.to_string();
        let mut result = text
            .replace("{userHome}", &escape(&self.context.user_home))
            .replace("{pathSeparator}", &separator)
            .replace("{/}", &separator)
            .replace("{cwd}", &escape(&self.context.cwd));

        result = ENV_RE
            .replace_all(&result, |caps: &Captures| match self.context.env.var(&caps[1]) {
                Some(value) if !value.is_empty() => escape(&value),
                _ => caps[0].to_string(),
            })
            .into_owned();

        result = CONFIG_RE
            .replace_all(&result, |caps: &Captures| {
                match self.context.config.get(&caps[1]) {
                    Ok(Some(value)) if !value.is_null() => escape(&stringify(&value)),
                    Ok(_) => caps[0].to_string(),
                    Err(e) => {
                        log::warn!("Failed to read config '{}': {}", &caps[1], e);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();

        if result.contains("{pythonPath}") || result.contains("{pythonInterpreter}") {
            let python = match find_interpreter(self.context) {
                Some(path) => escape(&path),
                None => fallback_command().to_string(),
            };
            result = result
                .replace("{pythonPath}", &python)
                .replace("{pythonInterpreter}", &python);
        }

        result
    }
}

/// Resolve `template` against `context`
pub fn resolve(template: &str, context: &ResolutionContext<'_>) -> Resolution {
    PlaceholderResolver::new(context).resolve(template)
}

/// Rewrite legacy token names to their current spelling
pub fn normalize_aliases(text: &str) -> String {
    LEGACY_ALIASES
        .iter()
        .fold(text.to_string(), |acc, (legacy, current)| acc.replace(legacy, current))
}

/// Every `{...}` span left in `text`, in order of appearance
pub fn unresolved_tokens(text: &str) -> Vec<String> {
    RESIDUAL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn replace_local_file_tokens(text: &str, info: &FileInfo) -> String {
    let mut result = replace_joined(&FILE_DIRNAME_JOIN_RE, text, &info.file_dirname);
    result = replace_joined(&DIR_JOIN_RE, &result, &info.file_dirname);

    result = result
        .replace("{fileBasenameNoExtension}", &escape(&info.file_basename_no_extension))
        .replace("{fileBasename}", &escape(&info.file_basename))
        .replace("{file}", &escape(&info.file))
        .replace("{fileDirnameBasename}", &escape(&info.file_dirname_basename))
        .replace("{fileDirname}", &escape(&info.file_dirname))
        .replace("{dir}", &escape(&info.file_dirname))
        .replace("{fileExtname}", &info.file_extname);

    result = replace_if_present(&result, "{fileWorkspaceFolder}", &info.file_workspace_folder);
    result = replace_if_present(&result, "{relativeFileDirname}", &info.relative_file_dirname);
    result = replace_if_present(&result, "{relativeFile}", &info.relative_file);

    result = result
        .replace("{lineNumber}", &info.line_number.to_string())
        .replace("{columnNumber}", &info.column_number.to_string());
    replace_if_present(&result, "{selectedText}", &info.selected_text)
}

// Documents that are not on disk only know their name, cursor and selection.
fn replace_basic_file_tokens(text: &str, info: &FileInfo) -> String {
    let mut result = replace_if_present(text, "{fileBasenameNoExtension}", &info.file_basename_no_extension);
    result = replace_if_present(&result, "{fileBasename}", &info.file_basename);
    if !info.file_extname.is_empty() {
        result = result.replace("{fileExtname}", &info.file_extname);
    }
    result = result
        .replace("{lineNumber}", &info.line_number.to_string())
        .replace("{columnNumber}", &info.column_number.to_string());
    replace_if_present(&result, "{selectedText}", &info.selected_text)
}

fn replace_if_present(text: &str, token: &str, value: &str) -> String {
    if value.is_empty() {
        text.to_string()
    } else {
        text.replace(token, &escape(value))
    }
}

fn replace_joined(pattern: &Regex, text: &str, base: &str) -> String {
    pattern
        .replace_all(text, |caps: &Captures| escape(&join_path(base, &caps[1])))
        .into_owned()
}

/// Append `suffix` to `base` and fold `.` and `..` segments
///
/// The suffix is always relative to `base`, even with extra leading slashes.
/// `..` never climbs above the root of an absolute base.
fn join_path(base: &str, suffix: &str) -> String {
    let suffix = suffix.trim_start_matches(|c: char| c == '/' || c == '\\');
    let mut joined = PathBuf::new();

    for component in Path::new(base).join(suffix).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match joined.components().next_back() {
                Some(Component::Normal(_)) => {
                    joined.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => joined.push(".."),
            },
            other => joined.push(other.as_os_str()),
        }
    }

    let mut result = joined.to_string_lossy().into_owned();
    if result.is_empty() {
        result.push('.');
    }
    if suffix.ends_with('/') && !result.ends_with('/') {
        result.push('/');
    }
    result
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
