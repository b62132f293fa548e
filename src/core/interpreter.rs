/// Python interpreter lookup for `{pythonPath}` / `{pythonInterpreter}`
///
/// Candidates are tried in order: the merged configuration, the workspace
/// layer, the user layer, then the host's interpreter service. Bare generic
/// names like `python3` are rejected so that a configured venv always wins
/// over whatever is first on `PATH`.

use crate::core::context::{ConfigLayer, EnvLookup, ResolutionContext, WorkspaceFolder};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::path::Path;

const INTERPRETER_KEYS: &[&str] = &["python.defaultInterpreterPath", "python.pythonPath"];

lazy_static! {
    static ref PYTHON_EXECUTABLE_RE: Regex = Regex::new(r"(?i)python[\d.]*(?:\.exe)?$").unwrap();
}

/// Host-side knowledge of the active interpreter (a selected venv, ...)
pub trait InterpreterService {
    fn active_interpreter(&self, workspace: Option<&WorkspaceFolder>) -> Option<String>;
}

/// Reports the interpreter of an activated virtualenv or conda environment
pub struct EnvInterpreter<'a> {
    env: &'a dyn EnvLookup,
}

impl<'a> EnvInterpreter<'a> {
    pub fn new(env: &'a dyn EnvLookup) -> Self {
        Self { env }
    }
}

impl InterpreterService for EnvInterpreter<'_> {
    fn active_interpreter(&self, _workspace: Option<&WorkspaceFolder>) -> Option<String> {
        let prefix = self
            .env
            .var("VIRTUAL_ENV")
            .or_else(|| self.env.var("CONDA_PREFIX"))
            .filter(|p| !p.is_empty())?;

        let executable = if cfg!(windows) {
            Path::new(&prefix).join("Scripts").join("python.exe")
        } else {
            Path::new(&prefix).join("bin").join("python")
        };
        Some(executable.to_string_lossy().into_owned())
    }
}

/// Whether a configured value plausibly names a real interpreter
pub fn is_plausible_interpreter(candidate: &str) -> bool {
    if matches!(candidate, "python" | "python3" | "python2") {
        return false;
    }
    if candidate.contains('/') || candidate.contains('\\') {
        return true;
    }
    PYTHON_EXECUTABLE_RE.is_match(candidate)
}

/// Command used when no interpreter can be determined
pub fn fallback_command() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// The first plausible interpreter from the lookup chain
pub fn find_interpreter(context: &ResolutionContext<'_>) -> Option<String> {
    let from_config = from_keys(|key| context.config.get(key))
        .or_else(|| from_keys(|key| context.config.get_in(ConfigLayer::Workspace, key)))
        .or_else(|| from_keys(|key| context.config.get_in(ConfigLayer::User, key)));

    if from_config.is_some() {
        return from_config;
    }

    context
        .interpreter
        .and_then(|service| service.active_interpreter(context.primary_workspace()))
        .filter(|path| is_plausible_interpreter(path))
}

fn from_keys<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> crate::error::Result<Option<Value>>,
{
    INTERPRETER_KEYS.iter().find_map(|key| match lookup(key) {
        Ok(Some(Value::String(path))) if is_plausible_interpreter(&path) => Some(path),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Config lookup '{}' failed: {}", key, e);
            None
        }
    })
}
