/// Layered settings
///
/// Settings come from two JSON files, the workspace one taking precedence:
///
/// - `<workspace>/.quick-term/settings.json`
/// - `<config dir>/quick-term/settings.json`
///
/// Keys are dotted. Both the flat VS Code style (`"python.pythonPath": ...`)
/// and nested objects (`{"editor": {"fontSize": 14}}`) are understood.

use crate::core::context::{AutoCdPolicy, ConfigLayer, ConfigLookup};
use crate::error::{QuickTermError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_DIR: &str = ".quick-term";
pub const APP_DIR: &str = "quick-term";
pub const SETTINGS_FILE: &str = "settings.json";

pub const AUTO_CD_KEY: &str = "quickTerm.autoChangeDirectory";
pub const HISTORY_SIZE_KEY: &str = "quickTerm.historySize";

/// Workspace settings over user settings
#[derive(Debug, Clone, Default)]
pub struct LayeredConfig {
    workspace: Map<String, Value>,
    user: Map<String, Value>,
}

impl LayeredConfig {
    pub fn new(workspace: Map<String, Value>, user: Map<String, Value>) -> Self {
        Self { workspace, user }
    }

    /// Load both layers from their default locations
    pub fn load(workspace_root: Option<&Path>) -> Result<Self> {
        let workspace = match workspace_root {
            Some(root) => read_layer(&workspace_settings_path(root))?,
            None => Map::new(),
        };
        let user = match user_settings_path() {
            Some(path) => read_layer(&path)?,
            None => Map::new(),
        };

        Ok(Self { workspace, user })
    }

    fn layer(&self, layer: ConfigLayer) -> &Map<String, Value> {
        match layer {
            ConfigLayer::Workspace => &self.workspace,
            ConfigLayer::User => &self.user,
        }
    }
}

impl ConfigLookup for LayeredConfig {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lookup(&self.workspace, key).or_else(|| lookup(&self.user, key)))
    }

    fn get_in(&self, layer: ConfigLayer, key: &str) -> Result<Option<Value>> {
        Ok(lookup(self.layer(layer), key))
    }
}

pub fn workspace_settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_DIR).join(SETTINGS_FILE)
}

pub fn user_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Read one layer; a missing file is an empty layer
pub fn read_layer(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(QuickTermError::Configuration(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

fn lookup(map: &Map<String, Value>, key: &str) -> Option<Value> {
    if let Some(value) = map.get(key) {
        return Some(value.clone());
    }

    let mut parts = key.split('.');
    let first = map.get(parts.next()?)?;
    parts
        .try_fold(first, |value, part| value.get(part))
        .cloned()
}

/// Settings quick-term reads for itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub auto_cd: AutoCdPolicy,
    pub history_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_cd: AutoCdPolicy::default(),
            history_size: crate::history::DEFAULT_CAPACITY,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults for missing or bad values
    pub fn from_config(config: &dyn ConfigLookup) -> Self {
        let defaults = Self::default();

        let auto_cd = match config.get(AUTO_CD_KEY) {
            Ok(Some(Value::String(s))) => s.parse().unwrap_or_else(|e| {
                log::warn!("{}: {}", AUTO_CD_KEY, e);
                defaults.auto_cd
            }),
            _ => defaults.auto_cd,
        };

        let history_size = match config.get(HISTORY_SIZE_KEY) {
            Ok(Some(value)) => value
                .as_u64()
                .map(|n| (n as usize).max(1))
                .unwrap_or(defaults.history_size),
            _ => defaults.history_size,
        };

        Self {
            auto_cd,
            history_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_flat_and_nested_keys() {
        let config = LayeredConfig::new(
            Map::new(),
            as_map(json!({
                "python.pythonPath": "/usr/bin/python3.12",
                "editor": {"fontSize": 14, "tab": {"size": 4}}
            })),
        );

        assert_eq!(config.get("python.pythonPath").unwrap(), Some(json!("/usr/bin/python3.12")));
        assert_eq!(config.get("editor.fontSize").unwrap(), Some(json!(14)));
        assert_eq!(config.get("editor.tab.size").unwrap(), Some(json!(4)));
        assert_eq!(config.get("editor.missing").unwrap(), None);
        assert_eq!(config.get("nothing").unwrap(), None);
    }

    #[test]
    fn test_workspace_layer_wins() {
        let config = LayeredConfig::new(
            as_map(json!({"editor.fontSize": 16})),
            as_map(json!({"editor.fontSize": 12, "editor.theme": "dark"})),
        );

        assert_eq!(config.get("editor.fontSize").unwrap(), Some(json!(16)));
        assert_eq!(config.get("editor.theme").unwrap(), Some(json!("dark")));
        assert_eq!(
            config.get_in(ConfigLayer::User, "editor.fontSize").unwrap(),
            Some(json!(12))
        );
        assert_eq!(config.get_in(ConfigLayer::Workspace, "editor.theme").unwrap(), None);
    }

    #[test]
    fn test_read_layer_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = workspace_settings_path(temp.path());

        assert!(read_layer(&path).unwrap().is_empty());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"quickTerm.historySize": 5}"#).unwrap();
        let layer = read_layer(&path).unwrap();
        assert_eq!(layer.get("quickTerm.historySize"), Some(&json!(5)));

        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(read_layer(&path), Err(QuickTermError::Configuration(_))));

        fs::write(&path, "{broken").unwrap();
        assert!(matches!(read_layer(&path), Err(QuickTermError::Serialization(_))));
    }

    #[test]
    fn test_settings() {
        let config = LayeredConfig::new(
            as_map(json!({"quickTerm": {"autoChangeDirectory": "auto (experimental)"}})),
            as_map(json!({"quickTerm.historySize": 0})),
        );
        let settings = Settings::from_config(&config);
        assert_eq!(settings.auto_cd, AutoCdPolicy::Auto);
        assert_eq!(settings.history_size, 1);

        let settings = Settings::from_config(&LayeredConfig::default());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.history_size, 100);

        let bad = LayeredConfig::new(as_map(json!({"quickTerm.autoChangeDirectory": "sometimes"})), Map::new());
        assert_eq!(Settings::from_config(&bad).auto_cd, AutoCdPolicy::Workspace);
    }
}
