/// Resolution context
///
/// Everything the placeholder resolver and the directory inference engine
/// know about the outside world: the active document, workspace folders,
/// environment, layered configuration and the filesystem. Hosts provide the
/// lookups through the traits below; `ContextDetector` builds a context from
/// the running process for the CLI.

use crate::core::interpreter::InterpreterService;
use crate::core::project_detector::{FileSystem, RealFileSystem};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// URI scheme of documents that live on the local disk
pub const LOCAL_FILE_SCHEME: &str = "file";

/// Cursor position inside the active document, 0-based like most editors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub character: usize,
}

/// Snapshot of the document the user is looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocument {
    /// Filesystem path for local files, URI path otherwise
    pub path: String,
    pub scheme: String,
    pub cursor: Cursor,
    pub selected_text: String,
}

impl ActiveDocument {
    /// A document on the local disk with the cursor at the top
    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().into_owned(),
            scheme: LOCAL_FILE_SCHEME.to_string(),
            cursor: Cursor::default(),
            selected_text: String::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn with_cursor(mut self, line: usize, character: usize) -> Self {
        self.cursor = Cursor { line, character };
        self
    }

    pub fn with_selection(mut self, text: &str) -> Self {
        self.selected_text = text.to_string();
        self
    }

    pub fn is_local(&self) -> bool {
        self.scheme == LOCAL_FILE_SCHEME
    }
}

/// An open workspace folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}

impl WorkspaceFolder {
    /// Folder named after the last component of its path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = basename(&path.to_string_lossy());
        Self { name, path }
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Derived, read-only facts about the active document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub file_basename: String,
    pub file_basename_no_extension: String,
    pub file: String,
    pub file_extname: String,
    pub file_dirname: String,
    pub file_dirname_basename: String,
    pub file_workspace_folder: String,
    pub relative_file: String,
    pub relative_file_dirname: String,
    pub line_number: usize,
    pub column_number: usize,
    pub selected_text: String,
}

impl FileInfo {
    /// Full file information for a local document
    ///
    /// Returns `None` for any other scheme; use `FileInfo::basic` for those.
    pub fn from_document(document: &ActiveDocument, folders: &[WorkspaceFolder]) -> Option<Self> {
        if !document.is_local() {
            return None;
        }

        let file = document.path.clone();
        let file_dirname = dirname(&file);
        let owner = owning_folder(Path::new(&file), folders);

        let file_workspace_folder = owner.map(|f| f.path_str()).unwrap_or_default();
        // Outside every open folder the path stays absolute.
        let relative_file = match owner.and_then(|f| Path::new(&file).strip_prefix(&f.path).ok()) {
            Some(rel) => rel.to_string_lossy().into_owned(),
            None if !folders.is_empty() => file.clone(),
            None => String::new(),
        };
        let relative_file_dirname = match dirname(&relative_file).as_str() {
            "." => String::new(),
            dir => dir.to_string(),
        };

        let basic = Self::basic(document);

        Some(Self {
            file_dirname_basename: basename(&file_dirname),
            file,
            file_dirname,
            file_workspace_folder,
            relative_file,
            relative_file_dirname,
            ..basic
        })
    }

    /// The subset that makes sense for any scheme: name parts, cursor, selection
    pub fn basic(document: &ActiveDocument) -> Self {
        let file_basename = basename(&document.path);
        let file_extname = extname(&file_basename);
        let file_basename_no_extension = file_basename
            .strip_suffix(file_extname.as_str())
            .unwrap_or(&file_basename)
            .to_string();

        Self {
            file_basename,
            file_basename_no_extension,
            file_extname,
            line_number: document.cursor.line + 1,
            column_number: document.cursor.character + 1,
            selected_text: document.selected_text.clone(),
            ..Self::default()
        }
    }
}

/// How (and whether) a `cd` prefix is injected before a resolved command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoCdPolicy {
    None,
    File,
    #[default]
    Workspace,
    #[serde(alias = "auto (experimental)")]
    Auto,
}

impl FromStr for AutoCdPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(AutoCdPolicy::None),
            "file" => Ok(AutoCdPolicy::File),
            "workspace" => Ok(AutoCdPolicy::Workspace),
            "auto" | "auto (experimental)" => Ok(AutoCdPolicy::Auto),
            other => Err(format!(
                "unknown auto-cd policy '{}' (expected none, file, workspace or auto)",
                other
            )),
        }
    }
}

impl fmt::Display for AutoCdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoCdPolicy::None => write!(f, "none"),
            AutoCdPolicy::File => write!(f, "file"),
            AutoCdPolicy::Workspace => write!(f, "workspace"),
            AutoCdPolicy::Auto => write!(f, "auto"),
        }
    }
}

/// Environment variable lookup
pub trait EnvLookup {
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A single configuration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    Workspace,
    User,
}

/// Layered configuration lookup by dotted key
pub trait ConfigLookup {
    /// Look a key up across all layers, most specific first
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Look a key up in one layer only
    fn get_in(&self, _layer: ConfigLayer, key: &str) -> Result<Option<Value>> {
        self.get(key)
    }
}

impl ConfigLookup for HashMap<String, Value> {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(HashMap::get(self, key).cloned())
    }
}

/// Everything needed to resolve one template
pub struct ResolutionContext<'a> {
    pub active_document: Option<ActiveDocument>,
    pub workspace_folders: Vec<WorkspaceFolder>,
    pub env: &'a dyn EnvLookup,
    pub config: &'a dyn ConfigLookup,
    pub interpreter: Option<&'a dyn InterpreterService>,
    pub fs: &'a dyn FileSystem,
    pub user_home: String,
    pub path_separator: char,
    pub cwd: String,
    pub auto_cd: AutoCdPolicy,
}

impl<'a> ResolutionContext<'a> {
    /// A context with no document, no workspace and the process' home/cwd
    pub fn new(env: &'a dyn EnvLookup, config: &'a dyn ConfigLookup) -> Self {
        let user_home = dirs::home_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            active_document: None,
            workspace_folders: Vec::new(),
            env,
            config,
            interpreter: None,
            fs: &RealFileSystem,
            user_home,
            path_separator: std::path::MAIN_SEPARATOR,
            cwd,
            auto_cd: AutoCdPolicy::None,
        }
    }

    pub fn with_document(mut self, document: ActiveDocument) -> Self {
        self.active_document = Some(document);
        self
    }

    pub fn with_workspace_folders(mut self, folders: Vec<WorkspaceFolder>) -> Self {
        self.workspace_folders = folders;
        self
    }

    pub fn with_auto_cd(mut self, policy: AutoCdPolicy) -> Self {
        self.auto_cd = policy;
        self
    }

    pub fn with_interpreter(mut self, interpreter: &'a dyn InterpreterService) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    pub fn with_fs(mut self, fs: &'a dyn FileSystem) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_user_home(mut self, home: &str) -> Self {
        self.user_home = home.to_string();
        self
    }

    pub fn with_cwd(mut self, cwd: &str) -> Self {
        self.cwd = cwd.to_string();
        self
    }

    /// The first workspace folder, which all workspace tokens refer to
    pub fn primary_workspace(&self) -> Option<&WorkspaceFolder> {
        self.workspace_folders.first()
    }

    /// Full file info when a local document is active
    pub fn file_info(&self) -> Option<FileInfo> {
        self.active_document
            .as_ref()
            .and_then(|doc| FileInfo::from_document(doc, &self.workspace_folders))
    }
}

/// Discovers context from the process: working directory and enclosing repo
pub struct ContextDetector;

impl ContextDetector {
    /// The work tree of the git repository containing `path`, as a workspace folder
    pub fn detect_workspace<P: AsRef<Path>>(path: P) -> Result<Option<WorkspaceFolder>> {
        let repo = match git2::Repository::discover(path.as_ref()) {
            Ok(repo) => repo,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(repo.workdir().map(|dir| {
            let trimmed = dir.components().collect::<PathBuf>();
            WorkspaceFolder::from_path(trimmed)
        }))
    }

    /// Workspace folder for the CLI: explicit paths win, then the enclosing repo
    pub fn workspace_folders(explicit: &[PathBuf], cwd: &Path) -> Vec<WorkspaceFolder> {
        if !explicit.is_empty() {
            return explicit.iter().map(WorkspaceFolder::from_path).collect();
        }

        match Self::detect_workspace(cwd) {
            Ok(Some(folder)) => vec![folder],
            Ok(None) => Vec::new(),
            Err(e) => {
                log::debug!("Workspace discovery failed for '{}': {}", cwd.display(), e);
                Vec::new()
            }
        }
    }
}

/// Last path component (`path.basename` semantics)
pub fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parent directory; `.` for a bare name, the path itself at the root
pub fn dirname(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
        Some(parent) => parent.to_string_lossy().into_owned(),
        None if path.is_empty() => ".".to_string(),
        None => path.to_string(),
    }
}

/// Extension including the dot; dotfiles like `.bashrc` have none
pub fn extname(basename: &str) -> String {
    match basename.rfind('.') {
        Some(idx) if idx > 0 => basename[idx..].to_string(),
        _ => String::new(),
    }
}

/// The workspace folder that contains `file`, preferring the deepest one
fn owning_folder<'f>(file: &Path, folders: &'f [WorkspaceFolder]) -> Option<&'f WorkspaceFolder> {
    folders
        .iter()
        .filter(|folder| file.starts_with(&folder.path))
        .max_by_key(|folder| folder.path.components().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_path_helpers() {
        assert_eq!(basename("/a/b/c.py"), "c.py");
        assert_eq!(dirname("/a/b/c.py"), "/a/b");
        assert_eq!(dirname("c.py"), ".");
        assert_eq!(dirname("/"), "/");
        assert_eq!(extname("test.spec.ts"), ".ts");
        assert_eq!(extname(".bashrc"), "");
        assert_eq!(extname("Makefile"), "");
    }

    #[test]
    fn test_file_info_for_local_document() {
        let folders = vec![WorkspaceFolder {
            name: "MyProject".to_string(),
            path: PathBuf::from("/home/user/project"),
        }];
        let doc = ActiveDocument::local("/home/user/project/src/components/Button.tsx")
            .with_cursor(10, 5)
            .with_selection("label");

        let info = FileInfo::from_document(&doc, &folders).unwrap();

        assert_eq!(info.file_basename, "Button.tsx");
        assert_eq!(info.file_basename_no_extension, "Button");
        assert_eq!(info.file_extname, ".tsx");
        assert_eq!(info.file_dirname, "/home/user/project/src/components");
        assert_eq!(info.file_dirname_basename, "components");
        assert_eq!(info.file_workspace_folder, "/home/user/project");
        assert_eq!(info.relative_file, "src/components/Button.tsx");
        assert_eq!(info.relative_file_dirname, "src/components");
        assert_eq!(info.line_number, 11);
        assert_eq!(info.column_number, 6);
        assert_eq!(info.selected_text, "label");
    }

    #[test]
    fn test_file_at_workspace_root_has_empty_relative_dir() {
        let folders = vec![WorkspaceFolder::from_path("/ws")];
        let doc = ActiveDocument::local("/ws/setup.py");

        let info = FileInfo::from_document(&doc, &folders).unwrap();
        assert_eq!(info.relative_file, "setup.py");
        assert_eq!(info.relative_file_dirname, "");
    }

    #[test]
    fn test_file_outside_workspace() {
        let folders = vec![WorkspaceFolder::from_path("/ws")];
        let doc = ActiveDocument::local("/elsewhere/notes.md");

        let info = FileInfo::from_document(&doc, &folders).unwrap();
        assert_eq!(info.file_workspace_folder, "");
        assert_eq!(info.relative_file, "/elsewhere/notes.md");
        assert_eq!(info.relative_file_dirname, "/elsewhere");
    }

    #[test]
    fn test_no_workspace_has_no_relative_path() {
        let doc = ActiveDocument::local("/elsewhere/notes.md");

        let info = FileInfo::from_document(&doc, &[]).unwrap();
        assert_eq!(info.relative_file, "");
        assert_eq!(info.relative_file_dirname, "");
    }

    #[test]
    fn test_non_local_document_has_basic_info_only() {
        let doc = ActiveDocument::local("Untitled-1").with_scheme("untitled");

        assert!(FileInfo::from_document(&doc, &[]).is_none());

        let basic = FileInfo::basic(&doc);
        assert_eq!(basic.file_basename, "Untitled-1");
        assert_eq!(basic.file_extname, "");
        assert_eq!(basic.file, "");
        assert_eq!(basic.line_number, 1);
    }

    #[test]
    fn test_auto_cd_policy_parsing() {
        assert_eq!("auto".parse::<AutoCdPolicy>().unwrap(), AutoCdPolicy::Auto);
        assert_eq!(
            "auto (experimental)".parse::<AutoCdPolicy>().unwrap(),
            AutoCdPolicy::Auto
        );
        assert_eq!("File".parse::<AutoCdPolicy>().unwrap(), AutoCdPolicy::File);
        assert!("sometimes".parse::<AutoCdPolicy>().is_err());

        let policy: AutoCdPolicy = serde_json::from_str("\"auto (experimental)\"").unwrap();
        assert_eq!(policy, AutoCdPolicy::Auto);
        assert_eq!(AutoCdPolicy::default(), AutoCdPolicy::Workspace);
    }

    #[test]
    fn test_detect_workspace_outside_repo() {
        let temp = TempDir::new().unwrap();
        let sub_dir = temp.path().join("plain");
        fs::create_dir(&sub_dir).unwrap();

        // A temp dir is normally not inside a repository; if it is, the
        // detected folder must at least contain the path.
        match ContextDetector::detect_workspace(&sub_dir).unwrap() {
            None => {}
            Some(folder) => assert!(canonical_starts_with(&sub_dir, &folder.path)),
        }
    }

    #[test]
    fn test_detect_workspace_inside_repo() {
        let temp = TempDir::new().unwrap();
        let repo_dir = temp.path().join("my-project");
        fs::create_dir(&repo_dir).unwrap();
        git2::Repository::init(&repo_dir).unwrap();

        let nested = repo_dir.join("src").join("pkg");
        fs::create_dir_all(&nested).unwrap();

        let folder = ContextDetector::detect_workspace(&nested).unwrap().unwrap();
        assert_eq!(folder.name, "my-project");
        assert!(canonical_starts_with(&nested, &folder.path));
    }

    #[test]
    fn test_explicit_workspace_wins() {
        let folders = ContextDetector::workspace_folders(
            &[PathBuf::from("/ws/api"), PathBuf::from("/ws/web")],
            Path::new("/"),
        );
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].name, "api");
    }

    // Temp dirs can sit behind symlinks (macOS /var -> /private/var).
    fn canonical_starts_with(path: &Path, prefix: &Path) -> bool {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let prefix = prefix.canonicalize().unwrap_or_else(|_| prefix.to_path_buf());
        path.starts_with(prefix)
    }
}
