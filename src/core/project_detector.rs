/// Project root detection for auto-cd
///
/// Picks the directory a command should run in. Commands like `pytest` or
/// `npm` are matched against a rule table, then the directory tree is walked
/// upwards from the active file looking for that tool's marker files
/// (`pytest.ini`, `package.json`, ...). The walk never leaves the workspace.

use crate::core::context::AutoCdPolicy;
use crate::core::escape::escape;
use lazy_static::lazy_static;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

/// Placeholders that only make sense next to the file itself
const FILE_ONLY_PLACEHOLDERS: &[&str] = &[
    "{filename}",
    "{filestem}",
    "{fileext}",
    "{fileBasename}",
    "{fileBasenameNoExtension}",
    "{fileExtname}",
];

/// A command family and the files that mark its project root
#[derive(Debug)]
pub struct CommandRule {
    pub pattern: Regex,
    pub markers: &'static [&'static str],
}

impl CommandRule {
    fn new(pattern: &str, markers: &'static [&'static str]) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("static command rule must compile"),
            markers,
        }
    }
}

// Python tools may be invoked as `python -m tool` or `{pythonPath} -m tool`.
const PY_MODULE: &str = r"^((?:[^\s]*python[^\s]*|\{pythonPath\})\s+-m\s+)?";

lazy_static! {
    /// Ordered rule table; the first matching rule wins
    pub static ref COMMAND_RULES: Vec<CommandRule> = vec![
        // Python
        CommandRule::new(&format!(r"{}pytest(\s|$)", PY_MODULE), &["pytest.ini", "pyproject.toml", "tox.ini", "setup.cfg"]),
        CommandRule::new(&format!(r"{}ruff(\s|$)", PY_MODULE), &["pyproject.toml", "ruff.toml", ".ruff.toml"]),
        CommandRule::new(&format!(r"{}black(\s|$)", PY_MODULE), &["pyproject.toml", ".black"]),
        CommandRule::new(&format!(r"{}mypy(\s|$)", PY_MODULE), &["mypy.ini", "pyproject.toml", "setup.cfg"]),
        CommandRule::new(r"^uv(\s|$)", &["pyproject.toml"]),
        CommandRule::new(r"^flake8(\s|$)", &["setup.cfg", "tox.ini", ".flake8"]),
        CommandRule::new(r"^poetry(\s|$)", &["pyproject.toml"]),

        // Docker
        CommandRule::new(
            r"^docker\s+compose(\s|$)|^docker-compose(\s|$)",
            &["docker-compose.yml", "docker-compose.yaml", "compose.yml", "compose.yaml"],
        ),

        // Node.js
        CommandRule::new(r"^(npm|yarn|pnpm)(\s|$)", &["package.json"]),
        CommandRule::new(
            r"^vite(\s|$)",
            &["vite.config.js", "vite.config.ts", "vite.config.mjs", "vite.config.cjs", "package.json"],
        ),
        CommandRule::new(r"^tsc(\s|$)", &["tsconfig.json"]),
        CommandRule::new(
            r"^eslint(\s|$)",
            &[
                ".eslintrc.js",
                ".eslintrc.json",
                ".eslintrc.yml",
                ".eslintrc.yaml",
                "eslint.config.js",
                "eslint.config.mjs",
                "package.json",
            ],
        ),

        // Build systems
        CommandRule::new(r"^make(\s|$)", &["Makefile", "makefile", "GNUmakefile"]),
        CommandRule::new(
            r"^(gradle|gradlew|\./gradlew)(\s|$)",
            &["build.gradle", "build.gradle.kts", "gradlew", "settings.gradle", "settings.gradle.kts"],
        ),
        CommandRule::new(r"^(mvn|mvnw|\./mvnw)(\s|$)", &["pom.xml", "mvnw"]),

        // Everything else
        CommandRule::new(r"^terraform(\s|$)", &["main.tf", "variables.tf", "outputs.tf", "terraform.tf"]),
        CommandRule::new(r"^ansible-playbook(\s|$)", &["ansible.cfg", "playbook.yml", "site.yml", "inventory"]),
        CommandRule::new(r"^cargo(\s|$)", &["Cargo.toml"]),
        CommandRule::new(r"^go(\s|$)", &["go.mod"]),
        CommandRule::new(r"^composer(\s|$)", &["composer.json"]),
        CommandRule::new(r"^(bundle|bundler)(\s|$)", &["Gemfile"]),
        CommandRule::new(r"^dotnet(\s|$)", &["*.csproj", "*.sln", "*.fsproj", "*.vbproj"]),
        CommandRule::new(r"^helm(\s|$)", &["Chart.yaml", "Chart.yml"]),
    ];
}

/// Filesystem probes used by the ancestor walk
pub trait FileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool>;
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>>;
}

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }
}

/// Handles working directory inference
pub struct ProjectDetector<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ProjectDetector<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Prefix `command` with a `cd` according to `policy`
    ///
    /// Empty or whitespace-only commands come back unchanged.
    pub fn apply(
        &self,
        policy: AutoCdPolicy,
        command: &str,
        file_dir: &str,
        workspace_root: Option<&str>,
    ) -> String {
        if command.trim().is_empty() {
            return command.to_string();
        }

        match policy {
            AutoCdPolicy::None => command.to_string(),
            AutoCdPolicy::File => cd_prefix(file_dir, command),
            AutoCdPolicy::Workspace => match workspace_root {
                Some(root) => cd_prefix(root, command),
                None => command.to_string(),
            },
            AutoCdPolicy::Auto => self.apply_auto(command, file_dir, workspace_root),
        }
    }

    /// Rule-based inference: cd into the closest directory holding a marker
    pub fn apply_auto(&self, command: &str, file_dir: &str, workspace_root: Option<&str>) -> String {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return command.to_string();
        }

        if uses_file_only_placeholder(trimmed) {
            return cd_prefix(file_dir, command);
        }

        if let Some(rule) = Self::matching_rule(trimmed) {
            if let Some(dir) = self.find_marker_dir(Path::new(file_dir), rule.markers, workspace_root.map(Path::new)) {
                log::debug!("Auto-cd: '{}' runs in '{}'", trimmed, dir.display());
                return cd_prefix(&dir.to_string_lossy(), command);
            }
        }

        cd_prefix(file_dir, command)
    }

    /// The first rule whose pattern matches the command
    pub fn matching_rule(command: &str) -> Option<&'static CommandRule> {
        COMMAND_RULES.iter().find(|rule| rule.pattern.is_match(command))
    }

    /// Walk up from `start` until a directory contains one of `markers`
    ///
    /// The boundary directory itself is still checked. The filesystem root is
    /// never probed, and probe failures count as "not found".
    pub fn find_marker_dir(&self, start: &Path, markers: &[&str], boundary: Option<&Path>) -> Option<PathBuf> {
        let mut current = start;

        loop {
            let parent = match current.parent() {
                Some(parent) if parent != current => parent,
                _ => return None,
            };

            if markers.iter().any(|marker| self.has_marker(current, marker)) {
                return Some(current.to_path_buf());
            }

            if boundary.is_some_and(|b| b == current) {
                return None;
            }

            current = parent;
        }
    }

    fn has_marker(&self, dir: &Path, marker: &str) -> bool {
        let probe = if marker.contains('*') {
            wildcard_regex(marker).and_then(|re| {
                self.fs
                    .list_dir(dir)
                    .map(|names| names.iter().any(|name| re.is_match(name)))
            })
        } else {
            self.fs.exists(&dir.join(marker))
        };

        match probe {
            Ok(found) => found,
            Err(e) => {
                log::debug!("Marker probe '{}' in '{}' failed: {}", marker, dir.display(), e);
                false
            }
        }
    }
}

fn cd_prefix(dir: &str, command: &str) -> String {
    format!("cd {} && {}", escape(dir), command)
}

fn uses_file_only_placeholder(command: &str) -> bool {
    command
        .split_whitespace()
        .any(|part| FILE_ONLY_PLACEHOLDERS.contains(&part))
}

/// `*.csproj` -> `^.*\.csproj$`, case-sensitive
fn wildcard_regex(marker: &str) -> io::Result<Regex> {
    let pattern = marker
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}$", pattern)).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    /// In-memory tree: a set of existing paths plus directory listings
    #[derive(Default)]
    struct MemoryFs {
        files: HashSet<PathBuf>,
        failing: HashSet<PathBuf>,
    }

    impl MemoryFs {
        fn with_files(paths: &[&str]) -> Self {
            Self {
                files: paths.iter().map(PathBuf::from).collect(),
                failing: HashSet::new(),
            }
        }
    }

    impl FileSystem for MemoryFs {
        fn exists(&self, path: &Path) -> io::Result<bool> {
            if path.parent().is_some_and(|p| self.failing.contains(p)) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self.files.contains(path))
        }

        fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
            if self.failing.contains(dir) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self
                .files
                .iter()
                .filter(|file| file.parent() == Some(dir))
                .filter_map(|file| file.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect())
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_pytest_finds_project_root() {
        let fs = MemoryFs::with_files(&["/ws/proj/pytest.ini", "/ws/proj/src/test_x.py"]);
        let detector = ProjectDetector::new(&fs);

        let result = detector.apply_auto("pytest", "/ws/proj/src", Some("/ws"));
        assert_eq!(result, "cd /ws/proj && pytest");
    }

    #[test]
    fn test_marker_above_workspace_is_ignored() {
        let fs = MemoryFs::with_files(&["/pytest.ini", "/ws/proj/src/x.py"]);
        let detector = ProjectDetector::new(&fs);

        let result = detector.apply_auto("pytest", "/ws/proj/src", Some("/ws"));
        assert_eq!(result, "cd /ws/proj/src && pytest");
    }

    #[test]
    fn test_marker_at_workspace_root_is_found() {
        let fs = MemoryFs::with_files(&["/ws/package.json"]);
        let detector = ProjectDetector::new(&fs);

        let result = detector.apply_auto("npm run build", "/ws/app/src", Some("/ws"));
        assert_eq!(result, "cd /ws && npm run build");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // `python -m pytest` matches the pytest rule; pyproject.toml lives higher
        // up than a ruff.toml that a later rule would have picked.
        let fs = MemoryFs::with_files(&["/ws/pyproject.toml", "/ws/proj/ruff.toml"]);
        let detector = ProjectDetector::new(&fs);

        let rule = ProjectDetector::matching_rule("python -m pytest -x").unwrap();
        assert!(rule.markers.contains(&"pytest.ini"));

        let result = detector.apply_auto("python -m pytest -x", "/ws/proj/src", Some("/ws"));
        assert_eq!(result, "cd /ws && python -m pytest -x");
    }

    #[test]
    fn test_python_path_placeholder_module_form() {
        let rule = ProjectDetector::matching_rule("{pythonPath} -m mypy src").unwrap();
        assert!(rule.markers.contains(&"mypy.ini"));
    }

    #[test]
    fn test_rule_matching_is_case_sensitive_and_anchored() {
        assert!(ProjectDetector::matching_rule("Cargo build").is_none());
        assert!(ProjectDetector::matching_rule("echo cargo").is_none());
        assert!(ProjectDetector::matching_rule("cargo").is_some());
        assert!(ProjectDetector::matching_rule("cargoo build").is_none());
        assert!(ProjectDetector::matching_rule("docker compose up").is_some());
        assert!(ProjectDetector::matching_rule("./gradlew test").is_some());
    }

    #[test]
    fn test_file_only_placeholder_short_circuits() {
        let fs = MemoryFs::with_files(&["/ws/Makefile"]);
        let detector = ProjectDetector::new(&fs);

        let result = detector.apply_auto("make {filestem}", "/ws/src", Some("/ws"));
        assert_eq!(result, "cd /ws/src && make {filestem}");

        // Glued to other text it is not standalone
        let result = detector.apply_auto("make {filestem}.o", "/ws/src", Some("/ws"));
        assert_eq!(result, "cd /ws && make {filestem}.o");
    }

    #[test]
    fn test_unmatched_command_falls_back_to_file_dir() {
        let fs = MemoryFs::default();
        let detector = ProjectDetector::new(&fs);

        let result = detector.apply_auto("echo \"hello world\"", "/ws/src", Some("/ws"));
        assert_eq!(result, "cd /ws/src && echo \"hello world\"");
    }

    #[test]
    fn test_empty_command_is_untouched() {
        let fs = MemoryFs::default();
        let detector = ProjectDetector::new(&fs);

        assert_eq!(detector.apply_auto("", "/ws", None), "");
        assert_eq!(detector.apply_auto("   ", "/ws", None), "   ");
        assert_eq!(detector.apply(AutoCdPolicy::File, "  ", "/ws", None), "  ");
    }

    #[test]
    fn test_wildcard_markers() {
        let fs = MemoryFs::with_files(&["/ws/app/App.csproj", "/ws/app/src/Program.cs"]);
        let detector = ProjectDetector::new(&fs);

        let result = detector.apply_auto("dotnet build", "/ws/app/src", Some("/ws"));
        assert_eq!(result, "cd /ws/app && dotnet build");
    }

    #[test]
    fn test_wildcard_regex_escapes_dots() {
        let re = wildcard_regex("*.sln").unwrap();
        assert!(re.is_match("App.sln"));
        assert!(!re.is_match("Appxsln"));
        assert!(!re.is_match("App.SLN"));
        assert!(!re.is_match("App.sln.bak"));
    }

    #[test]
    fn test_probe_errors_count_as_absent() {
        let mut fs = MemoryFs::with_files(&["/ws/proj/pytest.ini", "/ws/Cargo.toml"]);
        fs.failing.insert(PathBuf::from("/ws/proj"));
        let detector = ProjectDetector::new(&fs);

        assert_eq!(
            detector.apply_auto("pytest", "/ws/proj", Some("/ws")),
            "cd /ws/proj && pytest"
        );
        assert_eq!(
            detector.apply_auto("cargo test", "/ws/proj", Some("/ws")),
            "cd /ws && cargo test"
        );
    }

    #[test]
    fn test_walk_without_boundary_stops_before_root() {
        let fs = MemoryFs::with_files(&["/go.mod"]);
        let detector = ProjectDetector::new(&fs);

        assert!(detector
            .find_marker_dir(Path::new("/a/b"), &["go.mod"], None)
            .is_none());
    }

    #[test]
    fn test_file_and_workspace_policies() {
        let fs = MemoryFs::default();
        let detector = ProjectDetector::new(&fs);

        assert_eq!(
            detector.apply(AutoCdPolicy::File, "ls", "/home/user/My Project", Some("/ws")),
            "cd \"/home/user/My Project\" && ls"
        );
        assert_eq!(
            detector.apply(AutoCdPolicy::Workspace, "ls", "/ws/src", Some("/ws")),
            "cd /ws && ls"
        );
        assert_eq!(detector.apply(AutoCdPolicy::Workspace, "ls", "/ws/src", None), "ls");
        assert_eq!(detector.apply(AutoCdPolicy::None, "ls", "/ws/src", Some("/ws")), "ls");
    }

    #[test]
    fn test_real_filesystem_walk() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("workspace").join("project");
        let src = project.join("src");
        fs::create_dir_all(&src).unwrap();
        touch(&project.join("Cargo.toml"));

        let workspace = temp.path().join("workspace");
        let detector = ProjectDetector::new(&RealFileSystem);
        let found = detector.find_marker_dir(&src, &["Cargo.toml"], Some(workspace.as_path()));
        assert_eq!(found, Some(project));
    }

    #[test]
    fn test_real_filesystem_respects_boundary() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("workspace");
        let src = workspace.join("project").join("src");
        fs::create_dir_all(&src).unwrap();
        touch(&temp.path().join("pytest.ini"));

        let detector = ProjectDetector::new(&RealFileSystem);
        let result = detector.apply_auto("pytest", &src.to_string_lossy(), Some(&workspace.to_string_lossy()));

        assert_eq!(result, format!("cd {} && pytest", escape(&src.to_string_lossy())));
    }

    #[test]
    fn test_real_filesystem_quotes_paths_with_spaces() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("my project");
        let tests = project.join("tests");
        fs::create_dir_all(&tests).unwrap();
        touch(&project.join("pyproject.toml"));

        let detector = ProjectDetector::new(&RealFileSystem);
        let result = detector.apply_auto("pytest", &tests.to_string_lossy(), Some(&temp.path().to_string_lossy()));

        assert_eq!(result, format!("cd {} && pytest", escape(&project.to_string_lossy())));
        assert!(result.starts_with("cd \""));
    }
}
