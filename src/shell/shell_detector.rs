/// Shell detection logic
///
/// Works out which shell should run dispatched commands and how to hand it a
/// command string.

use crate::core::context::EnvLookup;
use crate::error::{QuickTermError, Result};

/// Supported shells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Sh,
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
}

impl Shell {
    /// Get the shell name as a string
    pub fn name(&self) -> &str {
        match self {
            Shell::Sh => "sh",
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::PowerShell => "powershell",
            Shell::Cmd => "cmd",
        }
    }

    /// Executable to launch
    pub fn program(&self) -> &str {
        match self {
            Shell::PowerShell => "pwsh",
            Shell::Cmd => "cmd.exe",
            other => other.name(),
        }
    }

    /// Flag that makes the shell run one command string and exit
    pub fn command_flag(&self) -> &str {
        match self {
            Shell::PowerShell => "-Command",
            Shell::Cmd => "/C",
            _ => "-c",
        }
    }

    /// Platform default when nothing can be detected
    pub fn platform_default() -> Shell {
        if cfg!(windows) {
            Shell::Cmd
        } else {
            Shell::Sh
        }
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shell detector
pub struct ShellDetector;

impl ShellDetector {
    /// Detect the user's shell from the environment
    ///
    /// # Returns
    /// * `Ok(Shell)` - The detected shell
    /// * `Err(QuickTermError)` - If `$SHELL` names something unsupported or
    ///   nothing is set at all
    pub fn detect(env: &dyn EnvLookup) -> Result<Shell> {
        if let Some(shell_path) = env.var("SHELL").filter(|s| !s.is_empty()) {
            let shell_name = shell_path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or("")
                .trim_end_matches(".exe")
                .to_lowercase();

            return match shell_name.as_str() {
                "sh" | "dash" => Ok(Shell::Sh),
                "bash" => Ok(Shell::Bash),
                "zsh" => Ok(Shell::Zsh),
                "fish" => Ok(Shell::Fish),
                "pwsh" | "powershell" => Ok(Shell::PowerShell),
                _ => Err(QuickTermError::Configuration(format!(
                    "Unsupported shell: {}",
                    shell_name
                ))),
            };
        }

        if env.var("PSModulePath").is_some() {
            return Ok(Shell::PowerShell);
        }

        Err(QuickTermError::Configuration(
            "Could not detect shell. Please set $SHELL environment variable.".to_string(),
        ))
    }

    /// Detect the shell, falling back to the platform default
    pub fn detect_or_default(env: &dyn EnvLookup) -> Shell {
        Self::detect(env).unwrap_or_else(|e| {
            log::debug!("{}; using {}", e, Shell::platform_default());
            Shell::platform_default()
        })
    }
}
