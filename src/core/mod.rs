/// Core functionality modules
///
/// Contains the resolution engine: shell quoting, the resolution context,
/// working directory inference, interpreter lookup and placeholder expansion.

pub mod context;
pub mod escape;
pub mod interpreter;
pub mod project_detector;
pub mod resolver;

pub use context::{
    ActiveDocument, AutoCdPolicy, ConfigLayer, ConfigLookup, ContextDetector, EnvLookup, FileInfo,
    ProcessEnv, ResolutionContext, WorkspaceFolder,
};
pub use escape::escape;
pub use interpreter::{EnvInterpreter, InterpreterService};
pub use project_detector::{FileSystem, ProjectDetector, RealFileSystem};
pub use resolver::{resolve, PlaceholderResolver, Resolution, ResolutionWarning};
