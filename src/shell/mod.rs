/// Shell integration module
///
/// Handles shell detection and hands dispatched commands to a terminal.

pub mod shell_detector;
pub mod sink;

pub use shell_detector::{Shell, ShellDetector};
pub use sink::{ShellSink, StdoutSink, TerminalSink};
