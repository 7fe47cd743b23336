//! Destinations for streamed command output

use std::io::Write;

/// Stream a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Receives forwarded output lines while a command runs
///
/// Called concurrently from the stdout and stderr readers. Lines arrive
/// without their trailing newline and already carry any configured prefix.
pub trait OutputSink: Send + Sync {
    fn write_line(&self, stream: OutputStream, line: &str);
}

/// Writes stdout lines to stdout and stderr lines to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl OutputSink for StdioSink {
    fn write_line(&self, stream: OutputStream, line: &str) {
        // Forwarding is best effort; a closed terminal must not fail the run.
        let _ = match stream {
            OutputStream::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            OutputStream::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
        };
    }
}
