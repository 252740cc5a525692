//! Console API
//!
//! console.log, console.warn, console.error, etc., routed to tracing.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

/// Script-facing diagnostic sink
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl Console {
    /// Log values with a specific level, space separated
    pub fn write(&self, level: ConsoleLevel, values: &[&dyn Display]) {
        let output = format_values(values);
        match level {
            ConsoleLevel::Error => tracing::error!("[console] {}", output),
            ConsoleLevel::Warn => tracing::warn!("[console] {}", output),
            ConsoleLevel::Debug => tracing::debug!("[console] {}", output),
            ConsoleLevel::Log | ConsoleLevel::Info => tracing::info!("[console] {}", output),
        }
    }

    pub fn log(&self, message: impl Display) {
        self.write(ConsoleLevel::Log, &[&message]);
    }

    pub fn info(&self, message: impl Display) {
        self.write(ConsoleLevel::Info, &[&message]);
    }

    pub fn warn(&self, message: impl Display) {
        self.write(ConsoleLevel::Warn, &[&message]);
    }

    pub fn error(&self, message: impl Display) {
        self.write(ConsoleLevel::Error, &[&message]);
    }

    pub fn debug(&self, message: impl Display) {
        self.write(ConsoleLevel::Debug, &[&message]);
    }
}

fn format_values(values: &[&dyn Display]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_values() {
        assert_eq!(format_values(&[&"Hello", &42, &true]), "Hello 42 true");
        assert_eq!(format_values(&[]), "");
    }

    #[test]
    fn test_console_levels() {
        let console = Console;
        console.log("test message");
        console.write(ConsoleLevel::Warn, &[&"careful", &1.5]);
        console.error(format_args!("failed {}", 3));
    }
}
