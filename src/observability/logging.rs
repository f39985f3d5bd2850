use crate::time::UtcTime;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::Mutex;

/// Severity levels, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging capability owned by the client and shared by all subsystems.
///
/// `tracker` is the trace id of the operation the record belongs to, empty
/// for client-lifecycle records.
pub trait Logger: Send + Sync {
    fn level(&self) -> LogLevel;
    fn record(&self, level: LogLevel, module: &str, tracker: &str, message: &str);

    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }
}

#[derive(Serialize)]
struct LogRecord<'a> {
    ts: String,
    level: &'static str,
    module: &'a str,
    tracker: &'a str,
    message: &'a str,
}

/// JSON-line logger writing to an arbitrary sink.
pub struct JsonLineLogger {
    level: LogLevel,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl JsonLineLogger {
    pub fn new(level: LogLevel, sink: Box<dyn Write + Send>) -> Self {
        Self {
            level,
            sink: Mutex::new(sink),
        }
    }

    /// Default production logger: stderr at the given level.
    pub fn stderr(level: LogLevel) -> Self {
        Self::new(level, Box::new(std::io::stderr()))
    }
}

impl Logger for JsonLineLogger {
    fn level(&self) -> LogLevel {
        self.level
    }

    fn record(&self, level: LogLevel, module: &str, tracker: &str, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let record = LogRecord {
            ts: UtcTime::now().to_iso8601(),
            level: level.as_str(),
            module,
            tracker,
            message,
        };
        if let Ok(line) = serde_json::to_string(&record) {
            let mut sink = self.sink.lock().expect("log sink poisoned");
            let _ = writeln!(sink, "{line}");
        }
    }
}

/// Logger that drops everything; handy in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn level(&self) -> LogLevel {
        LogLevel::Error
    }

    fn record(&self, _level: LogLevel, _module: &str, _tracker: &str, _message: &str) {}
}
