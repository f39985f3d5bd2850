use std::io::Write;
use std::sync::{Arc, Mutex};
use widerow::{JsonLineLogger, LogLevel, Logger, NullLogger};

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedSink {
    fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

#[test]
fn records_render_as_json_lines() {
    let sink = SharedSink::default();
    let logger = JsonLineLogger::new(LogLevel::Debug, Box::new(sink.clone()));
    logger.record(LogLevel::Info, "pipeline", "trace-1", "call_start action=GetRow");
    logger.record(LogLevel::Warn, "batch_writer", "", "batch_requeue rows=3");
    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["level"], "INFO");
    assert_eq!(lines[0]["module"], "pipeline");
    assert_eq!(lines[0]["tracker"], "trace-1");
    assert_eq!(lines[0]["message"], "call_start action=GetRow");
    assert_eq!(lines[1]["level"], "WARN");
    assert!(lines[1]["ts"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn lower_levels_are_filtered_out() {
    let sink = SharedSink::default();
    let logger = JsonLineLogger::new(LogLevel::Warn, Box::new(sink.clone()));
    logger.record(LogLevel::Debug, "pipeline", "", "dropped");
    logger.record(LogLevel::Info, "pipeline", "", "dropped too");
    logger.record(LogLevel::Error, "pipeline", "", "kept");
    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"], "kept");
}

#[test]
fn levels_are_ordered() {
    assert!(LogLevel::Trace < LogLevel::Debug);
    assert!(LogLevel::Debug < LogLevel::Info);
    assert!(LogLevel::Info < LogLevel::Warn);
    assert!(LogLevel::Warn < LogLevel::Error);
    assert_eq!(LogLevel::Info.as_str(), "INFO");
}

#[test]
fn null_logger_swallows_everything() {
    let logger = NullLogger;
    assert!(!logger.enabled(LogLevel::Warn));
    logger.record(LogLevel::Error, "m", "", "nothing happens");
}
