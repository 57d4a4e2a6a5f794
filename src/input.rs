//! Loading trace batches from disk
//!
//! Two layouts are accepted:
//! - a JSON array of [`TraceEventRecords`]
//! - JSON lines: one [`TraceEventRecords`] document per line, blank lines ignored

use crate::flow_event::TraceEventRecords;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read and decode all trace batches in a file
pub fn load_batches<P: AsRef<Path>>(path: P) -> Result<Vec<TraceEventRecords>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace input: {}", path.display()))?;
    parse_batches(&content).with_context(|| format!("Invalid trace input: {}", path.display()))
}

/// Decode trace batches from a JSON array or JSON lines
pub fn parse_batches(content: &str) -> Result<Vec<TraceEventRecords>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).context("Failed to parse JSON array of traces");
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse trace on line {}", idx + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_event::FlowEvent;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRACE: &str = r#"{"trace":{"trace_id":1,"session_id":"s","hostname":"srv"},"events":[{"type":"BeforeOperation","timestamp":1,"trace_id":1,"order_index":0,"operation_signature":"void a.A.a()","class_signature":"a.A"}]}"#;

    #[test]
    fn test_parse_array() {
        let batches = parse_batches(&format!("[{},{}]", TRACE, TRACE)).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].trace_id(), 1);
        assert!(matches!(batches[0].events[0], FlowEvent::BeforeOperation(_)));
    }

    #[test]
    fn test_parse_json_lines() {
        let batches = parse_batches(&format!("{}\n\n{}\n", TRACE, TRACE)).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_batches(&format!("{}\n{{oops\n", TRACE)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_batches("").unwrap().is_empty());
        assert!(parse_batches("[]").unwrap().is_empty());
    }

    #[test]
    fn test_load_batches_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", TRACE).unwrap();
        let batches = load_batches(file.path()).unwrap();
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_batches("/nonexistent/traces.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read trace input"));
    }
}
