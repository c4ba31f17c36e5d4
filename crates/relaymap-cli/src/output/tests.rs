// Tests for output formatting
//
// Included from output.rs so the private human formatters are reachable.

use super::*;
use serde_json::{json, Map};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let writer = OutputWriter::with_writer(format, false, quiet, 0, Box::new(buffer.clone()));
    (writer, buffer)
}

fn outcome(target_response: Option<Value>) -> ExecutionOutcome {
    let mut mapped_data = Map::new();
    mapped_data.insert("account_name".to_string(), json!("ACME"));
    mapped_data.insert("revenue".to_string(), json!(12.5));
    ExecutionOutcome {
        mapped_data,
        target_response,
    }
}

#[test]
fn test_outcome_formatting_human() {
    let formatted = format_outcome_human(&outcome(Some(json!({"id": "acc-1"})))).unwrap();
    assert!(formatted.contains("═══ Mapped Data ═══"));
    assert!(formatted.contains("  account_name: \"ACME\""));
    assert!(formatted.contains("  revenue: 12.5"));
    assert!(formatted.contains("═══ Target Response ═══"));
    assert!(formatted.contains("\"id\": \"acc-1\""));
}

#[test]
fn test_outcome_formatting_passive_target() {
    let formatted = format_outcome_human(&ExecutionOutcome {
        mapped_data: Map::new(),
        target_response: None,
    })
    .unwrap();
    assert!(formatted.contains("(no fields)"));
    assert!(formatted.contains("(passive target, nothing sent)"));
}

#[test]
fn test_outcome_formatting_json() {
    let formatted = OutputFormat::Json.format_outcome(&outcome(None)).unwrap();
    let parsed: Value = serde_json::from_str(&formatted).unwrap();
    assert_eq!(
        parsed,
        json!({"mapped_data": {"account_name": "ACME", "revenue": 12.5}, "target_response": null})
    );
}

#[test]
fn test_check_report_human() {
    let report = CheckReport {
        manifest: "hub.yaml".to_string(),
        adapters: 2,
        templates: vec![TemplateSummary {
            id: "erp-to-crm".to_string(),
            name: "ERP to CRM".to_string(),
            source: "erp".to_string(),
            target: "crm".to_string(),
            versions: 2,
            active_version: Some(2),
        }],
    };

    let formatted = format_check_report_human(&report);
    assert!(formatted.starts_with("✓ hub.yaml is valid: 2 adapter(s), 1 template(s)\n"));
    assert!(formatted.contains("TEMPLATE"));
    assert!(formatted.contains("erp-to-crm │ erp → crm │ 2        │ v2"));
}

#[test]
fn test_render_table_pads_columns() {
    let table = render_table(
        &["A", "LONGER"],
        &[vec!["wide cell".to_string(), "x".to_string()]],
    );
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "A         │ LONGER");
    assert_eq!(lines[1], "──────────┼───────");
    assert_eq!(lines[2], "wide cell │ x");
}

#[test]
fn test_format_value_compact() {
    assert_eq!(format_value_compact(&json!("hello")), "\"hello\"");
    assert_eq!(format_value_compact(&json!(42)), "42");
    assert_eq!(format_value_compact(&json!(true)), "true");
    assert_eq!(format_value_compact(&json!(null)), "null");
    assert_eq!(format_value_compact(&json!([1, 2, 3])), "[1, 2, 3]");
    assert_eq!(format_value_compact(&json!([1, 2, 3, 4, 5])), "[5 items]");
    assert_eq!(format_value_compact(&json!({"a": 1, "b": 2})), "{a: 1, b: 2}");
    assert_eq!(format_value_compact(&json!({"a": 1, "b": 2, "c": 3})), "{3 fields}");
}

#[test]
fn test_quiet_writer_suppresses_messages() {
    let (mut out, buffer) = writer(OutputFormat::Human, true);
    out.info("loading").unwrap();
    out.success("done").unwrap();
    out.section("Details").unwrap();
    out.outcome(&outcome(None)).unwrap();

    let contents = buffer.contents();
    assert!(!contents.contains("loading"));
    assert!(!contents.contains("done"));
    assert!(contents.contains("account_name"));
}

#[test]
fn test_machine_formats_skip_messages() {
    let (mut out, buffer) = writer(OutputFormat::Json, false);
    out.info("loading").unwrap();
    out.warning("careful").unwrap();
    out.data(&json!({"status": "ok"})).unwrap();

    assert_eq!(buffer.contents(), "{\"status\":\"ok\"}\n");
}

#[test]
fn test_human_messages_without_color() {
    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.info("loading").unwrap();
    out.warning("careful").unwrap();
    out.section("Details").unwrap();

    assert_eq!(
        buffer.contents(),
        "INFO: loading\nWARNING: careful\n\n=== Details ===\n"
    );
}

#[test]
fn test_output_writer_creation() {
    let writer = OutputWriter::new(OutputFormat::Yaml, true, false, 1);
    assert_eq!(writer.format(), OutputFormat::Yaml);
    assert_eq!(writer.verbosity(), 1);
    assert!(writer.spinner("working").is_none());
}
