//! Output formatting and writing utilities
//!
//! This module provides utilities for formatting and writing output
//! in various formats (JSON, YAML, human-readable), with specialised
//! human renderings for execution outcomes and manifest reports.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use relaymap_core::ExecutionOutcome;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use tracing::trace;

/// One template row in a manifest check report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub source: String,
    pub target: String,
    pub versions: usize,
    pub active_version: Option<u32>,
}

/// Result of `relaymap check`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub manifest: String,
    pub adapters: usize,
    pub templates: Vec<TemplateSummary>,
}

/// Trait for formatting output with specialized support for common types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format the outcome of an execution
    fn format_outcome(&self, outcome: &ExecutionOutcome) -> Result<String>;

    /// Format a manifest check report
    fn format_check_report(&self, report: &CheckReport) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => {
                // For human format, use pretty JSON as fallback
                Ok(serde_json::to_string_pretty(value)?)
            }
        }
    }

    fn format_outcome(&self, outcome: &ExecutionOutcome) -> Result<String> {
        match self {
            OutputFormat::Human => format_outcome_human(outcome),
            _ => self.format(outcome),
        }
    }

    fn format_check_report(&self, report: &CheckReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_check_report_human(report)),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    verbose: u8,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            format,
            use_color,
            show_progress: !quiet && format == OutputFormat::Human && io::stderr().is_terminal(),
            quiet,
            verbose,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        verbose: u8,
        writer: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            use_color,
            show_progress: false, // No progress bars with custom writers
            quiet,
            verbose,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Get verbosity level
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        if tracing::enabled!(tracing::Level::TRACE) {
            let value_json = serde_json::to_value(value)?;
            trace!(data = %redaction::redacted(&value_json), "Outputting data");
        }

        let formatted = self.format.format(value)?;
        self.emit(&formatted)
    }

    /// Write an execution outcome
    pub fn outcome(&mut self, outcome: &ExecutionOutcome) -> Result<()> {
        let formatted = self.format.format_outcome(outcome)?;
        self.emit(&formatted)
    }

    /// Write a manifest check report
    pub fn check_report(&mut self, report: &CheckReport) -> Result<()> {
        let formatted = self.format.format_check_report(report)?;
        self.emit(&formatted)
    }

    fn emit(&mut self, formatted: &str) -> Result<()> {
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Helper function to create a spinner style
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Render rows under headers with padded columns
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let pad_row = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(width) => format!("{:width$}", cell, width = *width),
                None => cell.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&pad_row(headers.to_vec()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&pad_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

/// Format an execution outcome for human reading
fn format_outcome_human(outcome: &ExecutionOutcome) -> Result<String> {
    let mut output = String::new();

    output.push_str("═══ Mapped Data ═══\n");
    if outcome.mapped_data.is_empty() {
        output.push_str("  (no fields)\n");
    }
    for (field, value) in &outcome.mapped_data {
        output.push_str(&format!("  {}: {}\n", field, format_value_compact(value)));
    }

    output.push_str("\n═══ Target Response ═══\n");
    match &outcome.target_response {
        Some(response) => {
            output.push_str(&serde_json::to_string_pretty(response)?);
            output.push('\n');
        }
        None => output.push_str("  (passive target, nothing sent)\n"),
    }

    Ok(output)
}

/// Format a manifest check report for human reading
fn format_check_report_human(report: &CheckReport) -> String {
    let mut output = format!(
        "✓ {} is valid: {} adapter(s), {} template(s)\n",
        report.manifest,
        report.adapters,
        report.templates.len()
    );

    if report.templates.is_empty() {
        return output;
    }

    let rows = report
        .templates
        .iter()
        .map(|template| {
            vec![
                template.id.clone(),
                format!("{} → {}", template.source, template.target),
                template.versions.to_string(),
                template
                    .active_version
                    .map(|n| format!("v{}", n))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();

    output.push('\n');
    output.push_str(&render_table(&["TEMPLATE", "FLOW", "VERSIONS", "ACTIVE"], &rows));
    output
}

/// Format a JSON value in a compact, human-readable way
fn format_value_compact(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            if arr.len() <= 3 {
                format!(
                    "[{}]",
                    arr.iter()
                        .map(format_value_compact)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            } else {
                format!("[{} items]", arr.len())
            }
        }
        Value::Object(obj) => {
            if obj.len() <= 2 {
                let items: Vec<String> = obj
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, format_value_compact(v)))
                    .collect();
                format!("{{{}}}", items.join(", "))
            } else {
                format!("{{{} fields}}", obj.len())
            }
        }
    }
}
