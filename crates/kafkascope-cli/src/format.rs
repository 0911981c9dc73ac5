//! Output formatting for kscope
//!
//! - Text: one header line per message, indented fields, coloured diagnostics
//! - JSON: one object per line

use crate::config::OutputFormat;
use anyhow::Result;
use bytes::Bytes;
use colored::*;
use kafkascope_kafka::error::error_code_text;
use kafkascope_kafka::records::{DecodedRecord, LegacyMessage};
use kafkascope_kafka::registry;
use kafkascope_kafka::schema::{DecodedField, FieldValue};
use kafkascope_kafka::{
    ConnectionKey, DecodedMessage, Diagnostic, Diagnostics, Direction, RecordSet, RecordSetEntry,
    Severity,
};
use std::fmt::Write;

/// Longest key/value preview in text output.
const PREVIEW_LIMIT: usize = 64;

/// Totals printed after the last message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub messages: usize,
    pub with_diagnostics: usize,
    pub unmatched_requests: usize,
}

/// Format and print output based on configured format
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    pub fn print_message(&self, message: &DecodedMessage) -> Result<()> {
        println!("{}", self.render_message(message)?);
        Ok(())
    }

    /// Stream-level problems that belong to no message, such as a bad length prefix.
    pub fn print_stream_diagnostics(
        &self,
        connection: &ConnectionKey,
        direction: Direction,
        diagnostics: &Diagnostics,
    ) -> Result<()> {
        if diagnostics.is_empty() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "connection": connection,
                    "direction": direction,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string(&value)?);
            }
            OutputFormat::Text => {
                println!("{} {}", connection, direction);
                for diagnostic in diagnostics.iter() {
                    println!("    {}", self.diagnostic_line(diagnostic));
                }
            }
        }
        Ok(())
    }

    pub fn print_summary(&self, summary: &Summary) {
        if self.format == OutputFormat::Json {
            return;
        }
        let line = format!(
            "{} messages, {} with diagnostics, {} requests awaiting a response",
            summary.messages, summary.with_diagnostics, summary.unmatched_requests
        );
        if self.colored {
            println!("{}", line.bold());
        } else {
            println!("{}", line);
        }
    }

    pub fn render_message(&self, message: &DecodedMessage) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(message)?),
            OutputFormat::Text => Ok(self.render_text(message)),
        }
    }

    fn render_text(&self, message: &DecodedMessage) -> String {
        let mut out = String::new();

        let arrow = match message.direction {
            Direction::Request => self.paint("->", Color::Green),
            Direction::Response => self.paint("<-", Color::Cyan),
        };
        let api = match (message.api_name, message.api_version) {
            (Some(name), Some(version)) => format!("{} v{}", name, version),
            _ => "?".to_string(),
        };
        let _ = write!(
            out,
            "[{}.{}] {} {} {}",
            message.message.frame,
            message.message.index,
            message.connection,
            arrow,
            if self.colored { api.bold().to_string() } else { api },
        );
        if let Some(correlation_id) = message.correlation_id {
            let _ = write!(out, " corr={}", correlation_id);
        }
        if let Some(client_id) = &message.client_id {
            let _ = write!(out, " client={}", client_id);
        }
        let _ = write!(out, " ({} bytes)", message.length);
        if let Some(exchange) = &message.exchange {
            match (message.direction, exchange.response) {
                (Direction::Request, Some(response)) => {
                    let _ = write!(out, " answered in [{}.{}]", response.frame, response.index);
                }
                (Direction::Request, None) if !exchange.expects_response => {
                    out.push_str(" no response expected");
                }
                (Direction::Response, _) => {
                    let _ = write!(
                        out,
                        " answers [{}.{}]",
                        exchange.request.frame, exchange.request.index
                    );
                }
                _ => {}
            }
        }

        self.render_fields(&mut out, &message.fields, 1);
        if let Some(raw) = &message.raw_body {
            let _ = write!(out, "\n    body: {}", preview(raw));
        }
        for diagnostic in message.diagnostics.iter() {
            let _ = write!(out, "\n    {}", self.diagnostic_line(diagnostic));
        }
        out
    }

    fn render_fields(&self, out: &mut String, fields: &[DecodedField], depth: usize) {
        for field in fields {
            self.render_value(out, field.name, &field.value, depth);
        }
    }

    fn render_value(&self, out: &mut String, name: &str, value: &FieldValue, depth: usize) {
        let indent = "    ".repeat(depth);
        match value {
            FieldValue::Int(n) => {
                let _ = write!(out, "\n{}{}: {}", indent, name, n);
            }
            FieldValue::Bool(b) => {
                let _ = write!(out, "\n{}{}: {}", indent, name, b);
            }
            FieldValue::ErrorCode(code) => {
                let text = format!("{} ({})", code, error_code_text(*code));
                let text = if *code != 0 { self.paint(&text, Color::Red) } else { text };
                let _ = write!(out, "\n{}{}: {}", indent, name, text);
            }
            FieldValue::ApiKey(key) => {
                let _ = write!(out, "\n{}{}: {} ({})", indent, name, key, registry::api_name(*key));
            }
            FieldValue::String(Some(s)) => {
                let _ = write!(out, "\n{}{}: {:?}", indent, name, s);
            }
            FieldValue::String(None) | FieldValue::Bytes(None) | FieldValue::Array(None) => {
                let _ = write!(out, "\n{}{}: null", indent, name);
            }
            FieldValue::Bytes(Some(b)) => {
                let _ = write!(out, "\n{}{}: {}", indent, name, preview(b));
            }
            FieldValue::Array(Some(items)) => {
                let _ = write!(out, "\n{}{}: [{}]", indent, name, items.len());
                for (i, item) in items.iter().enumerate() {
                    self.render_value(out, &format!("[{}]", i), item, depth + 1);
                }
            }
            FieldValue::Struct(fields) => {
                let _ = write!(out, "\n{}{}:", indent, name);
                self.render_fields(out, fields, depth + 1);
            }
            FieldValue::Records(set) => {
                let _ = write!(
                    out,
                    "\n{}{}: {} entries, {} records",
                    indent,
                    name,
                    set.entries.len(),
                    set.record_count()
                );
                render_record_set(out, set, depth + 1);
            }
        }
    }

    fn diagnostic_line(&self, diagnostic: &Diagnostic) -> String {
        let line = diagnostic.to_string();
        match diagnostic.severity {
            Severity::Error => self.paint(&line, Color::Red),
            Severity::Warning => self.paint(&line, Color::Yellow),
            Severity::Note => self.paint(&line, Color::Blue),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.colored {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}

fn render_record_set(out: &mut String, set: &RecordSet, depth: usize) {
    let indent = "    ".repeat(depth);
    for entry in &set.entries {
        match entry {
            RecordSetEntry::Legacy(message) => render_legacy(out, message, depth),
            RecordSetEntry::Batch(batch) => {
                let header = &batch.header;
                let codec = header
                    .compression()
                    .map_or_else(|| format!("codec#{}", header.codec), |c| format!("{:?}", c).to_lowercase());
                let _ = write!(
                    out,
                    "\n{}batch base_offset={} records={} codec={}",
                    indent, header.base_offset, header.record_count, codec
                );
                if header.producer_id >= 0 {
                    let _ = write!(out, " producer={}/{}", header.producer_id, header.producer_epoch);
                }
                if header.is_transactional {
                    out.push_str(" transactional");
                }
                if header.is_control {
                    out.push_str(" control");
                }
                if batch.decompress_failed {
                    out.push_str(" (undecompressed)");
                }
                for record in &batch.records {
                    render_record(out, record, depth + 1);
                }
            }
            RecordSetEntry::Unknown { offset, magic, size } => {
                let _ = write!(
                    out,
                    "\n{}offset={} magic={} skipped {} bytes",
                    indent, offset, magic, size
                );
            }
        }
    }
}

fn render_legacy(out: &mut String, message: &LegacyMessage, depth: usize) {
    let indent = "    ".repeat(depth);
    let _ = write!(out, "\n{}offset={} magic={}", indent, message.offset, message.magic);
    if let Some(timestamp) = message.timestamp {
        let _ = write!(out, " timestamp={}", timestamp);
    }
    match &message.nested {
        Some(nested) => {
            if let Some(codec) = message.codec {
                let _ = write!(out, " codec={}", format!("{:?}", codec).to_lowercase());
            }
            render_record_set(out, nested, depth + 1);
        }
        None => {
            let _ = write!(
                out,
                " key={} value={}",
                preview_opt(&message.key),
                preview_opt(&message.value)
            );
        }
    }
}

fn render_record(out: &mut String, record: &DecodedRecord, depth: usize) {
    let indent = "    ".repeat(depth);
    let _ = write!(out, "\n{}offset={} timestamp={}", indent, record.offset, record.timestamp);
    match &record.control {
        Some(control) => {
            let _ = write!(out, " control={:?}", control.kind);
        }
        None => {
            let _ = write!(
                out,
                " key={} value={}",
                preview_opt(&record.key),
                preview_opt(&record.value)
            );
        }
    }
    for header in &record.headers {
        let _ = write!(
            out,
            " {}={}",
            header.key.as_deref().unwrap_or("null"),
            preview_opt(&header.value)
        );
    }
}

fn preview_opt(data: &Option<Bytes>) -> String {
    data.as_ref().map_or_else(|| "null".to_string(), preview)
}

/// Printable UTF-8 renders quoted, anything else as hex.
fn preview(data: &Bytes) -> String {
    match std::str::from_utf8(data) {
        Ok(text) if !text.chars().any(char::is_control) => {
            if text.chars().count() > PREVIEW_LIMIT {
                let cut: String = text.chars().take(PREVIEW_LIMIT).collect();
                format!("{:?}...", cut)
            } else {
                format!("{:?}", text)
            }
        }
        _ => {
            let shown = &data[..data.len().min(PREVIEW_LIMIT / 2)];
            let suffix = if shown.len() < data.len() { "..." } else { "" };
            format!("0x{}{}", hex::encode(shown), suffix)
        }
    }
}
