use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Serialize `value` as one line of JSON.
pub fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

/// Write a report line, ignoring a closed reader.
pub fn emit(out: &mut dyn Write, text: impl std::fmt::Display) {
    let _ = writeln!(out, "{text}");
    let _ = out.flush();
}

/// Hex preview of the first `max` bytes, e.g. `01 01 01 …`.
pub fn hex_preview(data: &[u8], max: usize) -> String {
    let mut preview = data
        .iter()
        .take(max)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > max {
        preview.push_str(" …");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_preview_truncates() {
        assert_eq!(hex_preview(&[1, 2, 0xff], 8), "01 02 ff");
        assert_eq!(hex_preview(&[0; 10], 2), "00 00 …");
        assert_eq!(hex_preview(&[], 4), "");
    }

    #[test]
    fn json_line_is_single_line() {
        #[derive(Serialize)]
        struct Sample {
            a: u8,
            b: &'static str,
        }
        let line = json_line(&Sample { a: 1, b: "x" });
        assert_eq!(line, r#"{"a":1,"b":"x"}"#);
    }
}
