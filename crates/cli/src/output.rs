//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain `key: value` lines
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Render a list of items
pub fn render_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_default(),
        OutputFormat::Plain => items
            .iter()
            .map(|item| {
                T::headers()
                    .iter()
                    .zip(item.row())
                    .map(|(header, value)| format!("{}: {}", header, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n---\n"),
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }
    println!("{}", render_list(items, format));
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        table: String,
        rows: i64,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Table", "Rows"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.table.clone(), self.rows.to_string()]
        }
    }

    #[test]
    fn test_render_formats() {
        let items = vec![
            Row { table: "users".into(), rows: 2 },
            Row { table: "orders".into(), rows: 0 },
        ];

        let plain = render_list(&items, OutputFormat::Plain);
        assert_eq!(plain, "Table: users\nRows: 2\n---\nTable: orders\nRows: 0");

        let json: serde_json::Value =
            serde_json::from_str(&render_list(&items, OutputFormat::Json)).unwrap();
        assert_eq!(json[1]["table"], "orders");

        let table = render_list(&items, OutputFormat::Table);
        assert!(table.contains("users"));
        assert!(table.contains("Rows"));
    }
}
