//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use zonal_lib::alarm::{BooleanOperator, ComparisonOperator};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print every registered Prometheus metric in text exposition format
pub fn print_metrics() -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    print!("{}", String::from_utf8(buffer)?);
    Ok(())
}

/// Colored boolean operator keyword of a composite
pub fn color_operator(operator: BooleanOperator) -> String {
    match operator {
        BooleanOperator::All => "ALL".magenta().bold().to_string(),
        BooleanOperator::Any => "ANY".blue().bold().to_string(),
    }
}

/// Condition of a leaf, e.g. `< 99.9`
pub fn format_condition(comparison: ComparisonOperator, threshold: f64) -> String {
    format!("{} {}", comparison.symbol(), threshold)
}
