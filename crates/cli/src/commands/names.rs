//! Variable name sequence command

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;
use zonal_lib::expression::VariableAllocator;

use crate::output::{print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct NameRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Variable")]
    name: String,
}

/// Print the first `count` names handed out by a fresh allocator
pub fn run(count: usize, format: OutputFormat) -> Result<()> {
    let rows: Vec<NameRow> = VariableAllocator::new()
        .take(count)
        .enumerate()
        .map(|(index, name)| NameRow { index, name })
        .collect();

    print_table(&rows, format)
}
