use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use crate::error::Result;
use crate::fmt;
use crate::pipeline::Pipeline;
use crate::transformer::CleanedRow;

use super::SourceArgs;

pub fn run(args: &SourceArgs) -> Result<()> {
    let (pipeline, file_name) = super::open_pipeline(args)?;

    println!(
        "{file_name}: {} columns mapped, date format {}",
        pipeline.state().column_map.len(),
        pipeline.state().config.date_format
    );
    println!("{}", render(&pipeline));

    let ready = pipeline.rows_ready();
    let failed = pipeline.state().error_map.len();
    println!("{}", format!("{ready} rows ready").green());
    if failed > 0 {
        println!("{}", format!("{failed} rows with errors").red());
    }
    Ok(())
}

/// One table row per input line: coerced values for clean rows, `ERR:`
/// markers straight from the error map for failed ones.
pub(crate) fn render(pipeline: &Pipeline) -> Table {
    let state = pipeline.state();
    let fields: Vec<_> = pipeline
        .schema()
        .fields
        .iter()
        .filter(|f| {
            state.column_map.contains_key(f.key)
                || state.cleaned_rows.iter().any(|r| r.values.contains_key(f.key))
        })
        .collect();

    let cleaned_by_index: BTreeMap<usize, &CleanedRow> = state
        .cleaned_rows
        .iter()
        .map(|r| (r.original_index, r))
        .collect();

    let mut table = Table::new();
    let mut header = vec!["#".to_string()];
    header.extend(fields.iter().map(|f| f.label.to_string()));
    table.set_header(header);

    for (index, raw_row) in state.rows.iter().enumerate() {
        let mut cells = vec![Cell::new(index)];
        let errors = state.error_map.get(&index);
        let cleaned = cleaned_by_index.get(&index);
        for field in &fields {
            let cell = if let Some(message) = errors.and_then(|e| e.get(field.key)) {
                Cell::new(format!("ERR: {message}")).fg(Color::Red)
            } else if let Some(value) = cleaned.and_then(|r| r.values.get(field.key)) {
                Cell::new(fmt::cell(value))
            } else {
                let raw = state
                    .column_map
                    .get(field.key)
                    .and_then(|h| raw_row.get(h))
                    .cloned()
                    .unwrap_or_default();
                Cell::new(raw)
            };
            cells.push(cell);
        }
        table.add_row(cells);
    }
    table
}
