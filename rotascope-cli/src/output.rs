use std::{io, path::Path};

use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use rotascope::{DeobfuscationResult, Error};

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

/// Tabular writer backed by `comfy-table`, printing whitespace-aligned columns
/// to stderr so stdout carries only the link.
pub struct TabWriter {
    table: Table,
    indent: String,
}

impl TabWriter {
    /// Create a new `TabWriter` with the given `(header, alignment)` columns.
    pub fn new(columns: Vec<(&str, Align)>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let headers: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        table.set_header(headers);

        let last = columns.len().saturating_sub(1);
        for (i, (_, align)) in columns.iter().enumerate() {
            let cell_align = match align {
                Align::Left => CellAlignment::Left,
                Align::Right => CellAlignment::Right,
            };
            if let Some(col) = table.column_mut(i) {
                col.set_cell_alignment(cell_align);
                let pad_left = if i == 0 { 0 } else { 1 };
                let pad_right = if i == last { 0 } else { 1 };
                col.set_padding((pad_left, pad_right));
            }
        }

        Self {
            table,
            indent: String::new(),
        }
    }

    /// Set the indent prefix for every line.
    pub fn indent(mut self, prefix: &str) -> Self {
        self.indent = prefix.to_string();
        self
    }

    /// Add a row. Values are given in column order.
    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    /// Print the table to stderr.
    pub fn eprint(&self) {
        for line in self.table.to_string().lines() {
            eprintln!("{}{}", self.indent, line.trim_end());
        }
    }
}

/// Prints the discovery summary and per-kind rewrite counts.
pub fn print_stats(result: &DeobfuscationResult) {
    match (&result.loader, &result.decoder) {
        (Some(loader), Some(decoder)) => {
            eprintln!("  Loader:      {loader} ({} strings)", result.table_len);
            eprintln!("  Decoder:     {decoder}");
        }
        (Some(loader), None) => {
            eprintln!("  Loader:      {loader} ({} strings)", result.table_len);
            eprintln!("  Decoder:     not found");
        }
        _ => eprintln!("  Loader:      not found"),
    }
    eprintln!(
        "  Iterations:  {}{}",
        result.iterations,
        if result.reached_fixed_point {
            ""
        } else {
            " (limit reached)"
        }
    );
    eprintln!("  Time:        {:.2?}", result.total_time);
    eprintln!();

    let mut table = TabWriter::new(vec![("Rewrite", Align::Left), ("Count", Align::Right)]).indent("  ");
    for (kind, count) in result.events.kind_totals() {
        table.row(vec![kind.to_string(), count.to_string()]);
    }
    table.row(vec!["total".to_string(), result.events.len().to_string()]);
    table.eprint();
}

/// Reports a failed run on stderr, with the most specific explanation
/// available for its cause.
pub fn print_failure(err: &anyhow::Error, input: &Path) {
    for cause in err.chain() {
        if let Some(error) = cause.downcast_ref::<Error>() {
            match error {
                Error::Parse(failure) => {
                    eprintln!("\n--- PARSING FAILED ---");
                    eprintln!("Parser error: {failure}");
                    if !failure.excerpt().is_empty() {
                        eprintln!("\n--- Code around the error on line {} ---", failure.line());
                        eprint!("{}", failure.excerpt());
                        eprintln!("------------------------------------------");
                        eprintln!(
                            "Look for invisible characters or broken syntax on the line marked with \">>\"."
                        );
                    }
                    return;
                }
                Error::ScriptNotFound { marker } => {
                    eprintln!(
                        "Error: Could not find an inline <script> containing `{marker}` to deobfuscate."
                    );
                    return;
                }
                _ => {}
            }
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::NotFound {
                eprintln!("Error: Input file not found at {}", input.display());
                return;
            }
        }
    }

    eprintln!("Error: {err:#}");
}
