use anyhow::Result;
use clap::ValueEnum;
use common::sql::{Cell, ResultTable};
use common::QueryArtifact;

/// widest a column gets before values are cut short
const MAX_COLUMN_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn truncate_value(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else if max_width <= 3 {
        value.chars().take(max_width).collect()
    } else {
        format!("{}...", value.chars().take(max_width - 3).collect::<String>())
    }
}

fn display_cell(cell: &Cell) -> String {
    truncate_value(&cell.to_string().replace('\n', " "), MAX_COLUMN_WIDTH)
}

/// boxed ascii table in the style of the mysql client
pub fn format_table(table: &ResultTable) -> String {
    let headers: Vec<String> = table
        .columns()
        .iter()
        .map(|c| truncate_value(c, MAX_COLUMN_WIDTH))
        .collect();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(display_cell).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let border = format!(
        "+{}+\n",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let line = |values: &[String]| {
        let cells: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:<width$} ", v, width = *w))
            .collect();
        format!("|{}|\n", cells.join("|"))
    };

    let mut out = border.clone();
    out.push_str(&line(&headers[..]));
    out.push_str(&border);
    for row in &rows {
        out.push_str(&line(&row[..]));
    }
    out.push_str(&border);
    out
}

pub fn render_artifact(artifact: &QueryArtifact, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "sql": artifact.sql,
            "message": artifact.message,
            "result": artifact.result,
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    out.push_str("-- generated sql\n");
    out.push_str(&artifact.sql);
    out.push_str("\n\n");
    out.push_str(&artifact.message);
    out.push('\n');

    match &artifact.result {
        Some(table) if table.is_empty() => {
            out.push_str("\nquery executed successfully but returned no results.\n");
        }
        Some(table) => {
            out.push('\n');
            match format {
                OutputFormat::Csv => out.push_str(&table.to_csv_string()?),
                _ => out.push_str(&format_table(table)),
            }
            out.push_str(&format!(
                "{} rows, {} columns\n",
                table.row_count(),
                table.column_count()
            ));
        }
        None => {}
    }

    Ok(out)
}
