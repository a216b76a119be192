use crate::error::{PipelineError, Result};
use crate::structs::{Frame, Value};
use log::{debug, warn};
use rusqlite::Connection;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Number(n) => ToSqlOutput::Owned(SqlValue::Real(*n)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Identifier-safety check for destination table names: non-empty,
/// alphanumeric/underscore only, first character not a digit. Keeps table
/// names out of SQL-injection territory since they cannot be bound as
/// parameters.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Loads a [`Frame`] into a table, fully replacing any prior contents.
///
/// The table is dropped and re-created on every call; all inserts run inside
/// one transaction. Column affinity is inferred from the frame: columns whose
/// non-null values are all numeric become REAL, everything else TEXT.
///
/// A frame with zero columns cannot become a table; it is skipped with a
/// warning and the destination is left untouched.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidTableName`] when `table_name` fails the
/// identifier-safety check, and [`PipelineError::Sql`] on any database
/// failure.
pub fn load(data: &Frame, table_name: &str, conn: &mut Connection) -> Result<()> {
    if !is_safe_identifier(table_name) {
        return Err(PipelineError::InvalidTableName(table_name.to_string()));
    }
    if data.columns.is_empty() {
        warn!("Dataset for table '{table_name}' has no columns; nothing to load");
        return Ok(());
    }

    debug!("Loading data into the '{table_name}' table");
    let column_defs: Vec<String> = data
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} {}", quote_ident(name), column_affinity(data, i)))
        .collect();
    let column_names: Vec<String> = data.columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=data.columns.len()).map(|i| format!("?{i}")).collect();

    let tx = conn.transaction()?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {table_name}"))?;
    tx.execute(
        &format!("CREATE TABLE {table_name} ({})", column_defs.join(", ")),
        [],
    )?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table_name} ({}) VALUES ({})",
            column_names.join(", "),
            placeholders.join(", ")
        ))?;
        for row in &data.rows {
            stmt.execute(rusqlite::params_from_iter(row.iter()))?;
        }
    }
    tx.commit()?;

    debug!(
        "Data successfully loaded into the '{table_name}' table: {} rows",
        data.row_count()
    );
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_affinity(frame: &Frame, idx: usize) -> &'static str {
    let mut saw_number = false;
    for row in &frame.rows {
        match &row[idx] {
            Value::Number(_) => saw_number = true,
            Value::Text(_) => return "TEXT",
            Value::Null => {}
        }
    }
    if saw_number { "REAL" } else { "TEXT" }
}
