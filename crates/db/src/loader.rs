//! One-shot bulk load of a CSV file into a SQLite table.
//!
//! Runs once at provider construction and never again on the query path. The
//! target table is named after the source file's stem; generated queries rely
//! on that naming rule.

use std::path::Path;

use macroquery_core::schema::{ColumnSpec, ColumnType, DataSource};
use sqlx::{Connection, SqliteConnection};

use crate::provider::DataError;

/// Loads `csv_path` into a table named after the file stem, replacing any
/// existing table of that name, and returns the resulting source descriptor
/// with inferred column types.
pub(crate) async fn load_csv(
    conn: &mut SqliteConnection,
    csv_path: &Path,
) -> Result<DataSource, DataError> {
    let table_name = csv_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| load_error(csv_path, "source file has no usable name for a table"))?
        .to_string();

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|error| load_error(csv_path, format!("could not open CSV: {error}")))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| load_error(csv_path, format!("could not read CSV header: {error}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(load_error(csv_path, "CSV header row has no columns"));
    }

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|error| load_error(csv_path, format!("malformed CSV record: {error}")))?;
        records.push(record);
    }

    let column_types = infer_column_types(headers.len(), &records);

    let create_sql = create_table_sql(&table_name, &headers, &column_types);
    let insert_sql = insert_sql(&table_name, &headers);

    let mut tx = conn
        .begin()
        .await
        .map_err(|error| load_error(csv_path, format!("could not begin load transaction: {error}")))?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(&table_name)))
        .execute(&mut *tx)
        .await
        .map_err(|error| load_error(csv_path, format!("could not replace table: {error}")))?;
    sqlx::query(&create_sql)
        .execute(&mut *tx)
        .await
        .map_err(|error| load_error(csv_path, format!("could not create table: {error}")))?;

    for record in &records {
        let mut query = sqlx::query(&insert_sql);
        for (index, column_type) in column_types.iter().enumerate() {
            let cell = record.get(index).unwrap_or("").trim();
            query = bind_cell(query, cell, *column_type)
                .map_err(|reason| load_error(csv_path, reason))?;
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|error| load_error(csv_path, format!("could not insert row: {error}")))?;
    }

    tx.commit()
        .await
        .map_err(|error| load_error(csv_path, format!("could not commit load: {error}")))?;

    tracing::debug!(
        event_name = "data.load.completed",
        table = %table_name,
        rows = records.len(),
        columns = headers.len(),
        "bulk-loaded CSV into SQLite"
    );

    let columns = headers
        .into_iter()
        .zip(column_types)
        .map(|(name, column_type)| (name, ColumnSpec::new("", column_type)))
        .collect();
    Ok(DataSource::new(table_name, columns))
}

/// Per-column inference over every non-empty cell: INTEGER if all values
/// parse as i64, REAL if all parse as f64, TEXT otherwise. A column with no
/// values at all stays TEXT.
fn infer_column_types(column_count: usize, records: &[csv::StringRecord]) -> Vec<ColumnType> {
    (0..column_count)
        .map(|index| {
            let mut saw_value = false;
            let mut all_integers = true;
            let mut all_floats = true;
            for record in records {
                let cell = record.get(index).unwrap_or("").trim();
                if cell.is_empty() {
                    continue;
                }
                saw_value = true;
                if cell.parse::<i64>().is_err() {
                    all_integers = false;
                }
                if cell.parse::<f64>().is_err() {
                    all_floats = false;
                    break;
                }
            }
            match (saw_value, all_integers, all_floats) {
                (false, _, _) => ColumnType::String,
                (true, true, _) => ColumnType::Integer,
                (true, false, true) => ColumnType::Float,
                (true, false, false) => ColumnType::String,
            }
        })
        .collect()
}

fn create_table_sql(table_name: &str, headers: &[String], types: &[ColumnType]) -> String {
    let columns = headers
        .iter()
        .zip(types)
        .map(|(name, column_type)| format!("{} {}", quote_ident(name), sql_type(*column_type)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({columns})", quote_ident(table_name))
}

fn insert_sql(table_name: &str, headers: &[String]) -> String {
    let columns =
        headers.iter().map(|name| quote_ident(name)).collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; headers.len()].join(", ");
    format!("INSERT INTO {} ({columns}) VALUES ({placeholders})", quote_ident(table_name))
}

fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::String => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::Float => "REAL",
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

type SqliteQuery<'q> =
    sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_cell<'q>(
    query: SqliteQuery<'q>,
    cell: &str,
    column_type: ColumnType,
) -> Result<SqliteQuery<'q>, String> {
    if cell.is_empty() {
        return Ok(match column_type {
            ColumnType::String => query.bind(None::<String>),
            ColumnType::Integer => query.bind(None::<i64>),
            ColumnType::Float => query.bind(None::<f64>),
        });
    }
    Ok(match column_type {
        ColumnType::String => query.bind(cell.to_string()),
        ColumnType::Integer => {
            let value: i64 = cell
                .parse()
                .map_err(|_| format!("cell `{cell}` does not fit inferred INTEGER column"))?;
            query.bind(value)
        }
        ColumnType::Float => {
            let value: f64 = cell
                .parse()
                .map_err(|_| format!("cell `{cell}` does not fit inferred REAL column"))?;
            query.bind(value)
        }
    })
}

fn load_error(path: &Path, reason: impl Into<String>) -> DataError {
    DataError::Load { path: path.to_path_buf(), reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(rows: &[&[&str]]) -> Vec<csv::StringRecord> {
        rows.iter().map(|row| csv::StringRecord::from(row.to_vec())).collect()
    }

    #[test]
    fn integer_column_is_inferred_from_whole_numbers() {
        let types = infer_column_types(1, &records(&[&["1"], &["42"], &["-7"]]));
        assert_eq!(types, vec![ColumnType::Integer]);
    }

    #[test]
    fn mixed_numeric_column_widens_to_float() {
        let types = infer_column_types(1, &records(&[&["1"], &["2.5"]]));
        assert_eq!(types, vec![ColumnType::Float]);
    }

    #[test]
    fn non_numeric_column_stays_text() {
        let types = infer_column_types(1, &records(&[&["1"], &["Testland"]]));
        assert_eq!(types, vec![ColumnType::String]);
    }

    #[test]
    fn empty_cells_do_not_affect_inference() {
        let types = infer_column_types(2, &records(&[&["", "3.5"], &["10", ""]]));
        assert_eq!(types, vec![ColumnType::Integer, ColumnType::Float]);
    }

    #[test]
    fn all_empty_column_defaults_to_text() {
        let types = infer_column_types(1, &records(&[&[""], &[""]]));
        assert_eq!(types, vec![ColumnType::String]);
    }

    #[test]
    fn identifiers_are_double_quoted() {
        assert_eq!(quote_ident("gdp"), "\"gdp\"");
        assert_eq!(quote_ident("wei\"rd"), "\"wei\"\"rd\"");
    }

    #[test]
    fn create_table_sql_maps_types() {
        let sql = create_table_sql(
            "t",
            &["name".to_string(), "year".to_string(), "gdp".to_string()],
            &[ColumnType::String, ColumnType::Integer, ColumnType::Float],
        );
        assert_eq!(sql, "CREATE TABLE \"t\" (\"name\" TEXT, \"year\" INTEGER, \"gdp\" REAL)");
    }
}
