use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::answer::Ratings;
use crate::error::{Error, Result};
use crate::scorer::{Aggregation, SubscaleTotal, Total};
use crate::survey::{Column, ColumnKind, Response, ScoredResponse, StoredResponse, Survey};

pub const TABLE: &str = "responses";

/// Append-only response table for one survey variant.
///
/// The connection sits behind a mutex so concurrent submissions are
/// written one at a time.
pub struct Store {
    conn: Mutex<Connection>,
    survey: &'static Survey,
}

impl Store {
    pub fn open(path: &Path, survey: &'static Survey) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), variant = %survey.variant, "opened store");
        Ok(Self {
            conn: Mutex::new(conn),
            survey,
        })
    }

    pub fn memory(survey: &'static Survey) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            survey,
        })
    }

    pub fn survey(&self) -> &'static Survey {
        self.survey
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// Creates the table if absent and checks an existing one has this
    /// variant's columns and schema version.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(&create_table_sql(self.survey))?;

        let expected = self.survey.column_names();
        let found = table_columns(&conn)?;
        if found != expected {
            return Err(Error::SchemaMismatch { expected, found });
        }

        let version = self.survey.schema_version;
        let foreign: Option<i64> = conn
            .query_row(
                &format!("SELECT schema_version FROM {TABLE} WHERE schema_version != ?1 LIMIT 1"),
                params![version],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(found) = foreign {
            return Err(Error::SchemaVersion {
                expected: version,
                found,
            });
        }
        debug!(table = TABLE, columns = expected.len(), "schema ready");
        Ok(())
    }

    /// Appends one scored response and returns its id.
    pub fn insert(&self, scored: &ScoredResponse) -> Result<i64> {
        let columns: Vec<Column> = self
            .survey
            .columns()
            .into_iter()
            .filter(|column| column.kind != ColumnKind::Id)
            .collect();
        let values = columns
            .iter()
            .map(|column| self.encode(column, scored))
            .collect::<Result<Vec<Value>>>()?;

        let names = columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {TABLE} ({names}) VALUES ({placeholders})");

        let conn = self.conn()?;
        conn.execute(&sql, params_from_iter(values.iter()))?;
        let id = conn.last_insert_rowid();
        info!(id, variant = %self.survey.variant, "stored response");
        Ok(id)
    }

    /// Every stored response, in insertion order.
    pub fn query_all(&self) -> Result<Vec<StoredResponse>> {
        let columns = self.survey.columns();
        let names = columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {names} FROM {TABLE} ORDER BY id");

        let rows = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                (0..columns.len())
                    .map(|index| row.get::<_, Value>(index))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        rows.into_iter()
            .map(|row| self.decode(&columns, row))
            .collect()
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&format!("SELECT count(*) FROM {TABLE}"), [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }

    fn encode(&self, column: &Column, scored: &ScoredResponse) -> Result<Value> {
        let missing = || Error::MissingColumn(column.name.clone());
        Ok(match column.kind {
            ColumnKind::Id => return Err(missing()),
            ColumnKind::SchemaVersion => Value::Integer(self.survey.schema_version),
            ColumnKind::Demographic => Value::Text(
                scored
                    .response
                    .demographics
                    .get(&column.name)
                    .cloned()
                    .ok_or_else(missing)?,
            ),
            ColumnKind::Scores => {
                let instrument = self.instrument_for(column)?;
                let ratings = scored
                    .response
                    .answers
                    .get(&instrument)
                    .ok_or_else(missing)?;
                Value::Text(ratings.to_json()?)
            }
            ColumnKind::Total(_) => match scored.total(&column.name).ok_or_else(missing)?.value {
                Total::Sum(value) => Value::Integer(value),
                Total::Mean(value) => Value::Real(value),
            },
        })
    }

    fn decode(&self, columns: &[Column], row: Vec<Value>) -> Result<StoredResponse> {
        let mut id = None;
        let mut schema_version = None;
        let mut response = Response::default();
        let mut totals = Vec::new();
        for (column, value) in columns.iter().zip(row) {
            let mismatch = || Error::MissingColumn(column.name.clone());
            match (column.kind, value) {
                (ColumnKind::Id, Value::Integer(value)) => id = Some(value),
                (ColumnKind::SchemaVersion, Value::Integer(value)) => schema_version = Some(value),
                (ColumnKind::Demographic, Value::Text(value)) => {
                    response.demographics.insert(column.name.clone(), value);
                }
                (ColumnKind::Scores, Value::Text(text)) => {
                    let instrument = self.instrument_for(column)?;
                    response
                        .answers
                        .insert(instrument, Ratings::from_json(&text)?);
                }
                (ColumnKind::Total(Aggregation::Sum), Value::Integer(value)) => {
                    totals.push(SubscaleTotal {
                        name: column.name.clone(),
                        value: Total::Sum(value),
                    });
                }
                (ColumnKind::Total(Aggregation::Mean), Value::Real(value)) => {
                    totals.push(SubscaleTotal {
                        name: column.name.clone(),
                        value: Total::Mean(value),
                    });
                }
                (ColumnKind::Total(Aggregation::Mean), Value::Integer(value)) => {
                    totals.push(SubscaleTotal {
                        name: column.name.clone(),
                        value: Total::Mean(value as f64),
                    });
                }
                _ => return Err(mismatch()),
            }
        }
        Ok(StoredResponse {
            id: id.ok_or_else(|| Error::MissingColumn("id".to_string()))?,
            schema_version: schema_version
                .ok_or_else(|| Error::MissingColumn("schema_version".to_string()))?,
            scored: ScoredResponse { response, totals },
        })
    }

    fn instrument_for(&self, column: &Column) -> Result<String> {
        self.survey
            .instruments
            .iter()
            .find(|instrument| instrument.scores_column() == column.name)
            .map(|instrument| instrument.key.clone())
            .ok_or_else(|| Error::MissingColumn(column.name.clone()))
    }
}

fn create_table_sql(survey: &Survey) -> String {
    let columns = survey
        .columns()
        .iter()
        .map(|column| format!("    {} {}", column.name, column.kind.sql_type()))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {TABLE} (\n{columns}\n)")
}

fn table_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({TABLE})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}
