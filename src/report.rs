use std::io::Write;

use tracing::warn;

use crate::error::{Error, Result};
use crate::survey::{ColumnKind, StoredResponse, Survey};

const BAR_WIDTH: usize = 40;

/// Raw per-record values of the chart columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub id: i64,
    pub values: Vec<(String, f64)>,
}

/// One record as display strings, in column order.
pub fn record_cells(survey: &Survey, record: &StoredResponse) -> Result<Vec<String>> {
    let response = &record.scored.response;
    survey
        .columns()
        .into_iter()
        .map(|column| {
            let missing = || Error::MissingColumn(column.name.clone());
            Ok(match column.kind {
                ColumnKind::Id => record.id.to_string(),
                ColumnKind::SchemaVersion => record.schema_version.to_string(),
                ColumnKind::Demographic => response
                    .demographics
                    .get(&column.name)
                    .cloned()
                    .ok_or_else(missing)?,
                ColumnKind::Scores => {
                    let instrument = survey
                        .instruments
                        .iter()
                        .find(|instrument| instrument.scores_column() == column.name)
                        .ok_or_else(missing)?;
                    response
                        .answers
                        .get(&instrument.key)
                        .ok_or_else(missing)?
                        .to_json()?
                }
                ColumnKind::Total(_) => record
                    .scored
                    .total(&column.name)
                    .ok_or_else(missing)?
                    .value
                    .to_string(),
            })
        })
        .collect()
}

/// CSV bytes with a header row, or `None` when there is nothing to export.
pub fn export_csv(survey: &Survey, records: &[StoredResponse]) -> Result<Option<Vec<u8>>> {
    if records.is_empty() {
        warn!(variant = %survey.variant, "no responses to export");
        return Ok(None);
    }
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(survey.column_names())?;
    for record in records {
        writer.write_record(record_cells(survey, record)?)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))?;
    Ok(Some(bytes))
}

/// Chart values, one row per record, no aggregation.
pub fn summarize(survey: &Survey, records: &[StoredResponse]) -> Result<Vec<ChartRow>> {
    records
        .iter()
        .map(|record| {
            let values = survey
                .chart
                .iter()
                .map(|&name| {
                    let total = record
                        .scored
                        .total(name)
                        .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
                    Ok((name.to_string(), total.value.as_f64()))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ChartRow {
                id: record.id,
                values,
            })
        })
        .collect()
}

pub fn render_table<W: Write>(
    survey: &Survey,
    records: &[StoredResponse],
    out: &mut W,
) -> Result<()> {
    let header = survey.column_names();
    let rows = records
        .iter()
        .map(|record| record_cells(survey, record))
        .collect::<Result<Vec<_>>>()?;

    let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, &header, &widths)?;
    let rule = widths
        .iter()
        .map(|&width| "-".repeat(width))
        .collect::<Vec<_>>();
    write_row(out, &rule, &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

/// One bar per record and column, scaled to the largest value shown.
pub fn render_bar_chart<W: Write>(rows: &[ChartRow], out: &mut W) -> Result<()> {
    let max = rows
        .iter()
        .flat_map(|row| row.values.iter().map(|(_, value)| *value))
        .fold(0.0_f64, f64::max);
    let label_width = rows
        .iter()
        .flat_map(|row| row.values.iter().map(|(name, _)| name.len()))
        .max()
        .unwrap_or(0);

    for row in rows {
        for (name, value) in &row.values {
            let length = if max > 0.0 {
                ((value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            writeln!(
                out,
                "#{:<5} {name:<label_width$} {:<BAR_WIDTH$} {value}",
                row.id,
                "█".repeat(length),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::Store;
    use crate::survey::test::uniform_response;
    use crate::survey::{DAS_DBQ, DAS_PANAS, DAS_PERCEPTION};

    fn stored(survey: &'static Survey, ratings: &[u8]) -> Vec<StoredResponse> {
        let store = Store::memory(survey).unwrap();
        store.ensure_schema().unwrap();
        for &rating in ratings {
            let scored = survey.score(uniform_response(survey, rating)).unwrap();
            store.insert(&scored).unwrap();
        }
        store.query_all().unwrap()
    }

    #[test]
    fn test_export_empty() {
        assert!(export_csv(&DAS_PANAS, &[]).unwrap().is_none());
    }

    #[test]
    fn test_export_rows() {
        let records = stored(&DAS_PANAS, &[1, 3, 5]);
        let bytes = export_csv(&DAS_PANAS, &records).unwrap().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "id,schema_version,das_scores,panas_scores,das_total,pa_total,na_total"
        );
        assert!(lines[1].starts_with("1,1,\"{\"\"1\"\":1,"));
        assert!(lines[2].ends_with(",42,30,30"));
    }

    #[test]
    fn test_export_parses_back() {
        let records = stored(&DAS_DBQ, &[2, 5]);
        let bytes = export_csv(&DAS_DBQ, &records).unwrap().unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), DAS_DBQ.columns().len());
        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][2], "Homme");
        assert_eq!(&rows[1][11], "60");
    }

    #[test]
    fn test_export_keeps_stored_version() {
        let mut records = stored(&DAS_PANAS, &[3]);
        records[0].schema_version = 7;
        let bytes = export_csv(&DAS_PANAS, &records).unwrap().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("1,7,"));
    }

    #[test]
    fn test_summarize() {
        let records = stored(&DAS_PERCEPTION, &[2, 5]);
        let chart = summarize(&DAS_PERCEPTION, &records).unwrap();
        assert_eq!(chart.len(), 2);
        assert_eq!(
            chart[0].values,
            vec![
                ("das_total".to_string(), 28.0),
                ("perceived_risk".to_string(), 2.0),
                ("self_efficacy".to_string(), 2.0),
            ]
        );
        assert_eq!(chart[1].values[0].1, 70.0);
    }

    #[test]
    fn test_render_table() {
        let records = stored(&DAS_PANAS, &[3]);
        let mut out = Vec::new();
        render_table(&DAS_PANAS, &records, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id | schema_version | das_scores"));
        assert!(lines[2].ends_with(&format!("{:<9} | {:<8} | 30", "42", "30")));
    }

    #[test]
    fn test_render_bar_chart() {
        let rows = vec![
            ChartRow {
                id: 1,
                values: vec![("das_total".to_string(), 70.0)],
            },
            ChartRow {
                id: 2,
                values: vec![("das_total".to_string(), 35.0)],
            },
        ];
        let mut out = Vec::new();
        render_bar_chart(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('█').count(), BAR_WIDTH);
        assert_eq!(lines[1].matches('█').count(), BAR_WIDTH / 2);
        assert!(lines[1].ends_with(" 35"));
    }
}
