use std::collections::BTreeMap;
use std::io::Read;

use csv::StringRecord;

use crate::answer::AnswerSheet;
use crate::error::{Error, Result};
use crate::survey::{Response, Survey};

/// Reads answers from CSV, one respondent per row.
///
/// The header names the demographic fields and one `<instrument>_<item>`
/// column per item, e.g. `das_1` .. `das_14`. An empty cell is an
/// unanswered item. Rows are numbered from 1.
pub fn read_bulk<'a, R: Read + 'a>(
    survey: &'a Survey,
    reader: R,
) -> Box<dyn Iterator<Item = Result<(usize, Response)>> + 'a> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => return Box::new(std::iter::once(Err(err.into()))),
    };
    Box::new(
        reader
            .into_records()
            .enumerate()
            .map(move |(index, record)| {
                let response = parse_row(survey, &headers, &record?)?;
                Ok((index + 1, response))
            }),
    )
}

fn parse_row(survey: &Survey, headers: &StringRecord, record: &StringRecord) -> Result<Response> {
    let mut demographics = BTreeMap::new();
    let mut sheets = survey
        .instruments
        .iter()
        .map(|&instrument| (instrument.key.as_str(), AnswerSheet::new(instrument)))
        .collect::<BTreeMap<_, _>>();

    for (column, value) in headers.iter().zip(record.iter()) {
        let value = value.trim();
        if survey.demographics.iter().any(|field| field.name == column) {
            demographics.insert(column.to_string(), value.to_string());
            continue;
        }
        let (key, item) = column
            .rsplit_once('_')
            .and_then(|(key, item)| Some((key, item.parse::<u32>().ok()?)))
            .ok_or_else(|| Error::UnknownInstrument(column.to_string()))?;
        let sheet = sheets
            .get_mut(key)
            .ok_or_else(|| Error::UnknownInstrument(key.to_string()))?;
        if value.is_empty() {
            continue;
        }
        let rating = value.parse::<u8>().map_err(|_| Error::IllegalValue {
            column: column.to_string(),
            value: value.to_string(),
        })?;
        sheet.insert(item, rating)?;
    }

    let mut answers = BTreeMap::new();
    for (key, sheet) in sheets {
        answers.insert(key.to_string(), sheet.into_ratings()?);
    }
    Ok(Response {
        demographics,
        answers,
    })
}
