use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use once_cell::sync::Lazy;

use crate::answer::Ratings;
use crate::error::{Error, Result};
use crate::instrument::{Instrument, DAS, DBQ28, PANAS, PERCEPTION};
use crate::scorer::{Aggregation, SubscaleTotal};

/// The three questionnaire configurations. Each one owns its own,
/// incompatible table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    DasPanas,
    DasPerception,
    DasDbq,
}

impl Variant {
    pub fn survey(self) -> &'static Survey {
        match self {
            Variant::DasPanas => &DAS_PANAS,
            Variant::DasPerception => &DAS_PERCEPTION,
            Variant::DasDbq => &DAS_DBQ,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::DasPanas => "das-panas",
            Variant::DasPerception => "das-perception",
            Variant::DasDbq => "das-dbq",
        };
        f.write_str(name)
    }
}

/// Enumerated demographic selector.
#[derive(Debug, Clone, Copy)]
pub struct DemographicField {
    pub name: &'static str,
    pub label: &'static str,
    pub choices: &'static [&'static str],
}

const DRIVER_PROFILE: &[DemographicField] = &[
    DemographicField {
        name: "sex",
        label: "Sexe",
        choices: &["Homme", "Femme", "Autre"],
    },
    DemographicField {
        name: "age_group",
        label: "Tranche d'âge",
        choices: &["18-25", "26-35", "36-50", "51-65", "65+"],
    },
    DemographicField {
        name: "licence_years",
        label: "Ancienneté du permis",
        choices: &["Moins de 2 ans", "2 à 5 ans", "6 à 10 ans", "Plus de 10 ans"],
    },
    DemographicField {
        name: "driving_frequency",
        label: "Fréquence de conduite",
        choices: &["Tous les jours", "Plusieurs fois par semaine", "Occasionnellement"],
    },
];

pub static DAS_PANAS: Lazy<Survey> = Lazy::new(|| Survey {
    variant: Variant::DasPanas,
    title: "Questionnaire : Colère et Humeur (DAS & PANAS)",
    schema_version: 1,
    demographics: &[],
    instruments: vec![&*DAS, &*PANAS],
    chart: &["das_total", "pa_total", "na_total"],
});

pub static DAS_PERCEPTION: Lazy<Survey> = Lazy::new(|| Survey {
    variant: Variant::DasPerception,
    title: "Questionnaire : Colère au volant et perception du risque",
    schema_version: 2,
    demographics: DRIVER_PROFILE,
    instruments: vec![&*DAS, &*PERCEPTION],
    chart: &["das_total", "perceived_risk", "self_efficacy"],
});

pub static DAS_DBQ: Lazy<Survey> = Lazy::new(|| Survey {
    variant: Variant::DasDbq,
    title: "Questionnaire : Colère et comportement au volant (DAS & DBQ-28)",
    schema_version: 3,
    demographics: DRIVER_PROFILE,
    instruments: vec![&*DAS, &*DBQ28],
    chart: &["das_total", "violations", "errors", "lapses"],
});

#[derive(Debug)]
pub struct Survey {
    pub variant: Variant,
    pub title: &'static str,
    /// Distinct per variant and written into every row; `ensure_schema`
    /// refuses a table holding rows of another version.
    pub schema_version: i64,
    pub demographics: &'static [DemographicField],
    pub instruments: Vec<&'static Instrument>,
    /// Total columns drawn on the dashboard.
    pub chart: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    SchemaVersion,
    Demographic,
    Scores,
    Total(Aggregation),
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Id => "INTEGER PRIMARY KEY AUTOINCREMENT",
            ColumnKind::SchemaVersion => "INTEGER NOT NULL",
            ColumnKind::Demographic | ColumnKind::Scores => "TEXT NOT NULL",
            ColumnKind::Total(Aggregation::Sum) => "INTEGER NOT NULL",
            ColumnKind::Total(Aggregation::Mean) => "REAL NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// One submission before scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub demographics: BTreeMap<String, String>,
    /// Instrument key -> ratings.
    pub answers: BTreeMap<String, Ratings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResponse {
    pub response: Response,
    pub totals: Vec<SubscaleTotal>,
}

impl ScoredResponse {
    pub fn total(&self, name: &str) -> Option<&SubscaleTotal> {
        self.totals.iter().find(|total| total.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub id: i64,
    /// As read from the row, not the current survey's value.
    pub schema_version: i64,
    pub scored: ScoredResponse,
}

impl Survey {
    pub fn instrument(&self, key: &str) -> Option<&'static Instrument> {
        self.instruments
            .iter()
            .copied()
            .find(|instrument| instrument.key == key)
    }

    /// Table layout shared by the DDL, row decoding and CSV export.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![
            Column {
                name: "id".to_string(),
                kind: ColumnKind::Id,
            },
            Column {
                name: "schema_version".to_string(),
                kind: ColumnKind::SchemaVersion,
            },
        ];
        columns.extend(self.demographics.iter().map(|field| Column {
            name: field.name.to_string(),
            kind: ColumnKind::Demographic,
        }));
        columns.extend(self.instruments.iter().map(|instrument| Column {
            name: instrument.scores_column(),
            kind: ColumnKind::Scores,
        }));
        for instrument in &self.instruments {
            columns.extend(instrument.subscales.iter().map(|subscale| Column {
                name: subscale.name.clone(),
                kind: ColumnKind::Total(subscale.policy),
            }));
        }
        columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns().into_iter().map(|column| column.name).collect()
    }

    /// Validates a submission and computes its subscale totals.
    pub fn score(&self, response: Response) -> Result<ScoredResponse> {
        self.check_demographics(&response.demographics)?;
        if let Some(key) = response
            .answers
            .keys()
            .find(|key| self.instrument(key).is_none())
        {
            return Err(Error::UnknownInstrument(key.clone()));
        }
        let mut totals = Vec::new();
        for instrument in &self.instruments {
            let ratings = response
                .answers
                .get(&instrument.key)
                .ok_or_else(|| Error::MissingInstrument(instrument.key.clone()))?;
            totals.extend(instrument.score(ratings)?);
        }
        Ok(ScoredResponse { response, totals })
    }

    fn check_demographics(&self, values: &BTreeMap<String, String>) -> Result<()> {
        for field in self.demographics {
            let value = values
                .get(field.name)
                .ok_or_else(|| Error::MissingDemographic(field.name.to_string()))?;
            if !field.choices.contains(&value.as_str()) {
                return Err(Error::IllegalDemographic {
                    field: field.name.to_string(),
                    value: value.clone(),
                });
            }
        }
        if let Some((name, value)) = values
            .iter()
            .find(|(name, _)| !self.demographics.iter().any(|field| field.name == *name))
        {
            return Err(Error::IllegalDemographic {
                field: name.clone(),
                value: value.clone(),
            });
        }
        Ok(())
    }
}
