use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::answer::Ratings;
use crate::error::{Error, Result};
use crate::scorer::{self, Aggregation, Group, SubscaleTotal};

/// Driving Anger Scale, 14 items rated 1-5.
pub static DAS: Lazy<Instrument> = Lazy::new(|| load(include_str!("../resources/das.json")));

/// Positive and Negative Affect Schedule, 20 items rated 1-5.
pub static PANAS: Lazy<Instrument> = Lazy::new(|| load(include_str!("../resources/panas.json")));

/// Road risk perception survey, 10 items rated 1-5, averaged.
pub static PERCEPTION: Lazy<Instrument> =
    Lazy::new(|| load(include_str!("../resources/perception.json")));

/// Driver Behaviour Questionnaire short form, 28 items rated 1-6.
pub static DBQ28: Lazy<Instrument> = Lazy::new(|| load(include_str!("../resources/dbq28.json")));

fn load(definition: &str) -> Instrument {
    let instrument: Instrument =
        serde_json::from_str(definition).expect("embedded instrument definition is valid");
    if let Err(err) = instrument.validate() {
        panic!("embedded instrument definition: {err}");
    }
    instrument
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Scale {
    pub min: u8,
    pub max: u8,
}

impl Scale {
    pub fn contains(&self, rating: u8) -> bool {
        (self.min..=self.max).contains(&rating)
    }
}

/// Label of one point on the rating scale.
#[derive(Debug, Clone, Deserialize)]
pub struct Score {
    pub score: u8,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscale {
    pub name: String,
    pub policy: Aggregation,
    pub items: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Instrument {
    /// Column prefix, e.g. `das` for `das_scores`.
    pub key: String,
    pub title: String,
    pub instruction: String,
    pub scale: Scale,
    pub scores: Vec<Score>,
    pub questions: Vec<Question>,
    pub subscales: Vec<Subscale>,
}

impl Instrument {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at a 0-based position.
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Question by its item number.
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn scores_column(&self) -> String {
        format!("{}_scores", self.key)
    }

    /// Checks that the subscales partition `1..=len()`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidPartition {
            instrument: self.key.clone(),
            reason,
        };
        for (position, question) in self.questions.iter().enumerate() {
            if question.id as usize != position + 1 {
                return Err(invalid(format!(
                    "question at position {} has id {}",
                    position + 1,
                    question.id
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for subscale in &self.subscales {
            if subscale.items.is_empty() {
                return Err(invalid(format!("{} has no items", subscale.name)));
            }
            for &item in &subscale.items {
                if item < 1 || item as usize > self.len() {
                    return Err(invalid(format!("{} names item {item}", subscale.name)));
                }
                if !seen.insert(item) {
                    return Err(invalid(format!("item {item} appears twice")));
                }
            }
        }
        if seen.len() != self.len() {
            return Err(invalid(format!(
                "{} of {} items are scored",
                seen.len(),
                self.len()
            )));
        }
        Ok(())
    }

    /// Checks every rating lies on the scale and belongs to a known item.
    pub fn check(&self, ratings: &Ratings) -> Result<()> {
        for (item, rating) in ratings.iter() {
            if item < 1 || item as usize > self.len() {
                return Err(Error::IllegalQuestion {
                    instrument: self.key.clone(),
                    item,
                });
            }
            if !self.scale.contains(rating) {
                return Err(Error::IllegalAnswer {
                    instrument: self.key.clone(),
                    item,
                    rating,
                });
            }
        }
        Ok(())
    }

    /// Subscale totals, each with its own aggregation policy.
    pub fn score(&self, ratings: &Ratings) -> Result<Vec<SubscaleTotal>> {
        self.check(ratings)?;
        let mut totals = Vec::with_capacity(self.subscales.len());
        for subscale in &self.subscales {
            let group = Group {
                name: &subscale.name,
                items: &subscale.items,
            };
            totals.extend(scorer::score(&self.key, ratings, &[group], subscale.policy)?);
        }
        Ok(totals)
    }
}
