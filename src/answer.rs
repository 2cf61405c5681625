use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::instrument::Instrument;

/// Item number -> rating, as stored in the `<instrument>_scores` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratings(BTreeMap<u32, u8>);

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item: u32) -> Option<u8> {
        self.0.get(&item).copied()
    }

    pub fn set(&mut self, item: u32, rating: u8) {
        self.0.insert(item, rating);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.0.iter().map(|(&item, &rating)| (item, rating))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl FromIterator<(u32, u8)> for Ratings {
    fn from_iter<T: IntoIterator<Item = (u32, u8)>>(iter: T) -> Self {
        Ratings(iter.into_iter().collect())
    }
}

/// Answers for one instrument while it is being filled in.
///
/// Every slot starts unanswered; there is no default rating.
#[derive(Debug, Clone)]
pub struct AnswerSheet<'a> {
    instrument: &'a Instrument,
    values: Vec<Option<u8>>,
    offset: usize,
}

impl<'a> AnswerSheet<'a> {
    pub fn new(instrument: &'a Instrument) -> Self {
        Self {
            instrument,
            values: vec![None; instrument.len()],
            offset: 0,
        }
    }

    pub fn instrument(&self) -> &'a Instrument {
        self.instrument
    }

    /// Stores the answer for the next unanswered position.
    pub fn push(&mut self, rating: u8) -> Result<()> {
        let item = self.offset as u32 + 1;
        if self.offset >= self.values.len() {
            return Err(self.illegal_question(item));
        }
        self.check_rating(item, rating)?;
        self.values[self.offset] = Some(rating);
        self.offset += 1;
        Ok(())
    }

    /// Stores the answer for the given item number (1-based).
    pub fn insert(&mut self, item: u32, rating: u8) -> Result<()> {
        if item < 1 || item as usize > self.values.len() {
            return Err(self.illegal_question(item));
        }
        self.check_rating(item, rating)?;
        self.values[item as usize - 1] = Some(rating);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// First unanswered item number, if any.
    pub fn first_missing(&self) -> Option<u32> {
        self.values
            .iter()
            .position(Option::is_none)
            .map(|index| index as u32 + 1)
    }

    pub fn into_ratings(self) -> Result<Ratings> {
        if let Some(item) = self.first_missing() {
            return Err(Error::NotFulfilled {
                instrument: self.instrument.key.clone(),
                item,
            });
        }
        Ok(self
            .values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.map(|rating| (index as u32 + 1, rating)))
            .collect())
    }

    fn check_rating(&self, item: u32, rating: u8) -> Result<()> {
        if self.instrument.scale.contains(rating) {
            Ok(())
        } else {
            Err(Error::IllegalAnswer {
                instrument: self.instrument.key.clone(),
                item,
                rating,
            })
        }
    }

    fn illegal_question(&self, item: u32) -> Error {
        Error::IllegalQuestion {
            instrument: self.instrument.key.clone(),
            item,
        }
    }
}
