use std::fmt;

use serde::{Deserialize, Serialize};

use crate::answer::Ratings;
use crate::error::{Error, Result};

/// How a subscale folds its item ratings into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Total {
    Sum(i64),
    Mean(f64),
}

impl Total {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Total::Sum(value) => value as f64,
            Total::Mean(value) => value,
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Total::Sum(value) => write!(f, "{value}"),
            Total::Mean(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscaleTotal {
    pub name: String,
    pub value: Total,
}

/// A named index group of a partition.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    pub name: &'a str,
    pub items: &'a [u32],
}

/// Folds the ratings of one group.
///
/// Every item the group names must be answered; a missing item is an error
/// rather than a zero.
pub fn aggregate(
    instrument: &str,
    ratings: &Ratings,
    items: &[u32],
    policy: Aggregation,
) -> Result<Total> {
    let mut sum: i64 = 0;
    for &item in items {
        let rating = ratings.get(item).ok_or_else(|| Error::NotFulfilled {
            instrument: instrument.to_string(),
            item,
        })?;
        sum += i64::from(rating);
    }
    Ok(match policy {
        Aggregation::Sum => Total::Sum(sum),
        Aggregation::Mean => {
            if items.is_empty() {
                return Err(Error::InvalidPartition {
                    instrument: instrument.to_string(),
                    reason: "mean over an empty group".to_string(),
                });
            }
            Total::Mean(sum as f64 / items.len() as f64)
        }
    })
}

/// One total per group, in partition order.
pub fn score(
    instrument: &str,
    ratings: &Ratings,
    partition: &[Group<'_>],
    policy: Aggregation,
) -> Result<Vec<SubscaleTotal>> {
    partition
        .iter()
        .map(|group| {
            Ok(SubscaleTotal {
                name: group.name.to_string(),
                value: aggregate(instrument, ratings, group.items, policy)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn ratings(values: &[u8]) -> Ratings {
        values
            .iter()
            .enumerate()
            .map(|(index, &rating)| (index as u32 + 1, rating))
            .collect()
    }

    #[test]
    fn test_sum_and_mean_agree() {
        let values = [1, 4, 2, 5, 3, 3, 1, 2];
        let ratings = ratings(&values);
        let partition = [
            Group {
                name: "odd",
                items: &[1, 3, 5, 7],
            },
            Group {
                name: "even",
                items: &[2, 4, 6, 8],
            },
        ];
        let sums = score("test", &ratings, &partition, Aggregation::Sum).unwrap();
        let means = score("test", &ratings, &partition, Aggregation::Mean).unwrap();

        assert_eq!(sums[0].value, Total::Sum(1 + 2 + 3 + 1));
        assert_eq!(sums[1].value, Total::Sum(4 + 5 + 3 + 2));
        assert_eq!(means[0].value, Total::Mean(7.0 / 4.0));
        assert_eq!(means[1].value, Total::Mean(14.0 / 4.0));
        for (sum, mean) in sums.iter().zip(&means) {
            assert_eq!(sum.name, mean.name);
            assert_eq!(sum.value.as_f64() / 4.0, mean.value.as_f64());
        }
    }

    #[test]
    fn test_mean_is_not_rounded() {
        let ratings = ratings(&[1, 2, 2]);
        let total = aggregate("test", &ratings, &[1, 2, 3], Aggregation::Mean).unwrap();
        assert_eq!(total, Total::Mean(5.0 / 3.0));
    }

    #[test]
    fn test_missing_item_fails() {
        let ratings = ratings(&[3, 3, 3]);
        assert!(matches!(
            aggregate("das", &ratings, &[1, 2, 4], Aggregation::Sum),
            Err(Error::NotFulfilled { item: 4, .. })
        ));
    }

    #[test]
    fn test_empty_group() {
        let ratings = ratings(&[3]);
        assert_eq!(
            aggregate("test", &ratings, &[], Aggregation::Sum).unwrap(),
            Total::Sum(0)
        );
        assert!(aggregate("test", &ratings, &[], Aggregation::Mean).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Total::Sum(42).to_string(), "42");
        assert_eq!(Total::Mean(2.5).to_string(), "2.5");
        assert_eq!(Total::Mean(3.0).to_string(), "3");
    }
}
