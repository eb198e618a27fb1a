//! Observation id normalization for get-observations style calls.

use crate::error::{Error, Result};

/// One id or an ordered list of ids, as accepted by `get_observations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationIds {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ObservationIds {
    fn from(id: &str) -> Self {
        ObservationIds::One(id.to_string())
    }
}

impl From<String> for ObservationIds {
    fn from(id: String) -> Self {
        ObservationIds::One(id)
    }
}

impl From<&String> for ObservationIds {
    fn from(id: &String) -> Self {
        ObservationIds::One(id.clone())
    }
}

impl From<Vec<String>> for ObservationIds {
    fn from(ids: Vec<String>) -> Self {
        ObservationIds::Many(ids)
    }
}

impl From<Vec<&str>> for ObservationIds {
    fn from(ids: Vec<&str>) -> Self {
        ObservationIds::Many(ids.into_iter().map(str::to_string).collect())
    }
}

impl From<&[String]> for ObservationIds {
    fn from(ids: &[String]) -> Self {
        ObservationIds::Many(ids.to_vec())
    }
}

impl From<&[&str]> for ObservationIds {
    fn from(ids: &[&str]) -> Self {
        ObservationIds::Many(ids.iter().map(|id| id.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ObservationIds {
    fn from(ids: [&str; N]) -> Self {
        ObservationIds::Many(ids.iter().map(|id| id.to_string()).collect())
    }
}

/// Keep the non-blank ids in their original order. Duplicates are kept.
///
/// Fails with a validation error when nothing is left, so an empty lookup is
/// rejected before any request is built.
pub fn normalize_ids(ids: impl Into<ObservationIds>) -> Result<Vec<String>> {
    let candidates = match ids.into() {
        ObservationIds::One(id) => vec![id],
        ObservationIds::Many(ids) => ids,
    };
    let normalized: Vec<String> = candidates
        .into_iter()
        .filter(|id| !id.trim().is_empty())
        .collect();
    if normalized.is_empty() {
        return Err(Error::validation(
            "ids must contain at least one non-empty observation id",
        ));
    }
    Ok(normalized)
}
