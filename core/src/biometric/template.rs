//! Fixed-length feature vectors and their distance metric.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TEMPLATE_DIM;

/// A face template: a fixed-length numeric feature vector representing one
/// enrolled identity (or one freshly embedded face region).
///
/// The dimensionality is pinned to [`TEMPLATE_DIM`] at construction so the
/// distance computation never has to think about mismatched lengths. The
/// vector is plain `f32` — the enrollment store round-trips it through JSON
/// with enough precision for any threshold we would realistically configure.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Template {
    values: Vec<f32>,
}

impl Template {
    /// Creates a template, validating the dimensionality.
    pub fn new(values: Vec<f32>) -> Result<Self, TemplateDimError> {
        if values.len() != TEMPLATE_DIM {
            return Err(TemplateDimError {
                expected: TEMPLATE_DIM,
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// The raw feature values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Euclidean distance to another template.
    ///
    /// Both operands are [`TEMPLATE_DIM`] long by construction, so this is
    /// a straight sum over pairs.
    pub fn distance(&self, other: &Template) -> f32 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A 128-float dump helps nobody; the dimension is the only useful fact.
        write!(f, "Template({} dims)", self.values.len())
    }
}

/// A template vector of the wrong length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template has {actual} dimensions, expected {expected}")]
pub struct TemplateDimError {
    /// Required dimensionality.
    pub expected: usize,
    /// What the caller supplied.
    pub actual: usize,
}

impl TryFrom<Vec<f32>> for Template {
    type Error = TemplateDimError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Template::new(values)
    }
}

impl From<Template> for Vec<f32> {
    fn from(t: Template) -> Self {
        t.values
    }
}
