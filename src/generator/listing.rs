//! Sorted plain-text listings of features.

use std::fmt::Write as _;

use super::GenerateError;
use crate::model::FeatureModel;
use crate::types::Feature;

fn sorted(features: &[Feature]) -> Vec<&Feature> {
    let mut features: Vec<&Feature> = features.iter().collect();
    features.sort();
    features
}

/// `#define F` for every mandatory feature.
pub(super) fn header(model: &FeatureModel) -> Result<String, GenerateError> {
    let mut out = String::new();
    for feature in sorted(model.get_mandatory()) {
        writeln!(out, "#define {}", feature)?;
    }
    Ok(out)
}

/// Every declared feature, one per line.
pub(super) fn open_features(model: &FeatureModel) -> Result<String, GenerateError> {
    let mut out = String::new();
    for feature in sorted(model.get_features()) {
        writeln!(out, "{}", feature)?;
    }
    Ok(out)
}
