//! Validation rules shared by the model mutation operations.
//!
//! Each rule either succeeds or reports the first offending feature.

use std::collections::HashSet;

use crate::error::{Definition, SemanticError};
use crate::parser::Directive;
use crate::types::Feature;

/// `feature` must not be declared yet.
pub fn ensure_undeclared(declared: &HashSet<Feature>, feature: &Feature) -> Result<(), SemanticError> {
    if declared.contains(feature) {
        return Err(SemanticError::Redefinition {
            feature: feature.clone(),
            definition: Definition::Feature,
        });
    }
    Ok(())
}

/// `feature` must already be declared.
pub fn ensure_declared(declared: &HashSet<Feature>, feature: &Feature) -> Result<(), SemanticError> {
    if !declared.contains(feature) {
        return Err(SemanticError::UnknownFeatureReference {
            feature: feature.clone(),
        });
    }
    Ok(())
}

pub fn ensure_all_declared<'a>(
    declared: &HashSet<Feature>,
    features: impl IntoIterator<Item = &'a Feature>,
) -> Result<(), SemanticError> {
    features
        .into_iter()
        .try_for_each(|feature| ensure_declared(declared, feature))
}

/// No feature may appear twice in `features`.
pub fn ensure_distinct(features: &[Feature]) -> Result<(), SemanticError> {
    let mut seen = HashSet::with_capacity(features.len());
    for feature in features {
        if !seen.insert(feature) {
            return Err(SemanticError::DuplicateFeatureInDirective {
                feature: feature.clone(),
            });
        }
    }
    Ok(())
}

pub fn ensure_non_empty(features: &[Feature], directive: Directive) -> Result<(), SemanticError> {
    if features.is_empty() {
        return Err(SemanticError::EmptyDirective { directive });
    }
    Ok(())
}
