//! The feature model: features, their classification, alternative groups and constraints.
//!
//! All collections keep insertion order, so every accessor returns the same
//! sequence for the same input. Generators that need a different order sort
//! at their own boundary.

use std::collections::HashSet;

use log::debug;

use crate::encoder::{excluded_config_clause, exactly_one};
use crate::error::{Definition, EngineError, ModelError, SemanticError};
use crate::expr::parse_expr;
use crate::normalizer::Normalizer;
use crate::parser::Directive;
use crate::types::Feature;
use crate::validate::{ensure_all_declared, ensure_declared, ensure_distinct, ensure_non_empty, ensure_undeclared};

/// A parent feature and its children, exactly one of which holds whenever the parent holds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AlternativeGroup {
    parent: Feature,
    children: Vec<Feature>,
}

impl AlternativeGroup {
    pub fn parent(&self) -> &Feature {
        &self.parent
    }

    pub fn children(&self) -> &[Feature] {
        &self.children
    }

    /// Exactly-one encoding of the group, e.g. `(B & !C) | (!B & C)`.
    pub fn clause(&self) -> String {
        // Groups are never empty, see `FeatureModel::add_alternative`.
        exactly_one(&self.children).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureModel {
    name: String,
    features: Vec<Feature>,
    declared: HashSet<Feature>,
    mandatory: Vec<Feature>,
    optional: Vec<Feature>,
    alternatives: Vec<AlternativeGroup>,
    constraints: Vec<String>,
    normalizer: Normalizer,
}

impl FeatureModel {
    /// Creates an empty model using the built-in CNF engine.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_normalizer(name, Normalizer::default())
    }

    pub fn with_normalizer(name: impl Into<String>, normalizer: Normalizer) -> Self {
        Self {
            name: name.into(),
            features: Vec::new(),
            declared: HashSet::new(),
            mandatory: Vec::new(),
            optional: Vec::new(),
            alternatives: Vec::new(),
            constraints: Vec::new(),
            normalizer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn declare(&mut self, feature: &Feature) -> Result<(), ModelError> {
        ensure_undeclared(&self.declared, feature)?;
        self.declared.insert(feature.clone());
        self.features.push(feature.clone());
        Ok(())
    }

    pub fn add_mandatory(&mut self, feature: Feature) -> Result<(), ModelError> {
        self.declare(&feature)?;
        debug!("mandatory {}", feature);
        self.mandatory.push(feature);
        Ok(())
    }

    pub fn add_optional(&mut self, feature: Feature) -> Result<(), ModelError> {
        self.declare(&feature)?;
        debug!("optional {}", feature);
        self.optional.push(feature);
        Ok(())
    }

    /// Declares a feature that is only referenced in expressions.
    pub fn add_declared(&mut self, feature: Feature) -> Result<(), ModelError> {
        self.declare(&feature)?;
        debug!("declared {}", feature);
        Ok(())
    }

    /// Registers the alternative group `parent -> children`.
    ///
    /// A parent can own a single group; a second group for the same parent is a
    /// redefinition.
    pub fn add_alternative(&mut self, parent: Feature, children: Vec<Feature>) -> Result<(), ModelError> {
        ensure_declared(&self.declared, &parent)?;
        if self.alternative(&parent).is_some() {
            return Err(SemanticError::Redefinition {
                feature: parent,
                definition: Definition::AlternativeGroup,
            }
            .into());
        }
        ensure_non_empty(&children, Directive::Alternative)?;
        ensure_distinct(&children)?;
        ensure_all_declared(&self.declared, &children)?;

        debug!("alternative {} -> {:?}", parent, children);
        self.alternatives.push(AlternativeGroup { parent, children });
        Ok(())
    }

    /// Adds a boolean constraint, stored as CNF clauses in order.
    pub fn add_constraint(&mut self, expression: &str) -> Result<(), ModelError> {
        let expr = parse_expr(expression).map_err(EngineError::from)?;
        ensure_all_declared(&self.declared, expr.vars())?;

        let clauses = self.normalizer.normalize(expression)?;
        debug!("constraint `{}` -> {:?}", expression, clauses);
        self.constraints.extend(clauses);
        Ok(())
    }

    /// Forbids the configuration selecting exactly `excluded` among all features declared so far.
    pub fn add_excluded(&mut self, excluded: Vec<Feature>) -> Result<(), ModelError> {
        ensure_non_empty(&excluded, Directive::Excluded)?;
        ensure_distinct(&excluded)?;
        ensure_all_declared(&self.declared, &excluded)?;

        let clause = excluded_config_clause(&self.features, &excluded).to_string();
        debug!("excluded {:?} -> {}", excluded, clause);
        self.constraints.push(clause);
        Ok(())
    }

    pub fn get_mandatory(&self) -> &[Feature] {
        &self.mandatory
    }

    pub fn get_optional(&self) -> &[Feature] {
        &self.optional
    }

    pub fn get_features(&self) -> &[Feature] {
        &self.features
    }

    pub fn get_alternatives(&self) -> &[AlternativeGroup] {
        &self.alternatives
    }

    /// Constraint clauses, read as a conjunction.
    pub fn get_constraints(&self) -> &[String] {
        &self.constraints
    }

    /// Children of the alternative group owned by `parent`.
    pub fn alternative(&self, parent: &Feature) -> Option<&[Feature]> {
        self.alternatives
            .iter()
            .find(|g| &g.parent == parent)
            .map(|g| g.children())
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }
}
