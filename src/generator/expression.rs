//! Feature expression file: one entry per mandatory feature, alternative group
//! and constraint clause, each followed by a blank line.

use std::fmt::Write as _;

use super::GenerateError;
use crate::model::FeatureModel;
use crate::types::is_identifier_char;

/// Wraps every identifier of `expression` into `defined(...)`.
///
/// ```
/// use fm_compiler::generator::wrap_defined;
///
/// assert_eq!(wrap_defined("A => !B_1"), "defined(A) => !defined(B_1)");
/// ```
pub fn wrap_defined(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() * 2);
    let mut rest = expression;
    while let Some(start) = rest.find(is_identifier_char) {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest.find(|c: char| !is_identifier_char(c)).unwrap_or(rest.len());
        out.push_str("defined(");
        out.push_str(&rest[..end]);
        out.push(')');
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

pub(super) fn generate(model: &FeatureModel) -> Result<String, GenerateError> {
    let mut out = String::new();

    for feature in model.get_mandatory() {
        writeln!(out, "{}\n", wrap_defined(feature.name()))?;
    }
    for group in model.get_alternatives() {
        let entry = format!("{} => {}", group.parent(), group.clause());
        writeln!(out, "{}\n", wrap_defined(&entry))?;
    }
    for clause in model.get_constraints() {
        writeln!(out, "{}\n", wrap_defined(clause))?;
    }

    Ok(out)
}
