//! Type-safe wrappers for feature identifiers and literals.
//!
//! A [`Feature`] can only be constructed from a valid identifier
//! (`[A-Za-z0-9_]+`), so every feature stored in a model, an expression
//! or a clause is known to be well-formed.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Neg;

use crate::error::SyntaxError;

/// A feature identifier.
///
/// # Invariants
///
/// - The name is non-empty
/// - Every character is an ASCII letter, an ASCII digit or `_`
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Feature(String);

impl Feature {
    /// Creates a feature from its name, validating the identifier pattern.
    pub fn new(name: impl Into<String>) -> Result<Self, SyntaxError> {
        let name = name.into();
        if is_identifier(&name) {
            Ok(Feature(name))
        } else {
            Err(SyntaxError::InvalidFeatureName { name })
        }
    }

    /// Returns the feature name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Positive literal of this feature.
    pub fn pos(&self) -> Lit {
        Lit::pos(self.clone())
    }

    /// Negative literal of this feature.
    pub fn neg(&self) -> Lit {
        Lit::neg(self.clone())
    }
}

/// Returns `true` if `s` matches `^[A-Za-z0-9_]+$`.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_identifier_char)
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Feature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Feature {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Feature {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Feature {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A feature together with a polarity.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit {
    feature: Feature,
    negated: bool,
}

impl Lit {
    pub fn pos(feature: Feature) -> Self {
        Lit {
            feature,
            negated: false,
        }
    }

    pub fn neg(feature: Feature) -> Self {
        Lit {
            feature,
            negated: true,
        }
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_positive(&self) -> bool {
        !self.negated
    }

    /// Truth value of the literal under the value of its feature.
    pub fn eval(&self, value: bool) -> bool {
        value != self.negated
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Lit {
            feature: self.feature,
            negated: !self.negated,
        }
    }
}

impl Neg for &Lit {
    type Output = Lit;

    fn neg(self) -> Self::Output {
        -self.clone()
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.feature)
        } else {
            write!(f, "{}", self.feature)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_feature_valid() {
        for name in ["A", "feature_1", "_", "42", "Linux_X86_64"] {
            let feature = Feature::new(name).unwrap();
            assert_eq!(feature.name(), name);
            assert_eq!(feature.to_string(), name);
        }
    }

    #[test]
    fn test_feature_invalid() {
        for name in ["", "A B", "A-B", "!A", "a.b", "Ä"] {
            let err = Feature::new(name).unwrap_err();
            assert_eq!(
                err,
                SyntaxError::InvalidFeatureName {
                    name: name.to_string()
                }
            );
        }
    }

    #[test]
    fn test_lit_negation() {
        let a = Feature::new("A").unwrap();
        let pos = a.pos();
        let neg = -pos.clone();

        assert!(pos.is_positive());
        assert!(neg.is_negated());
        assert_eq!(neg.feature(), &a);
        assert_eq!(-neg.clone(), pos);
        assert_eq!(pos.to_string(), "A");
        assert_eq!(neg.to_string(), "!A");
    }

    #[test]
    fn test_lit_eval() {
        let a = Feature::new("A").unwrap();
        assert!(a.pos().eval(true));
        assert!(!a.pos().eval(false));
        assert!(a.neg().eval(false));
        assert!(!a.neg().eval(true));
    }
}
