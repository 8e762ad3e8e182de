//! Export formats for a finished [`FeatureModel`].
//!
//! | Generator | Default file | Content |
//! |-----------|--------------|---------|
//! | [`GeneratorKind::SplConqueror`] | `<name>.xml` | SPL Conqueror variability model |
//! | [`GeneratorKind::FeatureExpression`] | `<name>.fexpr` | constraints over `defined(...)` terms |
//! | [`GeneratorKind::Header`] | `<name>.h` | `#define` per mandatory feature, sorted |
//! | [`GeneratorKind::OpenFeatures`] | `<name>.features` | every feature, sorted |
//!
//! Generators only read the model; every model they receive is already valid.
//! Output always uses `\n` line endings.
//!
//! # Example
//!
//! ```
//! use fm_compiler::generator::GeneratorKind;
//! use fm_compiler::parser::parse;
//!
//! let model = parse("demo", "mandatory B\nmandatory A\noptional C\n").unwrap();
//! assert_eq!(GeneratorKind::Header.generate(&model).unwrap(), "#define A\n#define B\n");
//! assert_eq!(GeneratorKind::OpenFeatures.generate(&model).unwrap(), "A\nB\nC\n");
//! ```

mod expression;
mod listing;
mod spl_conqueror;

use std::fmt;
use std::str::FromStr;

use log::debug;
use quick_xml::errors::serialize::SeError;
use thiserror::Error;

use crate::model::FeatureModel;

pub use expression::wrap_defined;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("XML serialization failed: {0}")]
    Xml(#[from] SeError),

    #[error("formatting failed: {0}")]
    Fmt(#[from] fmt::Error),
}

/// Closed set of export formats.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GeneratorKind {
    SplConqueror,
    FeatureExpression,
    Header,
    OpenFeatures,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 4] = [
        GeneratorKind::SplConqueror,
        GeneratorKind::FeatureExpression,
        GeneratorKind::Header,
        GeneratorKind::OpenFeatures,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::SplConqueror => "xml",
            GeneratorKind::FeatureExpression => "expression",
            GeneratorKind::Header => "header",
            GeneratorKind::OpenFeatures => "features",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            GeneratorKind::SplConqueror => "xml",
            GeneratorKind::FeatureExpression => "fexpr",
            GeneratorKind::Header => "h",
            GeneratorKind::OpenFeatures => "features",
        }
    }

    /// File name used when no explicit output path is given.
    pub fn default_file_name(self, model_name: &str) -> String {
        format!("{}.{}", model_name, self.extension())
    }

    pub fn generate(self, model: &FeatureModel) -> Result<String, GenerateError> {
        debug!("generating {} for `{}`", self, model.name());
        match self {
            GeneratorKind::SplConqueror => spl_conqueror::generate(model),
            GeneratorKind::FeatureExpression => expression::generate(model),
            GeneratorKind::Header => listing::header(model),
            GeneratorKind::OpenFeatures => listing::open_features(model),
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown generator `{}`", s))
    }
}
