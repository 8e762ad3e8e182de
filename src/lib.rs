//! # fm-compiler: feature model compiler
//!
//! **`fm-compiler`** reads a small line-oriented language describing a *feature model*
//! (the configuration space of a software product line) and compiles it into a validated
//! [`FeatureModel`][crate::model::FeatureModel] whose constraints are kept in conjunctive
//! normal form (CNF). The model can then be exported in several formats.
//!
//! ## The language
//!
//! ```text
//! %% Comments start with a double percent sign.
//! mandatory Engine
//! optional Radio
//! optional Gps
//! declared Legacy
//! alternative Engine Radio Gps
//! constraint Gps | !Legacy
//! excluded Radio Gps
//! ```
//!
//! - `mandatory`, `optional`, `declared` introduce a feature (each name at most once).
//! - `alternative P C1 C2 ...` states that exactly one child holds whenever `P` holds.
//! - `constraint EXPR` adds a boolean expression over `&`, `|`, `!` and parentheses.
//! - `excluded F1 F2 ...` forbids the configuration selecting exactly those features.
//!   After the first `excluded` line, only `excluded` lines may follow.
//!
//! ## Quick Start
//!
//! ```rust
//! use fm_compiler::generator::GeneratorKind;
//! use fm_compiler::parser::parse;
//!
//! let model = parse("car", "mandatory A\noptional B\noptional C\nalternative A B C\nexcluded B C\n").unwrap();
//!
//! assert_eq!(model.get_constraints(), &["!B | !C | A"]);
//! assert_eq!(model.get_alternatives()[0].children().len(), 2);
//!
//! let header = GeneratorKind::Header.generate(&model).unwrap();
//! assert_eq!(header, "#define A\n");
//! ```
//!
//! ## Core Components
//!
//! - **[`parser`]**: the directive parser and its exclusion-lock state machine.
//! - **[`model`]**: the feature model and its mutation API.
//! - **[`encoder`]**: exactly-one and excluded-configuration encodings.
//! - **[`normalizer`]**: CNF normalization of constraints through a pluggable engine.
//! - **[`generator`]**: export formats.

pub mod cnf;
pub mod config;
pub mod encoder;
pub mod error;
pub mod expr;
pub mod generator;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod project;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
pub use model::FeatureModel;
pub use parser::{parse, Parser};
