//! Line-oriented parser for the feature model language.
//!
//! ```text
//! %% comment
//! mandatory <feature>
//! optional <feature>
//! declared <feature>
//! constraint <boolean-expression>
//! alternative <parent> <child> <child> ...
//! excluded <feature> <feature> ...
//! ```
//!
//! Once the first `excluded` directive has been processed the parser is locked:
//! only further `excluded` directives are accepted. Parsing stops at the first
//! error and never returns a partially built model.
//!
//! ```
//! use fm_compiler::parser::parse;
//!
//! let model = parse("demo", "mandatory A\noptional B\nconstraint A | B\n").unwrap();
//! assert_eq!(model.get_constraints(), &["A | B"]);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result, SemanticError, SyntaxError};
use crate::model::FeatureModel;
use crate::normalizer::Normalizer;
use crate::types::Feature;

/// Comment marker, only recognized at the start of a (trimmed) line.
pub const COMMENT: &str = "%%";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Directive {
    Mandatory,
    Optional,
    Declared,
    Constraint,
    Alternative,
    Excluded,
}

impl Directive {
    pub const ALL: [Directive; 6] = [
        Directive::Mandatory,
        Directive::Optional,
        Directive::Declared,
        Directive::Constraint,
        Directive::Alternative,
        Directive::Excluded,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Directive::Mandatory => "mandatory",
            Directive::Optional => "optional",
            Directive::Declared => "declared",
            Directive::Constraint => "constraint",
            Directive::Alternative => "alternative",
            Directive::Excluded => "excluded",
        }
    }

    /// Exact keyword lookup: `mandatoryX` is not `mandatory`.
    pub fn from_keyword(keyword: &str) -> Option<Directive> {
        Self::ALL.into_iter().find(|d| d.keyword() == keyword)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParserState {
    Open,
    /// Entered with the first `excluded` directive. Terminal.
    ExclusionLocked,
}

#[derive(Debug)]
pub struct Parser {
    model: FeatureModel,
    state: ParserState,
}

impl Parser {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_normalizer(name, Normalizer::default())
    }

    pub fn with_normalizer(name: impl Into<String>, normalizer: Normalizer) -> Self {
        Self {
            model: FeatureModel::with_normalizer(name, normalizer),
            state: ParserState::Open,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn parse_str(self, source: &str) -> Result<FeatureModel> {
        self.parse_lines(source.lines().map(|line| Ok(line.to_string())))
    }

    pub fn parse_reader<R: Read>(self, reader: R) -> Result<FeatureModel> {
        self.parse_lines(BufReader::new(reader).lines())
    }

    fn parse_lines<I>(mut self, lines: I) -> Result<FeatureModel>
    where
        I: IntoIterator<Item = std::io::Result<String>>,
    {
        for (i, line) in lines.into_iter().enumerate() {
            let line = line?;
            self.parse_line(i + 1, &line)?;
        }

        info!(
            "parsed model `{}`: {} feature(s), {} alternative group(s), {} constraint clause(s)",
            self.model.name(),
            self.model.num_features(),
            self.model.get_alternatives().len(),
            self.model.get_constraints().len()
        );
        Ok(self.model)
    }

    fn parse_line(&mut self, lineno: usize, line: &str) -> Result<()> {
        let text = line.trim();
        if text.is_empty() || text.starts_with(COMMENT) {
            return Ok(());
        }

        let (keyword, rest) = match text.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (text, ""),
        };
        let directive = Directive::from_keyword(keyword).ok_or_else(|| {
            Error::syntax(
                lineno,
                text,
                SyntaxError::UnknownDirective {
                    keyword: keyword.to_string(),
                },
            )
        })?;

        if self.state == ParserState::ExclusionLocked && directive != Directive::Excluded {
            return Err(Error::semantic(
                lineno,
                text,
                SemanticError::DirectiveOrderViolation { directive },
            ));
        }

        debug!("line {}: {} {}", lineno, directive, rest);
        self.apply(directive, rest).map_err(|e| e.at(lineno, text))
    }

    fn apply(&mut self, directive: Directive, rest: &str) -> Result<(), LineError> {
        match directive {
            Directive::Mandatory => self.model.add_mandatory(single_feature(rest)?)?,
            Directive::Optional => self.model.add_optional(single_feature(rest)?)?,
            Directive::Declared => self.model.add_declared(single_feature(rest)?)?,
            Directive::Constraint => self.model.add_constraint(rest)?,
            Directive::Alternative => {
                let mut features = feature_list(rest)?;
                if features.is_empty() {
                    return Err(SemanticError::EmptyDirective { directive }.into());
                }
                let children = features.split_off(1);
                let parent = features.remove(0);
                self.model.add_alternative(parent, children)?;
            }
            Directive::Excluded => {
                self.model.add_excluded(feature_list(rest)?)?;
                if self.state == ParserState::Open {
                    debug!("exclusion lock entered");
                }
                self.state = ParserState::ExclusionLocked;
            }
        }
        Ok(())
    }
}

/// Failure of a single directive, before line context is attached.
#[derive(Debug)]
enum LineError {
    Syntax(SyntaxError),
    Model(crate::error::ModelError),
}

impl LineError {
    fn at(self, lineno: usize, text: &str) -> Error {
        match self {
            LineError::Syntax(e) => Error::syntax(lineno, text, e),
            LineError::Model(e) => Error::model(lineno, text, e),
        }
    }
}

impl From<SyntaxError> for LineError {
    fn from(e: SyntaxError) -> Self {
        LineError::Syntax(e)
    }
}

impl From<SemanticError> for LineError {
    fn from(e: SemanticError) -> Self {
        LineError::Model(e.into())
    }
}

impl From<crate::error::ModelError> for LineError {
    fn from(e: crate::error::ModelError) -> Self {
        LineError::Model(e)
    }
}

/// Exactly one identifier; anything else is reported as an invalid name.
fn single_feature(rest: &str) -> Result<Feature, SyntaxError> {
    let mut tokens = rest.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(name), None) => Feature::new(name),
        _ => Err(SyntaxError::InvalidFeatureName { name: rest.to_string() }),
    }
}

fn feature_list(rest: &str) -> Result<Vec<Feature>, SyntaxError> {
    rest.split_whitespace().map(Feature::new).collect()
}

/// Parses `source` into a model called `name` with the built-in CNF engine.
pub fn parse(name: impl Into<String>, source: &str) -> Result<FeatureModel> {
    Parser::new(name).parse_str(source)
}

/// Parses a model file. The model is named after the file stem.
pub fn parse_file(path: impl AsRef<Path>, normalizer: &Normalizer) -> Result<FeatureModel> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("parsing {}", path.display());
    let file = File::open(path)?;
    Parser::with_normalizer(name, normalizer.clone()).parse_reader(file)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::error::{Category, Definition, EngineError};

    fn f(name: &str) -> Feature {
        Feature::new(name).unwrap()
    }

    fn fs(names: &[&str]) -> Vec<Feature> {
        names.iter().map(|n| f(n)).collect()
    }

    #[test]
    fn test_directive_keywords() {
        for d in Directive::ALL {
            assert_eq!(Directive::from_keyword(d.keyword()), Some(d));
            assert_eq!(d.to_string(), d.keyword());
        }
        assert_eq!(Directive::from_keyword("mandatoryX"), None);
        assert_eq!(Directive::from_keyword("Mandatory"), None);
    }

    #[test]
    fn test_end_to_end() {
        let source = "mandatory A\noptional B\noptional C\nalternative A B C\nexcluded B C\n";
        let model = parse("m", source).unwrap();

        assert_eq!(model.get_features(), fs(&["A", "B", "C"]).as_slice());
        assert_eq!(model.get_mandatory(), fs(&["A"]).as_slice());
        assert_eq!(model.get_optional(), fs(&["B", "C"]).as_slice());
        assert_eq!(model.alternative(&f("A")), Some(fs(&["B", "C"]).as_slice()));
        assert_eq!(model.get_constraints(), &["!B | !C | A"]);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "%% header\n\n   \n  mandatory   A  \n%%mandatory A\n";
        let model = parse("m", source).unwrap();
        assert_eq!(model.get_features(), fs(&["A"]).as_slice());
    }

    #[test]
    fn test_redefinition() {
        let err = parse("m", "mandatory A\nmandatory A\n").unwrap_err();
        assert_eq!(err.category(), Category::Semantic);
        assert_eq!(err.line(), Some(2));
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::Redefinition {
                feature: f("A"),
                definition: Definition::Feature
            })
        );
    }

    #[test]
    fn test_exclusion_lock() {
        let err = parse("m", "optional A\nexcluded A\noptional B\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::DirectiveOrderViolation {
                directive: Directive::Optional
            })
        );
        assert_eq!(err.line(), Some(3));

        let model = parse("m", "optional A\noptional B\nexcluded A\nexcluded B\n").unwrap();
        assert_eq!(model.get_constraints(), &["!A | B", "!B | A"]);
    }

    #[test]
    fn test_excluded_before_declaration_is_unknown_reference() {
        let err = parse("m", "excluded A\noptional B\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::UnknownFeatureReference { feature: f("A") })
        );
    }

    #[test]
    fn test_state_transitions() {
        let mut parser = Parser::new("m");
        assert_eq!(parser.state(), ParserState::Open);
        parser.parse_line(1, "optional A").unwrap();
        parser.parse_line(2, "constraint A").unwrap();
        assert_eq!(parser.state(), ParserState::Open);
        parser.parse_line(3, "excluded A").unwrap();
        assert_eq!(parser.state(), ParserState::ExclusionLocked);
        parser.parse_line(4, "%% still fine").unwrap();
        assert!(parser.parse_line(5, "constraint A").is_err());
        assert_eq!(parser.state(), ParserState::ExclusionLocked);
    }

    #[test]
    fn test_unknown_directive() {
        for line in ["feature A", "mandatoryA", "MANDATORY A"] {
            let err = parse("m", line).unwrap_err();
            assert_eq!(err.category(), Category::Syntax, "{}", line);
            assert!(matches!(err.as_syntax(), Some(SyntaxError::UnknownDirective { .. })));
        }
    }

    #[test]
    fn test_invalid_feature_names() {
        for line in ["mandatory A-B", "optional", "declared A B", "alternative A B.C", "excluded A$"] {
            let err = parse("m", &format!("mandatory A\n{}", line)).unwrap_err();
            assert!(
                matches!(err.as_syntax(), Some(SyntaxError::InvalidFeatureName { .. })),
                "{}: {:?}",
                line,
                err
            );
            assert_eq!(err.line(), Some(2));
        }
    }

    #[test]
    fn test_alternative_errors() {
        let err = parse("m", "mandatory A\noptional B\nalternative A B C\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::UnknownFeatureReference { feature: f("C") })
        );

        let err = parse("m", "mandatory A\noptional B\nalternative A B B\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::DuplicateFeatureInDirective { feature: f("B") })
        );

        let err = parse("m", "mandatory A\nalternative A\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::EmptyDirective {
                directive: Directive::Alternative
            })
        );

        let err = parse("m", "mandatory A\noptional B\nalternative A B\nalternative A B\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::Redefinition {
                feature: f("A"),
                definition: Definition::AlternativeGroup
            })
        );
    }

    #[test]
    fn test_excluded_errors() {
        let err = parse("m", "optional A\nexcluded\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::EmptyDirective {
                directive: Directive::Excluded
            })
        );

        let err = parse("m", "optional A\nexcluded A A\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::DuplicateFeatureInDirective { feature: f("A") })
        );
    }

    #[test]
    fn test_constraint() {
        let source = "declared A\ndeclared B\ndeclared C\nconstraint (A & B) | ~C\n";
        let model = parse("m", source).unwrap();
        assert_eq!(model.get_constraints(), &["A | !C", "B | !C"]);
        assert!(model.get_mandatory().is_empty() && model.get_optional().is_empty());
    }

    #[test]
    fn test_constraint_errors() {
        let err = parse("m", "declared A\nconstraint A & B\n").unwrap_err();
        assert_eq!(
            err.as_semantic(),
            Some(&SemanticError::UnknownFeatureReference { feature: f("B") })
        );

        let err = parse("m", "declared A\nconstraint (A\n").unwrap_err();
        assert_eq!(err.category(), Category::ExternalEngine);
        assert!(matches!(err.as_engine(), Some(EngineError::MalformedExpression { .. })));
        assert_eq!(err.to_string().lines().count(), 1);
    }

    #[test]
    fn test_parse_reader() {
        let source = b"mandatory Root\r\noptional Leaf\r\n" as &[u8];
        let model = Parser::new("r").parse_reader(source).unwrap();
        assert_eq!(model.get_features(), fs(&["Root", "Leaf"]).as_slice());
    }
}
