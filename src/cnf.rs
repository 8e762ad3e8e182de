//! Conversion of boolean expressions into conjunctive normal form.
//!
//! The conversion is the textbook one:
//!
//! 1. push negations down to the literals (negation normal form),
//! 2. distribute `|` over `&`,
//! 3. simplify the resulting clause set.
//!
//! Simplification drops repeated literals, tautological clauses (`x | !x`),
//! repeated clauses and clauses subsumed by a shorter one. Clause order is the
//! order in which clauses are first produced, so the output is reproducible.
//!
//! Distribution can blow up exponentially, so the converter has a clause
//! budget and an optional deadline.
//!
//! ```
//! use fm_compiler::cnf::to_cnf;
//! use fm_compiler::expr::parse_expr;
//!
//! let e = parse_expr("A & (B | !(C & D))").unwrap();
//! let clauses: Vec<String> = to_cnf(&e).unwrap().iter().map(|c| c.to_string()).collect();
//! assert_eq!(clauses, vec!["A", "B | !C | !D"]);
//! ```

use std::fmt;
use std::time::Instant;

use log::debug;

use crate::error::EngineError;
use crate::expr::Expr;
use crate::types::{Feature, Lit};

/// Disjunction of literals.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Clause(Vec<Lit>);

impl Clause {
    pub fn new(lits: Vec<Lit>) -> Self {
        Clause(lits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the clause contains both polarities of some feature.
    pub fn is_tautology(&self) -> bool {
        self.0.iter().any(|lit| self.0.contains(&-lit))
    }

    /// Whether every literal of `self` also appears in `other`.
    pub fn subsumes(&self, other: &Clause) -> bool {
        self.0.iter().all(|lit| other.0.contains(lit))
    }

    /// Union of two clauses, keeping the literal order of `self` then `other`.
    fn merge(&self, other: &Clause) -> Clause {
        let mut lits = self.0.clone();
        for lit in &other.0 {
            if !lits.contains(lit) {
                lits.push(lit.clone());
            }
        }
        Clause(lits)
    }

    pub fn eval<F>(&self, assignment: F) -> bool
    where
        F: Fn(&Feature) -> bool,
    {
        self.0.iter().any(|lit| lit.eval(assignment(lit.feature())))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, lit) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", lit)?;
        }
        Ok(())
    }
}

/// Expression in negation normal form with flattened n-ary connectives.
#[derive(Debug, Clone)]
enum Nnf {
    Lit(Lit),
    And(Vec<Nnf>),
    Or(Vec<Nnf>),
}

fn nnf(expr: &Expr, negated: bool) -> Nnf {
    match (expr, negated) {
        (Expr::Var(f), false) => Nnf::Lit(f.pos()),
        (Expr::Var(f), true) => Nnf::Lit(f.neg()),
        (Expr::Not(a), _) => nnf(a, !negated),
        // De Morgan: !(a & b) == !a | !b
        (Expr::And(a, b), false) | (Expr::Or(a, b), true) => flatten_and(nnf(a, negated), nnf(b, negated)),
        (Expr::Or(a, b), false) | (Expr::And(a, b), true) => flatten_or(nnf(a, negated), nnf(b, negated)),
    }
}

fn flatten_and(a: Nnf, b: Nnf) -> Nnf {
    let mut items = Vec::new();
    for x in [a, b] {
        match x {
            Nnf::And(inner) => items.extend(inner),
            other => items.push(other),
        }
    }
    Nnf::And(items)
}

fn flatten_or(a: Nnf, b: Nnf) -> Nnf {
    let mut items = Vec::new();
    for x in [a, b] {
        match x {
            Nnf::Or(inner) => items.extend(inner),
            other => items.push(other),
        }
    }
    Nnf::Or(items)
}

pub const DEFAULT_MAX_CLAUSES: usize = 10_000;

/// Distribution-based CNF converter.
#[derive(Debug, Clone)]
pub struct CnfConverter {
    max_clauses: usize,
    deadline: Option<Instant>,
}

impl Default for CnfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl CnfConverter {
    pub fn new() -> Self {
        Self {
            max_clauses: DEFAULT_MAX_CLAUSES,
            deadline: None,
        }
    }

    pub fn with_max_clauses(mut self, max_clauses: usize) -> Self {
        self.max_clauses = max_clauses;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Converts `expr` into an equivalent list of clauses (read as a conjunction).
    ///
    /// An empty list means the expression is a tautology.
    pub fn convert(&self, expr: &Expr) -> Result<Vec<Clause>, EngineError> {
        let nnf = nnf(expr, false);
        let clauses = self.clauses(&nnf)?;
        let clauses = self.simplify(clauses)?;
        debug!("cnf({}) -> {} clause(s)", expr, clauses.len());
        Ok(clauses)
    }

    fn clauses(&self, nnf: &Nnf) -> Result<Vec<Clause>, EngineError> {
        self.check_deadline()?;
        match nnf {
            Nnf::Lit(lit) => Ok(vec![Clause(vec![lit.clone()])]),
            Nnf::And(items) => {
                let mut result = Vec::new();
                for item in items {
                    result.extend(self.clauses(item)?);
                    self.check_budget(result.len())?;
                }
                self.simplify(result)
            }
            Nnf::Or(items) => {
                // Start from the single empty clause: the neutral element of the product.
                let mut acc = vec![Clause(Vec::new())];
                for item in items {
                    let rhs = self.clauses(item)?;
                    self.check_budget(acc.len().saturating_mul(rhs.len()))?;
                    let mut product = Vec::with_capacity(acc.len() * rhs.len());
                    for a in &acc {
                        for b in &rhs {
                            let merged = a.merge(b);
                            if !merged.is_tautology() {
                                product.push(merged);
                            }
                        }
                    }
                    acc = self.simplify(product)?;
                }
                Ok(acc)
            }
        }
    }

    /// Removes tautologies, repeated clauses and subsumed clauses, keeping first-appearance order.
    fn simplify(&self, clauses: Vec<Clause>) -> Result<Vec<Clause>, EngineError> {
        let clauses: Vec<Clause> = clauses.into_iter().filter(|c| !c.is_tautology()).collect();
        let mut result: Vec<Clause> = Vec::with_capacity(clauses.len());

        for (i, clause) in clauses.iter().enumerate() {
            self.check_deadline()?;
            let dominated = clauses.iter().enumerate().any(|(j, other)| {
                if i == j || !other.subsumes(clause) {
                    return false;
                }
                // Equal clauses: keep the first one only.
                other.len() < clause.len() || (other.len() == clause.len() && j < i)
            });
            if !dominated {
                result.push(clause.clone());
            }
        }

        Ok(result)
    }

    fn check_budget(&self, size: usize) -> Result<(), EngineError> {
        if size > self.max_clauses {
            return Err(EngineError::timeout(format!(
                "clause budget of {} exceeded",
                self.max_clauses
            )));
        }
        Ok(())
    }

    fn check_deadline(&self) -> Result<(), EngineError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(EngineError::timeout("deadline reached during CNF conversion")),
            _ => Ok(()),
        }
    }
}

/// Converts `expr` with the default converter settings.
pub fn to_cnf(expr: &Expr) -> Result<Vec<Clause>, EngineError> {
    CnfConverter::new().convert(expr)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_log::test;

    use super::*;
    use crate::expr::parse_expr;

    fn cnf_strings(input: &str) -> Vec<String> {
        let expr = parse_expr(input).unwrap();
        to_cnf(&expr).unwrap().iter().map(|c| c.to_string()).collect()
    }

    fn equivalent(expr: &Expr, clauses: &[Clause]) -> bool {
        let vars: Vec<Feature> = expr.vars().into_iter().cloned().collect();
        (0..1u32 << vars.len()).all(|bits| {
            let value = |f: &Feature| {
                vars.iter()
                    .position(|v| v == f)
                    .map(|i| bits & (1 << i) != 0)
                    .unwrap_or(false)
            };
            expr.eval(value) == clauses.iter().all(|c| c.eval(value))
        })
    }

    #[test]
    fn test_literal() {
        assert_eq!(cnf_strings("A"), vec!["A"]);
        assert_eq!(cnf_strings("!!A"), vec!["A"]);
        assert_eq!(cnf_strings("!A"), vec!["!A"]);
    }

    #[test]
    fn test_conjunction_splits() {
        assert_eq!(cnf_strings("A & B & !C"), vec!["A", "B", "!C"]);
    }

    #[test]
    fn test_disjunction_is_one_clause() {
        assert_eq!(cnf_strings("A | !B | C"), vec!["A | !B | C"]);
    }

    #[test]
    fn test_de_morgan() {
        assert_eq!(cnf_strings("!(A & B)"), vec!["!A | !B"]);
        assert_eq!(cnf_strings("!(A | B)"), vec!["!A", "!B"]);
    }

    #[test]
    fn test_distribution() {
        assert_eq!(cnf_strings("(A & B) | C"), vec!["A | C", "B | C"]);
        assert_eq!(
            cnf_strings("(A & B) | (C & D)"),
            vec!["A | C", "A | D", "B | C", "B | D"]
        );
    }

    #[test]
    fn test_tautology_is_empty() {
        assert!(cnf_strings("A | !A").is_empty());
        assert!(cnf_strings("(A | !A) & (B | !B)").is_empty());
    }

    #[test]
    fn test_subsumption() {
        assert_eq!(cnf_strings("A & (A | B)"), vec!["A"]);
        assert_eq!(cnf_strings("(A | B) & A"), vec!["A"]);
        assert_eq!(cnf_strings("(A | B) & (B | A)"), vec!["A | B"]);
    }

    #[test]
    fn test_contradiction_is_kept() {
        assert_eq!(cnf_strings("A & !A"), vec!["A", "!A"]);
    }

    #[test]
    fn test_exactly_one_is_equivalent() {
        let expr = parse_expr("(B & !C & !D) | (!B & C & !D) | (!B & !C & D)").unwrap();
        let clauses = to_cnf(&expr).unwrap();
        assert!(equivalent(&expr, &clauses));
    }

    #[test]
    fn test_equivalence_on_samples() {
        for input in [
            "!A | B",
            "!(A & (B | !C)) | (D & A)",
            "(A | B) & (!A | C) & !(B & C)",
            "!(!(A | B) & !(C | !D))",
        ] {
            let expr = parse_expr(input).unwrap();
            let clauses = to_cnf(&expr).unwrap();
            assert!(equivalent(&expr, &clauses), "{} -> {:?}", input, clauses);
        }
    }

    #[test]
    fn test_clause_budget() {
        // 2^6 clauses after distribution
        let expr = parse_expr("(A & B) | (C & D) | (E & F) | (G & H) | (I & J) | (K & L)").unwrap();
        let err = CnfConverter::new().with_max_clauses(10).convert(&expr).unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
        assert_eq!(CnfConverter::new().convert(&expr).unwrap().len(), 64);
    }

    #[test]
    fn test_deadline_in_the_past() {
        let expr = parse_expr("A | B").unwrap();
        let converter = CnfConverter::new().with_deadline(Instant::now() - Duration::from_millis(1));
        let err = converter.convert(&expr).unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[test]
    fn test_simplify_stops_at_deadline() {
        let clauses: Vec<Clause> = ["A | B", "A", "B | C"]
            .iter()
            .map(|s| to_cnf(&parse_expr(s).unwrap()).unwrap().remove(0))
            .collect();

        let simplified = CnfConverter::new().simplify(clauses.clone()).unwrap();
        assert_eq!(simplified.len(), 2);

        let expired = CnfConverter::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(expired.simplify(clauses), Err(EngineError::Timeout { .. })));
    }
}
