//! Boolean encodings of feature-model directives.
//!
//! Both encodings treat features as atomic boolean variables and produce
//! text in the expression language of [`crate::expr`].

use std::collections::HashSet;

use crate::cnf::Clause;
use crate::types::{Feature, Lit};

/// Exactly-one encoding of an alternative group as a disjunction of cubes.
///
/// Cube `i` holds child `i` positively and every other child negatively,
/// in the order of `children`.
pub fn exactly_one_cubes(children: &[Feature]) -> Vec<Vec<Lit>> {
    children
        .iter()
        .enumerate()
        .map(|(i, _)| {
            children
                .iter()
                .enumerate()
                .map(|(j, child)| if i == j { child.pos() } else { child.neg() })
                .collect()
        })
        .collect()
}

/// Exactly-one encoding rendered as text, e.g. `(B & !C) | (!B & C)`.
///
/// A single child degenerates to the bare literal. Returns `None` for an
/// empty group.
pub fn exactly_one(children: &[Feature]) -> Option<String> {
    match children {
        [] => None,
        [single] => Some(single.to_string()),
        _ => {
            let cubes: Vec<String> = exactly_one_cubes(children)
                .iter()
                .map(|cube| {
                    let lits: Vec<String> = cube.iter().map(Lit::to_string).collect();
                    format!("({})", lits.join(" & "))
                })
                .collect();
            Some(cubes.join(" | "))
        }
    }
}

/// Clause forbidding exactly one configuration.
///
/// The configuration selects every feature in `excluded` and no other
/// feature of `all_features`. The clause is `!e1 | ... | !ek | g1 | ... | gm`
/// where `g*` are the remaining features in the order of `all_features`;
/// it is false only under that configuration.
pub fn excluded_config_clause(all_features: &[Feature], excluded: &[Feature]) -> Clause {
    let excluded_set: HashSet<&Feature> = excluded.iter().collect();

    let negative = excluded.iter().map(Feature::neg);
    let positive = all_features
        .iter()
        .filter(|f| !excluded_set.contains(f))
        .map(Feature::pos);

    Clause::new(negative.chain(positive).collect())
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::expr::parse_expr;

    fn assignments(n: usize) -> impl Iterator<Item = Vec<bool>> {
        (0..1u32 << n).map(move |bits| (0..n).map(|i| bits & (1 << i) != 0).collect())
    }

    fn value_of<'a>(names: &'a [Feature], values: &'a [bool]) -> impl Fn(&Feature) -> bool + Copy + 'a {
        move |f: &Feature| names.iter().position(|n| n == f).map(|i| values[i]).unwrap_or(false)
    }

    proptest! {
        #[test]
        fn prop_exactly_one_semantics(n in 1usize..6) {
            let children: Vec<Feature> = (0..n).map(|i| Feature::new(format!("F{}", i)).unwrap()).collect();
            let expr = parse_expr(&exactly_one(&children).unwrap()).unwrap();
            for values in assignments(n) {
                let ones = values.iter().filter(|v| **v).count();
                prop_assert_eq!(expr.eval(value_of(&children, &values)), ones == 1);
            }
        }

        #[test]
        fn prop_excluded_clause_forbids_only_that_configuration(n in 1usize..6, mask in 1u32..32) {
            let all: Vec<Feature> = (0..n).map(|i| Feature::new(format!("F{}", i)).unwrap()).collect();
            let excluded: Vec<Feature> = all.iter().enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, f)| f.clone())
                .collect();
            prop_assume!(!excluded.is_empty());

            let expr = parse_expr(&excluded_config_clause(&all, &excluded).to_string()).unwrap();
            for values in assignments(n) {
                let forbidden = all.iter().zip(&values).all(|(f, v)| excluded.contains(f) == *v);
                prop_assert_eq!(expr.eval(value_of(&all, &values)), !forbidden);
            }
        }
    }
}
