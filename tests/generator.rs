//! Tests for the export formats and the compilation pipeline.

use std::fs;

use fm_compiler::generator::{wrap_defined, GeneratorKind};
use fm_compiler::normalizer::Normalizer;
use fm_compiler::parser::parse;
use fm_compiler::project::Project;
use fm_compiler::FeatureModel;

const CAR: &str = "\
%% A small car product line
mandatory Car
mandatory Engine
optional Radio
optional Navigation
declared Legacy
optional Gasoline
optional Electric
alternative Engine Gasoline Electric
constraint Navigation => Radio
excluded Radio Legacy
";

fn car() -> FeatureModel {
    parse("car", &CAR.replace("Navigation => Radio", "!Navigation | Radio")).unwrap()
}

// ─── Listings ──────────────────────────────────────────────────────────────────

#[test]
fn header_lists_sorted_mandatory_features() {
    let out = GeneratorKind::Header.generate(&car()).unwrap();
    assert_eq!(out, "#define Car\n#define Engine\n");
}

#[test]
fn open_features_lists_every_feature_sorted() {
    let out = GeneratorKind::OpenFeatures.generate(&car()).unwrap();
    assert_eq!(
        out,
        "Car\nElectric\nEngine\nGasoline\nLegacy\nNavigation\nRadio\n"
    );
}

#[test]
fn output_is_reproducible() {
    for kind in GeneratorKind::ALL {
        let first = kind.generate(&car()).unwrap();
        let second = kind.generate(&car()).unwrap();
        assert_eq!(first, second, "{}", kind);
        assert!(!first.contains('\r'), "{}", kind);
    }
}

// ─── Feature Expressions ───────────────────────────────────────────────────────

#[test]
fn feature_expression_entries() {
    let out = GeneratorKind::FeatureExpression.generate(&car()).unwrap();
    let entries: Vec<&str> = out.split("\n\n").filter(|e| !e.is_empty()).collect();
    assert_eq!(
        entries,
        [
            "defined(Car)",
            "defined(Engine)",
            "defined(Engine) => (defined(Gasoline) & !defined(Electric)) | (!defined(Gasoline) & defined(Electric))",
            "!defined(Navigation) | defined(Radio)",
            "!defined(Radio) | !defined(Legacy) | defined(Car) | defined(Engine) | defined(Navigation) | defined(Gasoline) | defined(Electric)",
        ]
    );
    assert!(out.ends_with("\n\n"));
}

#[test]
fn wrap_defined_leaves_operators_alone() {
    assert_eq!(wrap_defined("!(A|B) & C_1"), "!(defined(A)|defined(B)) & defined(C_1)");
}

// ─── SPL Conqueror ─────────────────────────────────────────────────────────────

#[test]
fn spl_conqueror_lists_every_option() {
    let xml = GeneratorKind::SplConqueror.generate(&car()).unwrap();

    assert!(xml.starts_with("<vm name=\"car\">"));
    // root + 2 mandatory + 4 optional + 2 alternative children
    assert_eq!(xml.matches("<configurationOption>").count(), 9);
    assert_eq!(xml.matches("<constraint>").count(), 2);
    assert!(xml.contains("<constraint>!Navigation | Radio</constraint>"));
    assert!(xml.contains("<parent>Engine</parent>"));
    assert!(xml.contains("<options>Electric</options>"));
    assert!(xml.contains("<options>Gasoline</options>"));
    assert!(!xml.contains("Legacy</name>"));
}

// ─── Project ───────────────────────────────────────────────────────────────────

#[test]
fn project_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("car.fm");
    fs::write(&input, CAR.replace("Navigation => Radio", "!Navigation | Radio")).unwrap();

    let out = dir.path().join("gen");
    let mut project = Project::new(&input);
    for kind in GeneratorKind::ALL {
        project = project.with_output_in(kind, &out);
    }
    let model = project.compile(&Normalizer::default()).unwrap();

    for kind in GeneratorKind::ALL {
        let path = out.join(kind.default_file_name("car"));
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, kind.generate(&model).unwrap(), "{}", path.display());
    }
}

#[test]
fn project_rejects_unsupported_operator() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("car.fm");
    fs::write(&input, CAR).unwrap();

    let project = Project::new(&input).with_output_in(GeneratorKind::Header, dir.path());
    let err = project.compile(&Normalizer::default()).unwrap_err();
    assert!(err.to_string().contains("line 10"), "{}", err);
    assert!(!dir.path().join("car.h").exists());
}
