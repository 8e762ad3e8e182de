//! SPL Conqueror variability model.
//!
//! Every feature becomes a binary configuration option below a synthetic
//! `root` option. Alternative children hang below their group parent and
//! exclude their siblings. Constraint clauses are copied verbatim.

use serde::Serialize;

use super::GenerateError;
use crate::model::FeatureModel;

const ROOT: &str = "root";

#[derive(Debug, Serialize)]
#[serde(rename = "vm")]
struct VariabilityModel<'a> {
    #[serde(rename = "@name")]
    name: &'a str,

    #[serde(rename = "binaryOptions")]
    binary_options: BinaryOptions<'a>,

    #[serde(rename = "booleanConstraints")]
    boolean_constraints: BooleanConstraints<'a>,
}

#[derive(Debug, Serialize)]
struct BinaryOptions<'a> {
    #[serde(rename = "configurationOption")]
    options: Vec<ConfigurationOption<'a>>,
}

#[derive(Debug, Serialize)]
struct BooleanConstraints<'a> {
    #[serde(rename = "constraint")]
    constraints: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct ConfigurationOption<'a> {
    name: &'a str,
    #[serde(rename = "outputString")]
    output_string: &'a str,
    prefix: &'a str,
    postfix: &'a str,
    parent: &'a str,
    #[serde(rename = "defaultValue")]
    default_value: &'a str,
    optional: &'a str,
    children: Children<'a>,
    #[serde(rename = "impliedOptions")]
    implied_options: Related<'a>,
    #[serde(rename = "excludedOptions")]
    excluded_options: Related<'a>,
}

#[derive(Debug, Default, Serialize)]
struct Children<'a> {
    option: Vec<&'a str>,
}

#[derive(Debug, Default, Serialize)]
struct Related<'a> {
    options: Vec<&'a str>,
}

impl<'a> ConfigurationOption<'a> {
    fn new(name: &'a str, parent: &'a str, optional: bool) -> Self {
        Self {
            name,
            output_string: name,
            prefix: "",
            postfix: "",
            parent,
            default_value: "Selected",
            optional: if optional { "True" } else { "False" },
            children: Children::default(),
            implied_options: Related::default(),
            excluded_options: Related::default(),
        }
    }

    fn excluding(mut self, excluded: Vec<&'a str>) -> Self {
        self.excluded_options.options = excluded;
        self
    }
}

pub(super) fn generate(model: &FeatureModel) -> Result<String, GenerateError> {
    let mut options = vec![ConfigurationOption::new(ROOT, "", false)];

    options.extend(
        model
            .get_mandatory()
            .iter()
            .map(|f| ConfigurationOption::new(f.name(), ROOT, false)),
    );
    options.extend(
        model
            .get_optional()
            .iter()
            .map(|f| ConfigurationOption::new(f.name(), ROOT, true)),
    );

    for group in model.get_alternatives() {
        for child in group.children() {
            let siblings = group
                .children()
                .iter()
                .filter(|other| *other != child)
                .map(|other| other.name())
                .collect();
            options.push(ConfigurationOption::new(child.name(), group.parent().name(), true).excluding(siblings));
        }
    }

    let vm = VariabilityModel {
        name: model.name(),
        binary_options: BinaryOptions { options },
        boolean_constraints: BooleanConstraints {
            constraints: model.get_constraints().iter().map(String::as_str).collect(),
        },
    };

    let mut buffer = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
    serializer.indent(' ', 2);
    vm.serialize(serializer)?;
    buffer.push('\n');
    Ok(buffer)
}
