//! Compilation of one model file into a set of generated files.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::error::Error;
use crate::generator::{GenerateError, GeneratorKind};
use crate::model::FeatureModel;
use crate::normalizer::Normalizer;
use crate::parser::Parser;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("{}: {source}", .path.display())]
    Parse { path: PathBuf, source: Error },

    #[error("cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub input: PathBuf,
    pub outputs: Vec<(GeneratorKind, PathBuf)>,
}

impl Project {
    /// Project without outputs, named after the file stem of `input`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            input,
            outputs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_output(mut self, kind: GeneratorKind, path: impl Into<PathBuf>) -> Self {
        self.outputs.push((kind, path.into()));
        self
    }

    /// Adds `kind` with its default file name inside `dir`.
    pub fn with_output_in(self, kind: GeneratorKind, dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(kind.default_file_name(&self.name));
        self.with_output(kind, path)
    }

    /// Parses the input only.
    pub fn check(&self, normalizer: &Normalizer) -> Result<FeatureModel, ProjectError> {
        info!("compiling `{}` from {}", self.name, self.input.display());
        let file = File::open(&self.input).map_err(|source| ProjectError::Open {
            path: self.input.clone(),
            source,
        })?;
        Parser::with_normalizer(self.name.clone(), normalizer.clone())
            .parse_reader(file)
            .map_err(|source| ProjectError::Parse {
                path: self.input.clone(),
                source,
            })
    }

    /// Parses the input once and writes every configured output.
    pub fn compile(&self, normalizer: &Normalizer) -> Result<FeatureModel, ProjectError> {
        let model = self.check(normalizer)?;

        for (kind, path) in &self.outputs {
            let content = kind.generate(&model)?;
            write_output(path, &content)?;
            info!("wrote {} output to {}", kind, path.display());
        }

        Ok(model)
    }
}

fn write_output(path: &Path, content: &str) -> Result<(), ProjectError> {
    let to_error = |source: io::Error| ProjectError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, content).map_err(to_error)
}
