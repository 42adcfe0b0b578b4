//! Invocation of the external code generator.
//!
//! The generator itself is a black box: a process that receives a spec, an
//! output location and a few package options, and reports success through its
//! exit status.

use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use crate::error::GeneratorError;
use crate::unit::GenerationUnit;

pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Everything besides the spec itself that influences the output. A
    /// change invalidates the up-to-date stamps of every unit.
    fn fingerprint(&self) -> String;

    fn generate(&self, unit: &GenerationUnit) -> Result<(), GeneratorError>;
}

/// Kotlin multiplatform clients through `openapi-generator-cli`.
#[derive(Debug, Clone)]
pub struct KotlinGenerator {
    program: String,
    options: BTreeMap<String, String>,
}

impl KotlinGenerator {
    pub fn new() -> Self {
        let options = [
            ("library", "multiplatform"),
            ("dateLibrary", "kotlinx-datetime"),
            ("useCoroutines", "true"),
            ("enumPropertyNaming", "UPPERCASE"),
            ("collectionType", "list"),
        ];

        Self {
            program: "openapi-generator-cli".to_string(),
            options: options
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn arguments(&self, unit: &GenerationUnit) -> Vec<String> {
        let properties = self
            .options
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");

        vec![
            "generate".into(),
            "-g".into(),
            "kotlin".into(),
            "-i".into(),
            unit.input_path().to_string(),
            "-o".into(),
            unit.output_dir.to_string(),
            "--api-package".into(),
            unit.api_package.clone(),
            "--model-package".into(),
            unit.model_package.clone(),
            "--invoker-package".into(),
            unit.invoker_package.clone(),
            "--additional-properties".into(),
            properties,
        ]
    }
}

impl Default for KotlinGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for KotlinGenerator {
    fn name(&self) -> &str {
        "kotlin"
    }

    fn fingerprint(&self) -> String {
        format!("{} kotlin {:?}", self.program, self.options)
    }

    fn generate(&self, unit: &GenerationUnit) -> Result<(), GeneratorError> {
        invoke(&self.program, &self.arguments(unit))
    }
}

/// TypeScript clients with zod schemas through `openapi-zod-client`.
#[derive(Debug, Clone)]
pub struct ZodGenerator {
    program: String,
    package: String,
}

impl ZodGenerator {
    pub fn new() -> Self {
        Self {
            program: "npx".to_string(),
            package: "openapi-zod-client".to_string(),
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn arguments(&self, unit: &GenerationUnit) -> Vec<String> {
        vec![
            self.package.clone(),
            unit.input_path().to_string(),
            "--export-schemas".into(),
            "--export-types".into(),
            "-o".into(),
            unit.module_file.to_string(),
        ]
    }
}

impl Default for ZodGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for ZodGenerator {
    fn name(&self) -> &str {
        "zod"
    }

    fn fingerprint(&self) -> String {
        format!("{} {} --export-schemas --export-types", self.program, self.package)
    }

    fn generate(&self, unit: &GenerationUnit) -> Result<(), GeneratorError> {
        if let Some(dir) = unit.module_file.parent() {
            std::fs::create_dir_all(dir).map_err(|source| GeneratorError::OutputDir {
                path: dir.to_owned(),
                source,
            })?;
        }
        invoke(&self.program, &self.arguments(unit))
    }
}

fn invoke(program: &str, args: &[String]) -> Result<(), GeneratorError> {
    tracing::debug!(program, ?args, "invoking generator");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| GeneratorError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(GeneratorError::Exit {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::trace!(program, "{}", stdout.trim());
    }

    Ok(())
}
