//! Generator Configuration
//!
//! Defines configuration options for the dispatch table generator. Every
//! field has a default, so a configuration file only needs the values it
//! changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};

/// Configuration for the dispatch table generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix in front of every implementation symbol, e.g. `gimp_composite_`.
    pub symbol_prefix: String,

    /// How symbols are read out of object modules.
    pub nm: NmConfig,

    /// Names of the generated files.
    pub output: OutputConfig,

    /// C identifiers used in the generated code.
    pub naming: NamingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol_prefix: String::new(),
            nm: NmConfig::default(),
            output: OutputConfig::default(),
            naming: NamingConfig::default(),
        }
    }
}

/// Symbol extraction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmConfig {
    /// The `nm` program to run.
    pub program: String,

    /// Arguments passed before the module path.
    pub args: Vec<String>,

    /// Drop one leading underscore from every symbol (Mach-O, old a.out).
    pub strip_leading_underscore: bool,
}

impl Default for NmConfig {
    fn default() -> Self {
        Self {
            program: "nm".to_string(),
            args: vec!["-g".to_string()],
            strip_leading_underscore: false,
        }
    }
}

/// Output file names, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Declarations of the table type.
    pub header: String,

    /// Table definitions and the initialization routine.
    pub source: String,

    /// Regression and timing harness.
    pub regression: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            header: "gimp-composite-dispatch.h".to_string(),
            source: "gimp-composite-dispatch.c".to_string(),
            regression: "gimp-composite-test.c".to_string(),
        }
    }
}

/// C identifiers in the generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Name of the merged table; the name table appends `_name`.
    pub table: String,

    /// Typedef emitted in the header.
    pub table_type: String,

    /// Argument type of every compositing function.
    pub context_type: String,

    /// Environment variable read by the generated initializer.
    pub env_var: String,

    /// Name of the generated initializer.
    pub init_function: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            table: "gimp_composite_function".to_string(),
            table_type: "GimpCompositeFunctionTable".to_string(),
            context_type: "GimpCompositeContext".to_string(),
            env_var: "GIMP_COMPOSITE".to_string(),
            init_function: "gimp_composite_init".to_string(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DispatchError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| DispatchError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> String {
        // Plain structs of strings and bools always serialize.
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Name of the parallel table holding implementation names.
    pub fn name_table(&self) -> String {
        format!("{}_name", self.naming.table)
    }
}
