//! Symbol sources.
//!
//! The resolver never looks at object files directly. It asks a
//! [`SymbolSource`] which defined symbols match a key, so symbols can come
//! from `nm`, from a saved listing, or from a list built in memory.

use std::collections::BTreeSet;
use std::fs;
use std::ops::Bound;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::config::NmConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::key::symbol_matches;

/// Answers which implementations a module defines.
pub trait SymbolSource {
    /// Module name used in diagnostics.
    fn module_name(&self) -> &str;

    /// Every defined symbol matching the key text, in sorted order.
    fn matching(&self, key: &str) -> Vec<&str>;
}

/// A sorted set of the symbols one module defines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    module: String,
    symbols: BTreeSet<String>,
}

impl SymbolTable {
    /// Creates an empty table for a module.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            symbols: BTreeSet::new(),
        }
    }

    /// Creates a table from symbol names.
    pub fn from_symbols<I, S>(module: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>) {
        self.symbols.insert(symbol.into());
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl SymbolSource for SymbolTable {
    fn module_name(&self) -> &str {
        &self.module
    }

    fn matching(&self, key: &str) -> Vec<&str> {
        self.symbols
            .range::<str, _>((Bound::Included(key), Bound::Unbounded))
            .take_while(|symbol| symbol.starts_with(key))
            .map(String::as_str)
            .filter(|symbol| symbol_matches(symbol, key))
            .collect()
    }
}

/// Extracts defined external symbols from `nm` style output.
///
/// Accepts the usual `address type name` lines, `type name` lines for
/// undefined symbols, and bare names, so a hand-written listing with one
/// symbol per line parses too. Archive member headers (`member.o:`) are
/// ignored.
pub fn parse_nm_output(output: &str, strip_leading_underscore: bool) -> BTreeSet<String> {
    let mut symbols = BTreeSet::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.ends_with(':') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let name = match fields.as_slice() {
            [name] => *name,
            [.., kind, name] if is_defined_external(kind) => *name,
            _ => continue,
        };

        let name = if strip_leading_underscore {
            name.strip_prefix('_').unwrap_or(name)
        } else {
            name
        };
        symbols.insert(name.to_string());
    }

    symbols
}

/// Defined, externally visible symbol types: uppercase, except undefined.
fn is_defined_external(kind: &str) -> bool {
    let mut chars = kind.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_ascii_uppercase() && c != 'U',
        _ => false,
    }
}

/// How module symbols are obtained.
#[derive(Debug, Clone)]
pub enum SymbolLoader {
    /// Run `nm` on each module.
    Nm(NmConfig),
    /// Read each module as a symbol listing.
    Listing { strip_leading_underscore: bool },
}

impl SymbolLoader {
    /// Reads the symbols a module defines.
    pub fn load(&self, path: &Path) -> DispatchResult<SymbolTable> {
        let module = path.display().to_string();

        // Fail on the module itself, not on whatever the tool says about it.
        fs::metadata(path).map_err(|source| DispatchError::ModuleRead {
            module: path.to_path_buf(),
            source,
        })?;

        let symbols = match self {
            SymbolLoader::Nm(config) => {
                let output = run_nm(config, path)?;
                parse_nm_output(&output, config.strip_leading_underscore)
            }
            SymbolLoader::Listing {
                strip_leading_underscore,
            } => {
                let listing =
                    fs::read_to_string(path).map_err(|source| DispatchError::ModuleRead {
                        module: path.to_path_buf(),
                        source,
                    })?;
                parse_nm_output(&listing, *strip_leading_underscore)
            }
        };

        debug!("{}: {} defined symbols", module, symbols.len());
        Ok(SymbolTable { module, symbols })
    }
}

fn run_nm(config: &NmConfig, path: &Path) -> DispatchResult<String> {
    debug!("Running {} {:?} {}", config.program, config.args, path.display());

    let output = Command::new(&config.program)
        .args(&config.args)
        .arg(path)
        .output()
        .map_err(|source| DispatchError::ModuleRead {
            module: path.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(DispatchError::SymbolTool {
            module: path.to_path_buf(),
            program: config.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
