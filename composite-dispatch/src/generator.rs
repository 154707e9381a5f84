//! The generation pipeline.
//!
//! Loads module symbols, builds one table per module, merges them and
//! renders the artifacts. Nothing touches the output directory until every
//! module has been read and resolved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::builder::TableBuilder;
use crate::config::Config;
use crate::emit::{digest, Artifacts, Emitter};
use crate::error::{DispatchError, DispatchResult};
use crate::merge::{ModuleCoverage, TableMerger};
use crate::resolver::KeyResolver;
use crate::symbols::{SymbolLoader, SymbolSource, SymbolTable};
use crate::table::{MasterTable, Module, ModuleId};

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct Generation {
    pub modules: Vec<Module>,
    pub master: MasterTable,
    pub coverage: Vec<ModuleCoverage>,
    pub artifacts: Artifacts,
}

impl Generation {
    /// Writes the artifacts into `dir`.
    pub fn write_to(&self, dir: &Path, config: &Config) -> DispatchResult<()> {
        self.artifacts.write_to(dir, &config.output)
    }

    /// Files in `dir` that differ from this run's artifacts.
    pub fn stale_files(&self, dir: &Path, config: &Config) -> Vec<PathBuf> {
        self.artifacts.stale_files(dir, &config.output)
    }
}

/// Drives a generation run.
#[derive(Debug, Clone)]
pub struct Generator {
    config: Config,
    loader: SymbolLoader,
    builder: TableBuilder,
}

impl Generator {
    /// Creates a generator that runs `nm` as configured.
    pub fn new(config: Config) -> Self {
        let loader = SymbolLoader::Nm(config.nm.clone());
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: Config, loader: SymbolLoader) -> Self {
        let builder = TableBuilder::new(KeyResolver::new(config.symbol_prefix.clone()));
        Self {
            config,
            loader,
            builder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads and resolves every module, in input order.
    pub fn load_modules(&self, paths: &[PathBuf]) -> DispatchResult<Vec<Module>> {
        if paths.is_empty() {
            return Err(DispatchError::NoModules);
        }
        let ids: Vec<ModuleId> = paths.iter().map(ModuleId::from_path).collect();
        self.check_module_ids(&ids)?;

        paths
            .iter()
            .zip(ids)
            .map(|(path, id)| {
                info!("Loading {}", path.display());
                let symbols = self.loader.load(path)?;
                self.build_module(id, &symbols)
            })
            .collect()
    }

    /// Builds one module's table from its symbols.
    pub fn build_module(&self, id: ModuleId, symbols: &dyn SymbolSource) -> DispatchResult<Module> {
        let table = self.builder.build(symbols)?;
        Ok(Module::new(id, table))
    }

    /// Runs the whole pipeline on module files.
    pub fn generate(&self, paths: &[PathBuf]) -> DispatchResult<Generation> {
        let modules = self.load_modules(paths)?;
        Ok(self.finish(modules))
    }

    /// Runs the pipeline on symbol tables already in memory.
    pub fn generate_from_sources(
        &self,
        sources: Vec<(ModuleId, SymbolTable)>,
    ) -> DispatchResult<Generation> {
        if sources.is_empty() {
            return Err(DispatchError::NoModules);
        }
        let ids: Vec<ModuleId> = sources.iter().map(|(id, _)| id.clone()).collect();
        self.check_module_ids(&ids)?;

        let modules = sources
            .into_iter()
            .map(|(id, symbols)| self.build_module(id, &symbols))
            .collect::<DispatchResult<Vec<_>>>()?;
        Ok(self.finish(modules))
    }

    /// Checks that every module yields its own valid C names.
    ///
    /// Each module emits a table named by its identifier and an
    /// `<ident>_init` function. Neither may be invalid C, repeat another
    /// module's names, or take a name the generated code already uses.
    pub fn check_module_ids(&self, ids: &[ModuleId]) -> DispatchResult<()> {
        let naming = &self.config.naming;
        let generated = [
            naming.table.clone(),
            self.config.name_table(),
            naming.table_type.clone(),
            naming.context_type.clone(),
            naming.init_function.clone(),
        ];
        let mut taken: HashMap<String, &Path> = HashMap::new();

        for id in ids {
            let rejected = |reason: String| DispatchError::ModuleName {
                module: id.path().to_path_buf(),
                ident: id.ident().to_string(),
                reason,
            };

            if !is_c_identifier(id.ident()) {
                return Err(rejected("not a C identifier".to_string()));
            }
            for name in [id.ident().to_string(), id.init_function()] {
                if generated.contains(&name) {
                    return Err(rejected(format!("`{}` is a generated name", name)));
                }
                if let Some(other) = taken.insert(name.clone(), id.path()) {
                    return Err(rejected(format!(
                        "`{}` is already used by module {}",
                        name,
                        other.display()
                    )));
                }
            }
        }
        Ok(())
    }

    fn finish(&self, modules: Vec<Module>) -> Generation {
        let (master, coverage) = TableMerger::new().merge_with_coverage(&modules);

        for (module, stats) in modules.iter().zip(&coverage) {
            info!(
                "{}: {} cells defined, {} selected",
                module.id.ident(),
                stats.defined,
                stats.selected
            );
            if stats.overrides > 0 {
                debug!("{}: {} overrides", module.id.ident(), stats.overrides);
            }
        }
        info!("Master table: {} cells populated", master.len());

        let artifacts = Emitter::new(&self.config).emit(&modules, &master);
        for (name, content) in artifacts.files(&self.config.output) {
            debug!("{}: {} bytes ({})", name, content.len(), digest(content));
        }

        Generation {
            modules,
            master,
            coverage,
            artifacts,
        }
    }
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
