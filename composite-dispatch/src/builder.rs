//! Builds one module's table over the whole coordinate space.

use tracing::debug;

use crate::catalog::coordinates;
use crate::error::DispatchResult;
use crate::resolver::KeyResolver;
use crate::symbols::SymbolSource;
use crate::table::{DispatchTable, ModuleTable};

/// Runs the resolver once per coordinate.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    resolver: KeyResolver,
}

impl TableBuilder {
    pub fn new(resolver: KeyResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Builds the table for one module.
    ///
    /// Cells the module does not implement are left out of the table.
    pub fn build(&self, source: &dyn SymbolSource) -> DispatchResult<ModuleTable> {
        let mut table = ModuleTable::new();

        for coord in coordinates() {
            if let Some(resolved) = self.resolver.resolve(source, coord)? {
                table.insert(coord, resolved.symbol);
            }
        }

        debug!(
            "{}: {} cells, {} functions",
            source.module_name(),
            table.len(),
            table.functions().len()
        );
        Ok(table)
    }
}
