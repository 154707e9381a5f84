//! Merging module tables into the master table.
//!
//! Modules arrive lowest priority first, typically the generic module
//! followed by specialized ones. For every coordinate the last module that
//! defines it wins; earlier modules only act as defaults.

use tracing::debug;

use crate::table::{MasterTable, Module, Selection};

/// Per-module outcome of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleCoverage {
    /// Cells the module defines.
    pub defined: usize,
    /// Cells where the module's implementation ended up in the master table.
    pub selected: usize,
    /// Cells where the module replaced an earlier module's implementation.
    pub overrides: usize,
}

/// Overlays module tables in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMerger;

impl TableMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merges the tables of `modules`.
    pub fn merge(&self, modules: &[Module]) -> MasterTable {
        self.merge_with_coverage(modules).0
    }

    /// Merges the tables of `modules` and reports what each one contributed.
    pub fn merge_with_coverage(&self, modules: &[Module]) -> (MasterTable, Vec<ModuleCoverage>) {
        let mut master = MasterTable::new();
        let mut coverage = vec![ModuleCoverage::default(); modules.len()];

        for (index, module) in modules.iter().enumerate() {
            coverage[index].defined = module.table.len();

            for (coord, implementation) in module.table.iter() {
                let selection = Selection {
                    implementation: implementation.to_string(),
                    module: index,
                };
                if let Some(previous) = master.insert(coord, selection) {
                    debug!(
                        "{}: {} overrides {} from {}",
                        coord,
                        implementation,
                        previous.implementation,
                        modules[previous.module].id.ident()
                    );
                    coverage[index].overrides += 1;
                }
            }
        }

        for (index, selected) in master.contributions(modules.len()).into_iter().enumerate() {
            coverage[index].selected = selected;
        }

        (master, coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{coordinates, Coordinate, Operation, PixelFormat};
    use crate::table::{ModuleId, ModuleTable};

    fn module(name: &str, cells: &[(Coordinate, &str)]) -> Module {
        let mut table = ModuleTable::new();
        for (coord, implementation) in cells {
            table.insert(*coord, *implementation);
        }
        Module::new(ModuleId::from_path(name), table)
    }

    fn c(op: Operation, format: PixelFormat) -> Coordinate {
        Coordinate::new(op, format, format, format)
    }

    #[test]
    fn test_empty_input() {
        assert!(TableMerger::new().merge(&[]).is_empty());
    }

    #[test]
    fn test_later_module_overrides() {
        let shared = c(Operation::Multiply, PixelFormat::Rgba8);
        let only_generic = c(Operation::Normal, PixelFormat::V8);
        let modules = vec![
            module("generic.o", &[(shared, "multiply_generic"), (only_generic, "normal_generic")]),
            module("special.o", &[(shared, "multiply_special")]),
        ];

        let (master, coverage) = TableMerger::new().merge_with_coverage(&modules);

        let selection = master.get(shared).unwrap();
        assert_eq!(selection.implementation, "multiply_special");
        assert_eq!(selection.module, 1);
        assert_eq!(master.get(only_generic).unwrap().module, 0);

        assert_eq!(
            coverage,
            vec![
                ModuleCoverage { defined: 2, selected: 1, overrides: 0 },
                ModuleCoverage { defined: 1, selected: 1, overrides: 1 },
            ]
        );
    }

    #[test]
    fn test_last_of_three_wins() {
        let cell = c(Operation::Screen, PixelFormat::Va8);
        let modules = vec![
            module("a.o", &[(cell, "screen_a")]),
            module("b.o", &[(cell, "screen_b")]),
            module("c.o", &[]),
        ];
        let master = TableMerger::new().merge(&modules);
        assert_eq!(master.get(cell).unwrap().implementation, "screen_b");
    }

    #[test]
    fn test_undefined_everywhere_stays_undefined() {
        let modules = vec![module("a.o", &[(c(Operation::Hue, PixelFormat::V8), "hue")])];
        let master = TableMerger::new().merge(&modules);

        let missing = coordinates().filter(|coord| master.get(*coord).is_none()).count();
        assert_eq!(master.len(), 1);
        assert_eq!(missing, crate::catalog::COORDINATE_COUNT - 1);
    }
}
