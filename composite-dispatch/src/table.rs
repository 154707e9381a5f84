//! Dispatch tables.
//!
//! A [`ModuleTable`] holds what one module implements. A [`MasterTable`]
//! holds the merged result together with the module each cell came from.
//! Both only store populated cells; a missing coordinate means "no
//! implementation" and is emitted as `NULL`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Serialize;

use crate::catalog::Coordinate;

/// Read access shared by module and master tables.
pub trait DispatchTable {
    /// The implementation attached to a cell, if any.
    fn implementation(&self, coord: Coordinate) -> Option<&str>;

    /// Distinct implementations in table order, each listed once.
    fn functions(&self) -> IndexSet<&str>;
}

/// Identifies a candidate module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    path: PathBuf,
    ident: String,
}

impl ModuleId {
    /// Derives the module's C identifier from its path.
    ///
    /// `app/composite/gimp-composite-sse.o` becomes `gimp_composite_sse`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            ident: stem.replace('-', "_"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// C identifier of the module's table.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// The module's initializer, called once by the generated init routine.
    pub fn init_function(&self) -> String {
        format!("{}_init", self.ident)
    }
}

/// One module's implementations, keyed by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleTable {
    entries: BTreeMap<Coordinate, String>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an implementation, returning the one it replaced.
    pub fn insert(&mut self, coord: Coordinate, implementation: impl Into<String>) -> Option<String> {
        self.entries.insert(coord, implementation.into())
    }

    pub fn get(&self, coord: Coordinate) -> Option<&str> {
        self.entries.get(&coord).map(String::as_str)
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        self.entries.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Populated cells in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &str)> {
        self.entries.iter().map(|(coord, name)| (*coord, name.as_str()))
    }
}

impl DispatchTable for ModuleTable {
    fn implementation(&self, coord: Coordinate) -> Option<&str> {
        self.get(coord)
    }

    fn functions(&self) -> IndexSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }
}

/// A module and the table built from it.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub table: ModuleTable,
}

impl Module {
    pub fn new(id: ModuleId, table: ModuleTable) -> Self {
        Self { id, table }
    }
}

/// The implementation chosen for one cell of the master table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// The implementation symbol.
    pub implementation: String,
    /// Position of the contributing module in the input order.
    pub module: usize,
}

/// The merged table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterTable {
    entries: BTreeMap<Coordinate, Selection>,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell, returning the selection it replaced.
    pub fn insert(&mut self, coord: Coordinate, selection: Selection) -> Option<Selection> {
        self.entries.insert(coord, selection)
    }

    pub fn get(&self, coord: Coordinate) -> Option<&Selection> {
        self.entries.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Populated cells in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &Selection)> {
        self.entries.iter().map(|(coord, selection)| (*coord, selection))
    }

    /// Number of cells each module supplies, indexed like the input modules.
    pub fn contributions(&self, module_count: usize) -> Vec<usize> {
        let mut counts = vec![0; module_count];
        for selection in self.entries.values() {
            if let Some(count) = counts.get_mut(selection.module) {
                *count += 1;
            }
        }
        counts
    }
}

impl DispatchTable for MasterTable {
    fn implementation(&self, coord: Coordinate) -> Option<&str> {
        self.entries
            .get(&coord)
            .map(|selection| selection.implementation.as_str())
    }

    fn functions(&self) -> IndexSet<&str> {
        self.entries
            .values()
            .map(|selection| selection.implementation.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Operation, PixelFormat};

    #[test]
    fn test_module_ident() {
        let id = ModuleId::from_path("app/composite/gimp-composite-sse.o");
        assert_eq!(id.ident(), "gimp_composite_sse");
        assert_eq!(id.init_function(), "gimp_composite_sse_init");

        assert_eq!(ModuleId::from_path("generic.c").ident(), "generic");
        assert_eq!(ModuleId::from_path("lib/x86-mmx").ident(), "x86_mmx");
        assert_eq!(ModuleId::from_path("gimp-composite-sse2.syms").ident(), "gimp_composite_sse2");
    }

    #[test]
    fn test_functions_listed_once_in_table_order() {
        let mut table = ModuleTable::new();
        let late = Coordinate::new(Operation::Xor, PixelFormat::V8, PixelFormat::V8, PixelFormat::V8);
        let early = Coordinate::new(
            Operation::Normal,
            PixelFormat::V8,
            PixelFormat::V8,
            PixelFormat::V8,
        );
        let middle = Coordinate::new(
            Operation::Normal,
            PixelFormat::Rgba8,
            PixelFormat::V8,
            PixelFormat::V8,
        );
        table.insert(late, "xor_any_any_any");
        table.insert(early, "normal_any_any_any");
        table.insert(middle, "normal_any_any_any");

        let functions: Vec<&str> = table.functions().into_iter().collect();
        assert_eq!(functions, vec!["normal_any_any_any", "xor_any_any_any"]);
    }

    #[test]
    fn test_contributions() {
        let mut master = MasterTable::new();
        let c = |op| Coordinate::new(op, PixelFormat::V8, PixelFormat::V8, PixelFormat::V8);
        master.insert(c(Operation::Normal), Selection { implementation: "a".into(), module: 0 });
        master.insert(c(Operation::Screen), Selection { implementation: "b".into(), module: 1 });
        master.insert(c(Operation::Hue), Selection { implementation: "c".into(), module: 1 });

        assert_eq!(master.contributions(3), vec![1, 2, 0]);
    }
}
