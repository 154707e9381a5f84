//! Composite Dispatch Table Generator
//!
//! Builds the GIMP compositing dispatch table from the symbols defined by a
//! set of implementation modules, and emits it as C source.
//!
//! # Pipeline
//!
//! ```text
//! modules ──► SymbolLoader ──► TableBuilder ──► TableMerger ──► Emitter
//!  (.o)        (nm/listing)    (per module)     (last wins)     (.h/.c/test.c)
//! ```
//!
//! Every cell of the table is a [`Coordinate`]: an operation and the pixel
//! formats of the A, B and destination buffers. A module provides a cell
//! through a symbol named after it, or after a wildcard key such as
//! `multiply_any_any_any`. The most specific key a module defines wins,
//! and among modules the last one given wins.
//!
//! # Example
//!
//! ```rust,ignore
//! use composite_dispatch::{Config, Generator};
//!
//! let generator = Generator::new(Config::default());
//! let generation = generator.generate(&modules)?;
//! generation.write_to(Path::new("."), generator.config())?;
//! ```

pub mod builder;
pub mod catalog;
pub mod config;
pub mod emit;
pub mod error;
pub mod generator;
pub mod key;
pub mod merge;
pub mod reader;
pub mod resolver;
pub mod symbols;
pub mod table;

pub use catalog::{coordinates, Coordinate, Operation, PixelFormat};
pub use config::Config;
pub use emit::{Artifacts, Emitter};
pub use error::{DispatchError, DispatchResult};
pub use generator::{Generation, Generator};
pub use key::CandidateKey;
pub use symbols::{SymbolLoader, SymbolSource, SymbolTable};
pub use table::{DispatchTable, MasterTable, Module, ModuleId, ModuleTable};
