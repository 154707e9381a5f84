//! C code emission.
//!
//! The emitter turns module tables and the master table into three C
//! files:
//!
//! - the declarations header, holding the table typedef;
//! - the definitions file, holding every table, the name table and the
//!   initialization routine;
//! - the regression harness, comparing each specialized implementation
//!   against the generic one.
//!
//! Output depends only on the tables and the configuration, so identical
//! inputs always produce identical files.

mod declarations;
mod definitions;
mod regression;

pub use regression::{regression_cases, RegressionCase};

use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::{Coordinate, Operation, PixelFormat};
use crate::config::{Config, OutputConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::table::{DispatchTable, MasterTable, Module};

/// Banner at the top of generated files.
pub const GENERATED_BANNER: &str = "/* THIS FILE IS AUTOMATICALLY GENERATED.  DO NOT EDIT */";

/// Array dimension symbols, outermost first.
pub const DIMENSIONS: [&str; 4] = [
    "GIMP_COMPOSITE_N",
    "GIMP_PIXELFORMAT_N",
    "GIMP_PIXELFORMAT_N",
    "GIMP_PIXELFORMAT_N",
];

/// The rendered contents of the three generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub declarations: String,
    pub definitions: String,
    pub regression: String,
}

impl Artifacts {
    /// Pairs each file name with its contents.
    pub fn files<'a>(&'a self, output: &'a OutputConfig) -> [(&'a str, &'a str); 3] {
        [
            (output.header.as_str(), self.declarations.as_str()),
            (output.source.as_str(), self.definitions.as_str()),
            (output.regression.as_str(), self.regression.as_str()),
        ]
    }

    /// Writes all three files into `dir`.
    pub fn write_to(&self, dir: &Path, output: &OutputConfig) -> DispatchResult<()> {
        for (name, content) in self.files(output) {
            let path = dir.join(name);
            fs::write(&path, content).map_err(|source| DispatchError::Write {
                path: path.clone(),
                source,
            })?;
            info!("Wrote {} ({})", path.display(), digest(content));
        }
        Ok(())
    }

    /// Lists the files in `dir` whose contents differ from these artifacts.
    ///
    /// A missing file counts as different.
    pub fn stale_files(&self, dir: &Path, output: &OutputConfig) -> Vec<PathBuf> {
        let mut stale = Vec::new();
        for (name, content) in self.files(output) {
            let path = dir.join(name);
            match fs::read_to_string(&path) {
                Ok(existing) if existing == content => {
                    debug!("{} is up to date ({})", path.display(), digest(content));
                }
                _ => stale.push(path),
            }
        }
        stale
    }
}

/// Short BLAKE3 fingerprint of generated content, for logs.
pub fn digest(content: &str) -> String {
    let hash = blake3::hash(content.as_bytes());
    hex::encode(&hash.as_bytes()[..8])
}

/// Renders C source for the dispatch tables.
#[derive(Debug, Clone)]
pub struct Emitter<'a> {
    config: &'a Config,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Renders all three artifacts.
    pub fn emit(&self, modules: &[Module], master: &MasterTable) -> Artifacts {
        Artifacts {
            declarations: self.declarations(),
            definitions: self.definitions(modules, master),
            regression: self.regression(modules),
        }
    }

    /// `void name(GimpCompositeContext *);` for every function in `table`.
    fn write_forward_declarations(
        &self,
        out: &mut impl Write,
        table: &dyn DispatchTable,
    ) -> fmt::Result {
        for function in table.functions() {
            writeln!(out, "void {}({} *);", function, self.config.naming.context_type)?;
        }
        Ok(())
    }

    /// Writes the `{ ... }` body of a four-dimensional array literal.
    fn write_array_body(
        &self,
        out: &mut impl Write,
        table: &dyn DispatchTable,
        cell: impl Fn(Option<&str>) -> String,
    ) -> fmt::Result {
        for op in Operation::ALL {
            writeln!(out, " {{ /* {} */", op.c_name())?;
            for a in PixelFormat::CONCRETE {
                writeln!(out, "  {{ /* A = {} */", a)?;
                for b in PixelFormat::CONCRETE {
                    write!(out, "   /* {:<6} */ {{", b.key_name())?;
                    for d in PixelFormat::CONCRETE {
                        let coord = Coordinate::new(op, a, b, d);
                        write!(out, " {},", cell(table.implementation(coord)))?;
                    }
                    out.write_str(" },\n")?;
                }
                out.write_str("  },\n")?;
            }
            out.write_str(" },\n")?;
        }
        out.write_str("};\n")
    }

    /// `[GIMP_COMPOSITE_N][GIMP_PIXELFORMAT_N]...`
    fn dimensions(&self) -> String {
        DIMENSIONS.iter().map(|dim| format!("[{}]", dim)).collect()
    }
}

/// Renders through a formatter so writers can propagate `fmt::Result`.
fn render(write: impl Fn(&mut fmt::Formatter<'_>) -> fmt::Result) -> String {
    struct Render<F>(F);

    impl<F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result> fmt::Display for Render<F> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(f)
        }
    }

    Render(write).to_string()
}
