//! The declarations header.

use std::fmt::{self, Write};

use super::{render, Emitter, GENERATED_BANNER};

impl Emitter<'_> {
    /// Renders the header declaring the table element type.
    pub fn declarations(&self) -> String {
        render(|f| self.write_declarations(f))
    }

    fn write_declarations(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{}", GENERATED_BANNER)?;
        writeln!(out)?;
        writeln!(
            out,
            "typedef void (*{}{});",
            self.config.naming.table_type,
            self.dimensions()
        )
    }
}
