//! The regression and timing harness.
//!
//! For every cell a specialized module defines, the harness runs that
//! module's implementation and the generic one over the same synthetic
//! buffers, compares the results and reports the timing of both.

use std::fmt::{self, Write};

use indexmap::IndexSet;
use tracing::warn;

use super::{render, Emitter};
use crate::catalog::{coordinates, Coordinate, PixelFormat};
use crate::table::Module;

/// One specialized cell to check against the generic implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionCase {
    pub coord: Coordinate,
    /// The specialized module's implementation.
    pub special: String,
    /// Identifier of the module supplying `special`.
    pub module: String,
    /// The generic module's implementation of the same cell.
    pub generic: String,
}

/// Collects every cell defined by a specialized module.
///
/// The first module is the generic baseline and every later module is
/// checked against it, whether or not it won the merge. Cells the generic
/// module does not implement cannot be compared and are skipped.
pub fn regression_cases(modules: &[Module]) -> Vec<RegressionCase> {
    let Some((generic, specialized)) = modules.split_first() else {
        return Vec::new();
    };

    let mut cases = Vec::new();
    for coord in coordinates() {
        for module in specialized {
            let Some(special) = module.table.get(coord) else {
                continue;
            };
            let Some(generic_impl) = generic.table.get(coord) else {
                warn!(
                    "{}: {} has no generic counterpart in {}, not tested",
                    coord,
                    special,
                    generic.id.ident()
                );
                continue;
            };
            cases.push(RegressionCase {
                coord,
                special: special.to_string(),
                module: module.id.ident().to_string(),
                generic: generic_impl.to_string(),
            });
        }
    }
    cases
}

/// Buffer roles: operands A and B, mask M, special and generic outputs.
const BUFFERS: [&str; 5] = ["A", "B", "M", "D1", "D2"];

impl Emitter<'_> {
    /// Renders the regression harness source.
    pub fn regression(&self, modules: &[Module]) -> String {
        let cases = regression_cases(modules);
        render(|f| self.write_regression(f, &cases))
    }

    fn write_regression(&self, out: &mut impl Write, cases: &[RegressionCase]) -> fmt::Result {
        let context = &self.config.naming.context_type;

        out.write_str("#include \"config.h\"\n\n")?;
        out.write_str("#include <stdio.h>\n#include <stdlib.h>\n#include <string.h>\n\n")?;
        out.write_str("#include <sys/time.h>\n\n")?;
        out.write_str("#include <glib-object.h>\n\n")?;
        out.write_str("#include \"base/base-types.h\"\n\n")?;
        out.write_str("#include \"gimp-composite.h\"\n")?;
        writeln!(out, "#include \"{}\"", self.config.output.header)?;
        out.write_str("#include \"gimp-composite-regression.h\"\n")?;
        out.write_str("#include \"gimp-composite-util.h\"\n")?;
        out.write_str("#include \"gimp-composite-generic.h\"\n\n")?;

        let functions: IndexSet<&str> = cases
            .iter()
            .flat_map(|case| [case.special.as_str(), case.generic.as_str()])
            .collect();
        for function in &functions {
            writeln!(out, "void {}({} *);", function, context)?;
        }
        if !functions.is_empty() {
            writeln!(out)?;
        }

        out.write_str("int\ngimp_composite_regression (int iterations, int n_pixels)\n{\n")?;
        writeln!(out, "  {} generic_ctx;", context)?;
        writeln!(out, "  {} special_ctx;", context)?;
        out.write_str("  double ft0;\n  double ft1;\n")?;
        for format in PixelFormat::CONCRETE {
            for role in BUFFERS {
                writeln!(out, "  {} *{}{};", format.c_pixel_type(), format, role)?;
            }
        }
        out.write_str("  int i;\n\n")?;

        for format in PixelFormat::CONCRETE {
            let ty = format.c_pixel_type();
            for role in BUFFERS {
                writeln!(
                    out,
                    "  {}{} = ({} *) calloc (sizeof ({}), n_pixels + 1);",
                    format, role, ty, ty
                )?;
            }
        }
        writeln!(out)?;

        out.write_str("  for (i = 0; i < n_pixels; i++)\n    {\n")?;
        for format in PixelFormat::CONCRETE {
            for channel in format.channels() {
                writeln!(out, "      {}A[i].{} = 255 - i;", format, channel)?;
                writeln!(out, "      {}B[i].{} = i;", format, channel)?;
                writeln!(out, "      {}M[i].{} = i;", format, channel)?;
            }
        }
        out.write_str("    }\n")?;

        for case in cases {
            write_case(out, case)?;
        }

        out.write_str("\n  return (0);\n}\n\n")?;
        out.write_str("int\nmain (int argc, char *argv[])\n{\n")?;
        out.write_str("  int iterations;\n  int n_pixels;\n\n")?;
        out.write_str("  srand (314159);\n\n")?;
        out.write_str("  iterations = 1;\n  n_pixels = 256*256;\n\n")?;
        out.write_str("  return (gimp_composite_regression (iterations, n_pixels));\n}\n")
    }
}

fn write_case(out: &mut impl Write, case: &RegressionCase) -> fmt::Result {
    let c = case.coord;

    writeln!(out, "\n  /* {}: {} */", c, case.module)?;
    out.write_str("  memset ((void *) &special_ctx, 0, sizeof (special_ctx));\n")?;
    out.write_str("  memset ((void *) &generic_ctx, 0, sizeof (generic_ctx));\n")?;
    set_both(out, "op", &c.op.c_name())?;
    set_both(out, "n_pixels", "n_pixels")?;
    set_both(out, "scale.scale", "2")?;
    set_both(out, "pixelformat_A", &c.a.c_name())?;
    set_both(out, "pixelformat_B", &c.b.c_name())?;
    set_both(out, "pixelformat_D", &c.d.c_name())?;
    set_both(out, "pixelformat_M", &c.d.c_name())?;

    for (ctx, output) in [("special_ctx", "D1"), ("generic_ctx", "D2")] {
        writeln!(out, "  {}.A = (unsigned char *) {}A;", ctx, c.a)?;
        writeln!(out, "  {}.B = (unsigned char *) {}B;", ctx, c.b)?;
        writeln!(out, "  {}.M = (unsigned char *) {}M;", ctx, c.d)?;
        writeln!(out, "  {}.D = (unsigned char *) {}{};", ctx, c.d, output)?;
    }

    writeln!(
        out,
        "  ft0 = gimp_composite_regression_time_function (iterations, {}, &special_ctx);",
        case.special
    )?;
    writeln!(
        out,
        "  ft1 = gimp_composite_regression_time_function (iterations, {}, &generic_ctx);",
        case.generic
    )?;
    writeln!(
        out,
        "  if (gimp_composite_regression_compare_contexts (\"{}\", &generic_ctx, &special_ctx))",
        c
    )?;
    out.write_str("    {\n")?;
    writeln!(out, "      printf (\"{} ({}) failed\\n\");", c, case.module)?;
    out.write_str("      return (1);\n    }\n")?;
    writeln!(
        out,
        "  gimp_composite_regression_timer_report (\"{}\", ft0, ft1);",
        c
    )
}

/// Assigns the same value to a field of both contexts.
fn set_both(out: &mut impl Write, field: &str, value: &str) -> fmt::Result {
    writeln!(
        out,
        "  special_ctx.{} = generic_ctx.{} = {};",
        field, field, value
    )
}
