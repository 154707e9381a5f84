//! The definitions file: tables, name table and initializer.

use std::fmt::{self, Write};

use super::{render, Emitter, GENERATED_BANNER};
use crate::table::{DispatchTable, MasterTable, Module};

impl Emitter<'_> {
    /// Renders every module table, the master table, the name table and
    /// the initialization routine.
    pub fn definitions(&self, modules: &[Module], master: &MasterTable) -> String {
        render(|f| self.write_definitions(f, modules, master))
    }

    fn write_definitions(
        &self,
        out: &mut impl Write,
        modules: &[Module],
        master: &MasterTable,
    ) -> fmt::Result {
        writeln!(out, "{}", GENERATED_BANNER)?;
        out.write_str("#include \"config.h\"\n")?;
        out.write_str("#include <glib-object.h>\n")?;
        out.write_str("#include <stdlib.h>\n")?;
        out.write_str("#include \"base/base-types.h\"\n")?;
        out.write_str("#include \"gimp-composite.h\"\n")?;
        writeln!(out, "#include \"{}\"", self.config.output.header)?;
        writeln!(out)?;

        for module in modules {
            self.write_function_table(out, module.id.ident(), &module.table)?;
        }

        self.write_function_table(out, &self.config.naming.table, master)?;
        self.write_name_table(out, &self.config.name_table(), master)?;
        self.write_init(out, modules)
    }

    fn write_function_table(
        &self,
        out: &mut impl Write,
        name: &str,
        table: &dyn DispatchTable,
    ) -> fmt::Result {
        self.write_forward_declarations(out, table)?;
        writeln!(out)?;
        writeln!(
            out,
            "void (*{}{})({} *) = {{",
            name,
            self.dimensions(),
            self.config.naming.context_type
        )?;
        self.write_array_body(out, table, |cell| cell.unwrap_or("NULL").to_string())?;
        writeln!(out)
    }

    fn write_name_table(
        &self,
        out: &mut impl Write,
        name: &str,
        table: &dyn DispatchTable,
    ) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "char *{}{} = {{", name, self.dimensions())?;
        self.write_array_body(out, table, |cell| format!("\"{}\"", cell.unwrap_or("")))?;
        writeln!(out)
    }

    fn write_init(&self, out: &mut impl Write, modules: &[Module]) -> fmt::Result {
        let naming = &self.config.naming;

        for module in modules {
            writeln!(out, "extern void {} (void);", module.id.init_function())?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "/*\n \
             * {init} () sets up the compositing functions once per process.\n \
             * Every call re-reads the {env} option bits.  The module\n \
             * initializers run on the first call only; afterwards\n \
             * GIMP_COMPOSITE_OPTION_INITIALISED stays set in\n \
             * gimp_composite_options for the life of the process.\n \
             */",
            init = naming.init_function,
            env = naming.env_var
        )?;
        out.write_str("void\n")?;
        writeln!(out, "{} (void)", naming.init_function)?;
        out.write_str("{\n")?;
        out.write_str("  const gchar *p;\n")?;
        writeln!(out)?;
        writeln!(out, "  if ((p = g_getenv (\"{}\")))", naming.env_var)?;
        out.write_str("    {\n")?;
        out.write_str("      gimp_composite_options.bits = strtoul (p, NULL, 16)\n")?;
        out.write_str(
            "        | (gimp_composite_options.bits & GIMP_COMPOSITE_OPTION_INITIALISED);\n",
        )?;
        out.write_str(
            "      g_printerr (\"gimp_composite_options: %08lx\\n\", gimp_composite_options.bits);\n",
        )?;
        out.write_str("      if (gimp_composite_options.bits & GIMP_COMPOSITE_OPTION_USE)\n")?;
        out.write_str("        g_printerr (\"using new gimp_composite functions\\n\");\n")?;
        out.write_str("    }\n")?;
        writeln!(out)?;
        out.write_str("  if (! (gimp_composite_options.bits & GIMP_COMPOSITE_OPTION_INITIALISED))\n")?;
        out.write_str("    {\n")?;
        for module in modules {
            writeln!(out, "      {} ();", module.id.init_function())?;
        }
        out.write_str("      gimp_composite_options.bits |= GIMP_COMPOSITE_OPTION_INITIALISED;\n")?;
        out.write_str("    }\n")?;
        out.write_str("}\n")
    }
}
