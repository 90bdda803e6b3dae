//! Fixed-width storage typedefs.
//!
//! Every width gets a plain unsigned typedef and an atomic one. On the
//! legacy backend the atomic typedef is the plain type; the cell lock makes
//! it atomic.

use crate::catalog::Backend;
use crate::emit::EmitContext;
use crate::registry::INTERNAL_WIDTHS;

pub fn storage_typedefs(ctx: &EmitContext) -> String {
    let ns = &ctx.macro_ns;
    let mut out = String::new();
    for width in &INTERNAL_WIDTHS {
        out.push_str(&format!("typedef {} {};\n", width.std_name, width.storage_typedef(ns)));
    }

    for (index, backend) in ctx.backends().iter().enumerate() {
        out.push('\n');
        out.push_str(&ctx.branch_directive(index, *backend));
        out.push_str("\n\n");
        for width in &INTERNAL_WIDTHS {
            let atomic = match backend {
                Backend::Native => format!("std::atomic_{}", width.std_name),
                Backend::Standard => format!("atomic_{}", width.std_name),
                Backend::Legacy => width.storage_typedef(ns),
            };
            out.push_str(&format!("typedef {} {};\n", atomic, width.atomic_typedef(ns)));
        }
    }
    out.push_str("\n#endif\n");
    out
}
