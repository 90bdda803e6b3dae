//! Per-type atomic cell types.

use crate::catalog::Backend;
use crate::config::Variant;
use crate::emit::EmitContext;
use crate::registry::TypeDescriptor;

/// Storage field type of the cell on `backend`.
fn storage_type(ctx: &EmitContext, ty: &TypeDescriptor, backend: Backend) -> String {
    match backend {
        Backend::Native => format!("std::atomic_{}", ty.std_name),
        Backend::Standard => format!("atomic_{}", ty.std_name),
        Backend::Legacy => ty.basic_atomic_type(&ctx.macro_ns),
    }
}

/// The cell type of `ty`.
///
/// The full variant wraps the storage in a struct that can also carry the
/// per-cell mutex and the debug marker. The standard-only variant names the
/// facility's atomic type directly.
pub fn cell_type(ctx: &EmitContext, ty: &TypeDescriptor) -> String {
    let cell = ty.cell_type(&ctx.ns);
    let mut out = String::new();
    match ctx.variant {
        Variant::Full => {
            out.push_str("typedef struct {\n");
            for (index, backend) in ctx.backends().iter().enumerate() {
                out.push_str(&ctx.branch_directive(index, *backend));
                out.push('\n');
                out.push_str(&format!(
                    "  {} internal_variable;\n",
                    storage_type(ctx, ty, *backend)
                ));
            }
            out.push_str("#endif\n");
            out.push_str(&format!("#ifdef {}_ATOMIC_INTERNAL_HAS_MUTEX\n", ctx.macro_ns));
            out.push_str(&format!("  {}_mutex_t internal_mutex;\n", ctx.ns));
            out.push_str("#endif\n");
            out.push_str(&format!("#ifdef {}_DEBUG\n", ctx.macro_ns));
            out.push_str("  volatile uint32_t marker;\n");
            out.push_str("#endif\n");
            out.push_str(&format!("}} {};\n", cell));
        }
        Variant::StandardOnly => {
            for (index, backend) in ctx.backends().iter().enumerate() {
                out.push_str(&ctx.branch_directive(index, *backend));
                out.push('\n');
                out.push_str(&format!("typedef {} {};\n", storage_type(ctx, ty, *backend), cell));
            }
            out.push_str("#endif\n");
        }
    }
    out
}
