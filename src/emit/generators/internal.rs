//! Width-indexed internal helpers.
//!
//! `embb_internal__atomic_<stem>_<width>` operates on the fixed-width storage
//! type. Public legacy operations reach it through `EMBB_XCAT2` with the
//! operand type's size define, after copying the operand into a buffer of
//! the storage type.

use super::backend_branches;
use crate::catalog::{Backend, InternalOperation};
use crate::emit::EmitContext;
use crate::registry::InternalWidth;
use crate::template::{self, Bindings, Slot, TemplateError};

/// Slots for one width, independent of the backend.
fn width_bindings(ctx: &EmitContext, width: &InternalWidth) -> Bindings {
    ctx.namespace_bindings()
        .bind(Slot::Type, width.storage_typedef(&ctx.macro_ns))
        .bind(Slot::Designator, width.designator())
        .bind(Slot::Cell, width.atomic_typedef(&ctx.macro_ns))
}

/// Adds the backend-specific slots. The helpers take the atomic storage
/// object itself, so both facilities see `variable` directly.
fn backend_bindings(mut bindings: Bindings, backend: Backend) -> Bindings {
    match backend {
        Backend::Native => {
            bindings.set(Slot::Call, "variable->");
            bindings.set(Slot::Object, "");
            bindings.set(Slot::Sep, "");
            bindings.set(Slot::Deref, "*");
            bindings.set(Slot::Ret, "return ");
        }
        Backend::Standard => {
            bindings.set(Slot::Call, "atomic_");
            bindings.set(Slot::Object, "variable");
            bindings.set(Slot::Sep, ", ");
            bindings.set(Slot::Deref, "");
            bindings.set(Slot::Ret, "return ");
        }
        // Plain C on `*variable`, only type names are needed.
        Backend::Legacy => {}
    }
    bindings
}

/// Renders the body statement of `op` for one width and backend.
pub fn render_body(
    ctx: &EmitContext,
    op: &InternalOperation,
    width: &InternalWidth,
    backend: Backend,
) -> Result<String, TemplateError> {
    let origin = format!("internal {} ({})", op.stem, backend);
    let bindings = backend_bindings(width_bindings(ctx, width), backend);
    template::render(&origin, op.body(backend), &bindings)
}

pub fn internal_helper(
    ctx: &EmitContext,
    op: &InternalOperation,
    width: &InternalWidth,
) -> Result<String, TemplateError> {
    let origin = format!("internal {} signature", op.stem);
    let signature = template::render(
        &origin,
        &op.signature(ctx.const_cells()),
        &width_bindings(ctx, width),
    )?;

    let mut out = format!("{} {} {{\n", ctx.inline_macro(), signature);
    out.push_str(&backend_branches(ctx, |backend| {
        render_body(ctx, op, width, backend)
    })?);
    out.push_str("}\n");
    Ok(out)
}
