//! Public per-type operations.
//!
//! Layout of one function in the full variant:
//!
//! ```text
//! EMBB_PLATFORM_INLINE <ret> embb_atomic_<stem>_<designator>(...) {
//!   <pre snippet>
//! #if <native>   / #elif <standard>  / #else
//!   <backend statement>;
//! #endif
//!   <post snippet>
//!   return return_val;
//! }
//! ```
//!
//! The standard-only variant drops the snippets and returns straight from
//! the backend statement.

use super::backend_branches;
use crate::catalog::{Backend, OperationDescriptor, ReturnShape, LEGACY_RETURN_COPY};
use crate::config::Variant;
use crate::emit::EmitContext;
use crate::registry::TypeDescriptor;
use crate::template::{self, Bindings, Slot, TemplateError};

/// Slots for one (type, operation, backend) instantiation.
pub fn bindings(
    ctx: &EmitContext,
    op: &OperationDescriptor,
    ty: &TypeDescriptor,
    backend: Backend,
) -> Bindings {
    let mut bindings = ctx.type_bindings(ty);
    if ctx.variant == Variant::StandardOnly {
        // The cell is the facility's atomic object itself.
        bindings.set(Slot::Ret, "return ");
        match backend {
            Backend::Native => {
                bindings.set(Slot::Call, "variable->");
                bindings.set(Slot::Object, "");
                bindings.set(Slot::Sep, "");
                bindings.set(Slot::Deref, "*");
            }
            Backend::Standard => {
                bindings.set(Slot::Call, "atomic_");
                bindings.set(Slot::Object, "variable");
                bindings.set(Slot::Sep, ", ");
                bindings.set(Slot::Deref, "");
            }
            Backend::Legacy => {}
        }
        return bindings;
    }

    match backend {
        Backend::Native => {
            bindings.set(Slot::Call, "variable->internal_variable.");
            bindings.set(Slot::Object, "");
            bindings.set(Slot::Sep, "");
            bindings.set(Slot::Deref, "*");
        }
        Backend::Standard => {
            bindings.set(Slot::Call, "atomic_");
            bindings.set(Slot::Object, "&variable->internal_variable");
            bindings.set(Slot::Sep, ", ");
            bindings.set(Slot::Deref, "");
        }
        Backend::Legacy => {
            bindings.set(Slot::Call, format!("{}_XCAT2({}_internal__atomic_", ctx.macro_ns, ctx.ns));
            bindings.set(Slot::Size, format!("_, {})", ty.size_define(&ctx.macro_ns)));
            bindings.set(Slot::Object, "&variable->internal_variable");
            bindings.set(Slot::Storage, ty.basic_type(&ctx.macro_ns));
        }
    }
    match (op.returns, backend) {
        (ReturnShape::Void, _) => {}
        (ReturnShape::Operand, Backend::Legacy) => {
            bindings.set(
                Slot::Ret,
                format!("{} return_val_basic = ", ty.basic_type(&ctx.macro_ns)),
            );
        }
        (ReturnShape::Operand, _) => bindings.set(Slot::Ret, format!("{} return_val = ", ty.name)),
        (ReturnShape::Fixed(fixed), _) => bindings.set(Slot::Ret, format!("{} return_val = ", fixed)),
    }
    bindings
}

/// Renders the backend statement(s) of `op` for `ty`, without indentation or trailing `;`.
pub fn render_body(
    ctx: &EmitContext,
    op: &OperationDescriptor,
    ty: &TypeDescriptor,
    backend: Backend,
) -> Result<String, TemplateError> {
    let origin = format!("{} ({})", op.stem, backend);
    let bindings = bindings(ctx, op, ty, backend);
    let mut out = template::render(&origin, op.body(backend), &bindings)?;
    if backend == Backend::Legacy && op.returns == ReturnShape::Operand {
        out.push_str(";\n  ");
        out.push_str(&template::render("legacy return copy", LEGACY_RETURN_COPY, &bindings)?);
    }
    Ok(out)
}

pub fn operation(
    ctx: &EmitContext,
    op: &OperationDescriptor,
    ty: &TypeDescriptor,
) -> Result<String, TemplateError> {
    let type_bindings = ctx.type_bindings(ty);
    let signature = template::render(
        &format!("{} signature", op.stem),
        &op.signature(ctx.const_cells()),
        &type_bindings,
    )?;

    let mut out = format!("{} {} {{\n", ctx.inline_macro(), signature);
    let with_snippets = ctx.variant == Variant::Full;
    if with_snippets {
        out.push_str(&template::render(&format!("{} pre", op.stem), op.pre, &type_bindings)?);
    }
    out.push_str(&backend_branches(ctx, |backend| render_body(ctx, op, ty, backend))?);
    if with_snippets {
        out.push_str(&template::render(&format!("{} post", op.stem), op.post, &type_bindings)?);
        if op.returns.has_value() {
            out.push_str("  return return_val;\n");
        }
    }
    out.push_str("}\n");
    Ok(out)
}
