//! Code Generators Module
//!
//! One function per kind of emitted declaration. Each takes the shared
//! [`EmitContext`](super::EmitContext) and a catalog or registry entry and
//! returns the declaration's text, without its feature-flag guard.
//!
//! - `storage`: fixed-width storage typedefs
//! - `internal`: width-indexed helpers
//! - `cells`: per-type atomic cell types
//! - `public`: per-type public operations

pub mod cells;
pub mod internal;
pub mod public;
pub mod storage;

use super::EmitContext;
use crate::catalog::Backend;
use crate::template::TemplateError;

/// Emits `#if` / `#elif` / `#else` arms, one per enabled backend, closed by `#endif`.
///
/// `arm` returns the statement for one backend, without indentation or `;`.
pub(crate) fn backend_branches<F>(ctx: &EmitContext, mut arm: F) -> Result<String, TemplateError>
where
    F: FnMut(Backend) -> Result<String, TemplateError>,
{
    let mut out = String::new();
    for (index, backend) in ctx.backends().iter().enumerate() {
        out.push_str(&ctx.branch_directive(index, *backend));
        out.push('\n');
        out.push_str("  ");
        out.push_str(&arm(*backend)?);
        out.push_str(";\n");
    }
    out.push_str("#endif\n");
    Ok(out)
}
