//! Text Emission Module
//!
//! Renders the pieces of the generated header. The driver in `codegen`
//! decides what to emit and in which order; the functions here turn one
//! catalog entry into text.
//!
//! ## Architecture
//! - `preamble`: license, include guards, feature detection, support macros, memory barrier
//! - `generators`: storage typedefs, internal width helpers, cell types, public operations

pub mod generators;
pub mod preamble;

use crate::catalog::Backend;
use crate::config::{GeneratorConfig, Variant};
use crate::registry::TypeDescriptor;
use crate::template::{Bindings, Slot};

/// Naming shared by every emitter for one generator run.
#[derive(Debug, Clone)]
pub struct EmitContext {
    pub variant: Variant,
    /// Lowercase namespace (`embb`).
    pub ns: String,
    /// Uppercase namespace (`EMBB`).
    pub macro_ns: String,
}

impl EmitContext {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            variant: config.variant,
            ns: config.namespace.clone(),
            macro_ns: config.macro_namespace(),
        }
    }

    /// Backends compiled into this variant, in `#if` / `#elif` / `#else` order.
    pub fn backends(&self) -> &'static [Backend] {
        match self.variant {
            Variant::Full => &Backend::ALL,
            Variant::StandardOnly => &[Backend::Native, Backend::Standard],
        }
    }

    /// Read-only operations take a `const` cell unless a lock lives inside it.
    pub fn const_cells(&self) -> bool {
        !self.variant.has_legacy()
    }

    /// `EMBB_PLATFORM_INLINE`
    pub fn inline_macro(&self) -> String {
        format!("{}_PLATFORM_INLINE", self.macro_ns)
    }

    /// Bindings every template may use.
    pub fn namespace_bindings(&self) -> Bindings {
        Bindings::new()
            .bind(Slot::Ns, self.ns.clone())
            .bind(Slot::MacroNs, self.macro_ns.clone())
    }

    /// Namespace bindings plus the operand type's names.
    pub fn type_bindings(&self, ty: &TypeDescriptor) -> Bindings {
        self.namespace_bindings()
            .bind(Slot::Type, ty.name)
            .bind(Slot::Designator, ty.designator())
            .bind(Slot::Cell, ty.cell_type(&self.ns))
    }

    /// Preprocessor line opening the `index`-th backend arm.
    pub fn branch_directive(&self, index: usize, backend: Backend) -> String {
        match (index, backend.condition(&self.macro_ns)) {
            (0, Some(condition)) => format!("#if {}", condition),
            (_, Some(condition)) => format!("#elif {}", condition),
            (_, None) => "#else".to_string(),
        }
    }
}
