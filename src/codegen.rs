use crate::catalog::{Backend, OpKind, INTERNAL_OPERATIONS, OPERATIONS};
use crate::config::{ConfigError, GeneratorConfig};
use crate::emit::generators::{cells, internal, public, storage};
use crate::emit::{preamble, EmitContext};
use crate::registry::{width_for, DataModel, ScalarType, INTERNAL_WIDTHS, SCALAR_TYPES};
use crate::template::TemplateError;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// What a declaration is, for ordering and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Preamble,
    StorageTypedefs,
    InternalHelper { op: OpKind, width: usize },
    CellType { ty: ScalarType },
    Operation { op: OpKind, ty: ScalarType },
    Epilogue,
}

/// One unit of generated text, optionally guarded by a feature flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// Macro that must be defined for the text to compile in.
    pub guard: Option<String>,
    pub text: String,
}

/// The generated header as a list of declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub declarations: Vec<Declaration>,
}

impl Header {
    /// Concatenates the declarations, wrapping guarded ones in `#ifdef`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (index, decl) in self.declarations.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            match &decl.guard {
                Some(guard) => {
                    out.push_str(&format!("#ifdef {}\n", guard));
                    out.push_str(&decl.text);
                    out.push_str("#endif\n");
                }
                None => out.push_str(&decl.text),
            }
        }
        out
    }

    pub fn operations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|d| matches!(d.kind, DeclarationKind::Operation { .. }))
    }

    pub fn find(&self, kind: DeclarationKind) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.kind == kind)
    }
}

/// Walks the registries and the catalog and produces the header.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    ctx: EmitContext,
}

impl Generator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            ctx: EmitContext::new(config),
        })
    }

    pub fn context(&self) -> &EmitContext {
        &self.ctx
    }

    /// Builds every declaration in emission order: preamble, storage
    /// typedefs, internal helpers, cell types, public operations, epilogue.
    pub fn declarations(&self) -> Result<Vec<Declaration>, GenError> {
        let ctx = &self.ctx;
        let guard = self.config.include_guard();
        let mut decls = Vec::new();

        decls.push(Declaration {
            kind: DeclarationKind::Preamble,
            guard: None,
            text: preamble::preamble(ctx, &guard)?,
        });
        decls.push(Declaration {
            kind: DeclarationKind::StorageTypedefs,
            guard: None,
            text: storage::storage_typedefs(ctx),
        });

        for op in &INTERNAL_OPERATIONS {
            for width in &INTERNAL_WIDTHS {
                decls.push(Declaration {
                    kind: DeclarationKind::InternalHelper { op: op.kind, width: width.bytes },
                    guard: None,
                    text: internal::internal_helper(ctx, op, width)?,
                });
            }
        }
        debug!(count = INTERNAL_OPERATIONS.len() * INTERNAL_WIDTHS.len(), "rendered internal helpers");

        for ty in &SCALAR_TYPES {
            decls.push(Declaration {
                kind: DeclarationKind::CellType { ty: ty.scalar },
                guard: Some(ty.is_atomic_define(&ctx.macro_ns)),
                text: cells::cell_type(ctx, ty),
            });
        }

        for op in &OPERATIONS {
            for ty in &SCALAR_TYPES {
                decls.push(Declaration {
                    kind: DeclarationKind::Operation { op: op.kind, ty: ty.scalar },
                    guard: Some(ty.is_atomic_define(&ctx.macro_ns)),
                    text: public::operation(ctx, op, ty)?,
                });
            }
            debug!(op = %op.kind, "rendered public operation for all types");
        }

        decls.push(Declaration {
            kind: DeclarationKind::Epilogue,
            guard: None,
            text: preamble::epilogue(&guard),
        });
        Ok(decls)
    }

    pub fn generate(&self) -> Result<Header, GenError> {
        let declarations = self.declarations()?;
        info!(
            declarations = declarations.len(),
            variant = ?self.config.variant,
            "generated atomic header"
        );
        Ok(Header { declarations })
    }

    /// Renders every (type, operation, backend) triple and every internal
    /// helper, collecting all failures instead of stopping at the first.
    pub fn check(&self) -> Vec<TemplateError> {
        let ctx = &self.ctx;
        let mut errors = Vec::new();
        for op in &INTERNAL_OPERATIONS {
            for width in &INTERNAL_WIDTHS {
                if let Err(err) = internal::internal_helper(ctx, op, width) {
                    errors.push(err);
                }
            }
        }
        for op in &OPERATIONS {
            for ty in &SCALAR_TYPES {
                for backend in ctx.backends() {
                    if let Err(err) = public::render_body(ctx, op, ty, *backend) {
                        errors.push(err);
                    }
                }
                if let Err(err) = public::operation(ctx, op, ty) {
                    errors.push(err);
                }
            }
        }
        unique_errors(errors)
    }
}

/// Identical defects repeat for every type; keeps the first report of each
/// (origin, span) pair, in discovery order.
fn unique_errors(mut errors: Vec<TemplateError>) -> Vec<TemplateError> {
    let mut seen = BTreeSet::new();
    errors.retain(|err| {
        let span = err.span();
        seen.insert((err.origin().to_string(), span.start, span.end))
    });
    errors
}

/// Generates the complete header text for `config`.
pub fn generate_header(config: &GeneratorConfig) -> Result<String, GenError> {
    Ok(Generator::new(config)?.generate()?.serialize())
}

/// Generates the companion sizes header for a target data model.
pub fn generate_sizes(config: &GeneratorConfig, model: DataModel) -> Result<String, GenError> {
    config.validate()?;
    let ctx = EmitContext::new(config);
    let guard = config.sizes_guard();

    let mut out = preamble::license(&ctx)?;
    out.push_str(&format!("\n#ifndef {guard}\n#define {guard}\n\n", guard = guard));
    out.push_str(&format!("/* Data model: {:?} */\n\n", model));
    for ty in &SCALAR_TYPES {
        let width = width_for(ty, model);
        out.push_str(&format!("#define {} {}\n", ty.size_define(&ctx.macro_ns), width.bytes));
    }
    out.push('\n');
    for ty in &SCALAR_TYPES {
        out.push_str(&format!("#define {}\n", ty.is_atomic_define(&ctx.macro_ns)));
    }
    out.push('\n');
    out.push_str(&preamble::epilogue(&guard));
    debug!(?model, "generated sizes header");
    Ok(out)
}

/// Backends whose implementation appears in the output for `config`.
pub fn enabled_backends(config: &GeneratorConfig) -> &'static [Backend] {
    EmitContext::new(config).backends()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stray(origin: &str, at: usize) -> TemplateError {
        TemplateError::StrayBrace {
            origin: origin.to_string(),
            text: "a}b}c".to_string(),
            span: at..at + 1,
        }
    }

    #[test]
    fn test_unique_errors_keeps_first_of_each_site() {
        let errors = vec![
            stray("swap (standard)", 1),
            stray("load (legacy)", 1),
            stray("swap (standard)", 1),
            stray("swap (standard)", 3),
            stray("load (legacy)", 1),
        ];
        let unique = unique_errors(errors);
        let sites: Vec<_> = unique.iter().map(|e| (e.origin(), e.span().start)).collect();
        assert_eq!(
            sites,
            vec![("swap (standard)", 1), ("load (legacy)", 1), ("swap (standard)", 3)]
        );
    }

    #[test]
    fn test_check_is_clean_for_both_variants() {
        for variant in [crate::config::Variant::Full, crate::config::Variant::StandardOnly] {
            let config = GeneratorConfig::new("embb", variant).unwrap();
            assert!(Generator::new(&config).unwrap().check().is_empty());
        }
    }
}
