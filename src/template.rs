//! Placeholder Substitution Engine
//!
//! Templates are written as plain strings with `{name}` tokens and are parsed
//! once into pieces. Rendering walks the pieces and writes each bound value
//! out exactly once, so a substituted value is never scanned for further
//! tokens. A designator that happens to read `{ret}` is emitted as-is.
//!
//! ## Syntax
//! - `{slot}`: one of the closed [`Slot`] names
//! - `{stage:NAME}`: copy the value `NAME` into a same-width storage buffer `NAME_basic`
//! - `{stage_deref:NAME}`: same, copying from the pointee of `NAME`
//! - `{{` / `}}`: literal braces
//!
//! Stages expand into pieces that contain further `{storage}` holes, so
//! [`Template::render`] always expands stages before substituting slots.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// The closed set of named placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// C spelling of the operand type.
    Type,
    Designator,
    /// Opaque cell type name.
    Cell,
    /// Lowercase namespace used in function names.
    Ns,
    /// Uppercase namespace used in macro names.
    MacroNs,
    /// Backend call prefix (`variable->internal_variable.`, `atomic_`, ...).
    Call,
    /// Object argument handed to a free-function call.
    Object,
    /// Separator between the object argument and the remaining ones.
    Sep,
    /// Dereference applied to the `expected` pointer.
    Deref,
    /// Return-capture prefix.
    Ret,
    /// Size suffix closing a width-indexed helper name.
    Size,
    /// Plain storage type of matching width.
    Storage,
}

impl Slot {
    pub const ALL: [Slot; 12] = [
        Slot::Type,
        Slot::Designator,
        Slot::Cell,
        Slot::Ns,
        Slot::MacroNs,
        Slot::Call,
        Slot::Object,
        Slot::Sep,
        Slot::Deref,
        Slot::Ret,
        Slot::Size,
        Slot::Storage,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Slot::Type => "type",
            Slot::Designator => "designator",
            Slot::Cell => "cell",
            Slot::Ns => "ns",
            Slot::MacroNs => "NS",
            Slot::Call => "call",
            Slot::Object => "object",
            Slot::Sep => "sep",
            Slot::Deref => "deref",
            Slot::Ret => "ret",
            Slot::Size => "size",
            Slot::Storage => "storage",
        }
    }

    pub fn from_token(token: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| slot.token() == token)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.token())
    }
}

/// Where a stage copies its operand from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSource {
    Value,
    Pointee,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Hole(Slot),
    Stage { operand: String, source: StageSource },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spanned {
    piece: Piece,
    span: Range<usize>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder `{{{name}}}` in template `{origin}`")]
    UnknownPlaceholder {
        origin: String,
        text: String,
        name: String,
        span: Range<usize>,
    },
    #[error("unterminated placeholder in template `{origin}`")]
    Unterminated {
        origin: String,
        text: String,
        span: Range<usize>,
    },
    #[error("unmatched `}}` in template `{origin}`")]
    StrayBrace {
        origin: String,
        text: String,
        span: Range<usize>,
    },
    #[error("placeholder `{slot}` has no binding while rendering template `{origin}`")]
    Unbound {
        origin: String,
        text: String,
        slot: Slot,
        span: Range<usize>,
    },
}

impl TemplateError {
    /// Name of the catalog entry the template came from.
    pub fn origin(&self) -> &str {
        match self {
            TemplateError::UnknownPlaceholder { origin, .. }
            | TemplateError::Unterminated { origin, .. }
            | TemplateError::StrayBrace { origin, .. }
            | TemplateError::Unbound { origin, .. } => origin,
        }
    }

    /// The template source the span points into.
    pub fn text(&self) -> &str {
        match self {
            TemplateError::UnknownPlaceholder { text, .. }
            | TemplateError::Unterminated { text, .. }
            | TemplateError::StrayBrace { text, .. }
            | TemplateError::Unbound { text, .. } => text,
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            TemplateError::UnknownPlaceholder { span, .. }
            | TemplateError::Unterminated { span, .. }
            | TemplateError::StrayBrace { span, .. }
            | TemplateError::Unbound { span, .. } => span.clone(),
        }
    }
}

/// Values for the slots of one concrete (type, operation, backend) instantiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<Slot, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.set(slot, value);
        self
    }

    pub fn set(&mut self, slot: Slot, value: impl Into<String>) {
        self.values.insert(slot, value.into());
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    origin: String,
    text: String,
    pieces: Vec<Spanned>,
}

impl Template {
    /// Parses `text`. `origin` names the template in diagnostics.
    pub fn parse(origin: &str, text: &str) -> Result<Template, TemplateError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut literal_start = 0;
        let bytes = text.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    literal.push('{');
                    i += 2;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    literal.push('}');
                    i += 2;
                }
                b'}' => {
                    return Err(TemplateError::StrayBrace {
                        origin: origin.to_string(),
                        text: text.to_string(),
                        span: i..i + 1,
                    });
                }
                b'{' => {
                    let Some(len) = text[i + 1..].find('}') else {
                        return Err(TemplateError::Unterminated {
                            origin: origin.to_string(),
                            text: text.to_string(),
                            span: i..text.len(),
                        });
                    };
                    let span = i..i + len + 2;
                    let name = &text[i + 1..i + 1 + len];
                    if !literal.is_empty() {
                        pieces.push(Spanned {
                            piece: Piece::Text(std::mem::take(&mut literal)),
                            span: literal_start..i,
                        });
                    }
                    let piece = parse_token(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                        origin: origin.to_string(),
                        text: text.to_string(),
                        name: name.to_string(),
                        span: span.clone(),
                    })?;
                    i = span.end;
                    literal_start = i;
                    pieces.push(Spanned { piece, span });
                }
                _ => {
                    // Copy the whole UTF-8 sequence starting here.
                    let ch_len = text[i..].chars().next().map_or(1, char::len_utf8);
                    literal.push_str(&text[i..i + ch_len]);
                    i += ch_len;
                }
            }
        }
        if !literal.is_empty() {
            pieces.push(Spanned {
                piece: Piece::Text(literal),
                span: literal_start..text.len(),
            });
        }

        Ok(Template {
            origin: origin.to_string(),
            text: text.to_string(),
            pieces,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().map(|s| &s.piece)
    }

    /// Slots referenced directly by this template (stages not expanded).
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.pieces().filter_map(|piece| match piece {
            Piece::Hole(slot) => Some(*slot),
            _ => None,
        })
    }

    pub fn has_stage(&self) -> bool {
        self.pieces().any(|piece| matches!(piece, Piece::Stage { .. }))
    }

    /// Replaces every stage with the pieces that copy its operand into a
    /// width-matched buffer. The expansion introduces `{storage}` holes.
    pub fn expand_stages(&self) -> Template {
        let mut pieces = Vec::with_capacity(self.pieces.len());
        for spanned in &self.pieces {
            match &spanned.piece {
                Piece::Stage { operand, source } => {
                    let address = match source {
                        StageSource::Value => format!("&{}", operand),
                        StageSource::Pointee => operand.clone(),
                    };
                    pieces.push(Spanned {
                        piece: Piece::Hole(Slot::Storage),
                        span: spanned.span.clone(),
                    });
                    pieces.push(Spanned {
                        piece: Piece::Text(format!(
                            " {op}_basic;\n  memcpy(&{op}_basic, {address}, sizeof({op}_basic));\n  ",
                            op = operand,
                            address = address
                        )),
                        span: spanned.span.clone(),
                    });
                }
                _ => pieces.push(spanned.clone()),
            }
        }
        Template {
            origin: self.origin.clone(),
            text: self.text.clone(),
            pieces,
        }
    }

    /// Expands stages, then substitutes every slot from `bindings`.
    pub fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let expanded = self.expand_stages();
        let mut out = String::new();
        for spanned in &expanded.pieces {
            match &spanned.piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Hole(slot) => match bindings.get(*slot) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(TemplateError::Unbound {
                            origin: self.origin.clone(),
                            text: self.text.clone(),
                            slot: *slot,
                            span: spanned.span.clone(),
                        })
                    }
                },
                Piece::Stage { .. } => unreachable!("stages are expanded before substitution"),
            }
        }
        Ok(out)
    }
}

/// Parses and renders in one step.
pub fn render(origin: &str, text: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    Template::parse(origin, text)?.render(bindings)
}

fn parse_token(name: &str) -> Option<Piece> {
    if let Some(operand) = name.strip_prefix("stage:") {
        return is_identifier(operand).then(|| Piece::Stage {
            operand: operand.to_string(),
            source: StageSource::Value,
        });
    }
    if let Some(operand) = name.strip_prefix("stage_deref:") {
        return is_identifier(operand).then(|| Piece::Stage {
            operand: operand.to_string(),
            source: StageSource::Pointee,
        });
    }
    Slot::from_token(name).map(Piece::Hole)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_substitution() {
        let bindings = Bindings::new()
            .bind(Slot::Call, "atomic_")
            .bind(Slot::Object, "&variable->internal_variable")
            .bind(Slot::Sep, ", ");
        let text = render("store", "{call}store({object}{sep}value)", &bindings).unwrap();
        assert_eq!(text, "atomic_store(&variable->internal_variable, value)");
    }

    #[test]
    fn test_escaped_braces() {
        let text = render("block", "if (x) {{ y; }}", &Bindings::new()).unwrap();
        assert_eq!(text, "if (x) { y; }");
    }

    #[test]
    fn test_stage_expands_before_slots() {
        let template = Template::parse("t", "{stage:value}f(value_basic)").unwrap();
        assert!(template.has_stage());
        let expanded = template.expand_stages();
        assert!(!expanded.has_stage());
        assert_eq!(expanded.slots().collect::<Vec<_>>(), vec![Slot::Storage]);

        let text = template
            .render(&Bindings::new().bind(Slot::Storage, "uint_least8_t"))
            .unwrap();
        assert_eq!(
            text,
            "uint_least8_t value_basic;\n  memcpy(&value_basic, &value, sizeof(value_basic));\n  f(value_basic)"
        );
    }

    #[test]
    fn test_stage_deref_copies_pointee() {
        let text = render(
            "t",
            "{stage_deref:expected}",
            &Bindings::new().bind(Slot::Storage, "B"),
        )
        .unwrap();
        assert!(text.contains("memcpy(&expected_basic, expected, sizeof(expected_basic))"));
    }

    #[test]
    fn test_unknown_placeholder_reports_span() {
        let err = Template::parse("t", "abc{bogus}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { ref name, .. } if name == "bogus"));
        assert_eq!(err.span(), 3..10);
    }

    #[test]
    fn test_unterminated_and_stray() {
        assert!(matches!(
            Template::parse("t", "x{call"),
            Err(TemplateError::Unterminated { .. })
        ));
        assert!(matches!(
            Template::parse("t", "x}"),
            Err(TemplateError::StrayBrace { .. })
        ));
    }

    #[test]
    fn test_unbound_slot() {
        let err = render("t", "{ret}x", &Bindings::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Unbound { slot: Slot::Ret, .. }));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let bindings = Bindings::new().bind(Slot::Designator, "{ret}%D");
        let text = render("t", "f_{designator}", &bindings).unwrap();
        assert_eq!(text, "f_{ret}%D");
    }
}
