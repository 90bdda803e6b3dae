use crate::codegen::GenError;
use crate::template::TemplateError;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use std::io;

fn label_message(error: &TemplateError) -> String {
    match error {
        TemplateError::UnknownPlaceholder { name, .. } => format!("`{{{}}}` is not a placeholder", name),
        TemplateError::Unterminated { .. } => "missing `}` after this token".to_string(),
        TemplateError::StrayBrace { .. } => "write `}}` for a literal brace".to_string(),
        TemplateError::Unbound { slot, .. } => format!("no value bound for `{}`", slot),
    }
}

fn build_report(error: &TemplateError, color: bool) -> Report<'_, (&str, std::ops::Range<usize>)> {
    let origin = error.origin();
    let span = error.span();
    Report::build(ReportKind::Error, origin, span.start)
        .with_config(Config::default().with_color(color))
        .with_message(format!("Template error: {}", error))
        .with_label(
            Label::new((origin, span))
                .with_message(label_message(error))
                .with_color(Color::Red),
        )
        .finish()
}

/// Renders a template defect as an ariadne report, without colour codes.
pub fn render_template_error(error: &TemplateError) -> io::Result<String> {
    let mut buffer = Vec::new();
    build_report(error, false).write((error.origin(), Source::from(error.text())), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Display a template defect with ariadne formatting
pub fn display_template_error(error: &TemplateError) -> io::Result<()> {
    build_report(error, true).eprint((error.origin(), Source::from(error.text())))
}

/// Display a generation error; template defects get a source excerpt
pub fn display_gen_error(error: &GenError) -> io::Result<()> {
    match error {
        GenError::Template(template) => display_template_error(template),
        GenError::Config(config) => {
            eprintln!("Configuration error: {}", config);
            Ok(())
        }
    }
}
