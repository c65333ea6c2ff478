use crate::span::Span;

/// A user-facing diagnostic: a runtime error raised by the interpreted
/// program, or a configuration problem.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        if let Err(e) = self.write_report(filename, source, std::io::stderr()) {
            eprintln!("error: cannot render diagnostic: {}", e);
        }
    }

    /// Render the diagnostic into any writer (no ANSI colors).
    pub fn render_to_string(&self, filename: &str, source: &str) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_report(filename, source, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn write_report<W: std::io::Write>(
        &self,
        filename: &str,
        source: &str,
        out: W,
    ) -> std::io::Result<()> {
        use ariadne::{Color, Config, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        // Spans past the end of the source (or dummy spans) get clamped so
        // ariadne never indexes out of range.
        let end = (self.span.end as usize).min(source.len());
        let start = (self.span.start as usize).min(end);

        let mut report = Report::build(kind, filename, start)
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish().write((filename, Source::from(source)), out)
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}
