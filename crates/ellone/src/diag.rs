//! Diagnostics and trace output.
//!
//! The analysis never fails with an `Err`. Every problem is reported into a
//! [`Diagnostics`] sink which keeps the running error count, the reports in
//! the order they were produced and the text of the trace listing.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The grammar is rejected.
    Error,
    /// Advisory only, generation may proceed.
    Warning,
    /// Informational message.
    Note,
}

/// A position in the grammar source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// The kind of LL(1) conflict found in a production.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LL1Conflict {
    StartOfSeveralAlternatives,
    StartAndSuccessorOfDeletable,
    AnyNodeMatchesNoSymbol,
    OptionalContentMustNotBeDeletable,
}

impl fmt::Display for LL1Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StartOfSeveralAlternatives => "start of several alternatives",
            Self::StartAndSuccessorOfDeletable => "start & successor of deletable structure",
            Self::AnyNodeMatchesNoSymbol => "an ANY node that matches no symbol",
            Self::OptionalContentMustNotBeDeletable => {
                "contents of [...] or {...} must not be deletable"
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LL1Warning {
    pub nonterminal: String,
    pub symbol: Option<String>,
    pub conflict: LL1Conflict,
}

impl fmt::Display for LL1Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LL1 warning in {}: ", self.nonterminal)?;
        if let Some(symbol) = &self.symbol {
            write!(f, "{} is ", symbol)?;
        }
        write!(f, "{}", self.conflict)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DiagnosticKind {
    #[error("empty token not allowed")]
    EmptyToken,

    #[error("bad escape sequence in string or character")]
    BadEscape,

    #[error("No production for {0}")]
    NoProduction(String),

    #[error("{0} cannot be reached")]
    Unreachable(String),

    #[error("{0} --> {1}")]
    CircularProduction(String, String),

    #[error("{0} cannot be derived to terminals")]
    Underivable(String),

    #[error("{0} is deletable")]
    Deletable(String),

    #[error("{0}")]
    LL1(LL1Warning),

    #[error("Resolver will never be evaluated. Place it at previous conflicting alternative.")]
    ResolverNeverEvaluated,

    #[error("Misplaced resolver: no LL(1) conflict.")]
    MisplacedResolverNoConflict,

    #[error("Misplaced resolver: no alternative.")]
    MisplacedResolverNoAlternative,

    /// Errors found by the grammar front-end.
    #[error("{0}")]
    Semantic(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(Location { line, col }) => match self.severity {
                Severity::Warning => write!(f, "-- line {} col {}: Warning: {}", line, col, self.kind),
                _ => write!(f, "-- line {} col {}: {}", line, col, self.kind),
            },
            None => write!(f, "  {}", self.kind),
        }
    }
}

/// The sink receiving every report and trace listing of one analysis.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reports: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    trace: String,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => {
                self.error_count += 1;
                tracing::debug!("error: {}", diag);
            }
            Severity::Warning => {
                self.warning_count += 1;
                tracing::debug!("warning: {}", diag);
            }
            Severity::Note => tracing::trace!("note: {}", diag),
        }
        self.reports.push(diag);
    }

    pub fn error(&mut self, kind: DiagnosticKind, location: Option<Location>) {
        self.report(Diagnostic {
            severity: Severity::Error,
            kind,
            location,
        });
    }

    pub fn warning(&mut self, kind: DiagnosticKind, location: Option<Location>) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            kind,
            location,
        });
    }

    pub fn note(&mut self, kind: DiagnosticKind) {
        self.report(Diagnostic {
            severity: Severity::Note,
            kind,
            location: None,
        });
    }

    /// Append a listing to the trace output.
    pub fn trace(&mut self, listing: impl fmt::Display) {
        use fmt::Write as _;
        // writing into a `String` cannot fail
        let _ = write!(self.trace, "{}", listing);
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn reports(&self) -> &[Diagnostic] {
        &self.reports
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.reports
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.reports
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn trace_output(&self) -> &str {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut diag = Diagnostics::new();
        diag.error(DiagnosticKind::Unreachable("B".into()), None);
        diag.warning(
            DiagnosticKind::MisplacedResolverNoConflict,
            Some(Location::new(3, 7)),
        );
        diag.note(DiagnosticKind::Deletable("C".into()));
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.reports().len(), 3);
        assert_eq!(diag.reports()[0].to_string(), "  B cannot be reached");
        assert_eq!(
            diag.reports()[1].to_string(),
            "-- line 3 col 7: Warning: Misplaced resolver: no LL(1) conflict."
        );
    }

    #[test]
    fn ll1_warning_text() {
        let w = LL1Warning {
            nonterminal: "S".into(),
            symbol: Some("\"a\"".into()),
            conflict: LL1Conflict::StartOfSeveralAlternatives,
        };
        assert_eq!(
            w.to_string(),
            "LL1 warning in S: \"a\" is start of several alternatives"
        );
        let w = LL1Warning {
            symbol: None,
            conflict: LL1Conflict::AnyNodeMatchesNoSymbol,
            ..w
        };
        assert_eq!(w.to_string(), "LL1 warning in S: an ANY node that matches no symbol");
    }

    #[test]
    fn trace_appends() {
        let mut diag = Diagnostics::new();
        diag.trace("a\n");
        diag.trace(format_args!("{}-{}\n", 1, 2));
        assert_eq!(diag.trace_output(), "a\n1-2\n");
    }
}
