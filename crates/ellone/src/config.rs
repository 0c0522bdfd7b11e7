//! Analysis configuration.

use std::fmt;

/// The categories of trace output.
///
/// Each category occupies a numbered slot so that a trace string may also
/// enable slots by digit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Trace {
    /// `A`: the character classes of the scanner.
    Automaton = 0,
    /// `F`: first and follow sets of all nonterminals.
    Sets = 1,
    /// `G`: the syntax graph of the productions.
    SyntaxGraph = 2,
    /// `I`: the computation of first sets.
    FirstComputation = 3,
    /// `J`: the sets associated with ANYs and synchronisation points.
    AnyAndSyncSets = 4,
    /// `S`: the symbol table.
    SymbolTable = 6,
    /// `X`: the cross reference list.
    CrossReference = 7,
    /// `P`: statistics.
    Statistics = 8,
}

impl Trace {
    pub const ALL: [Trace; 8] = [
        Trace::Automaton,
        Trace::Sets,
        Trace::SyntaxGraph,
        Trace::FirstComputation,
        Trace::AnyAndSyncSets,
        Trace::SymbolTable,
        Trace::CrossReference,
        Trace::Statistics,
    ];

    pub fn from_letter(ch: char) -> Option<Self> {
        Some(match ch.to_ascii_uppercase() {
            'A' => Self::Automaton,
            'F' => Self::Sets,
            'G' => Self::SyntaxGraph,
            'I' => Self::FirstComputation,
            'J' => Self::AnyAndSyncSets,
            'P' => Self::Statistics,
            'S' => Self::SymbolTable,
            'X' => Self::CrossReference,
            _ => return None,
        })
    }
}

/// The set of enabled trace categories.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    slots: [bool; 10],
}

impl TraceOptions {
    /// Parse a trace string such as `"FS"` or `"x3"`.
    ///
    /// Letters are case-insensitive, digits enable their slot directly and
    /// anything else is ignored.
    pub fn parse(s: &str) -> Self {
        let mut opts = Self::default();
        opts.merge(s);
        opts
    }

    pub fn merge(&mut self, s: &str) {
        for ch in s.chars() {
            if let Some(d) = ch.to_digit(10) {
                self.slots[d as usize] = true;
            } else if let Some(trace) = Trace::from_letter(ch) {
                self.enable(trace);
            }
        }
    }

    pub fn enable(&mut self, trace: Trace) {
        self.slots[trace as usize] = true;
    }

    pub fn is_enabled(&self, trace: Trace) -> bool {
        self.slots[trace as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.slots.iter().any(|&b| b)
    }
}

impl fmt::Display for TraceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for trace in Trace::ALL {
            if self.is_enabled(trace) {
                let letter = match trace {
                    Trace::Automaton => 'A',
                    Trace::Sets => 'F',
                    Trace::SyntaxGraph => 'G',
                    Trace::FirstComputation => 'I',
                    Trace::AnyAndSyncSets => 'J',
                    Trace::SymbolTable => 'S',
                    Trace::CrossReference => 'X',
                    Trace::Statistics => 'P',
                };
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// Options that control the analysis and the generated artifacts.
///
/// The analysis never reads `namespace`, `token_prefix`, `check_eof` or
/// `emit_lines`. They are collected from the command line and the grammar's
/// `$` directives and handed unchanged to a downstream code generator.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    pub namespace: Option<String>,
    pub token_prefix: String,
    /// Whether the generated parser should require end-of-input after the
    /// start symbol (`$checkEOF`).
    pub check_eof: bool,
    /// Whether the generated code should carry source line directives.
    pub emit_lines: bool,
    pub suppress_resolver_warnings: bool,
    pub trace: TraceOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            token_prefix: "_".into(),
            check_eof: true,
            emit_lines: false,
            suppress_resolver_warnings: false,
            trace: TraceOptions::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn token_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.token_prefix = prefix.into();
        self
    }

    pub fn check_eof(mut self, enabled: bool) -> Self {
        self.check_eof = enabled;
        self
    }

    pub fn emit_lines(mut self, enabled: bool) -> Self {
        self.emit_lines = enabled;
        self
    }

    /// Silence the "misplaced resolver" warnings.
    pub fn suppress_resolver_warnings(mut self, enabled: bool) -> Self {
        self.suppress_resolver_warnings = enabled;
        self
    }

    pub fn trace(mut self, trace: TraceOptions) -> Self {
        self.trace = trace;
        self
    }
}
