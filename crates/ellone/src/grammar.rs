//! Syntax graph types.
//!
//! Symbols, nodes and character classes live in arenas owned by
//! [`Tab`](crate::tab::Tab) and refer to each other through the ID types
//! defined here.

use crate::{bitarray::BitArray, charset::CharClassID, diag::Location};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolID(u32);

impl SymbolID {
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeID(u32);

impl NodeID {
    /// The epsilon node created together with the table.
    ///
    /// No production ever references it, so number 0 reads as "none" in
    /// graph listings.
    pub const DUMMY: Self = Self(0);

    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal,
    Pragma,
    Nonterminal,
}

impl SymbolKind {
    pub(crate) fn short_name(self) -> &'static str {
        match self {
            Self::Terminal => "t   ",
            Self::Pragma => "pr  ",
            Self::Nonterminal => "nt  ",
        }
    }
}

/// How the scanner recognizes a terminal.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Defined by a fixed string.
    #[default]
    Fixed,
    /// Defined by a character class construct.
    Class,
    /// Defined by a literal used in the productions.
    Literal,
    /// A class token that can also be recognized as a literal.
    ClassLiteral,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fixed => "fixedToken",
            Self::Class => "classToken",
            Self::Literal => "litToken",
            Self::ClassLiteral => "classLitToken",
        })
    }
}

/// A span of text in the grammar source, such as an attribute list or a
/// semantic action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// Byte offset of the first character.
    pub beg: usize,
    /// Byte offset just past the last character.
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn location(&self) -> Location {
        Location::new(self.line, self.col)
    }
}

/// A grammar symbol.
#[derive(Debug)]
#[non_exhaustive]
pub struct Symbol {
    pub id: SymbolID,
    pub kind: SymbolKind,
    /// Dense index within the symbols of the same kind.
    pub n: usize,
    pub name: String,
    pub line: usize,
    pub token_kind: TokenKind,
    /// Position of the formal attributes, if any.
    pub attr_pos: Option<Position>,
    /// Position of the local semantic declarations of a nonterminal.
    pub sem_pos: Option<Position>,
    /// Root of the production graph of a nonterminal.
    pub graph: Option<NodeID>,
    pub deletable: bool,
    pub first_ready: bool,
    pub first: BitArray,
    pub follow: BitArray,
    /// Nonterminals whose follow set flows into this one.
    pub nts: BitArray,
}

impl Symbol {
    pub(crate) fn new(id: SymbolID, kind: SymbolKind, n: usize, name: String, line: usize) -> Self {
        Self {
            id,
            kind,
            n,
            name,
            line,
            token_kind: TokenKind::default(),
            attr_pos: None,
            sem_pos: None,
            graph: None,
            deletable: false,
            first_ready: false,
            first: BitArray::default(),
            follow: BitArray::default(),
            nts: BitArray::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind == SymbolKind::Nonterminal
    }
}

/// Transition code of `chr` and `clas` nodes in token graphs.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransCode {
    #[default]
    Normal,
    Context,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Terminal symbol.
    T(SymbolID),
    /// Pragma.
    Pr(SymbolID),
    /// Nonterminal symbol.
    Nt(SymbolID),
    /// Weak terminal symbol.
    Wt(SymbolID),
    /// Character class.
    Clas { class: CharClassID, code: TransCode },
    /// Single character.
    Chr { ch: u32, code: TransCode },
    /// Wildcard matching any terminal in `set`.
    Any { set: BitArray },
    /// Empty alternative.
    Eps,
    /// Synchronisation point for error recovery.
    Sync { set: BitArray },
    /// Semantic action.
    Sem,
    /// One alternative of an alternation, `down` links the next one.
    Alt { sub: NodeID, down: Option<NodeID> },
    /// Iteration `{...}`.
    Iter { sub: NodeID },
    /// Option `[...]`.
    Opt { sub: NodeID },
    /// Semantic predicate resolving an LL(1) conflict.
    Rslv,
}

impl NodeKind {
    pub(crate) fn short_name(&self) -> &'static str {
        match self {
            Self::T(..) => "t   ",
            Self::Pr(..) => "pr  ",
            Self::Nt(..) => "nt  ",
            Self::Wt(..) => "wt  ",
            Self::Clas { .. } => "clas",
            Self::Chr { .. } => "chr ",
            Self::Any { .. } => "any ",
            Self::Eps => "eps ",
            Self::Sync { .. } => "sync",
            Self::Sem => "sem ",
            Self::Alt { .. } => "alt ",
            Self::Iter { .. } => "iter",
            Self::Opt { .. } => "opt ",
            Self::Rslv => "rslv",
        }
    }

    /// The symbol of a terminal, pragma, nonterminal or weak terminal node.
    pub fn symbol(&self) -> Option<SymbolID> {
        match *self {
            Self::T(s) | Self::Pr(s) | Self::Nt(s) | Self::Wt(s) => Some(s),
            _ => None,
        }
    }
}

/// A vertex of the syntax graph.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Node {
    pub n: NodeID,
    pub kind: NodeKind,
    /// The successor within the same alternative.
    pub next: Option<NodeID>,
    /// Set when `next` leaves the enclosing substructure.
    pub up: bool,
    pub line: usize,
    /// Position of actual attributes, semantic action or resolver text.
    pub pos: Option<Position>,
}

impl Node {
    /// The nested substructure of an alternative, iteration or option.
    pub fn sub(&self) -> Option<NodeID> {
        match self.kind {
            NodeKind::Alt { sub, .. } | NodeKind::Iter { sub } | NodeKind::Opt { sub } => Some(sub),
            _ => None,
        }
    }

    /// The next alternative of an alternation.
    pub fn down(&self) -> Option<NodeID> {
        match self.kind {
            NodeKind::Alt { down, .. } => down,
            _ => None,
        }
    }

    pub fn location(&self) -> Location {
        match &self.pos {
            Some(pos) => pos.location(),
            None => Location::new(self.line, 0),
        }
    }
}

/// The left and right frontier of a graph under construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Graph {
    pub l: NodeID,
    pub r: NodeID,
}

impl Graph {
    pub fn new(p: NodeID) -> Self {
        Self { l: p, r: p }
    }
}
