//! Front-end for attributed grammar files.
//!
//! The parser fills a [`Tab`] exclusively through its construction
//! operations, the same way any other producer of a syntax graph would.

pub mod lexer;

use self::lexer::{Keyword, Lexer, Spanned, Token};
use crate::{
    bitarray::BitArray,
    charset::CharSet,
    config::Config,
    diag::{DiagnosticKind, Diagnostics, Location},
    grammar::{Graph, NodeKind, Position, SymbolID, SymbolKind, TokenKind, TransCode},
    tab::{unescape, Tab},
};
use lexgen_util::Loc;

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("-- line {line} col {col}: invalid character")]
    InvalidToken { line: usize, col: usize },

    #[error("-- line {line} col {col}: {expected} expected")]
    Expected {
        line: usize,
        col: usize,
        expected: &'static str,
    },

    #[error("-- line {line} col {col}: unterminated literal")]
    Unterminated { line: usize, col: usize },

    #[error("-- end of file: {expected} expected")]
    UnexpectedEof { expected: &'static str },

    #[error("-- line {line} col {col}: nesting too deep")]
    TooDeep { line: usize, col: usize },
}

/// Maximum depth of nested `( )`, `[ ]` and `{ }` groups in one expression.
const MAX_NESTING: usize = 256;

/// Parse a grammar and build its symbol table and syntax graph.
///
/// Syntax errors abort the parse. Semantic errors such as a name declared
/// twice are reported into `diag` and the parse continues.
pub fn parse(source: &str, config: Config, diag: &mut Diagnostics) -> Result<Tab, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let tokens = Lexer::new(source)
        .map(|res| {
            res.map_err(|err| SyntaxError::InvalidToken {
                line: err.location.line as usize + 1,
                col: err.location.col as usize + 1,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        tab: Tab::new(config),
        diag,
    };
    parser.grammar()?;
    Ok(parser.tab)
}

fn location(loc: Loc) -> Location {
    Location::new(loc.line as usize + 1, loc.col as usize + 1)
}

/// The text between the delimiters of a token spanning `start..end`.
fn inner_position(start: Loc, end: Loc, open: usize, close: usize) -> Position {
    Position {
        beg: start.byte_idx + open,
        end: end.byte_idx - close,
        line: start.line as usize + 1,
        col: start.col as usize + 1,
    }
}

fn strip_delimiters(s: &str) -> &str {
    &s[1..s.len() - 1]
}

/// The string literal spelling of a character literal, e.g. `'x'` as `"x"`.
fn char_to_string(text: &str) -> String {
    match strip_delimiters(text) {
        "\"" => r#""\"""#.to_owned(),
        inner => format!("\"{}\"", inner),
    }
}

/// The text of a token definition when it consists of a single string.
#[derive(Debug, Clone)]
enum TokenString {
    None,
    Single(String),
    Structured,
}

struct Parser<'input, 'd> {
    tokens: Vec<Spanned<'input>>,
    pos: usize,
    depth: usize,
    tab: Tab,
    diag: &'d mut Diagnostics,
}

impl<'input> Parser<'input, '_> {
    // ==== token stream ====

    fn peek(&self) -> Option<Token<'input>> {
        self.tokens.get(self.pos).map(|(_, t, _)| *t)
    }

    fn bump(&mut self) -> Option<Spanned<'input>> {
        let tok = self.tokens.get(self.pos).copied();
        if let Some((_, t, _)) = &tok {
            tracing::trace!("consume token {:?}", t);
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: Token<'static>) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &'static str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some((start, Token::Unterminated(..), _)) => SyntaxError::Unterminated {
                line: start.line as usize + 1,
                col: start.col as usize + 1,
            },
            Some((start, ..)) => SyntaxError::Expected {
                line: start.line as usize + 1,
                col: start.col as usize + 1,
                expected,
            },
            None => SyntaxError::UnexpectedEof { expected },
        }
    }

    fn expect(&mut self, token: Token<'static>, expected: &'static str) -> Result<Loc, SyntaxError> {
        match self.tokens.get(self.pos) {
            Some(&(start, t, _)) if t == token => {
                self.pos += 1;
                Ok(start)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn expect_ident(&mut self) -> Result<(&'input str, Loc), SyntaxError> {
        match self.tokens.get(self.pos) {
            Some(&(start, Token::Ident(name), _)) => {
                self.pos += 1;
                Ok((name, start))
            }
            _ => Err(self.error("ident")),
        }
    }

    /// Run `f` one nesting level deeper, failing once `MAX_NESTING` is reached.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            let (line, col) = self
                .tokens
                .get(self.pos.saturating_sub(1))
                .map_or((0, 0), |(start, ..)| {
                    (start.line as usize + 1, start.col as usize + 1)
                });
            return Err(SyntaxError::TooDeep { line, col });
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    fn sem_err(&mut self, loc: Loc, msg: &str) {
        self.diag
            .error(DiagnosticKind::Semantic(msg.to_owned()), Some(location(loc)));
    }

    // ==== sections ====

    fn grammar(&mut self) -> Result<(), SyntaxError> {
        self.expect(Token::Kw(Keyword::Compiler), "\"COMPILER\"")?;
        let (gram_name, _) = self.expect_ident()?;

        while let Some(Token::Directive(text)) = self.peek() {
            self.bump();
            if text.contains('=') {
                self.tab.set_option(text);
            } else {
                self.tab.set_ddt(text);
            }
        }

        if self.eat(Token::Kw(Keyword::Characters)) {
            while let Some(Token::Ident(..)) = self.peek() {
                self.set_decl()?;
            }
        }
        if self.eat(Token::Kw(Keyword::Tokens)) {
            while let Some(Token::Ident(..) | Token::Str(..)) = self.peek() {
                self.token_decl(SymbolKind::Terminal)?;
            }
        }
        if self.eat(Token::Kw(Keyword::Pragmas)) {
            while let Some(Token::Ident(..) | Token::Str(..)) = self.peek() {
                self.token_decl(SymbolKind::Pragma)?;
            }
        }

        self.expect(Token::Kw(Keyword::Productions), "\"PRODUCTIONS\"")?;
        // token graphs are only needed up to here
        self.tab.delete_nodes();
        while let Some(Token::Ident(..)) = self.peek() {
            self.production()?;
        }

        self.expect(Token::Kw(Keyword::End), "\"END\"")?;
        let (end_name, end_loc) = self.expect_ident()?;
        if end_name != gram_name {
            self.sem_err(end_loc, "name does not match grammar name");
        }
        match self.tab.find_sym(gram_name) {
            Some(sym) if self.tab.symbol(sym).is_nonterminal() => {
                if self.tab.symbol(sym).attr_pos.is_some() {
                    self.sem_err(end_loc, "grammar symbol must not have attributes");
                }
                self.tab.set_start_symbol(sym);
            }
            _ => self.sem_err(end_loc, "missing production for grammar name"),
        }
        self.expect(Token::Dot, "\".\"")?;

        self.tab.end_productions(self.diag);
        Ok(())
    }

    // ==== character sets ====

    fn set_decl(&mut self) -> Result<(), SyntaxError> {
        let (name, loc) = self.expect_ident()?;
        if self.tab.find_char_class_by_name(name).is_some() {
            self.sem_err(loc, "name declared twice");
        }
        self.expect(Token::Eq, "\"=\"")?;
        let set = self.set()?;
        if set.elements() == 0 {
            self.sem_err(loc, "character set must not be empty");
        }
        self.tab.new_char_class(name, set);
        self.expect(Token::Dot, "\".\"")?;
        Ok(())
    }

    fn set(&mut self) -> Result<CharSet, SyntaxError> {
        let mut s = self.sim_set()?;
        loop {
            if self.eat(Token::Plus) {
                let s2 = self.sim_set()?;
                s.or(&s2);
            } else if self.eat(Token::Minus) {
                let s2 = self.sim_set()?;
                s.subtract(&s2);
            } else {
                return Ok(s);
            }
        }
    }

    fn sim_set(&mut self) -> Result<CharSet, SyntaxError> {
        let mut s = CharSet::new();
        match self.peek() {
            Some(Token::Ident(name)) => {
                let (_, loc) = self.expect_ident()?;
                match self.tab.find_char_class_by_name(name) {
                    Some(c) => s.or(self.tab.char_class_set(c)),
                    None => self.sem_err(loc, "undefined name"),
                }
            }
            Some(Token::Str(text)) => {
                let line = self.tokens[self.pos].0.line as usize + 1;
                self.pos += 1;
                for ch in unescape(strip_delimiters(text), line, self.diag).chars() {
                    s.set(ch as u32);
                }
            }
            Some(Token::Char(..)) => {
                let n1 = self.char_value()?;
                if self.eat(Token::DotDot) {
                    let n2 = self.char_value()?;
                    if n1 <= n2 {
                        s.add_range(n1, n2);
                    }
                } else {
                    s.set(n1);
                }
            }
            Some(Token::Kw(Keyword::Any)) => {
                self.bump();
                s.fill();
            }
            _ => return Err(self.error("set")),
        }
        Ok(s)
    }

    fn char_value(&mut self) -> Result<u32, SyntaxError> {
        match self.tokens.get(self.pos).copied() {
            Some((loc, Token::Char(text), _)) => {
                self.pos += 1;
                let s = unescape(strip_delimiters(text), loc.line as usize + 1, self.diag);
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(ch as u32),
                    _ => {
                        self.sem_err(loc, "unacceptable character value");
                        Ok(0)
                    }
                }
            }
            _ => Err(self.error("char")),
        }
    }

    // ==== token declarations ====

    fn token_decl(&mut self, kind: SymbolKind) -> Result<(), SyntaxError> {
        let (loc, name, is_literal) = match self.tokens.get(self.pos).copied() {
            Some((loc, Token::Ident(name), _)) => (loc, name, false),
            Some((loc, Token::Str(name), _)) => (loc, name, true),
            _ => return Err(self.error("ident or string")),
        };
        self.pos += 1;
        let line = loc.line as usize + 1;
        let sym = match self.tab.find_sym(name) {
            Some(sym) => {
                self.sem_err(loc, "name declared twice");
                sym
            }
            None => {
                let sym = self.tab.new_sym(kind, name, line, self.diag);
                self.tab.symbol_mut(sym).token_kind = TokenKind::Fixed;
                sym
            }
        };

        if self.eat(Token::Eq) {
            let mut token_string = TokenString::None;
            let g = self.token_expr(&mut token_string)?;
            self.expect(Token::Dot, "\".\"")?;
            if is_literal {
                self.sem_err(loc, "a literal must not be declared with a structure");
            }
            self.tab.finish(&g);
            match token_string {
                TokenString::Single(s) => {
                    if self.tab.literal(&s).is_some() {
                        self.sem_err(loc, "token string declared twice");
                    }
                    self.tab.add_literal(&s, sym);
                }
                _ => self.tab.symbol_mut(sym).token_kind = TokenKind::Class,
            }
        } else if is_literal {
            self.tab.symbol_mut(sym).token_kind = TokenKind::Literal;
        }

        if let Some((start, Token::Sem(..), end)) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            if kind != SymbolKind::Pragma {
                self.sem_err(start, "semantic action not allowed here");
            }
            self.tab.symbol_mut(sym).sem_pos = Some(inner_position(start, end, 2, 2));
        }
        Ok(())
    }

    fn token_expr(&mut self, token_string: &mut TokenString) -> Result<Graph, SyntaxError> {
        self.nested(|p| {
            let mut g = p.token_term(token_string)?;
            let mut first = true;
            while p.eat(Token::VertBar) {
                let g2 = p.token_term(token_string)?;
                if first {
                    p.tab.make_first_alt(&mut g);
                    first = false;
                }
                p.tab.make_alternative(&mut g, g2);
                *token_string = TokenString::Structured;
            }
            Ok(g)
        })
    }

    fn token_term(&mut self, token_string: &mut TokenString) -> Result<Graph, SyntaxError> {
        let mut g = self.token_factor(token_string)?;
        while let Some(
            Token::Ident(..)
            | Token::Str(..)
            | Token::Char(..)
            | Token::LParen
            | Token::LBracket
            | Token::LBrace,
        ) = self.peek()
        {
            let g2 = self.token_factor(token_string)?;
            self.tab.make_sequence(&mut g, g2);
        }
        if self.eat(Token::Kw(Keyword::Context)) {
            self.expect(Token::LParen, "\"(\"")?;
            let g2 = self.token_expr(token_string)?;
            self.expect(Token::RParen, "\")\"")?;
            self.tab.set_context_trans(Some(g2.l));
            self.tab.make_sequence(&mut g, g2);
            *token_string = TokenString::Structured;
        }
        Ok(g)
    }

    fn token_factor(&mut self, token_string: &mut TokenString) -> Result<Graph, SyntaxError> {
        let Some((loc, token, _)) = self.tokens.get(self.pos).copied() else {
            return Err(self.error("token factor"));
        };
        let line = loc.line as usize + 1;
        match token {
            Token::Ident(name) => {
                self.pos += 1;
                let class = match self.tab.find_char_class_by_name(name) {
                    Some(c) => c,
                    None => {
                        self.sem_err(loc, "undefined name");
                        self.tab.new_char_class(name, CharSet::new())
                    }
                };
                *token_string = TokenString::Structured;
                let kind = NodeKind::Clas {
                    class,
                    code: TransCode::Normal,
                };
                Ok(Graph::new(self.tab.new_node(kind, line)))
            }
            Token::Str(text) => {
                self.pos += 1;
                Ok(self.string_factor(text.to_owned(), line, token_string))
            }
            Token::Char(text) => {
                self.pos += 1;
                Ok(self.string_factor(char_to_string(text), line, token_string))
            }
            Token::LParen => {
                self.pos += 1;
                let g = self.token_expr(token_string)?;
                self.expect(Token::RParen, "\")\"")?;
                Ok(g)
            }
            Token::LBracket => {
                self.pos += 1;
                let mut g = self.token_expr(token_string)?;
                self.expect(Token::RBracket, "\"]\"")?;
                self.tab.make_option(&mut g);
                *token_string = TokenString::Structured;
                Ok(g)
            }
            Token::LBrace => {
                self.pos += 1;
                let mut g = self.token_expr(token_string)?;
                self.expect(Token::RBrace, "\"}\"")?;
                self.tab.make_iteration(&mut g);
                *token_string = TokenString::Structured;
                Ok(g)
            }
            _ => Err(self.error("token factor")),
        }
    }

    fn string_factor(&mut self, text: String, line: usize, token_string: &mut TokenString) -> Graph {
        let g = self.tab.str_to_graph(&text, line, self.diag);
        *token_string = match token_string {
            TokenString::None => TokenString::Single(text),
            _ => TokenString::Structured,
        };
        g
    }

    // ==== productions ====

    fn production(&mut self) -> Result<(), SyntaxError> {
        let (name, loc) = self.expect_ident()?;
        let line = loc.line as usize + 1;
        let (sym, undef) = match self.tab.find_sym(name) {
            None => (
                self.tab.new_sym(SymbolKind::Nonterminal, name, line, self.diag),
                true,
            ),
            Some(sym) => {
                let is_nonterminal = self.tab.symbol(sym).is_nonterminal();
                if !is_nonterminal {
                    self.sem_err(loc, "this symbol kind not allowed on left side of production");
                } else if self.tab.symbol(sym).graph.is_some() {
                    self.sem_err(loc, "name declared twice");
                }
                self.tab.symbol_mut(sym).line = line;
                (sym, false)
            }
        };

        let no_attrs = self.tab.symbol(sym).attr_pos.is_none();
        self.tab.symbol_mut(sym).attr_pos = None;
        if let Some((start, Token::Attr(..), end)) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            self.tab.symbol_mut(sym).attr_pos = Some(inner_position(start, end, 1, 1));
        }
        if !undef && no_attrs != self.tab.symbol(sym).attr_pos.is_none() {
            self.sem_err(loc, "attribute mismatch between declaration and use of this symbol");
        }
        if let Some((start, Token::Sem(..), end)) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            self.tab.symbol_mut(sym).sem_pos = Some(inner_position(start, end, 2, 2));
        }

        self.expect(Token::Eq, "\"=\"")?;
        let g = self.expression()?;
        self.tab.symbol_mut(sym).graph = Some(g.l);
        self.tab.finish(&g);
        self.expect(Token::Dot, "\".\"")?;
        Ok(())
    }

    fn expression(&mut self) -> Result<Graph, SyntaxError> {
        self.nested(|p| {
            let mut g = p.term()?;
            let mut first = true;
            while p.eat(Token::VertBar) {
                let g2 = p.term()?;
                if first {
                    p.tab.make_first_alt(&mut g);
                    first = false;
                }
                p.tab.make_alternative(&mut g, g2);
            }
            Ok(g)
        })
    }

    fn starts_factor(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Ident(..)
                    | Token::Str(..)
                    | Token::Char(..)
                    | Token::Kw(Keyword::Weak | Keyword::Any | Keyword::Sync)
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
                    | Token::Sem(..)
            )
        )
    }

    fn term(&mut self) -> Result<Graph, SyntaxError> {
        let mut g: Option<Graph> = None;
        if let Some((start, Token::Resolver(text), end)) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            let rslv = self.tab.new_node(NodeKind::Rslv, start.line as usize + 1);
            // the condition between the parentheses
            let open = text.find('(').map_or(0, |i| i + 1);
            self.tab.node_mut(rslv).pos = Some(inner_position(start, end, open, 1));
            let mut rg = Graph::new(rslv);
            let g2 = self.factor()?;
            self.tab.make_sequence(&mut rg, g2);
            g = Some(rg);
        }
        while self.starts_factor() {
            let g2 = self.factor()?;
            match &mut g {
                Some(g) => self.tab.make_sequence(g, g2),
                None => g = Some(g2),
            }
        }
        Ok(match g {
            Some(g) => g,
            None => Graph::new(self.tab.new_node(NodeKind::Eps, 0)),
        })
    }

    fn factor(&mut self) -> Result<Graph, SyntaxError> {
        let (start, token, end) = match self.tokens.get(self.pos).copied() {
            Some(tok) => tok,
            None => return Err(self.error("factor")),
        };
        let line = start.line as usize + 1;
        match token {
            Token::Kw(Keyword::Weak) | Token::Ident(..) | Token::Str(..) | Token::Char(..) => {
                self.symbol_factor()
            }
            Token::LParen => {
                self.pos += 1;
                let g = self.expression()?;
                self.expect(Token::RParen, "\")\"")?;
                Ok(g)
            }
            Token::LBracket => {
                self.pos += 1;
                let mut g = self.expression()?;
                self.expect(Token::RBracket, "\"]\"")?;
                self.tab.make_option(&mut g);
                Ok(g)
            }
            Token::LBrace => {
                self.pos += 1;
                let mut g = self.expression()?;
                self.expect(Token::RBrace, "\"}\"")?;
                self.tab.make_iteration(&mut g);
                Ok(g)
            }
            Token::Sem(..) => {
                self.pos += 1;
                let p = self.tab.new_node(NodeKind::Sem, line);
                self.tab.node_mut(p).pos = Some(inner_position(start, end, 2, 2));
                Ok(Graph::new(p))
            }
            Token::Kw(Keyword::Any) => {
                self.pos += 1;
                let set = BitArray::with_value(self.tab.num_terminals(), true);
                Ok(Graph::new(self.tab.new_node(NodeKind::Any { set }, line)))
            }
            Token::Kw(Keyword::Sync) => {
                self.pos += 1;
                let set = BitArray::default();
                Ok(Graph::new(self.tab.new_node(NodeKind::Sync { set }, line)))
            }
            _ => Err(self.error("factor")),
        }
    }

    fn symbol_factor(&mut self) -> Result<Graph, SyntaxError> {
        let weak = self.eat(Token::Kw(Keyword::Weak));
        let (loc, name, is_ident) = match self.tokens.get(self.pos).copied() {
            Some((loc, Token::Ident(name), _)) => (loc, name.to_owned(), true),
            Some((loc, Token::Str(text), _)) => (loc, text.to_owned(), false),
            // a character is a one-character string
            Some((loc, Token::Char(text), _)) => {
                (loc, char_to_string(text), false)
            }
            _ => return Err(self.error("ident or string")),
        };
        self.pos += 1;
        let line = loc.line as usize + 1;

        let mut found = self.tab.find_sym(&name);
        if found.is_none() && !is_ident {
            found = self.tab.literal(&name);
        }
        let undef = found.is_none();
        let sym: SymbolID = match found {
            Some(sym) => sym,
            // forward reference to a nonterminal
            None if is_ident => self.tab.new_sym(SymbolKind::Nonterminal, &name, 0, self.diag),
            None => {
                let sym = self.tab.new_sym(SymbolKind::Terminal, &name, line, self.diag);
                self.tab.symbol_mut(sym).token_kind = TokenKind::Literal;
                sym
            }
        };

        let kind = match self.tab.symbol(sym).kind {
            SymbolKind::Nonterminal => {
                if weak {
                    self.sem_err(loc, "only terminals may be weak");
                }
                NodeKind::Nt(sym)
            }
            SymbolKind::Terminal if weak => NodeKind::Wt(sym),
            SymbolKind::Terminal => NodeKind::T(sym),
            SymbolKind::Pragma => {
                self.sem_err(loc, "this symbol kind is not allowed in a production");
                NodeKind::T(sym)
            }
        };
        let p = self.tab.new_node(kind, line);

        if let Some((start, Token::Attr(..), end)) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            if !is_ident {
                self.sem_err(start, "a literal must not have attributes");
            }
            self.tab.node_mut(p).pos = Some(inner_position(start, end, 1, 1));
        }
        let pos = self.tab.node(p).pos;
        if undef {
            self.tab.symbol_mut(sym).attr_pos = pos;
        } else if pos.is_none() != self.tab.symbol(sym).attr_pos.is_none() {
            self.sem_err(loc, "attribute mismatch between declaration and use of this symbol");
        }
        Ok(Graph::new(p))
    }
}
