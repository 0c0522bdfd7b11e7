//! The symbol table and the syntax graph of an attributed grammar.
//!
//! [`Tab`] owns every symbol, node and character class of one grammar. A
//! grammar front-end fills it through the construction operations defined in
//! this module; the analysis passes in the submodules then compute the sets
//! consumed by the scanner and parser generators.

mod checks;
mod sets;
mod strings;
mod trace;

pub use self::strings::{escape, unescape};

use crate::{
    bitarray::BitArray,
    charset::{CharClass, CharClassID, CharSet},
    config::{Config, Trace},
    diag::{DiagnosticKind, Diagnostics, Location},
    grammar::{Graph, Node, NodeID, NodeKind, Symbol, SymbolID, SymbolKind, TransCode},
    types::Map,
};

#[derive(Debug)]
pub struct Tab {
    pub config: Config,
    symbols: Vec<Symbol>,
    terminals: Vec<SymbolID>,
    pragmas: Vec<SymbolID>,
    nonterminals: Vec<SymbolID>,
    nodes: Vec<Node>,
    classes: Vec<CharClass>,
    literals: Map<String, SymbolID>,
    gram_sy: Option<SymbolID>,
    eof_sy: SymbolID,
    no_sym: Option<SymbolID>,
    all_sync_sets: BitArray,
    dummy_name: u8,
}

impl Tab {
    pub fn new(config: Config) -> Self {
        let mut tab = Self {
            config,
            symbols: vec![],
            terminals: vec![],
            pragmas: vec![],
            nonterminals: vec![],
            nodes: vec![],
            classes: vec![],
            literals: Map::default(),
            gram_sy: None,
            eof_sy: SymbolID::new(0),
            no_sym: None,
            all_sync_sets: BitArray::default(),
            dummy_name: b'A',
        };
        tab.new_node(NodeKind::Eps, 0);
        tab.eof_sy = tab.push_sym(SymbolKind::Terminal, "EOF".into(), 0);
        tab
    }

    // ==== symbols ====

    /// Declare a new symbol.
    ///
    /// The empty literal `""` is rejected and replaced by `???`.
    pub fn new_sym(
        &mut self,
        kind: SymbolKind,
        name: &str,
        line: usize,
        diag: &mut Diagnostics,
    ) -> SymbolID {
        let name = if name == "\"\"" {
            diag.error(DiagnosticKind::EmptyToken, Some(Location::new(line, 0)));
            "???"
        } else {
            name
        };
        self.push_sym(kind, name.to_owned(), line)
    }

    fn push_sym(&mut self, kind: SymbolKind, name: String, line: usize) -> SymbolID {
        let id = SymbolID::new(self.symbols.len() as u32);
        let n = match kind {
            SymbolKind::Terminal => {
                self.terminals.push(id);
                self.terminals.len() - 1
            }
            SymbolKind::Pragma => {
                // numbered by `renumber_pragmas`
                self.pragmas.push(id);
                0
            }
            SymbolKind::Nonterminal => {
                self.nonterminals.push(id);
                self.nonterminals.len() - 1
            }
        };
        self.symbols.push(Symbol::new(id, kind, n, name, line));
        id
    }

    /// Look up a terminal or nonterminal by name.
    pub fn find_sym(&self, name: &str) -> Option<SymbolID> {
        self.terminals
            .iter()
            .chain(&self.nonterminals)
            .copied()
            .find(|&id| self.symbols[id.index()].name == name)
    }

    pub fn symbol(&self, id: SymbolID) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolID) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Terminals in declaration order.
    pub fn terminals(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.terminals.iter().map(|id| &self.symbols[id.index()])
    }

    /// Pragmas in declaration order.
    pub fn pragmas(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.pragmas.iter().map(|id| &self.symbols[id.index()])
    }

    /// Nonterminals in declaration order.
    pub fn nonterminals(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.nonterminals.iter().map(|id| &self.symbols[id.index()])
    }

    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn num_nonterminals(&self) -> usize {
        self.nonterminals.len()
    }

    /// The end-of-input terminal.
    pub fn eof(&self) -> SymbolID {
        self.eof_sy
    }

    /// The terminal standing for an invalid token, once created.
    pub fn no_sym(&self) -> Option<SymbolID> {
        self.no_sym
    }

    pub fn start_symbol(&self) -> Option<SymbolID> {
        self.gram_sy
    }

    pub fn set_start_symbol(&mut self, sym: SymbolID) {
        self.gram_sy = Some(sym);
    }

    /// Register the spelling of a literal token.
    pub fn add_literal(&mut self, spelling: &str, sym: SymbolID) {
        self.literals.insert(spelling.to_owned(), sym);
    }

    pub fn literal(&self, spelling: &str) -> Option<SymbolID> {
        self.literals.get(spelling).copied()
    }

    /// Give the pragmas the indices following the last terminal.
    pub fn renumber_pragmas(&mut self) {
        let mut n = self.terminals.len();
        for &id in &self.pragmas {
            self.symbols[id.index()].n = n;
            n += 1;
        }
    }

    /// The union of all synchronisation sets, available after
    /// `comp_symbol_sets`.
    pub fn all_sync_sets(&self) -> &BitArray {
        &self.all_sync_sets
    }

    // ==== syntax graph ====

    pub fn new_node(&mut self, kind: NodeKind, line: usize) -> NodeID {
        let n = NodeID::new(self.nodes.len() as u32);
        self.nodes.push(Node {
            n,
            kind,
            next: None,
            up: false,
            line,
            pos: None,
        });
        n
    }

    pub fn node(&self, id: NodeID) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeID) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    fn next(&self, p: NodeID) -> Option<NodeID> {
        self.nodes[p.index()].next
    }

    /// Turn the graph into the first alternative of an alternation.
    pub fn make_first_alt(&mut self, g: &mut Graph) {
        let line = self.nodes[g.l.index()].line;
        let l = self.new_node(NodeKind::Alt { sub: g.l, down: None }, line);
        self.nodes[g.r.index()].up = true;
        self.nodes[l.index()].next = Some(g.r);
        g.l = l;
        g.r = l;
    }

    /// Append `g2` as a further alternative of the alternation `g1`.
    pub fn make_alternative(&mut self, g1: &mut Graph, g2: Graph) {
        let line = self.nodes[g2.l.index()].line;
        let l2 = self.new_node(NodeKind::Alt { sub: g2.l, down: None }, line);
        self.nodes[l2.index()].up = true;
        self.nodes[g2.r.index()].up = true;

        let mut p = g1.l;
        while let Some(down) = self.nodes[p.index()].down() {
            p = down;
        }
        if let NodeKind::Alt { down, .. } = &mut self.nodes[p.index()].kind {
            *down = Some(l2);
        }

        // append the alternative to the end list of g1
        let mut p = g1.r;
        while let Some(next) = self.next(p) {
            p = next;
        }
        self.nodes[p.index()].next = Some(l2);

        // append the end list of g2 to the end list of g1
        self.nodes[l2.index()].next = Some(g2.r);
    }

    /// Let `g2` follow `g1`, including every open exit of `g1`.
    pub fn make_sequence(&mut self, g1: &mut Graph, g2: Graph) {
        let mut p = self.next(g1.r);
        self.nodes[g1.r.index()].next = Some(g2.l);
        while let Some(id) = p {
            p = self.next(id);
            self.nodes[id.index()].next = Some(g2.l);
        }
        g1.r = g2.r;
    }

    pub fn make_iteration(&mut self, g: &mut Graph) {
        let line = self.nodes[g.l.index()].line;
        let l = self.new_node(NodeKind::Iter { sub: g.l }, line);
        self.nodes[g.r.index()].up = true;
        let mut p = Some(g.r);
        g.l = l;
        g.r = l;
        while let Some(id) = p {
            p = self.next(id);
            self.nodes[id.index()].next = Some(l);
        }
    }

    pub fn make_option(&mut self, g: &mut Graph) {
        let line = self.nodes[g.l.index()].line;
        let l = self.new_node(NodeKind::Opt { sub: g.l }, line);
        self.nodes[g.r.index()].up = true;
        self.nodes[l.index()].next = Some(g.r);
        g.l = l;
        g.r = l;
    }

    /// Terminate every open exit of a top-level graph.
    pub fn finish(&mut self, g: &Graph) {
        let mut p = Some(g.r);
        while let Some(id) = p {
            p = self.next(id);
            self.nodes[id.index()].next = None;
        }
    }

    /// Drop every node and start over with a fresh dummy node.
    ///
    /// Used after the token graphs have been consumed by the scanner
    /// generator; node IDs handed out earlier are invalid afterwards.
    pub fn delete_nodes(&mut self) {
        self.nodes.clear();
        self.new_node(NodeKind::Eps, 0);
    }

    /// Build a chain of character nodes from a quoted string literal.
    pub fn str_to_graph(&mut self, literal: &str, line: usize, diag: &mut Diagnostics) -> Graph {
        let inner = strip_quotes(literal);
        let s = unescape(inner, line, diag);
        if s.is_empty() {
            diag.error(DiagnosticKind::EmptyToken, Some(Location::new(line, 0)));
            return Graph::new(self.new_node(NodeKind::Eps, line));
        }
        let mut g: Option<Graph> = None;
        for ch in s.chars() {
            let p = self.new_node(
                NodeKind::Chr {
                    ch: ch as u32,
                    code: Default::default(),
                },
                line,
            );
            match &mut g {
                Some(g) => {
                    self.nodes[g.r.index()].next = Some(p);
                    g.r = p;
                }
                None => g = Some(Graph::new(p)),
            }
        }
        g.unwrap_or_else(|| Graph::new(NodeID::DUMMY))
    }

    /// Mark every character transition in the token graph rooted at `p` as a
    /// context transition.
    pub fn set_context_trans(&mut self, p: Option<NodeID>) {
        let mut p = p;
        while let Some(id) = p {
            let (sub, down) = match &mut self.nodes[id.index()].kind {
                NodeKind::Chr { code, .. } | NodeKind::Clas { code, .. } => {
                    *code = TransCode::Context;
                    (None, None)
                }
                NodeKind::Opt { sub } | NodeKind::Iter { sub } => (Some(*sub), None),
                NodeKind::Alt { sub, down } => (Some(*sub), *down),
                _ => (None, None),
            };
            self.set_context_trans(sub);
            self.set_context_trans(down);
            let node = &self.nodes[id.index()];
            if node.up {
                break;
            }
            p = node.next;
        }
    }

    // ==== deletability ====

    /// Whether the graph starting at `p` can derive the empty string.
    pub fn del_graph(&self, p: Option<NodeID>) -> bool {
        let mut p = p;
        while let Some(id) = p {
            if !self.del_node(id) {
                return false;
            }
            p = self.next(id);
        }
        true
    }

    /// Like `del_graph`, but stops at the end of the enclosing substructure.
    pub fn del_sub_graph(&self, p: Option<NodeID>) -> bool {
        let mut p = p;
        while let Some(id) = p {
            if !self.del_node(id) {
                return false;
            }
            if self.nodes[id.index()].up {
                return true;
            }
            p = self.next(id);
        }
        true
    }

    pub fn del_node(&self, p: NodeID) -> bool {
        match self.nodes[p.index()].kind {
            NodeKind::Nt(sym) => self.symbols[sym.index()].deletable,
            NodeKind::Alt { sub, down } => {
                self.del_sub_graph(Some(sub)) || (down.is_some() && self.del_sub_graph(down))
            }
            NodeKind::Iter { .. }
            | NodeKind::Opt { .. }
            | NodeKind::Sem
            | NodeKind::Eps
            | NodeKind::Rslv
            | NodeKind::Sync { .. } => true,
            _ => false,
        }
    }

    // ==== character classes ====

    /// Declare a character class. The name `#` generates a fresh name.
    pub fn new_char_class(&mut self, name: &str, set: CharSet) -> CharClassID {
        let name = if name == "#" {
            let name = format!("#{}", self.dummy_name as char);
            self.dummy_name += 1;
            name
        } else {
            name.to_owned()
        };
        let n = CharClassID::new(self.classes.len() as u32);
        self.classes.push(CharClass { n, name, set });
        n
    }

    pub fn find_char_class_by_name(&self, name: &str) -> Option<CharClassID> {
        self.classes.iter().find(|c| c.name == name).map(|c| c.n)
    }

    pub fn find_char_class_by_set(&self, set: &CharSet) -> Option<CharClassID> {
        self.classes.iter().find(|c| c.set.equals(set)).map(|c| c.n)
    }

    pub fn char_class_set(&self, id: CharClassID) -> &CharSet {
        &self.classes[id.index()].set
    }

    pub fn classes(&self) -> &[CharClass] {
        &self.classes
    }

    // ==== options ====

    /// Enable trace categories from a trace string.
    pub fn set_ddt(&mut self, s: &str) {
        self.config.trace.merge(s);
    }

    /// Apply an option directive of the form `$key=value`.
    ///
    /// Unknown keys are ignored.
    pub fn set_option(&mut self, s: &str) {
        let (name, value) = s.split_once('=').unwrap_or((s, ""));
        match name {
            "$namespace" if !value.split('.').all(verify_ident) => {
                tracing::debug!("ignored invalid namespace {:?}", value)
            }
            "$namespace" => {
                if self.config.namespace.is_none() {
                    self.config.namespace = Some(value.to_owned());
                }
            }
            "$tokenPrefix" if !value.chars().all(unicode_ident::is_xid_continue) => {
                tracing::debug!("ignored invalid token prefix {:?}", value)
            }
            "$tokenPrefix" => self.config.token_prefix = value.to_owned(),
            "$checkEOF" => self.config.check_eof = value == "true",
            _ => tracing::debug!("ignored option {:?}", s),
        }
    }

    // ==== driver ====

    /// Close the production section: create the invalid-token terminal, set up
    /// the ANY nodes and number the pragmas.
    pub fn end_productions(&mut self, diag: &mut Diagnostics) {
        self.no_sym = Some(self.push_sym(SymbolKind::Terminal, "???".into(), 0));
        self.setup_anys();
        self.renumber_pragmas();
        if self.config.trace.is_enabled(Trace::SyntaxGraph) {
            self.print_nodes(diag);
        }
        if self.config.trace.is_enabled(Trace::Automaton) {
            self.write_char_classes(diag);
        }
    }

    /// Run the complete analysis and report whether the grammar is accepted.
    pub fn analyze(&mut self, diag: &mut Diagnostics) -> bool {
        let span = tracing::debug_span!("analyze");
        let _entered = span.enter();

        let mut ok = false;
        if !diag.has_errors() {
            self.comp_symbol_sets(diag);
            if self.config.trace.is_enabled(Trace::CrossReference) {
                self.xref(diag);
            }
            ok = self.grammar_ok(diag);
            if ok && self.config.trace.is_enabled(Trace::Statistics) {
                self.print_statistics(diag);
            }
        }
        if self.config.trace.is_enabled(Trace::SymbolTable) {
            self.print_symbol_table(diag);
        }
        ok && !diag.has_errors()
    }
}

fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

fn strip_quotes(s: &str) -> &str {
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(a @ ('"' | '\'')), Some(b)) if a == b => chars.as_str(),
        _ => s,
    }
}
