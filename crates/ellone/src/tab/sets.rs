//! Symbol set computations: deletability, first, follow, ANY and SYNC sets.

use super::Tab;
use crate::{
    bitarray::BitArray,
    config::Trace,
    diag::{DiagnosticKind, Diagnostics},
    grammar::{NodeID, NodeKind, SymbolID},
    util::display_fn,
};

impl Tab {
    /// Compute every symbol set, in dependency order.
    pub fn comp_symbol_sets(&mut self, diag: &mut Diagnostics) {
        let span = tracing::debug_span!("comp_symbol_sets");
        let _entered = span.enter();

        self.comp_deletable_symbols(diag);
        self.comp_first_sets(diag);
        self.comp_any_sets(diag);
        self.comp_follow_sets(diag);
        self.comp_sync_sets(diag);

        if self.config.trace.is_enabled(Trace::Sets) {
            diag.trace(self.display_first_follow_sets());
        }
        if self.config.trace.is_enabled(Trace::AnyAndSyncSets) {
            diag.trace(self.display_any_sync_sets());
        }
    }

    // ==== deletable symbols ====

    pub fn comp_deletable_symbols(&mut self, diag: &mut Diagnostics) {
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            for i in 0..self.nonterminals.len() {
                let id = self.nonterminals[i];
                let sym = &self.symbols[id.index()];
                if !sym.deletable && sym.graph.is_some() && self.del_graph(sym.graph) {
                    self.symbols[id.index()].deletable = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        tracing::trace!("deletable symbols converged after {} passes", passes);

        for sym in self.nonterminals() {
            if sym.deletable {
                diag.note(DiagnosticKind::Deletable(sym.name.clone()));
            }
        }
    }

    // ==== first sets ====

    fn first0(&self, p: Option<NodeID>, mark: &mut BitArray) -> BitArray {
        let mut fs = BitArray::new(self.terminals.len());
        let mut p = p;
        while let Some(id) = p {
            if mark.get(id.index()) {
                break;
            }
            mark.set(id.index(), true);

            let node = &self.nodes[id.index()];
            match &node.kind {
                NodeKind::Nt(sym) => {
                    let sym = &self.symbols[sym.index()];
                    if sym.first_ready {
                        fs.or(&sym.first);
                    } else {
                        fs.or(&self.first0(sym.graph, mark));
                    }
                }
                NodeKind::T(sym) | NodeKind::Wt(sym) => {
                    fs.set(self.symbols[sym.index()].n, true);
                }
                NodeKind::Any { set } => fs.or(set),
                NodeKind::Alt { sub, down } => {
                    fs.or(&self.first0(Some(*sub), mark));
                    fs.or(&self.first0(*down, mark));
                }
                NodeKind::Iter { sub } | NodeKind::Opt { sub } => {
                    fs.or(&self.first0(Some(*sub), mark));
                }
                _ => (),
            }

            if !self.del_node(id) {
                break;
            }
            p = node.next;
        }
        fs
    }

    /// The terminals that can start the graph at `p`.
    pub fn first(&self, p: Option<NodeID>, diag: &mut Diagnostics) -> BitArray {
        let mut mark = BitArray::new(self.nodes.len());
        let fs = self.first0(p, &mut mark);
        if self.config.trace.is_enabled(Trace::FirstComputation) {
            match p {
                Some(p) => diag.trace(format_args!("\nFirst: node = {}\n", p.index())),
                None => diag.trace("\nFirst: node = null\n"),
            }
            diag.trace(self.display_set(&fs, 0));
        }
        fs
    }

    pub fn comp_first_sets(&mut self, diag: &mut Diagnostics) {
        let size = self.terminals.len();
        for &id in &self.nonterminals {
            let sym = &mut self.symbols[id.index()];
            sym.first = BitArray::new(size);
            sym.first_ready = false;
        }
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let fs = self.first(self.symbols[id.index()].graph, diag);
            let sym = &mut self.symbols[id.index()];
            sym.first = fs;
            sym.first_ready = true;
        }
    }

    // ==== follow sets ====

    fn comp_follow(
        &mut self,
        p: Option<NodeID>,
        cur_sy: SymbolID,
        visited: &mut BitArray,
        diag: &mut Diagnostics,
    ) {
        let mut p = p;
        while let Some(id) = p {
            if visited.get(id.index()) {
                break;
            }
            visited.set(id.index(), true);

            let next = self.nodes[id.index()].next;
            match self.nodes[id.index()].kind {
                NodeKind::Nt(sym) => {
                    let s = self.first(next, diag);
                    self.symbols[sym.index()].follow.or(&s);
                    if self.del_graph(next) {
                        let n = self.symbols[cur_sy.index()].n;
                        self.symbols[sym.index()].nts.set(n, true);
                    }
                }
                NodeKind::Opt { sub } | NodeKind::Iter { sub } => {
                    self.comp_follow(Some(sub), cur_sy, visited, diag);
                }
                NodeKind::Alt { sub, down } => {
                    self.comp_follow(Some(sub), cur_sy, visited, diag);
                    self.comp_follow(down, cur_sy, visited, diag);
                }
                _ => (),
            }
            p = next;
        }
    }

    // Add the follow sets of every nonterminal reachable through `nts` to
    // the follow set of `sym`.
    fn complete(&mut self, sym: SymbolID, cur_sy: SymbolID, visited: &mut BitArray) {
        let n = self.symbols[sym.index()].n;
        if visited.get(n) {
            return;
        }
        visited.set(n, true);
        for i in 0..self.nonterminals.len() {
            let s = self.nonterminals[i];
            let s_n = self.symbols[s.index()].n;
            if self.symbols[sym.index()].nts.get(s_n) {
                self.complete(s, cur_sy, visited);
                let follow = self.symbols[s.index()].follow.clone();
                let target = &mut self.symbols[sym.index()];
                target.follow.or(&follow);
                if sym == cur_sy {
                    target.nts.set(s_n, false);
                }
            }
        }
    }

    pub fn comp_follow_sets(&mut self, diag: &mut Diagnostics) {
        let num_terminals = self.terminals.len();
        let num_nonterminals = self.nonterminals.len();
        for &id in &self.nonterminals {
            let sym = &mut self.symbols[id.index()];
            sym.follow = BitArray::new(num_terminals);
            sym.nts = BitArray::new(num_nonterminals);
        }
        if let Some(gram_sy) = self.gram_sy {
            let eof = self.symbols[self.eof_sy.index()].n;
            self.symbols[gram_sy.index()].follow.set(eof, true);
        }

        // direct successors of nonterminals
        for i in 0..num_nonterminals {
            let id = self.nonterminals[i];
            let mut visited = BitArray::new(self.nodes.len());
            self.comp_follow(self.symbols[id.index()].graph, id, &mut visited, diag);
        }

        // indirect successors
        for i in 0..num_nonterminals {
            let id = self.nonterminals[i];
            let mut visited = BitArray::new(num_nonterminals);
            self.complete(id, id, &mut visited);
        }
    }

    // ==== ANY sets ====

    /// The first ANY node reachable from `p` without consuming a symbol.
    pub(crate) fn leading_any(&self, p: Option<NodeID>) -> Option<NodeID> {
        let id = p?;
        let node = &self.nodes[id.index()];
        let a = match node.kind {
            NodeKind::Any { .. } => Some(id),
            NodeKind::Alt { sub, down } => self
                .leading_any(Some(sub))
                .or_else(|| self.leading_any(down)),
            NodeKind::Opt { sub } | NodeKind::Iter { sub } => self.leading_any(Some(sub)),
            _ => None,
        };
        if a.is_none() && self.del_node(id) && !node.up {
            return self.leading_any(node.next);
        }
        a
    }

    fn subtract_from_any(&mut self, a: NodeID, s: &BitArray) {
        if let NodeKind::Any { set } = &mut self.nodes[a.index()].kind {
            set.and_not(s);
        }
    }

    fn find_any_sets(&mut self, p: Option<NodeID>, diag: &mut Diagnostics) {
        let mut p = p;
        while let Some(id) = p {
            let next = self.nodes[id.index()].next;
            match self.nodes[id.index()].kind {
                NodeKind::Opt { sub } | NodeKind::Iter { sub } => {
                    self.find_any_sets(Some(sub), diag);
                    if let Some(a) = self.leading_any(Some(sub)) {
                        let f = self.first(next, diag);
                        self.subtract_from_any(a, &f);
                    }
                }
                NodeKind::Alt { .. } => {
                    let mut s1 = BitArray::new(self.terminals.len());
                    let mut q = Some(id);
                    while let Some(qid) = q {
                        let (sub, down) = match self.nodes[qid.index()].kind {
                            NodeKind::Alt { sub, down } => (sub, down),
                            _ => break,
                        };
                        self.find_any_sets(Some(sub), diag);
                        match self.leading_any(Some(sub)) {
                            Some(a) => {
                                let mut f = self.first(down, diag);
                                f.or(&s1);
                                self.subtract_from_any(a, &f);
                            }
                            None => {
                                let f = self.first(Some(sub), diag);
                                s1.or(&f);
                            }
                        }
                        q = down;
                    }
                }
                _ => (),
            }

            // Terminals that may start a deletable construct must not be
            // matched by an ANY right after it, e.g. `[a] ANY`, `{a|b} ANY`,
            // `[a][b] ANY`, `(a|) ANY` or `A = [a]. ... A ANY`.
            if self.del_node(id) {
                if let Some(a) = self.leading_any(next) {
                    let q = match self.nodes[id.index()].kind {
                        NodeKind::Nt(sym) => self.symbols[sym.index()].graph,
                        _ => self.nodes[id.index()].sub(),
                    };
                    let f = self.first(q, diag);
                    self.subtract_from_any(a, &f);
                }
            }

            if self.nodes[id.index()].up {
                break;
            }
            p = next;
        }
    }

    pub fn comp_any_sets(&mut self, diag: &mut Diagnostics) {
        for i in 0..self.nonterminals.len() {
            let graph = self.symbols[self.nonterminals[i].index()].graph;
            self.find_any_sets(graph, diag);
        }
    }

    /// Let every ANY node match all terminals except end-of-input.
    pub fn setup_anys(&mut self) {
        let size = self.terminals.len();
        let eof = self.symbols[self.eof_sy.index()].n;
        for node in &mut self.nodes {
            if let NodeKind::Any { set } = &mut node.kind {
                *set = BitArray::with_value(size, true);
                set.set(eof, false);
            }
        }
    }

    // ==== expected sets ====

    /// The terminals expected at `p` inside the production of `cur_sy`.
    pub fn expected(&self, p: Option<NodeID>, cur_sy: SymbolID, diag: &mut Diagnostics) -> BitArray {
        let mut s = self.first(p, diag);
        if self.del_graph(p) {
            s.or(&self.symbols[cur_sy.index()].follow);
        }
        s
    }

    /// Like `expected`, but does not look behind a resolver.
    pub fn expected0(&self, p: Option<NodeID>, cur_sy: SymbolID, diag: &mut Diagnostics) -> BitArray {
        match p.map(|p| &self.nodes[p.index()].kind) {
            Some(NodeKind::Rslv) => BitArray::new(self.terminals.len()),
            _ => self.expected(p, cur_sy, diag),
        }
    }

    // ==== sync sets ====

    fn comp_sync(
        &mut self,
        p: Option<NodeID>,
        cur_sy: SymbolID,
        visited: &mut BitArray,
        diag: &mut Diagnostics,
    ) {
        let mut p = p;
        while let Some(id) = p {
            if visited.get(id.index()) {
                break;
            }
            visited.set(id.index(), true);

            let next = self.nodes[id.index()].next;
            match self.nodes[id.index()].kind {
                NodeKind::Sync { .. } => {
                    let mut s = self.expected(next, cur_sy, diag);
                    s.set(self.symbols[self.eof_sy.index()].n, true);
                    self.all_sync_sets.or(&s);
                    self.nodes[id.index()].kind = NodeKind::Sync { set: s };
                }
                NodeKind::Alt { sub, down } => {
                    self.comp_sync(Some(sub), cur_sy, visited, diag);
                    self.comp_sync(down, cur_sy, visited, diag);
                }
                NodeKind::Opt { sub } | NodeKind::Iter { sub } => {
                    self.comp_sync(Some(sub), cur_sy, visited, diag);
                }
                _ => (),
            }
            p = next;
        }
    }

    pub fn comp_sync_sets(&mut self, diag: &mut Diagnostics) {
        self.all_sync_sets = BitArray::new(self.terminals.len());
        let eof = self.symbols[self.eof_sy.index()].n;
        self.all_sync_sets.set(eof, true);
        for i in 0..self.nonterminals.len() {
            let id = self.nonterminals[i];
            let mut visited = BitArray::new(self.nodes.len());
            self.comp_sync(self.symbols[id.index()].graph, id, &mut visited, diag);
        }
    }

    // ==== listings ====

    fn display_first_follow_sets(&self) -> impl std::fmt::Display + '_ {
        display_fn(move |f| {
            writeln!(f)?;
            writeln!(f, "First & follow symbols:")?;
            writeln!(f, "----------------------")?;
            writeln!(f)?;
            for sym in self.nonterminals() {
                writeln!(f, "{}", sym.name)?;
                write!(f, "first:   {}", self.display_set(&sym.first, 10))?;
                write!(f, "follow:  {}", self.display_set(&sym.follow, 10))?;
                writeln!(f)?;
            }
            Ok(())
        })
    }

    fn display_any_sync_sets(&self) -> impl std::fmt::Display + '_ {
        display_fn(move |f| {
            writeln!(f)?;
            writeln!(f, "ANY and SYNC sets:")?;
            writeln!(f, "-----------------")?;
            for node in &self.nodes {
                if let NodeKind::Any { set } | NodeKind::Sync { set } = &node.kind {
                    write!(
                        f,
                        "{:4} {:>4} {}",
                        node.n.index(),
                        node.kind.short_name(),
                        self.display_set(set, 11)
                    )?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bitarray::BitArray,
        config::{Config, TraceOptions},
        diag::{DiagnosticKind, Diagnostics},
        grammar::NodeKind,
        syntax::parse,
        tab::Tab,
    };

    fn analyzed(source: &str, config: Config) -> (Tab, Diagnostics) {
        let mut diag = Diagnostics::new();
        let mut tab = parse(source, config, &mut diag).unwrap();
        assert!(!diag.has_errors(), "{:?}", diag.reports());
        tab.comp_symbol_sets(&mut diag);
        (tab, diag)
    }

    fn names(tab: &Tab, s: &BitArray) -> Vec<String> {
        tab.terminals()
            .filter(|sym| s.get(sym.n))
            .map(|sym| sym.name.clone())
            .collect()
    }

    #[test]
    fn first_follow_and_deletable() {
        let (tab, diag) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = A "c" .
  A = "a" B .
  B = [ "b" ] .
END S.
"#,
            Config::default(),
        );
        let s = tab.symbol(tab.find_sym("S").unwrap());
        let a = tab.symbol(tab.find_sym("A").unwrap());
        let b = tab.symbol(tab.find_sym("B").unwrap());

        assert_eq!(names(&tab, &s.first), ["\"a\""]);
        assert_eq!(names(&tab, &b.first), ["\"b\""]);
        assert_eq!(names(&tab, &s.follow), ["EOF"]);
        assert_eq!(names(&tab, &a.follow), ["\"c\""]);
        // B ends the production of A
        assert_eq!(names(&tab, &b.follow), ["\"c\""]);

        assert!(!s.deletable && !a.deletable && b.deletable);
        let notes: Vec<_> = diag
            .reports()
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::Deletable(..)))
            .map(|d| d.kind.to_string())
            .collect();
        assert_eq!(notes, ["B is deletable"]);
    }

    #[test]
    fn deletability_propagates_through_nonterminals() {
        let (tab, _) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = A B "x" .
  A = { "a" } .
  B = A | (. sem .) .
END S.
"#,
            Config::default(),
        );
        let a = tab.symbol(tab.find_sym("A").unwrap());
        let b = tab.symbol(tab.find_sym("B").unwrap());
        assert!(a.deletable && b.deletable);
        assert!(!tab.symbol(tab.find_sym("S").unwrap()).deletable);
        assert_eq!(
            names(&tab, &tab.symbol(tab.find_sym("S").unwrap()).first),
            ["\"x\"", "\"a\""]
        );
    }

    #[test]
    fn deletability_reaches_earlier_declarations() {
        let (tab, diag) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = A "x" .
  A = B .
  B = [ "y" ] .
END S.
"#,
            Config::default(),
        );
        assert!(tab.symbol(tab.find_sym("A").unwrap()).deletable);
        assert!(tab.symbol(tab.find_sym("B").unwrap()).deletable);
        assert!(!tab.symbol(tab.find_sym("S").unwrap()).deletable);
        assert_eq!(
            names(&tab, &tab.symbol(tab.find_sym("S").unwrap()).first),
            ["\"x\"", "\"y\""]
        );
        let deletable: Vec<_> = diag
            .reports()
            .iter()
            .filter_map(|d| match &d.kind {
                DiagnosticKind::Deletable(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deletable, ["A", "B"]);
    }

    #[test]
    fn follow_flows_through_recursion() {
        let (tab, _) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = A "x" .
  A = B .
  B = A "y" | "z" .
END S.
"#,
            Config::default(),
        );
        let a = tab.symbol(tab.find_sym("A").unwrap());
        let b = tab.symbol(tab.find_sym("B").unwrap());
        assert_eq!(names(&tab, &a.follow), ["\"x\"", "\"y\""]);
        assert_eq!(names(&tab, &b.follow), ["\"x\"", "\"y\""]);
        assert_eq!(names(&tab, &a.first), ["\"z\""]);
    }

    #[test]
    fn follow_of_mutually_recursive_start_symbol() {
        let (tab, _) = analyzed(
            r#"
COMPILER A
PRODUCTIONS
  A = B "x" .
  B = A | "y" .
END A.
"#,
            Config::default(),
        );
        let a = tab.symbol(tab.find_sym("A").unwrap());
        let b = tab.symbol(tab.find_sym("B").unwrap());
        assert_eq!(names(&tab, &b.follow), ["\"x\""]);
        // B derives A at its end, so FOLLOW(B) flows into FOLLOW(A)
        assert_eq!(names(&tab, &a.follow), ["EOF", "\"x\""]);
    }

    #[test]
    fn any_excludes_terminals_of_preceding_option() {
        let (tab, _) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = [ "a" ] ANY "b" .
END S.
"#,
            Config::default(),
        );
        let set = tab
            .nodes()
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Any { set } => Some(set),
                _ => None,
            })
            .unwrap();
        assert_eq!(names(&tab, set), ["\"b\"", "???"]);
    }

    #[test]
    fn any_excludes_other_alternatives() {
        let (tab, _) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = "a" | ANY | "b" .
END S.
"#,
            Config::default(),
        );
        let set = tab
            .nodes()
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Any { set } => Some(set),
                _ => None,
            })
            .unwrap();
        assert_eq!(names(&tab, set), ["???"]);
    }

    #[test]
    fn sync_sets_contain_end_of_input() {
        let (tab, _) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = "a" SYNC "b" .
END S.
"#,
            Config::default(),
        );
        let set = tab
            .nodes()
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Sync { set } => Some(set),
                _ => None,
            })
            .unwrap();
        assert_eq!(names(&tab, set), ["EOF", "\"b\""]);
        assert_eq!(names(&tab, tab.all_sync_sets()), ["EOF", "\"b\""]);
    }

    #[test]
    fn expected_stops_at_resolver() {
        let (tab, mut diag) = analyzed(
            r#"
COMPILER S
PRODUCTIONS
  S = IF(cond()) "a" | "b" .
END S.
"#,
            Config::default(),
        );
        let s = tab.find_sym("S").unwrap();
        let alt = tab.node(tab.symbol(s).graph.unwrap());
        let rslv = alt.sub();
        assert!(matches!(tab.node(rslv.unwrap()).kind, NodeKind::Rslv));
        assert_eq!(names(&tab, &tab.expected(rslv, s, &mut diag)), ["\"a\""]);
        assert!(tab.expected0(rslv, s, &mut diag).none());
        // the end of the production is followed by the end of input
        assert_eq!(names(&tab, &tab.expected(None, s, &mut diag)), ["EOF"]);
    }

    #[test]
    fn set_listings() {
        let source = r#"
COMPILER S
PRODUCTIONS
  S = "a" { ANY } SYNC "b" .
END S.
"#;
        let (_, diag) = analyzed(source, Config::new().trace(TraceOptions::parse("FJI")));
        let out = diag.trace_output();
        assert!(out.contains("First & follow symbols:"));
        assert!(out.contains("S\nfirst:   \"a\" \nfollow:  EOF \n"));
        assert!(out.contains("ANY and SYNC sets:"));
        assert!(out.contains("\nFirst: node = "));

        let (_, diag) = analyzed(source, Config::default());
        assert!(diag.trace_output().is_empty());
    }
}
