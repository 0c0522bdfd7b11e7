//! Well-formedness, LL(1) and resolver checks.

use super::Tab;
use crate::{
    bitarray::BitArray,
    diag::{DiagnosticKind, Diagnostics, LL1Conflict, LL1Warning},
    grammar::{NodeID, NodeKind, SymbolID},
    types::Set,
};

impl Tab {
    /// Check that the grammar can be used for generating a parser.
    ///
    /// The structural checks stop at the first one that fails. Resolver
    /// placement and LL(1) conflicts are only examined for a structurally
    /// sound grammar.
    pub fn grammar_ok(&self, diag: &mut Diagnostics) -> bool {
        let span = tracing::debug_span!("grammar_ok");
        let _entered = span.enter();

        let ok = self.nts_complete(diag)
            && self.all_nt_reached(diag)
            && self.no_circular_productions(diag)
            && self.all_nt_to_term(diag);
        if !ok {
            return false;
        }
        let errors = diag.error_count();
        self.check_resolvers(diag);
        self.check_ll1(diag);
        diag.error_count() == errors
    }

    // ==== completeness ====

    pub fn nts_complete(&self, diag: &mut Diagnostics) -> bool {
        let mut complete = true;
        for sym in self.nonterminals() {
            if sym.graph.is_none() {
                complete = false;
                diag.error(DiagnosticKind::NoProduction(sym.name.clone()), None);
            }
        }
        complete
    }

    // ==== reachability ====

    fn mark_reached_nts(&self, p: Option<NodeID>, visited: &mut BitArray) {
        let mut p = p;
        while let Some(id) = p {
            let node = &self.nodes[id.index()];
            match node.kind {
                NodeKind::Nt(sym) => {
                    let sym = &self.symbols[sym.index()];
                    if !visited.get(sym.n) {
                        visited.set(sym.n, true);
                        self.mark_reached_nts(sym.graph, visited);
                    }
                }
                NodeKind::Alt { sub, down } => {
                    self.mark_reached_nts(Some(sub), visited);
                    self.mark_reached_nts(down, visited);
                }
                NodeKind::Iter { sub } | NodeKind::Opt { sub } => {
                    self.mark_reached_nts(Some(sub), visited);
                }
                _ => (),
            }
            if node.up {
                break;
            }
            p = node.next;
        }
    }

    pub fn all_nt_reached(&self, diag: &mut Diagnostics) -> bool {
        let mut visited = BitArray::new(self.nonterminals.len());
        if let Some(gram_sy) = self.gram_sy {
            let sym = &self.symbols[gram_sy.index()];
            visited.set(sym.n, true);
            self.mark_reached_nts(sym.graph, &mut visited);
        }
        let mut ok = true;
        for sym in self.nonterminals() {
            if !visited.get(sym.n) {
                ok = false;
                diag.error(DiagnosticKind::Unreachable(sym.name.clone()), None);
            }
        }
        ok
    }

    // ==== circular productions ====

    /// Collect the nonterminals `s` such that the graph at `p` derives `s`
    /// with everything around it deletable.
    fn get_singles(&self, p: Option<NodeID>, singles: &mut Vec<SymbolID>) {
        let Some(id) = p else { return };
        let node = &self.nodes[id.index()];
        match node.kind {
            NodeKind::Nt(sym) => {
                if node.up || self.del_graph(node.next) {
                    singles.push(sym);
                }
            }
            NodeKind::Alt { sub, down } => {
                if node.up || self.del_graph(node.next) {
                    self.get_singles(Some(sub), singles);
                    self.get_singles(down, singles);
                }
            }
            NodeKind::Iter { sub } | NodeKind::Opt { sub } => {
                if node.up || self.del_graph(node.next) {
                    self.get_singles(Some(sub), singles);
                }
            }
            _ => (),
        }
        if !node.up && self.del_node(id) {
            self.get_singles(node.next, singles);
        }
    }

    pub fn no_circular_productions(&self, diag: &mut Diagnostics) -> bool {
        let mut pairs: Set<(SymbolID, SymbolID)> = Set::default();
        for sym in self.nonterminals() {
            let mut singles = vec![];
            self.get_singles(sym.graph, &mut singles);
            pairs.extend(singles.into_iter().map(|s| (sym.id, s)));
        }

        // Drop every pair that is not part of a cycle until nothing changes.
        loop {
            let before = pairs.len();
            let snapshot: Vec<_> = pairs.iter().copied().collect();
            pairs.retain(|&(left, right)| {
                let on_right_side = snapshot.iter().any(|&(_, r)| r == left);
                let on_left_side = snapshot.iter().any(|&(l, _)| l == right);
                on_left_side && on_right_side
            });
            if pairs.len() == before {
                break;
            }
        }

        for &(left, right) in &pairs {
            diag.error(
                DiagnosticKind::CircularProduction(
                    self.symbols[left.index()].name.clone(),
                    self.symbols[right.index()].name.clone(),
                ),
                None,
            );
        }
        pairs.is_empty()
    }

    // ==== derivability ====

    fn is_term(&self, p: Option<NodeID>, mark: &BitArray) -> bool {
        let mut p = p;
        while let Some(id) = p {
            let node = &self.nodes[id.index()];
            match node.kind {
                NodeKind::Nt(sym) if !mark.get(self.symbols[sym.index()].n) => return false,
                NodeKind::Alt { sub, down }
                    if !self.is_term(Some(sub), mark)
                        && (down.is_none() || !self.is_term(down, mark)) =>
                {
                    return false
                }
                _ => (),
            }
            if node.up {
                break;
            }
            p = node.next;
        }
        true
    }

    pub fn all_nt_to_term(&self, diag: &mut Diagnostics) -> bool {
        // a nonterminal is marked once it is known to derive terminals
        let mut mark = BitArray::new(self.nonterminals.len());
        loop {
            let mut changed = false;
            for sym in self.nonterminals() {
                if !mark.get(sym.n) && self.is_term(sym.graph, &mark) {
                    mark.set(sym.n, true);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut ok = true;
        for sym in self.nonterminals() {
            if !mark.get(sym.n) {
                ok = false;
                diag.error(DiagnosticKind::Underivable(sym.name.clone()), None);
            }
        }
        ok
    }

    // ==== LL(1) conflicts ====

    fn ll1_error(
        &self,
        conflict: LL1Conflict,
        cur_sy: SymbolID,
        sym: Option<SymbolID>,
        diag: &mut Diagnostics,
    ) {
        diag.warning(
            DiagnosticKind::LL1(LL1Warning {
                nonterminal: self.symbols[cur_sy.index()].name.clone(),
                symbol: sym.map(|sym| self.symbols[sym.index()].name.clone()),
                conflict,
            }),
            None,
        );
    }

    fn check_overlap(
        &self,
        s1: &BitArray,
        s2: &BitArray,
        conflict: LL1Conflict,
        cur_sy: SymbolID,
        diag: &mut Diagnostics,
    ) {
        for &t in &self.terminals {
            let n = self.symbols[t.index()].n;
            if s1.get(n) && s2.get(n) {
                self.ll1_error(conflict, cur_sy, Some(t), diag);
            }
        }
    }

    fn check_alts(&self, p: Option<NodeID>, cur_sy: SymbolID, diag: &mut Diagnostics) {
        let mut p = p;
        while let Some(id) = p {
            let node = &self.nodes[id.index()];
            match &node.kind {
                NodeKind::Alt { .. } => {
                    let mut s1 = BitArray::new(self.terminals.len());
                    for sub in self.alternatives(id) {
                        let s2 = self.expected0(Some(sub), cur_sy, diag);
                        self.check_overlap(
                            &s1,
                            &s2,
                            LL1Conflict::StartOfSeveralAlternatives,
                            cur_sy,
                            diag,
                        );
                        s1.or(&s2);
                        self.check_alts(Some(sub), cur_sy, diag);
                    }
                }
                NodeKind::Opt { sub } | NodeKind::Iter { sub } => {
                    if self.del_sub_graph(Some(*sub)) {
                        // e.g. [[...]]
                        self.ll1_error(
                            LL1Conflict::OptionalContentMustNotBeDeletable,
                            cur_sy,
                            None,
                            diag,
                        );
                    } else {
                        let s1 = self.expected0(Some(*sub), cur_sy, diag);
                        let s2 = self.expected(node.next, cur_sy, diag);
                        self.check_overlap(
                            &s1,
                            &s2,
                            LL1Conflict::StartAndSuccessorOfDeletable,
                            cur_sy,
                            diag,
                        );
                    }
                    self.check_alts(Some(*sub), cur_sy, diag);
                }
                NodeKind::Any { set } => {
                    // e.g. {ANY} ANY or [ANY] ANY or ( ANY | ANY )
                    if set.none() {
                        self.ll1_error(LL1Conflict::AnyNodeMatchesNoSymbol, cur_sy, None, diag);
                    }
                }
                _ => (),
            }
            if node.up {
                break;
            }
            p = node.next;
        }
    }

    pub fn check_ll1(&self, diag: &mut Diagnostics) {
        for &sym in &self.nonterminals {
            self.check_alts(self.symbols[sym.index()].graph, sym, diag);
        }
    }

    // ==== resolvers ====

    fn check_res(
        &self,
        p: Option<NodeID>,
        rslv_allowed: bool,
        cur_sy: SymbolID,
        diag: &mut Diagnostics,
    ) {
        let suppress = self.config.suppress_resolver_warnings;
        let mut p = p;
        let mut rslv_allowed = rslv_allowed;
        while let Some(id) = p {
            let node = &self.nodes[id.index()];
            match node.kind {
                NodeKind::Alt { .. } => {
                    let alts: Vec<NodeID> = self.alternatives(id).collect();

                    let mut expected = BitArray::new(self.terminals.len());
                    for &sub in &alts {
                        expected.or(&self.expected0(Some(sub), cur_sy, diag));
                    }

                    let mut so_far = BitArray::new(self.terminals.len());
                    for &sub in &alts {
                        let sub_node = &self.nodes[sub.index()];
                        if let NodeKind::Rslv = sub_node.kind {
                            let fs = self.expected(sub_node.next, cur_sy, diag);
                            if fs.overlaps(&so_far) {
                                diag.warning(
                                    DiagnosticKind::ResolverNeverEvaluated,
                                    Some(sub_node.location()),
                                );
                            }
                            if !suppress && !fs.overlaps(&expected) {
                                diag.warning(
                                    DiagnosticKind::MisplacedResolverNoConflict,
                                    Some(sub_node.location()),
                                );
                            }
                        } else {
                            so_far.or(&self.expected(Some(sub), cur_sy, diag));
                        }
                        self.check_res(Some(sub), true, cur_sy, diag);
                    }
                }
                NodeKind::Iter { sub } | NodeKind::Opt { sub } => {
                    let sub_node = &self.nodes[sub.index()];
                    if let NodeKind::Rslv = sub_node.kind {
                        let fs = self.first(sub_node.next, diag);
                        let fs_next = self.expected(node.next, cur_sy, diag);
                        if !suppress && !fs.overlaps(&fs_next) {
                            diag.warning(
                                DiagnosticKind::MisplacedResolverNoConflict,
                                Some(sub_node.location()),
                            );
                        }
                    }
                    self.check_res(Some(sub), true, cur_sy, diag);
                }
                NodeKind::Rslv => {
                    if !rslv_allowed {
                        diag.error(
                            DiagnosticKind::MisplacedResolverNoAlternative,
                            Some(node.location()),
                        );
                    }
                }
                _ => (),
            }
            if node.up {
                break;
            }
            p = node.next;
            rslv_allowed = false;
        }
    }

    pub fn check_resolvers(&self, diag: &mut Diagnostics) {
        for &sym in &self.nonterminals {
            self.check_res(self.symbols[sym.index()].graph, false, sym, diag);
        }
    }

    /// The substructures of the alternation starting at `p`.
    fn alternatives(&self, p: NodeID) -> impl Iterator<Item = NodeID> + '_ {
        let mut q = Some(p);
        std::iter::from_fn(move || match self.nodes[q?.index()].kind {
            NodeKind::Alt { sub, down } => {
                q = down;
                Some(sub)
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::Config,
        diag::{DiagnosticKind, Diagnostics, LL1Conflict, LL1Warning, Severity},
        syntax::parse,
    };

    fn check(source: &str, config: Config) -> (bool, Diagnostics) {
        let mut diag = Diagnostics::new();
        let mut tab = parse(source, config, &mut diag).unwrap();
        assert!(!diag.has_errors(), "{:?}", diag.reports());
        tab.comp_symbol_sets(&mut diag);
        let ok = tab.grammar_ok(&mut diag);
        (ok, diag)
    }

    fn grammar(productions: &str) -> String {
        format!("COMPILER S\nPRODUCTIONS\n{}\nEND S.\n", productions)
    }

    fn errors(diag: &Diagnostics) -> Vec<String> {
        diag.errors().map(|d| d.kind.to_string()).collect()
    }

    fn warnings(diag: &Diagnostics) -> Vec<&DiagnosticKind> {
        diag.warnings().map(|d| &d.kind).collect()
    }

    fn ll1(symbol: Option<&str>, conflict: LL1Conflict) -> DiagnosticKind {
        DiagnosticKind::LL1(LL1Warning {
            nonterminal: "S".into(),
            symbol: symbol.map(Into::into),
            conflict,
        })
    }

    #[test]
    fn well_formed_grammar() {
        let (ok, diag) = check(
            &grammar(r#"S = A { "," A } . A = "a" | "(" S ")" ."#),
            Config::default(),
        );
        assert!(ok);
        assert_eq!(diag.error_count(), 0);
        assert!(warnings(&diag).is_empty());
    }

    #[test]
    fn missing_production() {
        let (ok, diag) = check(&grammar(r#"S = A "x" ."#), Config::default());
        assert!(!ok);
        assert_eq!(errors(&diag), ["No production for A"]);
    }

    #[test]
    fn unreachable_nonterminal() {
        let (ok, diag) = check(&grammar(r#"S = "a" . U = "b" ."#), Config::default());
        assert!(!ok);
        assert_eq!(errors(&diag), ["U cannot be reached"]);
    }

    #[test]
    fn circular_productions() {
        let (ok, diag) = check(&grammar(r#"S = A . A = B . B = A | "c" ."#), Config::default());
        assert!(!ok);
        assert_eq!(errors(&diag), ["A --> B", "B --> A"]);

        let (ok, diag) = check(&grammar(r#"S = A . A = B . B = "c" ."#), Config::default());
        assert!(ok);
        assert_eq!(diag.error_count(), 0);
    }

    #[test]
    fn mutual_recursion_without_terminals() {
        let source = "COMPILER A\nPRODUCTIONS\nA = B . B = A .\nEND A.\n";
        let (ok, diag) = check(source, Config::default());
        assert!(!ok);
        assert_eq!(errors(&diag), ["A --> B", "B --> A"]);
    }

    #[test]
    fn underivable_nonterminals() {
        let (ok, diag) = check(&grammar(r#"S = A . A = "a" A ."#), Config::default());
        assert!(!ok);
        assert_eq!(
            errors(&diag),
            ["S cannot be derived to terminals", "A cannot be derived to terminals"]
        );
    }

    #[test]
    fn structural_checks_stop_at_first_failure() {
        // U is unreachable and underivable; only the former is reported.
        let (ok, diag) = check(&grammar(r#"S = "a" . U = "b" U ."#), Config::default());
        assert!(!ok);
        assert_eq!(errors(&diag), ["U cannot be reached"]);
    }

    #[test]
    fn conflicting_alternatives() {
        let (ok, diag) = check(&grammar(r#"S = "a" | "a" "b" ."#), Config::default());
        assert!(ok);
        assert_eq!(
            warnings(&diag),
            [&ll1(Some("\"a\""), LL1Conflict::StartOfSeveralAlternatives)]
        );
        assert_eq!(
            diag.warnings().next().unwrap().kind.to_string(),
            "LL1 warning in S: \"a\" is start of several alternatives"
        );
    }

    #[test]
    fn deletable_structure_and_successor() {
        let (ok, diag) = check(&grammar(r#"S = [ "a" ] "a" ."#), Config::default());
        assert!(ok);
        assert_eq!(
            warnings(&diag),
            [&ll1(Some("\"a\""), LL1Conflict::StartAndSuccessorOfDeletable)]
        );
    }

    #[test]
    fn deletable_option_contents() {
        let (_, diag) = check(&grammar(r#"S = [ [ "a" ] ] "b" ."#), Config::default());
        assert!(warnings(&diag).contains(&&ll1(None, LL1Conflict::OptionalContentMustNotBeDeletable)));
    }

    #[test]
    fn follow_set_conflicts() {
        // the option inside A conflicts with what follows A in S
        let (ok, diag) = check(&grammar(r#"S = A "b" . A = "a" [ "b" ] ."#), Config::default());
        assert!(ok);
        assert_eq!(
            warnings(&diag),
            [&DiagnosticKind::LL1(LL1Warning {
                nonterminal: "A".into(),
                symbol: Some("\"b\"".into()),
                conflict: LL1Conflict::StartAndSuccessorOfDeletable,
            })]
        );
    }

    #[test]
    fn any_matching_nothing() {
        let (ok, diag) = check(&grammar(r#"S = "a" { ANY } ANY ."#), Config::default());
        assert!(ok);
        assert_eq!(
            warnings(&diag),
            [&ll1(None, LL1Conflict::AnyNodeMatchesNoSymbol)]
        );
        assert_eq!(
            diag.warnings().next().unwrap().kind.to_string(),
            "LL1 warning in S: an ANY node that matches no symbol"
        );
    }

    #[test]
    fn resolver_resolves_conflict() {
        let (ok, diag) = check(&grammar(r#"S = IF(x) "a" | "a" "b" ."#), Config::default());
        assert!(ok);
        assert!(warnings(&diag).is_empty());
    }

    #[test]
    fn resolver_without_conflict() {
        let source = grammar(r#"S = IF(x) "a" | "b" ."#);
        let (ok, diag) = check(&source, Config::default());
        assert!(ok);
        assert_eq!(warnings(&diag), [&DiagnosticKind::MisplacedResolverNoConflict]);
        let location = diag.warnings().next().unwrap().location.unwrap();
        assert_eq!(location.line, 3);

        let (ok, diag) = check(&source, Config::new().suppress_resolver_warnings(true));
        assert!(ok);
        assert!(warnings(&diag).is_empty());
    }

    #[test]
    fn resolver_in_option_without_conflict() {
        let (_, diag) = check(&grammar(r#"S = [ IF(x) "a" ] "b" ."#), Config::default());
        assert_eq!(warnings(&diag), [&DiagnosticKind::MisplacedResolverNoConflict]);
    }

    #[test]
    fn resolver_behind_conflicting_alternative() {
        let (ok, diag) = check(&grammar(r#"S = "a" | IF(x) "a" "b" ."#), Config::default());
        assert!(ok);
        assert_eq!(warnings(&diag), [&DiagnosticKind::ResolverNeverEvaluated]);
    }

    #[test]
    fn resolver_outside_alternative() {
        let (ok, diag) = check(&grammar(r#"S = IF(x) "a" ."#), Config::default());
        assert!(!ok);
        let reports: Vec<_> = diag
            .errors()
            .map(|d| (d.severity, d.kind.clone()))
            .collect();
        assert_eq!(
            reports,
            [(Severity::Error, DiagnosticKind::MisplacedResolverNoAlternative)]
        );
    }
}
