//! Listings written to the trace output.

use super::Tab;
use crate::{
    bitarray::BitArray,
    diag::Diagnostics,
    grammar::{NodeID, NodeKind, Position, Symbol, SymbolID, SymbolKind, TransCode},
    types::Map,
    util::display_fn,
};
use std::fmt;

const LINE_WIDTH: usize = 80;

impl Tab {
    /// The names of the terminals in `s`, wrapped before column 80.
    pub fn display_set<'a>(&'a self, s: &'a BitArray, indent: usize) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            let mut col = indent;
            for sym in self.terminals() {
                if sym.n >= s.len() || !s.get(sym.n) {
                    continue;
                }
                let len = sym.name.chars().count();
                if col + len >= LINE_WIDTH {
                    writeln!(f)?;
                    write!(f, "{:1$}", "", indent.saturating_sub(1))?;
                    col = indent;
                }
                write!(f, "{} ", sym.name)?;
                col += len + 1;
            }
            if col == indent {
                f.write_str("-- empty set --")?;
            }
            writeln!(f)
        })
    }

    pub fn print_symbol_table(&self, diag: &mut Diagnostics) {
        diag.trace(display_fn(|f| {
            writeln!(f, "Symbol Table:")?;
            writeln!(f, "------------")?;
            writeln!(f)?;
            writeln!(f, " nr name          typ  hasAt graph  del    line tokenKind")?;
            for sym in self.terminals().chain(self.pragmas()).chain(self.nonterminals()) {
                write_symbol(f, sym)?;
            }

            writeln!(f)?;
            writeln!(f, "Literal Tokens:")?;
            writeln!(f, "--------------")?;
            for (spelling, &sym) in &self.literals {
                writeln!(
                    f,
                    "{}{} =  {}.",
                    self.config.token_prefix,
                    self.symbols[sym.index()].name,
                    spelling
                )?;
            }
            writeln!(f)
        }));
    }

    pub fn print_nodes(&self, diag: &mut Diagnostics) {
        diag.trace(display_fn(|f| {
            writeln!(f, "Graph nodes:")?;
            writeln!(f, "----------------------------------------------------")?;
            writeln!(f, "   n type name          next  down   sub   pos  line")?;
            writeln!(f, "                               val  code")?;
            writeln!(f, "----------------------------------------------------")?;

            for node in &self.nodes {
                write!(f, "{:4} {} ", node.n.index(), node.kind.short_name())?;
                match &node.kind {
                    NodeKind::Clas { class, .. } => {
                        write!(f, "{:<12.12} ", self.classes[class.index()].name)?
                    }
                    kind => match kind.symbol() {
                        Some(sym) => write!(f, "{:<12.12} ", self.symbols[sym.index()].name)?,
                        None => write!(f, "{:13}", "")?,
                    },
                }
                write!(f, "{:5} ", ptr(node.next, node.up))?;

                match &node.kind {
                    NodeKind::T(..) | NodeKind::Nt(..) | NodeKind::Wt(..) | NodeKind::Sem => {
                        write!(f, "{:13}{}", "", DisplayPos(node.pos))?
                    }
                    NodeKind::Chr { ch, code } => {
                        write!(f, "{:5} {:5}       ", ch, code_num(*code))?
                    }
                    NodeKind::Clas { code, .. } => write!(f, "{:6}{:5}       ", "", code_num(*code))?,
                    NodeKind::Alt { sub, down } => {
                        write!(f, "{:5} {:5}       ", ptr(*down, false), ptr(Some(*sub), false))?
                    }
                    NodeKind::Iter { sub } | NodeKind::Opt { sub } => {
                        write!(f, "{:5} {:5}       ", 0, ptr(Some(*sub), false))?
                    }
                    NodeKind::Eps | NodeKind::Any { .. } | NodeKind::Sync { .. } => {
                        write!(f, "{:18}", "")?
                    }
                    NodeKind::Pr(..) | NodeKind::Rslv => (),
                }
                writeln!(f, "{:5}", node.line)?;
            }
            writeln!(f)
        }));
    }

    pub fn write_char_classes(&self, diag: &mut Diagnostics) {
        diag.trace(display_fn(|f| {
            for class in &self.classes {
                writeln!(f, "{:<10.10}: {}", class.name, class.set)?;
            }
            writeln!(f)
        }));
    }

    /// List every terminal and nonterminal with the lines it is declared
    /// (negative) and used on, sorted by name.
    pub fn xref(&self, diag: &mut Diagnostics) {
        let mut xref: Map<SymbolID, Vec<isize>> = Map::default();
        for sym in self.nonterminals() {
            xref.entry(sym.id).or_default().push(-(sym.line as isize));
        }
        for node in &self.nodes {
            if let NodeKind::T(sym) | NodeKind::Wt(sym) | NodeKind::Nt(sym) = node.kind {
                xref.entry(sym).or_default().push(node.line as isize);
            }
        }
        xref.sort_by(|a, _, b, _| self.symbols[a.index()].name.cmp(&self.symbols[b.index()].name));

        diag.trace(display_fn(|f| {
            writeln!(f)?;
            writeln!(f, "Cross reference list:")?;
            writeln!(f, "--------------------")?;
            writeln!(f)?;
            for (sym, lines) in &xref {
                write!(f, "  {:<12.12}", self.symbols[sym.index()].name)?;
                let mut col = 14;
                for line in lines {
                    if col + 5 > LINE_WIDTH {
                        writeln!(f)?;
                        write!(f, "{:14}", "")?;
                        col = 14;
                    }
                    write!(f, "{:5}", line)?;
                    col += 5;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
            writeln!(f)
        }));
    }

    pub fn print_statistics(&self, diag: &mut Diagnostics) {
        diag.trace(display_fn(|f| {
            writeln!(f)?;
            writeln!(f, "Statistics:")?;
            writeln!(f, "-----------")?;
            writeln!(f)?;
            writeln!(f, "{} terminals", self.terminals.len())?;
            writeln!(
                f,
                "{} symbols",
                self.terminals.len() + self.pragmas.len() + self.nonterminals.len()
            )?;
            writeln!(f, "{} nodes", self.nodes.len())?;
            writeln!(f, "{} character classes", self.classes.len())
        }));
    }
}

fn write_symbol(f: &mut fmt::Formatter<'_>, sym: &Symbol) -> fmt::Result {
    write!(f, "{:3}   {:<12.12} {}", sym.n, sym.name, sym.kind.short_name())?;
    f.write_str(if sym.attr_pos.is_some() { " true  " } else { " false " })?;
    if sym.kind == SymbolKind::Nonterminal {
        write!(f, "{:5}", sym.graph.map_or(0, NodeID::index))?;
        f.write_str(if sym.deletable { " true  " } else { " false " })?;
    } else {
        write!(f, "{:12}", "")?;
    }
    writeln!(f, "{:5} {}", sym.line, sym.token_kind)
}

// Node number as printed in graph listings: 0 for none, negated when the
// link leaves the enclosing substructure.
fn ptr(p: Option<NodeID>, up: bool) -> isize {
    match p {
        None => 0,
        Some(p) if up => -(p.index() as isize),
        Some(p) => p.index() as isize,
    }
}

fn code_num(code: TransCode) -> u8 {
    match code {
        TransCode::Normal => 0,
        TransCode::Context => 1,
    }
}

struct DisplayPos(Option<Position>);

impl fmt::Display for DisplayPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pos) => write!(f, "{:5}", pos.beg),
            None => write!(f, "{:5}", ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, grammar::Graph};

    fn tab_with_terminals(names: &[&str]) -> (Tab, Vec<SymbolID>) {
        let mut tab = Tab::new(Config::default());
        let mut diag = Diagnostics::new();
        let ids = names
            .iter()
            .map(|name| tab.new_sym(SymbolKind::Terminal, name, 1, &mut diag))
            .collect();
        (tab, ids)
    }

    #[test]
    fn empty_set() {
        let (tab, _) = tab_with_terminals(&["a"]);
        let s = BitArray::new(tab.num_terminals());
        assert_eq!(tab.display_set(&s, 10).to_string(), "-- empty set --\n");
    }

    #[test]
    fn set_wraps_long_lines() {
        let names: Vec<String> = (0..10).map(|i| format!("terminal{:02}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let (tab, _) = tab_with_terminals(&names);
        let s = BitArray::with_value(tab.num_terminals(), true);
        let text = tab.display_set(&s, 10).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() < LINE_WIDTH));
        assert!(lines[0].starts_with("EOF terminal00 "));
        assert!(lines[1].starts_with("         terminal"));
    }

    #[test]
    fn symbol_table_rows() {
        let (mut tab, ids) = tab_with_terminals(&["ident"]);
        let mut diag = Diagnostics::new();
        tab.add_literal("\"+\"", ids[0]);
        let s = tab.new_sym(SymbolKind::Nonterminal, "Expr", 3, &mut diag);
        let g = Graph::new(tab.new_node(NodeKind::T(ids[0]), 3));
        tab.finish(&g);
        tab.symbol_mut(s).graph = Some(g.l);
        tab.print_symbol_table(&mut diag);

        let out = diag.trace_output();
        assert!(out.starts_with("Symbol Table:\n------------\n\n"));
        assert!(out.contains(concat!(
            "  1", "   ", "ident       ", " ", "t   ", " false ", "            ", "    1",
            " fixedToken\n"
        )));
        assert!(out.contains(concat!(
            "  0", "   ", "Expr        ", " ", "nt  ", " false ", "    1", " false ", "    3",
            " fixedToken\n"
        )));
        assert!(out.contains("_ident =  \"+\".\n"));
    }

    #[test]
    fn cross_reference_is_sorted_by_name() {
        let (mut tab, ids) = tab_with_terminals(&["zed"]);
        let mut diag = Diagnostics::new();
        let a = tab.new_sym(SymbolKind::Nonterminal, "Alpha", 2, &mut diag);
        tab.new_node(NodeKind::T(ids[0]), 4);
        tab.new_node(NodeKind::Nt(a), 5);
        tab.xref(&mut diag);

        let out = diag.trace_output();
        let alpha = out.find("Alpha").unwrap();
        let zed = out.find("zed").unwrap();
        assert!(alpha < zed);
        assert!(out.contains(concat!("  ", "Alpha       ", "   -2", "    5", "\n")));
        assert!(out.contains(concat!("  ", "zed         ", "    4", "\n")));
    }

    #[test]
    fn node_listing_marks_up_links() {
        // ["a"] "b"
        let (mut tab, ids) = tab_with_terminals(&["a", "b"]);
        let mut diag = Diagnostics::new();
        let mut g = Graph::new(tab.new_node(NodeKind::T(ids[0]), 1));
        let body = g.l;
        tab.make_option(&mut g);
        let b = Graph::new(tab.new_node(NodeKind::T(ids[1]), 1));
        tab.make_sequence(&mut g, b);
        tab.finish(&g);
        tab.print_nodes(&mut diag);

        let out = diag.trace_output();
        let row = out
            .lines()
            .find(|line| line.starts_with(&format!("{:4} t    a", body.index())))
            .unwrap();
        assert!(row.contains(&format!("{:5}", -(b.l.index() as isize))));
    }
}
