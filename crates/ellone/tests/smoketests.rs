use ellone::{
    config::{Config, TraceOptions},
    diag::{DiagnosticKind, Diagnostics, LL1Conflict, LL1Warning},
    grammar::NodeKind,
    Tab,
};
use std::{env, fs, path::PathBuf};

fn load(name: &str, config: Config) -> (Tab, Diagnostics, bool) {
    let path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("tests")
        .join(name)
        .with_extension("atg");
    let source = fs::read_to_string(&path).unwrap();
    let mut diag = Diagnostics::new();
    let mut tab = ellone::parse(&source, config, &mut diag).unwrap();
    let ok = tab.analyze(&mut diag);
    (tab, diag, ok)
}

fn terminal_names(tab: &Tab, set: &ellone::bitarray::BitArray) -> Vec<String> {
    tab.terminals()
        .filter(|sym| set.get(sym.n))
        .map(|sym| sym.name.clone())
        .collect()
}

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let (_tab, diag, ok) = load(stringify!($name), Config::default());
            assert!(ok, "{:?}", diag.reports());
            assert_eq!(diag.error_count(), 0);
        }
    )*};
}

define_tests! {
    expr,
    json,
    block,
    taste,
}

#[test]
fn expr_sets() {
    let (tab, diag, _) = load("expr", Config::default());
    assert_eq!(diag.warning_count(), 0);

    let expr = tab.symbol(tab.find_sym("Expr").unwrap());
    assert_eq!(
        terminal_names(&tab, &expr.first),
        ["number", "ident", "\"-\"", "\"(\""]
    );
    assert_eq!(terminal_names(&tab, &expr.follow), ["EOF", "\",\"", "\")\""]);

    let term = tab.symbol(tab.find_sym("Term").unwrap());
    assert_eq!(
        terminal_names(&tab, &term.follow),
        ["EOF", "\"+\"", "\"-\"", "\",\"", "\")\""]
    );

    // the pragma is numbered after every terminal
    let option = tab.pragmas().next().unwrap();
    assert_eq!(option.name, "option");
    assert_eq!(option.n, tab.num_terminals());
    assert!(option.sem_pos.is_some());
}

#[test]
fn block_recovery_sets() {
    let (tab, diag, ok) = load("block", Config::default());
    assert!(ok);
    assert_eq!(diag.warning_count(), 0);

    let sync = tab
        .nodes()
        .iter()
        .find_map(|node| match &node.kind {
            NodeKind::Sync { set } => Some(set),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        terminal_names(&tab, sync),
        ["EOF", "ident", "\"{\"", "\";\"", "\"asm\""]
    );
    assert_eq!(terminal_names(&tab, tab.all_sync_sets()), terminal_names(&tab, sync));

    let any = tab
        .nodes()
        .iter()
        .find_map(|node| match &node.kind {
            NodeKind::Any { set } => Some(set),
            _ => None,
        })
        .unwrap();
    let any = terminal_names(&tab, any);
    assert!(!any.iter().any(|name| name == "\";\"" || name == "EOF"));
    assert!(any.iter().any(|name| name == "\"asm\""));

    assert!(tab
        .nodes()
        .iter()
        .any(|node| matches!(node.kind, NodeKind::Wt(sym) if tab.symbol(sym).name == "\",\"")));
}

#[test]
fn taste_dangling_else() {
    let (_, diag, ok) = load("taste", Config::default());
    assert!(ok);
    let warnings: Vec<_> = diag.warnings().map(|d| d.kind.clone()).collect();
    assert_eq!(
        warnings,
        [DiagnosticKind::LL1(LL1Warning {
            nonterminal: "Stat".into(),
            symbol: Some("\"else\"".into()),
            conflict: LL1Conflict::StartAndSuccessorOfDeletable,
        })]
    );
    assert_eq!(
        diag.warnings().next().unwrap().to_string(),
        "  LL1 warning in Stat: \"else\" is start & successor of deletable structure"
    );
}

#[test]
fn json_literals() {
    let (tab, _, _) = load("json", Config::default());
    for spelling in ["\"true\"", "\"false\"", "\"null\"", "\"{\"", "\":\""] {
        assert!(tab.find_sym(spelling).is_some(), "{}", spelling);
    }
    let string = tab.symbol(tab.find_sym("string").unwrap());
    assert_eq!(string.token_kind.to_string(), "classToken");
    assert!(tab.find_char_class_by_name("plain").is_some());
}

#[test]
fn trace_listings() {
    let config = Config::new().trace(TraceOptions::parse("AFGJSXP"));
    let (_, diag, ok) = load("block", config);
    assert!(ok);
    let out = diag.trace_output();
    for heading in [
        "Graph nodes:",
        "First & follow symbols:",
        "ANY and SYNC sets:",
        "Cross reference list:",
        "Statistics:",
        "Symbol Table:",
        "Literal Tokens:",
    ] {
        assert!(out.contains(heading), "missing {:?}", heading);
    }
    assert!(out.contains("letter    : "));
    // the graph listing comes first, the symbol table last
    assert!(out.find("Graph nodes:") < out.find("Cross reference list:"));
    assert!(out.find("Statistics:") < out.find("Symbol Table:"));
}

#[test]
fn rejected_grammar() {
    let source = r#"
COMPILER S
PRODUCTIONS
  S = A | "s" .
  A = B .
  B = A | "b" .
  U = "u" .
END S.
"#;
    let mut diag = Diagnostics::new();
    let mut tab = ellone::parse(source, Config::default(), &mut diag).unwrap();
    assert!(!tab.analyze(&mut diag));
    let errors: Vec<_> = diag.errors().map(|d| d.kind.to_string()).collect();
    assert_eq!(errors, ["U cannot be reached"]);
}

#[test]
fn syntax_error_skips_analysis() {
    let mut diag = Diagnostics::new();
    let err = ellone::parse("COMPILER S PRODUCTIONS S = \"a\" END S.", Config::default(), &mut diag)
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "-- line 1 col 32: \".\" expected");
}
