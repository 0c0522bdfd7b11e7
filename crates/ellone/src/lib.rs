//! LL(1) grammar analysis.
//!
//! A grammar is held in a [`Tab`](tab::Tab): a symbol table plus a syntax
//! graph per nonterminal. The analysis computes deletability, FIRST, FOLLOW,
//! ANY and SYNC sets and checks the grammar for well-formedness, LL(1)
//! conflicts and misplaced resolvers. Findings go to a
//! [`Diagnostics`](diag::Diagnostics) sink.

pub mod bitarray;
pub mod charset;
pub mod config;
pub mod diag;
pub mod grammar;
pub mod syntax;
pub mod tab;
pub mod types;
pub mod util;

pub use crate::{config::Config, diag::Diagnostics, syntax::parse, tab::Tab};
