//! Lexer implementation.

use lexgen_util::Loc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Token<'input> {
    Eq,
    Dot,
    DotDot,
    Plus,
    Minus,
    VertBar,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Kw(Keyword),
    Ident(&'input str),
    /// A string literal, quotes included.
    Str(&'input str),
    /// A character literal, quotes included.
    Char(&'input str),
    /// `<...>`, brackets included.
    Attr(&'input str),
    /// `(. ... .)`, brackets included.
    Sem(&'input str),
    /// `IF(...)`, keyword and parentheses included.
    Resolver(&'input str),
    /// `$letters` or `$key=value`.
    Directive(&'input str),
    /// A string or character literal broken by a newline.
    Unterminated(&'input str),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Keyword {
    Compiler,
    Characters,
    Tokens,
    Pragmas,
    Productions,
    End,
    Any,
    Sync,
    Weak,
    Context,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "COMPILER" => Self::Compiler,
            "CHARACTERS" => Self::Characters,
            "TOKENS" => Self::Tokens,
            "PRAGMAS" => Self::Pragmas,
            "PRODUCTIONS" => Self::Productions,
            "END" => Self::End,
            "ANY" => Self::Any,
            "SYNC" => Self::Sync,
            "WEAK" => Self::Weak,
            "CONTEXT" => Self::Context,
            _ => return None,
        })
    }
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

#[derive(Debug, Default)]
pub struct LexerState {
    comment_depth: usize,
    nesting: usize,
}

lexgen::lexer! {
    pub Lexer(LexerState) -> Token<'input>;

    let whitespace = [' ' '\t' '\n' '\r'];
    let newline = '\r'* '\n' | '\r';
    let ident = ($$XID_Start | '_') $$XID_Continue*;
    let directive_char = $$XID_Continue | ['.' ':' '-'];

    rule Init {
        $whitespace+,
        "//" => |lexer| {
            lexer.switch(LexerRule::LineComment)
        },
        "/*" => |lexer| {
            lexer.state().comment_depth += 1;
            lexer.switch(LexerRule::BlockComment)
        },
        '"' => |lexer| {
            lexer.switch(LexerRule::StrLit)
        },
        '\'' => |lexer| {
            lexer.switch(LexerRule::CharLit)
        },
        "(." => |lexer| {
            lexer.switch(LexerRule::SemText)
        },
        '<' => |lexer| {
            lexer.state().nesting = 1;
            lexer.switch(LexerRule::AttrText)
        },
        "IF" $whitespace* '(' => |lexer| {
            lexer.state().nesting = 1;
            lexer.switch(LexerRule::ResolverText)
        },
        '$' $directive_char+ ('=' $directive_char*)? => |lexer| {
            let token = Token::Directive(lexer.match_());
            lexer.return_(token)
        },
        "=" = Token::Eq,
        "." = Token::Dot,
        ".." = Token::DotDot,
        "+" = Token::Plus,
        "-" = Token::Minus,
        "|" = Token::VertBar,
        "(" = Token::LParen,
        ")" = Token::RParen,
        "[" = Token::LBracket,
        "]" = Token::RBracket,
        "{" = Token::LBrace,
        "}" = Token::RBrace,
        $ident => |lexer| {
            let ident = lexer.match_();
            let token = match Keyword::from_ident(ident) {
                Some(kw) => Token::Kw(kw),
                None => Token::Ident(ident),
            };
            lexer.return_(token)
        },
    }

    rule LineComment {
        $newline => |lexer| {
            lexer.reset_match();
            lexer.switch(LexerRule::Init)
        },
        _,
    }

    rule BlockComment {
        "/*" => |lexer| {
            lexer.state().comment_depth += 1;
            lexer.continue_()
        },
        "*/" => |lexer| {
            let depth = &mut lexer.state().comment_depth;
            if *depth == 1 {
                *depth = 0;
                lexer.reset_match();
                lexer.switch(LexerRule::Init)
            } else {
                *depth -= 1;
                lexer.continue_()
            }
        },
        _,
    }

    rule StrLit {
        '"' => |lexer| {
            let token = Token::Str(lexer.match_());
            lexer.switch_and_return(LexerRule::Init, token)
        },
        '\\' _ => |lexer| lexer.continue_(),
        $newline => |lexer| {
            let token = Token::Unterminated(lexer.match_());
            lexer.switch_and_return(LexerRule::Init, token)
        },
        _ => |lexer| lexer.continue_(),
    }

    rule CharLit {
        '\'' => |lexer| {
            let token = Token::Char(lexer.match_());
            lexer.switch_and_return(LexerRule::Init, token)
        },
        '\\' _ => |lexer| lexer.continue_(),
        $newline => |lexer| {
            let token = Token::Unterminated(lexer.match_());
            lexer.switch_and_return(LexerRule::Init, token)
        },
        _ => |lexer| lexer.continue_(),
    }

    rule SemText {
        ".)" => |lexer| {
            let token = Token::Sem(lexer.match_());
            lexer.switch_and_return(LexerRule::Init, token)
        },
        _ => |lexer| lexer.continue_(),
    }

    rule AttrText {
        '<' => |lexer| {
            lexer.state().nesting += 1;
            lexer.continue_()
        },
        '>' => |lexer| {
            lexer.state().nesting -= 1;
            if lexer.state().nesting == 0 {
                let token = Token::Attr(lexer.match_());
                lexer.switch_and_return(LexerRule::Init, token)
            } else {
                lexer.continue_()
            }
        },
        _ => |lexer| lexer.continue_(),
    }

    rule ResolverText {
        '(' => |lexer| {
            lexer.state().nesting += 1;
            lexer.continue_()
        },
        ')' => |lexer| {
            lexer.state().nesting -= 1;
            if lexer.state().nesting == 0 {
                let token = Token::Resolver(lexer.match_());
                lexer.switch_and_return(LexerRule::Init, token)
            } else {
                lexer.continue_()
            }
        },
        _ => |lexer| lexer.continue_(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Keyword::*;
    use Token::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Lexer::new(input)
            .map(|res| res.map(|(_, t, _)| t))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn smoketest() {
        let input = "\
COMPILER Calc $FS // trace /* block-comment in line-comment */
CHARACTERS digit = '0' .. '9' + \"_\" - 'x'. /* block comment /* nested */ */
TOKENS number = digit { digit }.
PRODUCTIONS
  Calc<out int n> (. int m; .) = IF(la.kind == (1)) number | WEAK \"+\" [ ANY ] { SYNC }.
END Calc.
";
        assert!(matches!(
            dbg!(&tokens(input)[..]),
            [
                Kw(Compiler),
                Ident("Calc"),
                Directive("$FS"),
                // CHARACTERS
                Kw(Characters),
                Ident("digit"),
                Eq,
                Char("'0'"),
                DotDot,
                Char("'9'"),
                Plus,
                Str("\"_\""),
                Minus,
                Char("'x'"),
                Dot,
                // TOKENS
                Kw(Tokens),
                Ident("number"),
                Eq,
                Ident("digit"),
                LBrace,
                Ident("digit"),
                RBrace,
                Dot,
                // PRODUCTIONS
                Kw(Productions),
                Ident("Calc"),
                Attr("<out int n>"),
                Sem("(. int m; .)"),
                Eq,
                Resolver("IF(la.kind == (1))"),
                Ident("number"),
                VertBar,
                Kw(Weak),
                Str("\"+\""),
                LBracket,
                Kw(Any),
                RBracket,
                LBrace,
                Kw(Sync),
                RBrace,
                Dot,
                Kw(End),
                Ident("Calc"),
                Dot,
            ]
        ));
    }

    #[test]
    fn escapes_and_options() {
        assert_eq!(
            tokens(r#"$namespace=Foo.Bar "a\"b" '\''"#),
            vec![
                Directive("$namespace=Foo.Bar"),
                Str(r#""a\"b""#),
                Char(r"'\''"),
            ]
        );
    }

    #[test]
    fn nested_attributes() {
        assert_eq!(tokens("<List<int> xs>"), vec![Attr("<List<int> xs>")]);
    }

    #[test]
    fn broken_string() {
        assert!(matches!(tokens("\"abc\nx")[..], [Unterminated(..), Ident("x")]));
    }

    #[test]
    fn identifier_starting_with_keyword() {
        assert_eq!(tokens("IFX ENDING"), vec![Ident("IFX"), Ident("ENDING")]);
    }
}
