//! Lexical analysis.
//!
//! Turns source text into a flat list of tokens in a single pass. Numeric bases, signs and string
//! escapes are all resolved here so the parser only ever sees decoded literals.
//!
//! Statement separators are significant: every `;` and every line feed becomes a token, except
//! line feeds directly inside `(...)` or `[...]`, which are dropped so long argument lists and
//! collection literals can span lines. Line feeds inside `{...}` are kept because braces delimit
//! blocks.

use log::trace;

use crate::lang::error::SyntaxError;
use crate::lang::token::{Keyword, Position, Punct, Token, TokenKind};

type Result<T> = std::result::Result<T, SyntaxError>;

/// Deepest bracket nesting accepted by default. Each level costs the parser a few dozen stack
/// frames.
pub const DEFAULT_MAX_NESTING: usize = 64;

pub struct Lexer<'a> {
    src: &'a str,
    pos: Position,
    tokens: Vec<Token>,
    /// Currently open brackets, innermost last
    brackets: Vec<Punct>,
    max_nesting: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, max_nesting: usize) -> Self {
        Self {
            src,
            pos: Position::new(1, 1, 0),
            tokens: Vec::new(),
            brackets: Vec::new(),
            max_nesting,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        loop {
            self.skip_whitespace();

            let start = self.pos;
            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };

            match c {
                '\n' => {
                    self.bump();
                    if !matches!(
                        self.brackets.last(),
                        Some(Punct::LParen) | Some(Punct::LSquare)
                    ) {
                        self.push(TokenKind::Newline, start);
                    }
                }
                '\'' | '"' => self.string(start)?,
                '+' | '-' if self.sign_allowed() => self.number(start, Some(c))?,
                c if c.is_ascii_digit() => self.number(start, None)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier(start),
                _ => self.punct(start)?,
            }
        }

        let end = self.pos;
        self.tokens.push(Token::new(TokenKind::Eof, "", end));
        trace!("lexed {} tokens", self.tokens.len());

        Ok(self.tokens)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.offset += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }

        Some(c)
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> &'a str {
        let start = self.pos.offset;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }

        &self.src[start..self.pos.offset]
    }

    fn lexeme(&self, start: Position) -> &'a str {
        &self.src[start.offset..self.pos.offset]
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let lexeme = self.lexeme(start);
        self.tokens.push(Token::new(kind, lexeme, start));
    }

    /// Skip blanks, comments and backslash line continuations. Line feeds are left alone.
    fn skip_whitespace(&mut self) {
        loop {
            match (self.peek(), self.peek_nth(1), self.peek_nth(2)) {
                (Some(' '), _, _) | (Some('\t'), _, _) | (Some('\r'), _, _) => {
                    self.bump();
                }
                (Some('#'), _, _) => {
                    self.take_while(|c| c != '\n');
                }
                (Some('\\'), Some('\n'), _) => {
                    self.bump();
                    self.bump();
                }
                (Some('\\'), Some('\r'), Some('\n')) => {
                    self.bump();
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// A `+`/`-` is folded into a numeric literal only if a digit follows right away and the
    /// previous token cannot end an operand
    fn sign_allowed(&self) -> bool {
        let digit_follows = self.peek_nth(1).map_or(false, |c| c.is_ascii_digit());
        let after_operand = self.tokens.last().map_or(false, |t| t.ends_operand());

        digit_follows && !after_operand
    }

    fn number(&mut self, start: Position, sign: Option<char>) -> Result<()> {
        if sign.is_some() {
            self.bump();
        }
        let digits_start = self.pos;

        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('b')) | (Some('0'), Some('B')) => 2,
            (Some('0'), Some('o')) | (Some('0'), Some('O')) => 8,
            (Some('0'), Some('x')) | (Some('0'), Some('X')) => 16,
            _ => 10,
        };

        let magnitude = if radix != 10 {
            self.bump();
            self.bump();
            let digits = self.take_while(|c| c.is_digit(radix));
            if digits.is_empty() {
                return Err(SyntaxError::new(
                    format!("invalid base-{} literal: expected digits", radix),
                    start,
                ));
            }

            Magnitude::Integer(u64::from_str_radix(digits, radix).map_err(|_| {
                SyntaxError::new(
                    format!("integer literal `{}` is too large", self.lexeme(start)),
                    start,
                )
            })?)
        } else {
            self.take_while(|c| c.is_ascii_digit());
            if self.peek() == Some('.') {
                self.real(start, digits_start)?
            } else {
                let digits = self.lexeme(digits_start);
                Magnitude::Integer(digits.parse::<u64>().map_err(|_| {
                    SyntaxError::new(
                        format!("integer literal `{}` is too large", self.lexeme(start)),
                        start,
                    )
                })?)
            }
        };

        if let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.' {
                return Err(SyntaxError::new(
                    format!("invalid character `{}` in numeric literal", c),
                    self.pos,
                ));
            }
        }

        // `-2 ** 2` must be `-(2 ** 2)`, so leave the sign as an operator in front of a power.
        // 2**63 only fits in 64 bits when negative, so that one literal keeps its sign.
        let power_follows = self.rest().trim_start_matches(&[' ', '\t'][..]).starts_with("**");
        let min_int =
            sign == Some('-') && matches!(magnitude, Magnitude::Integer(m) if m == 1 << 63);
        match sign {
            Some(s) if power_follows && !min_int => {
                let punct = if s == '-' { Punct::Minus } else { Punct::Plus };
                self.tokens.push(Token::new(TokenKind::Punct(punct), &s.to_string(), start));
                let kind = magnitude.into_kind(None, start)?;
                self.push(kind, digits_start);
            }
            _ => {
                let kind = magnitude.into_kind(sign, start)?;
                self.push(kind, start);
            }
        }

        Ok(())
    }

    /// Lex the fractional part and exponent of a real. The cursor is on the `.`
    fn real(&mut self, start: Position, digits_start: Position) -> Result<Magnitude> {
        if !self.peek_nth(1).map_or(false, |c| c.is_ascii_digit()) {
            let dot = self.pos;
            return Err(SyntaxError::new(
                format!(
                    "invalid real literal `{}.`: expected digits after the decimal point",
                    self.lexeme(start)
                ),
                dot,
            ));
        }
        self.bump();
        self.take_while(|c| c.is_ascii_digit());

        if let Some('e') | Some('E') = self.peek() {
            let exponent_ok = match (self.peek_nth(1), self.peek_nth(2)) {
                (Some(c), _) if c.is_ascii_digit() => true,
                (Some('+'), Some(c)) | (Some('-'), Some(c)) => c.is_ascii_digit(),
                _ => false,
            };
            if !exponent_ok {
                return Err(SyntaxError::new("invalid exponent in real literal", self.pos));
            }

            self.bump();
            if let Some('+') | Some('-') = self.peek() {
                self.bump();
            }
            self.take_while(|c| c.is_ascii_digit());
        }

        let text = self.lexeme(digits_start);
        let value = text
            .parse::<f64>()
            .map_err(|e| SyntaxError::new(format!("invalid real literal: {}", e), start))?;

        Ok(Magnitude::Real(value))
    }

    fn string(&mut self, start: Position) -> Result<()> {
        let quote = self.bump();
        let mut value = String::new();

        loop {
            let here = self.pos;
            match self.bump() {
                None | Some('\n') => {
                    return Err(SyntaxError::new("unterminated string literal", start))
                }
                Some(c) if Some(c) == quote => break,
                Some('\\') => self.escape(here, start, &mut value)?,
                Some(c) => value.push(c),
            }
        }

        self.push(TokenKind::Str(value), start);

        Ok(())
    }

    /// Decode one escape sequence. `backslash` is the position of the `\`, which has been consumed
    fn escape(&mut self, backslash: Position, start: Position, value: &mut String) -> Result<()> {
        match self.bump() {
            Some('\'') => value.push('\''),
            Some('"') => value.push('"'),
            Some('\\') => value.push('\\'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('n') => value.push('\n'),
            // Line continuation
            Some('\n') => (),
            Some('\r') if self.peek() == Some('\n') => {
                self.bump();
            }
            Some('u') => {
                let digits = self.take_while_max(4, |c| c.is_ascii_hexdigit());
                if digits.len() != 4 {
                    return Err(SyntaxError::new(
                        "truncated \\uXXXX escape: expected 4 hex digits",
                        backslash,
                    ));
                }

                let c = u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        SyntaxError::new(
                            format!("\\u{} is not a valid code point", digits),
                            backslash,
                        )
                    })?;
                value.push(c);
            }
            Some('N') => {
                if self.bump() != Some('{') {
                    return Err(SyntaxError::new("malformed \\N{...} escape", backslash));
                }
                let name = self.take_while(|c| c != '}' && c != '\n' && c != '\'' && c != '"');
                if self.bump() != Some('}') {
                    return Err(SyntaxError::new("malformed \\N{...} escape", backslash));
                }

                let c = unicode_names2::character(name).ok_or_else(|| {
                    SyntaxError::new(
                        format!("unknown Unicode character name `{}`", name),
                        backslash,
                    )
                })?;
                value.push(c);
            }
            Some(c) => {
                return Err(SyntaxError::new(
                    format!("invalid escape sequence `\\{}`", c),
                    backslash,
                ))
            }
            None => return Err(SyntaxError::new("unterminated string literal", start)),
        }

        Ok(())
    }

    fn take_while_max<F: Fn(char) -> bool>(&mut self, max: usize, pred: F) -> &'a str {
        let start = self.pos.offset;
        for _ in 0..max {
            match self.peek() {
                Some(c) if pred(c) => {
                    self.bump();
                }
                _ => break,
            }
        }

        &self.src[start..self.pos.offset]
    }

    fn identifier(&mut self, start: Position) {
        let ident = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        let kind = match Keyword::from_ident(ident) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier(ident.to_string()),
        };

        self.push(kind, start);
    }

    fn punct(&mut self, start: Position) -> Result<()> {
        let rest = self.rest();
        let punct = match Punct::ALL.iter().find(|p| rest.starts_with(p.as_str())) {
            Some(p) => *p,
            None => {
                let c = self.peek().unwrap_or_default();
                return Err(SyntaxError::new(
                    format!("unexpected character `{}` (U+{:04X})", c, c as u32),
                    start,
                ));
            }
        };

        for _ in punct.as_str().chars() {
            self.bump();
        }

        match punct {
            Punct::LParen | Punct::LSquare | Punct::LBrace => {
                if self.brackets.len() >= self.max_nesting {
                    return Err(SyntaxError::new(
                        format!("too many nested brackets (limit {})", self.max_nesting),
                        start,
                    ));
                }
                self.brackets.push(punct);
            }
            Punct::RParen | Punct::RSquare | Punct::RBrace => {
                let opener = match punct {
                    Punct::RParen => Punct::LParen,
                    Punct::RSquare => Punct::LSquare,
                    _ => Punct::LBrace,
                };
                // Mismatched brackets are reported by the parser
                if self.brackets.last() == Some(&opener) {
                    self.brackets.pop();
                }
            }
            _ => (),
        }

        self.push(TokenKind::Punct(punct), start);

        Ok(())
    }
}

/// Unsigned value of a numeric literal before its sign is applied
enum Magnitude {
    Integer(u64),
    Real(f64),
}

impl Magnitude {
    fn into_kind(self, sign: Option<char>, start: Position) -> Result<TokenKind> {
        let negative = sign == Some('-');
        match self {
            Magnitude::Integer(m) => {
                let value = if negative {
                    i64::try_from(-i128::from(m)).ok()
                } else {
                    i64::try_from(m).ok()
                };

                value.map(TokenKind::Integer).ok_or_else(|| {
                    SyntaxError::new("integer literal does not fit in 64 bits", start)
                })
            }
            Magnitude::Real(r) => Ok(TokenKind::Real(if negative { -r } else { r })),
        }
    }
}

/// Convert `src` into tokens. The last token is always `TokenKind::Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    tokenize_with(src, DEFAULT_MAX_NESTING)
}

/// Like `tokenize`, rejecting brackets nested deeper than `max_nesting`
pub fn tokenize_with(src: &str, max_nesting: usize) -> Result<Vec<Token>> {
    Lexer::new(src, max_nesting).tokenize()
}

#[cfg(test)]
fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src)
        .expect("lex failed")
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenKind::Eof)
        .collect()
}

#[test]
fn test_integer_bases() {
    let data = vec![
        ("0b101", 5),
        ("0B11", 3),
        ("0o17", 15),
        ("0O7", 7),
        ("10", 10),
        ("0xFF", 255),
        ("0Xff", 255),
        ("007", 7),
        ("9223372036854775807", i64::MAX),
        ("-9223372036854775808", i64::MIN),
        ("-0x10", -16),
        ("+5", 5),
    ];

    for (input, expected) in data {
        assert_eq!(kinds(input), vec![TokenKind::Integer(expected)], "{}", input);
    }
}

#[test]
fn test_reals() {
    let data = vec![
        ("3.5", 3.5),
        ("0.25", 0.25),
        ("1.5e3", 1500.0),
        ("1.0E-2", 0.01),
        ("2.0e+1", 20.0),
        ("-0.5", -0.5),
    ];

    for (input, expected) in data {
        assert_eq!(kinds(input), vec![TokenKind::Real(expected)], "{}", input);
    }
}

#[test]
fn test_bad_numbers() {
    let data = vec![
        "1.", "1.e5", "0x", "0b2", "0o", "12abc", "1.5e", "1.5e+", "9223372036854775808",
        "1.2.3",
    ];

    for input in data {
        assert!(tokenize(input).is_err(), "{}", input);
    }

    let err = tokenize("x = 12.").unwrap_err();
    assert_eq!(err.pos, Position::new(1, 7, 6));
}

#[test]
fn test_sign_folding() {
    use Punct::*;

    assert_eq!(
        kinds("x -1"),
        vec![
            TokenKind::Identifier("x".to_string()),
            TokenKind::Punct(Minus),
            TokenKind::Integer(1)
        ]
    );
    assert_eq!(
        kinds("x = -1"),
        vec![
            TokenKind::Identifier("x".to_string()),
            TokenKind::Punct(Eq),
            TokenKind::Integer(-1)
        ]
    );
    assert_eq!(
        kinds("(-1)"),
        vec![
            TokenKind::Punct(LParen),
            TokenKind::Integer(-1),
            TokenKind::Punct(RParen)
        ]
    );
    assert_eq!(
        kinds("- 1"),
        vec![TokenKind::Punct(Minus), TokenKind::Integer(1)]
    );
    assert_eq!(
        kinds("-2 ** 2"),
        vec![
            TokenKind::Punct(Minus),
            TokenKind::Integer(2),
            TokenKind::Punct(StarStar),
            TokenKind::Integer(2)
        ]
    );
    assert_eq!(
        kinds("2 ** -1"),
        vec![
            TokenKind::Integer(2),
            TokenKind::Punct(StarStar),
            TokenKind::Integer(-1)
        ]
    );
    assert_eq!(
        kinds("f(1)-2"),
        vec![
            TokenKind::Identifier("f".to_string()),
            TokenKind::Punct(LParen),
            TokenKind::Integer(1),
            TokenKind::Punct(RParen),
            TokenKind::Punct(Minus),
            TokenKind::Integer(2)
        ]
    );
    assert_eq!(
        kinds("-9223372036854775808 ** 1"),
        vec![
            TokenKind::Integer(i64::MIN),
            TokenKind::Punct(StarStar),
            TokenKind::Integer(1)
        ]
    );
    assert!(tokenize("9223372036854775808 ** 1").is_err());
}

#[test]
fn test_nesting_limit() {
    let data = vec![
        ("(", ")"),
        ("[", "]"),
        ("{", "}"),
    ];

    for (open, close) in data {
        let ok = format!("x = {}1{}", open.repeat(4), close.repeat(4));
        assert!(tokenize_with(&ok, 4).is_ok(), "{}", ok);

        let deep = format!("x = {}1{}", open.repeat(5), close.repeat(5));
        let err = tokenize_with(&deep, 4).unwrap_err();
        assert_eq!(err.message, "too many nested brackets (limit 4)");
        assert_eq!(err.pos, Position::new(1, 9, 8));
    }

    // Closed brackets free their level again
    assert!(tokenize_with("[[1]] + [[2]] + ([3],)", 2).is_ok());

    let deep = format!("x = {}1{}", "(".repeat(1000), ")".repeat(1000));
    assert!(tokenize(&deep).is_err());
}

#[test]
fn test_strings() {
    let data = vec![
        (r#""hello world""#, "hello world"),
        (r#"'single'"#, "single"),
        (r#""it's""#, "it's"),
        (r#"'say "hi"'"#, "say \"hi\""),
        (r#""tab\there""#, "tab\there"),
        (r#""\r\n""#, "\r\n"),
        (r#"'\'\"\\'"#, "'\"\\"),
        (r#""é""#, "\u{e9}"),
        (r#""❤abc""#, "❤abc"),
        (r#""\N{GREEK SMALL LETTER ALPHA}""#, "α"),
        ("\"line \\\ncontinued\"", "line continued"),
        (r#""❤""#, "❤"),
    ];

    for (input, expected) in data {
        assert_eq!(
            kinds(input),
            vec![TokenKind::Str(expected.to_string())],
            "{}",
            input
        );
    }
}

#[test]
fn test_bad_strings() {
    let data = vec![
        (r#""unterminated"#, Position::new(1, 1, 0)),
        ("x = 'no\nnewlines'", Position::new(1, 5, 4)),
        (r#"  "bad \q escape""#, Position::new(1, 8, 7)),
        (r#""\u12""#, Position::new(1, 2, 1)),
        (r#""\uD800""#, Position::new(1, 2, 1)),
        (r#""\N{NOT A REAL NAME}""#, Position::new(1, 2, 1)),
        (r#""\N{ALPHA""#, Position::new(1, 2, 1)),
    ];

    for (input, pos) in data {
        let err = tokenize(input).unwrap_err();
        assert_eq!(err.pos, pos, "{}", input);
    }
}

#[test]
fn test_operators_longest_match() {
    use Punct::*;

    let tokens = kinds("a //= b ** c // d **= e >>= 1 << 2 != f++ && !g");
    let puncts: Vec<Punct> = tokens
        .into_iter()
        .filter_map(|k| match k {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        })
        .collect();

    assert_eq!(
        puncts,
        vec![SlashSlashEq, StarStar, SlashSlash, StarStarEq, ShrEq, Shl, NotEq, PlusPlus, AmpAmp, Bang]
    );
}

#[test]
fn test_identifiers_and_keywords() {
    assert_eq!(
        kinds("_foo bar$1 while true NaN"),
        vec![
            TokenKind::Identifier("_foo".to_string()),
            TokenKind::Identifier("bar$1".to_string()),
            TokenKind::Keyword(Keyword::While),
            TokenKind::Keyword(Keyword::True),
            TokenKind::Keyword(Keyword::NaN),
        ]
    );
    assert!(tokenize("$x").is_err());
    assert!(tokenize("x @ y").is_err());
}

#[test]
fn test_newlines_and_comments() {
    use Punct::*;

    assert_eq!(
        kinds("a # comment\nb;c"),
        vec![
            TokenKind::Identifier("a".to_string()),
            TokenKind::Newline,
            TokenKind::Identifier("b".to_string()),
            TokenKind::Punct(Semicolon),
            TokenKind::Identifier("c".to_string()),
        ]
    );
    // Line feeds inside parens and square brackets are dropped, inside braces they are kept
    assert_eq!(
        kinds("f(1,\n2)"),
        vec![
            TokenKind::Identifier("f".to_string()),
            TokenKind::Punct(LParen),
            TokenKind::Integer(1),
            TokenKind::Punct(Comma),
            TokenKind::Integer(2),
            TokenKind::Punct(RParen),
        ]
    );
    assert_eq!(
        kinds("({\n})"),
        vec![
            TokenKind::Punct(LParen),
            TokenKind::Punct(LBrace),
            TokenKind::Newline,
            TokenKind::Punct(RBrace),
            TokenKind::Punct(RParen),
        ]
    );
    assert_eq!(
        kinds("a \\\n+ b"),
        vec![
            TokenKind::Identifier("a".to_string()),
            TokenKind::Punct(Plus),
            TokenKind::Identifier("b".to_string()),
        ]
    );
}

#[test]
fn test_positions() {
    let tokens = tokenize("x = 1\n  yz = 'a'").unwrap();
    let positions: Vec<Position> = tokens.iter().map(|t| t.pos).collect();

    assert_eq!(
        positions,
        vec![
            Position::new(1, 1, 0),
            Position::new(1, 3, 2),
            Position::new(1, 5, 4),
            Position::new(1, 6, 5),
            Position::new(2, 3, 8),
            Position::new(2, 6, 11),
            Position::new(2, 8, 13),
            Position::new(2, 11, 16),
        ]
    );
}
