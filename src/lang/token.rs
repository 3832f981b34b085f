use std::fmt;

/// Location of a token in the source text
///
/// `line` and `column` are 1-based and count Unicode scalar values; `offset` is the 0-based byte
/// offset into the source.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Keyword {
    If,
    Else,
    Elif,
    While,
    For,
    In,
    Break,
    Continue,
    Return,
    True,
    False,
    Null,
    NaN,
    Inf,
}

impl Keyword {
    pub fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "if" => Self::If,
            "else" => Self::Else,
            "elif" => Self::Elif,
            "while" => Self::While,
            "for" => Self::For,
            "in" => Self::In,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "return" => Self::Return,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "NaN" => Self::NaN,
            "INF" => Self::Inf,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Else => "else",
            Self::Elif => "elif",
            Self::While => "while",
            Self::For => "for",
            Self::In => "in",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return => "return",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::NaN => "NaN",
            Self::Inf => "INF",
        }
    }

    /// Whether the keyword is a value, ie. it can end an operand
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Self::True | Self::False | Self::Null | Self::NaN | Self::Inf
        )
    }
}

macro_rules! puncts {
    ($($variant: ident => $text: expr,)*) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum Punct {
            $($variant,)*
        }

        impl Punct {
            /// Every punctuator, longest first so the lexer can match greedily
            pub const ALL: &'static [Punct] = &[$(Punct::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Punct::$variant => $text,)*
                }
            }
        }
    };
}

// NB: order matters -- a punctuator must be listed before any of its prefixes
puncts! {
    SlashSlashEq => "//=",
    StarStarEq => "**=",
    ShrEq => ">>=",
    ShlEq => "<<=",
    PlusPlus => "++",
    MinusMinus => "--",
    PlusEq => "+=",
    MinusEq => "-=",
    StarEq => "*=",
    SlashEq => "/=",
    PercentEq => "%=",
    NotEq => "!=",
    StarStar => "**",
    SlashSlash => "//",
    Shr => ">>",
    Shl => "<<",
    EqEq => "==",
    LtEq => "<=",
    GtEq => ">=",
    AmpEq => "&=",
    CaretEq => "^=",
    PipeEq => "|=",
    PipePipe => "||",
    AmpAmp => "&&",
    Question => "?",
    Colon => ":",
    Plus => "+",
    Minus => "-",
    Percent => "%",
    Bang => "!",
    Tilde => "~",
    Star => "*",
    Slash => "/",
    Lt => "<",
    Gt => ">",
    Eq => "=",
    Amp => "&",
    Pipe => "|",
    Caret => "^",
    Comma => ",",
    LParen => "(",
    RParen => ")",
    LSquare => "[",
    RSquare => "]",
    LBrace => "{",
    RBrace => "}",
    Semicolon => ";",
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    Integer(i64),
    Real(f64),
    Str(String),
    Identifier(String),
    Keyword(Keyword),
    Punct(Punct),
    /// A line feed acting as a statement separator
    Newline,
    Eof,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token
    pub lexeme: String,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: &str, pos: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            pos,
        }
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Whether this token can be the last token of an operand
    ///
    /// Used by the lexer to decide if a following `+`/`-` is a binary operator or a sign.
    pub fn ends_operand(&self) -> bool {
        match &self.kind {
            TokenKind::Integer(_)
            | TokenKind::Real(_)
            | TokenKind::Str(_)
            | TokenKind::Identifier(_) => true,
            TokenKind::Keyword(k) => k.is_value(),
            TokenKind::Punct(p) => matches!(
                p,
                Punct::RParen | Punct::RSquare | Punct::RBrace | Punct::PlusPlus | Punct::MinusMinus
            ),
            TokenKind::Newline | TokenKind::Eof => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "`{}`", self.lexeme),
        }
    }
}
