use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum IntegerBase {
    Decimal,
    Hex,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier(String),
    Integer {
        value: String,
        base: IntegerBase,
        suffix: Option<char>,
    },
    Float {
        value: String,
        suffix: Option<char>,
    },
    Str(String),
    Char(char),
    /// true
    True,
    /// false
    False,
    /// null
    Null,
    /// instanceof
    InstanceOf,

    /// =
    Equals,
    /// >
    Gt,
    /// <
    Lt,
    /// >=
    GtEq,
    /// <=
    LtEq,
    /// ==
    EqEq,
    /// !=
    NotEq,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,
    /// &
    Ampersand,
    /// |
    Pipe,
    /// ^
    Caret,
    /// !
    Exclamation,
    /// ~
    Tilde,
    /// &&
    AmpAmp,
    /// ||
    PipePipe,
    /// <<
    ShiftLeft,
    /// >>
    ShiftRight,
    /// >>>
    UnsignedShiftRight,
    /// ?
    Question,
    /// ??
    QuestionQuestion,
    /// :
    Colon,
    /// ::
    ColonColon,
    /// .
    Dot,
    /// ,
    Comma,
    /// ->
    Arrow,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,

    EOF,
}

impl TokenKind {
    /// The literal text of this token as it appeared in the expression, used
    /// verbatim in syntax error messages.
    pub fn text(&self) -> String {
        use TokenKind::*;
        match self {
            Identifier(name) => name.clone(),
            Integer { value, base, suffix } => {
                let prefix = match base {
                    IntegerBase::Decimal => "",
                    IntegerBase::Hex => "0x",
                };
                match suffix {
                    Some(s) => format!("{}{}{}", prefix, value, s),
                    None => format!("{}{}", prefix, value),
                }
            }
            Float { value, suffix } => match suffix {
                Some(s) => format!("{}{}", value, s),
                None => value.clone(),
            },
            Str(s) => format!("`{}`", s),
            Char(c) => format!("'{}'", c),
            True => "true".to_string(),
            False => "false".to_string(),
            Null => "null".to_string(),
            InstanceOf => "instanceof".to_string(),
            Equals => "=".to_string(),
            Gt => ">".to_string(),
            Lt => "<".to_string(),
            GtEq => ">=".to_string(),
            LtEq => "<=".to_string(),
            EqEq => "==".to_string(),
            NotEq => "!=".to_string(),
            Plus => "+".to_string(),
            Minus => "-".to_string(),
            Asterisk => "*".to_string(),
            Slash => "/".to_string(),
            Percent => "%".to_string(),
            Ampersand => "&".to_string(),
            Pipe => "|".to_string(),
            Caret => "^".to_string(),
            Exclamation => "!".to_string(),
            Tilde => "~".to_string(),
            AmpAmp => "&&".to_string(),
            PipePipe => "||".to_string(),
            ShiftLeft => "<<".to_string(),
            ShiftRight => ">>".to_string(),
            UnsignedShiftRight => ">>>".to_string(),
            Question => "?".to_string(),
            QuestionQuestion => "??".to_string(),
            Colon => ":".to_string(),
            ColonColon => "::".to_string(),
            Dot => ".".to_string(),
            Comma => ",".to_string(),
            Arrow => "->".to_string(),
            LeftParen => "(".to_string(),
            RightParen => ")".to_string(),
            LeftBracket => "[".to_string(),
            RightBracket => "]".to_string(),
            EOF => "<end of expression>".to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
