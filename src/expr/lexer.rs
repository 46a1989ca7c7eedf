use crate::errors::{BindError, BindErrorKind, BindResult};
use crate::span::{Pos, Source, Span};

use super::token::{IntegerBase, Token, TokenKind};

use std::path::PathBuf;

fn is_valid_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_id_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Lexer for one binding expression (the text between `@{` and `}`). The
/// starting position anchors all token spans to the containing file, so
/// error offsets slice the original attribute text exactly.
pub struct Lexer {
    src: Vec<char>,
    filepath: PathBuf,
    curr_pos: Pos,
    base_offset: usize,
}

impl Lexer {
    pub fn new(src: &str, filepath: PathBuf, start: Pos) -> Lexer {
        Lexer {
            src: src.chars().collect(),
            filepath,
            base_offset: start.offset,
            curr_pos: start,
        }
    }

    pub fn tokenize(mut self) -> BindResult<Vec<Token>> {
        let mut tokens = vec![];
        loop {
            let tok = self.next_token()?;
            let eof = tok.kind == TokenKind::EOF;
            tokens.push(tok);
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn index(&self) -> usize {
        self.curr_pos.offset - self.base_offset
    }

    fn char_at(&self, index: usize) -> Option<char> {
        self.src.get(index).copied()
    }

    fn first(&self) -> char {
        self.char_at(self.index()).unwrap_or('\0')
    }

    fn second(&self) -> char {
        self.char_at(self.index() + 1).unwrap_or('\0')
    }

    fn third(&self) -> char {
        self.char_at(self.index() + 2).unwrap_or('\0')
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.char_at(self.index())?;
        if ch == '\n' {
            self.curr_pos.lineno += 1;
            self.curr_pos.col = 0;
        } else {
            self.curr_pos.col += 1;
        }
        self.curr_pos.offset += 1;
        Some(ch)
    }

    fn consume_chars(&mut self, n: usize) {
        for _ in 0..n {
            self.next_char();
        }
    }

    fn next_char_while(&mut self, start_ch: Option<char>, mut f: impl FnMut(char) -> bool) -> String {
        let mut s = match start_ch {
            Some(ch) => ch.to_string(),
            None => String::new(),
        };
        while f(self.first()) {
            if let Some(ch) = self.next_char() {
                s.push(ch);
            } else {
                break;
            }
        }
        s
    }

    fn skip_whitespace(&mut self) {
        while self.first().is_whitespace() {
            self.next_char();
        }
    }

    fn err(&self, msg: String, start: Pos) -> BindError {
        BindError::new(
            msg,
            Source::new(
                self.filepath.clone(),
                Span {
                    start,
                    end: self.curr_pos,
                },
            ),
            BindErrorKind::Syntax,
        )
    }

    fn ident_or_keyword(&mut self, start_ch: char) -> TokenKind {
        let word = self.next_char_while(Some(start_ch), is_valid_id_char);
        match word.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "instanceof" => TokenKind::InstanceOf,
            _ => TokenKind::Identifier(word),
        }
    }

    fn number(&mut self, start_ch: char) -> TokenKind {
        if start_ch == '0' && (self.first() == 'x' || self.first() == 'X') {
            self.next_char();
            let value = self.next_char_while(None, |c| c.is_ascii_hexdigit() || c == '_');
            let suffix = self.int_suffix();
            return TokenKind::Integer {
                value,
                base: IntegerBase::Hex,
                suffix,
            };
        }

        let mut value = self.next_char_while(Some(start_ch), |c| c.is_ascii_digit() || c == '_');
        let mut is_float = false;
        if self.first() == '.' && self.second().is_ascii_digit() {
            self.next_char();
            let frac = self.next_char_while(None, |c| c.is_ascii_digit());
            value = format!("{}.{}", value, frac);
            is_float = true;
        }

        if is_float || matches!(self.first(), 'f' | 'F' | 'd' | 'D') {
            let suffix = match self.first() {
                c @ ('f' | 'F' | 'd' | 'D') => {
                    self.next_char();
                    Some(c)
                }
                _ => None,
            };
            TokenKind::Float { value, suffix }
        } else {
            let suffix = self.int_suffix();
            TokenKind::Integer {
                value,
                base: IntegerBase::Decimal,
                suffix,
            }
        }
    }

    fn int_suffix(&mut self) -> Option<char> {
        match self.first() {
            c @ ('l' | 'L') => {
                self.next_char();
                Some(c)
            }
            _ => None,
        }
    }

    fn quoted(&mut self, quote: char, start: Pos) -> BindResult<TokenKind> {
        let mut s = String::new();
        loop {
            match self.next_char() {
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = self
                        .next_char()
                        .ok_or_else(|| self.err("unterminated string literal".to_string(), start))?;
                    s.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                Some(c) => s.push(c),
                None => return Err(self.err("unterminated string literal".to_string(), start)),
            }
        }
        // A single-quoted literal of length one is a char, anything longer
        // is a string.
        if quote == '\'' && s.chars().count() == 1 {
            Ok(TokenKind::Char(s.chars().next().unwrap()))
        } else {
            Ok(TokenKind::Str(s))
        }
    }

    fn next_token(&mut self) -> BindResult<Token> {
        self.skip_whitespace();
        let start = self.curr_pos;

        let kind = match (self.first(), self.second(), self.third()) {
            ('\0', _, _) => TokenKind::EOF,
            ('>', '>', '>') => {
                self.consume_chars(3);
                TokenKind::UnsignedShiftRight
            }
            ('>', '>', _) => {
                self.consume_chars(2);
                TokenKind::ShiftRight
            }
            ('<', '<', _) => {
                self.consume_chars(2);
                TokenKind::ShiftLeft
            }
            ('>', '=', _) => {
                self.consume_chars(2);
                TokenKind::GtEq
            }
            ('<', '=', _) => {
                self.consume_chars(2);
                TokenKind::LtEq
            }
            ('=', '=', _) => {
                self.consume_chars(2);
                TokenKind::EqEq
            }
            ('!', '=', _) => {
                self.consume_chars(2);
                TokenKind::NotEq
            }
            ('&', '&', _) => {
                self.consume_chars(2);
                TokenKind::AmpAmp
            }
            ('|', '|', _) => {
                self.consume_chars(2);
                TokenKind::PipePipe
            }
            ('?', '?', _) => {
                self.consume_chars(2);
                TokenKind::QuestionQuestion
            }
            (':', ':', _) => {
                self.consume_chars(2);
                TokenKind::ColonColon
            }
            ('-', '>', _) => {
                self.consume_chars(2);
                TokenKind::Arrow
            }
            ('=', _, _) => {
                self.next_char();
                TokenKind::Equals
            }
            ('>', _, _) => {
                self.next_char();
                TokenKind::Gt
            }
            ('<', _, _) => {
                self.next_char();
                TokenKind::Lt
            }
            ('+', _, _) => {
                self.next_char();
                TokenKind::Plus
            }
            ('-', _, _) => {
                self.next_char();
                TokenKind::Minus
            }
            ('*', _, _) => {
                self.next_char();
                TokenKind::Asterisk
            }
            ('/', _, _) => {
                self.next_char();
                TokenKind::Slash
            }
            ('%', _, _) => {
                self.next_char();
                TokenKind::Percent
            }
            ('&', _, _) => {
                self.next_char();
                TokenKind::Ampersand
            }
            ('|', _, _) => {
                self.next_char();
                TokenKind::Pipe
            }
            ('^', _, _) => {
                self.next_char();
                TokenKind::Caret
            }
            ('!', _, _) => {
                self.next_char();
                TokenKind::Exclamation
            }
            ('~', _, _) => {
                self.next_char();
                TokenKind::Tilde
            }
            ('?', _, _) => {
                self.next_char();
                TokenKind::Question
            }
            (':', _, _) => {
                self.next_char();
                TokenKind::Colon
            }
            ('.', _, _) => {
                self.next_char();
                TokenKind::Dot
            }
            (',', _, _) => {
                self.next_char();
                TokenKind::Comma
            }
            ('(', _, _) => {
                self.next_char();
                TokenKind::LeftParen
            }
            (')', _, _) => {
                self.next_char();
                TokenKind::RightParen
            }
            ('[', _, _) => {
                self.next_char();
                TokenKind::LeftBracket
            }
            (']', _, _) => {
                self.next_char();
                TokenKind::RightBracket
            }
            (q @ ('`' | '\'' | '"'), _, _) => {
                self.next_char();
                self.quoted(q, start)?
            }
            (c, _, _) if c.is_ascii_digit() => {
                self.next_char();
                self.number(c)
            }
            (c, _, _) if is_id_start_char(c) => {
                self.next_char();
                self.ident_or_keyword(c)
            }
            (c, _, _) => {
                self.next_char();
                return Err(self.err(format!("unexpected character '{}'", c), start));
            }
        };

        Ok(Token {
            kind,
            span: Span {
                start,
                end: self.curr_pos,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, PathBuf::from("test.xml"), Pos::new())
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_member_access_chain() {
        assert_eq!(
            lex("user.name"),
            vec![
                TokenKind::Identifier("user".into()),
                TokenKind::Dot,
                TokenKind::Identifier("name".into()),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn lexes_multi_char_operators() {
        assert_eq!(
            lex("a >>> b ?? c != d"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::UnsignedShiftRight,
                TokenKind::Identifier("b".into()),
                TokenKind::QuestionQuestion,
                TokenKind::Identifier("c".into()),
                TokenKind::NotEq,
                TokenKind::Identifier("d".into()),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn lexes_string_and_char_literals() {
        assert_eq!(
            lex("`hello` 'x' 'long'"),
            vec![
                TokenKind::Str("hello".into()),
                TokenKind::Char('x'),
                TokenKind::Str("long".into()),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            lex("42 1.5f 0x1F 10L"),
            vec![
                TokenKind::Integer {
                    value: "42".into(),
                    base: IntegerBase::Decimal,
                    suffix: None
                },
                TokenKind::Float {
                    value: "1.5".into(),
                    suffix: Some('f')
                },
                TokenKind::Integer {
                    value: "1F".into(),
                    base: IntegerBase::Hex,
                    suffix: None
                },
                TokenKind::Integer {
                    value: "10".into(),
                    base: IntegerBase::Decimal,
                    suffix: Some('L')
                },
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn spans_are_anchored_to_the_file() {
        let start = Pos {
            lineno: 4,
            col: 20,
            offset: 100,
        };
        let toks = Lexer::new("user.name", PathBuf::from("test.xml"), start)
            .tokenize()
            .unwrap();
        assert_eq!(toks[0].span.start.offset, 100);
        assert_eq!(toks[2].span.start.offset, 105);
        assert_eq!(toks[2].span.end.offset, 109);
        assert_eq!(toks[2].span.start.col, 25);
    }

    #[test]
    fn rejects_unexpected_characters() {
        let err = Lexer::new("a # b", PathBuf::from("test.xml"), Pos::new())
            .tokenize()
            .unwrap_err();
        assert_eq!(err.msg, "unexpected character '#'");
        assert_eq!(err.kind, crate::errors::BindErrorKind::Syntax);
    }
}
