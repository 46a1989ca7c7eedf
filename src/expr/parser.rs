use std::path::PathBuf;

use crate::errors::{BindError, BindErrorKind, BindResult};
use crate::messages;
use crate::span::{Pos, Source, Span};

use super::ast::{Expr, ExprKind, InfixOp, LambdaParam, Literal, PrefixOp};
use super::lexer::Lexer;
use super::token::{Token, TokenKind};

bitflags::bitflags! {
    pub struct Restrictions: u8 {
        /// Lambdas are only recognized at the top level of an attribute
        /// expression, not nested inside operands.
        const TOP_LEVEL = 1 << 0;
    }
}

const EXPR_START: &[&str] = &["identifier", "literal", "'('", "'!'", "'-'", "'~'"];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    filepath: PathBuf,
    next_id: usize,
}

impl Parser {
    /// Parse one binding expression (already stripped of its `@{`/`}`
    /// wrapper). `start` anchors spans to the containing file so error
    /// offsets are file-absolute. Node ids count up from `first_id`; a
    /// layout resolving several expressions into one table passes the next
    /// free id so nodes stay distinct across expressions.
    pub fn parse(src: &str, filepath: PathBuf, start: Pos, first_id: usize) -> BindResult<Expr> {
        let tokens = Lexer::new(src, filepath.clone(), start).tokenize()?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            filepath,
            next_id: first_id,
        };
        let expr = parser.parse_expr(Restrictions::TOP_LEVEL)?;
        if parser.eat(&TokenKind::Comma) {
            parser.parse_default_clause()?;
        }
        if parser.peek_kind() != &TokenKind::EOF {
            return Err(parser.unexpected(&["an operator", "<end of expression>"]));
        }
        Ok(expr)
    }

    /// `, default = <value>` after the expression. The value only matters to
    /// the binding runtime; here it is checked for shape and dropped.
    fn parse_default_clause(&mut self) -> BindResult<()> {
        if !matches!(self.peek_kind(), TokenKind::Identifier(name) if name == "default") {
            return Err(self.unexpected(&["'default'"]));
        }
        self.advance();
        self.expect(TokenKind::Equals, &["'='"])?;
        self.parse_primary(Restrictions::empty())?;
        Ok(())
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_kind_at(&self, n: usize) -> &TokenKind {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &[&str]) -> BindResult<Token> {
        if self.peek_kind() == &kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &[&str]) -> BindError {
        let tok = self.peek();
        BindError::new(
            messages::format(
                messages::UNEXPECTED_TOKEN,
                &[&tok.kind.text(), &expected.join(", ")],
            ),
            Source::new(self.filepath.clone(), tok.span),
            BindErrorKind::Syntax,
        )
    }

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = self.next_id;
        self.next_id += 1;
        Expr { kind, id, span }
    }

    fn parse_expr(&mut self, ctx: Restrictions) -> BindResult<Expr> {
        if ctx.contains(Restrictions::TOP_LEVEL) {
            if let Some(expr) = self.parse_lambda()? {
                return Ok(expr);
            }
        }
        self.parse_null_coalesce(ctx - Restrictions::TOP_LEVEL)
    }

    /// `v -> expr`, `() -> expr` or `(a, b) -> expr`, recognized by lookahead
    /// so an ordinary parenthesized expression falls through untouched.
    fn parse_lambda(&mut self) -> BindResult<Option<Expr>> {
        let is_lambda = match (self.peek_kind(), self.peek_kind_at(1)) {
            (TokenKind::Identifier(_), TokenKind::Arrow) => true,
            (TokenKind::LeftParen, _) => {
                let mut i = 1;
                loop {
                    match self.peek_kind_at(i) {
                        TokenKind::Identifier(_) | TokenKind::Comma => i += 1,
                        TokenKind::RightParen => break self.peek_kind_at(i + 1) == &TokenKind::Arrow,
                        _ => break false,
                    }
                }
            }
            _ => false,
        };
        if !is_lambda {
            return Ok(None);
        }

        let start_span = self.peek().span;
        let mut params = vec![];
        if self.eat(&TokenKind::LeftParen) {
            while !self.eat(&TokenKind::RightParen) {
                let tok = self.advance();
                match tok.kind {
                    TokenKind::Identifier(name) => params.push(LambdaParam {
                        name,
                        span: tok.span,
                    }),
                    TokenKind::Comma => {}
                    _ => return Err(self.unexpected(&["identifier", "')'"])),
                }
            }
        } else {
            let tok = self.advance();
            if let TokenKind::Identifier(name) = tok.kind {
                params.push(LambdaParam {
                    name,
                    span: tok.span,
                });
            }
        }
        self.expect(TokenKind::Arrow, &["'->'"])?;
        let body = self.parse_null_coalesce(Restrictions::empty())?;
        let span = start_span.extend_to(&body.span);
        Ok(Some(self.mk_expr(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        )))
    }

    /// `??` binds loosest of all operators and associates to the right.
    fn parse_null_coalesce(&mut self, ctx: Restrictions) -> BindResult<Expr> {
        let lhs = self.parse_ternary(ctx)?;
        if self.eat(&TokenKind::QuestionQuestion) {
            let rhs = self.parse_null_coalesce(ctx)?;
            let span = lhs.span.extend_to(&rhs.span);
            Ok(self.mk_expr(
                ExprKind::NullCoalesce {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            ))
        } else {
            Ok(lhs)
        }
    }

    fn parse_ternary(&mut self, ctx: Restrictions) -> BindResult<Expr> {
        let cond = self.parse_infix(InfixOp::Or.precedence(), ctx)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_ternary(ctx)?;
        self.expect(TokenKind::Colon, &["':'"])?;
        let otherwise = self.parse_ternary(ctx)?;
        let span = cond.span.extend_to(&otherwise.span);
        Ok(self.mk_expr(
            ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        ))
    }

    fn parse_infix(&mut self, min_prec: usize, ctx: Restrictions) -> BindResult<Expr> {
        let mut lhs = self.parse_prefix(ctx)?;

        loop {
            // instanceof sits at the relational level.
            if self.peek_kind() == &TokenKind::InstanceOf {
                if InfixOp::Lt.precedence() < min_prec {
                    break;
                }
                self.advance();
                let (type_str, type_span) = self.parse_type_name()?;
                let span = lhs.span.extend_to(&type_span);
                lhs = self.mk_expr(
                    ExprKind::InstanceOf {
                        expr: Box::new(lhs),
                        type_str,
                    },
                    span,
                );
                continue;
            }

            let op = match self.peek_infix_op() {
                Some(op) if op.precedence() >= min_prec => op,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_infix(op.precedence() + 1, ctx)?;
            let span = lhs.span.extend_to(&rhs.span);
            lhs = self.mk_expr(
                ExprKind::BinOp {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    op,
                },
                span,
            );
        }

        Ok(lhs)
    }

    fn peek_infix_op(&self) -> Option<InfixOp> {
        use TokenKind::*;
        Some(match self.peek_kind() {
            Asterisk => InfixOp::Mul,
            Slash => InfixOp::Div,
            Percent => InfixOp::Mod,
            Plus => InfixOp::Add,
            Minus => InfixOp::Sub,
            ShiftLeft => InfixOp::ShiftLeft,
            ShiftRight => InfixOp::ShiftRight,
            UnsignedShiftRight => InfixOp::UnsignedShiftRight,
            Lt => InfixOp::Lt,
            LtEq => InfixOp::LtEq,
            Gt => InfixOp::Gt,
            GtEq => InfixOp::GtEq,
            EqEq => InfixOp::Eq,
            NotEq => InfixOp::NotEq,
            Ampersand => InfixOp::BitAnd,
            Caret => InfixOp::BitXor,
            Pipe => InfixOp::BitOr,
            AmpAmp => InfixOp::And,
            PipePipe => InfixOp::Or,
            _ => return None,
        })
    }

    fn parse_prefix(&mut self, ctx: Restrictions) -> BindResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Exclamation => Some(PrefixOp::Not),
            TokenKind::Minus => Some(PrefixOp::Negative),
            TokenKind::Tilde => Some(PrefixOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let op_span = self.advance().span;
            let expr = self.parse_prefix(ctx)?;
            let span = op_span.extend_to(&expr.span);
            Ok(self.mk_expr(
                ExprKind::UnaryOp {
                    expr: Box::new(expr),
                    op,
                },
                span,
            ))
        } else {
            self.parse_postfix(ctx)
        }
    }

    fn parse_postfix(&mut self, ctx: Restrictions) -> BindResult<Expr> {
        let mut expr = self.parse_primary(ctx)?;

        loop {
            if self.eat(&TokenKind::Dot) {
                let tok = self.expect_identifier()?;
                let (name, name_span) = tok;
                if self.eat(&TokenKind::LeftParen) {
                    let args = self.parse_args(ctx)?;
                    let end = self.peek().span;
                    let span = expr.span.extend_to(&end);
                    expr = self.mk_expr(
                        ExprKind::MethodCall {
                            target: Box::new(expr),
                            name,
                            name_span,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.extend_to(&name_span);
                    expr = self.mk_expr(
                        ExprKind::FieldAccess {
                            target: Box::new(expr),
                            name,
                            name_span,
                        },
                        span,
                    );
                }
            } else if self.eat(&TokenKind::ColonColon) {
                let (name, name_span) = self.expect_identifier()?;
                let span = expr.span.extend_to(&name_span);
                expr = self.mk_expr(
                    ExprKind::MethodRef {
                        target: Box::new(expr),
                        name,
                    },
                    span,
                );
            } else if self.eat(&TokenKind::LeftBracket) {
                let index = self.parse_null_coalesce(ctx)?;
                let close = self.expect(TokenKind::RightBracket, &["']'"])?;
                let span = expr.span.extend_to(&close.span);
                expr = self.mk_expr(
                    ExprKind::Bracket {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn expect_identifier(&mut self) -> BindResult<(String, Span)> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let tok = self.advance();
                Ok((name, tok.span))
            }
            _ => Err(self.unexpected(&["identifier"])),
        }
    }

    fn parse_args(&mut self, ctx: Restrictions) -> BindResult<Vec<Expr>> {
        let mut args = vec![];
        if self.eat(&TokenKind::RightParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_null_coalesce(ctx)?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RightParen, &["','", "')'"])?;
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self, ctx: Restrictions) -> BindResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Identifier(name), tok.span))
            }
            TokenKind::Integer { suffix, .. } => {
                self.advance();
                let text = tok.kind.text();
                let lit = match suffix {
                    Some(_) => Literal::Long(text.trim_end_matches(|c| c == 'l' || c == 'L').into()),
                    None => Literal::Int(text),
                };
                Ok(self.mk_expr(ExprKind::Literal(lit), tok.span))
            }
            TokenKind::Float { value, suffix } => {
                self.advance();
                let lit = match suffix {
                    Some('d') | Some('D') => Literal::Double(value),
                    _ => Literal::Float(value),
                };
                Ok(self.mk_expr(ExprKind::Literal(lit), tok.span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Str(s)), tok.span))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Char(c)), tok.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Bool(true)), tok.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Bool(false)), tok.span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(self.mk_expr(ExprKind::Literal(Literal::Null), tok.span))
            }
            TokenKind::LeftParen => {
                if let Some(expr) = self.parse_cast(ctx)? {
                    return Ok(expr);
                }
                let open = self.advance();
                let inner = self.parse_null_coalesce(ctx)?;
                let close = self.expect(TokenKind::RightParen, &["')'"])?;
                let span = open.span.extend_to(&close.span);
                Ok(self.mk_expr(ExprKind::Grouping(Box::new(inner)), span))
            }
            _ => Err(self.unexpected(EXPR_START)),
        }
    }

    /// `(com.example.User) expr` — only treated as a cast when the parens
    /// hold a dotted name and the next token can start an operand.
    fn parse_cast(&mut self, ctx: Restrictions) -> BindResult<Option<Expr>> {
        let mut i = 1;
        loop {
            match self.peek_kind_at(i) {
                TokenKind::Identifier(_) | TokenKind::Dot => i += 1,
                TokenKind::RightParen if i > 1 => break,
                _ => return Ok(None),
            }
        }
        let operand_follows = matches!(
            self.peek_kind_at(i + 1),
            TokenKind::Identifier(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Integer { .. }
                | TokenKind::Float { .. }
                | TokenKind::LeftParen
        );
        if !operand_follows {
            return Ok(None);
        }

        let open = self.advance();
        let (type_str, _) = self.parse_type_name()?;
        self.expect(TokenKind::RightParen, &["')'"])?;
        let expr = self.parse_prefix(ctx)?;
        let span = open.span.extend_to(&expr.span);
        Ok(Some(self.mk_expr(
            ExprKind::Cast {
                type_str,
                expr: Box::new(expr),
            },
            span,
        )))
    }

    fn parse_type_name(&mut self) -> BindResult<(String, Span)> {
        let (first, mut span) = self.expect_identifier()?;
        let mut name = first;
        while self.peek_kind() == &TokenKind::Dot
            && matches!(self.peek_kind_at(1), TokenKind::Identifier(_))
        {
            self.advance();
            let (part, part_span) = self.expect_identifier()?;
            name.push('.');
            name.push_str(&part);
            span = span.extend_to(&part_span);
        }
        Ok((name, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Expr {
        Parser::parse(src, PathBuf::from("test.xml"), Pos::new(), 0).unwrap()
    }

    fn parse_err(src: &str) -> BindError {
        Parser::parse(src, PathBuf::from("test.xml"), Pos::new(), 0).unwrap_err()
    }

    #[test]
    fn member_access_binds_tighter_than_binops() {
        let expr = parse("user.age + 1");
        match &expr.kind {
            ExprKind::BinOp { lhs, op, .. } => {
                assert_eq!(*op, InfixOp::Add);
                assert!(matches!(lhs.kind, ExprKind::FieldAccess { .. }));
            }
            other => panic!("expected binop, got {:?}", other.desc()),
        }
    }

    #[test]
    fn precedence_mul_over_add() {
        assert_eq!(parse("a + b * c").to_string(), "a + b * c");
        match &parse("a + b * c").kind {
            ExprKind::BinOp { op, rhs, .. } => {
                assert_eq!(*op, InfixOp::Add);
                assert!(matches!(
                    rhs.kind,
                    ExprKind::BinOp {
                        op: InfixOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binop, got {:?}", other.desc()),
        }
    }

    #[test]
    fn null_coalesce_binds_looser_than_ternary() {
        // (a ? b : c) ?? d
        let expr = parse("a ? b : c ?? d");
        match &expr.kind {
            ExprKind::NullCoalesce { lhs, .. } => {
                assert!(matches!(lhs.kind, ExprKind::Ternary { .. }));
            }
            other => panic!("expected null coalesce at root, got {:?}", other.desc()),
        }
    }

    #[test]
    fn ternary_nests_in_branches() {
        let expr = parse("a ? b ? c : d : e");
        match &expr.kind {
            ExprKind::Ternary { then, .. } => {
                assert!(matches!(then.kind, ExprKind::Ternary { .. }));
            }
            other => panic!("expected ternary, got {:?}", other.desc()),
        }
    }

    #[test]
    fn method_calls_and_brackets() {
        let expr = parse("map[`key`].toString()");
        match &expr.kind {
            ExprKind::MethodCall { target, name, .. } => {
                assert_eq!(name, "toString");
                assert!(matches!(target.kind, ExprKind::Bracket { .. }));
            }
            other => panic!("expected method call, got {:?}", other.desc()),
        }
    }

    #[test]
    fn lambda_with_params() {
        let expr = parse("(v, pos) -> handler.onClick(v)");
        match &expr.kind {
            ExprKind::Lambda { params, body } => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].name, "v");
                assert!(matches!(body.kind, ExprKind::MethodCall { .. }));
            }
            other => panic!("expected lambda, got {:?}", other.desc()),
        }
    }

    #[test]
    fn parenthesized_expr_is_not_a_lambda() {
        let expr = parse("(a)");
        assert!(matches!(expr.kind, ExprKind::Grouping(_)));
    }

    #[test]
    fn cast_of_dotted_type() {
        let expr = parse("(java.lang.String) value");
        match &expr.kind {
            ExprKind::Cast { type_str, expr } => {
                assert_eq!(type_str, "java.lang.String");
                assert!(matches!(expr.kind, ExprKind::Identifier(_)));
            }
            other => panic!("expected cast, got {:?}", other.desc()),
        }
    }

    #[test]
    fn instanceof_parses_at_relational_level() {
        let expr = parse("obj instanceof java.util.List && flag");
        match &expr.kind {
            ExprKind::BinOp { lhs, op, .. } => {
                assert_eq!(*op, InfixOp::And);
                assert!(matches!(lhs.kind, ExprKind::InstanceOf { .. }));
            }
            other => panic!("expected binop, got {:?}", other.desc()),
        }
    }

    #[test]
    fn instanceof_applies_to_the_whole_additive_operand() {
        // additive binds tighter: (a + b) instanceof T
        let expr = parse("a + b instanceof java.util.List");
        match &expr.kind {
            ExprKind::InstanceOf { expr: inner, type_str } => {
                assert_eq!(type_str, "java.util.List");
                assert!(matches!(
                    inner.kind,
                    ExprKind::BinOp {
                        op: InfixOp::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected instanceof at root, got {:?}", other.desc()),
        }
    }

    #[test]
    fn syntax_error_names_token_and_expected_set() {
        let err = parse_err("user.");
        assert_eq!(
            err.msg,
            "unexpected token '<end of expression>', expected one of: identifier"
        );
        let err = parse_err("* user");
        assert_eq!(
            err.msg,
            "unexpected token '*', expected one of: identifier, literal, '(', '!', '-', '~'"
        );
    }

    #[test]
    fn syntax_error_offsets_slice_the_source() {
        let src = "user. + name";
        let err = parse_err(src);
        let span = err.src[0].span.unwrap();
        assert_eq!(&src[span.start.offset..span.end.offset], "+");
    }

    #[test]
    fn default_clause_is_accepted_and_dropped() {
        let expr = parse("user.name, default=`loading`");
        assert!(matches!(expr.kind, ExprKind::FieldAccess { .. }));
        let err = parse_err("user.name, default");
        assert_eq!(err.msg, "unexpected token '<end of expression>', expected one of: '='");
        let err = parse_err("user.name, fallback=`x`");
        assert_eq!(err.msg, "unexpected token 'fallback', expected one of: 'default'");
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse_err("a b");
        assert_eq!(
            err.msg,
            "unexpected token 'b', expected one of: an operator, <end of expression>"
        );
    }
}
