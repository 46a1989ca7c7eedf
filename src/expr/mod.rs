mod ast;
mod lexer;
mod parser;
mod token;

pub use ast::{Expr, ExprKind, InfixOp, LambdaParam, Literal, PrefixOp};
pub use lexer::Lexer;
pub use parser::{Parser, Restrictions};
pub use token::{IntegerBase, Token, TokenKind};

use crate::errors::BindResult;
use crate::span::Pos;
use std::path::Path;

/// Parse one attribute expression. `start` is the position of the first
/// character after the `@{` / `@={` wrapper in the containing file.
pub fn parse_expression(src: &str, filepath: &Path, start: Pos) -> BindResult<Expr> {
    Parser::parse(src, filepath.to_path_buf(), start, 0)
}

/// Like [`parse_expression`] but numbering nodes from `first_id`, for
/// callers collecting several expressions into one id-keyed table.
pub fn parse_expression_from(
    src: &str,
    filepath: &Path,
    start: Pos,
    first_id: usize,
) -> BindResult<Expr> {
    Parser::parse(src, filepath.to_path_buf(), start, first_id)
}
