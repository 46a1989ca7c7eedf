use std::fmt;

use crate::span::Span;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrefixOp {
    Not,
    Negative,
    BitNot,
}

impl PrefixOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            PrefixOp::Not => "!",
            PrefixOp::Negative => "-",
            PrefixOp::BitNot => "~",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InfixOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl InfixOp {
    /// Binding strength; higher binds tighter. The ternary sits below `Or`
    /// and `??` below the ternary.
    pub fn precedence(&self) -> usize {
        use InfixOp::*;
        match self {
            Or => 3,
            And => 4,
            BitOr => 5,
            BitXor => 6,
            BitAnd => 7,
            Eq | NotEq => 8,
            Lt | LtEq | Gt | GtEq => 9,
            ShiftLeft | ShiftRight | UnsignedShiftRight => 10,
            Add | Sub => 11,
            Mul | Div | Mod => 12,
        }
    }

    pub fn symbol(&self) -> &'static str {
        use InfixOp::*;
        match self {
            Mul => "*",
            Div => "/",
            Mod => "%",
            Add => "+",
            Sub => "-",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            UnsignedShiftRight => ">>>",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            Eq => "==",
            NotEq => "!=",
            BitAnd => "&",
            BitXor => "^",
            BitOr => "|",
            And => "&&",
            Or => "||",
        }
    }

    pub fn is_comparison(&self) -> bool {
        use InfixOp::*;
        matches!(self, Lt | LtEq | Gt | GtEq | Eq | NotEq | And | Or)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(String),
    Long(String),
    Float(String),
    Double(String),
    Bool(bool),
    Str(String),
    Char(char),
    Null,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LambdaParam {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    Literal(Literal),
    /// `a.b` — resolution decides whether this is a field, a getter, or an
    /// observable unwrap.
    FieldAccess {
        target: Box<Expr>,
        name: String,
        name_span: Span,
    },
    MethodCall {
        target: Box<Expr>,
        name: String,
        name_span: Span,
        args: Vec<Expr>,
    },
    /// `handler::onClick`
    MethodRef {
        target: Box<Expr>,
        name: String,
    },
    BinOp {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        op: InfixOp,
    },
    UnaryOp {
        expr: Box<Expr>,
        op: PrefixOp,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    NullCoalesce {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        type_str: String,
    },
    Cast {
        type_str: String,
        expr: Box<Expr>,
    },
    Bracket {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: Box<Expr>,
    },
    Grouping(Box<Expr>),
}

impl ExprKind {
    pub fn desc(&self) -> &'static str {
        match self {
            ExprKind::Identifier(..) => "identifier",
            ExprKind::Literal(..) => "literal",
            ExprKind::FieldAccess { .. } => "field access",
            ExprKind::MethodCall { .. } => "method call",
            ExprKind::MethodRef { .. } => "method reference",
            ExprKind::BinOp { .. } => "binary operation",
            ExprKind::UnaryOp { .. } => "unary operation",
            ExprKind::Ternary { .. } => "ternary",
            ExprKind::NullCoalesce { .. } => "null coalescing",
            ExprKind::InstanceOf { .. } => "instanceof",
            ExprKind::Cast { .. } => "cast",
            ExprKind::Bracket { .. } => "bracket",
            ExprKind::Lambda { .. } => "lambda",
            ExprKind::Grouping(..) => "grouping",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub id: usize,
    pub span: Span,
}

impl Expr {
    /// Walk this expression and every sub-expression, outermost first.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Identifier(..) | ExprKind::Literal(..) => {}
            ExprKind::FieldAccess { target, .. } | ExprKind::MethodRef { target, .. } => {
                target.walk(f)
            }
            ExprKind::MethodCall { target, args, .. } => {
                target.walk(f);
                for arg in args {
                    arg.walk(f);
                }
            }
            ExprKind::BinOp { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::UnaryOp { expr, .. }
            | ExprKind::Cast { expr, .. }
            | ExprKind::InstanceOf { expr, .. }
            | ExprKind::Grouping(expr) => expr.walk(f),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.walk(f);
                otherwise.walk(f);
            }
            ExprKind::NullCoalesce { lhs, rhs } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::Bracket { target, index } => {
                target.walk(f);
                index.walk(f);
            }
            ExprKind::Lambda { body, .. } => body.walk(f),
        }
    }

    /// The dotted name this expression spells, if it is a plain identifier
    /// chain like `com.example.User` or `user.name`.
    pub fn as_dotted_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name.clone()),
            ExprKind::FieldAccess { target, name, .. } => {
                target.as_dotted_name().map(|t| format!("{}.{}", t, name))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => write!(f, "{}", name),
            ExprKind::Literal(lit) => match lit {
                Literal::Int(v) | Literal::Float(v) | Literal::Double(v) => write!(f, "{}", v),
                Literal::Long(v) => write!(f, "{}L", v),
                Literal::Bool(b) => write!(f, "{}", b),
                Literal::Str(s) => write!(f, "`{}`", s),
                Literal::Char(c) => write!(f, "'{}'", c),
                Literal::Null => write!(f, "null"),
            },
            ExprKind::FieldAccess { target, name, .. } => write!(f, "{}.{}", target, name),
            ExprKind::MethodCall {
                target, name, args, ..
            } => {
                write!(f, "{}.{}(", target, name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::MethodRef { target, name } => write!(f, "{}::{}", target, name),
            ExprKind::BinOp { lhs, rhs, op } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            ExprKind::UnaryOp { expr, op } => write!(f, "{}{}", op.symbol(), expr),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => write!(f, "{} ? {} : {}", cond, then, otherwise),
            ExprKind::NullCoalesce { lhs, rhs } => write!(f, "{} ?? {}", lhs, rhs),
            ExprKind::InstanceOf { expr, type_str } => {
                write!(f, "{} instanceof {}", expr, type_str)
            }
            ExprKind::Cast { type_str, expr } => write!(f, "({}) {}", type_str, expr),
            ExprKind::Bracket { target, index } => write!(f, "{}[{}]", target, index),
            ExprKind::Lambda { params, body } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.name)?;
                }
                write!(f, ") -> {}", body)
            }
            ExprKind::Grouping(expr) => write!(f, "({})", expr),
        }
    }
}
