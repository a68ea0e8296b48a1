use crate::error::Span;
use std::fmt;

/// Literal constants as they appear in source.
///
/// Kept separate from runtime values so a parsed tree holds no host
/// handles and can be shared between threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    /// `&&` and `||`, kept apart from `Binary` because the right side is
    /// evaluated lazily.
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        span: Span,
    },
    Accessor {
        target: Box<Expr>,
        name: String,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Subscript {
        target: Box<Expr>,
        index: Index,
        span: Span,
    },
}

/// Contents of `[...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    Single(Box<Expr>),
    /// `[start:stop:step]`; a missing component means "use the default".
    Slice {
        start: Option<Box<Expr>>,
        stop: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Accessor { span, .. }
            | Expr::Call { span, .. }
            | Expr::Subscript { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDivide => "//",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Fully parenthesized rendering, used by `--ast` and in tests to check
/// how a source string was grouped.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{}", value),
            Expr::Identifier { name, .. } => write!(f, "{}", name),
            Expr::Unary { operator, operand, .. } => write!(f, "({}{})", operator.symbol(), operand),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => write!(f, "({} ? {} : {})", condition, then_branch, else_branch),
            Expr::Accessor { target, name, .. } => write!(f, "{}.{}", target, name),
            Expr::Call { callee, args, .. } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Subscript { target, index, .. } => match index {
                Index::Single(index) => write!(f, "{}[{}]", target, index),
                Index::Slice { start, stop, step } => {
                    write!(f, "{}[", target)?;
                    if let Some(start) = start {
                        write!(f, "{}", start)?;
                    }
                    write!(f, ":")?;
                    if let Some(stop) = stop {
                        write!(f, "{}", stop)?;
                    }
                    if let Some(step) = step {
                        write!(f, ":{}", step)?;
                    }
                    write!(f, "]")
                }
            },
        }
    }
}
