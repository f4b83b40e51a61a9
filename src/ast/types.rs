//! SQL expression types emitted by the dialect adapters.
//!
//! This is a deliberately small tree: enough to express JSON extraction,
//! comparisons, membership, null checks, ordering and projections. Values
//! supplied by callers only ever appear as `Expression::Bind`, which the
//! compiler turns into a placeholder plus a positional binding.

use serde_json::Value;

/// A SELECT query assembled from raw fragments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub projections: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub filter: Option<Expression>,
    pub order_by: Vec<OrderByExpr>,
}

impl SelectQuery {
    /// AND the given predicate onto the existing filter.
    pub fn and_where(&mut self, predicate: Expression) {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Expression::BinaryOp {
                left: Box::new(existing),
                op: BinaryOperator::And,
                right: Box::new(predicate),
            },
            None => predicate,
        });
    }
}

/// A single item in the SELECT projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// An expression, optionally aliased: `expr AS alias`.
    Expression {
        expr: Expression,
        alias: Option<String>,
    },
}

/// Table reference in FROM clause: `schema.table`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }
}

/// Core expression type. Recursive to support arbitrary nesting.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Column reference: `table.column` or just `column`.
    Column { table: Option<String>, name: String },
    /// Literal written into the SQL text. Only used for structural pieces
    /// (JSON path strings, key names, constants), never for caller values.
    Literal(Literal),
    /// Caller-supplied value, emitted as a placeholder.
    Bind(Value),
    /// Binary operation: `left op right`.
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// Function call: `name(args)`.
    Function { name: String, args: Vec<Expression> },
    /// `expr LIKE pattern ESCAPE 'c'`.
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        escape: char,
    },
    /// expr IN (values).
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
    },
    /// expr IS NOT NULL.
    IsNotNull(Box<Expression>),
    /// JSON access: `expr->key`, `expr->>key`.
    JsonAccess {
        expr: Box<Expression>,
        path: Box<Expression>,
        as_text: bool,
    },
    /// Nested expression (parenthesized).
    Nested(Box<Expression>),
}

impl Expression {
    pub fn column(table: Option<&str>, name: &str) -> Self {
        Expression::Column {
            table: table.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    pub fn function(name: &str, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.to_string(),
            args,
        }
    }

    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// `1 = 0`, a predicate no row satisfies.
    pub fn always_false() -> Self {
        Expression::binary(
            Expression::Literal(Literal::Integer(1)),
            BinaryOperator::Eq,
            Expression::Literal(Literal::Integer(0)),
        )
    }
}

/// Literal values in SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    String(String),
}

/// Binary operators.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    /// Operator text passed through verbatim.
    Custom(String),
}

/// ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expression,
    pub asc: Option<bool>,
}
