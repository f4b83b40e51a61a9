/// AST → SQL compiler.
///
/// Converts the expression tree into SQL text. Bound values become
/// placeholders in the style of the target database and are collected, in
/// textual order, into `CompiledQuery::bindings`.
use anyhow::{anyhow, Result};
use serde_json::Value;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser as SqlParser;

use super::types::*;
use crate::dialect::DialectKind;

/// How bound values are written into the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite, most drivers)
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
    /// Values rendered as SQL literals. For display only.
    Inline,
}

impl PlaceholderStyle {
    pub fn for_dialect(dialect: DialectKind) -> Self {
        match dialect {
            DialectKind::SqlOperator => PlaceholderStyle::Numbered,
            _ => PlaceholderStyle::QuestionMark,
        }
    }
}

/// SQL text plus the values its placeholders refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

/// Compile a full SELECT.
pub fn compile_select(select: &SelectQuery, style: PlaceholderStyle) -> CompiledQuery {
    let mut compiler = Compiler::new(style);
    let sql = compiler.select(select);
    compiler.finish(sql)
}

/// Compile a single expression, e.g. one fragment for logging or tests.
pub fn compile_expression(expr: &Expression, style: PlaceholderStyle) -> CompiledQuery {
    let mut compiler = Compiler::new(style);
    let sql = compiler.expr(expr);
    compiler.finish(sql)
}

/// Compile a single ORDER BY item.
pub fn compile_order(order: &OrderByExpr, style: PlaceholderStyle) -> CompiledQuery {
    let mut compiler = Compiler::new(style);
    let sql = compiler.order_by(order);
    compiler.finish(sql)
}

/// Compile a single projection item.
pub fn compile_projection(item: &SelectItem, style: PlaceholderStyle) -> CompiledQuery {
    let mut compiler = Compiler::new(style);
    let sql = compiler.select_item(item);
    compiler.finish(sql)
}

/// Check that `sql` parses in the SQL dialect matching `dialect`.
pub fn validate(sql: &str, dialect: DialectKind) -> Result<()> {
    let parser_dialect: Box<dyn Dialect> = match dialect {
        DialectKind::SqlFunction => Box::new(MySqlDialect {}),
        DialectKind::SqlOperator => Box::new(PostgreSqlDialect {}),
        DialectKind::Document | DialectKind::Generic => Box::new(GenericDialect {}),
    };
    SqlParser::parse_sql(parser_dialect.as_ref(), sql)
        .map(|_| ())
        .map_err(|e| anyhow!("SQL parse error: {}", e))
}

struct Compiler {
    style: PlaceholderStyle,
    bindings: Vec<Value>,
}

impl Compiler {
    fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            bindings: Vec::new(),
        }
    }

    fn finish(self, sql: String) -> CompiledQuery {
        CompiledQuery {
            sql,
            bindings: self.bindings,
        }
    }

    fn select(&mut self, select: &SelectQuery) -> String {
        let mut parts = Vec::new();

        let mut select_clause = String::from("SELECT ");
        if select.projections.is_empty() {
            select_clause.push('*');
        } else {
            let items: Vec<String> = select
                .projections
                .iter()
                .map(|item| self.select_item(item))
                .collect();
            select_clause.push_str(&items.join(", "));
        }
        parts.push(select_clause);

        if !select.from.is_empty() {
            let tables: Vec<String> = select.from.iter().map(compile_table_ref).collect();
            parts.push(format!("FROM {}", tables.join(", ")));
        }

        if let Some(ref filter) = select.filter {
            let filter = self.expr(filter);
            parts.push(format!("WHERE {}", filter));
        }

        if !select.order_by.is_empty() {
            let orders: Vec<String> = select.order_by.iter().map(|o| self.order_by(o)).collect();
            parts.push(format!("ORDER BY {}", orders.join(", ")));
        }

        parts.join(" ")
    }

    fn select_item(&mut self, item: &SelectItem) -> String {
        match item {
            SelectItem::Wildcard => "*".to_string(),
            SelectItem::Expression { expr, alias } => {
                let expr_str = self.expr(expr);
                match alias {
                    Some(a) => format!("{} AS {}", expr_str, a),
                    None => expr_str,
                }
            }
        }
    }

    fn order_by(&mut self, order: &OrderByExpr) -> String {
        let mut s = self.expr(&order.expr);
        match order.asc {
            Some(true) => s.push_str(" ASC"),
            Some(false) => s.push_str(" DESC"),
            None => {}
        }
        s
    }

    fn expr(&mut self, expr: &Expression) -> String {
        match expr {
            Expression::Column { table, name } => match table {
                Some(t) => format!("{}.{}", t, name),
                None => name.clone(),
            },
            Expression::Literal(lit) => compile_literal(lit),
            Expression::Bind(value) => self.bind(value),
            Expression::BinaryOp { left, op, right } => {
                let op_str = match op {
                    BinaryOperator::Eq => "=",
                    BinaryOperator::NotEq => "<>",
                    BinaryOperator::Lt => "<",
                    BinaryOperator::LtEq => "<=",
                    BinaryOperator::Gt => ">",
                    BinaryOperator::GtEq => ">=",
                    BinaryOperator::And => "AND",
                    BinaryOperator::Custom(op) => op.as_str(),
                };
                let left = self.expr(left);
                let right = self.expr(right);
                format!("{} {} {}", left, op_str, right)
            }
            Expression::Function { name, args } => {
                let args_str: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", name, args_str.join(", "))
            }
            Expression::Like {
                expr,
                pattern,
                escape,
            } => {
                let target = self.expr(expr);
                let pattern = self.expr(pattern);
                format!(
                    "{} LIKE {} ESCAPE {}",
                    target,
                    pattern,
                    quote(&escape.to_string())
                )
            }
            Expression::InList { expr, list } => {
                let target = self.expr(expr);
                let items: Vec<String> = list.iter().map(|e| self.expr(e)).collect();
                format!("{} IN ({})", target, items.join(", "))
            }
            Expression::IsNotNull(expr) => format!("{} IS NOT NULL", self.expr(expr)),
            Expression::JsonAccess {
                expr,
                path,
                as_text,
            } => {
                let op = if *as_text { "->>" } else { "->" };
                let target = self.expr(expr);
                let path = self.expr(path);
                format!("{}{}{}", target, op, path)
            }
            Expression::Nested(expr) => format!("({})", self.expr(expr)),
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        match self.style {
            PlaceholderStyle::QuestionMark => {
                self.bindings.push(value.clone());
                "?".to_string()
            }
            PlaceholderStyle::Numbered => {
                self.bindings.push(value.clone());
                format!("${}", self.bindings.len())
            }
            PlaceholderStyle::Inline => compile_value(value),
        }
    }
}

fn compile_table_ref(table: &TableRef) -> String {
    match &table.schema {
        Some(sc) => format!("{}.{}", sc, table.name),
        None => table.name.clone(),
    }
}

fn compile_literal(lit: &Literal) -> String {
    match lit {
        Literal::Boolean(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Literal::Integer(i) => i.to_string(),
        Literal::String(s) => quote(s),
    }
}

fn compile_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => compile_literal(&Literal::Boolean(*b)),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_query() -> SelectQuery {
        SelectQuery {
            projections: vec![SelectItem::Wildcard],
            from: vec![TableRef::named("users")],
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_simple_select() {
        let compiled = compile_select(&users_query(), PlaceholderStyle::QuestionMark);
        assert_eq!(compiled.sql, "SELECT * FROM users");
        assert!(compiled.bindings.is_empty());
    }

    #[test]
    fn test_empty_projection_compiles_to_star() {
        let q = SelectQuery {
            from: vec![TableRef::named("users")],
            ..Default::default()
        };
        let compiled = compile_select(&q, PlaceholderStyle::QuestionMark);
        assert_eq!(compiled.sql, "SELECT * FROM users");
    }

    #[test]
    fn test_question_mark_bindings_in_order() {
        let mut q = users_query();
        q.and_where(Expression::binary(
            Expression::column(None, "a"),
            BinaryOperator::Eq,
            Expression::Bind(json!("x")),
        ));
        q.and_where(Expression::binary(
            Expression::column(None, "b"),
            BinaryOperator::Gt,
            Expression::Bind(json!(3)),
        ));
        let compiled = compile_select(&q, PlaceholderStyle::QuestionMark);
        assert_eq!(compiled.sql, "SELECT * FROM users WHERE a = ? AND b > ?");
        assert_eq!(compiled.bindings, vec![json!("x"), json!(3)]);
    }

    #[test]
    fn test_numbered_placeholders() {
        let expr = Expression::InList {
            expr: Box::new(Expression::column(None, "status")),
            list: vec![Expression::Bind(json!("a")), Expression::Bind(json!("b"))],
        };
        let compiled = compile_expression(&expr, PlaceholderStyle::Numbered);
        assert_eq!(compiled.sql, "status IN ($1, $2)");
        assert_eq!(compiled.bindings.len(), 2);
    }

    #[test]
    fn test_inline_renders_literals() {
        let expr = Expression::binary(
            Expression::column(None, "name"),
            BinaryOperator::Eq,
            Expression::Bind(json!("O'Brien")),
        );
        let compiled = compile_expression(&expr, PlaceholderStyle::Inline);
        assert_eq!(compiled.sql, "name = 'O''Brien'");
        assert!(compiled.bindings.is_empty());
    }

    #[test]
    fn test_json_access_chain() {
        let expr = Expression::JsonAccess {
            expr: Box::new(Expression::JsonAccess {
                expr: Box::new(Expression::column(None, "meta")),
                path: Box::new(Expression::string("profile")),
                as_text: false,
            }),
            path: Box::new(Expression::string("country")),
            as_text: true,
        };
        let compiled = compile_expression(&expr, PlaceholderStyle::Numbered);
        assert_eq!(compiled.sql, "meta->'profile'->>'country'");
    }

    #[test]
    fn test_order_by_direction() {
        let mut q = users_query();
        q.order_by.push(OrderByExpr {
            expr: Expression::column(None, "name"),
            asc: Some(false),
        });
        let compiled = compile_select(&q, PlaceholderStyle::QuestionMark);
        assert_eq!(compiled.sql, "SELECT * FROM users ORDER BY name DESC");
    }

    #[test]
    fn test_like_carries_escape_clause() {
        let expr = Expression::Like {
            expr: Box::new(Expression::column(None, "code")),
            pattern: Box::new(Expression::Bind(json!("%a!_b%"))),
            escape: '!',
        };
        let compiled = compile_expression(&expr, PlaceholderStyle::QuestionMark);
        assert_eq!(compiled.sql, "code LIKE ? ESCAPE '!'");
        assert_eq!(compiled.bindings, vec![json!("%a!_b%")]);

        let sql = format!("SELECT * FROM users WHERE {}", compiled.sql);
        assert!(validate(&sql, DialectKind::Generic).is_ok());
        assert!(validate(&sql, DialectKind::SqlFunction).is_ok());
        assert!(validate(&sql.replace('?', "$1"), DialectKind::SqlOperator).is_ok());
    }

    #[test]
    fn test_validate_round_trip() {
        let mut q = users_query();
        q.and_where(Expression::always_false());
        let compiled = compile_select(&q, PlaceholderStyle::QuestionMark);
        assert!(validate(&compiled.sql, DialectKind::SqlFunction).is_ok());
        assert!(validate(&compiled.sql, DialectKind::Generic).is_ok());
        assert!(validate("SELECT * FROM users WHERE", DialectKind::Generic).is_err());
    }
}
