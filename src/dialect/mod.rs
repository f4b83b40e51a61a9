/// Dialect adapters: one translation of the six JSON operations per store.
///
/// ```text
/// KeyPath + arguments
///       ↓
/// DialectAdapter       (mysql.rs, postgres.rs, document.rs, generic.rs)
///       ↓
/// Fragment             (SQL expression tree or document clause)
/// ```
///
/// The registry (registry.rs) decides which adapter a connection gets.
/// Adapters are pure: they never see the query object, only the path and
/// arguments, so the same fragment can be logged, tested, or merged.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ast::compiler::{compile_expression, compile_order, compile_projection, PlaceholderStyle};
use crate::ast::types::{BinaryOperator, Expression, OrderByExpr, SelectItem};
use crate::connection::ConnectionInfo;
use crate::error::{JsonFilterError, JsonResult};
use crate::path::KeyPath;

pub mod document;
pub mod generic;
pub mod mysql;
pub mod postgres;
pub mod registry;

pub use document::DocumentAdapter;
pub use generic::GenericAdapter;
pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;
pub use registry::{global, install_global, AdapterRegistry, AliasAdapter};

/// Closed set of syntax families an adapter can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialectKind {
    /// Function-call extraction: `JSON_EXTRACT(col, '$.a.b')`.
    SqlFunction,
    /// Operator-chain extraction: `col->'a'->>'b'`.
    SqlOperator,
    /// Dot-notation addressing, no extraction step.
    Document,
    /// Root column only; nested segments are ignored.
    Generic,
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialectKind::SqlFunction => "sql-function",
            DialectKind::SqlOperator => "sql-operator",
            DialectKind::Document => "document",
            DialectKind::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

/// Comparison operator accepted by `filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Unrecognized operator text, passed through verbatim on SQL dialects.
    Other(String),
}

impl ComparisonOp {
    pub fn parse(op: &str) -> Self {
        match op.trim() {
            "=" | "==" => ComparisonOp::Eq,
            "!=" | "<>" => ComparisonOp::NotEq,
            "<" => ComparisonOp::Lt,
            "<=" => ComparisonOp::LtEq,
            ">" => ComparisonOp::Gt,
            ">=" => ComparisonOp::GtEq,
            other => ComparisonOp::Other(other.to_string()),
        }
    }

    pub fn to_binary(&self) -> BinaryOperator {
        match self {
            ComparisonOp::Eq => BinaryOperator::Eq,
            ComparisonOp::NotEq => BinaryOperator::NotEq,
            ComparisonOp::Lt => BinaryOperator::Lt,
            ComparisonOp::LtEq => BinaryOperator::LtEq,
            ComparisonOp::Gt => BinaryOperator::Gt,
            ComparisonOp::GtEq => BinaryOperator::GtEq,
            ComparisonOp::Other(op) => BinaryOperator::Custom(op.clone()),
        }
    }

    /// Document-store query operator, if there is one.
    pub fn document_operator(&self) -> Option<&'static str> {
        match self {
            ComparisonOp::Eq => Some("$eq"),
            ComparisonOp::NotEq => Some("$ne"),
            ComparisonOp::Lt => Some("$lt"),
            ComparisonOp::LtEq => Some("$lte"),
            ComparisonOp::Gt => Some("$gt"),
            ComparisonOp::GtEq => Some("$gte"),
            ComparisonOp::Other(_) => None,
        }
    }
}

impl std::str::FromStr for ComparisonOp {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ComparisonOp::parse(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(direction: &str) -> JsonResult<Self> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(JsonFilterError::InvalidDirection(direction.to_string())),
        }
    }

    pub fn is_ascending(self) -> bool {
        self == SortDirection::Asc
    }

    /// `1` / `-1`, as document stores spell it.
    pub fn as_document_order(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Native output of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Predicate for the WHERE clause.
    Filter(Expression),
    /// ORDER BY item.
    Order(OrderByExpr),
    /// Extra SELECT item.
    Projection(SelectItem),
    /// Document filter clause: `{address: condition}`.
    DocumentFilter(Map<String, Value>),
    DocumentSort {
        key: String,
        direction: SortDirection,
    },
    /// Document projection entry: `{key: spec}`.
    DocumentProjection { key: String, spec: Value },
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inline = PlaceholderStyle::Inline;
        match self {
            Fragment::Filter(expr) => write!(f, "{}", compile_expression(expr, inline).sql),
            Fragment::Order(order) => write!(f, "{}", compile_order(order, inline).sql),
            Fragment::Projection(item) => write!(f, "{}", compile_projection(item, inline).sql),
            Fragment::DocumentFilter(clause) => write!(f, "{}", Value::Object(clause.clone())),
            Fragment::DocumentSort { key, direction } => write!(f, "{} {}", key, direction),
            Fragment::DocumentProjection { key, spec } => write!(f, "{{{:?}: {}}}", key, spec),
        }
    }
}

/// Translation of the JSON operations into one store's native syntax.
///
/// Implementations must be stateless and cover every operation. When an
/// operation cannot be expressed they return
/// `JsonFilterError::DialectTranslation` instead of emitting something
/// approximately right.
///
/// # Example
///
/// ```ignore
/// struct SqliteAdapter;
///
/// impl DialectAdapter for SqliteAdapter {
///     fn name(&self) -> &str { "sqlite" }
///     fn dialect(&self) -> DialectKind { DialectKind::SqlFunction }
///     fn supports(&self, connection: &ConnectionInfo) -> bool {
///         connection.identity_contains(&["sqlite"])
///     }
///     // ... the six operations
/// }
/// ```
pub trait DialectAdapter: Send + Sync {
    /// Adapter identity. Registration deduplicates on this, so it must be
    /// the same for every instance of an adapter type.
    fn name(&self) -> &str;

    fn dialect(&self) -> DialectKind;

    /// Whether this adapter handles the given connection. Must be pure.
    fn supports(&self, connection: &ConnectionInfo) -> bool;

    fn filter(&self, path: &KeyPath, op: &ComparisonOp, value: &Value) -> JsonResult<Fragment>;

    /// Set membership. An empty `values` must yield a predicate that
    /// matches nothing, never a malformed fragment.
    fn where_in(&self, path: &KeyPath, values: &[Value]) -> JsonResult<Fragment>;

    fn contains(&self, path: &KeyPath, search: &str) -> JsonResult<Fragment>;

    fn exists(&self, path: &KeyPath) -> JsonResult<Fragment>;

    fn order_by(&self, path: &KeyPath, direction: SortDirection) -> JsonResult<Fragment>;

    fn select(&self, path: &KeyPath, alias: Option<&str>) -> JsonResult<Fragment>;

    /// Whether the query object must be put into "select all columns"
    /// before a fragment from this adapter is merged.
    fn needs_select_all(&self) -> bool {
        self.dialect() != DialectKind::Document
    }
}

/// Column expression for the root of a path, honoring `table.column`.
pub(crate) fn root_column(path: &KeyPath) -> Expression {
    match path.root().split_once('.') {
        Some((table, column)) => Expression::column(Some(table), column),
        None => Expression::column(None, path.root()),
    }
}

/// `expr IN (?, ?, ...)`, or `1 = 0` for an empty list.
pub(crate) fn in_list(expr: Expression, values: &[Value]) -> Expression {
    if values.is_empty() {
        return Expression::always_false();
    }
    Expression::InList {
        expr: Box::new(expr),
        list: values.iter().cloned().map(Expression::Bind).collect(),
    }
}

/// Escape character for `contains` patterns, always spelled out with
/// `ESCAPE` since SQLite has no default.
pub const LIKE_ESCAPE: char = '!';

/// `expr LIKE ? ESCAPE '!'` bound to `%search%`, with LIKE wildcards in
/// `search` escaped.
pub(crate) fn like_contains(expr: Expression, search: &str) -> Expression {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    Expression::Like {
        expr: Box::new(expr),
        pattern: Box::new(Expression::Bind(Value::String(pattern))),
        escape: LIKE_ESCAPE,
    }
}

pub(crate) fn compare(expr: Expression, op: &ComparisonOp, value: &Value) -> Expression {
    if let ComparisonOp::Other(raw) = op {
        tracing::warn!(operator = %raw, "passing unrecognized comparison operator through");
    }
    Expression::binary(expr, op.to_binary(), Expression::Bind(value.clone()))
}

/// Text form of a value, as a LIKE pattern would see it.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparison_op_parse() {
        assert_eq!(ComparisonOp::parse("="), ComparisonOp::Eq);
        assert_eq!(ComparisonOp::parse("=="), ComparisonOp::Eq);
        assert_eq!(ComparisonOp::parse("<>"), ComparisonOp::NotEq);
        assert_eq!(ComparisonOp::parse("!="), ComparisonOp::NotEq);
        assert_eq!(ComparisonOp::parse(" >= "), ComparisonOp::GtEq);
        assert_eq!(
            ComparisonOp::parse("ILIKE"),
            ComparisonOp::Other("ILIKE".into())
        );
    }

    #[test]
    fn test_document_operators() {
        assert_eq!(ComparisonOp::Lt.document_operator(), Some("$lt"));
        assert_eq!(ComparisonOp::Other("~".into()).document_operator(), None);
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("desc").unwrap(), SortDirection::Desc);
        assert_eq!(SortDirection::parse("DESC").unwrap(), SortDirection::Desc);
        assert_eq!(SortDirection::parse("Asc").unwrap(), SortDirection::Asc);
        assert_eq!(SortDirection::default(), SortDirection::Asc);
        assert!(matches!(
            SortDirection::parse("sideways"),
            Err(JsonFilterError::InvalidDirection(_))
        ));
    }

    #[test]
    fn test_like_contains_escapes_wildcards() {
        let expr = like_contains(Expression::column(None, "meta"), "50%_off!");
        match expr {
            Expression::Like {
                pattern, escape, ..
            } => {
                assert_eq!(*pattern, Expression::Bind(json!("%50!%!_off!!%")));
                assert_eq!(escape, '!');
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }

    /// Evaluate `text LIKE pattern ESCAPE esc` the way SQL engines do.
    fn sql_like(text: &str, pattern: &str, esc: char) -> bool {
        fn go(t: &[char], p: &[char], esc: char) -> bool {
            match p.split_first() {
                None => t.is_empty(),
                Some((&c, rest)) if c == esc => match rest.split_first() {
                    Some((&lit, rest)) => t.first() == Some(&lit) && go(&t[1..], rest, esc),
                    None => false,
                },
                Some(('%', rest)) => (0..=t.len()).any(|i| go(&t[i..], rest, esc)),
                Some(('_', rest)) => !t.is_empty() && go(&t[1..], rest, esc),
                Some((&c, rest)) => t.first() == Some(&c) && go(&t[1..], rest, esc),
            }
        }
        let t: Vec<char> = text.chars().collect();
        let p: Vec<char> = pattern.chars().collect();
        go(&t, &p, esc)
    }

    fn contains_matches(text: &str, search: &str) -> bool {
        match like_contains(Expression::column(None, "code"), search) {
            Expression::Like {
                pattern, escape, ..
            } => match *pattern {
                Expression::Bind(Value::String(p)) => sql_like(text, &p, escape),
                other => panic!("unexpected pattern: {other:?}"),
            },
            other => panic!("unexpected expression: {other:?}"),
        }
    }

    #[test]
    fn test_like_contains_is_literal_substring_match() {
        assert!(contains_matches("a_b", "a_b"));
        assert!(contains_matches("50% off", "50%"));
        assert!(contains_matches("50% off", "off"));
        assert!(contains_matches("wow!", "w!"));
        assert!(!contains_matches("axb", "a_b"));
        assert!(!contains_matches("500 off", "50%"));
        assert!(!contains_matches("a_b", "A_B"));
    }

    #[test]
    fn test_in_list_empty_is_always_false() {
        assert_eq!(
            in_list(Expression::column(None, "meta"), &[]),
            Expression::always_false()
        );
    }

    #[test]
    fn test_root_column_qualified() {
        let path = KeyPath::parse("users.meta->status").unwrap();
        assert_eq!(root_column(&path), Expression::column(Some("users"), "meta"));
    }

    #[test]
    fn test_dialect_kind_serde_names() {
        let kind: DialectKind = serde_json::from_value(json!("sql-operator")).unwrap();
        assert_eq!(kind, DialectKind::SqlOperator);
        assert_eq!(DialectKind::SqlFunction.to_string(), "sql-function");
    }
}
