//! Function-call dialect (MySQL, MariaDB).
//!
//! `meta->profile->country` becomes
//! `JSON_UNQUOTE(JSON_EXTRACT(meta, '$.profile.country'))`.

use serde_json::Value;

use super::{
    compare, in_list, like_contains, root_column, ComparisonOp, DialectAdapter, DialectKind,
    Fragment, SortDirection,
};
use crate::ast::types::{BinaryOperator, Expression, Literal, OrderByExpr, SelectItem};
use crate::connection::ConnectionInfo;
use crate::error::JsonResult;
use crate::path::{is_identifier, KeyPath};

const DRIVER_FRAGMENTS: &[&str] = &["mysql", "mariadb"];

pub struct MySqlAdapter;

impl MySqlAdapter {
    /// `'$.a.b'` path literal. Segments that are not plain identifiers are
    /// double-quoted, as MySQL path syntax requires for `-` or leading digits.
    fn json_path(path: &KeyPath) -> Expression {
        let mut out = String::from("$");
        for seg in path.segments() {
            out.push('.');
            if is_identifier(seg) {
                out.push_str(seg);
            } else {
                out.push('"');
                out.push_str(seg);
                out.push('"');
            }
        }
        Expression::string(out)
    }

    fn extract(path: &KeyPath) -> Expression {
        Expression::function(
            "JSON_EXTRACT",
            vec![root_column(path), Self::json_path(path)],
        )
    }

    /// Extracted value as comparable text.
    fn unquoted(path: &KeyPath) -> Expression {
        Expression::function("JSON_UNQUOTE", vec![Self::extract(path)])
    }
}

impl DialectAdapter for MySqlAdapter {
    fn name(&self) -> &str {
        "mysql"
    }

    fn dialect(&self) -> DialectKind {
        DialectKind::SqlFunction
    }

    fn supports(&self, connection: &ConnectionInfo) -> bool {
        connection.identity_contains(DRIVER_FRAGMENTS)
    }

    fn filter(&self, path: &KeyPath, op: &ComparisonOp, value: &Value) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(compare(Self::unquoted(path), op, value)))
    }

    fn where_in(&self, path: &KeyPath, values: &[Value]) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(in_list(Self::unquoted(path), values)))
    }

    fn contains(&self, path: &KeyPath, search: &str) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(like_contains(Self::unquoted(path), search)))
    }

    fn exists(&self, path: &KeyPath) -> JsonResult<Fragment> {
        if !path.is_nested() {
            return Ok(Fragment::Filter(Expression::IsNotNull(Box::new(root_column(path)))));
        }

        // JSON_CONTAINS_PATH is also true for an explicit JSON null
        let present = Expression::function(
            "JSON_CONTAINS_PATH",
            vec![
                root_column(path),
                Expression::string("one"),
                Self::json_path(path),
            ],
        );
        let not_null = Expression::binary(
            Expression::function("JSON_TYPE", vec![Self::extract(path)]),
            BinaryOperator::NotEq,
            Expression::Literal(Literal::String("NULL".into())),
        );
        Ok(Fragment::Filter(Expression::Nested(Box::new(
            Expression::binary(present, BinaryOperator::And, not_null),
        ))))
    }

    fn order_by(&self, path: &KeyPath, direction: SortDirection) -> JsonResult<Fragment> {
        Ok(Fragment::Order(OrderByExpr {
            expr: Self::unquoted(path),
            asc: Some(direction.is_ascending()),
        }))
    }

    fn select(&self, path: &KeyPath, alias: Option<&str>) -> JsonResult<Fragment> {
        let alias = alias.map_or_else(|| path.default_alias(), str::to_string);
        Ok(Fragment::Projection(SelectItem::Expression {
            expr: Self::unquoted(path),
            alias: Some(alias),
        }))
    }
}
