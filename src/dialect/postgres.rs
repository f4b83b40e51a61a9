//! Operator-chain dialect (PostgreSQL).
//!
//! `meta->profile->country` becomes `meta->'profile'->>'country'`: every hop
//! but the last keeps the value as json, the last one casts to text so it
//! compares as a scalar.

use serde_json::Value;

use super::{
    compare, in_list, like_contains, root_column, ComparisonOp, DialectAdapter, DialectKind,
    Fragment, SortDirection,
};
use crate::ast::types::{Expression, OrderByExpr, SelectItem};
use crate::connection::ConnectionInfo;
use crate::error::JsonResult;
use crate::path::KeyPath;

const DRIVER_FRAGMENTS: &[&str] = &["postgres", "pgsql"];

pub struct PostgresAdapter;

impl PostgresAdapter {
    fn text_chain(path: &KeyPath) -> Expression {
        let last = path.segments().len().saturating_sub(1);
        path.segments()
            .iter()
            .enumerate()
            .fold(root_column(path), |expr, (i, seg)| Expression::JsonAccess {
                expr: Box::new(expr),
                path: Box::new(Expression::string(seg.as_str())),
                as_text: i == last,
            })
    }
}

impl DialectAdapter for PostgresAdapter {
    fn name(&self) -> &str {
        "pgsql"
    }

    fn dialect(&self) -> DialectKind {
        DialectKind::SqlOperator
    }

    fn supports(&self, connection: &ConnectionInfo) -> bool {
        connection.identity_contains(DRIVER_FRAGMENTS)
    }

    fn filter(&self, path: &KeyPath, op: &ComparisonOp, value: &Value) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(compare(Self::text_chain(path), op, value)))
    }

    fn where_in(&self, path: &KeyPath, values: &[Value]) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(in_list(Self::text_chain(path), values)))
    }

    fn contains(&self, path: &KeyPath, search: &str) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(like_contains(Self::text_chain(path), search)))
    }

    fn exists(&self, path: &KeyPath) -> JsonResult<Fragment> {
        // ->> yields SQL NULL for both a missing key and a json null
        Ok(Fragment::Filter(Expression::IsNotNull(Box::new(Self::text_chain(path)))))
    }

    fn order_by(&self, path: &KeyPath, direction: SortDirection) -> JsonResult<Fragment> {
        Ok(Fragment::Order(OrderByExpr {
            expr: Self::text_chain(path),
            asc: Some(direction.is_ascending()),
        }))
    }

    fn select(&self, path: &KeyPath, alias: Option<&str>) -> JsonResult<Fragment> {
        let alias = alias.map_or_else(|| path.default_alias(), str::to_string);
        Ok(Fragment::Projection(SelectItem::Expression {
            expr: Self::text_chain(path),
            alias: Some(alias),
        }))
    }
}
