//! Fallback dialect for stores without JSON support.
//!
//! Nested segments are dropped and every operation works on the root column:
//! `meta->status` is just `meta`. Filters degrade to a substring match on the
//! column text whatever the operator.

use serde_json::Value;

use super::{
    in_list, like_contains, root_column, value_text, ComparisonOp, DialectAdapter, DialectKind,
    Fragment, SortDirection,
};
use crate::ast::types::{Expression, OrderByExpr, SelectItem};
use crate::connection::ConnectionInfo;
use crate::error::JsonResult;
use crate::path::KeyPath;

/// Last-resort adapter. Never stored in the registry.
pub struct GenericAdapter;

impl DialectAdapter for GenericAdapter {
    fn name(&self) -> &str {
        "generic"
    }

    fn dialect(&self) -> DialectKind {
        DialectKind::Generic
    }

    fn supports(&self, _connection: &ConnectionInfo) -> bool {
        true
    }

    fn filter(&self, path: &KeyPath, _op: &ComparisonOp, value: &Value) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(like_contains(
            root_column(path),
            &value_text(value),
        )))
    }

    fn where_in(&self, path: &KeyPath, values: &[Value]) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(in_list(root_column(path), values)))
    }

    fn contains(&self, path: &KeyPath, search: &str) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(like_contains(root_column(path), search)))
    }

    fn exists(&self, path: &KeyPath) -> JsonResult<Fragment> {
        Ok(Fragment::Filter(Expression::IsNotNull(Box::new(root_column(path)))))
    }

    fn order_by(&self, path: &KeyPath, direction: SortDirection) -> JsonResult<Fragment> {
        Ok(Fragment::Order(OrderByExpr {
            expr: root_column(path),
            asc: Some(direction.is_ascending()),
        }))
    }

    fn select(&self, path: &KeyPath, alias: Option<&str>) -> JsonResult<Fragment> {
        let column = root_column(path);
        let alias = match alias {
            Some(a) => a.to_string(),
            None => match &column {
                Expression::Column { name, .. } => name.clone(),
                _ => path.root().to_string(),
            },
        };
        Ok(Fragment::Projection(SelectItem::Expression {
            expr: column,
            alias: Some(alias),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> KeyPath {
        KeyPath::parse(p).unwrap()
    }

    #[test]
    fn test_supports_everything() {
        assert!(GenericAdapter.supports(&ConnectionInfo::new("sqlite")));
        assert!(GenericAdapter.supports(&ConnectionInfo::unknown()));
    }

    #[test]
    fn test_where_in_discards_nesting() {
        let fragment = GenericAdapter
            .where_in(&path("meta->status"), &[json!("active"), json!("pending")])
            .unwrap();
        assert_eq!(fragment.to_string(), "meta IN ('active', 'pending')");
    }

    #[test]
    fn test_filter_degrades_to_like() {
        let fragment = GenericAdapter
            .filter(&path("meta->score"), &ComparisonOp::Gt, &json!(90))
            .unwrap();
        assert_eq!(fragment.to_string(), "meta LIKE '%90%' ESCAPE '!'");
    }

    #[test]
    fn test_contains_exists_order() {
        assert_eq!(
            GenericAdapter
                .contains(&path("meta->skills"), "php")
                .unwrap()
                .to_string(),
            "meta LIKE '%php%' ESCAPE '!'"
        );
        assert_eq!(
            GenericAdapter.exists(&path("meta->skills")).unwrap().to_string(),
            "meta IS NOT NULL"
        );
        assert_eq!(
            GenericAdapter
                .order_by(&path("meta->score"), SortDirection::Desc)
                .unwrap()
                .to_string(),
            "meta DESC"
        );
    }

    #[test]
    fn test_select_defaults_alias_to_column() {
        assert_eq!(
            GenericAdapter
                .select(&path("users.meta->name"), None)
                .unwrap()
                .to_string(),
            "users.meta AS meta"
        );
        assert_eq!(
            GenericAdapter
                .select(&path("meta->name"), Some("user_name"))
                .unwrap()
                .to_string(),
            "meta AS user_name"
        );
    }
}
