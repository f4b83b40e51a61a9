//! Document-store dialect (MongoDB and compatibles).
//!
//! No extraction step: `meta->profile->country` is the address
//! `meta.profile.country` and every operation is a native clause on it.

use serde_json::{json, Map, Value};

use super::{ComparisonOp, DialectAdapter, DialectKind, Fragment, SortDirection};
use crate::connection::ConnectionInfo;
use crate::error::{JsonFilterError, JsonResult};
use crate::path::KeyPath;

const DRIVER_FRAGMENTS: &[&str] = &["mongo"];

pub struct DocumentAdapter;

impl DocumentAdapter {
    fn clause(path: &KeyPath, condition: Value) -> Fragment {
        let mut clause = Map::new();
        clause.insert(path.dotted(), condition);
        Fragment::DocumentFilter(clause)
    }
}

impl DialectAdapter for DocumentAdapter {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn dialect(&self) -> DialectKind {
        DialectKind::Document
    }

    fn supports(&self, connection: &ConnectionInfo) -> bool {
        connection.identity_contains(DRIVER_FRAGMENTS)
    }

    fn filter(&self, path: &KeyPath, op: &ComparisonOp, value: &Value) -> JsonResult<Fragment> {
        let Some(operator) = op.document_operator() else {
            return Err(JsonFilterError::untranslatable(
                self.dialect(),
                format!("no document operator for {op:?}"),
            ));
        };
        let mut condition = Map::new();
        condition.insert(operator.to_string(), value.clone());
        Ok(Self::clause(path, Value::Object(condition)))
    }

    fn where_in(&self, path: &KeyPath, values: &[Value]) -> JsonResult<Fragment> {
        // {"$in": []} is valid and matches nothing
        Ok(Self::clause(path, json!({ "$in": values })))
    }

    fn contains(&self, path: &KeyPath, search: &str) -> JsonResult<Fragment> {
        Ok(Self::clause(
            path,
            json!({ "$regex": regex::escape(search), "$options": "i" }),
        ))
    }

    fn exists(&self, path: &KeyPath) -> JsonResult<Fragment> {
        Ok(Self::clause(path, json!({ "$exists": true, "$ne": null })))
    }

    fn order_by(&self, path: &KeyPath, direction: SortDirection) -> JsonResult<Fragment> {
        Ok(Fragment::DocumentSort {
            key: path.dotted(),
            direction,
        })
    }

    fn select(&self, path: &KeyPath, alias: Option<&str>) -> JsonResult<Fragment> {
        Ok(match alias {
            Some(alias) => Fragment::DocumentProjection {
                key: alias.to_string(),
                spec: Value::String(format!("${}", path.dotted())),
            },
            None => Fragment::DocumentProjection {
                key: path.dotted(),
                spec: json!(1),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> KeyPath {
        KeyPath::parse(p).unwrap()
    }

    fn filter_clause(fragment: Fragment) -> Value {
        match fragment {
            Fragment::DocumentFilter(clause) => Value::Object(clause),
            other => panic!("expected a document filter, got {other:?}"),
        }
    }

    #[test]
    fn test_supports_mongo() {
        assert!(DocumentAdapter.supports(&ConnectionInfo::new("mongodb")));
        assert!(DocumentAdapter
            .supports(&ConnectionInfo::unknown().with_class("MongoDB\\Laravel\\Connection")));
        assert!(!DocumentAdapter.supports(&ConnectionInfo::new("mysql")));
    }

    #[test]
    fn test_filter_clause() {
        let fragment = DocumentAdapter
            .filter(&path("meta->status"), &ComparisonOp::Eq, &json!("active"))
            .unwrap();
        assert_eq!(
            filter_clause(fragment),
            json!({ "meta.status": { "$eq": "active" } })
        );
    }

    #[test]
    fn test_comparison_operators() {
        let fragment = DocumentAdapter
            .filter(&path("meta->score"), &ComparisonOp::GtEq, &json!(90))
            .unwrap();
        assert_eq!(
            filter_clause(fragment),
            json!({ "meta.score": { "$gte": 90 } })
        );
    }

    #[test]
    fn test_unknown_operator_is_untranslatable() {
        let err = DocumentAdapter
            .filter(&path("meta->name"), &ComparisonOp::parse("ILIKE"), &json!("x"))
            .unwrap_err();
        assert!(matches!(
            err,
            JsonFilterError::DialectTranslation {
                dialect: DialectKind::Document,
                ..
            }
        ));
    }

    #[test]
    fn test_where_in_and_empty_where_in() {
        let fragment = DocumentAdapter
            .where_in(&path("meta->status"), &[json!("active"), json!("pending")])
            .unwrap();
        assert_eq!(
            filter_clause(fragment),
            json!({ "meta.status": { "$in": ["active", "pending"] } })
        );

        let empty = DocumentAdapter.where_in(&path("meta->status"), &[]).unwrap();
        assert_eq!(filter_clause(empty), json!({ "meta.status": { "$in": [] } }));
    }

    #[test]
    fn test_contains_is_escaped_case_insensitive_regex() {
        let fragment = DocumentAdapter.contains(&path("meta->email"), "a.b+c").unwrap();
        assert_eq!(
            filter_clause(fragment),
            json!({ "meta.email": { "$regex": "a\\.b\\+c", "$options": "i" } })
        );
    }

    #[test]
    fn test_exists_clause() {
        let fragment = DocumentAdapter.exists(&path("meta->skills")).unwrap();
        assert_eq!(
            filter_clause(fragment),
            json!({ "meta.skills": { "$exists": true, "$ne": null } })
        );
    }

    #[test]
    fn test_order_by_uses_dotted_key() {
        let fragment = DocumentAdapter
            .order_by(&path("meta->score"), SortDirection::Desc)
            .unwrap();
        assert_eq!(
            fragment,
            Fragment::DocumentSort {
                key: "meta.score".into(),
                direction: SortDirection::Desc,
            }
        );
        assert_eq!(fragment.to_string(), "meta.score DESC");
    }

    #[test]
    fn test_select_projection_specs() {
        let aliased = DocumentAdapter
            .select(&path("meta->profile->country"), Some("country"))
            .unwrap();
        assert_eq!(
            aliased,
            Fragment::DocumentProjection {
                key: "country".into(),
                spec: json!("$meta.profile.country"),
            }
        );

        let included = DocumentAdapter
            .select(&path("meta->profile->country"), None)
            .unwrap();
        assert_eq!(
            included,
            Fragment::DocumentProjection {
                key: "meta.profile.country".into(),
                spec: json!(1),
            }
        );
    }

    #[test]
    fn test_no_baseline_projection() {
        assert!(!DocumentAdapter.needs_select_all());
    }
}
