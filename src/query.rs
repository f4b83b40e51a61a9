//! Query objects the JSON operations are composed onto.
//!
//! The composer only talks to `QueryTarget`. Any query builder can take part
//! by implementing it; `SqlQuery` and `DocumentQuery` are the implementations
//! shipped with the crate.

use serde_json::{json, Map, Value};

use crate::ast::compiler::{compile_select, validate, CompiledQuery, PlaceholderStyle};
use crate::ast::types::{Expression, OrderByExpr, SelectItem, SelectQuery, TableRef};
use crate::connection::ConnectionInfo;
use crate::dialect::{DialectKind, SortDirection};
use crate::error::{JsonFilterError, JsonResult};

/// Mutable, chainable query object owned by the caller.
///
/// SQL builders implement the raw primitives, document builders the
/// document ones; the defaults reject the call so a fragment can never be
/// silently dropped.
pub trait QueryTarget {
    fn connection(&self) -> &ConnectionInfo;

    /// Whether nothing has been explicitly projected yet.
    fn projection_is_empty(&self) -> bool;

    /// Project every column.
    fn select_all(&mut self);

    fn add_raw_filter(&mut self, _predicate: Expression) -> JsonResult<()> {
        Err(self.unsupported("raw SQL filters"))
    }

    fn add_raw_order(&mut self, _order: OrderByExpr) -> JsonResult<()> {
        Err(self.unsupported("raw SQL ordering"))
    }

    fn add_raw_projection(&mut self, _item: SelectItem) -> JsonResult<()> {
        Err(self.unsupported("raw SQL projections"))
    }

    fn add_document_filter(&mut self, _clause: Map<String, Value>) -> JsonResult<()> {
        Err(self.unsupported("document filters"))
    }

    fn add_document_sort(&mut self, _key: String, _direction: SortDirection) -> JsonResult<()> {
        Err(self.unsupported("document sorting"))
    }

    fn add_document_projection(&mut self, _key: String, _spec: Value) -> JsonResult<()> {
        Err(self.unsupported("document projections"))
    }

    /// Dialect this target speaks, used to label rejected primitives.
    fn native_dialect(&self) -> DialectKind {
        DialectKind::Generic
    }

    fn unsupported(&self, what: &str) -> JsonFilterError {
        JsonFilterError::untranslatable(
            self.native_dialect(),
            format!("query object does not accept {what}"),
        )
    }
}

/// Put the target into "select all columns" unless something is already
/// projected. Idempotent.
pub fn ensure_select_all<T: QueryTarget + ?Sized>(target: &mut T) {
    if target.projection_is_empty() {
        target.select_all();
    }
}

/// SELECT over one table, compiled with the placeholder style of its
/// connection.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    connection: ConnectionInfo,
    dialect: DialectKind,
    query: SelectQuery,
}

impl SqlQuery {
    /// A query against `table`. `dialect` decides the placeholder style and
    /// the parser used by `validate`; pass the dialect the registry selects
    /// for `connection`.
    pub fn new(connection: ConnectionInfo, dialect: DialectKind, table: &str) -> Self {
        let from = match table.split_once('.') {
            Some((schema, name)) => TableRef {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            None => TableRef::named(table),
        };
        Self {
            connection,
            dialect,
            query: SelectQuery {
                from: vec![from],
                ..Default::default()
            },
        }
    }

    /// Explicitly project plain columns.
    pub fn select_columns(&mut self, columns: &[&str]) -> &mut Self {
        for column in columns {
            let expr = match column.split_once('.') {
                Some((table, name)) => Expression::column(Some(table), name),
                None => Expression::column(None, column),
            };
            self.query
                .projections
                .push(SelectItem::Expression { expr, alias: None });
        }
        self
    }

    pub fn ast(&self) -> &SelectQuery {
        &self.query
    }

    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    pub fn to_sql(&self) -> CompiledQuery {
        compile_select(&self.query, PlaceholderStyle::for_dialect(self.dialect))
    }

    /// SQL with bound values written inline. For logs and display only.
    pub fn debug_sql(&self) -> String {
        compile_select(&self.query, PlaceholderStyle::Inline).sql
    }

    /// Parse the compiled SQL with the matching dialect's parser.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate(&self.to_sql().sql, self.dialect)
    }
}

impl QueryTarget for SqlQuery {
    fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    fn projection_is_empty(&self) -> bool {
        self.query.projections.is_empty()
    }

    fn select_all(&mut self) {
        self.query.projections = vec![SelectItem::Wildcard];
    }

    fn add_raw_filter(&mut self, predicate: Expression) -> JsonResult<()> {
        self.query.and_where(predicate);
        Ok(())
    }

    fn add_raw_order(&mut self, order: OrderByExpr) -> JsonResult<()> {
        self.query.order_by.push(order);
        Ok(())
    }

    fn add_raw_projection(&mut self, item: SelectItem) -> JsonResult<()> {
        self.query.projections.push(item);
        Ok(())
    }

    fn native_dialect(&self) -> DialectKind {
        self.dialect
    }
}

/// `find` command against one collection.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    connection: ConnectionInfo,
    collection: String,
    filters: Vec<Map<String, Value>>,
    sort: Vec<(String, SortDirection)>,
    projection: Map<String, Value>,
}

impl DocumentQuery {
    pub fn new(connection: ConnectionInfo, collection: &str) -> Self {
        Self {
            connection,
            collection: collection.to_string(),
            filters: Vec::new(),
            sort: Vec::new(),
            projection: Map::new(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Combined filter document; several clauses are joined with `$and`.
    pub fn filter_document(&self) -> Value {
        match self.filters.as_slice() {
            [] => json!({}),
            [only] => Value::Object(only.clone()),
            many => json!({ "$and": many }),
        }
    }

    pub fn sort_document(&self) -> Map<String, Value> {
        self.sort
            .iter()
            .map(|(key, dir)| (key.clone(), json!(dir.as_document_order())))
            .collect()
    }

    pub fn projection_document(&self) -> &Map<String, Value> {
        &self.projection
    }

    /// The whole query as a `find` command document.
    pub fn to_json(&self) -> Value {
        let mut command = Map::new();
        command.insert("find".into(), json!(self.collection));
        command.insert("filter".into(), self.filter_document());
        if !self.sort.is_empty() {
            command.insert("sort".into(), Value::Object(self.sort_document()));
        }
        if !self.projection.is_empty() {
            command.insert("projection".into(), Value::Object(self.projection.clone()));
        }
        Value::Object(command)
    }
}

impl QueryTarget for DocumentQuery {
    fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    fn projection_is_empty(&self) -> bool {
        self.projection.is_empty()
    }

    /// Documents come back whole unless projected; nothing to do.
    fn select_all(&mut self) {}

    fn add_document_filter(&mut self, clause: Map<String, Value>) -> JsonResult<()> {
        self.filters.push(clause);
        Ok(())
    }

    fn add_document_sort(&mut self, key: String, direction: SortDirection) -> JsonResult<()> {
        self.sort.push((key, direction));
        Ok(())
    }

    fn add_document_projection(&mut self, key: String, spec: Value) -> JsonResult<()> {
        self.projection.insert(key, spec);
        Ok(())
    }

    fn native_dialect(&self) -> DialectKind {
        DialectKind::Document
    }
}
