//! Composition of JSON operations onto caller-owned query objects.
//!
//! Every operation runs the same pipeline:
//!
//! ```text
//! key path ──parse──▶ KeyPath
//! target.connection() ──registry──▶ DialectAdapter
//! adapter(KeyPath, args) ──▶ Fragment
//! baseline projection, then merge Fragment into target
//! ```
//!
//! Everything that can fail (path parsing, argument validation, translation)
//! happens before the target is touched.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::connection::ConnectionInfo;
use crate::dialect::{self, AdapterRegistry, ComparisonOp, DialectAdapter, Fragment, SortDirection};
use crate::error::{JsonFilterError, JsonResult};
use crate::path::{KeyPath, SelectSpec};
use crate::query::{ensure_select_all, DocumentQuery, QueryTarget, SqlQuery};

/// What `where_in` does with an empty value list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyInPolicy {
    /// Emit a predicate that matches nothing.
    #[default]
    AlwaysFalse,
    /// Fail with `JsonFilterError::EmptyValueList`.
    Reject,
}

/// Entry point for the six JSON operations, bound to one adapter registry.
#[derive(Clone)]
pub struct JsonFilter {
    registry: Arc<AdapterRegistry>,
    empty_in: EmptyInPolicy,
}

impl Default for JsonFilter {
    fn default() -> Self {
        Self::with_registry(dialect::global())
    }
}

impl JsonFilter {
    /// Uses the process-wide registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            empty_in: EmptyInPolicy::default(),
        }
    }

    pub fn with_empty_in(mut self, policy: EmptyInPolicy) -> Self {
        self.empty_in = policy;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn adapter_for(&self, connection: &ConnectionInfo) -> &dyn DialectAdapter {
        self.registry.select(connection)
    }

    /// A `SqlQuery` whose placeholder style matches the adapter selected for
    /// `connection`.
    pub fn sql_query(&self, connection: ConnectionInfo, table: &str) -> SqlQuery {
        let dialect = self.adapter_for(&connection).dialect();
        SqlQuery::new(connection, dialect, table)
    }

    pub fn document_query(&self, connection: ConnectionInfo, collection: &str) -> DocumentQuery {
        DocumentQuery::new(connection, collection)
    }

    /// `path op value`, compared on the extracted scalar.
    pub fn filter<'t, T>(
        &self,
        target: &'t mut T,
        path: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> JsonResult<&'t mut T>
    where
        T: QueryTarget + ?Sized,
    {
        let path = KeyPath::parse(path)?;
        let op = ComparisonOp::parse(op);
        let value = value.into();
        let adapter = self.adapter_for(target.connection());
        let fragment = adapter.filter(&path, &op, &value)?;
        merge(target, adapter, fragment)
    }

    /// Extracted value is one of `values`.
    pub fn where_in<'t, T, I, V>(
        &self,
        target: &'t mut T,
        path: &str,
        values: I,
    ) -> JsonResult<&'t mut T>
    where
        T: QueryTarget + ?Sized,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let key_path = KeyPath::parse(path)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() && self.empty_in == EmptyInPolicy::Reject {
            return Err(JsonFilterError::EmptyValueList(path.to_string()));
        }
        let adapter = self.adapter_for(target.connection());
        let fragment = adapter.where_in(&key_path, &values)?;
        merge(target, adapter, fragment)
    }

    /// Extracted value, as text, contains `search`.
    pub fn contains<'t, T>(&self, target: &'t mut T, path: &str, search: &str) -> JsonResult<&'t mut T>
    where
        T: QueryTarget + ?Sized,
    {
        let path = KeyPath::parse(path)?;
        let adapter = self.adapter_for(target.connection());
        let fragment = adapter.contains(&path, search)?;
        merge(target, adapter, fragment)
    }

    /// Nested path is present and not null.
    pub fn exists<'t, T>(&self, target: &'t mut T, path: &str) -> JsonResult<&'t mut T>
    where
        T: QueryTarget + ?Sized,
    {
        let path = KeyPath::parse(path)?;
        let adapter = self.adapter_for(target.connection());
        let fragment = adapter.exists(&path)?;
        merge(target, adapter, fragment)
    }

    /// Order by the extracted value; `direction` is `asc` or `desc` in any case.
    pub fn order_by<'t, T>(&self, target: &'t mut T, path: &str, direction: &str) -> JsonResult<&'t mut T>
    where
        T: QueryTarget + ?Sized,
    {
        let path = KeyPath::parse(path)?;
        let direction = SortDirection::parse(direction)?;
        let adapter = self.adapter_for(target.connection());
        let fragment = adapter.order_by(&path, direction)?;
        merge(target, adapter, fragment)
    }

    /// Project `"<path>"` or `"<path> as <alias>"`.
    pub fn select<'t, T>(&self, target: &'t mut T, spec: &str) -> JsonResult<&'t mut T>
    where
        T: QueryTarget + ?Sized,
    {
        let spec = SelectSpec::parse(spec)?;
        let adapter = self.adapter_for(target.connection());
        let fragment = adapter.select(&spec.path, spec.alias.as_deref())?;
        merge(target, adapter, fragment)
    }
}

fn merge<'t, T>(target: &'t mut T, adapter: &dyn DialectAdapter, fragment: Fragment) -> JsonResult<&'t mut T>
where
    T: QueryTarget + ?Sized,
{
    debug!(adapter = adapter.name(), %fragment, "merging json fragment");

    if adapter.needs_select_all() {
        ensure_select_all(target);
    }

    match fragment {
        Fragment::Filter(expr) => target.add_raw_filter(expr)?,
        Fragment::Order(order) => target.add_raw_order(order)?,
        Fragment::Projection(item) => target.add_raw_projection(item)?,
        Fragment::DocumentFilter(clause) => target.add_document_filter(clause)?,
        Fragment::DocumentSort { key, direction } => target.add_document_sort(key, direction)?,
        Fragment::DocumentProjection { key, spec } => target.add_document_projection(key, spec)?,
    }
    Ok(target)
}

static GLOBAL_FILTER: OnceLock<JsonFilter> = OnceLock::new();

/// Install the filter behind the `json_*` methods. Only the first call takes
/// effect, and only if no `json_*` method has run yet.
pub fn install_global_filter(filter: JsonFilter) -> bool {
    GLOBAL_FILTER.set(filter).is_ok()
}

/// The installed filter, or the process-wide registry with the default
/// empty-list policy.
pub fn global_filter() -> &'static JsonFilter {
    GLOBAL_FILTER.get_or_init(JsonFilter::default)
}

/// The JSON operations as chainable methods on any query object, using
/// `global_filter()`.
///
/// ```ignore
/// let mut query = filter.sql_query(ConnectionInfo::new("pgsql"), "users");
/// query
///     .json_filter("meta->status", "=", "active")?
///     .json_order_by("meta->score", "desc")?;
/// ```
pub trait JsonQueryExt: QueryTarget + Sized {
    fn json_filter(&mut self, path: &str, op: &str, value: impl Into<Value>) -> JsonResult<&mut Self> {
        global_filter().filter(self, path, op, value)
    }

    fn json_where_in<I, V>(&mut self, path: &str, values: I) -> JsonResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        global_filter().where_in(self, path, values)
    }

    fn json_contains(&mut self, path: &str, search: &str) -> JsonResult<&mut Self> {
        global_filter().contains(self, path, search)
    }

    fn json_exists(&mut self, path: &str) -> JsonResult<&mut Self> {
        global_filter().exists(self, path)
    }

    fn json_order_by(&mut self, path: &str, direction: &str) -> JsonResult<&mut Self> {
        global_filter().order_by(self, path, direction)
    }

    fn json_order_by_asc(&mut self, path: &str) -> JsonResult<&mut Self> {
        self.json_order_by(path, "asc")
    }

    fn json_select(&mut self, spec: &str) -> JsonResult<&mut Self> {
        global_filter().select(self, spec)
    }
}

impl<T: QueryTarget> JsonQueryExt for T {}
