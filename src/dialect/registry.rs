/// Adapter registry and connection-based selection.
///
/// Adapters are consulted in priority order and the first one whose
/// `supports` accepts the connection wins. The generic adapter is not part of
/// the list; it is what `select` returns when nothing matches, so selection
/// never fails.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    ComparisonOp, DialectAdapter, DialectKind, DocumentAdapter, Fragment, GenericAdapter,
    MySqlAdapter, PostgresAdapter, SortDirection,
};
use crate::connection::ConnectionInfo;
use crate::error::JsonResult;
use crate::path::KeyPath;

static GENERIC: GenericAdapter = GenericAdapter;

static GLOBAL: OnceLock<Arc<AdapterRegistry>> = OnceLock::new();

/// Ordered list of dialect adapters.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn DialectAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self {
            adapters: vec![
                Box::new(MySqlAdapter),
                Box::new(PostgresAdapter),
                Box::new(DocumentAdapter),
            ],
        }
    }
}

impl AdapterRegistry {
    /// Registry holding the built-in adapters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no adapters; everything selects the generic fallback.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Put `adapter` ahead of every registered adapter, unless an adapter
    /// with the same name is already present. Returns whether it was added.
    pub fn register(&mut self, adapter: Box<dyn DialectAdapter>) -> bool {
        if self.adapters.iter().any(|a| a.name() == adapter.name()) {
            debug!(adapter = adapter.name(), "adapter already registered");
            return false;
        }
        debug!(adapter = adapter.name(), dialect = %adapter.dialect(), "registering adapter");
        self.adapters.insert(0, adapter);
        true
    }

    /// The adapter for `connection`: first registered match, else generic.
    pub fn select(&self, connection: &ConnectionInfo) -> &dyn DialectAdapter {
        for adapter in &self.adapters {
            if probe(adapter.as_ref(), connection) {
                debug!(%connection, adapter = adapter.name(), "selected dialect adapter");
                return adapter.as_ref();
            }
        }
        debug!(%connection, "no dialect adapter matched, using generic");
        &GENERIC
    }

    /// Registered adapter names in priority order.
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// `supports`, with a panicking implementation counted as "no".
fn probe(adapter: &dyn DialectAdapter, connection: &ConnectionInfo) -> bool {
    match catch_unwind(AssertUnwindSafe(|| adapter.supports(connection))) {
        Ok(supported) => supported,
        Err(_) => {
            warn!(adapter = adapter.name(), %connection, "adapter panicked while probing connection");
            false
        }
    }
}

/// Install the process-wide registry. Only the first call takes effect, and
/// it must happen before the first `global()` call to be observed.
pub fn install_global(registry: AdapterRegistry) -> bool {
    GLOBAL.set(Arc::new(registry)).is_ok()
}

/// The process-wide registry, built-ins only if none was installed.
pub fn global() -> Arc<AdapterRegistry> {
    GLOBAL
        .get_or_init(|| Arc::new(AdapterRegistry::default()))
        .clone()
}

/// Adapter that matches an extra driver-name fragment and translates with a
/// built-in dialect, e.g. routing `cockroach` connections to PostgreSQL
/// syntax.
pub struct AliasAdapter {
    name: String,
    fragment: String,
    inner: Box<dyn DialectAdapter>,
}

impl AliasAdapter {
    pub fn new(fragment: impl Into<String>, dialect: DialectKind) -> Self {
        let fragment = fragment.into();
        let inner: Box<dyn DialectAdapter> = match dialect {
            DialectKind::SqlFunction => Box::new(MySqlAdapter),
            DialectKind::SqlOperator => Box::new(PostgresAdapter),
            DialectKind::Document => Box::new(DocumentAdapter),
            DialectKind::Generic => Box::new(GenericAdapter),
        };
        Self {
            name: format!("{}:{}", dialect, fragment.to_lowercase()),
            fragment,
            inner,
        }
    }
}

impl DialectAdapter for AliasAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> DialectKind {
        self.inner.dialect()
    }

    fn supports(&self, connection: &ConnectionInfo) -> bool {
        connection.identity_contains(&[self.fragment.as_str()])
    }

    fn filter(&self, path: &KeyPath, op: &ComparisonOp, value: &Value) -> JsonResult<Fragment> {
        self.inner.filter(path, op, value)
    }

    fn where_in(&self, path: &KeyPath, values: &[Value]) -> JsonResult<Fragment> {
        self.inner.where_in(path, values)
    }

    fn contains(&self, path: &KeyPath, search: &str) -> JsonResult<Fragment> {
        self.inner.contains(path, search)
    }

    fn exists(&self, path: &KeyPath) -> JsonResult<Fragment> {
        self.inner.exists(path)
    }

    fn order_by(&self, path: &KeyPath, direction: SortDirection) -> JsonResult<Fragment> {
        self.inner.order_by(path, direction)
    }

    fn select(&self, path: &KeyPath, alias: Option<&str>) -> JsonResult<Fragment> {
        self.inner.select(path, alias)
    }
}
