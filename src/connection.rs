use std::fmt;

/// Identity of the connection a query object is bound to.
///
/// Adapter selection only looks at this value, never at a live handle.
/// `driver` is the driver name as reported by the client library (`mysql`,
/// `pgsql`, `mongodb`, ...); `connection_class` is any richer type name the
/// client exposes (`mysql_async::Conn`,
/// `tokio_postgres::Client`). Either may be missing when the client could
/// not be introspected; a connection with neither matches no dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub name: Option<String>,
    pub driver: Option<String>,
    pub connection_class: Option<String>,
}

impl ConnectionInfo {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: Some(driver.into()),
            ..Default::default()
        }
    }

    /// A connection whose identity could not be determined.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.connection_class = Some(class.into());
        self
    }

    /// Derive the driver from a connection URL scheme:
    /// `postgres://user@host/db` → driver `postgres`.
    pub fn from_url(url: &str) -> Self {
        match url.split_once("://") {
            Some((scheme, _)) if !scheme.is_empty() => Self::new(scheme),
            _ => Self::unknown(),
        }
    }

    pub fn has_identity(&self) -> bool {
        self.driver.is_some() || self.connection_class.is_some()
    }

    /// Case-insensitive containment of any fragment in the driver name or
    /// connection class.
    pub fn identity_contains(&self, fragments: &[&str]) -> bool {
        [self.driver.as_deref(), self.connection_class.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .any(|identity| {
                fragments
                    .iter()
                    .any(|f| identity.contains(&f.to_lowercase()))
            })
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = self.driver.as_deref().unwrap_or("unknown");
        match (&self.name, &self.connection_class) {
            (Some(name), _) => write!(f, "{} ({})", name, driver),
            (None, Some(class)) => write!(f, "{} ({})", driver, class),
            (None, None) => write!(f, "{}", driver),
        }
    }
}
