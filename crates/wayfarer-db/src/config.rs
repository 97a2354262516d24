use std::env;

/// Database configuration.
///
/// Reads from the `WAYFARER_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/wayfarer` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/wayfarer";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const URL_ENV: &str = "WAYFARER_DATABASE_URL";

    /// Pool size used unless overridden.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::URL_ENV).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self::new(database_url)
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Override the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Extract the database name from the URL, ignoring any query string.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(head, _)| head);
        without_query.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Return a URL pointing at the `postgres` maintenance database on the
    /// same host. Used to issue `CREATE DATABASE` when the target DB does not
    /// yet exist.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rfind('/') {
            Some(pos) => {
                let mut url = self.database_url[..pos].to_owned();
                url.push_str("/postgres");
                url
            }
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_url, "postgresql://localhost:5432/wayfarer");
        assert_eq!(cfg.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn database_name_extraction() {
        let cfg = DbConfig::new("postgresql://localhost:5432/trips");
        assert_eq!(cfg.database_name(), Some("trips"));
    }

    #[test]
    fn database_name_ignores_query_string() {
        let cfg = DbConfig::new("postgresql://localhost:5432/trips?sslmode=disable");
        assert_eq!(cfg.database_name(), Some("trips"));
    }

    #[test]
    fn database_name_missing() {
        let cfg = DbConfig::new("postgresql://localhost:5432/");
        assert_eq!(cfg.database_name(), None);
    }

    #[test]
    fn maintenance_url_replaces_db() {
        let cfg = DbConfig::new("postgresql://localhost:5432/wayfarer");
        assert_eq!(
            cfg.maintenance_url(),
            "postgresql://localhost:5432/postgres"
        );
    }

    #[test]
    fn max_connections_never_zero() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL).with_max_connections(0);
        assert_eq!(cfg.max_connections, 1);
    }
}
