//! PostgreSQL graph store for production use.
//!
//! The property graph lives in two tables (see [`GRAPH_SCHEMA`]); node and
//! edge attributes are JSONB documents. The tier0 marker is a nullable
//! column: `TRUE` when marked, `NULL` otherwise.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 1)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::membership::{MatchMode, TierPattern};
use crate::types::{BoundaryRow, EdgeId, GraphEdge, GraphNode, NodeId};
use super::GraphStore;

/// DDL for the graph tables.
pub const GRAPH_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS graph_nodes (
    id          BIGINT PRIMARY KEY,
    name        TEXT NOT NULL,
    properties  JSONB NOT NULL DEFAULT '{}'::jsonb,
    tier0       BOOLEAN
);
CREATE INDEX IF NOT EXISTS graph_nodes_tier0_idx ON graph_nodes (tier0) WHERE tier0 = TRUE;
CREATE INDEX IF NOT EXISTS graph_nodes_lower_name_idx ON graph_nodes (lower(name));
CREATE TABLE IF NOT EXISTS graph_edges (
    id          BIGINT PRIMARY KEY,
    edge_type   TEXT NOT NULL,
    start_id    BIGINT NOT NULL REFERENCES graph_nodes (id),
    end_id      BIGINT NOT NULL REFERENCES graph_nodes (id),
    properties  JSONB NOT NULL DEFAULT '{}'::jsonb
);
CREATE INDEX IF NOT EXISTS graph_edges_start_idx ON graph_edges (start_id);
CREATE INDEX IF NOT EXISTS graph_edges_end_idx ON graph_edges (end_id)
"#;

/// Configuration for PostgreSQL connection pool.
///
/// `max_connections` is a hard cap on concurrent sessions regardless of how
/// many workers the auditor runs.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 1).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/bloodhound".to_string()),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }

    /// Override the connection URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Grow the pool so `workers` concurrent queries never wait on a connection.
    ///
    /// Never shrinks a larger configured pool.
    pub fn with_worker_capacity(mut self, workers: usize) -> Self {
        let workers = u32::try_from(workers).unwrap_or(u32::MAX);
        self.max_connections = self.max_connections.max(workers);
        self
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// PostgreSQL graph store.
pub struct PostgresGraphStore {
    pool: PgPool,
}

impl PostgresGraphStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, PostgresError> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create the graph tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), PostgresError> {
        let mut tx = self.pool.begin().await?;
        for statement in GRAPH_SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Check if the database is reachable.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    fn properties_from_json(value: Option<serde_json::Value>) -> BTreeMap<String, serde_json::Value> {
        match value {
            Some(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Parse one boundary row; `m_` columns are the tier0 side, `x_` the other.
    fn parse_boundary_row(row: &PgRow) -> Result<BoundaryRow, sqlx::Error> {
        let tier0 = GraphNode {
            id: NodeId::new(row.try_get("m_id")?),
            name: row.try_get("m_name")?,
            properties: Self::properties_from_json(row.try_get("m_properties")?),
            tier0: true,
        };
        let other = GraphNode {
            id: NodeId::new(row.try_get("x_id")?),
            name: row.try_get("x_name")?,
            properties: Self::properties_from_json(row.try_get("x_properties")?),
            tier0: false,
        };
        let edge = GraphEdge {
            id: EdgeId::new(row.try_get("e_id")?),
            edge_type: row.try_get("edge_type")?,
            start: NodeId::new(row.try_get("start_id")?),
            end: NodeId::new(row.try_get("end_id")?),
            is_acl: row.try_get("is_acl")?,
        };

        Ok(BoundaryRow { tier0, edge, other })
    }
}

#[async_trait]
impl GraphStore for PostgresGraphStore {
    type Error = PostgresError;

    async fn clear_tier0(&self) -> Result<u64, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE graph_nodes SET tier0 = NULL WHERE tier0 = TRUE")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn mark_tier0(&self, pattern: &TierPattern) -> Result<u64, Self::Error> {
        // strpos avoids LIKE treating `_` and `%` in principal names as wildcards.
        let sql = match pattern.mode() {
            MatchMode::Exact => {
                "UPDATE graph_nodes SET tier0 = TRUE WHERE lower(name) = lower($1)"
            }
            MatchMode::Contains => {
                "UPDATE graph_nodes SET tier0 = TRUE WHERE strpos(lower(name), lower($1)) > 0"
            }
        };

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(sql)
            .bind(pattern.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn boundary_rows(&self, eligibility_attribute: &str) -> Result<Vec<BoundaryRow>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT m.id AS m_id, m.name AS m_name, m.properties AS m_properties,
                   e.id AS e_id, e.edge_type, e.start_id, e.end_id,
                   COALESCE((e.properties ->> 'isacl')::boolean, FALSE) AS is_acl,
                   x.id AS x_id, x.name AS x_name, x.properties AS x_properties
            FROM graph_edges e
            JOIN graph_nodes m ON m.id IN (e.start_id, e.end_id)
            JOIN graph_nodes x ON x.id IN (e.start_id, e.end_id) AND x.id <> m.id
            WHERE m.tier0 = TRUE
              AND x.tier0 IS NULL
              AND COALESCE(jsonb_typeof(x.properties -> $1), 'null') <> 'null'
            ORDER BY e.id
            "#
        )
        .bind(eligibility_attribute)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(Self::parse_boundary_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PostgresError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_connections: u32) -> PostgresConfig {
        PostgresConfig {
            database_url: "postgresql://localhost/test".to_string(),
            max_connections,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
        }
    }

    #[test]
    fn test_worker_capacity_grows_pool() {
        assert_eq!(config(10).with_worker_capacity(16).max_connections, 16);
    }

    #[test]
    fn test_worker_capacity_never_shrinks_pool() {
        assert_eq!(config(32).with_worker_capacity(16).max_connections, 32);
    }
}
