use crate::domain::config::PoolConfig;
use crate::domain::ports::{DatabasePool, DatabasePoolRef, PoolConnector};
use crate::domain::transaction::PaymentTransaction;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const INSERT_TRANSACTION: &str = r#"INSERT INTO "transactions" ("order_id", "payment_status", "payment_gateway", "amount", "payment_date", "transfer_id")
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING "order_id", "payment_status", "payment_gateway", "amount", "payment_date", "transfer_id""#;

/// Builds lazily-connecting Postgres pools from registry-provided parameters.
#[derive(Debug, Clone)]
pub struct PgConnector {
    max_connections: u32,
}

impl PgConnector {
    pub fn new(max_connections: u32) -> Self {
        Self {
            max_connections: max_connections.max(1),
        }
    }

    pub fn connect_options(config: &PoolConfig) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

#[async_trait]
impl PoolConnector for PgConnector {
    async fn connect(&self, config: PoolConfig) -> Result<DatabasePoolRef> {
        // Connections are opened on first use.
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_lazy_with(Self::connect_options(&config));
        Ok(Arc::new(PgDatabasePool::new(pool)))
    }
}

#[derive(Debug, Clone)]
pub struct PgDatabasePool {
    pool: PgPool,
}

impl PgDatabasePool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_error(err: sqlx::Error) -> ServiceError {
    ServiceError::QueryExecution(err.to_string())
}

fn transaction_from_row(row: &PgRow) -> std::result::Result<PaymentTransaction, sqlx::Error> {
    Ok(PaymentTransaction {
        order_id: row.try_get("order_id")?,
        payment_status: row.try_get("payment_status")?,
        payment_gateway: row.try_get("payment_gateway")?,
        amount: row.try_get("amount")?,
        payment_date: row.try_get("payment_date")?,
        transfer_id: row.try_get("transfer_id")?,
    })
}

/// The insert has committed once a row comes back, so a row that cannot be
/// decoded must not surface as a failed insert; the submitted values stand in.
fn inserted_transaction(
    decoded: std::result::Result<PaymentTransaction, sqlx::Error>,
    submitted: &PaymentTransaction,
) -> PaymentTransaction {
    decoded.unwrap_or_else(|err| {
        warn!(
            order_id = submitted.order_id,
            error = %err,
            "transaction inserted but returned row is unreadable"
        );
        submitted.clone()
    })
}

#[async_trait]
impl DatabasePool for PgDatabasePool {
    async fn ping(&self) -> Result<String> {
        sqlx::query_scalar::<_, String>("SELECT NOW()::text")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)
    }

    async fn insert_transaction(&self, tx: &PaymentTransaction) -> Result<PaymentTransaction> {
        let row = sqlx::query(INSERT_TRANSACTION)
            .bind(tx.order_id)
            .bind(&tx.payment_status)
            .bind(&tx.payment_gateway)
            .bind(tx.amount)
            .bind(tx.payment_date)
            .bind(&tx.transfer_id)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(inserted_transaction(transaction_from_row(&row), tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_follow_config() {
        let config = PoolConfig {
            user: "p".into(),
            host: "db".into(),
            database: "pay".into(),
            password: "x".into(),
            port: 5433,
        };
        let options = PgConnector::connect_options(&config);
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "p");
        assert_eq!(options.get_database(), Some("pay"));
    }

    #[test]
    fn test_max_connections_at_least_one() {
        assert_eq!(PgConnector::new(0).max_connections, 1);
        assert_eq!(PgConnector::default().max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    fn submitted() -> PaymentTransaction {
        PaymentTransaction {
            order_id: 41,
            payment_status: "completed".into(),
            payment_gateway: "stripe".into(),
            amount: rust_decimal::Decimal::new(1999, 2),
            payment_date: chrono::Utc::now(),
            transfer_id: "tr_41".into(),
        }
    }

    #[test]
    fn test_unreadable_returned_row_keeps_insert() {
        let tx = submitted();
        let decoded = Err(sqlx::Error::ColumnNotFound("amount".into()));
        assert_eq!(inserted_transaction(decoded, &tx), tx);
    }

    #[test]
    fn test_decoded_row_wins_over_submitted() {
        let tx = submitted();
        let mut stored = tx.clone();
        stored.payment_status = "settled".into();
        assert_eq!(inserted_transaction(Ok(stored.clone()), &tx), stored);
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        // Nothing needs to listen on the target: no connection is opened yet.
        let config = PoolConfig {
            user: "p".into(),
            host: "127.0.0.1".into(),
            database: "pay".into(),
            password: "x".into(),
            port: 9,
        };
        assert!(PgConnector::default().connect(config).await.is_ok());
    }
}
