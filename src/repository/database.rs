use std::time::Duration;

use deadpool::managed::Object;
use diesel::{Connection, ConnectionError, ConnectionResult, PgConnection};
use diesel_async::{
    pooled_connection::AsyncDieselConnectionManager, AsyncConnection, AsyncPgConnection,
    RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::error;
use openssl::ssl::{SslConnector, SslMethod};
use postgres_openssl::MakeTlsConnector;
use scoped_futures::{ScopedBoxFuture, ScopedFutureExt};
use serde::{Deserialize, Serialize};

use crate::config::config::Config;
use crate::repository::error::StoreError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = deadpool::managed::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type DbConn = Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Controls for one transaction: isolation level, how long to wait on row
/// locks inside the transaction, and an overall deadline for the whole
/// attempt.
#[derive(Debug, Clone, Copy)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub lock_timeout: Duration,
    pub deadline: Duration,
}

impl Default for TxOptions {
    fn default() -> Self {
        TxOptions {
            isolation: IsolationLevel::ReadCommitted,
            lock_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

pub struct Database {
    pool: DbPool,
}

impl Database {
    pub fn new(config: &Config) -> Self {
        let manager = match &config.database_ca_cert {
            Some(ca_cert) => {
                let ca_cert = ca_cert.clone();
                AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_setup(
                    &config.database_url,
                    move |url| {
                        let ca_cert = ca_cert.clone();
                        Box::pin(async move { Self::establish_tls(url, &ca_cert).await })
                    },
                )
            }
            None => AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url),
        };
        let pool = DbPool::builder(manager)
            .max_size(config.pool_max_size)
            .build()
            .expect("Failed to create pool.");
        Database { pool }
    }

    async fn establish_tls(database_url: &str, ca_cert: &str) -> ConnectionResult<AsyncPgConnection> {
        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        builder
            .set_ca_file(ca_cert)
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        let connector = MakeTlsConnector::new(builder.build());
        let (client, connection) = tokio_postgres::connect(database_url, connector)
            .await
            .map_err(|e| ConnectionError::BadConnection(Box::new(e).to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("database connection error: {e}");
            }
        });
        AsyncPgConnection::try_from(client).await
    }

    /// Applies pending embedded migrations over a synchronous connection.
    pub fn run_migrations(database_url: &str) -> Result<(), StoreError> {
        let mut conn = PgConnection::establish(database_url)
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn conn(&self) -> Result<DbConn, StoreError> {
        self.pool.get().await.map_err(StoreError::from)
    }

    /// Runs `callback` inside one BEGIN..COMMIT with the requested isolation
    /// level and lock timeout. Any error rolls every write back. If the
    /// deadline elapses the connection is detached from the pool (never
    /// recycled with a half-open transaction) and `TransactionTimeout` is
    /// returned.
    pub async fn transaction<'a, R, F>(&self, opts: TxOptions, callback: F) -> Result<R, StoreError>
    where
        R: Send + 'a,
        F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, Result<R, StoreError>>
            + Send
            + 'a,
    {
        let mut conn = self.conn().await?;
        let tx = conn.transaction::<R, StoreError, _>(|conn| {
            async move {
                diesel::sql_query(format!(
                    "SET TRANSACTION ISOLATION LEVEL {}",
                    opts.isolation.as_sql()
                ))
                .execute(conn)
                .await?;
                diesel::sql_query(format!(
                    "SET LOCAL lock_timeout = '{}ms'",
                    opts.lock_timeout.as_millis()
                ))
                .execute(conn)
                .await?;
                callback(conn).await
            }
            .scope_boxed()
        });

        match tokio::time::timeout(opts.deadline, tx).await {
            Ok(result) => result,
            Err(_) => {
                let _ = Object::take(conn);
                error!(
                    "transaction exceeded its deadline of {}ms",
                    opts.deadline.as_millis()
                );
                Err(StoreError::TransactionTimeout(format!(
                    "deadline of {}ms exceeded",
                    opts.deadline.as_millis()
                )))
            }
        }
    }
}
