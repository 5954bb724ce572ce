//! SQLite-backed store.
//!
//! Every statement is parameterized. Conditional writes carry the
//! authorization and delivered-lock predicates in their `WHERE` clause so a
//! concurrent handler reassignment or delivery cannot slip between the
//! service's check and the write.

use super::{StoreError, StoreResult, TrackingStore};
use crate::models::{
    api_key::ApiKey,
    history::HistoryEvent,
    shipment::{MAX_SHIPMENT_ID, NewShipment, Shipment, ShipmentId, ShipmentPatch},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const SHIPMENT_COLUMNS: &str =
    "id, country_code, sender, receiver, express, signature, abandon, delivered, handler";

#[derive(Clone)]
pub struct SqliteStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema one statement at a time.
    ///
    /// Statements are `IF NOT EXISTS`, so running this twice is harmless.
    pub async fn migrate(&self) -> StoreResult<usize> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in &statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(statements.len())
    }
}

#[async_trait]
impl TrackingStore for SqliteStore {
    async fn api_key(&self, key: &str) -> StoreResult<Option<ApiKey>> {
        let row = sqlx::query_as::<Sqlite, ApiKey>(
            "SELECT key, operator, country_code FROM apikeys WHERE key = ? LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn operator_exists(&self, operator_name: &str) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM apikeys WHERE operator = ? LIMIT 1",
        )
        .bind(operator_name)
        .fetch_optional(&*self.db)
        .await?;
        Ok(found.is_some())
    }

    async fn insert_api_key(&self, api_key: ApiKey) -> StoreResult<()> {
        sqlx::query("INSERT INTO apikeys (key, operator, country_code) VALUES (?, ?, ?)")
            .bind(&api_key.key)
            .bind(&api_key.operator_name)
            .bind(&api_key.country_code)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    async fn insert_shipment(&self, shipment: NewShipment) -> StoreResult<Shipment> {
        // Rolling back also rewinds the AUTOINCREMENT counter, so a refused
        // insert neither leaves a row behind nor spends an id.
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, Shipment>(&format!(
            r#"
            INSERT INTO tracking (
                sender, receiver, express, signature, abandon, delivered,
                country_code, handler
            ) VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING {SHIPMENT_COLUMNS}
            "#
        ))
        .bind(&shipment.sender)
        .bind(&shipment.receiver)
        .bind(shipment.express)
        .bind(shipment.signature)
        .bind(shipment.abandon)
        .bind(&shipment.country_code)
        .bind(&shipment.handler)
        .fetch_one(&mut *tx)
        .await?;

        if row.id > MAX_SHIPMENT_ID {
            tx.rollback().await?;
            return Err(StoreError::IdSpaceExhausted(row.id));
        }
        tx.commit().await?;
        Ok(row)
    }

    async fn shipment(&self, id: ShipmentId) -> StoreResult<Option<Shipment>> {
        let row = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM tracking WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn shipment_for_key(&self, id: ShipmentId, key: &str) -> StoreResult<Option<Shipment>> {
        let row = sqlx::query_as::<_, Shipment>(
            r#"
            SELECT t.id, t.country_code, t.sender, t.receiver, t.express,
                   t.signature, t.abandon, t.delivered, t.handler
            FROM tracking t
            INNER JOIN apikeys a ON a.operator = t.handler
            WHERE t.id = ? AND a.key = ?
            "#,
        )
        .bind(id)
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn update_shipment(
        &self,
        id: ShipmentId,
        handler: &str,
        patch: &ShipmentPatch,
    ) -> StoreResult<Option<Shipment>> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE tracking SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(sender) = &patch.sender {
                set.push("sender = ").push_bind_unseparated(sender);
            }
            if let Some(receiver) = &patch.receiver {
                set.push("receiver = ").push_bind_unseparated(receiver);
            }
            if let Some(express) = patch.express {
                set.push("express = ").push_bind_unseparated(express);
            }
            if let Some(signature) = patch.signature {
                set.push("signature = ").push_bind_unseparated(signature);
            }
            if let Some(abandon) = patch.abandon {
                set.push("abandon = ").push_bind_unseparated(abandon);
            }
            if let Some(delivered) = patch.delivered {
                set.push("delivered = ").push_bind_unseparated(delivered);
            }
            if let Some(new_handler) = &patch.handler {
                set.push("handler = ").push_bind_unseparated(new_handler);
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND handler = ");
        builder.push_bind(handler);
        builder.push(" AND delivered = 0 RETURNING ");
        builder.push(SHIPMENT_COLUMNS);

        debug!("Executing shipment update: {}", builder.sql());
        let row = builder
            .build_query_as::<Shipment>()
            .fetch_optional(&*self.db)
            .await?;
        Ok(row)
    }

    async fn history(&self, id: ShipmentId) -> StoreResult<Vec<HistoryEvent>> {
        let rows = sqlx::query_as::<_, HistoryEvent>(
            "SELECT package_id, info, location, time FROM history
             WHERE package_id = ? ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn append_history(
        &self,
        id: ShipmentId,
        handler: &str,
        info: &str,
        location: &str,
    ) -> StoreResult<Option<HistoryEvent>> {
        let row = sqlx::query_as::<_, HistoryEvent>(
            r#"
            INSERT INTO history (package_id, info, location, time)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (
                SELECT 1 FROM tracking WHERE id = ? AND handler = ? AND delivered = 0
            )
            RETURNING package_id, info, location, time
            "#,
        )
        .bind(id)
        .bind(info)
        .bind(location)
        .bind(Utc::now())
        .bind(id)
        .bind(handler)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // Each connection to `sqlite::memory:` is its own database, so pin the pool to one.
    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect");
        let store = SqliteStore::new(Arc::new(pool));
        store.migrate().await.expect("migrate");
        store
            .insert_api_key(ApiKey {
                key: "key-acme".into(),
                operator_name: "ACME".into(),
                country_code: "US".into(),
            })
            .await
            .expect("key");
        store
            .insert_api_key(ApiKey {
                key: "key-mailwind".into(),
                operator_name: "MAILWIND".into(),
                country_code: "DE".into(),
            })
            .await
            .expect("key");
        store
    }

    fn new_shipment(handler: &str) -> NewShipment {
        NewShipment {
            country_code: "US".into(),
            sender: "A".into(),
            receiver: "B".into(),
            express: true,
            signature: false,
            abandon: false,
            handler: handler.into(),
        }
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = store().await;
        assert_eq!(store.migrate().await.expect("second run"), 5);
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = store().await;
        let first = store.insert_shipment(new_shipment("ACME")).await.unwrap();
        let second = store.insert_shipment(new_shipment("ACME")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.express);
        assert!(!first.delivered);
        assert_eq!(first.handler.as_deref(), Some("ACME"));
    }

    #[tokio::test]
    async fn insert_past_max_id_writes_nothing() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO tracking (id, sender, receiver, express, signature, abandon,
                                   delivered, country_code, handler)
             VALUES (?, 'A', 'B', 0, 0, 0, 0, 'US', 'ACME')",
        )
        .bind(MAX_SHIPMENT_ID)
        .execute(&*store.db)
        .await
        .unwrap();

        for _ in 0..2 {
            let err = store.insert_shipment(new_shipment("ACME")).await.unwrap_err();
            assert!(matches!(err, StoreError::IdSpaceExhausted(id) if id == MAX_SHIPMENT_ID + 1));
        }
        assert!(store.shipment(MAX_SHIPMENT_ID + 1).await.unwrap().is_none());

        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tracking")
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        let seq = sqlx::query_scalar::<_, i64>(
            "SELECT seq FROM sqlite_sequence WHERE name = 'tracking'",
        )
        .fetch_one(&*store.db)
        .await
        .unwrap();
        assert_eq!(seq, MAX_SHIPMENT_ID);
    }

    #[tokio::test]
    async fn shipment_for_key_requires_matching_handler() {
        let store = store().await;
        let s = store.insert_shipment(new_shipment("ACME")).await.unwrap();

        assert!(store.shipment_for_key(s.id, "key-acme").await.unwrap().is_some());
        assert!(store.shipment_for_key(s.id, "key-mailwind").await.unwrap().is_none());
        assert!(store.shipment_for_key(s.id, "nope").await.unwrap().is_none());
        assert!(store.shipment_for_key(999, "key-acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_applies_only_supplied_columns() {
        let store = store().await;
        let s = store.insert_shipment(new_shipment("ACME")).await.unwrap();

        let patch = ShipmentPatch {
            receiver: Some("C".into()),
            signature: Some(true),
            ..Default::default()
        };
        let updated = store
            .update_shipment(s.id, "ACME", &patch)
            .await
            .unwrap()
            .expect("row");
        assert_eq!(updated.sender, "A");
        assert_eq!(updated.receiver, "C");
        assert!(updated.signature);
        assert!(updated.express);
    }

    #[tokio::test]
    async fn update_is_refused_for_other_handler_or_delivered_row() {
        let store = store().await;
        let s = store.insert_shipment(new_shipment("ACME")).await.unwrap();
        let patch = ShipmentPatch {
            delivered: Some(true),
            ..Default::default()
        };

        assert!(store.update_shipment(s.id, "MAILWIND", &patch).await.unwrap().is_none());
        assert!(store.update_shipment(s.id, "ACME", &patch).await.unwrap().is_some());
        assert!(store.update_shipment(s.id, "ACME", &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_returned_in_insertion_order() {
        let store = store().await;
        let s = store.insert_shipment(new_shipment("ACME")).await.unwrap();
        for info in ["picked up", "in transit", "out for delivery"] {
            store
                .append_history(s.id, "ACME", info, "depot")
                .await
                .unwrap()
                .expect("inserted");
        }
        let infos: Vec<_> = store
            .history(s.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.info)
            .collect();
        assert_eq!(infos, ["picked up", "in transit", "out for delivery"]);
    }

    #[tokio::test]
    async fn append_is_refused_once_delivered() {
        let store = store().await;
        let s = store.insert_shipment(new_shipment("ACME")).await.unwrap();
        let delivered = ShipmentPatch {
            delivered: Some(true),
            ..Default::default()
        };
        store.update_shipment(s.id, "ACME", &delivered).await.unwrap();

        let appended = store.append_history(s.id, "ACME", "late", "depot").await.unwrap();
        assert!(appended.is_none());
        assert!(store.history(s.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn operator_lookup() {
        let store = store().await;
        assert!(store.operator_exists("MAILWIND").await.unwrap());
        assert!(!store.operator_exists("NOBODY").await.unwrap());
        let key = store.api_key("key-mailwind").await.unwrap().expect("key");
        assert_eq!(key.country_code, "DE");
    }
}
