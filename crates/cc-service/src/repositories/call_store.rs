//! Call record store: conditional state transitions and directory reads.
//!
//! The store is the single source of serialization truth for a user's call
//! record. The ringing -> in_progress transition is a single conditional
//! `UPDATE ... RETURNING`, so concurrent acceptance attempts are resolved by
//! the database row lock: exactly one statement matches and mutates, every
//! other attempt matches zero rows and performs no write. This holds across
//! multiple service instances without process-local locking.
//!
//! # Security
//!
//! All queries use parameterized statements (SQL injection safe).

use crate::errors::CcError;
use crate::models::{CallRecord, CallStatus, DeviceEntry};
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Abstraction over the call record store.
///
/// Injected into the application state as a trait object so handlers can be
/// exercised against [`mock::MockCallStore`] in tests.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Atomically move the user's call record from `ringing` to
    /// `in_progress`, attaching the accepting device id.
    ///
    /// Returns `Some(record)` with the post-transition record if the
    /// transition committed. Returns `None` — with no mutation performed —
    /// when the record is absent, the stored call id does not match, or the
    /// status is not exactly `ringing`.
    async fn accept_ringing_call(
        &self,
        user_id: &str,
        call_id: &str,
        device_id: &str,
    ) -> Result<Option<CallRecord>, CcError>;

    /// Read the user's current call record, if any.
    ///
    /// Used for the post-abort diagnostic re-read that distinguishes the
    /// two conflict causes. Inherently racy; diagnostic only.
    async fn get_active_call(&self, user_id: &str) -> Result<Option<CallRecord>, CcError>;

    /// Read the user's device directory.
    async fn list_devices(&self, user_id: &str) -> Result<Vec<DeviceEntry>, CcError>;

    /// Cheap connectivity check for the readiness probe.
    async fn check_connectivity(&self) -> Result<(), CcError>;
}

/// PostgreSQL-backed call record store.
pub struct PgCallStore {
    pool: PgPool,
}

impl PgCallStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallStore for PgCallStore {
    #[instrument(skip_all, name = "cc.store.accept_ringing_call")]
    async fn accept_ringing_call(
        &self,
        user_id: &str,
        call_id: &str,
        device_id: &str,
    ) -> Result<Option<CallRecord>, CcError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            UPDATE call_records
            SET
                status = 'in_progress',
                accepted_by_device_id = $3,
                updated_at = NOW()
            WHERE user_id = $1
              AND call_id = $2
              AND status = 'ringing'
            RETURNING user_id, call_id, status, accepted_by_device_id, updated_at
            "#,
        )
        .bind(user_id)
        .bind(call_id)
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("accept_ringing_call", "error", start.elapsed());
            CcError::Database(e.to_string())
        })?;

        metrics::record_db_query("accept_ringing_call", "success", start.elapsed());

        row.map(map_row_to_call).transpose()
    }

    #[instrument(skip_all, name = "cc.store.get_active_call")]
    async fn get_active_call(&self, user_id: &str) -> Result<Option<CallRecord>, CcError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT user_id, call_id, status, accepted_by_device_id, updated_at
            FROM call_records
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("get_active_call", "error", start.elapsed());
            CcError::Database(e.to_string())
        })?;

        metrics::record_db_query("get_active_call", "success", start.elapsed());

        row.map(map_row_to_call).transpose()
    }

    #[instrument(skip_all, name = "cc.store.list_devices")]
    async fn list_devices(&self, user_id: &str) -> Result<Vec<DeviceEntry>, CcError> {
        let start = Instant::now();

        let rows = sqlx::query(
            r#"
            SELECT device_id, fcm_token
            FROM call_devices
            WHERE user_id = $1
            ORDER BY device_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("list_devices", "error", start.elapsed());
            CcError::Database(e.to_string())
        })?;

        metrics::record_db_query("list_devices", "success", start.elapsed());

        Ok(rows
            .into_iter()
            .map(|row| DeviceEntry {
                device_id: row.get("device_id"),
                fcm_token: row.get("fcm_token"),
            })
            .collect())
    }

    async fn check_connectivity(&self) -> Result<(), CcError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CcError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Map a database row to a `CallRecord`.
fn map_row_to_call(row: sqlx::postgres::PgRow) -> Result<CallRecord, CcError> {
    let status_raw: String = row.get("status");
    let status = CallStatus::parse(&status_raw).map_err(CcError::Internal)?;

    Ok(CallRecord {
        user_id: row.get("user_id"),
        call_id: row.get("call_id"),
        status,
        accepted_by_device_id: row.get("accepted_by_device_id"),
        updated_at: row.get("updated_at"),
    })
}

pub mod mock {
    //! In-memory `CallStore` for tests.
    //!
    //! The transition runs under a single mutex, which serializes concurrent
    //! acceptance attempts exactly like the database row lock does in
    //! production: one caller observes `ringing` and commits, the rest
    //! observe `in_progress` and abort.

    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockState {
        calls: HashMap<String, CallRecord>,
        devices: HashMap<String, Vec<DeviceEntry>>,
    }

    /// In-memory mock store.
    pub struct MockCallStore {
        state: Mutex<MockState>,
        unavailable: bool,
    }

    impl MockCallStore {
        /// An empty, healthy store.
        pub fn empty() -> Self {
            Self {
                state: Mutex::new(MockState::default()),
                unavailable: false,
            }
        }

        /// A store whose every operation fails with a database error.
        pub fn unavailable() -> Self {
            Self {
                state: Mutex::new(MockState::default()),
                unavailable: true,
            }
        }

        /// A healthy store seeded with one ringing call record.
        pub fn with_ringing_call(user_id: &str, call_id: &str) -> Self {
            let store = Self::empty();
            store.insert_call(CallRecord {
                user_id: user_id.to_string(),
                call_id: call_id.to_string(),
                status: CallStatus::Ringing,
                accepted_by_device_id: None,
                updated_at: Utc::now(),
            });
            store
        }

        /// Insert or overwrite a call record (test setup).
        pub fn insert_call(&self, record: CallRecord) {
            if let Ok(mut state) = self.state.lock() {
                state.calls.insert(record.user_id.clone(), record);
            }
        }

        /// Replace a user's device directory (test setup).
        pub fn set_devices(&self, user_id: &str, devices: Vec<DeviceEntry>) {
            if let Ok(mut state) = self.state.lock() {
                state.devices.insert(user_id.to_string(), devices);
            }
        }

        /// Read back a user's call record (test inspection).
        pub fn call(&self, user_id: &str) -> Option<CallRecord> {
            self.state
                .lock()
                .ok()
                .and_then(|state| state.calls.get(user_id).cloned())
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>, CcError> {
            if self.unavailable {
                return Err(CcError::Database("mock store unavailable".to_string()));
            }
            self.state
                .lock()
                .map_err(|_| CcError::Internal("mock store lock poisoned".to_string()))
        }
    }

    #[async_trait]
    impl CallStore for MockCallStore {
        async fn accept_ringing_call(
            &self,
            user_id: &str,
            call_id: &str,
            device_id: &str,
        ) -> Result<Option<CallRecord>, CcError> {
            let mut state = self.lock()?;

            match state.calls.get_mut(user_id) {
                Some(record)
                    if record.call_id == call_id && record.status == CallStatus::Ringing =>
                {
                    record.status = CallStatus::InProgress;
                    record.accepted_by_device_id = Some(device_id.to_string());
                    record.updated_at = Utc::now();
                    Ok(Some(record.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn get_active_call(&self, user_id: &str) -> Result<Option<CallRecord>, CcError> {
            let state = self.lock()?;
            Ok(state.calls.get(user_id).cloned())
        }

        async fn list_devices(&self, user_id: &str) -> Result<Vec<DeviceEntry>, CcError> {
            let state = self.lock()?;
            Ok(state.devices.get(user_id).cloned().unwrap_or_default())
        }

        async fn check_connectivity(&self) -> Result<(), CcError> {
            self.lock().map(|_| ())
        }
    }
}
