//! Persistence collaborator used by the handlers.
//!
//! Handlers only see the [`UserStore`] trait so the exchange flow can run
//! against Postgres in production and an in-memory store in tests.

use anyhow::Result;
use async_trait::async_trait;
use shared::models::Manager;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::models::{ManagerChanges, NewManager, UpsertOutcome, User, UserLogin};

/// Storage operations the service depends on.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by the issuer's subject id.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>>;

    /// Atomically create the user or refresh the mutable profile fields.
    ///
    /// Implementations must guarantee one record per `external_id` even
    /// when called concurrently for the same identity.
    async fn upsert_login(&self, login: &UserLogin) -> Result<UpsertOutcome>;

    /// Managers created by the given admin, newest first.
    async fn list_managers(&self, admin_external_id: &str) -> Result<Vec<Manager>>;

    /// Insert a manager and return its id.
    async fn insert_manager(&self, manager: NewManager) -> Result<Uuid>;

    /// A manager owned by the given admin; `None` when missing or foreign.
    async fn find_manager(&self, admin_external_id: &str, id: Uuid) -> Result<Option<Manager>>;

    /// Apply `changes` to an owned manager and return the updated record.
    async fn update_manager(
        &self,
        admin_external_id: &str,
        id: Uuid,
        changes: ManagerChanges,
    ) -> Result<Option<Manager>>;

    /// Delete an owned manager; `false` when nothing matched.
    async fn delete_manager(&self, admin_external_id: &str, id: Uuid) -> Result<bool>;
}

/// Postgres-backed store using the diesel-async pool.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let mut conn = self.pool.get().await?;
        db::users::find_by_external_id(&mut conn, external_id).await
    }

    async fn upsert_login(&self, login: &UserLogin) -> Result<UpsertOutcome> {
        let mut conn = self.pool.get().await?;
        db::users::upsert_login(&mut conn, login).await
    }

    async fn list_managers(&self, admin_external_id: &str) -> Result<Vec<Manager>> {
        let mut conn = self.pool.get().await?;
        db::managers::list_for_admin(&mut conn, admin_external_id).await
    }

    async fn insert_manager(&self, manager: NewManager) -> Result<Uuid> {
        let mut conn = self.pool.get().await?;
        db::managers::create(&mut conn, &manager).await
    }

    async fn find_manager(&self, admin_external_id: &str, id: Uuid) -> Result<Option<Manager>> {
        let mut conn = self.pool.get().await?;
        db::managers::find_for_admin(&mut conn, admin_external_id, id).await
    }

    async fn update_manager(
        &self,
        admin_external_id: &str,
        id: Uuid,
        changes: ManagerChanges,
    ) -> Result<Option<Manager>> {
        let mut conn = self.pool.get().await?;
        db::managers::update_for_admin(&mut conn, admin_external_id, id, &changes).await
    }

    async fn delete_manager(&self, admin_external_id: &str, id: Uuid) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        db::managers::delete_for_admin(&mut conn, admin_external_id, id).await
    }
}
