use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection,
};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config).max_size(10).build()?;

    Ok(pool)
}

// User database operations
pub mod users {
    use chrono::Utc;
    use diesel::dsl::sql;
    use diesel::prelude::*;
    use diesel::sql_types::Bool;
    use diesel::upsert::excluded;
    use diesel_async::{AsyncPgConnection, RunQueryDsl};

    use crate::models::{NewUser, UpsertOutcome, User, UserLogin, UserRow};

    pub async fn find_by_external_id(
        conn: &mut AsyncPgConnection,
        subject: &str,
    ) -> anyhow::Result<Option<User>> {
        use crate::schema::users::dsl::*;

        let row = users
            .filter(external_id.eq(subject))
            .select(UserRow::as_select())
            .first(conn)
            .await
            .optional()?;

        row.map(User::try_from).transpose()
    }

    /// Insert the user or refresh their profile in a single statement.
    ///
    /// `role`, `email_verified` and `created_at` are never part of the
    /// conflict update, and the stored refresh token survives a login that
    /// did not return a new one.
    ///
    /// `created` comes from `xmax = 0`, which Postgres only reports for a row
    /// this statement inserted.
    pub async fn upsert_login(
        conn: &mut AsyncPgConnection,
        login: &UserLogin,
    ) -> anyhow::Result<UpsertOutcome> {
        use crate::schema::users::dsl::*;

        let new_user = NewUser::from_login(login, Utc::now());
        let insert = diesel::insert_into(users)
            .values(&new_user)
            .on_conflict(external_id)
            .do_update();

        let (row, created): (UserRow, bool) = match login.refresh_token {
            Some(_) => {
                insert
                    .set((
                        email.eq(excluded(email)),
                        display_name.eq(excluded(display_name)),
                        avatar_url.eq(excluded(avatar_url)),
                        refresh_token.eq(excluded(refresh_token)),
                        updated_at.eq(excluded(updated_at)),
                    ))
                    .returning((UserRow::as_returning(), sql::<Bool>("xmax = 0")))
                    .get_result(conn)
                    .await?
            }
            None => {
                insert
                    .set((
                        email.eq(excluded(email)),
                        display_name.eq(excluded(display_name)),
                        avatar_url.eq(excluded(avatar_url)),
                        updated_at.eq(excluded(updated_at)),
                    ))
                    .returning((UserRow::as_returning(), sql::<Bool>("xmax = 0")))
                    .get_result(conn)
                    .await?
            }
        };

        Ok(UpsertOutcome {
            user: User::try_from(row)?,
            created,
        })
    }
}

// Manager database operations
pub mod managers {
    use diesel::prelude::*;
    use diesel_async::{AsyncPgConnection, RunQueryDsl};
    use shared::models::Manager;
    use uuid::Uuid;

    use crate::models::{ManagerChanges, ManagerRow, NewManager};

    pub async fn list_for_admin(
        conn: &mut AsyncPgConnection,
        admin: &str,
    ) -> anyhow::Result<Vec<Manager>> {
        use crate::schema::managers::dsl::*;

        let rows = managers
            .filter(admin_external_id.eq(admin))
            .order_by(created_at.desc())
            .select(ManagerRow::as_select())
            .load(conn)
            .await?;

        rows.into_iter().map(Manager::try_from).collect()
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_manager: &NewManager,
    ) -> anyhow::Result<Uuid> {
        use crate::schema::managers::dsl::*;

        let inserted = diesel::insert_into(managers)
            .values(new_manager)
            .returning(id)
            .get_result::<Uuid>(conn)
            .await?;

        Ok(inserted)
    }

    pub async fn find_for_admin(
        conn: &mut AsyncPgConnection,
        admin: &str,
        manager_id: Uuid,
    ) -> anyhow::Result<Option<Manager>> {
        use crate::schema::managers::dsl::*;

        let row = managers
            .filter(id.eq(manager_id))
            .filter(admin_external_id.eq(admin))
            .select(ManagerRow::as_select())
            .first(conn)
            .await
            .optional()?;

        row.map(Manager::try_from).transpose()
    }

    pub async fn update_for_admin(
        conn: &mut AsyncPgConnection,
        admin: &str,
        manager_id: Uuid,
        changes: &ManagerChanges,
    ) -> anyhow::Result<Option<Manager>> {
        use crate::schema::managers::dsl::*;

        // An empty changeset is a query builder error in diesel
        if changes.is_empty() {
            return find_for_admin(conn, admin, manager_id).await;
        }

        let row = diesel::update(
            managers
                .filter(id.eq(manager_id))
                .filter(admin_external_id.eq(admin)),
        )
        .set(changes)
        .returning(ManagerRow::as_returning())
        .get_result(conn)
        .await
        .optional()?;

        row.map(Manager::try_from).transpose()
    }

    pub async fn delete_for_admin(
        conn: &mut AsyncPgConnection,
        admin: &str,
        manager_id: Uuid,
    ) -> anyhow::Result<bool> {
        use crate::schema::managers::dsl::*;

        let deleted = diesel::delete(
            managers
                .filter(id.eq(manager_id))
                .filter(admin_external_id.eq(admin)),
        )
        .execute(conn)
        .await?;

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserLogin;
    use shared::models::Role;

    fn login(subject: &str, role: Role) -> UserLogin {
        UserLogin {
            external_id: subject.to_string(),
            email: "ada@example.com".to_string(),
            display_name: "Ada".to_string(),
            avatar_url: "https://lh3.googleusercontent.com/a/x=s96-c".to_string(),
            email_verified: true,
            role,
            refresh_token: None,
        }
    }

    fn test_pool() -> Option<DbPool> {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(establish_connection_pool(&url).unwrap())
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL with migrations applied"]
    async fn test_upsert_login_against_postgres() {
        let Some(pool) = test_pool() else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let subject = format!("pg-{}", uuid::Uuid::new_v4());

        let mut conn = pool.get().await.unwrap();
        let first = users::upsert_login(&mut conn, &login(&subject, Role::Admin))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.user.role, Role::Admin);
        assert!(first.user.avatar_url.ends_with("s400-c"));

        let mut again = login(&subject, Role::Creator);
        again.refresh_token = Some("1//stored".to_string());
        let second = users::upsert_login(&mut conn, &again).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.user.role, Role::Admin);
        assert_eq!(second.user.created_at, first.user.created_at);

        // A login without a refresh token keeps the stored one
        let third = users::upsert_login(&mut conn, &login(&subject, Role::Editor))
            .await
            .unwrap();
        assert!(!third.created);
        assert_eq!(third.user.refresh_token.as_deref(), Some("1//stored"));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL with migrations applied"]
    async fn test_concurrent_upserts_create_one_row() {
        let Some(pool) = test_pool() else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let subject = format!("pg-{}", uuid::Uuid::new_v4());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                let subject = subject.clone();
                tokio::spawn(async move {
                    let mut conn = pool.get().await.unwrap();
                    users::upsert_login(&mut conn, &login(&subject, Role::Creator))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }

        assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
        let first_id = outcomes[0].user.id;
        assert!(outcomes.iter().all(|o| o.user.id == first_id));

        let mut conn = pool.get().await.unwrap();
        let stored = users::find_by_external_id(&mut conn, &subject)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first_id);
    }
}
