//! PostgreSQL storage for the tenancy service.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    CreateClassRequest, Membership, MembershipEntry, NurseryClass, Organization, Principal, Role,
    Session, UpdateClassRequest,
};
use crate::services::store::{
    generate_session_token, hash_session_token, ClassStore, Directory, SessionStore,
};
use service_core::error::AppError;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    session_ttl_minutes: i64,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        session_ttl_minutes: i64,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .idle_timeout(std::time::Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self::new(pool, session_ttl_minutes))
    }

    /// Create a new database wrapper from an existing connection pool.
    pub fn new(pool: PgPool, session_ttl_minutes: i64) -> Self {
        Self {
            pool,
            session_ttl_minutes,
        }
    }

    /// Run pending schema migrations.
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
        if err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict(anyhow::anyhow!("{}", message))
        } else {
            AppError::DatabaseError(anyhow::anyhow!(err))
        }
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self, principal_id: Uuid) -> Result<(Session, String), AppError> {
        let (raw, token_hash) = generate_session_token();
        let session = Session::new(principal_id, token_hash, self.session_ttl_minutes);

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, principal_id, token_hash, active_org_id, created_utc, expiry_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.session_id)
        .bind(session.principal_id)
        .bind(&session.token_hash)
        .bind(session.active_org_id)
        .bind(session.created_utc)
        .bind(session.expiry_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok((session, raw))
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let now = Utc::now();
        // Expiry is enforced here; a hit slides the window forward.
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET expiry_utc = $2
            WHERE token_hash = $1 AND expiry_utc > $3
            RETURNING *
            "#,
        )
        .bind(hash_session_token(token))
        .bind(now + Duration::minutes(self.session_ttl_minutes))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn invalidate_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn set_active_organization(
        &self,
        token: &str,
        organization_id: Uuid,
    ) -> Result<Session, AppError> {
        let session = self
            .get_session(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Session not found")))?;

        let role = self
            .membership_role(session.principal_id, organization_id)
            .await?;
        if role.is_none() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Not a member of the requested organization"
            )));
        }

        sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET active_org_id = $2
            WHERE session_id = $1
            RETURNING *
            "#,
        )
        .bind(session.session_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl Directory for Database {
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    async fn find_principal_by_id(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<Principal>, AppError> {
        sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE principal_id = $1")
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, AppError> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn create_principal(&self, principal: &Principal) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO principals (principal_id, email, display_name, password_hash, platform_admin, principal_state_code, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(principal.principal_id)
        .bind(&principal.email)
        .bind(&principal.display_name)
        .bind(&principal.password_hash)
        .bind(principal.platform_admin)
        .bind(&principal.principal_state_code)
        .bind(principal.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, "Email is already registered"))?;
        Ok(())
    }

    async fn list_memberships(
        &self,
        principal_id: Uuid,
    ) -> Result<Vec<MembershipEntry>, AppError> {
        sqlx::query_as::<_, MembershipEntry>(
            r#"
            SELECT m.org_id, o.org_name, m.role_code, m.created_utc
            FROM memberships m
            JOIN organizations o ON o.org_id = m.org_id
            WHERE m.principal_id = $1
            ORDER BY m.created_utc ASC, m.org_id ASC
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn membership_role(
        &self,
        principal_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE principal_id = $1 AND org_id = $2",
        )
        .bind(principal_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(membership.and_then(|m| m.role()))
    }

    async fn create_organization(&self, org: &Organization) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        sqlx::query(
            r#"
            INSERT INTO organizations (org_id, org_name, created_by, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(org.org_id)
        .bind(&org.org_name)
        .bind(org.created_by)
        .bind(org.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let owner = Membership::new(org.created_by, org.org_id, Role::Owner);
        sqlx::query(
            r#"
            INSERT INTO memberships (principal_id, org_id, role_code, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(owner.principal_id)
        .bind(owner.org_id)
        .bind(&owner.role_code)
        .bind(owner.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO memberships (principal_id, org_id, role_code, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(membership.principal_id)
        .bind(membership.org_id)
        .bind(&membership.role_code)
        .bind(membership.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Self::map_unique_violation(e, "Principal is already a member of this organization")
        })?;
        Ok(())
    }
}

#[async_trait]
impl ClassStore for Database {
    async fn list_classes(&self, org_id: Uuid) -> Result<Vec<NurseryClass>, AppError> {
        sqlx::query_as::<_, NurseryClass>(
            "SELECT * FROM classes WHERE org_id = $1 ORDER BY created_utc ASC",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_class(
        &self,
        org_id: Uuid,
        class_id: Uuid,
    ) -> Result<Option<NurseryClass>, AppError> {
        sqlx::query_as::<_, NurseryClass>(
            "SELECT * FROM classes WHERE org_id = $1 AND class_id = $2",
        )
        .bind(org_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn create_class(
        &self,
        org_id: Uuid,
        req: &CreateClassRequest,
    ) -> Result<NurseryClass, AppError> {
        let class = NurseryClass::new(org_id, req.name.clone(), req.room.clone(), req.capacity);

        sqlx::query(
            r#"
            INSERT INTO classes (class_id, org_id, class_name, room_label, capacity, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(class.class_id)
        .bind(class.org_id)
        .bind(&class.class_name)
        .bind(&class.room_label)
        .bind(class.capacity)
        .bind(class.created_utc)
        .bind(class.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(class)
    }

    async fn update_class(
        &self,
        org_id: Uuid,
        class_id: Uuid,
        req: &UpdateClassRequest,
    ) -> Result<Option<NurseryClass>, AppError> {
        sqlx::query_as::<_, NurseryClass>(
            r#"
            UPDATE classes
            SET class_name = COALESCE($3, class_name),
                room_label = COALESCE($4, room_label),
                capacity = COALESCE($5, capacity),
                updated_utc = $6
            WHERE org_id = $1 AND class_id = $2
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(class_id)
        .bind(&req.name)
        .bind(&req.room)
        .bind(req.capacity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn delete_class(&self, org_id: Uuid, class_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM classes WHERE org_id = $1 AND class_id = $2")
            .bind(org_id)
            .bind(class_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_connect_and_migrate() {
        let db = Database::connect("postgres://localhost/nestkeeper_test", 5, 1, 30)
            .await
            .expect("Failed to connect");
        db.run_migrations().await.expect("Migrations failed");
        db.health_check().await.expect("Health check failed");
    }
}
