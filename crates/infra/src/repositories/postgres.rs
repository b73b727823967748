//! Postgres-backed user and tenant repositories.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|-----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | anything else | n/a | `Storage` |
//!
//! ## Claims
//!
//! Claim rows carry a `position` so the user's claim order survives a round
//! trip. `update` rewrites all claim rows of the user inside the same
//! transaction as the user row, so a reader never sees a half-written set.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use keystone_auth::{Tenant, User, UserClaim};
use keystone_core::{Audit, ClaimId, TenantId, UserId};

use super::{RepositoryError, TenantRepository, UserRepository};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Apply the schema (idempotent).
pub async fn migrate(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

const USER_COLUMNS: &str = "id, tenant_id, first_name, last_name, email, username, password_hash, phone_number, \
     is_active, email_confirmed, last_login_at, role, created_at, created_by_id, created_by_name, updated_at, \
     updated_by_id, updated_by_name";

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: Arc<PgPool>,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn fetch_one_where(&self, operation: &str, clause: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        match row {
            Some(row) => {
                let mut user = user_from_row(&row).map_err(|e| map_sqlx_error(operation, e))?;
                user.claims = self.load_claims(&[user.id]).await?.remove(&user.id).unwrap_or_default();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn load_claims(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, Vec<UserClaim>>, RepositoryError> {
        let ids: Vec<Uuid> = user_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, claim_type, claim_value,
                   created_at, created_by_id, created_by_name, updated_at, updated_by_id, updated_by_name
            FROM user_claims
            WHERE user_id = ANY($1)
            ORDER BY user_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_claims", e))?;

        let mut claims: HashMap<UserId, Vec<UserClaim>> = HashMap::new();
        for row in rows {
            let claim = claim_from_row(&row).map_err(|e| map_sqlx_error("load_claims", e))?;
            claims.entry(claim.user_id).or_default().push(claim);
        }
        Ok(claims)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        match row {
            Some(row) => {
                let mut user = user_from_row(&row).map_err(|e| map_sqlx_error("get_user", e))?;
                user.claims = self.load_claims(&[user.id]).await?.remove(&user.id).unwrap_or_default();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("get_user_by_email", "lower(email) = lower($1)", email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("get_user_by_username", "lower(username) = lower($1)", username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
            .bind(email)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists_by_email", e))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE lower(username) = lower($1))")
            .bind(username)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists_by_username", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = $1 ORDER BY username ASC");
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let mut users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let mut claims = self.load_claims(&ids).await?;
        for user in &mut users {
            user.claims = claims.remove(&user.id).unwrap_or_default();
        }
        Ok(users)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, tenant_id = %user.tenant_id), err)]
    async fn add(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, tenant_id, first_name, last_name, email, username, password_hash, phone_number,
                is_active, email_confirmed, last_login_at, role,
                created_at, created_by_id, created_by_name, updated_at, updated_by_id, updated_by_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.tenant_id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(user.is_active)
        .bind(user.email_confirmed)
        .bind(user.last_login_at)
        .bind(&user.role)
        .bind(user.audit.created_at)
        .bind(user.audit.created_by_id.as_uuid())
        .bind(&user.audit.created_by_name)
        .bind(user.audit.updated_at)
        .bind(user.audit.updated_by_id.map(|id| *id.as_uuid()))
        .bind(&user.audit.updated_by_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        insert_claims(&mut tx, user).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, claims = user.claims.len()), err)]
    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE users SET
                first_name = $2, last_name = $3, email = $4, username = $5, password_hash = $6,
                phone_number = $7, is_active = $8, email_confirmed = $9, last_login_at = $10, role = $11,
                updated_at = $12, updated_by_id = $13, updated_by_name = $14
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(user.is_active)
        .bind(user.email_confirmed)
        .bind(user.last_login_at)
        .bind(&user.role)
        .bind(user.audit.updated_at)
        .bind(user.audit.updated_by_id.map(|id| *id.as_uuid()))
        .bind(&user.audit.updated_by_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RepositoryError::NotFound(format!("user {}", user.id)));
        }

        sqlx::query("DELETE FROM user_claims WHERE user_id = $1")
            .bind(user.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_claims", e))?;

        insert_claims(&mut tx, user).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }
}

async fn insert_claims(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<(), RepositoryError> {
    for (position, claim) in user.claims.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO user_claims (
                id, user_id, position, claim_type, claim_value,
                created_at, created_by_id, created_by_name, updated_at, updated_by_id, updated_by_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(claim.id.as_uuid())
        .bind(user.id.as_uuid())
        .bind(position as i32)
        .bind(&claim.claim_type)
        .bind(&claim.claim_value)
        .bind(claim.audit.created_at)
        .bind(claim.audit.created_by_id.as_uuid())
        .bind(&claim.audit.created_by_name)
        .bind(claim.audit.updated_at)
        .bind(claim.audit.updated_by_id.map(|id| *id.as_uuid()))
        .bind(&claim.audit.updated_by_name)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_claim", e))?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenants
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresTenantRepository {
    pool: Arc<PgPool>,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

const TENANT_COLUMNS: &str = "id, name, code, description, domain, is_active, subscription_plan, created_at, \
     created_by_id, created_by_name, updated_at, updated_by_id, updated_by_name";

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn get_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_tenant", e))?;

        row.as_ref()
            .map(tenant_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_tenant", e))
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id, code = %tenant.code), err)]
    async fn add(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, code, description, domain, is_active, subscription_plan,
                created_at, created_by_id, created_by_name, updated_at, updated_by_id, updated_by_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.code)
        .bind(&tenant.description)
        .bind(&tenant.domain)
        .bind(tenant.is_active)
        .bind(&tenant.subscription_plan)
        .bind(tenant.audit.created_at)
        .bind(tenant.audit.created_by_id.as_uuid())
        .bind(&tenant.audit.created_by_name)
        .bind(tenant.audit.updated_at)
        .bind(tenant.audit.updated_by_id.map(|id| *id.as_uuid()))
        .bind(&tenant.audit.updated_by_name)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_tenant", e))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants ORDER BY name ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tenants", e))?;

        rows.iter()
            .map(tenant_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_tenants", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn audit_from_row(row: &PgRow) -> Result<Audit, sqlx::Error> {
    Ok(Audit {
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        created_by_id: UserId::from_uuid(row.try_get("created_by_id")?),
        created_by_name: row.try_get("created_by_name")?,
        updated_at: row.try_get("updated_at")?,
        updated_by_id: row.try_get::<Option<Uuid>, _>("updated_by_id")?.map(UserId::from_uuid),
        updated_by_name: row.try_get("updated_by_name")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        phone_number: row.try_get("phone_number")?,
        is_active: row.try_get("is_active")?,
        email_confirmed: row.try_get("email_confirmed")?,
        last_login_at: row.try_get("last_login_at")?,
        role: row.try_get("role")?,
        claims: Vec::new(),
        audit: audit_from_row(row)?,
    })
}

fn claim_from_row(row: &PgRow) -> Result<UserClaim, sqlx::Error> {
    Ok(UserClaim {
        id: ClaimId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        claim_type: row.try_get("claim_type")?,
        claim_value: row.try_get("claim_value")?,
        audit: audit_from_row(row)?,
    })
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, sqlx::Error> {
    Ok(Tenant {
        id: TenantId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        domain: row.try_get("domain")?,
        is_active: row.try_get("is_active")?,
        subscription_plan: row.try_get("subscription_plan")?,
        audit: audit_from_row(row)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => RepositoryError::Conflict(msg),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => RepositoryError::Storage(format!("connection pool closed in {operation}")),
        other => RepositoryError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}
