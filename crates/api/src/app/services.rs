//! Service wiring: stores, token service, permission synchronizer and the
//! mediator with every request handler registered.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use keystone_auth::{Hs256TokenService, Role, Tenant, TokenService, User};
use keystone_core::{Audit, TenantId, UserId};
use keystone_infra::repositories::migrate;
use keystone_infra::{
    AppConfig, BootstrapAdmin, InMemoryTenantRepository, InMemoryUserRepository, PermissionSynchronizer,
    PostgresTenantRepository, PostgresUserRepository, TenantRepository, UserRepository,
};
use keystone_mediator::{LoggingOptions, Mediator, MediatorBuilder, MediatorOptions};

use crate::features::{
    CreateUser, CreateUserHandler, GetTenantById, GetTenantByIdHandler, GetUserById, GetUserByIdHandler,
    GetUserPermissions, GetUserPermissionsHandler, ListPermissions, ListPermissionsHandler, ListRoles, ListRolesHandler, ListTenantUsers,
    ListTenantUsersHandler, Login, LoginHandler, UpdateUserPermissions, UpdateUserPermissionsHandler, WhoAmI,
    WhoAmIHandler,
};

const DEFAULT_TENANT_CODE: &str = "DEFAULT";

pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub tenants: Arc<dyn TenantRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub synchronizer: PermissionSynchronizer,
    pub mediator: Mediator,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tenants: Arc<dyn TenantRepository>,
        tokens: Arc<dyn TokenService>,
        options: MediatorOptions,
    ) -> Self {
        let synchronizer = PermissionSynchronizer::new(users.clone());

        let mediator = MediatorBuilder::new(options)
            .register::<Login, _>(LoginHandler::new(users.clone(), tokens.clone()))
            .register::<WhoAmI, _>(WhoAmIHandler)
            .register::<CreateUser, _>(CreateUserHandler::new(users.clone(), tenants.clone(), synchronizer.clone()))
            .register::<GetUserById, _>(GetUserByIdHandler::new(users.clone()))
            .register::<GetUserPermissions, _>(GetUserPermissionsHandler::new(users.clone()))
            .register::<UpdateUserPermissions, _>(UpdateUserPermissionsHandler::new(
                users.clone(),
                synchronizer.clone(),
            ))
            .register::<GetTenantById, _>(GetTenantByIdHandler::new(tenants.clone()))
            .register::<ListTenantUsers, _>(ListTenantUsersHandler::new(tenants.clone(), users.clone()))
            .register::<ListRoles, _>(ListRolesHandler)
            .register::<ListPermissions, _>(ListPermissionsHandler)
            .build();

        Self {
            users,
            tenants,
            tokens,
            synchronizer,
            mediator,
        }
    }

    /// Services backed by in-memory stores (tests, local runs).
    pub fn in_memory(tokens: Arc<dyn TokenService>, options: MediatorOptions) -> Self {
        Self::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryTenantRepository::new()),
            tokens,
            options,
        )
    }

    pub async fn provision_tenant(&self, name: &str, code: &str, domain: &str) -> anyhow::Result<Tenant> {
        let tenant = Tenant::new(TenantId::new(), name, code, domain, Audit::system(Utc::now()));
        self.tenants.add(&tenant).await.context("failed to store tenant")?;
        info!(tenant_id = %tenant.id, code = %tenant.code, "tenant provisioned");
        Ok(tenant)
    }

    /// Create a user whose username is its email, with role permissions synced.
    pub async fn provision_user(
        &self,
        tenant_id: TenantId,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> anyhow::Result<User> {
        let mut user = User::new(UserId::new(), tenant_id, email, email, Audit::system(Utc::now()));
        user.password_hash = crate::features::hash_password(password.to_string()).await?;
        user.role = role.map(str::to_string);

        self.users.add(&user).await.context("failed to store user")?;
        self.synchronizer
            .sync_permissions_for_user(&mut user)
            .await
            .context("failed to synchronize permissions")?;
        Ok(user)
    }

    /// Ensure the configured administrator exists, creating the default
    /// tenant on first use.
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> anyhow::Result<()> {
        if self.users.exists_by_email(&admin.email).await.context("failed to check email")? {
            info!(email = %admin.email, "bootstrap admin already present");
            return Ok(());
        }

        let existing = self.tenants.list().await.context("failed to list tenants")?;
        let tenant = match existing.into_iter().find(|t| t.code.eq_ignore_ascii_case(DEFAULT_TENANT_CODE)) {
            Some(tenant) => tenant,
            None => self.provision_tenant("Default", DEFAULT_TENANT_CODE, "localhost").await?,
        };

        let user = self
            .provision_user(tenant.id, &admin.email, &admin.password, Some(Role::Admin.as_str()))
            .await?;
        info!(user_id = %user.id, tenant_id = %tenant.id, "bootstrap admin created");
        Ok(())
    }
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices").field("mediator", &self.mediator).finish_non_exhaustive()
    }
}

pub fn mediator_options(config: &AppConfig) -> MediatorOptions {
    MediatorOptions {
        logging: LoggingOptions {
            log_payloads: config.log_payloads,
            max_payload_size: config.max_payload_size,
        },
        ..MediatorOptions::default()
    }
}

/// Wire services from configuration: Postgres when `DATABASE_URL` is set,
/// in-memory stores otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set; signing tokens with the insecure dev default");
    }

    let tokens: Arc<dyn TokenService> = Arc::new(Hs256TokenService::new(
        config.jwt_secret.as_bytes(),
        config.jwt_issuer.clone(),
        config.jwt_audience.clone(),
        config.jwt_expiry_minutes,
    ));
    let options = mediator_options(config);

    let services = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to postgres")?;
            migrate(&pool).await.context("failed to apply migrations")?;
            info!("using postgres stores");

            AppServices::new(
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresTenantRepository::new(pool)),
                tokens,
                options,
            )
        }
        None => {
            info!("DATABASE_URL not set; using in-memory stores");
            AppServices::in_memory(tokens, options)
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        services.bootstrap_admin(admin).await?;
    }

    Ok(services)
}
