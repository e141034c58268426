use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::Claims;
use auth::PasswordError;
use auth::RoleGuard;
use chrono::Utc;
use serde_json::json;

use crate::config::PaginationConfig;
use crate::domain::errors::AppError;
use crate::domain::user::dto::LoginResult;
use crate::domain::user::dto::UserDto;
use crate::domain::user::dto::UserPage;
use crate::domain::user::models::ListUsersQuery;
use crate::domain::user::models::NewPassword;
use crate::domain::user::models::PageRequest;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Role required by the administrative operations.
pub const ADMIN_ROLE: &str = "admin";

/// Domain service implementation for user operations.
///
/// Concrete implementation of UserServicePort with dependency injection.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
    pagination: PaginationConfig,
    admin_guard: RoleGuard,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token issuance
    /// * `pagination` - Page size defaults for the admin listing
    ///
    /// # Returns
    /// Configured user service instance
    pub fn new(
        repository: Arc<UR>,
        authenticator: Arc<Authenticator>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            repository,
            authenticator,
            pagination,
            admin_guard: RoleGuard::new([ADMIN_ROLE]),
        }
    }

    /// Resolve the caller behind `claims`.
    async fn current_user(&self, claims: Option<&Claims>) -> Result<User, AppError> {
        let claims = claims.ok_or(AppError::Unauthenticated)?;

        let user_id = UserId::from_string(&claims.sub).map_err(|e| {
            tracing::warn!(subject = %claims.sub, error = %e, "Token subject is not a user id");
            AppError::Unauthenticated
        })?;

        self.repository.find_by_id(&user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Token subject no longer exists");
            AppError::Unauthenticated
        })
    }

    fn require_admin(&self, claims: Option<&Claims>) -> Result<(), AppError> {
        self.admin_guard.authorize(claims).map_err(|e| {
            tracing::warn!(
                subject = claims.map(|c| c.sub.as_str()).unwrap_or("anonymous"),
                error = %e,
                "Admin operation rejected"
            );
            AppError::from(e)
        })
    }

    fn hash_password(&self, password: &NewPassword) -> Result<String, AppError> {
        self.authenticator
            .hash_password(password.expose())
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing failed");
                AppError::Internal(format!("Password hashing failed: {}", e))
            })
    }

    /// Every verification failure reads as bad credentials to the caller.
    fn check_password(&self, user: &User, password: &str) -> Result<(), AppError> {
        match self
            .authenticator
            .verify_password(&user.password_hash, password)
        {
            Ok(()) => Ok(()),
            Err(PasswordError::InvalidHash(e)) => {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash is corrupt");
                Err(AppError::InvalidCredentials)
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, reason = %e, "Password mismatch");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    async fn reload(&self, id: &UserId, missing: AppError) -> Result<User, AppError> {
        self.repository.find_by_id(id).await?.ok_or(missing)
    }
}

/// Trim, drop blanks and dedupe case-insensitively, keeping the first spelling.
fn normalize_role_names(roles: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    roles
        .into_iter()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .filter(|role| seen.insert(role.to_lowercase()))
        .collect()
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<UserDto, AppError> {
        if self
            .repository
            .exists_by_username_or_email(&command.username, &command.email)
            .await?
        {
            tracing::info!(username = %command.username, "Registration rejected: user exists");
            return Err(AppError::UserExists);
        }

        let password_hash = self.hash_password(&command.password)?;
        let now = Utc::now();

        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            password_hash,
            full_name: command.full_name,
            status: UserStatus::Enabled,
            roles: Vec::new(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let created_user = self.repository.create(user).await?;

        tracing::info!(
            user_id = %created_user.id,
            username = %created_user.username,
            "User registered"
        );

        Ok(UserDto::from(&created_user))
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AppError> {
        let username = Username::new(username).map_err(|_| {
            tracing::warn!("Login rejected: malformed username");
            AppError::InvalidCredentials
        })?;

        let user = self
            .repository
            .find_by_username(&username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username = %username, "Login rejected: unknown user");
                AppError::InvalidCredentials
            })?;

        if user.status == UserStatus::Disabled {
            tracing::warn!(user_id = %user.id, "Login rejected: user disabled");
            return Err(AppError::UserDisabled);
        }

        self.check_password(&user, password)?;

        let session = self
            .authenticator
            .issue_session(user.id, user.role_names())?;

        if let Err(e) = self.repository.touch_last_login(&user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to record last login");
        }

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResult {
            access_token: session.access_token,
            expires_at: session.expires_at,
            refresh_token: session.refresh_token,
            user: UserDto::from(&user),
        })
    }

    async fn profile(&self, claims: Option<&Claims>) -> Result<UserDto, AppError> {
        let user = self.current_user(claims).await?;
        Ok(UserDto::from(&user))
    }

    async fn change_password(
        &self,
        claims: Option<&Claims>,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self.current_user(claims).await?;

        self.check_password(&user, old_password)?;

        let new_password = NewPassword::new(new_password)?;
        let password_hash = self.hash_password(&new_password)?;

        if !self
            .repository
            .update_password(&user.id, &password_hash)
            .await?
        {
            return Err(AppError::Unauthenticated);
        }

        tracing::info!(user_id = %user.id, "Password changed");

        Ok(())
    }

    async fn update_profile(
        &self,
        claims: Option<&Claims>,
        command: UpdateProfileCommand,
    ) -> Result<UserDto, AppError> {
        let user = self.current_user(claims).await?;

        if self
            .repository
            .email_taken_by_other(&command.email, &user.id)
            .await?
        {
            return Err(AppError::UserExists);
        }

        if !self
            .repository
            .update_profile(&user.id, &command.email, &command.full_name)
            .await?
        {
            return Err(AppError::Unauthenticated);
        }

        let updated_user = self.reload(&user.id, AppError::Unauthenticated).await?;

        tracing::info!(user_id = %updated_user.id, "Profile updated");

        Ok(UserDto::from(&updated_user))
    }

    async fn list_users(
        &self,
        claims: Option<&Claims>,
        query: ListUsersQuery,
    ) -> Result<UserPage, AppError> {
        self.require_admin(claims)?;

        let filter = UserFilter::parse(query.keyword.as_deref(), query.status.as_deref())?;
        let page = PageRequest::normalize(
            query.page,
            query.page_size,
            self.pagination.default_page_size,
            self.pagination.max_page_size,
        );

        let (users, total_items) = self
            .repository
            .list(&filter, page.offset(), page.limit())
            .await?;

        Ok(UserPage {
            data: users.iter().map(UserDto::from).collect(),
            page: page.page,
            page_size: page.page_size,
            total_items,
            total_pages: page.total_pages(total_items),
        })
    }

    async fn set_user_status(
        &self,
        claims: Option<&Claims>,
        user_id: &UserId,
        status: UserStatus,
    ) -> Result<UserDto, AppError> {
        self.require_admin(claims)?;

        if !self.repository.update_status(user_id, status).await? {
            return Err(AppError::UserNotFound);
        }

        let user = self.reload(user_id, AppError::UserNotFound).await?;

        tracing::info!(user_id = %user.id, status = %status, "User status changed");

        Ok(UserDto::from(&user))
    }

    async fn assign_roles(
        &self,
        claims: Option<&Claims>,
        user_id: &UserId,
        roles: Vec<String>,
    ) -> Result<UserDto, AppError> {
        self.require_admin(claims)?;

        self.reload(user_id, AppError::UserNotFound).await?;

        let names = normalize_role_names(roles);
        if names.is_empty() {
            return Err(AppError::validation("At least one role is required"));
        }

        let resolved = self.repository.find_roles_by_names(&names).await?;
        let known: HashSet<String> = resolved.iter().map(|r| r.name.to_lowercase()).collect();
        let missing: Vec<&String> = names
            .iter()
            .filter(|name| !known.contains(&name.to_lowercase()))
            .collect();

        if !missing.is_empty() {
            return Err(AppError::Validation {
                message: "Unknown roles".to_string(),
                details: Some(json!({ "missingRoles": missing })),
            });
        }

        let role_ids: Vec<_> = resolved.iter().map(|r| r.id).collect();
        self.repository.replace_roles(user_id, &role_ids).await?;

        let user = self.reload(user_id, AppError::UserNotFound).await?;

        tracing::info!(user_id = %user.id, roles = ?user.role_names(), "Roles assigned");

        Ok(UserDto::from(&user))
    }
}
