use async_trait::async_trait;
use auth::Claims;

use crate::domain::errors::AppError;
use crate::domain::user::dto::LoginResult;
use crate::domain::user::dto::UserDto;
use crate::domain::user::dto::UserPage;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::FullName;
use crate::domain::user::models::ListUsersQuery;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Role;
use crate::domain::user::models::RoleId;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;

/// Port for user domain service operations.
///
/// Operations that act on behalf of a caller take the verified token claims
/// explicitly; `None` means the caller is anonymous.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register a new account.
    ///
    /// # Arguments
    /// * `command` - Validated username, email, password and full name
    ///
    /// # Returns
    /// The created user with no roles
    ///
    /// # Errors
    /// * `UserExists` - Username or email is already taken
    /// * `Internal` - Hashing or storage failed
    async fn register(&self, command: RegisterCommand) -> Result<UserDto, AppError>;

    /// Authenticate by username and password.
    ///
    /// # Arguments
    /// * `username` - Raw username, trimmed before lookup
    /// * `password` - Plaintext password
    ///
    /// # Returns
    /// Signed tokens and the user
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown user or wrong password
    /// * `UserDisabled` - Account is disabled
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AppError>;

    /// Current caller's own record.
    ///
    /// # Errors
    /// * `Unauthenticated` - Missing claims or subject no longer exists
    async fn profile(&self, claims: Option<&Claims>) -> Result<UserDto, AppError>;

    /// Replace the caller's password after checking the current one.
    ///
    /// # Errors
    /// * `Unauthenticated` - Missing claims or subject no longer exists
    /// * `InvalidCredentials` - `old_password` does not match
    /// * `Validation` - `new_password` violates the password policy
    async fn change_password(
        &self,
        claims: Option<&Claims>,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError>;

    /// Update the caller's email and full name.
    ///
    /// # Errors
    /// * `Unauthenticated` - Missing claims or subject no longer exists
    /// * `UserExists` - Email belongs to another user
    async fn update_profile(
        &self,
        claims: Option<&Claims>,
        command: UpdateProfileCommand,
    ) -> Result<UserDto, AppError>;

    /// Admin: paged, filtered user listing.
    ///
    /// # Errors
    /// * `Unauthenticated` / `Forbidden` - Caller is not an admin
    /// * `Validation` - Unknown status filter
    async fn list_users(
        &self,
        claims: Option<&Claims>,
        query: ListUsersQuery,
    ) -> Result<UserPage, AppError>;

    /// Admin: enable or disable an account.
    ///
    /// # Errors
    /// * `Unauthenticated` / `Forbidden` - Caller is not an admin
    /// * `UserNotFound` - No such user
    async fn set_user_status(
        &self,
        claims: Option<&Claims>,
        user_id: &UserId,
        status: UserStatus,
    ) -> Result<UserDto, AppError>;

    /// Admin: replace a user's role set.
    ///
    /// # Errors
    /// * `Unauthenticated` / `Forbidden` - Caller is not an admin
    /// * `UserNotFound` - No such user
    /// * `Validation` - Empty role list or unknown role names
    async fn assign_roles(
        &self,
        claims: Option<&Claims>,
        user_id: &UserId,
        roles: Vec<String>,
    ) -> Result<UserDto, AppError>;
}

/// Persistence operations for user aggregate.
///
/// Every read returns users hydrated with their roles.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `UserExists` - Unique constraint on username or email violated
    /// * `Internal` - Database operation failed
    async fn create(&self, user: User) -> Result<User, AppError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AppError>;

    /// Retrieve user by exact username.
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AppError>;

    /// Whether any user holds this username or this email.
    async fn exists_by_username_or_email(
        &self,
        username: &Username,
        email: &EmailAddress,
    ) -> Result<bool, AppError>;

    /// Whether a user other than `id` holds this email.
    async fn email_taken_by_other(
        &self,
        email: &EmailAddress,
        id: &UserId,
    ) -> Result<bool, AppError>;

    /// Update email and full name.
    ///
    /// # Returns
    /// `false` when no row matched
    ///
    /// # Errors
    /// * `UserExists` - Email unique constraint violated
    async fn update_profile(
        &self,
        id: &UserId,
        email: &EmailAddress,
        full_name: &FullName,
    ) -> Result<bool, AppError>;

    /// Replace the stored password hash.
    ///
    /// # Returns
    /// `false` when no row matched
    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<bool, AppError>;

    /// Set account status.
    ///
    /// # Returns
    /// `false` when no row matched
    async fn update_status(&self, id: &UserId, status: UserStatus) -> Result<bool, AppError>;

    /// Stamp `last_login_at` with the current time.
    async fn touch_last_login(&self, id: &UserId) -> Result<(), AppError>;

    /// Filtered window ordered by creation time, newest first.
    ///
    /// # Returns
    /// Users in the window and the total number of matching users
    async fn list(
        &self,
        filter: &UserFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), AppError>;

    /// Resolve role names case-insensitively. Unknown names are skipped.
    async fn find_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, AppError>;

    /// Atomically replace the user's role links.
    async fn replace_roles(&self, id: &UserId, role_ids: &[RoleId]) -> Result<(), AppError>;
}
