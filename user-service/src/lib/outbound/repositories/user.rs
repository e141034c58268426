use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::QueryBuilder;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::errors::AppError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::FullName;
use crate::domain::user::models::Role;
use crate::domain::user::models::RoleId;
use crate::domain::user::models::User;
use crate::domain::user::models::UserFilter;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserStatus;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, status, \
                            last_login_at, created_at, updated_at";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Map a user row without roles. Stored values that no longer validate are
    /// treated as a storage fault.
    fn row_to_user(row: &PgRow) -> Result<User, AppError> {
        let status: String = row.get("status");

        Ok(User {
            id: UserId(row.get("id")),
            username: Username::new(row.get::<String, _>("username")).map_err(corrupt_row)?,
            email: EmailAddress::new(row.get::<String, _>("email")).map_err(corrupt_row)?,
            password_hash: row.get("password_hash"),
            full_name: FullName::new(row.get::<String, _>("full_name")).map_err(corrupt_row)?,
            status: status.parse::<UserStatus>().map_err(corrupt_row)?,
            roles: Vec::new(),
            last_login_at: row.get("last_login_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn row_to_role(row: &PgRow) -> Role {
        Role {
            id: RoleId(row.get("id")),
            name: row.get("name"),
            description: row.get("description"),
        }
    }

    /// Attach linked roles to each user with a single query.
    async fn hydrate(&self, mut users: Vec<User>) -> Result<Vec<User>, AppError> {
        if users.is_empty() {
            return Ok(users);
        }

        let ids: Vec<Uuid> = users.iter().map(|u| u.id.0).collect();

        let rows = sqlx::query(
            r#"
            SELECT ur.user_id, r.id, r.name, r.description
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ANY($1)
            ORDER BY r.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load user roles"))?;

        let mut roles_by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for row in &rows {
            roles_by_user
                .entry(row.get("user_id"))
                .or_default()
                .push(Self::row_to_role(row));
        }

        for user in &mut users {
            user.roles = roles_by_user.remove(&user.id.0).unwrap_or_default();
        }

        Ok(users)
    }

    async fn hydrate_one(&self, row: Option<PgRow>) -> Result<Option<User>, AppError> {
        match row {
            Some(row) => {
                let user = Self::row_to_user(&row)?;
                Ok(self.hydrate(vec![user]).await?.pop())
            }
            None => Ok(None),
        }
    }
}

/// Log a sqlx failure and collapse it to an internal error.
fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!(operation, error = %e, "Database operation failed");
        AppError::Internal(format!("{}: {}", operation, e))
    }
}

/// Like [`db_error`], but unique violations on username or email become
/// `UserExists`.
fn write_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation()
                && matches!(
                    db_err.constraint(),
                    Some("users_username_key") | Some("users_email_key")
                )
            {
                return AppError::UserExists;
            }
        }
        db_error(operation)(e)
    }
}

fn corrupt_row(e: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %e, "Stored user row failed validation");
    AppError::Internal(format!("Corrupt user row: {}", e))
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(keyword) = &filter.keyword {
        builder.push(" AND (STRPOS(LOWER(username), ");
        builder.push_bind(keyword.clone());
        builder.push(") > 0 OR STRPOS(LOWER(email), ");
        builder.push_bind(keyword.clone());
        builder.push(") > 0 OR STRPOS(LOWER(full_name), ");
        builder.push_bind(keyword.clone());
        builder.push(") > 0)");
    }

    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, status,
                               last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.full_name.as_str())
        .bind(user.status.as_str())
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error("insert user"))?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find user by id"))?;

        self.hydrate_one(row).await
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find user by username"))?;

        self.hydrate_one(row).await
    }

    async fn exists_by_username_or_email(
        &self,
        username: &Username,
        email: &EmailAddress,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users WHERE username = $1 OR email = $2
            ) AS taken
            "#,
        )
        .bind(username.as_str())
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check user exists"))?;

        Ok(row.get("taken"))
    }

    async fn email_taken_by_other(
        &self,
        email: &EmailAddress,
        id: &UserId,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users WHERE email = $1 AND id <> $2
            ) AS taken
            "#,
        )
        .bind(email.as_str())
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check email owner"))?;

        Ok(row.get("taken"))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        email: &EmailAddress,
        full_name: &FullName,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, full_name = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(email.as_str())
        .bind(full_name.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(write_error("update profile"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error("update password"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(&self, id: &UserId, status: UserStatus) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error("update status"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: &UserId) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id.0)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_error("touch last login"))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &UserFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), AppError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count, filter);

        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count users"))?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filter(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list users"))?;

        let users = rows
            .iter()
            .map(Self::row_to_user)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((self.hydrate(users).await?, total))
    }

    async fn find_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, AppError> {
        let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, name, description
            FROM roles
            WHERE LOWER(name) = ANY($1)
            ORDER BY name
            "#,
        )
        .bind(&lowered)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("find roles"))?;

        Ok(rows.iter().map(Self::row_to_role).collect())
    }

    async fn replace_roles(&self, id: &UserId, role_ids: &[RoleId]) -> Result<(), AppError> {
        let role_ids: Vec<Uuid> = role_ids.iter().map(|r| r.0).collect();
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin role replacement"))?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error("clear user roles"))?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, created_at)
            SELECT $1, role_id, $3 FROM UNNEST($2::uuid[]) AS role_id
            "#,
        )
        .bind(id.0)
        .bind(&role_ids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert user roles"))?;

        sqlx::query("UPDATE users SET updated_at = $2 WHERE id = $1")
            .bind(id.0)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_error("touch user"))?;

        tx.commit()
            .await
            .map_err(db_error("commit role replacement"))?;

        tracing::debug!(user_id = %id, roles = role_ids.len(), "User roles replaced");

        Ok(())
    }
}
