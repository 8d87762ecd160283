use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use crate::{
    auth::user::{Role, UserDirectory, UserInfo},
    error::HandlerError,
};

pub struct Database {
    pub pool: Pool<Postgres>,
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    password: Option<String>,
    email: Option<String>,
    real_name: Option<String>,
}

#[derive(FromRow)]
struct RoleRow {
    id: String,
    code: String,
    name: String,
}

impl Database {
    pub fn with_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserInfo>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
                SELECT id, username, password, email, real_name
                FROM users
                WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let roles = sqlx::query_as::<_, RoleRow>(
            r#"
                SELECT roles.id, roles.code, roles.name
                FROM roles, user_roles
                WHERE user_roles.user_id = $1
                AND user_roles.role_id = roles.id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let perms: Vec<(String,)> = sqlx::query_as(
            r#"
                SELECT DISTINCT role_perms.perm
                FROM role_perms, user_roles
                WHERE user_roles.user_id = $1
                AND user_roles.role_id = role_perms.role_id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(UserInfo {
            id: row.id,
            username: row.username,
            password: row.password,
            email: row.email,
            real_name: row.real_name,
            roles: roles
                .into_iter()
                .map(|r| Role {
                    id: r.id,
                    code: r.code,
                    name: r.name,
                })
                .collect(),
            perms: perms.into_iter().map(|(perm,)| perm).collect(),
        }))
    }
}

#[async_trait]
impl UserDirectory for Database {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserInfo>, HandlerError> {
        Ok(self.get_user_by_username(username).await?)
    }
}
