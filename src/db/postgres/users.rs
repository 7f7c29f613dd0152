use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};

use super::{conflict_on_duplicate, PgStore, USER_COLUMNS};
use crate::{
    db::store::UserStore,
    error::AppResult,
    models::{NewUser, User, UserCredentials, UserId, UserPatch},
};

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (uid, username, password_hash, name, email, age, country, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let username = user.username.clone();
        sqlx::query_as::<_, User>(&query)
            .bind(UserId::new())
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.age)
            .bind(&user.country)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, || format!("Username {} is already taken", username)))
    }

    async fn user(&self, uid: UserId) -> AppResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE uid = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        let query = format!(
            "SELECT {}, password_hash FROM users WHERE username = $1",
            USER_COLUMNS
        );
        let credentials = sqlx::query_as::<_, UserCredentials>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credentials)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY uid", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_user(&self, uid: UserId, patch: &UserPatch) -> AppResult<Option<User>> {
        if patch.is_empty() {
            return self.user(uid).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        if let Some(username) = &patch.username {
            set.push("username = ").push_bind_unseparated(username.clone());
        }
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(email) = &patch.email {
            set.push("email = ").push_bind_unseparated(email.clone());
        }
        if let Some(age) = patch.age {
            set.push("age = ").push_bind_unseparated(age);
        }
        if let Some(country) = &patch.country {
            set.push("country = ").push_bind_unseparated(country.clone());
        }
        builder.push(" WHERE uid = ").push_bind(uid);
        builder.push(" RETURNING ").push(USER_COLUMNS);

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, || "Username is already taken".to_string()))
    }
}
