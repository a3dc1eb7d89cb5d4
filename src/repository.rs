use crate::models::{BlogPost, Comment, NewComment, NewUser, PostContent, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// The persistence contract the handlers and the identity resolver depend on. Write methods
/// take sanitized, typed inputs (`PostContent`, `NewUser`, `NewComment`), so raw request text
/// cannot be stored through this interface.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`) shareable
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;

    // --- Posts ---
    async fn list_posts(&self) -> Result<Vec<BlogPost>, sqlx::Error>;
    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, sqlx::Error>;
    async fn create_post(&self, author_id: i64, content: PostContent) -> Result<BlogPost, sqlx::Error>;
    // Returns None when the post does not exist.
    async fn update_post(&self, id: i64, content: PostContent) -> Result<Option<BlogPost>, sqlx::Error>;
    // Returns false when the post does not exist. Comments go with it.
    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Comments ---
    async fn add_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error>;
    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL (schema in `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str = r#"
    p.id, p.author_id, u.name AS author_name, p.title, p.subtitle, p.body, p.img_url, p.created_at
"#;

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.author_id, u.name AS author_name, u.email AS author_email, c.text, c.created_at
"#;

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, email, name, password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// create_user
    ///
    /// Inserts the account. A concurrent registration with the same email surfaces as a
    /// unique violation on `users_email_key`.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3)
               RETURNING id, email, name, password_hash"#,
        )
        .bind(user.email.as_str())
        .bind(user.name.as_str())
        .bind(user.password_hash.as_str())
        .fetch_one(&self.pool)
        .await
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, sqlx::Error> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.author_id = u.id ORDER BY p.created_at DESC, p.id DESC"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.author_id = u.id WHERE p.id = $1"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_post
    ///
    /// Inserts the post and joins the author's name in one round trip.
    async fn create_post(&self, author_id: i64, content: PostContent) -> Result<BlogPost, sqlx::Error> {
        let query = format!(
            r#"
            WITH p AS (
                INSERT INTO blog_posts (author_id, title, subtitle, body, img_url, created_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p JOIN users u ON p.author_id = u.id
            "#
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(author_id)
            .bind(content.title.as_str())
            .bind(content.subtitle.as_str())
            .bind(content.body.as_str())
            .bind(content.img_url.as_str())
            .fetch_one(&self.pool)
            .await
    }

    async fn update_post(&self, id: i64, content: PostContent) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!(
            r#"
            WITH p AS (
                UPDATE blog_posts
                SET title = $2, subtitle = $3, body = $4, img_url = $5
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_COLUMNS} FROM p JOIN users u ON p.author_id = u.id
            "#
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .bind(content.title.as_str())
            .bind(content.subtitle.as_str())
            .bind(content.body.as_str())
            .bind(content.img_url.as_str())
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error> {
        let query = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (post_id, author_id, text, created_at)
                VALUES ($1, $2, $3, NOW())
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON c.author_id = u.id
            "#
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(comment.text.as_str())
            .fetch_one(&self.pool)
            .await
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON c.author_id = u.id WHERE c.post_id = $1 ORDER BY c.created_at ASC, c.id ASC"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
    }
}
