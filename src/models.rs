use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{auth::credentials::PasswordHash, sanitizer::SafeText};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account from the `users` table. The password hash never leaves the server:
/// it is skipped during serialization and excluded from the exported TypeScript type.
#[derive(Debug, Clone, Serialize, TS, FromRow, Default, PartialEq, Eq)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,
}

/// BlogPost
///
/// A post from the `blog_posts` table, joined with its author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq, Eq)]
#[ts(export)]
pub struct BlogPost {
    pub id: i64,
    pub author_id: i64,
    // Loaded via a JOIN on users.
    pub author_name: String,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl BlogPost {
    /// Post date as shown on listing and detail pages, e.g. "March 04, 2024".
    pub fn display_date(&self) -> String {
        self.created_at.format("%B %d, %Y").to_string()
    }
}

/// Comment
///
/// A comment from the `comments` table, joined with its author's name and email
/// (the email feeds avatar generation in the page layer).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq, Eq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub author_email: String,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn display_timestamp(&self) -> String {
        self.created_at.format("%m.%d.%Y %H:%M").to_string()
    }
}

// --- Write Inputs (only constructible from sanitized text) ---

/// Fields of a post as submitted by the admin, after sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent {
    pub title: SafeText,
    pub subtitle: SafeText,
    pub body: SafeText,
    pub img_url: SafeText,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: SafeText,
    pub name: SafeText,
    pub password_hash: PasswordHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: SafeText,
}

// --- Form Payloads (RawInput) ---

/// PostForm
///
/// Create/edit post form. Every field is sanitized before it is stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
    pub body: String,
}

/// RegisterForm
///
/// Sign-up form. The password is sanitized and then hashed; it is never stored or logged.
#[derive(Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CommentForm {
    pub comment_text: String,
}

// --- Views (Output) ---

/// PostView
///
/// A post as served to readers: the stored fields plus its formatted date.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct PostView {
    #[serde(flatten)]
    pub post: BlogPost,
    pub display_date: String,
}

impl From<BlogPost> for PostView {
    fn from(post: BlogPost) -> Self {
        let display_date = post.display_date();
        Self { post, display_date }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub display_timestamp: String,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        let display_timestamp = comment.display_timestamp();
        Self {
            comment,
            display_timestamp,
        }
    }
}

/// PostDetail
///
/// A single post with its comments, in posting order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

/// FlashNotice
///
/// A resolved flash code and the message to show for it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct FlashNotice {
    pub code: String,
    pub message: String,
}

/// LoginPage
///
/// What the login page needs to render, currently the notice that sent the caller there.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct LoginPage {
    pub flash: Option<FlashNotice>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FlashQuery {
    pub flash: Option<String>,
}

/// SessionView
///
/// Who the caller is, for the page header (login/logout links, admin controls).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct SessionView {
    pub authenticated: bool,
    pub is_admin: bool,
    pub user_id: Option<i64>,
    pub name: Option<String>,
}
