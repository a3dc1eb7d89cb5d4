#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, header},
};
use blog_backend::{
    AppState,
    auth::{credentials, session},
    config::AppConfig,
    models::{BlogPost, Comment, NewComment, NewUser, PostContent, User},
    repository::{Repository, RepositoryState},
    sanitizer::{SafeText, Sanitizer},
};
use chrono::Utc;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

// --- MOCK REPOSITORY IMPLEMENTATION ---

// In-memory store standing in for Postgres. Ids are assigned in insertion order, so the
// first seeded user is the admin.
#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<Vec<User>>,
    pub posts: Mutex<Vec<BlogPost>>,
    pub comments: Mutex<Vec<Comment>>,
    // Number of calls that changed posts (create, update, delete).
    pub post_writes: AtomicUsize,
    // Number of user lookups by id, to observe identity caching.
    pub id_lookups: AtomicUsize,
    // When set, user lookups by id fail as if the database were down.
    pub fail_lookups: AtomicBool,
}

pub fn safe(text: &str) -> SafeText {
    Sanitizer::default().clean(text)
}

impl MockRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_user(&self, email: &str, name: &str, password: &str) -> User {
        let hash = credentials::hash_password(&safe(password)).expect("hashing failed");
        let mut users = self.users.lock().unwrap();
        let user = User {
            id: users.len() as i64 + 1,
            email: email.to_string(),
            name: name.to_string(),
            password_hash: hash.as_str().to_string(),
        };
        users.push(user.clone());
        user
    }

    pub fn seed_post(&self, author: &User, title: &str) -> BlogPost {
        let mut posts = self.posts.lock().unwrap();
        let post = BlogPost {
            id: posts.len() as i64 + 1,
            author_id: author.id,
            author_name: author.name.clone(),
            title: title.to_string(),
            subtitle: "subtitle".to_string(),
            body: "<p>body</p>".to_string(),
            img_url: "https://example.com/img.png".to_string(),
            created_at: Utc::now(),
        };
        posts.push(post.clone());
        post
    }

    pub fn post_writes(&self) -> usize {
        self.post_writes.load(Ordering::SeqCst)
    }

    pub fn post(&self, id: i64) -> Option<BlogPost> {
        self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    fn author_name(&self, id: i64) -> String {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        self.id_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        let user = User {
            id: users.len() as i64 + 1,
            email: user.email.into_inner(),
            name: user.name.into_inner(),
            password_hash: user.password_hash.as_str().to_string(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, sqlx::Error> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.reverse();
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, sqlx::Error> {
        Ok(self.post(id))
    }

    async fn create_post(&self, author_id: i64, content: PostContent) -> Result<BlogPost, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        let author_name = self.author_name(author_id);
        let mut posts = self.posts.lock().unwrap();
        let post = BlogPost {
            id: posts.len() as i64 + 1,
            author_id,
            author_name,
            title: content.title.into_inner(),
            subtitle: content.subtitle.into_inner(),
            body: content.body.into_inner(),
            img_url: content.img_url.into_inner(),
            created_at: Utc::now(),
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, content: PostContent) -> Result<Option<BlogPost>, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        Ok(posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.title = content.title.into_inner();
            post.subtitle = content.subtitle.into_inner();
            post.body = content.body.into_inner();
            post.img_url = content.img_url.into_inner();
            post.clone()
        }))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        self.comments.lock().unwrap().retain(|c| c.post_id != id);
        Ok(posts.len() < before)
    }

    async fn add_comment(&self, comment: NewComment) -> Result<Comment, sqlx::Error> {
        let (author_name, author_email) = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == comment.author_id)
            .map(|u| (u.name.clone(), u.email.clone()))
            .unwrap_or_default();
        let mut comments = self.comments.lock().unwrap();
        let comment = Comment {
            id: comments.len() as i64 + 1,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_name,
            author_email,
            text: comment.text.into_inner(),
            created_at: Utc::now(),
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }
}

// --- APP HELPERS ---

pub fn app_state(repo: Arc<MockRepo>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        sanitizer: Arc::new(Sanitizer::default()),
        config: AppConfig::default(),
    }
}

/// `Cookie` header value carrying a valid session for `user_id`.
pub fn session_cookie_for(user_id: i64) -> String {
    let token = session::issue_token(user_id, &AppConfig::default()).expect("token");
    format!("{}={token}", session::SESSION_COOKIE)
}

pub fn form_request(method: &str, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}
