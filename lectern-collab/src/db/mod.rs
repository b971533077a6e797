use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Represents a type that can fetch lectern data from a document store
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;

    async fn live_class_by_id(&self, live_class_id: PrimaryKey) -> Result<LiveClassData>;
    /// Lists non-cancelled classes sorted by ascending start time.
    /// `page` is 1-based.
    async fn list_live_classes(&self, page: usize, limit: usize) -> Result<Vec<LiveClassData>>;
    async fn create_live_class(&self, new_class: NewLiveClass) -> Result<LiveClassData>;
    async fn update_live_class(&self, updated_class: UpdatedLiveClass) -> Result<LiveClassData>;

    async fn create_video(&self, new_video: NewVideo) -> Result<VideoData>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewLiveClass {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    /// The instructor owning the new class
    pub instructor_id: PrimaryKey,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug)]
pub struct UpdatedLiveClass {
    pub id: PrimaryKey,
    pub status: Option<LiveClassStatus>,
    pub stream_key: Option<String>,
}

#[derive(Debug)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail: String,
    pub duration_secs: u32,
    /// The owner of the new video
    pub owner_id: PrimaryKey,
    pub is_published: bool,
}
