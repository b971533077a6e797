use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A lectern account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserData,
}

/// Where a live class is in its lifecycle.
///
/// Transitions are monotonic along scheduled, live, completed.
/// Cancellation is a terminal escape from the scheduled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveClassStatus {
    Scheduled,
    Live,
    Completed,
    Cancelled,
}

impl Display for LiveClassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "SCHEDULED",
            Self::Live => "LIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };

        f.write_str(name)
    }
}

/// A schedulable live class
#[derive(Debug, Clone)]
pub struct LiveClassData {
    pub id: PrimaryKey,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub instructor: UserData,
    pub start_time: DateTime<Utc>,
    pub status: LiveClassStatus,
    /// Confidential. Must only ever be exposed to the instructor.
    pub stream_key: Option<String>,
    pub chat_enabled: bool,
    pub attendees: Vec<PrimaryKey>,
}

/// A video on the platform. Created here only as the archival record of an
/// ended live class.
#[derive(Debug, Clone)]
pub struct VideoData {
    pub id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail: String,
    pub duration_secs: u32,
    pub owner_id: PrimaryKey,
    pub is_published: bool,
}
