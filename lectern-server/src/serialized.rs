//! All schemas that are exposed from endpoints are defined here
//! along with the conversion impls

use chrono::{DateTime, Utc};
use lectern_collab::{LiveClassData, LiveClassStatus, UserData};
use serde::Serialize;
use utoipa::ToSchema;

/// The response envelope every endpoint wraps its data in
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: &'static str,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            message,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    username: String,
    display_name: String,
    avatar: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveClass {
    id: i32,
    title: String,
    description: Option<String>,
    thumbnail: String,
    instructor: User,
    start_time: DateTime<Utc>,
    #[schema(value_type = String)]
    status: LiveClassStatus,
    /// Only present in responses to the instructor
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_key: Option<String>,
    chat_enabled: bool,
    attendees: Vec<i32>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// The stream key is redacted; use [with_stream_key] for instructor responses
impl ToSerialized<LiveClass> for LiveClassData {
    fn to_serialized(&self) -> LiveClass {
        LiveClass {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail: self.thumbnail.clone(),
            instructor: self.instructor.to_serialized(),
            start_time: self.start_time,
            status: self.status,
            stream_key: None,
            chat_enabled: self.chat_enabled,
            attendees: self.attendees.clone(),
        }
    }
}

/// Like [ToSerialized], but keeps the stream key. Only ever for responses
/// going to the instructor.
pub fn with_stream_key(data: &LiveClassData) -> LiveClass {
    let mut class = data.to_serialized();
    class.stream_key = data.stream_key.clone();
    class
}
