use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    Database, DatabaseError, LiveClassData, LiveClassStatus, NewLiveClass, NewSession, NewUser,
    NewVideo, PrimaryKey, Result, SessionData, UpdatedLiveClass, UserData, VideoData,
};

/// An in-memory database, standing in for the external document store in
/// development and tests.
pub struct MemoryDatabase {
    next_id: AtomicI32,
    users: DashMap<PrimaryKey, UserData>,
    /// token -> (session id, user id)
    sessions: DashMap<String, (PrimaryKey, PrimaryKey)>,
    live_classes: DashMap<PrimaryKey, LiveClassData>,
    videos: DashMap<PrimaryKey, VideoData>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1),
            users: Default::default(),
            sessions: Default::default(),
            live_classes: Default::default(),
            videos: Default::default(),
        }
    }

    fn assign_id(&self) -> PrimaryKey {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Every stored video. Useful for asserting on archival side effects.
    pub fn stored_videos(&self) -> Vec<VideoData> {
        self.videos.iter().map(|v| v.value().clone()).collect()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .get(&user_id)
            .map(|u| u.value().clone())
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let taken = self
            .users
            .iter()
            .any(|u| u.value().username == new_user.username);

        if taken {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        let user = UserData {
            id: self.assign_id(),
            username: new_user.username,
            display_name: new_user.display_name,
            avatar: new_user.avatar,
        };

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let (session_id, user_id) =
            *self
                .sessions
                .get(token)
                .ok_or(DatabaseError::NotFound {
                    resource: "session",
                    identifier: "token",
                })?;

        let user = self.user_by_id(user_id).await?;

        Ok(SessionData {
            id: session_id,
            token: token.to_string(),
            user,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let user = self.user_by_id(new_session.user_id).await?;
        let id = self.assign_id();

        self.sessions
            .insert(new_session.token.clone(), (id, user.id));

        Ok(SessionData {
            id,
            token: new_session.token,
            user,
        })
    }

    async fn live_class_by_id(&self, live_class_id: PrimaryKey) -> Result<LiveClassData> {
        self.live_classes
            .get(&live_class_id)
            .map(|c| c.value().clone())
            .ok_or(DatabaseError::NotFound {
                resource: "live class",
                identifier: "id",
            })
    }

    async fn list_live_classes(&self, page: usize, limit: usize) -> Result<Vec<LiveClassData>> {
        let mut classes: Vec<_> = self
            .live_classes
            .iter()
            .map(|c| c.value().clone())
            .filter(|c| c.status != LiveClassStatus::Cancelled)
            .collect();

        classes.sort_by_key(|c| c.start_time);

        let page = page.max(1);
        Ok(classes
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect())
    }

    async fn create_live_class(&self, new_class: NewLiveClass) -> Result<LiveClassData> {
        let instructor = self.user_by_id(new_class.instructor_id).await?;

        let class = LiveClassData {
            id: self.assign_id(),
            title: new_class.title,
            description: new_class.description,
            thumbnail: new_class.thumbnail,
            instructor,
            start_time: new_class.start_time,
            status: LiveClassStatus::Scheduled,
            stream_key: None,
            chat_enabled: true,
            attendees: Vec::new(),
        };

        self.live_classes.insert(class.id, class.clone());
        Ok(class)
    }

    async fn update_live_class(&self, updated_class: UpdatedLiveClass) -> Result<LiveClassData> {
        let mut class =
            self.live_classes
                .get_mut(&updated_class.id)
                .ok_or(DatabaseError::NotFound {
                    resource: "live class",
                    identifier: "id",
                })?;

        if let Some(status) = updated_class.status {
            class.status = status;
        }

        if let Some(stream_key) = updated_class.stream_key {
            class.stream_key = Some(stream_key);
        }

        Ok(class.clone())
    }

    async fn create_video(&self, new_video: NewVideo) -> Result<VideoData> {
        // The owner must exist, like a foreign key would enforce
        self.user_by_id(new_video.owner_id).await.map_err(|_| {
            DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            }
        })?;

        let video = VideoData {
            id: self.assign_id(),
            title: new_video.title,
            description: new_video.description,
            video_url: new_video.video_url,
            thumbnail: new_video.thumbnail,
            duration_secs: new_video.duration_secs,
            owner_id: new_video.owner_id,
            is_published: new_video.is_published,
        };

        self.videos.insert(video.id, video.clone());
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            display_name: name.to_string(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let db = MemoryDatabase::new();

        db.create_user(new_user("ada")).await.unwrap();
        let err = db.create_user(new_user("ada")).await.unwrap_err();

        assert!(matches!(err, DatabaseError::Conflict { .. }));
    }

    #[tokio::test]
    async fn sessions_resolve_to_their_user() {
        let db = MemoryDatabase::new();
        let user = db.create_user(new_user("ada")).await.unwrap();

        db.create_session(NewSession {
            token: "token".to_string(),
            user_id: user.id,
        })
        .await
        .unwrap();

        let session = db.session_by_token("token").await.unwrap();
        assert_eq!(session.user.id, user.id);

        let missing = db.session_by_token("nope").await.unwrap_err();
        assert!(matches!(missing, DatabaseError::NotFound { .. }));
    }
}
