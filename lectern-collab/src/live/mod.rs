use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use crate::{
    Database, DatabaseError, LiveClassData, LiveClassStatus, NewLiveClass, NewVideo, PrimaryKey,
    UpdatedLiveClass,
};

/// Thumbnail used when a class is scheduled without one.
pub const DEFAULT_THUMBNAIL_URL: &str = "https://placehold.co/640x360?text=Live+Class";
/// Title prefix for the archival video created when a class ends.
pub const RECORDING_TITLE_PREFIX: &str = "[Recorded] ";

/// Stand-in media for archival videos until a real recording pipeline exists.
const PLACEHOLDER_VIDEO_URL: &str = "https://placehold.co/1280x720?text=Recording";
const PLACEHOLDER_DURATION_SECS: u32 = 0;

#[derive(Debug, Error)]
pub enum LiveClassError {
    /// A required field is missing or malformed
    #[error("{field} is required")]
    Validation { field: &'static str },
    #[error("Only the instructor can {action} the class")]
    Forbidden { action: &'static str },
    /// The class is not in a state the requested transition applies to
    #[error("Cannot {action} a class that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: LiveClassStatus,
    },
    /// The class ended, but the archival video could not be created.
    /// There is no compensating rollback; the class stays completed.
    #[error("Class ended, but archiving its recording failed: {0}")]
    Archival(DatabaseError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A request to schedule a new live class
#[derive(Debug)]
pub struct ScheduleRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    /// Public URL of an already uploaded thumbnail, if any
    pub thumbnail: Option<String>,
    pub instructor_id: PrimaryKey,
}

/// Drives a live class through its lifecycle: scheduled, live, completed.
///
/// Transitions are gated on the requester being the instructor, and ending a
/// class archives it as a video.
pub struct LiveClassManager<Db> {
    db: Arc<Db>,
}

impl<Db> LiveClassManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Schedules a new live class
    pub async fn schedule(&self, request: ScheduleRequest) -> Result<LiveClassData, LiveClassError> {
        let title = request.title.trim();

        if title.is_empty() {
            return Err(LiveClassError::Validation { field: "title" });
        }

        let start_time = request
            .start_time
            .ok_or(LiveClassError::Validation { field: "startTime" })?;

        let class = self
            .db
            .create_live_class(NewLiveClass {
                title: title.to_string(),
                description: request.description,
                thumbnail: request
                    .thumbnail
                    .unwrap_or_else(|| DEFAULT_THUMBNAIL_URL.to_string()),
                instructor_id: request.instructor_id,
                start_time,
            })
            .await?;

        info!("Scheduled live class {} ({})", class.title, class.id);

        Ok(class)
    }

    /// Lists non-cancelled classes, nearest start time first. `page` is 1-based.
    pub async fn list_upcoming(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<Vec<LiveClassData>, LiveClassError> {
        Ok(self.db.list_live_classes(page, limit).await?)
    }

    pub async fn by_id(&self, live_class_id: PrimaryKey) -> Result<LiveClassData, LiveClassError> {
        Ok(self.db.live_class_by_id(live_class_id).await?)
    }

    /// Transitions a scheduled class to live, optionally recording a stream key
    pub async fn start(
        &self,
        live_class_id: PrimaryKey,
        requester: PrimaryKey,
        stream_key: Option<String>,
    ) -> Result<LiveClassData, LiveClassError> {
        let class = self.db.live_class_by_id(live_class_id).await?;

        if class.instructor.id != requester {
            return Err(LiveClassError::Forbidden { action: "start" });
        }

        if class.status != LiveClassStatus::Scheduled {
            return Err(LiveClassError::InvalidTransition {
                action: "start",
                status: class.status,
            });
        }

        let class = self
            .db
            .update_live_class(UpdatedLiveClass {
                id: live_class_id,
                status: Some(LiveClassStatus::Live),
                stream_key,
            })
            .await?;

        info!("Live class {} ({}) is now live", class.title, class.id);

        Ok(class)
    }

    /// Transitions a live class to completed, then archives it as a video
    /// owned by the instructor.
    pub async fn end(
        &self,
        live_class_id: PrimaryKey,
        requester: PrimaryKey,
    ) -> Result<LiveClassData, LiveClassError> {
        let class = self.db.live_class_by_id(live_class_id).await?;

        if class.instructor.id != requester {
            return Err(LiveClassError::Forbidden { action: "end" });
        }

        if class.status != LiveClassStatus::Live {
            return Err(LiveClassError::InvalidTransition {
                action: "end",
                status: class.status,
            });
        }

        let class = self
            .db
            .update_live_class(UpdatedLiveClass {
                id: live_class_id,
                status: Some(LiveClassStatus::Completed),
                stream_key: None,
            })
            .await?;

        // The class is already completed at this point, so an archival failure
        // surfaces as its own error without undoing the transition
        self.db
            .create_video(NewVideo {
                title: format!("{}{}", RECORDING_TITLE_PREFIX, class.title),
                description: class.description.clone().unwrap_or_default(),
                video_url: PLACEHOLDER_VIDEO_URL.to_string(),
                thumbnail: class.thumbnail.clone(),
                duration_secs: PLACEHOLDER_DURATION_SECS,
                owner_id: class.instructor.id,
                is_published: true,
            })
            .await
            .map_err(LiveClassError::Archival)?;

        info!("Live class {} ({}) ended and archived", class.title, class.id);

        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{MemoryDatabase, NewUser, UserData};

    async fn setup() -> (Arc<MemoryDatabase>, LiveClassManager<MemoryDatabase>, UserData) {
        let db = Arc::new(MemoryDatabase::new());
        let manager = LiveClassManager::new(&db);

        let instructor = db
            .create_user(NewUser {
                username: "instructor".to_string(),
                display_name: "Instructor".to_string(),
                avatar: None,
            })
            .await
            .unwrap();

        (db, manager, instructor)
    }

    fn request(title: &str, instructor: &UserData) -> ScheduleRequest {
        ScheduleRequest {
            title: title.to_string(),
            description: None,
            start_time: Some(Utc::now() + Duration::hours(1)),
            thumbnail: None,
            instructor_id: instructor.id,
        }
    }

    #[tokio::test]
    async fn schedule_requires_title_and_start_time() {
        let (_db, manager, instructor) = setup().await;

        let missing_title = manager
            .schedule(ScheduleRequest {
                title: "  ".to_string(),
                ..request("x", &instructor)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            missing_title,
            LiveClassError::Validation { field: "title" }
        ));

        let missing_start = manager
            .schedule(ScheduleRequest {
                start_time: None,
                ..request("Algebra", &instructor)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            missing_start,
            LiveClassError::Validation { field: "startTime" }
        ));
    }

    #[tokio::test]
    async fn scheduling_defaults_the_thumbnail() {
        let (_db, manager, instructor) = setup().await;

        let class = manager.schedule(request("Algebra", &instructor)).await.unwrap();

        assert_eq!(class.status, LiveClassStatus::Scheduled);
        assert_eq!(class.thumbnail, DEFAULT_THUMBNAIL_URL);
        assert!(class.chat_enabled);
    }

    #[tokio::test]
    async fn only_the_instructor_can_start() {
        let (db, manager, instructor) = setup().await;

        let other = db
            .create_user(NewUser {
                username: "student".to_string(),
                display_name: "Student".to_string(),
                avatar: None,
            })
            .await
            .unwrap();

        let class = manager.schedule(request("Algebra", &instructor)).await.unwrap();

        let err = manager.start(class.id, other.id, None).await.unwrap_err();
        assert!(matches!(err, LiveClassError::Forbidden { action: "start" }));

        // The failed attempt must not have moved the class along
        let class = manager.by_id(class.id).await.unwrap();
        assert_eq!(class.status, LiveClassStatus::Scheduled);
    }

    #[tokio::test]
    async fn start_records_the_stream_key() {
        let (_db, manager, instructor) = setup().await;

        let class = manager.schedule(request("Algebra", &instructor)).await.unwrap();
        let class = manager
            .start(class.id, instructor.id, Some("secret-key".to_string()))
            .await
            .unwrap();

        assert_eq!(class.status, LiveClassStatus::Live);
        assert_eq!(class.stream_key.as_deref(), Some("secret-key"));
    }

    #[tokio::test]
    async fn transitions_are_monotonic() {
        let (_db, manager, instructor) = setup().await;

        let class = manager.schedule(request("Algebra", &instructor)).await.unwrap();

        // Ending before starting is rejected
        let err = manager.end(class.id, instructor.id).await.unwrap_err();
        assert!(matches!(err, LiveClassError::InvalidTransition { .. }));

        manager.start(class.id, instructor.id, None).await.unwrap();

        // Starting twice is rejected
        let err = manager.start(class.id, instructor.id, None).await.unwrap_err();
        assert!(matches!(err, LiveClassError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn ending_archives_exactly_one_video() {
        let (db, manager, instructor) = setup().await;

        let class = manager.schedule(request("Algebra", &instructor)).await.unwrap();
        manager.start(class.id, instructor.id, None).await.unwrap();
        let class = manager.end(class.id, instructor.id).await.unwrap();

        assert_eq!(class.status, LiveClassStatus::Completed);

        let videos = db.stored_videos();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "[Recorded] Algebra");
        assert_eq!(videos[0].owner_id, instructor.id);
        assert!(videos[0].is_published);

        // A double submit of end must not mint a second archive
        let err = manager.end(class.id, instructor.id).await.unwrap_err();
        assert!(matches!(err, LiveClassError::InvalidTransition { .. }));
        assert_eq!(db.stored_videos().len(), 1);
    }

    /// Delegates to [MemoryDatabase], except that archiving always fails.
    struct BrokenArchiveDatabase {
        inner: MemoryDatabase,
    }

    #[async_trait::async_trait]
    impl Database for BrokenArchiveDatabase {
        async fn user_by_id(&self, user_id: i32) -> crate::db::Result<crate::UserData> {
            self.inner.user_by_id(user_id).await
        }

        async fn create_user(&self, new_user: NewUser) -> crate::db::Result<crate::UserData> {
            self.inner.create_user(new_user).await
        }

        async fn session_by_token(&self, token: &str) -> crate::db::Result<crate::SessionData> {
            self.inner.session_by_token(token).await
        }

        async fn create_session(
            &self,
            new_session: crate::NewSession,
        ) -> crate::db::Result<crate::SessionData> {
            self.inner.create_session(new_session).await
        }

        async fn live_class_by_id(&self, live_class_id: i32) -> crate::db::Result<LiveClassData> {
            self.inner.live_class_by_id(live_class_id).await
        }

        async fn list_live_classes(
            &self,
            page: usize,
            limit: usize,
        ) -> crate::db::Result<Vec<LiveClassData>> {
            self.inner.list_live_classes(page, limit).await
        }

        async fn create_live_class(
            &self,
            new_class: NewLiveClass,
        ) -> crate::db::Result<LiveClassData> {
            self.inner.create_live_class(new_class).await
        }

        async fn update_live_class(
            &self,
            updated_class: UpdatedLiveClass,
        ) -> crate::db::Result<LiveClassData> {
            self.inner.update_live_class(updated_class).await
        }

        async fn create_video(&self, _new_video: NewVideo) -> crate::db::Result<crate::VideoData> {
            Err(DatabaseError::Internal("video store is unreachable".into()))
        }
    }

    #[tokio::test]
    async fn a_failed_archive_does_not_undo_the_ending() {
        let db = Arc::new(BrokenArchiveDatabase {
            inner: MemoryDatabase::new(),
        });
        let manager = LiveClassManager::new(&db);

        let instructor = db
            .create_user(NewUser {
                username: "instructor".to_string(),
                display_name: "Instructor".to_string(),
                avatar: None,
            })
            .await
            .unwrap();

        let class = manager.schedule(request("Algebra", &instructor)).await.unwrap();
        manager.start(class.id, instructor.id, None).await.unwrap();

        let err = manager.end(class.id, instructor.id).await.unwrap_err();
        assert!(matches!(err, LiveClassError::Archival(_)));

        // The transition stuck even though the archive did not
        let class = manager.by_id(class.id).await.unwrap();
        assert_eq!(class.status, LiveClassStatus::Completed);
        assert!(db.inner.stored_videos().is_empty());
    }

    #[tokio::test]
    async fn upcoming_list_is_sorted_and_skips_cancelled() {
        let (db, manager, instructor) = setup().await;

        let later = manager
            .schedule(ScheduleRequest {
                start_time: Some(Utc::now() + Duration::hours(3)),
                ..request("Later", &instructor)
            })
            .await
            .unwrap();

        let sooner = manager
            .schedule(ScheduleRequest {
                start_time: Some(Utc::now() + Duration::hours(1)),
                ..request("Sooner", &instructor)
            })
            .await
            .unwrap();

        let cancelled = manager
            .schedule(ScheduleRequest {
                start_time: Some(Utc::now() + Duration::hours(2)),
                ..request("Cancelled", &instructor)
            })
            .await
            .unwrap();

        db.update_live_class(UpdatedLiveClass {
            id: cancelled.id,
            status: Some(LiveClassStatus::Cancelled),
            stream_key: None,
        })
        .await
        .unwrap();

        let listed = manager.list_upcoming(1, 10).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);

        // Pagination slices the same ordering
        let second_page = manager.list_upcoming(2, 1).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, later.id);
    }
}
