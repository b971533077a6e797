use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use lectern_collab::ScheduleRequest;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{PaginationQuery, StartLiveClassSchema, ValidatedJson},
    serialized::{with_stream_key, ApiResponse, LiveClass, ToSerialized},
};

#[utoipa::path(
    get,
    path = "/live-classes",
    tag = "live-classes",
    responses(
        (status = 200, body = Vec<LiveClass>)
    )
)]
async fn list_live_classes(
    State(context): State<ServerContext>,
    Query(pagination): Query<PaginationQuery>,
) -> ServerResult<Json<ApiResponse<Vec<LiveClass>>>> {
    let classes = context
        .classroom
        .live_classes
        .list_upcoming(pagination.page, pagination.limit)
        .await?;

    Ok(Json(ApiResponse::new(
        classes.to_serialized(),
        "Live Classes Fetched Successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/live-classes/{id}",
    tag = "live-classes",
    responses(
        (status = 200, body = LiveClass)
    )
)]
async fn live_class(
    State(context): State<ServerContext>,
    session: Option<Session>,
    Path(live_class_id): Path<i32>,
) -> ServerResult<Json<ApiResponse<LiveClass>>> {
    let class = context.classroom.live_classes.by_id(live_class_id).await?;

    // Only the instructor gets to see the stream key
    let is_instructor = session
        .map(|s| s.user().id == class.instructor.id)
        .unwrap_or(false);

    let serialized = if is_instructor {
        with_stream_key(&class)
    } else {
        class.to_serialized()
    };

    Ok(Json(ApiResponse::new(serialized, "Live Class details fetched")))
}

#[utoipa::path(
    post,
    path = "/live-classes/create",
    tag = "live-classes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = LiveClass)
    )
)]
async fn create_live_class(
    State(context): State<ServerContext>,
    session: Session,
    mut multipart: Multipart,
) -> ServerResult<(StatusCode, Json<ApiResponse<LiveClass>>)> {
    let mut title = String::new();
    let mut description = None;
    let mut start_time = None;
    let mut thumbnail = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ServerError::BadRequest("Malformed multipart body"))?
    {
        let name = field.name().map(str::to_string);

        match name.as_deref() {
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|_| ServerError::Validation { field: "title" })?;
            }
            Some("description") => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ServerError::Validation { field: "description" })?,
                );
            }
            Some("startTime") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ServerError::Validation { field: "startTime" })?;

                let parsed = DateTime::parse_from_rfc3339(&text)
                    .map_err(|_| ServerError::Validation { field: "startTime" })?;

                start_time = Some(parsed.with_timezone(&Utc));
            }
            Some("thumbnail") => {
                let file_name = field.file_name().unwrap_or("thumbnail").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ServerError::Validation { field: "thumbnail" })?;

                let url = context.media.upload(&file_name, bytes.to_vec()).await?;
                thumbnail = Some(url);
            }
            _ => {}
        }
    }

    let class = context
        .classroom
        .live_classes
        .schedule(ScheduleRequest {
            title,
            description,
            start_time,
            thumbnail,
            instructor_id: session.user().id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            with_stream_key(&class),
            "Live Class Scheduled Successfully",
        )),
    ))
}

#[utoipa::path(
    patch,
    path = "/live-classes/{id}/start",
    tag = "live-classes",
    request_body = StartLiveClassSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = LiveClass)
    )
)]
async fn start_live_class(
    State(context): State<ServerContext>,
    session: Session,
    Path(live_class_id): Path<i32>,
    body: Option<ValidatedJson<StartLiveClassSchema>>,
) -> ServerResult<Json<ApiResponse<LiveClass>>> {
    let stream_key = body.and_then(|b| b.0.stream_key);

    let class = context
        .classroom
        .live_classes
        .start(live_class_id, session.user().id, stream_key)
        .await?;

    Ok(Json(ApiResponse::new(
        with_stream_key(&class),
        "Live Class Started",
    )))
}

#[utoipa::path(
    patch,
    path = "/live-classes/{id}/end",
    tag = "live-classes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = LiveClass)
    )
)]
async fn end_live_class(
    State(context): State<ServerContext>,
    session: Session,
    Path(live_class_id): Path<i32>,
) -> ServerResult<Json<ApiResponse<LiveClass>>> {
    let class = context
        .classroom
        .live_classes
        .end(live_class_id, session.user().id)
        .await?;

    Ok(Json(ApiResponse::new(
        with_stream_key(&class),
        "Live Class Ended",
    )))
}

pub fn router() -> Router<ServerContext> {
    Router::new()
        .route("/", get(list_live_classes))
        .route("/create", post(create_live_class))
        .route("/:id", get(live_class))
        .route("/:id/start", patch(start_live_class))
        .route("/:id/end", patch(end_live_class))
}
