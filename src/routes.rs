use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::{self, CurrentUser};
use crate::db::Db;
use crate::models::*;
use crate::util::{e403, e404, e422, e500, ApiError};
use crate::{progress, sequence};

pub fn router(db: Db) -> Router {
    Router::new()
        // accounts
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        // courses
        .route("/api/courses", get(learner_courses).post(create_course))
        .route("/api/courses/created", get(created_courses))
        .route("/api/courses/:course_id", delete(delete_course))
        .route("/api/courses/:course_id/enroll", post(enroll_course))
        .route("/api/courses/:course_id/continue", get(continue_course))
        .route("/api/courses/:course_id/certificate", get(certificate))
        // pages
        .route(
            "/api/courses/:course_id/pages",
            get(list_pages).post(create_page),
        )
        .route(
            "/api/pages/:page_id",
            get(view_page).put(update_page).delete(delete_page),
        )
        // interactions
        .route("/api/pages/:page_id/like", post(toggle_like))
        .route("/api/pages/:page_id/share", post(record_share))
        .route("/api/pages/:page_id/comments", post(add_comment))
        .with_state(db)
}

// --- lookups shared by the handlers ---

async fn fetch_course(db: &Db, course_id: Uuid) -> Result<Course, ApiError> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(db)
        .await
        .map_err(e500)?
        .ok_or_else(|| e404("Course not found."))
}

/// Course lookup that also enforces authorship, for educator-only edits.
async fn fetch_owned_course(
    db: &Db,
    course_id: Uuid,
    creator_id: Uuid,
) -> Result<Course, ApiError> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 AND creator_id = $2")
        .bind(course_id)
        .bind(creator_id)
        .fetch_optional(db)
        .await
        .map_err(e500)?
        .ok_or_else(|| e404("Course not found."))
}

async fn fetch_page(db: &Db, page_id: Uuid) -> Result<CoursePage, ApiError> {
    sqlx::query_as::<_, CoursePage>("SELECT * FROM course_pages WHERE id = $1")
        .bind(page_id)
        .fetch_optional(db)
        .await
        .map_err(e500)?
        .ok_or_else(|| e404("Page not found."))
}

async fn is_enrolled(db: &Db, course_id: Uuid, learner_id: Uuid) -> Result<bool, ApiError> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM enrollments WHERE course_id = $1 AND learner_id = $2)",
    )
    .bind(course_id)
    .bind(learner_id)
    .fetch_one(db)
    .await
    .map_err(e500)
}

async fn first_page_id(db: &Db, course_id: Uuid) -> Result<Option<Uuid>, ApiError> {
    sqlx::query_scalar(
        "SELECT id FROM course_pages WHERE course_id = $1 ORDER BY page_no LIMIT 1",
    )
    .bind(course_id)
    .fetch_optional(db)
    .await
    .map_err(e500)
}

// --- courses ---

async fn create_course(
    State(db): State<Db>,
    current: CurrentUser,
    Json(req): Json<CreateCourseReq>,
) -> Result<Json<Course>, ApiError> {
    current.require_role("educator", "Only educators can create courses.")?;

    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(e422("Please fill all required fields."));
    }
    let category = req.category.unwrap_or_else(|| "programming".into());
    if !CATEGORIES.contains(&category.as_str()) {
        return Err(e422("Invalid course category."));
    }

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (id, title, description, category, creator_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(&category)
    .bind(current.user.id)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    tracing::info!(course_id = %course.id, creator = %current.user.id, "course created");
    Ok(Json(course))
}

async fn created_courses(
    State(db): State<Db>,
    current: CurrentUser,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE creator_id = $1 ORDER BY created_at DESC",
    )
    .bind(current.user.id)
    .fetch_all(&db)
    .await
    .map_err(e500)?;
    Ok(Json(courses))
}

/// The learner's dashboard: enrolled courses with derived progress, plus
/// everything still open for enrollment.
async fn learner_courses(
    State(db): State<Db>,
    current: CurrentUser,
) -> Result<Json<LearnerCoursesRes>, ApiError> {
    current.require_role("learner", "Only learners can access this page.")?;

    let enrolled_courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT c.* FROM courses c
        JOIN enrollments e ON e.course_id = c.id
        WHERE e.learner_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(current.user.id)
    .fetch_all(&db)
    .await
    .map_err(e500)?;

    let mut enrolled = Vec::with_capacity(enrolled_courses.len());
    for course in enrolled_courses {
        let s = progress::summary(&db, current.user.id, course.id)
            .await
            .map_err(e500)?;
        enrolled.push(EnrolledCourseRes {
            course,
            progress_percentage: s.percentage,
            is_completed: s.is_completed,
            next_page_id: s.next_page_id,
        });
    }

    let available = sqlx::query_as::<_, Course>(
        r#"
        SELECT * FROM courses
        WHERE id NOT IN (SELECT course_id FROM enrollments WHERE learner_id = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(current.user.id)
    .fetch_all(&db)
    .await
    .map_err(e500)?;

    Ok(Json(LearnerCoursesRes { enrolled, available }))
}

async fn delete_course(
    State(db): State<Db>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let course = fetch_owned_course(&db, course_id, current.user.id).await?;

    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course.id)
        .execute(&db)
        .await
        .map_err(e500)?;

    tracing::info!(course_id = %course.id, "course deleted");
    Ok(Json(serde_json::json!({
        "message": format!("Course '{}' deleted successfully!", course.title)
    })))
}

async fn enroll_course(
    State(db): State<Db>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<EnrollRes>, ApiError> {
    current.require_role("learner", "Only learners can enroll in courses.")?;
    let course = fetch_course(&db, course_id).await?;

    // Double enrollment is a no-op beyond the warning.
    if is_enrolled(&db, course.id, current.user.id).await? {
        return Ok(Json(EnrollRes {
            message: format!("You are already enrolled in {}.", course.title),
            already_enrolled: true,
        }));
    }

    sqlx::query(
        r#"
        INSERT INTO enrollments (course_id, learner_id)
        VALUES ($1, $2)
        ON CONFLICT (course_id, learner_id) DO NOTHING
        "#,
    )
    .bind(course.id)
    .bind(current.user.id)
    .execute(&db)
    .await
    .map_err(e500)?;

    let first_page = first_page_id(&db, course.id).await?;
    progress::get_or_create(&db, current.user.id, course.id, first_page)
        .await
        .map_err(e500)?;

    tracing::info!(course_id = %course.id, learner = %current.user.id, "enrolled");
    Ok(Json(EnrollRes {
        message: format!("Successfully enrolled in {}!", course.title),
        already_enrolled: false,
    }))
}

/// Where a returning learner should resume: the tracked current page, or
/// the first page when none is tracked yet.
async fn continue_course(
    State(db): State<Db>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_role("learner", "Only learners can access courses.")?;
    let course = fetch_course(&db, course_id).await?;
    if !is_enrolled(&db, course.id, current.user.id).await? {
        return Err(e403("You need to enroll in this course first."));
    }

    let first_page = first_page_id(&db, course.id).await?;
    let record = progress::get_or_create(&db, current.user.id, course.id, first_page)
        .await
        .map_err(e500)?;

    match record.current_page_id.or(first_page) {
        Some(page_id) => Ok(Json(serde_json::json!({ "page_id": page_id }))),
        None => Err(e404("This course has no content yet.")),
    }
}

async fn certificate(
    State(db): State<Db>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CertificateRes>, ApiError> {
    let course = fetch_course(&db, course_id).await?;
    let certificate_id = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    Ok(Json(CertificateRes {
        course_id: course.id,
        course_title: course.title,
        learner_name: format!("{} {}", current.user.first_name, current.user.surname),
        completion_date: chrono::Utc::now(),
        certificate_id,
    }))
}

// --- pages ---

async fn list_pages(
    State(db): State<Db>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<CoursePage>>, ApiError> {
    let course = fetch_owned_course(&db, course_id, current.user.id).await?;
    let pages = sqlx::query_as::<_, CoursePage>(
        "SELECT * FROM course_pages WHERE course_id = $1 ORDER BY page_no",
    )
    .bind(course.id)
    .fetch_all(&db)
    .await
    .map_err(e500)?;
    Ok(Json(pages))
}

async fn create_page(
    State(db): State<Db>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(req): Json<CreatePageReq>,
) -> Result<Json<CoursePage>, ApiError> {
    let course = fetch_owned_course(&db, course_id, current.user.id).await?;
    if req.title.trim().is_empty() || req.body.trim().is_empty() {
        return Err(e422("Please fill all required fields."));
    }

    let page_no = sequence::assign_page_no(&db, course.id, req.page_no)
        .await
        .map_err(e500)?;

    let page = sqlx::query_as::<_, CoursePage>(
        r#"
        INSERT INTO course_pages (id, course_id, title, body, page_no)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(course.id)
    .bind(req.title.trim())
    .bind(&req.body)
    .bind(page_no)
    .fetch_one(&db)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(d) if d.is_unique_violation() => e422("Page number already in use."),
        _ => e500(e),
    })?;

    Ok(Json(page))
}

async fn update_page(
    State(db): State<Db>,
    current: CurrentUser,
    Path(page_id): Path<Uuid>,
    Json(req): Json<UpdatePageReq>,
) -> Result<Json<CoursePage>, ApiError> {
    let page = fetch_page(&db, page_id).await?;
    fetch_owned_course(&db, page.course_id, current.user.id).await?;
    if req.title.trim().is_empty() || req.body.trim().is_empty() {
        return Err(e422("Please fill all required fields."));
    }

    let page = sqlx::query_as::<_, CoursePage>(
        r#"
        UPDATE course_pages
        SET title = $1, body = $2, updated_at = now()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(req.title.trim())
    .bind(&req.body)
    .bind(page.id)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    Ok(Json(page))
}

async fn delete_page(
    State(db): State<Db>,
    current: CurrentUser,
    Path(page_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page = fetch_page(&db, page_id).await?;
    fetch_owned_course(&db, page.course_id, current.user.id).await?;

    sqlx::query("DELETE FROM course_pages WHERE id = $1")
        .bind(page.id)
        .execute(&db)
        .await
        .map_err(e500)?;

    // Close the gap the delete left behind.
    sequence::renumber_course(&db, page.course_id)
        .await
        .map_err(e500)?;

    tracing::info!(page_id = %page.id, course_id = %page.course_id, "page deleted");
    Ok(Json(serde_json::json!({ "message": "Page deleted successfully!" })))
}

/// A learner opening a page. This is the visit that drives progress: the
/// page joins the completed set and current-page/completion are recomputed.
async fn view_page(
    State(db): State<Db>,
    current: CurrentUser,
    Path(page_id): Path<Uuid>,
) -> Result<Json<PageViewRes>, ApiError> {
    current.require_role("learner", "Only learners can access course pages.")?;
    let page = fetch_page(&db, page_id).await?;
    if !is_enrolled(&db, page.course_id, current.user.id).await? {
        return Err(e403("You need to enroll in this course first."));
    }

    progress::visit_page(&db, current.user.id, &page)
        .await
        .map_err(e500)?;
    let summary = progress::summary(&db, current.user.id, page.course_id)
        .await
        .map_err(e500)?;

    let siblings: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM course_pages WHERE course_id = $1 ORDER BY page_no")
            .bind(page.course_id)
            .fetch_all(&db)
            .await
            .map_err(e500)?;
    let idx = siblings.iter().position(|id| *id == page.id);
    let previous_page_id = idx
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| siblings.get(i))
        .copied();
    let next_page_id = idx.and_then(|i| siblings.get(i + 1)).copied();

    let like_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM page_interactions WHERE page_id = $1 AND liked")
            .bind(page.id)
            .fetch_one(&db)
            .await
            .map_err(e500)?;

    let user_has_liked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM page_interactions WHERE page_id = $1 AND user_id = $2 AND liked)",
    )
    .bind(page.id)
    .bind(current.user.id)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    let comments = sqlx::query_as::<_, PageComment>(
        "SELECT * FROM page_comments WHERE page_id = $1 ORDER BY created_at DESC",
    )
    .bind(page.id)
    .fetch_all(&db)
    .await
    .map_err(e500)?;

    Ok(Json(PageViewRes {
        page,
        previous_page_id,
        next_page_id,
        like_count,
        user_has_liked,
        progress_percentage: summary.percentage,
        comments,
    }))
}

// --- interactions ---

async fn toggle_like(
    State(db): State<Db>,
    current: CurrentUser,
    Path(page_id): Path<Uuid>,
) -> Result<Json<PageInteraction>, ApiError> {
    let page = fetch_page(&db, page_id).await?;

    let interaction = sqlx::query_as::<_, PageInteraction>(
        r#"
        INSERT INTO page_interactions (id, page_id, user_id, liked)
        VALUES ($1, $2, $3, true)
        ON CONFLICT (page_id, user_id)
        DO UPDATE SET liked = NOT page_interactions.liked
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(page.id)
    .bind(current.user.id)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    Ok(Json(interaction))
}

async fn record_share(
    State(db): State<Db>,
    current: CurrentUser,
    Path(page_id): Path<Uuid>,
) -> Result<Json<PageInteraction>, ApiError> {
    let page = fetch_page(&db, page_id).await?;

    let interaction = sqlx::query_as::<_, PageInteraction>(
        r#"
        INSERT INTO page_interactions (id, page_id, user_id, shared)
        VALUES ($1, $2, $3, true)
        ON CONFLICT (page_id, user_id)
        DO UPDATE SET shared = true
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(page.id)
    .bind(current.user.id)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    Ok(Json(interaction))
}

async fn add_comment(
    State(db): State<Db>,
    current: CurrentUser,
    Path(page_id): Path<Uuid>,
    Json(req): Json<CommentReq>,
) -> Result<Json<PageComment>, ApiError> {
    let page = fetch_page(&db, page_id).await?;
    let text = req.text.trim();
    if text.is_empty() {
        return Err(e422("Comment cannot be empty."));
    }

    let comment = sqlx::query_as::<_, PageComment>(
        r#"
        INSERT INTO page_comments (id, page_id, user_id, body)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(page.id)
    .bind(current.user.id)
    .bind(text)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    Ok(Json(comment))
}
