use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CATEGORIES: &[&str] = &["programming", "design", "business", "science", "others"];

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub surname: String,
    pub mobile_no: Option<String>,
    pub role: String, // "educator" | "learner"
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct CoursePage {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub body: String,
    pub page_no: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct CourseProgress {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    pub current_page_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct PageInteraction {
    pub id: Uuid,
    pub page_id: Uuid,
    pub user_id: Uuid,
    pub liked: bool,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct PageComment {
    pub id: Uuid,
    pub page_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- request bodies ---

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterReq {
    pub email: String,
    pub first_name: String,
    pub surname: String,
    pub mobile_no: Option<String>,
    pub password1: String,
    pub password2: String,
    pub role: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateCourseReq {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreatePageReq {
    pub title: String,
    pub body: String,
    pub page_no: Option<i32>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UpdatePageReq {
    pub title: String,
    pub body: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CommentReq {
    pub text: String,
}

// --- response bodies ---

#[derive(Serialize, Debug, Clone)]
pub struct SessionRes {
    pub token: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct EnrollRes {
    pub message: String,
    pub already_enrolled: bool,
}

/// One enrolled course in the learner's course list, with derived progress.
#[derive(Serialize, Debug, Clone)]
pub struct EnrolledCourseRes {
    pub course: Course,
    pub progress_percentage: f64,
    pub is_completed: bool,
    pub next_page_id: Option<Uuid>,
}

#[derive(Serialize, Debug, Clone)]
pub struct LearnerCoursesRes {
    pub enrolled: Vec<EnrolledCourseRes>,
    pub available: Vec<Course>,
}

/// A page as seen by a learner: content plus neighbours and social state.
#[derive(Serialize, Debug, Clone)]
pub struct PageViewRes {
    pub page: CoursePage,
    pub previous_page_id: Option<Uuid>,
    pub next_page_id: Option<Uuid>,
    pub like_count: i64,
    pub user_has_liked: bool,
    pub progress_percentage: f64,
    pub comments: Vec<PageComment>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CertificateRes {
    pub course_id: Uuid,
    pub course_title: String,
    pub learner_name: String,
    pub completion_date: DateTime<Utc>,
    pub certificate_id: String,
}
