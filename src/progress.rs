//! Per-learner progress through a course's ordered pages.
//!
//! One progress record exists per (learner, course) pair, created lazily on
//! first page visit or on enrollment. Completion is derived from the size of
//! the completed-pages set against the course's page count, never stored as
//! its own flag.

use std::collections::HashSet;

use sqlx::Row;
use uuid::Uuid;

use crate::db::Db;
use crate::models::{CoursePage, CourseProgress};

/// Fraction of the course completed, 0.0 for a course with no pages.
pub fn percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64
}

/// A course counts as completed only when it has pages and all of them
/// are in the completed set.
pub fn is_complete(completed: usize, total: usize) -> bool {
    total > 0 && completed == total
}

/// First page (by `page_no`) not yet completed. `pages` must be ordered by
/// `page_no` ascending. `None` means everything is done (or there is
/// nothing to do).
pub fn next_incomplete(pages: &[(Uuid, i32)], completed: &HashSet<Uuid>) -> Option<Uuid> {
    pages
        .iter()
        .find(|(id, _)| !completed.contains(id))
        .map(|(id, _)| *id)
}

/// Course pages as ordered (id, page_no) pairs.
async fn page_list(db: &Db, course_id: Uuid) -> sqlx::Result<Vec<(Uuid, i32)>> {
    let rows = sqlx::query(
        "SELECT id, page_no FROM course_pages WHERE course_id = $1 ORDER BY page_no",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;
    Ok(rows.iter().map(|r| (r.get("id"), r.get("page_no"))).collect())
}

async fn completed_set(db: &Db, progress_id: Uuid) -> sqlx::Result<HashSet<Uuid>> {
    let rows = sqlx::query("SELECT page_id FROM completed_pages WHERE progress_id = $1")
        .bind(progress_id)
        .fetch_all(db)
        .await?;
    Ok(rows.iter().map(|r| r.get("page_id")).collect())
}

/// Get or lazily create the progress record for (learner, course). A new
/// record starts at `initial_page` (the first page on enrollment, the
/// visited page on a direct visit).
pub async fn get_or_create(
    db: &Db,
    learner_id: Uuid,
    course_id: Uuid,
    initial_page: Option<Uuid>,
) -> sqlx::Result<CourseProgress> {
    if let Some(existing) = sqlx::query_as::<_, CourseProgress>(
        "SELECT * FROM course_progress WHERE learner_id = $1 AND course_id = $2",
    )
    .bind(learner_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?
    {
        return Ok(existing);
    }

    // Concurrent first visits race on the (learner, course) unique pair;
    // ON CONFLICT keeps the loser on the row the winner inserted.
    sqlx::query_as::<_, CourseProgress>(
        r#"
        INSERT INTO course_progress (id, learner_id, course_id, current_page_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (learner_id, course_id)
        DO UPDATE SET updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(learner_id)
    .bind(course_id)
    .bind(initial_page)
    .fetch_one(db)
    .await
}

/// Record a page visit: add the page to the completed set (idempotent),
/// move `current_page_id` to the first not-yet-completed page, and stamp
/// `completed_at` the first time the completed set covers the whole course.
pub async fn visit_page(
    db: &Db,
    learner_id: Uuid,
    page: &CoursePage,
) -> sqlx::Result<CourseProgress> {
    let progress = get_or_create(db, learner_id, page.course_id, Some(page.id)).await?;

    sqlx::query(
        r#"
        INSERT INTO completed_pages (progress_id, page_id)
        VALUES ($1, $2)
        ON CONFLICT (progress_id, page_id) DO NOTHING
        "#,
    )
    .bind(progress.id)
    .bind(page.id)
    .execute(db)
    .await?;

    let pages = page_list(db, page.course_id).await?;
    let done = completed_set(db, progress.id).await?;
    let next = next_incomplete(&pages, &done);
    let finished = is_complete(done.len(), pages.len());

    sqlx::query_as::<_, CourseProgress>(
        r#"
        UPDATE course_progress
        SET current_page_id = $1,
            completed_at = CASE WHEN $2 THEN COALESCE(completed_at, now()) ELSE completed_at END,
            updated_at = now()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(next)
    .bind(finished)
    .bind(progress.id)
    .fetch_one(db)
    .await
}

/// Derived progress state for a learner's course listing.
pub struct Summary {
    pub percentage: f64,
    pub is_completed: bool,
    pub next_page_id: Option<Uuid>,
}

/// Progress summary for (learner, course); a learner who never opened the
/// course gets 0.0 and the first page as the next target.
pub async fn summary(db: &Db, learner_id: Uuid, course_id: Uuid) -> sqlx::Result<Summary> {
    let pages = page_list(db, course_id).await?;

    let progress = sqlx::query_as::<_, CourseProgress>(
        "SELECT * FROM course_progress WHERE learner_id = $1 AND course_id = $2",
    )
    .bind(learner_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    match progress {
        Some(p) => {
            let done = completed_set(db, p.id).await?;
            Ok(Summary {
                percentage: percentage(done.len(), pages.len()),
                is_completed: is_complete(done.len(), pages.len()),
                next_page_id: next_incomplete(&pages, &done),
            })
        }
        None => Ok(Summary {
            percentage: 0.0,
            is_completed: false,
            next_page_id: pages.first().map(|(id, _)| *id),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<(Uuid, i32)> {
        (0..n).map(|i| (Uuid::new_v4(), i as i32 + 1)).collect()
    }

    #[test]
    fn percentage_is_zero_for_empty_course() {
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_is_exactly_one_when_all_done() {
        assert_eq!(percentage(5, 5), 1.0);
    }

    #[test]
    fn percentage_is_fractional_midway() {
        assert_eq!(percentage(1, 4), 0.25);
    }

    #[test]
    fn empty_course_is_never_complete() {
        assert!(!is_complete(0, 0));
    }

    #[test]
    fn complete_only_when_set_covers_all_pages() {
        assert!(!is_complete(2, 3));
        assert!(is_complete(3, 3));
    }

    #[test]
    fn next_incomplete_is_lowest_numbered_missing_page() {
        let pages = ids(4);
        // pages 1 and 3 done, so page 2 is next
        let done: HashSet<Uuid> = [pages[0].0, pages[2].0].into_iter().collect();
        assert_eq!(next_incomplete(&pages, &done), Some(pages[1].0));
    }

    #[test]
    fn next_incomplete_is_none_when_all_done() {
        let pages = ids(3);
        let done: HashSet<Uuid> = pages.iter().map(|(id, _)| *id).collect();
        assert_eq!(next_incomplete(&pages, &done), None);
    }

    #[test]
    fn next_incomplete_of_fresh_progress_is_first_page() {
        let pages = ids(3);
        assert_eq!(next_incomplete(&pages, &HashSet::new()), Some(pages[0].0));
    }
}
