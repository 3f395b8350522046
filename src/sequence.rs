// Page ordering within a course: ordinal assignment on create,
// contiguous renumbering on delete.

use sqlx::Row;
use uuid::Uuid;

use crate::db::Db;

/// Ordinal for a newly created page: one past the course's current maximum.
pub fn next_page_no(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |m| m + 1)
}

/// Given (page_id, page_no) pairs ordered by `page_no`, compute the updates
/// needed to renumber them to 1..N. Pairs already at their slot are skipped,
/// so the common case (deleting the last page) touches no rows.
pub fn renumber(pages: &[(Uuid, i32)]) -> Vec<(Uuid, i32)> {
    pages
        .iter()
        .enumerate()
        .filter(|(idx, (_, no))| *no != (*idx as i32) + 1)
        .map(|(idx, (id, _))| (*id, idx as i32 + 1))
        .collect()
}

/// Resolve the ordinal for a page being created in `course_id`. An explicit
/// request wins; otherwise the next free slot is used.
pub async fn assign_page_no(db: &Db, course_id: Uuid, requested: Option<i32>) -> sqlx::Result<i32> {
    if let Some(no) = requested {
        return Ok(no);
    }
    let max: Option<i32> =
        sqlx::query_scalar("SELECT MAX(page_no) FROM course_pages WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(db)
            .await?;
    Ok(next_page_no(max))
}

/// Re-number the course's remaining pages to a gapless 1..N after a delete.
/// Updates run in ascending order, so every target slot is already vacant
/// and the (course_id, page_no) unique constraint holds throughout.
pub async fn renumber_course(db: &Db, course_id: Uuid) -> sqlx::Result<()> {
    let rows = sqlx::query(
        "SELECT id, page_no FROM course_pages WHERE course_id = $1 ORDER BY page_no",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let pages: Vec<(Uuid, i32)> = rows
        .iter()
        .map(|r| (r.get("id"), r.get("page_no")))
        .collect();

    for (id, no) in renumber(&pages) {
        sqlx::query("UPDATE course_pages SET page_no = $1, updated_at = now() WHERE id = $2")
            .bind(no)
            .bind(id)
            .execute(db)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(no: i32) -> (Uuid, i32) {
        (Uuid::new_v4(), no)
    }

    #[test]
    fn first_page_gets_one() {
        assert_eq!(next_page_no(None), 1);
    }

    #[test]
    fn new_page_follows_current_max() {
        assert_eq!(next_page_no(Some(7)), 8);
    }

    #[test]
    fn renumber_closes_gap_after_middle_delete() {
        // course had 1..4, page 2 was deleted
        let pages = vec![page(1), page(3), page(4)];
        let updates = renumber(&pages);
        assert_eq!(updates, vec![(pages[1].0, 2), (pages[2].0, 3)]);
    }

    #[test]
    fn renumber_preserves_relative_order() {
        let pages = vec![page(2), page(5), page(9)];
        let updates = renumber(&pages);
        assert_eq!(
            updates,
            vec![(pages[0].0, 1), (pages[1].0, 2), (pages[2].0, 3)]
        );
    }

    #[test]
    fn renumber_is_noop_when_contiguous() {
        let pages = vec![page(1), page(2), page(3)];
        assert!(renumber(&pages).is_empty());
    }

    #[test]
    fn renumber_of_empty_course_is_empty() {
        assert!(renumber(&[]).is_empty());
    }

    #[test]
    fn renumbered_sequence_is_gapless_one_to_n() {
        let pages = vec![page(3), page(4), page(8), page(20)];
        let mut finals: Vec<i32> = pages.iter().map(|(_, no)| *no).collect();
        for (id, new_no) in renumber(&pages) {
            let idx = pages.iter().position(|(p, _)| *p == id).unwrap();
            finals[idx] = new_no;
        }
        assert_eq!(finals, vec![1, 2, 3, 4]);
    }
}
