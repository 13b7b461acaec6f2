use super::DeskStore;
use crate::{
    error::{DeskError, DeskResult},
    specialization::Category,
};
use rusqlite::{params, OptionalExtension};

fn category_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        category_id: row.get(0)?,
        name: row.get(1)?,
        auto_assign: row.get::<_, i32>(2)? != 0,
        crisis_detection_enabled: row.get::<_, i32>(3)? != 0,
    })
}

impl DeskStore {
    // ── Category ───────────────────────────────────────────────────

    pub fn upsert_category(&self, c: &Category) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO category (category_id, name, auto_assign, crisis_detection_enabled)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(category_id) DO UPDATE SET
                name = excluded.name,
                auto_assign = excluded.auto_assign,
                crisis_detection_enabled = excluded.crisis_detection_enabled",
            params![
                &c.category_id,
                &c.name,
                if c.auto_assign { 1i32 } else { 0i32 },
                if c.crisis_detection_enabled { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(())
    }

    pub fn get_category(&self, category_id: &str) -> DeskResult<Category> {
        self.conn
            .query_row(
                "SELECT category_id, name, auto_assign, crisis_detection_enabled
                 FROM category WHERE category_id = ?1",
                params![category_id],
                category_row_mapper,
            )
            .optional()?
            .ok_or_else(|| DeskError::CategoryNotFound {
                category_id: category_id.to_string(),
            })
    }

    pub fn list_categories(&self) -> DeskResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT category_id, name, auto_assign, crisis_detection_enabled
             FROM category ORDER BY category_id ASC",
        )?;
        let rows = stmt.query_map([], category_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
