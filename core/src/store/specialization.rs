use super::{is_constraint_violation, DeskStore};
use crate::{
    error::{DeskError, DeskResult},
    specialization::{PriorityLevel, Specialization},
};
use rusqlite::{params, OptionalExtension};

const SPEC_COLUMNS: &str = "counselor_id, category_id, priority_level, max_workload,
                            current_workload, is_available, expertise_rating";

// Helper function for mapping specialization rows
fn specialization_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Specialization> {
    Ok(Specialization {
        counselor_id: row.get(0)?,
        category_id: row.get(1)?,
        priority_level: PriorityLevel::from_stored(&row.get::<_, String>(2)?),
        max_workload: row.get::<_, i64>(3)?.max(0) as u32,
        current_workload: row.get::<_, i64>(4)?.max(0) as u32,
        is_available: row.get::<_, i32>(5)? != 0,
        expertise_rating: row
            .get::<_, Option<i64>>(6)?
            .map(|r| r.clamp(0, i64::from(u8::MAX)) as u8),
    })
}

impl DeskStore {
    // ── Specialization ─────────────────────────────────────────────

    pub fn insert_specialization(&self, s: &Specialization) -> DeskResult<()> {
        let result = self.conn.execute(
            "INSERT INTO specialization (
                counselor_id, category_id, priority_level, max_workload,
                current_workload, is_available, expertise_rating
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &s.counselor_id,
                &s.category_id,
                s.priority_level.as_str(),
                s.max_workload as i64,
                s.current_workload as i64,
                if s.is_available { 1i32 } else { 0i32 },
                s.expertise_rating.map(i64::from),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(DeskError::DuplicateSpecialization {
                counselor_id: s.counselor_id.clone(),
                category_id: s.category_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the administrator-editable columns. Workload is left alone.
    pub fn update_specialization_settings(&self, s: &Specialization) -> DeskResult<bool> {
        let changed = self.conn.execute(
            "UPDATE specialization
             SET priority_level = ?1, max_workload = ?2, is_available = ?3, expertise_rating = ?4
             WHERE counselor_id = ?5 AND category_id = ?6",
            params![
                s.priority_level.as_str(),
                s.max_workload as i64,
                if s.is_available { 1i32 } else { 0i32 },
                s.expertise_rating.map(i64::from),
                &s.counselor_id,
                &s.category_id,
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn delete_specialization(&self, counselor_id: &str, category_id: &str) -> DeskResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM specialization WHERE counselor_id = ?1 AND category_id = ?2",
            params![counselor_id, category_id],
        )?;
        Ok(changed == 1)
    }

    pub fn get_specialization(
        &self,
        counselor_id: &str,
        category_id: &str,
    ) -> DeskResult<Option<Specialization>> {
        let sql = format!(
            "SELECT {SPEC_COLUMNS} FROM specialization
             WHERE counselor_id = ?1 AND category_id = ?2"
        );
        Ok(self
            .conn
            .query_row(&sql, params![counselor_id, category_id], specialization_row_mapper)
            .optional()?)
    }

    pub fn specializations_for_category(&self, category_id: &str) -> DeskResult<Vec<Specialization>> {
        let sql = format!(
            "SELECT {SPEC_COLUMNS} FROM specialization
             WHERE category_id = ?1 ORDER BY counselor_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![category_id], specialization_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_specializations(&self) -> DeskResult<Vec<Specialization>> {
        let sql = format!(
            "SELECT {SPEC_COLUMNS} FROM specialization
             ORDER BY category_id ASC, counselor_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], specialization_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Workload ───────────────────────────────────────────────────

    /// Check-and-increment in one statement. Returns false when the row is
    /// missing, opted out, or already at capacity.
    pub fn try_increment_workload(&self, counselor_id: &str, category_id: &str) -> DeskResult<bool> {
        let changed = self.conn.execute(
            "UPDATE specialization SET current_workload = current_workload + 1
             WHERE counselor_id = ?1 AND category_id = ?2
               AND is_available = 1 AND current_workload < max_workload",
            params![counselor_id, category_id],
        )?;
        Ok(changed == 1)
    }

    /// Unconditional increment for administrator assignments.
    pub fn force_increment_workload(&self, counselor_id: &str, category_id: &str) -> DeskResult<bool> {
        let changed = self.conn.execute(
            "UPDATE specialization SET current_workload = current_workload + 1
             WHERE counselor_id = ?1 AND category_id = ?2",
            params![counselor_id, category_id],
        )?;
        Ok(changed == 1)
    }

    /// Decrement floored at zero. Returns false when the row is missing.
    pub fn decrement_workload(&self, counselor_id: &str, category_id: &str) -> DeskResult<bool> {
        let changed = self.conn.execute(
            "UPDATE specialization SET current_workload = MAX(current_workload - 1, 0)
             WHERE counselor_id = ?1 AND category_id = ?2",
            params![counselor_id, category_id],
        )?;
        Ok(changed == 1)
    }

    pub fn reset_all_workloads(&self) -> DeskResult<usize> {
        Ok(self
            .conn
            .execute("UPDATE specialization SET current_workload = 0", [])?)
    }
}
