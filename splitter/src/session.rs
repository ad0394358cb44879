//! Per-session temp-table tracking, spec.md §6 `strict_tmp_tables`.
//! Grounded in `rwsplit_tmp_table_multi.cc`: a `CREATE TEMPORARY TABLE`
//! pins the table to the backend it ran on, and later statements
//! referencing the table must route back there regardless of the computed
//! `RoutingPlan`.

use std::collections::HashMap;

#[derive(Default)]
pub struct TempTableTracker {
    /// fully-qualified table name ("db.table") → backend it was created on.
    tables: HashMap<String, u32>,
}

impl TempTableTracker {
    pub fn on_create(&mut self, table: impl Into<String>, backend_id: u32) {
        self.tables.insert(table.into(), backend_id);
    }

    pub fn on_drop(&mut self, table: &str) {
        self.tables.remove(table);
    }

    /// The backend a query referencing `table` must be pinned to, if any.
    pub fn pinned_backend(&self, table: &str) -> Option<u32> {
        self.tables.get(table).copied()
    }

    /// spec.md §6: if `strict_tmp_tables` is set and the pinned backend is
    /// no longer in use, the session must be closed rather than silently
    /// re-routed.
    pub fn check_still_usable(&self, table: &str, backend_in_use: bool, strict: bool) -> Result<(), String> {
        if let Some(_pinned) = self.tables.get(table) {
            if !backend_in_use && strict {
                return Err(format!(
                    "temporary table '{table}' was created on a backend no longer in use"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pinned_backend_tracks_creation_and_drop() {
        let mut t = TempTableTracker::default();
        t.on_create("db.tmp1", 3);
        assert_eq!(t.pinned_backend("db.tmp1"), Some(3));
        t.on_drop("db.tmp1");
        assert_eq!(t.pinned_backend("db.tmp1"), None);
    }

    #[test]
    fn strict_mode_rejects_stale_pin() {
        let mut t = TempTableTracker::default();
        t.on_create("db.tmp1", 3);
        assert!(t.check_still_usable("db.tmp1", false, true).is_err());
        assert!(t.check_still_usable("db.tmp1", false, false).is_ok());
        assert!(t.check_still_usable("db.tmp1", true, true).is_ok());
    }

    #[test]
    fn untracked_table_is_always_usable() {
        let t = TempTableTracker::default();
        assert!(t.check_still_usable("db.other", false, true).is_ok());
    }
}
