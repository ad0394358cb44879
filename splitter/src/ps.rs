//! Prepared-statement ID remapping, grounded in `rwsplit_ps.cc`/`rwsplit_ps.hh`.
//!
//! MaxScale hands the client a router-assigned `COM_STMT_PREPARE` id rather
//! than the backend's own id, since pooled backends may assign differing
//! sequence numbers for the "same" prepared statement. `PsIdMap` is that
//! remap table, distinct from `trx::ExecInfo` (which tracks *which backend*
//! a stmt_id last ran on, not the id translation itself).

use std::collections::HashMap;

#[derive(Default)]
pub struct PsIdMap {
    client_to_backend: HashMap<u32, HashMap<u32, u32>>,
    next_client_id: u32,
}

impl PsIdMap {
    /// Allocates a fresh client-visible id for a `COM_STMT_PREPARE` response
    /// and records its translation for `backend_id`.
    pub fn allocate(&mut self, backend_id: u32, backend_stmt_id: u32) -> u32 {
        self.next_client_id += 1;
        let client_id = self.next_client_id;
        self.client_to_backend
            .entry(client_id)
            .or_default()
            .insert(backend_id, backend_stmt_id);
        client_id
    }

    /// Records the same prepared statement's id on an additional backend
    /// (e.g. after session-command fan-out re-prepares it elsewhere).
    pub fn record_backend_id(&mut self, client_id: u32, backend_id: u32, backend_stmt_id: u32) {
        self.client_to_backend
            .entry(client_id)
            .or_default()
            .insert(backend_id, backend_stmt_id);
    }

    pub fn backend_stmt_id(&self, client_id: u32, backend_id: u32) -> Option<u32> {
        self.client_to_backend.get(&client_id)?.get(&backend_id).copied()
    }

    pub fn close(&mut self, client_id: u32) {
        self.client_to_backend.remove(&client_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allocate_assigns_increasing_client_ids() {
        let mut map = PsIdMap::default();
        let a = map.allocate(1, 100);
        let b = map.allocate(1, 200);
        assert_ne!(a, b);
        assert_eq!(map.backend_stmt_id(a, 1), Some(100));
        assert_eq!(map.backend_stmt_id(b, 1), Some(200));
    }

    #[test]
    fn record_backend_id_adds_a_second_backend_mapping() {
        let mut map = PsIdMap::default();
        let id = map.allocate(1, 50);
        map.record_backend_id(id, 2, 77);
        assert_eq!(map.backend_stmt_id(id, 1), Some(50));
        assert_eq!(map.backend_stmt_id(id, 2), Some(77));
    }

    #[test]
    fn close_removes_all_backend_mappings() {
        let mut map = PsIdMap::default();
        let id = map.allocate(1, 50);
        map.close(id);
        assert_eq!(map.backend_stmt_id(id, 1), None);
    }
}
