//! Binlog filename/path layout, spec.md §4.2 / §6 `binlog_structure`.

use std::path::PathBuf;

use common::config::router_config::{BinlogRouterConfig, BinlogStructure};

/// Resolves `binlogdir`/`filestem`/`binlog_structure` into concrete paths.
#[derive(Debug, Clone)]
pub struct BinlogLayout {
    pub binlogdir: String,
    pub filestem: String,
    pub structure: BinlogStructure,
    pub domain_id: u32,
    pub server_id: u32,
}

impl BinlogLayout {
    pub fn new(cfg: &BinlogRouterConfig, domain_id: u32) -> Self {
        BinlogLayout {
            binlogdir: cfg.binlogdir.clone(),
            filestem: cfg.filestem.clone(),
            structure: cfg.binlog_structure,
            domain_id,
            server_id: cfg.server_id,
        }
    }

    /// `<binlogdir>/<filestem>.NNNNNN` (flat) or
    /// `<binlogdir>/<domain>/<server_id>/<filestem>.NNNNNN` (tree).
    pub fn file_path(&self, index: u32) -> PathBuf {
        let name = format!("{}.{:06}", self.filestem, index);
        match self.structure {
            BinlogStructure::Flat => PathBuf::from(&self.binlogdir).join(name),
            BinlogStructure::Tree => PathBuf::from(&self.binlogdir)
                .join(self.domain_id.to_string())
                .join(self.server_id.to_string())
                .join(name),
        }
    }

    pub fn dir_for(&self, index: u32) -> PathBuf {
        self.file_path(index)
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.binlogdir))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> BinlogRouterConfig {
        BinlogRouterConfig {
            binlogdir: "/data/binlogs".to_string(),
            filestem: "mysql-bin".to_string(),
            server_id: 7,
            ..Default::default()
        }
    }

    #[test]
    fn flat_layout_ignores_domain_and_server() {
        let layout = BinlogLayout::new(&cfg(), 3);
        assert_eq!(
            layout.file_path(12),
            PathBuf::from("/data/binlogs/mysql-bin.000012")
        );
    }

    #[test]
    fn tree_layout_nests_by_domain_then_server() {
        let mut c = cfg();
        c.binlog_structure = BinlogStructure::Tree;
        let layout = BinlogLayout::new(&c, 3);
        assert_eq!(
            layout.file_path(1),
            PathBuf::from("/data/binlogs/3/7/mysql-bin.000001")
        );
    }
}
