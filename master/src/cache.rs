//! Cached master responses, spec.md §4.3 "Cached master responses are
//! persisted under `binlogdir/cache/<tag>`", grounded in MaxScale's
//! `blr_cache.c` (`blr_cache_response`/`blr_cache_read_response`).
//!
//! Lets the proxy answer identical handshake queries (`SELECT
//! UNIX_TIMESTAMP()`, `SELECT @@version`, ...) from slaves without a live
//! master connection.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use common::err::decode_error::ReError;

pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(binlogdir: &str) -> Result<Self, ReError> {
        let dir = Path::new(binlogdir).join("cache");
        fs::create_dir_all(&dir)?;
        Ok(ResponseCache { dir })
    }

    /// Saves `response` under `tag`, written atomically via a `.tmp` file
    /// and rename, matching `master.ini`'s write discipline (spec.md §6).
    pub fn save(&self, tag: &str, response: &[u8]) -> Result<(), ReError> {
        let target = self.dir.join(tag);
        let tmp = self.dir.join(format!("{}.tmp", tag));
        let mut f = fs::File::create(&tmp)?;
        f.write_all(response)?;
        f.sync_all()?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    pub fn load(&self, tag: &str) -> Result<Option<Vec<u8>>, ReError> {
        let target = self.dir.join(tag);
        if !target.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(target)?))
    }
}
