//! Binlog file manager, spec.md §4.2.
//!
//! Owns the single binlog file currently being appended to: creation,
//! writing, rotation, crash recovery and read-back. File I/O here is
//! synchronous (spec.md §5, "bounded") — every call either returns quickly
//! or is a single disk operation the router is willing to block on.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use binlog::router_event::{event_type, RawEvent};
use common::err::decode_error::ReError;

use super::encryption_ctx::FileEncryptionCtx;
use super::layout::BinlogLayout;
use super::BINLOG_MAGIC;

/// Result of `recover`: either the file was already consistent, or it had
/// to be truncated back to the last fully-written, checksum-valid event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverOutcome {
    Clean { pos: u64 },
    Truncated { pos: u64, reason: String },
}

/// Result of a `read_binlog` scan: the events found, and whether the scan
/// ran off the end of a clean file or stopped short of a gap/corruption.
#[derive(Debug)]
pub struct ReadOutcome {
    pub events: Vec<(u64, RawEvent)>,
    pub ended_clean: bool,
}

pub struct BinlogFileManager {
    layout: BinlogLayout,
    index: u32,
    file: File,
    pos: u64,
    transaction_safety: bool,
    encryption: Option<FileEncryptionCtx>,
}

/// Event types that close a transaction boundary; with `transaction_safety`
/// on, the file manager fsyncs after writing one of these (spec.md §4.2,
/// §6 `transaction_safety`).
fn is_transaction_boundary(ev_type: u8) -> bool {
    ev_type == event_type::XID_EVENT || ev_type == event_type::QUERY_EVENT
}

impl BinlogFileManager {
    /// Creates `binlogdir` (and any tree-layout subdirectories) if missing,
    /// then opens or creates the file at `initbinlog`, writing the 4-byte
    /// magic if the file is new. Spec.md §4.2 "init".
    pub fn init(layout: BinlogLayout, index: u32, transaction_safety: bool) -> Result<Self, ReError> {
        let dir = layout.dir_for(index);
        std::fs::create_dir_all(&dir)?;
        let path = layout.file_path(index);
        let is_new = !path.exists();

        let mut file = OpenOptions::new().create(true).read(true).write(true).open(&path)?;
        let pos = if is_new {
            file.write_all(&BINLOG_MAGIC)?;
            file.flush()?;
            BINLOG_MAGIC.len() as u64
        } else {
            file.seek(SeekFrom::End(0))?
        };

        Ok(BinlogFileManager {
            layout,
            index,
            file,
            pos,
            transaction_safety,
            encryption: None,
        })
    }

    pub fn set_encryption(&mut self, ctx: Option<FileEncryptionCtx>) {
        self.encryption = ctx;
    }

    pub fn current_pos(&self) -> u64 {
        self.pos
    }

    pub fn current_index(&self) -> u32 {
        self.index
    }

    pub fn current_path(&self) -> std::path::PathBuf {
        self.layout.file_path(self.index)
    }

    /// Appends one already header-and-checksum-complete event, ciphering it
    /// first if a `START_ENCRYPTION_EVENT` is in effect for this file.
    /// Returns the file offset the event was written at.
    ///
    /// A short write is truncated back to the offset it started from so the
    /// file never contains a partial event (spec.md §4.2, §9.1).
    ///
    /// `next_pos` is the event's own header position for the event that
    /// follows it upstream. If it lands past where this write actually ends
    /// (the source filtered out bytes the position still accounts for), the
    /// gap is filled with a self-generated `IGNORABLE_EVENT` so the file's
    /// length keeps matching the upstream position (spec.md §3/§4.2 "holes
    /// in next_pos are filled with a self-generated IGNORABLE_EVENT").
    pub fn write_event(&mut self, mut event_bytes: Vec<u8>, event_type_hint: u8, next_pos: u64) -> Result<u64, ReError> {
        let start = self.pos;
        if let Some(ctx) = &self.encryption {
            ctx.encrypt_event(start as u32, &mut event_bytes)?;
        }

        let want = event_bytes.len();
        let written = self.file.write(&event_bytes)?;
        if written != want {
            self.file.set_len(start)?;
            self.file.seek(SeekFrom::Start(start))?;
            return Err(ReError::ShortWrite(format!(
                "wrote {} of {} bytes at offset {}",
                written, want, start
            )));
        }

        if self.transaction_safety && is_transaction_boundary(event_type_hint) {
            self.file.sync_data()?;
        }

        self.pos = start + want as u64;

        if next_pos > self.pos {
            self.fill_gap(next_pos - self.pos)?;
        }

        Ok(start)
    }

    /// Writes a self-generated `IGNORABLE_EVENT` spanning `gap` bytes,
    /// advancing `self.pos` to the position the upstream header claimed.
    /// `gap` must hold at least a bare header + checksum (23 bytes); a
    /// smaller gap means the upstream position itself is inconsistent.
    fn fill_gap(&mut self, gap: u64) -> Result<(), ReError> {
        const MIN_EVENT_LEN: u64 = 19 + binlog::crc::CHECKSUM_LEN as u64;
        if gap < MIN_EVENT_LEN {
            return Err(ReError::CorruptBinlog(format!(
                "next_pos gap of {} bytes is smaller than a bare event",
                gap
            )));
        }

        let start = self.pos;
        let body_len = (gap - MIN_EVENT_LEN) as usize;
        let event = RawEvent::build(
            0,
            event_type::IGNORABLE_LOG_EVENT,
            0,
            (start + gap) as u32,
            0x80, // LOG_EVENT_IGNORABLE_F
            vec![0u8; body_len],
        );

        let want = event.len();
        let written = self.file.write(&event)?;
        if written != want {
            self.file.set_len(start)?;
            self.file.seek(SeekFrom::Start(start))?;
            return Err(ReError::ShortWrite(format!(
                "wrote {} of {} bytes filling next_pos gap at offset {}",
                written, want, start
            )));
        }

        self.pos = start + want as u64;
        Ok(())
    }

    /// Starts a new file at `index + 1`, writing its magic header. The
    /// caller is responsible for having already written a `ROTATE_EVENT`
    /// into the old file pointing at the new name (spec.md §4.2 "rotate").
    pub fn rotate(&mut self) -> Result<(), ReError> {
        self.rotate_to(self.index + 1)
    }

    /// Rotates to an arbitrary `target_index`, matching a fake ROTATE whose
    /// file sequence jumps ahead of the next one in line: every file number
    /// strictly between the current one and `target_index` is created
    /// containing only the 4-byte magic, before `target_index` itself is
    /// opened for writing (spec.md §8 scenario 1, "Boundary behaviors").
    /// A `target_index` that isn't ahead of the current one is a no-op
    /// `rotate` to the immediate next file.
    pub fn rotate_to(&mut self, target_index: u32) -> Result<(), ReError> {
        let target_index = target_index.max(self.index + 1);
        for gap_index in (self.index + 1)..target_index {
            let dir = self.layout.dir_for(gap_index);
            std::fs::create_dir_all(&dir)?;
            let path = self.layout.file_path(gap_index);
            let mut gap_file = OpenOptions::new().create(true).write(true).open(&path)?;
            gap_file.write_all(&BINLOG_MAGIC)?;
            gap_file.flush()?;
        }

        let dir = self.layout.dir_for(target_index);
        std::fs::create_dir_all(&dir)?;
        let path = self.layout.file_path(target_index);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        file.write_all(&BINLOG_MAGIC)?;
        file.flush()?;

        self.file = file;
        self.index = target_index;
        self.pos = BINLOG_MAGIC.len() as u64;
        Ok(())
    }

    /// Walks the current file from the magic header, validating that each
    /// event's header is well-formed and that `next_pos` lines up with
    /// `pos + event_length`. Truncates the file at the first inconsistency
    /// (a torn write from a crash mid-event) and reports where. Spec.md
    /// §4.2 "recover", §8 scenario 3.
    pub fn recover(&mut self) -> Result<RecoverOutcome, ReError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut whole = Vec::new();
        self.file.read_to_end(&mut whole)?;

        let report = crate::check::check_bytes(&whole)?;
        match report.outcome {
            crate::check::CheckOutcome::Clean => {
                self.pos = whole.len() as u64;
                Ok(RecoverOutcome::Clean { pos: self.pos })
            }
            crate::check::CheckOutcome::Truncated { reason } => {
                self.truncate_to(report.last_good_pos, &reason)
            }
        }
    }

    fn truncate_to(&mut self, pos: u64, reason: &str) -> Result<RecoverOutcome, ReError> {
        self.file.set_len(pos)?;
        self.file.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(RecoverOutcome::Truncated {
            pos,
            reason: reason.to_string(),
        })
    }

    /// Opens an arbitrary binlog file by index for reading, independent of
    /// the file currently being appended to. Spec.md §4.2 "open_binlog".
    pub fn open_binlog(&self, index: u32) -> Result<File, ReError> {
        let path = self.layout.file_path(index);
        Ok(File::open(path)?)
    }

    /// Reads events from `file` starting at byte `start_pos`, decrypting
    /// with `encryption` if given. Stops (without error) at a clean EOF;
    /// stops and reports `ended_clean: false` at the first incomplete or
    /// malformed event, mirroring a reader racing an in-progress write.
    /// Spec.md §4.2 "read_binlog".
    pub fn read_binlog(
        mut file: File,
        start_pos: u64,
        encryption: Option<&FileEncryptionCtx>,
    ) -> Result<ReadOutcome, ReError> {
        file.seek(SeekFrom::Start(start_pos))?;
        let mut whole = Vec::new();
        file.read_to_end(&mut whole)?;

        let mut pos = start_pos;
        let mut events = Vec::new();
        loop {
            let offset = (pos - start_pos) as usize;
            if offset >= whole.len() {
                return Ok(ReadOutcome {
                    events,
                    ended_clean: true,
                });
            }

            // An encrypted event's header is ciphertext except for the
            // clear 4-byte size `binlog::crypto` leaves at offset 0 for
            // exactly this reason: the reader must slice out the whole
            // event and decrypt it before a normal header parse is
            // possible at all.
            let full = if let Some(ctx) = encryption {
                if offset + 4 > whole.len() {
                    return Ok(ReadOutcome { events, ended_clean: false });
                }
                let total_len = u32::from_le_bytes(whole[offset..offset + 4].try_into().unwrap()) as usize;
                if offset + total_len > whole.len() {
                    return Ok(ReadOutcome { events, ended_clean: false });
                }
                let mut full = whole[offset..offset + total_len].to_vec();
                ctx.decrypt_event(pos as u32, &mut full)?;
                full
            } else {
                match RawEvent::parse(&whole[offset..]) {
                    Ok(ev) => whole[offset..offset + ev.total_len() as usize].to_vec(),
                    Err(_) => {
                        return Ok(ReadOutcome {
                            events,
                            ended_clean: false,
                        });
                    }
                }
            };

            match RawEvent::parse(&full) {
                Ok(ev) => {
                    if binlog::crc::verify(&full).is_err() {
                        return Ok(ReadOutcome {
                            events,
                            ended_clean: false,
                        });
                    }
                    let len = ev.total_len() as u64;
                    events.push((pos, ev));
                    pos += len;
                }
                Err(_) => {
                    return Ok(ReadOutcome {
                        events,
                        ended_clean: false,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::config::router_config::BinlogRouterConfig;
    use tempfile_stub::TempDir;

    /// Minimal temp-dir helper; the teacher's tests don't pull in a crate
    /// for this, so neither do we.
    mod tempfile_stub {
        use std::path::PathBuf;

        pub struct TempDir(pub PathBuf);

        impl TempDir {
            pub fn new(tag: &str) -> Self {
                let mut p = std::env::temp_dir();
                p.push(format!(
                    "relay_log_test_{}_{}",
                    tag,
                    std::process::id()
                ));
                std::fs::create_dir_all(&p).unwrap();
                TempDir(p)
            }

            pub fn path(&self) -> &std::path::Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    fn sample_event(event_type: u8, payload: &[u8], next_pos: u32) -> Vec<u8> {
        let body = binlog::crc::append(payload.to_vec());
        let mut v = Vec::new();
        v.extend_from_slice(&0u32.to_le_bytes());
        v.push(event_type);
        v.extend_from_slice(&1u32.to_le_bytes());
        let total_len = 19 + body.len() as u32;
        v.extend_from_slice(&total_len.to_le_bytes());
        v.extend_from_slice(&next_pos.to_le_bytes());
        v.extend_from_slice(&0u16.to_le_bytes());
        v.extend_from_slice(&body);
        v
    }

    fn layout_in(dir: &std::path::Path) -> BinlogLayout {
        let cfg = BinlogRouterConfig {
            binlogdir: dir.to_string_lossy().to_string(),
            filestem: "mysql-bin".to_string(),
            ..Default::default()
        };
        BinlogLayout::new(&cfg, 0)
    }

    #[test]
    fn init_writes_magic_on_new_file() {
        let tmp = TempDir::new("init");
        let mgr = BinlogFileManager::init(layout_in(tmp.path()), 1, false).unwrap();
        assert_eq!(mgr.current_pos(), 4);
    }

    #[test]
    fn rotate_to_fills_skipped_file_numbers_with_magic_only_files() {
        let tmp = TempDir::new("rotate_gap");
        let mut mgr = BinlogFileManager::init(layout_in(tmp.path()), 5, false).unwrap();
        mgr.rotate_to(10).unwrap();
        assert_eq!(mgr.current_index(), 10);
        assert_eq!(mgr.current_pos(), 4);

        for gap in 6..10 {
            let bytes = std::fs::read(layout_in(tmp.path()).file_path(gap)).unwrap();
            assert_eq!(bytes, BINLOG_MAGIC);
        }
    }

    #[test]
    fn write_then_rotate_starts_fresh_file_with_magic() {
        let tmp = TempDir::new("rotate");
        let mut mgr = BinlogFileManager::init(layout_in(tmp.path()), 1, false).unwrap();
        let ev = sample_event(event_type::XID_EVENT, &8u64.to_le_bytes(), 0);
        mgr.write_event(ev, event_type::XID_EVENT, 0).unwrap();
        mgr.rotate().unwrap();
        assert_eq!(mgr.current_index(), 2);
        assert_eq!(mgr.current_pos(), 4);
    }

    #[test]
    fn recover_truncates_torn_trailing_event() {
        let tmp = TempDir::new("recover");
        let mut mgr = BinlogFileManager::init(layout_in(tmp.path()), 1, false).unwrap();
        let good = sample_event(event_type::XID_EVENT, &8u64.to_le_bytes(), 31);
        let good_len = good.len();
        mgr.write_event(good, event_type::XID_EVENT, 31).unwrap();
        // simulate a crash mid-write: append a header claiming more body
        // than actually exists.
        let torn = sample_event(event_type::QUERY_EVENT, &[0u8; 20], 200);
        let torn_header_only = &torn[..19];
        let mut f = OpenOptions::new().write(true).open(mgr.current_path()).unwrap();
        f.seek(SeekFrom::End(0)).unwrap();
        f.write_all(torn_header_only).unwrap();
        drop(f);

        let outcome = mgr.recover().unwrap();
        assert_eq!(
            outcome,
            RecoverOutcome::Truncated {
                pos: 4 + good_len as u64,
                reason: "incomplete or malformed trailing event".to_string(),
            }
        );
    }

    #[test]
    fn read_binlog_reads_back_written_events() {
        let tmp = TempDir::new("readback");
        let mut mgr = BinlogFileManager::init(layout_in(tmp.path()), 1, false).unwrap();
        let ev1 = sample_event(event_type::QUERY_EVENT, b"BEGIN", 0);
        let ev1_len = ev1.len() as u32;
        mgr.write_event(ev1, event_type::QUERY_EVENT, 0).unwrap();
        let ev2 = sample_event(event_type::XID_EVENT, &1u64.to_le_bytes(), 0);
        mgr.write_event(ev2, event_type::XID_EVENT, 0).unwrap();
        drop(mgr);

        let file = File::open(layout_in(tmp.path()).file_path(1)).unwrap();
        let outcome = BinlogFileManager::read_binlog(file, 4, None).unwrap();
        assert!(outcome.ended_clean);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.events[0].0, 4);
        assert_eq!(outcome.events[1].0, 4 + ev1_len as u64);
    }

    #[test]
    fn write_event_fills_gap_with_ignorable_event() {
        let tmp = TempDir::new("gapfill");
        let mut mgr = BinlogFileManager::init(layout_in(tmp.path()), 1, false).unwrap();
        let ev = sample_event(event_type::XID_EVENT, &8u64.to_le_bytes(), 0);
        let ev_len = ev.len() as u64;
        let claimed_next_pos = 4 + ev_len + 100;
        mgr.write_event(ev, event_type::XID_EVENT, claimed_next_pos).unwrap();
        assert_eq!(mgr.current_pos(), claimed_next_pos);

        drop(mgr);
        let file = File::open(layout_in(tmp.path()).file_path(1)).unwrap();
        let outcome = BinlogFileManager::read_binlog(file, 4, None).unwrap();
        assert!(outcome.ended_clean);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.events[1].1.event_type(), event_type::IGNORABLE_LOG_EVENT);
        assert_eq!(outcome.events[1].1.header.get_log_pos() as u64, claimed_next_pos);
    }

    #[test]
    fn write_event_rejects_gap_smaller_than_one_event() {
        let tmp = TempDir::new("gaptoo_small");
        let mut mgr = BinlogFileManager::init(layout_in(tmp.path()), 1, false).unwrap();
        let ev = sample_event(event_type::XID_EVENT, &8u64.to_le_bytes(), 0);
        let ev_len = ev.len() as u64;
        let result = mgr.write_event(ev, event_type::XID_EVENT, 4 + ev_len + 5);
        assert!(result.is_err());
    }
}
