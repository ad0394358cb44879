//! Slave fanout: per-slave send cursors and duplicate-send protection,
//! spec.md §4.6.

use dashmap::DashMap;
use tokio::sync::Notify;

/// A packet length of exactly `2^24-1` signals a continuation, spec.md
/// §4.1/§4.6.
const MAX_PACKET_LEN: usize = 0x00FF_FFFF;

/// Splits one binlog event into the wire packets a slave connection must
/// actually send it as: a leading `0x00` OK byte (spec.md §4.1 "leading
/// payload byte 0x00 = OK") followed by the event bytes, cut into
/// `2^24-1`-byte packets with sequence numbers incrementing from
/// `starting_seq`. An event whose OK-prefixed length is an exact multiple
/// of `2^24-1` gets a trailing empty packet, matching ordinary
/// multi-packet termination (a continuation run ends on the first packet
/// shorter than the maximum, including a zero-length one).
pub fn split_event_for_wire(event: &[u8], starting_seq: u8) -> Vec<(u8, Vec<u8>)> {
    let mut payload = Vec::with_capacity(event.len() + 1);
    payload.push(0x00);
    payload.extend_from_slice(event);

    let mut packets = Vec::new();
    let mut seq = starting_seq;
    let mut offset = 0;
    loop {
        let remaining = payload.len() - offset;
        let take = remaining.min(MAX_PACKET_LEN);
        let chunk = payload[offset..offset + take].to_vec();
        offset += take;
        let was_full = take == MAX_PACKET_LEN;
        packets.push((seq, chunk));
        seq = seq.wrapping_add(1);
        if !was_full {
            break;
        }
        if offset == payload.len() {
            packets.push((seq, Vec::new()));
            break;
        }
    }
    packets
}

/// `(file, pos)` the slave has already been sent, plus who sent it. Several
/// routing threads may race to serve the same slave; only one send per
/// `(file, pos)` is allowed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCursor {
    pub file: String,
    pub pos: u64,
    pub sender_thread: u64,
    pub role: SlaveRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveRole {
    Slave,
    Relay,
}

pub struct SlaveFanout {
    cursors: DashMap<u32, SendCursor>,
    notify: Notify,
}

impl SlaveFanout {
    pub fn new() -> Self {
        SlaveFanout {
            cursors: DashMap::new(),
            notify: Notify::new(),
        }
    }

    pub fn register(&self, slave_server_id: u32, file: String, pos: u64, role: SlaveRole) {
        self.cursors.insert(
            slave_server_id,
            SendCursor {
                file,
                pos,
                sender_thread: 0,
                role,
            },
        );
    }

    /// A transaction closed; wake every thread waiting to stream to a
    /// slave (spec.md §4.5 step 6 "notify all slaves whose send cursor is
    /// pending").
    pub fn notify_all_pending(&self) {
        self.notify.notify_waiters();
    }

    pub async fn wait_for_data(&self) {
        self.notify.notified().await;
    }

    /// Records `(file, pos)` as sent by `sender_thread` for `slave_server_id`,
    /// refusing (returning `false`) a second send that would duplicate a
    /// `(file, pos)` pair already marked as sent.
    pub fn record_send(&self, slave_server_id: u32, file: &str, pos: u64, sender_thread: u64, role: SlaveRole) -> bool {
        let mut entry = self.cursors.entry(slave_server_id).or_insert_with(|| SendCursor {
            file: file.to_string(),
            pos: 0,
            sender_thread,
            role,
        });

        if entry.file == file && entry.pos == pos {
            return false;
        }

        entry.file = file.to_string();
        entry.pos = pos;
        entry.sender_thread = sender_thread;
        entry.role = role;
        true
    }

    pub fn cursor(&self, slave_server_id: u32) -> Option<SendCursor> {
        self.cursors.get(&slave_server_id).map(|e| e.clone())
    }

    /// All registered slaves and their send cursors, for the admin status
    /// surface (spec.md §7E).
    pub fn snapshot(&self) -> Vec<(u32, SendCursor)> {
        self.cursors
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }
}

impl Default for SlaveFanout {
    fn default() -> Self {
        SlaveFanout::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duplicate_send_to_same_file_pos_is_refused() {
        let fanout = SlaveFanout::new();
        fanout.register(5, "mysql-bin.000001".to_string(), 4, SlaveRole::Slave);
        assert!(fanout.record_send(5, "mysql-bin.000001", 200, 1, SlaveRole::Slave));
        assert!(!fanout.record_send(5, "mysql-bin.000001", 200, 2, SlaveRole::Slave));
        assert!(fanout.record_send(5, "mysql-bin.000001", 350, 2, SlaveRole::Slave));
    }

    #[test]
    fn snapshot_lists_every_registered_slave() {
        let fanout = SlaveFanout::new();
        fanout.register(5, "mysql-bin.000001".to_string(), 4, SlaveRole::Slave);
        fanout.register(6, "mysql-bin.000001".to_string(), 4, SlaveRole::Relay);
        let mut ids: Vec<u32> = fanout.snapshot().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn short_event_becomes_one_packet_with_ok_prefix() {
        let event = vec![1, 2, 3];
        let packets = split_event_for_wire(&event, 7);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].0, 7);
        assert_eq!(packets[0].1, vec![0x00, 1, 2, 3]);
    }

    #[test]
    fn oversized_event_splits_into_max_len_packets_with_increasing_seq() {
        let event = vec![0xab; MAX_PACKET_LEN + 10];
        let packets = split_event_for_wire(&event, 250);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].0, 250);
        assert_eq!(packets[0].1.len(), MAX_PACKET_LEN);
        assert_eq!(packets[1].0, 251);
        assert_eq!(packets[1].1.len(), 11); // 10 event bytes + 1 carried-over OK byte
    }

    #[test]
    fn event_exactly_max_len_after_ok_byte_gets_empty_terminator() {
        let event = vec![0xcd; MAX_PACKET_LEN - 1];
        let packets = split_event_for_wire(&event, 0);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].1.len(), MAX_PACKET_LEN);
        assert_eq!(packets[1].1.len(), 0);
        assert_eq!(packets[1].0, 1);
    }

    #[tokio::test]
    async fn notify_wakes_waiting_task() {
        let fanout = std::sync::Arc::new(SlaveFanout::new());
        let f2 = fanout.clone();
        let handle = tokio::spawn(async move {
            f2.wait_for_data().await;
        });
        tokio::task::yield_now().await;
        fanout.notify_all_pending();
        handle.await.unwrap();
    }
}
