pub mod gtid;
pub mod gtid_event;
pub mod start_encryption_event;
