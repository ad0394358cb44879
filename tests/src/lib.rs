//! Integration tests spanning more than one crate at once, seeded from the
//! concrete scenarios the router and splitter specs call out directly.

mod router;
mod splitter;
