#![feature(allocator_api)]
#![feature(hasher_prefixfree_extras)]

pub mod config;
pub mod codec;
pub mod parse;
pub mod log;
pub mod err;

pub mod schema;

pub mod server;
pub mod model;
pub mod structure;
pub mod lifecycle;
pub mod memory_ext;
mod util;
mod decimal_util;