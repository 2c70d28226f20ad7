//! Redis storage implementation
//!
//! - `pool` - connection setup and health checks
//! - `cache` - the key/value operations the response cache needs

mod cache;
mod pool;

pub use pool::RedisPool;
