//! Abstraction over the external key-value store all workers coordinate through.
//!
//! The command set mirrors the subset of Redis the coordination layer needs. Values are
//! strings, lists and hashes of strings; numeric values are encoded as decimal text.
//!
//! Multi-step read-modify-write sequences never go through separate calls. They are
//! expressed as a [`Script`] and handed to [`CoordinationStore::eval`], which runs the
//! whole script indivisibly relative to every other command on the store.

mod memory;
#[cfg(feature = "redis")]
mod remote;

pub use self::memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::remote::{RedisSettings, RedisStore};

use crate::Result;

/// Commands available inside an atomic [`Script`]. None of them block.
pub trait Commands {
    fn get(&mut self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Returns the number of keys that existed.
    fn del(&mut self, keys: &[&str]) -> Result<usize>;
    /// Integer increment. A missing key counts as 0. Returns the new value.
    fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64>;
    /// Pushes each value to the head of the list, in order. Returns the new length.
    fn lpush(&mut self, key: &str, values: &[String]) -> Result<usize>;
    /// Pushes each value to the tail of the list, in order. Returns the new length.
    fn rpush(&mut self, key: &str, values: &[String]) -> Result<usize>;
    fn llen(&mut self, key: &str) -> Result<usize>;
    /// Whole list, head first.
    fn lrange(&mut self, key: &str) -> Result<Vec<String>>;
    fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<()>;
    fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>>;
    /// Float increment of a hash field. A missing field counts as 0. Returns the new value.
    fn hincr_by_float(&mut self, key: &str, field: &str, delta: f64) -> Result<f64>;
    fn hgetall(&mut self, key: &str) -> Result<Vec<(String, String)>>;
}

/// An atomic multi-step transaction over a fixed set of keys.
///
/// `body` is the native implementation run by in-process stores while holding the store
/// lock; `lua` is the equivalent server-side script for Redis. Both receive the same
/// `keys` and `args` and must implement identical semantics.
pub struct Script {
    pub name: &'static str,
    pub lua: &'static str,
    pub body: fn(&mut dyn Commands, &[String], &[String]) -> Result<()>,
}
impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script").field("name", &self.name).finish()
    }
}

/// Handle to the shared store. Every command is individually atomic.
///
/// Handles are cheap to clone; clones share the same connection. A handle must not be shared
/// between workers, since [`CoordinationStore::blpop`] may hold its connection indefinitely.
pub trait CoordinationStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn del(&self, keys: &[&str]) -> Result<usize>;
    fn incr_by(&self, key: &str, delta: i64) -> Result<i64>;
    fn lpush(&self, key: &str, values: &[String]) -> Result<usize>;
    fn rpush(&self, key: &str, values: &[String]) -> Result<usize>;
    fn lrange(&self, key: &str) -> Result<Vec<String>>;
    /// Removes and returns the head of the list, blocking until one is available.
    /// There is no timeout.
    fn blpop(&self, key: &str) -> Result<String>;
    fn hincr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64>;
    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>>;
    /// Runs **script** atomically.
    fn eval(&self, script: &Script, keys: &[String], args: &[String]) -> Result<()>;
}
