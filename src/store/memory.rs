use super::{Commands, CoordinationStore, Script};
use crate::helpers::{decode_float, decode_int, encode_float};
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::trace;

enum Value {
    Str(String),
    List(VecDeque<String>),
    Hash(HashMap<String, String>),
}

const WRONGTYPE: &str = "operation against a key holding the wrong kind of value";
const NO_VALUES: &str = "wrong number of arguments, push needs at least one value";

/// The data of a [`MemoryStore`]. Implements the command set with Redis semantics: lists and
/// hashes disappear when they become empty, missing counters read as zero.
#[derive(Default)]
struct Keyspace {
    entries: HashMap<String, Value>,
}
impl Keyspace {
    fn list_mut(&mut self, op: &'static str, key: &str) -> Result<&mut VecDeque<String>> {
        match self.entries.entry(key.to_owned()).or_insert_with(|| Value::List(VecDeque::new())) {
            Value::List(list) => Ok(list),
            _ => Err(Error::store(op, key, WRONGTYPE)),
        }
    }

    fn hash_mut(&mut self, op: &'static str, key: &str) -> Result<&mut HashMap<String, String>> {
        match self.entries.entry(key.to_owned()).or_insert_with(|| Value::Hash(HashMap::new())) {
            Value::Hash(hash) => Ok(hash),
            _ => Err(Error::store(op, key, WRONGTYPE)),
        }
    }

    fn pop_front(&mut self, key: &str) -> Result<Option<String>> {
        let (head, now_empty) = match self.entries.get_mut(key) {
            None => return Ok(None),
            Some(Value::List(list)) => (list.pop_front(), list.is_empty()),
            Some(_) => return Err(Error::store("BLPOP", key, WRONGTYPE)),
        };
        if now_empty {
            self.entries.remove(key);
        }
        Ok(head)
    }
}

impl Commands for Keyspace {
    fn get(&mut self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Error::store("GET", key, WRONGTYPE)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), Value::Str(value.to_owned()));
        Ok(())
    }

    fn del(&mut self, keys: &[&str]) -> Result<usize> {
        Ok(keys.iter().map(|k| self.entries.remove(*k)).filter(Option::is_some).count())
    }

    fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64> {
        let current = match self.get(key)? {
            Some(raw) => decode_int("INCRBY", key, &raw)?,
            None => 0,
        };
        let next = current.checked_add(delta)
            .ok_or_else(|| Error::store("INCRBY", key, "increment would overflow"))?;
        self.set(key, &next.to_string())?;
        Ok(next)
    }

    fn lpush(&mut self, key: &str, values: &[String]) -> Result<usize> {
        if values.is_empty() {
            return Err(Error::store("LPUSH", key, NO_VALUES));
        }
        let list = self.list_mut("LPUSH", key)?;
        values.iter().for_each(|v| list.push_front(v.clone()));
        Ok(list.len())
    }

    fn rpush(&mut self, key: &str, values: &[String]) -> Result<usize> {
        if values.is_empty() {
            return Err(Error::store("RPUSH", key, NO_VALUES));
        }
        let list = self.list_mut("RPUSH", key)?;
        list.extend(values.iter().cloned());
        Ok(list.len())
    }

    fn llen(&mut self, key: &str) -> Result<usize> {
        match self.entries.get(key) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(Error::store("LLEN", key, WRONGTYPE)),
        }
    }

    fn lrange(&mut self, key: &str) -> Result<Vec<String>> {
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list.iter().cloned().collect()),
            Some(_) => Err(Error::store("LRANGE", key, WRONGTYPE)),
        }
    }

    fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hash_mut("HSET", key)?.insert(field.to_owned(), value.to_owned());
        Ok(())
    }

    fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(Error::store("HGET", key, WRONGTYPE)),
        }
    }

    fn hincr_by_float(&mut self, key: &str, field: &str, delta: f64) -> Result<f64> {
        let hash = self.hash_mut("HINCRBYFLOAT", key)?;
        let current = match hash.get(field) {
            Some(raw) => decode_float("HINCRBYFLOAT", key, raw)?,
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(Error::store("HINCRBYFLOAT", key, "increment would produce NaN or Infinity"));
        }
        hash.insert(field.to_owned(), encode_float(next));
        Ok(next)
    }

    fn hgetall(&mut self, key: &str) -> Result<Vec<(String, String)>> {
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(hash)) => Ok(hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect()),
            Some(_) => Err(Error::store("HGETALL", key, WRONGTYPE)),
        }
    }
}


struct Shared {
    keyspace: Mutex<Keyspace>,
    pushed: Condvar,
}

/// In-process [`CoordinationStore`], shared by cloning.
///
/// All commands serialize on one lock. Scripts run natively while holding it, which gives them
/// the same isolation a single-threaded Redis gives Lua scripts. Blocked [`CoordinationStore::blpop`]
/// callers park on a condition variable and are woken by every push.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}
impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                keyspace: Mutex::new(Keyspace::default()),
                pushed: Condvar::new(),
            }),
        }
    }

    /// Whether **key** currently holds a value.
    pub fn exists(&self, key: &str) -> bool {
        self.shared.keyspace.lock().entries.contains_key(key)
    }

    /// All keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.keyspace.lock().entries.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

impl CoordinationStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.shared.keyspace.lock().get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.shared.keyspace.lock().set(key, value)
    }

    fn del(&self, keys: &[&str]) -> Result<usize> {
        self.shared.keyspace.lock().del(keys)
    }

    fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.shared.keyspace.lock().incr_by(key, delta)
    }

    fn lpush(&self, key: &str, values: &[String]) -> Result<usize> {
        let len = self.shared.keyspace.lock().lpush(key, values)?;
        self.shared.pushed.notify_all();
        Ok(len)
    }

    fn rpush(&self, key: &str, values: &[String]) -> Result<usize> {
        let len = self.shared.keyspace.lock().rpush(key, values)?;
        self.shared.pushed.notify_all();
        Ok(len)
    }

    fn lrange(&self, key: &str) -> Result<Vec<String>> {
        self.shared.keyspace.lock().lrange(key)
    }

    fn blpop(&self, key: &str) -> Result<String> {
        let mut keyspace = self.shared.keyspace.lock();
        loop {
            if let Some(head) = keyspace.pop_front(key)? {
                return Ok(head);
            }
            trace!(key, "blpop waiting");
            self.shared.pushed.wait(&mut keyspace);
        }
    }

    fn hincr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        self.shared.keyspace.lock().hincr_by_float(key, field, delta)
    }

    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        self.shared.keyspace.lock().hgetall(key)
    }

    fn eval(&self, script: &Script, keys: &[String], args: &[String]) -> Result<()> {
        trace!(script = script.name, ?keys, "eval");
        let res = {
            let mut keyspace = self.shared.keyspace.lock();
            (script.body)(&mut *keyspace, keys, args)
        };
        self.shared.pushed.notify_all();
        res
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn get_set_del() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.del(&["a", "b", "c"]).unwrap(), 2);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn incr_by_counts_missing_as_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_by("n", 3).unwrap(), 3);
        assert_eq!(store.incr_by("n", -5).unwrap(), -2);
        store.set("s", "x").unwrap();
        assert!(store.incr_by("s", 1).is_err());
    }

    #[test]
    fn list_push_order() {
        let store = MemoryStore::new();
        assert_eq!(store.lpush("l", &strings(&["a", "b"])).unwrap(), 2);
        assert_eq!(store.rpush("l", &strings(&["c"])).unwrap(), 3);
        assert_eq!(store.lrange("l").unwrap(), strings(&["b", "a", "c"]));
    }

    #[test]
    fn push_without_values_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.lpush("l", &[]).is_err());
        assert!(store.rpush("l", &[]).is_err());
        assert!(!store.exists("l"));
        store.rpush("l", &strings(&["a"])).unwrap();
        assert!(store.lpush("l", &[]).is_err());
        assert_eq!(store.lrange("l").unwrap(), strings(&["a"]));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let store = MemoryStore::new();
        store.lpush("l", &strings(&["a"])).unwrap();
        assert!(store.get("l").is_err());
        assert!(store.hincr_by_float("l", "0", 1.0).is_err());
        match store.get("l") {
            Err(Error::Store { op, key, .. }) => {
                assert_eq!(op, "GET");
                assert_eq!(key, "l");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn hincr_by_float_accumulates() {
        let store = MemoryStore::new();
        assert_eq!(store.hincr_by_float("h", "0", 1.5).unwrap(), 1.5);
        assert_eq!(store.hincr_by_float("h", "0", -0.25).unwrap(), 1.25);
        assert_eq!(store.hincr_by_float("h", "1", 2.0).unwrap(), 2.0);
        let mut all = store.hgetall("h").unwrap();
        all.sort();
        assert_eq!(all, vec![("0".to_string(), "1.25".to_string()), ("1".to_string(), "2".to_string())]);
        assert!(store.hincr_by_float("h", "0", f64::INFINITY).is_err());
    }

    #[test]
    fn blpop_returns_immediately_when_list_has_items() {
        let store = MemoryStore::new();
        store.lpush("l", &strings(&["x"])).unwrap();
        assert_eq!(store.blpop("l").unwrap(), "x");
        // popping the last element removes the key
        assert!(!store.exists("l"));
    }

    #[test]
    fn blpop_blocks_until_push() {
        let store = MemoryStore::new();
        std::thread::scope(|s| {
            let waiter = s.spawn(|| store.blpop("signal").unwrap());
            std::thread::sleep(Duration::from_millis(50));
            assert!(!waiter.is_finished());
            store.lpush("signal", &strings(&["go"])).unwrap();
            assert_eq!(waiter.join().unwrap(), "go");
        });
    }

    // Read-modify-write through separate commands; only correct if the script is isolated.
    fn bump(cmds: &mut dyn Commands, keys: &[String], _args: &[String]) -> Result<()> {
        let current = cmds.get(&keys[0])?.map(|v| v.parse::<i64>().unwrap()).unwrap_or(0);
        std::thread::yield_now();
        cmds.set(&keys[0], &(current + 1).to_string())
    }
    const BUMP: Script = Script { name: "bump", lua: "", body: bump };

    #[test]
    fn scripts_are_atomic() {
        let store = MemoryStore::new();
        let keys = strings(&["counter"]);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..250 {
                        store.eval(&BUMP, &keys, &[]).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.get("counter").unwrap().as_deref(), Some("2000"));
    }
}
