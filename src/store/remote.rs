use super::{CoordinationStore, Script};
use crate::Result;
use parking_lot::Mutex;
use redis::{Client, Connection};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Connection parameters of a Redis server.
#[derive(Clone, Debug)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}
impl Default for RedisSettings {
    fn default() -> Self {
        Self { host: "localhost".to_owned(), port: 6379, password: None }
    }
}
impl RedisSettings {
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/", password, self.host, self.port),
            None => format!("redis://{}:{}/", self.host, self.port),
        }
    }
}

/// [`CoordinationStore`] backed by a Redis server. Scripts run through `EVAL` with their Lua source.
///
/// Each handle owns one connection; open a separate handle per worker.
#[derive(Clone)]
pub struct RedisStore {
    conn: Arc<Mutex<Connection>>,
}
impl RedisStore {
    pub fn open(settings: &RedisSettings) -> Result<Self> {
        Self::connect(&settings.url())
    }

    /// Open a connection from a `redis://` URL.
    pub fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = client.get_connection()?;
        debug!("connected to redis");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let mut conn = self.conn.lock();
        Ok(cmd.query(&mut *conn)?)
    }
}

impl CoordinationStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.query(redis::cmd("GET").arg(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.query(redis::cmd("SET").arg(key).arg(value))
    }

    fn del(&self, keys: &[&str]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.query(redis::cmd("DEL").arg(keys))
    }

    fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.query(redis::cmd("INCRBY").arg(key).arg(delta))
    }

    fn lpush(&self, key: &str, values: &[String]) -> Result<usize> {
        self.query(redis::cmd("LPUSH").arg(key).arg(values))
    }

    fn rpush(&self, key: &str, values: &[String]) -> Result<usize> {
        self.query(redis::cmd("RPUSH").arg(key).arg(values))
    }

    fn lrange(&self, key: &str) -> Result<Vec<String>> {
        self.query(redis::cmd("LRANGE").arg(key).arg(0).arg(-1))
    }

    fn blpop(&self, key: &str) -> Result<String> {
        let (_, value): (String, String) = self.query(redis::cmd("BLPOP").arg(key).arg(0))?;
        Ok(value)
    }

    fn hincr_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        self.query(redis::cmd("HINCRBYFLOAT").arg(key).arg(field).arg(delta))
    }

    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        let all: HashMap<String, String> = self.query(redis::cmd("HGETALL").arg(key))?;
        Ok(all.into_iter().collect())
    }

    fn eval(&self, script: &Script, keys: &[String], args: &[String]) -> Result<()> {
        trace!(script = script.name, ?keys, "eval");
        let lua = redis::Script::new(script.lua);
        let mut invocation = lua.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }
        let mut conn = self.conn.lock();
        invocation.invoke::<()>(&mut *conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_and_without_password() {
        let mut settings = RedisSettings::default();
        assert_eq!(settings.url(), "redis://localhost:6379/");
        settings.password = Some("hunter2".to_owned());
        settings.port = 7000;
        assert_eq!(settings.url(), "redis://:hunter2@localhost:7000/");
    }
}
