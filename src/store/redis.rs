//! Redis backend (RedisJSON + RediSearch)

use super::{IndexInfo, Store, Write};
use crate::common::{Error, Result};
use crate::index::IndexDescriptor;
use ::redis::aio::MultiplexedConnection;
use ::redis::{ErrorKind, RedisError, Value};

/// Redis store over one multiplexed connection
///
/// The connection is cheap to clone; every call works on its own handle so
/// `&self` methods can be shared by loaders and probes alike.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { conn })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn push_write(pipe: &mut ::redis::Pipeline, write: &Write) -> Result<()> {
    match write {
        Write::Json { key, value } => {
            pipe.cmd("JSON.SET")
                .arg(key)
                .arg("$")
                .arg(serde_json::to_string(value)?)
                .ignore();
        }
        Write::Hash { key, fields, ttl } => {
            pipe.cmd("HSET").arg(key).arg(fields).ignore();
            if let Some(ttl) = ttl {
                pipe.cmd("EXPIRE").arg(key).arg(*ttl).ignore();
            }
        }
    }
    Ok(())
}

/// FT.INFO replies "Unknown index name" (or "no such index" on newer
/// modules) for a missing index.
fn is_unknown_index(err: &RedisError) -> bool {
    if err.kind() != ErrorKind::ResponseError && err.kind() != ErrorKind::ExtensionError {
        return false;
    }
    let message = format!(
        "{} {} {}",
        err.code().unwrap_or_default(),
        err.detail().unwrap_or_default(),
        err
    )
    .to_lowercase()
    .replace([':', '-'], " ")
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ");
    message.contains("unknown index") || message.contains("no such index")
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Double(d) => Some(d.to_string()),
        _ => None,
    }
}

/// Parse the flat key/value `FT.INFO` reply (or a RESP3 map) into [`IndexInfo`]
pub fn parse_index_info(value: &Value) -> Result<IndexInfo> {
    let pairs: Vec<(&Value, &Value)> = match value {
        Value::Array(items) => items.chunks_exact(2).map(|kv| (&kv[0], &kv[1])).collect(),
        Value::Map(entries) => entries.iter().map(|(k, v)| (k, v)).collect(),
        other => {
            return Err(Error::Protocol(format!(
                "FT.INFO returned {:?}, expected array",
                other
            )))
        }
    };

    let mut info = IndexInfo::default();
    for (key, val) in pairs {
        let (Some(key), Some(val)) = (value_as_string(key), value_as_string(val)) else {
            continue;
        };
        match key.as_str() {
            "num_docs" => info.num_docs = val.parse::<f64>().unwrap_or(0.0) as u64,
            "percent_indexed" => info.percent_indexed = val.parse().unwrap_or(0.0),
            "total_index_memory_sz_mb" => {
                info.total_index_memory_sz_mb = val.parse().unwrap_or(0.0)
            }
            _ => {}
        }
    }
    Ok(info)
}

/// First element of an `FT.SEARCH` reply is the total match count
pub fn parse_search_total(value: &Value) -> Result<u64> {
    let total = match value {
        Value::Array(items) => items.first(),
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| value_as_string(k).as_deref() == Some("total_results"))
            .map(|(_, v)| v),
        other => Some(other),
    };

    match total {
        Some(Value::Int(n)) => Ok((*n).max(0) as u64),
        Some(other) => value_as_string(other)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Protocol(format!("FT.SEARCH total is {:?}", other))),
        None => Err(Error::Protocol("FT.SEARCH returned an empty reply".into())),
    }
}

impl Store for RedisStore {
    async fn incr_by(&self, counter: &str, n: u64) -> Result<u64> {
        let mut conn = self.conn();
        let value: u64 = ::redis::cmd("INCRBY")
            .arg(counter)
            .arg(n)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn server_time_ms(&self) -> Result<u64> {
        let mut conn = self.conn();
        let (secs, micros): (u64, u64) = ::redis::cmd("TIME").query_async(&mut conn).await?;
        Ok(secs * 1000 + micros / 1000)
    }

    async fn write(&self, write: Write) -> Result<()> {
        self.write_batch(vec![write]).await
    }

    async fn write_batch(&self, writes: Vec<Write>) -> Result<()> {
        let mut pipe = ::redis::pipe();
        for write in &writes {
            push_write(&mut pipe, write)?;
        }
        let mut conn = self.conn();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn index_info(&self, name: &str) -> Result<Option<IndexInfo>> {
        let mut conn = self.conn();
        let reply: std::result::Result<Value, RedisError> = ::redis::cmd("FT.INFO")
            .arg(name)
            .query_async(&mut conn)
            .await;
        match reply {
            Ok(value) => parse_index_info(&value).map(Some),
            Err(e) if is_unknown_index(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<()> {
        let mut cmd = ::redis::cmd("FT.CREATE");
        for arg in descriptor.create_args() {
            cmd.arg(arg);
        }
        let mut conn = self.conn();
        let reply: std::result::Result<(), RedisError> = cmd.query_async(&mut conn).await;
        reply.map_err(|e| Error::IndexCreate {
            name: descriptor.name.clone(),
            reason: e.to_string(),
        })
    }

    async fn search_total(&self, index: &str, query: &str, offset: u64, count: u64) -> Result<u64> {
        let mut conn = self.conn();
        let reply: Value = ::redis::cmd("FT.SEARCH")
            .arg(index)
            .arg(query)
            .arg("LIMIT")
            .arg(offset)
            .arg(count)
            .query_async(&mut conn)
            .await?;
        parse_search_total(&reply)
    }
}
