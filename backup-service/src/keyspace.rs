//! Redis keyspace access.
//!
//! The exporter only needs four capabilities from a store: enumerate keys,
//! read a key's type, read its type-specific payload and read its TTL.
//! [`KeyspaceSource`] captures those; [`RedisKeyspace`] implements them on
//! a live server.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use common::errors::{AppError, AppResult};
use common::models::DatabaseTarget;

/// Keys fetched per SCAN round trip.
const SCAN_COUNT: usize = 1000;

/// Key types covered by the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    String,
    Hash,
    List,
    Set,
    ZSet,
}

impl KeyKind {
    /// Parses a `TYPE` reply. Anything outside the exported set yields `None`.
    pub fn parse(reply: &str) -> Option<Self> {
        match reply {
            "string" => Some(KeyKind::String),
            "hash" => Some(KeyKind::Hash),
            "list" => Some(KeyKind::List),
            "set" => Some(KeyKind::Set),
            "zset" => Some(KeyKind::ZSet),
            _ => None,
        }
    }
}

/// Type-dependent value of a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    String(Vec<u8>),
    /// Field/value pairs in server order.
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    /// Elements head to tail.
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    /// Member/score pairs, score as the server formats it.
    ZSet(Vec<(Vec<u8>, String)>),
}

impl Payload {
    /// True for a collection without elements. Servers drop empty
    /// collections, so this means the key was deleted after `TYPE`.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Payload::String(_) => false,
            Payload::Hash(pairs) => pairs.is_empty(),
            Payload::List(items) | Payload::Set(items) => items.is_empty(),
            Payload::ZSet(members) => members.is_empty(),
        }
    }
}

/// One key, read just long enough to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEntry {
    pub key: Vec<u8>,
    pub payload: Payload,
    /// Remaining TTL in seconds; -1 without expiry, -2 if the key is gone.
    pub ttl: i64,
}

/// Read access to a keyspace.
#[async_trait]
pub trait KeyspaceSource: Send {
    /// All keys currently in the keyspace, each once, in no particular order.
    async fn keys(&mut self) -> AppResult<Vec<Vec<u8>>>;

    /// Raw `TYPE` reply for `key`.
    async fn key_type(&mut self, key: &[u8]) -> AppResult<String>;

    /// Payload for `key`, or `None` if a string key vanished meanwhile.
    async fn payload(&mut self, key: &[u8], kind: KeyKind) -> AppResult<Option<Payload>>;

    /// Remaining TTL of `key` in seconds.
    async fn ttl(&mut self, key: &[u8]) -> AppResult<i64>;
}

/// Keyspace of a live Redis server.
pub struct RedisKeyspace {
    conn: MultiplexedConnection,
}

impl RedisKeyspace {
    /// Connects to the target, authenticating and selecting the logical
    /// database from its configuration. The server is dialed exactly once.
    pub async fn connect(target: &DatabaseTarget, timeout: Duration) -> AppResult<Self> {
        let info = connection_info(target)?;
        let client =
            redis::Client::open(info).map_err(|e| AppError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                AppError::Connection(format!(
                    "timed out after {}s connecting to {}:{}",
                    timeout.as_secs(),
                    target.host,
                    target.port()
                ))
            })?
            .map_err(|e| AppError::Connection(e.to_string()))?;

        tracing::debug!(host = %target.host, port = target.port(), "redis connected");
        Ok(Self { conn })
    }

    async fn query<T: redis::FromRedisValue>(&mut self, cmd: &redis::Cmd) -> AppResult<T> {
        cmd.query_async(&mut self.conn)
            .await
            .map_err(|e| AppError::Export(e.to_string()))
    }
}

#[async_trait]
impl KeyspaceSource for RedisKeyspace {
    async fn keys(&mut self) -> AppResult<Vec<Vec<u8>>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<Vec<u8>>) = self
                .query(redis::cmd("SCAN").arg(cursor).arg("COUNT").arg(SCAN_COUNT))
                .await?;
            for key in batch {
                // SCAN may report a key more than once
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }

    async fn key_type(&mut self, key: &[u8]) -> AppResult<String> {
        self.query(redis::cmd("TYPE").arg(key)).await
    }

    async fn payload(&mut self, key: &[u8], kind: KeyKind) -> AppResult<Option<Payload>> {
        let payload = match kind {
            KeyKind::String => {
                let value: Option<Vec<u8>> = self.query(redis::cmd("GET").arg(key)).await?;
                match value {
                    Some(value) => Payload::String(value),
                    None => return Ok(None),
                }
            }
            KeyKind::Hash => Payload::Hash(self.query(redis::cmd("HGETALL").arg(key)).await?),
            KeyKind::List => {
                Payload::List(self.query(redis::cmd("LRANGE").arg(key).arg(0).arg(-1)).await?)
            }
            KeyKind::Set => Payload::Set(self.query(redis::cmd("SMEMBERS").arg(key)).await?),
            KeyKind::ZSet => Payload::ZSet(
                self.query(
                    redis::cmd("ZRANGE")
                        .arg(key)
                        .arg(0)
                        .arg(-1)
                        .arg("WITHSCORES"),
                )
                .await?,
            ),
        };
        Ok(Some(payload))
    }

    async fn ttl(&mut self, key: &[u8]) -> AppResult<i64> {
        self.query(redis::cmd("TTL").arg(key)).await
    }
}

/// Builds connection parameters for a Redis target.
pub fn connection_info(target: &DatabaseTarget) -> AppResult<ConnectionInfo> {
    let db = match target.database.trim() {
        "" => 0,
        index => index.parse::<i64>().map_err(|_| {
            AppError::Connection(format!("invalid redis database index: {}", index))
        })?,
    };

    let addr = if target.enable_ssl {
        ConnectionAddr::TcpTls {
            host: target.host.clone(),
            port: target.port(),
            insecure: false,
            tls_params: None,
        }
    } else {
        ConnectionAddr::Tcp(target.host.clone(), target.port())
    };

    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    let password = non_empty(&target.password);
    // ACL user only makes sense alongside a password
    let username = password.as_ref().and_then(|_| non_empty(&target.username));

    Ok(ConnectionInfo {
        addr,
        redis: RedisConnectionInfo {
            db,
            username,
            password,
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    use super::*;
    use crate::exporter::export;
    use crate::resp::tests::{parse_frame, parse_stream};
    use common::models::DbType;

    type CommandLog = Arc<Mutex<Vec<Vec<Vec<u8>>>>>;

    /// Serves a single connection, answering every command with `reply`
    /// and recording what the client sent.
    async fn spawn_resp_server(reply: fn(&[Vec<u8>]) -> Vec<u8>) -> (SocketAddr, CommandLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = CommandLog::default();
        let seen = log.clone();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                buf.extend_from_slice(&chunk[..n]);
                while let Some((command, used)) = parse_frame(&buf) {
                    buf.drain(..used);
                    let out = reply(&command);
                    seen.lock().unwrap().push(command);
                    if socket.write_all(&out).await.is_err() {
                        return;
                    }
                }
            }
        });
        (addr, log)
    }

    fn bulk(data: &[u8]) -> Vec<u8> {
        let mut out = format!("${}\r\n", data.len()).into_bytes();
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn array(items: &[&[u8]]) -> Vec<u8> {
        let mut out = format!("*{}\r\n", items.len()).into_bytes();
        for item in items {
            out.extend(bulk(item));
        }
        out
    }

    fn scan_page(cursor: &[u8], keys: &[&[u8]]) -> Vec<u8> {
        let mut out = b"*2\r\n".to_vec();
        out.extend(bulk(cursor));
        out.extend(array(keys));
        out
    }

    /// Two SCAN pages repeating `s`; `g` reports a type but is gone by GET.
    fn keyspace_reply(command: &[Vec<u8>]) -> Vec<u8> {
        let name = String::from_utf8_lossy(&command[0]).to_ascii_uppercase();
        let key = command.get(1).map(|k| k.as_slice()).unwrap_or_default();
        match (name.as_str(), key) {
            ("SCAN", b"0") => scan_page(b"17", &[b"s", b"h"]),
            ("SCAN", _) => scan_page(b"0", &[b"z", b"s", b"g"]),
            ("TYPE", b"s") | ("TYPE", b"g") => b"+string\r\n".to_vec(),
            ("TYPE", b"h") => b"+hash\r\n".to_vec(),
            ("TYPE", b"z") => b"+zset\r\n".to_vec(),
            ("TTL", b"s") => b":60\r\n".to_vec(),
            ("TTL", b"g") => b":-2\r\n".to_vec(),
            ("TTL", _) => b":-1\r\n".to_vec(),
            ("GET", b"s") => bulk(b"v"),
            ("GET", _) => b"$-1\r\n".to_vec(),
            ("HGETALL", _) => array(&[b"f1", b"v1", b"f2", b""]),
            ("ZRANGE", _) => array(&[b"m1", b"1.5", b"m2", b"2"]),
            _ => b"+OK\r\n".to_vec(),
        }
    }

    fn local_target(addr: SocketAddr, username: &str, password: &str, database: &str) -> DatabaseTarget {
        DatabaseTarget {
            engine: DbType::Redis,
            host: addr.ip().to_string(),
            port: Some(addr.port()),
            username: username.into(),
            password: password.into(),
            database: database.into(),
            alias: None,
            enable_ssl: false,
        }
    }

    fn strings(items: &[&[u8]]) -> Vec<Vec<u8>> {
        items.iter().map(|i| i.to_vec()).collect()
    }

    fn redis_target(database: &str, password: &str) -> DatabaseTarget {
        DatabaseTarget {
            engine: DbType::Redis,
            host: "cache.internal".into(),
            port: None,
            username: "backup".into(),
            password: password.into(),
            database: database.into(),
            alias: None,
            enable_ssl: false,
        }
    }

    #[test]
    fn test_key_kind_parse() {
        assert_eq!(KeyKind::parse("string"), Some(KeyKind::String));
        assert_eq!(KeyKind::parse("zset"), Some(KeyKind::ZSet));
        assert_eq!(KeyKind::parse("stream"), None);
        assert_eq!(KeyKind::parse("none"), None);
    }

    #[test]
    fn test_connection_info_selects_database_and_auth() {
        let info = connection_info(&redis_target("3", "s3cret")).unwrap();
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
        assert_eq!(info.redis.username.as_deref(), Some("backup"));
        assert!(matches!(
            info.addr,
            ConnectionAddr::Tcp(ref host, 6379) if host == "cache.internal"
        ));
    }

    #[test]
    fn test_connection_info_without_password_or_database() {
        let info = connection_info(&redis_target("", "")).unwrap();
        assert_eq!(info.redis.db, 0);
        assert!(info.redis.password.is_none());
        assert!(info.redis.username.is_none());
    }

    #[test]
    fn test_connection_info_uses_tls_when_enabled() {
        let mut target = redis_target("0", "");
        target.enable_ssl = true;
        let info = connection_info(&target).unwrap();
        assert!(matches!(info.addr, ConnectionAddr::TcpTls { port: 6379, .. }));
    }

    #[test]
    fn test_invalid_database_index_is_connection_error() {
        let err = connection_info(&redis_target("sessions", "")).unwrap_err();
        assert!(matches!(err, AppError::Connection(_)));
    }

    #[tokio::test]
    async fn test_live_keyspace_export() {
        let (addr, log) = spawn_resp_server(keyspace_reply).await;
        let target = local_target(addr, "u", "pw", "3");
        let mut keyspace = RedisKeyspace::connect(&target, Duration::from_secs(5))
            .await
            .unwrap();

        let (stream, stats) = export(&mut keyspace).await.unwrap();
        assert_eq!(
            parse_stream(&stream),
            vec![
                strings(&[b"SET", b"s", b"v"]),
                strings(&[b"EXPIRE", b"s", b"60"]),
                strings(&[b"HMSET", b"h", b"f1", b"v1", b"f2", b""]),
                strings(&[b"ZADD", b"z", b"1.5", b"m1"]),
                strings(&[b"ZADD", b"z", b"2", b"m2"]),
            ]
        );
        assert_eq!(stats.exported, 3);
        assert_eq!(stats.skipped, 1);

        let commands = log.lock().unwrap().clone();
        let position = |args: &[&[u8]]| commands.iter().position(|c| c.as_slice() == strings(args).as_slice());
        let auth = position(&[b"AUTH", b"u", b"pw"]).expect("AUTH sent");
        let select = position(&[b"SELECT", b"3"]).expect("SELECT sent");
        let scans: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter(|(_, c)| c[0] == b"SCAN")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(scans.len(), 2);
        assert!(auth < scans[0] && select < scans[0]);
        assert_eq!(commands[scans[1]][1], b"17");
    }

    #[tokio::test]
    async fn test_connect_failure_dials_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });

        let started = Instant::now();
        let result =
            RedisKeyspace::connect(&local_target(addr, "", "pw", "0"), Duration::from_secs(30)).await;
        assert!(matches!(result, Err(AppError::Connection(_))));
        assert!(started.elapsed() < Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(accepts.load(Ordering::SeqCst), 1);
    }
}
