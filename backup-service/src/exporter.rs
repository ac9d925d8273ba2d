//! Keyspace exporter.
//!
//! Walks a keyspace and turns every supported key into replayable RESP
//! commands. The resulting stream can be piped back into a server with
//! `redis-cli --pipe`.
//!
//! Lists are written as one `LPUSH` per element in head-to-tail order, so a
//! replay restores them reversed.

use bytes::{Bytes, BytesMut};

use crate::keyspace::{KeyEntry, KeyKind, KeyspaceSource, Payload};
use crate::resp::{encode, CommandFrame};
use common::errors::AppResult;

/// Counters collected while exporting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    /// Keys written to the stream.
    pub exported: usize,
    /// Keys of an unsupported type, or gone before they could be read.
    pub skipped: usize,
    /// Frames written, including `EXPIRE`.
    pub frames: usize,
}

/// Exports the whole keyspace into one command stream.
///
/// Any failure talking to the source aborts the export; nothing partial is
/// returned.
pub async fn export<S>(source: &mut S) -> AppResult<(Bytes, ExportStats)>
where
    S: KeyspaceSource + ?Sized,
{
    let mut buf = BytesMut::new();
    let mut stats = ExportStats::default();

    let keys = source.keys().await?;
    tracing::debug!(keys = keys.len(), "keyspace enumerated");

    for key in keys {
        let reply = source.key_type(&key).await?;
        let Some(kind) = KeyKind::parse(&reply) else {
            tracing::debug!(key = %String::from_utf8_lossy(&key), key_type = %reply, "skipping key");
            stats.skipped += 1;
            continue;
        };

        let ttl = source.ttl(&key).await?;
        let payload = source.payload(&key, kind).await?;
        let Some(payload) = payload.filter(|p| !p.is_empty_collection()) else {
            tracing::debug!(key = %String::from_utf8_lossy(&key), "key vanished during export");
            stats.skipped += 1;
            continue;
        };

        let entry = KeyEntry { key, payload, ttl };
        for frame in entry_frames(&entry) {
            buf.extend_from_slice(frame.as_bytes());
            stats.frames += 1;
        }
        stats.exported += 1;
    }

    Ok((buf.freeze(), stats))
}

/// Builds the frames restoring `entry`: data frames first, then `EXPIRE`
/// when the key has a positive TTL.
pub fn entry_frames(entry: &KeyEntry) -> Vec<CommandFrame> {
    let key = entry.key.as_slice();
    let mut frames = Vec::new();

    match &entry.payload {
        Payload::String(value) => frames.push(encode("SET", &[key, value])),
        Payload::Hash(pairs) if !pairs.is_empty() => {
            let mut args: Vec<&[u8]> = Vec::with_capacity(pairs.len() * 2 + 1);
            args.push(key);
            for (field, value) in pairs {
                args.push(field);
                args.push(value);
            }
            frames.push(encode("HMSET", &args));
        }
        Payload::Hash(_) => {}
        Payload::List(elements) => {
            frames.extend(elements.iter().map(|e| encode("LPUSH", &[key, e])));
        }
        Payload::Set(members) => {
            frames.extend(members.iter().map(|m| encode("SADD", &[key, m])));
        }
        Payload::ZSet(members) => {
            frames.extend(
                members
                    .iter()
                    .map(|(member, score)| encode("ZADD", &[key, score.as_bytes(), member])),
            );
        }
    }

    if entry.ttl > 0 {
        frames.push(encode("EXPIRE", &[key, entry.ttl.to_string().as_bytes()]));
    }

    frames
}
