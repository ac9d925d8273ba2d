//! RESP command encoder.
//!
//! Encodes a command as an array of bulk strings. Arguments are written
//! verbatim behind their byte length, so any byte sequence (including
//! `\r\n`) survives a replay unchanged.

use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// A complete, binary-safe encoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame(Bytes);

impl CommandFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encodes `command` and its arguments into a standalone frame.
pub fn encode(command: &str, args: &[&[u8]]) -> CommandFrame {
    let mut buf = BytesMut::with_capacity(frame_len(command, args));
    encode_into(&mut buf, command, args);
    CommandFrame(buf.freeze())
}

fn encode_into(buf: &mut BytesMut, command: &str, args: &[&[u8]]) {
    put_header(buf, b'*', args.len() + 1);
    put_bulk(buf, command.as_bytes());
    for arg in args {
        put_bulk(buf, arg);
    }
}

fn put_header(buf: &mut BytesMut, prefix: u8, len: usize) {
    buf.put_u8(prefix);
    buf.put_slice(len.to_string().as_bytes());
    buf.put_slice(CRLF);
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    put_header(buf, b'$', data.len());
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

/// Exact encoded size, used to size the buffer up front.
fn frame_len(command: &str, args: &[&[u8]]) -> usize {
    fn digits(mut n: usize) -> usize {
        let mut d = 1;
        while n >= 10 {
            n /= 10;
            d += 1;
        }
        d
    }
    let bulk = |len: usize| 1 + digits(len) + 2 + len + 2;

    1 + digits(args.len() + 1)
        + 2
        + bulk(command.len())
        + args.iter().map(|a| bulk(a.len())).sum::<usize>()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Parses one array-of-bulk-strings frame, returning its items and the
    /// number of bytes consumed.
    pub(crate) fn parse_frame(input: &[u8]) -> Option<(Vec<Vec<u8>>, usize)> {
        fn read_line(input: &[u8], pos: usize, prefix: u8) -> Option<(usize, usize)> {
            if *input.get(pos)? != prefix {
                return None;
            }
            let end = input[pos..].windows(2).position(|w| w == CRLF)? + pos;
            let n = std::str::from_utf8(&input[pos + 1..end]).ok()?.parse().ok()?;
            Some((n, end + 2))
        }

        let (count, mut pos) = read_line(input, 0, b'*')?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let (len, start) = read_line(input, pos, b'$')?;
            let end = start + len;
            if input.get(end..end + 2)? != CRLF {
                return None;
            }
            items.push(input[start..end].to_vec());
            pos = end + 2;
        }
        Some((items, pos))
    }

    /// Splits a concatenated stream into frames.
    pub(crate) fn parse_stream(mut input: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let mut frames = Vec::new();
        while !input.is_empty() {
            let (items, used) = parse_frame(input).expect("well-formed frame");
            frames.push(items);
            input = &input[used..];
        }
        frames
    }

    #[test]
    fn test_encode_set() {
        let frame = encode("SET", &[b"a", b"1"]);
        assert_eq!(frame.as_bytes(), b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n");
    }

    #[test]
    fn test_empty_argument_is_framed() {
        let frame = encode("SET", &[b"k", b""]);
        assert_eq!(frame.as_bytes(), b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$0\r\n\r\n");
    }

    #[test]
    fn test_binary_arguments_are_not_escaped() {
        let key: &[u8] = b"bin\r\nkey";
        let value: &[u8] = &[0x00, 0xff, b'\r', b'\n', b'$', b'*'];
        let frame = encode("SET", &[key, value]);

        let (items, used) = parse_frame(frame.as_bytes()).unwrap();
        assert_eq!(used, frame.as_bytes().len());
        assert_eq!(items, vec![b"SET".to_vec(), key.to_vec(), value.to_vec()]);
    }

    #[test]
    fn test_round_trip_recovers_command_and_arguments() {
        let args: [&[u8]; 5] = [b"h", b"field", b"", b"v\r\n2", "ключ".as_bytes()];
        let frame = encode("HMSET", &args);
        let (items, _) = parse_frame(frame.as_bytes()).unwrap();

        assert_eq!(items[0], b"HMSET");
        assert_eq!(items.len(), args.len() + 1);
        for (parsed, original) in items[1..].iter().zip(&args) {
            assert_eq!(parsed.as_slice(), *original);
        }
    }

    #[test]
    fn test_frame_len_matches_output() {
        let long = vec![b'x'; 1234];
        let args: [&[u8]; 3] = [b"", b"abc", &long];
        let frame = encode("LPUSH", &args);
        assert_eq!(frame.as_bytes().len(), frame_len("LPUSH", &args));
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = BytesMut::new();
        encode_into(&mut buf, "SADD", &[b"s", b"m1"]);
        encode_into(&mut buf, "EXPIRE", &[b"s", b"60"]);
        let frames = parse_stream(&buf);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], vec![b"EXPIRE".to_vec(), b"s".to_vec(), b"60".to_vec()]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_encode_parse_roundtrip(
                args in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..16)
            ) {
                let refs: Vec<&[u8]> = args.iter().map(|a| a.as_slice()).collect();
                let frame = encode("CMD", &refs);
                prop_assert_eq!(frame.as_bytes().len(), frame_len("CMD", &refs));

                let (items, used) = parse_frame(frame.as_bytes()).unwrap();
                prop_assert_eq!(used, frame.as_bytes().len());
                prop_assert_eq!(items[0].as_slice(), &b"CMD"[..]);
                prop_assert_eq!(&items[1..], &args[..]);
            }
        }
    }
}
