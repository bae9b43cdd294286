//  Copyright 2024 Warren Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! A minimal RESP-shaped wire codec: requests are arrays of bulk strings,
//! replies are the handful of RESP reply types `warren::Reply` needs.
//! Enough to drive `redis-cli`-style manual testing against the command
//! surface; not a complete implementation of the real protocol (no inline
//! commands, no RESP3, no pipelining beyond what TCP gives for free).

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use warren::Reply;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    Closed,
    #[error("protocol error: {0}")]
    Malformed(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<String, ProtocolError> {
    use tokio::io::AsyncBufReadExt;
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(ProtocolError::Closed);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Read one request: `*<n>\r\n` followed by `n` bulk strings
/// (`$<len>\r\n<data>\r\n`).
pub async fn read_command(reader: &mut BufReader<OwnedReadHalf>) -> Result<Vec<Bytes>, ProtocolError> {
    let header = read_line(reader).await?;
    let count: usize = header
        .strip_prefix('*')
        .and_then(|n| n.parse().ok())
        .ok_or(ProtocolError::Malformed("expected an array header"))?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let bulk_header = read_line(reader).await?;
        let len: usize = bulk_header
            .strip_prefix('$')
            .and_then(|n| n.parse().ok())
            .ok_or(ProtocolError::Malformed("expected a bulk string header"))?;
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(Bytes::from(buf));
    }
    Ok(args)
}

pub async fn write_reply(writer: &mut OwnedWriteHalf, reply: &Reply) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::new();
    encode(reply, &mut buf);
    writer.write_all(&buf).await
}

pub async fn write_error(writer: &mut OwnedWriteHalf, message: &str) -> Result<(), std::io::Error> {
    let sanitized = message.replace(['\r', '\n'], " ");
    writer.write_all(format!("-ERR {sanitized}\r\n").as_bytes()).await
}

fn encode(reply: &Reply, buf: &mut BytesMut) {
    match reply {
        Reply::Ok => buf.extend_from_slice(b"+OK\r\n"),
        Reply::Int(i) => {
            buf.extend_from_slice(b":");
            buf.extend_from_slice(i.to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        Reply::Bulk(None) => buf.extend_from_slice(b"$-1\r\n"),
        Reply::Bulk(Some(b)) => {
            buf.extend_from_slice(b"$");
            buf.extend_from_slice(b.len().to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
            buf.extend_from_slice(b);
            buf.extend_from_slice(b"\r\n");
        }
        Reply::Multi(items) => {
            buf.extend_from_slice(b"*");
            buf.extend_from_slice(items.len().to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
            for item in items {
                encode(item, buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn loopback_pair() -> (BufReader<OwnedReadHalf>, OwnedWriteHalf, OwnedWriteHalf, BufReader<OwnedReadHalf>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let (sr, sw) = server.into_split();
        let (cr, cw) = client.into_split();
        (BufReader::new(sr), sw, cw, BufReader::new(cr))
    }

    #[tokio::test]
    async fn round_trips_a_command_and_a_reply() {
        let (mut server_read, mut server_write, mut client_write, mut client_read) = loopback_pair().await;

        client_write.write_all(b"*2\r\n$4\r\nLLEN\r\n$1\r\nk\r\n").await.unwrap();
        let args = read_command(&mut server_read).await.unwrap();
        assert_eq!(args, vec![Bytes::from_static(b"LLEN"), Bytes::from_static(b"k")]);

        write_reply(&mut server_write, &Reply::Int(0)).await.unwrap();
        let mut buf = [0u8; 64];
        let n = tokio::io::AsyncReadExt::read(&mut client_read, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b":0\r\n");
    }

    #[tokio::test]
    async fn rejects_a_non_array_header() {
        let (mut server_read, _server_write, mut client_write, _client_read) = loopback_pair().await;
        client_write.write_all(b"PING\r\n").await.unwrap();
        let err = read_command(&mut server_read).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
