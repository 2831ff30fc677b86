//! # Message Framing
//!
//! One message is one node encoded as compact text and terminated by a
//! newline. The text encoding escapes newlines inside strings, so the
//! terminator can never appear within a message.
//!
//! ## Invariants
//! - **Bounded Reads**: a reader never buffers more than `limit + 1` bytes for
//!   one message; anything longer fails with `MessageTooLarge`.
//! - **Clean EOF**: end of stream before the first byte of a message is `None`,
//!   not an error. End of stream inside a message is an error.

use std::io::BufRead;
use std::io::Read;
use std::io::Write;

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use treerpc::Error;
use treerpc::Node;
use treerpc::Result;
use treerpc::node;

pub const TERMINATOR: u8 = b'\n';

/// Encodes a node as one terminated message.
pub fn encode(node: &Node) -> Result<Vec<u8>> {
    let mut bytes = node::to_text(node)?.into_bytes();
    bytes.push(TERMINATOR);
    Ok(bytes)
}

/// Splits a raw line read with a `limit + 1` cap into a decoded node.
fn decode_line(mut line: Vec<u8>, limit: usize) -> Result<Option<Node>> {
    if line.is_empty() {
        return Ok(None);
    }

    if line.last() != Some(&TERMINATOR) {
        if line.len() > limit {
            return Err(Error::MessageTooLarge {
                limit,
                size: line.len(),
            });
        }
        return Err(Error::Transport(format!(
            "stream ended inside a message after {} bytes",
            line.len()
        )));
    }

    line.pop();
    node::from_bytes(&line).map(Some)
}

pub fn write_message<W: Write>(writer: &mut W, node: &Node) -> Result<()> {
    writer.write_all(&encode(node)?)?;
    writer.flush()?;
    Ok(())
}

/// Reads one message, or `None` if the stream ended cleanly.
pub fn read_message<R: BufRead>(reader: &mut R, limit: usize) -> Result<Option<Node>> {
    let mut line = Vec::new();
    Read::take(&mut *reader, (limit as u64).saturating_add(1)).read_until(TERMINATOR, &mut line)?;
    decode_line(line, limit)
}

pub async fn write_message_async<W>(writer: &mut W, node: &Node) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(node)?).await?;
    writer.flush().await?;
    Ok(())
}

/// Async twin of [`read_message`], for the server loop.
pub async fn read_message_async<R>(reader: &mut R, limit: usize) -> Result<Option<Node>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    AsyncReadExt::take(&mut *reader, (limit as u64).saturating_add(1))
        .read_until(TERMINATOR, &mut line)
        .await?;
    decode_line(line, limit)
}
