//! Framing codec for the sandbox wire protocol.
//!
//! Messages cross the pipe as `Content-Length: N\r\n\r\n{json}`. The reader
//! returns raw JSON values; mapping them onto protocol types (and dropping
//! frames that don't fit) is the surface's job.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Frame size cap. Rendered SVG documents are the largest payload; anything
/// past this is a runaway sandbox, not a diagram.
const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Reads protocol frames from an async reader.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Read the next frame.
    ///
    /// `Ok(None)` means the peer closed the pipe between frames (clean
    /// shutdown). EOF inside a frame, malformed headers, and oversized
    /// bodies are errors.
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>> {
        let Some(body_len) = self.read_content_length().await? else {
            return Ok(None);
        };

        if body_len > MAX_FRAME_BYTES {
            bail!("frame of {body_len} bytes exceeds cap of {MAX_FRAME_BYTES}");
        }

        let mut body = vec![0u8; body_len];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading frame body")?;

        serde_json::from_slice(&body)
            .context("parsing frame body as JSON")
            .map(Some)
    }

    /// Consume the header block and return the announced body length.
    ///
    /// `Ok(None)` only on EOF before any header byte. The sandbox protocol
    /// defines a single header; others are tolerated and skipped.
    async fn read_content_length(&mut self) -> Result<Option<usize>> {
        let mut content_length = None;
        let mut started = false;

        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("reading frame header")?;
            if n == 0 {
                if started {
                    bail!("unexpected EOF inside frame headers");
                }
                return Ok(None);
            }
            started = true;

            let header = self.line.trim();
            if header.is_empty() {
                break;
            }
            if let Some(value) = header
                .split_once(':')
                .filter(|(key, _)| key.eq_ignore_ascii_case("Content-Length"))
                .map(|(_, value)| value)
            {
                content_length =
                    Some(value.trim().parse().context("invalid Content-Length")?);
            }
        }

        match content_length {
            Some(len) => Ok(Some(len)),
            None => bail!("frame headers carried no Content-Length"),
        }
    }
}

/// Writes protocol frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `msg` and write it as one frame.
    pub async fn write_frame<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing frame body")?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing frame header")?;
        self.writer
            .write_all(&body)
            .await
            .context("writing frame body")?;
        self.writer.flush().await.context("flushing frame")?;

        Ok(())
    }
}
