use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidUtf8,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Chunks(err) => Display::fmt(err, f),
            Error::InvalidUtf8 => write!(f, "event is not valid UTF-8"),
        }
    }
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Comments and fields other than `data` are skipped. Multiple `data`
/// lines of one event are joined with a line feed, and carriage returns
/// are treated as part of the line ending.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            eof: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete events from the buffer before reading more.
            while let Some(block) = self.take_block() {
                if let Some(data) = parse_block(&block)? {
                    return Ok(Some(data));
                }
            }
            if self.eof {
                // A trailing event without its blank line is incomplete.
                return Ok(None);
            }

            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => {
                    self.buf.extend(bytes.iter().filter(|b| **b != b'\r'));
                }
                None => self.eof = true,
            }
        }
    }

    fn take_block(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.windows(2).position(|w| w == b"\n\n")?;
        let block = self.buf[..end].to_vec();
        self.buf.drain(..end + 2);
        Some(block)
    }
}

fn parse_block(block: &[u8]) -> Result<Option<String>, Error> {
    let block = str::from_utf8(block).map_err(|_| Error::InvalidUtf8)?;
    let mut data: Option<String> = None;
    for line in block.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };
        if field != "data" {
            continue;
        }
        match &mut data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_owned()),
        }
    }
    Ok(data)
}
