// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Line source over any async buffered reader (stdin, files, sockets)
//!
//! Radio gateways occasionally emit garbage bytes. Lines are decoded lossily
//! so bad frames reach the decoder and are rejected there, instead of ending
//! the transport.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split, Stdin};

use super::LineSource;
use crate::error::{Error, Result};

/// Line transport over any buffered async reader
pub struct ReaderSource<R> {
    name: String,
    segments: Split<R>,
}

impl<R> ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Wrap `reader`; `name` shows up in logs
    pub fn new(name: &str, reader: R) -> Self {
        Self {
            name: name.to_string(),
            segments: reader.split(b'\n'),
        }
    }
}

impl ReaderSource<BufReader<Stdin>> {
    /// Frames piped on standard input
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> LineSource for ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let segment = self
            .segments
            .next_segment()
            .await
            .map_err(|e| Error::TransportUnavailable(format!("{}: {}", self.name, e)))?;

        Ok(segment.map(|bytes| {
            let line = String::from_utf8_lossy(&bytes);
            line.strip_suffix('\r').unwrap_or(&line).to_string()
        }))
    }
}
