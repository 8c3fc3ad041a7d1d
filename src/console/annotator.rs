//! Streaming classifier for compiler console output.
//!
//! [`ConsoleAnnotator`] sits between the compiler's stdout and two sinks:
//! the raw log, which receives every byte exactly as produced, and the
//! annotation log, which receives one [`Annotation`] per matched pattern.
//! Lines are classified once, in arrival order, after their terminator
//! arrives (or at close for a final unterminated line).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::process::OutputCharset;

use super::note::{Annotation, NoteTag};
use super::patterns::{classify, trim_eol};
use super::splitter::LineSplitter;

/// Size of each read from the compiler's stdout.
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Diagnostic counts of one compiler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub warnings: u64,
    pub errors: u64,
}

/// How reading the output stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The process closed its stdout.
    Eof,
    /// The build was cancelled before the stream ended.
    Cancelled,
}

/// Line classifier writing raw output and annotations to separate sinks.
#[derive(Debug)]
pub struct ConsoleAnnotator<R, A> {
    raw: R,
    notes: A,
    charset: OutputCharset,
    splitter: LineSplitter,
    offset: u64,
    line: u64,
    counts: LineCounts,
}

impl<R, A> ConsoleAnnotator<R, A>
where
    R: AsyncWrite + Unpin,
    A: AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(raw: R, notes: A, charset: OutputCharset) -> Self {
        Self {
            raw,
            notes,
            charset,
            splitter: LineSplitter::new(),
            offset: 0,
            line: 0,
            counts: LineCounts::default(),
        }
    }

    /// Warnings seen so far.
    #[must_use]
    pub fn warning_count(&self) -> u64 {
        self.counts.warnings
    }

    /// Errors seen so far.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.counts.errors
    }

    /// Process a chunk of output.
    ///
    /// # Errors
    ///
    /// Returns an error if either sink fails.
    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        for line in self.splitter.push(chunk) {
            self.eol(&line).await?;
        }
        Ok(())
    }

    async fn eol(&mut self, line: &[u8]) -> std::io::Result<()> {
        let decoded = self.charset.decode(line);
        let classification = classify(trim_eol(&decoded));

        let start = self.offset;
        let end = start + line.len() as u64;

        if classification.error {
            self.counts.errors += 1;
            self.note(NoteTag::ErrorInline, start, end).await?;
        }
        if classification.warning {
            self.counts.warnings += 1;
            self.note(NoteTag::WarningInline, start, end).await?;
        }

        self.raw.write_all(line).await?;
        self.offset = end;
        self.line += 1;
        Ok(())
    }

    async fn note(&mut self, tag: NoteTag, start: u64, end: u64) -> std::io::Result<()> {
        tracing::trace!(tag = tag.css_class(), line = self.line, "Annotated console line");
        let record = Annotation {
            tag,
            line: self.line,
            start,
            end,
        }
        .to_json_line()
        .map_err(std::io::Error::other)?;
        self.notes.write_all(&record).await
    }

    /// Read `stdout` to the end, classifying as bytes arrive.
    ///
    /// Returns early with [`StreamEnd::Cancelled`] once `cancel` fires; the
    /// bytes read so far have been processed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn consume<S>(&mut self, mut stdout: S, cancel: &CancellationToken) -> std::io::Result<StreamEnd>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                read = stdout.read(&mut buf) => read?,
            };
            if n == 0 {
                return Ok(StreamEnd::Eof);
            }
            self.write(&buf[..n]).await?;
        }
    }

    /// Classify the final unterminated line, then flush and close both
    /// sinks.
    ///
    /// # Errors
    ///
    /// Returns an error if either sink fails.
    pub async fn close(mut self) -> std::io::Result<LineCounts> {
        if let Some(tail) = self.splitter.finish() {
            self.eol(&tail).await?;
        }
        self.notes.flush().await?;
        self.notes.shutdown().await?;
        self.raw.flush().await?;
        self.raw.shutdown().await?;
        Ok(self.counts)
    }
}
