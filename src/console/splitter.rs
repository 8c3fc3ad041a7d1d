//! Line splitting over arbitrarily chunked byte streams.

/// Buffers bytes until a `\n` completes a line.
///
/// Lines are returned with their terminator so the caller can forward the
/// exact bytes it received.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and take every line it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos + 1);
            if self.pending.is_empty() {
                lines.push(head.to_vec());
            } else {
                self.pending.extend_from_slice(head);
                lines.push(std::mem::take(&mut self.pending));
            }
            rest = tail;
        }

        self.pending.extend_from_slice(rest);
        lines
    }

    /// Take the unterminated final line, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}
