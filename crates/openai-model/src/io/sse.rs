use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
pub struct Sse {
    buf: String,
    // Trailing bytes of a UTF-8 sequence split across two chunks.
    undecoded: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            undecoded: Vec::new(),
            chunks,
        }
    }

    /// Returns the data of the next event, or `None` when the stream ends.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Events that are already buffered go out before reading more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                if !self.undecoded.is_empty() {
                    return Err(Error::InvalidPayload);
                }
                return Ok(None);
            };
            self.push_bytes(&bytes)?;
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.undecoded.extend_from_slice(bytes);
        let valid_up_to = match str::from_utf8(&self.undecoded) {
            Ok(s) => s.len(),
            // An incomplete sequence at the end, wait for the next chunk.
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => return Err(Error::InvalidPayload),
        };
        let text = str::from_utf8(&self.undecoded[..valid_up_to])
            .map_err(|_| Error::InvalidPayload)?;
        // Only line feeds are treated as line endings.
        self.buf.extend(text.chars().filter(|c| *c != '\r'));
        self.undecoded.drain(..valid_up_to);
        Ok(())
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        loop {
            let Some(eol_idx) = self.buf.find("\n\n") else {
                return Ok(None);
            };
            let block: String = self.buf.drain(..eol_idx + 2).collect();

            let mut data: Option<String> = None;
            for line in block[..eol_idx].split('\n') {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                // A line without a colon is a field with an empty value.
                let (field, value) = line.split_once(':').unwrap_or((line, ""));
                if field != "data" {
                    // `event`, `id` and `retry` carry nothing we use.
                    continue;
                }
                let value = value.strip_prefix(' ').unwrap_or(value);
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            // Comment-only blocks (keep-alives) produce no event.
            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
    }
}
