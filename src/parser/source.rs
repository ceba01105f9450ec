//! Chunked UTF-8 character source over any byte reader

use std::io::{self, Read};

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Buffered character reader with arbitrary lookahead
pub struct CharReader<R> {
    inner: R,
    chunk_size: usize,
    /// Undecoded tail of the last chunk (an incomplete UTF-8 sequence)
    pending: Vec<u8>,
    chars: Vec<char>,
    pos: usize,
    eof: bool,
    started: bool,
}

impl<R: Read> CharReader<R> {
    pub fn new(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(4),
            pending: Vec::new(),
            chars: Vec::new(),
            pos: 0,
            eof: false,
            started: false,
        }
    }

    /// Next character without consuming it
    pub fn peek(&mut self) -> io::Result<Option<char>> {
        self.peek_nth(0)
    }

    /// Character `n` positions ahead without consuming anything
    pub fn peek_nth(&mut self, n: usize) -> io::Result<Option<char>> {
        while self.pos + n >= self.chars.len() && !self.eof {
            self.fill()?;
        }
        Ok(self.chars.get(self.pos + n).copied())
    }

    /// Consume the next character
    pub fn next_char(&mut self) -> io::Result<Option<char>> {
        let c = self.peek()?;
        if c.is_some() {
            self.pos += 1;
        }
        Ok(c)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.pos > 0 && self.pos >= self.chars.len() {
            self.chars.clear();
            self.pos = 0;
        } else if self.pos > self.chunk_size {
            self.chars.drain(..self.pos);
            self.pos = 0;
        }

        let mut buf = vec![0u8; self.chunk_size];
        let read = loop {
            match self.inner.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if read == 0 {
            self.eof = true;
            if !self.pending.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "incomplete UTF-8 sequence at end of input",
                ));
            }
            return Ok(());
        }

        self.pending.extend_from_slice(&buf[..read]);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid UTF-8 sequence: {}", e),
                ))
            }
        };

        let decoded = std::str::from_utf8(&self.pending[..valid])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut chars = decoded.chars();
        if !self.started && !decoded.is_empty() {
            self.started = true;
            let mut peek = chars.clone();
            if peek.next() == Some(BYTE_ORDER_MARK) {
                chars = peek;
            }
        }
        self.chars.extend(chars);
        self.pending.drain(..valid);
        Ok(())
    }
}
