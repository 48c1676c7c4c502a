//! The byte-oriented input `LineParser` pulls from.

/// A non-blocking byte source. `available` reports whether a call to
/// `read` would return something right now; implementations must never
/// block waiting for more bytes to arrive.
pub trait CharacterStream {
    /// True if at least one byte can be read without blocking.
    fn available(&mut self) -> bool;

    /// Consume and return the next byte, or `None` if none is ready.
    fn read(&mut self) -> Option<u8>;

    /// Look at the next byte without consuming it.
    fn peek(&mut self) -> Option<u8>;
}

#[cfg(feature = "std")]
pub mod std_impl {
    use super::CharacterStream;
    use std::io::Read;

    /// Adapts any blocking `std::io::Read` (a file, stdin) into a
    /// `CharacterStream` by eagerly buffering one byte of lookahead.
    pub struct ReaderStream<R: Read> {
        inner: R,
        lookahead: Option<u8>,
        eof: bool,
    }

    impl<R: Read> ReaderStream<R> {
        pub fn new(inner: R) -> Self {
            ReaderStream {
                inner,
                lookahead: None,
                eof: false,
            }
        }

        fn fill(&mut self) {
            if self.lookahead.is_none() && !self.eof {
                let mut buf = [0u8; 1];
                match self.inner.read(&mut buf) {
                    Ok(1) => self.lookahead = Some(buf[0]),
                    _ => self.eof = true,
                }
            }
        }
    }

    impl<R: Read> CharacterStream for ReaderStream<R> {
        fn available(&mut self) -> bool {
            self.fill();
            self.lookahead.is_some()
        }

        fn read(&mut self) -> Option<u8> {
            self.fill();
            self.lookahead.take()
        }

        fn peek(&mut self) -> Option<u8> {
            self.fill();
            self.lookahead
        }
    }

    /// A finished in-memory G-code buffer, for tests and `Batch` processing.
    pub type SliceStream<'a> = ReaderStream<std::io::Cursor<&'a [u8]>>;

    /// The CLI's `Run` subcommand reading G-code from standard input.
    pub type StdinStream = ReaderStream<std::io::Stdin>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> CharacterStream for Fixed<'a> {
        fn available(&mut self) -> bool {
            self.pos < self.data.len()
        }
        fn read(&mut self) -> Option<u8> {
            let b = self.peek();
            if b.is_some() {
                self.pos += 1;
            }
            b
        }
        fn peek(&mut self) -> Option<u8> {
            self.data.get(self.pos).copied()
        }
    }

    #[test]
    fn peek_does_not_consume() {
        let mut s = Fixed { data: b"ab", pos: 0 };
        assert_eq!(s.peek(), Some(b'a'));
        assert_eq!(s.peek(), Some(b'a'));
        assert_eq!(s.read(), Some(b'a'));
        assert_eq!(s.read(), Some(b'b'));
        assert!(!s.available());
    }
}
