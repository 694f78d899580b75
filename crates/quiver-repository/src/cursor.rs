//! One-slot lookahead over an ordered stream.

use crate::error::Result;
use futures::{Stream, StreamExt};

/// Wraps a single-pass stream so its head can be inspected without being
/// consumed.
///
/// The peeked value is memoized: repeated [`try_peek`](Self::try_peek) calls
/// cost nothing until [`advance`](Self::advance) clears the slot. Once the
/// stream ends the cursor stays exhausted. Not synchronized; the owner polls
/// it from one place at a time.
#[derive(Debug)]
pub struct LookaheadCursor<S, T> {
    stream: S,
    peeked: Option<T>,
    exhausted: bool,
}

impl<S, T> LookaheadCursor<S, T>
where
    S: Stream<Item = Result<T>> + Unpin,
{
    /// Wrap a stream.
    pub const fn new(stream: S) -> Self {
        Self {
            stream,
            peeked: None,
            exhausted: false,
        }
    }

    /// Make sure the head is loaded. Returns `false` once the stream is done.
    ///
    /// # Errors
    /// Propagates the stream's error; the slot stays empty so a later call
    /// polls the stream again.
    pub async fn try_peek(&mut self) -> Result<bool> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }
        match self.stream.next().await {
            Some(Ok(item)) => {
                self.peeked = Some(item);
                Ok(true)
            }
            Some(Err(err)) => Err(err),
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// The memoized head, if loaded.
    pub const fn peek(&self) -> Option<&T> {
        self.peeked.as_ref()
    }

    /// Consume the memoized head.
    pub fn advance(&mut self) -> Option<T> {
        self.peeked.take()
    }

    /// Whether the underlying stream has ended and the slot is empty.
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted && self.peeked.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use futures::stream;

    #[tokio::test]
    async fn peek_is_memoized_until_advance() {
        let mut cursor = LookaheadCursor::new(stream::iter(vec![Ok(1), Ok(2)]));

        assert!(cursor.try_peek().await.unwrap());
        assert!(cursor.try_peek().await.unwrap());
        assert_eq!(cursor.peek(), Some(&1));

        assert_eq!(cursor.advance(), Some(1));
        assert_eq!(cursor.peek(), None);

        assert!(cursor.try_peek().await.unwrap());
        assert_eq!(cursor.advance(), Some(2));

        assert!(!cursor.try_peek().await.unwrap());
        assert!(cursor.is_exhausted());
        assert!(!cursor.try_peek().await.unwrap());
    }

    #[tokio::test]
    async fn errors_surface_from_peek() {
        let items: Vec<Result<u32>> = vec![Err(RepositoryError::source_failed("s", "boom"))];
        let mut cursor = LookaheadCursor::new(stream::iter(items));
        assert!(cursor.try_peek().await.is_err());
        assert_eq!(cursor.peek(), None);
    }
}
