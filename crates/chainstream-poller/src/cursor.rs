//! Blocks dedup cursor.

/// The highest block number the Blocks job has published.
///
/// A block is new only if its number is strictly greater, so a height is
/// never published twice and published heights only increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCursor {
    last_published: Option<u64>,
}

impl BlockCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_published(&self) -> Option<u64> {
        self.last_published
    }

    /// Returns `true` if `number` has not been published yet.
    pub fn is_new(&self, number: u64) -> bool {
        self.last_published.map_or(true, |last| number > last)
    }

    /// Record `number` as published.
    pub fn advance(&mut self, number: u64) {
        debug_assert!(self.is_new(number));
        self.last_published = Some(number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cursor_accepts_any_height() {
        let cursor = BlockCursor::new();
        assert!(cursor.is_new(0));
        assert!(cursor.is_new(100));
    }

    #[test]
    fn only_strictly_greater_heights_are_new() {
        let mut cursor = BlockCursor::new();
        cursor.advance(100);
        assert!(!cursor.is_new(99));
        assert!(!cursor.is_new(100));
        assert!(cursor.is_new(101));
        assert_eq!(cursor.last_published(), Some(100));
    }
}
