use serde::Serialize;

/// A source section attached to a node: file ID + byte offset range.
///
/// Spans are pure metadata. The engine never reads them while executing;
/// it carries them across rewrites and hands them to diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub file_id: u16,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    pub fn dummy() -> Self {
        Self {
            file_id: 0,
            start: 0,
            end: 0,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(self.file_id, other.file_id);
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_covers_both() {
        let a = Span::new(1, 4, 9);
        let b = Span::new(1, 2, 6);
        let m = a.merge(b);
        assert_eq!(m.start, 2);
        assert_eq!(m.end, 9);
        assert_eq!(m.file_id, 1);
    }

    #[test]
    fn test_dummy() {
        assert!(Span::dummy().is_dummy());
        assert!(!Span::new(0, 3, 5).is_dummy());
        assert_eq!(Span::new(0, 3, 5).range(), 3..5);
    }
}
