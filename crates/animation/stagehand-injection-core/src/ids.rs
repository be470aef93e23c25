//! Identifiers and simple allocators for injection entities.

use serde::{Deserialize, Serialize};

/// An animated subject (one blend graph, one injector).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SubjectId(pub u32);

/// One override session, from connection to cleanup.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SessionId(pub u32);

/// Monotonic allocator for SubjectId and SessionId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_subject: u32,
    next_session: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_subject(&mut self) -> SubjectId {
        let id = SubjectId(self.next_subject);
        self.next_subject = self.next_subject.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_session(&mut self) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session = self.next_session.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_subject(), SubjectId(0));
        assert_eq!(alloc.alloc_subject(), SubjectId(1));
        assert_eq!(alloc.alloc_session(), SessionId(0));
        assert_eq!(alloc.alloc_session(), SessionId(1));
        alloc.reset();
        assert_eq!(alloc.alloc_session(), SessionId(0));
    }
}
