//! Inline, dismissible operator notices

use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => f.write_str("info"),
            NoticeLevel::Success => f.write_str("success"),
            NoticeLevel::Warning => f.write_str("warning"),
            NoticeLevel::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

/// Bounded list of notices, oldest first. When full the oldest is evicted.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    notices: VecDeque<Notice>,
    capacity: usize,
    next_id: u64,
}

impl NoticeBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            notices: VecDeque::new(),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Post a notice and return its id
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.notices.len() == self.capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            id,
            level,
            message: message.into(),
        });
        id
    }

    /// Remove a notice. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        match self.notices.iter().position(|n| n.id == id) {
            Some(index) => {
                self.notices.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.notices.back()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_notice_evicted_when_full() {
        let mut board = NoticeBoard::new(2);
        board.push(NoticeLevel::Info, "one");
        board.push(NoticeLevel::Info, "two");
        board.push(NoticeLevel::Error, "three");

        let messages: Vec<_> = board.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_dismiss() {
        let mut board = NoticeBoard::new(4);
        let id = board.push(NoticeLevel::Warning, "stale");
        assert!(board.dismiss(id));
        assert!(!board.dismiss(id));
        assert!(board.is_empty());
    }
}
