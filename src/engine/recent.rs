use std::collections::VecDeque;

pub const RECENT_CAPACITY: usize = 5;

/// Most recently added or re-selected codes, newest first. Hinting only.
#[derive(Debug, Default, Clone)]
pub struct RecentlySearched {
    codes: VecDeque<String>,
}

impl RecentlySearched {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, code: &str) {
        self.codes.retain(|c| c != code);
        self.codes.push_front(code.to_string());
        self.codes.truncate(RECENT_CAPACITY);
    }

    pub fn remove(&mut self, code: &str) {
        self.codes.retain(|c| c != code);
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_moves_to_front() {
        let mut recent = RecentlySearched::new();
        recent.touch("USD");
        recent.touch("EUR");
        recent.touch("USD");
        assert_eq!(recent.codes(), vec!["USD", "EUR"]);
    }

    #[test]
    fn test_bounded_to_capacity() {
        let mut recent = RecentlySearched::new();
        for code in ["A", "B", "C", "D", "E", "F", "G"] {
            recent.touch(code);
        }
        assert_eq!(recent.codes(), vec!["G", "F", "E", "D", "C"]);
    }

    #[test]
    fn test_remove() {
        let mut recent = RecentlySearched::new();
        recent.touch("USD");
        recent.touch("GBP");
        recent.remove("USD");
        recent.remove("JPY");
        assert_eq!(recent.codes(), vec!["GBP"]);
    }
}
