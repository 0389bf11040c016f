use crate::logs::LogLine;

/// Indices of lines containing `query`, case-insensitively, in ascending
/// order. An empty query matches nothing.
pub fn search(lines: &[LogLine], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.raw.to_lowercase().contains(&needle))
        .map(|(index, _)| index)
        .collect()
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SearchState {
    query: String,
    matches: Vec<usize>,
    current: usize,
}

impl SearchState {
    pub fn commit(lines: &[LogLine], query: &str) -> Self {
        Self {
            query: query.to_string(),
            matches: search(lines, query),
            current: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn is_match(&self, line: usize) -> bool {
        self.matches.binary_search(&line).is_ok()
    }

    pub fn current_line(&self) -> Option<usize> {
        self.matches.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.matches.len();
        self.current_line()
    }

    pub fn prev(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = self
            .current
            .checked_sub(1)
            .unwrap_or(self.matches.len() - 1);
        self.current_line()
    }

    pub fn status(&self) -> String {
        if self.matches.is_empty() {
            "No matches found".to_string()
        } else {
            format!("Match {}/{}", self.current + 1, self.matches.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchState, search};
    use crate::logs::{LogLine, decode_all, framed};

    fn lines(raw: &[&str]) -> Vec<LogLine> {
        decode_all(&framed(raw)).lines
    }

    #[test]
    fn empty_query_matches_nothing() {
        let buffer = lines(&["alpha", "beta"]);
        assert!(search(&buffer, "").is_empty());
        let state = SearchState::commit(&buffer, "");
        assert!(!state.is_active());
        assert_eq!(state.current_line(), None);
    }

    #[test]
    fn matches_are_ascending_and_case_insensitive() {
        let buffer = lines(&["ERROR one", "ok", "an error again error", "fine", "Error"]);
        let found = search(&buffer, "error");
        assert_eq!(found, vec![0, 2, 4]);
        assert!(found.windows(2).all(|pair| pair[0] < pair[1]));
        for index in found {
            assert!(buffer[index].raw.to_lowercase().contains("error"));
        }
    }

    #[test]
    fn next_and_prev_wrap_at_both_ends() {
        let buffer = lines(&["x", "hit", "y", "hit", "hit"]);
        let mut state = SearchState::commit(&buffer, "HIT");
        assert_eq!(state.current_line(), Some(1));
        assert_eq!(state.prev(), Some(4));
        assert_eq!(state.status(), "Match 3/3");
        assert_eq!(state.next(), Some(1));
        assert_eq!(state.next(), Some(3));
        assert_eq!(state.next(), Some(4));
        assert_eq!(state.next(), Some(1));
        assert!(state.is_match(3));
        assert!(!state.is_match(2));
    }

    #[test]
    fn no_match_status() {
        let buffer = lines(&["a", "b"]);
        let mut state = SearchState::commit(&buffer, "zzz");
        assert_eq!(state.next(), None);
        assert_eq!(state.status(), "No matches found");
    }
}
