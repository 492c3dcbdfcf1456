/// Separators used when `IFS` is unset.
pub const DEFAULT_SEPARATORS: &str = " \t\n";

/// Word capacity reserved up front for every line.
pub const MIN_WORDS: usize = 512;

/// Lazy iterator over the non-empty words of a line. Runs of separators
/// collapse, so no empty word is ever produced.
#[derive(Debug, Clone)]
pub struct Words<'a> {
    line: &'a str,
    rest: &'a str,
    separators: &'a str,
}

impl<'a> Words<'a> {
    pub fn new(line: &'a str, separators: &'a str) -> Self {
        Self {
            line,
            rest: line,
            separators,
        }
    }

    /// Start again from the beginning of the line.
    pub fn restart(&mut self) {
        self.rest = self.line;
    }
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let separators = self.separators;
        let start = self.rest.trim_start_matches(|c| separators.contains(c));
        if start.is_empty() {
            self.rest = start;
            return None;
        }

        let end = start
            .find(|c| separators.contains(c))
            .unwrap_or(start.len());
        let (word, rest) = start.split_at(end);
        self.rest = rest;
        Some(word)
    }
}

/// Split `line` into owned words. An empty result means a blank line.
pub fn split_words(line: &str, separators: &str) -> Vec<String> {
    let mut words = Vec::with_capacity(MIN_WORDS);
    words.extend(Words::new(line, separators).map(String::from));
    words
}
