use super::state::ShellState;

const HOME_PREFIX: &str = "~/";

/// Rewrites `~/`, `$$`, `$?` and `$!` inside a single word.
pub struct Expander<'a> {
    state: &'a ShellState,
}

impl<'a> Expander<'a> {
    pub fn new(state: &'a ShellState) -> Self {
        Self { state }
    }

    /// Expand `word` in place. Replacement text is never rescanned.
    pub fn expand(&self, word: &mut String) {
        if word.len() <= 1 {
            return;
        }

        let mut pos = 0;
        if word.starts_with(HOME_PREFIX) {
            let home = format!("{}/", self.state.home_dir);
            word.replace_range(..HOME_PREFIX.len(), &home);
            pos = home.len();
        }

        while pos + 1 < word.len() {
            let replacement = match &word.as_bytes()[pos..pos + 2] {
                b"$$" => self.state.current_pid().to_string(),
                b"$?" => self.state.last_exit_status.to_string(),
                b"$!" => self
                    .state
                    .last_background_pid
                    .map(|pid| pid.to_string())
                    .unwrap_or_default(),
                _ => {
                    pos += 1;
                    continue;
                }
            };

            word.replace_range(pos..pos + 2, &replacement);
            if word.is_empty() {
                break;
            }
            pos += replacement.len();
        }
    }

    pub fn expand_all(&self, words: &mut [String]) {
        for word in words {
            self.expand(word);
        }
    }
}
