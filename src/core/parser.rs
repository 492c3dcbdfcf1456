pub const COMMENT: &str = "#";
pub const BACKGROUND: &str = "&";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn from_marker(word: &str) -> Option<Self> {
        match word {
            "<" => Some(Direction::Input),
            ">" => Some(Direction::Output),
            _ => None,
        }
    }

    fn other(self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub argv: Vec<String>,
    pub input_redirect: Option<String>,
    pub output_redirect: Option<String>,
    pub is_background: bool,
}

impl ParsedCommand {
    pub fn new<S: Into<String>>(argv: impl IntoIterator<Item = S>) -> Self {
        ParsedCommand {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// Drop a `#` word and everything after it.
pub fn strip_comment(words: &mut Vec<String>) {
    if let Some(pos) = words.iter().position(|w| w == COMMENT) {
        words.truncate(pos);
    }
}

/// Turn expanded words into a command. `None` means there is nothing to run.
pub fn parse(mut words: Vec<String>) -> Option<ParsedCommand> {
    strip_comment(&mut words);

    let mut command = ParsedCommand::default();
    if words.last()? == BACKGROUND {
        words.pop();
        command.is_background = true;
    }
    if words.is_empty() {
        return None;
    }

    if words.len() > 1 {
        let first = take_redirect(&mut words, &mut command, None);
        if words.is_empty() {
            return None;
        }
        if let Some(direction) = first {
            if words.len() > 1 {
                take_redirect(&mut words, &mut command, Some(direction.other()));
                if words.is_empty() {
                    return None;
                }
            }
        }
    }

    command.argv = words;
    Some(command)
}

fn take_redirect(
    words: &mut Vec<String>,
    command: &mut ParsedCommand,
    only: Option<Direction>,
) -> Option<Direction> {
    let marker = words.get(words.len().checked_sub(2)?)?;
    let direction =
        Direction::from_marker(marker).filter(|d| only.map_or(true, |wanted| wanted == *d))?;

    let target = words.pop()?;
    words.pop();
    match direction {
        Direction::Input => command.input_redirect = Some(target),
        Direction::Output => command.output_redirect = Some(target),
    }
    Some(direction)
}
