pub mod reader;
pub mod tokenizer;

pub use reader::{EditorReader, LineSource, ReadOutcome, StdinReader};
pub use tokenizer::{split_words, Words};
