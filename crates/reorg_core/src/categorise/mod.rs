//! Interactive category assignment loop.
//!
//! # Responsibility
//! - Render each uncategorized note and read one category per note.
//! - Record every answer in the manifest and persist it immediately.
//!
//! # Invariants
//! - Notes are prompted strictly in the order given, one at a time.
//! - The show-full token never becomes a category; it switches the note from
//!   `Abridged` to `Full` rendering.
//! - The manifest is saved after every successful `set`, so an interrupted
//!   session keeps every answer already given.
//! - End of input is an error, never a silent default.
//!
//! # See also
//! - `manifest` (set-once storage)

use crate::config::PromptConfig;
use crate::manifest::{Manifest, ManifestError};
use crate::model::note::Note;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};
use std::path::Path;

const PROMPT: &str = "> category? [type `f` for full] ";

/// Rendering state for the note currently being prompted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    /// First `abridged_lines` content lines only.
    Abridged,
    /// Entire content.
    Full,
}

/// Prompt loop failures.
#[derive(Debug)]
pub enum PromptError {
    Io(io::Error),
    /// Input ended before a category was given for `key`.
    InputClosed { key: String },
    Manifest(ManifestError),
}

impl Display for PromptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "prompt i/o failed: {err}"),
            Self::InputClosed { key } => {
                write!(f, "input closed before a category was given for {key}")
            }
            Self::Manifest(err) => write!(f, "cannot record category: {err}"),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Manifest(err) => Some(err),
            Self::InputClosed { .. } => None,
        }
    }
}

impl From<io::Error> for PromptError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ManifestError> for PromptError {
    fn from(value: ManifestError) -> Self {
        Self::Manifest(value)
    }
}

/// Operator prompt over generic input and output streams.
pub struct CategoryPrompt<R, W> {
    input: R,
    output: W,
    config: PromptConfig,
}

impl<R: BufRead, W: Write> CategoryPrompt<R, W> {
    pub fn new(input: R, output: W, config: PromptConfig) -> Self {
        Self {
            input,
            output,
            config,
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Prompts for every note in order, recording and saving each answer.
    ///
    /// Returns the number of categories recorded.
    pub fn run(
        &mut self,
        notes: &[Note],
        manifest: &mut Manifest,
        manifest_path: &Path,
    ) -> Result<usize, PromptError> {
        info!(
            "event=categorise_run module=categorise status=start notes={}",
            notes.len()
        );
        for (index, note) in notes.iter().enumerate() {
            let category = self.request_category(note)?;
            manifest.set(note.key(), category.as_str())?;
            manifest.save(manifest_path)?;
            info!(
                "event=category_set module=categorise status=ok key={} category={} progress={}/{}",
                note.key(),
                category,
                index + 1,
                notes.len()
            );
        }
        Ok(notes.len())
    }

    /// Renders `note` and reads responses until a category is given.
    pub fn request_category(&mut self, note: &Note) -> Result<String, PromptError> {
        let mut state = PromptState::Abridged;
        loop {
            self.render(note, state)?;
            let Some(response) = self.read_response()? else {
                return Err(PromptError::InputClosed { key: note.key() });
            };

            if response == self.config.show_full_token {
                state = PromptState::Full;
                continue;
            }
            if response.is_empty() {
                return Ok(self.config.default_category.clone());
            }
            if !is_valid_category(&response) {
                warn!(
                    "event=category_rejected module=categorise status=error key={} reason=invalid_name",
                    note.key()
                );
                writeln!(
                    self.output,
                    "invalid category `{response}`: must be a single directory name"
                )?;
                continue;
            }
            return Ok(response);
        }
    }

    fn render(&mut self, note: &Note, state: PromptState) -> io::Result<()> {
        let content = match state {
            PromptState::Abridged => abridge(&note.content, self.config.abridged_lines),
            PromptState::Full => note.content.clone(),
        };
        writeln!(self.output, "{} {}:\n{}", note.date_label(), note.title, content)?;
        write!(self.output, "{PROMPT}")?;
        self.output.flush()
    }

    fn read_response(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Keeps the first `max_lines` lines of `content`.
fn abridge(content: &str, max_lines: usize) -> String {
    content
        .split('\n')
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Categories become directory names below the output root.
fn is_valid_category(value: &str) -> bool {
    value != "." && value != ".." && !value.contains(['/', '\\'])
}
