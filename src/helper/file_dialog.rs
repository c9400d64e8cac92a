//! # File Dialog Module
//!
//! Native single-file selection. The controller only depends on the [`FileDialog`]
//! trait so tests can script the user's choices.

use std::path::PathBuf;

/// Something that can ask the user for exactly one existing file.
pub trait FileDialog {
    /// Blocks until the user picks a file or cancels. `None` means cancelled.
    fn pick_file(&mut self, title: &str) -> Option<PathBuf>;
}

/// Blocking native dialog backed by `rfd`.
#[derive(Debug, Default)]
pub struct NativeFileDialog;

impl FileDialog for NativeFileDialog {
    fn pick_file(&mut self, title: &str) -> Option<PathBuf> {
        let picked = rfd::FileDialog::new().set_title(title).pick_file();
        match &picked {
            Some(path) => tracing::debug!("File selected: {:?}", path),
            None => tracing::debug!("File dialog cancelled"),
        }
        picked
    }
}

/// Replays a fixed list of answers, one per dialog.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedFileDialog {
    pub answers: std::collections::VecDeque<Option<PathBuf>>,
    pub titles: Vec<String>,
}

#[cfg(test)]
impl ScriptedFileDialog {
    pub fn new(answers: impl IntoIterator<Item = Option<PathBuf>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            titles: Vec::new(),
        }
    }
}

#[cfg(test)]
impl FileDialog for ScriptedFileDialog {
    fn pick_file(&mut self, title: &str) -> Option<PathBuf> {
        self.titles.push(title.to_string());
        self.answers.pop_front().flatten()
    }
}
