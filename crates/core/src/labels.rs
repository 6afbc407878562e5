//! Class label set, loaded once at startup.
//!
//! The file is newline-delimited; line `n` (zero-based) names class id `n`.
//! Blank lines are kept so later lines stay aligned with their class ids.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Failed to read label file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Label file {0} contains no labels")]
    Empty(PathBuf),
}

/// Immutable class-id → label lookup.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Read and parse a label file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let set = Self::parse(&contents);
        if set.is_empty() {
            return Err(LabelError::Empty(path.to_path_buf()));
        }
        Ok(set)
    }

    /// Parse label file contents. Handles both `\n` and `\r\n` endings.
    pub fn parse(contents: &str) -> Self {
        let labels = contents
            .lines()
            .map(|line| line.trim().to_string())
            .collect();
        Self { labels }
    }

    /// Label for `class_id`, or `class {id}` when the file has no usable
    /// entry for it.
    pub fn label_for(&self, class_id: u32) -> Cow<'_, str> {
        match self.labels.get(class_id as usize) {
            Some(label) if !label.is_empty() => Cow::Borrowed(label.as_str()),
            _ => Cow::Owned(format!("class {class_id}")),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.iter().all(|l| l.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_keeps_line_positions() {
        let set = LabelSet::parse("background\nperson\n\ncar\n");
        assert_eq!(set.len(), 4);
        assert_eq!(set.label_for(1), "person");
        assert_eq!(set.label_for(3), "car");
    }

    #[test]
    fn blank_and_missing_entries_fall_back_to_class_id() {
        let set = LabelSet::parse("background\nperson\n\ncar");
        assert_eq!(set.label_for(2), "class 2");
        assert_eq!(set.label_for(90), "class 90");
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let set = LabelSet::parse("a\r\nb\r\n");
        assert_eq!(set.label_for(1), "b");
    }

    #[test]
    fn from_file_reads_labels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "???\nperson\nbicycle").unwrap();

        let set = LabelSet::from_file(file.path()).unwrap();
        assert_eq!(set.label_for(2), "bicycle");
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LabelSet::from_file(dir.path().join("nope.txt"));
        assert_matches!(result, Err(LabelError::Io { .. }));
    }

    #[test]
    fn from_file_blank_is_empty_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "\n\n").unwrap();
        assert_matches!(LabelSet::from_file(file.path()), Err(LabelError::Empty(_)));
    }
}
