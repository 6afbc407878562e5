//! On-disk naming for per-job input and output images.
//!
//! Both artifacts are named `{stem}-{id}.jpg`, the input under the input
//! directory and the annotated result under the output directory. The
//! correlation id makes every name unique, so concurrent workers never
//! write to the same path and no file locking is needed.

use std::path::{Path, PathBuf};

use crate::correlation::CorrelationId;

pub const ARTIFACT_EXTENSION: &str = "jpg";

/// Used when the uploaded filename has no usable characters.
const DEFAULT_STEM: &str = "upload";

const MAX_STEM_LEN: usize = 64;

/// Reduce an uploaded filename to a safe artifact stem.
///
/// Keeps the final path component up to its first `.`, drops anything that
/// is not ASCII alphanumeric, `-` or `_`, and truncates the rest.
pub fn sanitize_stem(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let stem: String = base
        .split('.')
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_STEM_LEN)
        .collect();

    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem
    }
}

/// Artifact file name for a job.
pub fn artifact_name(stem: &str, id: &CorrelationId) -> String {
    format!("{stem}-{id}.{ARTIFACT_EXTENSION}")
}

/// The correlation id embedded in an artifact file name.
fn id_of_artifact(file_name: &str) -> Option<CorrelationId> {
    let (_, id) = file_name
        .strip_suffix(ARTIFACT_EXTENSION)?
        .strip_suffix('.')?
        .rsplit_once('-')?;
    CorrelationId::parse(id).ok()
}

/// Input and output directories for job artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Create both directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.input_dir)?;
        std::fs::create_dir_all(&self.output_dir)
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn input_path(&self, stem: &str, id: &CorrelationId) -> PathBuf {
        self.input_dir.join(artifact_name(stem, id))
    }

    pub fn output_path(&self, stem: &str, id: &CorrelationId) -> PathBuf {
        self.output_dir.join(artifact_name(stem, id))
    }

    /// Newest correlation id found in either artifact directory, if any.
    ///
    /// Inputs are written before outputs, so a job that never finished still
    /// counts. Names that do not follow the artifact scheme are ignored.
    pub fn latest_id(&self) -> std::io::Result<Option<CorrelationId>> {
        let mut latest = None;
        for dir in [&self.input_dir, &self.output_dir] {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let Some(id) = entry.file_name().to_str().and_then(id_of_artifact) else {
                    continue;
                };
                match &latest {
                    Some(current) if *current >= id => {}
                    _ => latest = Some(id),
                }
            }
        }
        Ok(latest)
    }

    /// Whether `file_name` is the output artifact of job `id`, whatever its
    /// stem. Used to look results up by id alone.
    pub fn is_output_for(file_name: &str, id: &CorrelationId) -> bool {
        file_name
            .strip_suffix(ARTIFACT_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .and_then(|rest| rest.strip_suffix(id.as_str()))
            .is_some_and(|rest| rest.ends_with('-'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CorrelationId {
        CorrelationId::parse("0a1B2c3D4e").unwrap()
    }

    // -- sanitize_stem --------------------------------------------------------

    #[test]
    fn stem_stops_at_first_dot() {
        assert_eq!(sanitize_stem("street.scene.jpg"), "street");
    }

    #[test]
    fn stem_drops_directories_and_unsafe_characters() {
        assert_eq!(sanitize_stem("../../etc/pass wd.jpg"), "passwd");
        assert_eq!(sanitize_stem("C:\\photos\\dog_1.jpeg"), "dog_1");
    }

    #[test]
    fn stem_falls_back_when_nothing_usable() {
        assert_eq!(sanitize_stem(""), "upload");
        assert_eq!(sanitize_stem(".jpg"), "upload");
        assert_eq!(sanitize_stem("***.jpg"), "upload");
    }

    #[test]
    fn stem_is_truncated() {
        let long = "a".repeat(200);
        assert_eq!(sanitize_stem(&long).len(), 64);
    }

    // -- layout ---------------------------------------------------------------

    #[test]
    fn paths_embed_stem_and_id() {
        let layout = ArtifactLayout::new("in", "out");
        assert_eq!(
            layout.input_path("cat", &id()),
            PathBuf::from("in/cat-0a1B2c3D4e.jpg")
        );
        assert_eq!(
            layout.output_path("cat", &id()),
            PathBuf::from("out/cat-0a1B2c3D4e.jpg")
        );
    }

    #[test]
    fn output_match_requires_exact_id() {
        assert!(ArtifactLayout::is_output_for("cat-0a1B2c3D4e.jpg", &id()));
        assert!(ArtifactLayout::is_output_for("my-cat-0a1B2c3D4e.jpg", &id()));
        assert!(!ArtifactLayout::is_output_for("cat-0a1B2c3D4f.jpg", &id()));
        assert!(!ArtifactLayout::is_output_for("0a1B2c3D4e.jpg", &id()));
        assert!(!ArtifactLayout::is_output_for("cat-0a1B2c3D4e.png", &id()));
    }

    #[test]
    fn latest_id_scans_both_directories() {
        let root = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(root.path().join("in"), root.path().join("out"));
        layout.ensure_dirs().unwrap();
        assert_eq!(layout.latest_id().unwrap(), None);

        let older = CorrelationId::parse("0000000001").unwrap();
        let newer = CorrelationId::parse("00000000zz").unwrap();
        std::fs::write(layout.output_path("cat", &older), b"x").unwrap();
        // Only the input of the newest job made it to disk.
        std::fs::write(layout.input_path("my-dog", &newer), b"x").unwrap();
        std::fs::write(layout.output_dir().join("notes.txt"), b"x").unwrap();
        std::fs::write(layout.output_dir().join(".cat-zzzzzzzzzz.jpg.part"), b"x").unwrap();

        assert_eq!(layout.latest_id().unwrap(), Some(newer));
    }

    #[test]
    fn ensure_dirs_creates_both() {
        let root = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(root.path().join("a/in"), root.path().join("b/out"));
        layout.ensure_dirs().unwrap();
        assert!(layout.input_dir().is_dir());
        assert!(layout.output_dir().is_dir());
    }
}
