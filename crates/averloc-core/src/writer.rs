//! Output writer: persists transformed classes.
//!
//! Layout is `<root>/<transform>/<split>/<unit id>.<ext>`. Writing the same
//! key twice overwrites the earlier file.

use crate::source::{Split, unit_identifier};
use crate::syntax::{ElementKind, Model};
use crate::transform::Touched;
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

/// Default output root.
pub const DEFAULT_OUTPUT_DIR: &str = "/mnt/raw-outputs";

/// Default extension of written files.
pub const DEFAULT_EXTENSION: &str = "java";

/// Errors writing a single output file.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files written and failed by one emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub written: usize,
    pub failed: usize,
}

impl AddAssign for EmitStats {
    fn add_assign(&mut self, other: Self) {
        self.written += other.written;
        self.failed += other.failed;
    }
}

/// Writes rendered classes under an output root.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    extension: String,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Set the file extension (without the dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a class emitted by `transform` from `split`.
    pub fn path_for(&self, transform: &str, split: Split, class_name: &str) -> PathBuf {
        self.root
            .join(transform)
            .join(split.as_str())
            .join(format!("{}.{}", unit_identifier(class_name), self.extension))
    }

    /// Write `text` to `path`, creating parent directories.
    ///
    /// Several workers may create the same directory at once; that is not an
    /// error.
    pub fn write(&self, path: &Path, text: &str) -> Result<(), WriteError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| WriteError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write every touched class of `model`.
    ///
    /// Failures are logged and counted; they never abort the emit.
    pub fn emit(&self, model: &Model, touched: &Touched, transform: &str, split: Split) -> EmitStats {
        let mut stats = EmitStats::default();

        for decl in model.elements_of_kind(ElementKind::Class) {
            if !touched.applies_to(&decl.name) {
                continue;
            }
            let path = self.path_for(transform, split, &decl.name);
            match self.write(&path, &decl.to_source()) {
                Ok(()) => stats.written += 1,
                Err(e) => {
                    tracing::warn!("Failed to save output: {e}");
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_unit;
    use crate::transform::TransformUnit;

    fn model(src: &str) -> Model {
        Model::from_units(vec![parse_unit("t.java", src).unwrap()]).unwrap()
    }

    #[test]
    fn test_path_for_strips_prefix() {
        let writer = OutputWriter::new("/out");
        assert_eq!(
            writer.path_for("transforms.Identity", Split::Valid, "WRAPPER_abc"),
            PathBuf::from("/out/transforms.Identity/valid/abc.java")
        );
    }

    #[test]
    fn test_emit_touched_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let m = model("class WRAPPER_a { int x; } class WRAPPER_b {}");

        let mut touched = Touched::new();
        touched.insert("WRAPPER_a");

        let stats = writer.emit(&m, &touched, "transforms.RenameFields", Split::Test);
        assert_eq!(stats, EmitStats { written: 1, failed: 0 });

        let out = dir.path().join("transforms.RenameFields/test");
        assert!(out.join("a.java").exists());
        assert!(!out.join("b.java").exists());
    }

    #[test]
    fn test_emit_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let path = writer.path_for("t", Split::Train, "WRAPPER_x");

        writer.write(&path, "first").unwrap();
        writer.write(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_emit_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the transform directory should be.
        fs::write(dir.path().join("transforms.Identity"), "").unwrap();

        let writer = OutputWriter::new(dir.path());
        let mut m = model("class WRAPPER_a {}");
        let touched = TransformUnit::Identity.apply(&mut m).unwrap();

        let stats = writer.emit(&m, &touched, "transforms.Identity", Split::Test);
        assert_eq!(stats, EmitStats { written: 0, failed: 1 });
    }

    #[test]
    fn test_emitted_identity_reparses() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let mut m = model("class WRAPPER_a { int f(int n) { return n * 2; } }");
        let touched = TransformUnit::Identity.apply(&mut m).unwrap();

        writer.emit(&m, &touched, "transforms.Identity", Split::Test);

        let text = fs::read_to_string(dir.path().join("transforms.Identity/test/a.java")).unwrap();
        let again = parse_unit("a.java", &text).unwrap();
        assert_eq!(again.types[0].name, "WRAPPER_a");
    }
}
