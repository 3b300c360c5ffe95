//! Archive discovery under the data root.

use crate::{
    config::LayoutConfig,
    error::{PipelineError, PipelineResult},
};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct ArchiveLocator<'a> {
    layout: &'a LayoutConfig,
    suffix: &'a str,
}

impl<'a> ArchiveLocator<'a> {
    pub fn new(layout: &'a LayoutConfig, suffix: &'a str) -> Self {
        Self { layout, suffix }
    }

    /// Heuristic check: the root holds the expected year directory and the
    /// sample day directory beneath it. Not an exhaustive validation.
    pub fn check_layout(&self, root: &Path) -> PipelineResult<()> {
        let invalid = |reason: String| PipelineError::InvalidLayout {
            root: root.to_path_buf(),
            reason,
        };

        if !root.is_dir() {
            return Err(invalid("root is not a directory".into()));
        }
        let year_dir = root.join(&self.layout.year_dir);
        if !year_dir.is_dir() {
            return Err(invalid(format!(
                "expected year directory {:?}",
                self.layout.year_dir
            )));
        }
        let sample = self.layout.sample_path(root);
        if !sample.is_dir() {
            return Err(invalid(format!("missing sample path {}", sample.display())));
        }
        log::debug!("layout ok, sample path {}", sample.display());
        Ok(())
    }

    /// Every file under `root` whose name ends with the archive suffix, in
    /// walk order (sorted by file name within each directory).
    pub fn find_archives(&self, root: &Path) -> Vec<PathBuf> {
        let mut archives = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let is_archive = entry.file_type().is_file()
                        && entry
                            .file_name()
                            .to_str()
                            .is_some_and(|name| name.ends_with(self.suffix));
                    if is_archive {
                        log::debug!("found archive [{}] {}", archives.len(), entry.path().display());
                        archives.push(entry.into_path());
                    }
                }
                Err(e) => {
                    // Continue scanning, an unreadable subtree is not fatal.
                    log::warn!("Error accessing entry: {e}");
                }
            }
        }

        log::info!("Total archive files: {}", archives.len());
        archives
    }
}
