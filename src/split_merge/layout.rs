//! On-disk layout of a split project.
//!
//! ```text
//! {dir}/book.xuk                      source
//! {dir}/_SPLIT/book__MASTER/master.xuk
//! {dir}/_SPLIT/book_0/0.xuk
//! {dir}/_SPLIT/book_1/1.xuk
//! {dir}/_MERGE/book.xuk               merge result
//! ```

use std::path::{Path, PathBuf};

use super::SplitMergeOptions;
use crate::error::{Error, Result};

/// Paths of every file a split or merge reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLayout {
    /// Directory holding the source document.
    pub container: PathBuf,
    /// `{container}/_SPLIT`.
    pub split_dir: PathBuf,
    /// Source file stem, shared by the master and part directories.
    pub base_name: String,
    /// Source extension without the dot; may be empty.
    pub extension: String,
    master_dir_name: String,
    master_file_stem: String,
    merge_dir_name: String,
}

/// One entry of the partition manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartEntry {
    pub index: usize,
    pub dir: PathBuf,
    pub path: PathBuf,
}

impl SplitLayout {
    /// Layout for splitting the document at `source`.
    pub fn for_source(source: &Path, options: &SplitMergeOptions) -> Result<Self> {
        let base_name = file_stem(source)?;
        let container = parent_or_current(source);
        Ok(Self::build(container, base_name, extension(source), options))
    }

    /// Layout recovered from the path of a master document
    /// (`{container}/_SPLIT/{base}__MASTER/master.{ext}`).
    pub fn for_master(master: &Path, options: &SplitMergeOptions) -> Result<Self> {
        let master_dir = master.parent().ok_or_else(|| {
            Error::InvalidArgument(format!("{} has no parent directory", master.display()))
        })?;
        let dir_name = master_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("{} is not inside a split directory", master.display()))
            })?;
        let base_name = dir_name
            .strip_suffix(options.master_suffix.as_str())
            .unwrap_or(dir_name)
            .to_string();
        let container = master_dir
            .parent()
            .map(parent_or_current)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::build(container, base_name, extension(master), options))
    }

    fn build(
        container: PathBuf,
        base_name: String,
        extension: String,
        options: &SplitMergeOptions,
    ) -> Self {
        Self {
            split_dir: container.join(&options.split_dir_name),
            container,
            master_dir_name: format!("{base_name}{}", options.master_suffix),
            base_name,
            extension,
            master_file_stem: options.master_file_stem.clone(),
            merge_dir_name: options.merge_dir_name.clone(),
        }
    }

    fn file_name(&self, stem: &str) -> String {
        if self.extension.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}.{}", self.extension)
        }
    }

    pub fn master_dir(&self) -> PathBuf {
        self.split_dir.join(&self.master_dir_name)
    }

    pub fn master_path(&self) -> PathBuf {
        self.master_dir().join(self.file_name(&self.master_file_stem))
    }

    pub fn part_dir(&self, index: usize) -> PathBuf {
        self.split_dir.join(format!("{}_{index}", self.base_name))
    }

    pub fn part_path(&self, index: usize) -> PathBuf {
        self.part_dir(index).join(self.file_name(&index.to_string()))
    }

    /// The ordered manifest of `total` parts.
    pub fn parts(&self, total: usize) -> impl Iterator<Item = PartEntry> + '_ {
        (0..total).map(|index| PartEntry {
            index,
            dir: self.part_dir(index),
            path: self.part_path(index),
        })
    }

    pub fn merge_dir(&self) -> PathBuf {
        self.container.join(&self.merge_dir_name)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.merge_dir().join(self.file_name(&self.base_name))
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument(format!("{} has no file name", path.display())))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

fn parent_or_current(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
