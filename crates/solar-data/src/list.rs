//! Reading and atomically writing dataset list files.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use solar_core::errors::{ErrorInfo, SweepError};
use tempfile::NamedTempFile;

/// Reads the non-empty lines of a list file.
pub fn read_list_lines(list_file: &Path) -> Result<Vec<String>, SweepError> {
    let text = fs::read_to_string(list_file)
        .map_err(|err| SweepError::dataset_io("dataset.list_read", list_file, err))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Reads a list file and resolves every entry against `root_dir`.
///
/// Entries of combo lists are already absolute and come back unchanged;
/// without a root, entries are returned as written.
pub fn read_sample_list(list_file: &Path, root_dir: Option<&Path>) -> Result<Vec<PathBuf>, SweepError> {
    let lines = read_list_lines(list_file)?;
    Ok(lines
        .into_iter()
        .map(|line| match root_dir {
            Some(root) => root.join(line),
            None => PathBuf::from(line),
        })
        .collect())
}

/// Resolves a relative path against the working directory.
pub(crate) fn absolutize(path: PathBuf) -> Result<PathBuf, SweepError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir()
        .map_err(|err| SweepError::dataset_io("dataset.cwd", &path, err))?;
    Ok(cwd.join(path))
}

/// Renders list entries into the on-disk format: one entry per line.
pub(crate) fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    text
}

fn staged(target: &Path, contents: &str) -> Result<NamedTempFile, SweepError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|err| SweepError::dataset_io("dataset.list_dir", dir, err))?;
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|err| SweepError::dataset_io("dataset.list_stage", target, err))?;
    temp.write_all(contents.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(|err| SweepError::dataset_io("dataset.list_stage", target, err))?;
    Ok(temp)
}

fn persist(temp: NamedTempFile, target: &Path) -> Result<(), SweepError> {
    temp.persist(target)
        .map(|_| ())
        .map_err(|err| SweepError::dataset_io("dataset.list_persist", target, err.error))
}

/// Writes a single list file through a temporary file in the target directory.
pub fn write_list<S: AsRef<str>>(target: &Path, lines: &[S]) -> Result<(), SweepError> {
    let temp = staged(target, &render_lines(lines))?;
    persist(temp, target)
}

/// Writes an image list and its mask list as one group.
///
/// The pair on disk never disagrees in length; see [`write_list_group`].
pub fn write_list_pair<S: AsRef<str>>(
    img_target: &Path,
    img_lines: &[S],
    mask_target: &Path,
    mask_lines: &[S],
) -> Result<(), SweepError> {
    check_pair(img_target, img_lines.len(), mask_lines.len())?;
    write_list_group(&[(img_target, img_lines), (mask_target, mask_lines)])
}

/// Rejects an image/mask pair whose lists differ in length.
fn check_pair(img_target: &Path, img_lines: usize, mask_lines: usize) -> Result<(), SweepError> {
    if img_lines == mask_lines {
        return Ok(());
    }
    Err(SweepError::Dataset(
        ErrorInfo::new("dataset.pair_mismatch", "image and mask lists differ in length")
            .with_context("img_list", img_target.display().to_string())
            .with_context("img_lines", img_lines.to_string())
            .with_context("mask_lines", mask_lines.to_string()),
    ))
}

/// Writes several list files as one unit.
///
/// Every file is staged completely before any is moved into place. Files are
/// then persisted in the given order, so the last entry is only visible once
/// all others are. If a rename fails, the files already moved into place are
/// removed again.
pub fn write_list_group<S: AsRef<str>>(files: &[(&Path, &[S])]) -> Result<(), SweepError> {
    let staged_files = files
        .iter()
        .map(|&(target, lines)| staged(target, &render_lines(lines)).map(|temp| (temp, target)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut persisted: Vec<&Path> = Vec::with_capacity(staged_files.len());
    for (temp, target) in staged_files {
        if let Err(err) = persist(temp, target) {
            for done in persisted {
                let _ = fs::remove_file(done);
            }
            return Err(err);
        }
        persisted.push(target);
    }
    Ok(())
}
