//! Archive fallback: download, extract, rename into place.

use crate::error::{ProvisionError, Result};
use anyhow::Context;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Directories some archivers add beside the real content.
const IGNORED_TOP_LEVEL: &[&str] = &["__MACOSX"];

/// Archive formats that can be extracted in-process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Pick the format from the URL's path suffix. Query and fragment are
    /// ignored.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase();
        if path.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }

    /// File extension used for the downloaded file.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Unpack `archive` into the existing directory `into`.
pub fn extract(archive: &Path, format: ArchiveFormat, into: &Path) -> anyhow::Result<()> {
    let file = File::open(archive).with_context(|| format!("Cannot open {}", archive.display()))?;
    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(file).context("Not a valid zip archive")?;
            zip.extract(into).context("Zip extraction failed")?;
        }
        ArchiveFormat::TarGz => {
            let mut tar = tar::Archive::new(GzDecoder::new(file));
            tar.unpack(into).context("Tar extraction failed")?;
        }
    }
    Ok(())
}

/// The one directory directly under `dir`.
///
/// Top-level files (such as a tar `pax_global_header`) are not candidates.
/// Zero or several candidate directories make the layout ambiguous.
pub fn single_top_level_dir(dir: &Path, archive: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if IGNORED_TOP_LEVEL.contains(&name.to_string_lossy().as_ref()) {
            continue;
        }
        if entry.file_type()?.is_dir() {
            candidates.push(entry.path());
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(ProvisionError::ExtractionFailed {
            archive: archive.to_path_buf(),
            message: "no top-level directory".to_string(),
        }),
        n => Err(ProvisionError::ExtractionFailed {
            archive: archive.to_path_buf(),
            message: format!("{} top-level directories, expected exactly one", n),
        }),
    }
}

/// Download `url`, extract it beside `destination`, and rename its single
/// top-level directory to `destination`.
///
/// The scratch directory (and the downloaded file in it) is removed whether
/// or not this succeeds.
pub fn fetch_archive(
    url: &str,
    destination: &Path,
    download: &dyn Fn(&str, &Path) -> anyhow::Result<()>,
) -> Result<()> {
    let format = ArchiveFormat::from_url(url).ok_or_else(|| ProvisionError::AcquisitionFailed {
        url: url.to_string(),
        message: "no extractor available for this archive type".to_string(),
    })?;

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let scratch = tempfile::Builder::new()
        .prefix(".groundwork-")
        .tempdir_in(parent)?;

    let archive = scratch
        .path()
        .join(format!("download.{}", format.extension()));
    download(url, &archive).map_err(|e| ProvisionError::AcquisitionFailed {
        url: url.to_string(),
        message: format!("{:#}", e),
    })?;

    let extracted = scratch.path().join("extracted");
    fs::create_dir(&extracted)?;
    extract(&archive, format, &extracted).map_err(|e| ProvisionError::ExtractionFailed {
        archive: archive.clone(),
        message: format!("{:#}", e),
    })?;

    let top = single_top_level_dir(&extracted, &archive)?;
    tracing::debug!("Moving {} to {}", top.display(), destination.display());
    fs::rename(&top, destination)?;
    fs::remove_file(&archive)?;
    Ok(())
}
