// Bag layout helpers: bag directory discovery, bag-info, payload manifest

use ingestflow_core::domain::bag_info::BAG_INFO_FILE;
use ingestflow_core::domain::{BagInfo, DepositFile, DomainError};
use ingestflow_core::error::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const MANIFEST_PREFIX: &str = "manifest-";
const PREFERRED_MANIFEST: &str = "manifest-sha1.txt";
pub(crate) const METADATA_DIR: &str = "metadata";

/// The single content sub-directory of a deposit
pub fn find_bag_dir(deposit_dir: &Path) -> Result<PathBuf> {
    let mut bags = Vec::new();
    for entry in fs::read_dir(deposit_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            bags.push(entry.path());
        }
    }
    match bags.len() {
        1 => Ok(bags.remove(0)),
        n => Err(DomainError::InvalidDeposit(format!(
            "{} should contain exactly 1 bag directory; {} found",
            deposit_dir.display(),
            n
        ))
        .into()),
    }
}

pub fn read_bag_info(bag_dir: &Path) -> Result<BagInfo> {
    let path = bag_dir.join(BAG_INFO_FILE);
    let content = fs::read_to_string(&path).map_err(|e| {
        DomainError::InvalidDeposit(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(BagInfo::parse(&content))
}

/// Payload files from the manifest; sha1 is preferred when several exist.
///
/// A bag without any manifest has no payload.
pub fn read_manifest(bag_dir: &Path) -> Result<Vec<DepositFile>> {
    let Some(manifest) = pick_manifest(bag_dir)? else {
        return Ok(vec![]);
    };
    let content = fs::read_to_string(&manifest)?;

    let mut files = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let Some((checksum, path)) = line.trim().split_once(char::is_whitespace) else {
            return Err(DomainError::InvalidDeposit(format!(
                "Malformed line in {}: {}",
                manifest.display(),
                line
            ))
            .into());
        };
        files.push(DepositFile {
            path: path.trim().to_string(),
            checksum: checksum.to_string(),
        });
    }
    Ok(files)
}

fn pick_manifest(bag_dir: &Path) -> Result<Option<PathBuf>> {
    let preferred = bag_dir.join(PREFERRED_MANIFEST);
    if preferred.is_file() {
        return Ok(Some(preferred));
    }
    let mut candidates: Vec<PathBuf> = fs::read_dir(bag_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(MANIFEST_PREFIX) && n.ends_with(".txt"))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Files under `metadata/`, relative to the bag directory with `/` separators
pub(crate) fn list_metadata_documents(bag_dir: &Path) -> Result<Vec<String>> {
    let root = bag_dir.join(METADATA_DIR);
    if !root.is_dir() {
        return Ok(vec![]);
    }
    let mut documents = Vec::new();
    let mut pending = vec![root];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(relative) = path.strip_prefix(bag_dir) {
                documents.push(slash_path(relative));
            }
        }
    }
    documents.sort();
    Ok(documents)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
