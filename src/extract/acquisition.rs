use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use log::info;

use crate::config::Config;
use crate::error::{EtlError, EtlResult};

/// Make sure every mapped CSV file exists in `config.data_dir`, downloading
/// and unpacking the dataset archive as needed. Files already on disk are
/// left alone, so repeated calls do no work.
pub fn ensure_datasets_available(config: &Config) -> EtlResult<()> {
    fs::create_dir_all(&config.data_dir)?;

    let missing: Vec<&str> = config
        .csv_table_mapping
        .keys()
        .map(String::as_str)
        .filter(|file| {
            let present = config.data_dir.join(file).is_file();
            if present {
                info!("{} already present, skipping", file);
            }
            !present
        })
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let archive = config.dataset_archive();
    if archive.is_file() {
        info!("archive {} already downloaded", archive.display());
    } else {
        let url = config.dataset_url.as_deref().ok_or_else(|| {
            EtlError::Config(format!(
                "{} is missing and no dataset URL was given",
                archive.display()
            ))
        })?;
        download(url, &archive)?;
    }
    extract_members(&archive, &config.data_dir, &missing)
}

fn download(url: &str, dest: &Path) -> EtlResult<()> {
    info!("downloading {} to {}", url, dest.display());
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    // write beside the target first so an interrupted download is never
    // mistaken for a complete archive
    let partial = dest.with_extension("part");
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, dest)?;
    info!("downloaded {} bytes", bytes.len());
    Ok(())
}

/// Unpack the archive members named in `wanted` into `dir`, matching on file
/// name regardless of the folder they sit in inside the archive.
pub fn extract_members(archive: &Path, dir: &Path, wanted: &[&str]) -> EtlResult<()> {
    let mut zip = zip::ZipArchive::new(BufReader::new(File::open(archive)?))?;
    let mut pending: HashSet<&str> = wanted.iter().copied().collect();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            continue;
        };
        if !pending.remove(file_name.as_str()) {
            continue;
        }
        let dest = dir.join(&file_name);
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;
        info!("extracted {}", dest.display());
    }

    if !pending.is_empty() {
        let mut names: Vec<&str> = pending.into_iter().collect();
        names.sort_unstable();
        return Err(EtlError::Config(format!(
            "{} does not contain {}",
            archive.display(),
            names.join(", ")
        )));
    }
    Ok(())
}
