use async_once::AsyncOnce;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use reqwest::redirect::Policy;
use serde_derive::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use std::{fs, path};

use crate::error::{IngestError, Result};

lazy_static! {
    pub static ref REQWEST_CLIENT: AsyncOnce<reqwest::Client> = AsyncOnce::new(async {
        let result = reqwest::Client::builder().redirect(Policy::limited(5)).timeout(Duration::from_secs(900)).build();

        match result {
            Ok(request_client) => request_client,
            Err(e) => panic!("Could not create Reqwest Client: {}", e),
        }
    });
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub url: String,
    pub local_name: path::PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub fetched: Vec<path::PathBuf>,
    pub skipped: Vec<path::PathBuf>,
    pub failed: Vec<String>,
}

pub fn read_entries(path: &path::Path) -> Result<Vec<DownloadEntry>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yml::from_str(&contents)?)
}

fn partial_path(target: &path::Path) -> path::PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

async fn write_response(mut response: reqwest::Response, partial: &path::Path) -> Result<()> {
    let mut file = fs::File::create(partial)?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)?;
    }
    file.flush()?;
    Ok(())
}

async fn fetch(entry: &DownloadEntry, target: &path::Path) -> Result<()> {
    let client = REQWEST_CLIENT.get().await;
    let response = client.get(&entry.url).send().await?.error_for_status()?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(target);
    if let Err(e) = write_response(response, &partial).await {
        if partial.exists() {
            fs::remove_file(&partial)?;
        }
        return Err(e);
    }
    fs::rename(&partial, target)?;
    Ok(())
}

pub async fn fetch_all(entries: &[DownloadEntry], data_dir: &path::Path) -> DownloadReport {
    let mut report = DownloadReport::default();
    for entry in entries.iter() {
        let target = data_dir.join(&entry.local_name);
        if target.exists() {
            debug!("{:?} already present, skipping {}", target, entry.url);
            report.skipped.push(target);
            continue;
        }
        info!("downloading {} to {:?}", entry.url, target);
        match fetch(entry, &target).await {
            Ok(()) => report.fetched.push(target),
            Err(e) => {
                let e = IngestError::Download { url: entry.url.clone(), reason: e.to_string() };
                warn!("{}", e);
                report.failed.push(entry.url.clone());
            }
        }
    }
    report
}

/// Fetches every entry of a download list that is not already in `data_dir`.
pub fn run(download_file: &path::Path, data_dir: &path::Path) -> Result<DownloadReport> {
    if !download_file.exists() {
        info!("no download list at {:?}, using the data directory as-is", download_file);
        return Ok(DownloadReport::default());
    }
    let entries = read_entries(download_file)?;
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = runtime.block_on(fetch_all(&entries, data_dir));
    info!("downloads: {} fetched, {} already present, {} failed", report.fetched.len(), report.skipped.len(), report.failed.len());
    Ok(report)
}
