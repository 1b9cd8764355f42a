use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, trace, warn};
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::client::Client;
use crate::file::FileMetadata;
use crate::mimetype;
use crate::store::StoreOptions;
use crate::upload::UploadOptions;
use crate::{FiledockError, Result};

/// Where the pick flow looks for files.
#[derive(Debug, Clone)]
pub enum PickSource {
    /// A single file.
    Path(PathBuf),
    /// A directory, walked recursively. Hidden entries are skipped.
    Dir(PathBuf),
}

/// One file that passed enumeration, handed to the selection hook.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub filename: String,
    pub mimetype: &'static str,
    pub size: u64,
}

/// Per-file selection hook. Returning `Err` rejects the file; the message
/// lands in the failed list verbatim.
pub type SelectHook =
    Arc<dyn Fn(&CandidateFile) -> std::result::Result<(), String> + Send + Sync>;

/// Observer of pick flow events. All methods have no-op defaults.
pub trait PickSubscriber: Send + Sync {
    fn on_upload_started(&self, _file: &CandidateFile) {}
    fn on_file_upload_finished(&self, _metadata: &FileMetadata) {}
    fn on_file_upload_failed(
        &self,
        _file: &CandidateFile,
        _error: &FiledockError,
    ) {
    }
}

/// Configuration of a pick session. Only `sources` is required.
#[derive(Clone, Default)]
pub struct PickerOptions {
    pub sources: Vec<PickSource>,
    /// Accepted extensions (`".pdf"` / `"pdf"`) or mimetypes, with
    /// wildcard subtypes (`"image/*"`). Empty accepts everything.
    pub accept: Vec<String>,
    pub max_files: Option<usize>,
    pub min_files: Option<usize>,
    /// Per-file size ceiling in bytes.
    pub max_size: Option<u64>,
    pub store_to: StoreOptions,
    pub upload: UploadOptions,
    pub on_file_selected: Option<SelectHook>,
    pub subscribers: Vec<Arc<dyn PickSubscriber>>,
}

impl fmt::Debug for PickerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickerOptions")
            .field("sources", &self.sources)
            .field("accept", &self.accept)
            .field("max_files", &self.max_files)
            .field("min_files", &self.min_files)
            .field("max_size", &self.max_size)
            .field("store_to", &self.store_to)
            .field("upload", &self.upload)
            .field("on_file_selected", &self.on_file_selected.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// A file that did not make it into storage, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub filename: String,
    pub path: Option<PathBuf>,
    pub error: String,
}

/// Batch result of a pick session.
#[derive(Debug, Clone, Serialize)]
pub struct PickerResponse {
    pub files_uploaded: Vec<FileMetadata>,
    pub files_failed: Vec<FailedFile>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

fn matches_accept(accept: &[String], candidate: &CandidateFile) -> bool {
    if accept.is_empty() {
        return true;
    }
    let extension = candidate
        .path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    accept.iter().any(|pattern| {
        if pattern.contains('/') {
            match pattern.strip_suffix("/*") {
                Some(family) => candidate
                    .mimetype
                    .starts_with(&format!("{}/", family)),
                None => candidate.mimetype == pattern,
            }
        } else {
            let wanted = pattern.strip_prefix('.').unwrap_or(pattern);
            extension.eq_ignore_ascii_case(wanted)
        }
    })
}

fn enumerate(sources: &[PickSource]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for source in sources {
        match source {
            PickSource::Path(path) => paths.push(path.clone()),
            PickSource::Dir(root) => {
                trace!("Walking picker source {}", root.display());
                let entries = WalkDir::new(root)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| !is_hidden(e));
                for entry in entries {
                    let entry = entry.map_err(std::io::Error::from)?;
                    if entry.file_type().is_file() {
                        paths.push(entry.into_path());
                    }
                }
            }
        }
    }
    Ok(paths)
}

/// Partition enumerated files into accepted candidates and early failures
/// (constraint violations and hook rejections). No I/O beyond `stat`.
pub(crate) fn select_candidates(
    options: &PickerOptions,
) -> Result<(Vec<CandidateFile>, Vec<FailedFile>)> {
    let mut accepted: Vec<CandidateFile> = Vec::new();
    let mut failed: Vec<FailedFile> = Vec::new();

    for path in enumerate(&options.sources)? {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("untitled")
            .to_owned();
        let reject = |reason: String, failed: &mut Vec<FailedFile>| {
            failed.push(FailedFile {
                filename: filename.clone(),
                path: Some(path.clone()),
                error: reason,
            });
        };

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) => {
                reject(err.to_string(), &mut failed);
                continue;
            }
        };
        let candidate = CandidateFile {
            filename: filename.clone(),
            mimetype: mimetype::from_path(&path),
            size: meta.len(),
            path: path.clone(),
        };

        if !matches_accept(&options.accept, &candidate) {
            reject("not an accepted file type".to_owned(), &mut failed);
            continue;
        }
        if let Some(max_size) = options.max_size {
            if candidate.size > max_size {
                reject(
                    format!(
                        "file exceeds maximum size of {} bytes",
                        max_size
                    ),
                    &mut failed,
                );
                continue;
            }
        }
        if let Some(max_files) = options.max_files {
            if accepted.len() >= max_files {
                reject(
                    format!("maximum of {} files reached", max_files),
                    &mut failed,
                );
                continue;
            }
        }
        if let Some(hook) = &options.on_file_selected {
            if let Err(message) = hook(&candidate) {
                reject(message, &mut failed);
                continue;
            }
        }

        accepted.push(candidate);
    }

    Ok((accepted, failed))
}

pub(crate) async fn run_pick(
    client: &Client,
    options: PickerOptions,
) -> Result<PickerResponse> {
    let (accepted, mut failed) = select_candidates(&options)?;

    if let Some(min_files) = options.min_files {
        if accepted.len() < min_files {
            return Err(FiledockError::InvalidOption(format!(
                "{} file(s) selected, at least {} required",
                accepted.len(),
                min_files
            )));
        }
    }

    info!(
        "Picking {} file(s), {} rejected during selection",
        accepted.len(),
        failed.len()
    );

    let mut uploaded = Vec::new();
    for candidate in accepted {
        for subscriber in &options.subscribers {
            subscriber.on_upload_started(&candidate);
        }
        let result = client
            .upload(
                &candidate.path,
                options.upload.clone(),
                options.store_to.clone(),
                None,
            )
            .await;
        match result {
            Ok(metadata) => {
                for subscriber in &options.subscribers {
                    subscriber.on_file_upload_finished(&metadata);
                }
                uploaded.push(metadata);
            }
            Err(err) => {
                warn!(
                    "Upload of {} failed: {}",
                    candidate.path.display(),
                    err
                );
                for subscriber in &options.subscribers {
                    subscriber.on_file_upload_failed(&candidate, &err);
                }
                failed.push(FailedFile {
                    filename: candidate.filename.clone(),
                    path: Some(candidate.path.clone()),
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(PickerResponse {
        files_uploaded: uploaded,
        files_failed: failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn candidate(name: &str, size: u64) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from(name),
            filename: name.to_owned(),
            mimetype: mimetype::from_path(name),
            size,
        }
    }

    #[test]
    fn empty_accept_list_accepts_everything() {
        assert!(matches_accept(&[], &candidate("a.xyz", 1)));
    }

    #[test]
    fn accept_by_extension_with_or_without_dot() {
        let accept = vec![".jpg".to_owned(), "png".to_owned()];
        assert!(matches_accept(&accept, &candidate("a.JPG", 1)));
        assert!(matches_accept(&accept, &candidate("b.png", 1)));
        assert!(!matches_accept(&accept, &candidate("c.gif", 1)));
    }

    #[test]
    fn accept_by_mimetype_and_wildcard() {
        let accept = vec!["image/*".to_owned(), "application/pdf".to_owned()];
        assert!(matches_accept(&accept, &candidate("a.png", 1)));
        assert!(matches_accept(&accept, &candidate("b.pdf", 1)));
        assert!(!matches_accept(&accept, &candidate("c.mp4", 1)));
    }

    #[test]
    fn selection_applies_constraints() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.jpg"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("huge.jpg"), vec![0u8; 1000]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::write(dir.path().join(".hidden.jpg"), b"x").unwrap();

        let options = PickerOptions {
            sources: vec![PickSource::Dir(dir.path().to_path_buf())],
            accept: vec!["image/*".to_owned()],
            max_size: Some(100),
            ..Default::default()
        };
        let (accepted, failed) = select_candidates(&options).unwrap();

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].filename, "ok.jpg");
        // The hidden file never shows up; the other two fail for their
        // own reasons.
        assert_eq!(failed.len(), 2);
        assert!(failed
            .iter()
            .any(|f| f.filename == "huge.jpg" && f.error.contains("size")));
        assert!(failed
            .iter()
            .any(|f| f.filename == "notes.txt" && f.error.contains("type")));
    }

    #[test]
    fn max_files_caps_the_selection() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let options = PickerOptions {
            sources: vec![PickSource::Dir(dir.path().to_path_buf())],
            max_files: Some(2),
            ..Default::default()
        };
        let (accepted, failed) = select_candidates(&options).unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.contains("maximum of 2"));
    }

    #[test]
    fn selection_hook_rejects_with_message() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.png"), b"x").unwrap();
        fs::write(dir.path().join("drop.png"), b"x").unwrap();

        let options = PickerOptions {
            sources: vec![PickSource::Dir(dir.path().to_path_buf())],
            on_file_selected: Some(Arc::new(|file: &CandidateFile| {
                if file.filename.starts_with("drop") {
                    Err("we do not want this one".to_owned())
                } else {
                    Ok(())
                }
            })),
            ..Default::default()
        };
        let (accepted, failed) = select_candidates(&options).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].filename, "keep.png");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error, "we do not want this one");
    }

    #[test]
    fn missing_explicit_path_is_reported_not_fatal() {
        let options = PickerOptions {
            sources: vec![PickSource::Path(PathBuf::from(
                "/definitely/not/here.bin",
            ))],
            ..Default::default()
        };
        let (accepted, failed) = select_candidates(&options).unwrap();
        assert!(accepted.is_empty());
        assert_eq!(failed.len(), 1);
    }
}
