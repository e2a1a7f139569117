//! Cover image storage confined to a single managed directory.
//!
//! Covers arrive either as a client upload or as a remote URL. Both end up as
//! a file directly under the managed root, named by a random identifier, and
//! are referenced from a book by a public path of the form
//! `/uploads/covers/<name>`.
//!
//! Every resolved path is normalised and checked to be a direct child of the
//! root before anything is written or removed. Filenames are random, but their
//! extensions come from client filenames, so the check must hold on every
//! path.

use crate::model::CoverUpload;
use reqwest::{Client, StatusCode, Url, header::CONTENT_TYPE, redirect::Policy};
use std::{
    ffi::OsStr,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// URL prefix under which stored covers are served.
pub const PUBLIC_PREFIX: &str = "/uploads/covers/";

/// Remote hosts covers may be downloaded from unless configured otherwise.
pub const DEFAULT_ALLOWED_PREFIXES: &[&str] = &[
    "https://books.google.com/",
    "https://covers.openlibrary.org/",
];

pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];
const MAX_REDIRECTS: usize = 10;

/// Largest remote cover body that is stored.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CoverStorage {
    root_path: PathBuf,
    allowed_prefixes: Vec<String>,
    max_download_bytes: usize,
    client: Client,
}

impl CoverStorage {
    /// Opens cover storage at `root` with the default allow-list and timeout.
    ///
    /// The directory is created if it does not exist yet.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<CoverStorage, CoverError> {
        Self::with_options(
            root,
            DEFAULT_ALLOWED_PREFIXES.iter().map(|p| p.to_string()),
            DEFAULT_DOWNLOAD_TIMEOUT,
        )
    }

    /// Opens cover storage at `root`.
    ///
    /// # Arguments
    /// * `root` - Directory all covers are stored in. Created if absent.
    /// * `allowed_prefixes` - URL prefixes remote covers may be fetched from.
    /// * `timeout` - Upper bound for a whole remote download.
    ///
    /// # Errors
    /// - `CoverError::Io` if the directory cannot be created or resolved.
    /// - `CoverError::Http` if the HTTP client cannot be built.
    pub fn with_options<P, I>(
        root: P,
        allowed_prefixes: I,
        timeout: Duration,
    ) -> Result<CoverStorage, CoverError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = String>,
    {
        fs::create_dir_all(root.as_ref())?;
        let root_path = fs::canonicalize(root.as_ref())?;
        let allowed_prefixes: Vec<String> = allowed_prefixes.into_iter().collect();

        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect_policy(allowed_prefixes.clone()))
            .build()?;

        Ok(CoverStorage {
            root_path,
            allowed_prefixes,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            client,
        })
    }

    /// Sets the largest remote cover body that is stored.
    pub fn with_max_download_bytes(mut self, limit: usize) -> Self {
        self.max_download_bytes = limit;
        self
    }

    /// Absolute, canonical path of the managed root.
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Stores an uploaded cover and returns its public path.
    ///
    /// Only `image/jpeg` and `image/png` are accepted, judged by the declared
    /// content type. The extension of the stored file is taken from the last
    /// `.`-delimited suffix of the declared filename, if there is one.
    ///
    /// # Errors
    /// - `CoverError::UnsupportedMediaType` if the content type is missing or not accepted.
    /// - `CoverError::InvalidPath` if the target would not be a direct child of the root.
    /// - `CoverError::Io` if the file cannot be written.
    pub fn save_upload(&self, upload: &CoverUpload) -> Result<String, CoverError> {
        let content_type = upload.content_type.as_deref().unwrap_or_default();
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            return Err(CoverError::UnsupportedMediaType {
                content_type: upload.content_type.clone(),
            });
        }

        let extension = upload
            .filename
            .as_deref()
            .map(derive_extension)
            .unwrap_or_default();

        let filename = generate_filename(extension);
        let target = self
            .resolve(&filename)
            .ok_or_else(|| CoverError::InvalidPath {
                filename: filename.clone(),
            })?;

        write_new_file(&target, &upload.bytes)?;
        debug!(path = %target.display(), size = upload.bytes.len(), "stored uploaded cover");

        Ok(public_path(&filename))
    }

    /// Downloads a remote cover and returns its public path.
    ///
    /// This is best-effort: URLs outside the allow-list, non-200 responses,
    /// oversized bodies and any transport or filesystem failure all yield
    /// `None`. Redirects are followed only while every hop stays on the
    /// allow-list and never moves from `https` to `http`.
    pub async fn download(&self, url: &str) -> Option<String> {
        if !self.is_allowed(url) {
            debug!(url, "cover url is not allow-listed, skipping download");
            return None;
        }

        match self.try_download(url).await {
            Ok(path) => path,
            Err(e) => {
                warn!(url, error = %e, "failed to download cover");
                None
            }
        }
    }

    /// Removes the file behind a public cover path.
    ///
    /// Only the text after the last `/` is used. Paths that do not resolve to a
    /// file directly under the root are ignored, and removal failures are
    /// logged and swallowed.
    pub fn delete(&self, public_path: Option<&str>) {
        let Some(public_path) = public_path else {
            return;
        };

        let Some(target) = self.resolve(file_name_of(public_path)) else {
            debug!(public_path, "cover path does not resolve inside the root, not deleting");
            return;
        };

        match fs::remove_file(&target) {
            Ok(()) => debug!(path = %target.display(), "removed cover"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %target.display(), error = %e, "failed to remove cover"),
        }
    }

    /// Returns the absolute location of a stored cover, if the file exists.
    pub fn locate(&self, public_path: &str) -> Option<PathBuf> {
        self.resolve(file_name_of(public_path))
            .filter(|path| path.is_file())
    }

    fn is_allowed(&self, url: &str) -> bool {
        is_allowed(&self.allowed_prefixes, url)
    }

    async fn try_download(&self, url: &str) -> Result<Option<String>, CoverError> {
        let mut response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            debug!(url, status = %response.status(), "cover download was not successful");
            return Ok(None);
        }

        let extension = extension_for_content_type(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default(),
        );

        let limit = self.max_download_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            debug!(url, limit, "cover is larger than the download limit");
            return Ok(None);
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                debug!(url, limit, "cover is larger than the download limit");
                return Ok(None);
            }
            bytes.extend_from_slice(&chunk);
        }

        let filename = generate_filename(extension);
        let target = self
            .resolve(&filename)
            .ok_or_else(|| CoverError::InvalidPath {
                filename: filename.clone(),
            })?;

        write_new_file(&target, &bytes)?;
        debug!(url, path = %target.display(), size = bytes.len(), "stored downloaded cover");

        Ok(Some(public_path(&filename)))
    }

    /// Resolves `filename` under the root.
    ///
    /// Returns `None` unless the normalised result is a direct child of the root
    /// named exactly `filename`.
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let candidate = normalize(&self.root_path.join(filename));

        let is_child = candidate.parent() == Some(self.root_path.as_path())
            && candidate.file_name() == Some(OsStr::new(filename));

        is_child.then_some(candidate)
    }
}

/// Errors that can occur while storing or fetching covers.
#[derive(Debug, Error)]
pub enum CoverError {
    /// Declared content type is not `image/jpeg` or `image/png`.
    #[error("unsupported media type: {}", .content_type.as_deref().unwrap_or("unknown"))]
    UnsupportedMediaType { content_type: Option<String> },

    /// Resolved target escaped the managed root.
    #[error("invalid file path: {filename}")]
    InvalidPath { filename: String },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

fn is_allowed(prefixes: &[String], url: &str) -> bool {
    prefixes.iter().any(|prefix| url.starts_with(prefix.as_str()))
}

fn redirect_policy(allowed_prefixes: Vec<String>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if follows_redirect(&allowed_prefixes, attempt.previous(), attempt.url()) {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// A redirect hop must stay on the allow-list and must not leave `https` for `http`.
fn follows_redirect(allowed_prefixes: &[String], previous: &[Url], next: &Url) -> bool {
    let downgrade = next.scheme() == "http" && previous.iter().any(|url| url.scheme() == "https");

    !downgrade && is_allowed(allowed_prefixes, next.as_str())
}

/// Returns the last `.`-delimited suffix of `filename`, dot included.
fn derive_extension(filename: &str) -> &str {
    filename.rfind('.').map(|i| &filename[i..]).unwrap_or("")
}

fn extension_for_content_type(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        ".png"
    } else {
        ".jpg"
    }
}

fn generate_filename(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension)
}

fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}{filename}")
}

fn file_name_of(public_path: &str) -> &str {
    public_path.rsplit('/').next().unwrap_or(public_path)
}

/// Lexically normalises a path, resolving `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

fn write_new_file(path: &Path, bytes: &[u8]) -> Result<(), CoverError> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    if let Err(e) = file.write_all(bytes) {
        let _ = fs::remove_file(path);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        cover::{
            CoverError, CoverStorage, PUBLIC_PREFIX, derive_extension, follows_redirect,
            normalize,
        },
        model::CoverUpload,
    };
    use reqwest::Url;
    use std::{fs, path::PathBuf, time::Duration};
    use tempfile::TempDir;

    pub(crate) type StubResponse = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

    pub(crate) const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

    fn png_upload(filename: &str) -> CoverUpload {
        CoverUpload {
            bytes: PNG_BYTES.to_vec(),
            content_type: Some("image/png".to_string()),
            filename: Some(filename.to_string()),
        }
    }

    pub(crate) fn header(name: &str, value: &str) -> tiny_http::Header {
        tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap()
    }

    /// Serves every request with `route` on a background thread and returns the base url.
    pub(crate) fn spawn_stub(route: fn(&str) -> StubResponse) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();

        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let response = route(request.url());
                let _ = request.respond(response);
            }
        });

        format!("http://{addr}/")
    }

    pub(crate) fn png_stub() -> String {
        spawn_stub(|_| {
            tiny_http::Response::from_data(PNG_BYTES.to_vec())
                .with_header(header("Content-Type", "image/png"))
        })
    }

    pub(crate) fn stub_storage(tmp_dir: &TempDir, base_url: &str) -> CoverStorage {
        CoverStorage::with_options(
            tmp_dir.path(),
            [base_url.to_string()],
            Duration::from_secs(5),
        )
        .unwrap()
    }

    pub(crate) fn stored_files(storage: &CoverStorage) -> Vec<PathBuf> {
        fs::read_dir(storage.root())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_open_creates_root() {
        let tmp_dir = TempDir::new().unwrap();
        let root = tmp_dir.path().join("uploads/covers");

        let storage = CoverStorage::open(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(fs::canonicalize(&root).unwrap(), storage.root());
    }

    #[test]
    fn test_derive_extension() {
        assert_eq!(".png", derive_extension("cover.png"));
        assert_eq!(".gz", derive_extension("cover.tar.gz"));
        assert_eq!("", derive_extension("cover"));
        assert_eq!(".", derive_extension("cover."));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            PathBuf::from("/root/covers/a.png"),
            normalize(&PathBuf::from("/root/covers/./x/../a.png"))
        );
        assert_eq!(
            PathBuf::from("/etc/passed"),
            normalize(&PathBuf::from("/root/covers/../../../etc/passed"))
        );
    }

    #[test]
    fn test_save_upload() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        let path = storage.save_upload(&png_upload("dune.png")).unwrap();

        assert!(path.starts_with(PUBLIC_PREFIX));
        assert!(path.ends_with(".png"));

        let stored = storage.locate(&path).unwrap();
        assert_eq!(PNG_BYTES, fs::read(stored).unwrap().as_slice());
    }

    #[test]
    fn test_save_upload_generates_unique_names() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        let first = storage.save_upload(&png_upload("dune.png")).unwrap();
        let second = storage.save_upload(&png_upload("dune.png")).unwrap();

        assert_ne!(first, second);
        assert_eq!(2, stored_files(&storage).len());
    }

    #[test]
    fn test_save_upload_without_extension() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        let mut upload = png_upload("cover");
        upload.content_type = Some("image/jpeg".to_string());
        let path = storage.save_upload(&upload).unwrap();

        let name = path.strip_prefix(PUBLIC_PREFIX).unwrap();
        assert!(!name.contains('.'));
        assert!(storage.locate(&path).is_some());
    }

    #[test]
    fn test_save_upload_rejects_unsupported_media_type() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        for content_type in [Some("image/gif"), Some("image/png; charset=x"), None] {
            let mut upload = png_upload("cover.gif");
            upload.content_type = content_type.map(String::from);

            let result = storage.save_upload(&upload);
            let Err(CoverError::UnsupportedMediaType { .. }) = result else {
                panic!("Expected UnsupportedMediaType error, but got {:?}", result);
            };
        }

        assert!(stored_files(&storage).is_empty());
    }

    #[test]
    fn test_save_upload_rejects_traversal() {
        let tmp_dir = TempDir::new().unwrap();
        let root = tmp_dir.path().join("covers");
        let storage = CoverStorage::open(&root).unwrap();

        for filename in [
            "cover.png/../../../etc/passed",
            "x.x/../../../../etc/passed",
            "cover./../../escaped",
        ] {
            let result = storage.save_upload(&png_upload(filename));
            let Err(CoverError::InvalidPath { .. }) = result else {
                panic!("Expected InvalidPath error for {filename}, but got {:?}", result);
            };
        }

        assert!(stored_files(&storage).is_empty());
        assert!(!tmp_dir.path().join("escaped").exists());
    }

    #[test]
    fn test_resolve_confines_to_root() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path().join("covers")).unwrap();

        assert!(storage.resolve("a.png").is_some());
        assert!(storage.resolve("../../../etc/passed").is_none());
        assert!(storage.resolve("nested/a.png").is_none());
        assert!(storage.resolve("..").is_none());
        assert!(storage.resolve("").is_none());
        assert!(storage.resolve("/etc/passed").is_none());
        assert!(storage.resolve("a./").is_none());
        assert!(storage.resolve("a/../b.png").is_none());
    }

    #[test]
    fn test_delete_round_trip() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        let path = storage.save_upload(&png_upload("dune.png")).unwrap();
        assert!(storage.locate(&path).is_some());

        storage.delete(Some(&path));
        assert!(storage.locate(&path).is_none());
        assert!(stored_files(&storage).is_empty());

        // Already gone: still fine.
        storage.delete(Some(&path));
    }

    #[test]
    fn test_delete_after_external_removal() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        let path = storage.save_upload(&png_upload("dune.png")).unwrap();
        fs::remove_file(storage.locate(&path).unwrap()).unwrap();

        storage.delete(Some(&path));
    }

    #[test]
    fn test_delete_ignores_paths_outside_root() {
        let tmp_dir = TempDir::new().unwrap();
        let outside = tmp_dir.path().join("keep.png");
        fs::write(&outside, PNG_BYTES).unwrap();
        let storage = CoverStorage::open(tmp_dir.path().join("covers")).unwrap();

        storage.delete(None);
        storage.delete(Some("/uploads/covers/"));
        storage.delete(Some("/uploads/covers/.."));
        storage.delete(Some("../keep.png"));

        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_download_skips_untrusted_url() {
        let tmp_dir = TempDir::new().unwrap();
        let storage = CoverStorage::open(tmp_dir.path()).unwrap();

        assert_eq!(None, storage.download("https://evil.example.com/x.jpg").await);
        assert_eq!(
            None,
            storage
                .download("https://books.google.com.evil.example.com/x.jpg")
                .await
        );
        assert!(stored_files(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_download_png() {
        let base_url = png_stub();
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url);

        let path = storage
            .download(&format!("{base_url}cover"))
            .await
            .unwrap();

        assert!(path.starts_with(PUBLIC_PREFIX));
        assert!(path.ends_with(".png"));
        assert_eq!(
            PNG_BYTES,
            fs::read(storage.locate(&path).unwrap()).unwrap().as_slice()
        );
    }

    #[tokio::test]
    async fn test_download_defaults_to_jpg() {
        let base_url = spawn_stub(|_| {
            tiny_http::Response::from_data(b"jpeg bytes".to_vec())
                .with_header(header("Content-Type", "application/octet-stream"))
        });
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url);

        let path = storage.download(&format!("{base_url}cover")).await.unwrap();

        assert!(path.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_download_follows_redirects() {
        let base_url = spawn_stub(|url| {
            if url == "/moved" {
                tiny_http::Response::from_data(Vec::<u8>::new())
                    .with_status_code(302)
                    .with_header(header("Location", "/cover.png"))
            } else {
                tiny_http::Response::from_data(PNG_BYTES.to_vec())
                    .with_header(header("Content-Type", "image/png"))
            }
        });
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url);

        let path = storage.download(&format!("{base_url}moved")).await.unwrap();

        assert!(path.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_download_non_ok_status() {
        let base_url = spawn_stub(|_| {
            tiny_http::Response::from_data(b"missing".to_vec()).with_status_code(404)
        });
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url);

        assert_eq!(None, storage.download(&format!("{base_url}cover")).await);
        assert!(stored_files(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_download_transport_failure() {
        let tmp_dir = TempDir::new().unwrap();
        // Nothing listens on port 9 of the loopback interface.
        let storage = stub_storage(&tmp_dir, "http://127.0.0.1:9/");

        assert_eq!(None, storage.download("http://127.0.0.1:9/cover").await);
    }

    #[tokio::test]
    async fn test_download_stops_at_redirect_off_allow_list() {
        let base_url = spawn_stub(|_| {
            tiny_http::Response::from_data(Vec::<u8>::new())
                .with_status_code(302)
                .with_header(header("Location", "http://127.0.0.1:9/cover.png"))
        });
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url);

        assert_eq!(None, storage.download(&format!("{base_url}moved")).await);
        assert!(stored_files(&storage).is_empty());
    }

    #[test]
    fn test_follows_redirect() {
        let allowed = vec![
            "https://covers.example.com/".to_string(),
            "http://covers.example.com/".to_string(),
        ];
        let https = [Url::parse("https://covers.example.com/a").unwrap()];
        let http = [Url::parse("http://covers.example.com/a").unwrap()];

        let next_https = Url::parse("https://covers.example.com/b.png").unwrap();
        let next_http = Url::parse("http://covers.example.com/b.png").unwrap();
        let elsewhere = Url::parse("https://evil.example.com/b.png").unwrap();

        assert!(follows_redirect(&allowed, &https, &next_https));
        assert!(follows_redirect(&allowed, &http, &next_http));
        assert!(follows_redirect(&allowed, &http, &next_https));
        assert!(!follows_redirect(&allowed, &https, &next_http));
        assert!(!follows_redirect(&allowed, &https, &elsewhere));
    }

    #[tokio::test]
    async fn test_download_rejects_oversized_body() {
        let base_url = png_stub();
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url).with_max_download_bytes(8);

        assert_eq!(None, storage.download(&format!("{base_url}cover")).await);
        assert!(stored_files(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_download_rejects_oversized_body_without_length() {
        let base_url = spawn_stub(|_| {
            tiny_http::Response::new(
                tiny_http::StatusCode(200),
                vec![header("Content-Type", "image/png")],
                std::io::Cursor::new(PNG_BYTES.to_vec()),
                None,
                None,
            )
        });
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url).with_max_download_bytes(8);

        assert_eq!(None, storage.download(&format!("{base_url}cover")).await);
        assert!(stored_files(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_download_at_limit() {
        let base_url = png_stub();
        let tmp_dir = TempDir::new().unwrap();
        let storage = stub_storage(&tmp_dir, &base_url).with_max_download_bytes(PNG_BYTES.len());

        let path = storage.download(&format!("{base_url}cover")).await.unwrap();

        assert!(storage.locate(&path).is_some());
    }
}
