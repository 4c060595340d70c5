//! Profile image validation and storage.
//!
//! Images are checked for size and type before anything is uploaded. Stored
//! objects live under `profile-images/` in the photo store and are addressed
//! by the retrieval URL the store hands back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::ImageFormat;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::db::Database;
use crate::error::{Error, StoreError};
use crate::session::Session;

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const UPLOAD_PREFIX: &str = "profile-images";

const SUFFIX_LEN: usize = 13;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("image is {size} bytes; the limit is 5 MB")]
    TooLarge { size: usize },

    #[error("unsupported image type (JPEG, PNG or GIF only)")]
    UnsupportedType,

    #[error("could not store image: {0}")]
    Io(#[from] std::io::Error),

    #[error("no retrieval URL for {0}")]
    Url(String),
}

impl From<PhotoError> for Error {
    fn from(e: PhotoError) -> Self {
        match e {
            PhotoError::Io(io) => Error::Store(StoreError::Io(io)),
            other => Error::Validation(other.to_string()),
        }
    }
}

/// An image picked for upload, already checked.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    file_name: String,
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Validate size first, then sniff the type from the bytes.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, PhotoError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(PhotoError::TooLarge { size: bytes.len() });
        }
        let format = match image::guess_format(&bytes) {
            Ok(f @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif)) => f,
            _ => return Err(PhotoError::UnsupportedType),
        };

        Ok(Self {
            file_name: file_name.into(),
            format,
            bytes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, PhotoError> {
        let size = fs::metadata(path)?.len() as usize;
        if size > MAX_IMAGE_BYTES {
            return Err(PhotoError::TooLarge { size });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(name, fs::read(path)?)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Extension of the picked file, or the detected format's when it has none.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| {
                self.format
                    .extensions_str()
                    .first()
                    .copied()
                    .unwrap_or("img")
                    .to_string()
            })
    }
}

/// `profile-images/<millis>-<13 random [a-z0-9]>.<ext>`
pub fn upload_path<R: Rng + ?Sized>(image: &ImageUpload, now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!(
        "{}/{}-{}.{}",
        UPLOAD_PREFIX,
        now.timestamp_millis(),
        suffix,
        image.extension()
    )
}

/// Where uploaded images go. Returns the retrieval URL.
pub trait ObjectStore {
    fn put(&mut self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, PhotoError>;
}

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the data directory's `photos/`.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(Database::photos_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for PhotoStore {
    fn put(&mut self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, PhotoError> {
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes)?;
        debug!(path, content_type, size = bytes.len(), "stored object");

        let absolute = fs::canonicalize(&dest)?;
        Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|_| PhotoError::Url(absolute.display().to_string()))
    }
}

/// Upload a validated image. Requires a signed-in worker.
pub fn upload_photo<S: ObjectStore + ?Sized>(
    store: &mut S,
    session: &Session,
    image: &ImageUpload,
) -> Result<String, Error> {
    session.require()?;
    let path = upload_path(image, Utc::now(), &mut rand::thread_rng());
    let url = store.put(&path, image.bytes(), image.content_type())?;
    info!(path = %path, "uploaded profile image");
    Ok(url)
}
