//! LocalObjectStore - ローカルディレクトリを bucket として扱う ObjectStore
//!
//! `<root>/<bucket>/<key>` のファイルを読み出します。

use crate::domain::{ObjectLocation, StorageError};
use crate::ports::{ObjectBody, ObjectStore};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio_util::io::ReaderStream;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// bucket と key をパスに変換
    ///
    /// root の外を指すもの（`..`, 絶対パス）は AccessDenied。
    fn path_for(&self, location: &ObjectLocation) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for part in [location.bucket.as_str(), location.key.as_str()] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(name) => path.push(name),
                    Component::CurDir => {}
                    _ => return Err(StorageError::AccessDenied(location.clone())),
                }
            }
        }
        Ok(path)
    }
}

fn map_io_error(err: io::Error, location: &ObjectLocation) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(location.clone()),
        io::ErrorKind::PermissionDenied => StorageError::AccessDenied(location.clone()),
        _ => StorageError::Transport(err.to_string()),
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectBody, StorageError> {
        let path = self.path_for(location)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| map_io_error(e, location))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| map_io_error(e, location))?;
        if metadata.is_dir() {
            return Err(StorageError::NotFound(location.clone()));
        }

        let stream = ReaderStream::new(file).map_err(|e| StorageError::Transport(e.to_string()));
        Ok(ObjectBody::new(stream).with_content_length(Some(metadata.len())))
    }
}
