//! One JSON collection file: `{"<root>": [record, ...]}`.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use tokio::sync::Mutex;

use smartcode_domain::error::SmartHomeError;

use crate::error::StorageError;

/// A collection file. Every access re-reads the file; mutations write it
/// back through a temporary file and a rename. Access is serialised by an
/// async mutex, so one `JsonFile` must own each path.
pub(crate) struct JsonFile<R> {
    path: PathBuf,
    root: &'static str,
    lock: Mutex<()>,
    marker: PhantomData<fn() -> R>,
}

impl<R> JsonFile<R>
where
    R: Serialize + DeserializeOwned + Send,
{
    pub(crate) fn new(path: impl Into<PathBuf>, root: &'static str) -> Self {
        Self {
            path: path.into(),
            root,
            lock: Mutex::new(()),
            marker: PhantomData,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn json_error(&self, source: serde_json::Error) -> StorageError {
        StorageError::Json {
            path: self.path.clone(),
            source,
        }
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn load(&self) -> Result<Vec<R>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let mut document: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|err| self.json_error(err))?;
        match document.remove(self.root) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|err| self.json_error(err)),
        }
    }

    async fn store(&self, records: &[R]) -> Result<(), StorageError> {
        let mut document = Map::new();
        document.insert(
            self.root.to_string(),
            serde_json::to_value(records).map_err(|err| self.json_error(err))?,
        );

        let mut buf = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        Value::Object(document)
            .serialize(&mut serializer)
            .map_err(|err| self.json_error(err))?;
        buf.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &buf)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "collection saved");
        Ok(())
    }

    /// Snapshot of the collection.
    pub(crate) async fn read(&self) -> Result<Vec<R>, StorageError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Load the collection, run `f` on it and save it when `f` reports a
    /// change (the `bool` in its result).
    pub(crate) async fn modify<T, F>(&self, f: F) -> Result<T, SmartHomeError>
    where
        T: Send,
        F: FnOnce(&mut Vec<R>) -> Result<(T, bool), SmartHomeError> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let (value, dirty) = f(&mut records)?;
        if dirty {
            self.store(&records).await?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_treat_missing_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<u32> = JsonFile::new(dir.path().join("numbers.json"), "numbers");
        assert!(file.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_write_four_space_indented_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.json");
        let file: JsonFile<u32> = JsonFile::new(&path, "numbers");

        file.modify(|records| {
            records.push(7);
            Ok(((), true))
        })
        .await
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"numbers\": [\n        7\n    ]\n}\n");
        assert_eq!(file.read().await.unwrap(), vec![7]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn should_not_write_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.json");
        let file: JsonFile<u32> = JsonFile::new(&path, "numbers");

        let len = file.modify(|records| Ok((records.len(), false))).await.unwrap();
        assert_eq!(len, 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn should_report_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.json");
        std::fs::write(&path, "{ not json").unwrap();
        let file: JsonFile<u32> = JsonFile::new(&path, "numbers");

        assert!(matches!(
            file.read().await,
            Err(StorageError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn should_treat_missing_root_key_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.json");
        std::fs::write(&path, "{\"other\": [1, 2]}").unwrap();
        let file: JsonFile<u32> = JsonFile::new(&path, "numbers");

        assert!(file.read().await.unwrap().is_empty());
    }
}
