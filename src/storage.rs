//! Storage port for document persistence.
//!
//! The core never opens files on its own; hosts inject a [`TextStore`] and
//! everything above works on already-resolved strings.

use std::path::{Path, PathBuf};

use crate::{
    document::Document,
    error::{MicamlError, MicamlResult},
};

pub trait TextStore {
    fn read_text(&self, path: &str) -> MicamlResult<String>;
    fn write_text(&self, path: &str, content: &str) -> MicamlResult<()>;
}

/// Filesystem-backed store rooted at a base directory.
#[derive(Clone, Debug)]
pub struct FsTextStore {
    root: PathBuf,
}

impl FsTextStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path))
    }
}

impl TextStore for FsTextStore {
    fn read_text(&self, path: &str) -> MicamlResult<String> {
        std::fs::read_to_string(self.resolve(path))
            .map_err(|e| MicamlError::storage(format!("read '{path}': {e}")))
    }

    fn write_text(&self, path: &str, content: &str) -> MicamlResult<()> {
        let resolved = self.resolve(path);
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MicamlError::storage(format!("create dir for '{path}': {e}")))?;
        }
        std::fs::write(resolved, content)
            .map_err(|e| MicamlError::storage(format!("write '{path}': {e}")))
    }
}

/// Load a CAML document through a store.
pub fn load_document(store: &dyn TextStore, path: &str) -> MicamlResult<Document> {
    let text = store.read_text(path)?;
    Document::decode(&text)
}

/// Serialize and persist a document through a store.
pub fn save_document(store: &dyn TextStore, path: &str, doc: &Document) -> MicamlResult<()> {
    store.write_text(path, &doc.encode())
}
