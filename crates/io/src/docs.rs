// Source documents stored as `<dir>/<key>.txt`

use std::path::PathBuf;

use medx_eval::grounding::DocumentSource;

use crate::csv::read_file_as_utf8;

#[derive(Debug, Clone)]
pub struct TextDirSource {
    dir: PathBuf,
}

impl TextDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the document for `key`. Keys that would leave the directory have none.
    pub fn document_path(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return None;
        }
        Some(self.dir.join(format!("{key}.txt")))
    }
}

impl DocumentSource for TextDirSource {
    fn document_text(&self, key: &str) -> Result<Option<String>, String> {
        let Some(path) = self.document_path(key) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        read_file_as_utf8(&path).map(Some).map_err(|e| e.to_string())
    }
}
