/*!
 * Corpus persistence: a directory of pretty-printed JSON files, one per
 * source block, searched recursively.
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::CorpusError;

use super::{Corpus, CorpusFile};

/// Reads and writes corpus files under a root directory
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every `*.json` file below the root, sorted by path
    pub fn load_all(&self) -> Result<Vec<(PathBuf, CorpusFile)>, CorpusError> {
        if !self.root.exists() {
            warn!("Corpus directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable corpus entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let file = Self::read_file(&path)?;
            debug!("Loaded {} test cases for block '{}' from {}", file.cases.len(), file.block, path.display());
            files.push((path, file));
        }

        Ok(files)
    }

    /// All cases from all files in one corpus
    pub fn load_merged(&self) -> Result<Corpus, CorpusError> {
        let mut merged = Corpus::new();
        for (_, file) in self.load_all()? {
            merged.extend(file.cases);
        }
        info!("Loaded corpus with {} test cases from {}", merged.len(), self.root.display());
        Ok(merged)
    }

    /// Validate every file; returns all failures
    pub fn validate_all(&self) -> Result<Vec<CorpusError>, CorpusError> {
        Ok(self
            .load_all()?
            .iter()
            .flat_map(|(_, file)| file.cases.validate(&file.block))
            .collect())
    }

    /// Path of the file holding `block`
    pub fn path_for_block(&self, block: &str) -> PathBuf {
        let file_name: String = block
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", file_name))
    }

    /// Merge `cases` into the block's file, creating it if needed.
    ///
    /// Verified cases already on disk are never altered. Returns the number of
    /// cases added or replaced.
    pub fn append(&self, block: &str, cases: Corpus) -> Result<usize, CorpusError> {
        let path = self.path_for_block(block);
        let mut file = if path.exists() {
            Self::read_file(&path)?
        } else {
            CorpusFile::new(block, Corpus::new())
        };

        let changed = file.cases.merge_from(cases);
        if changed > 0 {
            self.write_file(&path, &file)?;
            info!("Recorded {} test cases for block '{}' in {}", changed, block, path.display());
        }
        Ok(changed)
    }

    fn read_file(path: &Path) -> Result<CorpusFile, CorpusError> {
        let content = fs::read_to_string(path).map_err(|e| CorpusError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|source| CorpusError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write atomically: temp file in the same directory, then rename
    fn write_file(&self, path: &Path, file: &CorpusFile) -> Result<(), CorpusError> {
        let io_error = |e: std::io::Error| CorpusError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        fs::create_dir_all(&self.root).map_err(io_error)?;
        let json = serde_json::to_string_pretty(file).map_err(|source| CorpusError::Json {
            path: path.display().to_string(),
            source,
        })?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.root).map_err(io_error)?;
        temp.write_all(json.as_bytes()).map_err(io_error)?;
        temp.write_all(b"\n").map_err(io_error)?;
        temp.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}
