use crate::types::AnalysisResult;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ANALYSIS_SUFFIX: &str = "_analysis.json";

/// Storage abstraction for persisted analysis results
pub trait ResultStorage {
    /// Persist a result under its deterministic name; returns where it went.
    fn store_result(&self, result: &AnalysisResult) -> Result<PathBuf>;

    /// Load one persisted result by path.
    fn load_result(&self, path: &Path) -> Result<AnalysisResult>;

    /// Overwrite an existing result file in place.
    fn replace_result(&self, path: &Path, result: &AnalysisResult) -> Result<()>;

    /// Every stored result file, in sorted order.
    fn list_results(&self) -> Result<Vec<PathBuf>>;
}

/// Result file name for an input document: extension replaced by the analysis suffix.
pub fn analysis_file_name(input_filename: &str) -> String {
    let stem = Path::new(input_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{stem}{ANALYSIS_SUFFIX}")
}

/// Write through a sibling temporary file so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid output path: {}", path.display()))?;
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, contents)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        let _ = fs::remove_file(&tmp_path);
        format!("Failed to move {} into place", path.display())
    })?;
    Ok(())
}

/// File-based storage implementation using one JSON file per document
pub struct FileStorage {
    analysis_dir: PathBuf,
}

impl FileStorage {
    pub fn new(analysis_dir: impl AsRef<Path>) -> Result<Self> {
        let analysis_dir = analysis_dir.as_ref().to_path_buf();
        fs::create_dir_all(&analysis_dir).with_context(|| {
            format!("Failed to create analysis directory {}", analysis_dir.display())
        })?;
        Ok(Self { analysis_dir })
    }

    pub fn result_path(&self, input_filename: &str) -> PathBuf {
        self.analysis_dir.join(analysis_file_name(input_filename))
    }

    pub fn analysis_dir(&self) -> &Path {
        &self.analysis_dir
    }
}

impl ResultStorage for FileStorage {
    fn store_result(&self, result: &AnalysisResult) -> Result<PathBuf> {
        let path = self.result_path(&result.filename);
        self.replace_result(&path, result)?;
        Ok(path)
    }

    fn load_result(&self, path: &Path) -> Result<AnalysisResult> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result = AnalysisResult::from_json(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(result)
    }

    fn replace_result(&self, path: &Path, result: &AnalysisResult) -> Result<()> {
        let json = result
            .to_json_pretty()
            .map_err(|e| anyhow!("Failed to serialize analysis result: {}", e))?;
        write_atomic(path, &json)
    }

    fn list_results(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.analysis_dir)
            .with_context(|| format!("Failed to list {}", self.analysis_dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}
