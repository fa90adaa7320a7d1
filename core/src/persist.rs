//! On-disk snapshots of the index and the document store.
//!
//! Every structure is written as one bincode blob; the header is JSON so
//! it can be inspected by hand.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub index_merge_size: u32,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_dir(&self) -> PathBuf { self.root.join("idx") }
    /// Prefix shared by every lite index file: `<base_dir>/idx/lite.`
    pub fn lite_prefix(&self) -> String { format!("{}/idx/lite.", self.root.display()) }
    pub fn lite_lexicon(&self) -> PathBuf { PathBuf::from(format!("{}lexicon", self.lite_prefix())) }
    pub fn lite_hit_buffer(&self) -> PathBuf { PathBuf::from(format!("{}hb", self.lite_prefix())) }
    pub fn main_dir(&self) -> PathBuf { self.index_dir().join("main") }
    pub fn main_lexicon(&self) -> PathBuf { self.main_dir().join("lexicon") }
    pub fn main_postings(&self) -> PathBuf { self.main_dir().join("postings") }
    pub fn meta(&self) -> PathBuf { self.index_dir().join("meta.json") }
    pub fn documents(&self) -> PathBuf { self.root.join("documents.bin") }
}

pub fn save_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf)?;
    Ok(value)
}

/// Loads `path` if it exists; a missing file is not an error.
pub fn load_bincode_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    load_bincode(path).map(Some)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(paths.index_dir())?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<Option<MetaFile>> {
    let path = paths.meta();
    if !path.exists() {
        return Ok(None);
    }
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(Some(meta))
}

/// Total size in bytes of every file under `dir`; 0 if it does not exist.
pub fn directory_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}
