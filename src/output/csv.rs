//! CSV-backed sink with duplicate-safe append
//!
//! One file per item type (`posts.csv`, `comments.csv`) under an output
//! directory. Ids already present in the files are loaded into an index when
//! the sink is opened, so re-running a collection against the same directory
//! appends only items that are genuinely new.

use async_trait::async_trait;
use csv::{Reader, Writer, WriterBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::output::{ItemSink, SinkError};
use crate::{RedditComment, RedditPost};

const BUFFER_SIZE: usize = 8192;

struct CsvFile {
    writer: Writer<BufWriter<File>>,
    seen_ids: HashSet<String>,
    written: u64,
}

impl CsvFile {
    fn open<T>(path: &Path, id_of: fn(&T) -> &str) -> Result<Self, SinkError>
    where
        T: DeserializeOwned,
    {
        let mut seen_ids = HashSet::new();

        if path.exists() {
            let mut reader =
                Reader::from_path(path).map_err(|e| SinkError::Io(e.to_string()))?;
            for record in reader.deserialize::<T>() {
                let item = record.map_err(|e| SinkError::Encoding(e.to_string()))?;
                seen_ids.insert(id_of(&item).to_string());
            }
            debug!(path = %path.display(), existing = seen_ids.len(), "Loaded id index");
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::Io(e.to_string()))?;

        // Header only when the file holds no bytes yet. An earlier run may
        // have created the file without storing anything, so existence alone
        // says nothing about whether the header row was written.
        let is_empty = file
            .metadata()
            .map_err(|e| SinkError::Io(e.to_string()))?
            .len()
            == 0;

        let writer = WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(BufWriter::with_capacity(BUFFER_SIZE, file));

        Ok(Self {
            writer,
            seen_ids,
            written: 0,
        })
    }

    fn append<T>(&mut self, items: &[T], id_of: fn(&T) -> &str) -> Result<usize, SinkError>
    where
        T: serde::Serialize,
    {
        let mut stored = 0;
        for item in items {
            if !self.seen_ids.insert(id_of(item).to_string()) {
                continue;
            }
            self.writer
                .serialize(item)
                .map_err(|e| SinkError::Encoding(e.to_string()))?;
            stored += 1;
        }
        if stored > 0 {
            self.writer
                .flush()
                .map_err(|e| SinkError::Io(e.to_string()))?;
            self.written += stored as u64;
        }
        Ok(stored)
    }
}

/// CSV sink writing `posts.csv` and `comments.csv` under one directory
pub struct CsvSink {
    posts: Mutex<CsvFile>,
    comments: Mutex<CsvFile>,
    dir: PathBuf,
}

impl CsvSink {
    /// Open (or create) the sink under `dir`, loading existing ids so
    /// duplicates are skipped across runs.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| SinkError::Io(e.to_string()))?;

        let posts = CsvFile::open::<RedditPost>(&dir.join("posts.csv"), |p| &p.id)?;
        let comments = CsvFile::open::<RedditComment>(&dir.join("comments.csv"), |c| &c.id)?;

        info!(
            dir = %dir.display(),
            known_posts = posts.seen_ids.len(),
            known_comments = comments.seen_ids.len(),
            "Opened CSV sink"
        );

        Ok(Self {
            posts: Mutex::new(posts),
            comments: Mutex::new(comments),
            dir,
        })
    }

    /// Output directory this sink writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Posts appended by this sink instance (excludes pre-existing rows).
    pub fn posts_written(&self) -> u64 {
        self.lock(&self.posts).written
    }

    /// Comments appended by this sink instance.
    pub fn comments_written(&self) -> u64 {
        self.lock(&self.comments).written
    }

    fn lock<'a>(&self, file: &'a Mutex<CsvFile>) -> std::sync::MutexGuard<'a, CsvFile> {
        file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ItemSink for CsvSink {
    async fn upsert_posts(&self, posts: &[RedditPost]) -> Result<usize, SinkError> {
        self.lock(&self.posts).append(posts, |p| &p.id)
    }

    async fn upsert_comments(&self, comments: &[RedditComment]) -> Result<usize, SinkError> {
        self.lock(&self.comments).append(comments, |c| &c.id)
    }
}
