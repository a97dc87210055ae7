//! File-based announcement log with persistence.
//!
//! Appends one line per record, so a crash can at worst leave a torn last
//! line. Suitable for single-node deployments where durability is needed.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use wraith_core::error::{Result, StealthError};
use wraith_core::traits::{AnnouncementLog, AnnouncementStream};
use wraith_core::types::AnnouncedStealth;

/// File format magic
const MAGIC: &str = "WRAITHLOG";
/// Current file format version
const VERSION: u8 = 1;

/// Options for opening a [`FileLog`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FileLogOptions {
    /// `fsync` after every append
    pub sync_writes: bool,
}

impl FileLogOptions {
    /// Enables or disables `fsync` after every append.
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }
}

struct Writer {
    file: fs::File,
    next_index: u64,
    /// File length after the last complete record
    committed_len: u64,
    /// A failed append may have left a partial line past `committed_len`
    torn: bool,
}

impl Writer {
    /// Cuts the file back to the last complete record.
    async fn rollback(&mut self) -> Result<()> {
        self.file.set_len(self.committed_len).await?;
        self.torn = false;
        Ok(())
    }
}

/// File-based announcement log.
///
/// # File Format
///
/// ```text
/// WRAITHLOG 1\n              header: magic and version
/// <hex(record 0)>\n          binary record, see AnnouncedStealth::to_bytes
/// <hex(record 1)>\n
/// ...
/// ```
///
/// Line `n` after the header holds sequence index `n`. A line that does not
/// decode, or whose embedded index disagrees with its position, is yielded
/// as a `MalformedAnnouncement` item; reading continues past it.
pub struct FileLog {
    /// Path to the log file
    path: PathBuf,
    /// Append handle; the lock serializes index assignment
    writer: Mutex<Writer>,
    options: FileLogOptions,
}

impl FileLog {
    /// Opens the log at `path`, creating it if missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, FileLogOptions::default()).await
    }

    /// Opens the log with custom options.
    #[instrument(skip_all)]
    pub async fn open_with(path: impl AsRef<Path>, options: FileLogOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let next_index = if fs::try_exists(&path).await? {
            let count = Self::count_records(&path).await?;
            Self::terminate_last_line(&path).await?;
            info!(count, path = ?path, "Opened announcement log");
            count
        } else {
            fs::write(&path, format!("{MAGIC} {VERSION}\n")).await?;
            info!(path = ?path, "Created announcement log");
            0
        };

        let file = OpenOptions::new().append(true).open(&path).await?;
        let committed_len = file.metadata().await?.len();

        Ok(Self {
            path,
            writer: Mutex::new(Writer {
                file,
                next_index,
                committed_len,
                torn: false,
            }),
            options,
        })
    }

    /// Verifies the header and counts record lines.
    async fn count_records(path: &Path) -> Result<u64> {
        let file = fs::File::open(path).await?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next_line()
            .await?
            .ok_or_else(|| StealthError::LogError("missing log header".into()))?;
        check_header(&header)?;

        let mut count = 0;
        while let Some(line) = lines.next_line().await? {
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Ends a torn last line so the next append starts on a fresh line.
    async fn terminate_last_line(path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().read(true).append(true).open(path).await?;
        file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            warn!("Terminating torn last line");
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_line(file: &mut fs::File, line: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    if sync {
        file.sync_data().await?;
    }
    Ok(())
}

fn check_header(header: &str) -> Result<()> {
    let mut parts = header.trim().split(' ');
    if parts.next() != Some(MAGIC) {
        return Err(StealthError::LogError("invalid log magic".into()));
    }

    let version = parts
        .next()
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(|| StealthError::LogError("invalid log version".into()))?;
    if version != VERSION {
        return Err(StealthError::VersionMismatch {
            expected: VERSION,
            actual: version,
        });
    }
    Ok(())
}

/// Decodes one record line found at position `index`.
fn decode_line(index: u64, line: &str) -> Result<AnnouncedStealth> {
    let bytes = hex::decode(line.trim())
        .map_err(|e| StealthError::malformed(Some(index), format!("bad hex: {e}")))?;

    let record = AnnouncedStealth::from_bytes(&bytes).map_err(|e| match e {
        StealthError::MalformedAnnouncement { reason, .. } => {
            StealthError::malformed(Some(index), reason)
        }
        other => StealthError::malformed(Some(index), other.to_string()),
    })?;

    if record.sequence_index != index {
        return Err(StealthError::malformed(
            Some(index),
            format!("record claims index {}", record.sequence_index),
        ));
    }
    Ok(record)
}

#[async_trait]
impl AnnouncementLog for FileLog {
    #[instrument(skip(self, announcement), fields(view_tag = announcement.view_tag()))]
    async fn append(&self, mut announcement: AnnouncedStealth) -> Result<u64> {
        announcement.validate()?;

        let mut writer = self.writer.lock().await;
        let index = writer.next_index;
        announcement.sequence_index = index;

        if writer.torn {
            warn!(sequence_index = index, "Removing partial line from failed append");
            writer.rollback().await?;
        }

        let mut line = hex::encode(announcement.to_bytes());
        line.push('\n');

        writer.torn = true;
        if let Err(e) = write_line(&mut writer.file, line.as_bytes(), self.options.sync_writes).await {
            warn!(sequence_index = index, error = %e, "Append failed");
            if let Err(rollback) = writer.rollback().await {
                // `torn` stays set; the next append retries the rollback.
                warn!(error = %rollback, "Could not remove partial line");
            }
            return Err(e.into());
        }
        writer.torn = false;
        writer.committed_len += line.len() as u64;
        writer.next_index += 1;
        debug!(sequence_index = index, "Appended announcement");
        Ok(index)
    }

    /// Streams records lazily from disk, up to the length at call time.
    #[instrument(skip(self))]
    async fn read(&self, from_index: u64) -> Result<AnnouncementStream> {
        let limit = self.writer.lock().await.next_index;

        let file = fs::File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let header = lines
            .next_line()
            .await?
            .ok_or_else(|| StealthError::LogError("missing log header".into()))?;
        check_header(&header)?;

        debug!(from_index, limit, "Reading announcements");

        let records = stream::unfold((lines, 0u64), move |(mut lines, mut index)| async move {
            loop {
                if index >= limit {
                    return None;
                }
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => return None,
                    Err(e) => return Some((Err(StealthError::IoError(e)), (lines, limit))),
                };
                if line.trim().is_empty() {
                    continue;
                }

                let position = index;
                index += 1;
                if position < from_index {
                    continue;
                }

                let item = decode_line(position, &line);
                if let Err(e) = &item {
                    warn!(sequence_index = position, error = %e, "Malformed log line");
                }
                return Some((item, (lines, index)));
            }
        });

        Ok(records.boxed())
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.writer.lock().await.next_index)
    }
}

impl std::fmt::Debug for FileLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLog")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}
