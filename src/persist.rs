use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::{Interval, RawInterval};
use crate::observability::SNAPSHOT_WRITES_TOTAL;

/// Upper bound on a single encoded record; anything larger is treated as corruption.
const MAX_RECORD_LEN: usize = 1 << 20;

#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    Encode(String),
    /// Truncated or checksum-mismatched record at index `record`.
    Corrupt { path: PathBuf, record: usize },
    /// Loaded records violate store rules.
    Invalid(EngineError),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "snapshot I/O error: {e}"),
            PersistError::Encode(e) => write!(f, "snapshot encoding error: {e}"),
            PersistError::Corrupt { path, record } => {
                write!(f, "snapshot {} corrupt at record {record}", path.display())
            }
            PersistError::Invalid(e) => write!(f, "snapshot rejected: {e}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<EngineError> for PersistError {
    fn from(e: EngineError) -> Self {
        PersistError::Invalid(e)
    }
}

/// The persistence collaborator. Both calls are all-or-nothing.
pub trait IntervalRepository {
    fn load_intervals(&self, property_id: Ulid) -> Result<Vec<RawInterval>, PersistError>;
    fn save_intervals(&self, property_id: Ulid, intervals: &[Interval]) -> Result<(), PersistError>;
}

/// Encode a single record to [len][bincode][crc32] format.
fn encode_record(writer: &mut impl Write, record: &RawInterval) -> Result<(), PersistError> {
    let payload = bincode::serialize(record).map_err(|e| PersistError::Encode(e.to_string()))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// One snapshot file per property under a data directory.
///
/// Format per record: `[u32: len][bincode: RawInterval][u32: crc32]`.
/// A save writes `<id>.snap.tmp`, fsyncs it and renames it over `<id>.snap`,
/// so readers see either the old or the new snapshot, never a mix.
pub struct SnapshotRepository {
    dir: PathBuf,
}

impl SnapshotRepository {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, property_id: Ulid) -> PathBuf {
        self.dir.join(format!("{property_id}.snap"))
    }

    fn write_snapshot(path: &Path, records: &[RawInterval]) -> Result<(), PersistError> {
        let tmp_path = path.with_extension("snap.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            encode_record(&mut writer, record)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn read_snapshot(path: &Path) -> Result<Vec<RawInterval>, PersistError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let corrupt = |record: usize| PersistError::Corrupt {
            path: path.to_path_buf(),
            record,
        };

        loop {
            let index = records.len();
            let mut len_buf = [0u8; 4];
            match read_full(&mut reader, &mut len_buf)? {
                Fill::Empty => break,
                Fill::Partial => return Err(corrupt(index)),
                Fill::Full => {}
            }
            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_RECORD_LEN {
                return Err(corrupt(index));
            }

            let mut payload = vec![0u8; len];
            let mut crc_buf = [0u8; 4];
            if read_full(&mut reader, &mut payload)? != Fill::Full
                || read_full(&mut reader, &mut crc_buf)? != Fill::Full
            {
                return Err(corrupt(index));
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                return Err(corrupt(index));
            }
            let record = bincode::deserialize::<RawInterval>(&payload).map_err(|_| corrupt(index))?;
            records.push(record);
        }
        Ok(records)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Fill {
    Empty,
    Partial,
    Full,
}

/// Like `read_exact`, but tells a clean end of file apart from a cut-off record.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<Fill> {
    if buf.is_empty() {
        return Ok(Fill::Full);
    }
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(match filled {
        0 => Fill::Empty,
        n if n == buf.len() => Fill::Full,
        _ => Fill::Partial,
    })
}

impl IntervalRepository for SnapshotRepository {
    fn load_intervals(&self, property_id: Ulid) -> Result<Vec<RawInterval>, PersistError> {
        let path = self.path_for(property_id);
        match Self::read_snapshot(&path) {
            Ok(records) => {
                debug!("read {} records from {}", records.len(), path.display());
                Ok(records)
            }
            Err(e) => {
                warn!("failed to load snapshot for property {property_id}: {e}");
                Err(e)
            }
        }
    }

    fn save_intervals(
        &self,
        property_id: Ulid,
        intervals: &[Interval],
    ) -> Result<(), PersistError> {
        let records: Vec<RawInterval> = intervals.iter().map(RawInterval::from).collect();
        let path = self.path_for(property_id);
        let result = Self::write_snapshot(&path, &records);
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(SNAPSHOT_WRITES_TOTAL, "status" => status).increment(1);
        if result.is_ok() {
            info!("saved {} intervals for property {property_id}", records.len());
        }
        result
    }
}

/// In-process repository, for tests and for callers that persist elsewhere.
#[derive(Default)]
pub struct MemoryRepository {
    snapshots: RefCell<HashMap<Ulid, Vec<RawInterval>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, property_id: Ulid, records: Vec<RawInterval>) {
        self.snapshots.borrow_mut().insert(property_id, records);
    }
}

impl IntervalRepository for MemoryRepository {
    fn load_intervals(&self, property_id: Ulid) -> Result<Vec<RawInterval>, PersistError> {
        Ok(self
            .snapshots
            .borrow()
            .get(&property_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save_intervals(
        &self,
        property_id: Ulid,
        intervals: &[Interval],
    ) -> Result<(), PersistError> {
        let records = intervals.iter().map(RawInterval::from).collect();
        self.snapshots.borrow_mut().insert(property_id, records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use std::fs::OpenOptions;

    use super::*;
    use crate::model::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("staybook_test_snapshots").join(name);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn intervals() -> Vec<Interval> {
        vec![
            Interval {
                id: Ulid::new(),
                span: DateSpan::new(d("2026-01-01"), d("2026-01-05")),
                kind: IntervalKind::Guest(GuestStay {
                    guest_name: "Ana".into(),
                    total_price: 480.0,
                    security_deposit: 100.0,
                    deposit_status: DepositStatus::Collected,
                    auto_cleaning: true,
                }),
                notes: "two dogs".into(),
                created_at: Utc::now(),
            },
            Interval {
                id: Ulid::new(),
                span: DateSpan::new(d("2026-01-05"), d("2026-01-07")),
                kind: IntervalKind::Maintenance { expense: 150.0 },
                notes: String::new(),
                created_at: Utc::now(),
            },
        ]
    }

    #[test]
    fn save_and_load() {
        let repo = SnapshotRepository::open(tmp_dir("save_and_load")).unwrap();
        let pid = Ulid::new();
        let saved = intervals();
        repo.save_intervals(pid, &saved).unwrap();

        let loaded = repo.load_intervals(pid).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, Some(saved[0].id));
        assert_eq!(loaded[0].notes, "two dogs");
        assert_eq!(loaded[1].kind, "maintenance");
        assert_eq!(loaded[1].maintenance_expense, 150.0);
        assert!(!repo.path_for(pid).with_extension("snap.tmp").exists());
    }

    #[test]
    fn missing_snapshot_is_empty() {
        let repo = SnapshotRepository::open(tmp_dir("missing")).unwrap();
        assert!(repo.load_intervals(Ulid::new()).unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let repo = SnapshotRepository::open(tmp_dir("replace")).unwrap();
        let pid = Ulid::new();
        let mut set = intervals();
        repo.save_intervals(pid, &set).unwrap();
        set.pop();
        repo.save_intervals(pid, &set).unwrap();
        assert_eq!(repo.load_intervals(pid).unwrap().len(), 1);
    }

    #[test]
    fn truncated_tail_is_reported() {
        let repo = SnapshotRepository::open(tmp_dir("truncated")).unwrap();
        let pid = Ulid::new();
        repo.save_intervals(pid, &intervals()).unwrap();
        {
            let mut f = OpenOptions::new().append(true).open(repo.path_for(pid)).unwrap();
            f.write_all(&[0u8; 6]).unwrap(); // length prefix plus a couple of bytes
        }
        match repo.load_intervals(pid) {
            Err(PersistError::Corrupt { record, .. }) => assert_eq!(record, 2),
            other => panic!("expected corrupt snapshot, got {other:?}"),
        }
    }

    #[test]
    fn bad_crc_is_reported() {
        let dir = tmp_dir("bad_crc");
        let repo = SnapshotRepository::open(&dir).unwrap();
        let pid = Ulid::new();
        {
            let record = RawInterval::from(&intervals()[0]);
            let payload = bincode::serialize(&record).unwrap();
            let mut f = File::create(repo.path_for(pid)).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEAD_BEEFu32.to_le_bytes()).unwrap();
        }
        assert!(matches!(
            repo.load_intervals(pid),
            Err(PersistError::Corrupt { record: 0, .. })
        ));
    }

    #[test]
    fn memory_repository_round_trip() {
        let repo = MemoryRepository::new();
        let pid = Ulid::new();
        assert!(repo.load_intervals(pid).unwrap().is_empty());
        repo.save_intervals(pid, &intervals()).unwrap();
        assert_eq!(repo.load_intervals(pid).unwrap().len(), 2);
    }
}
