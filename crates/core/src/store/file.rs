//! File-backed consultation store.
//!
//! Layout: `<consultations_dir>/<id[0..2]>/<id[2..4]>/<id>/consultation.json`
//!
//! Writes go to a temporary sibling file that is then renamed over the target, so a reader never
//! sees a half-written document. All mutations are serialised by one store-wide lock.

use super::{sort_oldest_first, ConsultationRepository, Mutation};
use crate::constants::CONSULTATION_JSON_FILENAME;
use crate::consultation::Consultation;
use crate::{TriageError, TriageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use triage_types::ConsultationId;

#[derive(Debug)]
pub struct FileConsultationRepository {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConsultationRepository {
    /// Opens (creating if needed) a store rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> TriageResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(TriageError::StorageDirCreation)?;
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: ConsultationId) -> PathBuf {
        id.sharded_dir(&self.base_dir)
            .join(CONSULTATION_JSON_FILENAME)
    }

    fn lock(&self) -> TriageResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| TriageError::LockPoisoned)
    }

    fn read(path: &Path) -> TriageResult<Option<Consultation>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TriageError::FileRead(e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(TriageError::Deserialization)
    }

    fn write(path: &Path, consultation: &Consultation) -> TriageResult<()> {
        let json =
            serde_json::to_string_pretty(consultation).map_err(TriageError::Serialization)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(TriageError::FileWrite)?;
        fs::rename(&tmp, path).map_err(TriageError::FileWrite)
    }

    /// Every `consultation.json` under the three-level shard tree.
    fn record_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(s1_iter) = fs::read_dir(&self.base_dir) else {
            return files;
        };
        for s1 in s1_iter.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
            let Ok(s2_iter) = fs::read_dir(&s1) else {
                continue;
            };
            for s2 in s2_iter.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
                let Ok(id_iter) = fs::read_dir(&s2) else {
                    continue;
                };
                for id_dir in id_iter.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
                    let file = id_dir.join(CONSULTATION_JSON_FILENAME);
                    if file.is_file() {
                        files.push(file);
                    }
                }
            }
        }
        files
    }
}

impl ConsultationRepository for FileConsultationRepository {
    fn insert(&self, consultation: &Consultation) -> TriageResult<()> {
        let _guard = self.lock()?;
        let dir = consultation.id.sharded_dir(&self.base_dir);
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent).map_err(TriageError::StorageDirCreation)?;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(TriageError::Conflict(format!(
                    "consultation {} already exists",
                    consultation.id
                )));
            }
            Err(e) => return Err(TriageError::StorageDirCreation(e)),
        }
        Self::write(&dir.join(CONSULTATION_JSON_FILENAME), consultation)
    }

    fn get(&self, id: ConsultationId) -> TriageResult<Option<Consultation>> {
        Self::read(&self.record_path(id))
    }

    fn list(&self) -> TriageResult<Vec<Consultation>> {
        let mut all = Vec::new();
        for path in self.record_files() {
            match Self::read(&path) {
                Ok(Some(consultation)) => all.push(consultation),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable consultation");
                }
            }
        }
        sort_oldest_first(&mut all);
        Ok(all)
    }

    fn update(&self, id: ConsultationId, apply: &mut Mutation<'_>) -> TriageResult<Consultation> {
        let _guard = self.lock()?;
        let path = self.record_path(id);
        let mut working =
            Self::read(&path)?.ok_or_else(|| TriageError::NotFound(format!("consultation {id}")))?;
        apply(&mut working)?;
        Self::write(&path, &working)?;
        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consultation::ConsultationStatus;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use tempfile::TempDir;
    use triage_types::{PatientId, SymptomId};

    fn consultation() -> Consultation {
        Consultation::new(
            PatientId::new(),
            [SymptomId::from_u128(1)].into_iter().collect::<BTreeSet<_>>(),
            Some("fever since yesterday".into()),
            Utc::now(),
        )
    }

    #[test]
    fn insert_writes_sharded_json() {
        let dir = TempDir::new().unwrap();
        let repo = FileConsultationRepository::open(dir.path()).unwrap();
        let c = consultation();
        repo.insert(&c).unwrap();

        let expected = c
            .id
            .sharded_dir(dir.path())
            .join(CONSULTATION_JSON_FILENAME);
        assert!(expected.is_file());
        assert_eq!(repo.get(c.id).unwrap().unwrap(), c);
    }

    #[test]
    fn missing_record_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let repo = FileConsultationRepository::open(dir.path()).unwrap();
        assert!(repo.get(ConsultationId::new()).unwrap().is_none());
    }

    #[test]
    fn update_persists_and_rejection_does_not() {
        let dir = TempDir::new().unwrap();
        let repo = FileConsultationRepository::open(dir.path()).unwrap();
        let c = consultation();
        repo.insert(&c).unwrap();

        repo.update(c.id, &mut |rec| rec.transition(ConsultationStatus::Cancelada, Utc::now()))
            .unwrap();
        let err = repo
            .update(c.id, &mut |rec| rec.transition(ConsultationStatus::Realizada, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, TriageError::Conflict(_)));

        let reopened = FileConsultationRepository::open(dir.path()).unwrap();
        let stored = reopened.get(c.id).unwrap().unwrap();
        assert_eq!(stored.status, ConsultationStatus::Cancelada);
        assert_eq!(stored.created_at, c.created_at);
    }

    #[test]
    fn list_walks_all_shards() {
        let dir = TempDir::new().unwrap();
        let repo = FileConsultationRepository::open(dir.path()).unwrap();
        for _ in 0..3 {
            repo.insert(&consultation()).unwrap();
        }
        fs::write(dir.path().join("stray.txt"), "ignored").unwrap();
        assert_eq!(repo.list().unwrap().len(), 3);
    }
}
