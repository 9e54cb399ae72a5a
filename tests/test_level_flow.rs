//! End-to-end flows over a real CSV store:
//! - exam upload classifies and overwrites all concepts
//! - manual edits touch exactly one cell
//! - content is cached and never requested for unknown students

use flipped_tutor::levels::{CsvTableFile, TableFile};
use flipped_tutor::{
    Concept, ContentProvider, Dashboard, IngestColumns, IngestError, LevelError, LevelStore,
    ManualOutcome, MasteryTier, StudentRecord, TextGenerator,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const STORE_CSV: &str = "id,name,FC_DEFINICION,FC_ROLES,FC_TECNOLOGIA,FC_APLICACION,FC_BENEFICIOS\n\
                         7,Ana,0.25,0.25,0.25,0.25,0.25\n\
                         8,Luis,0.55,0.55,0.55,0.55,0.55\n";

/// CSV table file that counts writes
struct CountingFile {
    inner: CsvTableFile,
    writes: Arc<AtomicUsize>,
}

impl TableFile for CountingFile {
    fn read_table(&self) -> Result<Vec<StudentRecord>, LevelError> {
        self.inner.read_table()
    }

    fn write_table(&self, records: &[StudentRecord]) -> Result<(), LevelError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_table(records)
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

/// Generator that echoes its prompt length and counts calls
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("## Lesson\n\n{} chars of prompt", prompt.len()))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    writes: Arc<AtomicUsize>,
    generator: Arc<CountingGenerator>,
    dashboard: Dashboard,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("estudiantes.csv");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(STORE_CSV.as_bytes())
        .unwrap();

    let writes = Arc::new(AtomicUsize::new(0));
    let store = LevelStore::load(CountingFile {
        inner: CsvTableFile::new(&path),
        writes: writes.clone(),
    })
    .unwrap();

    let generator = Arc::new(CountingGenerator {
        calls: AtomicUsize::new(0),
    });
    let content = ContentProvider::new(generator.clone(), 64, false);
    let dashboard = Dashboard::new(store, content, IngestColumns::default());

    Fixture {
        _dir: dir,
        path,
        writes,
        generator,
        dashboard,
    }
}

#[tokio::test]
async fn test_exam_upload_promotes_student_to_advanced() {
    let fx = fixture();

    let report = fx
        .dashboard
        .ingest_upload("student_id,total_score\n7,90\n".as_bytes())
        .await
        .unwrap();

    assert_eq!(report.updated(), 1);
    assert_eq!(report.messages().len(), 1);
    assert_eq!(fx.writes.load(Ordering::SeqCst), 1);

    let view = fx.dashboard.student(7).await.unwrap();
    assert!(view.levels.iter().all(|p| p.tier == MasteryTier::Advanced && p.value == 0.85));

    // The durable copy reflects the update
    let reloaded = LevelStore::open(&fx.path).unwrap();
    for concept in Concept::ALL {
        assert_eq!(reloaded.find(7).unwrap().tier(concept), MasteryTier::Advanced);
    }
}

#[tokio::test]
async fn test_manual_update_after_upload() {
    let fx = fixture();
    fx.dashboard
        .ingest_upload("student_id,total_score\n7,90\n".as_bytes())
        .await
        .unwrap();

    let outcome = fx
        .dashboard
        .manual_update(7, Concept::Roles, MasteryTier::Intermediate)
        .await
        .unwrap();
    assert!(matches!(outcome, ManualOutcome::Updated { .. }));
    assert_eq!(fx.writes.load(Ordering::SeqCst), 2);

    let view = fx.dashboard.student(7).await.unwrap();
    for point in &view.levels {
        if point.concept == Concept::Roles {
            assert_eq!(point.value, 0.55);
        } else {
            assert_eq!(point.value, 0.85);
        }
    }
}

#[tokio::test]
async fn test_manual_update_unknown_student_does_not_persist() {
    let fx = fixture();

    let outcome = fx
        .dashboard
        .manual_update(404, Concept::Roles, MasteryTier::Advanced)
        .await
        .unwrap();

    assert_eq!(outcome, ManualOutcome::NotFound { student_id: 404 });
    assert_eq!(fx.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unparseable_upload_leaves_file_unchanged() {
    let fx = fixture();
    let before = std::fs::read(&fx.path).unwrap();

    let err = fx
        .dashboard
        .ingest_upload("this is not\",a table\n".as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Malformed { .. } | IngestError::MissingColumn { .. }
    ));
    assert_eq!(fx.writes.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read(&fx.path).unwrap(), before);
}

#[tokio::test]
async fn test_content_cached_per_tier() {
    let fx = fixture();

    let first = fx.dashboard.student_content(7).await.unwrap();
    let second = fx.dashboard.student_content(7).await.unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 5);
    assert!(second.iter().all(|c| c.content.from_cache));
    assert!(first.iter().all(|c| c.tier == MasteryTier::Basic));

    // A tier change means a new key, so that concept is generated afresh
    fx.dashboard
        .manual_update(7, Concept::Technology, MasteryTier::Advanced)
        .await
        .unwrap();
    let third = fx.dashboard.student_content(7).await.unwrap();
    assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 6);
    let tech = third.iter().find(|c| c.concept == Concept::Technology).unwrap();
    assert_eq!(tech.tier, MasteryTier::Advanced);
    assert!(!tech.content.from_cache);
}

#[tokio::test]
async fn test_unknown_student_issues_no_content_request() {
    let fx = fixture();

    assert!(fx.dashboard.student(99).await.is_none());
    assert!(fx.dashboard.student_content(99).await.is_none());
    assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalidate_on_write_drops_student_entries() {
    let fx = fixture();
    let dashboard = {
        let store = LevelStore::open(&fx.path).unwrap();
        let content = ContentProvider::new(fx.generator.clone(), 64, false);
        Dashboard::new(store, content, IngestColumns::default()).with_invalidate_on_write(true)
    };

    dashboard.student_content(8).await.unwrap();
    assert_eq!(dashboard.content().cached_entries().await, 5);

    dashboard
        .ingest_upload("student_id,total_score\n8,30\n".as_bytes())
        .await
        .unwrap();
    assert_eq!(dashboard.content().cached_entries().await, 0);
}

/// Table file that loads fine but refuses every write
struct ReadOnlyFile {
    inner: CsvTableFile,
}

impl TableFile for ReadOnlyFile {
    fn read_table(&self) -> Result<Vec<StudentRecord>, LevelError> {
        self.inner.read_table()
    }

    fn write_table(&self, _records: &[StudentRecord]) -> Result<(), LevelError> {
        Err(LevelError::Write {
            path: self.location(),
            reason: "read-only file system".to_string(),
        })
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

#[tokio::test]
async fn test_failed_write_does_not_change_visible_levels() {
    let fx = fixture();
    let dashboard = {
        let store = LevelStore::load(ReadOnlyFile {
            inner: CsvTableFile::new(&fx.path),
        })
        .unwrap();
        let content = ContentProvider::new(fx.generator.clone(), 64, false);
        Dashboard::new(store, content, IngestColumns::default())
    };

    assert!(dashboard
        .manual_update(7, Concept::Roles, MasteryTier::Advanced)
        .await
        .is_err());
    assert!(dashboard
        .ingest_upload("student_id,total_score\n7,90\n".as_bytes())
        .await
        .is_err());

    let view = dashboard.student(7).await.unwrap();
    assert!(view.levels.iter().all(|p| p.tier == MasteryTier::Basic));
}
