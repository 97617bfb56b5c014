//! DiagnosticManager against real files in a temp directory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use thrift_analyzer::ide::AnalysisSource;
use thrift_analyzer::project::{DiskFileProvider, MemoryPublisher};
use thrift_analyzer::{DiagnosticManager, IssueCode};
use tokio::time::sleep;

use crate::helpers::source_fixtures::SHARED_TYPES;
use crate::helpers::workspace::{TestWorkspace, fast_options, wait_until};

type Manager = DiagnosticManager<DiskFileProvider, MemoryPublisher>;

fn manager() -> (Manager, MemoryPublisher) {
    let publisher = MemoryPublisher::new();
    let manager = DiagnosticManager::new(DiskFileProvider, publisher.clone(), fast_options());
    (manager, publisher)
}

fn published_codes(publisher: &MemoryPublisher, path: &Path) -> Option<Vec<IssueCode>> {
    publisher
        .published(path)
        .map(|issues| issues.iter().map(|i| i.code).collect())
}

const MAIN: &str = r#"include "shared.thrift"

struct Segment {
  1: Point from
  2: Point to
}

service Shapes extends BaseService {
  Segment make(1: Point a, 2: Point b) throws (1: shared.Oops oops)
}
"#;

#[tokio::test]
async fn test_open_publishes_issues() {
    let ws = TestWorkspace::new();
    let (manager, publisher) = manager();
    let doc = ws.path("dup.thrift");

    manager.open(&doc, "struct S {\n  1: string a\n  1: string b\n}\n");

    assert!(wait_until(|| publisher.published(&doc).is_some()).await);
    assert_eq!(
        published_codes(&publisher, &doc),
        Some(vec![IssueCode::FieldDuplicateId])
    );
    assert!(manager.is_open(&doc));
    let state = manager.document_state(&doc).expect("state");
    assert_eq!(state.version, 1);
    assert!(!state.is_analyzing);
    assert!(state.last_analysis_at.is_some());
}

#[tokio::test]
async fn test_types_from_disk_include_resolve() {
    let ws = TestWorkspace::new();
    let shared = ws.write("shared.thrift", SHARED_TYPES);
    let main = ws.path("main.thrift");
    let (manager, publisher) = manager();

    manager.open(&main, MAIN);

    assert!(wait_until(|| publisher.published(&main).is_some()).await);
    assert_eq!(published_codes(&publisher, &main), Some(vec![]));

    let graph = manager.dependency_snapshot();
    assert_eq!(graph.includes_of(&main), vec![shared.clone()]);
    assert_eq!(graph.dependents_of(&shared), vec![main.clone()]);
    assert_eq!(manager.cached_includes(), 1);
}

#[tokio::test]
async fn test_missing_include_does_not_block_analysis() {
    let ws = TestWorkspace::new();
    let main = ws.path("main.thrift");
    let (manager, publisher) = manager();

    manager.open(&main, "include \"nowhere.thrift\"\nstruct S {\n  1: Point p\n}\n");

    assert!(wait_until(|| publisher.published(&main).is_some()).await);
    assert_eq!(
        published_codes(&publisher, &main),
        Some(vec![IssueCode::TypeUnknown])
    );
}

#[tokio::test]
async fn test_editing_an_include_reanalyzes_dependents() {
    let ws = TestWorkspace::new();
    let shared = ws.write("shared.thrift", SHARED_TYPES);
    let main = ws.path("main.thrift");
    let (manager, publisher) = manager();

    manager.open(&shared, SHARED_TYPES);
    manager.open(&main, MAIN);
    assert!(wait_until(|| published_codes(&publisher, &main) == Some(vec![])).await);

    // Same-length rename in the unsaved buffer only
    let edited = SHARED_TYPES.replace("struct Point", "struct Pixel");
    manager.change(&shared, edited);

    let cascaded = wait_until(|| {
        published_codes(&publisher, &main)
            .is_some_and(|codes| codes.contains(&IssueCode::TypeUnknown))
    })
    .await;
    assert!(cascaded, "main was not re-analyzed: {:?}", publisher.published(&main));
    assert_eq!(
        published_codes(&publisher, &main).map(|c| c.len()),
        Some(4)
    );
    // On-disk file is untouched
    assert_eq!(fs::read_to_string(&shared).expect("read"), SHARED_TYPES);
}

#[tokio::test]
async fn test_close_withdraws_issues() {
    let ws = TestWorkspace::new();
    let shared = ws.write("shared.thrift", SHARED_TYPES);
    let main = ws.path("main.thrift");
    let (manager, publisher) = manager();

    manager.open(&main, "include \"shared.thrift\"\ntypedef Nope Alias\n");
    assert!(wait_until(|| publisher.published(&main).is_some()).await);

    manager.close(&main);

    assert_eq!(publisher.published(&main), None);
    assert!(!manager.is_open(&main));
    assert!(manager.document_state(&main).is_none());
    assert!(manager.dependency_snapshot().dependents_of(&shared).is_empty());
    assert!(!manager.schedule_analysis(&main, true, false, AnalysisSource::Save));
}

#[tokio::test]
async fn test_external_change_respects_extensions() {
    let ws = TestWorkspace::new();
    let shared = ws.write("shared.thrift", SHARED_TYPES);
    let main = ws.path("main.thrift");
    let (manager, publisher) = manager();

    manager.open(&main, MAIN);
    assert!(wait_until(|| published_codes(&publisher, &main) == Some(vec![])).await);
    assert_eq!(manager.cached_includes(), 1);
    let runs = publisher.publish_count(&main);

    manager.external_file_changed(&ws.path("notes.proto"));
    assert_eq!(manager.cached_includes(), 1);

    fs::write(&shared, SHARED_TYPES.replace("exception Oops", "struct Oops")).expect("write");
    manager.external_file_changed(&shared);
    assert_eq!(manager.cached_includes(), 0);

    assert!(wait_until(|| publisher.publish_count(&main) > runs).await);
    assert!(
        wait_until(|| {
            published_codes(&publisher, &main)
                == Some(vec![IssueCode::ServiceThrowsNotException])
        })
        .await,
        "{:?}",
        publisher.published(&main)
    );
    assert_eq!(manager.cached_includes(), 1);
}

#[tokio::test]
async fn test_rapid_changes_are_debounced() {
    let ws = TestWorkspace::new();
    let doc = ws.path("doc.thrift");
    let (manager, publisher) = manager();

    manager.open(&doc, "struct S {}\n");
    assert!(wait_until(|| publisher.publish_count(&doc) == 1).await);

    for n in 0..5 {
        manager.change(&doc, format!("struct S {{\n  1: i32 a\n  {n}: i32 b\n}}\n"));
    }
    manager.change(&doc, "struct S {\n  1: i32 a\n  1: i32 b\n}\n");

    assert!(
        wait_until(|| {
            published_codes(&publisher, &doc) == Some(vec![IssueCode::FieldDuplicateId])
        })
        .await
    );
    sleep(Duration::from_millis(200)).await;
    assert!(publisher.publish_count(&doc) <= 3, "{}", publisher.publish_count(&doc));
    assert_eq!(manager.document_state(&doc).map(|s| s.version), Some(7));
}

#[tokio::test]
async fn test_dispose_stops_scheduling() {
    let ws = TestWorkspace::new();
    let doc = ws.path("doc.thrift");
    let (manager, publisher) = manager();

    manager.open(&doc, "enum E {\n  A = x\n}\n");
    assert!(wait_until(|| publisher.published(&doc).is_some()).await);

    manager.dispose();

    assert_eq!(publisher.published(&doc), None);
    assert!(!manager.is_open(&doc));
    assert!(!manager.schedule_analysis(&doc, true, false, AnalysisSource::Save));
    manager.open(&doc, "enum E {\n  A = 1\n}\n");
    sleep(Duration::from_millis(100)).await;
    assert_eq!(publisher.published(&doc), None);
}
