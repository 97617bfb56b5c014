//! Scheduler behaviour observed from outside the crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thrift_analyzer::ide::{AnalysisPhase, AnalysisScheduler, ScheduleRequest, SchedulerConfig};
use tokio::time::sleep;

fn config() -> SchedulerConfig {
    SchedulerConfig {
        debounce_delay: Duration::from_millis(300),
        min_analysis_interval: Duration::from_secs(1),
        max_concurrent_analyses: 1,
    }
}

#[tokio::test(start_paused = true)]
async fn test_ten_requests_in_one_window_run_at_most_twice() {
    let scheduler = AnalysisScheduler::new(config());
    let runs = Arc::new(AtomicUsize::new(0));

    for version in 0..10u64 {
        let runs = runs.clone();
        scheduler.schedule("main.thrift", ScheduleRequest::debounced(version), move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
        });
        sleep(Duration::from_millis(10)).await;
    }

    sleep(Duration::from_secs(10)).await;
    let runs = runs.load(Ordering::SeqCst);
    assert!((1..=2).contains(&runs), "ran {runs} times");
    assert_eq!(scheduler.phase(&"main.thrift"), AnalysisPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_keys_are_independent() {
    let scheduler = AnalysisScheduler::new(config());
    let runs = Arc::new(AtomicUsize::new(0));

    for key in ["a.thrift", "b.thrift", "c.thrift"] {
        let runs = runs.clone();
        assert!(scheduler.schedule(key, ScheduleRequest::immediate(1), move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
        }));
    }

    sleep(Duration::from_secs(1)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.tracked_keys(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_disposed_scheduler_rejects_work() {
    let scheduler: AnalysisScheduler<&'static str> = AnalysisScheduler::new(config());
    scheduler.dispose();

    assert!(scheduler.is_disposed());
    assert!(!scheduler.schedule("a.thrift", ScheduleRequest::immediate(1), || async {}));
    assert_eq!(scheduler.tracked_keys(), 0);
}
