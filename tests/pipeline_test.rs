mod common;

use common::{context, page, settings, FakeContent, RecordingTracker};
use staleguard::dedup::{self, Ensured};
use staleguard::error::DiscoveryError;
use staleguard::metrics;
use staleguard::model::StaleRecord;
use staleguard::scheduler::{Job, JobState};
use tokio_util::sync::CancellationToken;

fn scenario_pages() -> Vec<staleguard::model::Page> {
    vec![
        page("1", "", 400),
        page("B", "1", 100),
        page("C", "B", 200),
        page("D", "X", 200),
    ]
}

#[tokio::test]
async fn stale_subtree_raises_issues_most_recent_first() {
    let content = FakeContent::with_pages(scenario_pages());
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-scenario", "1"),
        context(&content, &tracker),
        CancellationToken::new(),
    );

    let report = job.run_tick().await.unwrap();
    assert_eq!(report.in_scope, 2);
    assert_eq!(report.stale, 2);
    assert_eq!(report.issues.created, 2);

    let created = tracker.created().await;
    assert_eq!(created.len(), 2);
    assert!(created[0].summary.starts_with("\"Page B\" has not been updated since "));
    assert!(created[1].summary.starts_with("\"Page C\" has not been updated since "));
    assert_eq!(created[0].project_key, "DOCS");
    assert_eq!(created[0].issue_type, "Task");
    assert_eq!(created[0].labels, vec!["stale-docs".to_string()]);
    assert!(created[0]
        .description
        .contains("URL: https://example.atlassian.net/wiki/pages/viewpage.action?pageId=B"));

    assert_eq!(
        metrics::LASTUPDATE_PAGES_TOTAL
            .with_label_values(&["pipeline-scenario"])
            .get(),
        2.0
    );
}

#[tokio::test]
async fn repeated_ticks_never_duplicate_issues() {
    let content = FakeContent::with_pages(scenario_pages());
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-idempotent", "1"),
        context(&content, &tracker),
        CancellationToken::new(),
    );

    let first = job.run_tick().await.unwrap();
    assert_eq!(first.issues.created, 2);
    for _ in 0..3 {
        let again = job.run_tick().await.unwrap();
        assert_eq!(again.issues.created, 0);
        assert_eq!(again.issues.existing, 2);
    }
    assert_eq!(tracker.created().await.len(), 2);
}

#[tokio::test]
async fn one_failing_page_does_not_block_siblings() {
    let content = FakeContent::with_pages(vec![
        page("a", "r", 100),
        page("b", "r", 150),
        page("c", "r", 200),
    ]);
    let tracker = RecordingTracker::failing_for(&["\"Page b\""]);
    let job = Job::new(
        settings("pipeline-isolation", "r"),
        context(&content, &tracker),
        CancellationToken::new(),
    );

    let before = metrics::ERRORS_TOTAL
        .with_label_values(&[metrics::PKG_ISSUERAISER])
        .get();
    let report = job.run_tick().await.unwrap();
    assert_eq!(report.issues.created, 2);
    assert_eq!(report.issues.failed, 1);
    assert_eq!(tracker.searches().await.len(), 3);

    let titles: Vec<String> = tracker
        .created()
        .await
        .into_iter()
        .map(|i| i.summary)
        .collect();
    assert!(titles[0].starts_with("\"Page a\""));
    assert!(titles[1].starts_with("\"Page c\""));

    let after = metrics::ERRORS_TOTAL
        .with_label_values(&[metrics::PKG_ISSUERAISER])
        .get();
    assert!(after > before);
}

#[tokio::test]
async fn incomplete_listing_aborts_before_any_search() {
    let content = FakeContent::with_batches(vec![
        vec![page("a", "r", 100), page("b", "r", 100)],
        vec![page("c", "r", 100)],
        vec![page("d", "r", 100)],
    ])
    .failing_batch(2);
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-incomplete", "r"),
        context(&content, &tracker),
        CancellationToken::new(),
    );

    let err = job.run_tick().await.unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::IncompleteListing { fetched: 3, .. }
    ));
    assert!(tracker.searches().await.is_empty());
    assert_eq!(
        content.calls().await,
        vec![
            "resolve:ENG".to_string(),
            "list:id-ENG:2".to_string(),
            "next:cursor-1".to_string(),
            "next:cursor-2".to_string(),
        ]
    );
}

#[tokio::test]
async fn all_batches_are_followed() {
    let content = FakeContent::with_batches(vec![
        vec![page("a", "r", 100)],
        vec![page("b", "a", 100)],
        vec![page("c", "b", 100)],
    ]);
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-batches", "r"),
        context(&content, &tracker),
        CancellationToken::new(),
    );

    let (in_scope, records) = job.discover().await.unwrap();
    assert_eq!(in_scope, 3);
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn quoted_title_is_escaped_in_search_and_kept_in_summary() {
    let mut stale = page("q", "r", 120);
    stale.title = r#"Q&A "2024" Review"#.into();
    let content = FakeContent::with_pages(vec![stale]);
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-escape", "r"),
        context(&content, &tracker),
        CancellationToken::new(),
    );

    job.run_tick().await.unwrap();
    let searches = tracker.searches().await;
    assert_eq!(searches.len(), 1);
    assert!(searches[0].starts_with(r#"project = "DOCS" AND summary ~ "\"\\\"Q&A \\\"2024\\\" Review\\\" has not"#));

    let created = tracker.created().await;
    assert!(created[0].summary.starts_with(r#""Q&A "2024" Review" has not been updated"#));
    assert!(created[0]
        .description
        .contains(r#"Page Title: Q&A "2024" Review"#));
}

#[tokio::test]
async fn multiple_matches_count_as_tracked() {
    let tracker = RecordingTracker::default();
    let record = StaleRecord {
        page_id: "7".into(),
        summary: "\"Dup\" has not been updated since 2020-01-01T00:00:00.000Z".into(),
        description: "Page ID: 7".into(),
    };
    tracker.seed("DOCS-1", &record.summary).await;
    tracker.seed("DOCS-2", &record.summary).await;

    let before = metrics::AMBIGUOUS_MATCHES_TOTAL
        .with_label_values(&["pipeline-ambiguous"])
        .get();
    let outcome = dedup::ensure_issue(&tracker, "pipeline-ambiguous", &record, "DOCS", &[])
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Ensured::Ambiguous {
            keys: vec!["DOCS-1".into(), "DOCS-2".into()]
        }
    );
    assert!(!outcome.created());
    assert!(tracker.created().await.is_empty());
    assert_eq!(
        metrics::AMBIGUOUS_MATCHES_TOTAL
            .with_label_values(&["pipeline-ambiguous"])
            .get(),
        before + 1.0
    );
}

#[tokio::test]
async fn single_match_is_a_no_op() {
    let tracker = RecordingTracker::default();
    let record = StaleRecord {
        page_id: "8".into(),
        summary: "\"Known\" has not been updated since 2020-01-01T00:00:00.000Z".into(),
        description: String::new(),
    };
    tracker.seed("DOCS-9", &record.summary).await;

    let outcome = dedup::ensure_issue(&tracker, "pipeline-single", &record, "DOCS", &[])
        .await
        .unwrap();
    assert_eq!(outcome, Ensured::Exists { key: "DOCS-9".into() });
    assert!(tracker.created().await.is_empty());
}

#[tokio::test]
async fn dry_run_never_touches_tracker() {
    let content = FakeContent::with_pages(scenario_pages());
    let tracker = RecordingTracker::default();
    let mut ctx = context(&content, &tracker);
    ctx.dry_run = true;
    let job = Job::new(settings("pipeline-dry-run", "1"), ctx, CancellationToken::new());

    let report = job.run_tick().await.unwrap();
    assert_eq!(report.stale, 2);
    assert_eq!(report.issues.created, 0);
    assert!(tracker.searches().await.is_empty());
}

#[tokio::test]
async fn cancelled_tick_starts_no_new_creations() {
    let content = FakeContent::with_pages(scenario_pages());
    let tracker = RecordingTracker::default();
    let cancel = CancellationToken::new();
    let job = Job::new(
        settings("pipeline-cancel", "1"),
        context(&content, &tracker),
        cancel.clone(),
    );

    cancel.cancel();
    let report = job.run_tick().await.unwrap();
    assert_eq!(report.issues.skipped, 2);
    assert!(tracker.searches().await.is_empty());
}

#[tokio::test]
async fn cancel_during_first_batch_stops_paging() {
    let cancel = CancellationToken::new();
    let batches = (0..50)
        .map(|i| vec![page(&format!("p{i}"), "r", 100)])
        .collect();
    let content = FakeContent::with_batches(batches).cancelling_on_first_batch(&cancel);
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-cancel-listing", "r"),
        context(&content, &tracker),
        cancel.clone(),
    );

    assert_eq!(job.step(JobState::Running).await, JobState::Stopped);
    assert_eq!(
        content.calls().await,
        vec!["resolve:ENG".to_string(), "list:id-ENG:2".to_string()]
    );
    assert!(tracker.searches().await.is_empty());
}

#[tokio::test]
async fn cancelled_listing_is_not_a_discovery_failure() {
    let cancel = CancellationToken::new();
    let content = FakeContent::with_batches(vec![
        vec![page("a", "r", 100)],
        vec![page("b", "r", 100)],
    ])
    .cancelling_on_first_batch(&cancel);
    let tracker = RecordingTracker::default();
    let job = Job::new(
        settings("pipeline-cancel-error", "r"),
        context(&content, &tracker),
        cancel.clone(),
    );

    let err = job.run_tick().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Cancelled { fetched: 1 }));
}

#[tokio::test]
async fn job_without_discovery_does_nothing() {
    let content = FakeContent::with_pages(scenario_pages());
    let tracker = RecordingTracker::default();
    let mut s = settings("pipeline-idle", "1");
    s.discovery = None;
    let job = Job::new(s, context(&content, &tracker), CancellationToken::new());

    let report = job.run_tick().await.unwrap();
    assert_eq!(report.stale, 0);
    assert!(content.calls().await.is_empty());
}
