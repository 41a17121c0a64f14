//! Concurrent retrieval and branch isolation.

use super::fakes::*;
use crate::expansion::ExpandedQuery;
use crate::retriever::ParallelRetriever;
use crate::types::Category;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn queries(texts: &[&str]) -> Vec<ExpandedQuery> {
    texts
        .iter()
        .map(|t| ExpandedQuery::parse(t).unwrap())
        .collect()
}

fn retriever(index: &Arc<FakeIndex>) -> ParallelRetriever {
    ParallelRetriever::new(index.clone(), 5, Duration::from_secs(2))
}

#[tokio::test]
async fn test_failed_branch_keeps_survivors() {
    let index = Arc::new(
        FakeIndex::new()
            .hits(
                Q1,
                vec![passage("art_a", "c1", 0.6), passage("art_b", "c2", 0.7)],
            )
            .fail(Q2, "index unavailable")
            .hits(
                Q3,
                vec![passage("art_a", "c1", 0.9), passage("art_c", "c3", 0.55)],
            ),
    );

    let (collection, report) = retriever(&index)
        .retrieve_all(&queries(&[Q1, Q2, Q3]), None, &CancellationToken::new())
        .await;

    assert_eq!(collection.len(), 3);
    assert_eq!(collection.get("c1").unwrap().similarity_score, 0.9);
    assert_eq!(collection.get("c2").unwrap().similarity_score, 0.7);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let failed = report.branches.iter().find(|b| b.error.is_some()).unwrap();
    assert_eq!(failed.query, Q2);
    assert!(failed.error.as_ref().unwrap().contains("index unavailable"));
}

#[tokio::test]
async fn test_all_branches_failing_is_not_an_error() {
    let index = Arc::new(FakeIndex::new().fail(Q1, "down").fail(Q2, "down"));

    let (collection, report) = retriever(&index)
        .retrieve_all(&queries(&[Q1, Q2]), None, &CancellationToken::new())
        .await;

    assert!(collection.is_empty());
    assert_eq!(report.failed(), 2);
}

#[tokio::test]
async fn test_no_queries_no_searches() {
    let index = Arc::new(FakeIndex::new());

    let (collection, report) = retriever(&index)
        .retrieve_all(&[], Some(Category::Sports), &CancellationToken::new())
        .await;

    assert!(collection.is_empty());
    assert!(report.branches.is_empty());
    assert_eq!(index.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_completion_order_does_not_matter() {
    let hits_a = vec![passage("art_a", "c1", 0.6), passage("art_b", "c2", 0.8)];
    let hits_b = vec![passage("art_a", "c1", 0.75), passage("art_c", "c3", 0.5)];
    let hits_c = vec![passage("art_b", "c2", 0.8), passage("art_d", "c4", 0.95)];

    let fast_first = Arc::new(
        FakeIndex::new()
            .delayed(Q1, 10, hits_a.clone())
            .delayed(Q2, 20, hits_b.clone())
            .delayed(Q3, 30, hits_c.clone()),
    );
    let slow_first = Arc::new(
        FakeIndex::new()
            .delayed(Q1, 30, hits_a)
            .delayed(Q2, 10, hits_b)
            .delayed(Q3, 20, hits_c),
    );

    let cancel = CancellationToken::new();
    let batch = queries(&[Q1, Q2, Q3]);
    let (first, _) = retriever(&fast_first).retrieve_all(&batch, None, &cancel).await;
    let (second, _) = retriever(&slow_first).retrieve_all(&batch, None, &cancel).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(first.get("c1").unwrap().similarity_score, 0.75);
}

#[tokio::test(start_paused = true)]
async fn test_branches_run_concurrently() {
    let index = Arc::new(
        FakeIndex::new()
            .delayed(Q1, 1_000, vec![passage("art_a", "c1", 0.9)])
            .delayed(Q2, 1_000, vec![passage("art_b", "c2", 0.9)])
            .delayed(Q3, 1_000, vec![passage("art_c", "c3", 0.9)]),
    );

    let started = tokio::time::Instant::now();
    let (collection, _) = retriever(&index)
        .retrieve_all(&queries(&[Q1, Q2, Q3]), None, &CancellationToken::new())
        .await;

    assert_eq!(collection.len(), 3);
    // Sequential execution would take three seconds and hit the two second deadline
    assert!(started.elapsed() < Duration::from_millis(1_500));
}

#[tokio::test(start_paused = true)]
async fn test_slow_branch_times_out_alone() {
    let index = Arc::new(
        FakeIndex::new()
            .hits(Q1, vec![passage("art_a", "c1", 0.9)])
            .hang(Q2),
    );

    let (collection, report) = retriever(&index)
        .retrieve_all(&queries(&[Q1, Q2]), None, &CancellationToken::new())
        .await;

    assert_eq!(collection.len(), 1);
    let timed_out = &report.branches[1];
    assert!(timed_out.error.as_ref().unwrap().contains("Timed out"));
}

#[tokio::test]
async fn test_cancellation_stops_branches() {
    let index = Arc::new(FakeIndex::new().hang(Q1).hang(Q2));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (collection, report) = retriever(&index)
        .retrieve_all(&queries(&[Q1, Q2]), None, &cancel)
        .await;

    assert!(collection.is_empty());
    assert!(report
        .branches
        .iter()
        .all(|b| b.error.as_ref().unwrap().contains("Cancelled")));
}

#[tokio::test]
async fn test_malformed_items_are_skipped() {
    let mut broken = passage("art_x", "c9", 0.99);
    broken.metadata.remove("url");

    let index = Arc::new(
        FakeIndex::new().hits(Q1, vec![broken, passage("art_a", "c1", 0.8)]),
    );

    let (collection, report) = retriever(&index)
        .retrieve_all(&queries(&[Q1]), None, &CancellationToken::new())
        .await;

    assert_eq!(collection.len(), 1);
    assert!(collection.get("c9").is_none());
    assert_eq!(report.branches[0].skipped, 1);
    assert!(report.branches[0].error.is_none());
}

#[tokio::test]
async fn test_category_namespace_and_k() {
    let index = Arc::new(FakeIndex::new());

    ParallelRetriever::new(index.clone(), 7, Duration::from_secs(2))
        .retrieve_all(&queries(&[Q1]), Some(Category::Health), &CancellationToken::new())
        .await;

    assert_eq!(index.namespaces(), vec![Some("health".to_string())]);
    assert_eq!(index.requested_k(), vec![7]);
}
