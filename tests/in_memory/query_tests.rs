//! In-memory integration tests for dashboard queries.

use std::time::Duration;

use super::helpers::{Workflow, submit, workflow};
use review_gate::review::{
    domain::{MergeState, ReviewId, ReviewStatus, Severity},
    ports::ReviewFilter,
    services::{DecideReviewRequest, ReviewQueryError},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_status_newest_first(workflow: Workflow) -> eyre::Result<()> {
    let first = submit(&workflow, 50).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = submit(&workflow, 51).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = submit(&workflow, 52).await?;
    workflow
        .decisions
        .decide(second.id(), DecideReviewRequest::reject())
        .await?;

    let pending = workflow
        .queries
        .list(ReviewFilter::all().with_status(ReviewStatus::Pending))
        .await?;
    let ids: Vec<_> = pending.iter().map(|review| review.id()).collect();

    eyre::ensure!(
        ids == vec![third.id(), first.id()],
        "expected newest pending reviews first, got {ids:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stats_count_statuses_and_severities(workflow: Workflow) -> eyre::Result<()> {
    let approved = submit(&workflow, 53).await?;
    let rejected = submit(&workflow, 54).await?;
    submit(&workflow, 55).await?;
    workflow
        .decisions
        .decide(approved.id(), DecideReviewRequest::approve())
        .await?;
    workflow
        .decisions
        .decide(rejected.id(), DecideReviewRequest::reject())
        .await?;

    let stats = workflow.queries.stats().await?;

    eyre::ensure!(stats.total == 3);
    eyre::ensure!(stats.status_count(ReviewStatus::Pending) == 1);
    eyre::ensure!(stats.status_count(ReviewStatus::Posted) == 1);
    eyre::ensure!(stats.status_count(ReviewStatus::Rejected) == 1);
    eyre::ensure!(stats.severity_count(Severity::Warning) == 3);
    eyre::ensure!(stats.severity_count(Severity::Info) == 3);
    eyre::ensure!(stats.severity_count(Severity::Error) == 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pr_status_reflects_merge_progress(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 56).await?;
    let before = workflow.queries.pr_status(review.id()).await?;
    eyre::ensure!(before.merge_state == MergeState::NotRequested);
    eyre::ensure!(!before.auto_merge_requested);
    eyre::ensure!(before.last_checked_at.is_none());

    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve().with_auto_merge(true))
        .await?;
    if let Some(handoff) = outcome.merge_handoff {
        handoff.await??;
    }
    let after = workflow.queries.pr_status(review.id()).await?;

    eyre::ensure!(after.review_id == review.id());
    eyre::ensure!(after.merge_state == MergeState::Requested);
    eyre::ensure!(after.auto_merge_requested);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stats_serialize_with_snake_case_keys(workflow: Workflow) -> eyre::Result<()> {
    submit(&workflow, 57).await?;

    let stats = workflow.queries.stats().await?;
    let json = serde_json::to_value(&stats)?;

    eyre::ensure!(json["total"] == 1);
    eyre::ensure!(json["counts_by_status"]["pending"] == 1);
    eyre::ensure!(json["counts_by_status"]["rejected"] == 0);
    eyre::ensure!(json["counts_by_severity"]["warning"] == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_review_is_reported(workflow: Workflow) -> eyre::Result<()> {
    let missing = ReviewId::new();

    let result = workflow.queries.get(missing).await;

    eyre::ensure!(
        matches!(result, Err(ReviewQueryError::NotFound(id)) if id == missing),
        "expected NotFound, got {result:?}"
    );
    Ok(())
}
