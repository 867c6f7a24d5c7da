//! In-memory integration tests for merge state reconciliation.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;

use super::helpers::{Workflow, fast_config, submit, workflow};
use review_gate::review::{
    domain::{MergeState, Review, ReviewId},
    ports::{CodeHostError, RemotePullRequestState, ReviewFilter, ReviewRepository},
    services::{DecideReviewRequest, ReconciliationPoller, SweepReport},
};
use rstest::rstest;
use tokio::sync::watch;

async fn requested_review(workflow: &Workflow, number: u64) -> eyre::Result<Review> {
    let review = submit(workflow, number).await?;
    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve().with_auto_merge(true))
        .await?;
    if let Some(handoff) = outcome.merge_handoff {
        handoff.await??;
    }
    Ok(review)
}

async fn stored(workflow: &Workflow, review_id: ReviewId) -> eyre::Result<Review> {
    workflow
        .repository
        .find_by_id(review_id)
        .await?
        .ok_or_else(|| eyre::eyre!("review {review_id} disappeared"))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_merge_is_confirmed_after_remote_merge(workflow: Workflow) -> eyre::Result<()> {
    let review = requested_review(&workflow, 30).await?;
    eyre::ensure!(stored(&workflow, review.id()).await?.merge_state() == MergeState::Requested);

    workflow
        .host
        .set_remote_state(&review.pull_request().target(), RemotePullRequestState::Merged)?;
    let report = workflow.poller.sweep().await?;

    eyre::ensure!(report.confirmed == 1, "unexpected report {report:?}");
    let confirmed = stored(&workflow, review.id()).await?;
    eyre::ensure!(confirmed.merge_state() == MergeState::Confirmed);
    eyre::ensure!(confirmed.merge_checked_at().is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_handles_every_remote_state(workflow: Workflow) -> eyre::Result<()> {
    let merged = requested_review(&workflow, 31).await?;
    let closed = requested_review(&workflow, 32).await?;
    let open = requested_review(&workflow, 33).await?;
    let unreachable = requested_review(&workflow, 34).await?;
    workflow
        .host
        .set_remote_state(&merged.pull_request().target(), RemotePullRequestState::Merged)?;
    workflow.host.set_remote_state(
        &closed.pull_request().target(),
        RemotePullRequestState::ClosedUnmerged,
    )?;
    workflow.host.fail_remote_state(
        &unreachable.pull_request().target(),
        CodeHostError::Transient("connection refused".to_owned()),
    )?;

    let report = workflow.poller.sweep().await?;

    eyre::ensure!(
        report
            == SweepReport {
                merges_requested: 0,
                examined: 4,
                confirmed: 1,
                failed: 1,
                still_open: 1,
                skipped: 0,
                errors: 1,
            },
        "unexpected report {report:?}"
    );
    eyre::ensure!(stored(&workflow, merged.id()).await?.merge_state() == MergeState::Confirmed);
    let failed = stored(&workflow, closed.id()).await?;
    eyre::ensure!(failed.merge_state() == MergeState::Failed);
    eyre::ensure!(
        failed
            .instructor_notes()
            .is_some_and(|notes| notes.starts_with("Auto-merge failed: ")),
        "failure reason missing from notes"
    );
    let still_open = stored(&workflow, open.id()).await?;
    eyre::ensure!(still_open.merge_state() == MergeState::Requested);
    eyre::ensure!(still_open.merge_checked_at().is_some());
    eyre::ensure!(
        stored(&workflow, unreachable.id()).await?.merge_state() == MergeState::Requested
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_sweeps_do_not_revisit_terminal_reviews(workflow: Workflow) -> eyre::Result<()> {
    let review = requested_review(&workflow, 35).await?;
    workflow
        .host
        .set_remote_state(&review.pull_request().target(), RemotePullRequestState::Merged)?;

    workflow.poller.sweep().await?;
    let after_first = stored(&workflow, review.id()).await?;
    let queries_after_first = workflow.host.state_query_count()?;
    let second = workflow.poller.sweep().await?;

    eyre::ensure!(second == SweepReport::default(), "unexpected report {second:?}");
    eyre::ensure!(stored(&workflow, review.id()).await? == after_first);
    eyre::ensure!(workflow.host.state_query_count()? == queries_after_first);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn background_poller_confirms_merge_and_stops_on_shutdown(
    workflow: Workflow,
) -> eyre::Result<()> {
    let review = requested_review(&workflow, 36).await?;
    workflow
        .host
        .set_remote_state(&review.pull_request().target(), RemotePullRequestState::Merged)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = ReconciliationPoller::new(
        Arc::clone(&workflow.repository),
        Arc::clone(&workflow.host),
        Arc::new(DefaultClock),
        fast_config(),
    );
    let handle = poller.spawn(shutdown_rx);

    let mut confirmed = false;
    for _ in 0..50 {
        let remaining = workflow
            .repository
            .list(ReviewFilter::all().with_merge_state(MergeState::Requested))
            .await?;
        if remaining.is_empty() {
            confirmed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    shutdown_tx.send(true)?;
    tokio::time::timeout(Duration::from_secs(1), handle).await??;

    eyre::ensure!(confirmed, "poller never confirmed the merge");
    eyre::ensure!(stored(&workflow, review.id()).await?.merge_state() == MergeState::Confirmed);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn sweep_issues_merge_after_hand_off_is_lost(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 37).await?;
    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve().with_auto_merge(true))
        .await?;
    let handoff = outcome
        .merge_handoff
        .ok_or_else(|| eyre::eyre!("expected a merge hand-off"))?;
    handoff.abort();
    let join = handoff.await;
    eyre::ensure!(
        join.as_ref().is_err_and(tokio::task::JoinError::is_cancelled),
        "hand-off should have been cancelled before running, got {join:?}"
    );
    let stranded = stored(&workflow, review.id()).await?;
    eyre::ensure!(stranded.awaits_merge_request());
    eyre::ensure!(workflow.host.merge_requests()?.is_empty());

    let first = workflow.poller.sweep().await?;
    let second = workflow.poller.sweep().await?;

    eyre::ensure!(first.merges_requested == 1, "unexpected report {first:?}");
    eyre::ensure!(second.merges_requested == 0, "unexpected report {second:?}");
    eyre::ensure!(workflow.host.merge_requests()?.len() == 1);
    eyre::ensure!(stored(&workflow, review.id()).await?.merge_state() == MergeState::Requested);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweeps_leave_reviews_without_auto_merge_untouched(
    workflow: Workflow,
) -> eyre::Result<()> {
    let approved = submit(&workflow, 38).await?;
    let rejected = submit(&workflow, 39).await?;
    workflow
        .decisions
        .decide(approved.id(), DecideReviewRequest::approve())
        .await?;
    workflow
        .decisions
        .decide(rejected.id(), DecideReviewRequest::reject().with_auto_merge(true))
        .await?;
    for review in [&approved, &rejected] {
        workflow
            .host
            .set_remote_state(&review.pull_request().target(), RemotePullRequestState::Merged)?;
    }

    let first = workflow.poller.sweep().await?;
    let second = workflow.poller.sweep().await?;

    eyre::ensure!(first == SweepReport::default(), "unexpected report {first:?}");
    eyre::ensure!(second == SweepReport::default(), "unexpected report {second:?}");
    for review in [&approved, &rejected] {
        let current = stored(&workflow, review.id()).await?;
        eyre::ensure!(
            current.merge_state() == MergeState::NotRequested,
            "review {} moved to {}",
            review.id(),
            current.merge_state()
        );
        eyre::ensure!(current.merge_checked_at().is_none());
    }
    eyre::ensure!(workflow.host.state_query_count()? == 0);
    eyre::ensure!(workflow.host.merge_requests()?.is_empty());
    Ok(())
}
