//! In-memory integration tests for merge coordination.

use super::helpers::{Workflow, submit, workflow};
use review_gate::review::{
    domain::{MergeState, ReviewId, ReviewStatus},
    ports::{CodeHostError, MergeMethod, MergeResponse, ReviewRepository},
    services::{DecideReviewRequest, MergeCoordinatorError, MergeRequestOutcome},
};
use rstest::rstest;

/// Submits and approves review `number` with auto-merge, waiting for the
/// merge hand-off to finish.
async fn approve_for_merge(workflow: &Workflow, number: u64) -> eyre::Result<ReviewId> {
    let review = submit(workflow, number).await?;
    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve().with_auto_merge(true))
        .await?;
    if let Some(handoff) = outcome.merge_handoff {
        handoff.await??;
    }
    Ok(review.id())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merge_request_uses_configured_method_and_title(workflow: Workflow) -> eyre::Result<()> {
    let review_id = approve_for_merge(&workflow, 20).await?;

    let requests = workflow.host.merge_requests()?;
    let recorded = requests
        .first()
        .ok_or_else(|| eyre::eyre!("expected a merge request"))?;
    eyre::ensure!(recorded.request.method == MergeMethod::Merge);
    eyre::ensure!(
        recorded.request.commit_title == "Merge PR #20: Student change 20",
        "unexpected commit title {}",
        recorded.request.commit_title
    );
    eyre::ensure!(recorded.target.number.value() == 20);

    let stored = workflow
        .repository
        .find_by_id(review_id)
        .await?
        .ok_or_else(|| eyre::eyre!("review disappeared"))?;
    eyre::ensure!(stored.merge_state() == MergeState::Requested);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_request_does_not_call_host_again(workflow: Workflow) -> eyre::Result<()> {
    let review_id = approve_for_merge(&workflow, 21).await?;

    let outcome = workflow.merges.request_merge(review_id).await?;

    eyre::ensure!(
        outcome == MergeRequestOutcome::AlreadyRequested(MergeState::Requested),
        "unexpected outcome {outcome:?}"
    );
    eyre::ensure!(workflow.host.merge_requests()?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn host_rejection_fails_merge_and_records_reason(workflow: Workflow) -> eyre::Result<()> {
    workflow.host.push_merge_result(Ok(MergeResponse::Rejected {
        reason: "Required status check failed".to_owned(),
    }))?;

    let review_id = approve_for_merge(&workflow, 22).await?;

    let stored = workflow
        .repository
        .find_by_id(review_id)
        .await?
        .ok_or_else(|| eyre::eyre!("review disappeared"))?;
    eyre::ensure!(stored.status() == ReviewStatus::Posted);
    eyre::ensure!(stored.merge_state() == MergeState::Failed);
    eyre::ensure!(
        stored.instructor_notes() == Some("Auto-merge failed: Required status check failed"),
        "unexpected notes {:?}",
        stored.instructor_notes()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_host_defers_to_poller(workflow: Workflow) -> eyre::Result<()> {
    for _ in 0..3 {
        workflow
            .host
            .push_merge_result(Err(CodeHostError::Transient("timeout".to_owned())))?;
    }
    let review = submit(&workflow, 23).await?;
    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve().with_auto_merge(true))
        .await?;
    let handoff = outcome
        .merge_handoff
        .ok_or_else(|| eyre::eyre!("expected a merge hand-off"))?;

    let merge_outcome = handoff.await??;

    eyre::ensure!(
        matches!(merge_outcome, MergeRequestOutcome::Deferred { .. }),
        "expected Deferred, got {merge_outcome:?}"
    );
    eyre::ensure!(workflow.host.merge_requests()?.len() == 3);
    let stored = workflow
        .repository
        .find_by_id(review.id())
        .await?
        .ok_or_else(|| eyre::eyre!("review disappeared"))?;
    eyre::ensure!(stored.merge_state() == MergeState::Requested);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_without_auto_merge_is_not_eligible(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 24).await?;
    workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve())
        .await?;

    let result = workflow.merges.request_merge(review.id()).await;

    eyre::ensure!(
        matches!(result, Err(MergeCoordinatorError::NotEligible { .. })),
        "expected NotEligible, got {result:?}"
    );
    eyre::ensure!(workflow.host.merge_requests()?.is_empty());
    Ok(())
}
