//! In-memory integration tests for instructor decisions.

use std::sync::Arc;

use super::helpers::{BarrierRepository, Workflow, fast_config, submit, workflow};
use mockable::DefaultClock;
use review_gate::review::{
    domain::{DecisionAction, MergeState, ReviewStatus},
    ports::{CodeHostError, ReviewRepository},
    services::{
        DecideReviewRequest, DecisionError, DecisionWarning, MergeRequestOutcome,
        ReviewDecisionService,
    },
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_posts_comment_and_keeps_merge_untouched(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 1).await?;

    let outcome = workflow
        .decisions
        .decide(
            review.id(),
            DecideReviewRequest::approve().with_notes("Well structured."),
        )
        .await?;

    eyre::ensure!(outcome.review.status() == ReviewStatus::Posted);
    eyre::ensure!(outcome.review.merge_state() == MergeState::NotRequested);
    eyre::ensure!(outcome.warnings.is_empty(), "unexpected warnings");
    eyre::ensure!(outcome.merge_handoff.is_none(), "no merge was asked for");

    let comments = workflow.host.posted_comments()?;
    let comment = comments
        .first()
        .ok_or_else(|| eyre::eyre!("expected a posted comment"))?;
    eyre::ensure!(comments.len() == 1, "expected exactly one comment");
    eyre::ensure!(comment.body.starts_with("Summary for pull request 1."));
    eyre::ensure!(comment.body.ends_with("**Instructor Notes:**\nWell structured."));
    eyre::ensure!(workflow.host.merge_requests()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_with_auto_merge_hands_off_to_coordinator(
    workflow: Workflow,
) -> eyre::Result<()> {
    let review = submit(&workflow, 2).await?;

    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve().with_auto_merge(true))
        .await?;
    let handoff = outcome
        .merge_handoff
        .ok_or_else(|| eyre::eyre!("expected a merge hand-off"))?;
    let merge_outcome = handoff.await??;

    eyre::ensure!(merge_outcome == MergeRequestOutcome::Accepted);
    let stored = workflow
        .repository
        .find_by_id(review.id())
        .await?
        .ok_or_else(|| eyre::eyre!("review disappeared"))?;
    eyre::ensure!(stored.merge_state() == MergeState::Requested);
    eyre::ensure!(stored.auto_merge_requested());
    eyre::ensure!(workflow.host.merge_requests()?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejection_posts_nothing_and_clears_auto_merge(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 3).await?;

    let outcome = workflow
        .decisions
        .decide(
            review.id(),
            DecideReviewRequest::reject()
                .with_notes("Missing tests.")
                .with_auto_merge(true),
        )
        .await?;

    eyre::ensure!(outcome.review.status() == ReviewStatus::Rejected);
    eyre::ensure!(outcome.review.decision_action() == Some(DecisionAction::Reject));
    eyre::ensure!(!outcome.review.auto_merge_requested());
    eyre::ensure!(outcome.review.instructor_notes() == Some("Missing tests."));
    eyre::ensure!(outcome.merge_handoff.is_none());
    eyre::ensure!(workflow.host.posted_comments()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deciding_twice_reports_invalid_state(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 4).await?;
    workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::reject())
        .await?;

    let result = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve())
        .await;

    eyre::ensure!(
        matches!(
            result,
            Err(DecisionError::InvalidState {
                status: ReviewStatus::Rejected,
                ..
            })
        ),
        "expected InvalidState, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_decisions_commit_exactly_once(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 5).await?;
    let decisions = Arc::new(workflow.decisions);

    let approve = {
        let service = Arc::clone(&decisions);
        let review_id = review.id();
        tokio::spawn(async move {
            service
                .decide(review_id, DecideReviewRequest::approve())
                .await
                .map(|outcome| outcome.review)
        })
    };
    let reject = {
        let service = Arc::clone(&decisions);
        let review_id = review.id();
        tokio::spawn(async move {
            service
                .decide(review_id, DecideReviewRequest::reject())
                .await
                .map(|outcome| outcome.review)
        })
    };
    let results = [approve.await?, reject.await?];

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let losers_refused = results.iter().filter(|result| {
        matches!(
            result,
            Err(DecisionError::Conflict(_) | DecisionError::InvalidState { .. })
        )
    });
    eyre::ensure!(successes == 1, "expected one winner, got {successes}");
    eyre::ensure!(losers_refused.count() == 1, "loser must be refused");

    let stored = workflow
        .repository
        .find_by_id(review.id())
        .await?
        .ok_or_else(|| eyre::eyre!("review disappeared"))?;
    let winner = results
        .iter()
        .find_map(|result| result.as_ref().ok())
        .ok_or_else(|| eyre::eyre!("missing winner"))?;
    eyre::ensure!(stored.status() == winner.status(), "store holds the winner");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn decision_losing_compare_and_set_reports_conflict(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 8).await?;
    let gated = BarrierRepository::new(workflow.repository.as_ref().clone(), 2);
    let decisions = Arc::new(ReviewDecisionService::new(
        Arc::new(gated),
        Arc::clone(&workflow.host),
        Arc::new(DefaultClock),
        fast_config(),
    ));

    let approve = {
        let service = Arc::clone(&decisions);
        let review_id = review.id();
        tokio::spawn(async move {
            service
                .decide(review_id, DecideReviewRequest::approve())
                .await
                .map(|outcome| outcome.review)
        })
    };
    let reject = {
        let service = Arc::clone(&decisions);
        let review_id = review.id();
        tokio::spawn(async move {
            service
                .decide(review_id, DecideReviewRequest::reject())
                .await
                .map(|outcome| outcome.review)
        })
    };
    let results = [approve.await?, reject.await?];

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(DecisionError::Conflict(id)) if *id == review.id()))
        .count();
    eyre::ensure!(successes == 1, "expected one winner, got {results:?}");
    eyre::ensure!(conflicts == 1, "expected one conflict, got {results:?}");

    let winner = results
        .iter()
        .find_map(|result| result.as_ref().ok())
        .ok_or_else(|| eyre::eyre!("missing winner"))?;
    let stored = workflow
        .repository
        .find_by_id(review.id())
        .await?
        .ok_or_else(|| eyre::eyre!("review disappeared"))?;
    eyre::ensure!(stored.status() == winner.status(), "store holds the winner");
    eyre::ensure!(stored.decision_action() == winner.decision_action());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn comment_failure_keeps_decision_and_warns(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 6).await?;
    for _ in 0..3 {
        workflow
            .host
            .push_comment_result(Err(CodeHostError::Transient("bad gateway".to_owned())))?;
    }

    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve())
        .await?;

    eyre::ensure!(outcome.review.status() == ReviewStatus::Posted);
    eyre::ensure!(
        matches!(
            outcome.warnings.as_slice(),
            [DecisionWarning::CommentNotPosted { .. }]
        ),
        "expected a single comment warning, got {:?}",
        outcome.warnings
    );
    eyre::ensure!(workflow.host.posted_comments()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_comment_failure_is_retried(workflow: Workflow) -> eyre::Result<()> {
    let review = submit(&workflow, 7).await?;
    workflow
        .host
        .push_comment_result(Err(CodeHostError::Transient("reset".to_owned())))?;

    let outcome = workflow
        .decisions
        .decide(review.id(), DecideReviewRequest::approve())
        .await?;

    eyre::ensure!(outcome.warnings.is_empty());
    eyre::ensure!(workflow.host.posted_comments()?.len() == 1);
    Ok(())
}
