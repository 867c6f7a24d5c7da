//! Given steps for review decision BDD scenarios.

use super::world::{ReviewDecisionWorld, run_async};
use eyre::WrapErr;
use review_gate::review::{
    domain::{ExpectationsApplied, FeedbackItem, PullRequestFields, Severity},
    services::{DecideReviewRequest, SubmitReviewRequest},
};
use rstest_bdd_macros::given;

#[given(
    r#"a generated review for "{repository}" pull request #{number:u64} on branch "{branch}""#
)]
fn generated_review(
    world: &mut ReviewDecisionWorld,
    repository: String,
    number: u64,
    branch: String,
) -> Result<(), eyre::Report> {
    let request = SubmitReviewRequest {
        pull_request: PullRequestFields {
            url: format!("https://github.com/{repository}/pull/{number}"),
            repository,
            number,
            title: format!("Pull request {number}"),
            author: "student".to_owned(),
            branch_name: branch,
            commit_sha: format!("commit-{number}"),
        },
        review_summary: "Generated summary.".to_owned(),
        review_feedback: vec![FeedbackItem::new(
            Severity::Warning,
            "correctness",
            "Handle the empty input case",
        )],
        expectations_applied: ExpectationsApplied::default(),
    };
    let review = run_async(world.intake.submit(request)).wrap_err("submit generated review")?;
    world.review = Some(review);
    Ok(())
}

#[given("the instructor has rejected the review")]
fn instructor_has_rejected(world: &mut ReviewDecisionWorld) -> Result<(), eyre::Report> {
    let review_id = world.review()?.id();
    let outcome = run_async(
        world
            .decisions
            .decide(review_id, DecideReviewRequest::reject()),
    )
    .wrap_err("reject review in scenario setup")?;
    world.review = Some(outcome.review);
    Ok(())
}
