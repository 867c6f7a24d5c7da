//! Diesel schema for review persistence.

diesel::table! {
    /// Review records with pull request metadata, decision, and merge state.
    reviews (id) {
        /// Review identifier.
        id -> Uuid,
        /// Repository in `owner/repo` form.
        #[max_length = 255]
        repository -> Varchar,
        /// Pull request number.
        pr_number -> Int8,
        /// Pull request title.
        pr_title -> Text,
        /// Pull request author login.
        #[max_length = 255]
        pr_author -> Varchar,
        /// Pull request URL.
        pr_url -> Text,
        /// Head branch name.
        #[max_length = 255]
        branch_name -> Varchar,
        /// Derived branch type.
        #[max_length = 50]
        branch_type -> Varchar,
        /// Reviewed head commit SHA.
        #[max_length = 64]
        commit_sha -> Varchar,
        /// Generated summary.
        review_summary -> Text,
        /// Generated feedback items.
        review_feedback -> Jsonb,
        /// Applied expectations.
        expectations_applied -> Jsonb,
        /// Review status.
        #[max_length = 50]
        status -> Varchar,
        /// Instructor notes.
        instructor_notes -> Nullable<Text>,
        /// Decision action.
        #[max_length = 50]
        decision_action -> Nullable<Varchar>,
        /// Whether an automatic merge was asked for.
        auto_merge_requested -> Bool,
        /// Reconciled merge state.
        #[max_length = 50]
        merge_state -> Varchar,
        /// Last remote merge check.
        merge_checked_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Decision timestamp.
        decided_at -> Nullable<Timestamptz>,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
