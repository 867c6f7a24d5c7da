//! Rendering of the review comment posted on approval.

use crate::review::domain::Review;
use minijinja::{Environment, context};
use thiserror::Error;

const REVIEW_COMMENT_TEMPLATE: &str = "{{ summary }}
{%- if feedback %}

### Feedback
{% for item in feedback %}
- **{{ item.severity }}** [{{ item.category }}] {{ item.message }}
{%- if item.file_path %} (`{{ item.file_path }}{% if item.line_number %}:{{ item.line_number }}{% endif %}`){% endif %}
{%- endfor %}
{%- endif %}
{%- if notes %}

---
**Instructor Notes:**
{{ notes }}
{%- endif %}";

/// Error returned when the comment template fails to render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to render review comment: {reason}")]
pub struct CommentRenderError {
    /// Template engine message.
    pub reason: String,
}

/// Renders the Markdown comment body for an approved review.
///
/// # Errors
///
/// Returns [`CommentRenderError`] when template rendering fails.
pub fn render_review_comment(review: &Review) -> Result<String, CommentRenderError> {
    let environment = Environment::new();
    environment
        .render_str(
            REVIEW_COMMENT_TEMPLATE,
            context! {
                summary => review.review_summary(),
                feedback => review.review_feedback(),
                notes => review.instructor_notes(),
            },
        )
        .map_err(|error| CommentRenderError {
            reason: error.to_string(),
        })
}
