//! Pull request metadata captured when a review is created.

use super::{ParseBranchTypeError, PullRequestNumber, RepositoryFullName, ReviewDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Branch category derived from the branch name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    /// `feature/*` branches.
    Feature,
    /// `bugfix/*` branches.
    Bugfix,
    /// `hotfix/*` branches.
    Hotfix,
    /// `docs/*` branches.
    Docs,
    /// Any branch without a recognised prefix.
    Default,
}

impl BranchType {
    /// Classifies a branch by its prefix.
    ///
    /// # Examples
    ///
    ///     use review_gate::review::domain::BranchType;
    ///
    ///     assert_eq!(BranchType::from_branch_name("feature/login"), BranchType::Feature);
    ///     assert_eq!(BranchType::from_branch_name("main"), BranchType::Default);
    #[must_use]
    pub fn from_branch_name(branch_name: &str) -> Self {
        let Some((prefix, _)) = branch_name.trim().split_once('/') else {
            return Self::Default;
        };
        match prefix {
            "feature" => Self::Feature,
            "bugfix" => Self::Bugfix,
            "hotfix" => Self::Hotfix,
            "docs" => Self::Docs,
            _ => Self::Default,
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bugfix => "bugfix",
            Self::Hotfix => "hotfix",
            Self::Docs => "docs",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BranchType {
    type Error = ParseBranchTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "feature" => Ok(Self::Feature),
            "bugfix" => Ok(Self::Bugfix),
            "hotfix" => Ok(Self::Hotfix),
            "docs" => Ok(Self::Docs),
            "default" => Ok(Self::Default),
            _ => Err(ParseBranchTypeError(value.to_owned())),
        }
    }
}

/// Raw pull request fields supplied by the feedback pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFields {
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Pull request number.
    pub number: u64,
    /// Pull request title.
    pub title: String,
    /// Login of the pull request author.
    pub author: String,
    /// Browser URL of the pull request.
    pub url: String,
    /// Head branch name.
    pub branch_name: String,
    /// Reviewed head commit SHA.
    pub commit_sha: String,
}

/// Immutable descriptive metadata for the pull request under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestMetadata {
    repository: RepositoryFullName,
    number: PullRequestNumber,
    title: String,
    author: String,
    url: String,
    branch_name: String,
    branch_type: BranchType,
    commit_sha: String,
}

impl PullRequestMetadata {
    /// Validates raw fields and derives the branch type.
    ///
    /// # Errors
    ///
    /// Returns a [`ReviewDomainError`] when the repository or number is
    /// invalid, a required field is blank, or the URL is not `http(s)`.
    pub fn new(fields: PullRequestFields) -> Result<Self, ReviewDomainError> {
        let repository = RepositoryFullName::new(fields.repository)?;
        let number = PullRequestNumber::new(fields.number)?;
        let title = required("title", &fields.title)?;
        let author = required("author", &fields.author)?;
        let branch_name = required("branch name", &fields.branch_name)?;
        let commit_sha = required("commit SHA", &fields.commit_sha)?;
        let url = required("URL", &fields.url)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ReviewDomainError::InvalidPullRequestUrl(url));
        }

        Ok(Self {
            repository,
            number,
            title,
            author,
            url,
            branch_type: BranchType::from_branch_name(&branch_name),
            branch_name,
            commit_sha,
        })
    }

    /// Reconstructs metadata from persisted values, keeping the stored
    /// branch type.
    ///
    /// # Errors
    ///
    /// Returns a [`ReviewDomainError`] when the stored repository or number
    /// no longer validates.
    pub fn from_persisted(
        fields: PullRequestFields,
        branch_type: BranchType,
    ) -> Result<Self, ReviewDomainError> {
        let repository = RepositoryFullName::new(fields.repository)?;
        let number = PullRequestNumber::new(fields.number)?;
        Ok(Self {
            repository,
            number,
            title: fields.title,
            author: fields.author,
            url: fields.url,
            branch_name: fields.branch_name,
            branch_type,
            commit_sha: fields.commit_sha,
        })
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the pull request title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the author login.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the pull request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the head branch name.
    #[must_use]
    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    /// Returns the derived branch type.
    #[must_use]
    pub const fn branch_type(&self) -> BranchType {
        self.branch_type
    }

    /// Returns the reviewed commit SHA.
    #[must_use]
    pub fn commit_sha(&self) -> &str {
        &self.commit_sha
    }

    /// Returns the code host address of this pull request.
    #[must_use]
    pub fn target(&self) -> PullRequestTarget {
        PullRequestTarget {
            repository: self.repository.clone(),
            number: self.number,
            url: self.url.clone(),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ReviewDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReviewDomainError::EmptyField(field));
    }
    Ok(trimmed.to_owned())
}

/// Address of a pull request on the code host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestTarget {
    /// Repository in `owner/repo` form.
    pub repository: RepositoryFullName,
    /// Pull request number.
    pub number: PullRequestNumber,
    /// Browser URL.
    pub url: String,
}

impl fmt::Display for PullRequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}
