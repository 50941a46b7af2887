use crate::accounts::AccountError;
use std::fmt;
use std::str::FromStr;

/// Hosting providers an account can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitProvider {
    BitbucketCloud,
    BitbucketServer,
    GitHub,
    GitHubEnterprise,
    GitLab,
    GitLabSelfHosted,
}

/// How the login dialog for a provider collects credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFlow {
    /// Username and personal access token against the public service
    Token,
    /// Server URL, username and token against a self-hosted instance
    EnterpriseToken,
    /// No login flow exists yet
    Unsupported,
}

impl GitProvider {
    pub const ALL: [GitProvider; 6] = [
        GitProvider::BitbucketCloud,
        GitProvider::BitbucketServer,
        GitProvider::GitHub,
        GitProvider::GitHubEnterprise,
        GitProvider::GitLab,
        GitProvider::GitLabSelfHosted,
    ];

    /// Stable identifier used in stored account records
    pub fn id(self) -> &'static str {
        match self {
            GitProvider::BitbucketCloud => "bitbucketCloud",
            GitProvider::BitbucketServer => "bitbucketServer",
            GitProvider::GitHub => "github",
            GitProvider::GitHubEnterprise => "githubEnterprise",
            GitProvider::GitLab => "gitlab",
            GitProvider::GitLabSelfHosted => "gitlabSelfHosted",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GitProvider::BitbucketCloud => "Bitbucket Cloud",
            GitProvider::BitbucketServer => "Bitbucket Server",
            GitProvider::GitHub => "GitHub",
            GitProvider::GitHubEnterprise => "GitHub Enterprise",
            GitProvider::GitLab => "GitLab",
            GitProvider::GitLabSelfHosted => "GitLab Self-Hosted",
        }
    }

    pub fn login_flow(self) -> LoginFlow {
        match self {
            GitProvider::GitHub | GitProvider::GitLab => LoginFlow::Token,
            GitProvider::GitHubEnterprise | GitProvider::GitLabSelfHosted => {
                LoginFlow::EnterpriseToken
            }
            GitProvider::BitbucketCloud | GitProvider::BitbucketServer => LoginFlow::Unsupported,
        }
    }

    /// Whether accounts for this provider must name their server
    pub fn requires_server_url(self) -> bool {
        self.login_flow() == LoginFlow::EnterpriseToken
    }
}

impl FromStr for GitProvider {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GitProvider::ALL
            .into_iter()
            .find(|provider| provider.id() == s)
            .ok_or_else(|| AccountError::UnknownProvider(s.to_string()))
    }
}

impl fmt::Display for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
