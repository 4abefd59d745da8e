//! Channel credentials loaded from the environment.

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `EMAIL_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "outreach@localhost";

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Credentials for every outbound integration. A channel whose credentials
/// are missing is not registered.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub email_from: String,
    pub sendgrid_api_key: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub linkedin_access_token: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub reddit_access_token: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub profile_source_url: Option<String>,
}

impl ChannelConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Default              |
    /// |-------------------------|----------------------|
    /// | `EMAIL_FROM`            | `outreach@localhost` |
    /// | `SENDGRID_API_KEY`      | none                 |
    /// | `SMTP_HOST`             | none                 |
    /// | `SMTP_PORT`             | `587`                |
    /// | `SMTP_USER`             | none                 |
    /// | `SMTP_PASSWORD`         | none                 |
    /// | `LINKEDIN_ACCESS_TOKEN` | none                 |
    /// | `TWITTER_BEARER_TOKEN`  | none                 |
    /// | `REDDIT_ACCESS_TOKEN`   | none                 |
    /// | `SLACK_WEBHOOK_URL`     | none                 |
    /// | `PROFILE_SOURCE_URL`    | none                 |
    pub fn from_env() -> Self {
        let smtp = non_empty("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            user: non_empty("SMTP_USER"),
            password: non_empty("SMTP_PASSWORD"),
        });

        Self {
            email_from: non_empty("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            sendgrid_api_key: non_empty("SENDGRID_API_KEY"),
            smtp,
            linkedin_access_token: non_empty("LINKEDIN_ACCESS_TOKEN"),
            twitter_bearer_token: non_empty("TWITTER_BEARER_TOKEN"),
            reddit_access_token: non_empty("REDDIT_ACCESS_TOKEN"),
            slack_webhook_url: non_empty("SLACK_WEBHOOK_URL"),
            profile_source_url: non_empty("PROFILE_SOURCE_URL"),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
