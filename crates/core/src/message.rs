//! Outreach message types and their delivery platforms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::platform::Platform;

/// Channel a template is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Email,
    Linkedin,
    Twitter,
    Reddit,
}

impl MessageType {
    pub const ALL: [MessageType; 4] = [
        MessageType::Email,
        MessageType::Linkedin,
        MessageType::Twitter,
        MessageType::Reddit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Email => "email",
            MessageType::Linkedin => "linkedin",
            MessageType::Twitter => "twitter",
            MessageType::Reddit => "reddit",
        }
    }

    /// Platform whose rate limits govern sends of this type.
    pub fn platform(self) -> Platform {
        match self {
            MessageType::Email => Platform::Generic,
            MessageType::Linkedin => Platform::LinkedIn,
            MessageType::Twitter => Platform::Twitter,
            MessageType::Reddit => Platform::Reddit,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::validation(format!(
                    "Invalid message_type '{s}'. Must be one of: email, linkedin, twitter, reddit"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_rate_limited_as_generic() {
        assert_eq!(MessageType::Email.platform(), Platform::Generic);
        assert_eq!(MessageType::Linkedin.platform(), Platform::LinkedIn);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = "sms".parse::<MessageType>().unwrap_err();
        assert!(err.to_string().contains("Invalid message_type 'sms'"));
    }
}
