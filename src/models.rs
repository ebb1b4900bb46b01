//! Resume and contact documents.

use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MESSAGE_TOO_LONG: &str = "Message too long. Max 500 characters.";
pub const CONTACT_RECEIVED: &str = "Contact information received.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub role: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub year: String,
    /// e.g. "Graduated in May 2025"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub name: String,
    pub title: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn message_too_long(&self) -> bool {
        self.message.chars().count() > MAX_MESSAGE_CHARS
    }

    /// Field checks other than the message upper bound, which is answered inline.
    pub fn validate(&self) -> Result<(), String> {
        check_len("name", &self.name, 2, 80)?;
        if !looks_like_email(&self.email) {
            return Err("email: value is not a valid email address".to_string());
        }
        if let Some(subject) = &self.subject {
            check_len("subject", subject, 0, 120)?;
        }
        check_len("message", &self.message, 5, usize::MAX)
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let n = value.chars().count();
    if n < min {
        return Err(format!("{field}: must be at least {min} characters"));
    }
    if n > max {
        return Err(format!("{field}: must be at most {max} characters"));
    }
    Ok(())
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactReceipt {
    pub id: String,
    pub message: String,
}

impl ContactReceipt {
    pub fn new(id: String) -> Self {
        Self {
            id,
            message: CONTACT_RECEIVED.to_string(),
        }
    }
}
