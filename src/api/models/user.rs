use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::enums::UserRole;

static BADGE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9]{3}$").expect("badge code pattern"));

/// A registered user. Authentication is handled by the identity collaborator;
/// this model carries no credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    /// 11-digit national ID, stored with formatting stripped.
    pub national_id: String,
    pub role: UserRole,
    /// Required for non-client roles; format is the role prefix plus three digits.
    pub badge_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
}

/// Payload for registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub national_id: String,
    pub role: UserRole,
    #[serde(default)]
    pub badge_code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Strip punctuation from a national ID and require exactly 11 digits.
pub fn normalize_national_id(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 && raw.chars().all(|c| !c.is_ascii_alphabetic()) {
        Some(digits)
    } else {
        None
    }
}

/// Validate a badge code against the role's prefix. Clients must not carry a
/// badge; every other role must.
pub fn badge_code_valid(role: UserRole, badge_code: Option<&str>) -> bool {
    match (role.badge_prefix(), badge_code) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(_), None) => false,
        (Some(prefix), Some(code)) => BADGE_CODE.is_match(code) && code.starts_with(prefix),
    }
}
