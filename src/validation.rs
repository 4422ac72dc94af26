//! Client-side form checks and merging of server-side field errors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::api::ErrorBody;
use crate::config::ValidationConfig;

pub const EMAIL_HELP: &str = "Email must be in the form xxx@xxx.xxx";
pub const PASSWORD_HELP: &str = "Your password must contain at least 1 number, 1 lowercase and 1 uppercase number, and be 8 or more characters.";
pub const PASSWORDS_DIFFER: &str = "Passwords do not match";
pub const REQUIRED: &str = "This field must be provided";

/// Input caps applied while typing
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 500;

pub const TITLES: [&str; 8] = ["Mx", "Miss", "Mrs", "Ms", "Mr", "Dr", "Prof", "Other"];

const EMAIL_LOCAL: &str = r"^[a-zA-Z0-9._:$!%&'-]+@";
const EMAIL_TLD: &str = r"\.[a-zA-Z.]{2,5}$";

static ANY_DOMAIN_EMAIL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!("{}[a-zA-Z0-9.-]+{}", EMAIL_LOCAL, EMAIL_TLD)).expect("Invalid email regex")
});
static UPPER: Lazy<Regex> = Lazy::new(|| Regex::new("[A-Z]").expect("Invalid regex"));
static LOWER: Lazy<Regex> = Lazy::new(|| Regex::new("[a-z]").expect("Invalid regex"));
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]").expect("Invalid regex"));

/// Email and password rules. The email domain can be restricted to an
/// allow-list; an empty list accepts any domain.
#[derive(Debug, Clone)]
pub struct Validator {
  email: Regex,
}

impl Default for Validator {
  fn default() -> Self {
    Self {
      email: ANY_DOMAIN_EMAIL.clone(),
    }
  }
}

impl Validator {
  pub fn new(config: &ValidationConfig) -> Self {
    if config.email_domains.is_empty() {
      return Self::default();
    }
    let domains: Vec<String> = config
      .email_domains
      .iter()
      .map(|d| regex::escape(d))
      .collect();
    let pattern = format!(
      "{}[a-zA-Z0-9.-]*(?:{}){}",
      EMAIL_LOCAL,
      domains.join("|"),
      EMAIL_TLD
    );
    match Regex::new(&pattern) {
      Ok(email) => Self { email },
      Err(_) => Self::default(),
    }
  }

  pub fn valid_email(&self, email: &str) -> bool {
    self.email.is_match(email)
  }

  pub fn valid_password(&self, password: &str) -> bool {
    let len = password.chars().count();
    (8..=100).contains(&len)
      && !password.contains('\n')
      && UPPER.is_match(password)
      && LOWER.is_match(password)
      && DIGIT.is_match(password)
  }

  pub fn check_email(&self, errors: &mut FormErrors, email: &str) {
    if !self.valid_email(email) {
      errors.set("email", EMAIL_HELP);
    }
  }

  /// Password rules plus confirmation match
  pub fn check_new_password(&self, errors: &mut FormErrors, password: &str, password2: &str) {
    if password != password2 {
      errors.set("password2", PASSWORDS_DIFFER);
    }
    if !self.valid_password(password) {
      errors.set("password", PASSWORD_HELP);
    }
  }
}

pub fn check_required(errors: &mut FormErrors, field: &str, value: &str) {
  if value.is_empty() {
    errors.set(field, REQUIRED);
  }
}

/// Truncate typed input to a field cap
pub fn cap(value: &str, max: usize) -> String {
  value.chars().take(max).collect()
}

/// Per-field error messages of one form, plus the general message shown
/// in its banner. Field names are the server's (camelCase) names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
  fields: BTreeMap<String, String>,
  general: Option<String>,
}

impl FormErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, field: &str, message: impl Into<String>) {
    self.fields.insert(field.to_string(), message.into());
  }

  /// Called when the user edits a field
  pub fn clear(&mut self, field: &str) {
    self.fields.remove(field);
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty() && self.general.is_none()
  }

  /// Merge a server error body: every field error replaces the current one
  /// for that field, list messages joined with a space.
  pub fn merge_server(&mut self, body: &ErrorBody) {
    for (field, text) in &body.fields {
      self.fields.insert(field.clone(), text.joined());
    }
    if let Some(general) = body.general_message() {
      self.general = Some(general);
    }
  }

  /// Banner text: the server's general message, else `default`
  pub fn banner(&self, default: &str) -> String {
    self.general.clone().unwrap_or_else(|| default.to_string())
  }

  pub fn reset(&mut self) {
    self.fields.clear();
    self.general = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn restricted(domains: &[&str]) -> Validator {
    Validator::new(&ValidationConfig {
      email_domains: domains.iter().map(|d| d.to_string()).collect(),
    })
  }

  #[test]
  fn test_email_any_domain() {
    let v = Validator::default();
    assert!(v.valid_email("joe@x.com"));
    assert!(v.valid_email("o'neil.j%x@mail.example.co.uk"));
    assert!(!v.valid_email("joe@x"));
    assert!(!v.valid_email("joe x@y.com"));
    assert!(!v.valid_email("@y.com"));
    assert!(!v.valid_email("joe@y.toolong"));
  }

  #[test]
  fn test_email_domain_allow_list() {
    let v = restricted(&["mydomain", "seconddomain"]);
    assert!(v.valid_email("a@mydomain.com"));
    assert!(v.valid_email("a@mail.seconddomain.org"));
    assert!(!v.valid_email("a@other.com"));
  }

  #[test]
  fn test_domain_is_escaped() {
    let v = restricted(&["a.b"]);
    assert!(v.valid_email("x@a.b.com"));
    assert!(!v.valid_email("x@axb.com"));
  }

  #[test]
  fn test_password_rules() {
    let v = Validator::default();
    assert!(v.valid_password("Passw0rd"));
    assert!(!v.valid_password("Pass0rd"));
    assert!(!v.valid_password("password1"));
    assert!(!v.valid_password("PASSWORD1"));
    assert!(!v.valid_password("Password"));
    assert!(!v.valid_password(&format!("Aa1{}", "x".repeat(98))));
  }

  #[test]
  fn test_new_password_checks() {
    let v = Validator::default();
    let mut errors = FormErrors::new();
    v.check_new_password(&mut errors, "Passw0rd", "Passw0rx");
    assert_eq!(errors.get("password2"), Some(PASSWORDS_DIFFER));
    assert_eq!(errors.get("password"), None);

    let mut errors = FormErrors::new();
    v.check_new_password(&mut errors, "short", "short");
    assert_eq!(errors.get("password"), Some(PASSWORD_HELP));
  }

  #[test]
  fn test_required() {
    let mut errors = FormErrors::new();
    check_required(&mut errors, "jobTitle", "");
    check_required(&mut errors, "title", "Dr");
    assert_eq!(errors.get("jobTitle"), Some(REQUIRED));
    assert_eq!(errors.get("title"), None);
  }

  #[test]
  fn test_merge_server_errors() {
    let mut errors = FormErrors::new();
    errors.set("name", "client says no");
    errors.set("message", "keep me");

    let body = ErrorBody::from_value(&json!({
      "name": ["Too long.", "Bad chars."],
      "email": "Taken."
    }));
    errors.merge_server(&body);

    assert_eq!(errors.get("name"), Some("Too long. Bad chars."));
    assert_eq!(errors.get("email"), Some("Taken."));
    assert_eq!(errors.get("message"), Some("keep me"));
    assert_eq!(errors.banner("default"), "default");
  }

  #[test]
  fn test_banner_prefers_non_field_then_detail() {
    let mut errors = FormErrors::new();
    errors.merge_server(&ErrorBody::from_value(&json!({
      "nonFieldErrors": ["Bad credentials."],
      "detail": "ignored"
    })));
    assert_eq!(errors.banner("default"), "Bad credentials.");

    let mut errors = FormErrors::new();
    errors.merge_server(&ErrorBody::from_value(&json!({"detail": "Not found."})));
    assert_eq!(errors.banner("default"), "Not found.");
  }

  #[test]
  fn test_clear_field() {
    let mut errors = FormErrors::new();
    errors.set("email", EMAIL_HELP);
    errors.clear("email");
    assert!(errors.is_empty());
  }

  #[test]
  fn test_cap() {
    assert_eq!(cap("abcdef", 3), "abc");
    assert_eq!(cap("ab", 3), "ab");
  }
}
