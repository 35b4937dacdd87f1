//! Backend error classification.
//!
//! Storage providers report failures in their own vocabulary, and their
//! client libraries share no error types. Classification is therefore done
//! on the error text: the first rule with a matching substring wins, and
//! rules are checked in table order. New provider messages are supported by
//! adding a rule, not by teaching drivers about each other's errors.

use std::fmt;
use std::sync::LazyLock;

use crate::error::BoxError;

/// What went wrong talking to a bucket, as far as a user is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
  BucketNotFound,
  CredentialsUnavailable,
  InvalidAccessKey,
  AuthenticationFailed,
  InvalidCredentialsFile,
  HostUnresolvable,
  MissingStorageKey,
  Unclassified,
}

impl FailureCategory {
  /// Remediation hint shown to the user.
  pub fn hint(&self, url: &str) -> String {
    match self {
      FailureCategory::BucketNotFound => format!("provided bucket does not exist: {}", url),
      FailureCategory::CredentialsUnavailable => {
        format!("check credentials and access to bucket: {}", url)
      }
      FailureCategory::InvalidAccessKey => format!(
        "aws access key id you provided does not exist in our records (bucket {})",
        url
      ),
      FailureCategory::AuthenticationFailed => {
        format!("azure storage key you provided is not valid (bucket {})", url)
      }
      FailureCategory::InvalidCredentialsFile => {
        format!("google app credentials you provided is not valid (bucket {})", url)
      }
      FailureCategory::HostUnresolvable => format!(
        "storage host could not be resolved, check the azure storage account or endpoint (bucket {})",
        url
      ),
      FailureCategory::MissingStorageKey => {
        format!("missing azure storage key for provided bucket {}", url)
      }
      FailureCategory::Unclassified => format!("failed to write to bucket {}", url),
    }
  }
}

/// Substrings that identify one failure category.
#[derive(Debug, Clone)]
pub struct Rule {
  pub category: FailureCategory,
  pub patterns: Vec<String>,
}

impl Rule {
  pub fn new(category: FailureCategory, patterns: &[&str]) -> Self {
    Self {
      category,
      patterns: patterns.iter().map(|p| p.to_string()).collect(),
    }
  }

  fn matches(&self, text: &str) -> bool {
    self.patterns.iter().any(|p| text.contains(p.as_str()))
  }
}

/// Ordered, extensible substring-to-category table.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
  rules: Vec<Rule>,
}

impl Default for ErrorClassifier {
  fn default() -> Self {
    use FailureCategory::*;
    Self {
      rules: vec![
        Rule::new(BucketNotFound, &["NoSuchBucket", "ContainerNotFound", "notFound"]),
        Rule::new(
          CredentialsUnavailable,
          &["NoCredentialProviders", "no providers in chain provided credentials"],
        ),
        Rule::new(InvalidAccessKey, &["InvalidAccessKeyId"]),
        Rule::new(AuthenticationFailed, &["AuthenticationFailed"]),
        Rule::new(InvalidCredentialsFile, &["invalid_grant"]),
        Rule::new(HostUnresolvable, &["no such host", "dns error"]),
        Rule::new(MissingStorageKey, &["ServiceCode=ResourceNotFound"]),
      ],
    }
  }
}

impl ErrorClassifier {
  /// Append a rule. It is checked after every existing rule.
  pub fn push(&mut self, rule: Rule) {
    self.rules.push(rule);
  }

  /// Category for an error text.
  pub fn categorize(&self, text: &str) -> FailureCategory {
    self
      .rules
      .iter()
      .find(|rule| rule.matches(text))
      .map(|rule| rule.category)
      .unwrap_or(FailureCategory::Unclassified)
  }

  /// Classify an error raised while working with the bucket at `url`.
  ///
  /// Only the innermost error of the chain is matched against the rules.
  /// Outer layers add context such as object keys or file paths, which must
  /// not decide the category.
  pub fn classify(&self, error: impl Into<BoxError>, url: &str) -> ClassifiedError {
    let source = error.into();
    let category = self.categorize(&root_cause(source.as_ref()).to_string());
    ClassifiedError {
      category,
      url: url.to_string(),
      source,
    }
  }
}

fn root_cause<'a>(
  error: &'a (dyn std::error::Error + 'static),
) -> &'a (dyn std::error::Error + 'static) {
  let mut current = error;
  while let Some(inner) = current.source() {
    current = inner;
  }
  current
}

static DEFAULT_CLASSIFIER: LazyLock<ErrorClassifier> = LazyLock::new(ErrorClassifier::default);

/// Classify an error with the default rule table.
pub fn classify(error: impl Into<BoxError>, url: &str) -> ClassifiedError {
  DEFAULT_CLASSIFIER.classify(error, url)
}

/// A backend error with its category and the bucket it concerned.
#[derive(Debug)]
pub struct ClassifiedError {
  pub category: FailureCategory,
  pub url: String,
  pub source: BoxError,
}

impl fmt::Display for ClassifiedError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.category.hint(&self.url), self.source)
  }
}

impl std::error::Error for ClassifiedError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    Some(self.source.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const URL: &str = "s3://releases";

  fn category(text: &str) -> FailureCategory {
    classify(text.to_string(), URL).category
  }

  #[test]
  fn test_bucket_not_found() {
    assert_eq!(
      category("operation error S3: PutObject, NoSuchBucket: The specified bucket does not exist"),
      FailureCategory::BucketNotFound
    );
    assert_eq!(category("ContainerNotFound"), FailureCategory::BucketNotFound);
    assert_eq!(category("googleapi: Error 404: notFound"), FailureCategory::BucketNotFound);
  }

  #[test]
  fn test_each_category() {
    let cases = [
      ("NoCredentialProviders: no valid providers in chain", FailureCategory::CredentialsUnavailable),
      (
        "dispatch failure: no providers in chain provided credentials",
        FailureCategory::CredentialsUnavailable,
      ),
      ("InvalidAccessKeyId: key does not exist", FailureCategory::InvalidAccessKey),
      ("Server failed to authenticate: AuthenticationFailed", FailureCategory::AuthenticationFailed),
      ("oauth2: cannot fetch token: invalid_grant", FailureCategory::InvalidCredentialsFile),
      ("dial tcp: lookup account.blob.core.windows.net: no such host", FailureCategory::HostUnresolvable),
      ("io error: dns error: failed to lookup address", FailureCategory::HostUnresolvable),
      ("RESPONSE 404, ServiceCode=ResourceNotFound", FailureCategory::MissingStorageKey),
      ("connection reset by peer", FailureCategory::Unclassified),
    ];
    for (text, expected) in cases {
      assert_eq!(category(text), expected, "text: {}", text);
    }
  }

  #[test]
  fn test_priority_order() {
    // Bucket lookups outrank everything else.
    assert_eq!(
      category("InvalidAccessKeyId while probing NoSuchBucket"),
      FailureCategory::BucketNotFound
    );
    // invalid_grant outranks the later host and storage-key rules.
    assert_eq!(
      category("invalid_grant after no such host ServiceCode=ResourceNotFound"),
      FailureCategory::InvalidCredentialsFile
    );
  }

  #[test]
  fn test_matching_is_case_sensitive() {
    assert_eq!(category("nosuchbucket"), FailureCategory::Unclassified);
  }

  #[test]
  fn test_classified_message_carries_hint_and_source() {
    let err = classify("NoSuchBucket".to_string(), URL);
    let message = err.to_string();
    assert!(message.starts_with("provided bucket does not exist: s3://releases"));
    assert!(message.ends_with("NoSuchBucket"));

    let err = classify("boom".to_string(), URL);
    assert!(err.to_string().contains("failed to write to bucket"));
    assert!(err.to_string().ends_with("boom"));
  }

  #[test]
  fn test_context_does_not_decide_category() {
    let err = crate::error::BlobError::Write {
      key: "app/v1.0.0/notFound-no such host.tar.gz".to_string(),
      source: "connection reset by peer".into(),
    };
    let classified = classify(err, URL);
    assert_eq!(classified.category, FailureCategory::Unclassified);
    assert!(classified.to_string().contains("notFound-no such host.tar.gz"));

    let err = crate::error::BlobError::Write {
      key: "app/v1.0.0/app.tar.gz".to_string(),
      source: "NoSuchBucket: The specified bucket does not exist".into(),
    };
    assert_eq!(classify(err, URL).category, FailureCategory::BucketNotFound);
  }

  #[test]
  fn test_custom_rule() {
    let mut classifier = ErrorClassifier::default();
    classifier.push(Rule::new(FailureCategory::BucketNotFound, &["BucketGone"]));
    assert_eq!(classifier.categorize("BucketGone"), FailureCategory::BucketNotFound);
  }
}
