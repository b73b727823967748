//! Success/failure wrapper returned by request handlers.
//!
//! Expected failures (validation, authorization, not-found) travel as values
//! rather than as `Err`, so a handler's response type can describe them.

use serde::{Deserialize, Serialize};

/// A structured failure: stable machine code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

impl Failure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// A failure with only a message (empty code).
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(String::new(), message)
    }
}

impl core::fmt::Display for Failure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.code.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}

impl From<&str> for Failure {
    fn from(value: &str) -> Self {
        Failure::message(value)
    }
}

impl From<String> for Failure {
    fn from(value: String) -> Self {
        Failure::message(value)
    }
}

/// Either a data value or a non-empty list of failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Failure(Vec<Failure>),
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Outcome::Success(data)
    }

    pub fn failure(error: impl Into<Failure>) -> Self {
        Outcome::Failure(vec![error.into()])
    }

    pub fn failure_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::Failure(vec![Failure::new(code, message)])
    }

    pub fn failures(errors: impl IntoIterator<Item = Failure>) -> Self {
        Outcome::Failure(errors.into_iter().collect())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    pub fn errors(&self) -> &[Failure] {
        match self {
            Outcome::Success(_) => &[],
            Outcome::Failure(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<T, Vec<Failure>> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure(errors) => Err(errors),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::Failure(errors) => Outcome::Failure(errors),
        }
    }
}

impl Outcome<()> {
    /// Merge unit outcomes: success only if every input succeeded, otherwise
    /// all failures in input order.
    pub fn combine(outcomes: impl IntoIterator<Item = Outcome<()>>) -> Outcome<()> {
        let errors: Vec<Failure> = outcomes
            .into_iter()
            .flat_map(|o| match o {
                Outcome::Success(()) => Vec::new(),
                Outcome::Failure(errors) => errors,
            })
            .collect();

        if errors.is_empty() {
            Outcome::Success(())
        } else {
            Outcome::Failure(errors)
        }
    }
}

impl<T> From<Result<T, Vec<Failure>>> for Outcome<T> {
    fn from(value: Result<T, Vec<Failure>>) -> Self {
        match value {
            Ok(data) => Outcome::Success(data),
            Err(errors) => Outcome::Failure(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_includes_code_when_present() {
        assert_eq!(Failure::new("Auth.Forbidden", "nope").to_string(), "[Auth.Forbidden] nope");
        assert_eq!(Failure::message("plain").to_string(), "plain");
    }

    #[test]
    fn success_has_no_errors() {
        let outcome = Outcome::success(42);
        assert!(outcome.is_success());
        assert!(outcome.errors().is_empty());
        assert_eq!(outcome.data(), Some(&42));
    }

    #[test]
    fn map_preserves_failures() {
        let outcome: Outcome<i32> = Outcome::failure_with_code("X", "broken");
        let mapped = outcome.map(|v| v.to_string());
        assert_eq!(mapped.errors(), &[Failure::new("X", "broken")]);
        assert!(mapped.data().is_none());
    }

    #[test]
    fn combine_collects_all_failures_in_order() {
        let combined = Outcome::combine(vec![
            Outcome::success(()),
            Outcome::failure("first"),
            Outcome::failures(vec![Failure::message("second"), Failure::message("third")]),
        ]);

        let messages: Vec<_> = combined.errors().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn combine_of_successes_is_success() {
        assert!(Outcome::combine(vec![Outcome::success(()), Outcome::success(())]).is_success());
    }
}
