//! Common types used across Relay

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Property naming policy applied when records are serialized for storage.
///
/// Field names are declared in snake_case and converted on the way out, so the
/// policy is a value carried by configuration rather than a global setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// `firstName`
    #[default]
    CamelCase,
    /// `first_name`
    SnakeCase,
    /// `FirstName`
    PascalCase,
}

impl NamingPolicy {
    /// Convert a snake_case field name according to this policy
    pub fn apply(self, field: &str) -> String {
        match self {
            NamingPolicy::SnakeCase => field.to_string(),
            NamingPolicy::CamelCase => join_words(field, false),
            NamingPolicy::PascalCase => join_words(field, true),
        }
    }
}

fn join_words(field: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(field.len());
    for (i, word) in field.split('_').filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 && !capitalize_first {
                out.push(first);
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

impl std::str::FromStr for NamingPolicy {
    type Err = RelayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "camel" | "camelcase" | "camel_case" => Ok(NamingPolicy::CamelCase),
            "snake" | "snakecase" | "snake_case" => Ok(NamingPolicy::SnakeCase),
            "pascal" | "pascalcase" | "pascal_case" => Ok(NamingPolicy::PascalCase),
            _ => Err(RelayError::Parse(format!("Invalid naming policy: {}", s))),
        }
    }
}

impl std::fmt::Display for NamingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingPolicy::CamelCase => write!(f, "camel_case"),
            NamingPolicy::SnakeCase => write!(f, "snake_case"),
            NamingPolicy::PascalCase => write!(f, "pascal_case"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_policy_apply() {
        assert_eq!(NamingPolicy::CamelCase.apply("first_name"), "firstName");
        assert_eq!(NamingPolicy::PascalCase.apply("first_name"), "FirstName");
        assert_eq!(NamingPolicy::SnakeCase.apply("first_name"), "first_name");
        assert_eq!(NamingPolicy::CamelCase.apply("id"), "id");
        assert_eq!(NamingPolicy::PascalCase.apply("street_address"), "StreetAddress");
    }

    #[test]
    fn test_naming_policy_from_str() {
        assert_eq!("camelCase".parse::<NamingPolicy>().unwrap(), NamingPolicy::CamelCase);
        assert_eq!("snake-case".parse::<NamingPolicy>().unwrap(), NamingPolicy::SnakeCase);
        assert_eq!("Pascal".parse::<NamingPolicy>().unwrap(), NamingPolicy::PascalCase);
        assert!("kebab".parse::<NamingPolicy>().is_err());
    }
}
