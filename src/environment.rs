//! Environment handed to the scanner process.
//!
//! The snapshot is built fresh for every run and deliberately does NOT
//! inherit the controller's own process environment: the node sees exactly
//! the variables configured for the run and nothing else.

use serde::{Deserialize, Serialize};

/// Environment variable naming a user-provided scanner jar. When set and
/// non-blank it forces the jar execution strategy.
pub const DETECT_JAR: &str = "DETECT_JAR";

/// Insertion-ordered variable map. Setting an existing name updates it in
/// place; iteration yields first-set order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    vars: Vec<(String, String)>,
}

impl EnvironmentSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.vars.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.vars.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns the value of the jar override when it is set and non-blank.
    pub fn jar_override(&self) -> Option<&str> {
        self.get(DETECT_JAR).filter(|v| !v.trim().is_empty())
    }
}

impl FromIterator<(String, String)> for EnvironmentSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, value) in iter {
            snapshot.set(name, value);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let env = EnvironmentSnapshot::new();
        assert!(env.is_empty());
        assert_eq!(env.get("PATH"), None);
    }

    #[test]
    fn test_set_and_get() {
        let mut env = EnvironmentSnapshot::new();
        env.set("JAVA_HOME", "/opt/jdk");
        assert_eq!(env.get("JAVA_HOME"), Some("/opt/jdk"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut env = EnvironmentSnapshot::new();
        env.set("A", "1");
        env.set("B", "2");
        env.set("A", "3");

        let order: Vec<_> = env.iter().collect();
        assert_eq!(order, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn test_jar_override_requires_non_blank() {
        let mut env = EnvironmentSnapshot::new();
        assert_eq!(env.jar_override(), None);

        env.set(DETECT_JAR, "   ");
        assert_eq!(env.jar_override(), None);

        env.set(DETECT_JAR, "/tmp/detect.jar");
        assert_eq!(env.jar_override(), Some("/tmp/detect.jar"));
    }

    #[test]
    fn test_serde_round_trip_preserves_order() {
        let mut env = EnvironmentSnapshot::new();
        env.set("Z", "26");
        env.set("A", "1");

        let json = serde_json::to_string(&env).unwrap();
        let back: EnvironmentSnapshot = serde_json::from_str(&json).unwrap();
        let order: Vec<_> = back.iter().collect();
        assert_eq!(order, vec![("Z", "26"), ("A", "1")]);
    }
}
