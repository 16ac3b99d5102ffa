//! Retry with exponential backoff for SSH connection establishment.

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use log::{debug, warn};
use std::thread;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the initial attempt)
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10000,
        }
    }
}

impl RetryConfig {
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64
            * self.backoff_multiplier.powi(attempt as i32))
        .min(self.max_delay_ms as f64) as u64;

        Duration::from_millis(delay_ms)
    }
}

/// Retries an operation with exponential backoff. A cancellation observed
/// between attempts aborts with the interrupted outcome instead of retrying.
pub fn retry_with_backoff<T, F>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = match operation() {
        Ok(result) => return Ok(result),
        Err(e @ Error::Interrupted(_)) => return Err(e),
        Err(e) => {
            debug!("{operation_name} failed on initial attempt: {e}");
            e
        }
    };

    for attempt in 1..=config.max_retries {
        cancel.check(operation_name)?;

        let delay = config.calculate_delay(attempt - 1);
        warn!(
            "Retrying {} (attempt {}/{}) after {:?}",
            operation_name, attempt, config.max_retries, delay
        );
        thread::sleep(delay);

        match operation() {
            Ok(result) => {
                debug!("{operation_name} succeeded on attempt {attempt}");
                return Ok(result);
            }
            Err(e @ Error::Interrupted(_)) => return Err(e),
            Err(e) => {
                debug!("{operation_name} failed on attempt {attempt}: {e}");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Appends troubleshooting hints to an SSH connection failure.
pub fn diagnose_ssh_error(error: &Error, host: &str, port: u16, ssh_key: Option<&str>) -> String {
    let error_str = error.to_string().to_lowercase();
    let mut suggestions = Vec::new();

    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("no route to host")
    {
        suggestions.push(format!("• Verify the host '{host}' is reachable"));
        suggestions.push(format!(
            "• Check if SSH is running on port {port} (try: ssh -p {port} {host})"
        ));
    }

    if error_str.contains("authentication") || error_str.contains("permission denied") {
        match ssh_key {
            Some(key) => {
                suggestions.push(format!("• Check that the SSH key exists: {key}"));
                suggestions.push(format!(
                    "• Verify the public key is in ~/.ssh/authorized_keys on {host}"
                ));
            }
            None => {
                suggestions.push("• Try specifying an SSH key in the configuration".to_string());
                suggestions.push("• Verify your SSH agent is running (ssh-add -l)".to_string());
            }
        }
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the remote host is accessible".to_string());
        suggestions.push(format!(
            "• Test the connection manually: ssh -p {port} {host}"
        ));
    }

    format!(
        "SSH connection failed: {}\n\nTroubleshooting suggestions:\n{}",
        error,
        suggestions.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            backoff_multiplier: 2.0,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn test_delay_calculation_caps_at_max() {
        let config = RetryConfig::default();
        assert_eq!(config.calculate_delay(0), Duration::from_millis(1000));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(2000));
        assert_eq!(config.calculate_delay(4), Duration::from_millis(10000));
    }

    #[test]
    fn test_success_on_first_attempt() {
        let mut calls = 0;
        let result = retry_with_backoff(
            &fast_config(),
            &CancellationToken::new(),
            || {
                calls += 1;
                Ok::<i32, Error>(42)
            },
            "op",
        );
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_success_after_failures() {
        let mut calls = 0;
        let result = retry_with_backoff(
            &fast_config(),
            &CancellationToken::new(),
            || {
                calls += 1;
                if calls < 3 {
                    Err(Error::Remote("transient".to_string()))
                } else {
                    Ok(7)
                }
            },
            "op",
        );
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_all_attempts_fail() {
        let mut calls = 0;
        let result: Result<i32> = retry_with_backoff(
            &fast_config(),
            &CancellationToken::new(),
            || {
                calls += 1;
                Err(Error::Remote("persistent".to_string()))
            },
            "op",
        );
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_interrupted_outcome_is_not_retried() {
        let mut calls = 0;
        let result: Result<i32> = retry_with_backoff(
            &fast_config(),
            &CancellationToken::new(),
            || {
                calls += 1;
                Err(Error::Interrupted("stop".to_string()))
            },
            "op",
        );
        assert!(matches!(result, Err(Error::Interrupted(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_cancellation_stops_retry_loop() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let result: Result<i32> = retry_with_backoff(
            &fast_config(),
            &cancel,
            || {
                calls += 1;
                cancel.cancel();
                Err(Error::Remote("failure".to_string()))
            },
            "op",
        );
        assert!(matches!(result, Err(Error::Interrupted(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_diagnose_connection_refused() {
        let error = Error::Remote("connection refused".to_string());
        let diagnosis = diagnose_ssh_error(&error, "example.com", 22, None);
        assert!(diagnosis.contains("Verify the host 'example.com' is reachable"));
    }

    #[test]
    fn test_diagnose_authentication_failure_with_key() {
        let error = Error::Remote("authentication failed".to_string());
        let diagnosis = diagnose_ssh_error(&error, "example.com", 22, Some("~/.ssh/id_rsa"));
        assert!(diagnosis.contains("~/.ssh/id_rsa"));
        assert!(diagnosis.contains("authorized_keys"));
    }
}
