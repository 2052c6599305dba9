//! Scoped overrides of process environment variables.
//!
//! The environment is process-wide: tests that use these guards must not run
//! concurrently with anything else reading or writing the same variables
//! (mark them `#[serial]`).

use std::ffi::OsString;

use fastly_tf_domain::{FASTLY_GCS_EMAIL, FASTLY_GCS_SECRET_KEY};
use tracing::debug;

use crate::error::EnvError;

/// Overrides a set of variables and puts the previous values back on drop,
/// including removing variables that were unset before.
#[must_use = "the previous environment is restored when the guard is dropped"]
#[derive(Debug)]
pub struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvGuard {
    /// Snapshot every key in `vars`, then set each to its new value.
    ///
    /// All keys and values are validated before anything is written, so an
    /// error leaves the environment untouched.
    pub fn set<I, K, V>(vars: I) -> Result<Self, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for (key, value) in &vars {
            validate(key, value)?;
        }

        let saved = vars
            .iter()
            .map(|(key, _)| (key.clone(), std::env::var_os(key)))
            .collect();
        for (key, value) in &vars {
            debug!(key = %key, "overriding environment variable");
            std::env::set_var(key, value);
        }
        Ok(Self { saved })
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in self.saved.iter().rev() {
            match previous {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            debug!(key = %key, "restored environment variable");
        }
    }
}

fn validate(key: &str, value: &str) -> Result<(), EnvError> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.contains('=') {
        Some("key contains '='")
    } else if key.contains('\0') {
        Some("key contains a NUL byte")
    } else if value.contains('\0') {
        Some("value contains a NUL byte")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(EnvError::InvalidVar { key: key.to_string(), reason }),
        None => Ok(()),
    }
}

/// Sets `FASTLY_GCS_EMAIL` and `FASTLY_GCS_SECRET_KEY` to one sentinel value
/// for the lifetime of the guard.
#[must_use = "the previous environment is restored when the guard is dropped"]
#[derive(Debug)]
pub struct GcsEnvGuard {
    _inner: EnvGuard,
}

impl GcsEnvGuard {
    pub fn set(value: &str) -> Result<Self, EnvError> {
        let inner = EnvGuard::set([(FASTLY_GCS_EMAIL, value), (FASTLY_GCS_SECRET_KEY, value)])?;
        Ok(Self { _inner: inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEY_A: &str = "FASTLY_TF_ACCTEST_GUARD_A";
    const KEY_B: &str = "FASTLY_TF_ACCTEST_GUARD_B";

    #[test]
    #[serial]
    fn restores_previous_values_and_unset_state() {
        std::env::set_var(KEY_A, "before");
        std::env::remove_var(KEY_B);

        {
            let _guard = EnvGuard::set([(KEY_A, "during"), (KEY_B, "during")]).unwrap();
            assert_eq!(std::env::var(KEY_A).unwrap(), "during");
            assert_eq!(std::env::var(KEY_B).unwrap(), "during");
        }

        assert_eq!(std::env::var(KEY_A).unwrap(), "before");
        assert!(std::env::var_os(KEY_B).is_none());
        std::env::remove_var(KEY_A);
    }

    #[test]
    #[serial]
    fn restores_after_panic() {
        std::env::set_var(KEY_A, "before");

        let result = std::panic::catch_unwind(|| {
            let _guard = EnvGuard::set([(KEY_A, "during")]).unwrap();
            panic!("test body failed");
        });

        assert!(result.is_err());
        assert_eq!(std::env::var(KEY_A).unwrap(), "before");
        std::env::remove_var(KEY_A);
    }

    #[test]
    #[serial]
    fn invalid_value_leaves_environment_untouched() {
        std::env::remove_var(KEY_A);
        let err = EnvGuard::set([(KEY_A, "fine"), (KEY_B, "bad\0value")]).unwrap_err();
        assert!(err.to_string().contains(KEY_B));
        assert!(std::env::var_os(KEY_A).is_none());
    }

    #[test]
    #[serial]
    fn gcs_guard_sets_both_variables() {
        let before_email = std::env::var_os(FASTLY_GCS_EMAIL);
        let before_secret = std::env::var_os(FASTLY_GCS_SECRET_KEY);

        {
            let _guard = GcsEnvGuard::set("someEnv").unwrap();
            assert_eq!(std::env::var(FASTLY_GCS_EMAIL).unwrap(), "someEnv");
            assert_eq!(std::env::var(FASTLY_GCS_SECRET_KEY).unwrap(), "someEnv");
        }

        assert_eq!(std::env::var_os(FASTLY_GCS_EMAIL), before_email);
        assert_eq!(std::env::var_os(FASTLY_GCS_SECRET_KEY), before_secret);
    }
}
