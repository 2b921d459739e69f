use std::collections::HashMap;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// A user (or any other evaluation subject) as seen by the toggle evaluation engine: an identity
/// key used for percentage-rollout bucketing plus free-form string attributes matched by rule
/// conditions.
///
/// `FPUser` is built in a chaining style:
///
/// ```
/// # use featuregate_core::FPUser;
/// let user = FPUser::new().with("city", "paris").with("plan", "pro");
/// ```
#[derive(Debug, Clone)]
pub struct FPUser {
    key: String,
    attrs: HashMap<String, String>,
    stable_rollout_key: Option<String>,
}

impl FPUser {
    /// Create a user with a randomly generated identity key.
    pub fn new() -> FPUser {
        let key: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        FPUser {
            key,
            attrs: HashMap::new(),
            stable_rollout_key: None,
        }
    }

    /// Create a user with an explicit identity key.
    pub fn with_key(key: impl Into<String>) -> FPUser {
        FPUser {
            key: key.into(),
            attrs: HashMap::new(),
            stable_rollout_key: None,
        }
    }

    /// Attach one attribute.
    pub fn with(mut self, attr: impl Into<String>, value: impl Into<String>) -> FPUser {
        self.attrs.insert(attr.into(), value.into());
        self
    }

    /// Pin the bucketing identity so repeated evaluations of percentage-split toggles always land
    /// in the same bucket. Intended for reproducible test fixtures rather than production
    /// traffic.
    pub fn stable_rollout(mut self, key: impl Into<String>) -> FPUser {
        self.stable_rollout_key = Some(key.into());
        self
    }

    /// The user's identity key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Look up one attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// The identity used for percentage-rollout bucketing: the stable-rollout key when pinned,
    /// the user key otherwise.
    pub fn bucket_key(&self) -> &str {
        self.stable_rollout_key.as_deref().unwrap_or(&self.key)
    }
}

impl Default for FPUser {
    fn default() -> FPUser {
        FPUser::new()
    }
}

#[cfg(test)]
mod tests {
    use super::FPUser;

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(FPUser::new().key(), FPUser::new().key());
    }

    #[test]
    fn stable_rollout_overrides_bucket_key() {
        let user = FPUser::with_key("user-1");
        assert_eq!(user.bucket_key(), "user-1");

        let pinned = FPUser::with_key("user-1").stable_rollout("pinned");
        assert_eq!(pinned.bucket_key(), "pinned");
        assert_eq!(pinned.key(), "user-1");
    }

    #[test]
    fn attributes_are_retrievable() {
        let user = FPUser::new().with("city", "4");
        assert_eq!(user.attr("city"), Some("4"));
        assert_eq!(user.attr("country"), None);
    }
}
