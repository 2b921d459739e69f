use std::collections::HashMap;

use crate::{
    sharder::Md5Sharder,
    toggle::{Segment, Serve, Toggle, Variant},
    FPUser,
};

/// The outcome of evaluating one toggle for one user. Produced per call, never persisted.
///
/// `value` is `None` when the engine degraded (e.g. a variation index pointing outside the
/// variation list); the caller owns the default value and substitutes it. The reason string is
/// always present and explains how the decision was reached.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct EvalDetail {
    pub value: Option<Variant>,
    pub variation_index: Option<usize>,
    pub rule_index: Option<usize>,
    pub version: Option<u64>,
    pub reason: String,
}

impl Toggle {
    /// Evaluate this toggle for the given user.
    ///
    /// Pure and total: no I/O, no locks, and no failure path. Malformed definitions degrade to
    /// an [`EvalDetail`] without a value. Rules are scanned in list order and the first rule
    /// whose conditions all hold wins.
    pub fn eval_detail(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> EvalDetail {
        if !self.enabled {
            return self.resolve(&self.disabled_serve, user, None, "toggle disabled".to_owned());
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.matches(user, segments) {
                return self.resolve(&rule.serve, user, Some(index), format!("rule {index} hit"));
            }
        }

        self.resolve(&self.default_serve, user, None, "default rule".to_owned())
    }

    fn resolve(
        &self,
        serve: &Serve,
        user: &FPUser,
        rule_index: Option<usize>,
        reason: String,
    ) -> EvalDetail {
        let Some(index) = serve.select_variation(user.bucket_key(), &self.key) else {
            return EvalDetail {
                value: None,
                variation_index: None,
                rule_index,
                version: Some(self.version),
                reason: format!("toggle [{}] serve has no selectable variation", self.key),
            };
        };

        match self.variations.get(index) {
            Some(variant) => EvalDetail {
                value: Some(variant.clone()),
                variation_index: Some(index),
                rule_index,
                version: Some(self.version),
                reason,
            },
            // Variation count and serve config can drift independently while a rollout is being
            // edited, so an out-of-range index is a first-class outcome, not a crash.
            None => EvalDetail {
                value: None,
                variation_index: None,
                rule_index,
                version: Some(self.version),
                reason: format!(
                    "variation index overflow, index {} out of range for {} variations",
                    index,
                    self.variations.len()
                ),
            },
        }
    }
}

impl Serve {
    /// Resolve this serve to a variation index for the given bucketing identity. A fixed index
    /// wins; otherwise the user's bucket is matched against the cumulative split ranges and the
    /// first range whose upper bound exceeds the bucket wins.
    pub fn select_variation(&self, bucket_key: &str, toggle_key: &str) -> Option<usize> {
        if let Some(index) = self.select {
            return Some(index);
        }
        let ranges = self.split.as_deref()?;
        let bucket = Md5Sharder.bucket(bucket_key, toggle_key);
        ranges
            .iter()
            .find(|range| bucket < range.upper)
            .map(|range| range.variation)
    }
}
