use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// A complete snapshot of toggle and segment definitions. This is the response format of the
/// toggles endpoint.
///
/// A repository is immutable once published: the synchronizer replaces the whole snapshot, so
/// readers never observe a mix of old and new definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default)]
    pub toggles: HashMap<String, Toggle>,
    #[serde(default)]
    pub segments: HashMap<String, Segment>,
}

/// A named feature flag: enabled state, an ordered variation list, and ordered targeting rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Toggle {
    pub key: String,
    pub enabled: bool,
    /// Monotonic counter bumped by the source of truth whenever the definition changes.
    pub version: u64,
    pub disabled_serve: Serve,
    pub default_serve: Serve,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub variations: Vec<Variant>,
}

/// A resolved-or-resolvable choice of variation: a fixed index, or a percentage split across
/// variation indices. A fixed index takes precedence when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Serve {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<Vec<SplitRange>>,
}

impl Serve {
    /// A serve with a fixed variation index.
    pub fn select(index: usize) -> Serve {
        Serve {
            select: Some(index),
            split: None,
        }
    }

    /// A serve distributing users across the given cumulative ranges.
    pub fn split(ranges: Vec<SplitRange>) -> Serve {
        Serve {
            select: None,
            split: Some(ranges),
        }
    }
}

/// One entry of a percentage split: users whose bucket falls below `upper` (and above the
/// previous entry's bound) are served `variation`. An ordered list of entries covers the full
/// [0, 1) range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SplitRange {
    pub upper: f64,
    pub variation: usize,
}

/// An ordered, conditionally-matched override of the default serve. Conditions are combined with
/// AND semantics; a rule with no conditions matches every user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Rule {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub serve: Serve,
}

/// A reusable, named user-matching predicate referenced by segment conditions. A segment only
/// ever contributes a boolean membership result; it cannot select variations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Segment {
    pub unique_id: String,
    pub version: u64,
    #[serde(default)]
    pub rules: Vec<SegmentRule>,
}

/// A rule inside a segment: conditions only, no serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SegmentRule {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `Condition` is a check that the user attribute named `subject` matches the `objects` operands
/// under the given `predicate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub subject: String,
    pub predicate: Predicate,
    #[serde(default)]
    pub objects: Vec<String>,
}

/// How a condition's subject and operands are interpreted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    /// Plain string comparison against the operand list.
    String,
    /// Segment membership. Operands are segment keys; the subject is ignored.
    Segment,
    /// Epoch-seconds comparison. Falls back to the current time when the subject attribute is
    /// absent, so time-window rules work without a per-user attribute.
    Datetime,
    /// Numeric comparison. Attribute and operands must parse as numbers.
    Number,
    /// Semantic-version comparison. Attribute and operands must parse as semver strings.
    Semver,
}

/// Possible condition predicates. The wire strings are shared across SDKs.
///
/// Positive predicates hold if ANY operand satisfies them; negated predicates are their exact
/// complements and must hold against ALL operands. A missing subject attribute fails the
/// condition either way (datetime being the exception, see [`ConditionKind::Datetime`]).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[allow(missing_docs)]
pub enum Predicate {
    #[serde(rename = "is one of")]
    IsOneOf,
    #[serde(rename = "is not any of")]
    IsNotAnyOf,
    #[serde(rename = "starts with")]
    StartsWith,
    #[serde(rename = "does not start with")]
    NotStartWith,
    #[serde(rename = "ends with")]
    EndsWith,
    #[serde(rename = "does not end with")]
    NotEndWith,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does not contain")]
    NotContain,
    #[serde(rename = "matches regex")]
    MatchesRegex,
    #[serde(rename = "does not match regex")]
    NotMatchRegex,
    #[serde(rename = "is in")]
    IsIn,
    #[serde(rename = "is not in")]
    IsNotIn,
    #[serde(rename = "after")]
    After,
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

/// A variation value. Toggles are runtime-typed: each variation is one of four kinds, and the
/// facade converts to the accessor's requested kind through the explicit `as_*`/`to_*` functions
/// below. There is no implicit coercion between kinds.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    /// A boolean value.
    Boolean(bool),
    /// A numeric value. JSON integers land here too.
    Number(f64),
    /// A string value.
    String(String),
    /// Arbitrary structured value. Also catches `null`, arrays and objects during parsing.
    Json(serde_json::Value),
}

impl Variant {
    /// Returns the value if it is of kind Boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Variant::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value if it is of kind Number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Variant::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value if it is of kind String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(value) => Some(value),
            _ => None,
        }
    }

    /// Convert any kind to a JSON value. Total: the JSON accessor accepts every kind.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Variant::Boolean(value) => serde_json::Value::Bool(*value),
            Variant::Number(value) => serde_json::Value::from(*value),
            Variant::String(value) => serde_json::Value::String(value.clone()),
            Variant::Json(value) => value.clone(),
        }
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{Repository, Variant};

    #[test]
    fn parse_snapshot_document() {
        let repo: Repository = serde_json::from_str(
            r#"
              {
                "segments": {
                  "beta_users": {
                    "uniqueId": "beta_users",
                    "version": 2,
                    "rules": [
                      {
                        "conditions": [
                          {"type": "string", "subject": "plan", "predicate": "is one of", "objects": ["beta"]}
                        ]
                      }
                    ]
                  }
                },
                "toggles": {
                  "promo_banner": {
                    "key": "promo_banner",
                    "enabled": true,
                    "version": 7,
                    "disabledServe": {"select": 0},
                    "defaultServe": {"split": [{"upper": 0.5, "variation": 0}, {"upper": 1.0, "variation": 1}]},
                    "rules": [
                      {
                        "conditions": [
                          {"type": "segment", "subject": "", "predicate": "is in", "objects": ["beta_users"]}
                        ],
                        "serve": {"select": 1}
                      }
                    ],
                    "variations": [false, true]
                  }
                }
              }
            "#,
        )
        .unwrap();

        let toggle = &repo.toggles["promo_banner"];
        assert_eq!(toggle.version, 7);
        assert_eq!(toggle.rules.len(), 1);
        assert_eq!(toggle.variations, vec![false.into(), true.into()]);
        let split = toggle.default_serve.split.as_ref().unwrap();
        assert_eq!(split[0].upper, 0.5);
        assert_eq!(split[1].variation, 1);
        assert_eq!(repo.segments["beta_users"].version, 2);
    }

    #[test]
    fn parse_empty_snapshot() {
        let repo: Repository = serde_json::from_str("{}").unwrap();
        assert!(repo.toggles.is_empty());
        assert!(repo.segments.is_empty());
    }

    #[test]
    fn variant_kinds_parse_untagged() {
        let variants: Vec<Variant> =
            serde_json::from_str(r#"[true, 1, 2.5, "red", {"size": 10}, [1, 2], null]"#).unwrap();
        assert_eq!(variants[0].as_boolean(), Some(true));
        assert_eq!(variants[1].as_number(), Some(1.0));
        assert_eq!(variants[2].as_number(), Some(2.5));
        assert_eq!(variants[3].as_str(), Some("red"));
        assert!(matches!(variants[4], Variant::Json(_)));
        assert!(matches!(variants[5], Variant::Json(_)));
        assert!(matches!(variants[6], Variant::Json(_)));
    }

    #[test]
    fn variant_conversions_are_kind_exact() {
        let number = Variant::Number(2.0);
        assert_eq!(number.as_boolean(), None);
        assert_eq!(number.as_str(), None);
        assert_eq!(number.to_json(), serde_json::json!(2.0));

        let json = Variant::Json(serde_json::json!({"a": 1}));
        assert_eq!(json.as_number(), None);
        assert_eq!(json.to_json(), serde_json::json!({"a": 1}));
    }
}
