use std::collections::HashMap;

use chrono::Utc;
use regex::Regex;
use semver::Version;

use crate::{
    toggle::{Condition, ConditionKind, Predicate, Rule, Segment, SegmentRule},
    FPUser,
};

impl Rule {
    pub(crate) fn matches(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(user, segments))
    }
}

impl SegmentRule {
    pub(crate) fn matches(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(user, segments))
    }
}

impl Segment {
    /// Whether the user is a member of this segment. Segment conditions recurse through the same
    /// condition machinery; the data is acyclic (segments never reference toggles).
    pub fn contains(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> bool {
        self.rules.iter().any(|rule| rule.matches(user, segments))
    }
}

impl Condition {
    /// Applying the condition to the user. Returns `false` if the predicate cannot be applied or
    /// there's a misconfiguration.
    pub(crate) fn matches(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> bool {
        self.try_match(user, segments).unwrap_or(false)
    }

    /// Try applying the condition, returning `None` when it cannot be applied: a missing subject
    /// attribute, an unparsable attribute value, or a kind/predicate mismatch.
    fn try_match(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> Option<bool> {
        match self.kind {
            ConditionKind::String => self.match_string(user.attr(&self.subject)?),
            ConditionKind::Segment => self.match_segment(user, segments),
            ConditionKind::Datetime => self.match_datetime(user.attr(&self.subject)),
            ConditionKind::Number => {
                self.match_ordered(user.attr(&self.subject)?, |s| s.trim().parse::<f64>().ok())
            }
            ConditionKind::Semver => {
                self.match_ordered(user.attr(&self.subject)?, |s| Version::parse(s.trim()).ok())
            }
        }
    }

    fn match_string(&self, attr: &str) -> Option<bool> {
        let any = |hit: &dyn Fn(&str) -> bool| self.objects.iter().any(|o| hit(o));
        match self.predicate {
            Predicate::IsOneOf => Some(any(&|o| o == attr)),
            Predicate::IsNotAnyOf => Some(!any(&|o| o == attr)),
            Predicate::StartsWith => Some(any(&|o| attr.starts_with(o))),
            Predicate::NotStartWith => Some(!any(&|o| attr.starts_with(o))),
            Predicate::EndsWith => Some(any(&|o| attr.ends_with(o))),
            Predicate::NotEndWith => Some(!any(&|o| attr.ends_with(o))),
            Predicate::Contains => Some(any(&|o| attr.contains(o))),
            Predicate::NotContain => Some(!any(&|o| attr.contains(o))),
            // An operand that fails to compile as a regex simply doesn't match.
            Predicate::MatchesRegex => {
                Some(any(&|o| Regex::new(o).is_ok_and(|re| re.is_match(attr))))
            }
            Predicate::NotMatchRegex => {
                Some(!any(&|o| Regex::new(o).is_ok_and(|re| re.is_match(attr))))
            }
            _ => None,
        }
    }

    fn match_segment(&self, user: &FPUser, segments: &HashMap<String, Segment>) -> Option<bool> {
        let in_any = self.objects.iter().any(|key| {
            segments
                .get(key)
                .is_some_and(|segment| segment.contains(user, segments))
        });
        match self.predicate {
            Predicate::IsIn => Some(in_any),
            Predicate::IsNotIn => Some(!in_any),
            _ => None,
        }
    }

    fn match_datetime(&self, attr: Option<&str>) -> Option<bool> {
        let value = match attr {
            Some(s) => s.trim().parse::<i64>().ok()?,
            None => Utc::now().timestamp(),
        };
        let operands = || self.objects.iter().filter_map(|o| o.trim().parse::<i64>().ok());
        match self.predicate {
            Predicate::After => Some(operands().any(|t| value >= t)),
            Predicate::Before => Some(operands().any(|t| value < t)),
            _ => None,
        }
    }

    fn match_ordered<T, F>(&self, attr: &str, parse: F) -> Option<bool>
    where
        T: PartialOrd,
        F: Fn(&str) -> Option<T>,
    {
        let value = parse(attr)?;
        let mut operands = self.objects.iter().filter_map(|o| parse(o));
        match self.predicate {
            Predicate::Eq => Some(operands.any(|o| value == o)),
            Predicate::Neq => Some(operands.all(|o| value != o)),
            Predicate::Gt => Some(operands.any(|o| value > o)),
            Predicate::Gte => Some(operands.any(|o| value >= o)),
            Predicate::Lt => Some(operands.any(|o| value < o)),
            Predicate::Lte => Some(operands.any(|o| value <= o)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{
        toggle::{Condition, ConditionKind, Predicate, Rule, Segment, SegmentRule, Serve},
        FPUser,
    };

    fn cond(kind: ConditionKind, subject: &str, predicate: Predicate, objects: &[&str]) -> Condition {
        Condition {
            kind,
            subject: subject.to_owned(),
            predicate,
            objects: objects.iter().map(|o| (*o).to_owned()).collect(),
        }
    }

    fn no_segments() -> HashMap<String, Segment> {
        HashMap::new()
    }

    fn matches(condition: &Condition, user: &FPUser) -> bool {
        condition.matches(user, &no_segments())
    }

    #[test]
    fn string_is_one_of() {
        let c = cond(ConditionKind::String, "city", Predicate::IsOneOf, &["1", "4"]);
        assert!(matches(&c, &FPUser::new().with("city", "4")));
        assert!(!matches(&c, &FPUser::new().with("city", "2")));
    }

    #[test]
    fn string_is_not_any_of() {
        let c = cond(ConditionKind::String, "city", Predicate::IsNotAnyOf, &["1", "4"]);
        assert!(matches(&c, &FPUser::new().with("city", "2")));
        assert!(!matches(&c, &FPUser::new().with("city", "4")));
    }

    #[test]
    fn missing_attribute_fails_even_negated_predicates() {
        let user = FPUser::new();
        assert!(!matches(
            &cond(ConditionKind::String, "city", Predicate::IsNotAnyOf, &["1"]),
            &user
        ));
        assert!(!matches(
            &cond(ConditionKind::String, "city", Predicate::NotContain, &["1"]),
            &user
        ));
        assert!(!matches(
            &cond(ConditionKind::Number, "age", Predicate::Neq, &["1"]),
            &user
        ));
    }

    #[test]
    fn string_affixes() {
        let user = FPUser::new().with("email", "alice@example.com");
        assert!(matches(
            &cond(ConditionKind::String, "email", Predicate::StartsWith, &["alice"]),
            &user
        ));
        assert!(matches(
            &cond(ConditionKind::String, "email", Predicate::EndsWith, &["@example.com"]),
            &user
        ));
        assert!(matches(
            &cond(ConditionKind::String, "email", Predicate::Contains, &["@"]),
            &user
        ));
        assert!(!matches(
            &cond(ConditionKind::String, "email", Predicate::NotEndWith, &["@example.com"]),
            &user
        ));
    }

    #[test]
    fn string_regex() {
        let user = FPUser::new().with("email", "test@example.com");
        assert!(matches(
            &cond(ConditionKind::String, "email", Predicate::MatchesRegex, &["^test.*"]),
            &user
        ));
        assert!(!matches(
            &cond(ConditionKind::String, "email", Predicate::MatchesRegex, &["^example.*"]),
            &user
        ));
        // An invalid pattern never matches, and its complement always does.
        assert!(!matches(
            &cond(ConditionKind::String, "email", Predicate::MatchesRegex, &["("]),
            &user
        ));
        assert!(matches(
            &cond(ConditionKind::String, "email", Predicate::NotMatchRegex, &["("]),
            &user
        ));
    }

    #[test]
    fn number_comparisons() {
        let user = FPUser::new().with("age", "20");
        assert!(matches(&cond(ConditionKind::Number, "age", Predicate::Eq, &["20"]), &user));
        assert!(matches(&cond(ConditionKind::Number, "age", Predicate::Gte, &["20"]), &user));
        assert!(matches(&cond(ConditionKind::Number, "age", Predicate::Gt, &["19.5"]), &user));
        assert!(matches(&cond(ConditionKind::Number, "age", Predicate::Lt, &["100"]), &user));
        assert!(!matches(&cond(ConditionKind::Number, "age", Predicate::Lt, &["20"]), &user));
    }

    #[test]
    fn number_any_of_vs_all_of() {
        let user = FPUser::new().with("age", "20");
        // positive predicates hold if any operand satisfies them
        assert!(matches(
            &cond(ConditionKind::Number, "age", Predicate::Eq, &["10", "20"]),
            &user
        ));
        // != must hold against all operands
        assert!(!matches(
            &cond(ConditionKind::Number, "age", Predicate::Neq, &["10", "20"]),
            &user
        ));
        assert!(matches(
            &cond(ConditionKind::Number, "age", Predicate::Neq, &["10", "30"]),
            &user
        ));
    }

    #[test]
    fn number_unparsable_attribute_fails() {
        let user = FPUser::new().with("age", "old");
        assert!(!matches(&cond(ConditionKind::Number, "age", Predicate::Gt, &["1"]), &user));
    }

    #[test]
    fn semver_comparisons() {
        let user = FPUser::new().with("app_version", "1.2.0");
        assert!(matches(
            &cond(ConditionKind::Semver, "app_version", Predicate::Gte, &["1.2.0"]),
            &user
        ));
        // 1.2.0 < 1.10.0 under semver ordering, not string ordering
        assert!(matches(
            &cond(ConditionKind::Semver, "app_version", Predicate::Lt, &["1.10.0"]),
            &user
        ));
        assert!(!matches(
            &cond(ConditionKind::Semver, "app_version", Predicate::Gt, &["1.10.0"]),
            &user
        ));
        assert!(matches(
            &cond(ConditionKind::Semver, "app_version", Predicate::Neq, &["1.3.0"]),
            &user
        ));
    }

    #[test]
    fn datetime_against_attribute() {
        let user = FPUser::new().with("signup", "1700000000");
        assert!(matches(
            &cond(ConditionKind::Datetime, "signup", Predicate::After, &["1600000000"]),
            &user
        ));
        assert!(matches(
            &cond(ConditionKind::Datetime, "signup", Predicate::Before, &["1800000000"]),
            &user
        ));
        assert!(!matches(
            &cond(ConditionKind::Datetime, "signup", Predicate::Before, &["1700000000"]),
            &user
        ));
    }

    #[test]
    fn datetime_falls_back_to_now() {
        let user = FPUser::new();
        // launch date far in the past: already live
        assert!(matches(
            &cond(ConditionKind::Datetime, "", Predicate::After, &["1000000000"]),
            &user
        ));
        // sunset date far in the future: not reached yet
        assert!(matches(
            &cond(ConditionKind::Datetime, "", Predicate::Before, &["99999999999"]),
            &user
        ));
    }

    #[test]
    fn kind_predicate_mismatch_fails() {
        let user = FPUser::new().with("city", "4");
        assert!(!matches(&cond(ConditionKind::String, "city", Predicate::Gt, &["1"]), &user));
        assert!(!matches(&cond(ConditionKind::Number, "city", Predicate::Contains, &["4"]), &user));
    }

    fn segment_of(key: &str, conditions: Vec<Condition>) -> HashMap<String, Segment> {
        HashMap::from([(
            key.to_owned(),
            Segment {
                unique_id: key.to_owned(),
                version: 1,
                rules: vec![SegmentRule { conditions }],
            },
        )])
    }

    #[test]
    fn segment_membership() {
        let segments = segment_of(
            "city_four",
            vec![cond(ConditionKind::String, "city", Predicate::IsOneOf, &["4"])],
        );
        let is_in = cond(ConditionKind::Segment, "", Predicate::IsIn, &["city_four"]);
        let is_not_in = cond(ConditionKind::Segment, "", Predicate::IsNotIn, &["city_four"]);

        let insider = FPUser::new().with("city", "4");
        let outsider = FPUser::new().with("city", "2");
        assert!(is_in.matches(&insider, &segments));
        assert!(!is_in.matches(&outsider, &segments));
        assert!(!is_not_in.matches(&insider, &segments));
        assert!(is_not_in.matches(&outsider, &segments));
    }

    #[test]
    fn unknown_segment_is_not_a_member() {
        let is_in = cond(ConditionKind::Segment, "", Predicate::IsIn, &["missing"]);
        let is_not_in = cond(ConditionKind::Segment, "", Predicate::IsNotIn, &["missing"]);
        let user = FPUser::new();
        assert!(!is_in.matches(&user, &no_segments()));
        assert!(is_not_in.matches(&user, &no_segments()));
    }

    #[test]
    fn rule_is_short_circuit_and() {
        let rule = Rule {
            conditions: vec![
                cond(ConditionKind::Number, "age", Predicate::Gt, &["18"]),
                cond(ConditionKind::Number, "age", Predicate::Lt, &["100"]),
            ],
            serve: Serve::select(0),
        };
        assert!(rule.matches(&FPUser::new().with("age", "20"), &no_segments()));
        assert!(!rule.matches(&FPUser::new().with("age", "17"), &no_segments()));
        assert!(!rule.matches(&FPUser::new().with("age", "110"), &no_segments()));
    }

    #[test]
    fn empty_rule_matches_everyone() {
        let rule = Rule {
            conditions: vec![],
            serve: Serve::select(0),
        };
        assert!(rule.matches(&FPUser::new(), &no_segments()));
    }
}
