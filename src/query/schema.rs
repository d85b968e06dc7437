use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::Value;

use super::{Clause, Op};

pub type Predicate = fn(&Value, &Clause) -> bool;

/// How a clause value is compared against the field it names.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    Exact,
    ExactIgnoreCase,
    /// Case-insensitive substring.
    Contains,
    /// Field is an array; case-insensitive membership.
    ListContains,
    Bool,
    /// Numeric when both sides parse as numbers, lexical otherwise.
    Ordered,
    Custom(Predicate),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub path: &'static str,
    pub matcher: Matcher,
}

impl FieldSpec {
    pub const fn new(name: &'static str, path: &'static str, matcher: Matcher) -> Self {
        Self {
            name,
            path,
            matcher,
        }
    }

    fn matches(&self, entity: &Value, clause: &Clause) -> bool {
        let target = lookup(entity, self.path);
        let expected = clause.value.as_str();

        let hit = match self.matcher {
            Matcher::Custom(predicate) => return predicate(entity, clause),
            Matcher::Ordered => return ordered(target, clause.op, expected),
            Matcher::Exact => value_text(target).is_some_and(|found| found == expected),
            Matcher::ExactIgnoreCase => {
                value_text(target).is_some_and(|found| found.eq_ignore_ascii_case(expected))
            }
            Matcher::Contains => value_text(target).is_some_and(|found| contains_ci(&found, expected)),
            Matcher::ListContains => target.and_then(Value::as_array).is_some_and(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|item| item.eq_ignore_ascii_case(expected))
            }),
            Matcher::Bool => match (target.and_then(Value::as_bool), parse_bool(expected)) {
                (Some(found), Some(wanted)) => found == wanted,
                _ => false,
            },
        };

        match clause.op {
            Op::Eq | Op::Has => hit,
            Op::Ne => !hit,
            Op::Gt | Op::Ge | Op::Lt | Op::Le => false,
        }
    }
}

/// What to do with a clause naming a field the schema does not know.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UnknownField {
    MatchAll,
    MatchNone,
    /// Treat the whole `field:value` token as a bare keyword.
    Keyword,
}

/// Field table for one filterable resource.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
    pub keywords: &'static [&'static str],
    pub unknown: UnknownField,
    /// Allows `*` in keywords as a wildcard.
    pub wildcards: bool,
}

impl Schema {
    pub const fn new(fields: &'static [FieldSpec], unknown: UnknownField) -> Self {
        Self {
            fields,
            keywords: &[],
            unknown,
            wildcards: false,
        }
    }

    pub const fn with_keywords(mut self, keywords: &'static [&'static str]) -> Self {
        self.keywords = keywords;
        self
    }

    pub const fn with_wildcards(mut self) -> Self {
        self.wildcards = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    pub fn eval(&self, clause: &Clause, entity: &Value) -> bool {
        let hit = match clause.field.as_deref() {
            None => self.keyword(&clause.value, entity),
            Some(name) => match self.field(name) {
                Some(spec) => spec.matches(entity, clause),
                None => match self.unknown {
                    UnknownField::MatchAll => return true,
                    UnknownField::MatchNone => false,
                    UnknownField::Keyword => {
                        self.keyword(&format!("{name}:{}", clause.value), entity)
                    }
                },
            },
        };

        hit != clause.negated
    }

    fn keyword(&self, word: &str, entity: &Value) -> bool {
        let texts = self
            .keywords
            .iter()
            .filter_map(|path| value_text(lookup(entity, path)));

        if self.wildcards && word.contains('*') {
            let pattern = word
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let Ok(regex) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
                return false;
            };
            return texts.into_iter().any(|text| regex.is_match(&text));
        }

        texts.into_iter().any(|text| contains_ci(&text, word))
    }
}

/// Follows a dotted path through nested objects.
pub fn lookup<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(entity, |current, segment| current.get(segment))
}

/// Scalar rendered as text. Arrays, objects and null have no text form.
pub fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn ordered(target: Option<&Value>, op: Op, expected: &str) -> bool {
    let Some(found) = value_text(target) else {
        return op == Op::Ne;
    };

    let ordering = match (found.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(left), Ok(right)) => left.partial_cmp(&right),
        _ => Some(found.as_str().cmp(expected)),
    };
    let Some(ordering) = ordering else {
        return false;
    };

    match op {
        Op::Eq | Op::Has => ordering == Ordering::Equal,
        Op::Ne => ordering != Ordering::Equal,
        Op::Gt => ordering == Ordering::Greater,
        Op::Ge => ordering != Ordering::Less,
        Op::Lt => ordering == Ordering::Less,
        Op::Le => ordering != Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Connectives, OrMode, parse_colon, parse_comparison};
    use serde_json::json;

    const MESSAGES: Schema = Schema::new(
        &[
            FieldSpec::new("from", "sender", Matcher::ExactIgnoreCase),
            FieldSpec::new("label", "labelIds", Matcher::ListContains),
            FieldSpec::new("subject", "subject", Matcher::Contains),
        ],
        UnknownField::Keyword,
    )
    .with_keywords(&["subject", "body"]);

    const SPACES: Schema = Schema::new(
        &[
            FieldSpec::new("create_time", "createTime", Matcher::Ordered),
            FieldSpec::new("external_user_allowed", "externalUserAllowed", Matcher::Bool),
            FieldSpec::new("member.type", "member.type", Matcher::Exact),
        ],
        UnknownField::MatchAll,
    );

    #[test]
    fn label_filter_selects_only_labelled_entities() {
        let inbox = json!({ "labelIds": ["INBOX"], "subject": "a" });
        let sent = json!({ "labelIds": ["SENT"], "subject": "b" });
        let query = parse_colon("label:inbox", OrMode::Alternation);

        let hits: Vec<_> = [&inbox, &sent]
            .into_iter()
            .filter(|message| query.matches(message, &MESSAGES))
            .collect();
        assert_eq!(hits, vec![&inbox]);
    }

    #[test]
    fn keywords_search_configured_paths() {
        let message = json!({ "subject": "Quarterly Report", "body": "numbers" });
        assert!(parse_colon("quarterly", OrMode::Alternation).matches(&message, &MESSAGES));
        assert!(!parse_colon("-numbers", OrMode::Alternation).matches(&message, &MESSAGES));
    }

    #[test]
    fn unknown_fields_follow_schema_policy() {
        let message = json!({ "subject": "see cc:team", "body": "" });
        assert!(parse_colon("cc:team", OrMode::Alternation).matches(&message, &MESSAGES));

        let space = json!({ "createTime": "2024-01-01" });
        let query = parse_comparison(r#"mystery = "x""#, Connectives::BOTH).expect("filter");
        assert!(query.matches(&space, &SPACES));
    }

    #[test]
    fn ordered_fields_compare_lexically() {
        let space = json!({ "createTime": "2024-05-01T00:00:00Z" });
        let after = parse_comparison(r#"create_time >= "2024-05-01T00:00:00Z""#, Connectives::BOTH)
            .expect("filter");
        let before =
            parse_comparison(r#"create_time < "2024-01-01""#, Connectives::BOTH).expect("filter");

        assert!(after.matches(&space, &SPACES));
        assert!(!before.matches(&space, &SPACES));
    }

    #[test]
    fn nested_paths_and_not_equal() {
        let bot = json!({ "member": { "type": "BOT" } });
        let human_only =
            parse_comparison(r#"member.type != "BOT""#, Connectives::BOTH).expect("filter");
        assert!(!human_only.matches(&bot, &SPACES));
    }

    #[test]
    fn bool_fields_parse_clause_values() {
        let space = json!({ "externalUserAllowed": true });
        let query =
            parse_comparison("external_user_allowed = true", Connectives::BOTH).expect("filter");
        assert!(query.matches(&space, &SPACES));
    }

    #[test]
    fn wildcard_keywords_match_case_insensitively() {
        let schema = Schema::new(&[], UnknownField::MatchNone)
            .with_keywords(&["text"])
            .with_wildcards();
        let message = json!({ "text": "Deploying release-42 now" });

        assert!(parse_colon("rel*42", OrMode::Toggle).matches(&message, &schema));
        assert!(!parse_colon("rel*43", OrMode::Toggle).matches(&message, &schema));
    }
}
