//! Filter strings shared by the list and search endpoints.
//!
//! Two surface syntaxes exist. The colon syntax (`from:bob label:INBOX -spam`)
//! is used by Gmail and Slack. The comparison syntax
//! (`role = "ROLE_MEMBER" AND create_time > "2024-01-01"`) is used by Chat.
//! Both parse into the same [`Query`], which a per-vendor [`Schema`] evaluates.

pub mod schema;
pub mod tokenize;

use std::fmt;

use crate::error::{SimError, SimResult};

pub use schema::{FieldSpec, Matcher, Schema, UnknownField, lookup, value_text};
use tokenize::Connective;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Op {
    Eq,
    Ne,
    Has,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Has => ":",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Clause {
    pub field: Option<String>,
    pub op: Op,
    pub value: String,
    pub negated: bool,
}

impl Clause {
    pub fn keyword(value: impl Into<String>) -> Self {
        Self {
            field: None,
            op: Op::Has,
            value: value.into(),
            negated: false,
        }
    }

    pub fn field(name: impl Into<String>, op: Op, value: impl Into<String>) -> Self {
        Self {
            field: Some(name.into()),
            op,
            value: value.into(),
            negated: false,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn is_keyword(&self) -> bool {
        self.field.is_none()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "-")?;
        }
        match &self.field {
            Some(field) => write!(f, "{field}{}{:?}", self.op, self.value),
            None => write!(f, "{:?}", self.value),
        }
    }
}

/// How the colon syntax treats a bare `OR` token.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OrMode {
    /// `a OR b` puts the two neighbouring clauses in one group.
    Alternation,
    /// Any `OR` turns every positive keyword into one disjunction. Field
    /// clauses and negations stay required.
    Toggle,
}

/// Which connectives a comparison filter may use.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Connectives {
    pub and: bool,
    pub or: bool,
}

impl Connectives {
    pub const BOTH: Self = Self { and: true, or: true };
    pub const AND_ONLY: Self = Self { and: true, or: false };
    pub const OR_ONLY: Self = Self { and: false, or: true };
}

/// Conjunction of OR-groups. An empty query matches everything.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Query {
    groups: Vec<Vec<Clause>>,
}

impl Query {
    pub fn all(clauses: Vec<Clause>) -> Self {
        Self {
            groups: clauses.into_iter().map(|clause| vec![clause]).collect(),
        }
    }

    pub fn groups(&self) -> &[Vec<Clause>] {
        &self.groups
    }

    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.groups.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Values of every positive clause on `field`.
    pub fn values_of<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.clauses()
            .filter(move |clause| !clause.negated && clause.field.as_deref() == Some(field))
            .map(|clause| clause.value.as_str())
    }

    pub fn matches(&self, entity: &serde_json::Value, schema: &Schema) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|clause| schema.eval(clause, entity)))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" OR ")
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        write!(f, "{rendered}")
    }
}

/// Parses `field:value` tokens, quoted values, `-` negation and bare keywords.
pub fn parse_colon(input: &str, or_mode: OrMode) -> Query {
    let mut groups: Vec<Vec<Clause>> = Vec::new();
    let mut pending_or = false;
    let mut disjunctive = false;

    for word in tokenize::words(input) {
        if word == "OR" {
            pending_or = true;
            disjunctive = true;
            continue;
        }

        let clause = colon_clause(&word);
        let joins_previous = or_mode == OrMode::Alternation && pending_or && !clause.negated;
        match groups.last_mut() {
            Some(last) if joins_previous => last.push(clause),
            _ => groups.push(vec![clause]),
        }
        pending_or = false;
    }

    if or_mode == OrMode::Toggle && disjunctive {
        let (words, required): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .flatten()
            .partition(|clause| clause.is_keyword() && !clause.negated);
        let mut merged: Vec<Vec<Clause>> = required.into_iter().map(|c| vec![c]).collect();
        if !words.is_empty() {
            merged.push(words);
        }
        return Query { groups: merged };
    }

    Query { groups }
}

fn colon_clause(word: &str) -> Clause {
    let (negated, body) = match word.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, word),
    };

    let clause = match body.split_once(':') {
        Some((field, value)) if !field.is_empty() => {
            Clause::field(field.to_lowercase(), Op::Has, value)
        }
        _ => Clause::keyword(body),
    };

    if negated { clause.negate() } else { clause }
}

/// Parses `field <op> value` segments joined by `AND` / `OR`.
///
/// `OR` binds tighter than `AND`, so `a OR b AND c` is `(a OR b) AND c`.
pub fn parse_comparison(input: &str, allowed: Connectives) -> SimResult<Query> {
    let mut groups: Vec<Vec<Clause>> = Vec::new();

    for (connective, segment) in tokenize::split_connectives(input) {
        match connective {
            Some(Connective::And) if !allowed.and => {
                return Err(SimError::invalid(
                    "'AND' operator is not supported. Use 'OR' instead.",
                ));
            }
            Some(Connective::Or) if !allowed.or => {
                return Err(SimError::invalid(
                    "'OR' operator is not supported. Use 'AND' instead.",
                ));
            }
            _ => {}
        }

        let clause = comparison_clause(&segment)?;
        match (connective, groups.last_mut()) {
            (Some(Connective::Or), Some(last)) => last.push(clause),
            _ => groups.push(vec![clause]),
        }
    }

    Ok(Query { groups })
}

fn comparison_clause(segment: &str) -> SimResult<Clause> {
    let (field, op, value) = tokenize::split_operator(segment)
        .ok_or_else(|| SimError::invalid(format!("invalid filter expression: {segment}")))?;
    Ok(Clause::field(field, op, value))
}
