use std::collections::BTreeMap;

use tracing::debug;

use super::dates::looks_like_tenure;
use super::vocab::{is_job_type, is_work_mode};
use crate::record::ExperienceEntry;

/// Middle dot joining sub-values inside one fragment.
pub const DELIMITER: char = '·';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    JobType,
    WorkMode,
    Location,
    Tenurity,
    Duration,
    TotalDuration,
}

/// Where a fragment goes when no structural or vocabulary rule claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    /// Part before the delimiter.
    pub head: Field,
    /// Part after the delimiter.
    pub tail: Field,
    /// Whole fragment when there is no delimiter.
    pub lone: Field,
}

impl Defaults {
    pub const fn split(head: Field, tail: Field) -> Self {
        Self { head, tail, lone: head }
    }

    pub const fn lone(self, lone: Field) -> Self {
        Self { lone, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    TenureRange,
    Location,
    JobType,
    Positional,
}

fn is_tenure_range(fragment: &str, delimiter: char) -> bool {
    fragment.contains(delimiter) && looks_like_tenure(fragment)
}

fn is_location(fragment: &str, _delimiter: char) -> bool {
    fragment.contains(',') || is_work_mode(fragment)
}

fn is_job_type_value(fragment: &str, _delimiter: char) -> bool {
    is_job_type(fragment)
}

/// Checked top to bottom; the first predicate that holds decides the rule.
/// Anything left over is `Rule::Positional`.
const RULES: &[(Rule, fn(&str, char) -> bool)] = &[
    (Rule::TenureRange, is_tenure_range),
    (Rule::Location, is_location),
    (Rule::JobType, is_job_type_value),
];

pub fn matching_rule(fragment: &str, delimiter: char) -> Rule {
    let fragment = fragment.trim();
    RULES
        .iter()
        .find(|(_, applies)| applies(fragment, delimiter))
        .map(|(rule, _)| *rule)
        .unwrap_or(Rule::Positional)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    values: BTreeMap<Field, String>,
    rule: Option<Rule>,
}

impl Classification {
    fn assign(&mut self, field: Field, part: &str) {
        let part = part.trim();
        if !part.is_empty() {
            self.values.insert(field, part.to_string());
        }
    }

    /// Rule that fired; `None` for an empty fragment.
    pub fn rule(&self) -> Option<Rule> {
        self.rule
    }

    /// True when no part of the fragment landed in a field.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Overwrite the matching slots of `entry`; fields this classification
    /// did not produce are left alone.
    pub fn apply_to(&self, entry: &mut ExperienceEntry) {
        for (field, value) in self.iter() {
            let slot = match field {
                Field::JobType => &mut entry.job_type,
                Field::WorkMode => &mut entry.work_mode,
                Field::Location => &mut entry.location,
                Field::Tenurity => &mut entry.tenurity,
                Field::Duration => &mut entry.duration,
                Field::TotalDuration => &mut entry.total_duration,
            };
            *slot = value.to_string();
        }
    }
}

#[cfg(test)]
impl Classification {
    /// The value assigned to `field`, or the sentinel.
    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or(crate::record::NOT_FOUND)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Assign the parts of one raw fragment to typed fields. A fragment no rule
/// claims goes where `defaults` says.
pub fn classify(fragment: &str, delimiter: char, defaults: Defaults) -> Classification {
    classify_with(fragment, delimiter, Some(defaults))
}

/// Like [`classify`], but a fragment no rule claims is dropped: the result
/// is empty with `Rule::Positional` recorded.
pub fn classify_claimed(fragment: &str, delimiter: char) -> Classification {
    classify_with(fragment, delimiter, None)
}

fn classify_with(fragment: &str, delimiter: char, defaults: Option<Defaults>) -> Classification {
    let fragment = fragment.trim();
    let mut out = Classification::default();
    if fragment.is_empty() {
        return out;
    }

    let rule = matching_rule(fragment, delimiter);
    out.rule = Some(rule);
    let parts = fragment.split_once(delimiter);

    match (rule, parts) {
        (Rule::TenureRange, Some((head, tail))) => {
            out.assign(Field::Tenurity, head);
            out.assign(Field::Duration, tail);
        }
        (Rule::Location, Some((head, tail))) => {
            out.assign(Field::Location, head);
            out.assign(Field::WorkMode, tail);
        }
        (Rule::Location, None) if is_work_mode(fragment) => out.assign(Field::WorkMode, fragment),
        (Rule::Location, None) => out.assign(Field::Location, fragment),
        (Rule::JobType, _) => out.assign(Field::JobType, fragment),
        (_, Some((head, tail))) => {
            let Some(defaults) = defaults else { return out };
            debug!(fragment, ?defaults, "unclassified fragment, using positional defaults");
            out.assign(defaults.head, head);
            out.assign(defaults.tail, tail);
        }
        (_, None) => {
            let Some(defaults) = defaults else { return out };
            debug!(fragment, field = ?defaults.lone, "unclassified fragment, using positional default");
            out.assign(defaults.lone, fragment);
        }
    }

    out
}

// ── Tests ──
