//! Equipment number parsing and autocomplete suggestions.
//!
//! Stores staff type equipment identifiers as free text: single numbers (`204`),
//! comma lists (`204, 207`), hyphenated ranges (`200-210`) and alphanumeric tags
//! (`GPU-A7`, `A100`). [`expand_equipment_numbers`] turns that text into the three
//! suggestion groups shown by the range select widget.

use std::collections::BTreeSet;

/// Ranges wider than this are offered as a single suggestion and never enumerated.
pub const MAX_RANGE_SPAN: u64 = 1_000;

/// Sub-ranges are only enumerated for ranges up to this many numbers.
///
/// A span of `n` yields `n * (n - 1) / 2` sub-ranges, so 100 caps the group at 4,950
/// entries, which the select still filters on every keystroke.
pub const MAX_SUBRANGE_SPAN: u64 = 100;

/// Inclusive range of equipment numbers, always stored with `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EquipmentRange {
    pub start: i64,
    pub end: i64,
}

impl EquipmentRange {
    pub fn new(start: i64, end: i64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Count of numbers covered by the range.
    pub fn span(&self) -> u64 {
        self.end.abs_diff(self.start).saturating_add(1)
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    fn numbers(&self) -> impl Iterator<Item = i64> {
        self.start..=self.end
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Range(EquipmentRange),
    Number(i64),
    Literal(String),
}

/// A `-` at index 0 is a sign, so `-3--1` still reads as the range from -3 to -1.
fn classify(token: &str) -> Token {
    for (index, _) in token.match_indices('-').filter(|(index, _)| *index > 0) {
        let (left, right) = (&token[..index], &token[index + 1..]);
        if let (Ok(start), Ok(end)) = (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
            return Token::Range(EquipmentRange::new(start, end));
        }
    }

    match token.parse::<i64>() {
        Ok(number) => Token::Number(number),
        Err(_) => Token::Literal(token.to_string()),
    }
}

fn tokens(input: &str) -> impl Iterator<Item = Token> + '_ {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(classify)
}

/// Which group of the dropdown a suggestion belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionGroup {
    Number,
    Literal,
    Range,
}

impl SuggestionGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Number => "Numbers",
            Self::Literal => "Tags",
            Self::Range => "Ranges",
        }
    }
}

/// Expanded suggestions in display order: numbers, then literal tags, then ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EquipmentSuggestions {
    pub numbers: Vec<String>,
    pub literals: Vec<String>,
    pub ranges: Vec<String>,
}

impl EquipmentSuggestions {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.numbers
            .iter()
            .chain(self.literals.iter())
            .chain(self.ranges.iter())
            .map(String::as_str)
    }

    pub fn iter_grouped(&self) -> impl Iterator<Item = (SuggestionGroup, &str)> {
        let numbers = self
            .numbers
            .iter()
            .map(|value| (SuggestionGroup::Number, value.as_str()));
        let literals = self
            .literals
            .iter()
            .map(|value| (SuggestionGroup::Literal, value.as_str()));
        let ranges = self
            .ranges
            .iter()
            .map(|value| (SuggestionGroup::Range, value.as_str()));
        numbers.chain(literals).chain(ranges)
    }

    pub fn len(&self) -> usize {
        self.numbers.len() + self.literals.len() + self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<String> {
        let mut all = self.numbers;
        all.extend(self.literals);
        all.extend(self.ranges);
        all
    }
}

/// Expands free-form equipment text into deduplicated suggestions.
///
/// Tokens are split on commas. `a-b` with two integer sides is a range, a bare integer is
/// a number, anything else is kept verbatim as a tag. When the text holds no explicit range
/// but at least two numbers, runs of consecutive numbers are folded into ranges so the
/// widget can offer `1-3` for `1,2,3`. A degenerate range such as `5-5` counts as the
/// number `5`, which keeps expansion idempotent on its own output.
pub fn expand_equipment_numbers(input: &str) -> EquipmentSuggestions {
    let mut ranges: Vec<EquipmentRange> = Vec::new();
    let mut numbers: BTreeSet<i64> = BTreeSet::new();
    let mut literals: BTreeSet<String> = BTreeSet::new();

    for token in tokens(input) {
        match token {
            Token::Range(range) if range.is_single() => {
                numbers.insert(range.start);
            }
            Token::Range(range) => ranges.push(range),
            Token::Number(number) => {
                numbers.insert(number);
            }
            Token::Literal(text) => {
                literals.insert(text);
            }
        }
    }

    if ranges.is_empty() && numbers.len() >= 2 {
        ranges = consecutive_runs(&numbers);
    }

    let mut covered = numbers;
    for range in ranges.iter().filter(|range| range.span() <= MAX_RANGE_SPAN) {
        covered.extend(range.numbers());
    }

    let mut range_group: BTreeSet<EquipmentRange> = BTreeSet::new();
    for range in ranges.iter().filter(|range| !range.is_single()) {
        if range.span() > MAX_SUBRANGE_SPAN {
            range_group.insert(*range);
            continue;
        }
        for i in range.start..range.end {
            for j in (i + 1)..=range.end {
                range_group.insert(EquipmentRange::new(i, j));
            }
        }
    }

    EquipmentSuggestions {
        numbers: covered.iter().map(i64::to_string).collect(),
        literals: literals.into_iter().collect(),
        ranges: range_group.iter().map(EquipmentRange::label).collect(),
    }
}

/// Groups sorted numbers into maximal runs of consecutive integers.
pub fn consecutive_runs(numbers: &BTreeSet<i64>) -> Vec<EquipmentRange> {
    let mut runs: Vec<EquipmentRange> = Vec::new();
    for &number in numbers {
        match runs.last_mut() {
            Some(run) if run.end.checked_add(1) == Some(number) => run.end = number,
            _ => runs.push(EquipmentRange::new(number, number)),
        }
    }
    runs
}

/// Narrows suggestions to those containing `query`, ignoring case. Group order is kept.
pub fn filter_suggestions(suggestions: &EquipmentSuggestions, query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    suggestions
        .iter()
        .filter(|value| needle.is_empty() || value.to_lowercase().contains(&needle))
        .map(str::to_string)
        .collect()
}

/// Resolves selected chips into the identifiers a request line is booked against.
///
/// Numbers come first in ascending order, followed by tags in lexicographic order. Ranges
/// too wide to enumerate are kept as their label among the tags.
pub fn selection_to_numbers(selected: &[String]) -> Vec<String> {
    let mut numbers: BTreeSet<i64> = BTreeSet::new();
    let mut literals: BTreeSet<String> = BTreeSet::new();

    for chip in selected {
        for token in tokens(chip) {
            match token {
                Token::Number(number) => {
                    numbers.insert(number);
                }
                Token::Range(range) if range.span() <= MAX_RANGE_SPAN => {
                    numbers.extend(range.numbers());
                }
                Token::Range(range) => {
                    literals.insert(range.label());
                }
                Token::Literal(text) => {
                    literals.insert(text);
                }
            }
        }
    }

    numbers
        .iter()
        .map(i64::to_string)
        .chain(literals)
        .collect()
}

/// Renders numbers as a compact comma list, collapsing runs (`1,2,3,7` becomes `1-3,7`).
pub fn compact_numbers<I>(numbers: I) -> String
where
    I: IntoIterator<Item = i64>,
{
    let unique: BTreeSet<i64> = numbers.into_iter().collect();
    consecutive_runs(&unique)
        .iter()
        .map(|run| {
            if run.is_single() {
                run.start.to_string()
            } else {
                run.label()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
