use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::report::{Field, Report};

const ADDRESS_KEYWORDS: &[&str] = &[
    "улица", "ул.", "проспект", "пр.", "переулок", "пер.", "площадь", "шоссе", "дом", "д.",
];

const DAMAGE_KEYWORDS: &[&str] = &[
    "бампер", "фара", "крыло", "дверь", "капот", "повреждение", "царапина", "вмятина", "разбит",
];

const NO_INJURY_PHRASES: &[&str] = &["нет пострадавших", "никто не пострадал"];
const INJURY_KEYWORDS: &[&str] = &["пострадал", "ранен"];

pub const TWO_VEHICLES: &str = "2 автомобиля";
pub const THREE_VEHICLES: &str = "3 автомобиля";
pub const NO_INJURIES: &str = "Нет пострадавших";
pub const INJURIES_PRESENT: &str = "Есть пострадавшие";

// Tried in order: international, domestic trunk prefix, bare 11 digits.
static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\+7[\s-]?\d{3}[\s-]?\d{3}[\s-]?\d{2}[\s-]?\d{2}",
        r"8[\s-]?\d{3}[\s-]?\d{3}[\s-]?\d{2}[\s-]?\d{2}",
        r"\d{11}",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Best-effort keyword extraction for assistant mode.
///
/// Each field is considered independently and only while it is unset, so a
/// value once captured is never replaced by a later message. Returns the
/// fields written by this call, in report order. Arbitrary text is safe:
/// nothing here can fail, a miss just leaves the field alone.
pub fn extract(message: &str, report: &mut Report) -> Vec<Field> {
    let lower = message.to_lowercase();
    let mut updated = Vec::new();

    if !report.is_set(Field::Location) && contains_any(&lower, ADDRESS_KEYWORDS) {
        report.fill(Field::Location, message);
        updated.push(Field::Location);
    }

    if !report.is_set(Field::Participants) {
        // Substring match on purpose: "23" counts as two.
        let count = if lower.contains("два") || message.contains('2') {
            Some(TWO_VEHICLES)
        } else if lower.contains("три") || message.contains('3') {
            Some(THREE_VEHICLES)
        } else {
            None
        };
        if let Some(count) = count {
            report.fill(Field::Participants, count);
            updated.push(Field::Participants);
        }
    }

    if !report.is_set(Field::Damage) && contains_any(&lower, DAMAGE_KEYWORDS) {
        report.fill(Field::Damage, message);
        updated.push(Field::Damage);
    }

    if !report.is_set(Field::Injuries) {
        let injuries = if contains_any(&lower, NO_INJURY_PHRASES) {
            Some(NO_INJURIES)
        } else if contains_any(&lower, INJURY_KEYWORDS) {
            Some(INJURIES_PRESENT)
        } else {
            None
        };
        if let Some(injuries) = injuries {
            report.fill(Field::Injuries, injuries);
            updated.push(Field::Injuries);
        }
    }

    if !report.is_set(Field::Contact) {
        if let Some(phone) = find_phone(message) {
            report.fill(Field::Contact, phone);
            updated.push(Field::Contact);
        }
    }

    if !updated.is_empty() {
        debug!(fields = ?updated, "extracted fields from free text");
    }
    updated
}

/// First phone-shaped substring, first matching pattern wins.
pub fn find_phone(message: &str) -> Option<&str> {
    PHONE_PATTERNS
        .iter()
        .find_map(|re| re.find(message))
        .map(|m| m.as_str())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
