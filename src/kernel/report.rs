use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder rendered for a field nobody filled in.
pub const NOT_SPECIFIED: &str = "не указано";

/// The five user-supplied fields of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Location,
    Participants,
    Damage,
    Injuries,
    Contact,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Location,
        Field::Participants,
        Field::Damage,
        Field::Injuries,
        Field::Contact,
    ];

    /// Short label shown to the user when a field was auto-filled or is missing.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Location => "место ДТП",
            Field::Participants => "участники",
            Field::Damage => "повреждения",
            Field::Injuries => "пострадавшие",
            Field::Contact => "телефон",
        }
    }

    /// Heading used in the confirmation summary, the formatted report and the assistant instruction.
    pub fn heading(&self) -> &'static str {
        match self {
            Field::Location => "Место ДТП",
            Field::Participants => "Участники",
            Field::Damage => "Повреждения",
            Field::Injuries => "Пострадавшие",
            Field::Contact => "Контакт",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Field::Location => "📍",
            Field::Participants => "👥",
            Field::Damage => "🚗",
            Field::Injuries => "🚑",
            Field::Contact => "📞",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One accident report, owned by exactly one session.
///
/// All fields start unset. Step mode writes unconditionally through `set`;
/// the extractor only writes through `fill`, which never overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    created_at: DateTime<Local>,
    pub location: Option<String>,
    pub participant_count_desc: Option<String>,
    pub damage_desc: Option<String>,
    pub injuries_desc: Option<String>,
    pub contact: Option<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::new_at(Local::now())
    }

    pub fn new_at(created_at: DateTime<Local>) -> Self {
        Self {
            created_at,
            location: None,
            participant_count_desc: None,
            damage_desc: None,
            injuries_desc: None,
            contact: None,
        }
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Value or the "not specified" placeholder.
    pub fn display(&self, field: Field) -> &str {
        self.get(field).unwrap_or(NOT_SPECIFIED)
    }

    /// Unconditional write (step mode).
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Write only if the field is still unset. Returns whether it wrote.
    pub fn fill(&mut self, field: Field, value: impl Into<String>) -> bool {
        let slot = self.slot_mut(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value.into());
        true
    }

    /// Required fields that are still unset, in display order.
    pub fn missing_required(&self) -> Vec<Field> {
        [Field::Location, Field::Contact]
            .into_iter()
            .filter(|f| !self.is_set(*f))
            .collect()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Location => &self.location,
            Field::Participants => &self.participant_count_desc,
            Field::Damage => &self.damage_desc,
            Field::Injuries => &self.injuries_desc,
            Field::Contact => &self.contact,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Location => &mut self.location,
            Field::Participants => &mut self.participant_count_desc,
            Field::Damage => &mut self.damage_desc,
            Field::Injuries => &mut self.injuries_desc,
            Field::Contact => &mut self.contact,
        }
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

/// Who submitted a report, as reported by the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: super::UserId,
    pub first_name: String,
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_never_overwrites() {
        let mut report = Report::new();
        assert!(report.fill(Field::Location, "ул. Мира 1"));
        assert!(!report.fill(Field::Location, "пр. Победы 5"));
        assert_eq!(report.get(Field::Location), Some("ул. Мира 1"));

        report.set(Field::Location, "пр. Победы 5");
        assert_eq!(report.get(Field::Location), Some("пр. Победы 5"));
    }

    #[test]
    fn missing_required_lists_location_then_contact() {
        let mut report = Report::new();
        assert_eq!(report.missing_required(), vec![Field::Location, Field::Contact]);
        report.set(Field::Contact, "+79001234567");
        assert_eq!(report.missing_required(), vec![Field::Location]);
    }
}
