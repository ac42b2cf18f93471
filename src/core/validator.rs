use crate::domain::model::{
    display_date, DateWindow, FlatNumber, Nomination, PhoneNumber, Slot, DATE_FORMAT,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FullName,
    FlatNumber,
    PhoneNumber,
    Date,
    Slot,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::FullName => "Full name",
            Field::FlatNumber => "Flat number",
            Field::PhoneNumber => "Phone number",
            Field::Date => "Date",
            Field::Slot => "Slot",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub full_name: String,
    pub flat_number: String,
    pub phone_number: String,
    pub date: String,
    pub slot: String,
    pub brings_own_offering_set: bool,
}

/// Field → error message for every field that failed its rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }
}

/// Form input that passed every rule, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidForm {
    pub full_name: String,
    pub flat: FlatNumber,
    pub phone_number: PhoneNumber,
    pub date: NaiveDate,
    pub slot: Slot,
    pub brings_own_offering_set: bool,
}

impl ValidForm {
    pub fn into_nomination(self, submitter_id: impl Into<String>) -> Nomination {
        Nomination {
            submitter_id: submitter_id.into(),
            full_name: self.full_name,
            flat: self.flat,
            phone_number: self.phone_number,
            date: self.date,
            slot: self.slot,
            brings_own_offering_set: self.brings_own_offering_set,
        }
    }
}

/// Checks every field independently against its rule.
pub fn validate(fields: &FormFields, window: &DateWindow) -> Result<ValidForm, FieldErrors> {
    let mut errors = FieldErrors::default();

    let full_name = fields.full_name.trim();
    if full_name.is_empty() {
        errors.insert(Field::FullName, "Full name is required.");
    }

    let flat = if fields.flat_number.trim().is_empty() {
        errors.insert(Field::FlatNumber, "Flat number is required.");
        None
    } else {
        match fields.flat_number.parse::<FlatNumber>() {
            Ok(flat) => Some(flat),
            Err(()) => {
                errors.insert(
                    Field::FlatNumber,
                    "Invalid flat number (e.g., A-101, B-902, F-1002, F-1304).",
                );
                None
            }
        }
    };

    let phone_number = if fields.phone_number.trim().is_empty() {
        errors.insert(Field::PhoneNumber, "Phone number is required.");
        None
    } else {
        match fields.phone_number.parse::<PhoneNumber>() {
            Ok(phone) => Some(phone),
            Err(()) => {
                errors.insert(
                    Field::PhoneNumber,
                    "Invalid phone number (10 digits, starting with 6-9).",
                );
                None
            }
        }
    };

    // 無法解析的日期視同未填
    let date = match NaiveDate::parse_from_str(fields.date.trim(), DATE_FORMAT) {
        Err(_) => {
            errors.insert(Field::Date, "Date is required.");
            None
        }
        Ok(date) if !window.contains(date) => {
            errors.insert(
                Field::Date,
                format!(
                    "Date must be between {} and {}.",
                    display_date(window.start),
                    display_date(window.end)
                ),
            );
            None
        }
        Ok(date) => Some(date),
    };

    let slot = match fields.slot.parse::<Slot>() {
        Ok(slot) => Some(slot),
        Err(_) => {
            errors.insert(Field::Slot, "Please select a slot.");
            None
        }
    };

    match (flat, phone_number, date, slot) {
        (Some(flat), Some(phone_number), Some(date), Some(slot)) if errors.is_valid() => {
            Ok(ValidForm {
                full_name: full_name.to_string(),
                flat,
                phone_number,
                date,
                slot,
                brings_own_offering_set: fields.brings_own_offering_set,
            })
        }
        _ => Err(errors),
    }
}

/// Error mapping only; empty when the form is valid.
pub fn field_errors(fields: &FormFields, window: &DateWindow) -> FieldErrors {
    validate(fields, window).err().unwrap_or_default()
}
