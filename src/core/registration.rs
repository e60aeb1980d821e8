use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::{core::settings::EventConfig, error::Error};

/// T-shirt sizes offered on the registration form.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
pub enum TshirtSize {
    #[serde(rename = "XS")]
    #[sqlx(rename = "XS")]
    Xs,
    S,
    M,
    L,
    #[serde(rename = "XL")]
    #[sqlx(rename = "XL")]
    Xl,
    #[serde(rename = "2XL")]
    #[sqlx(rename = "2XL")]
    Xxl,
    #[serde(rename = "3XL")]
    #[sqlx(rename = "3XL")]
    Xxxl,
}

impl fmt::Display for TshirtSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TshirtSize::Xs => "XS",
            TshirtSize::S => "S",
            TshirtSize::M => "M",
            TshirtSize::L => "L",
            TshirtSize::Xl => "XL",
            TshirtSize::Xxl => "2XL",
            TshirtSize::Xxxl => "3XL",
        };
        write!(f, "{}", label)
    }
}

/// Grouping label assigned by the organizers to schedule matches within
/// a category. Unrelated to the public category choice.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
pub enum Flight {
    #[serde(rename = "Flight 1")]
    #[sqlx(rename = "Flight 1")]
    Flight1,
    #[serde(rename = "Flight 2")]
    #[sqlx(rename = "Flight 2")]
    Flight2,
    #[serde(rename = "Flight 3")]
    #[sqlx(rename = "Flight 3")]
    Flight3,
    #[serde(rename = "Flight 4")]
    #[sqlx(rename = "Flight 4")]
    Flight4,
    #[serde(rename = "Flight 5")]
    #[sqlx(rename = "Flight 5")]
    Flight5,
    #[serde(rename = "Flight 6")]
    #[sqlx(rename = "Flight 6")]
    Flight6,
    #[serde(rename = "Flight 7")]
    #[sqlx(rename = "Flight 7")]
    Flight7,
    #[serde(rename = "Flight 8")]
    #[sqlx(rename = "Flight 8")]
    Flight8,
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            Flight::Flight1 => 1,
            Flight::Flight2 => 2,
            Flight::Flight3 => 3,
            Flight::Flight4 => 4,
            Flight::Flight5 => 5,
            Flight::Flight6 => 6,
            Flight::Flight7 => 7,
            Flight::Flight8 => 8,
        };
        write!(f, "Flight {}", n)
    }
}

/// Payment status assigned by the organizers. Cancellation is a status,
/// not a row deletion.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
pub enum Status {
    Confirmed,
    Refunded,
    Cancelled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Confirmed => "Confirmed",
            Status::Refunded => "Refunded",
            Status::Cancelled => "Cancelled",
        };
        write!(f, "{}", label)
    }
}

/// A single team entry in the shared registration table.
///
/// Immutable once created except for `flight` and `status`, which only
/// the roster view sets.
#[derive(PartialEq, Eq, Debug, FromRow, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Unique registration ID, assigned by the table.
    pub id: i64,

    pub player_a: String,
    pub player_b: String,

    pub contact_number: String,

    /// City/municipality, collected by some event variants.
    pub address: Option<String>,

    /// One of the category names configured for `event`.
    pub category: String,

    pub club: Option<String>,

    pub tshirt_size_a: TshirtSize,
    pub tshirt_size_b: TshirtSize,

    /// Jersey print names, if requested.
    pub tshirt_name_a: Option<String>,
    pub tshirt_name_b: Option<String>,

    /// Public URL of the uploaded proof of payment. Never re-validated
    /// for reachability once set.
    pub proof: Option<String>,

    /// Consent to the terms, required at creation.
    pub agree: bool,

    /// Tournament instance this row belongs to; one table serves
    /// several events.
    pub event: String,

    pub flight: Option<Flight>,
    pub status: Option<Status>,
}

/// Fields for one new row. The caller supplies everything except `id`,
/// `flight` and `status`, which start unset.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistration {
    pub player_a: String,
    pub player_b: String,
    pub contact_number: String,
    pub address: Option<String>,
    pub category: String,
    pub club: Option<String>,
    pub tshirt_size_a: TshirtSize,
    pub tshirt_size_b: TshirtSize,
    pub tshirt_name_a: Option<String>,
    pub tshirt_name_b: Option<String>,
    pub proof: Option<String>,
    pub agree: bool,
    pub event: String,
}

/// An uploaded file as received from the form, prior to storage.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ProofFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// In-progress form input. Everything is held as entered; `validate`
/// turns it into a `NewRegistration` once all required fields are
/// present.
#[derive(Debug, Clone, Default)]
pub struct RegistrationDraft {
    pub player_a: String,
    pub player_b: String,
    pub contact_number: String,
    pub address: String,
    pub category: String,
    pub club: String,
    pub tshirt_size_a: Option<TshirtSize>,
    pub tshirt_size_b: Option<TshirtSize>,
    pub tshirt_name_a: String,
    pub tshirt_name_b: String,
    pub proof: Option<ProofFile>,
    pub agree: bool,
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

impl RegistrationDraft {
    /// Checks every required field and, if all are present, produces the
    /// record to insert (without a proof URL; the file is stored
    /// separately). Each field is checked on its own, so which other
    /// fields are filled does not affect the result for a given field.
    pub fn validate(&self, event: &str, config: &EventConfig) -> Result<NewRegistration, Error> {
        if self.player_a.trim().is_empty() {
            return Err(Error::ValidationRejected("Player A".to_owned()));
        }
        if self.player_b.trim().is_empty() {
            return Err(Error::ValidationRejected("Player B".to_owned()));
        }
        if self.contact_number.trim().is_empty() {
            return Err(Error::ValidationRejected("Contact number".to_owned()));
        }
        if config.address_required && self.address.trim().is_empty() {
            return Err(Error::ValidationRejected("Address".to_owned()));
        }
        if self.category.trim().is_empty() {
            return Err(Error::ValidationRejected("Category".to_owned()));
        }
        if !config.has_category(&self.category) {
            return Err(Error::UnknownCategory(
                self.category.clone(),
                event.to_owned(),
            ));
        }
        let tshirt_size_a = self
            .tshirt_size_a
            .ok_or_else(|| Error::ValidationRejected("T-shirt size for Player A".to_owned()))?;
        let tshirt_size_b = self
            .tshirt_size_b
            .ok_or_else(|| Error::ValidationRejected("T-shirt size for Player B".to_owned()))?;
        if !self.agree {
            return Err(Error::ValidationRejected(
                "Agreement to the terms".to_owned(),
            ));
        }
        if config.proof_required && self.proof.is_none() {
            return Err(Error::ValidationRejected("Proof of payment".to_owned()));
        }

        Ok(NewRegistration {
            player_a: self.player_a.trim().to_owned(),
            player_b: self.player_b.trim().to_owned(),
            contact_number: self.contact_number.trim().to_owned(),
            address: optional(&self.address),
            category: self.category.clone(),
            club: optional(&self.club),
            tshirt_size_a,
            tshirt_size_b,
            tshirt_name_a: optional(&self.tshirt_name_a),
            tshirt_name_b: optional(&self.tshirt_name_b),
            proof: None,
            agree: true,
            event: event.to_owned(),
        })
    }
}
