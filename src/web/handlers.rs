use std::{collections::HashMap, convert::Infallible, sync::Arc};

use base64::Engine;
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;

use crate::{
    core::{
        capacity::CapacityTracker,
        db::RegistrationDb,
        form::RegistrationForm,
        proofs::ProofStore,
        registration::{Flight, ProofFile, RegistrationDraft, Status, TshirtSize},
        roster::AdminRoster,
        settings::Settings,
    },
    error::Error,
};

/// A Json struct to return a newly assigned registration ID
#[derive(Serialize, Deserialize, Debug)]
pub struct Id {
    pub id: i64,
}

/// A Json struct carrying a proof-of-payment file as base64
#[derive(Serialize, Deserialize, Debug)]
pub struct ProofPayload {
    pub file_name: String,
    pub mime_type: String,
    pub data: String,
}

/// A Json struct with one registration submission
#[derive(Serialize, Deserialize, Debug)]
pub struct RegistrationRequest {
    pub event: String,
    #[serde(default)]
    pub player_a: String,
    #[serde(default)]
    pub player_b: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub club: String,
    pub tshirt_size_a: Option<TshirtSize>,
    pub tshirt_size_b: Option<TshirtSize>,
    #[serde(default)]
    pub tshirt_name_a: String,
    #[serde(default)]
    pub tshirt_name_b: String,
    pub proof: Option<ProofPayload>,
    #[serde(default)]
    pub agree: bool,
}

/// A Json struct to set the admin-assigned fields of one row
#[derive(Serialize, Deserialize, Debug)]
pub struct UpdateRegistration {
    pub password: String,
    pub id: i64,
    pub flight: Option<Flight>,
    pub status: Option<Status>,
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::ValidationRejected(_)
        | Error::UnknownCategory(_, _)
        | Error::SubmissionInProgress => StatusCode::BAD_REQUEST,
        Error::CapacityExceeded(_) => StatusCode::CONFLICT,
        Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn to_http_output<T: Serialize>(result: Result<T, Error>) -> Result<impl warp::Reply, Infallible> {
    match result {
        Ok(data) => Ok(warp::reply::with_status(
            serde_json::to_string::<T>(&data).unwrap(),
            StatusCode::OK,
        )),
        Err(e) => {
            log::warn!("{}", e);
            Ok(warp::reply::with_status(e.to_string(), status_for(&e)))
        }
    }
}

fn draft_from(req: &RegistrationRequest) -> Result<RegistrationDraft, Error> {
    let proof = match &req.proof {
        Some(payload) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&payload.data)
                .map_err(|e| Error::UploadFailure(format!("undecodable proof data: {}", e)))?;
            Some(ProofFile {
                file_name: payload.file_name.clone(),
                mime_type: payload.mime_type.clone(),
                bytes,
            })
        }
        None => None,
    };

    Ok(RegistrationDraft {
        player_a: req.player_a.clone(),
        player_b: req.player_b.clone(),
        contact_number: req.contact_number.clone(),
        address: req.address.clone(),
        category: req.category.clone(),
        club: req.club.clone(),
        tshirt_size_a: req.tshirt_size_a,
        tshirt_size_b: req.tshirt_size_b,
        tshirt_name_a: req.tshirt_name_a.clone(),
        tshirt_name_b: req.tshirt_name_b.clone(),
        proof,
        agree: req.agree,
    })
}

/// Drives one registration submission through a form session.
pub async fn register(
    req: RegistrationRequest,
    db: Arc<RegistrationDb>,
    proofs: Arc<ProofStore>,
    settings: Arc<Settings>,
) -> Result<impl warp::Reply, Infallible> {
    let config = match settings.event(&req.event) {
        Some(config) => config.clone(),
        None => {
            return Ok(warp::reply::with_status(
                format!("Unknown event \"{}\"", req.event),
                StatusCode::BAD_REQUEST,
            ))
        }
    };

    let mut form = RegistrationForm::new(&req.event, config);
    if let Err(e) = form.refresh_counts(&db).await {
        log::warn!("{}", e);
        return Ok(warp::reply::with_status(e.to_string(), status_for(&e)));
    }

    form.draft = match draft_from(&req) {
        Ok(draft) => draft,
        Err(e) => {
            log::warn!("{}", e);
            return Ok(warp::reply::with_status(e.to_string(), status_for(&e)));
        }
    };

    match form.submit(&db, &proofs).await {
        Ok(id) => Ok(warp::reply::with_status(
            serde_json::to_string(&Id { id }).unwrap(),
            StatusCode::CREATED,
        )),
        Err(e) => Ok(warp::reply::with_status(e.to_string(), status_for(&e))),
    }
}

/// Remaining slots per category for one event.
pub async fn get_slots(
    args: HashMap<String, String>,
    db: Arc<RegistrationDb>,
    settings: Arc<Settings>,
) -> Result<impl warp::Reply, Infallible> {
    let Some(event) = args.get("event") else {
        return Ok(warp::reply::with_status(
            "Missing 'event' field".to_string(),
            StatusCode::BAD_REQUEST,
        ));
    };
    let Some(config) = settings.event(event) else {
        return Ok(warp::reply::with_status(
            format!("Unknown event \"{}\"", event),
            StatusCode::BAD_REQUEST,
        ));
    };

    let mut tracker = CapacityTracker::new(config);
    match db.count_by_category(event).await {
        Ok(counts) => {
            tracker.refresh(counts);
            Ok(warp::reply::with_status(
                serde_json::to_string(&tracker.all_remaining()).unwrap(),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            log::warn!("{}", e);
            Ok(warp::reply::with_status(e.to_string(), status_for(&e)))
        }
    }
}

fn roster_from_args(
    args: &HashMap<String, String>,
    settings: &Settings,
) -> Result<(AdminRoster, String), Error> {
    let password = args
        .get("password")
        .ok_or(Error::NotAuthenticated)?;
    let event = args
        .get("event")
        .ok_or_else(|| Error::ValidationRejected("event".to_owned()))?;
    let category = args
        .get("category")
        .ok_or_else(|| Error::ValidationRejected("category".to_owned()))?;

    let mut roster = AdminRoster::new(event, &settings.admin_password);
    if !roster.authenticate(password) {
        return Err(Error::NotAuthenticated);
    }

    Ok((roster, category.clone()))
}

/// Roster rows for one category, password-gated.
pub async fn list_roster(
    args: HashMap<String, String>,
    db: Arc<RegistrationDb>,
    settings: Arc<Settings>,
) -> Result<impl warp::Reply, Infallible> {
    let result = async {
        let (mut roster, category) = roster_from_args(&args, &settings)?;
        roster.load_category(&db, &category).await?;
        Ok(roster.rows().to_vec())
    }
    .await;

    to_http_output(result)
}

/// Applies a flight/status assignment to one row.
pub async fn update_registration(
    req: UpdateRegistration,
    db: Arc<RegistrationDb>,
    settings: Arc<Settings>,
) -> Result<impl warp::Reply, Infallible> {
    if req.password != settings.admin_password {
        return Ok(warp::reply::with_status(
            Error::NotAuthenticated.to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    match db.update_admin_fields(req.id, req.flight, req.status).await {
        Ok(_) => Ok(warp::reply::with_status(
            "Success".to_string(),
            StatusCode::OK,
        )),
        Err(e) => {
            log::warn!("{}", e);
            Ok(warp::reply::with_status(e.to_string(), status_for(&e)))
        }
    }
}

/// Streams the loaded roster as a CSV download named after the category.
pub async fn export_roster(
    args: HashMap<String, String>,
    db: Arc<RegistrationDb>,
    settings: Arc<Settings>,
) -> Result<impl warp::Reply, Infallible> {
    let result = async {
        let (mut roster, category) = roster_from_args(&args, &settings)?;
        roster.load_category(&db, &category).await?;
        let bytes = roster.export_csv()?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::ExportFailure(e.to_string()))?;
        Ok((text, roster.export_file_name()))
    }
    .await;

    match result {
        Ok((text, file_name)) => Ok(warp::http::Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/csv")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", file_name),
            )
            .body(text)
            .unwrap()),
        Err(e) => {
            log::warn!("{}", e);
            Ok(warp::http::Response::builder()
                .status(status_for(&e))
                .body(e.to_string())
                .unwrap())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_http_statuses() {
        assert_eq!(
            status_for(&Error::ValidationRejected("Player A".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::CapacityExceeded("open".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&Error::NotAuthenticated),
            StatusCode::UNAUTHORIZED
        );
        // Export and insert failures are server-side faults, not
        // transport errors.
        assert_eq!(
            status_for(&Error::ExportFailure("bad record".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&Error::InsertFailure("rejected".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
