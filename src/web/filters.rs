use std::{collections::HashMap, convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::core::{db::RegistrationDb, proofs::ProofStore, settings::Settings};

use super::handlers::{
    export_roster, get_slots, list_roster, register, update_registration,
};

pub fn with_db(
    db: Arc<RegistrationDb>,
) -> impl Filter<Extract = (Arc<RegistrationDb>,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

pub fn with_proofs(
    proofs: Arc<ProofStore>,
) -> impl Filter<Extract = (Arc<ProofStore>,), Error = Infallible> + Clone {
    warp::any().map(move || proofs.clone())
}

pub fn with_settings(
    settings: Arc<Settings>,
) -> impl Filter<Extract = (Arc<Settings>,), Error = Infallible> + Clone {
    warp::any().map(move || settings.clone())
}

fn registration_filters(
    db: Arc<RegistrationDb>,
    proofs: Arc<ProofStore>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let create_registration = warp::path!("registration")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_db(db.clone()))
        .and(with_proofs(proofs))
        .and(with_settings(settings.clone()))
        .and_then(register);

    let slots = warp::path!("slots")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_db(db))
        .and(with_settings(settings))
        .and_then(get_slots);

    create_registration.or(slots)
}

fn roster_filters(
    db: Arc<RegistrationDb>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let read_roster = warp::path!("registration")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_db(db.clone()))
        .and(with_settings(settings.clone()))
        .and_then(list_roster);

    let update = warp::path!("registration")
        .and(warp::put())
        .and(warp::body::json())
        .and(with_db(db.clone()))
        .and(with_settings(settings.clone()))
        .and_then(update_registration);

    let export = warp::path!("export")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_db(db))
        .and(with_settings(settings))
        .and_then(export_roster);

    read_roster.or(update).or(export)
}

pub fn api_filters(
    db: Arc<RegistrationDb>,
    proofs: Arc<ProofStore>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    // Stored proofs are served directly; this is what makes their URLs
    // publicly dereferenceable.
    let proof_files = warp::path("proofs").and(warp::fs::dir(proofs.proof_dir()));

    registration_filters(db.clone(), proofs, settings.clone())
        .or(roster_filters(db, settings))
        .or(proof_files)
}
