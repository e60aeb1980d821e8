use crate::{
    core::{
        capacity::CapacityTracker,
        db::RegistrationDb,
        proofs::{normalize_proof, ProofStore},
        registration::RegistrationDraft,
        settings::EventConfig,
    },
    error::Error,
};

/// Where one form session currently is.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum FormPhase {
    Editing,
    Submitting,
    /// Terminal for the session; the draft has been cleared.
    Registered,
}

/// One registration session: a draft under edit, the capacity gate, and
/// the submit orchestration.
///
/// Submission runs capacity gate, proof normalization, proof storage and
/// row insert in that order. Any failure returns the session to
/// `Editing` with a message and re-enables submission; a proof stored
/// before a failed insert is left behind in storage.
pub struct RegistrationForm {
    event: String,
    config: EventConfig,
    tracker: CapacityTracker,
    pub draft: RegistrationDraft,
    phase: FormPhase,
    message: Option<String>,
}

impl RegistrationForm {
    pub fn new(event: &str, config: EventConfig) -> Self {
        let tracker = CapacityTracker::new(&config);
        RegistrationForm {
            event: event.to_owned(),
            config,
            tracker,
            draft: RegistrationDraft::default(),
            phase: FormPhase::Editing,
            message: None,
        }
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// Last user-facing failure message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn tracker(&self) -> &CapacityTracker {
        &self.tracker
    }

    /// Re-fetches per-category counts. Called on session start and after
    /// each successful registration; between calls the gate works from
    /// the cached counts.
    pub async fn refresh_counts(&mut self, db: &RegistrationDb) -> Result<(), Error> {
        let counts = db.count_by_category(&self.event).await?;
        self.tracker.refresh(counts);
        Ok(())
    }

    /// Runs one submission. Re-entrant calls while a submission is in
    /// flight (or after success) are rejected without side effects.
    pub async fn submit(
        &mut self,
        db: &RegistrationDb,
        proofs: &ProofStore,
    ) -> Result<i64, Error> {
        if self.phase != FormPhase::Editing {
            return Err(Error::SubmissionInProgress);
        }

        // Required fields block the transition to Submitting.
        let mut record = match self.draft.validate(&self.event, &self.config) {
            Ok(record) => record,
            Err(e) => {
                self.message = Some(e.to_string());
                return Err(e);
            }
        };

        self.phase = FormPhase::Submitting;

        // Local gate against the last-fetched counts; a full category
        // is rejected before any write.
        if self.tracker.is_full(&record.category) {
            let e = Error::CapacityExceeded(record.category);
            return self.fail(e);
        }

        if let Some(file) = self.draft.proof.clone() {
            let file = match normalize_proof(file) {
                Ok(file) => file,
                Err(e) => return self.fail(e),
            };
            match proofs.store(&file, &record.player_a) {
                Ok(url) => record.proof = Some(url),
                Err(e) => return self.fail(e),
            }
        }

        let limit = self.tracker.limit(&record.category);
        let id = match db.insert_registration(&record, limit).await {
            Ok(id) => id,
            // The proof, if one was stored, stays behind.
            Err(e) => return self.fail(e),
        };

        log::info!(
            "Registered team {} / {} in {} ({})",
            record.player_a,
            record.player_b,
            record.category,
            self.event
        );

        self.phase = FormPhase::Registered;
        self.draft = RegistrationDraft::default();
        self.message = None;

        // The row is in; a stale count only affects the next session's
        // local gate.
        if let Err(e) = self.refresh_counts(db).await {
            log::warn!("Failed to refresh capacity counts: {}", e);
        }

        Ok(id)
    }

    fn fail(&mut self, e: Error) -> Result<i64, Error> {
        log::warn!("Registration failed: {}", e);
        self.phase = FormPhase::Editing;
        self.message = Some(e.to_string());
        Err(e)
    }
}
