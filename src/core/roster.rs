use crate::{
    core::{
        db::{RegistrationDb, RegistrationFilter},
        registration::{Flight, Registration, Status},
    },
    error::Error,
};

/// Header of the roster table and of the exported file.
const EXPORT_COLUMNS: [&str; 11] = [
    "#",
    "Player A",
    "Player B",
    "Contact",
    "Address",
    "Club",
    "T-Shirt A",
    "T-Shirt B",
    "Proof of Payment",
    "Flight",
    "Status",
];

/// One organizer session over the roster: a category's rows, loaded
/// most recent first, with flight/status assignment and export.
///
/// Access is gated on a shared password compared in `authenticate`.
/// That is an obscurity gate, not access control: there is no expiry,
/// no server-side session and no real credential behind it.
pub struct AdminRoster {
    password: String,
    authenticated: bool,
    event: String,
    category: Option<String>,
    rows: Vec<Registration>,
}

impl AdminRoster {
    pub fn new(event: &str, password: &str) -> Self {
        AdminRoster {
            password: password.to_owned(),
            authenticated: false,
            event: event.to_owned(),
            category: None,
            rows: Vec::new(),
        }
    }

    /// Plain equality against the shared secret. Grants a session-local
    /// flag with no expiry.
    pub fn authenticate(&mut self, input: &str) -> bool {
        self.authenticated = input == self.password;
        if !self.authenticated {
            log::warn!("Rejected roster password attempt");
        }
        self.authenticated
    }

    pub fn rows(&self) -> &[Registration] {
        &self.rows
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Loads the roster for one category of this session's event,
    /// replacing whatever was loaded before.
    pub async fn load_category(
        &mut self,
        db: &RegistrationDb,
        category: &str,
    ) -> Result<(), Error> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }

        self.rows = db
            .list_registrations(&RegistrationFilter {
                event: Some(self.event.clone()),
                category: Some(category.to_owned()),
            })
            .await?;
        self.category = Some(category.to_owned());

        Ok(())
    }

    /// Assigns a flight to one row. The loaded view is updated only
    /// after the database acknowledges, so a failed update leaves it
    /// stale and returns the error.
    pub async fn set_flight(
        &mut self,
        db: &RegistrationDb,
        id: i64,
        flight: Flight,
    ) -> Result<(), Error> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }

        db.update_admin_fields(id, Some(flight), None).await?;
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == id) {
            row.flight = Some(flight);
        }

        Ok(())
    }

    /// Assigns a payment status to one row; same acknowledgment rule as
    /// `set_flight`.
    pub async fn set_status(
        &mut self,
        db: &RegistrationDb,
        id: i64,
        status: Status,
    ) -> Result<(), Error> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }

        db.update_admin_fields(id, None, Some(status)).await?;
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == id) {
            row.status = Some(status);
        }

        Ok(())
    }

    /// Serializes the currently loaded rows, in loaded order, with the
    /// displayed columns. Works entirely from already-fetched data; no
    /// network call.
    pub fn export_csv(&self) -> Result<Vec<u8>, Error> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(EXPORT_COLUMNS)
            .map_err(|e| Error::ExportFailure(e.to_string()))?;

        for (i, row) in self.rows.iter().enumerate() {
            writer
                .write_record([
                    (i + 1).to_string(),
                    row.player_a.clone(),
                    row.player_b.clone(),
                    row.contact_number.clone(),
                    row.address.clone().unwrap_or_default(),
                    row.club.clone().unwrap_or_default(),
                    row.tshirt_size_a.to_string(),
                    row.tshirt_size_b.to_string(),
                    row.proof.clone().unwrap_or_default(),
                    row.flight.map(|f| f.to_string()).unwrap_or_default(),
                    row.status.map(|s| s.to_string()).unwrap_or_default(),
                ])
                .map_err(|e| Error::ExportFailure(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| Error::ExportFailure(e.to_string()))
    }

    /// Download name for the export artifact, carrying the selected
    /// category.
    pub fn export_file_name(&self) -> String {
        format!("{}.csv", self.category.as_deref().unwrap_or("registrations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registration::{NewRegistration, TshirtSize};

    async fn seeded_db() -> RegistrationDb {
        let db = RegistrationDb::init_in_memory().await.unwrap();
        for (player_a, category) in [
            ("Alma Reyes", "open"),
            ("Ben Cruz", "open"),
            ("Carla Diaz", "novice"),
        ] {
            db.insert_registration(
                &NewRegistration {
                    player_a: player_a.to_owned(),
                    player_b: "Partner".to_owned(),
                    contact_number: "09170000000".to_owned(),
                    address: None,
                    category: category.to_owned(),
                    club: None,
                    tshirt_size_a: TshirtSize::M,
                    tshirt_size_b: TshirtSize::L,
                    tshirt_name_a: None,
                    tshirt_name_b: None,
                    proof: None,
                    agree: true,
                    event: "lopez".to_owned(),
                },
                20,
            )
            .await
            .unwrap();
        }
        db
    }

    fn roster() -> AdminRoster {
        let mut roster = AdminRoster::new("lopez", "paddle-secret");
        assert!(roster.authenticate("paddle-secret"));
        roster
    }

    #[tokio::test]
    async fn the_password_gates_every_operation() {
        let db = seeded_db().await;
        let mut roster = AdminRoster::new("lopez", "paddle-secret");

        assert!(!roster.authenticate("paddle"));
        assert!(matches!(
            roster.load_category(&db, "open").await,
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(
            roster.set_flight(&db, 1, Flight::Flight1).await,
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(roster.export_csv(), Err(Error::NotAuthenticated)));

        assert!(roster.authenticate("paddle-secret"));
        roster.load_category(&db, "open").await.unwrap();
    }

    #[tokio::test]
    async fn loading_a_category_fetches_its_rows_most_recent_first() {
        let db = seeded_db().await;
        let mut roster = roster();

        roster.load_category(&db, "open").await.unwrap();
        let names: Vec<&str> = roster.rows().iter().map(|r| r.player_a.as_str()).collect();
        assert_eq!(names, vec!["Ben Cruz", "Alma Reyes"]);

        roster.load_category(&db, "novice").await.unwrap();
        assert_eq!(roster.rows().len(), 1);
        assert_eq!(roster.category(), Some("novice"));
    }

    #[tokio::test]
    async fn flight_and_status_updates_apply_after_acknowledgment() {
        let db = seeded_db().await;
        let mut roster = roster();
        roster.load_category(&db, "open").await.unwrap();

        let id = roster.rows()[0].id;
        roster.set_flight(&db, id, Flight::Flight3).await.unwrap();
        roster.set_status(&db, id, Status::Confirmed).await.unwrap();

        let row = roster.rows().iter().find(|r| r.id == id).unwrap();
        assert_eq!(row.flight, Some(Flight::Flight3));
        assert_eq!(row.status, Some(Status::Confirmed));

        // A rejected update leaves the loaded view untouched.
        let err = roster.set_flight(&db, 999, Flight::Flight1).await;
        assert!(matches!(err, Err(Error::UpdateFailure(999, _))));
        assert_eq!(roster.rows().len(), 2);

        // The other loaded row is unaffected.
        let other = roster.rows().iter().find(|r| r.id != id).unwrap();
        assert_eq!(other.flight, None);
        assert_eq!(other.status, None);
    }

    #[tokio::test]
    async fn export_matches_the_loaded_rows_in_order() {
        let db = seeded_db().await;
        let mut roster = roster();
        roster.load_category(&db, "open").await.unwrap();

        let id = roster.rows()[0].id;
        roster.set_flight(&db, id, Flight::Flight2).await.unwrap();

        let bytes = roster.export_csv().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "#,Player A,Player B,Contact,Address,Club,T-Shirt A,T-Shirt B,\
             Proof of Payment,Flight,Status"
        );
        assert!(lines[1].starts_with("1,Ben Cruz,Partner,09170000000,,,M,L,,Flight 2,"));
        assert!(lines[2].starts_with("2,Alma Reyes,"));

        assert_eq!(roster.export_file_name(), "open.csv");
    }
}
