use std::collections::HashMap;
use std::path::PathBuf;

use sqlx::{
    migrate::MigrateDatabase, sqlite::Sqlite, sqlite::SqlitePoolOptions, SqlitePool,
};

use crate::{
    core::registration::{Flight, NewRegistration, Registration, Status},
    error::Error,
};

/// Filter for roster reads. Both fields are optional; no pagination, the
/// full filtered set comes back in one response.
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub event: Option<String>,
    pub category: Option<String>,
}

/// Façade over the shared registration table.
///
/// All four operations cross into the database and surface failures as
/// tagged errors; none retry.
pub struct RegistrationDb {
    db: SqlitePool,
}

impl RegistrationDb {
    pub async fn init(file: &PathBuf) -> anyhow::Result<Self> {
        let url = format!("sqlite://{}", file.to_str().unwrap());
        Sqlite::create_database(&url).await?;

        let db = SqlitePool::connect(&url).await?;
        create_schema(&db).await?;

        Ok(RegistrationDb { db })
    }

    pub async fn load(file: &PathBuf) -> anyhow::Result<Self> {
        let url = format!("sqlite://{}", file.to_str().unwrap());
        Sqlite::create_database(&url).await?;

        let db = SqlitePool::connect(&url).await?;
        Ok(RegistrationDb { db })
    }

    /// Single-connection in-memory database for tests. More than one
    /// pooled connection would each see its own empty memory database.
    pub async fn init_in_memory() -> anyhow::Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        create_schema(&db).await?;

        Ok(RegistrationDb { db })
    }

    /// Appends one row, enforcing the category limit inside the same
    /// transaction so concurrent submissions cannot overrun it. Never
    /// updates an existing row; `flight` and `status` start unset.
    pub async fn insert_registration(
        &self,
        new: &NewRegistration,
        limit: u32,
    ) -> Result<i64, Error> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| Error::NetworkFailure(e.to_string()))?;

        let count: i64 = sqlx::query_scalar(
            "select count(*) from pickle where event = ? and category = ?",
        )
        .bind(&new.event)
        .bind(&new.category)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::NetworkFailure(e.to_string()))?;

        if count >= limit as i64 {
            return Err(Error::CapacityExceeded(new.category.clone()));
        }

        let result = sqlx::query(
            "insert into pickle(
                    player_a, player_b, contact_number, address,
                    category, club, tshirt_size_a, tshirt_size_b,
                    tshirt_name_a, tshirt_name_b, proof, agree, event
                ) values(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.player_a)
        .bind(&new.player_b)
        .bind(&new.contact_number)
        .bind(&new.address)
        .bind(&new.category)
        .bind(&new.club)
        .bind(new.tshirt_size_a)
        .bind(new.tshirt_size_b)
        .bind(&new.tshirt_name_a)
        .bind(&new.tshirt_name_b)
        .bind(&new.proof)
        .bind(new.agree)
        .bind(&new.event)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::InsertFailure(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| Error::NetworkFailure(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Read-only filtered fetch. Ordered most recent first when a
    /// category filter is supplied, unspecified order otherwise.
    pub async fn list_registrations(
        &self,
        filter: &RegistrationFilter,
    ) -> Result<Vec<Registration>, Error> {
        let rows = match (&filter.event, &filter.category) {
            (Some(event), Some(category)) => {
                sqlx::query_as(
                    "select * from pickle where event = ? and category = ?
                        order by id desc",
                )
                .bind(event)
                .bind(category)
                .fetch_all(&self.db)
                .await
            }
            (None, Some(category)) => {
                sqlx::query_as("select * from pickle where category = ? order by id desc")
                    .bind(category)
                    .fetch_all(&self.db)
                    .await
            }
            (Some(event), None) => {
                sqlx::query_as("select * from pickle where event = ?")
                    .bind(event)
                    .fetch_all(&self.db)
                    .await
            }
            (None, None) => sqlx::query_as("select * from pickle").fetch_all(&self.db).await,
        };

        rows.map_err(|e| Error::NetworkFailure(e.to_string()))
    }

    /// Registration counts per category for one event; feeds the
    /// capacity tracker.
    pub async fn count_by_category(&self, event: &str) -> Result<HashMap<String, u32>, Error> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "select category, count(*) from pickle where event = ? group by category",
        )
        .bind(event)
        .fetch_all(&self.db)
        .await
        .map_err(|e| Error::NetworkFailure(e.to_string()))?;

        Ok(counts
            .into_iter()
            .map(|(category, count)| (category, count as u32))
            .collect())
    }

    /// Partial update restricted to the two admin-mutable fields. No
    /// concurrency token; last writer wins.
    pub async fn update_admin_fields(
        &self,
        id: i64,
        flight: Option<Flight>,
        status: Option<Status>,
    ) -> Result<(), Error> {
        let result = match (flight, status) {
            (Some(flight), Some(status)) => {
                sqlx::query("update pickle set flight = ?, status = ? where id = ?")
                    .bind(flight)
                    .bind(status)
                    .bind(id)
                    .execute(&self.db)
                    .await
            }
            (Some(flight), None) => {
                sqlx::query("update pickle set flight = ? where id = ?")
                    .bind(flight)
                    .bind(id)
                    .execute(&self.db)
                    .await
            }
            (None, Some(status)) => {
                sqlx::query("update pickle set status = ? where id = ?")
                    .bind(status)
                    .bind(id)
                    .execute(&self.db)
                    .await
            }
            (None, None) => return Ok(()),
        };

        let result = result.map_err(|e| Error::UpdateFailure(id, e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(Error::UpdateFailure(id, "no such registration".to_owned()));
        }

        Ok(())
    }
}

async fn create_schema(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "create table if not exists pickle(
                id integer primary key autoincrement,
                player_a text not null,
                player_b text not null,
                contact_number text not null,
                address text,
                category text not null,
                club text,
                tshirt_size_a text not null,
                tshirt_size_b text not null,
                tshirt_name_a text,
                tshirt_name_b text,
                proof text,
                agree boolean not null,
                event text not null,
                flight text,
                status text
            );",
    )
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registration::TshirtSize;

    fn sample(event: &str, category: &str, player_a: &str) -> NewRegistration {
        NewRegistration {
            player_a: player_a.to_owned(),
            player_b: "Partner".to_owned(),
            contact_number: "09170000000".to_owned(),
            address: Some("Lopez".to_owned()),
            category: category.to_owned(),
            club: None,
            tshirt_size_a: TshirtSize::M,
            tshirt_size_b: TshirtSize::L,
            tshirt_name_a: None,
            tshirt_name_b: None,
            proof: None,
            agree: true,
            event: event.to_owned(),
        }
    }

    #[tokio::test]
    async fn insert_then_list_round_trips() {
        let db = RegistrationDb::init_in_memory().await.unwrap();

        let mut new = sample("lopez", "open", "Alma Reyes");
        new.club = Some("Smash Club".to_owned());
        new.proof = Some("http://localhost/proofs/x.jpg".to_owned());
        let id = db.insert_registration(&new, 20).await.unwrap();

        let rows = db
            .list_registrations(&RegistrationFilter {
                event: Some("lopez".to_owned()),
                category: Some("open".to_owned()),
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.player_a, new.player_a);
        assert_eq!(row.player_b, new.player_b);
        assert_eq!(row.contact_number, new.contact_number);
        assert_eq!(row.address, new.address);
        assert_eq!(row.category, new.category);
        assert_eq!(row.club, new.club);
        assert_eq!(row.tshirt_size_a, new.tshirt_size_a);
        assert_eq!(row.tshirt_size_b, new.tshirt_size_b);
        assert_eq!(row.proof, new.proof);
        assert!(row.agree);
        assert_eq!(row.event, "lopez");
        assert_eq!(row.flight, None);
        assert_eq!(row.status, None);
    }

    #[tokio::test]
    async fn category_lists_are_most_recent_first() {
        let db = RegistrationDb::init_in_memory().await.unwrap();

        for name in ["First", "Second", "Third"] {
            db.insert_registration(&sample("lopez", "open", name), 20)
                .await
                .unwrap();
        }

        let rows = db
            .list_registrations(&RegistrationFilter {
                event: Some("lopez".to_owned()),
                category: Some("open".to_owned()),
            })
            .await
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.player_a.as_str()).collect();
        assert_eq!(names, vec!["Third", "Second", "First"]);
    }

    #[tokio::test]
    async fn insert_rejects_a_full_category() {
        let db = RegistrationDb::init_in_memory().await.unwrap();

        for i in 0..3 {
            db.insert_registration(&sample("lopez", "open", &format!("Team {}", i)), 3)
                .await
                .unwrap();
        }

        let err = db
            .insert_registration(&sample("lopez", "open", "Late Team"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(c) if c == "open"));

        // Other categories and events are unaffected.
        db.insert_registration(&sample("lopez", "novice", "Novice Team"), 3)
            .await
            .unwrap();
        db.insert_registration(&sample("aruola", "open", "Other Event"), 3)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn counts_partition_by_category_within_event() {
        let db = RegistrationDb::init_in_memory().await.unwrap();

        db.insert_registration(&sample("lopez", "open", "A"), 20)
            .await
            .unwrap();
        db.insert_registration(&sample("lopez", "open", "B"), 20)
            .await
            .unwrap();
        db.insert_registration(&sample("lopez", "novice", "C"), 20)
            .await
            .unwrap();
        db.insert_registration(&sample("aruola", "open", "D"), 20)
            .await
            .unwrap();

        let counts = db.count_by_category("lopez").await.unwrap();
        assert_eq!(counts.get("open"), Some(&2));
        assert_eq!(counts.get("novice"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[tokio::test]
    async fn admin_update_touches_only_the_named_field_and_row() {
        let db = RegistrationDb::init_in_memory().await.unwrap();

        let first = db
            .insert_registration(&sample("lopez", "open", "First"), 20)
            .await
            .unwrap();
        let second = db
            .insert_registration(&sample("lopez", "open", "Second"), 20)
            .await
            .unwrap();

        db.update_admin_fields(first, Some(Flight::Flight3), None)
            .await
            .unwrap();

        let rows = db
            .list_registrations(&RegistrationFilter {
                event: Some("lopez".to_owned()),
                category: Some("open".to_owned()),
            })
            .await
            .unwrap();

        let updated = rows.iter().find(|r| r.id == first).unwrap();
        assert_eq!(updated.flight, Some(Flight::Flight3));
        assert_eq!(updated.status, None);
        assert_eq!(updated.player_a, "First");

        let untouched = rows.iter().find(|r| r.id == second).unwrap();
        assert_eq!(untouched.flight, None);
        assert_eq!(untouched.status, None);

        db.update_admin_fields(second, None, Some(Status::Refunded))
            .await
            .unwrap();
        let rows = db
            .list_registrations(&RegistrationFilter::default())
            .await
            .unwrap();
        let second_row = rows.iter().find(|r| r.id == second).unwrap();
        assert_eq!(second_row.status, Some(Status::Refunded));
        assert_eq!(second_row.flight, None);
    }

    #[tokio::test]
    async fn updating_a_missing_row_fails() {
        let db = RegistrationDb::init_in_memory().await.unwrap();
        let err = db
            .update_admin_fields(99, Some(Flight::Flight1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpdateFailure(99, _)));
    }
}
