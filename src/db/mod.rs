pub mod models;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use models::{ListScope, NewRequest, Request, RequestFilter, RequestUpdate, Role, User};

const REQUEST_COLUMNS: &str = "id, site_id, surname, phone, status, date, time, submitter_id";

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives only as long as its connection, so it
        // must stay on a single connection that is never recycled.
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(Option::<Duration>::None)
            .max_lifetime(Option::<Duration>::None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_id TEXT NOT NULL,
                surname TEXT NOT NULL,
                phone TEXT NOT NULL,
                status TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                submitter_id INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_requests_site_id ON requests(site_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_requests_surname ON requests(surname)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_requests_date_status ON requests(date, status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ── User Operations ────────────────────────────────────────────

    /// Insert a user unless the username is already taken.
    /// Returns true if a row was written.
    pub async fn insert_user_if_absent(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (username, password_hash, role) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT username, password_hash, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(username, password_hash, role)| {
            let role = Role::parse(&role)
                .ok_or_else(|| anyhow::anyhow!("unknown role '{}' for user {}", role, username))?;
            Ok(User {
                username,
                password_hash,
                role,
            })
        })
        .transpose()
    }

    // ── Request Operations ─────────────────────────────────────────

    /// Persist a completed intake, stamped with the server's local date and
    /// time. Returns the new row id.
    pub async fn add_request(&self, req: &NewRequest, submitter_id: i64) -> anyhow::Result<i64> {
        let now = chrono::Local::now();
        let result = sqlx::query(
            r#"
            INSERT INTO requests (site_id, surname, phone, status, date, time, submitter_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.site_id)
        .bind(&req.surname)
        .bind(&req.phone)
        .bind(req.status.as_str())
        .bind(now.format("%Y-%m-%d").to_string())
        .bind(now.format("%H:%M:%S").to_string())
        .bind(submitter_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Newest first.
    pub async fn list_requests(
        &self,
        scope: &ListScope,
        filter: &RequestFilter,
    ) -> anyhow::Result<Vec<Request>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM requests WHERE 1=1",
            REQUEST_COLUMNS
        ));

        if let ListScope::Surname(surname) = scope {
            qb.push(" AND surname = ").push_bind(surname.clone());
        }
        if let Some(site_id) = &filter.site_id {
            qb.push(" AND site_id = ").push_bind(site_id.clone());
        }
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND date >= ")
                .push_bind(from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND date <= ")
                .push_bind(to.format("%Y-%m-%d").to_string());
        }
        qb.push(" ORDER BY id DESC");

        let rows = qb
            .build_query_as::<Request>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Unfiltered snapshot in insertion order, for exports.
    pub async fn all_requests(&self) -> anyhow::Result<Vec<Request>> {
        let rows = sqlx::query_as::<_, Request>(&format!(
            "SELECT {} FROM requests ORDER BY id ASC",
            REQUEST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Overwrite the four mutable fields. Returns false if the id is unknown.
    pub async fn update_request(&self, id: i64, update: &RequestUpdate) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE requests SET site_id = ?, surname = ?, phone = ?, status = ? WHERE id = ?",
        )
        .bind(&update.site_id)
        .bind(&update.surname)
        .bind(&update.phone)
        .bind(&update.status)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns false if the id is unknown.
    pub async fn delete_request(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.run_migrations().await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::DoorStatus;

    fn new_request(site_id: &str, surname: &str, status: DoorStatus) -> NewRequest {
        NewRequest {
            site_id: site_id.to_string(),
            surname: surname.to_string(),
            phone: "+77001234567".to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn add_request_stamps_date_and_time() {
        let db = test_db().await;
        let id = db
            .add_request(&new_request("01234", "Ivanov", DoorStatus::Open), 42)
            .await
            .unwrap();

        let rows = db.all_requests().await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.site_id, "01234");
        assert_eq!(row.status, "open");
        assert_eq!(row.submitter_id, 42);
        assert!(chrono::NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").is_ok());
        assert!(chrono::NaiveTime::parse_from_str(&row.time, "%H:%M:%S").is_ok());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_scoped() {
        let db = test_db().await;
        db.add_request(&new_request("11111", "Ivanov", DoorStatus::Open), 1)
            .await
            .unwrap();
        db.add_request(&new_request("22222", "Petrov", DoorStatus::Close), 2)
            .await
            .unwrap();
        db.add_request(&new_request("33333", "Ivanov", DoorStatus::Close), 1)
            .await
            .unwrap();

        let all = db
            .list_requests(&ListScope::All, &RequestFilter::default())
            .await
            .unwrap();
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let ivanov = db
            .list_requests(
                &ListScope::Surname("Ivanov".to_string()),
                &RequestFilter::default(),
            )
            .await
            .unwrap();
        assert_eq!(ivanov.len(), 2);
        assert!(ivanov.iter().all(|r| r.surname == "Ivanov"));
    }

    #[tokio::test]
    async fn date_range_is_inclusive() {
        let db = test_db().await;
        db.add_request(&new_request("11111", "Ivanov", DoorStatus::Open), 1)
            .await
            .unwrap();
        let today = chrono::Local::now().date_naive();

        let hit = RequestFilter {
            date_from: Some(today),
            date_to: Some(today),
            ..Default::default()
        };
        assert_eq!(db.list_requests(&ListScope::All, &hit).await.unwrap().len(), 1);

        let miss = RequestFilter {
            date_from: today.succ_opt(),
            ..Default::default()
        };
        assert!(db.list_requests(&ListScope::All, &miss).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_touches_only_mutable_fields() {
        let db = test_db().await;
        let id = db
            .add_request(&new_request("11111", "Ivanov", DoorStatus::Open), 7)
            .await
            .unwrap();
        let before = db.all_requests().await.unwrap().remove(0);

        let update = RequestUpdate {
            site_id: "not-five".to_string(),
            surname: "Sidorov".to_string(),
            phone: "123".to_string(),
            status: "ajar".to_string(),
        };
        assert!(db.update_request(id, &update).await.unwrap());

        let after = db.all_requests().await.unwrap().remove(0);
        assert_eq!(after.site_id, "not-five");
        assert_eq!(after.surname, "Sidorov");
        assert_eq!(after.phone, "123");
        assert_eq!(after.status, "ajar");
        assert_eq!(after.date, before.date);
        assert_eq!(after.time, before.time);
        assert_eq!(after.submitter_id, 7);
    }

    #[tokio::test]
    async fn missing_ids_are_no_ops() {
        let db = test_db().await;
        let update = RequestUpdate {
            site_id: "11111".to_string(),
            surname: "X".to_string(),
            phone: "87001234567".to_string(),
            status: "open".to_string(),
        };
        assert!(!db.update_request(99, &update).await.unwrap());
        assert!(!db.delete_request(99).await.unwrap());
    }

    #[tokio::test]
    async fn insert_user_ignores_duplicates() {
        let db = test_db().await;
        assert!(db.insert_user_if_absent("admin", "h1", Role::Admin).await.unwrap());
        assert!(!db.insert_user_if_absent("admin", "h2", Role::User).await.unwrap());

        let user = db.find_user_by_username("admin").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "h1");
        assert_eq!(user.role, Role::Admin);
        assert!(db.find_user_by_username("ghost").await.unwrap().is_none());
    }
}
