//! SQLite-backed location catalogue.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};

use crate::error::StoreError;
use crate::types::LocationCandidate;

use super::seed::read_seed;
use super::CandidateSource;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        description TEXT NOT NULL,
        country TEXT,
        city TEXT,
        category TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_location ON locations(latitude, longitude);
";

const SELECT_COLUMNS: &str =
    "SELECT latitude, longitude, description, country, city, category FROM locations";

/// Read-mostly catalogue of candidate locations.
///
/// Seeded from CSV exactly once: the database file's existence is the
/// "already seeded" marker.
pub struct LocationCandidateStore {
    conn: Connection,
    path: PathBuf,
}

impl LocationCandidateStore {
    /// Open the store at `db_path`, creating and seeding it from `seed_path`
    /// when the file does not exist yet.
    ///
    /// A failed seeding leaves no database file behind.
    pub fn open(db_path: &Path, seed_path: &Path) -> Result<Self, StoreError> {
        if db_path.exists() {
            tracing::debug!("Opening location store at {:?}", db_path);
            let conn = Connection::open(db_path)?;
            return Ok(Self {
                conn,
                path: db_path.to_path_buf(),
            });
        }

        tracing::info!("Initializing location store at {:?}", db_path);
        let candidates = read_seed(seed_path)?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        match Self::create(db_path, &candidates) {
            Ok(conn) => {
                tracing::info!(
                    "Location store initialized with {} locations",
                    candidates.len()
                );
                Ok(Self {
                    conn,
                    path: db_path.to_path_buf(),
                })
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(db_path) {
                    tracing::warn!("Failed to remove partial store {:?}: {rm}", db_path);
                }
                Err(e)
            }
        }
    }

    fn create(db_path: &Path, candidates: &[LocationCandidate]) -> Result<Connection, StoreError> {
        let mut conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO locations (latitude, longitude, description, country, city, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for c in candidates {
                stmt.execute(params![
                    c.latitude,
                    c.longitude,
                    c.description,
                    c.country,
                    c.city,
                    c.category
                ])?;
            }
        }
        tx.commit()?;

        Ok(conn)
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored candidate, in insertion order.
    pub fn get_all_locations(&self) -> Result<Vec<LocationCandidate>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let rows = stmt.query_map([], candidate_from_row)?;
        let candidates = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Candidates inside an inclusive bounding box.
    pub fn search_by_region(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Vec<LocationCandidate>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(
            params![min_lat, max_lat, min_lon, max_lon],
            candidate_from_row,
        )?;
        let candidates = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Number of stored candidates.
    pub fn location_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CandidateSource for LocationCandidateStore {
    fn get_all_locations(&self) -> Result<Vec<LocationCandidate>, StoreError> {
        LocationCandidateStore::get_all_locations(self)
    }
}

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<LocationCandidate> {
    Ok(LocationCandidate {
        latitude: row.get(0)?,
        longitude: row.get(1)?,
        description: row.get(2)?,
        country: row.get(3)?,
        city: row.get(4)?,
        category: row.get(5)?,
    })
}
