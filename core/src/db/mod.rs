mod assistant;
mod nutrition;
mod progress;
mod recipes;
mod seed;
mod workouts;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use crate::error::{StorageError, StorageResult};
use crate::models::{
    ActivityLevel, FitnessGoal, NewUser, NewUserProfile, ParseEnumError, User, UserProfile,
    new_id, validate_new_user,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let mut db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Enable constraints, bring the schema up to date and seed the exercise
    /// catalog when it is empty. Safe to call on every start.
    pub fn initialize(&mut self) -> StorageResult<usize> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        self.migrate()?;
        let seeded = self.seed_exercises()?;
        if seeded > 0 {
            tracing::info!(count = seeded, "seeded exercise catalog");
        }
        Ok(seeded)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> StorageResult<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    name TEXT NOT NULL,
                    avatar TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_profiles (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    age INTEGER,
                    height_cm REAL,
                    weight_kg REAL,
                    body_fat_pct REAL,
                    activity_level TEXT NOT NULL,
                    fitness_goal TEXT NOT NULL,
                    target_calories INTEGER,
                    target_protein REAL,
                    target_carbs REAL,
                    target_fat REAL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS exercises (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    primary_muscles TEXT NOT NULL,
                    secondary_muscles TEXT NOT NULL,
                    equipment TEXT NOT NULL,
                    instructions TEXT NOT NULL,
                    video_url TEXT,
                    image_url TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS workout_templates (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    description TEXT,
                    is_public INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS template_exercises (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    template_id TEXT NOT NULL REFERENCES workout_templates(id) ON DELETE CASCADE,
                    exercise_id TEXT NOT NULL REFERENCES exercises(id),
                    order_index INTEGER NOT NULL,
                    target_sets INTEGER NOT NULL,
                    target_reps INTEGER,
                    target_weight_kg REAL,
                    rest_secs INTEGER,
                    UNIQUE (template_id, order_index)
                );

                CREATE TABLE IF NOT EXISTS workouts (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    template_id TEXT REFERENCES workout_templates(id) ON DELETE SET NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT,
                    duration_secs INTEGER,
                    total_volume REAL,
                    notes TEXT,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS workout_exercises (
                    id TEXT PRIMARY KEY,
                    workout_id TEXT NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
                    exercise_id TEXT NOT NULL REFERENCES exercises(id),
                    order_index INTEGER NOT NULL,
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    UNIQUE (workout_id, order_index)
                );

                CREATE TABLE IF NOT EXISTS workout_sets (
                    id TEXT PRIMARY KEY,
                    workout_exercise_id TEXT NOT NULL REFERENCES workout_exercises(id) ON DELETE CASCADE,
                    reps INTEGER NOT NULL,
                    weight_kg REAL,
                    duration_secs INTEGER,
                    distance_m REAL,
                    rpe INTEGER,
                    rest_secs INTEGER,
                    notes TEXT,
                    is_warmup INTEGER NOT NULL DEFAULT 0,
                    is_drop_set INTEGER NOT NULL DEFAULT 0,
                    is_failure INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS foods (
                    id TEXT PRIMARY KEY,
                    barcode TEXT,
                    name TEXT NOT NULL,
                    brand TEXT,
                    serving_size REAL NOT NULL,
                    serving_unit TEXT NOT NULL,
                    calories REAL NOT NULL,
                    protein REAL NOT NULL,
                    carbs REAL NOT NULL,
                    fat REAL NOT NULL,
                    fiber REAL,
                    sugar REAL,
                    sodium REAL,
                    image_url TEXT,
                    source TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_entries (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    food_id TEXT NOT NULL REFERENCES foods(id),
                    quantity REAL NOT NULL CHECK (quantity > 0),
                    meal_type TEXT NOT NULL,
                    logged_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS body_measurements (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    type TEXT NOT NULL,
                    value REAL NOT NULL,
                    unit TEXT NOT NULL,
                    measured_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS personal_records (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    exercise_id TEXT NOT NULL REFERENCES exercises(id),
                    type TEXT NOT NULL,
                    value REAL NOT NULL,
                    unit TEXT NOT NULL,
                    workout_id TEXT REFERENCES workouts(id) ON DELETE SET NULL,
                    achieved_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS progress_photos (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    image_url TEXT NOT NULL,
                    pose TEXT NOT NULL,
                    notes TEXT,
                    taken_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS health_data (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    type TEXT NOT NULL,
                    value REAL NOT NULL,
                    unit TEXT NOT NULL,
                    source TEXT NOT NULL,
                    recorded_at TEXT NOT NULL,
                    synced_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sleep_data (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    bed_time TEXT NOT NULL,
                    wake_time TEXT NOT NULL,
                    duration_min INTEGER NOT NULL,
                    deep_sleep_min INTEGER,
                    rem_sleep_min INTEGER,
                    light_sleep_min INTEGER,
                    quality INTEGER CHECK (quality BETWEEN 1 AND 10),
                    source TEXT NOT NULL,
                    recorded_at TEXT NOT NULL,
                    synced_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS ai_conversations (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS ai_messages (
                    id TEXT PRIMARY KEY,
                    conversation_id TEXT NOT NULL REFERENCES ai_conversations(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    role TEXT NOT NULL,
                    metadata TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_workouts_user ON workouts(user_id);
                CREATE INDEX IF NOT EXISTS idx_workouts_start ON workouts(start_time);
                CREATE INDEX IF NOT EXISTS idx_workout_exercises_workout ON workout_exercises(workout_id);
                CREATE INDEX IF NOT EXISTS idx_workout_sets_exercise ON workout_sets(workout_exercise_id);
                CREATE INDEX IF NOT EXISTS idx_food_entries_user ON food_entries(user_id);
                CREATE INDEX IF NOT EXISTS idx_food_entries_logged ON food_entries(logged_at);
                CREATE INDEX IF NOT EXISTS idx_body_measurements_user ON body_measurements(user_id);
                CREATE INDEX IF NOT EXISTS idx_body_measurements_measured ON body_measurements(measured_at);
                CREATE INDEX IF NOT EXISTS idx_health_data_user ON health_data(user_id);
                CREATE INDEX IF NOT EXISTS idx_health_data_recorded ON health_data(recorded_at);
                CREATE INDEX IF NOT EXISTS idx_foods_barcode ON foods(barcode);
                CREATE INDEX IF NOT EXISTS idx_foods_name ON foods(name);
                CREATE INDEX IF NOT EXISTS idx_ai_messages_conversation ON ai_messages(conversation_id);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    description TEXT,
                    servings INTEGER NOT NULL CHECK (servings > 0),
                    instructions TEXT NOT NULL,
                    image_url TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    food_id TEXT NOT NULL REFERENCES foods(id),
                    quantity REAL NOT NULL CHECK (quantity > 0),
                    order_index INTEGER NOT NULL,
                    PRIMARY KEY (recipe_id, order_index)
                );

                CREATE INDEX IF NOT EXISTS idx_recipes_user ON recipes(user_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_food ON recipe_ingredients(food_id);

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Users ---

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            avatar: row.get(3)?,
            created_at: ts_col(row, 4)?,
            updated_at: ts_col(row, 5)?,
        })
    }

    pub fn create_user(&self, user: &NewUser) -> StorageResult<User> {
        validate_new_user(user)?;
        let now = now_text();
        self.conn.execute(
            "INSERT INTO users (id, email, name, avatar, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user.id, user.email.trim(), user.name.trim(), user.avatar, now],
        )?;
        self.get_user_by_id(&user.id)?
            .ok_or_else(|| StorageError::not_found("user", &user.id))
    }

    pub fn get_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, name, avatar, created_at, updated_at FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::user_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, name, avatar, created_at, updated_at FROM users WHERE email = ?1",
        )?;
        let mut rows = stmt.query(params![email.trim()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::user_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Removes the user and everything the user owns.
    pub fn delete_user(&self, id: &str) -> StorageResult<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(changes > 0)
    }

    // --- Profiles ---

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: row.get(0)?,
            user_id: row.get(1)?,
            age: row.get(2)?,
            height_cm: row.get(3)?,
            weight_kg: row.get(4)?,
            body_fat_pct: row.get(5)?,
            activity_level: enum_col::<ActivityLevel>(row, 6)?,
            fitness_goal: enum_col::<FitnessGoal>(row, 7)?,
            target_calories: row.get(8)?,
            target_protein: row.get(9)?,
            target_carbs: row.get(10)?,
            target_fat: row.get(11)?,
            created_at: ts_col(row, 12)?,
            updated_at: ts_col(row, 13)?,
        })
    }

    /// One profile per user: an existing profile is overwritten in place.
    pub fn upsert_user_profile(&self, profile: &NewUserProfile) -> StorageResult<UserProfile> {
        let now = now_text();
        self.conn.execute(
            "INSERT INTO user_profiles (id, user_id, age, height_cm, weight_kg, body_fat_pct,
                activity_level, fitness_goal, target_calories, target_protein, target_carbs,
                target_fat, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
             ON CONFLICT(user_id) DO UPDATE SET
                age = excluded.age,
                height_cm = excluded.height_cm,
                weight_kg = excluded.weight_kg,
                body_fat_pct = excluded.body_fat_pct,
                activity_level = excluded.activity_level,
                fitness_goal = excluded.fitness_goal,
                target_calories = excluded.target_calories,
                target_protein = excluded.target_protein,
                target_carbs = excluded.target_carbs,
                target_fat = excluded.target_fat,
                updated_at = excluded.updated_at",
            params![
                new_id(),
                profile.user_id,
                profile.age,
                profile.height_cm,
                profile.weight_kg,
                profile.body_fat_pct,
                profile.activity_level.as_str(),
                profile.fitness_goal.as_str(),
                profile.target_calories,
                profile.target_protein,
                profile.target_carbs,
                profile.target_fat,
                now,
            ],
        )?;
        self.get_user_profile(&profile.user_id)?
            .ok_or_else(|| StorageError::not_found("user profile", &profile.user_id))
    }

    pub fn get_user_profile(&self, user_id: &str) -> StorageResult<Option<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, age, height_cm, weight_kg, body_fat_pct, activity_level,
                    fitness_goal, target_calories, target_protein, target_carbs, target_fat,
                    created_at, updated_at
             FROM user_profiles WHERE user_id = ?1",
        )?;
        let mut rows = stmt.query(params![user_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::profile_from_row(row)?))
        } else {
            Ok(None)
        }
    }
}

// --- Column helpers ---

/// Fixed-width UTC text, so string order is time order.
pub(crate) fn ts_text(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn now_text() -> String {
    ts_text(&Utc::now())
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_ts(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn ts_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_ts(idx, &text)
}

fn opt_ts_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_ts(idx, &t)).transpose()
}

fn enum_col<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn list_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&naive), |dt| dt.with_timezone(&Utc))
}

/// First and last millisecond of a civil day in the local timezone, as UTC.
#[must_use]
pub fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date);
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    let end = local_midnight(next) - chrono::Duration::milliseconds(1);
    (start, end)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{FoodSource, NewFood};

    pub fn db_with_user(user_id: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&NewUser {
            id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            name: "Test User".to_string(),
            avatar: None,
        })
        .unwrap();
        db
    }

    pub fn sample_food(id: &str, name: &str) -> NewFood {
        NewFood {
            id: id.to_string(),
            barcode: None,
            name: name.to_string(),
            brand: Some("Acme".to_string()),
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            calories: 165.0,
            protein: 31.0,
            carbs: 0.0,
            fat: 3.6,
            fiber: None,
            sugar: None,
            sodium: Some(74.0),
            image_url: None,
            source: FoodSource::Custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::db_with_user;
    use super::*;

    fn sample_user(id: &str, email: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            email: email.to_string(),
            name: "Ada".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_open_in_memory_seeds_catalog() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.count_exercises().unwrap(), 5);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.initialize().unwrap(), 0);
        assert_eq!(db.initialize().unwrap(), 0);
        assert_eq!(db.count_exercises().unwrap(), 5);
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liftlog.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_user(&sample_user("u1", "ada@example.com")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_exercises().unwrap(), 5);
        assert!(db.get_user_by_id("u1").unwrap().is_some());
    }

    #[test]
    fn test_create_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&sample_user("u1", "ada@example.com")).unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.created_at, user.updated_at);

        let by_email = db.get_user_by_email("ADA@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, "u1");
        assert!(db.get_user_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_user_id_and_email() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("u1", "ada@example.com")).unwrap();

        let err = db
            .create_user(&sample_user("u1", "other@example.com"))
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)), "{err:?}");

        let err = db
            .create_user(&sample_user("u2", "ada@example.com"))
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)), "{err:?}");
    }

    #[test]
    fn test_upsert_profile_keeps_one_row() {
        let db = db_with_user("u1");
        let mut profile = NewUserProfile {
            user_id: "u1".to_string(),
            age: Some(34),
            height_cm: Some(180.0),
            weight_kg: Some(82.5),
            body_fat_pct: None,
            activity_level: ActivityLevel::ModeratelyActive,
            fitness_goal: FitnessGoal::BuildMuscle,
            target_calories: Some(2600),
            target_protein: Some(180.0),
            target_carbs: None,
            target_fat: None,
        };
        let first = db.upsert_user_profile(&profile).unwrap();

        profile.target_calories = Some(2400);
        profile.fitness_goal = FitnessGoal::LoseWeight;
        let second = db.upsert_user_profile(&profile).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.target_calories, Some(2400));
        assert_eq!(second.fitness_goal, FitnessGoal::LoseWeight);
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn test_profile_requires_user() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .upsert_user_profile(&NewUserProfile {
                user_id: "ghost".to_string(),
                age: None,
                height_cm: None,
                weight_kg: None,
                body_fat_pct: None,
                activity_level: ActivityLevel::Sedentary,
                fitness_goal: FitnessGoal::MaintainWeight,
                target_calories: None,
                target_protein: None,
                target_carbs: None,
                target_fat: None,
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKey(_)), "{err:?}");
    }

    #[test]
    fn test_ts_text_is_fixed_width() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(ts_text(&dt), "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_local_day_bounds_span_one_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (start, end) = local_day_bounds(date);
        assert!(start < end);
        assert_eq!(start.with_timezone(&Local).date_naive(), date);
        assert_eq!(end.with_timezone(&Local).date_naive(), date);
        assert_eq!(
            (end + chrono::Duration::milliseconds(1))
                .with_timezone(&Local)
                .date_naive(),
            date.succ_opt().unwrap()
        );
    }
}
