//! Async front for the SQLite [`Database`].
//!
//! All SQLite work runs on the blocking pool behind one process-wide mutex,
//! so `initialize()` and multi-statement writes never interleave.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::models::{
    AiConversation, AiMessage, BodyMeasurement, Exercise, ExerciseCategory, Food, FoodEntry,
    HealthData, HealthMetric, MeasurementType, NewAiConversation, NewAiMessage,
    NewBodyMeasurement, NewFood, NewFoodEntry, NewHealthData, NewPersonalRecord,
    NewProgressPhoto, NewRecipe, NewSleepData, NewUser, NewUserProfile, NewWorkout,
    NewWorkoutExercise, NewWorkoutSet, NewWorkoutTemplate, PersonalRecord, ProgressPhoto, Recipe,
    RecordType, SleepData, User, UserProfile, Workout, WorkoutExercise, WorkoutSet,
    WorkoutTemplate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::InMemory => f.write_str(":memory:"),
        }
    }
}

/// Cloneable handle to the local store. Clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    handle: Arc<Mutex<Option<Database>>>,
    location: StoreLocation,
}

impl LocalStore {
    /// Operations fail with `Uninitialized` until [`LocalStore::initialize`] runs.
    #[must_use]
    pub fn new(location: StoreLocation) -> Self {
        Self {
            handle: Arc::new(Mutex::new(None)),
            location,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StoreLocation::InMemory)
    }

    #[must_use]
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Opens the handle if needed, then ensures schema and seed data.
    /// Calling it again re-runs the idempotent schema and seed steps.
    pub async fn initialize(&self) -> StorageResult<()> {
        let handle = Arc::clone(&self.handle);
        let location = self.location.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(db) = guard.as_mut() {
                db.initialize()?;
            } else {
                let db = match &location {
                    StoreLocation::File(path) => Database::open(path)?,
                    StoreLocation::InMemory => Database::open_in_memory()?,
                };
                *guard = Some(db);
                tracing::debug!(%location, "opened local store");
            }
            Ok(())
        })
        .await?
    }

    /// Drops the connection. An in-memory store loses its data.
    pub async fn close(&self) -> StorageResult<()> {
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || {
            let mut guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            guard.take();
        })
        .await?;
        Ok(())
    }

    pub async fn is_initialized(&self) -> StorageResult<bool> {
        let handle = Arc::clone(&self.handle);
        let open = tokio::task::spawn_blocking(move || {
            handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        })
        .await?;
        Ok(open)
    }

    async fn with_db<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Database) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        tokio::task::spawn_blocking(move || {
            let mut guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            let db = guard.as_mut().ok_or(StorageError::Uninitialized)?;
            op(db)
        })
        .await?
    }

    // --- Users ---

    pub async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        self.with_db(move |db| db.create_user(&user)).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_user_by_id(&id)).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let email = email.to_string();
        self.with_db(move |db| db.get_user_by_email(&email)).await
    }

    pub async fn delete_user(&self, id: &str) -> StorageResult<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.delete_user(&id)).await
    }

    pub async fn upsert_user_profile(&self, profile: NewUserProfile) -> StorageResult<UserProfile> {
        self.with_db(move |db| db.upsert_user_profile(&profile)).await
    }

    pub async fn get_user_profile(&self, user_id: &str) -> StorageResult<Option<UserProfile>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_user_profile(&user_id)).await
    }

    // --- Exercises ---

    pub async fn get_all_exercises(&self) -> StorageResult<Vec<Exercise>> {
        self.with_db(|db| db.get_all_exercises()).await
    }

    pub async fn get_exercises_by_category(
        &self,
        category: ExerciseCategory,
    ) -> StorageResult<Vec<Exercise>> {
        self.with_db(move |db| db.get_exercises_by_category(category))
            .await
    }

    pub async fn get_exercise_by_id(&self, id: &str) -> StorageResult<Option<Exercise>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_exercise_by_id(&id)).await
    }

    pub async fn count_exercises(&self) -> StorageResult<i64> {
        self.with_db(|db| db.count_exercises()).await
    }

    // --- Workouts ---

    pub async fn create_workout(&self, workout: NewWorkout) -> StorageResult<Workout> {
        self.with_db(move |db| db.create_workout(&workout)).await
    }

    pub async fn get_workout_by_id(&self, id: &str) -> StorageResult<Option<Workout>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_workout_by_id(&id)).await
    }

    pub async fn get_workouts_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> StorageResult<Vec<Workout>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_workouts_for_user(&user_id, limit))
            .await
    }

    pub async fn add_workout_exercise(
        &self,
        workout_id: &str,
        exercise: NewWorkoutExercise,
    ) -> StorageResult<WorkoutExercise> {
        let workout_id = workout_id.to_string();
        self.with_db(move |db| db.add_workout_exercise(&workout_id, &exercise))
            .await
    }

    pub async fn remove_workout_exercise(
        &self,
        workout_id: &str,
        workout_exercise_id: &str,
    ) -> StorageResult<bool> {
        let workout_id = workout_id.to_string();
        let workout_exercise_id = workout_exercise_id.to_string();
        self.with_db(move |db| db.remove_workout_exercise(&workout_id, &workout_exercise_id))
            .await
    }

    pub async fn add_workout_set(
        &self,
        workout_exercise_id: &str,
        set: NewWorkoutSet,
    ) -> StorageResult<WorkoutSet> {
        let workout_exercise_id = workout_exercise_id.to_string();
        self.with_db(move |db| db.add_workout_set(&workout_exercise_id, &set))
            .await
    }

    pub async fn complete_workout(
        &self,
        workout_id: &str,
        end_time: DateTime<Utc>,
    ) -> StorageResult<Workout> {
        let workout_id = workout_id.to_string();
        self.with_db(move |db| db.complete_workout(&workout_id, end_time))
            .await
    }

    pub async fn delete_workout(&self, id: &str) -> StorageResult<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.delete_workout(&id)).await
    }

    // --- Templates ---

    pub async fn create_template(
        &self,
        template: NewWorkoutTemplate,
    ) -> StorageResult<WorkoutTemplate> {
        self.with_db(move |db| db.create_template(&template)).await
    }

    pub async fn get_template_by_id(&self, id: &str) -> StorageResult<Option<WorkoutTemplate>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_template_by_id(&id)).await
    }

    pub async fn get_templates_for_user(
        &self,
        user_id: &str,
    ) -> StorageResult<Vec<WorkoutTemplate>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_templates_for_user(&user_id))
            .await
    }

    pub async fn delete_template(&self, id: &str) -> StorageResult<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.delete_template(&id)).await
    }

    // --- Foods ---

    pub async fn create_food(&self, food: NewFood) -> StorageResult<Food> {
        self.with_db(move |db| db.create_food(&food)).await
    }

    /// Insert-or-get in one step; concurrent callers caching the same id all
    /// receive the stored row.
    pub async fn cache_food(&self, food: NewFood) -> StorageResult<Food> {
        self.with_db(move |db| db.cache_food(&food)).await
    }

    pub async fn get_food_by_id(&self, id: &str) -> StorageResult<Option<Food>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_food_by_id(&id)).await
    }

    pub async fn get_food_by_barcode(&self, barcode: &str) -> StorageResult<Option<Food>> {
        let barcode = barcode.to_string();
        self.with_db(move |db| db.get_food_by_barcode(&barcode)).await
    }

    pub async fn search_foods(&self, query: &str, limit: i64) -> StorageResult<Vec<Food>> {
        let query = query.to_string();
        self.with_db(move |db| db.search_foods(&query, limit)).await
    }

    pub async fn delete_food(&self, id: &str) -> StorageResult<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.delete_food(&id)).await
    }

    // --- Recipes ---

    pub async fn create_recipe(&self, recipe: NewRecipe) -> StorageResult<Recipe> {
        self.with_db(move |db| db.create_recipe(&recipe)).await
    }

    pub async fn get_recipe_by_id(&self, id: &str) -> StorageResult<Option<Recipe>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_recipe_by_id(&id)).await
    }

    pub async fn get_recipes_for_user(&self, user_id: &str) -> StorageResult<Vec<Recipe>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_recipes_for_user(&user_id)).await
    }

    pub async fn delete_recipe(&self, id: &str) -> StorageResult<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.delete_recipe(&id)).await
    }

    // --- Food entries ---

    pub async fn create_food_entry(&self, entry: NewFoodEntry) -> StorageResult<FoodEntry> {
        self.with_db(move |db| db.create_food_entry(&entry)).await
    }

    pub async fn get_food_entry_by_id(&self, id: &str) -> StorageResult<Option<FoodEntry>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_food_entry_by_id(&id)).await
    }

    pub async fn get_food_entries_by_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<Vec<FoodEntry>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_food_entries_by_date(&user_id, date))
            .await
    }

    pub async fn get_food_entries_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<FoodEntry>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_food_entries_between(&user_id, start, end))
            .await
    }

    // --- Progress ---

    pub async fn create_body_measurement(
        &self,
        measurement: NewBodyMeasurement,
    ) -> StorageResult<BodyMeasurement> {
        self.with_db(move |db| db.create_body_measurement(&measurement))
            .await
    }

    pub async fn get_body_measurements(
        &self,
        user_id: &str,
        kind: MeasurementType,
        limit: i64,
    ) -> StorageResult<Vec<BodyMeasurement>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_body_measurements(&user_id, kind, limit))
            .await
    }

    pub async fn create_personal_record(
        &self,
        record: NewPersonalRecord,
    ) -> StorageResult<PersonalRecord> {
        self.with_db(move |db| db.create_personal_record(&record))
            .await
    }

    pub async fn get_personal_records(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
    ) -> StorageResult<Vec<PersonalRecord>> {
        let user_id = user_id.to_string();
        let exercise_id = exercise_id.map(str::to_string);
        self.with_db(move |db| db.get_personal_records(&user_id, exercise_id.as_deref()))
            .await
    }

    pub async fn get_best_personal_record(
        &self,
        user_id: &str,
        exercise_id: &str,
        kind: RecordType,
    ) -> StorageResult<Option<PersonalRecord>> {
        let user_id = user_id.to_string();
        let exercise_id = exercise_id.to_string();
        self.with_db(move |db| db.get_best_personal_record(&user_id, &exercise_id, kind))
            .await
    }

    /// Compare-and-insert under one lock; `None` when the record is not an improvement.
    pub async fn record_if_best(
        &self,
        record: NewPersonalRecord,
    ) -> StorageResult<Option<PersonalRecord>> {
        self.with_db(move |db| db.record_if_best(&record)).await
    }

    pub async fn create_progress_photo(
        &self,
        photo: NewProgressPhoto,
    ) -> StorageResult<ProgressPhoto> {
        self.with_db(move |db| db.create_progress_photo(&photo)).await
    }

    pub async fn get_progress_photos(&self, user_id: &str) -> StorageResult<Vec<ProgressPhoto>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_progress_photos(&user_id)).await
    }

    pub async fn create_health_data(&self, data: NewHealthData) -> StorageResult<HealthData> {
        self.with_db(move |db| db.create_health_data(&data)).await
    }

    pub async fn get_health_data(
        &self,
        user_id: &str,
        kind: HealthMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<HealthData>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_health_data(&user_id, kind, start, end))
            .await
    }

    pub async fn create_sleep_data(&self, sleep: NewSleepData) -> StorageResult<SleepData> {
        self.with_db(move |db| db.create_sleep_data(&sleep)).await
    }

    pub async fn get_sleep_data(&self, user_id: &str, limit: i64) -> StorageResult<Vec<SleepData>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_sleep_data(&user_id, limit))
            .await
    }

    // --- Assistant log ---

    pub async fn create_conversation(
        &self,
        conversation: NewAiConversation,
    ) -> StorageResult<AiConversation> {
        self.with_db(move |db| db.create_conversation(&conversation))
            .await
    }

    pub async fn add_message(&self, message: NewAiMessage) -> StorageResult<AiMessage> {
        self.with_db(move |db| db.add_message(&message)).await
    }

    pub async fn get_conversation(&self, id: &str) -> StorageResult<Option<AiConversation>> {
        let id = id.to_string();
        self.with_db(move |db| db.get_conversation(&id)).await
    }

    pub async fn get_conversations(&self, user_id: &str) -> StorageResult<Vec<AiConversation>> {
        let user_id = user_id.to_string();
        self.with_db(move |db| db.get_conversations(&user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodSource, MealSlot};

    fn user(id: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: "Test".to_string(),
            avatar: None,
        }
    }

    fn food(id: &str) -> NewFood {
        NewFood {
            id: id.to_string(),
            barcode: None,
            name: format!("Food {id}"),
            brand: None,
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            calories: 100.0,
            protein: 10.0,
            carbs: 10.0,
            fat: 1.0,
            fiber: None,
            sugar: None,
            sodium: None,
            image_url: None,
            source: FoodSource::Custom,
        }
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let store = LocalStore::in_memory();
        assert!(!store.is_initialized().await.unwrap());
        let err = store.count_exercises().await.unwrap_err();
        assert!(matches!(err, StorageError::Uninitialized), "{err:?}");
    }

    #[tokio::test]
    async fn test_initialize_seeds_once() {
        let store = LocalStore::in_memory();
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
        assert!(store.is_initialized().await.unwrap());
        assert_eq!(store.count_exercises().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_close_then_uninitialized() {
        let store = LocalStore::in_memory();
        store.initialize().await.unwrap();
        store.close().await.unwrap();
        let err = store.get_all_exercises().await.unwrap_err();
        assert!(matches!(err, StorageError::Uninitialized), "{err:?}");
    }

    #[tokio::test]
    async fn test_file_store_survives_close() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(StoreLocation::File(dir.path().join("liftlog.db")));
        store.initialize().await.unwrap();
        store.create_user(user("u1")).await.unwrap();
        store.close().await.unwrap();

        store.initialize().await.unwrap();
        assert!(store.get_user_by_id("u1").await.unwrap().is_some());
        assert_eq!(store.count_exercises().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_seeds_once() {
        let store = LocalStore::in_memory();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.initialize().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.count_exercises().await.unwrap(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_from_clones() {
        let store = LocalStore::in_memory();
        store.initialize().await.unwrap();
        store.create_user(user("u1")).await.unwrap();
        store.create_food(food("f1")).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_food_entry(NewFoodEntry {
                            id: format!("e{i}"),
                            user_id: "u1".to_string(),
                            food_id: "f1".to_string(),
                            quantity: 1.0,
                            meal: MealSlot::Snack,
                            logged_at: Utc::now(),
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let now = Utc::now();
        let entries = store
            .get_food_entries_between("u1", now - chrono::Duration::hours(1), now)
            .await
            .unwrap();
        assert_eq!(entries.len(), 20);
    }

    #[tokio::test]
    async fn test_errors_propagate_verbatim() {
        let store = LocalStore::in_memory();
        store.initialize().await.unwrap();
        store.create_user(user("u1")).await.unwrap();
        let err = store.create_user(user("u1")).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)), "{err:?}");
    }
}
