use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{StorageError, StorageResult};
use crate::models::{
    BodyMeasurement, DailyNutrition, Food, FoodEntry, MealSlot, MeasurementType,
    NewBodyMeasurement, NewFood, NewFoodEntry, NewPersonalRecord, NewUser, NewWorkout,
    NewWorkoutExercise, PersonalRecord, RecordType, User, Workout, new_id,
};
use crate::openfoodfacts::{format_barcode, is_valid_barcode};
use crate::store::{LocalStore, StoreLocation};

/// Remote results requested per search.
const REMOTE_PAGE_SIZE: u32 = 10;
const MIN_QUERY_CHARS: usize = 2;

/// Remote food database.
///
/// Implementations swallow their own failures: a lookup that cannot be
/// answered is `None` or an empty list, never an error.
#[async_trait]
pub trait FoodLookupProvider: Send + Sync {
    async fn lookup_barcode(&self, barcode: &str) -> Option<NewFood>;
    async fn search(&self, query: &str, page: u32, page_size: u32) -> Vec<NewFood>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedWorkout {
    pub workout: Workout,
    pub new_records: Vec<PersonalRecord>,
}

pub struct FitnessService {
    store: LocalStore,
}

impl FitnessService {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Opens and initializes a file-backed store.
    pub async fn open(path: PathBuf) -> StorageResult<Self> {
        let store = LocalStore::new(StoreLocation::File(path));
        store.initialize().await?;
        Ok(Self { store })
    }

    pub async fn open_in_memory() -> StorageResult<Self> {
        let store = LocalStore::in_memory();
        store.initialize().await?;
        Ok(Self { store })
    }

    /// Direct access for operations that need no orchestration.
    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // --- Users ---

    /// Returns the user, creating it on first use.
    pub async fn ensure_user(&self, id: &str, name: &str, email: &str) -> StorageResult<User> {
        if let Some(user) = self.store.get_user_by_id(id).await? {
            return Ok(user);
        }
        let user = self
            .store
            .create_user(NewUser {
                id: id.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                avatar: None,
            })
            .await?;
        tracing::info!(user_id = %user.id, "created user");
        Ok(user)
    }

    // --- Food lookup ---

    /// Stores a remote food, or returns the row already stored under its id.
    pub async fn cache_food(&self, food: NewFood) -> StorageResult<Food> {
        self.store.cache_food(food).await
    }

    /// Caches each remote food. Foods the store refuses are logged and left out.
    pub async fn cache_foods(&self, foods: Vec<NewFood>) -> Vec<Food> {
        let mut cached = Vec::with_capacity(foods.len());
        for food in foods {
            let id = food.id.clone();
            match self.cache_food(food).await {
                Ok(stored) => cached.push(stored),
                Err(e) => tracing::warn!(food_id = %id, error = %e, "skipping remote food"),
            }
        }
        cached
    }

    /// Local store first; the provider is only asked when the barcode is valid
    /// and unknown locally. Remote hits are cached.
    pub async fn barcode_lookup(
        &self,
        provider: &dyn FoodLookupProvider,
        raw: &str,
    ) -> StorageResult<Option<Food>> {
        let barcode = format_barcode(raw);
        if !is_valid_barcode(&barcode) {
            tracing::debug!(raw, "rejected invalid barcode");
            return Ok(None);
        }

        if let Some(cached) = self.store.get_food_by_barcode(&barcode).await? {
            tracing::debug!(%barcode, food_id = %cached.id, "barcode found locally");
            return Ok(Some(cached));
        }

        match provider.lookup_barcode(&barcode).await {
            Some(remote) => {
                let food = self.cache_food(remote).await?;
                tracing::info!(%barcode, food_id = %food.id, "cached remote product");
                Ok(Some(food))
            }
            None => Ok(None),
        }
    }

    /// Local matches first, then the first remote page. Remote results are
    /// cached; duplicates by name and brand are dropped.
    pub async fn search_and_cache(
        &self,
        provider: &dyn FoodLookupProvider,
        query: &str,
        limit: usize,
    ) -> StorageResult<Vec<Food>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS || limit == 0 {
            return Ok(Vec::new());
        }

        let local_limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let local = self.store.search_foods(query, local_limit).await?;
        let remote = provider.search(query, 1, REMOTE_PAGE_SIZE).await;

        let cached_remote = self.cache_foods(remote).await;

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut all = Vec::new();
        for food in local.into_iter().chain(cached_remote) {
            let key = (
                food.name.to_lowercase(),
                food.brand.as_deref().unwrap_or_default().to_lowercase(),
            );
            if seen.insert(key) {
                all.push(food);
            }
            if all.len() == limit {
                break;
            }
        }
        Ok(all)
    }

    // --- Nutrition diary ---

    pub async fn log_food(
        &self,
        user_id: &str,
        food_id: &str,
        quantity: f64,
        meal: MealSlot,
        logged_at: DateTime<Utc>,
    ) -> StorageResult<FoodEntry> {
        self.store
            .create_food_entry(NewFoodEntry {
                id: new_id(),
                user_id: user_id.to_string(),
                food_id: food_id.to_string(),
                quantity,
                meal,
                logged_at,
            })
            .await
    }

    /// Entries of the local civil day grouped by meal, with the profile's targets.
    pub async fn daily_nutrition(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<DailyNutrition> {
        let entries = self.store.get_food_entries_by_date(user_id, date).await?;
        let targets = self
            .store
            .get_user_profile(user_id)
            .await?
            .and_then(|p| p.targets());
        Ok(DailyNutrition::from_entries(date, entries, targets))
    }

    // --- Progress ---

    pub async fn log_measurement(
        &self,
        user_id: &str,
        kind: MeasurementType,
        value: f64,
        unit: &str,
        measured_at: DateTime<Utc>,
    ) -> StorageResult<BodyMeasurement> {
        self.store
            .create_body_measurement(NewBodyMeasurement {
                id: new_id(),
                user_id: user_id.to_string(),
                kind,
                value,
                unit: unit.to_string(),
                measured_at,
            })
            .await
    }

    pub async fn latest_measurement(
        &self,
        user_id: &str,
        kind: MeasurementType,
    ) -> StorageResult<Option<BodyMeasurement>> {
        let mut latest = self.store.get_body_measurements(user_id, kind, 1).await?;
        Ok(latest.pop())
    }

    // --- Workouts ---

    /// New open workout. With a template, its exercises are copied in order
    /// (without sets).
    pub async fn start_workout(
        &self,
        user_id: &str,
        name: &str,
        template_id: Option<&str>,
        start_time: DateTime<Utc>,
    ) -> StorageResult<Workout> {
        let exercises = match template_id {
            Some(id) => {
                let template = self
                    .store
                    .get_template_by_id(id)
                    .await?
                    .ok_or_else(|| StorageError::not_found("template", id))?;
                template
                    .exercises
                    .into_iter()
                    .map(|e| NewWorkoutExercise {
                        id: new_id(),
                        exercise_id: e.exercise_id,
                        notes: None,
                        sets: Vec::new(),
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        self.store
            .create_workout(NewWorkout {
                id: new_id(),
                user_id: user_id.to_string(),
                name: name.to_string(),
                template_id: template_id.map(str::to_string),
                start_time,
                notes: None,
                exercises,
            })
            .await
    }

    /// Completes the workout, then records a `volume` personal record for
    /// every exercise that beat the user's previous best.
    pub async fn complete_workout(
        &self,
        workout_id: &str,
        end_time: DateTime<Utc>,
    ) -> StorageResult<CompletedWorkout> {
        let workout = self.store.complete_workout(workout_id, end_time).await?;

        // summed per exercise, in first-appearance order
        let mut volumes: Vec<(String, f64)> = Vec::new();
        for exercise in &workout.exercises {
            let volume = exercise.volume();
            match volumes.iter_mut().find(|(id, _)| *id == exercise.exercise_id) {
                Some((_, total)) => *total += volume,
                None => volumes.push((exercise.exercise_id.clone(), volume)),
            }
        }

        let mut new_records = Vec::new();
        for (exercise_id, volume) in volumes {
            if volume <= 0.0 {
                continue;
            }
            let record = self
                .store
                .record_if_best(NewPersonalRecord {
                    id: new_id(),
                    user_id: workout.user_id.clone(),
                    exercise_id,
                    kind: RecordType::Volume,
                    value: volume,
                    unit: "kg".to_string(),
                    workout_id: Some(workout.id.clone()),
                    achieved_at: end_time,
                })
                .await?;
            new_records.extend(record);
        }

        tracing::info!(
            workout_id = %workout.id,
            volume = workout.total_volume.unwrap_or_default(),
            records = new_records.len(),
            "completed workout"
        );
        Ok(CompletedWorkout {
            workout,
            new_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActivityLevel, FitnessGoal, FoodSource, NewTemplateExercise, NewUserProfile,
        NewWorkoutSet, NewWorkoutTemplate,
    };
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        foods: Vec<NewFood>,
        barcode_calls: AtomicUsize,
        search_calls: AtomicUsize,
    }

    impl CountingProvider {
        fn with(foods: Vec<NewFood>) -> Self {
            Self {
                foods,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl FoodLookupProvider for CountingProvider {
        async fn lookup_barcode(&self, barcode: &str) -> Option<NewFood> {
            self.barcode_calls.fetch_add(1, Ordering::SeqCst);
            self.foods
                .iter()
                .find(|f| f.barcode.as_deref() == Some(barcode))
                .cloned()
        }

        async fn search(&self, _query: &str, _page: u32, _page_size: u32) -> Vec<NewFood> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.foods.clone()
        }
    }

    fn remote_food(code: &str, name: &str, brand: &str) -> NewFood {
        NewFood {
            id: format!("off_{code}"),
            barcode: Some(code.to_string()),
            name: name.to_string(),
            brand: Some(brand.to_string()),
            serving_size: 15.0,
            serving_unit: "g".to_string(),
            calories: 81.0,
            protein: 0.9,
            carbs: 8.6,
            fat: 4.6,
            fiber: None,
            sugar: Some(8.4),
            sodium: None,
            image_url: None,
            source: FoodSource::OpenFoodFacts,
        }
    }

    async fn service_with_user() -> FitnessService {
        let svc = FitnessService::open_in_memory().await.unwrap();
        svc.ensure_user("u1", "Ada", "ada@example.com").await.unwrap();
        svc
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 17, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let svc = service_with_user().await;
        let again = svc.ensure_user("u1", "Other", "other@example.com").await.unwrap();
        assert_eq!(again.name, "Ada");
    }

    #[tokio::test]
    async fn test_barcode_local_hit_skips_provider() {
        let svc = service_with_user().await;
        svc.store()
            .create_food(remote_food("3017620422003", "Nutella", "Ferrero"))
            .await
            .unwrap();
        let provider = CountingProvider::default();

        let food = svc
            .barcode_lookup(&provider, "3017620422003")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(food.name, "Nutella");
        assert_eq!(provider.barcode_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_barcode_invalid_never_calls_provider() {
        let svc = service_with_user().await;
        let provider = CountingProvider::default();
        assert!(svc.barcode_lookup(&provider, "12345").await.unwrap().is_none());
        assert!(svc.barcode_lookup(&provider, "abc").await.unwrap().is_none());
        assert_eq!(provider.barcode_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_barcode_miss_fetches_and_caches() {
        let svc = service_with_user().await;
        let provider =
            CountingProvider::with(vec![remote_food("3017620422003", "Nutella", "Ferrero")]);

        let food = svc
            .barcode_lookup(&provider, "30-1762-0422003")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(food.id, "off_3017620422003");
        assert_eq!(provider.barcode_calls.load(Ordering::SeqCst), 1);

        let again = svc
            .barcode_lookup(&provider, "3017620422003")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, food.id);
        assert_eq!(provider.barcode_calls.load(Ordering::SeqCst), 1);
    }

    /// Answers only once both callers are waiting, so neither sees the other's insert.
    struct GatedProvider {
        food: NewFood,
        gate: tokio::sync::Barrier,
    }

    #[async_trait]
    impl FoodLookupProvider for GatedProvider {
        async fn lookup_barcode(&self, _barcode: &str) -> Option<NewFood> {
            self.gate.wait().await;
            Some(self.food.clone())
        }

        async fn search(&self, _query: &str, _page: u32, _page_size: u32) -> Vec<NewFood> {
            Vec::new()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_barcode_misses_share_one_row() {
        let svc = std::sync::Arc::new(service_with_user().await);
        let provider = std::sync::Arc::new(GatedProvider {
            food: remote_food("3017620422003", "Nutella", "Ferrero"),
            gate: tokio::sync::Barrier::new(2),
        });

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let svc = std::sync::Arc::clone(&svc);
                let provider = std::sync::Arc::clone(&provider);
                tokio::spawn(async move {
                    svc.barcode_lookup(provider.as_ref(), "3017620422003").await
                })
            })
            .collect();

        for task in tasks {
            let food = task.await.unwrap().unwrap().unwrap();
            assert_eq!(food.id, "off_3017620422003");
        }
        let stored = svc.store().search_foods("nutella", 10).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_barcode_unknown_remotely() {
        let svc = service_with_user().await;
        let provider = CountingProvider::default();
        assert!(svc
            .barcode_lookup(&provider, "0000000000000")
            .await
            .unwrap()
            .is_none());
        assert_eq!(provider.barcode_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_short_query_is_empty() {
        let svc = service_with_user().await;
        let provider =
            CountingProvider::with(vec![remote_food("3017620422003", "Nutella", "Ferrero")]);
        assert!(svc.search_and_cache(&provider, "n", 20).await.unwrap().is_empty());
        assert!(svc.search_and_cache(&provider, "  ", 20).await.unwrap().is_empty());
        assert_eq!(provider.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_caches_and_dedupes() {
        let svc = service_with_user().await;
        let mut local = remote_food("11111111", "Nutella", "Ferrero");
        local.id = "local-nutella".to_string();
        local.source = FoodSource::Custom;
        svc.store().create_food(local).await.unwrap();

        let provider = CountingProvider::with(vec![
            remote_food("3017620422003", "Nutella", "Ferrero"),
            remote_food("8000500310427", "Nutella Biscuits", "Ferrero"),
        ]);
        let results = svc.search_and_cache(&provider, "nutella", 20).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|f| f.id.as_str()).collect();
        // local copy wins over the remote duplicate
        assert_eq!(ids, vec!["local-nutella", "off_8000500310427"]);

        // both remote results were cached, even the duplicate
        assert!(svc.store().get_food_by_id("off_3017620422003").await.unwrap().is_some());

        let offline = CountingProvider::default();
        let results = svc.search_and_cache(&offline, "nutella", 20).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_foods_skips_invalid() {
        let svc = service_with_user().await;
        let mut broken = remote_food("22222222", "Broken", "Acme");
        broken.serving_size = 0.0;
        let cached = svc
            .cache_foods(vec![broken, remote_food("3017620422003", "Nutella", "Ferrero")])
            .await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "off_3017620422003");
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let svc = service_with_user().await;
        let provider = CountingProvider::with(
            (0..5)
                .map(|i| remote_food(&format!("1000000{i}"), &format!("Oat bar {i}"), "Acme"))
                .collect(),
        );
        let results = svc.search_and_cache(&provider, "oat", 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_daily_nutrition_with_targets() {
        let svc = service_with_user().await;
        svc.store()
            .create_food(remote_food("3017620422003", "Nutella", "Ferrero"))
            .await
            .unwrap();
        svc.store()
            .upsert_user_profile(NewUserProfile {
                user_id: "u1".to_string(),
                age: None,
                height_cm: None,
                weight_kg: None,
                body_fat_pct: None,
                activity_level: ActivityLevel::LightlyActive,
                fitness_goal: FitnessGoal::MaintainWeight,
                target_calories: Some(2200),
                target_protein: Some(150.0),
                target_carbs: None,
                target_fat: None,
            })
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (day_start, _) = crate::db::local_day_bounds(date);
        svc.log_food("u1", "off_3017620422003", 2.0, MealSlot::Breakfast, day_start + Duration::hours(8))
            .await
            .unwrap();
        svc.log_food("u1", "off_3017620422003", 1.0, MealSlot::Snack, day_start + Duration::hours(15))
            .await
            .unwrap();

        let day = svc.daily_nutrition("u1", date).await.unwrap();
        assert_eq!(day.meals.len(), 2);
        assert!((day.totals.calories - 243.0).abs() < 1e-9);
        let targets = day.targets.unwrap();
        assert_eq!(targets.calories, Some(2200));
    }

    #[tokio::test]
    async fn test_latest_measurement() {
        let svc = service_with_user().await;
        assert!(svc
            .latest_measurement("u1", MeasurementType::Weight)
            .await
            .unwrap()
            .is_none());
        svc.log_measurement("u1", MeasurementType::Weight, 82.0, "kg", start())
            .await
            .unwrap();
        svc.log_measurement("u1", MeasurementType::Weight, 81.2, "kg", start() + Duration::days(3))
            .await
            .unwrap();
        let latest = svc
            .latest_measurement("u1", MeasurementType::Weight)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, 81.2);
    }

    async fn squat_session(svc: &FitnessService, weight: f64, offset_days: i64) -> CompletedWorkout {
        let start = start() + Duration::days(offset_days);
        let workout = svc.start_workout("u1", "Legs", None, start).await.unwrap();
        let exercise = svc
            .store()
            .add_workout_exercise(
                &workout.id,
                NewWorkoutExercise {
                    id: new_id(),
                    exercise_id: "squat".to_string(),
                    notes: None,
                    sets: Vec::new(),
                },
            )
            .await
            .unwrap();
        for _ in 0..3 {
            svc.store()
                .add_workout_set(
                    &exercise.id,
                    NewWorkoutSet {
                        id: new_id(),
                        reps: 5,
                        weight_kg: Some(weight),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        svc.complete_workout(&workout.id, start + Duration::hours(1))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_workout_records_volume_prs() {
        let svc = service_with_user().await;

        let first = squat_session(&svc, 100.0, 0).await;
        assert_eq!(first.workout.total_volume, Some(1500.0));
        assert_eq!(first.new_records.len(), 1);
        assert_eq!(first.new_records[0].kind, RecordType::Volume);
        assert_eq!(first.new_records[0].value, 1500.0);

        let lighter = squat_session(&svc, 90.0, 2).await;
        assert!(lighter.new_records.is_empty());

        let heavier = squat_session(&svc, 105.0, 4).await;
        assert_eq!(heavier.new_records.len(), 1);
        assert_eq!(heavier.new_records[0].value, 1575.0);

        let records = svc.store().get_personal_records("u1", Some("squat")).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_start_workout_from_template() {
        let svc = service_with_user().await;
        svc.store()
            .create_template(NewWorkoutTemplate {
                id: "t1".to_string(),
                user_id: "u1".to_string(),
                name: "Pull".to_string(),
                description: None,
                is_public: false,
                exercises: vec![
                    NewTemplateExercise {
                        exercise_id: "deadlift".to_string(),
                        target_sets: 3,
                        target_reps: Some(5),
                        target_weight_kg: None,
                        rest_secs: None,
                    },
                    NewTemplateExercise {
                        exercise_id: "pull-up".to_string(),
                        target_sets: 3,
                        target_reps: None,
                        target_weight_kg: None,
                        rest_secs: None,
                    },
                ],
            })
            .await
            .unwrap();

        let workout = svc
            .start_workout("u1", "Pull day", Some("t1"), start())
            .await
            .unwrap();
        assert_eq!(workout.template_id.as_deref(), Some("t1"));
        let exercises: Vec<&str> = workout
            .exercises
            .iter()
            .map(|e| e.exercise_id.as_str())
            .collect();
        assert_eq!(exercises, vec!["deadlift", "pull-up"]);

        let err = svc
            .start_workout("u1", "Ghost", Some("missing"), start())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
