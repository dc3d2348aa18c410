use std::ops::AddAssign;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} '{value}'. Must be one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

/// Closed string sets stored as TEXT columns and exchanged as lowercase JSON strings.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lower = s.trim().to_lowercase();
                match lower.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }
    };
}

text_enum!(ExerciseCategory, "exercise category" {
    Chest => "chest",
    Back => "back",
    Shoulders => "shoulders",
    Arms => "arms",
    Legs => "legs",
    Core => "core",
    Cardio => "cardio",
    Other => "other",
});

text_enum!(
    /// Diary bucket for a food entry. `ALL` is also the display order.
    MealSlot, "meal type" {
        Breakfast => "breakfast",
        Lunch => "lunch",
        Dinner => "dinner",
        Snack => "snack",
    }
);

text_enum!(FoodSource, "food source" {
    OpenFoodFacts => "openfoodfacts",
    Usda => "usda",
    Custom => "custom",
});

text_enum!(MeasurementType, "measurement type" {
    Weight => "weight",
    BodyFat => "body_fat",
    MuscleMass => "muscle_mass",
    Waist => "waist",
    Chest => "chest",
    Arms => "arms",
    Thighs => "thighs",
    Neck => "neck",
});

text_enum!(RecordType, "record type" {
    OneRepMax => "1rm",
    Volume => "volume",
    Reps => "reps",
    Time => "time",
    Distance => "distance",
});

text_enum!(PhotoPose, "photo pose" {
    Front => "front",
    Side => "side",
    Back => "back",
});

text_enum!(HealthMetric, "health metric" {
    Steps => "steps",
    HeartRate => "heart_rate",
    Sleep => "sleep",
    CaloriesBurned => "calories_burned",
    ActiveMinutes => "active_minutes",
});

text_enum!(HealthSource, "health source" {
    AppleHealth => "apple_health",
    HealthConnect => "health_connect",
    Whoop => "whoop",
    Manual => "manual",
});

text_enum!(MessageRole, "message role" {
    User => "user",
    Assistant => "assistant",
});

text_enum!(ActivityLevel, "activity level" {
    Sedentary => "sedentary",
    LightlyActive => "lightly_active",
    ModeratelyActive => "moderately_active",
    VeryActive => "very_active",
    ExtremelyActive => "extremely_active",
});

text_enum!(FitnessGoal, "fitness goal" {
    LoseWeight => "lose_weight",
    MaintainWeight => "maintain_weight",
    GainWeight => "gain_weight",
    BuildMuscle => "build_muscle",
    ImproveEndurance => "improve_endurance",
});

/// Fresh opaque identifier for a new row.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// --- Users ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub age: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub activity_level: ActivityLevel,
    pub fitness_goal: FitnessGoal,
    pub target_calories: Option<i64>,
    pub target_protein: Option<f64>,
    pub target_carbs: Option<f64>,
    pub target_fat: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserProfile {
    pub user_id: String,
    pub age: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub activity_level: ActivityLevel,
    pub fitness_goal: FitnessGoal,
    pub target_calories: Option<i64>,
    pub target_protein: Option<f64>,
    pub target_carbs: Option<f64>,
    pub target_fat: Option<f64>,
}

impl UserProfile {
    #[must_use]
    pub fn targets(&self) -> Option<MacroTargets> {
        let targets = MacroTargets {
            calories: self.target_calories,
            protein: self.target_protein,
            carbs: self.target_carbs,
            fat: self.target_fat,
        };
        if targets.is_empty() { None } else { Some(targets) }
    }
}

// --- Exercise catalog ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
    pub equipment: Vec<String>,
    pub instructions: Vec<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Workouts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: String,
    pub workout_exercise_id: String,
    pub reps: i64,
    pub weight_kg: Option<f64>,
    pub duration_secs: Option<i64>,
    pub distance_m: Option<f64>,
    pub rpe: Option<i64>,
    pub rest_secs: Option<i64>,
    pub notes: Option<String>,
    pub is_warmup: bool,
    pub is_drop_set: bool,
    pub is_failure: bool,
    pub created_at: DateTime<Utc>,
}

impl WorkoutSet {
    /// Weight moved in this set. Warm-ups and unweighted sets count as zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn volume(&self) -> f64 {
        if self.is_warmup {
            return 0.0;
        }
        self.weight_kg.map_or(0.0, |w| w * self.reps as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: String,
    pub workout_id: String,
    pub exercise_id: String,
    pub exercise: Exercise,
    pub order_index: i64,
    pub sets: Vec<WorkoutSet>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkoutExercise {
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.sets.iter().map(WorkoutSet::volume).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub template_id: Option<String>,
    pub exercises: Vec<WorkoutExercise>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub total_volume: Option<f64>,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.exercises.iter().map(WorkoutExercise::volume).sum()
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkout {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub template_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub exercises: Vec<NewWorkoutExercise>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutExercise {
    pub id: String,
    pub exercise_id: String,
    pub notes: Option<String>,
    pub sets: Vec<NewWorkoutSet>,
}

#[derive(Debug, Clone, Default)]
pub struct NewWorkoutSet {
    pub id: String,
    pub reps: i64,
    pub weight_kg: Option<f64>,
    pub duration_secs: Option<i64>,
    pub distance_m: Option<f64>,
    pub rpe: Option<i64>,
    pub rest_secs: Option<i64>,
    pub notes: Option<String>,
    pub is_warmup: bool,
    pub is_drop_set: bool,
    pub is_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateExercise {
    pub exercise_id: String,
    pub order_index: i64,
    pub target_sets: i64,
    pub target_reps: Option<i64>,
    pub target_weight_kg: Option<f64>,
    pub rest_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub exercises: Vec<TemplateExercise>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTemplateExercise {
    pub exercise_id: String,
    pub target_sets: i64,
    pub target_reps: Option<i64>,
    pub target_weight_kg: Option<f64>,
    pub rest_secs: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutTemplate {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub exercises: Vec<NewTemplateExercise>,
}

// --- Nutrition ---

/// Catalog food. Macro values are per serving (`serving_size` `serving_unit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub image_url: Option<String>,
    pub source: FoodSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFood {
    pub id: String,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub image_url: Option<String>,
    pub source: FoodSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: String,
    pub user_id: String,
    pub food_id: String,
    pub food: Food,
    /// Multiplier of the food's serving.
    pub quantity: f64,
    pub meal: MealSlot,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Food {
    /// Nutrients in `servings` servings of this food.
    #[must_use]
    pub fn macros_for(&self, servings: f64) -> MacroTotals {
        MacroTotals {
            calories: self.calories * servings,
            protein: self.protein * servings,
            carbs: self.carbs * servings,
            fat: self.fat * servings,
            fiber: self.fiber.unwrap_or(0.0) * servings,
            sugar: self.sugar.unwrap_or(0.0) * servings,
            sodium: self.sodium.unwrap_or(0.0) * servings,
        }
    }
}

impl FoodEntry {
    #[must_use]
    pub fn macros(&self) -> MacroTotals {
        self.food.macros_for(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewFoodEntry {
    pub id: String,
    pub user_id: String,
    pub food_id: String,
    pub quantity: f64,
    pub meal: MealSlot,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl AddAssign for MacroTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
        self.fiber += rhs.fiber;
        self.sugar += rhs.sugar;
        self.sodium += rhs.sodium;
    }
}

impl<'a> std::iter::Sum<&'a FoodEntry> for MacroTotals {
    fn sum<I: Iterator<Item = &'a FoodEntry>>(iter: I) -> Self {
        let mut total = MacroTotals::default();
        for entry in iter {
            total += entry.macros();
        }
        total
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl MacroTargets {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calories.is_none() && self.protein.is_none() && self.carbs.is_none() && self.fat.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealGroup {
    pub meal: MealSlot,
    pub entries: Vec<FoodEntry>,
    pub subtotal: MacroTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyNutrition {
    pub date: NaiveDate,
    pub meals: Vec<MealGroup>,
    pub totals: MacroTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<MacroTargets>,
}

impl DailyNutrition {
    /// Group one day's entries by meal slot and total them.
    #[must_use]
    pub fn from_entries(
        date: NaiveDate,
        entries: Vec<FoodEntry>,
        targets: Option<MacroTargets>,
    ) -> Self {
        let totals: MacroTotals = entries.iter().sum();
        let mut meals = Vec::new();

        for slot in MealSlot::ALL {
            let slot_entries: Vec<FoodEntry> =
                entries.iter().filter(|e| e.meal == *slot).cloned().collect();
            if slot_entries.is_empty() {
                continue;
            }
            let subtotal = slot_entries.iter().sum();
            meals.push(MealGroup {
                meal: *slot,
                entries: slot_entries,
                subtotal,
            });
        }

        Self {
            date,
            meals,
            totals,
            targets,
        }
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.meals.iter().map(|m| m.entries.len()).sum()
    }
}

// --- Recipes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub food_id: String,
    pub food: Food,
    /// Multiplier of the food's serving, like [`FoodEntry::quantity`].
    pub quantity: f64,
    pub order_index: i64,
}

impl RecipeIngredient {
    #[must_use]
    pub fn macros(&self) -> MacroTotals {
        self.food.macros_for(self.quantity)
    }
}

/// A recipe and its ingredients. `totals` is the whole dish, recomputed
/// from the current foods whenever the recipe is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub servings: i64,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub totals: MacroTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn per_serving(&self) -> MacroTotals {
        let servings = self.servings.max(1) as f64;
        let t = &self.totals;
        MacroTotals {
            calories: t.calories / servings,
            protein: t.protein / servings,
            carbs: t.carbs / servings,
            fat: t.fat / servings,
            fiber: t.fiber / servings,
            sugar: t.sugar / servings,
            sodium: t.sodium / servings,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipeIngredient {
    pub food_id: String,
    pub quantity: f64,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub servings: i64,
    pub ingredients: Vec<NewRecipeIngredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
}

// --- Progress ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: MeasurementType,
    pub value: f64,
    pub unit: String,
    pub measured_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBodyMeasurement {
    pub id: String,
    pub user_id: String,
    pub kind: MeasurementType,
    pub value: f64,
    pub unit: String,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub value: f64,
    pub unit: String,
    pub workout_id: Option<String>,
    pub achieved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPersonalRecord {
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    pub kind: RecordType,
    pub value: f64,
    pub unit: String,
    pub workout_id: Option<String>,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPhoto {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub pose: PhotoPose,
    pub notes: Option<String>,
    pub taken_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProgressPhoto {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub pose: PhotoPose,
    pub notes: Option<String>,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthData {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: HealthMetric,
    pub value: f64,
    pub unit: String,
    pub source: HealthSource,
    pub recorded_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHealthData {
    pub id: String,
    pub user_id: String,
    pub kind: HealthMetric,
    pub value: f64,
    pub unit: String,
    pub source: HealthSource,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepData {
    pub id: String,
    pub user_id: String,
    pub bed_time: DateTime<Utc>,
    pub wake_time: DateTime<Utc>,
    pub duration_min: i64,
    pub deep_sleep_min: Option<i64>,
    pub rem_sleep_min: Option<i64>,
    pub light_sleep_min: Option<i64>,
    pub quality: Option<i64>,
    pub source: HealthSource,
    pub recorded_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSleepData {
    pub id: String,
    pub user_id: String,
    pub bed_time: DateTime<Utc>,
    pub wake_time: DateTime<Utc>,
    pub deep_sleep_min: Option<i64>,
    pub rem_sleep_min: Option<i64>,
    pub light_sleep_min: Option<i64>,
    pub quality: Option<i64>,
    pub source: HealthSource,
    pub recorded_at: DateTime<Utc>,
}

impl NewSleepData {
    #[must_use]
    pub fn duration_min(&self) -> i64 {
        (self.wake_time - self.bed_time).num_minutes()
    }
}

// --- Assistant log ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_generated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_advice: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_form: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<AiMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAiConversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct NewAiMessage {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub role: MessageRole,
    pub metadata: Option<MessageMetadata>,
}

// --- Validation ---

fn invalid(msg: impl Into<String>) -> StorageError {
    StorageError::InvalidData(msg.into())
}

fn require_id(id: &str, what: &str) -> StorageResult<()> {
    if id.trim().is_empty() {
        return Err(invalid(format!("{what} id must not be empty")));
    }
    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> StorageResult<()> {
    require_id(&user.id, "user")?;
    if user.name.trim().is_empty() {
        return Err(invalid("User name must not be empty"));
    }
    let email = user.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(invalid(format!("Invalid email '{}'", user.email)));
    }
    Ok(())
}

/// Name must not be empty, serving must be positive, and nutrients must not be negative.
pub fn validate_new_food(food: &NewFood) -> StorageResult<()> {
    require_id(&food.id, "food")?;
    if food.name.trim().is_empty() {
        return Err(invalid("Food name must not be empty"));
    }
    if !(food.serving_size.is_finite() && food.serving_size > 0.0) {
        return Err(invalid("serving_size must be greater than 0"));
    }
    let required = [
        ("calories", food.calories),
        ("protein", food.protein),
        ("carbs", food.carbs),
        ("fat", food.fat),
    ];
    for (name, value) in required {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!("{name} must not be negative")));
        }
    }
    let optional = [
        ("fiber", food.fiber),
        ("sugar", food.sugar),
        ("sodium", food.sodium),
    ];
    for (name, value) in optional {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(invalid(format!("{name} must not be negative")));
        }
    }
    Ok(())
}

/// At least one serving and one ingredient, every quantity positive.
pub fn validate_new_recipe(recipe: &NewRecipe) -> StorageResult<()> {
    require_id(&recipe.id, "recipe")?;
    if recipe.name.trim().is_empty() {
        return Err(invalid("Recipe name must not be empty"));
    }
    if recipe.servings < 1 {
        return Err(invalid("servings must be at least 1"));
    }
    if recipe.ingredients.is_empty() {
        return Err(invalid("A recipe needs at least one ingredient"));
    }
    for ingredient in &recipe.ingredients {
        validate_quantity(ingredient.quantity)?;
    }
    Ok(())
}

pub fn validate_quantity(quantity: f64) -> StorageResult<()> {
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(invalid(format!(
            "quantity must be a positive number (got {quantity})"
        )));
    }
    Ok(())
}

pub fn validate_new_set(set: &NewWorkoutSet) -> StorageResult<()> {
    require_id(&set.id, "set")?;
    if set.reps < 0 {
        return Err(invalid("reps must not be negative"));
    }
    if let Some(rpe) = set.rpe {
        if !(1..=10).contains(&rpe) {
            return Err(invalid(format!("RPE must be between 1 and 10 (got {rpe})")));
        }
    }
    if set.weight_kg.is_some_and(|w| !w.is_finite() || w < 0.0) {
        return Err(invalid("weight must not be negative"));
    }
    Ok(())
}

pub fn validate_new_sleep(sleep: &NewSleepData) -> StorageResult<()> {
    require_id(&sleep.id, "sleep")?;
    if sleep.wake_time <= sleep.bed_time {
        return Err(invalid("wake_time must be after bed_time"));
    }
    if let Some(q) = sleep.quality {
        if !(1..=10).contains(&q) {
            return Err(invalid(format!(
                "sleep quality must be between 1 and 10 (got {q})"
            )));
        }
    }
    Ok(())
}

pub fn validate_measurement_value(value: f64) -> StorageResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid("measurement value must be greater than 0"));
    }
    Ok(())
}
