mod commands;
mod config;
mod openfoodfacts;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    FoodArgs, MessageFlags, ProfileArgs, RecipeArgs, SleepArgs, cmd_chat_list, cmd_chat_new,
    cmd_chat_say, cmd_chat_show, cmd_exercises, cmd_food_add, cmd_food_barcode,
    cmd_food_categories, cmd_food_category, cmd_food_popular, cmd_food_search, cmd_food_show,
    cmd_food_status, cmd_food_suggest, cmd_health_log, cmd_health_show, cmd_init, cmd_log,
    cmd_measure_history, cmd_measure_log, cmd_nutrition, cmd_photo_add, cmd_photo_list,
    cmd_profile_set, cmd_profile_show, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_show, cmd_records, cmd_sleep_history, cmd_sleep_log, cmd_summary,
    cmd_template_create, cmd_template_delete, cmd_template_list, cmd_user_add, cmd_user_show,
    cmd_workout_add_exercise, cmd_workout_add_set, cmd_workout_delete, cmd_workout_finish,
    cmd_workout_list, cmd_workout_remove_exercise, cmd_workout_show, cmd_workout_start,
};
use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use liftlog_core::models::{
    ActivityLevel, ExerciseCategory, FitnessGoal, HealthMetric, HealthSource, MealSlot,
    MeasurementType, MessageRole, NewWorkoutSet, PhotoPose,
};
use liftlog_core::service::FitnessService;

#[derive(Parser)]
#[command(
    name = "liftlog",
    version,
    about = "A local-first workout and nutrition tracker",
    long_about = "Track workouts, meals, body measurements and sleep in a local SQLite database.\n\
                  Food lookups use OpenFoodFacts and are cached locally."
)]
struct Cli {
    /// User id to act as (default: $LIFTLOG_USER or "local")
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database, seed the exercise catalog and the default user
    Init {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Body stats, goal and daily macro targets
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// List the exercise catalog
    Exercises {
        /// Only this category: chest, back, shoulders, arms, legs, core, cardio, other
        #[arg(short, long)]
        category: Option<ExerciseCategory>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find, add and inspect foods
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Recipes built from stored foods
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Log servings of a stored food
    Log {
        /// Food id (see `liftlog food search`)
        food_id: String,
        /// Number of servings
        #[arg(default_value = "1")]
        quantity: f64,
        /// Meal: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: MealSlot,
        /// When it was eaten (now, RFC 3339 or "YYYY-MM-DD HH:MM" local)
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the nutrition diary for a day (defaults to today)
    Summary {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Nutrition of a weighed amount of a stored food
    Nutrition {
        /// Food id
        food_id: String,
        /// Amount
        amount: f64,
        /// Unit: g, kg, oz, lb
        #[arg(default_value = "g")]
        unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Body measurements
    Measure {
        #[command(subcommand)]
        command: MeasureCommands,
    },
    /// Progress photos
    Photo {
        #[command(subcommand)]
        command: PhotoCommands,
    },
    /// Record and review workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Reusable workout plans
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Sleep sessions
    Sleep {
        #[command(subcommand)]
        command: SleepCommands,
    },
    /// Health metric samples (steps, heart rate, ...)
    Health {
        #[command(subcommand)]
        command: HealthCommands,
    },
    /// Show personal records
    Records {
        /// Only records for this exercise id
        #[arg(short, long)]
        exercise: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store assistant conversations
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        /// User id
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current user
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Set profile fields; anything not given keeps its stored value
    Set {
        #[arg(long)]
        age: Option<i64>,
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
        /// Body fat percentage
        #[arg(long)]
        body_fat: Option<f64>,
        /// sedentary, lightly_active, moderately_active, very_active, extremely_active
        #[arg(long)]
        activity: Option<ActivityLevel>,
        /// lose_weight, maintain_weight, gain_weight, build_muscle, improve_endurance
        #[arg(long)]
        goal: Option<FitnessGoal>,
        /// Daily calorie target
        #[arg(long)]
        calories: Option<i64>,
        /// Daily protein target (g)
        #[arg(long)]
        protein: Option<f64>,
        /// Daily carbs target (g)
        #[arg(long)]
        carbs: Option<f64>,
        /// Daily fat target (g)
        #[arg(long)]
        fat: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Search local foods and `OpenFoodFacts`
    Search {
        /// Search query (at least 2 characters)
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a product by barcode
    Barcode {
        /// EAN-8, UPC-A, EAN-13 or GTIN-14 barcode
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a custom food (values per serving)
    Add {
        /// Food name
        name: String,
        /// Calories per serving
        #[arg(long)]
        calories: f64,
        /// Protein per serving (g)
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs per serving (g)
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat per serving (g)
        #[arg(long, default_value = "0")]
        fat: f64,
        #[arg(long)]
        fiber: Option<f64>,
        #[arg(long)]
        sugar: Option<f64>,
        #[arg(long)]
        sodium: Option<f64>,
        /// Serving size
        #[arg(long, default_value = "100")]
        serving: f64,
        /// Serving unit
        #[arg(long, default_value = "g")]
        unit: String,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        barcode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a stored food
    Show {
        /// Food id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Most popular `OpenFoodFacts` products
    Popular {
        /// Number of products to fetch
        #[arg(short, long, default_value = "50")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Products in an `OpenFoodFacts` category
    Category {
        /// Category name, e.g. "breakfast-cereals"
        name: String,
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Products per page
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List well-stocked `OpenFoodFacts` categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Product name suggestions for a partial query
    Suggest {
        query: String,
        #[arg(short, long, default_value = "10")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that `OpenFoodFacts` is reachable
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a recipe
    Create {
        name: String,
        /// Ingredient as <food id>[:<servings>], repeatable
        #[arg(short, long = "ingredient", required = true)]
        ingredients: Vec<String>,
        /// Number of portions the recipe makes
        #[arg(short, long, default_value = "1")]
        servings: i64,
        /// Instruction step, repeatable
        #[arg(long = "step")]
        steps: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its totals
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MeasureCommands {
    /// Record a measurement
    Log {
        /// weight, body_fat, muscle_mass, waist, chest, arms, thighs, neck
        kind: MeasurementType,
        value: f64,
        /// Unit (default depends on the measurement)
        #[arg(short, long)]
        unit: Option<String>,
        /// When it was measured
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent measurements, newest first
    History {
        kind: MeasurementType,
        #[arg(short, long, default_value = "30")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PhotoCommands {
    /// Save a progress photo reference
    Add {
        /// Image location
        url: String,
        /// front, side, back
        #[arg(short, long, default_value = "front")]
        pose: PhotoPose,
        #[arg(long)]
        notes: Option<String>,
        /// When it was taken
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List progress photos, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Start a workout
    Start {
        /// Workout name
        name: String,
        /// Copy exercises from this template
        #[arg(short, long)]
        template: Option<String>,
        /// Start time
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Append an exercise to an open workout
    AddExercise {
        workout_id: String,
        /// Exercise id (see `liftlog exercises`)
        exercise_id: String,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an exercise from an open workout
    RemoveExercise {
        workout_id: String,
        workout_exercise_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a set for a workout exercise
    AddSet {
        workout_exercise_id: String,
        reps: i64,
        /// Weight in kg
        #[arg(short, long)]
        weight: Option<f64>,
        /// Rate of perceived exertion (1-10)
        #[arg(long)]
        rpe: Option<i64>,
        /// Duration in seconds
        #[arg(long)]
        duration: Option<i64>,
        /// Distance in meters
        #[arg(long)]
        distance: Option<f64>,
        /// Rest after the set in seconds
        #[arg(long)]
        rest: Option<i64>,
        #[arg(long)]
        warmup: bool,
        #[arg(long)]
        drop_set: bool,
        #[arg(long)]
        failure: bool,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Complete a workout and record new personal bests
    Finish {
        workout_id: String,
        /// End time
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a workout with its sets
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent workouts
    List {
        #[arg(short, long, default_value = "20")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout and everything logged in it
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create a template
    Create {
        name: String,
        /// Planned exercise as <id>:<sets>[x<reps>][@<kg>], repeatable
        #[arg(short, long = "exercise")]
        exercises: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List templates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a template
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SleepCommands {
    /// Record a night of sleep
    Log {
        /// Bed time
        #[arg(long)]
        bed: String,
        /// Wake time
        #[arg(long)]
        wake: String,
        /// Quality from 1 to 10
        #[arg(short, long)]
        quality: Option<i64>,
        /// Deep sleep minutes
        #[arg(long)]
        deep: Option<i64>,
        /// REM sleep minutes
        #[arg(long)]
        rem: Option<i64>,
        /// Light sleep minutes
        #[arg(long)]
        light: Option<i64>,
        /// apple_health, health_connect, whoop, manual
        #[arg(long, default_value = "manual")]
        source: HealthSource,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recent nights, newest first
    History {
        #[arg(short, long, default_value = "14")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HealthCommands {
    /// Record a sample
    Log {
        /// steps, heart_rate, sleep, calories_burned, active_minutes
        metric: HealthMetric,
        value: f64,
        #[arg(short, long)]
        unit: Option<String>,
        #[arg(long, default_value = "manual")]
        source: HealthSource,
        /// When it was recorded
        #[arg(long)]
        at: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Samples from the last N days, oldest first
    Show {
        metric: HealthMetric,
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ChatCommands {
    /// Start a conversation
    New {
        title: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Append a message
    Say {
        conversation_id: String,
        content: String,
        /// user or assistant
        #[arg(short, long, default_value = "user")]
        role: MessageRole,
        /// Message contains a generated workout
        #[arg(long)]
        workout: bool,
        /// Message contains nutrition advice
        #[arg(long)]
        nutrition: bool,
        /// Message contains exercise form guidance
        #[arg(long)]
        form: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a conversation
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List conversations, most recently active first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LIFTLOG_LOG")
        .unwrap_or_else(|_| EnvFilter::new("liftlog=info,liftlog_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let user = cli.user.unwrap_or(config.user_id);
    let user = user.as_str();
    tracing::debug!(db = %config.db_path.display(), user, "opening store");

    let svc = FitnessService::open(config.db_path).await?;
    let off = OpenFoodFactsClient::new(&config.off_base_url)?;

    let result = match cli.command {
        Commands::Init { json } => cmd_init(&svc, user, json).await,
        Commands::User { command } => match command {
            UserCommands::Add {
                id,
                name,
                email,
                json,
            } => cmd_user_add(&svc, &id, &name, &email, json).await,
            UserCommands::Show { json } => cmd_user_show(&svc, user, json).await,
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                age,
                height,
                weight,
                body_fat,
                activity,
                goal,
                calories,
                protein,
                carbs,
                fat,
                json,
            } => {
                let args = ProfileArgs {
                    age,
                    height_cm: height,
                    weight_kg: weight,
                    body_fat_pct: body_fat,
                    activity_level: activity,
                    fitness_goal: goal,
                    calories,
                    protein,
                    carbs,
                    fat,
                };
                cmd_profile_set(&svc, user, args, json).await
            }
            ProfileCommands::Show { json } => cmd_profile_show(&svc, user, json).await,
        },
        Commands::Exercises { category, json } => cmd_exercises(&svc, category, json).await,
        Commands::Food { command } => match command {
            FoodCommands::Search { query, limit, json } => {
                cmd_food_search(&svc, &off, &query, limit, json).await
            }
            FoodCommands::Barcode { code, json } => cmd_food_barcode(&svc, &off, &code, json).await,
            FoodCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                fiber,
                sugar,
                sodium,
                serving,
                unit,
                brand,
                barcode,
                json,
            } => {
                let args = FoodArgs {
                    name,
                    brand,
                    barcode,
                    serving_size: serving,
                    serving_unit: unit,
                    calories,
                    protein,
                    carbs,
                    fat,
                    fiber,
                    sugar,
                    sodium,
                };
                cmd_food_add(&svc, args, json).await
            }
            FoodCommands::Show { id, json } => cmd_food_show(&svc, &id, json).await,
            FoodCommands::Popular { limit, json } => cmd_food_popular(&svc, &off, limit, json).await,
            FoodCommands::Category {
                name,
                page,
                limit,
                json,
            } => cmd_food_category(&svc, &off, &name, page, limit, json).await,
            FoodCommands::Categories { json } => cmd_food_categories(&off, json).await,
            FoodCommands::Suggest { query, limit, json } => {
                cmd_food_suggest(&off, &query, limit, json).await
            }
            FoodCommands::Status { json } => cmd_food_status(&off, json).await,
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                name,
                ingredients,
                servings,
                steps,
                description,
                json,
            } => {
                let args = RecipeArgs {
                    name,
                    servings,
                    ingredients,
                    steps,
                    description,
                };
                cmd_recipe_create(&svc, user, args, json).await
            }
            RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, &id, json).await,
            RecipeCommands::List { json } => cmd_recipe_list(&svc, user, json).await,
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&svc, &id, json).await,
        },
        Commands::Log {
            food_id,
            quantity,
            meal,
            at,
            json,
        } => cmd_log(&svc, user, &food_id, quantity, meal, at.as_deref(), json).await,
        Commands::Summary { date, json } => cmd_summary(&svc, user, date, json).await,
        Commands::Nutrition {
            food_id,
            amount,
            unit,
            json,
        } => cmd_nutrition(&svc, &food_id, amount, &unit, json).await,
        Commands::Measure { command } => match command {
            MeasureCommands::Log {
                kind,
                value,
                unit,
                at,
                json,
            } => {
                cmd_measure_log(&svc, user, kind, value, unit.as_deref(), at.as_deref(), json)
                    .await
            }
            MeasureCommands::History { kind, limit, json } => {
                cmd_measure_history(&svc, user, kind, limit, json).await
            }
        },
        Commands::Photo { command } => match command {
            PhotoCommands::Add {
                url,
                pose,
                notes,
                at,
                json,
            } => cmd_photo_add(&svc, user, &url, pose, notes, at.as_deref(), json).await,
            PhotoCommands::List { json } => cmd_photo_list(&svc, user, json).await,
        },
        Commands::Workout { command } => match command {
            WorkoutCommands::Start {
                name,
                template,
                at,
                json,
            } => {
                cmd_workout_start(&svc, user, &name, template.as_deref(), at.as_deref(), json)
                    .await
            }
            WorkoutCommands::AddExercise {
                workout_id,
                exercise_id,
                notes,
                json,
            } => cmd_workout_add_exercise(&svc, &workout_id, &exercise_id, notes, json).await,
            WorkoutCommands::RemoveExercise {
                workout_id,
                workout_exercise_id,
                json,
            } => cmd_workout_remove_exercise(&svc, &workout_id, &workout_exercise_id, json).await,
            WorkoutCommands::AddSet {
                workout_exercise_id,
                reps,
                weight,
                rpe,
                duration,
                distance,
                rest,
                warmup,
                drop_set,
                failure,
                notes,
                json,
            } => {
                let set = NewWorkoutSet {
                    reps,
                    weight_kg: weight,
                    duration_secs: duration,
                    distance_m: distance,
                    rpe,
                    rest_secs: rest,
                    notes,
                    is_warmup: warmup,
                    is_drop_set: drop_set,
                    is_failure: failure,
                    ..Default::default()
                };
                cmd_workout_add_set(&svc, &workout_exercise_id, set, json).await
            }
            WorkoutCommands::Finish {
                workout_id,
                at,
                json,
            } => cmd_workout_finish(&svc, &workout_id, at.as_deref(), json).await,
            WorkoutCommands::Show { id, json } => cmd_workout_show(&svc, &id, json).await,
            WorkoutCommands::List { limit, json } => {
                cmd_workout_list(&svc, user, limit, json).await
            }
            WorkoutCommands::Delete { id, json } => cmd_workout_delete(&svc, &id, json).await,
        },
        Commands::Template { command } => match command {
            TemplateCommands::Create {
                name,
                exercises,
                description,
                json,
            } => cmd_template_create(&svc, user, &name, description, &exercises, json).await,
            TemplateCommands::List { json } => cmd_template_list(&svc, user, json).await,
            TemplateCommands::Delete { id, json } => cmd_template_delete(&svc, &id, json).await,
        },
        Commands::Sleep { command } => match command {
            SleepCommands::Log {
                bed,
                wake,
                quality,
                deep,
                rem,
                light,
                source,
                json,
            } => {
                let args = SleepArgs {
                    bed,
                    wake,
                    quality,
                    deep_min: deep,
                    rem_min: rem,
                    light_min: light,
                    source,
                };
                cmd_sleep_log(&svc, user, args, json).await
            }
            SleepCommands::History { limit, json } => {
                cmd_sleep_history(&svc, user, limit, json).await
            }
        },
        Commands::Health { command } => match command {
            HealthCommands::Log {
                metric,
                value,
                unit,
                source,
                at,
                json,
            } => {
                cmd_health_log(
                    &svc,
                    user,
                    metric,
                    value,
                    unit.as_deref(),
                    source,
                    at.as_deref(),
                    json,
                )
                .await
            }
            HealthCommands::Show { metric, days, json } => {
                cmd_health_show(&svc, user, metric, days, json).await
            }
        },
        Commands::Records { exercise, json } => {
            cmd_records(&svc, user, exercise.as_deref(), json).await
        }
        Commands::Chat { command } => match command {
            ChatCommands::New { title, json } => cmd_chat_new(&svc, user, &title, json).await,
            ChatCommands::Say {
                conversation_id,
                content,
                role,
                workout,
                nutrition,
                form,
                json,
            } => {
                let flags = MessageFlags {
                    workout,
                    nutrition,
                    form,
                };
                cmd_chat_say(&svc, &conversation_id, role, &content, flags, json).await
            }
            ChatCommands::Show { id, json } => cmd_chat_show(&svc, &id, json).await,
            ChatCommands::List { json } => cmd_chat_list(&svc, user, json).await,
        },
    };

    svc.store().close().await?;
    result
}
