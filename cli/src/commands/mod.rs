mod chat;
mod food;
mod health;
mod helpers;
mod log;
mod measure;
mod recipe;
mod summary;
mod user;
mod workout;

use anyhow::Result;

use liftlog_core::models::Food;
use liftlog_core::service::FitnessService;

use helpers::nothing_found;

pub(crate) use chat::{MessageFlags, cmd_chat_list, cmd_chat_new, cmd_chat_say, cmd_chat_show};
pub(crate) use food::{
    FoodArgs, cmd_food_add, cmd_food_barcode, cmd_food_categories, cmd_food_category,
    cmd_food_popular, cmd_food_search, cmd_food_show, cmd_food_status, cmd_food_suggest,
    cmd_nutrition,
};
pub(crate) use health::{
    SleepArgs, cmd_health_log, cmd_health_show, cmd_sleep_history, cmd_sleep_log,
};
pub(crate) use log::cmd_log;
pub(crate) use measure::{cmd_measure_history, cmd_measure_log, cmd_photo_add, cmd_photo_list};
pub(crate) use recipe::{
    RecipeArgs, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list, cmd_recipe_show,
};
pub(crate) use summary::cmd_summary;
pub(crate) use user::{
    ProfileArgs, cmd_init, cmd_profile_set, cmd_profile_show, cmd_user_add, cmd_user_show,
};
pub(crate) use workout::{
    cmd_exercises, cmd_records, cmd_template_create, cmd_template_delete, cmd_template_list,
    cmd_workout_add_exercise, cmd_workout_add_set, cmd_workout_delete, cmd_workout_finish,
    cmd_workout_list, cmd_workout_remove_exercise, cmd_workout_show, cmd_workout_start,
};

/// Looks up a stored food, exiting with status 2 when the id is unknown.
pub(super) async fn require_food(svc: &FitnessService, id: &str, json: bool) -> Result<Food> {
    match svc.store().get_food_by_id(id).await? {
        Some(food) => Ok(food),
        None => nothing_found(
            json,
            &format!("No food with id '{id}'. Use `liftlog food search` to find one"),
        ),
    }
}
