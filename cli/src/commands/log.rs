use anyhow::Result;

use liftlog_core::models::{FoodEntry, MealSlot};
use liftlog_core::service::FitnessService;

use super::helpers::{local_time, parse_datetime, print_json};
use super::require_food;

pub(crate) fn format_quantity(entry: &FoodEntry) -> String {
    let q = entry.quantity;
    let servings = if q.fract() == 0.0 {
        format!("{q:.0}")
    } else {
        format!("{q}")
    };
    let unit = if (q - 1.0).abs() < f64::EPSILON { "serving" } else { "servings" };
    format!("{servings} {unit}")
}

pub(crate) async fn cmd_log(
    svc: &FitnessService,
    user_id: &str,
    food_id: &str,
    quantity: f64,
    meal: MealSlot,
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let logged_at = parse_datetime(at)?;
    // exits 2 for an unknown id instead of surfacing a foreign-key error
    require_food(svc, food_id, json).await?;

    let entry = svc
        .log_food(user_id, food_id, quantity, meal, logged_at)
        .await?;

    if json {
        print_json(&entry)?;
    } else {
        let m = entry.macros();
        println!(
            "Logged {} of {} for {} at {}: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g",
            format_quantity(&entry),
            entry.food.name,
            entry.meal,
            local_time(&entry.logged_at),
            m.calories,
            m.protein,
            m.carbs,
            m.fat
        );
        println!("  entry id: {}", entry.id);
    }
    Ok(())
}
