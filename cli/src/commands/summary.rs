use anyhow::Result;
use std::process;

use liftlog_core::models::{DailyNutrition, MacroTargets, MacroTotals};
use liftlog_core::service::FitnessService;

use super::helpers::{no_neg_zero, parse_date, print_json};
use super::log::format_quantity;

pub(crate) async fn cmd_summary(
    svc: &FitnessService,
    user_id: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let day = svc.daily_nutrition(user_id, date).await?;

    if json {
        return print_json(&day);
    }

    if day.meals.is_empty() {
        eprintln!("No entries for {}", day.date);
        process::exit(2);
    }

    print_day(&day);
    Ok(())
}

fn macro_line(t: &MacroTotals) -> String {
    format!(
        "{:.0} kcal | P:{:.0}g C:{:.0}g F:{:.0}g",
        no_neg_zero(t.calories),
        no_neg_zero(t.protein),
        no_neg_zero(t.carbs),
        no_neg_zero(t.fat)
    )
}

/// Target and remaining lines; macros without a target are left out.
fn target_lines(targets: &MacroTargets, totals: &MacroTotals) -> (String, String) {
    let mut target = Vec::new();
    let mut remaining = Vec::new();
    if let Some(cal) = targets.calories {
        #[allow(clippy::cast_precision_loss)]
        let left = cal as f64 - totals.calories;
        target.push(format!("{cal} kcal"));
        remaining.push(format!("{:.0} kcal", no_neg_zero(left)));
    }
    for (label, goal, eaten) in [
        ("P", targets.protein, totals.protein),
        ("C", targets.carbs, totals.carbs),
        ("F", targets.fat, totals.fat),
    ] {
        if let Some(goal) = goal {
            target.push(format!("{label}:{goal:.0}g"));
            remaining.push(format!("{label}:{:.0}g", no_neg_zero(goal - eaten)));
        }
    }
    (target.join(" | "), remaining.join(" | "))
}

fn print_day(day: &DailyNutrition) {
    println!("=== {} ===\n", day.date);

    for group in &day.meals {
        println!(
            "  {} ({:.0} kcal)",
            group.meal.as_str().to_uppercase(),
            group.subtotal.calories
        );
        for e in &group.entries {
            let brand = e
                .food
                .brand
                .as_ref()
                .map(|b| format!(" ({b})"))
                .unwrap_or_default();
            println!(
                "    {}{brand}, {}: {}",
                e.food.name,
                format_quantity(e),
                macro_line(&e.macros())
            );
        }
        println!();
    }

    println!("  TOTAL: {}", macro_line(&day.totals));
    if let Some(targets) = &day.targets {
        let (target, remaining) = target_lines(targets, &day.totals);
        println!("  TARGET: {target}");
        println!("  REMAINING: {remaining}");
    }
}
