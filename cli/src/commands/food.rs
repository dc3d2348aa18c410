use anyhow::{Result, bail};
use serde_json::json;

use crate::openfoodfacts::OpenFoodFactsClient;
use liftlog_core::models::{Food, FoodSource, NewFood, new_id};
use liftlog_core::openfoodfacts::calculate_nutrition_for_amount;
use liftlog_core::service::FitnessService;

use super::helpers::{empty_list, nothing_found, print_food_table, print_json};
use super::require_food;

pub(crate) async fn cmd_food_search(
    svc: &FitnessService,
    off: &OpenFoodFactsClient,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let all = svc.search_and_cache(off, query, limit).await?;

    if all.is_empty() {
        empty_list(json, &format!("No results found for '{query}'"));
    }

    if json {
        print_json(&all)?;
    } else {
        print_food_table(&all);
    }
    Ok(())
}

pub(crate) async fn cmd_food_barcode(
    svc: &FitnessService,
    off: &OpenFoodFactsClient,
    code: &str,
    json: bool,
) -> Result<()> {
    let Some(food) = svc.barcode_lookup(off, code).await? else {
        nothing_found(json, &format!("No product found for barcode '{code}'"));
    };

    if json {
        print_json(&food)?;
    } else {
        print_food(&food);
    }
    Ok(())
}

/// Remote results are cached so their ids can be logged right away.
async fn print_remote_foods(
    svc: &FitnessService,
    remote: Vec<NewFood>,
    json: bool,
    empty_message: &str,
) -> Result<()> {
    let foods = svc.cache_foods(remote).await;
    if foods.is_empty() {
        empty_list(json, empty_message);
    }
    if json {
        print_json(&foods)?;
    } else {
        print_food_table(&foods);
    }
    Ok(())
}

pub(crate) async fn cmd_food_popular(
    svc: &FitnessService,
    off: &OpenFoodFactsClient,
    limit: u32,
    json: bool,
) -> Result<()> {
    let remote = off.get_popular_products(limit).await;
    print_remote_foods(svc, remote, json, "No popular products available").await
}

pub(crate) async fn cmd_food_category(
    svc: &FitnessService,
    off: &OpenFoodFactsClient,
    category: &str,
    page: u32,
    limit: u32,
    json: bool,
) -> Result<()> {
    let remote = off.get_products_by_category(category, page, limit).await;
    print_remote_foods(
        svc,
        remote,
        json,
        &format!("No products found in category '{category}'"),
    )
    .await
}

pub(crate) async fn cmd_food_categories(off: &OpenFoodFactsClient, json: bool) -> Result<()> {
    let names = off.get_categories().await;
    if names.is_empty() {
        empty_list(json, "No categories available");
    }
    if json {
        print_json(&names)?;
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(())
}

pub(crate) async fn cmd_food_suggest(
    off: &OpenFoodFactsClient,
    query: &str,
    limit: u32,
    json: bool,
) -> Result<()> {
    let names = off.get_product_suggestions(query, limit).await;
    if names.is_empty() {
        empty_list(json, &format!("No suggestions for '{query}'"));
    }
    if json {
        print_json(&names)?;
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(())
}

pub(crate) async fn cmd_food_status(off: &OpenFoodFactsClient, json: bool) -> Result<()> {
    let reachable = off.check_api_health().await;
    if json {
        print_json(&json!({ "base_url": off.base_url(), "reachable": reachable }))?;
    } else if reachable {
        println!("OpenFoodFacts is reachable at {}", off.base_url());
    }
    if !reachable {
        bail!("OpenFoodFacts is not reachable at {}", off.base_url());
    }
    Ok(())
}

#[derive(Debug)]
pub(crate) struct FoodArgs {
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
}

pub(crate) async fn cmd_food_add(svc: &FitnessService, args: FoodArgs, json: bool) -> Result<()> {
    let food = svc
        .store()
        .create_food(NewFood {
            id: new_id(),
            barcode: args.barcode,
            name: args.name,
            brand: args.brand,
            serving_size: args.serving_size,
            serving_unit: args.serving_unit,
            calories: args.calories,
            protein: args.protein,
            carbs: args.carbs,
            fat: args.fat,
            fiber: args.fiber,
            sugar: args.sugar,
            sodium: args.sodium,
            image_url: None,
            source: FoodSource::Custom,
        })
        .await?;

    if json {
        print_json(&food)?;
    } else {
        println!("Added food: {} (id: {})", food.name, food.id);
    }
    Ok(())
}

pub(crate) async fn cmd_food_show(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    let food = require_food(svc, id, json).await?;
    if json {
        print_json(&food)?;
    } else {
        print_food(&food);
    }
    Ok(())
}

pub(crate) async fn cmd_nutrition(
    svc: &FitnessService,
    food_id: &str,
    amount: f64,
    unit: &str,
    json: bool,
) -> Result<()> {
    let food = require_food(svc, food_id, json).await?;
    let facts = calculate_nutrition_for_amount(&food, amount, unit)?;

    if json {
        print_json(&facts)?;
    } else {
        println!("{} ({amount}{unit})", food.name);
        println!(
            "  {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g",
            facts.calories, facts.protein, facts.carbs, facts.fat
        );
        let extras: Vec<String> = [
            ("fiber", facts.fiber),
            ("sugar", facts.sugar),
            ("sodium", facts.sodium),
        ]
        .into_iter()
        .filter_map(|(label, v)| v.map(|v| format!("{label} {v:.1}g")))
        .collect();
        if !extras.is_empty() {
            println!("  {}", extras.join(", "));
        }
    }
    Ok(())
}

fn print_food(food: &Food) {
    let brand = food
        .brand
        .as_ref()
        .map(|b| format!(" ({b})"))
        .unwrap_or_default();
    println!("{}{brand}", food.name);
    println!("  id:      {}", food.id);
    if let Some(barcode) = &food.barcode {
        println!("  barcode: {barcode}");
    }
    println!("  source:  {}", food.source);
    println!(
        "  per {}{}: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g",
        food.serving_size, food.serving_unit, food.calories, food.protein, food.carbs, food.fat
    );
}
