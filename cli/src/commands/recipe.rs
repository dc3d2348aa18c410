use anyhow::{Context, Result, bail};
use tabled::Tabled;

use liftlog_core::models::{NewRecipe, NewRecipeIngredient, Recipe, new_id};
use liftlog_core::service::FitnessService;

use super::helpers::{empty_list, no_neg_zero, nothing_found, print_json, render_table, truncate};
use super::require_food;

/// `<food id>[:<servings>]`; the quantity defaults to one serving.
pub(crate) fn parse_ingredient(s: &str) -> Result<NewRecipeIngredient> {
    let (food_id, quantity) = match s.rsplit_once(':') {
        Some((id, qty)) => (
            id,
            qty.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid quantity in '{s}'. Use <food id>[:<servings>]"))?,
        ),
        None => (s, 1.0),
    };
    if food_id.trim().is_empty() {
        bail!("Missing food id in '{s}'");
    }
    Ok(NewRecipeIngredient {
        food_id: food_id.trim().to_string(),
        quantity,
    })
}

#[derive(Debug)]
pub(crate) struct RecipeArgs {
    pub name: String,
    pub servings: i64,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub description: Option<String>,
}

pub(crate) async fn cmd_recipe_create(
    svc: &FitnessService,
    user_id: &str,
    args: RecipeArgs,
    json: bool,
) -> Result<()> {
    let ingredients = args
        .ingredients
        .iter()
        .map(|s| parse_ingredient(s))
        .collect::<Result<Vec<_>>>()?;
    for ingredient in &ingredients {
        require_food(svc, &ingredient.food_id, json).await?;
    }

    let recipe = svc
        .store()
        .create_recipe(NewRecipe {
            id: new_id(),
            user_id: user_id.to_string(),
            name: args.name,
            description: args.description,
            servings: args.servings,
            ingredients,
            instructions: args.steps,
            image_url: None,
        })
        .await?;

    if json {
        print_json(&recipe)?;
    } else {
        println!(
            "Created recipe '{}' with {} ingredients (id: {})",
            recipe.name,
            recipe.ingredients.len(),
            recipe.id
        );
    }
    Ok(())
}

fn print_recipe(recipe: &Recipe) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Servings")]
        servings: String,
        #[tabled(rename = "Cal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    println!("{} (id: {})", recipe.name, recipe.id);
    if let Some(description) = &recipe.description {
        println!("  {description}");
    }

    let rows: Vec<IngredientRow> = recipe
        .ingredients
        .iter()
        .map(|i| {
            let m = i.macros();
            IngredientRow {
                food: truncate(&i.food.name, 35),
                servings: format!("{}", i.quantity),
                calories: format!("{:.0}", no_neg_zero(m.calories)),
                protein: format!("{:.1}", no_neg_zero(m.protein)),
                carbs: format!("{:.1}", no_neg_zero(m.carbs)),
                fat: format!("{:.1}", no_neg_zero(m.fat)),
            }
        })
        .collect();
    println!("{}", render_table(&rows, 1..));

    let t = &recipe.totals;
    let p = recipe.per_serving();
    println!(
        "Total:       {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g",
        t.calories, t.protein, t.carbs, t.fat
    );
    println!(
        "Per serving: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g  ({} servings)",
        p.calories, p.protein, p.carbs, p.fat, recipe.servings
    );
    for (n, step) in recipe.instructions.iter().enumerate() {
        println!("  {}. {step}", n + 1);
    }
}

pub(crate) async fn cmd_recipe_show(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    let Some(recipe) = svc.store().get_recipe_by_id(id).await? else {
        nothing_found(json, &format!("No recipe with id '{id}'"));
    };
    if json {
        print_json(&recipe)?;
    } else {
        print_recipe(&recipe);
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_list(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let recipes = svc.store().get_recipes_for_user(user_id).await?;
    if recipes.is_empty() {
        empty_list(json, "No recipes yet. Use `liftlog recipe create`");
    }
    if json {
        return print_json(&recipes);
    }
    for r in &recipes {
        let p = r.per_serving();
        println!(
            "{}  {}  ({} servings, {:.0} kcal each)",
            r.id, r.name, r.servings, p.calories
        );
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_delete(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    if !svc.store().delete_recipe(id).await? {
        nothing_found(json, &format!("No recipe with id '{id}'"));
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe {id}");
    }
    Ok(())
}
