use rusqlite::params;

use super::nutrition::food_at;
use super::{Database, list_col, now_text, ts_col};
use crate::error::{StorageError, StorageResult};
use crate::models::{MacroTotals, NewRecipe, Recipe, RecipeIngredient, validate_new_recipe};

const RECIPE_COLUMNS: &str =
    "id, user_id, name, description, servings, instructions, image_url, created_at, updated_at";

// 0: ri.food_id, 1: ri.quantity, 2: ri.order_index, 3..=19: the joined food
const INGREDIENT_SELECT: &str = "SELECT ri.food_id, ri.quantity, ri.order_index, f.id, \
    f.barcode, f.name, f.brand, f.serving_size, f.serving_unit, f.calories, f.protein, f.carbs, \
    f.fat, f.fiber, f.sugar, f.sodium, f.image_url, f.source, f.created_at, f.updated_at \
    FROM recipe_ingredients ri JOIN foods f ON f.id = ri.food_id";

fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        servings: row.get(4)?,
        ingredients: Vec::new(),
        instructions: list_col(row, 5)?,
        image_url: row.get(6)?,
        totals: MacroTotals::default(),
        created_at: ts_col(row, 7)?,
        updated_at: ts_col(row, 8)?,
    })
}

fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredient> {
    Ok(RecipeIngredient {
        food_id: row.get(0)?,
        quantity: row.get(1)?,
        order_index: row.get(2)?,
        food: food_at(row, 3)?,
    })
}

impl Database {
    /// Recipe and ingredients in one transaction. Every ingredient must
    /// reference a stored food.
    pub fn create_recipe(&mut self, recipe: &NewRecipe) -> StorageResult<Recipe> {
        validate_new_recipe(recipe)?;
        let instructions = serde_json::to_string(&recipe.instructions)?;
        let now = now_text();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO recipes (id, user_id, name, description, servings, instructions,
                image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                recipe.id,
                recipe.user_id,
                recipe.name.trim(),
                recipe.description,
                recipe.servings,
                instructions,
                recipe.image_url,
                now,
            ],
        )?;
        for (index, ingredient) in (0_i64..).zip(&recipe.ingredients) {
            tx.execute(
                "INSERT INTO recipe_ingredients (recipe_id, food_id, quantity, order_index)
                 VALUES (?1, ?2, ?3, ?4)",
                params![recipe.id, ingredient.food_id, ingredient.quantity, index],
            )?;
        }
        tx.commit()?;

        self.get_recipe_by_id(&recipe.id)?
            .ok_or_else(|| StorageError::not_found("recipe", &recipe.id))
    }

    fn with_ingredients(&self, recipe: Recipe) -> StorageResult<Recipe> {
        let mut stmt = self.conn.prepare(&format!(
            "{INGREDIENT_SELECT} WHERE ri.recipe_id = ?1 ORDER BY ri.order_index"
        ))?;
        let ingredients = stmt
            .query_map(params![recipe.id], ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut totals = MacroTotals::default();
        for ingredient in &ingredients {
            totals += ingredient.macros();
        }
        Ok(Recipe {
            ingredients,
            totals,
            ..recipe
        })
    }

    pub fn get_recipe_by_id(&self, id: &str) -> StorageResult<Option<Recipe>> {
        let recipe = {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"))?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => recipe_from_row(row)?,
                None => return Ok(None),
            }
        };
        self.with_ingredients(recipe).map(Some)
    }

    pub fn get_recipes_for_user(&self, user_id: &str) -> StorageResult<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = ?1 ORDER BY name, created_at"
        ))?;
        let recipes = stmt
            .query_map(params![user_id], recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        recipes
            .into_iter()
            .map(|r| self.with_ingredients(r))
            .collect()
    }

    /// Ingredients go with the recipe; their foods stay.
    pub fn delete_recipe(&self, id: &str) -> StorageResult<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        Ok(changes > 0)
    }
}
