use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use super::{Database, enum_col, local_day_bounds, now_text, ts_col, ts_text};
use crate::error::{StorageError, StorageResult};
use crate::models::{
    Food, FoodEntry, FoodSource, MealSlot, NewFood, NewFoodEntry, validate_new_food,
    validate_quantity,
};

const FOOD_COLUMNS: &str = "id, barcode, name, brand, serving_size, serving_unit, calories, \
    protein, carbs, fat, fiber, sugar, sodium, image_url, source, created_at, updated_at";

// Expects columns:
// 0: fe.id, 1: fe.user_id, 2: fe.food_id, 3: fe.quantity, 4: fe.meal_type,
// 5: fe.logged_at, 6: fe.created_at, 7..=23: the joined food
const ENTRY_SELECT: &str = "SELECT fe.id, fe.user_id, fe.food_id, fe.quantity, fe.meal_type, \
    fe.logged_at, fe.created_at, f.id, f.barcode, f.name, f.brand, f.serving_size, \
    f.serving_unit, f.calories, f.protein, f.carbs, f.fat, f.fiber, f.sugar, f.sodium, \
    f.image_url, f.source, f.created_at, f.updated_at \
    FROM food_entries fe JOIN foods f ON f.id = fe.food_id";

const FOOD_INSERT: &str = "INSERT INTO foods (id, barcode, name, brand, serving_size, \
    serving_unit, calories, protein, carbs, fat, fiber, sugar, sodium, image_url, source, \
    created_at, updated_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)";

pub(super) fn food_at(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Food> {
    Ok(Food {
        id: row.get(base)?,
        barcode: row.get(base + 1)?,
        name: row.get(base + 2)?,
        brand: row.get(base + 3)?,
        serving_size: row.get(base + 4)?,
        serving_unit: row.get(base + 5)?,
        calories: row.get(base + 6)?,
        protein: row.get(base + 7)?,
        carbs: row.get(base + 8)?,
        fat: row.get(base + 9)?,
        fiber: row.get(base + 10)?,
        sugar: row.get(base + 11)?,
        sodium: row.get(base + 12)?,
        image_url: row.get(base + 13)?,
        source: enum_col::<FoodSource>(row, base + 14)?,
        created_at: ts_col(row, base + 15)?,
        updated_at: ts_col(row, base + 16)?,
    })
}

fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
    food_at(row, 0)
}

fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodEntry> {
    Ok(FoodEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        food_id: row.get(2)?,
        quantity: row.get(3)?,
        meal: enum_col::<MealSlot>(row, 4)?,
        logged_at: ts_col(row, 5)?,
        created_at: ts_col(row, 6)?,
        food: food_at(row, 7)?,
    })
}

impl Database {
    // --- Foods ---

    pub fn create_food(&self, food: &NewFood) -> StorageResult<Food> {
        self.insert_food(food, FOOD_INSERT)
    }

    /// Stores the food unless its id is taken, then returns whatever row
    /// holds that id.
    pub fn cache_food(&self, food: &NewFood) -> StorageResult<Food> {
        self.insert_food(food, &format!("{FOOD_INSERT} ON CONFLICT(id) DO NOTHING"))
    }

    fn insert_food(&self, food: &NewFood, sql: &str) -> StorageResult<Food> {
        validate_new_food(food)?;
        let now = now_text();
        self.conn.execute(
            sql,
            params![
                food.id,
                food.barcode,
                food.name.trim(),
                food.brand,
                food.serving_size,
                food.serving_unit,
                food.calories,
                food.protein,
                food.carbs,
                food.fat,
                food.fiber,
                food.sugar,
                food.sodium,
                food.image_url,
                food.source.as_str(),
                now,
            ],
        )?;
        self.get_food_by_id(&food.id)?
            .ok_or_else(|| StorageError::not_found("food", &food.id))
    }

    pub fn get_food_by_id(&self, id: &str) -> StorageResult<Option<Food>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Barcodes are not unique; the earliest stored food wins.
    pub fn get_food_by_barcode(&self, barcode: &str) -> StorageResult<Option<Food>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE barcode = ?1
             ORDER BY created_at, rowid LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![barcode])?;
        if let Some(row) = rows.next()? {
            Ok(Some(food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Case-insensitive substring match on name or brand. `%` and `_` in the
    /// query match literally.
    pub fn search_foods(&self, query: &str, limit: i64) -> StorageResult<Vec<Food>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods
             WHERE name LIKE ?1 ESCAPE '\\' OR brand LIKE ?1 ESCAPE '\\'
             ORDER BY name LIMIT ?2"
        ))?;
        let foods = stmt
            .query_map(params![pattern, limit], food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Fails with `ForeignKey` while any food entry still references the food.
    pub fn delete_food(&self, id: &str) -> StorageResult<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM foods WHERE id = ?1", params![id])?;
        Ok(changes > 0)
    }

    // --- Food entries ---

    pub fn create_food_entry(&self, entry: &NewFoodEntry) -> StorageResult<FoodEntry> {
        validate_quantity(entry.quantity)?;
        let now = now_text();
        self.conn.execute(
            "INSERT INTO food_entries (id, user_id, food_id, quantity, meal_type, logged_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                entry.food_id,
                entry.quantity,
                entry.meal.as_str(),
                ts_text(&entry.logged_at),
                now,
            ],
        )?;
        self.get_food_entry_by_id(&entry.id)?
            .ok_or_else(|| StorageError::not_found("food entry", &entry.id))
    }

    pub fn get_food_entry_by_id(&self, id: &str) -> StorageResult<Option<FoodEntry>> {
        let mut stmt = self.conn.prepare(&format!("{ENTRY_SELECT} WHERE fe.id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(entry_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Entries logged during the local civil day, oldest first.
    pub fn get_food_entries_by_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<Vec<FoodEntry>> {
        let (start, end) = local_day_bounds(date);
        self.get_food_entries_between(user_id, start, end)
    }

    /// Both bounds inclusive.
    pub fn get_food_entries_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<FoodEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT} WHERE fe.user_id = ?1 AND fe.logged_at BETWEEN ?2 AND ?3
             ORDER BY fe.logged_at, fe.rowid"
        ))?;
        let entries = stmt
            .query_map(
                params![user_id, ts_text(&start), ts_text(&end)],
                entry_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
