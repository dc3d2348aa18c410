use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Food, FoodSource, NewFood};

static SERVING_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(\w+)?").ok());

const BARCODE_LENGTHS: [usize; 4] = [8, 12, 13, 14];

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<ProductData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub status: Option<i32>,
    pub code: Option<String>,
    pub product: Option<ProductData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductData {
    pub code: Option<String>,
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub image_url: Option<String>,
    pub nutriments: Option<Nutriments>,
    pub serving_size: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub serving_quantity: Option<f64>,
}

/// Per-100g values as published by OpenFoodFacts.
#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g", default, deserialize_with = "lenient_number")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub proteins_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fat_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fiber_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sugars_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sodium_100g: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Suggestion {
    Named { name: String },
    Plain(String),
}

impl Suggestion {
    #[must_use]
    pub fn into_name(self) -> String {
        match self {
            Suggestion::Named { name } | Suggestion::Plain(name) => name,
        }
    }
}

/// Categories listed by [`CategoriesResponse::popular_names`] need more products than this.
pub const MIN_CATEGORY_PRODUCTS: f64 = 100.0;
pub const MAX_CATEGORIES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub tags: Vec<CategoryTag>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryTag {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub products: Option<f64>,
}

impl CategoriesResponse {
    /// Names of well-stocked categories, in listing order.
    #[must_use]
    pub fn popular_names(self) -> Vec<String> {
        self.tags
            .into_iter()
            .filter(|tag| tag.products.is_some_and(|n| n > MIN_CATEGORY_PRODUCTS))
            .filter_map(|tag| tag.name.filter(|n| !n.trim().is_empty()))
            .take(MAX_CATEGORIES)
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// OpenFoodFacts sends numbers both as JSON numbers and as numeric strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Zero and missing are both "not reported".
fn optional_nutrient(per_100g: Option<f64>, multiplier: f64) -> Option<f64> {
    per_100g
        .filter(|v| v.is_finite() && *v != 0.0)
        .map(|v| round1(v * multiplier))
}

/// Leading number and optional unit word of a free-text serving, e.g. `"30 g"`.
#[must_use]
pub fn parse_serving_size(text: &str) -> Option<(f64, Option<String>)> {
    let caps = SERVING_RE.as_ref()?.captures(text)?;
    let amount = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_string());
    Some((amount, unit))
}

/// A non-blank `serving_size` text decides the serving on its own, falling
/// back to 100 g when it has no positive amount. `serving_quantity` only
/// counts when there is no text.
fn serving_for(product: &ProductData) -> (f64, String) {
    let grams = |amount: f64| (amount, "g".to_string());
    let text = product
        .serving_size
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    match text {
        Some(text) => parse_serving_size(text)
            .filter(|(amount, _)| *amount > 0.0)
            .map_or_else(
                || grams(100.0),
                |(amount, unit)| (amount, unit.unwrap_or_else(|| "g".to_string())),
            ),
        None => product
            .serving_quantity
            .filter(|q| q.is_finite() && *q > 0.0)
            .map_or_else(|| grams(100.0), grams),
    }
}

/// Convert a per-100g product into a per-serving food with id `off_<code>`.
/// Products without a name, a code or a nutriments block are rejected.
#[must_use]
pub fn transform_to_food(code: &str, product: ProductData) -> Option<NewFood> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    let (serving_size, serving_unit) = serving_for(&product);
    let name = product
        .product_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())?;
    let nutriments = product.nutriments?;

    let multiplier = serving_size / 100.0;
    let per_serving = |v: Option<f64>| round1(v.unwrap_or(0.0) * multiplier);

    Some(NewFood {
        id: format!("off_{code}"),
        barcode: Some(code.to_string()),
        name,
        brand: product.brands.filter(|b| !b.trim().is_empty()),
        serving_size,
        serving_unit,
        calories: (nutriments.energy_kcal_100g.unwrap_or(0.0) * multiplier).round(),
        protein: per_serving(nutriments.proteins_100g),
        carbs: per_serving(nutriments.carbohydrates_100g),
        fat: per_serving(nutriments.fat_100g),
        fiber: optional_nutrient(nutriments.fiber_100g, multiplier),
        sugar: optional_nutrient(nutriments.sugars_100g, multiplier),
        sodium: optional_nutrient(nutriments.sodium_100g, multiplier),
        image_url: product.image_url.filter(|u| !u.trim().is_empty()),
        source: FoodSource::OpenFoodFacts,
    })
}

/// Search-style record: the code comes from the product itself.
#[must_use]
pub fn product_to_food(product: ProductData) -> Option<NewFood> {
    let code = product.code.clone()?;
    transform_to_food(&code, product)
}

/// Strip everything except digits.
#[must_use]
pub fn format_barcode(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// EAN-8, UPC-A, EAN-13 and GTIN-14 lengths after stripping non-digits.
#[must_use]
pub fn is_valid_barcode(raw: &str) -> bool {
    BARCODE_LENGTHS.contains(&format_barcode(raw).len())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown unit '{0}'. Use g, kg, oz or lb")]
pub struct UnknownUnit(pub String);

/// Weight of `amount` `unit` in grams.
pub fn to_grams(amount: f64, unit: &str) -> Result<f64, UnknownUnit> {
    match unit.trim().to_lowercase().as_str() {
        "g" => Ok(amount),
        "kg" => Ok(amount * 1000.0),
        "oz" => Ok(amount * 28.35),
        "lb" => Ok(amount * 453.59),
        _ => Err(UnknownUnit(unit.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

/// Scale a food's per-serving values to a weighed amount. The serving size is
/// taken to be in grams.
pub fn calculate_nutrition_for_amount(
    food: &Food,
    amount: f64,
    unit: &str,
) -> Result<NutritionFacts, UnknownUnit> {
    let grams = to_grams(amount, unit)?;
    let multiplier = grams / food.serving_size;
    Ok(NutritionFacts {
        calories: (food.calories * multiplier).round(),
        protein: round1(food.protein * multiplier),
        carbs: round1(food.carbs * multiplier),
        fat: round1(food.fat * multiplier),
        fiber: optional_nutrient(food.fiber, multiplier),
        sugar: optional_nutrient(food.sugar, multiplier),
        sodium: optional_nutrient(food.sodium, multiplier),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn nutella() -> ProductData {
        ProductData {
            code: Some("3017620422003".to_string()),
            product_name: Some("Nutella".to_string()),
            brands: Some("Ferrero".to_string()),
            image_url: Some("https://images.openfoodfacts.org/nutella.jpg".to_string()),
            nutriments: Some(Nutriments {
                energy_kcal_100g: Some(539.0),
                proteins_100g: Some(6.3),
                carbohydrates_100g: Some(57.5),
                fat_100g: Some(30.9),
                fiber_100g: None,
                sugars_100g: Some(56.3),
                sodium_100g: Some(0.0428),
            }),
            serving_size: Some("15 g".to_string()),
            serving_quantity: None,
        }
    }

    fn stored(food: NewFood) -> Food {
        Food {
            id: food.id,
            barcode: food.barcode,
            name: food.name,
            brand: food.brand,
            serving_size: food.serving_size,
            serving_unit: food.serving_unit,
            calories: food.calories,
            protein: food.protein,
            carbs: food.carbs,
            fat: food.fat,
            fiber: food.fiber,
            sugar: food.sugar,
            sodium: food.sodium,
            image_url: food.image_url,
            source: food.source,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_transform_scales_to_serving() {
        let food = transform_to_food("3017620422003", nutella()).unwrap();
        assert_eq!(food.id, "off_3017620422003");
        assert_eq!(food.barcode.as_deref(), Some("3017620422003"));
        assert_eq!(food.brand.as_deref(), Some("Ferrero"));
        assert_eq!(food.serving_size, 15.0);
        assert_eq!(food.serving_unit, "g");
        // 539 * 0.15 = 80.85
        assert_eq!(food.calories, 81.0);
        // 6.3 * 0.15 = 0.945
        assert_eq!(food.protein, 0.9);
        assert_eq!(food.carbs, 8.6);
        assert_eq!(food.fat, 4.6);
        assert_eq!(food.sugar, Some(8.4));
        assert_eq!(food.sodium, Some(0.0));
        assert!(food.fiber.is_none());
        assert_eq!(food.source, FoodSource::OpenFoodFacts);
    }

    #[test]
    fn test_transform_serving_without_space() {
        let product = ProductData {
            product_name: Some("Soup".to_string()),
            nutriments: Some(Nutriments {
                energy_kcal_100g: Some(40.0),
                ..Default::default()
            }),
            serving_size: Some("250g".to_string()),
            ..Default::default()
        };
        let food = transform_to_food("12345678", product).unwrap();
        assert_eq!(food.serving_size, 250.0);
        assert_eq!(food.serving_unit, "g");
        assert_eq!(food.calories, 100.0);
        assert_eq!(food.protein, 0.0);
    }

    #[test]
    fn test_transform_serving_fallbacks() {
        let product = ProductData {
            product_name: Some("Yogurt".to_string()),
            nutriments: Some(Nutriments {
                energy_kcal_100g: Some(60.0),
                ..Default::default()
            }),
            serving_quantity: Some(125.0),
            ..Default::default()
        };
        let food = transform_to_food("12345678", product).unwrap();
        assert_eq!(food.serving_size, 125.0);
        assert_eq!(food.calories, 75.0);

        let product = ProductData {
            product_name: Some("Flour".to_string()),
            nutriments: Some(Nutriments::default()),
            serving_size: Some("a pinch".to_string()),
            ..Default::default()
        };
        let food = transform_to_food("12345678", product).unwrap();
        assert_eq!(food.serving_size, 100.0);
        assert_eq!(food.serving_unit, "g");
        assert_eq!(food.calories, 0.0);
    }

    #[test]
    fn test_unparseable_serving_text_ignores_quantity() {
        let product = ProductData {
            product_name: Some("Granola".to_string()),
            nutriments: Some(Nutriments {
                energy_kcal_100g: Some(450.0),
                ..Default::default()
            }),
            serving_size: Some("one handful".to_string()),
            serving_quantity: Some(40.0),
            ..Default::default()
        };
        let food = transform_to_food("12345678", product).unwrap();
        assert_eq!(food.serving_size, 100.0);
        assert_eq!(food.calories, 450.0);

        // blank text counts as absent
        let product = ProductData {
            product_name: Some("Granola".to_string()),
            nutriments: Some(Nutriments::default()),
            serving_size: Some("  ".to_string()),
            serving_quantity: Some(40.0),
            ..Default::default()
        };
        assert_eq!(transform_to_food("12345678", product).unwrap().serving_size, 40.0);
    }

    #[test]
    fn test_transform_unit_word_kept() {
        let product = ProductData {
            product_name: Some("Milk".to_string()),
            nutriments: Some(Nutriments::default()),
            serving_size: Some("1 cup (240 ml)".to_string()),
            ..Default::default()
        };
        let food = transform_to_food("12345678", product).unwrap();
        assert_eq!(food.serving_size, 1.0);
        assert_eq!(food.serving_unit, "cup");
    }

    #[test]
    fn test_transform_rejects_missing_fields() {
        let mut p = nutella();
        p.product_name = None;
        assert!(transform_to_food("3017620422003", p).is_none());

        let mut p = nutella();
        p.product_name = Some("  ".to_string());
        assert!(transform_to_food("3017620422003", p).is_none());

        let mut p = nutella();
        p.nutriments = None;
        assert!(transform_to_food("3017620422003", p).is_none());

        assert!(transform_to_food("", nutella()).is_none());
    }

    #[test]
    fn test_product_to_food_uses_product_code() {
        let food = product_to_food(nutella()).unwrap();
        assert_eq!(food.id, "off_3017620422003");

        let mut p = nutella();
        p.code = None;
        assert!(product_to_food(p).is_none());
    }

    #[test]
    fn test_lenient_numbers_in_payload() {
        let json = r#"{
            "code": "3017620422003",
            "status": 1,
            "product": {
                "product_name": "Nutella",
                "serving_quantity": "15",
                "nutriments": { "energy-kcal_100g": "539", "fat_100g": 30.9 }
            }
        }"#;
        let resp: ProductResponse = serde_json::from_str(json).unwrap();
        let product = resp.product.unwrap();
        assert_eq!(product.serving_quantity, Some(15.0));
        let nutriments = product.nutriments.as_ref().unwrap();
        assert_eq!(nutriments.energy_kcal_100g, Some(539.0));
        assert_eq!(nutriments.fat_100g, Some(30.9));
        assert!(nutriments.proteins_100g.is_none());
    }

    #[test]
    fn test_suggestions_named_or_plain() {
        let resp: SuggestResponse =
            serde_json::from_str(r#"{"suggestions": [{"name": "Nutella"}, "Nutella Biscuits"]}"#)
                .unwrap();
        let names: Vec<String> = resp.suggestions.into_iter().map(Suggestion::into_name).collect();
        assert_eq!(names, vec!["Nutella", "Nutella Biscuits"]);
    }

    #[test]
    fn test_popular_category_names() {
        let mut tags = vec![
            serde_json::json!({ "name": "Snacks", "products": 5000 }),
            serde_json::json!({ "name": "Rare", "products": 100 }),
            serde_json::json!({ "products": 900 }),
            serde_json::json!({ "name": "Beverages", "products": "1200" }),
        ];
        tags.extend((0..60).map(|i| serde_json::json!({ "name": format!("c{i}"), "products": 101 })));
        let resp: CategoriesResponse =
            serde_json::from_value(serde_json::json!({ "tags": tags })).unwrap();

        let names = resp.popular_names();
        assert_eq!(names.len(), MAX_CATEGORIES);
        assert_eq!(names[..3], ["Snacks", "Beverages", "c0"]);
    }

    #[test]
    fn test_barcode_validation() {
        assert!(is_valid_barcode("3017620422003"));
        assert!(is_valid_barcode("9638-5074"));
        assert!(is_valid_barcode("0 12345 67890 5"));
        assert!(is_valid_barcode("12345678901234"));
        assert!(!is_valid_barcode("1234567"));
        assert!(!is_valid_barcode("12345678901"));
        assert!(!is_valid_barcode(""));
        assert!(!is_valid_barcode("12345"));
        assert!(!is_valid_barcode("123456789"));
        assert!(!is_valid_barcode("123456789012345"));
        assert!(is_valid_barcode("ABC12345678"));
        assert_eq!(format_barcode("0 12345-67890 5"), "012345678905");
    }

    #[test]
    fn test_nutrition_for_amount_units() {
        let mut food = stored(transform_to_food("12345678", ProductData {
            product_name: Some("Chicken".to_string()),
            nutriments: Some(Nutriments {
                energy_kcal_100g: Some(165.0),
                proteins_100g: Some(20.0),
                carbohydrates_100g: Some(0.0),
                fat_100g: Some(3.6),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap());
        assert_eq!(food.serving_size, 100.0);

        let facts = calculate_nutrition_for_amount(&food, 1.0, "lb").unwrap();
        // 453.59 / 100 * 20 = 90.718
        assert_eq!(facts.protein, 90.7);
        assert_eq!(facts.calories, 748.0);

        let facts = calculate_nutrition_for_amount(&food, 0.2, "KG").unwrap();
        assert_eq!(facts.protein, 40.0);

        let facts = calculate_nutrition_for_amount(&food, 50.0, "g").unwrap();
        assert_eq!(facts.fat, 1.8);
        assert!(facts.fiber.is_none());

        food.fiber = Some(2.0);
        let facts = calculate_nutrition_for_amount(&food, 1.0, "oz").unwrap();
        assert_eq!(facts.fiber, Some(0.6));
    }

    #[test]
    fn test_nutrition_for_amount_unknown_unit() {
        let food = stored(transform_to_food("12345678", nutella()).unwrap());
        let err = calculate_nutrition_for_amount(&food, 1.0, "cups").unwrap_err();
        assert_eq!(err, UnknownUnit("cups".to_string()));
    }
}
