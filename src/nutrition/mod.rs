//! Client-side aggregation over fetched meal-plan JSON.
//!
//! The API returns meal-plan items as loose objects; nutrient fields may be
//! named in Portuguese or English and arrive as numbers or numeric strings.
//! Everything here is pure and never fails: unusable values count as zero.

use serde::Serialize;
use serde_json::Value;
use std::ops::AddAssign;

/// Group label for items that lack the grouping field.
pub const UNGROUPED: &str = "Outros";

const CALORIES: &[&str] = &["calorias", "calories", "kcal"];
const PROTEIN: &[&str] = &["proteinas", "proteínas", "protein"];
const CARBS: &[&str] = &["carboidratos", "carbs", "carbohydrates"];
const FAT: &[&str] = &["gorduras", "fat", "lipidios", "lipídios"];

/// Summed macronutrients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutrientTotals {
    /// Nutrients of a single item.
    pub fn from_item(item: &Value) -> Self {
        Self {
            calories: field_number(item, CALORIES),
            protein: field_number(item, PROTEIN),
            carbs: field_number(item, CARBS),
            fat: field_number(item, FAT),
        }
    }

    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            acc += Self::from_item(item);
            acc
        })
    }

    /// Same totals rounded to one decimal place, for display.
    pub fn rounded(&self) -> Self {
        let round = |v: f64| (v * 10.0).round() / 10.0;
        Self {
            calories: round(self.calories),
            protein: round(self.protein),
            carbs: round(self.carbs),
            fat: round(self.fat),
        }
    }
}

impl AddAssign for NutrientTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
    }
}

/// One group produced by [`group_by`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group<'a> {
    pub label: String,
    pub items: Vec<&'a Value>,
}

/// Group items by a string field, in first-seen order.
pub fn group_by<'a>(items: &'a [Value], field: &str) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    for item in items {
        let label = group_label(item, field);
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.items.push(item),
            None => groups.push(Group {
                label,
                items: vec![item],
            }),
        }
    }
    groups
}

/// Per-group totals, in the same order as [`group_by`].
pub fn totals_by(items: &[Value], field: &str) -> Vec<(String, NutrientTotals)> {
    group_by(items, field)
        .into_iter()
        .map(|group| {
            let totals = NutrientTotals::from_items(group.items.iter().copied());
            (group.label, totals)
        })
        .collect()
}

/// Items of a response body: the body itself when it is an array, or the
/// first array found under a common envelope key.
pub fn items_of(body: &Value) -> &[Value] {
    if let Some(items) = body.as_array() {
        return items;
    }
    ["itens", "items", "data", "refeicoes"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn group_label(item: &Value, field: &str) -> String {
    match item.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNGROUPED.to_string(),
    }
}

fn field_number(item: &Value, names: &[&str]) -> f64 {
    names
        .iter()
        .find_map(|name| item.get(*name).and_then(as_number))
        .unwrap_or(0.0)
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        // Accept "12,5" as well as "12.5".
        Value::String(s) => s.trim().replace(',', ".").parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
