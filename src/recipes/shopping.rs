//! Shopping list aggregation over the ingredients of every recipe in a cart.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::FromRow;

/// One ingredient amount reached through a cart entry, in cart order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoppingList {
    /// The user has nothing in the cart.
    Empty,
    Items(Vec<ShoppingItem>),
}

#[derive(Default)]
struct Totals {
    index: HashMap<(String, String), usize>,
    items: Vec<ShoppingItem>,
}

/// Sum amounts per `(name, measurement_unit)`, keeping first-encounter order.
pub fn aggregate<I>(rows: I) -> Vec<ShoppingItem>
where
    I: IntoIterator<Item = CartIngredientRow>,
{
    rows.into_iter()
        .fold(Totals::default(), |mut acc, row| {
            let key = (row.name, row.measurement_unit);
            match acc.index.get(&key) {
                Some(&i) => acc.items[i].total_amount += row.amount,
                None => {
                    acc.index.insert(key.clone(), acc.items.len());
                    acc.items.push(ShoppingItem {
                        name: key.0,
                        measurement_unit: key.1,
                        total_amount: row.amount,
                    });
                }
            }
            acc
        })
        .items
}

impl ShoppingItem {
    pub fn line(&self) -> String {
        format!("{} ({}) - {}", self.name, self.measurement_unit, self.total_amount)
    }
}

/// Newline-terminated plain-text body for `shopping_list.txt`.
pub fn render(items: &[ShoppingItem]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        out.push_str(&item.line());
        out.push('\n');
        out
    })
}
