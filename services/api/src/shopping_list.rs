//! Shopping list aggregation
//!
//! Ingredient lines from every recipe in a user's cart are grouped by
//! ingredient name and measurement unit, summed, and rendered one per line.

use std::collections::BTreeMap;

/// Message returned when the cart holds nothing
pub const EMPTY_MESSAGE: &str = "Your shopping list is empty";

/// File name offered to the client
pub const FILE_NAME: &str = "shopping_list.txt";

/// One ingredient line of one recipe in the cart
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Sum amounts per (name, unit), ordered by name then unit
pub fn aggregate<I>(lines: I) -> BTreeMap<(String, String), i64>
where
    I: IntoIterator<Item = CartLine>,
{
    lines.into_iter().fold(BTreeMap::new(), |mut totals, line| {
        let total = totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0_i64);
        *total = total.saturating_add(i64::from(line.amount));
        totals
    })
}

/// Render aggregated totals as `"<name> (<unit>) - <amount>\n"` lines
pub fn render(totals: &BTreeMap<(String, String), i64>) -> String {
    if totals.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    totals
        .iter()
        .map(|((name, unit), amount)| format!("{} ({}) - {}\n", name, unit, amount))
        .collect()
}

/// Aggregate and render in one step
pub fn build<I>(lines: I) -> String
where
    I: IntoIterator<Item = CartLine>,
{
    render(&aggregate(lines))
}
