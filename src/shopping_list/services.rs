use std::collections::BTreeMap;

use serde::Serialize;

pub const EMPTY_CART: &str = "Your shopping cart is empty.";
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const CONTENT_DISPOSITION: &str = "attachment; filename=\"shopping_list.txt\"";

/// One ingredient row of one recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientTotal {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Sums amounts per (name, unit), ordered by name then unit.
pub fn aggregate<I>(lines: I) -> Vec<IngredientTotal>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *groups.entry((line.name, line.measurement_unit)).or_insert(0) += i64::from(line.amount);
    }
    groups
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| IngredientTotal {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

pub fn render(totals: &[IngredientTotal]) -> String {
    if totals.is_empty() {
        return EMPTY_CART.to_string();
    }
    totals
        .iter()
        .map(|t| format!("{}: {} ({})", t.name, t.total_amount, t.measurement_unit))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn same_ingredient_across_recipes_is_summed() {
        // R1: Salt 5 g, R2: Salt 3 g
        let totals = aggregate(vec![line("Salt", "g", 5), line("Salt", "g", 3)]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total_amount, 8);
        assert_eq!(render(&totals), "Salt: 8 (g)");
    }

    #[test]
    fn empty_cart_renders_sentinel() {
        let totals = aggregate(Vec::new());
        assert!(totals.is_empty());
        assert_eq!(render(&totals), EMPTY_CART);
    }

    #[test]
    fn lines_are_sorted_by_name() {
        let totals = aggregate(vec![
            line("Sugar", "g", 100),
            line("Eggs", "pcs", 2),
            line("Flour", "g", 250),
            line("Eggs", "pcs", 1),
        ]);
        assert_eq!(render(&totals), "Eggs: 3 (pcs)\nFlour: 250 (g)\nSugar: 100 (g)");
    }

    #[test]
    fn different_units_stay_separate() {
        let totals = aggregate(vec![line("Milk", "ml", 200), line("Milk", "cup", 1)]);
        assert_eq!(totals.len(), 2);
        assert_eq!(render(&totals), "Milk: 1 (cup)\nMilk: 200 (ml)");
    }

    #[test]
    fn large_sums_do_not_overflow_i32() {
        let totals = aggregate(vec![line("Rice", "g", i32::MAX), line("Rice", "g", i32::MAX)]);
        assert_eq!(totals[0].total_amount, 2 * i64::from(i32::MAX));
    }
}
