// 📊 Dashboard numbers over any slice of transactions (a search result too)

use serde::Serialize;

use crate::transaction::{Category, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: Category,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub count: usize,
    pub total: f64,
    pub average: f64,
    /// In `Category::ALL` order, categories without spending left out
    pub by_category: Vec<CategoryTotal>,
}

impl Summary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let count = transactions.len();
        let total: f64 = transactions.iter().map(|tx| tx.amount).sum();
        let average = if count == 0 { 0.0 } else { total / count as f64 };

        let by_category = Category::ALL
            .iter()
            .filter_map(|&category| {
                let (count, total) = transactions
                    .iter()
                    .filter(|tx| tx.category == category)
                    .fold((0, 0.0), |(n, sum), tx| (n + 1, sum + tx.amount));

                (count > 0).then_some(CategoryTotal {
                    category,
                    count,
                    total,
                })
            })
            .collect();

        Summary {
            count,
            total,
            average,
            by_category,
        }
    }
}
