// 💸 Transaction Model - Expense records and their fixed categories
// The search engine only ever reads these; the store owns mutation.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Bills,
    Other,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Entertainment,
        Category::Shopping,
        Category::Bills,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Entertainment => "Entertainment",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("Unknown category: {:?}", s))
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Longest accepted description, in characters after trimming.
/// `SearchConfig::validate` requires the search input cap to cover it.
pub const MAX_DESCRIPTION_LENGTH: usize = 1_000;

/// A single recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Stable identity (UUID)
    pub id: String,

    pub description: String,

    /// Always positive
    pub amount: f64,

    pub category: Category,

    /// ISO calendar date (YYYY-MM-DD)
    pub date: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new validated transaction with a fresh UUID
    pub fn new(description: &str, amount: f64, category: Category, date: &str) -> Result<Self> {
        validate_fields(description, amount, date)?;

        let now = Utc::now();
        Ok(Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.trim().to_string(),
            amount,
            category,
            date: date.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the editable fields, keeping identity and creation time
    pub fn update(
        &mut self,
        description: &str,
        amount: f64,
        category: Category,
        date: &str,
    ) -> Result<()> {
        validate_fields(description, amount, date)?;

        self.description = description.trim().to_string();
        self.amount = amount;
        self.category = category;
        self.date = date.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Amount the way it is shown to (and searched by) the user: `4.5`, `2`
    pub fn amount_text(&self) -> String {
        self.amount.to_string()
    }

    /// Calendar date, if the stored string is a valid ISO date
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }

    /// Hash used to skip duplicate rows when importing the same file twice.
    /// NOTE: this is for DEDUPLICATION, identity is `id`.
    pub fn import_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.date, self.description, self.amount, self.category
        ));
        format!("{:x}", hasher.finalize())
    }
}

fn validate_fields(description: &str, amount: f64, date: &str) -> Result<()> {
    let description = description.trim();
    if description.is_empty() {
        bail!("Description cannot be empty");
    }
    let length = description.chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        bail!(
            "Description is too long ({} > {} characters)",
            length,
            MAX_DESCRIPTION_LENGTH
        );
    }
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Amount must be a positive number, got {}", amount);
    }
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        bail!("Date must be YYYY-MM-DD, got {:?}", date);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
