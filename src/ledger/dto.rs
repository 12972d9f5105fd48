use serde::{Deserialize, Deserializer, Serialize};

use super::repo::TransactionKind;

/// Accepts a JSON number or a numeric string, the way clients actually
/// send amounts.
fn coerce_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(deserialize_with = "coerce_number", default)]
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewBudget {
    #[serde(default)]
    pub category: String,
    #[serde(deserialize_with = "coerce_number", default)]
    pub limit: f64,
    #[serde(default)]
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
    pub message: String,
}
