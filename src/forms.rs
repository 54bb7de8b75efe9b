//! Coercion helpers shared by the per-endpoint form structs, and the
//! structured results the CRUD services report.

use serde::Serialize;
use uuid::Uuid;

/// Trimmed text; `None` when missing or blank.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Trimmed text; empty when missing.
pub fn text(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

/// Non-negative integer; missing, unparsable or negative input becomes 0.
pub fn non_negative(raw: Option<&str>) -> i32 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.clamp(0, i32::MAX as i64) as i32)
        .unwrap_or(0)
}

/// HTML checkboxes are only submitted when ticked.
pub fn checkbox(raw: Option<&str>) -> bool {
    raw.is_some()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub message: String,
}
