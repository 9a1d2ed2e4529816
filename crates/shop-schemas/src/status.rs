//! Order status vocabulary.
//!
//! Status text is stored exactly as the admin sent it. Every comparison goes
//! through [`normalize_status`] first (trim + lowercase), so `" Completado "`
//! and `"completado"` are the same status.

use std::fmt;

pub const STATUS_PENDING: &str = "pendiente";
pub const STATUS_SHIPPED: &str = "enviado";
pub const STATUS_COMPLETED: &str = "completado";

/// Trim and case-fold a raw status for comparison.
pub fn normalize_status(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized view of an order status.
///
/// `Other` carries the normalized text of any value outside the known set.
/// Unknown values are legal: admin tooling owns the vocabulary, the engine
/// only cares whether a status is `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Completed,
    Other(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize_status(raw).as_str() {
            "pendiente" | "pending" => OrderStatus::Pending,
            "enviado" | "shipped" => OrderStatus::Shipped,
            "completado" | "completed" => OrderStatus::Completed,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    /// Status as read from a stored row. Unset or blank means pending.
    pub fn from_stored(stored: Option<&str>) -> Self {
        match stored {
            Some(s) if !normalize_status(s).is_empty() => Self::parse(s),
            _ => OrderStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => STATUS_PENDING,
            OrderStatus::Shipped => STATUS_SHIPPED,
            OrderStatus::Completed => STATUS_COMPLETED,
            OrderStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_case_and_whitespace() {
        assert_eq!(normalize_status("  CompletADO \n"), "completado");
        assert_eq!(OrderStatus::parse(" COMPLETADO "), OrderStatus::Completed);
        assert_eq!(OrderStatus::parse("Completed"), OrderStatus::Completed);
        assert_eq!(OrderStatus::parse("Enviado"), OrderStatus::Shipped);
    }

    #[test]
    fn unknown_status_keeps_normalized_text() {
        assert_eq!(
            OrderStatus::parse(" En Camino "),
            OrderStatus::Other("en camino".to_string())
        );
        assert!(!OrderStatus::parse("en camino").is_completed());
    }

    #[test]
    fn unset_or_blank_stored_status_is_pending() {
        assert_eq!(OrderStatus::from_stored(None), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_stored(Some("")), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_stored(Some("   ")), OrderStatus::Pending);
        assert_eq!(
            OrderStatus::from_stored(Some("completado")),
            OrderStatus::Completed
        );
    }
}
