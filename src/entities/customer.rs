// Customer entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer of the bank. Created once, never modified or deleted.
///
/// The name is stored already normalized (title case, restricted charset);
/// normalization happens at the request boundary, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Stable identity - never changes
    pub id: Uuid,

    /// Display name, normalized to title case
    pub name: String,
}

impl Customer {
    /// Create a new customer with a fresh UUID.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_customer_gets_unique_id() {
        let a = Customer::new("Jane Doe".to_string());
        let b = Customer::new("Jane Doe".to_string());
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, b.name);
    }
}
