use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Entity, ProductId};

/// A product as the order core sees it: identity plus display name.
///
/// Stock quantities live in the inventory ledger keyed by
/// `(ProductId, VariantId)`; a product itself carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(Self { id, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
