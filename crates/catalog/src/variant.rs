use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Entity, VariantId};

/// A variant as the order core sees it. Variants are independent entities
/// referenced by stock rows; immutable once created in this core's scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    id: VariantId,
    name: String,
}

impl Variant {
    pub fn new(id: VariantId, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("variant name cannot be empty"));
        }
        Ok(Self { id, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        let err = Variant::new(VariantId::new(), "").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
