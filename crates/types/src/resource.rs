//! Resource model: typed, quantity-bearing entities and declarative
//! requirements against them.

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Category of a resource.
///
/// Slot kinds (machine, worker, tool, transport, buffer) are leased and
/// returned after use. Quantity kinds (raw material, semi-finished, finished
/// product, energy) are consumed permanently and replenished by production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    RawMaterial,
    SemiFinished,
    FinishedProduct,
    Machine,
    Worker,
    Tool,
    Transport,
    Buffer,
    Energy,
}

impl ResourceKind {
    /// Whether this kind is leased (slots) rather than consumed (quantity).
    pub fn is_slot_kind(&self) -> bool {
        matches!(
            self,
            ResourceKind::Machine
                | ResourceKind::Worker
                | ResourceKind::Tool
                | ResourceKind::Transport
                | ResourceKind::Buffer
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::RawMaterial => "raw_material",
            ResourceKind::SemiFinished => "semi_finished",
            ResourceKind::FinishedProduct => "finished_product",
            ResourceKind::Machine => "machine",
            ResourceKind::Worker => "worker",
            ResourceKind::Tool => "tool",
            ResourceKind::Transport => "transport",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Energy => "energy",
        };
        write!(f, "{name}")
    }
}

/// A named, typed, quantity-bearing resource.
///
/// Quantity is always non-negative. Mutation happens only through
/// [`Resource::consume`] and [`Resource::produce`]; the engine's pools wrap
/// these with the request/release protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identifier.
    pub id: crate::PoolId,
    /// Human-readable name, matched by requirements.
    pub display_name: String,
    /// Resource category.
    pub kind: ResourceKind,
    /// Current amount on hand.
    quantity: f64,
    /// Unit of measure ("kg", "pieces", "slots", ...).
    pub unit: String,
    /// Whether the resource can currently be used at all.
    pub available: bool,
    /// Open property bag for collaborator-specific data.
    pub properties: BTreeMap<String, Value>,
}

impl Resource {
    /// Create a resource with an initial quantity.
    ///
    /// Negative initial quantities are clamped to zero.
    pub fn new(
        id: impl Into<crate::PoolId>,
        display_name: impl Into<String>,
        kind: ResourceKind,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            quantity: quantity.max(0.0),
            unit: unit.into(),
            available: true,
            properties: BTreeMap::new(),
        }
    }

    /// Current quantity on hand.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Remove `amount` from the resource.
    ///
    /// Fails without mutating when the resource is unavailable, the amount is
    /// negative, or more than the current quantity is asked for.
    pub fn consume(&mut self, amount: f64) -> Result<(), ResourceError> {
        if !self.available {
            return Err(ResourceError::Unavailable {
                id: self.id.clone(),
            });
        }
        if amount < 0.0 {
            return Err(ResourceError::NegativeAmount { amount });
        }
        if amount > self.quantity {
            return Err(ResourceError::InsufficientQuantity {
                id: self.id.clone(),
                requested: amount,
                available: self.quantity,
            });
        }
        self.quantity -= amount;
        Ok(())
    }

    /// Add `amount` to the resource.
    pub fn produce(&mut self, amount: f64) -> Result<(), ResourceError> {
        if amount < 0.0 {
            return Err(ResourceError::NegativeAmount { amount });
        }
        self.quantity += amount;
        Ok(())
    }

    /// Read a property from the open bag.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Set a property in the open bag.
    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }
}

/// Declarative statement that a process needs `amount` of a resource.
///
/// Satisfied by a resource of the same kind and name with sufficient
/// quantity. Carries no acquisition logic of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequirement {
    /// Required resource category.
    pub kind: ResourceKind,
    /// Name the resource must match.
    pub name: String,
    /// How much is needed (slots for slot kinds, quantity otherwise).
    pub amount: f64,
    /// Mandatory requirements fail validation when unsatisfiable;
    /// optional ones only produce a warning.
    pub mandatory: bool,
}

impl ResourceRequirement {
    /// Create a mandatory requirement.
    pub fn mandatory(kind: ResourceKind, name: impl Into<String>, amount: f64) -> Self {
        Self {
            kind,
            name: name.into(),
            amount,
            mandatory: true,
        }
    }

    /// Create an optional requirement.
    pub fn optional(kind: ResourceKind, name: impl Into<String>, amount: f64) -> Self {
        Self {
            kind,
            name: name.into(),
            amount,
            mandatory: false,
        }
    }

    /// Whether `resource` can satisfy this requirement right now.
    pub fn is_satisfied_by(&self, resource: &Resource) -> bool {
        resource.kind == self.kind
            && resource.display_name == self.name
            && resource.available
            && resource.quantity() >= self.amount
    }
}

impl fmt::Display for ResourceRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} x{}", self.kind, self.name, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steel() -> Resource {
        Resource::new("steel", "steel", ResourceKind::RawMaterial, 100.0, "kg")
    }

    #[test]
    fn test_consume_within_quantity() {
        let mut r = steel();
        r.consume(40.0).unwrap();
        assert_eq!(r.quantity(), 60.0);
    }

    #[test]
    fn test_consume_more_than_available_fails_without_mutation() {
        let mut r = steel();
        let err = r.consume(150.0).unwrap_err();
        assert!(matches!(err, ResourceError::InsufficientQuantity { .. }));
        assert_eq!(r.quantity(), 100.0);
    }

    #[test]
    fn test_consume_unavailable_fails() {
        let mut r = steel();
        r.available = false;
        assert!(matches!(
            r.consume(1.0),
            Err(ResourceError::Unavailable { .. })
        ));
        assert_eq!(r.quantity(), 100.0);
    }

    #[test]
    fn test_produce_then_consume_round_trip() {
        let mut r = steel();
        r.consume(30.0).unwrap();
        r.produce(30.0).unwrap();
        assert_eq!(r.quantity(), 100.0);
    }

    #[test]
    fn test_requirement_satisfaction() {
        let r = steel();
        let ok = ResourceRequirement::mandatory(ResourceKind::RawMaterial, "steel", 50.0);
        let too_much = ResourceRequirement::mandatory(ResourceKind::RawMaterial, "steel", 150.0);
        let wrong_kind = ResourceRequirement::mandatory(ResourceKind::Machine, "steel", 1.0);

        assert!(ok.is_satisfied_by(&r));
        assert!(!too_much.is_satisfied_by(&r));
        assert!(!wrong_kind.is_satisfied_by(&r));
    }

    #[test]
    fn test_property_bag_round_trip() {
        let mut r = steel();
        assert!(r.property("supplier").is_none());
        r.set_property("supplier", serde_json::json!("acme"));
        assert_eq!(r.property("supplier"), Some(&serde_json::json!("acme")));
    }

    #[test]
    fn test_slot_kind_classification() {
        assert!(ResourceKind::Machine.is_slot_kind());
        assert!(ResourceKind::Worker.is_slot_kind());
        assert!(!ResourceKind::RawMaterial.is_slot_kind());
        assert!(!ResourceKind::Energy.is_slot_kind());
    }
}
