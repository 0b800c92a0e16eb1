//! Resource pools: capacity-bounded containers mediating contention.

use shopfloor_types::{PoolId, Resource, ResourceError, ResourceKind};

/// Reporting snapshot of one pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStatus {
    /// Total capacity (slot pools) or all-time peak quantity (quantity pools).
    pub capacity: f64,
    /// Capacity currently held by running processes (slot pools only).
    pub in_use: f64,
    /// Capacity or quantity available right now.
    pub available: f64,
    /// Whether the pool can be used at all.
    pub is_available: bool,
}

/// One named resource and the state needed to arbitrate demand for it.
///
/// Two flavors share this type:
///
/// - **slot pools** hold `1..k` identical slots (machines, workers, tools,
///   transports, buffers); slots are leased by `take` and returned by
///   `give_back`;
/// - **quantity pools** hold a divisible amount (raw material, energy,
///   products); `take` consumes permanently and `give_back` is production.
///
/// Waiting is not managed here: the runner keeps the global waiter queue so
/// a process can atomically acquire several pools at once. This type only
/// guards the quantity invariant (never negative, mutation only through
/// `take`/`give_back`/`consume`/`produce`).
#[derive(Debug)]
pub struct ResourcePool {
    resource: Resource,
    /// Total slots for slot-kind pools; tracks peak quantity otherwise.
    capacity: f64,
}

impl ResourcePool {
    /// Create a slot pool with `capacity` identical slots.
    pub fn slots(
        id: impl Into<PoolId>,
        name: impl Into<String>,
        kind: ResourceKind,
        capacity: u32,
    ) -> Self {
        let capacity = f64::from(capacity);
        Self {
            resource: Resource::new(id, name, kind, capacity, "slots"),
            capacity,
        }
    }

    /// Create a quantity pool holding a divisible amount.
    pub fn quantity(
        id: impl Into<PoolId>,
        name: impl Into<String>,
        kind: ResourceKind,
        amount: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            resource: Resource::new(id, name, kind, amount, unit),
            capacity: amount.max(0.0),
        }
    }

    /// Pool identifier.
    pub fn id(&self) -> &PoolId {
        &self.resource.id
    }

    /// Name matched by requirements.
    pub fn name(&self) -> &str {
        &self.resource.display_name
    }

    /// Resource category.
    pub fn kind(&self) -> ResourceKind {
        self.resource.kind
    }

    /// Whether this pool leases slots rather than consuming quantity.
    pub fn is_slot_pool(&self) -> bool {
        self.resource.kind.is_slot_kind()
    }

    /// Amount available right now.
    pub fn available(&self) -> f64 {
        if self.resource.available {
            self.resource.quantity()
        } else {
            0.0
        }
    }

    /// Mark the pool usable / unusable (maintenance windows).
    pub fn set_available(&mut self, available: bool) {
        self.resource.available = available;
    }

    /// Whether a request for `amount` could ever be granted.
    ///
    /// Slot pools are bounded by capacity; quantity pools can always grow
    /// through production, so only unavailability rules them out.
    pub fn can_ever_satisfy(&self, amount: f64) -> bool {
        if !self.resource.available {
            return false;
        }
        if self.is_slot_pool() {
            amount <= self.capacity
        } else {
            true
        }
    }

    /// Whether a request for `amount` can be granted right now.
    pub fn can_satisfy_now(&self, amount: f64) -> bool {
        self.available() >= amount
    }

    /// Remove `amount` (grant or direct consumption).
    pub fn consume(&mut self, amount: f64) -> Result<(), ResourceError> {
        self.resource.consume(amount)
    }

    /// Add `amount` back (slot release or production).
    pub fn produce(&mut self, amount: f64) -> Result<(), ResourceError> {
        self.resource.produce(amount)?;
        if self.resource.quantity() > self.capacity {
            // Quantity pools grow their recorded peak; slot pools never
            // receive back more than was taken.
            self.capacity = self.resource.quantity();
        }
        Ok(())
    }

    /// Reporting snapshot.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            capacity: self.capacity,
            in_use: if self.is_slot_pool() {
                self.capacity - self.resource.quantity()
            } else {
                0.0
            },
            available: self.available(),
            is_available: self.resource.available,
        }
    }

    /// The underlying resource (read-only).
    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_pool_lease_and_return() {
        let mut pool = ResourcePool::slots("press", "press", ResourceKind::Machine, 2);
        assert!(pool.can_satisfy_now(2.0));
        pool.consume(2.0).unwrap();
        assert_eq!(pool.available(), 0.0);
        assert_eq!(pool.status().in_use, 2.0);

        pool.produce(1.0).unwrap();
        assert_eq!(pool.available(), 1.0);
        assert_eq!(pool.status().in_use, 1.0);
    }

    #[test]
    fn test_quantity_pool_conservation() {
        let mut pool =
            ResourcePool::quantity("steel", "steel", ResourceKind::RawMaterial, 120.0, "kg");
        pool.consume(50.0).unwrap();
        pool.produce(50.0).unwrap();
        assert_eq!(pool.available(), 120.0);
    }

    #[test]
    fn test_over_consume_fails_without_mutation() {
        let mut pool =
            ResourcePool::quantity("steel", "steel", ResourceKind::RawMaterial, 10.0, "kg");
        assert!(pool.consume(11.0).is_err());
        assert_eq!(pool.available(), 10.0);
    }

    #[test]
    fn test_unavailable_pool_grants_nothing() {
        let mut pool = ResourcePool::slots("press", "press", ResourceKind::Machine, 2);
        pool.set_available(false);
        assert_eq!(pool.available(), 0.0);
        assert!(!pool.can_ever_satisfy(1.0));
        assert!(pool.consume(1.0).is_err());
    }

    #[test]
    fn test_can_ever_satisfy_bounds() {
        let slot = ResourcePool::slots("press", "press", ResourceKind::Machine, 2);
        assert!(slot.can_ever_satisfy(2.0));
        assert!(!slot.can_ever_satisfy(3.0));

        // An empty quantity pool can still be replenished later.
        let qty = ResourcePool::quantity("steel", "steel", ResourceKind::RawMaterial, 0.0, "kg");
        assert!(qty.can_ever_satisfy(100.0));
        assert!(!qty.can_satisfy_now(1.0));
    }
}
