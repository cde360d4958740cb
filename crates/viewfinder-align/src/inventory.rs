//! Inventory capability.
//!
//! Each level keeps its pictures in its own capacity-limited inventory. The
//! engine does not care which one: it only asks whether an item is held and
//! removes it from whichever inventory holds it.

use viewfinder_common::InventorySpec;

/// What the engine needs from an inventory
pub trait InventoryProvider {
    fn name(&self) -> &str;

    fn capacity(&self) -> usize;

    fn contains(&self, item: &str) -> bool;

    /// Remove one copy of `item`. Returns false when it was not held.
    fn remove(&mut self, item: &str) -> bool;
}

/// Fixed number of slots, each holding at most one item
#[derive(Debug, Clone)]
pub struct SlotInventory {
    name: String,
    slots: Vec<Option<String>>,
}

impl SlotInventory {
    pub fn new(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            slots: vec![None; capacity],
        }
    }

    pub fn from_spec(spec: &InventorySpec) -> Self {
        let mut inv = Self::new(&spec.name, spec.capacity);
        for item in &spec.items {
            if inv.add(item).is_none() {
                tracing::warn!("Inventory '{}' full, dropped '{}'", spec.name, item);
            }
        }
        inv
    }

    /// Put an item in the first free slot, returning the slot index
    pub fn add(&mut self, item: &str) -> Option<usize> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(item.to_string());
        Some(idx)
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    pub fn len(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

impl InventoryProvider for SlotInventory {
    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn contains(&self, item: &str) -> bool {
        self.items().any(|i| i == item)
    }

    fn remove(&mut self, item: &str) -> bool {
        match self.slots.iter_mut().find(|s| s.as_deref() == Some(item)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }
}

/// Every inventory variant in play, searched in registration order
#[derive(Default)]
pub struct Inventories {
    providers: Vec<Box<dyn InventoryProvider>>,
}

impl Inventories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[InventorySpec]) -> Self {
        let mut all = Self::new();
        for spec in specs {
            all.register(Box::new(SlotInventory::from_spec(spec)));
        }
        all
    }

    pub fn register(&mut self, provider: Box<dyn InventoryProvider>) {
        self.providers.push(provider);
    }

    /// Name of the inventory currently holding `item`
    pub fn holder(&self, item: &str) -> Option<&str> {
        self.providers
            .iter()
            .find(|p| p.contains(item))
            .map(|p| p.name())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl InventoryProvider for Inventories {
    fn name(&self) -> &str {
        "all"
    }

    fn capacity(&self) -> usize {
        self.providers.iter().map(|p| p.capacity()).sum()
    }

    fn contains(&self, item: &str) -> bool {
        self.providers.iter().any(|p| p.contains(item))
    }

    fn remove(&mut self, item: &str) -> bool {
        for provider in self.providers.iter_mut() {
            if provider.remove(item) {
                tracing::debug!("Removed '{}' from inventory '{}'", item, provider.name());
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_inventory_capacity() {
        let mut inv = SlotInventory::new("harbor", 2);
        assert_eq!(inv.add("A"), Some(0));
        assert_eq!(inv.add("B"), Some(1));
        assert!(inv.is_full());
        assert_eq!(inv.add("C"), None);
        assert!(inv.remove("A"));
        assert!(!inv.remove("A"));
        // Freed slot is reused
        assert_eq!(inv.add("C"), Some(0));
        assert_eq!(inv.items().collect::<Vec<_>>(), vec!["C", "B"]);
    }

    #[test]
    fn test_removal_hits_the_holding_inventory() {
        let mut all = Inventories::from_specs(&[
            InventorySpec {
                name: "harbor".to_string(),
                capacity: 3,
                items: vec!["Sunset".to_string()],
            },
            InventorySpec {
                name: "temple".to_string(),
                capacity: 1,
                items: vec!["Statue".to_string()],
            },
        ]);
        assert_eq!(all.capacity(), 4);
        assert_eq!(all.holder("Statue"), Some("temple"));
        assert!(all.remove("Statue"));
        assert!(!all.contains("Statue"));
        assert!(all.contains("Sunset"));
        assert!(!all.remove("Statue"));
    }

    #[test]
    fn test_overfull_spec_drops_extra_items() {
        let inv = SlotInventory::from_spec(&InventorySpec {
            name: "tiny".to_string(),
            capacity: 1,
            items: vec!["A".to_string(), "B".to_string()],
        });
        assert_eq!(inv.len(), 1);
        assert!(inv.contains("A"));
    }
}
