use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Read-only description of a listed property, copied into bookings and shortlists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub id: String,
    pub title: String,
    pub address: String,
    pub price: u64,
    pub price_per_sqm: u64,
    pub area: f32,
    pub floor: u8,
    #[serde(default)]
    pub completion_date: Option<String>,
    pub developer: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// The concrete unit being reserved inside a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApartmentRef {
    pub id: String,
    pub rooms: u8,
    pub building: String,
}

/// Property lookup collaborator. Consulted once, when a booking is created.
pub trait PropertyCatalog: Send + Sync {
    fn lookup(&self, property_id: &str) -> Option<PropertySnapshot>;
}

/// Fixed in-memory catalog for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    properties: HashMap<String, PropertySnapshot>,
}

impl StaticCatalog {
    pub fn new(properties: impl IntoIterator<Item = PropertySnapshot>) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|property| (property.id.clone(), property))
                .collect(),
        }
    }

    pub fn insert(&mut self, property: PropertySnapshot) {
        self.properties.insert(property.id.clone(), property);
    }
}

impl PropertyCatalog for StaticCatalog {
    fn lookup(&self, property_id: &str) -> Option<PropertySnapshot> {
        self.properties.get(property_id).cloned()
    }
}
