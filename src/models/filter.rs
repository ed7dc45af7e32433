//! Filter criteria over the catalog's recognized facets.

use serde::{Deserialize, Serialize};

/// One named dimension of filter criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Gender,
    Category,
    Season,
    BaseColour,
    Type,
    Style1,
    Style2,
}

impl Facet {
    pub const ALL: [Facet; 7] = [
        Facet::Gender,
        Facet::Category,
        Facet::Season,
        Facet::BaseColour,
        Facet::Type,
        Facet::Style1,
        Facet::Style2,
    ];

    /// Query parameter name understood by the catalog service.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Facet::Gender => "gender",
            Facet::Category => "category",
            Facet::Season => "season",
            Facet::BaseColour => "basecolour",
            Facet::Type => "type",
            Facet::Style1 => "style1",
            Facet::Style2 => "style2",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|facet| facet.wire_name() == name)
    }
}

/// Constraint per facet. `None` means "no constraint"; `Some("")` is a real constraint on
/// the empty string and is kept distinct from absence.
///
/// Equality compares every facet, which is what decides whether a queue must be reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basecolour: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style2: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for setting one facet.
    pub fn with(mut self, facet: Facet, value: impl Into<String>) -> Self {
        self.set(facet, value);
        self
    }

    pub fn get(&self, facet: Facet) -> Option<&str> {
        self.slot(facet).as_deref()
    }

    pub fn set(&mut self, facet: Facet, value: impl Into<String>) {
        *self.slot_mut(facet) = Some(value.into());
    }

    pub fn clear(&mut self, facet: Facet) {
        *self.slot_mut(facet) = None;
    }

    /// True when no facet is constrained.
    pub fn is_empty(&self) -> bool {
        Facet::ALL.iter().all(|facet| self.slot(*facet).is_none())
    }

    /// Present facets as `(wire name, value)` pairs, in facet declaration order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        Facet::ALL
            .iter()
            .filter_map(|facet| self.get(*facet).map(|value| (facet.wire_name(), value)))
            .collect()
    }

    fn slot(&self, facet: Facet) -> &Option<String> {
        match facet {
            Facet::Gender => &self.gender,
            Facet::Category => &self.category,
            Facet::Season => &self.season,
            Facet::BaseColour => &self.basecolour,
            Facet::Type => &self.kind,
            Facet::Style1 => &self.style1,
            Facet::Style2 => &self.style2,
        }
    }

    fn slot_mut(&mut self, facet: Facet) -> &mut Option<String> {
        match facet {
            Facet::Gender => &mut self.gender,
            Facet::Category => &mut self.category,
            Facet::Season => &mut self.season,
            Facet::BaseColour => &mut self.basecolour,
            Facet::Type => &mut self.kind,
            Facet::Style1 => &mut self.style1,
            Facet::Style2 => &mut self.style2,
        }
    }
}
