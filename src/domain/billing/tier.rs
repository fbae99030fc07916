//! Plan tiers and the price-to-tier catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named subscription plan level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Apprentice study plan.
    Apprentice,
    /// Qualified electrician plan.
    Electrician,
    /// Employer / business plan.
    Employer,
    /// Sentinel for price ids not present in the catalog.
    ///
    /// Entitlement is still granted for unknown prices; the label is
    /// imprecise and should be investigated, not a reason to drop the event.
    Unknown,
}

impl Tier {
    /// Parse a tier from its storage string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "apprentice" => Self::Apprentice,
            "electrician" => Self::Electrician,
            "employer" => Self::Employer,
            _ => Self::Unknown,
        }
    }

    /// Storage / display string for the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apprentice => "apprentice",
            Self::Electrician => "electrician",
            Self::Employer => "employer",
            Self::Unknown => "unknown",
        }
    }
}

/// Versioned price-id to tier lookup, injected at startup.
///
/// Historical price ids are never removed: existing subscribers keep
/// resolving against the price they originally purchased.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    version: u32,
    entries: HashMap<String, Tier>,
}

impl PriceCatalog {
    /// Creates an empty catalog with the given version.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            entries: HashMap::new(),
        }
    }

    /// Builds a catalog from (price id, tier) pairs.
    pub fn from_entries<I>(version: u32, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Tier)>,
    {
        Self {
            version,
            entries: entries.into_iter().collect(),
        }
    }

    /// Adds a mapping. Later insertions win for the same price id.
    pub fn insert(&mut self, price_id: impl Into<String>, tier: Tier) {
        self.entries.insert(price_id.into(), tier);
    }

    /// Resolves a price id to a tier, falling back to the Unknown sentinel.
    pub fn resolve(&self, price_id: Option<&str>) -> Tier {
        price_id
            .and_then(|id| self.entries.get(id).copied())
            .unwrap_or(Tier::Unknown)
    }

    /// Catalog version, for logging and diagnostics.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of mapped price ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no prices are mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
