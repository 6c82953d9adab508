use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::identity::outfit_identifier;

/// Catalog-assigned garment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GarmentId(pub i64);

impl fmt::Display for GarmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic outfit identifier (hex SHA-256 of the slot assignments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutfitId(pub String);

impl fmt::Display for OutfitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A garment as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garment {
    pub id: GarmentId,
    pub category: String,
    pub color: String,
    pub material: String,
    pub occasion: String,
    pub image_url: String,
}

/// Creation payload for a catalog entry. The image is expected to be hosted
/// already; uploads are handled outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGarment {
    pub category: String,
    pub color: String,
    pub material: String,
    pub occasion: String,
    pub image_url: String,
}

/// Fixed outfit positions. Each slot draws from exactly one catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutfitSlot {
    Top,
    Bottom,
    Dress,
    Jacket,
    Footwear,
}

impl OutfitSlot {
    pub const ALL: [OutfitSlot; 5] = [
        OutfitSlot::Top,
        OutfitSlot::Bottom,
        OutfitSlot::Dress,
        OutfitSlot::Jacket,
        OutfitSlot::Footwear,
    ];

    /// Name used in responses and in the outfit identifier.
    pub fn key(self) -> &'static str {
        match self {
            OutfitSlot::Top => "top",
            OutfitSlot::Bottom => "bottom",
            OutfitSlot::Dress => "dress",
            OutfitSlot::Jacket => "jacket",
            OutfitSlot::Footwear => "footwear",
        }
    }

    /// Catalog category this slot is filled from.
    pub fn category(self) -> &'static str {
        match self {
            OutfitSlot::Top => "top",
            OutfitSlot::Bottom => "bottom",
            OutfitSlot::Dress => "dress",
            OutfitSlot::Jacket => "jacket",
            OutfitSlot::Footwear => "footwear",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.key().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for OutfitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Inbound recommendation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub occasion: String,
    /// Accepted for wire compatibility; slot categories always come from the
    /// slot table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub keywords: Vec<String>,
}

impl RecommendationRequest {
    pub fn for_occasion(occasion: impl Into<String>) -> Self {
        Self {
            occasion: occasion.into(),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Value snapshot of the garment chosen for a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitItem {
    pub id: GarmentId,
    pub color: String,
    pub material: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl OutfitItem {
    pub fn from_garment(garment: &Garment, labels: Vec<String>) -> Self {
        Self {
            id: garment.id,
            color: garment.color.clone(),
            material: garment.material.clone(),
            image_url: garment.image_url.clone(),
            labels,
        }
    }
}

/// Assembled recommendation. Never persisted; ratings reference it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outfit {
    pub outfit_id: OutfitId,
    pub weather: String,
    pub occasion: String,
    pub items: BTreeMap<OutfitSlot, OutfitItem>,
}

impl Outfit {
    pub fn assemble(
        occasion: String,
        weather: String,
        items: BTreeMap<OutfitSlot, OutfitItem>,
    ) -> Self {
        let outfit_id = outfit_identifier(items.iter().map(|(slot, item)| (*slot, item.id)));
        Self {
            outfit_id,
            weather,
            occasion,
            items,
        }
    }

    pub fn garment_ids(&self) -> Vec<GarmentId> {
        self.items.values().map(|item| item.id).collect()
    }
}

/// Rating value constrained to 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Rating event for a previously recommended outfit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSubmission {
    #[serde(default, deserialize_with = "null_as_default")]
    pub outfit_id: String,
    pub rating: i64,
    /// Slot name to garment id, as returned in the outfit's `items`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: BTreeMap<String, GarmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One persisted per-garment rating row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub outfit_id: OutfitId,
    pub garment_id: GarmentId,
    pub rating: u8,
    pub user_id: Option<String>,
}

/// Request validation failures. Raised before any collaborator is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("occasion is required")]
    MissingOccasion,
    #[error("outfit_id is required")]
    MissingOutfitId,
    #[error("rating must be 1..5, got {0}")]
    RatingOutOfRange(i64),
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl NewGarment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("category", &self.category),
            ("color", &self.color),
            ("material", &self.material),
            ("occasion", &self.occasion),
            ("image_url", &self.image_url),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ValidationError::MissingField(name)),
            None => Ok(()),
        }
    }
}
