use sha2::{Digest, Sha256};

use super::domain::{GarmentId, OutfitId, OutfitSlot};

const PAIR_SEPARATOR: &str = "|";

/// Derive the outfit identifier from its filled slot assignments.
///
/// Pairs are rendered as `<slot>:<garment id>`, sorted by slot name and
/// joined with `|` before hashing, so iteration order never matters. An empty
/// outfit hashes the empty string.
pub fn outfit_identifier<I>(assignments: I) -> OutfitId
where
    I: IntoIterator<Item = (OutfitSlot, GarmentId)>,
{
    let mut pairs: Vec<(&'static str, GarmentId)> = assignments
        .into_iter()
        .map(|(slot, garment)| (slot.key(), garment))
        .collect();
    pairs.sort_by(|left, right| left.0.cmp(right.0));

    let canonical = pairs
        .iter()
        .map(|(slot, garment)| format!("{slot}:{garment}"))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR);

    let digest = Sha256::digest(canonical.as_bytes());
    OutfitId(format!("{digest:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_sha256(input: &str) -> String {
        format!("{:x}", Sha256::digest(input.as_bytes()))
    }

    #[test]
    fn empty_outfit_hashes_empty_string() {
        let id = outfit_identifier(std::iter::empty());
        assert_eq!(
            id.0,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_form_sorts_slot_names() {
        let id = outfit_identifier([
            (OutfitSlot::Top, GarmentId(7)),
            (OutfitSlot::Bottom, GarmentId(3)),
            (OutfitSlot::Footwear, GarmentId(12)),
        ]);
        assert_eq!(id.0, hex_sha256("bottom:3|footwear:12|top:7"));
        assert_eq!(id.0.len(), 64);
    }

    #[test]
    fn identifier_ignores_assignment_order() {
        let forward = outfit_identifier([
            (OutfitSlot::Dress, GarmentId(4)),
            (OutfitSlot::Jacket, GarmentId(9)),
            (OutfitSlot::Footwear, GarmentId(2)),
        ]);
        let reversed = outfit_identifier([
            (OutfitSlot::Footwear, GarmentId(2)),
            (OutfitSlot::Jacket, GarmentId(9)),
            (OutfitSlot::Dress, GarmentId(4)),
        ]);
        assert_eq!(forward, reversed);
        assert_eq!(
            forward,
            outfit_identifier([
                (OutfitSlot::Dress, GarmentId(4)),
                (OutfitSlot::Jacket, GarmentId(9)),
                (OutfitSlot::Footwear, GarmentId(2)),
            ])
        );
    }

    #[test]
    fn different_assignments_produce_different_identifiers() {
        let base = outfit_identifier([(OutfitSlot::Top, GarmentId(1))]);
        let other_garment = outfit_identifier([(OutfitSlot::Top, GarmentId(2))]);
        let other_slot = outfit_identifier([(OutfitSlot::Jacket, GarmentId(1))]);
        let extra_slot = outfit_identifier([
            (OutfitSlot::Top, GarmentId(1)),
            (OutfitSlot::Bottom, GarmentId(1)),
        ]);

        assert_ne!(base, other_garment);
        assert_ne!(base, other_slot);
        assert_ne!(base, extra_slot);
    }
}
