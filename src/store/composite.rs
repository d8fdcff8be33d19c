//! Composite store merging several map files behind one query surface.

use rstar::{RTree, RTreeObject, AABB};

use super::single::SingleFileStore;
use crate::core::config::MergePolicy;
use crate::core::geo::{LatLng, LatLngBounds};
use crate::traits::MapDataStore;
use crate::LoadError;

/// R-tree entry pointing back at a member slot
#[derive(Debug, Clone)]
struct MemberEnvelope {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for MemberEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_envelope(bounds: &LatLngBounds) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [bounds.min_lng(), bounds.min_lat()],
        [bounds.max_lng(), bounds.max_lat()],
    )
}

pub struct CompositeStore {
    /// Sorted by bounding-box area, smallest first, then by name
    members: Vec<SingleFileStore>,
    policy: MergePolicy,
    index: RTree<MemberEnvelope>,
    bounding_box: LatLngBounds,
}

impl CompositeStore {
    pub fn new(mut members: Vec<SingleFileStore>, policy: MergePolicy) -> Result<Self, LoadError> {
        members.sort_by(|a, b| {
            a.bounding_box()
                .area()
                .total_cmp(&b.bounding_box().area())
                .then_with(|| a.name().cmp(b.name()))
        });

        let boxes: Vec<LatLngBounds> = members.iter().map(|m| m.bounding_box()).collect();
        let bounding_box = LatLngBounds::union_all(&boxes).ok_or(LoadError::NoDataAvailable)?;

        let index = RTree::bulk_load(
            boxes
                .iter()
                .enumerate()
                .map(|(slot, bounds)| MemberEnvelope {
                    slot,
                    envelope: to_envelope(bounds),
                })
                .collect(),
        );

        Ok(Self {
            members,
            policy,
            index,
            bounding_box,
        })
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl std::fmt::Debug for CompositeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeStore")
            .field("members", &self.members.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("bounding_box", &self.bounding_box)
            .finish()
    }
}

impl MapDataStore for CompositeStore {
    fn bounding_box(&self) -> LatLngBounds {
        self.bounding_box
    }

    fn start_position(&self) -> Option<LatLng> {
        self.members.iter().find_map(|m| m.start_position())
    }

    fn start_zoom_level(&self) -> Option<u8> {
        self.members.iter().find_map(|m| m.start_zoom_level())
    }

    fn zoom_range(&self) -> Option<(u8, u8)> {
        self.members
            .iter()
            .filter_map(|m| m.zoom_range())
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
    }

    fn members(&self) -> Vec<&SingleFileStore> {
        self.members.iter().collect()
    }

    fn locate(&self, area: &LatLngBounds) -> Vec<&SingleFileStore> {
        let mut slots: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&to_envelope(area))
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();

        match self.policy {
            MergePolicy::FirstMatch => slots
                .first()
                .map(|&slot| vec![&self.members[slot]])
                .unwrap_or_default(),
            MergePolicy::ReturnAll => slots.into_iter().map(|slot| &self.members[slot]).collect(),
        }
    }
}
