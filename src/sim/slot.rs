//! Spawn slots on the desk
//!
//! A slot holds at most one target at a time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::targets::TargetId;
use crate::consts::SLOT_SPACING;
use crate::tuning::SlotPosition;

/// A fixed spawn position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub index: usize,
    /// World position of the slot opening (y = 0 is the desk surface)
    pub position: Vec3,
    occupant: Option<TargetId>,
}

impl Slot {
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Target currently standing in this slot
    pub fn occupant(&self) -> Option<TargetId> {
        self.occupant
    }
}

/// All slots, in layout order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotGrid {
    slots: Vec<Slot>,
}

impl SlotGrid {
    pub fn new(layout: &[SlotPosition]) -> Self {
        let slots = layout
            .iter()
            .enumerate()
            .map(|(index, pos)| Slot {
                index,
                position: Vec3::new(pos.x * SLOT_SPACING, 0.0, pos.z * SLOT_SPACING),
                occupant: None,
            })
            .collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Indices of all free slots, in layout order
    pub fn available(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|s| !s.is_occupied())
            .map(|s| s.index)
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    /// Claim a free slot. Returns false if it is already taken.
    pub fn occupy(&mut self, index: usize, target: TargetId) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.occupant.is_none() => {
                slot.occupant = Some(target);
                true
            }
            _ => false,
        }
    }

    /// Free a slot, but only if `target` is the one holding it
    pub fn release(&mut self, index: usize, target: TargetId) {
        if let Some(slot) = self.slots.get_mut(index)
            && slot.occupant == Some(target)
        {
            slot.occupant = None;
        }
    }

    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.occupant = None;
        }
    }
}
