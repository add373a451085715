//! Slot arena owning every particle of a run together with its
//! integrator history. Slots are never removed, a particle that leaves the
//! system only changes its `Lifecycle`, so indices stay stable and respawn
//! simply reuses the slot.

use std::collections::{HashMap, VecDeque};

use crate::simulation::integrator::{Derivatives, Fate};
use crate::simulation::states::{NVec2, Particle, ParticleId, RunContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    PendingRespawn, // waiting for a free respawn slot
    Retired, // left the system for good
}

/// Per-particle Gear bookkeeping
#[derive(Debug, Clone)]
pub struct GearState {
    pub current: Derivatives,
    pub predicted: Derivatives,
    pub delta_r2: NVec2,
}

impl GearState {
    pub fn seeded(current: Derivatives) -> Self {
        Self {
            current,
            predicted: current,
            delta_r2: NVec2::zeros(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub particle: Particle,
    pub lifecycle: Lifecycle,
    pub gear: GearState,
}

#[derive(Debug, Clone, Default)]
pub struct Population {
    slots: Vec<Slot>,
    by_id: HashMap<ParticleId, usize>,
    pending: VecDeque<usize>, // oldest exit first
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, particle: Particle, seed: Derivatives) -> usize {
        let index = self.slots.len();
        self.by_id.insert(particle.id, index);
        self.slots.push(Slot {
            particle,
            lifecycle: Lifecycle::Active,
            gear: GearState::seeded(seed),
        });
        index
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut Slot {
        &mut self.slots[index]
    }

    pub fn index_of(&self, id: ParticleId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.index_of(id).map(|i| &self.slots[i].particle)
    }

    pub fn is_active(&self, id: ParticleId) -> bool {
        self.index_of(id)
            .map(|i| self.slots[i].lifecycle == Lifecycle::Active)
            .unwrap_or(false)
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.lifecycle == Lifecycle::Active)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &Particle> {
        self.slots
            .iter()
            .filter(|s| s.lifecycle == Lifecycle::Active)
            .map(|s| &s.particle)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Take a particle out of the active set
    pub fn retire(&mut self, index: usize, lifecycle: Lifecycle) {
        self.slots[index].lifecycle = lifecycle;
        if lifecycle == Lifecycle::PendingRespawn {
            self.pending.push_back(index);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pop_pending(&mut self) -> Option<usize> {
        self.pending.pop_front()
    }

    /// Bring a pending slot back with a new state and fresh history
    pub fn reactivate(&mut self, index: usize, particle: Particle, seed: Derivatives) {
        let slot = &mut self.slots[index];
        slot.particle = particle;
        slot.lifecycle = Lifecycle::Active;
        slot.gear = GearState::seeded(seed);
    }
}

/// Flow-out bookkeeping shared by both variants.
///
/// The first time a particle drops below `fall_length` it is counted as
/// flowed; once below the floor it leaves the system.
pub fn observe_flow(p: &mut Particle, fall_length: f64, ctx: &mut RunContext) -> Fate {
    if p.mass == 0.0 {
        return Fate::Stay;
    }
    if !p.flowed_out && p.position.y < fall_length {
        p.flowed_out = true;
        ctx.record_flow();
    }
    if p.position.y < 0.0 {
        Fate::Exit
    } else {
        Fate::Stay
    }
}
