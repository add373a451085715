//! Granular silo: grains fall through the bottom opening under gravity and
//! are recycled into a row of respawn slots above the silo.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::error::SimulationError;
use crate::simulation::engine::NeighbourStrategy;
use crate::simulation::forces::{gravity_force, ContactLaw, ForceSet, Gravity, ParticleContacts, WallContacts, G};
use crate::simulation::integrator::{Evaluation, Fate, GearModel};
use crate::simulation::neighbours::{Neighbours, NeighboursFinder};
use crate::simulation::params::SiloParameters;
use crate::simulation::population::{observe_flow, Lifecycle, Population};
use crate::simulation::states::{NVec2, Particle, ParticleId, RunContext, Wall};

/// Row of equally spaced respawn slots.
///
/// A slot is handed out only while nobody occupies it. Respawned particles
/// keep the slots under them marked until they fall clear of the row.
#[derive(Debug, Clone)]
pub struct RespawnArea {
    cell_size: f64,
    y: f64, // height of the slot centres
    slots_x: Vec<f64>,
    occupancy: Vec<u32>,
    free: VecDeque<usize>, // insertion order, may hold stale entries
    queued: Vec<bool>,
    tracked: HashMap<ParticleId, Vec<usize>>,
}

impl RespawnArea {
    pub fn new(params: &SiloParameters) -> Self {
        let cell_size = 1.1 * 2.0 * params.max_radius();
        let y = (params.respawn_min_y() + params.respawn_max_y()) / 2.0;

        let mut slots_x = Vec::new();
        let mut x = cell_size / 2.0;
        while cell_size > 0.0 && x < params.width - cell_size / 2.0 {
            slots_x.push(x);
            x += cell_size;
        }

        let n = slots_x.len();
        Self {
            cell_size,
            y,
            slots_x,
            occupancy: vec![0; n],
            free: (0..n).collect(),
            queued: vec![true; n],
            tracked: HashMap::new(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots_x.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().filter(|&&c| c > 0).count()
    }

    pub fn occupancy(&self, slot: usize) -> u32 {
        self.occupancy[slot]
    }

    pub fn slot_position(&self, slot: usize) -> NVec2 {
        NVec2::new(self.slots_x[slot], self.y)
    }

    pub fn is_tracking(&self, id: ParticleId) -> bool {
        self.tracked.contains_key(&id)
    }

    pub fn tracked_ids(&self) -> Vec<ParticleId> {
        let mut ids: Vec<ParticleId> = self.tracked.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Drops stale queue entries and reports whether a slot can be claimed
    pub fn has_free(&mut self) -> bool {
        while let Some(&slot) = self.free.front() {
            if self.occupancy[slot] == 0 {
                return true;
            }
            self.free.pop_front();
            self.queued[slot] = false;
        }
        false
    }

    /// Hand the oldest free slot to `id`
    pub fn claim(&mut self, id: ParticleId) -> Option<NVec2> {
        if !self.has_free() {
            return None;
        }
        let slot = self.free.pop_front()?;
        self.queued[slot] = false;
        self.release(id);
        self.occupancy[slot] += 1;
        self.tracked.insert(id, vec![slot]);
        Some(self.slot_position(slot))
    }

    fn release(&mut self, id: ParticleId) {
        let Some(slots) = self.tracked.remove(&id) else {
            return;
        };
        for slot in slots {
            self.occupancy[slot] = self.occupancy[slot].saturating_sub(1);
            if self.occupancy[slot] == 0 && !self.queued[slot] {
                self.free.push_back(slot);
                self.queued[slot] = true;
            }
        }
    }

    /// Re-mark the slots under a tracked particle, or stop tracking it once
    /// it has fallen below the row
    pub fn update(&mut self, p: &Particle) {
        if !self.tracked.contains_key(&p.id) {
            return;
        }
        self.release(p.id);

        if p.position.y + p.radius < self.y - self.cell_size {
            return;
        }

        let n = self.slots_x.len();
        if n == 0 {
            return;
        }
        let col = ((p.position.x / self.cell_size).floor().max(0.0) as usize).min(n - 1);
        let mut slots = vec![col];
        if col > 0 && p.position.x - p.radius < col as f64 * self.cell_size {
            slots.push(col - 1);
        } else if col + 1 < n && p.position.x + p.radius > (col + 1) as f64 * self.cell_size {
            slots.push(col + 1);
        }
        for &slot in &slots {
            self.occupancy[slot] += 1;
        }
        self.tracked.insert(p.id, slots);
    }

    /// Forget a particle that left the system
    pub fn forget(&mut self, id: ParticleId) {
        self.release(id);
    }
}

pub struct GranularSilo {
    params: SiloParameters,
    walls: Vec<Wall>,
    finder: NeighbourStrategy,
    forces: ForceSet,
    respawn: RespawnArea,
}

impl GranularSilo {
    pub fn new(params: SiloParameters, walls: Vec<Wall>, finder: NeighbourStrategy) -> Self {
        let law = ContactLaw { kn: params.kn, kt: params.kt };
        let forces = ForceSet::new()
            .with(ParticleContacts { law })
            .with(WallContacts { law, walls: walls.clone() })
            .with(Gravity { g: G });
        let respawn = RespawnArea::new(&params);

        Self {
            params,
            walls,
            finder,
            forces,
            respawn,
        }
    }

    pub fn params(&self) -> &SiloParameters {
        &self.params
    }

    pub fn respawn_area(&self) -> &RespawnArea {
        &self.respawn
    }

    /// Move pending grains into free slots, oldest first
    fn respawn_pending(&mut self, population: &mut Population) {
        while population.pending_len() > 0 && self.respawn.has_free() {
            let Some(index) = population.pop_pending() else {
                break;
            };
            let old = population.slot(index).particle.clone();
            let Some(position) = self.respawn.claim(old.id) else {
                break;
            };

            let mut particle = old.with_motion(position, NVec2::zeros(), gravity_force(old.mass, G));
            particle.flowed_out = false;
            particle.normal_force = 0.0;

            let seed = self.seed_derivatives(&particle);
            population.reactivate(index, particle, seed);
            debug!("respawned particle {} at ({:.4}, {:.4})", old.id, position.x, position.y);
        }
    }
}

impl GearModel for GranularSilo {
    fn on_predicted(&self, predicted: &Particle) -> Fate {
        if predicted.mass > 0.0 && predicted.position.y < 0.0 {
            Fate::Exit
        } else {
            Fate::Stay
        }
    }

    fn on_evaluate(&self, predicted: &[Particle]) -> Result<Neighbours, SimulationError> {
        self.finder.find(predicted)
    }

    fn total_force(
        &self,
        index: usize,
        predicted: &[Particle],
        neighbours: &Neighbours,
    ) -> Result<Evaluation, SimulationError> {
        self.forces.evaluate(index, predicted, neighbours)
    }

    fn on_fixed(&mut self, fixed: &mut Particle, ctx: &mut RunContext) -> Fate {
        observe_flow(fixed, self.params.fall_length, ctx)
    }

    fn on_post_fix(&mut self, population: &mut Population, _ctx: &mut RunContext) {
        for id in self.respawn.tracked_ids() {
            match population.get(id) {
                Some(p) if population.is_active(id) => self.respawn.update(p),
                _ => self.respawn.forget(id),
            }
        }
        self.respawn_pending(population);
    }

    fn exit_lifecycle(&self) -> Lifecycle {
        Lifecycle::PendingRespawn
    }

    fn walls(&self) -> &[Wall] {
        &self.walls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::ParticleKind;

    fn params() -> SiloParameters {
        SiloParameters::granular(50, 1.0, 3.0, 0.5, 0.01, 1e5, 2e5).unwrap()
    }

    #[test]
    fn slots_span_the_width() {
        let area = RespawnArea::new(&params());
        let cell = 1.1 * 0.1;
        assert!(area.slot_count() > 0);
        assert!((area.slot_position(0).x - cell / 2.0).abs() < 1e-12);
        let last = area.slot_position(area.slot_count() - 1).x;
        assert!(last < 1.0 - cell / 2.0);
    }

    #[test]
    fn claims_follow_insertion_order() {
        let mut area = RespawnArea::new(&params());
        let a = area.claim(ParticleId(1)).unwrap();
        let b = area.claim(ParticleId(2)).unwrap();
        assert!(a.x < b.x);
        assert_eq!(area.occupied_count(), 2);
    }

    #[test]
    fn slot_frees_once_particle_clears_the_row() {
        let p = params();
        let mut area = RespawnArea::new(&p);
        let pos = area.claim(ParticleId(1)).unwrap();

        let mut grain = Particle::new(ParticleId(1), ParticleKind::Ordinary, pos, 0.04, 0.01);
        area.update(&grain);
        assert_eq!(area.occupancy(0), 1);

        grain.position.y -= 1.0;
        area.update(&grain);
        assert_eq!(area.occupied_count(), 0);
        assert!(!area.is_tracking(ParticleId(1)));
    }
}
