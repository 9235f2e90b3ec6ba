//! Target lifecycle
//!
//! Owns every on-screen target: which slot it occupies, where it is in its
//! rise/hold/fall/squash animation, and whether it can still be whacked.
//! All timing is driven by an internal clock advanced through [`TargetManager::update`],
//! so a paused session freezes its targets too.

use std::rc::Rc;

use glam::Vec2;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::pick::{HitTest, NullView, TargetBody, TargetPose, TargetView};
use super::slot::SlotGrid;
use crate::audio::{AudioSink, Cue};
use crate::consts::*;
use crate::tuning::{GameConfig, TargetKind};
use crate::{ease_in_quad, ease_out_back, lerp};

/// Unique id of a spawned target (never reused within a manager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u32);

/// Animation phase of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetPhase {
    /// Popping out of the slot (hittable)
    Rising,
    /// Fully raised, bobbing (hittable)
    Visible,
    /// Sinking back after its time ran out
    Falling,
    /// Whacked, squashing down
    Hit,
}

impl TargetPhase {
    /// Whether a whack can land in this phase
    pub fn is_hittable(&self) -> bool {
        matches!(self, TargetPhase::Rising | TargetPhase::Visible)
    }
}

/// A target currently on screen
#[derive(Debug, Clone)]
pub struct ActiveTarget {
    pub id: TargetId,
    /// Index into the slot grid
    pub slot: usize,
    pub kind: TargetKind,
    /// True if the player should hit it, false for decoys
    pub is_problem: bool,
    pub phase: TargetPhase,
    /// Clock time (ms) at spawn
    pub spawned_at: f64,
    /// Clock time (ms) the current phase began
    pub phase_started_at: f64,
    /// How long to stay raised (ms)
    pub visible_ms: f64,
    /// Set when a problem target's raised time runs out unhit
    pub escaped: bool,
    pub pose: TargetPose,
    /// Height when the hit landed (squash sinks from here)
    hit_height: f32,
}

impl ActiveTarget {
    /// Advance through as many phase boundaries as `now` has passed.
    /// Returns true once the target should be evicted.
    fn advance(&mut self, now: f64) -> bool {
        loop {
            let elapsed = now - self.phase_started_at;
            match self.phase {
                TargetPhase::Rising => {
                    if elapsed < RISE_MS {
                        let t = (elapsed / RISE_MS) as f32;
                        self.pose.height = lerp(HIDDEN_Y, RAISED_Y, ease_out_back(t));
                        return false;
                    }
                    self.enter(TargetPhase::Visible, self.phase_started_at + RISE_MS);
                }
                TargetPhase::Visible => {
                    if elapsed < self.visible_ms {
                        let bob = ((elapsed / BOB_PERIOD_MS).sin() as f32) * BOB_AMPLITUDE;
                        self.pose.height = RAISED_Y + bob;
                        return false;
                    }
                    if self.is_problem {
                        self.escaped = true;
                    }
                    self.enter(TargetPhase::Falling, self.phase_started_at + self.visible_ms);
                }
                TargetPhase::Falling => {
                    let t = (elapsed / FALL_MS).min(1.0) as f32;
                    self.pose.height = lerp(RAISED_Y, HIDDEN_Y, ease_in_quad(t));
                    return elapsed >= FALL_MS;
                }
                TargetPhase::Hit => {
                    let t = (elapsed / HIT_MS).min(1.0) as f32;
                    self.pose.squash = 1.0 - t * HIT_SQUASH;
                    self.pose.height = self.hit_height - HIT_SINK_SPEED * (t * (HIT_MS / 1000.0) as f32);
                    return elapsed >= HIT_MS;
                }
            }
        }
    }

    fn enter(&mut self, phase: TargetPhase, at: f64) {
        self.phase = phase;
        self.phase_started_at = at;
    }
}

/// A target that left the board this tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub id: TargetId,
    pub slot: usize,
    pub is_problem: bool,
    pub label: String,
    /// A problem that timed out unhit (counts as a miss)
    pub escaped: bool,
}

/// What a successful whack landed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitVerdict {
    pub id: TargetId,
    pub is_problem: bool,
    pub label: String,
}

/// Manages spawning, animation, hit-testing and eviction of targets
pub struct TargetManager {
    config: Rc<GameConfig>,
    audio: Rc<dyn AudioSink>,
    view: Box<dyn TargetView>,
    rng: Pcg32,
    slots: SlotGrid,
    /// Active targets, sorted by id
    targets: Vec<ActiveTarget>,
    /// Local clock (ms), advanced only by `update`
    clock_ms: f64,
    next_id: u32,
}

impl TargetManager {
    pub fn new(config: Rc<GameConfig>, audio: Rc<dyn AudioSink>, seed: u64) -> Self {
        let slots = SlotGrid::new(&config.slots);
        Self {
            config,
            audio,
            view: Box::new(NullView),
            rng: Pcg32::seed_from_u64(seed),
            slots,
            targets: Vec::new(),
            clock_ms: 0.0,
            next_id: 1,
        }
    }

    /// Attach the renderer that draws targets
    pub fn set_view(&mut self, view: Box<dyn TargetView>) {
        self.view = view;
    }

    pub fn slots(&self) -> &SlotGrid {
        &self.slots
    }

    pub fn active(&self) -> &[ActiveTarget] {
        &self.targets
    }

    pub fn active_count(&self) -> usize {
        self.targets.len()
    }

    pub fn get(&self, id: TargetId) -> Option<&ActiveTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Current clock (ms)
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Hittable volume of a target at its current pose
    pub fn body(&self, target: &ActiveTarget) -> Option<TargetBody> {
        self.slots
            .get(target.slot)
            .map(|slot| TargetBody::at(slot.position, target.pose))
    }

    /// Pop a new target out of a random free slot.
    ///
    /// Returns `None` (and does nothing) if every slot is taken.
    pub fn spawn_target(&mut self, problem_ratio: f64, visible_ms: u32) -> Option<TargetId> {
        let available = self.slots.available();
        let &slot = available.choose(&mut self.rng)?;

        let is_problem = self.rng.random::<f64>() < problem_ratio;
        let pool = if is_problem {
            &self.config.problems
        } else {
            &self.config.decoys
        };
        let kind = pool.choose(&mut self.rng)?.clone();

        let id = TargetId(self.next_id);
        self.next_id += 1;
        if !self.slots.occupy(slot, id) {
            return None;
        }

        let pose = TargetPose {
            height: HIDDEN_Y,
            squash: 1.0,
        };
        if let Some(slot_ref) = self.slots.get(slot) {
            self.view.show(id, slot_ref.position, &kind, is_problem);
        }
        log::debug!(
            "Spawned {} '{}' in slot {} ({} ms)",
            if is_problem { "problem" } else { "decoy" },
            kind.label,
            slot,
            visible_ms
        );

        self.targets.push(ActiveTarget {
            id,
            slot,
            kind,
            is_problem,
            phase: TargetPhase::Rising,
            spawned_at: self.clock_ms,
            phase_started_at: self.clock_ms,
            visible_ms: visible_ms as f64,
            escaped: false,
            pose,
            hit_height: HIDDEN_Y,
        });
        self.audio.play(Cue::Popup);

        Some(id)
    }

    /// Advance every target by `dt` seconds and evict the ones that finished.
    ///
    /// Each evicted target is reported exactly once.
    pub fn update(&mut self, dt: f32) -> Vec<Removal> {
        self.clock_ms += dt as f64 * 1000.0;
        let now = self.clock_ms;

        let mut finished = Vec::new();
        for target in &mut self.targets {
            if target.advance(now) {
                finished.push(target.id);
            } else {
                self.view.pose(target.id, target.phase, target.pose);
            }
        }

        finished
            .into_iter()
            .filter_map(|id| self.evict(id))
            .collect()
    }

    /// Hit-test a pointer position against every hittable target.
    ///
    /// The nearest intersected target is switched to `Hit` and its
    /// classification returned.
    pub fn check_hit(&mut self, point: Vec2, tester: &dyn HitTest) -> Option<HitVerdict> {
        let mut nearest: Option<(usize, f32)> = None;
        for (idx, target) in self.targets.iter().enumerate() {
            if !target.phase.is_hittable() {
                continue;
            }
            let Some(body) = self.body(target) else {
                continue;
            };
            if let Some(dist) = tester.intersect(point, &body)
                && nearest.is_none_or(|(_, best)| dist < best)
            {
                nearest = Some((idx, dist));
            }
        }

        let (idx, _) = nearest?;
        let now = self.clock_ms;
        let target = &mut self.targets[idx];
        target.hit_height = target.pose.height;
        target.enter(TargetPhase::Hit, now);
        self.view.hit(target.id, target.is_problem);
        log::debug!(
            "Whacked {} '{}'",
            if target.is_problem { "problem" } else { "decoy" },
            target.kind.label
        );

        Some(HitVerdict {
            id: target.id,
            is_problem: target.is_problem,
            label: target.kind.label.clone(),
        })
    }

    /// Evict every target immediately, whatever its phase
    pub fn clear_all(&mut self) -> usize {
        let count = self.targets.len();
        for target in self.targets.drain(..) {
            self.view.remove(target.id);
        }
        self.slots.release_all();
        if count > 0 {
            log::debug!("Cleared {} targets", count);
        }
        count
    }

    fn evict(&mut self, id: TargetId) -> Option<Removal> {
        let idx = self.targets.iter().position(|t| t.id == id)?;
        let target = self.targets.remove(idx);
        self.slots.release(target.slot, target.id);
        self.view.remove(target.id);
        if target.escaped {
            log::debug!("'{}' escaped", target.kind.label);
        }
        Some(Removal {
            id: target.id,
            slot: target.slot,
            is_problem: target.is_problem,
            label: target.kind.label,
            escaped: target.escaped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::audio::SilentAudio;
    use crate::audio::testing::RecordingAudio;

    /// Hits whatever target sits in the listed slots, at a fixed distance per slot
    struct SlotTester {
        grid: SlotGrid,
        distances: HashMap<usize, f32>,
    }

    impl SlotTester {
        fn new(distances: &[(usize, f32)]) -> Self {
            Self {
                grid: SlotGrid::new(&GameConfig::default().slots),
                distances: distances.iter().copied().collect(),
            }
        }
    }

    impl HitTest for SlotTester {
        fn intersect(&self, _point: Vec2, body: &TargetBody) -> Option<f32> {
            let slot = self.grid.iter().find(|s| {
                (s.position.x - body.center.x).abs() < 1e-4
                    && (s.position.z - body.center.z).abs() < 1e-4
            })?;
            self.distances.get(&slot.index).copied()
        }
    }

    /// Hits everything at the same distance
    struct Everywhere;

    impl HitTest for Everywhere {
        fn intersect(&self, _point: Vec2, _body: &TargetBody) -> Option<f32> {
            Some(1.0)
        }
    }

    #[derive(Default)]
    struct ViewLog {
        shown: Vec<TargetId>,
        removed: Vec<TargetId>,
        hits: Vec<(TargetId, bool)>,
    }

    struct SharedView(Rc<RefCell<ViewLog>>);

    impl TargetView for SharedView {
        fn show(&mut self, id: TargetId, _slot: glam::Vec3, _kind: &TargetKind, _p: bool) {
            self.0.borrow_mut().shown.push(id);
        }
        fn pose(&mut self, _id: TargetId, _phase: TargetPhase, _pose: TargetPose) {}
        fn hit(&mut self, id: TargetId, is_problem: bool) {
            self.0.borrow_mut().hits.push((id, is_problem));
        }
        fn remove(&mut self, id: TargetId) {
            self.0.borrow_mut().removed.push(id);
        }
    }

    fn manager(seed: u64) -> TargetManager {
        TargetManager::new(Rc::new(GameConfig::default()), Rc::new(SilentAudio), seed)
    }

    /// Step the clock in frame-sized chunks, collecting removals
    fn run_for(mgr: &mut TargetManager, ms: f64) -> Vec<Removal> {
        let mut removed = Vec::new();
        let mut left = ms;
        while left > 0.0 {
            let step = left.min(16.0);
            removed.extend(mgr.update((step / 1000.0) as f32));
            left -= step;
        }
        removed
    }

    #[test]
    fn test_spawn_occupies_slot_and_rises() {
        let audio = Rc::new(RecordingAudio::default());
        let mut mgr = TargetManager::new(Rc::new(GameConfig::default()), audio.clone(), 1);
        let id = mgr.spawn_target(1.0, 1000).unwrap();
        let target = mgr.get(id).unwrap();
        assert_eq!(target.phase, TargetPhase::Rising);
        assert!(target.is_problem);
        assert_eq!(mgr.slots().get(target.slot).unwrap().occupant(), Some(id));
        assert_eq!(audio.count(Cue::Popup), 1);
    }

    #[test]
    fn test_problem_ratio_selects_pool() {
        let config = GameConfig::default();
        let mut mgr = manager(2);
        for _ in 0..9 {
            mgr.spawn_target(0.0, 1000).unwrap();
        }
        for target in mgr.active() {
            assert!(!target.is_problem);
            assert!(config.decoys.contains(&target.kind));
        }

        let mut mgr = manager(3);
        for _ in 0..9 {
            mgr.spawn_target(1.0, 1000).unwrap();
        }
        for target in mgr.active() {
            assert!(target.is_problem);
            assert!(config.problems.contains(&target.kind));
        }
    }

    #[test]
    fn test_full_board_drops_spawn() {
        let mut mgr = manager(4);
        for _ in 0..9 {
            assert!(mgr.spawn_target(0.5, 1000).is_some());
        }
        assert!(mgr.spawn_target(0.5, 1000).is_none());
        assert_eq!(mgr.active_count(), 9);
        assert!(mgr.slots().available().is_empty());
    }

    #[test]
    fn test_rising_reaches_visible_then_falls() {
        let mut mgr = manager(5);
        let id = mgr.spawn_target(1.0, 500).unwrap();

        run_for(&mut mgr, 100.0);
        assert_eq!(mgr.get(id).unwrap().phase, TargetPhase::Rising);

        run_for(&mut mgr, 150.0);
        let target = mgr.get(id).unwrap();
        assert_eq!(target.phase, TargetPhase::Visible);
        assert!((target.pose.height - RAISED_Y).abs() <= BOB_AMPLITUDE + 1e-4);

        // 250 ms elapsed so far, raised at 200, falls at 700
        run_for(&mut mgr, 460.0);
        let target = mgr.get(id).unwrap();
        assert_eq!(target.phase, TargetPhase::Falling);
        assert!(target.escaped);
    }

    #[test]
    fn test_escaped_problem_reported_once() {
        let mut mgr = manager(6);
        mgr.spawn_target(1.0, 300).unwrap();
        let removed = run_for(&mut mgr, 2000.0);
        assert_eq!(removed.len(), 1);
        assert!(removed[0].escaped);
        assert!(removed[0].is_problem);
        assert_eq!(mgr.active_count(), 0);
        assert_eq!(mgr.slots().occupied_count(), 0);

        assert!(run_for(&mut mgr, 2000.0).is_empty());
    }

    #[test]
    fn test_decoy_never_escapes() {
        let mut mgr = manager(7);
        mgr.spawn_target(0.0, 300).unwrap();
        run_for(&mut mgr, 600.0);
        assert_eq!(mgr.active()[0].phase, TargetPhase::Falling);
        assert!(!mgr.active()[0].escaped);
        let removed = run_for(&mut mgr, 1000.0);
        assert_eq!(removed.len(), 1);
        assert!(!removed[0].escaped);
        assert!(!removed[0].is_problem);
    }

    #[test]
    fn test_single_large_step_runs_whole_lifecycle() {
        let mut mgr = manager(8);
        mgr.spawn_target(1.0, 1000).unwrap();
        let removed = mgr.update(5.0);
        assert_eq!(removed.len(), 1);
        assert!(removed[0].escaped);
    }

    #[test]
    fn test_rising_target_is_hittable() {
        let mut mgr = manager(9);
        let id = mgr.spawn_target(1.0, 1000).unwrap();
        run_for(&mut mgr, 50.0);
        let verdict = mgr.check_hit(Vec2::ZERO, &Everywhere).unwrap();
        assert_eq!(verdict.id, id);
        assert!(verdict.is_problem);
        assert_eq!(mgr.get(id).unwrap().phase, TargetPhase::Hit);
    }

    #[test]
    fn test_hit_target_cannot_be_hit_again() {
        let mut mgr = manager(10);
        mgr.spawn_target(1.0, 1000).unwrap();
        run_for(&mut mgr, 300.0);
        assert!(mgr.check_hit(Vec2::ZERO, &Everywhere).is_some());
        assert!(mgr.check_hit(Vec2::ZERO, &Everywhere).is_none());
    }

    #[test]
    fn test_falling_target_cannot_be_hit() {
        let mut mgr = manager(11);
        mgr.spawn_target(1.0, 100).unwrap();
        run_for(&mut mgr, 350.0);
        assert_eq!(mgr.active()[0].phase, TargetPhase::Falling);
        assert!(mgr.check_hit(Vec2::ZERO, &Everywhere).is_none());
    }

    #[test]
    fn test_hit_evicted_only_after_squash() {
        let mut mgr = manager(12);
        let id = mgr.spawn_target(1.0, 1000).unwrap();
        run_for(&mut mgr, 300.0);
        mgr.check_hit(Vec2::ZERO, &Everywhere).unwrap();

        assert!(run_for(&mut mgr, 190.0).is_empty());
        let squashed = mgr.get(id).unwrap();
        assert!(squashed.pose.squash < 0.3);
        assert!(squashed.pose.height < RAISED_Y);

        let removed = run_for(&mut mgr, 20.0);
        assert_eq!(removed.len(), 1);
        assert!(!removed[0].escaped);
    }

    #[test]
    fn test_hit_problem_does_not_escape_even_past_visible_time() {
        let mut mgr = manager(13);
        mgr.spawn_target(1.0, 250).unwrap();
        run_for(&mut mgr, 400.0);
        mgr.check_hit(Vec2::ZERO, &Everywhere).unwrap();
        let removed = run_for(&mut mgr, 1000.0);
        assert_eq!(removed.len(), 1);
        assert!(!removed[0].escaped);
    }

    #[test]
    fn test_nearest_target_wins() {
        let mut mgr = manager(14);
        for _ in 0..9 {
            mgr.spawn_target(0.5, 5000).unwrap();
        }
        run_for(&mut mgr, 300.0);

        let tester = SlotTester::new(&[(0, 9.0), (4, 3.0), (8, 6.0)]);
        let verdict = mgr.check_hit(Vec2::ZERO, &tester).unwrap();
        let hit = mgr.get(verdict.id).unwrap();
        assert_eq!(hit.slot, 4);

        // Next closest once slot 4 is out of play
        let verdict = mgr.check_hit(Vec2::ZERO, &tester).unwrap();
        assert_eq!(mgr.get(verdict.id).unwrap().slot, 8);
    }

    #[test]
    fn test_miss_returns_none() {
        let mut mgr = manager(15);
        mgr.spawn_target(1.0, 1000).unwrap();
        run_for(&mut mgr, 300.0);
        let tester = SlotTester::new(&[]);
        assert!(mgr.check_hit(Vec2::ZERO, &tester).is_none());
        assert_eq!(mgr.active()[0].phase, TargetPhase::Visible);
    }

    #[test]
    fn test_clear_all_frees_everything() {
        let log = Rc::new(RefCell::new(ViewLog::default()));
        let mut mgr = manager(16);
        mgr.set_view(Box::new(SharedView(log.clone())));
        for _ in 0..5 {
            mgr.spawn_target(0.5, 1000).unwrap();
        }
        run_for(&mut mgr, 300.0);
        mgr.check_hit(Vec2::ZERO, &Everywhere).unwrap();

        assert_eq!(mgr.clear_all(), 5);
        assert_eq!(mgr.active_count(), 0);
        assert_eq!(mgr.slots().available().len(), 9);

        let log = log.borrow();
        assert_eq!(log.shown.len(), 5);
        assert_eq!(log.removed.len(), 5);
        assert_eq!(log.hits.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut mgr = manager(17);
        let first = mgr.spawn_target(1.0, 100).unwrap();
        mgr.clear_all();
        let second = mgr.spawn_target(1.0, 100).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_same_seed_same_spawns() {
        let mut a = manager(99);
        let mut b = manager(99);
        for _ in 0..6 {
            a.spawn_target(0.5, 1000);
            b.spawn_target(0.5, 1000);
        }
        let layout = |m: &TargetManager| {
            m.active()
                .iter()
                .map(|t| (t.slot, t.kind.id.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(&a), layout(&b));
    }

    #[test]
    fn test_problem_ratio_distribution() {
        let mut mgr = manager(2024);
        let mut problems = 0;
        for _ in 0..1000 {
            mgr.spawn_target(0.7, 1000).unwrap();
            if mgr.active()[0].is_problem {
                problems += 1;
            }
            mgr.clear_all();
        }
        assert!((620..=780).contains(&problems), "got {problems}");
    }

    #[test]
    fn test_every_slot_gets_picked() {
        let mut mgr = manager(31);
        let mut counts = [0u32; 9];
        for _ in 0..900 {
            let id = mgr.spawn_target(0.5, 1000).unwrap();
            counts[mgr.get(id).unwrap().slot] += 1;
            mgr.clear_all();
        }
        // 100 expected per slot
        for (slot, &n) in counts.iter().enumerate() {
            assert!((50..=150).contains(&n), "slot {slot} picked {n} times");
        }
    }

    #[test]
    fn test_last_free_slot_is_always_found() {
        let mut mgr = manager(32);
        for _ in 0..8 {
            mgr.spawn_target(0.5, 1000).unwrap();
        }
        let free = mgr.slots().available();
        assert_eq!(free.len(), 1);
        let id = mgr.spawn_target(0.5, 1000).unwrap();
        assert_eq!(mgr.get(id).unwrap().slot, free[0]);
    }

    #[test]
    fn test_every_kind_in_each_pool_appears() {
        let config = GameConfig::default();
        let mut mgr = manager(33);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for ratio in [1.0, 0.0] {
            for _ in 0..600 {
                let id = mgr.spawn_target(ratio, 1000).unwrap();
                let target = mgr.get(id).unwrap();
                assert_eq!(target.is_problem, ratio == 1.0);
                *counts.entry(target.kind.id.clone()).or_default() += 1;
                mgr.clear_all();
            }
        }
        // 600 / 9 and 600 / 6 expected
        for kind in &config.problems {
            let n = counts.get(&kind.id).copied().unwrap_or(0);
            assert!((30..=110).contains(&n), "problem '{}' drawn {n} times", kind.id);
        }
        for kind in &config.decoys {
            let n = counts.get(&kind.id).copied().unwrap_or(0);
            assert!((55..=145).contains(&n), "decoy '{}' drawn {n} times", kind.id);
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn slots_never_double_booked(
                seed in any::<u64>(),
                ops in proptest::collection::vec((0u8..3, 0.0f64..1.0), 1..80),
            ) {
                let mut mgr = manager(seed);
                for (op, ratio) in ops {
                    match op {
                        0 => { mgr.spawn_target(ratio, 400); }
                        1 => { mgr.update(0.05); }
                        _ => { mgr.check_hit(Vec2::ZERO, &Everywhere); }
                    }
                    let mut seen = std::collections::HashSet::new();
                    for t in mgr.active() {
                        prop_assert!(seen.insert(t.slot));
                        prop_assert_eq!(mgr.slots().get(t.slot).unwrap().occupant(), Some(t.id));
                    }
                    prop_assert_eq!(mgr.slots().occupied_count(), mgr.active_count());
                }
            }
        }
    }
}
