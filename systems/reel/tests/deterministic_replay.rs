use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use reelspin_core::{NullSurface, ReelConfig, ReelPhase, SymbolId};
use reelspin_system_reel::{RandomSymbols, Reel};

#[derive(Clone, Debug)]
enum Step {
    Start,
    Stop(Vec<SymbolId>),
    Frame(f32),
}

#[test]
fn deterministic_replay_produces_identical_traces() {
    let first = replay(0x5eed_cafe, scripted_steps());
    let second = replay(0x5eed_cafe, scripted_steps());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn replay_lands_every_requested_stop() {
    let outcome = replay(42, scripted_steps());

    assert_eq!(
        outcome.landings,
        vec![
            symbols(&[0, 1, 2, 3, 4, 0]),
            symbols(&[4, 4, 4, 4, 4, 4]),
            symbols(&[2, 0, 3, 1, 2, 0]),
        ]
    );
    assert_eq!(outcome.final_phase, ReelPhase::Idle);
}

#[test]
fn different_seeds_change_filler_but_not_landings() {
    let first = replay(1, scripted_steps());
    let second = replay(2, scripted_steps());

    assert_eq!(first.landings, second.landings);
    assert_ne!(first.fingerprint(), second.fingerprint());
}

fn symbols(values: &[u32]) -> Vec<SymbolId> {
    values.iter().copied().map(SymbolId::new).collect()
}

fn scripted_steps() -> Vec<Step> {
    let mut steps = Vec::new();
    let cycles = [
        (symbols(&[0, 1, 2, 3, 4, 0]), 1.0),
        (symbols(&[4, 4, 4, 4, 4, 4]), 1.45),
        (symbols(&[2, 0, 3, 1, 2, 0]), 0.8),
    ];

    for (targets, delta) in cycles {
        steps.push(Step::Start);
        steps.extend(std::iter::repeat(Step::Frame(delta)).take(37));
        steps.push(Step::Stop(targets));
        steps.extend(std::iter::repeat(Step::Frame(delta)).take(120));
    }
    steps
}

fn replay(seed: u64, steps: Vec<Step>) -> ReplayOutcome {
    let config = ReelConfig::new(6, 150.0).expect("valid config");
    let mut reel = Reel::new(config, NullSurface, RandomSymbols::seeded(seed));
    let mut trace = Vec::new();
    let mut landings = Vec::new();

    for step in steps {
        match step {
            Step::Start => reel.start_spin(),
            Step::Stop(targets) => reel.stop_spin(&targets).expect("stop accepted"),
            Step::Frame(delta) => {
                let was_idle = reel.phase().is_idle();
                reel.update(delta);
                if !was_idle {
                    if let Some(landed) = reel.landed_symbols() {
                        landings.push(landed);
                    }
                }
            }
        }

        trace.push(FrameRecord {
            phase: reel.phase(),
            tiles: reel
                .tiles()
                .iter()
                .map(|tile| (tile.x().to_bits(), tile.symbol()))
                .collect(),
        });
    }

    ReplayOutcome {
        trace,
        landings,
        final_phase: reel.phase(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FrameRecord {
    phase: ReelPhase,
    tiles: Vec<(u32, SymbolId)>,
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    trace: Vec<FrameRecord>,
    landings: Vec<Vec<SymbolId>>,
    final_phase: ReelPhase,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.trace.hash(&mut hasher);
        hasher.finish()
    }
}
