use crate::core::models::lattice::Lattice;
use crate::core::utils::vector::{self, Vector};
use crate::engine::Engine;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, info, instrument};

/// What to do after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Cancel,
}

/// A run of `sim_count` Metropolis steps split into checkpoints.
///
/// A non-positive `freq` makes the whole run a single checkpoint. When `dkt`
/// or `db` is non-zero, the temperature and field are incremented after every
/// single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunPlan {
    pub sim_count: u64,
    pub freq: i64,
    pub dkt: f64,
    pub db: Vector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub completed_steps: u64,
    pub checkpoints: u64,
    pub cancelled: bool,
}

impl RunPlan {
    pub fn new(sim_count: u64) -> Self {
        Self {
            sim_count,
            freq: 0,
            dkt: 0.0,
            db: vector::ZERO,
        }
    }

    pub fn with_freq(mut self, freq: i64) -> Self {
        self.freq = freq;
        self
    }

    pub fn with_ramp(mut self, dkt: f64, db: Vector) -> Self {
        self.dkt = dkt;
        self.db = db;
        self
    }

    pub fn batch_size(&self) -> u64 {
        match u64::try_from(self.freq) {
            Ok(freq) if freq > 0 => freq.min(self.sim_count),
            _ => self.sim_count,
        }
    }

    pub fn is_ramped(&self) -> bool {
        self.dkt != 0.0 || self.db != vector::ZERO
    }

    /// Sizes of the successive batches.
    pub fn batches(&self) -> impl Iterator<Item = u64> + use<> {
        let size = self.batch_size();
        let mut remaining = self.sim_count;
        std::iter::from_fn(move || {
            if remaining == 0 || size == 0 {
                return None;
            }
            let n = remaining.min(size);
            remaining -= n;
            Some(n)
        })
    }
}

/// Executes `plan`, calling `checkpoint` after every batch.
///
/// The callback sees the lattice and engine after the batch and decides
/// whether the run continues. Cancellation takes effect only between batches.
///
/// # Errors
///
/// Propagates engine failures and any error returned by `checkpoint`.
#[instrument(skip_all, name = "simulate_workflow", fields(sim_count = plan.sim_count, freq = plan.freq))]
pub fn run<E, F, Err>(
    engine: &mut E,
    lattice: &mut Lattice,
    plan: &RunPlan,
    reporter: &ProgressReporter,
    mut checkpoint: F,
) -> Result<RunSummary, Err>
where
    E: Engine + ?Sized,
    F: FnMut(&Lattice, &E) -> Result<Control, Err>,
    Err: From<EngineError>,
{
    reporter.report(Progress::RunStart {
        total_steps: plan.sim_count,
        batch_size: plan.batch_size(),
    });
    info!(ramped = plan.is_ramped(), "Starting simulation run.");

    let mut summary = RunSummary {
        completed_steps: 0,
        checkpoints: 0,
        cancelled: false,
    };
    for n in plan.batches() {
        if plan.is_ramped() {
            run_ramped(engine, lattice, n, plan)?;
        } else {
            engine.metropolis(lattice, n)?;
        }
        summary.completed_steps += n;
        summary.checkpoints += 1;
        reporter.report(Progress::BatchFinish {
            completed_steps: summary.completed_steps,
        });
        debug!(completed = summary.completed_steps, "Checkpoint reached.");

        if checkpoint(lattice, engine)? == Control::Cancel {
            summary.cancelled = true;
            break;
        }
    }

    reporter.report(Progress::RunFinish {
        completed_steps: summary.completed_steps,
        cancelled: summary.cancelled,
    });
    info!(
        completed = summary.completed_steps,
        cancelled = summary.cancelled,
        "Simulation run finished."
    );
    Ok(summary)
}

fn run_ramped<E: Engine + ?Sized>(
    engine: &mut E,
    lattice: &mut Lattice,
    steps: u64,
    plan: &RunPlan,
) -> Result<(), EngineError> {
    for _ in 0..steps {
        engine.metropolis(lattice, 1)?;
        let p = *lattice.parameters();
        lattice.set_temperature(p.kt + plan.dkt);
        lattice.set_field(p.b + plan.db);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::LatticeBuilder;
    use crate::engine::MetropolisEngine;

    fn lattice() -> Lattice {
        LatticeBuilder::new(5, 2, 2).mol_len(1).build().unwrap()
    }

    mod plans {
        use super::*;

        #[test]
        fn batches_split_the_run_at_every_checkpoint() {
            let plan = RunPlan::new(2_000_000).with_freq(500_000);
            assert_eq!(plan.batches().collect::<Vec<_>>(), vec![500_000; 4]);

            let plan = RunPlan::new(1_100).with_freq(500);
            assert_eq!(plan.batches().collect::<Vec<_>>(), vec![500, 500, 100]);
        }

        #[test]
        fn non_positive_freq_means_one_batch() {
            assert_eq!(RunPlan::new(300).batches().collect::<Vec<_>>(), vec![300]);
            assert_eq!(
                RunPlan::new(300).with_freq(-5).batches().collect::<Vec<_>>(),
                vec![300]
            );
            assert_eq!(RunPlan::new(0).batches().count(), 0);
        }

        #[test]
        fn ramps_are_detected_from_either_delta() {
            assert!(!RunPlan::new(1).is_ramped());
            assert!(RunPlan::new(1).with_ramp(0.1, vector::ZERO).is_ramped());
            assert!(RunPlan::new(1).with_ramp(0.0, vector::K).is_ramped());
        }
    }

    mod runs {
        use super::*;

        #[test]
        fn checkpoint_is_called_after_every_batch() {
            let mut l = lattice();
            let mut engine = MetropolisEngine::new(2);
            let mut seen = Vec::new();
            let summary = run::<_, _, EngineError>(
                &mut engine,
                &mut l,
                &RunPlan::new(250).with_freq(100),
                &ProgressReporter::new(),
                |lattice, _| {
                    seen.push(lattice.results().t);
                    Ok(Control::Continue)
                },
            )
            .unwrap();
            assert_eq!(seen, vec![100, 200, 250]);
            assert_eq!(
                summary,
                RunSummary {
                    completed_steps: 250,
                    checkpoints: 3,
                    cancelled: false
                }
            );
        }

        #[test]
        fn cancel_stops_after_the_current_checkpoint() {
            let mut l = lattice();
            let mut engine = MetropolisEngine::new(2);
            let summary = run::<_, _, EngineError>(
                &mut engine,
                &mut l,
                &RunPlan::new(400).with_freq(100),
                &ProgressReporter::new(),
                |_, _| Ok(Control::Cancel),
            )
            .unwrap();
            assert!(summary.cancelled);
            assert_eq!(summary.completed_steps, 100);
            assert_eq!(l.results().t, 100);
        }

        #[test]
        fn ramps_increment_temperature_and_field_per_step() {
            let mut l = lattice();
            l.set_temperature(1.0);
            let mut engine = MetropolisEngine::new(4);
            let plan = RunPlan::new(10).with_freq(4).with_ramp(0.5, Vector::new(0.0, 0.0, 0.25));
            run::<_, _, EngineError>(&mut engine, &mut l, &plan, &ProgressReporter::new(), |_, _| {
                Ok(Control::Continue)
            })
            .unwrap();
            assert!((l.parameters().kt - 6.0).abs() < 1e-12);
            assert!((l.parameters().b - Vector::new(0.0, 0.0, 2.5)).norm() < 1e-12);
            assert_eq!(l.results().t, 10);
        }

        #[test]
        fn reporter_sees_start_batches_and_finish() {
            use std::cell::RefCell;
            let events = RefCell::new(Vec::new());
            let reporter = ProgressReporter::with_callback(Box::new(|e| events.borrow_mut().push(e)));
            let mut l = lattice();
            run::<_, _, EngineError>(
                &mut MetropolisEngine::new(1),
                &mut l,
                &RunPlan::new(20).with_freq(10),
                &reporter,
                |_, _| Ok(Control::Continue),
            )
            .unwrap();
            drop(reporter);
            let events = events.into_inner();
            assert_eq!(events.len(), 4);
            assert_eq!(
                events[0],
                Progress::RunStart {
                    total_steps: 20,
                    batch_size: 10
                }
            );
            assert_eq!(
                events[3],
                Progress::RunFinish {
                    completed_steps: 20,
                    cancelled: false
                }
            );
        }

        #[test]
        fn checkpoint_errors_abort_the_run() {
            #[derive(Debug, PartialEq)]
            enum Failure {
                Engine,
                Checkpoint,
            }
            impl From<EngineError> for Failure {
                fn from(_: EngineError) -> Self {
                    Failure::Engine
                }
            }
            let mut l = lattice();
            let result = run(
                &mut MetropolisEngine::new(1),
                &mut l,
                &RunPlan::new(30).with_freq(10),
                &ProgressReporter::new(),
                |_, _| Err(Failure::Checkpoint),
            );
            assert_eq!(result, Err(Failure::Checkpoint));
            assert_eq!(l.results().t, 10);
        }
    }
}
