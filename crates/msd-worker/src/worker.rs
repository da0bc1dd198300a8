//! The line-protocol state machine.
//!
//! A [`Worker`] owns one lattice and one engine for its whole life. It reads a
//! startup request, answers `READY`, then serves one command per cycle until
//! `EXIT` or end of input, answering `GOODBYE`. End of input is never an error.

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::protocol::request::{
    Command, ParameterUpdate, Request, ResetRequest, RunRequest, StartupRequest, UnknownCommand,
    parse_body,
};
use crate::protocol::snapshot::{Group, SeedReport, Selector, Snapshot};
use msd::core::models::lattice::Lattice;
use msd::engine::Engine;
use msd::engine::progress::{Progress, ProgressReporter};
use msd::workflows::simulate::{self, Control};
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, info, instrument, warn};

pub const READY: &str = "READY";
pub const DONE: &str = "DONE";
pub const GOODBYE: &str = "GOODBYE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    AwaitingCommand,
    Running,
    Terminated,
}

/// The three streams a worker talks over.
pub struct Channels<R, W, D> {
    input: R,
    output: W,
    diagnostics: D,
}

impl<R: BufRead, W: Write, D: Write> Channels<R, W, D> {
    pub fn new(input: R, output: W, diagnostics: D) -> Self {
        Self {
            input,
            output,
            diagnostics,
        }
    }

    /// Reads one line without its terminator.
    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(WorkerError::EndOfInput);
        }
        let len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(len);
        Ok(line)
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()?;
        Ok(())
    }

    fn emit_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        self.emit(&line)
    }

    fn diagnose(&mut self, message: &str) -> Result<()> {
        writeln!(self.diagnostics, "{message}")?;
        self.diagnostics.flush()?;
        Ok(())
    }
}

pub struct Worker<R, W, D, E> {
    channels: Channels<R, W, D>,
    engine: E,
    lattice: Lattice,
    cancel_token: String,
    state: WorkerState,
}

impl<R: BufRead, W: Write, D: Write, E: Engine> Worker<R, W, D, E> {
    /// Reads the startup request, builds the lattice and answers `READY`.
    ///
    /// Seed and flipping algorithm from the request take precedence over the
    /// configured ones.
    #[instrument(skip_all, name = "worker_startup")]
    pub fn start(mut channels: Channels<R, W, D>, mut engine: E, config: &WorkerConfig) -> Result<Self> {
        let line = channels.read_line()?;
        let request: StartupRequest = parse_body("startup", &line)?;
        let mut lattice = request.build_lattice()?;

        engine.set_flipping_algorithm(request.flipping_algorithm.unwrap_or(config.flipping_algorithm));
        if let Some(seed) = request.seed.or(config.seed) {
            engine.set_seed(seed);
        }
        if request.randomize {
            engine.randomize(&mut lattice, false);
        }

        let counts = lattice.counts();
        info!(
            sites = counts.n,
            molecule_sites = counts.n_m,
            seed = engine.seed(),
            algorithm = %engine.flipping_algorithm(),
            "Lattice ready."
        );
        channels.emit(READY)?;

        Ok(Self {
            channels,
            engine,
            lattice,
            cancel_token: config.cancel_token.clone(),
            state: WorkerState::AwaitingCommand,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Serves commands until `EXIT` or end of input, then answers `GOODBYE`.
    ///
    /// # Errors
    ///
    /// Any failure other than end of input ends the session without `GOODBYE`.
    pub fn serve(&mut self) -> Result<()> {
        match self.command_loop() {
            Ok(()) | Err(WorkerError::EndOfInput) => {}
            Err(e) => {
                self.state = WorkerState::Terminated;
                return Err(e);
            }
        }
        self.state = WorkerState::Terminated;
        info!(state = ?self.state, "Session finished.");
        self.channels.emit(GOODBYE)
    }

    fn command_loop(&mut self) -> Result<()> {
        loop {
            let line = self.channels.read_line()?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(UnknownCommand(token)) => {
                    warn!(token = %token, "Ignoring unrecognized command.");
                    self.channels.diagnose(&format!("Unrecognized command: {token}"))?;
                    continue;
                }
            };
            debug!(%command, "Received command.");

            let body = if command.has_body() {
                self.channels.read_line()?
            } else {
                String::new()
            };
            match Request::parse(command, &body)? {
                Request::Exit => return Ok(()),
                Request::Set(update) => self.set(&update)?,
                Request::Run(run) => self.run(&run)?,
                Request::Get(selector) => self.get(&selector)?,
                Request::Reset(reset) => self.reset(&reset)?,
            }
        }
    }

    fn set(&mut self, update: &ParameterUpdate) -> Result<()> {
        update.apply(&mut self.lattice)?;
        self.channels.emit(DONE)
    }

    fn get(&mut self, selector: &Selector) -> Result<()> {
        let snapshot = Snapshot::capture(&self.lattice, self.engine.seed(), selector.groups());
        self.channels.emit_json(&snapshot)
    }

    fn reset(&mut self, request: &ResetRequest) -> Result<()> {
        if let Some(seed) = request.seed {
            self.engine.set_seed(seed);
        }
        let reseed = request.effective_reseed();
        if request.randomize {
            self.engine.randomize(&mut self.lattice, reseed);
        } else {
            self.engine.reinitialize(&mut self.lattice, reseed);
        }
        let seed = self.engine.seed();
        debug!(seed, randomize = request.randomize, "Lattice reset.");
        self.channels.emit_json(&SeedReport { seed })
    }

    /// Runs the batches of `request`, emitting a full snapshot and reading one
    /// control line after each of them.
    fn run(&mut self, request: &RunRequest) -> Result<()> {
        self.state = WorkerState::Running;
        let plan = request.plan();
        debug!(state = ?self.state, steps = plan.sim_count, ramped = plan.is_ramped(), "Entering run.");
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            debug!(?event, "Run progress.");
        }));

        let channels = &mut self.channels;
        let cancel_token = self.cancel_token.as_str();
        let summary = simulate::run::<_, _, WorkerError>(
            &mut self.engine,
            &mut self.lattice,
            &plan,
            &reporter,
            |lattice, engine| {
                channels.emit_json(&Snapshot::capture(lattice, engine.seed(), &Group::ALL))?;
                let control = channels.read_line()?;
                if control.trim().eq_ignore_ascii_case(cancel_token) {
                    Ok(Control::Cancel)
                } else {
                    Ok(Control::Continue)
                }
            },
        )?;

        if summary.cancelled {
            info!(completed = summary.completed_steps, "Run cancelled at checkpoint.");
        }
        self.state = WorkerState::AwaitingCommand;
        self.channels.emit(DONE)
    }
}

/// Starts a worker on `channels` and serves it to completion.
///
/// End of input before the startup request is a clean shutdown.
pub fn serve<R, W, D, E>(channels: Channels<R, W, D>, engine: E, config: &WorkerConfig) -> Result<()>
where
    R: BufRead,
    W: Write,
    D: Write,
    E: Engine,
{
    let mut worker = match Worker::start(channels, engine, config) {
        Ok(worker) => worker,
        Err(WorkerError::EndOfInput) => {
            info!("Input closed before startup.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    worker.serve()
}
