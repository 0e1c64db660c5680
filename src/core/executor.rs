//! Build plan execution
//!
//! A single coordinating task owns the scheduling state (ready queue,
//! unresolved-predecessor counters, step states) and hands steps to the tokio
//! blocking pool, at most `threads` at a time. Workers only receive owned data
//! and report back through a [`JoinSet`].

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::defaults::DEFAULT_THREADS;
use crate::core::module::{Module, MojoExecution};
use crate::core::plan::BuildPlan;
use crate::core::result::{BuildResult, StepOutcome, StepState};
use crate::core::step::{BuildStep, StepId};
use crate::error::{ActionError, SchedulerError, WorkspaceError};

/// How the build reacts to a failed step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureBehavior {
    /// Stop dispatching on the first failure
    #[default]
    FailFast,
    /// Skip what depends on the failure, keep building the rest
    FailAtEnd,
    /// Treat failed steps as completed
    FailNever,
}

impl FromStr for FailureBehavior {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "fail-at-end" => Ok(Self::FailAtEnd),
            "fail-never" => Ok(Self::FailNever),
            other => Err(WorkspaceError::InvalidValue {
                field: "fail".to_string(),
                value: other.to_string(),
                reason: "expected 'fail-fast', 'fail-at-end' or 'fail-never'".to_string(),
            }),
        }
    }
}

impl fmt::Display for FailureBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::FailAtEnd => write!(f, "fail-at-end"),
            Self::FailNever => write!(f, "fail-never"),
        }
    }
}

/// Runs one mojo execution
///
/// Called from blocking worker threads; a returned error or a panic marks the
/// step as failed.
pub trait MojoExecutor: Send + Sync {
    fn execute(&self, module: &Module, step: &str, execution: &MojoExecution) -> Result<(), ActionError>;
}

/// Observer of build progress
pub trait BuildListener: Send + Sync {
    /// Called once before the first step is dispatched
    fn build_started(&self, _plan: &BuildPlan, _threads: usize) {}

    /// Called when a step is dispatched
    fn step_started(&self, _step: &BuildStep) {}

    /// Called when a step reaches a final state, skips included
    fn step_finished(&self, _outcome: &StepOutcome) {}
}

struct NoopListener;

impl BuildListener for NoopListener {}

/// Executes build plans with bounded parallelism
#[derive(Clone)]
pub struct BuildPlanExecutor {
    executor: Arc<dyn MojoExecutor>,
    listener: Arc<dyn BuildListener>,
    threads: usize,
    failure: FailureBehavior,
}

impl fmt::Debug for BuildPlanExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildPlanExecutor")
            .field("threads", &self.threads)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl BuildPlanExecutor {
    /// Create an executor dispatching executions to `executor`
    pub fn new(executor: Arc<dyn MojoExecutor>) -> Self {
        Self {
            executor,
            listener: Arc::new(NoopListener),
            threads: DEFAULT_THREADS,
            failure: FailureBehavior::default(),
        }
    }

    /// Set the maximum number of steps running at once
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the failure behaviour
    #[must_use]
    pub fn with_failure_behavior(mut self, failure: FailureBehavior) -> Self {
        self.failure = failure;
        self
    }

    /// Set the progress listener
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn BuildListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Worker count actually used for `plan`
    ///
    /// Never more than the number of modules: steps of one module are a chain
    /// and cannot overlap anyway.
    pub fn effective_threads(&self, plan: &BuildPlan) -> usize {
        self.threads.clamp(1, plan.modules().len().max(1))
    }

    /// Execute every step of the plan
    ///
    /// Action failures are recorded in the returned [`BuildResult`]; only
    /// scheduler invariant violations are returned as errors.
    pub async fn execute(&self, plan: BuildPlan) -> Result<BuildResult, SchedulerError> {
        plan.validate()?;
        let threads = self.effective_threads(&plan);
        info!(
            "Executing {} steps of {} modules with {threads} thread(s), {}",
            plan.len(),
            plan.modules().len(),
            self.failure
        );
        self.listener.build_started(&plan, threads);

        let wall = Instant::now();
        let mut run = Run::new(&plan);
        let mut running: JoinSet<(StepId, Duration, Result<(), ActionError>)> = JoinSet::new();

        loop {
            while !run.halted && running.len() < threads {
                let Some(id) = run.ready.pop_front() else {
                    break;
                };
                run.start(id)?;
                let step = &plan[id];
                self.listener.step_started(step);

                if step.is_empty() {
                    debug!("{} has no executions", step.label());
                    run.finish(id, Duration::ZERO, Ok(()), self.failure, &*self.listener)?;
                    continue;
                }

                info!("Running {} ({} executions)", step.label(), step.prioritized_executions().len());
                let executor = Arc::clone(&self.executor);
                let module = Arc::clone(step.module());
                let name = step.name().to_string();
                let executions: Vec<MojoExecution> = step.executions().cloned().collect();
                running.spawn_blocking(move || {
                    let started = Instant::now();
                    let result = run_executions(&*executor, &module, &name, &executions);
                    (id, started.elapsed(), result)
                });
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (id, elapsed, result) = joined.map_err(|e| SchedulerError::WorkerLost {
                message: e.to_string(),
            })?;
            run.finish(id, elapsed, result, self.failure, &*self.listener)?;
        }

        run.skip_remaining(&*self.listener);
        run.check_finished()?;

        let result = run.into_result(wall.elapsed());
        info!(
            "Build finished in {:.3}s: {} run, {} failed, {} skipped",
            result.wall_time().as_secs_f64(),
            result.started(),
            result.failures().count(),
            result.skipped().count()
        );
        Ok(result)
    }
}

/// Run a step's executions in order, stopping at the first failure
fn run_executions(
    executor: &dyn MojoExecutor,
    module: &Module,
    step: &str,
    executions: &[MojoExecution],
) -> Result<(), ActionError> {
    for execution in executions {
        debug!("{}/{step}: {execution}", module.id());
        match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(module, step, execution))) {
            Ok(result) => result?,
            Err(payload) => {
                return Err(ActionError::Panicked {
                    execution: execution.key(),
                    message: panic_message(payload.as_ref()),
                })
            }
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Scheduling state of one execution of a plan
struct Run<'p> {
    plan: &'p BuildPlan,
    states: Vec<StepState>,
    remaining: Vec<usize>,
    errors: Vec<Option<ActionError>>,
    skipped_by: Vec<Option<StepId>>,
    durations: Vec<Duration>,
    ready: VecDeque<StepId>,
    /// First failure under fail-fast; nothing is dispatched once set
    halted_by: Option<StepId>,
    halted: bool,
}

impl<'p> Run<'p> {
    fn new(plan: &'p BuildPlan) -> Self {
        let len = plan.len();
        let mut states = vec![StepState::Pending; len];
        let remaining: Vec<usize> = plan.all_steps().map(BuildStep::predecessor_count).collect();
        let mut ready = VecDeque::new();
        for step in plan.all_steps() {
            if step.predecessor_count() == 0 {
                states[step.id().index()] = StepState::Ready;
                ready.push_back(step.id());
            }
        }
        Self {
            plan,
            states,
            remaining,
            errors: vec![None; len],
            skipped_by: vec![None; len],
            durations: vec![Duration::ZERO; len],
            ready,
            halted_by: None,
            halted: false,
        }
    }

    fn start(&mut self, id: StepId) -> Result<(), SchedulerError> {
        let state = &mut self.states[id.index()];
        if *state != StepState::Ready {
            return Err(SchedulerError::DoubleDispatch {
                step: self.plan[id].label(),
            });
        }
        *state = StepState::Running;
        Ok(())
    }

    fn finish(
        &mut self,
        id: StepId,
        elapsed: Duration,
        result: Result<(), ActionError>,
        failure: FailureBehavior,
        listener: &dyn BuildListener,
    ) -> Result<(), SchedulerError> {
        self.durations[id.index()] = elapsed;
        match result {
            Ok(()) => {
                self.states[id.index()] = StepState::Succeeded;
                listener.step_finished(&self.outcome(id));
                self.release(id)?;
            }
            Err(e) => {
                error!("{} failed: {e}", self.plan[id].label());
                self.states[id.index()] = StepState::Failed;
                self.errors[id.index()] = Some(e);
                listener.step_finished(&self.outcome(id));
                match failure {
                    FailureBehavior::FailNever => self.release(id)?,
                    FailureBehavior::FailAtEnd => self.skip_successors(id, listener),
                    FailureBehavior::FailFast => {
                        self.skip_successors(id, listener);
                        if !self.halted {
                            warn!("Stopping the build after the failure of {}", self.plan[id].label());
                            self.halted = true;
                            self.halted_by = Some(id);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve one predecessor of every successor of a completed step
    fn release(&mut self, id: StepId) -> Result<(), SchedulerError> {
        for succ in self.plan[id].successors() {
            let count = &mut self.remaining[succ.index()];
            *count = count
                .checked_sub(1)
                .ok_or_else(|| SchedulerError::NegativePredecessorCount {
                    step: self.plan[succ].label(),
                })?;
            if *count == 0 && self.states[succ.index()] == StepState::Pending {
                self.states[succ.index()] = StepState::Ready;
                self.ready.push_back(succ);
            }
        }
        Ok(())
    }

    /// Mark every transitive successor of a failed step as skipped
    fn skip_successors(&mut self, failed: StepId, listener: &dyn BuildListener) {
        let mut stack: Vec<StepId> = self.plan[failed].successors().collect();
        while let Some(next) = stack.pop() {
            if matches!(self.states[next.index()], StepState::Pending | StepState::Ready) {
                self.skip(next, failed, listener);
                stack.extend(self.plan[next].successors());
            }
        }
        self.ready.retain(|id| self.states[id.index()] == StepState::Ready);
    }

    /// After a fail-fast halt, everything not yet started is skipped
    fn skip_remaining(&mut self, listener: &dyn BuildListener) {
        let Some(cause) = self.halted_by else {
            return;
        };
        let plan = self.plan;
        for step in plan.all_steps() {
            if matches!(self.states[step.id().index()], StepState::Pending | StepState::Ready) {
                self.skip(step.id(), cause, listener);
            }
        }
        self.ready.clear();
    }

    fn skip(&mut self, id: StepId, cause: StepId, listener: &dyn BuildListener) {
        debug!("Skipping {} after failure of {}", self.plan[id].label(), self.plan[cause].label());
        self.states[id.index()] = StepState::Skipped;
        self.skipped_by[id.index()] = Some(cause);
        listener.step_finished(&self.outcome(id));
    }

    fn check_finished(&self) -> Result<(), SchedulerError> {
        let pending: Vec<String> = self
            .plan
            .all_steps()
            .filter(|s| !self.states[s.id().index()].is_terminal())
            .map(BuildStep::label)
            .collect();
        if pending.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::Stalled { pending })
        }
    }

    fn outcome(&self, id: StepId) -> StepOutcome {
        let step = &self.plan[id];
        StepOutcome {
            module: step.module().id().clone(),
            step: step.name().to_string(),
            state: self.states[id.index()],
            error: self.errors[id.index()].clone(),
            skipped_because: self.skipped_by[id.index()].map(|cause| self.plan[cause].label()),
            duration: self.durations[id.index()],
        }
    }

    fn into_result(self, wall_time: Duration) -> BuildResult {
        let outcomes = self.plan.all_steps().map(|s| self.outcome(s.id())).collect();
        let modules = self
            .plan
            .modules()
            .iter()
            .map(|m| (m.id().clone(), m.version().to_string()))
            .collect();
        BuildResult::new(outcomes, modules, wall_time)
    }
}
