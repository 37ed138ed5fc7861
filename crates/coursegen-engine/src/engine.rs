//! The [`RepairEngine`]: diagnostics and repair entry points.

use crate::error::{RepairError, RunFailure};
use crate::logs::{LogLevel, RunLog};
use crate::run::{RepairHandle, RunShared, RunStatus};
use coursegen_lock::{LockError, LockGuard, LockTable};
use coursegen_model::{CoursePlan, PlanId};
use coursegen_phase_api::{
    AbortHandle, AbortSignal, ExecutorError, PhaseExecutor, PhaseId, PhaseState, PhaseStatus,
    abort_pair,
};
use coursegen_store::ArtifactStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stall timeout with sensible defaults.
///
/// A run with no progress (no new log record, no executor response) for this
/// duration is failed and its lock released, so a hung executor cannot
/// permanently starve repairs on a plan.
#[derive(Debug, Clone, Copy)]
pub struct StallTimeout {
    /// Window of allowed silence before the run is failed.
    pub duration: Duration,
}

impl StallTimeout {
    /// Default stall timeout in seconds (5 minutes).
    pub const DEFAULT_SECS: u64 = 300;

    /// Minimum stall timeout in seconds.
    pub const MIN_SECS: u64 = 1;

    /// Create a `StallTimeout` from whole seconds, clamped to the minimum.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self {
            duration: Duration::from_secs(secs.max(Self::MIN_SECS)),
        }
    }

    /// Create a `StallTimeout` from an exact duration (no clamping).
    #[must_use]
    pub const fn from_duration(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for StallTimeout {
    fn default() -> Self {
        Self::from_secs(Self::DEFAULT_SECS)
    }
}

/// Orchestrates diagnostics and selective repair runs.
///
/// The engine owns the per-plan lock table; construct one engine per process
/// and share it (`RepairEngine` is cheap to clone and all clones share
/// state). Repairs for distinct plans run concurrently, each on its own
/// task; repairs for the same plan are serialized by rejection, not queued.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use coursegen_engine::RepairEngine;
/// use coursegen_phase_api::PhaseId;
/// use coursegen_store::MemoryStore;
/// # use coursegen_model::PlanId;
/// # async fn demo(executor: Arc<dyn coursegen_phase_api::PhaseExecutor>) -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let engine = RepairEngine::new(store, executor);
///
/// let plan_id: PlanId = "onboarding-2026".parse()?;
/// for status in engine.diagnostics(&plan_id)? {
///     println!("{}: {} ({})", status.phase, status.state, status.detail);
/// }
///
/// let handle = engine.request_repair(&plan_id, &[PhaseId::Enrichment])?;
/// let report = handle.wait().await;
/// println!("repair {}", report.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RepairEngine {
    store: Arc<dyn ArtifactStore>,
    executor: Arc<dyn PhaseExecutor>,
    locks: LockTable,
    stall: StallTimeout,
}

impl RepairEngine {
    /// Create an engine over a plan store and a phase executor.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>, executor: Arc<dyn PhaseExecutor>) -> Self {
        Self {
            store,
            executor,
            locks: LockTable::new(),
            stall: StallTimeout::default(),
        }
    }

    /// Override the stall timeout.
    #[must_use]
    pub fn with_stall_timeout(mut self, stall: StallTimeout) -> Self {
        self.stall = stall;
        self
    }

    /// Compute fresh diagnostics for a plan.
    ///
    /// Loads the current snapshot and evaluates every registered phase.
    /// Never suspends and never caches: staleness here would make the
    /// orchestrator take wrong repair decisions.
    pub fn diagnostics(&self, plan_id: &PlanId) -> Result<Vec<PhaseStatus>, RepairError> {
        let plan = self.load(plan_id)?;
        Ok(coursegen_status::evaluate(&plan))
    }

    /// Whether a repair run currently holds the plan's lock.
    #[must_use]
    pub fn repair_active(&self, plan_id: &PlanId) -> bool {
        self.locks.is_held(plan_id)
    }

    /// Request a repair with phase tokens (CLI / automation surface).
    ///
    /// Token validation happens before any side effect; an unrecognized
    /// token fails the whole request with [`RepairError::UnknownPhase`].
    pub fn request_repair_by_tokens<S: AsRef<str>>(
        &self,
        plan_id: &PlanId,
        tokens: &[S],
    ) -> Result<RepairHandle, RepairError> {
        let mut phases = Vec::with_capacity(tokens.len());
        for token in tokens {
            let phase = token
                .as_ref()
                .parse::<PhaseId>()
                .map_err(|e| RepairError::UnknownPhase { phase: e.token })?;
            phases.push(phase);
        }
        self.request_repair(plan_id, &phases)
    }

    /// Request a repair of the given phases.
    ///
    /// Preconditions are checked in order, with no side effect on failure:
    /// the request must be non-empty; every requested phase's dependencies
    /// must be `Complete` per a fresh evaluator read; and no other
    /// non-terminal run may hold the plan's lock. The dependency check runs
    /// while the lock is held (a single compare-and-acquire on the table),
    /// so two racing requests can never both pass.
    ///
    /// On acceptance the run starts on its own task and the returned handle
    /// observes it. Requested phases execute strictly sequentially in
    /// dependency order, regardless of request order; duplicates are folded.
    ///
    /// # Errors
    /// [`RepairError::EmptyRequest`], [`RepairError::PlanNotFound`],
    /// [`RepairError::DependencyUnmet`], [`RepairError::LockHeld`], or a
    /// store failure.
    ///
    /// # Panics
    /// Must be called within a tokio runtime (the run task is spawned).
    pub fn request_repair(
        &self,
        plan_id: &PlanId,
        requested: &[PhaseId],
    ) -> Result<RepairHandle, RepairError> {
        if requested.is_empty() {
            return Err(RepairError::EmptyRequest);
        }

        let mut phases = requested.to_vec();
        phases.sort();
        phases.dedup();

        // Compare-and-acquire before validation: the guard makes the
        // precondition check and the acceptance atomic with respect to other
        // requests for this plan, and drops on every early return below.
        let guard = self.locks.try_acquire(plan_id).map_err(|e| match e {
            LockError::Held { plan_id, held_for } => RepairError::LockHeld { plan_id, held_for },
            LockError::AcquisitionFailed { reason } => RepairError::Internal { reason },
        })?;

        let plan = self.load(plan_id)?;
        self.check_dependencies(&phases, &plan)?;

        let shared = Arc::new(RunShared::new(plan_id.clone(), phases));
        let (abort_handle, abort_signal) = abort_pair();
        let abort_handle = Arc::new(abort_handle);
        let handle = RepairHandle::new(Arc::clone(&shared), Arc::clone(&abort_handle));

        info!(plan = %plan_id, phases = ?shared.phases, "repair accepted");
        tokio::spawn(run_task(
            shared,
            guard,
            Arc::clone(&self.executor),
            abort_handle,
            abort_signal,
            self.stall.duration,
        ));

        Ok(handle)
    }

    fn load(&self, plan_id: &PlanId) -> Result<CoursePlan, RepairError> {
        self.store.load(plan_id).map_err(RepairError::from_store)
    }

    /// Validate that every dependency of every requested phase is
    /// `Complete` per a fresh evaluator read.
    fn check_dependencies(
        &self,
        phases: &[PhaseId],
        plan: &CoursePlan,
    ) -> Result<(), RepairError> {
        let statuses = coursegen_status::evaluate(plan);
        for phase in phases {
            let definition = coursegen_status::definition(*phase);
            for dependency in definition.depends_on {
                let status = statuses
                    .iter()
                    .find(|s| s.phase == *dependency)
                    .ok_or_else(|| RepairError::Internal {
                        reason: format!("dependency '{dependency}' missing from evaluation"),
                    })?;
                if status.state != PhaseState::Complete {
                    return Err(RepairError::DependencyUnmet {
                        phase: *phase,
                        dependency: *dependency,
                        detail: format!("{}: {}", status.state, status.detail),
                    });
                }
            }
        }
        Ok(())
    }
}

enum Outcome {
    Done(Result<Result<(), ExecutorError>, tokio::task::JoinError>),
    Cancelled,
    Stalled,
}

/// Resolve once a full stall window passes with no new log record.
async fn watch_stall(log: Arc<RunLog>, stall: Duration) {
    let mut last_len = log.len();
    loop {
        tokio::time::sleep(stall).await;
        let len = log.len();
        if len == last_len {
            return;
        }
        last_len = len;
    }
}

/// Body of one repair run.
///
/// The lock guard lives exactly as long as this task: every exit path —
/// success, executor failure, cancellation, stall, even a panic unwinding
/// through — releases the lock.
async fn run_task(
    shared: Arc<RunShared>,
    guard: LockGuard,
    executor: Arc<dyn PhaseExecutor>,
    abort_handle: Arc<AbortHandle>,
    abort_signal: AbortSignal,
    stall: Duration,
) {
    let _guard = guard;
    shared.status_tx.send_replace(RunStatus::Running);

    for phase in shared.phases.clone() {
        if abort_signal.is_aborted() {
            shared.log.push(LogLevel::Info, "repair cancelled");
            shared.finish(RunStatus::Cancelled, None);
            return;
        }

        shared.log.push(LogLevel::Info, format!("starting {}", phase.label()));
        debug!(plan = %shared.plan_id, %phase, "invoking executor");

        // The executor runs on its own task: abandoning it on stall or
        // cancel leaves it free to run to natural completion, with the
        // abort signal as the cooperative stop request.
        let mut exec = {
            let executor = Arc::clone(&executor);
            let plan_id = shared.plan_id.clone();
            let log = Arc::clone(&shared.log);
            let abort = abort_signal.clone();
            tokio::spawn(
                async move { executor.execute(&plan_id, phase, log.as_ref(), &abort).await },
            )
        };

        let outcome = tokio::select! {
            result = &mut exec => Outcome::Done(result),
            () = abort_signal.aborted() => Outcome::Cancelled,
            () = watch_stall(Arc::clone(&shared.log), stall) => Outcome::Stalled,
        };

        match outcome {
            Outcome::Done(Ok(Ok(()))) => {
                debug!(plan = %shared.plan_id, %phase, "phase succeeded");
            }
            Outcome::Cancelled => {
                shared.log.push(LogLevel::Info, "repair cancelled");
                shared.finish(RunStatus::Cancelled, None);
                return;
            }
            Outcome::Done(Ok(Err(err))) => {
                let detail = match err {
                    ExecutorError::Aborted { .. } => {
                        shared.log.push(LogLevel::Info, "repair cancelled");
                        shared.finish(RunStatus::Cancelled, None);
                        return;
                    }
                    ExecutorError::Failed { detail, .. } => detail,
                    ExecutorError::Spawn { reason, .. } => reason,
                };
                let failure = RunFailure::Executor { phase, detail };
                warn!(plan = %shared.plan_id, %phase, %failure, "repair failed");
                shared.log.push(LogLevel::Error, failure.to_string());
                shared.finish(RunStatus::Failed, Some(failure));
                return;
            }
            Outcome::Done(Err(join_err)) => {
                let failure = RunFailure::Internal {
                    reason: format!("executor task failed: {join_err}"),
                };
                shared.log.push(LogLevel::Error, failure.to_string());
                shared.finish(RunStatus::Failed, Some(failure));
                return;
            }
            Outcome::Stalled => {
                abort_handle.abort();
                let failure = RunFailure::Timeout {
                    phase,
                    stalled_secs: stall.as_secs(),
                };
                warn!(plan = %shared.plan_id, %phase, %failure, "repair stalled");
                shared.log.push(LogLevel::Error, failure.to_string());
                shared.finish(RunStatus::Failed, Some(failure));
                return;
            }
        }
    }

    info!(plan = %shared.plan_id, "repair succeeded");
    shared.finish(RunStatus::Succeeded, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogRecord;
    use async_trait::async_trait;
    use coursegen_model::{Lesson, Module};
    use coursegen_phase_api::LogSink;
    use coursegen_store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What the scripted executor does when a phase is invoked.
    #[derive(Clone)]
    enum Script {
        /// Emit the lines, apply the fix to the stored plan, succeed.
        Succeed { lines: Vec<&'static str>, fix: Fix },
        /// Fail with the given detail, emitting nothing.
        Fail { detail: &'static str },
        /// Sleep forever, ignoring the abort signal (a hung executor).
        HangIgnoringAbort,
        /// Sleep until aborted, then report the abort (a cooperative executor).
        HangUntilAbort,
    }

    /// Plan mutation applied by a successful scripted phase.
    #[derive(Clone, Copy)]
    enum Fix {
        None,
        AddModules(usize),
        FillLessons,
        FillScripts,
    }

    struct ScriptedExecutor {
        store: Arc<MemoryStore>,
        script: Mutex<HashMap<PhaseId, Script>>,
        invoked: Mutex<Vec<PhaseId>>,
    }

    impl ScriptedExecutor {
        fn new(store: Arc<MemoryStore>) -> Self {
            Self {
                store,
                script: Mutex::new(HashMap::new()),
                invoked: Mutex::new(Vec::new()),
            }
        }

        fn set(&self, phase: PhaseId, script: Script) {
            self.script.lock().unwrap().insert(phase, script);
        }

        fn invoked(&self) -> Vec<PhaseId> {
            self.invoked.lock().unwrap().clone()
        }

        fn apply_fix(&self, plan_id: &PlanId, fix: Fix) {
            let mut plan = self.store.load(plan_id).unwrap();
            match fix {
                Fix::None => {}
                Fix::AddModules(n) => {
                    for i in 0..n {
                        plan.modules.push(Module {
                            id: format!("m{i}"),
                            title: format!("Module {i}"),
                            lessons: Vec::new(),
                        });
                    }
                }
                Fix::FillLessons => {
                    for module in &mut plan.modules {
                        if module.lessons.is_empty() {
                            module.lessons.push(Lesson {
                                id: format!("{}-l0", module.id),
                                title: "Generated lesson".to_string(),
                                voiceover_script: None,
                                quiz: None,
                            });
                        }
                    }
                }
                Fix::FillScripts => {
                    for module in &mut plan.modules {
                        for lesson in &mut module.lessons {
                            if lesson.voiceover_script.is_none() {
                                lesson.voiceover_script = Some("Generated narration.".to_string());
                            }
                        }
                    }
                }
            }
            self.store.save(&plan).unwrap();
        }
    }

    #[async_trait]
    impl PhaseExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            plan_id: &PlanId,
            phase: PhaseId,
            log: &dyn LogSink,
            abort: &AbortSignal,
        ) -> Result<(), ExecutorError> {
            self.invoked.lock().unwrap().push(phase);
            let script = self
                .script
                .lock()
                .unwrap()
                .get(&phase)
                .cloned()
                .unwrap_or(Script::Succeed {
                    lines: Vec::new(),
                    fix: Fix::None,
                });

            match script {
                Script::Succeed { lines, fix } => {
                    for line in lines {
                        log.append(line);
                    }
                    self.apply_fix(plan_id, fix);
                    Ok(())
                }
                Script::Fail { detail } => Err(ExecutorError::Failed {
                    phase,
                    detail: detail.to_string(),
                }),
                Script::HangIgnoringAbort => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
                Script::HangUntilAbort => {
                    abort.aborted().await;
                    Err(ExecutorError::Aborted { phase })
                }
            }
        }
    }

    struct Harness {
        engine: RepairEngine,
        executor: Arc<ScriptedExecutor>,
        store: Arc<MemoryStore>,
    }

    fn harness(plan: CoursePlan) -> Harness {
        let store = Arc::new(MemoryStore::with_plan(plan));
        let executor = Arc::new(ScriptedExecutor::new(Arc::clone(&store)));
        let engine = RepairEngine::new(
            Arc::clone(&store) as Arc<dyn ArtifactStore>,
            Arc::clone(&executor) as Arc<dyn PhaseExecutor>,
        );
        Harness {
            engine,
            executor,
            store,
        }
    }

    fn empty_plan(id: &str) -> CoursePlan {
        CoursePlan::new(id.parse().unwrap(), "Engine Test")
    }

    fn planned_plan(id: &str) -> CoursePlan {
        let mut plan = empty_plan(id);
        plan.modules = vec![
            Module {
                id: "m0".to_string(),
                title: "Module 0".to_string(),
                lessons: vec![Lesson {
                    id: "m0-l0".to_string(),
                    title: "Lesson".to_string(),
                    voiceover_script: None,
                    quiz: None,
                }],
            },
            Module {
                id: "m1".to_string(),
                title: "Module 1".to_string(),
                lessons: Vec::new(),
            },
        ];
        plan
    }

    fn messages(records: &[LogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.message.as_str()).collect()
    }

    #[tokio::test]
    async fn test_diagnostics_unknown_plan_is_not_found() {
        let h = harness(empty_plan("diag-exists"));
        let err = h
            .engine
            .diagnostics(&"diag-missing".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, RepairError::PlanNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let h = harness(empty_plan("req-empty"));
        let err = h
            .engine
            .request_repair(&"req-empty".parse().unwrap(), &[])
            .unwrap_err();
        assert!(matches!(err, RepairError::EmptyRequest));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected_before_side_effects() {
        let h = harness(empty_plan("req-token"));
        let plan_id: PlanId = "req-token".parse().unwrap();

        let err = h
            .engine
            .request_repair_by_tokens(&plan_id, &["master_plan", "transcoding"])
            .unwrap_err();
        assert!(matches!(err, RepairError::UnknownPhase { .. }));
        assert!(h.executor.invoked().is_empty());
        assert!(!h.engine.repair_active(&plan_id));
    }

    #[tokio::test]
    async fn test_dependency_gate_rejects_without_invoking_executor() {
        // Zero modules: master plan is Error, so enrichment is unrepairable.
        let h = harness(empty_plan("dep-gate"));
        let plan_id: PlanId = "dep-gate".parse().unwrap();

        let err = h
            .engine
            .request_repair(&plan_id, &[PhaseId::Enrichment])
            .unwrap_err();
        match err {
            RepairError::DependencyUnmet {
                phase, dependency, ..
            } => {
                assert_eq!(phase, PhaseId::Enrichment);
                assert_eq!(dependency, PhaseId::MasterPlan);
            }
            other => panic!("expected DependencyUnmet, got {other}"),
        }
        assert!(h.executor.invoked().is_empty());
        // Precondition failure left no lock behind.
        assert!(!h.engine.repair_active(&plan_id));
    }

    #[tokio::test]
    async fn test_phases_execute_in_dependency_order() {
        let h = harness(planned_plan("order"));
        let plan_id: PlanId = "order".parse().unwrap();

        // Requested backwards; executed forwards.
        let handle = h
            .engine
            .request_repair(&plan_id, &[PhaseId::Enrichment, PhaseId::LessonGeneration])
            .unwrap();
        let report = handle.wait().await;

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(
            h.executor.invoked(),
            vec![PhaseId::LessonGeneration, PhaseId::Enrichment]
        );
        assert_eq!(
            handle.phases(),
            &[PhaseId::LessonGeneration, PhaseId::Enrichment]
        );
    }

    #[tokio::test]
    async fn test_duplicate_phases_folded() {
        let h = harness(planned_plan("dedup"));
        let handle = h
            .engine
            .request_repair(
                &"dedup".parse().unwrap(),
                &[PhaseId::Enrichment, PhaseId::Enrichment],
            )
            .unwrap();
        let report = handle.wait().await;
        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(h.executor.invoked(), vec![PhaseId::Enrichment]);
    }

    #[tokio::test]
    async fn test_second_request_rejected_while_running() {
        let h = harness(planned_plan("mutex"));
        let plan_id: PlanId = "mutex".parse().unwrap();
        h.executor
            .set(PhaseId::LessonGeneration, Script::HangUntilAbort);

        let first = h
            .engine
            .request_repair(&plan_id, &[PhaseId::LessonGeneration])
            .unwrap();

        let second = h
            .engine
            .request_repair(&plan_id, &[PhaseId::Enrichment])
            .unwrap_err();
        assert!(matches!(second, RepairError::LockHeld { .. }));

        first.cancel();
        let report = first.wait().await;
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(!h.engine.repair_active(&plan_id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_exactly_one_wins() {
        let h = harness(planned_plan("race"));
        let plan_id: PlanId = "race".parse().unwrap();
        h.executor
            .set(PhaseId::LessonGeneration, Script::HangUntilAbort);

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let engine = h.engine.clone();
                let plan_id = plan_id.clone();
                tokio::spawn(async move {
                    engine.request_repair(&plan_id, &[PhaseId::LessonGeneration])
                })
            })
            .collect();

        let mut handles = Vec::new();
        let mut rejections = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(handle) => handles.push(handle),
                Err(RepairError::LockHeld { .. }) => rejections += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(handles.len(), 1, "exactly one request must win");
        assert_eq!(rejections, 3);

        handles[0].cancel();
        handles[0].wait().await;
    }

    #[tokio::test]
    async fn test_distinct_plans_repair_concurrently() {
        let store = Arc::new(MemoryStore::new());
        store.save(&planned_plan("multi-a")).unwrap();
        store.save(&planned_plan("multi-b")).unwrap();
        let executor = Arc::new(ScriptedExecutor::new(Arc::clone(&store)));
        let engine = RepairEngine::new(
            Arc::clone(&store) as Arc<dyn ArtifactStore>,
            Arc::clone(&executor) as Arc<dyn PhaseExecutor>,
        );

        let a = engine
            .request_repair(&"multi-a".parse().unwrap(), &[PhaseId::LessonGeneration])
            .unwrap();
        let b = engine
            .request_repair(&"multi-b".parse().unwrap(), &[PhaseId::LessonGeneration])
            .unwrap();

        assert_eq!(a.wait().await.status, RunStatus::Succeeded);
        assert_eq!(b.wait().await.status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_phases() {
        let h = harness(planned_plan("failfast"));
        let plan_id: PlanId = "failfast".parse().unwrap();
        h.executor.set(
            PhaseId::LessonGeneration,
            Script::Fail {
                detail: "expansion failed",
            },
        );

        let handle = h
            .engine
            .request_repair(&plan_id, &[PhaseId::LessonGeneration, PhaseId::Enrichment])
            .unwrap();
        let report = handle.wait().await;

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(
            report.failure,
            Some(RunFailure::Executor {
                phase: PhaseId::LessonGeneration,
                detail: "expansion failed".to_string(),
            })
        );
        // Enrichment never invoked.
        assert_eq!(h.executor.invoked(), vec![PhaseId::LessonGeneration]);
        // Lock released on failure.
        assert!(!h.engine.repair_active(&plan_id));

        // Logs contain exactly the start record and the error record.
        let records = handle.logs().collect_remaining().await;
        assert_eq!(
            messages(&records),
            vec![
                "starting Lesson Generation",
                "phase 'lesson_generation' failed: expansion failed",
            ]
        );
        assert_eq!(records[1].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn test_executor_lines_carried_verbatim_in_order() {
        let h = harness(empty_plan("lines"));
        h.executor.set(
            PhaseId::MasterPlan,
            Script::Succeed {
                lines: vec!["synthesizing outline", "wrote 3 modules"],
                fix: Fix::AddModules(3),
            },
        );

        let handle = h
            .engine
            .request_repair(&"lines".parse().unwrap(), &[PhaseId::MasterPlan])
            .unwrap();
        handle.wait().await;

        let records = handle.logs().collect_remaining().await;
        assert_eq!(
            messages(&records),
            vec!["starting Master Plan", "synthesizing outline", "wrote 3 modules"]
        );
    }

    #[tokio::test]
    async fn test_log_replay_after_termination() {
        let h = harness(planned_plan("replay"));
        let handle = h
            .engine
            .request_repair(&"replay".parse().unwrap(), &[PhaseId::LessonGeneration])
            .unwrap();
        handle.wait().await;

        // Two fresh subscriptions after the terminal state both replay the
        // identical full history.
        let first = handle.logs().collect_remaining().await;
        let second = handle.logs().collect_remaining().await;
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert_eq!(first[0].message, "starting Lesson Generation");
    }

    #[tokio::test]
    async fn test_successful_repair_converges_diagnostics() {
        use coursegen_phase_api::PhaseState;

        let h = harness(empty_plan("converge"));
        let plan_id: PlanId = "converge".parse().unwrap();
        h.executor.set(
            PhaseId::MasterPlan,
            Script::Succeed {
                lines: vec![],
                fix: Fix::AddModules(2),
            },
        );
        h.executor.set(
            PhaseId::LessonGeneration,
            Script::Succeed {
                lines: vec![],
                fix: Fix::FillLessons,
            },
        );
        h.executor.set(
            PhaseId::Enrichment,
            Script::Succeed {
                lines: vec![],
                fix: Fix::FillScripts,
            },
        );

        // Master plan first: it is the gate for the rest.
        let handle = h
            .engine
            .request_repair(&plan_id, &[PhaseId::MasterPlan])
            .unwrap();
        assert_eq!(handle.wait().await.status, RunStatus::Succeeded);

        let handle = h
            .engine
            .request_repair(
                &plan_id,
                &[PhaseId::Enrichment, PhaseId::LessonGeneration],
            )
            .unwrap();
        assert_eq!(handle.wait().await.status, RunStatus::Succeeded);

        let statuses = h.engine.diagnostics(&plan_id).unwrap();
        for status in &statuses[1..] {
            assert_eq!(
                status.state,
                PhaseState::Complete,
                "phase {} should be complete: {}",
                status.phase,
                status.detail
            );
        }
        // The store holds the converged plan.
        let plan = h.store.load(&plan_id).unwrap();
        assert_eq!(plan.modules_missing_lessons(), 0);
        assert_eq!(plan.lessons_missing_script(), 0);
    }

    #[tokio::test]
    async fn test_cancel_cooperative_executor() {
        let h = harness(planned_plan("cancel-coop"));
        let plan_id: PlanId = "cancel-coop".parse().unwrap();
        h.executor
            .set(PhaseId::LessonGeneration, Script::HangUntilAbort);

        let handle = h
            .engine
            .request_repair(&plan_id, &[PhaseId::LessonGeneration])
            .unwrap();
        handle.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("cancellation must terminate the run");
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(report.failure.is_none());
        assert!(!h.engine.repair_active(&plan_id));
    }

    #[tokio::test]
    async fn test_cancel_ignoring_executor_still_reaches_cancelled() {
        let h = harness(planned_plan("cancel-hung"));
        let plan_id: PlanId = "cancel-hung".parse().unwrap();
        h.executor
            .set(PhaseId::LessonGeneration, Script::HangIgnoringAbort);

        let handle = h
            .engine
            .request_repair(&plan_id, &[PhaseId::LessonGeneration])
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("cancellation must not wait for a hung executor");
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(!h.engine.repair_active(&plan_id));
    }

    #[tokio::test]
    async fn test_stalled_run_fails_with_timeout_and_releases_lock() {
        let h = harness(planned_plan("stall"));
        let plan_id: PlanId = "stall".parse().unwrap();
        h.executor
            .set(PhaseId::LessonGeneration, Script::HangIgnoringAbort);

        let engine = h
            .engine
            .clone()
            .with_stall_timeout(StallTimeout::from_duration(Duration::from_millis(100)));
        let handle = engine
            .request_repair(&plan_id, &[PhaseId::LessonGeneration])
            .unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("stall watchdog must terminate the run");
        assert_eq!(report.status, RunStatus::Failed);
        assert!(matches!(
            report.failure,
            Some(RunFailure::Timeout {
                phase: PhaseId::LessonGeneration,
                ..
            })
        ));
        assert!(!engine.repair_active(&plan_id));

        // The timeout detail landed in the log as an error record.
        let records = handle.logs().collect_remaining().await;
        let last = records.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.contains("no progress"));
    }

    #[tokio::test]
    async fn test_cancel_between_phases() {
        // Cancel raised while the first phase is in flight: the second phase
        // must never start.
        let h = harness(planned_plan("cancel-between"));
        let plan_id: PlanId = "cancel-between".parse().unwrap();
        h.executor
            .set(PhaseId::LessonGeneration, Script::HangUntilAbort);

        let handle = h
            .engine
            .request_repair(&plan_id, &[PhaseId::LessonGeneration, PhaseId::Enrichment])
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let report = handle.wait().await;
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(h.executor.invoked(), vec![PhaseId::LessonGeneration]);
    }
}
