//! Logic-based Benders decomposition for SUALBSP-2.
//!
//! The master assigns tasks to stations and bounds the cycle time; each
//! station's task set is then sequenced exactly, and stations whose true
//! load exceeds the master's cycle time feed cuts back into the master.
//!
//! # Loop
//!
//! ```text
//! RUN_MASTER -> EXTRACT_ASSIGNMENT
//!   -> per station: CHECK_CACHE -> SOLVE_OR_REUSE -> EMIT_CUTS
//!   -> CHECK_CONVERGENCE -> RUN_MASTER | DONE
//! ```
//!
//! The loop is driven by [`solve_with_lazy_constraints`]: every integer
//! master solution is handed to a [`BendersContext`], which owns the
//! station cache, the global bounds and the incumbent for one run.
//!
//! # Reference
//! Hooker (2007), "Planning and scheduling by logic-based Benders
//! decomposition"

mod cache;
mod config;
mod stats;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::cuts::{Cut, CutGenerator};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::lp::{
    solve_with_lazy_constraints, CallbackVerdict, GoodLpSolver, LazyConstraintCallback,
    LazyOutcome, MipSolution, MipSolver,
};
use crate::master::{MasterProblem, MasterSolution, MasterVars};
use crate::models::{
    naive_load_upper_bound, Instance, LineAssignment, LineSolution, StationId, StationPlan,
    StationTour, TaskSet,
};
use crate::subproblem::{solve_station, SequencingSolver, StationProblem};

pub use cache::{StationCache, StationOutcome, StationRecord};
pub use config::{BendersConfig, CutConfig};
pub use stats::{gap_percent, BendersResult, BendersStats, BoundSnapshot, CutCounts, Termination};

/// Benders solver for one instance.
///
/// # Example
///
/// ```
/// use u_linebalance::benders::{BendersConfig, BendersSolver, Termination};
/// use u_linebalance::models::{Instance, RawInstance};
/// use u_linebalance::subproblem::SequencingStrategy;
///
/// let instance = Instance::build(
///     RawInstance::new(2)
///         .with_tasks([2, 3, 4])
///         .with_precedence(0, 1)
///         .with_uniform_setups(1, 1),
/// )
/// .unwrap();
/// let config = BendersConfig::default().with_sequencing(SequencingStrategy::Enumeration);
/// let result = BendersSolver::new(&instance, config).solve().unwrap();
/// assert_eq!(result.termination, Termination::Converged);
/// assert_eq!(result.cycle_time, 7);
/// ```
pub struct BendersSolver<'a> {
    instance: &'a Instance,
    config: BendersConfig,
    mip: Arc<dyn MipSolver>,
    sequencer: Arc<dyn SequencingSolver>,
}

impl<'a> BendersSolver<'a> {
    /// Solver using `good_lp` for the master and the configured sequencing strategy.
    pub fn new(instance: &'a Instance, config: BendersConfig) -> Self {
        let mip: Arc<dyn MipSolver> = Arc::new(GoodLpSolver::new());
        let sequencer = config.sequencing.build(Arc::clone(&mip));
        Self {
            instance,
            config,
            mip,
            sequencer,
        }
    }

    /// Replaces the MIP backend. The sequencing strategy is rebuilt on it,
    /// so call this before [`with_sequencer`](Self::with_sequencer).
    pub fn with_mip_solver(mut self, mip: Arc<dyn MipSolver>) -> Self {
        self.sequencer = self.config.sequencing.build(Arc::clone(&mip));
        self.mip = mip;
        self
    }

    /// Replaces the sequencing strategy.
    pub fn with_sequencer(mut self, sequencer: Arc<dyn SequencingSolver>) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn config(&self) -> &BendersConfig {
        &self.config
    }

    /// Runs the decomposition to convergence or until the time limit.
    ///
    /// # Errors
    /// - `Config` for an invalid configuration
    /// - `IterationLimitExceeded` when `max_iterations` master solutions
    ///   did not settle the problem
    /// - backend failures (`Solver`, `Io`)
    ///
    /// Timeouts are not errors: they end the run with
    /// [`Termination::TimeLimitExceeded`] and the best line found so far.
    pub fn solve(&self) -> Result<BendersResult> {
        self.config.validate()?;
        let deadline = match self.config.time_limit() {
            Some(limit) => Deadline::new(limit),
            None => Deadline::unlimited(),
        };

        info!(
            "Benders: {} tasks, {} stations, cycle time in [{}, {}], master {:?}, sequencing {}",
            self.instance.task_count(),
            self.instance.station_count(),
            self.instance.min_cycle_time(),
            self.instance.max_cycle_time(),
            self.config.master,
            self.sequencer.name()
        );

        let mut master = MasterProblem::build(self.instance, self.config.master);
        let (model, vars) = master.parts_mut();
        let mut context = BendersContext::new(
            self.instance,
            &self.config,
            vars,
            self.sequencer.as_ref(),
            deadline,
        );

        let termination =
            match solve_with_lazy_constraints(self.mip.as_ref(), model, &mut context, &deadline) {
                Ok(LazyOutcome::Accepted { rounds, .. }) => {
                    debug!("master accepted after {rounds} solves");
                    Termination::Converged
                }
                Ok(LazyOutcome::Infeasible { rounds }) => {
                    debug!("master infeasible after {rounds} solves");
                    if context.incumbent.is_some() {
                        Termination::Converged
                    } else {
                        Termination::Infeasible
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!("time limit reached: {e}");
                    Termination::TimeLimitExceeded
                }
                Err(e) => {
                    if let Error::IterationLimitExceeded { limit } = e {
                        warn!("iteration limit of {limit} reached");
                    }
                    return Err(e);
                }
            };

        Ok(context.finish(termination))
    }
}

/// Best full line found so far.
#[derive(Debug, Clone)]
struct Incumbent {
    tours: Vec<StationTour>,
    cycle_time: i64,
}

/// State of one Benders run, handed to the master's lazy-constraint driver.
///
/// Owns the station cache, the global bounds, the incumbent, the cut pool
/// and the statistics. Lives for exactly one call to
/// [`BendersSolver::solve`].
pub struct BendersContext<'a> {
    instance: &'a Instance,
    config: &'a BendersConfig,
    vars: &'a MasterVars,
    sequencer: &'a dyn SequencingSolver,
    deadline: Deadline,
    cuts: CutGenerator<'a>,
    cache: StationCache,
    pool: HashSet<Cut>,
    lower_bound: i64,
    incumbent: Option<Incumbent>,
    stats: BendersStats,
}

impl<'a> BendersContext<'a> {
    pub fn new(
        instance: &'a Instance,
        config: &'a BendersConfig,
        vars: &'a MasterVars,
        sequencer: &'a dyn SequencingSolver,
        deadline: Deadline,
    ) -> Self {
        Self {
            instance,
            config,
            vars,
            sequencer,
            deadline,
            cuts: CutGenerator::new(instance),
            cache: StationCache::new(instance.station_count()),
            pool: HashSet::new(),
            lower_bound: instance.min_cycle_time(),
            incumbent: None,
            stats: BendersStats::default(),
        }
    }

    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    /// Cycle time of the incumbent.
    pub fn upper_bound(&self) -> Option<i64> {
        self.incumbent.as_ref().map(|inc| inc.cycle_time)
    }

    pub fn cache(&self) -> &StationCache {
        &self.cache
    }

    pub fn stats(&self) -> &BendersStats {
        &self.stats
    }

    /// Load cap for a station: the tour in topological order always fits,
    /// and with logic cuts on nothing above the incumbent is worth a tour.
    fn load_cap(&self, tasks: &TaskSet) -> i64 {
        let naive = naive_load_upper_bound(self.instance, tasks);
        match self.upper_bound() {
            Some(ub) if self.config.cuts.logic => naive.min(ub),
            _ => naive,
        }
    }

    fn raise_lower_bound(&mut self, master_cycle_time: i64) {
        let bound = match self.upper_bound() {
            Some(ub) => master_cycle_time.min(ub),
            None => master_cycle_time,
        };
        self.lower_bound = self.lower_bound.max(bound);
    }

    fn snapshot(&mut self, iteration: usize) {
        let snapshot = BoundSnapshot {
            iteration,
            lower: self.lower_bound,
            upper: self.upper_bound(),
        };
        self.stats.bound_history.push(snapshot);
    }

    /// Outcome per station, reusing cached task sets and solving the rest.
    fn solve_stations(
        &mut self,
        assignment: &LineAssignment,
        iteration: usize,
    ) -> Result<Vec<StationOutcome>> {
        let mut outcomes: Vec<Option<StationOutcome>> = Vec::with_capacity(assignment.len());
        let mut jobs: Vec<(StationId, i64)> = Vec::new();
        for (k, tasks) in assignment.iter().enumerate() {
            match self.cache.lookup(k, tasks) {
                Some(outcome) => {
                    debug!("station {k}: cache hit, load {:?}", outcome.load());
                    outcomes.push(Some(outcome.clone()));
                }
                None => {
                    jobs.push((k, self.load_cap(tasks)));
                    outcomes.push(None);
                }
            }
        }

        let instance = self.instance;
        let sequencer = self.sequencer;
        let deadline = self.deadline;
        let solve = |&(k, cap): &(StationId, i64)| -> Result<(StationId, StationOutcome)> {
            let problem = StationProblem::new(instance, k, &assignment[k], cap);
            match solve_station(sequencer, &problem, &deadline) {
                Ok(solution) => Ok((k, StationOutcome::Solved(solution))),
                Err(Error::InfeasibleStationAssignment { .. }) => {
                    Ok((k, StationOutcome::Infeasible))
                }
                Err(e) => Err(e),
            }
        };

        let started = Instant::now();
        let solved: Result<Vec<(StationId, StationOutcome)>> = if self.config.parallel_subproblems {
            jobs.par_iter().map(solve).collect()
        } else {
            jobs.iter().map(solve).collect()
        };
        self.stats.subproblem_secs += started.elapsed().as_secs_f64();
        let solved = solved?;

        for (k, outcome) in solved {
            self.stats.subproblems_solved += 1;
            if let StationOutcome::Solved(solution) = &outcome {
                self.stats.subproblem_nodes += solution.nodes;
            }
            debug!("station {k}: solved {:?}, load {:?}", assignment[k], outcome.load());
            let stored = self.cache.insert(k, assignment[k].clone(), outcome, iteration);
            outcomes[k] = Some(stored.clone());
        }

        outcomes
            .into_iter()
            .enumerate()
            .map(|(k, outcome)| {
                outcome.ok_or_else(|| Error::Solver(format!("station {k} was not solved")))
            })
            .collect()
    }

    /// Station cuts for the current candidate, plus the incumbent update.
    ///
    /// Returns the cuts and whether the candidate is converged.
    fn examine(
        &mut self,
        assignment: &LineAssignment,
        cycle_time: i64,
        outcomes: &[StationOutcome],
    ) -> (Vec<Cut>, bool) {
        let cut_config = self.config.cuts;
        let mut cuts = Vec::new();
        let mut converged = true;

        for (k, outcome) in outcomes.iter().enumerate() {
            let tasks = &assignment[k];
            match outcome {
                StationOutcome::Infeasible => {
                    converged = false;
                    if cut_config.logic {
                        cuts.push(self.cuts.logic(k, tasks));
                    }
                }
                StationOutcome::Solved(solution) if solution.load() > cycle_time => {
                    converged = false;
                    let load = solution.load();
                    if cut_config.inference_simple {
                        cuts.push(self.cuts.simple_inference(k, tasks, load));
                    }
                    if cut_config.inference_smart {
                        cuts.push(self.cuts.smart_inference(k, tasks, load));
                    }
                    if cut_config.inference_smartest {
                        cuts.push(self.cuts.smartest_inference(k, tasks, load));
                    }
                }
                StationOutcome::Solved(_) => {}
            }
        }

        let tours: Option<Vec<StationTour>> = outcomes
            .iter()
            .map(|outcome| match outcome {
                StationOutcome::Solved(solution) => Some(solution.tour.clone()),
                StationOutcome::Infeasible => None,
            })
            .collect();
        if let Some(tours) = tours {
            let line_cycle = tours.iter().map(|t| t.load).max().unwrap_or(0);
            if self.upper_bound().map_or(true, |ub| line_cycle < ub) {
                info!("new incumbent with cycle time {line_cycle}");
                self.incumbent = Some(Incumbent {
                    tours,
                    cycle_time: line_cycle,
                });
                if cut_config.global_bounds {
                    cuts.push(self.cuts.global_upper_bound(line_cycle));
                }
            }
        }

        if !converged && cut_config.nogood {
            cuts.push(self.cuts.nogood(assignment, cycle_time));
        }
        (cuts, converged)
    }

    /// Drops cuts already sent, and makes sure the candidate is cut off.
    fn admit(&mut self, cuts: Vec<Cut>, assignment: &LineAssignment, cycle_time: i64) -> Vec<Cut> {
        let mut fresh: Vec<Cut> = cuts
            .into_iter()
            .filter(|cut| self.pool.insert(cut.clone()))
            .collect();

        let excludes_candidate = fresh
            .iter()
            .any(|cut| !cut.is_satisfied_by(assignment, cycle_time));
        if !excludes_candidate {
            let nogood = self.cuts.nogood(assignment, cycle_time);
            debug!("no new cut excludes the candidate, adding a nogood");
            if self.pool.insert(nogood.clone()) {
                fresh.push(nogood);
            }
        }

        for cut in &fresh {
            debug!(
                "{:?} cut (station {:?}): {} terms, rhs {}",
                cut.family,
                cut.station,
                cut.terms.len(),
                cut.rhs
            );
            self.stats.cuts.record(cut.family);
        }
        fresh
    }

    /// Closes the run and builds the result record.
    fn finish(mut self, termination: Termination) -> BendersResult {
        self.stats.total_secs = self.deadline.elapsed().as_secs_f64();
        self.stats.cache_hits = self.cache.hits();

        let counts = self.stats.cuts;
        info!(
            "Benders finished ({termination:?}) after {} iterations: {} cuts \
             (logic {}, simple {}, smart {}, smartest {}, nogood {}, bounds {}), {} cache hits",
            self.stats.iterations,
            counts.total(),
            counts.logic,
            counts.inference_simple,
            counts.inference_smart,
            counts.inference_smartest,
            counts.nogood,
            counts.global_bounds,
            self.stats.cache_hits
        );

        let Some(incumbent) = self.incumbent else {
            return BendersResult::empty(termination, self.stats);
        };

        let upper = incumbent.cycle_time;
        let lower = match termination {
            Termination::Converged => upper,
            _ => self.lower_bound.min(upper),
        };
        let stations: Vec<StationPlan> = incumbent
            .tours
            .into_iter()
            .enumerate()
            .map(|(k, tour)| StationPlan::from_tour(k, tour))
            .collect();

        BendersResult {
            termination,
            feasible: true,
            optimal: lower >= upper,
            cycle_time: upper,
            lower_bound: lower,
            gap_percent: gap_percent(lower, upper),
            solution: Some(LineSolution::new(stations)),
            stats: self.stats,
        }
    }
}

impl LazyConstraintCallback for BendersContext<'_> {
    fn on_integer_solution(&mut self, candidate: &MipSolution) -> Result<CallbackVerdict> {
        self.stats.master_solves += 1;
        self.stats.master_nodes += candidate.node_count;
        self.stats.master_secs += candidate.solve_time.as_secs_f64();

        if self.stats.iterations >= self.config.max_iterations {
            return Err(Error::IterationLimitExceeded {
                limit: self.config.max_iterations,
            });
        }
        if self.deadline.is_expired() {
            return Err(Error::MasterTimeout);
        }
        self.stats.iterations += 1;
        let iteration = self.stats.iterations;

        let MasterSolution {
            assignment,
            cycle_time,
            ..
        } = self.vars.decode(candidate);
        self.raise_lower_bound(cycle_time);

        if let Some(ub) = self.upper_bound() {
            if cycle_time >= ub {
                info!(
                    "iteration {iteration}: master {cycle_time} meets incumbent {ub}, gap closed"
                );
                self.snapshot(iteration);
                return Ok(CallbackVerdict::Accept);
            }
        }

        let outcomes = self.solve_stations(&assignment, iteration)?;
        let (cuts, converged) = self.examine(&assignment, cycle_time, &outcomes);
        if converged {
            self.lower_bound = self.lower_bound.max(cycle_time);
        }

        let upper = self.upper_bound();
        info!(
            "iteration {iteration}: master cycle time {cycle_time}, best {}, gap {}%",
            upper.map_or_else(|| "-".to_string(), |ub| ub.to_string()),
            upper.map_or(f64::INFINITY, |ub| gap_percent(self.lower_bound, ub))
        );
        self.snapshot(iteration);

        if converged {
            return Ok(CallbackVerdict::Accept);
        }

        let cuts = self.admit(cuts, &assignment, cycle_time);
        let constraints = cuts.iter().map(|cut| self.vars.constraint_for(cut)).collect();
        Ok(CallbackVerdict::AddCuts(constraints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::master::MasterFormulation;
    use crate::models::{RawInstance, TaskId};
    use crate::subproblem::{EnumerationSequencer, SequencingStrategy, StationSolution};
    use crate::validation::verify_solution;

    fn toy() -> Instance {
        Instance::build(
            RawInstance::new(2)
                .with_tasks([2, 3, 4])
                .with_precedence(0, 1)
                .with_uniform_setups(1, 1),
        )
        .unwrap()
    }

    fn enumeration() -> BendersConfig {
        BendersConfig::default().with_sequencing(SequencingStrategy::Enumeration)
    }

    /// Enumeration that records every task set it is asked to sequence.
    #[derive(Default)]
    struct CountingSequencer {
        inner: EnumerationSequencer,
        calls: Mutex<HashMap<(StationId, Vec<TaskId>), usize>>,
    }

    impl CountingSequencer {
        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }

        fn max_repeats(&self) -> usize {
            self.calls.lock().unwrap().values().copied().max().unwrap_or(0)
        }
    }

    impl SequencingSolver for CountingSequencer {
        fn name(&self) -> &str {
            "counting"
        }

        fn sequence(
            &self,
            problem: &StationProblem<'_>,
            deadline: &Deadline,
        ) -> Result<StationSolution> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry((problem.station, problem.task_list()))
                .or_default() += 1;
            self.inner.sequence(problem, deadline)
        }
    }

    /// Setups from distances on a line, so the triangle inequality holds.
    fn random_instance(rng: &mut StdRng, tasks: usize, stations: usize) -> Instance {
        let positions: Vec<i64> = (0..tasks).map(|_| rng.random_range(0..6)).collect();
        let mut raw = RawInstance::new(stations)
            .with_tasks((0..tasks).map(|_| rng.random_range(1..8)));
        for i in 0..tasks {
            for j in (i + 1)..tasks {
                if rng.random_bool(0.25) {
                    raw = raw.with_precedence(i, j);
                }
            }
        }
        for i in 0..tasks {
            for j in 0..tasks {
                let distance = (positions[i] - positions[j]).abs();
                if i != j {
                    raw = raw.with_forward_setup(i, j, distance);
                }
                raw = raw.with_backward_setup(i, j, distance + 1);
            }
        }
        Instance::build(raw).unwrap()
    }

    /// Optimal cycle time by trying every precedence-respecting assignment.
    fn brute_force(instance: &Instance) -> i64 {
        let k = instance.station_count();
        let n = instance.task_count();
        let sequencer = EnumerationSequencer::default();
        let deadline = Deadline::unlimited();
        let mut best = i64::MAX;
        for code in 0..k.pow(n as u32) {
            let station_of: Vec<usize> = (0..n).map(|i| code / k.pow(i as u32) % k).collect();
            if instance
                .precedences()
                .iter()
                .any(|&(a, b)| station_of[a] > station_of[b])
            {
                continue;
            }
            let mut assignment: LineAssignment = vec![TaskSet::new(); k];
            for (task, &s) in station_of.iter().enumerate() {
                assignment[s].insert(task);
            }
            if assignment.iter().any(TaskSet::is_empty) {
                continue;
            }
            let cycle = assignment
                .iter()
                .enumerate()
                .map(|(s, tasks)| {
                    let problem = StationProblem::new(instance, s, tasks, i64::MAX / 4);
                    solve_station(&sequencer, &problem, &deadline).unwrap().load()
                })
                .max()
                .unwrap();
            best = best.min(cycle);
        }
        best
    }

    fn assert_optimal_toy(result: &BendersResult, instance: &Instance) {
        assert_eq!(result.termination, Termination::Converged);
        assert!(result.feasible && result.optimal);
        assert_eq!(result.cycle_time, 7);
        assert_eq!(result.lower_bound, 7);
        assert_eq!(result.gap_percent, 0.0);
        let solution = result.solution.as_ref().unwrap();
        assert_eq!(solution.cycle_time, 7);
        verify_solution(instance, solution).unwrap();
    }

    #[test]
    fn test_toy_enumeration() {
        let inst = toy();
        let result = BendersSolver::new(&inst, enumeration()).solve().unwrap();
        assert_optimal_toy(&result, &inst);
        assert!(result.stats.iterations >= 1);
        assert!(result.stats.cuts.total() >= 1);
    }

    #[test]
    fn test_toy_mip_sequencing() {
        let inst = toy();
        let result = BendersSolver::new(&inst, BendersConfig::default())
            .solve()
            .unwrap();
        assert_optimal_toy(&result, &inst);
    }

    #[test]
    fn test_toy_every_cut_setting() {
        let inst = toy();
        let settings = [
            CutConfig {
                inference_smart: true,
                ..CutConfig::default()
            },
            CutConfig {
                inference_simple: false,
                inference_smartest: true,
                ..CutConfig::default()
            },
            CutConfig {
                nogood: true,
                logic: false,
                inference_simple: false,
                inference_smart: false,
                inference_smartest: false,
                global_bounds: false,
            },
        ];
        for cuts in settings {
            let result = BendersSolver::new(&inst, enumeration().with_cuts(cuts))
                .solve()
                .unwrap();
            assert_optimal_toy(&result, &inst);
        }
    }

    #[test]
    fn test_toy_scheduling_master() {
        let inst = toy();
        let config = enumeration().with_master(MasterFormulation::Scheduling);
        let result = BendersSolver::new(&inst, config).solve().unwrap();
        assert_optimal_toy(&result, &inst);
    }

    #[test]
    fn test_toy_parallel() {
        let inst = toy();
        let config = enumeration().with_parallel_subproblems(true);
        let result = BendersSolver::new(&inst, config).solve().unwrap();
        assert_optimal_toy(&result, &inst);
    }

    #[test]
    fn test_sequencer_never_repeats_a_task_set() {
        let mut rng = StdRng::seed_from_u64(11);
        let inst = random_instance(&mut rng, 7, 3);
        let counting = Arc::new(CountingSequencer::default());
        let result = BendersSolver::new(&inst, enumeration())
            .with_sequencer(counting.clone())
            .solve()
            .unwrap();
        assert!(result.feasible);
        assert!(counting.max_repeats() <= 1);
        assert!(counting.total_calls() <= result.stats.subproblems_solved);
    }

    #[test]
    fn test_cached_station_is_identical() {
        let inst = toy();
        let config = enumeration();
        let master = MasterProblem::build(&inst, MasterFormulation::Assignment);
        let counting = CountingSequencer::default();
        let mut context =
            BendersContext::new(&inst, &config, master.vars(), &counting, Deadline::unlimited());
        let assignment: LineAssignment = vec![[0, 2].into(), [1].into()];

        let first = context.solve_stations(&assignment, 1).unwrap();
        let calls = counting.total_calls();
        let second = context.solve_stations(&assignment, 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(counting.total_calls(), calls);
        assert_eq!(context.cache().hits(), 2);
        assert_eq!(context.cache().history(0).len(), 1);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..4 {
            let inst = random_instance(&mut rng, 6, 3);
            let expected = brute_force(&inst);
            let result = BendersSolver::new(&inst, enumeration()).solve().unwrap();
            assert_eq!(result.termination, Termination::Converged);
            assert_eq!(result.cycle_time, expected);
            verify_solution(&inst, result.solution.as_ref().unwrap()).unwrap();
        }
    }

    #[test]
    fn test_bounds_monotone() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..3 {
            let inst = random_instance(&mut rng, 7, 3);
            let result = BendersSolver::new(&inst, enumeration()).solve().unwrap();
            assert!(!result.stats.bound_history.is_empty());
            assert!(result.stats.bounds_are_monotone());
            let last = result.stats.bound_history.last().unwrap();
            assert!(last.lower <= result.cycle_time);
        }
    }

    #[test]
    fn test_idempotent() {
        let mut rng = StdRng::seed_from_u64(99);
        let inst = random_instance(&mut rng, 7, 3);
        let first = BendersSolver::new(&inst, enumeration()).solve().unwrap();
        let second = BendersSolver::new(&inst, enumeration()).solve().unwrap();
        assert_eq!(first.cycle_time, second.cycle_time);
        assert_eq!(
            first.solution.map(|s| s.assignment()),
            second.solution.map(|s| s.assignment())
        );
    }

    #[test]
    fn test_iteration_limit_is_error() {
        let inst = toy();
        let config = enumeration().with_max_iterations(1);
        let err = BendersSolver::new(&inst, config).solve().unwrap_err();
        assert!(matches!(err, Error::IterationLimitExceeded { limit: 1 }));
    }

    #[test]
    fn test_zero_time_limit() {
        let inst = toy();
        let config = enumeration().with_time_limit_secs(0.0);
        let result = BendersSolver::new(&inst, config).solve().unwrap();
        assert_eq!(result.termination, Termination::TimeLimitExceeded);
        assert!(!result.feasible);
        assert_eq!(result.cycle_time, 0);
        assert!(result.solution.is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let inst = toy();
        let config = enumeration().with_max_iterations(0);
        let err = BendersSolver::new(&inst, config).solve().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_single_station() {
        let inst = Instance::build(
            RawInstance::new(1)
                .with_tasks([2, 3, 4])
                .with_precedence(0, 1)
                .with_uniform_setups(1, 1),
        )
        .unwrap();
        let result = BendersSolver::new(&inst, enumeration()).solve().unwrap();
        assert!(result.optimal);
        // 0 -> 1 -> 2 forward, 2 -> 0 backward
        assert_eq!(result.cycle_time, 12);
    }
}
