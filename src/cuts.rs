//! Benders cuts over the master's assignment and cycle-time variables.
//!
//! Every cut has the canonical form
//!
//! ```text
//! cycle_coef · c + Σ coef · x[task][station] >= rhs
//! ```
//!
//! with integer coefficients derived from static instance data and the
//! offending station's task set `S` and load `L` only.
//!
//! # Families
//!
//! | Family | Inequality |
//! |--------|-----------|
//! | Nogood | `c >= C + 1 - Σ_k Σ_{i∈A_k} (1 - x_ik)` |
//! | Logic | `Σ_{i∈S} (1 - x_ik) >= 1` |
//! | Simple inference | `c >= L - L · Σ_{i∈S} (1 - x_ik)` |
//! | Smart inference | `c >= L - Σ_{i∈S} b_i (1 - x_ik)` |
//! | Smartest inference | `c >= L - Σ_{i∈S} u_i (1 - x_ik) + Σ_{o∉S} l_o x_ok` |
//! | Global upper bound | `c <= UB` |
//!
//! `b_i` bounds the load saved by removing `i` (processing time plus the
//! most expensive incident setups, minus the cheapest link that could
//! replace them). `u_i` is the same bound without the link credit. `l_o`
//! bounds the load added by inserting `o` (processing time plus the cheapest
//! incident setups, minus the most expensive link it could replace).
//!
//! Inference cuts rely on station loads not decreasing when tasks are added,
//! which holds when setups obey the triangle inequality.
//!
//! # Reference
//! Hooker & Ottosson (2003), "Logic-based Benders decomposition";
//! Esmaeilbeigi, Naderi & Charkhgard (2016), "New formulations for the
//! setup assembly line balancing and scheduling problem"

use serde::{Deserialize, Serialize};

use crate::models::{Instance, LineAssignment, StationId, TaskId, TaskSet};

/// Cut family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutFamily {
    Nogood,
    Logic,
    SimpleInference,
    SmartInference,
    SmartestInference,
    GlobalUpperBound,
}

/// `coef · x[task][station]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CutTerm {
    pub task: TaskId,
    pub station: StationId,
    pub coef: i64,
}

/// A linear cut `cycle_coef · c + Σ terms >= rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cut {
    pub family: CutFamily,
    /// Station whose outcome produced the cut, if station-specific.
    pub station: Option<StationId>,
    pub cycle_coef: i64,
    pub terms: Vec<CutTerm>,
    pub rhs: i64,
}

impl Cut {
    /// Left-hand side under a full assignment and cycle time.
    pub fn lhs(&self, assignment: &LineAssignment, cycle_time: i64) -> i64 {
        self.cycle_coef * cycle_time
            + self
                .terms
                .iter()
                .filter(|t| {
                    assignment
                        .get(t.station)
                        .is_some_and(|tasks| tasks.contains(&t.task))
                })
                .map(|t| t.coef)
                .sum::<i64>()
    }

    /// Whether the assignment and cycle time satisfy the cut.
    pub fn is_satisfied_by(&self, assignment: &LineAssignment, cycle_time: i64) -> bool {
        self.lhs(assignment, cycle_time) >= self.rhs
    }
}

/// Static per-task setup extremes used by the inference cuts.
#[derive(Debug, Clone)]
struct SetupExtremes {
    max_in: i64,
    max_out: i64,
    min_in: i64,
    min_out: i64,
    /// Cheapest allowed transition avoiding the task.
    min_link: i64,
    /// Most expensive allowed transition avoiding the task.
    max_link: i64,
}

/// Builds cuts for one instance.
#[derive(Debug, Clone)]
pub struct CutGenerator<'a> {
    instance: &'a Instance,
    extremes: Vec<SetupExtremes>,
}

impl<'a> CutGenerator<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        // (cost, from, to) of every transition a tour may use, including the
        // backward self-setup that closes a one-task station.
        let mut links: Vec<(i64, TaskId, TaskId)> = Vec::new();
        for a in instance.tasks() {
            links.extend(
                instance
                    .follow_forward(a)
                    .iter()
                    .map(|&b| (instance.forward_setup(a, b), a, b)),
            );
            links.extend(
                instance
                    .follow_backward(a)
                    .iter()
                    .map(|&b| (instance.backward_setup(a, b), a, b)),
            );
            links.push((instance.backward_setup(a, a), a, a));
        }
        links.sort_unstable();

        let avoiding =
            |task: TaskId, link: &&(i64, TaskId, TaskId)| link.1 != task && link.2 != task;

        let extremes = instance
            .tasks()
            .map(|i| {
                let incoming: Vec<i64> = instance
                    .precede_forward(i)
                    .iter()
                    .map(|&j| instance.forward_setup(j, i))
                    .chain(
                        instance
                            .precede_backward(i)
                            .iter()
                            .map(|&j| instance.backward_setup(j, i)),
                    )
                    .collect();
                let outgoing: Vec<i64> = instance
                    .follow_forward(i)
                    .iter()
                    .map(|&j| instance.forward_setup(i, j))
                    .chain(
                        instance
                            .follow_backward(i)
                            .iter()
                            .map(|&j| instance.backward_setup(i, j)),
                    )
                    .collect();

                SetupExtremes {
                    max_in: incoming.iter().copied().max().unwrap_or(0),
                    max_out: outgoing.iter().copied().max().unwrap_or(0),
                    min_in: incoming.iter().copied().min().unwrap_or(0),
                    min_out: outgoing.iter().copied().min().unwrap_or(0),
                    min_link: links
                        .iter()
                        .find(|l| avoiding(i, l))
                        .map_or(0, |l| l.0),
                    max_link: links
                        .iter()
                        .rev()
                        .find(|l| avoiding(i, l))
                        .map_or(0, |l| l.0),
                }
            })
            .collect();

        Self { instance, extremes }
    }

    /// Upper bound on the load saved by removing `task`, with link credit.
    pub fn removal_burden(&self, task: TaskId) -> i64 {
        let e = &self.extremes[task];
        (self.instance.processing_time(task) + e.max_in + e.max_out - e.min_link).max(0)
    }

    /// Upper bound on the load saved by removing `task`, without link credit.
    pub fn removal_burden_upper(&self, task: TaskId) -> i64 {
        let e = &self.extremes[task];
        self.instance.processing_time(task) + e.max_in + e.max_out
    }

    /// Lower bound on the load added by inserting `task` into a station.
    pub fn insertion_burden(&self, task: TaskId) -> i64 {
        let e = &self.extremes[task];
        (self.instance.processing_time(task) + e.min_in + e.min_out - e.max_link).max(0)
    }

    /// Excludes exactly `assignment` at cycle times up to `cycle_time`.
    pub fn nogood(&self, assignment: &LineAssignment, cycle_time: i64) -> Cut {
        let terms: Vec<CutTerm> = assignment
            .iter()
            .enumerate()
            .flat_map(|(station, tasks)| {
                tasks.iter().map(move |&task| CutTerm {
                    task,
                    station,
                    coef: -1,
                })
            })
            .collect();
        let assigned = terms.len() as i64;
        Cut {
            family: CutFamily::Nogood,
            station: None,
            cycle_coef: 1,
            terms,
            rhs: cycle_time + 1 - assigned,
        }
    }

    /// At least one task of `tasks` leaves `station`.
    pub fn logic(&self, station: StationId, tasks: &TaskSet) -> Cut {
        Cut {
            family: CutFamily::Logic,
            station: Some(station),
            cycle_coef: 0,
            terms: station_terms(station, tasks, |_| -1),
            rhs: 1 - tasks.len() as i64,
        }
    }

    /// `c >= load` while all of `tasks` stay on `station`, big-M = `load`.
    pub fn simple_inference(&self, station: StationId, tasks: &TaskSet, load: i64) -> Cut {
        Cut {
            family: CutFamily::SimpleInference,
            station: Some(station),
            cycle_coef: 1,
            terms: station_terms(station, tasks, |_| -load),
            rhs: load - load * tasks.len() as i64,
        }
    }

    /// Each removed task lowers the bound by its removal burden.
    pub fn smart_inference(&self, station: StationId, tasks: &TaskSet, load: i64) -> Cut {
        let burdens: i64 = tasks.iter().map(|&t| self.removal_burden(t)).sum();
        Cut {
            family: CutFamily::SmartInference,
            station: Some(station),
            cycle_coef: 1,
            terms: station_terms(station, tasks, |t| -self.removal_burden(t)),
            rhs: load - burdens,
        }
    }

    /// Removal burdens for `tasks`, insertion burdens for every other task.
    pub fn smartest_inference(&self, station: StationId, tasks: &TaskSet, load: i64) -> Cut {
        let burdens: i64 = tasks.iter().map(|&t| self.removal_burden_upper(t)).sum();
        let mut terms = station_terms(station, tasks, |t| -self.removal_burden_upper(t));
        terms.extend(
            self.instance
                .tasks()
                .filter(|t| !tasks.contains(t))
                .map(|task| CutTerm {
                    task,
                    station,
                    coef: -self.insertion_burden(task),
                })
                .filter(|t| t.coef != 0),
        );
        Cut {
            family: CutFamily::SmartestInference,
            station: Some(station),
            cycle_coef: 1,
            terms,
            rhs: load - burdens,
        }
    }

    /// `c <= upper_bound`.
    pub fn global_upper_bound(&self, upper_bound: i64) -> Cut {
        Cut {
            family: CutFamily::GlobalUpperBound,
            station: None,
            cycle_coef: -1,
            terms: Vec::new(),
            rhs: -upper_bound,
        }
    }
}

fn station_terms(
    station: StationId,
    tasks: &TaskSet,
    coef: impl Fn(TaskId) -> i64,
) -> Vec<CutTerm> {
    tasks
        .iter()
        .map(|&task| CutTerm {
            task,
            station,
            coef: coef(task),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Deadline;
    use crate::models::RawInstance;
    use crate::subproblem::{solve_station, EnumerationSequencer, StationProblem};

    fn set(items: &[TaskId]) -> TaskSet {
        items.iter().copied().collect()
    }

    fn toy() -> Instance {
        Instance::build(
            RawInstance::new(2)
                .with_tasks([2, 3, 4])
                .with_precedence(0, 1)
                .with_uniform_setups(1, 1),
        )
        .unwrap()
    }

    fn optimal_load(inst: &Instance, tasks: &TaskSet) -> i64 {
        let problem = StationProblem::new(inst, 0, tasks, i64::MAX / 4);
        solve_station(&EnumerationSequencer::default(), &problem, &Deadline::unlimited())
            .unwrap()
            .load()
    }

    /// Every assignment of the toy instance the master accepts, with its
    /// true cycle time.
    fn feasible_solutions(inst: &Instance) -> Vec<(LineAssignment, i64)> {
        let k = inst.station_count();
        let n = inst.task_count();
        let mut out = Vec::new();
        for code in 0..k.pow(n as u32) {
            let mut station_of = vec![0; n];
            let mut c = code;
            for slot in station_of.iter_mut() {
                *slot = c % k;
                c /= k;
            }
            let mut assignment: LineAssignment = vec![TaskSet::new(); k];
            for (task, &s) in station_of.iter().enumerate() {
                assignment[s].insert(task);
            }
            let precedence_ok = inst
                .precedences()
                .iter()
                .all(|&(a, b)| station_of[a] <= station_of[b]);
            if !precedence_ok || assignment.iter().any(|s| s.is_empty()) {
                continue;
            }
            let cycle = assignment.iter().map(|s| optimal_load(inst, s)).max().unwrap();
            out.push((assignment, cycle));
        }
        out
    }

    #[test]
    fn test_logic_cut() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        let cut = gen.logic(1, &set(&[0, 2]));
        assert_eq!(cut.rhs, -1);
        assert_eq!(cut.cycle_coef, 0);
        assert!(!cut.is_satisfied_by(&vec![set(&[1]), set(&[0, 2])], 8));
        assert!(cut.is_satisfied_by(&vec![set(&[0, 2]), set(&[1])], 8));
    }

    #[test]
    fn test_simple_inference_cut() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        let cut = gen.simple_inference(0, &set(&[0, 2]), 8);
        // c - 8 x00 - 8 x20 >= -8
        assert_eq!(cut.rhs, -8);
        assert!(cut.terms.iter().all(|t| t.coef == -8 && t.station == 0));
        assert!(!cut.is_satisfied_by(&vec![set(&[0, 2]), set(&[1])], 6));
        assert!(cut.is_satisfied_by(&vec![set(&[0, 2]), set(&[1])], 8));
        assert!(cut.is_satisfied_by(&vec![set(&[2]), set(&[0, 1])], 0));
    }

    #[test]
    fn test_toy_burdens() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        // p + 1 + 1 - 0 (self-closing setups are free)
        assert_eq!(gen.removal_burden(0), 4);
        assert_eq!(gen.removal_burden(2), 6);
        assert_eq!(gen.removal_burden_upper(1), 5);
        // p + 1 + 1 - 1
        assert_eq!(gen.insertion_burden(0), 3);
        assert_eq!(gen.insertion_burden(2), 5);
    }

    #[test]
    fn test_smart_cut_tighter_than_simple() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        let tasks = set(&[0, 2]);
        let smart = gen.smart_inference(0, &tasks, 8);
        assert_eq!(smart.rhs, 8 - 4 - 6);
        // With task 0 moved away the simple cut drops to 0, the smart one to 4.
        let partial = vec![set(&[2]), set(&[0, 1])];
        let simple = gen.simple_inference(0, &tasks, 8);
        assert_eq!(simple.lhs(&partial, 0) - simple.rhs, 0);
        assert_eq!(smart.lhs(&partial, 0) - smart.rhs, -4);
    }

    #[test]
    fn test_smartest_cut_counts_other_tasks() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        let cut = gen.smartest_inference(0, &set(&[2]), 4);
        let others: Vec<_> = cut.terms.iter().filter(|t| t.task != 2).collect();
        assert_eq!(others.len(), 2);
        assert!(others.iter().all(|t| t.coef < 0));
        // {1, 2} on station 0: c >= 4 + 4
        assert!(!cut.is_satisfied_by(&vec![set(&[1, 2]), set(&[0])], 7));
        assert!(cut.is_satisfied_by(&vec![set(&[1, 2]), set(&[0])], 8));
    }

    #[test]
    fn test_nogood_excludes_only_that_assignment() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        let a = vec![set(&[0, 2]), set(&[1])];
        let cut = gen.nogood(&a, 6);
        assert!(!cut.is_satisfied_by(&a, 6));
        assert!(cut.is_satisfied_by(&a, 7));
        assert!(cut.is_satisfied_by(&vec![set(&[2]), set(&[0, 1])], 6));
    }

    #[test]
    fn test_global_upper_bound() {
        let inst = toy();
        let cut = CutGenerator::new(&inst).global_upper_bound(7);
        let a = vec![set(&[2]), set(&[0, 1])];
        assert!(cut.is_satisfied_by(&a, 7));
        assert!(!cut.is_satisfied_by(&a, 8));
    }

    #[test]
    fn test_inference_cuts_keep_every_feasible_solution() {
        let inst = toy();
        let gen = CutGenerator::new(&inst);
        let solutions = feasible_solutions(&inst);
        assert_eq!(solutions.len(), 4);
        let best = solutions.iter().map(|(_, c)| *c).min().unwrap();
        assert_eq!(best, 7);

        for (source, _) in &solutions {
            for (station, tasks) in source.iter().enumerate() {
                let load = optimal_load(&inst, tasks);
                let cuts = [
                    gen.simple_inference(station, tasks, load),
                    gen.smart_inference(station, tasks, load),
                    gen.smartest_inference(station, tasks, load),
                ];
                for cut in &cuts {
                    for (assignment, cycle) in &solutions {
                        assert!(
                            cut.is_satisfied_by(assignment, *cycle),
                            "{:?} from {tasks:?} cuts off {assignment:?} at {cycle}",
                            cut.family
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_burdens_single_task_instance() {
        // No transition avoids the only task: link extremes fall back to zero.
        let inst = Instance::build(
            RawInstance::new(1)
                .with_task(5)
                .with_backward_setup(0, 0, 2),
        )
        .unwrap();
        let gen = CutGenerator::new(&inst);
        assert_eq!(gen.removal_burden(0), 5);
        assert_eq!(gen.removal_burden_upper(0), 5);
        assert_eq!(gen.insertion_burden(0), 5);
        let cut = gen.smart_inference(0, &set(&[0]), 7);
        assert!(cut.is_satisfied_by(&vec![set(&[0])], 7));
        assert!(!cut.is_satisfied_by(&vec![set(&[0])], 6));
    }

    #[test]
    fn test_link_credit_includes_self_closing_setup() {
        // Two tasks; removing 0 leaves task 1 alone, closed by back(1, 1) = 3.
        let inst = Instance::build(
            RawInstance::new(1)
                .with_tasks([4, 4])
                .with_uniform_setups(5, 5)
                .with_backward_setup(1, 1, 3)
                .with_backward_setup(0, 0, 3),
        )
        .unwrap();
        let gen = CutGenerator::new(&inst);
        // 4 + 5 + 5 - 3
        assert_eq!(gen.removal_burden(0), 11);
        // real saving: load {0, 1} = 18, load {1} = 7
        let pair = optimal_load(&inst, &set(&[0, 1]));
        let alone = optimal_load(&inst, &set(&[1]));
        assert_eq!(pair - alone, 11);
    }
}
