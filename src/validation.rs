//! Input and solution validation for line balancing.
//!
//! Checks structural integrity of raw instance data before any derived set
//! is built, and verifies finished line solutions independently of the
//! solver that produced them. Detects:
//! - Missing tasks or an unusable station count
//! - Negative processing or setup times
//! - Out-of-range task references
//! - Circular precedence dependencies (DAG validation)
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use crate::models::{
    Instance, LineSolution, PrecedenceGraph, RawInstance, StationId, StationPlan, TaskId,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The instance has no tasks.
    EmptyInstance,
    /// Station count is zero or exceeds the task count.
    InvalidStationCount,
    /// A processing or setup time is negative.
    NegativeTime,
    /// A precedence or setup entry references an unknown task.
    InvalidTaskReference,
    /// Precedence graph contains a cycle through `task`.
    CyclicDependency { task: TaskId },
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates raw instance data.
///
/// Checks:
/// 1. At least one task
/// 2. `1 <= station_count <= task_count` (every station receives a task)
/// 3. Non-negative processing and setup times
/// 4. Precedence and setup entries reference existing tasks
/// 5. No circular precedence dependencies
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_raw_instance(raw: &RawInstance) -> ValidationResult {
    let mut errors = Vec::new();
    let n = raw.task_count();

    if n == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyInstance,
            "Instance has no tasks",
        ));
    }

    if raw.station_count == 0 || raw.station_count > n {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidStationCount,
            format!(
                "Station count {} must lie in 1..={} (one task per station at least)",
                raw.station_count, n
            ),
        ));
    }

    for (task, &p) in raw.processing_times.iter().enumerate() {
        if p < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeTime,
                format!("Task {task} has negative processing time {p}"),
            ));
        }
    }

    let mut references_ok = true;
    for &(before, after) in &raw.precedences {
        if before >= n || after >= n {
            references_ok = false;
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTaskReference,
                format!("Precedence ({before}, {after}) references a task outside 0..{n}"),
            ));
        }
    }

    let setups = raw
        .forward_setups
        .iter()
        .map(|e| ("forward", e))
        .chain(raw.backward_setups.iter().map(|e| ("backward", e)));
    for (direction, entry) in setups {
        if entry.from >= n || entry.to >= n {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTaskReference,
                format!(
                    "{direction} setup ({}, {}) references a task outside 0..{n}",
                    entry.from, entry.to
                ),
            ));
        }
        if entry.time < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeTime,
                format!(
                    "{direction} setup ({}, {}) has negative time {}",
                    entry.from, entry.to, entry.time
                ),
            ));
        }
    }

    // Cycle detection needs every edge in range.
    if references_ok {
        if let Some(task) = PrecedenceGraph::new(n, &raw.precedences).find_cycle() {
            errors.push(ValidationError::new(
                ValidationErrorKind::CyclicDependency { task },
                format!("Circular precedence detected involving task {task}"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A defect found in a line solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionViolation {
    pub kind: SolutionViolationKind,
    /// Station concerned, if any.
    pub station: Option<StationId>,
    pub message: String,
}

/// Classification of solution defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionViolationKind {
    /// Wrong number of stations or out-of-order station ids.
    StationLayout,
    /// A station holds no task.
    EmptyStation,
    /// A task is missing, duplicated or unknown.
    TaskCoverage,
    /// Consecutive tasks use a forbidden forward transition.
    ForwardTransition,
    /// The closing transition is a forbidden backward transition.
    BackwardTransition,
    /// A task is processed before one of its predecessors.
    Precedence,
    /// Start times leave too little room for processing and setups.
    StartTime,
    /// Reported load is too small or exceeds the cycle time.
    Load,
}

impl SolutionViolation {
    fn new(
        kind: SolutionViolationKind,
        station: Option<StationId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            station,
            message: message.into(),
        }
    }
}

/// Verifies a line solution against the instance.
///
/// Independent of how the solution was produced: recomputes every
/// transition and start-time requirement from the raw instance data.
pub fn verify_solution(
    instance: &Instance,
    solution: &LineSolution,
) -> Result<(), Vec<SolutionViolation>> {
    use SolutionViolationKind as Kind;

    let mut violations = Vec::new();
    let n = instance.task_count();

    if solution.stations.len() != instance.station_count() {
        violations.push(SolutionViolation::new(
            Kind::StationLayout,
            None,
            format!(
                "Expected {} stations, found {}",
                instance.station_count(),
                solution.stations.len()
            ),
        ));
    }

    let mut station_of: Vec<Option<StationId>> = vec![None; n];
    for (index, plan) in solution.stations.iter().enumerate() {
        let k = plan.station;
        if k != index {
            violations.push(SolutionViolation::new(
                Kind::StationLayout,
                Some(k),
                format!("Station id {k} at position {index}"),
            ));
        }
        if plan.sequence.is_empty() {
            violations.push(SolutionViolation::new(
                Kind::EmptyStation,
                Some(k),
                format!("Station {k} has no tasks"),
            ));
            continue;
        }
        if plan.start_times.len() != plan.sequence.len() {
            violations.push(SolutionViolation::new(
                Kind::StartTime,
                Some(k),
                format!(
                    "Station {k} has {} start times for {} tasks",
                    plan.start_times.len(),
                    plan.sequence.len()
                ),
            ));
            continue;
        }
        for &task in &plan.sequence {
            if task >= n {
                violations.push(SolutionViolation::new(
                    Kind::TaskCoverage,
                    Some(k),
                    format!("Unknown task {task} on station {k}"),
                ));
            } else if let Some(other) = station_of[task].replace(k) {
                violations.push(SolutionViolation::new(
                    Kind::TaskCoverage,
                    Some(k),
                    format!("Task {task} assigned to stations {other} and {k}"),
                ));
            }
        }
        if plan.sequence.iter().any(|&t| t >= n) {
            continue;
        }

        verify_station(instance, solution.cycle_time, plan, &mut violations);
    }

    for (task, station) in station_of.iter().enumerate() {
        if station.is_none() {
            violations.push(SolutionViolation::new(
                Kind::TaskCoverage,
                None,
                format!("Task {task} is not assigned"),
            ));
        }
    }

    for &(before, after) in instance.precedences() {
        if let (Some(sb), Some(sa)) = (station_of[before], station_of[after]) {
            if sb > sa {
                violations.push(SolutionViolation::new(
                    Kind::Precedence,
                    Some(sa),
                    format!(
                        "Task {before} on station {sb} precedes task {after} \
                         on earlier station {sa}"
                    ),
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Transition, ordering, timing and load checks of one non-empty station.
fn verify_station(
    instance: &Instance,
    cycle_time: i64,
    plan: &StationPlan,
    violations: &mut Vec<SolutionViolation>,
) {
    use SolutionViolationKind as Kind;

    let k = plan.station;
    let seq = &plan.sequence;
    let starts = &plan.start_times;

    for (pos, w) in seq.windows(2).enumerate() {
        let (from, to) = (w[0], w[1]);
        if !instance.follow_forward(from).contains(&to) {
            violations.push(SolutionViolation::new(
                Kind::ForwardTransition,
                Some(k),
                format!("Forward transition {from} -> {to} is not allowed"),
            ));
        }
        let ready = starts[pos] + instance.processing_time(from) + instance.forward_setup(from, to);
        if starts[pos + 1] < ready {
            violations.push(SolutionViolation::new(
                Kind::StartTime,
                Some(k),
                format!(
                    "Task {to} starts at {} before {from} and its setup end at {ready}",
                    starts[pos + 1]
                ),
            ));
        }
    }

    let graph = instance.graph();
    for (pos, &task) in seq.iter().enumerate() {
        if let Some(&later) = seq[pos + 1..].iter().find(|&&t| graph.precedes(t, task)) {
            violations.push(SolutionViolation::new(
                Kind::Precedence,
                Some(k),
                format!("Task {task} is processed before its predecessor {later}"),
            ));
        }
    }

    let (first, last) = (seq[0], seq[seq.len() - 1]);
    if seq.len() > 1 && !instance.follow_backward(last).contains(&first) {
        violations.push(SolutionViolation::new(
            Kind::BackwardTransition,
            Some(k),
            format!("Backward transition {last} -> {first} is not allowed"),
        ));
    }
    if starts[0] < 0 {
        violations.push(SolutionViolation::new(
            Kind::StartTime,
            Some(k),
            format!("Task {first} starts at negative time {}", starts[0]),
        ));
    }

    let required = starts[seq.len() - 1]
        + instance.processing_time(last)
        + instance.backward_setup(last, first)
        - starts[0];
    if plan.load < required {
        violations.push(SolutionViolation::new(
            Kind::Load,
            Some(k),
            format!("Station {k} reports load {} but needs {required}", plan.load),
        ));
    }
    if plan.load > cycle_time {
        violations.push(SolutionViolation::new(
            Kind::Load,
            Some(k),
            format!("Station {k} load {} exceeds cycle time {cycle_time}", plan.load),
        ));
    }
}

/// Whether `solution` passes [`verify_solution`].
pub fn is_valid_solution(instance: &Instance, solution: &LineSolution) -> bool {
    verify_solution(instance, solution).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StationTour, TaskSet};

    fn toy_raw() -> RawInstance {
        RawInstance::new(2)
            .with_tasks([2, 3, 4])
            .with_precedence(0, 1)
            .with_uniform_setups(1, 1)
    }

    fn toy_solution(inst: &Instance) -> LineSolution {
        LineSolution::new(vec![
            StationPlan::from_tour(0, StationTour::evaluate(inst, vec![2])),
            StationPlan::from_tour(1, StationTour::evaluate(inst, vec![0, 1])),
        ])
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_raw_instance(&toy_raw()).is_ok());
    }

    #[test]
    fn test_empty_instance() {
        let errors = validate_raw_instance(&RawInstance::new(1)).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::EmptyInstance));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidStationCount));
    }

    #[test]
    fn test_zero_stations() {
        let raw = RawInstance::new(0).with_tasks([1, 2]);
        let errors = validate_raw_instance(&raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidStationCount);
    }

    #[test]
    fn test_negative_times() {
        let raw = RawInstance::new(1)
            .with_tasks([1, -2])
            .with_backward_setup(0, 1, -1);
        let errors = validate_raw_instance(&raw).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::NegativeTime)
                .count(),
            2
        );
    }

    #[test]
    fn test_invalid_references() {
        let raw = RawInstance::new(1)
            .with_tasks([1, 2])
            .with_precedence(0, 7)
            .with_forward_setup(3, 0, 1);
        let errors = validate_raw_instance(&raw).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::InvalidTaskReference));
    }

    #[test]
    fn test_cyclic_dependency() {
        let raw = RawInstance::new(1)
            .with_tasks([1, 1, 1])
            .with_precedence(0, 1)
            .with_precedence(1, 2)
            .with_precedence(2, 1);
        let errors = validate_raw_instance(&raw).unwrap_err();
        assert_eq!(
            errors[0].kind,
            ValidationErrorKind::CyclicDependency { task: 1 }
        );
    }

    #[test]
    fn test_multiple_errors() {
        let raw = RawInstance::new(5)
            .with_tasks([1, -1])
            .with_precedence(0, 9);
        let errors = validate_raw_instance(&raw).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_verify_valid_solution() {
        let inst = Instance::build(toy_raw()).unwrap();
        let sol = toy_solution(&inst);
        assert_eq!(sol.cycle_time, 7);
        assert!(verify_solution(&inst, &sol).is_ok());
        assert!(is_valid_solution(&inst, &sol));
    }

    #[test]
    fn test_verify_detects_cross_station_precedence() {
        let inst = Instance::build(toy_raw()).unwrap();
        let sol = LineSolution::new(vec![
            StationPlan::from_tour(0, StationTour::evaluate(&inst, vec![1])),
            StationPlan::from_tour(1, StationTour::evaluate(&inst, vec![0, 2])),
        ]);
        let violations = verify_solution(&inst, &sol).unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.kind == SolutionViolationKind::Precedence));
    }

    #[test]
    fn test_verify_detects_bad_sequence() {
        let inst = Instance::build(toy_raw()).unwrap();
        let sol = LineSolution::new(vec![
            StationPlan::from_tour(0, StationTour::evaluate(&inst, vec![2])),
            StationPlan::from_tour(1, StationTour::evaluate(&inst, vec![1, 0])),
        ]);
        let kinds: Vec<_> = verify_solution(&inst, &sol)
            .unwrap_err()
            .into_iter()
            .map(|v| v.kind)
            .collect();
        assert!(kinds.contains(&SolutionViolationKind::ForwardTransition));
        assert!(kinds.contains(&SolutionViolationKind::Precedence));
    }

    #[test]
    fn test_verify_detects_coverage_and_load() {
        let inst = Instance::build(toy_raw()).unwrap();
        let mut sol = toy_solution(&inst);
        sol.stations[0].sequence = vec![0];
        sol.cycle_time = 3;
        let kinds: Vec<_> = verify_solution(&inst, &sol)
            .unwrap_err()
            .into_iter()
            .map(|v| v.kind)
            .collect();
        assert!(kinds.contains(&SolutionViolationKind::TaskCoverage));
        assert!(kinds.contains(&SolutionViolationKind::Load));
    }

    #[test]
    fn test_verify_detects_compressed_start_times() {
        let inst = Instance::build(toy_raw()).unwrap();
        let mut sol = toy_solution(&inst);
        sol.stations[1].start_times = vec![0, 2];
        let violations = verify_solution(&inst, &sol).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, SolutionViolationKind::StartTime);
        assert_eq!(violations[0].station, Some(1));
    }

    #[test]
    fn test_verify_station_count() {
        let inst = Instance::build(toy_raw()).unwrap();
        let tasks: TaskSet = [0, 1, 2].into_iter().collect();
        let order = inst.graph().ordered_subset(&tasks).unwrap();
        let sol = LineSolution::new(vec![StationPlan::from_tour(
            0,
            StationTour::evaluate(&inst, order),
        )]);
        let violations = verify_solution(&inst, &sol).unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.kind == SolutionViolationKind::StationLayout));
    }
}
