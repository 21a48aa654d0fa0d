//! Scenario input and its compilation into lifetime and movement constraints.

use super::actions::{Action, ActionSelector};
use super::error::{GridError, ScenarioError};
use super::grid::{Dimensions, StateGrid};
use crate::cp::{LinearExpr, Relation, SolverBackend, Var};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Yard shape and, optionally, an explicit horizon.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Yard {
    pub stacks: usize,
    pub heights: usize,
    /// Number of time steps. Defaults to one more than the schedule length;
    /// may extend the horizon but never shorten it.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub time_steps: Option<usize>,
}

/// A container standing in the yard at time 0.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    pub label: String,
    pub stack: usize,
    pub height: usize,
}

/// One phase of the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shipment {
    /// Number of transitions the phase spans.
    pub duration: usize,
    /// Labels entering the yard during this phase.
    #[cfg_attr(feature = "serde", serde(rename = "in", default))]
    pub arrivals: Vec<String>,
    /// Labels leaving the yard during this phase.
    #[cfg_attr(feature = "serde", serde(rename = "out", default))]
    pub departures: Vec<String>,
}

impl Shipment {
    /// A shipment lasting `duration` transitions with no moves.
    pub fn new(duration: usize) -> Self {
        Self {
            duration,
            arrivals: Vec::new(),
            departures: Vec::new(),
        }
    }

    /// Adds containers that enter the yard during this shipment.
    pub fn arriving<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arrivals.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Adds containers that leave the yard during this shipment.
    pub fn departing<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.departures.extend(labels.into_iter().map(Into::into));
        self
    }
}

/// A complete stowage scenario.
///
/// # Examples
///
/// ```
/// use u_stowage::stowage::{Scenario, Shipment};
///
/// let scenario = Scenario::new(2, 3)
///     .with_container("A", 0, 0)
///     .with_container("B", 0, 1)
///     .with_shipment(Shipment::new(2).departing(["A"]))
///     .with_weight("B", 5);
/// assert_eq!(scenario.horizon(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario {
    pub dimensions: Yard,
    /// Initial placements.
    pub containers: Vec<Placement>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shipments: Vec<Shipment>,
    /// Container weights; unlisted containers weigh 1.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weights: BTreeMap<String, u32>,
}

impl Scenario {
    /// An empty yard with no schedule.
    pub fn new(stacks: usize, heights: usize) -> Self {
        Self {
            dimensions: Yard {
                stacks,
                heights,
                time_steps: None,
            },
            containers: Vec::new(),
            shipments: Vec::new(),
            weights: BTreeMap::new(),
        }
    }

    /// Overrides the horizon. It must cover the schedule.
    pub fn with_time_steps(mut self, time_steps: usize) -> Self {
        self.dimensions.time_steps = Some(time_steps);
        self
    }

    /// Places a container in the yard at t = 0.
    pub fn with_container(mut self, label: impl Into<String>, stack: usize, height: usize) -> Self {
        self.containers.push(Placement {
            label: label.into(),
            stack,
            height,
        });
        self
    }

    /// Appends a phase to the schedule.
    pub fn with_shipment(mut self, shipment: Shipment) -> Self {
        self.shipments.push(shipment);
        self
    }

    /// Sets the weight of a container. Unweighted containers weigh 1.
    pub fn with_weight(mut self, label: impl Into<String>, weight: u32) -> Self {
        self.weights.insert(label.into(), weight);
        self
    }

    /// Total transitions covered by the shipments.
    pub fn schedule_length(&self) -> usize {
        self.shipments.iter().map(|s| s.duration).sum()
    }

    /// Number of time steps the model spans.
    pub fn horizon(&self) -> usize {
        let required = self.schedule_length() + 1;
        self.dimensions.time_steps.map_or(required, |t| t.max(required))
    }
}

/// Where a container is in its life cycle at a given time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeStage {
    DeadBefore,
    Arriving,
    Alive,
    Departing,
    DeadAfter,
}

impl LifeStage {
    /// The lifetime value this stage pins, if any.
    pub fn pinned(self) -> Option<bool> {
        match self {
            LifeStage::DeadBefore | LifeStage::DeadAfter => Some(false),
            LifeStage::Alive => Some(true),
            LifeStage::Arriving | LifeStage::Departing => None,
        }
    }
}

/// Arrival and departure phases of one container, as transition ranges.
///
/// Phase boundaries are pinned: a container is dead at the first time step
/// of its arrival phase and alive at its last; alive at the first time step
/// of its departure phase and dead at its last. Steps strictly inside a
/// phase are left to the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    pub arrival: Option<Range<usize>>,
    pub departure: Option<Range<usize>>,
}

impl Lifecycle {
    /// Where time step `t` falls relative to the arrival and departure windows.
    pub fn stage(&self, t: usize) -> LifeStage {
        if let Some(arrival) = &self.arrival {
            if t <= arrival.start {
                return LifeStage::DeadBefore;
            }
            if t < arrival.end {
                return LifeStage::Arriving;
            }
        }
        if let Some(departure) = &self.departure {
            if t >= departure.end {
                return LifeStage::DeadAfter;
            }
            if t > departure.start {
                return LifeStage::Departing;
            }
        }
        LifeStage::Alive
    }
}

/// A schedule phase resolved to its transition range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSpan {
    pub transitions: Range<usize>,
    pub arrivals: usize,
    pub departures: usize,
}

/// Container placed at time 0, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialSlot {
    pub container: usize,
    pub stack: usize,
    pub height: usize,
}

/// A validated scenario with containers indexed and life cycles resolved.
///
/// Containers are indexed in initial-placement order, then in order of first
/// arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScenario {
    dims: Dimensions,
    labels: Vec<String>,
    initial: Vec<InitialSlot>,
    lifecycles: Vec<Lifecycle>,
    phases: Vec<PhaseSpan>,
    schedule_end: usize,
    weights: Vec<u32>,
    shipments: Vec<Shipment>,
}

impl CompiledScenario {
    /// Grid extents for the compiled yard and horizon.
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Labels by container index: initial placements first, then arrivals.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Container index of `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Placements at t = 0.
    pub fn initial(&self) -> &[InitialSlot] {
        &self.initial
    }

    /// # Panics
    ///
    /// Panics if `container` is out of range.
    pub fn lifecycle(&self, container: usize) -> &Lifecycle {
        &self.lifecycles[container]
    }

    /// One span per shipment, in schedule order.
    pub fn phases(&self) -> &[PhaseSpan] {
        &self.phases
    }

    /// The schedule as given, for display alongside a solution.
    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    /// Weights by container index.
    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    /// Arrivals over the whole schedule.
    pub fn arrivals_total(&self) -> usize {
        self.phases.iter().map(|p| p.arrivals).sum()
    }

    /// Departures over the whole schedule.
    pub fn departures_total(&self) -> usize {
        self.phases.iter().map(|p| p.departures).sum()
    }

    /// Whether transition `t` lies in a phase with declared arrivals.
    pub fn is_loading_transition(&self, t: usize) -> bool {
        self.phases
            .iter()
            .any(|p| p.arrivals > 0 && p.transitions.contains(&t))
    }

    /// Emits placement, lifetime, and movement-count constraints.
    pub fn apply<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        state: &StateGrid,
        actions: &ActionSelector,
    ) -> Result<(), GridError> {
        for slot in &self.initial {
            let x = state.get(0, slot.container, slot.stack, slot.height)?;
            backend.add_linear(LinearExpr::from(x), Relation::Eq, 1);
        }

        for (c, lifecycle) in self.lifecycles.iter().enumerate() {
            for t in 0..self.dims.time_steps {
                if let Some(alive) = lifecycle.stage(t).pinned() {
                    backend.add_linear(
                        LinearExpr::from(actions.lifetime(t, c)),
                        Relation::Eq,
                        i64::from(alive),
                    );
                }
            }
        }

        for phase in &self.phases {
            for t in phase.transitions.clone() {
                if phase.arrivals == 0 {
                    forbid(backend, actions.flag(t, Action::Insert));
                }
                if phase.departures == 0 {
                    forbid(backend, actions.flag(t, Action::Remove));
                }
            }
        }
        for t in self.schedule_end..self.dims.transitions() {
            forbid(backend, actions.flag(t, Action::Insert));
            forbid(backend, actions.flag(t, Action::Remove));
        }

        if self.dims.transitions() > 0 {
            backend.add_linear(
                LinearExpr::sum(actions.insert().iter().copied()),
                Relation::Eq,
                self.arrivals_total() as i64,
            );
            backend.add_linear(
                LinearExpr::sum(actions.remove().iter().copied()),
                Relation::Eq,
                self.departures_total() as i64,
            );
        }

        tracing::debug!(
            containers = self.labels.len(),
            phases = self.phases.len(),
            arrivals = self.arrivals_total(),
            departures = self.departures_total(),
            constraints = backend.constraint_count(),
            "scenario constraints applied"
        );
        Ok(())
    }
}

fn forbid<B: SolverBackend + ?Sized>(backend: &mut B, flag: Var) {
    backend.add_linear(LinearExpr::from(flag), Relation::Eq, 0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Alive,
    Departed,
}

/// Validates a [`Scenario`] and resolves it into a [`CompiledScenario`].
pub struct ScenarioCompiler;

impl ScenarioCompiler {
    /// Validates `scenario` and resolves labels, life cycles and phase spans.
    pub fn compile(scenario: &Scenario) -> Result<CompiledScenario, ScenarioError> {
        let yard = &scenario.dimensions;
        if yard.stacks == 0 || yard.heights == 0 {
            return Err(ScenarioError::EmptyYard);
        }
        if let Some(phase) = scenario.shipments.iter().position(|s| s.duration == 0) {
            return Err(ScenarioError::ZeroDuration { phase });
        }
        let required = scenario.schedule_length() + 1;
        let time_steps = match yard.time_steps {
            Some(t) if t < required => {
                return Err(ScenarioError::HorizonTooShort {
                    time_steps: t,
                    required,
                })
            }
            Some(t) => t,
            None => required,
        };

        let mut labels = Vec::new();
        let mut lifecycles = Vec::new();
        let mut status: BTreeMap<String, (usize, Status)> = BTreeMap::new();
        let initial = Self::place_initial(scenario, &mut labels, &mut lifecycles, &mut status)?;

        let mut phases = Vec::with_capacity(scenario.shipments.len());
        let mut start = 0;
        for (phase, shipment) in scenario.shipments.iter().enumerate() {
            let range = start..start + shipment.duration;
            start = range.end;

            let moves = shipment.arrivals.len() + shipment.departures.len();
            if moves > shipment.duration {
                return Err(ScenarioError::OverfullPhase {
                    phase,
                    moves,
                    duration: shipment.duration,
                });
            }

            let arriving: BTreeSet<&str> = shipment.arrivals.iter().map(String::as_str).collect();
            if let Some(label) = shipment
                .departures
                .iter()
                .find(|l| arriving.contains(l.as_str()))
            {
                return Err(ScenarioError::ArrivesAndDeparts {
                    label: label.clone(),
                    phase,
                });
            }

            for label in &shipment.arrivals {
                match status.get(label) {
                    None => {
                        status.insert(label.clone(), (labels.len(), Status::Alive));
                        labels.push(label.clone());
                        lifecycles.push(Lifecycle {
                            arrival: Some(range.clone()),
                            departure: None,
                        });
                    }
                    Some((_, Status::Alive)) => {
                        return Err(ScenarioError::AlreadyPresent {
                            label: label.clone(),
                            phase,
                        })
                    }
                    Some((_, Status::Departed)) => {
                        return Err(ScenarioError::Reappears {
                            label: label.clone(),
                            phase,
                        })
                    }
                }
            }

            for label in &shipment.departures {
                match status.get_mut(label) {
                    None => {
                        return Err(ScenarioError::UnknownDeparture {
                            label: label.clone(),
                            phase,
                        })
                    }
                    Some((_, Status::Departed)) => {
                        return Err(ScenarioError::AlreadyDeparted {
                            label: label.clone(),
                            phase,
                        })
                    }
                    Some((index, state)) => {
                        *state = Status::Departed;
                        lifecycles[*index].departure = Some(range.clone());
                    }
                }
            }

            phases.push(PhaseSpan {
                transitions: range,
                arrivals: shipment.arrivals.len(),
                departures: shipment.departures.len(),
            });
        }

        let mut weights = vec![1; labels.len()];
        for (label, &weight) in &scenario.weights {
            let (index, _) = status
                .get(label)
                .ok_or_else(|| ScenarioError::UnknownWeight(label.clone()))?;
            if weight == 0 {
                return Err(ScenarioError::ZeroWeight(label.clone()));
            }
            weights[*index] = weight;
        }

        let dims = Dimensions::new(time_steps, labels.len(), yard.stacks, yard.heights);
        Ok(CompiledScenario {
            dims,
            labels,
            initial,
            lifecycles,
            phases,
            schedule_end: start,
            weights,
            shipments: scenario.shipments.clone(),
        })
    }

    fn place_initial(
        scenario: &Scenario,
        labels: &mut Vec<String>,
        lifecycles: &mut Vec<Lifecycle>,
        status: &mut BTreeMap<String, (usize, Status)>,
    ) -> Result<Vec<InitialSlot>, ScenarioError> {
        let yard = &scenario.dimensions;
        let mut occupied: BTreeMap<(usize, usize), &str> = BTreeMap::new();
        let mut initial = Vec::with_capacity(scenario.containers.len());

        for p in &scenario.containers {
            if p.stack >= yard.stacks || p.height >= yard.heights {
                return Err(ScenarioError::PlacementOutOfRange {
                    label: p.label.clone(),
                    stack: p.stack,
                    height: p.height,
                });
            }
            if status.contains_key(&p.label) {
                return Err(ScenarioError::DuplicateLabel(p.label.clone()));
            }
            if let Some(first) = occupied.insert((p.stack, p.height), &p.label) {
                return Err(ScenarioError::SlotConflict {
                    first: first.to_string(),
                    second: p.label.clone(),
                    stack: p.stack,
                    height: p.height,
                });
            }
            status.insert(p.label.clone(), (labels.len(), Status::Alive));
            initial.push(InitialSlot {
                container: labels.len(),
                stack: p.stack,
                height: p.height,
            });
            labels.push(p.label.clone());
            lifecycles.push(Lifecycle {
                arrival: None,
                departure: None,
            });
        }

        for p in &scenario.containers {
            if p.height > 0 && !occupied.contains_key(&(p.stack, p.height - 1)) {
                return Err(ScenarioError::FloatingPlacement {
                    label: p.label.clone(),
                    stack: p.stack,
                    height: p.height,
                });
            }
        }
        Ok(initial)
    }
}
