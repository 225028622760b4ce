//! Workflow engine: a validated transition table and its traversal.

use crate::error::WorkflowError;
use crate::node::{Node, NodeId};
use crate::state::WorkflowState;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Branch label that terminates the run.
pub const END: &str = "__end__";

/// Inspects the state and returns a branch label. Must be pure.
pub type Router = fn(&WorkflowState) -> &'static str;

/// Where a branch leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Node(NodeId),
    End,
}

/// Outgoing edges of one node: a router and the branches it may choose.
#[derive(Clone, Copy)]
pub struct Transition {
    pub from: NodeId,
    pub router: Router,
    pub branches: &'static [(&'static str, Next)],
}

impl Transition {
    /// Target of `label`, if declared.
    pub fn target(&self, label: &str) -> Option<Next> {
        self.branches
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, next)| *next)
    }

    fn successors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.branches.iter().filter_map(|(_, next)| match next {
            Next::Node(id) => Some(*id),
            Next::End => None,
        })
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}

/// Result of a workflow run.
#[derive(Debug)]
pub struct Execution {
    /// Final state
    pub state: WorkflowState,

    /// Nodes executed, in order
    pub visited: Vec<NodeId>,

    /// Total execution time in milliseconds
    pub total_ms: f64,
}

/// Runs nodes one at a time, following the transition table.
pub struct Engine {
    entry: NodeId,
    nodes: BTreeMap<NodeId, Box<dyn Node>>,
    transitions: BTreeMap<NodeId, Transition>,
}

impl Engine {
    /// Build an engine, validating the graph once.
    ///
    /// Every node needs exactly one transition, every branch target must be
    /// registered, every node must be reachable from `entry` and able to reach
    /// [`Next::End`], and the graph must be acyclic.
    pub fn new(
        entry: NodeId,
        nodes: Vec<Box<dyn Node>>,
        table: &[Transition],
    ) -> Result<Self, WorkflowError> {
        let mut registered = BTreeMap::new();
        for node in nodes {
            let id = node.id();
            if registered.insert(id, node).is_some() {
                return Err(WorkflowError::DuplicateNode(id));
            }
        }

        if !registered.contains_key(&entry) {
            return Err(WorkflowError::MissingEntry(entry));
        }

        let mut transitions = BTreeMap::new();
        for transition in table {
            if !registered.contains_key(&transition.from) {
                return Err(WorkflowError::UnknownNode(transition.from));
            }
            if transitions.insert(transition.from, *transition).is_some() {
                return Err(WorkflowError::DuplicateTransition(transition.from));
            }
            for (label, next) in transition.branches {
                if let Next::Node(to) = next {
                    if !registered.contains_key(to) {
                        return Err(WorkflowError::InvalidBranch {
                            from: transition.from,
                            label: *label,
                            to: *to,
                        });
                    }
                }
            }
        }

        for id in registered.keys() {
            if !transitions.contains_key(id) {
                return Err(WorkflowError::MissingTransition(*id));
            }
        }

        let engine = Self {
            entry,
            nodes: registered,
            transitions,
        };
        engine.check_reachable()?;
        engine.check_acyclic()?;
        engine.check_terminates()?;

        Ok(engine)
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Pure routing decision after `from`. `None` for an undeclared label.
    pub fn decide(&self, from: NodeId, state: &WorkflowState) -> Option<Next> {
        let transition = self.transitions.get(&from)?;
        transition.target((transition.router)(state))
    }

    /// Run until termination.
    ///
    /// Never fails: an abnormal end is a `failed` state with an error message.
    pub fn run(&self, initial: WorkflowState) -> Execution {
        let start = std::time::Instant::now();
        let mut state = initial;
        let mut visited = Vec::new();

        tracing::info!(entry = %self.entry, nodes = self.nodes.len(), "Starting workflow");

        if state.status().is_terminal() {
            tracing::warn!(status = %state.status(), "State already terminal, nothing to run");
            return Execution {
                state,
                visited,
                total_ms: 0.0,
            };
        }

        let mut next = Next::Node(self.entry);
        while let Next::Node(id) = next {
            if state.is_failed() {
                break;
            }

            let Some(node) = self.nodes.get(&id) else {
                state.fail(format!("node not registered: {id}"));
                break;
            };

            let node_start = std::time::Instant::now();
            node.execute(&mut state);
            visited.push(id);

            tracing::debug!(
                node = %id,
                status = %state.status(),
                duration_ms = node_start.elapsed().as_secs_f64() * 1000.0,
                "Node completed"
            );

            next = self.route(id, &mut state);
        }

        state.finish();
        let total_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            status = %state.status(),
            visited = ?visited,
            total_ms = total_ms,
            "Workflow finished"
        );

        Execution {
            state,
            visited,
            total_ms,
        }
    }

    fn route(&self, from: NodeId, state: &mut WorkflowState) -> Next {
        let Some(transition) = self.transitions.get(&from) else {
            state.fail(format!("node has no transition: {from}"));
            return Next::End;
        };

        let label = (transition.router)(state);
        match transition.target(label) {
            Some(next) => {
                tracing::debug!(from = %from, branch = label, "Routing");
                next
            }
            None => {
                tracing::error!(from = %from, branch = label, "Router returned undeclared branch");
                state.fail(format!(
                    "router for {from} returned undeclared branch '{label}'"
                ));
                Next::End
            }
        }
    }

    fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.transitions
            .get(&id)
            .map(|t| t.successors().collect())
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), WorkflowError> {
        let mut seen = BTreeSet::from([self.entry]);
        let mut queue = VecDeque::from([self.entry]);
        while let Some(id) = queue.pop_front() {
            for next in self.successors(id) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        match self.nodes.keys().find(|id| !seen.contains(*id)) {
            Some(id) => Err(WorkflowError::Unreachable(*id)),
            None => Ok(()),
        }
    }

    fn check_acyclic(&self) -> Result<(), WorkflowError> {
        let mut visited = BTreeSet::new();
        let mut stack = BTreeSet::new();

        for id in self.nodes.keys() {
            if let Some(at) = self.find_cycle(*id, &mut visited, &mut stack) {
                return Err(WorkflowError::Cycle(at));
            }
        }
        Ok(())
    }

    /// DFS helper returning a node on a cycle.
    fn find_cycle(
        &self,
        id: NodeId,
        visited: &mut BTreeSet<NodeId>,
        stack: &mut BTreeSet<NodeId>,
    ) -> Option<NodeId> {
        if stack.contains(&id) {
            return Some(id);
        }
        if !visited.insert(id) {
            return None;
        }

        stack.insert(id);
        for next in self.successors(id) {
            if let Some(at) = self.find_cycle(next, visited, stack) {
                return Some(at);
            }
        }
        stack.remove(&id);
        None
    }

    fn check_terminates(&self) -> Result<(), WorkflowError> {
        let mut terminating: BTreeSet<NodeId> = BTreeSet::new();
        loop {
            let before = terminating.len();
            for (id, transition) in &self.transitions {
                let exits = transition.branches.iter().any(|(_, next)| match next {
                    Next::End => true,
                    Next::Node(to) => terminating.contains(to),
                });
                if exits {
                    terminating.insert(*id);
                }
            }
            if terminating.len() == before {
                break;
            }
        }

        match self.nodes.keys().find(|id| !terminating.contains(*id)) {
            Some(id) => Err(WorkflowError::NoTerminalPath(*id)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("transitions", &self.transitions)
            .finish()
    }
}
