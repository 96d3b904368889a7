//! Stage Graph: a tiny explicit dispatch loop over tagged transitions.
//!
//! Each concrete stage is a handful of nodes with at most one conditional
//! fork. A node step returns the updated state plus a [`Transition`]; the
//! loop in [`run_graph`] follows transitions until [`Transition::Terminal`].
use std::fmt::Debug;

use crate::context::ExecutionContext;
use crate::stage::StageError;

/// Identifier of a node inside a stage graph.
pub trait GraphNode: Copy + Debug + PartialEq {
    fn name(self) -> &'static str;
}

/// Outcome of a single node step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<N> {
    /// Unconditional edge to the next node.
    Continue(N),
    /// Edge selected by a branch predicate.
    Branch(N),
    /// The graph ends here.
    Terminal,
}

pub trait StageGraph {
    type State;
    type Node: GraphNode;

    /// Graph name, used as the stage span id.
    fn name(&self) -> &'static str;

    fn entry(&self) -> Self::Node;

    fn step(&self, node: Self::Node, state: Self::State) -> (Self::State, Transition<Self::Node>);
}

/// Final state of a graph run and the nodes it visited.
#[derive(Debug, Clone)]
pub struct GraphRun<S> {
    pub state: S,
    pub path: Vec<&'static str>,
}

/// Drives `graph` from its entry node until it terminates.
///
/// Fails with [`StageError::StepLimit`] if more than `ctx.max_graph_steps`
/// nodes are visited.
pub fn run_graph<G: StageGraph>(
    graph: &G,
    state: G::State,
    ctx: &ExecutionContext,
) -> Result<GraphRun<G::State>, StageError> {
    let span = tracing::info_span!(parent: ctx.span(), "stage", id = graph.name());
    let _enter = span.enter();

    let mut node = graph.entry();
    let mut state = state;
    let mut path = Vec::new();

    loop {
        if path.len() >= ctx.max_graph_steps {
            tracing::warn!(limit = ctx.max_graph_steps, "graph step limit reached");
            return Err(StageError::StepLimit {
                graph: graph.name(),
                limit: ctx.max_graph_steps,
            });
        }
        path.push(node.name());

        let (next_state, transition) = graph.step(node, state);
        state = next_state;

        match transition {
            Transition::Continue(next) => node = next,
            Transition::Branch(next) => {
                tracing::debug!(from = node.name(), to = next.name(), "branch taken");
                node = next;
            }
            Transition::Terminal => break,
        }
    }

    Ok(GraphRun { state, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum CountNode {
        Tick,
        Done,
    }

    impl GraphNode for CountNode {
        fn name(self) -> &'static str {
            match self {
                CountNode::Tick => "tick",
                CountNode::Done => "done",
            }
        }
    }

    struct Counter {
        until: u32,
    }

    impl StageGraph for Counter {
        type State = u32;
        type Node = CountNode;

        fn name(&self) -> &'static str {
            "counter"
        }

        fn entry(&self) -> CountNode {
            CountNode::Tick
        }

        fn step(&self, node: CountNode, state: u32) -> (u32, Transition<CountNode>) {
            match node {
                CountNode::Tick if state + 1 >= self.until => {
                    (state + 1, Transition::Branch(CountNode::Done))
                }
                CountNode::Tick => (state + 1, Transition::Continue(CountNode::Tick)),
                CountNode::Done => (state, Transition::Terminal),
            }
        }
    }

    #[test]
    fn runs_until_terminal_and_records_path() {
        let ctx = ExecutionContext::new();
        let run = run_graph(&Counter { until: 3 }, 0, &ctx).unwrap();
        assert_eq!(run.state, 3);
        assert_eq!(run.path, vec!["tick", "tick", "tick", "done"]);
    }

    #[test]
    fn step_limit_stops_runaway_graph() {
        let ctx = ExecutionContext::with_max_steps(5);
        let err = run_graph(&Counter { until: 100 }, 0, &ctx).unwrap_err();
        assert_eq!(
            err,
            StageError::StepLimit {
                graph: "counter",
                limit: 5
            }
        );
    }
}
