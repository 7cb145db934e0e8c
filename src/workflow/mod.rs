//! Guarded state graphs.
//!
//! A [`Workflow`] is a static transition table over one aggregate plus a
//! list of guards. Guards are tagged predicates attached to a transition;
//! they let this engine veto transitions on graphs the host also drives,
//! without the host knowing about the processor.
//!
//! Callers check [`Workflow::can`] before [`Workflow::apply`]. `apply` on a
//! refused transition is an error.

pub mod graphs;

pub use graphs::{
    OrderPaymentTransition, PaymentTransition, RefundTransition, ReversalTransition, StateMachine,
    Transition,
};

use {crate::domain::error::ReconcileError, std::fmt};

/// Something with a state field driven by a graph.
pub trait Stateful {
    type State: Copy + Eq + fmt::Display;

    fn graph_state(&self) -> Self::State;

    /// Only workflows call this.
    fn set_graph_state(&mut self, state: Self::State);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Graph {
    Payment,
    PaymentReversal,
    OrderPayment,
    RefundPayment,
}

impl Graph {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::PaymentReversal => "payment_reversal",
            Self::OrderPayment => "order_payment",
            Self::RefundPayment => "refund_payment",
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct TransitionDef<S: 'static, T> {
    pub transition: T,
    pub from: &'static [S],
    pub to: S,
}

type Predicate<A> = Box<dyn Fn(&A) -> bool + Send + Sync>;

pub struct Guard<A, T> {
    tag: &'static str,
    transition: T,
    predicate: Predicate<A>,
}

pub struct Workflow<A: Stateful + 'static, T: 'static> {
    graph: Graph,
    transitions: &'static [TransitionDef<A::State, T>],
    guards: Vec<Guard<A, T>>,
}

impl<A, T> Workflow<A, T>
where
    A: Stateful + 'static,
    T: Copy + Eq + fmt::Display + 'static,
{
    pub fn new(graph: Graph, transitions: &'static [TransitionDef<A::State, T>]) -> Self {
        Self {
            graph,
            transitions,
            guards: Vec::new(),
        }
    }

    pub fn graph(&self) -> Graph {
        self.graph
    }

    /// Adds a predicate that must hold for `transition` to be allowed.
    pub fn register_guard(
        &mut self,
        tag: &'static str,
        transition: T,
        predicate: impl Fn(&A) -> bool + Send + Sync + 'static,
    ) {
        self.guards.push(Guard {
            tag,
            transition,
            predicate: Box::new(predicate),
        });
    }

    fn target(&self, from: A::State, transition: T) -> Option<A::State> {
        self.transitions
            .iter()
            .find(|def| def.transition == transition && def.from.contains(&from))
            .map(|def| def.to)
    }

    pub fn can(&self, subject: &A, transition: T) -> bool {
        if self.target(subject.graph_state(), transition).is_none() {
            return false;
        }
        self.guards
            .iter()
            .filter(|g| g.transition == transition)
            .all(|g| {
                let allowed = (g.predicate)(subject);
                if !allowed {
                    tracing::debug!(
                        graph = %self.graph,
                        %transition,
                        guard = g.tag,
                        "transition vetoed by guard"
                    );
                }
                allowed
            })
    }

    /// Applies a transition the caller already checked. Returns the new state.
    pub fn apply(&self, subject: &mut A, transition: T) -> Result<A::State, ReconcileError> {
        let from = subject.graph_state();
        let to = match self.target(from, transition) {
            Some(to) if self.can(subject, transition) => to,
            _ => {
                return Err(ReconcileError::Transition {
                    graph: self.graph.as_str(),
                    transition: transition.to_string(),
                    state: from.to_string(),
                });
            }
        };
        subject.set_graph_state(to);
        tracing::debug!(graph = %self.graph, %transition, %from, %to, "transition applied");
        Ok(to)
    }

    /// Guard-then-apply: applies when allowed, otherwise does nothing.
    pub fn apply_if_allowed(&self, subject: &mut A, transition: T) -> Result<bool, ReconcileError> {
        if !self.can(subject, transition) {
            return Ok(false);
        }
        self.apply(subject, transition)?;
        Ok(true)
    }
}
