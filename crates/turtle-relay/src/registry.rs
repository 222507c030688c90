//! Live sessions and the telemetry cache they feed.
//!
//! The registry is the single source of truth for connectivity: a session
//! is in exactly one of the two collections for exactly as long as its
//! connection is authenticated and open. Both collections keep insertion
//! order, which is the order fan-out visits recipients in.
//!
//! At most one turtle session exists per [`TurtleId`]. Registering a second
//! one displaces the first (see [`Registry::register_agent`]).

use turtle_types::{Role, TurtleId};

use crate::agent::AgentSession;
use crate::cache::StateCache;
use crate::observer::ObserverSession;
use crate::session::{ConnectionId, Outbox, Session};

/// Registered sessions plus the per-turtle cache.
#[derive(Debug, Default)]
pub struct Registry {
    agents: Vec<AgentSession>,
    observers: Vec<ObserverSession>,
    cache: StateCache,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a turtle session.
    ///
    /// If another connection already holds `turtle`, that session is
    /// removed and returned so the caller can close it. Its cached record
    /// is kept for the newcomer.
    pub fn register_agent(&mut self, turtle: TurtleId, outbox: Outbox) -> Option<AgentSession> {
        let displaced = self
            .agents
            .iter()
            .position(|agent| agent.turtle_id() == turtle)
            .map(|index| self.agents.remove(index));
        self.agents.push(AgentSession::new(turtle, outbox));
        displaced
    }

    /// Register a dashboard session with no subscriptions.
    pub fn register_observer(&mut self, outbox: Outbox) {
        self.observers.push(ObserverSession::new(outbox));
    }

    /// Deregister whichever session owns `connection`.
    ///
    /// Does not touch the cache; purging a departed turtle is the
    /// caller's decision.
    pub fn remove(&mut self, connection: ConnectionId) -> Option<Session> {
        if let Some(index) = self
            .agents
            .iter()
            .position(|agent| agent.outbox().connection() == connection)
        {
            return Some(Session::Agent(self.agents.remove(index)));
        }
        self.observers
            .iter()
            .position(|observer| observer.outbox().connection() == connection)
            .map(|index| Session::Observer(self.observers.remove(index)))
    }

    /// The role `connection` is registered under, if any.
    pub fn role_of(&self, connection: ConnectionId) -> Option<Role> {
        if self.agent(connection).is_some() {
            Some(Role::Agent)
        } else if self.observer(connection).is_some() {
            Some(Role::Observer)
        } else {
            None
        }
    }

    /// The turtle session on `connection`.
    pub fn agent(&self, connection: ConnectionId) -> Option<&AgentSession> {
        self.agents
            .iter()
            .find(|agent| agent.outbox().connection() == connection)
    }

    /// The turtle session holding `turtle`.
    pub fn agent_for(&self, turtle: TurtleId) -> Option<&AgentSession> {
        self.agents.iter().find(|agent| agent.turtle_id() == turtle)
    }

    /// The dashboard session on `connection`.
    pub fn observer(&self, connection: ConnectionId) -> Option<&ObserverSession> {
        self.observers
            .iter()
            .find(|observer| observer.outbox().connection() == connection)
    }

    /// Mutable access to the dashboard session on `connection`.
    pub fn observer_mut(&mut self, connection: ConnectionId) -> Option<&mut ObserverSession> {
        self.observers
            .iter_mut()
            .find(|observer| observer.outbox().connection() == connection)
    }

    /// Turtle sessions in registration order.
    pub fn agents(&self) -> &[AgentSession] {
        &self.agents
    }

    /// Dashboard sessions in registration order.
    pub fn observers(&self) -> &[ObserverSession] {
        &self.observers
    }

    /// Ids of connected turtles in registration order.
    pub fn turtle_ids(&self) -> Vec<TurtleId> {
        self.agents.iter().map(AgentSession::turtle_id).collect()
    }

    /// The telemetry cache.
    pub const fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Mutable access to the telemetry cache.
    pub const fn cache_mut(&mut self) -> &mut StateCache {
        &mut self.cache
    }
}
