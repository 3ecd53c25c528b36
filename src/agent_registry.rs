use std::collections::HashMap;

use thiserror::Error;

use crate::agent::Agent;
use crate::message::AgentId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Agent already exists: {id}")]
    AgentAlreadyExists { id: AgentId },
}

/// Agents in registration order, addressable by id.
///
/// Registration order is the order the scheduler steps them in. Agents are never
/// removed.
pub struct AgentRegistry<A> {
    agents: Vec<A>,
    index: HashMap<AgentId, usize>,
}

impl<A> Default for AgentRegistry<A> {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<A: Agent> AgentRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: A) -> Result<(), RegistryError> {
        let id = agent.id().clone();
        if self.index.contains_key(&id) {
            return Err(RegistryError::AgentAlreadyExists { id });
        }
        self.index.insert(id, self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&A> {
        self.index.get(id).and_then(|&i| self.agents.get(i))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut A> {
        match self.index.get(id) {
            Some(&i) => self.agents.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &AgentId> {
        self.agents.iter().map(Agent::id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.agents.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
