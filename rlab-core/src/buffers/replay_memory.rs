use crate::{
    env::Observation,
    error::{Result, RlError},
};
use enum_dispatch::enum_dispatch;
use rand::{rngs::StdRng, seq::index};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub observation: Observation,
    pub action: usize,
    pub reward: f32,
    pub done: bool,
    pub next_observation: Observation,
}

#[enum_dispatch]
pub trait ReplayMemory {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a transition, evicting the oldest one once the memory is full.
    fn store(&mut self, transition: Transition);

    /// Draws `n` distinct transitions uniformly at random. The memory itself is left untouched.
    fn sample(&self, n: usize, rng: &mut StdRng) -> Result<Vec<&Transition>>;
}

fn check_sample_size(requested: usize, available: usize) -> Result<()> {
    if requested > available {
        return Err(RlError::InsufficientTransitions {
            requested,
            available,
        });
    }
    Ok(())
}

fn push_bounded(transitions: &mut VecDeque<Transition>, capacity: usize, transition: Transition) {
    if capacity == 0 {
        return;
    }
    if transitions.len() >= capacity {
        transitions.pop_front();
    }
    transitions.push_back(transition);
}

/// FIFO ring of the most recent `capacity` transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicReplayMemory {
    capacity: usize,
    transitions: VecDeque<Transition>,
}

impl BasicReplayMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            transitions: VecDeque::with_capacity(capacity),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}

impl ReplayMemory for BasicReplayMemory {
    fn len(&self) -> usize {
        self.transitions.len()
    }

    fn store(&mut self, transition: Transition) {
        push_bounded(&mut self.transitions, self.capacity, transition);
    }

    fn sample(&self, n: usize, rng: &mut StdRng) -> Result<Vec<&Transition>> {
        check_sample_size(n, self.transitions.len())?;
        let indices = index::sample(rng, self.transitions.len(), n);
        Ok(indices.iter().map(|i| &self.transitions[i]).collect())
    }
}

/// Keeps transitions with a negative reward apart from the rest so that a flood of one kind
/// cannot evict every example of the other. Sampling is uniform over the union of both pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancedReplayMemory {
    non_negative: BasicReplayMemory,
    negative: BasicReplayMemory,
}

impl BalancedReplayMemory {
    pub fn new(non_negative_capacity: usize, negative_capacity: usize) -> Self {
        Self {
            non_negative: BasicReplayMemory::new(non_negative_capacity),
            negative: BasicReplayMemory::new(negative_capacity),
        }
    }

    pub fn non_negative_len(&self) -> usize {
        self.non_negative.len()
    }

    pub fn negative_len(&self) -> usize {
        self.negative.len()
    }
}

impl ReplayMemory for BalancedReplayMemory {
    fn len(&self) -> usize {
        self.non_negative.len() + self.negative.len()
    }

    fn store(&mut self, transition: Transition) {
        if transition.reward < 0. {
            self.negative.store(transition);
        } else {
            self.non_negative.store(transition);
        }
    }

    fn sample(&self, n: usize, rng: &mut StdRng) -> Result<Vec<&Transition>> {
        check_sample_size(n, self.len())?;
        let split = self.non_negative.len();
        let indices = index::sample(rng, self.len(), n);
        Ok(indices
            .iter()
            .map(|i| {
                if i < split {
                    &self.non_negative.transitions[i]
                } else {
                    &self.negative.transitions[i - split]
                }
            })
            .collect())
    }
}

#[enum_dispatch(ReplayMemory)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReplayMemoryKind {
    Basic(BasicReplayMemory),
    Balanced(BalancedReplayMemory),
}
