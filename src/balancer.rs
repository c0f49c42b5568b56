//! Randomized work sharing between request workers
//!
//! After each completed query a worker may try to even out its backlog with
//! one randomly chosen peer. The attempt fires with probability
//! `1 / (len + 1)`, so busy workers rarely pay for it. There is no central
//! scheduler and no shared RNG: every worker draws from its own generator.
//!
//! Lock order: whenever two deques are held, the one with the lower worker
//! id is locked first. [`WorkSharingBalancer::lock_pair`] is the only place
//! in the crate that holds two deque locks at once.

use rand::Rng;

use crate::deque::{DequeGuard, WorkerDeque};

/// Default minimum length difference before work is moved
pub const DEFAULT_THRESHOLD: usize = 5;

/// What a single balancing attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOutcome {
    /// Random draw did not trigger an attempt
    NotTriggered,
    /// The victim drawn was the caller itself
    SelfVictim,
    /// Both deques were locked but the difference was within threshold
    WithinThreshold { victim: usize },
    /// Items moved from the longer deque's back to the shorter one's
    Moved { victim: usize, moved: usize },
}

/// Two deque guards acquired in ascending worker-id order.
/// Fields drop in declaration order, so `high` unlocks before `low`.
pub struct PairGuard<'a, T> {
    pub high: DequeGuard<'a, T>,
    pub low: DequeGuard<'a, T>,
}

pub struct WorkSharingBalancer<'a, T> {
    deques: &'a [WorkerDeque<T>],
    threshold: usize,
}

impl<'a, T> WorkSharingBalancer<'a, T> {
    pub fn new(deques: &'a [WorkerDeque<T>], threshold: usize) -> Self {
        Self { deques, threshold }
    }

    /// Run one probabilistic balancing attempt on behalf of worker `me`
    pub fn after_task<R: Rng>(&self, me: usize, rng: &mut R) -> BalanceOutcome {
        let size = self.deques[me].len();
        if rng.random_range(0..=size) != size {
            return BalanceOutcome::NotTriggered;
        }

        let victim = rng.random_range(0..self.deques.len());
        if victim == me {
            return BalanceOutcome::SelfVictim;
        }

        match self.balance_pair(me, victim) {
            0 => BalanceOutcome::WithinThreshold { victim },
            moved => BalanceOutcome::Moved { victim, moved },
        }
    }

    /// Lock two distinct deques, lower id first
    pub fn lock_pair(&self, a: usize, b: usize) -> PairGuard<'a, T> {
        assert_ne!(a, b, "a deque cannot be paired with itself");
        let deques = self.deques;
        let (min, max) = if a < b { (a, b) } else { (b, a) };
        let low = deques[min].lock();
        let high = deques[max].lock();
        PairGuard { high, low }
    }

    /// Even out two deques if their lengths differ by more than the
    /// threshold. Returns the number of items moved.
    pub fn balance_pair(&self, a: usize, b: usize) -> usize {
        let mut pair = self.lock_pair(a, b);
        transfer(&mut pair.low, &mut pair.high, self.threshold)
    }
}

fn transfer<'g, T>(
    d0: &mut DequeGuard<'g, T>,
    d1: &mut DequeGuard<'g, T>,
    threshold: usize,
) -> usize {
    let (q_min, q_max) = if d0.len() < d1.len() {
        (d0, d1)
    } else {
        (d1, d0)
    };

    let diff = q_max.len() - q_min.len();
    if diff <= threshold || q_min.is_retired() {
        return 0;
    }

    let mut moved = 0;
    while q_max.len() > q_min.len() + 1 {
        match q_max.pop_back() {
            Some(item) => {
                q_min.push_back(item);
                moved += 1;
            }
            None => break,
        }
    }
    log::trace!("Work sharing moved {moved} queries (diff was {diff})");
    moved
}
