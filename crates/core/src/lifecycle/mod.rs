//! Pure lifecycle functions.
//!
//! Each phase of the perceive -> decide -> act -> learn cycle is a plain
//! synchronous function over explicit inputs. Nothing here suspends, does
//! I/O, or touches shared state; the [`crate::engine::Engine`] sequences
//! these functions and owns the mutable state they operate on.

pub mod awaken;
pub mod consolidate;
pub mod decide;
pub mod learn;
pub mod perceive;
pub mod transitions;

/// Guard against division by zero in entropy and normalization math.
pub const EPSILON: f64 = 1e-9;

/// Minimum resonance strength for a summon to succeed.
pub const RESONANCE_THRESHOLD: f64 = 0.2;

/// Phase entries kept per basis element; oldest evicted first.
pub const MEMORY_CAP: usize = 10;

/// Recorded actions per epoch rollover.
pub const EPOCH_PERIOD: u64 = 10;

/// Beliefs below this probability are pruned after decay.
pub const BELIEF_PRUNE_FLOOR: f64 = 0.01;
