//! Node Configuration
//!
//! Tunables for the identifier space, the successor list and the maintenance
//! timers. The binary fills this from command-line flags; tests build it
//! directly with struct update syntax over `Default`.

use crate::error::{ChordError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Widest identifier space an `Identifier` can hold.
pub const MAX_ID_BITS: u8 = 64;

/// How `remove_entry` treats replicas already pushed to successors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Fan out `remove_replicas` to the successor list right away.
    #[default]
    Eager,
    /// Remove at the owner only; replica reconciliation prunes the copies.
    Lazy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordConfig {
    /// Width `m` of the circular identifier space.
    pub id_bits: u8,
    /// Length `r` of the successor list, also the replication factor.
    pub successor_list_len: usize,
    pub stabilize_interval: Duration,
    pub check_predecessor_interval: Duration,
    pub fix_fingers_interval: Duration,
    pub replica_sync_interval: Duration,
    /// Deadline applied to every remote call.
    pub rpc_timeout: Duration,
    pub replica_retry_attempts: usize,
    /// Lookups give up after `hop_limit_factor * id_bits` hops.
    pub hop_limit_factor: usize,
    /// Upper bound on a graceful leave before the node disconnects anyway.
    pub leave_timeout: Duration,
    pub removal_policy: RemovalPolicy,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            id_bits: 32,
            successor_list_len: 3,
            stabilize_interval: Duration::from_millis(500),
            check_predecessor_interval: Duration::from_secs(1),
            fix_fingers_interval: Duration::from_millis(250),
            replica_sync_interval: Duration::from_secs(5),
            rpc_timeout: Duration::from_millis(500),
            replica_retry_attempts: 3,
            hop_limit_factor: 2,
            leave_timeout: Duration::from_secs(3),
            removal_policy: RemovalPolicy::Eager,
        }
    }
}

impl ChordConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id_bits == 0 || self.id_bits > MAX_ID_BITS {
            return Err(ChordError::Validation(format!(
                "id_bits must be within 1..={}, got {}",
                MAX_ID_BITS, self.id_bits
            )));
        }
        if self.successor_list_len == 0 {
            return Err(ChordError::Validation(
                "successor_list_len must be at least 1".to_string(),
            ));
        }
        if self.hop_limit_factor == 0 {
            return Err(ChordError::Validation(
                "hop_limit_factor must be at least 1".to_string(),
            ));
        }
        if self.replica_retry_attempts == 0 {
            return Err(ChordError::Validation(
                "replica_retry_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn hop_limit(&self) -> usize {
        self.hop_limit_factor * self.id_bits as usize
    }
}
