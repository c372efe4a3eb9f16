use super::types::LatencyMeasurement;
use crate::core::Region;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthesizes the per-region latency comparison shown to clients.
///
/// Values are drawn from a fixed per-region baseline table with bounded
/// jitter; nothing is measured. EU shares the master's location, so its
/// replica and master figures are the same draw and the gain is always
/// zero. The number source is injectable so tests can pin exact values.
pub struct LatencyEstimator {
    rng: Mutex<StdRng>,
}

impl LatencyEstimator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Synthesize one comparison: gain = master latency - replica latency,
    /// clamped to zero.
    pub fn measure(&self, region: Region) -> LatencyMeasurement {
        let mut rng = self.rng.lock();

        let (replica_ms, master_ms): (u64, u64) = match region {
            // EU reads hit the master itself: same figure, no gain.
            Region::Eu => {
                let base = rng.random_range(25..45);
                (base, base)
            }
            Region::Us => (rng.random_range(40..80), rng.random_range(160..240)),
            Region::Asia => (rng.random_range(50..100), rng.random_range(180..270)),
            Region::Sa => (rng.random_range(45..90), rng.random_range(170..260)),
            Region::Africa => (rng.random_range(35..70), rng.random_range(150..230)),
        };

        let gain_ms = master_ms.saturating_sub(replica_ms);
        let summary = format!(
            "read latency gain vs master: {} ms ({} = {} ms, master = {} ms)",
            gain_ms,
            region.as_str().to_uppercase(),
            replica_ms,
            master_ms
        );

        LatencyMeasurement {
            region,
            replica_ms,
            master_ms,
            gain_ms,
            summary,
        }
    }
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::new()
    }
}
