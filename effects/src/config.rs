#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Number of identifiers the registry can hold before reallocating.
    #[cfg_attr(feature = "serde", serde(default = "default_registry_capacity"))]
    pub registry_capacity: usize,

    /// Initial capacity of each subscription's pre-attach buffer.
    #[cfg_attr(feature = "serde", serde(default = "default_replay_capacity"))]
    pub replay_capacity: usize,

    /// Emit `effects_*` counters through the `metrics` facade.
    pub metrics: bool,
}

fn default_registry_capacity() -> usize {
    16
}

fn default_replay_capacity() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_capacity: default_registry_capacity(),
            replay_capacity: default_replay_capacity(),
            metrics: true,
        }
    }
}
