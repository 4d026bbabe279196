//! Flow table configuration.

/// Default load factor used by the three hash indexes when a caller does not
/// override it. Matches `HMAP_DEFAULT_LOAD_FACTOR` in the hmap this design is
/// distilled from.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.8;

/// Flow table configuration.
///
/// There is deliberately no `Default` impl: `ft_config_t.max_entries` in the
/// source this is ported from must always be supplied by the caller and
/// validated to be `> 0` at `ft_create` time; there is no default table size.
#[derive(Debug, Clone)]
pub struct FtConfig {
    /// Maximum number of entries to support. Must be `> 0`.
    pub max_entries: usize,
    /// Load factor threshold for the flow-id index.
    pub id_index_load_factor: f64,
    /// Load factor threshold for the priority index.
    pub priority_index_load_factor: f64,
    /// Load factor threshold for the match index.
    pub match_index_load_factor: f64,
}

impl FtConfig {
    /// Create a config with the default load factor on all three indexes.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            id_index_load_factor: DEFAULT_LOAD_FACTOR,
            priority_index_load_factor: DEFAULT_LOAD_FACTOR,
            match_index_load_factor: DEFAULT_LOAD_FACTOR,
        }
    }

    /// Override the match index's load factor (must be in `(0, 1)`).
    pub fn with_match_load_factor(mut self, factor: f64) -> Self {
        self.match_index_load_factor = factor;
        self
    }

    /// Override the priority index's load factor (must be in `(0, 1)`).
    pub fn with_priority_load_factor(mut self, factor: f64) -> Self {
        self.priority_index_load_factor = factor;
        self
    }

    /// Override the flow-id index's load factor (must be in `(0, 1)`).
    pub fn with_id_load_factor(mut self, factor: f64) -> Self {
        self.id_index_load_factor = factor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_load_factors() {
        let cfg = FtConfig::new(16);
        assert_eq!(cfg.max_entries, 16);
        assert_eq!(cfg.match_index_load_factor, DEFAULT_LOAD_FACTOR);
    }

    #[test]
    fn builder_overrides() {
        let cfg = FtConfig::new(16).with_match_load_factor(0.5);
        assert_eq!(cfg.match_index_load_factor, 0.5);
        assert_eq!(cfg.priority_index_load_factor, DEFAULT_LOAD_FACTOR);
    }
}
