use crate::config::FilterConfig;
use crate::record::Level;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Per-category level filter backed by an atomically swappable snapshot.
///
/// Reads never lock: each decision loads the current [`FilterConfig`]
/// and evaluates against it. [`LevelFilter::reload`] publishes a new
/// snapshot which only affects records filtered afterwards.
pub struct LevelFilter {
    current: ArcSwap<FilterConfig>,
}

impl LevelFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { current: ArcSwap::from_pointee(config) }
    }

    /// Replace the active thresholds.
    pub fn reload(&self, config: FilterConfig) {
        self.current.store(Arc::new(config));
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<FilterConfig> {
        self.current.load_full()
    }

    pub fn should_log(&self, category: &str, level: Level) -> bool {
        should_log(&self.current.load(), category, level)
    }
}

/// Resolve the minimum level for `category`: an exact entry wins, then the
/// longest entry that is a prefix ending on a `.` or `::` boundary, then
/// the default.
pub fn resolve_min_level(config: &FilterConfig, category: &str) -> Level {
    if let Some(level) = config.per_category_min_level.get(category) {
        return *level;
    }

    config
        .per_category_min_level
        .iter()
        .filter(|(prefix, _)| is_category_prefix(prefix, category))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, level)| *level)
        .unwrap_or(config.default_min_level)
}

/// Decide whether a record at `level` for `category` is emitted.
pub fn should_log(config: &FilterConfig, category: &str, level: Level) -> bool {
    if level == Level::None {
        return false;
    }
    let min = resolve_min_level(config, category);
    min != Level::None && level >= min
}

fn is_category_prefix(prefix: &str, category: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    match category.strip_prefix(prefix) {
        Some(rest) => rest.starts_with('.') || rest.starts_with("::"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FilterConfig {
        FilterConfig::new(Level::Information)
            .with_category("Api", Level::Warning)
            .with_category("Api.Payments", Level::Debug)
            .with_category("Noisy", Level::None)
            .with_category("my_crate::db", Level::Trace)
    }

    #[test]
    fn default_level_applies_to_unknown_category() {
        let cfg = config();
        assert!(should_log(&cfg, "Students", Level::Information));
        assert!(should_log(&cfg, "Students", Level::Critical));
        assert!(!should_log(&cfg, "Students", Level::Debug));
    }

    #[test]
    fn exact_match_wins_over_prefix() {
        let cfg = config();
        assert!(should_log(&cfg, "Api.Payments", Level::Debug));
        assert!(!should_log(&cfg, "Api", Level::Information));
    }

    #[test]
    fn longest_prefix_on_boundary() {
        let cfg = config();
        assert_eq!(resolve_min_level(&cfg, "Api.Payments.Stripe"), Level::Debug);
        assert_eq!(resolve_min_level(&cfg, "Api.Courses"), Level::Warning);
        assert_eq!(resolve_min_level(&cfg, "my_crate::db::pool"), Level::Trace);
        // "Apiary" shares characters but not a segment boundary.
        assert_eq!(resolve_min_level(&cfg, "Apiary"), Level::Information);
    }

    #[test]
    fn none_disables_category_and_is_never_emitted() {
        let cfg = config();
        assert!(!should_log(&cfg, "Noisy", Level::Critical));
        assert!(!should_log(&cfg, "Students", Level::None));
    }

    #[test]
    fn reload_affects_subsequent_decisions() {
        let filter = LevelFilter::new(FilterConfig::new(Level::Error));
        assert!(!filter.should_log("Leads", Level::Warning));

        filter.reload(FilterConfig::new(Level::Trace));
        assert!(filter.should_log("Leads", Level::Trace));
        assert_eq!(filter.snapshot().default_min_level, Level::Trace);
    }
}
