/// Upper bound on concurrent compute invocations when nothing is configured.
pub const DEFAULT_PARALLELISM: usize = 10;

/// Configuration for one [`Processor`](super::Processor).
///
/// Currently a single knob: the parallelism limit. Resolution order follows
/// the usual layering: an explicit value wins, then the
/// `ATTRFLOW_PARALLELISM` environment variable, then
/// [`DEFAULT_PARALLELISM`]. Non-positive values fall back to the default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub parallelism: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            parallelism: Self::resolve_parallelism(None),
        }
    }
}

impl ProcessorConfig {
    fn resolve_parallelism(provided: Option<usize>) -> usize {
        if let Some(limit) = provided {
            if limit > 0 {
                return limit;
            }
            tracing::warn!(limit, "non-positive parallelism, using default");
            return DEFAULT_PARALLELISM;
        }
        dotenvy::dotenv().ok();
        std::env::var("ATTRFLOW_PARALLELISM")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PARALLELISM)
    }

    pub fn new(parallelism: Option<usize>) -> Self {
        Self {
            parallelism: Self::resolve_parallelism(parallelism),
        }
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Self::resolve_parallelism(Some(parallelism));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins() {
        assert_eq!(ProcessorConfig::new(Some(3)).parallelism, 3);
        assert_eq!(
            ProcessorConfig::default().with_parallelism(7).parallelism,
            7
        );
    }

    #[test]
    fn non_positive_falls_back_to_default() {
        assert_eq!(ProcessorConfig::new(Some(0)).parallelism, DEFAULT_PARALLELISM);
    }
}
