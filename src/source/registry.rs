use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::MonitorConfig;
use crate::core::types::MetricId;
use crate::error::{Error, Result};
use crate::traits::MetricSource;

/// Explicit mapping from metric ids to the sources that produce them.
///
/// Sources are registered by a typed call at startup; each metric id may be
/// provided by at most one source.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn MetricSource>>,
    by_metric: HashMap<MetricId, usize>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.sources.iter().map(|s| s.resource()).collect::<Vec<_>>())
            .field("metrics", &self.by_metric.len())
            .finish()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in source of every enabled resource
    #[cfg_attr(
        not(any(
            feature = "cpu",
            feature = "memory",
            feature = "gpu",
            feature = "disk",
            feature = "network",
            feature = "process"
        )),
        allow(unused_variables, unused_mut)
    )]
    pub fn with_defaults(config: &MonitorConfig) -> Self {
        let mut registry = Self::new();
        let mut defaults: Vec<Arc<dyn MetricSource>> = Vec::new();

        #[cfg(feature = "cpu")]
        defaults.push(Arc::new(crate::cpu::default_source(config)));
        #[cfg(feature = "memory")]
        defaults.push(Arc::new(crate::memory::default_source(config)));
        #[cfg(feature = "gpu")]
        defaults.push(Arc::new(crate::gpu::default_source(config)));
        #[cfg(feature = "disk")]
        defaults.push(Arc::new(crate::disk::default_source(config)));
        #[cfg(feature = "network")]
        defaults.push(Arc::new(crate::network::default_source(config)));
        #[cfg(feature = "process")]
        defaults.push(Arc::new(crate::process::default_source(config)));

        for source in defaults {
            if let Err(e) = registry.register_arc(source) {
                debug!(error = %e, "Skipping built-in source");
            }
        }
        registry
    }

    /// Registers a source for every metric it describes
    pub fn register<S: MetricSource + 'static>(&mut self, source: S) -> Result<&mut Self> {
        self.register_arc(Arc::new(source))
    }

    pub fn register_arc(&mut self, source: Arc<dyn MetricSource>) -> Result<&mut Self> {
        if let Some(clash) = source.descriptors().iter().find(|d| self.by_metric.contains_key(&d.id)) {
            return Err(Error::config_invalid(format!(
                "metric {} is already provided by another source",
                clash.id
            )));
        }
        let index = self.sources.len();
        for descriptor in source.descriptors() {
            self.by_metric.insert(descriptor.id.clone(), index);
        }
        debug!(resource = %source.resource(), metrics = source.descriptors().len(), "Registered source");
        self.sources.push(source);
        Ok(self)
    }

    pub fn sources(&self) -> &[Arc<dyn MetricSource>] {
        &self.sources
    }

    pub fn source_for(&self, metric: &MetricId) -> Option<&Arc<dyn MetricSource>> {
        self.by_metric.get(metric).and_then(|&index| self.sources.get(index))
    }

    pub fn provides(&self, metric: &MetricId) -> bool {
        self.by_metric.contains_key(metric)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
