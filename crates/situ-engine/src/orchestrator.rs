//! The per-cycle orchestrator.
//!
//! [`CycleOrchestrator`] owns the outgoing exchange graph, the buffer
//! registry, the ghost mask cache and the backend results graph. Each
//! [`execute`](CycleOrchestrator::execute) call follows one fixed
//! order:
//!
//! ```text
//! state ─► marshal vis ─► push steer ─► fence ─► backend.execute
//!       ─► fetch_results + pull steer ─► clear buffers/masks/graphs
//! ```
//!
//! The clear step runs even when an earlier step fails, so no buffer
//! outlives its cycle.

use std::time::Instant;

use indexmap::IndexMap;

use situ_arena::BufferRegistry;
use situ_core::Label;
use situ_graph::{GraphView, Node};
use situ_marshal::channel::{channels_root, ROOT};
use situ_marshal::{
    steering, EntryRegistry, EntryVisitor, FieldMarshaler, FieldSource, GhostMaskCache,
    MarshalContext, MarshalError, MarshalOutcome, ParticleMarshaler, ParticleSource, ScalarSlot,
    SteeringError,
};

use crate::backend::{Backend, BackendCall, BackendStatus};
use crate::config::{AdaptorConfig, MaskCachePolicy};
use crate::error::AdaptorError;
use crate::metrics::CycleMetrics;
use crate::scripts::build_config_graph;

/// Drives marshaling, the backend and steering once per cycle.
pub struct CycleOrchestrator<B: Backend> {
    config: AdaptorConfig,
    backend: B,
    fields: FieldMarshaler,
    particles: ParticleMarshaler,
    buffers: BufferRegistry,
    masks: GhostMaskCache,
    graph: Node,
    results: Node,
    host_copy: IndexMap<Label, bool>,
    initialized: bool,
    cycles: u64,
}

impl<B: Backend> CycleOrchestrator<B> {
    /// Create an orchestrator; nothing is sent to `backend` until
    /// [`initialize`](Self::initialize).
    pub fn new(config: AdaptorConfig, backend: B) -> Self {
        Self {
            fields: FieldMarshaler::new(config.ghost_masks),
            particles: ParticleMarshaler::new(),
            config,
            backend,
            buffers: BufferRegistry::new(),
            masks: GhostMaskCache::new(),
            graph: Node::new(),
            results: Node::new(),
            host_copy: IndexMap::new(),
            initialized: false,
            cycles: 0,
        }
    }

    /// Create an orchestrator from the process environment.
    ///
    /// An invalid `SITU_` variable is reported as [`AdaptorError::Config`].
    pub fn from_env(backend: B) -> Result<Self, AdaptorError> {
        let config = AdaptorConfig::from_env()?;
        tracing::debug!(
            vis = config.vis,
            steer = config.steer,
            verbosity = config.verbosity,
            "configuration captured from environment"
        );
        Ok(Self::new(config, backend))
    }

    /// Build the configuration graph and initialize the backend.
    ///
    /// A failing backend is fatal: the orchestrator stays uninitialized.
    pub fn initialize(
        &mut self,
        vis: &mut EntryRegistry<'_>,
        steer: &mut EntryRegistry<'_>,
    ) -> Result<(), AdaptorError> {
        let built = build_config_graph(&self.config, vis, steer);
        let status = self.backend.initialize(&built.graph);
        if !status.is_ok() {
            tracing::error!(backend = self.backend.name(), %status, "backend initialize failed");
            return Err(AdaptorError::BackendCallFailure {
                call: BackendCall::Initialize,
                status,
            });
        }
        self.host_copy = built.host_copy;
        self.initialized = true;
        tracing::info!(
            backend = self.backend.name(),
            vis = self.config.vis,
            steer = self.config.steer,
            ghost_masks = self.config.ghost_masks,
            channels = built.channels.len(),
            "orchestrator initialized"
        );
        Ok(())
    }

    /// Run one cycle.
    ///
    /// Backend `execute` and `fetch_results` failures are logged and the
    /// cycle completes; marshaling and steering errors are returned.
    /// Buffers, graphs and (per policy) masks are cleared either way.
    pub fn execute(
        &mut self,
        cycle: u64,
        time: f64,
        rank: u32,
        vis: &mut EntryRegistry<'_>,
        steer: &mut EntryRegistry<'_>,
    ) -> Result<CycleMetrics, AdaptorError> {
        if !self.initialized {
            return Err(AdaptorError::NotInitialized);
        }
        let start = Instant::now();
        let outcome = self.run_cycle(cycle, time, rank, vis, steer);
        self.end_cycle();
        let mut metrics = outcome?;
        metrics.elapsed_us = start.elapsed().as_micros() as u64;
        tracing::debug!(
            cycle,
            channels = metrics.channels,
            buffers = metrics.buffers,
            elapsed_us = metrics.elapsed_us,
            "cycle complete"
        );
        Ok(metrics)
    }

    /// Marshal `label` now, deep-copying its data to the host.
    ///
    /// Use this to capture state the simulation will overwrite before
    /// [`execute`](Self::execute) runs; `execute` then skips the label
    /// for this cycle.
    pub fn remember_now(
        &mut self,
        label: &str,
        vis: &mut EntryRegistry<'_>,
    ) -> Result<(), AdaptorError> {
        if !self.initialized {
            return Err(AdaptorError::NotInitialized);
        }
        if !vis.contains(label) {
            tracing::error!(label, "remember_now on unregistered label");
            return Err(AdaptorError::MissingLabel {
                label: Label::from(label),
            });
        }
        let mut visitor = VisVisitor {
            ctx: MarshalContext::new(&mut self.graph, &mut self.buffers, &mut self.masks),
            fields: self.fields,
            particles: self.particles,
            host_copy: &self.host_copy,
            force_all: true,
            skipped: 0,
        };
        vis.for_one(label, &mut visitor)?;
        tracing::debug!(label, "entry remembered");
        Ok(())
    }

    /// Finalize the backend. Failure is logged, not raised.
    pub fn finalize(&mut self) -> BackendStatus {
        let status = self.backend.finalize();
        if status.is_ok() {
            tracing::info!(backend = self.backend.name(), cycles = self.cycles, "backend finalized");
        } else {
            tracing::warn!(backend = self.backend.name(), %status, "backend finalize failed");
        }
        status
    }

    /// The captured configuration.
    pub fn config(&self) -> &AdaptorConfig {
        &self.config
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The buffer registry. Empty between cycles.
    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    /// The ghost mask cache.
    pub fn masks(&self) -> &GhostMaskCache {
        &self.masks
    }

    /// The outgoing graph. Empty between cycles unless
    /// [`remember_now`](Self::remember_now) has run.
    pub fn graph(&self) -> &Node {
        &self.graph
    }

    /// Whether [`initialize`](Self::initialize) succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of cycles run.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Consume the orchestrator and return the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn run_cycle(
        &mut self,
        cycle: u64,
        time: f64,
        rank: u32,
        vis: &mut EntryRegistry<'_>,
        steer: &mut EntryRegistry<'_>,
    ) -> Result<CycleMetrics, AdaptorError> {
        let masks_before = self.masks.stats();
        let state = self.graph.fetch_mut(&format!("{ROOT}/state"));
        state.set("cycle", cycle);
        state.set("time", time);
        state.set("domain_id", rank);

        let mut skipped = 0;
        if self.config.vis {
            let mut visitor = VisVisitor {
                ctx: MarshalContext::new(&mut self.graph, &mut self.buffers, &mut self.masks),
                fields: self.fields,
                particles: self.particles,
                host_copy: &self.host_copy,
                force_all: false,
                skipped: 0,
            };
            vis.for_each(&mut visitor)?;
            skipped = visitor.skipped;
        }
        if self.config.steer {
            steer.for_each(&mut SteerPushVisitor {
                graph: &mut self.graph,
            })?;
        }

        self.buffers.fence();
        let view = GraphView::new(&self.graph, &self.buffers)?;
        if self.cycles == 0 && tracing::enabled!(tracing::Level::DEBUG) {
            match view.to_json() {
                Ok(json) => tracing::debug!(cycle, graph = %json, "first outgoing exchange graph"),
                Err(e) => tracing::debug!(cycle, error = %e, "exchange graph dump failed"),
            }
        }
        let status = self.backend.execute(view);
        if !status.is_ok() {
            tracing::warn!(cycle, backend = self.backend.name(), %status, "backend execute failed");
        }

        let masks_after = self.masks.stats();
        let mut metrics = CycleMetrics {
            cycle,
            channels: self
                .graph
                .fetch(&channels_root())
                .map_or(0, Node::child_count),
            buffers: self.buffers.len(),
            buffer_bytes: self.buffers.total_bytes(),
            mask_hits: masks_after.hits - masks_before.hits,
            mask_misses: masks_after.misses - masks_before.misses,
            skipped_entries: skipped,
            backend_ok: status.is_ok(),
            ..CycleMetrics::default()
        };

        if self.config.steer {
            let fetched = self.backend.fetch_results(&mut self.results);
            if fetched.is_ok() {
                let mut pull = SteerPullVisitor {
                    results: &self.results,
                    pulled: 0,
                };
                steer.for_each(&mut pull)?;
                metrics.steering_pulled = pull.pulled;
            } else {
                tracing::warn!(
                    cycle,
                    backend = self.backend.name(),
                    status = %fetched,
                    "backend fetch_results failed, steering skipped this cycle"
                );
            }
        }
        Ok(metrics)
    }

    fn end_cycle(&mut self) {
        self.buffers.clear();
        if self.config.mask_cache == MaskCachePolicy::PerCycle {
            self.masks.clear();
        }
        self.graph.reset();
        self.results.reset();
        self.cycles += 1;
    }
}

/// Marshals visualization entries into the outgoing graph.
struct VisVisitor<'c, 'h> {
    ctx: MarshalContext<'c>,
    fields: FieldMarshaler,
    particles: ParticleMarshaler,
    host_copy: &'h IndexMap<Label, bool>,
    force_all: bool,
    skipped: usize,
}

impl VisVisitor<'_, '_> {
    fn record(&mut self, label: &Label, outcome: MarshalOutcome) {
        match outcome {
            MarshalOutcome::Emitted { .. } => {}
            MarshalOutcome::Skipped => self.skipped += 1,
            MarshalOutcome::AlreadyPresent => {
                tracing::trace!(label = %label, "already marshaled this cycle");
            }
        }
    }
}

impl EntryVisitor for VisVisitor<'_, '_> {
    type Error = MarshalError;

    fn visit_particles(
        &mut self,
        label: &Label,
        particles: &dyn ParticleSource,
    ) -> Result<(), MarshalError> {
        let force = self.force_all || self.host_copy.get(label).copied().unwrap_or(false);
        let outcome = self.particles.marshal(&mut self.ctx, label, particles, force)?;
        self.record(label, outcome);
        Ok(())
    }

    fn visit_field(&mut self, label: &Label, field: &dyn FieldSource) -> Result<(), MarshalError> {
        let outcome = self.fields.marshal(&mut self.ctx, label, field)?;
        self.record(label, outcome);
        Ok(())
    }
}

/// Pushes every steerable scalar into its forward channel.
struct SteerPushVisitor<'g> {
    graph: &'g mut Node,
}

impl EntryVisitor for SteerPushVisitor<'_> {
    type Error = MarshalError;

    fn visit_scalar(&mut self, label: &Label, slot: &mut ScalarSlot<'_>) -> Result<(), MarshalError> {
        steering::push(self.graph, label.as_str(), slot.value());
        Ok(())
    }

    fn visit_particles(&mut self, label: &Label, _p: &dyn ParticleSource) -> Result<(), MarshalError> {
        Err(MarshalError::UnsupportedEntryType {
            label: label.clone(),
            kind: "particles".into(),
        })
    }

    fn visit_field(&mut self, label: &Label, _f: &dyn FieldSource) -> Result<(), MarshalError> {
        Err(MarshalError::UnsupportedEntryType {
            label: label.clone(),
            kind: "field".into(),
        })
    }
}

/// Writes steered values from the results graph back into scalars.
struct SteerPullVisitor<'r> {
    results: &'r Node,
    pulled: usize,
}

impl EntryVisitor for SteerPullVisitor<'_> {
    type Error = SteeringError;

    fn visit_scalar(&mut self, label: &Label, slot: &mut ScalarSlot<'_>) -> Result<(), SteeringError> {
        slot.pull_from(self.results, label.as_str())?;
        self.pulled += 1;
        Ok(())
    }
}
