//! Particle marshaling.
//!
//! A particle collection becomes a point-cloud channel: an explicit
//! coordset whose axes are strided views into the position buffer, a
//! point topology whose connectivity is the identifier array, a
//! `position` vertex field and one vertex field per extra attribute.
//! If the layout has a spatial region, a two-point uniform box spanning
//! it is added as well.

use situ_arena::{mirror_to_host, CopyPolicy};
use situ_core::{DType, Label, MAX_AXES};
use situ_graph::{ExternalArray, Node};

use crate::channel::{
    channel_path, ChannelKind, AXIS_NAMES, BBOX_COORDSET, BBOX_TOPOLOGY, DIM_NAMES,
    PARTICLE_COORDSET, PARTICLE_TOPOLOGY, SPACING_NAMES,
};
use crate::context::{MarshalContext, MarshalOutcome};
use crate::error::MarshalError;
use crate::particle::ParticleSource;

/// Writes particle channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParticleMarshaler;

impl ParticleMarshaler {
    /// A particle marshaler.
    pub fn new() -> Self {
        Self
    }

    /// Marshal `particles` under `label`.
    ///
    /// With `force_host_copy` every array is deep-copied even when it
    /// already lives on the host; otherwise host-resident arrays are
    /// shared with the registry.
    pub fn marshal(
        &self,
        ctx: &mut MarshalContext<'_>,
        label: &Label,
        particles: &dyn ParticleSource,
        force_host_copy: bool,
    ) -> Result<MarshalOutcome, MarshalError> {
        if ctx.buffers.contains(label.as_str()) {
            return Ok(MarshalOutcome::AlreadyPresent);
        }
        let dims = particles.dims();
        if dims == 0 || dims > MAX_AXES {
            return Err(MarshalError::UnsupportedDimensionality {
                label: label.clone(),
                dims,
                max: MAX_AXES,
            });
        }

        let n = particles.local_count();
        for i in 2..particles.attribute_count() {
            if let Some(attribute) = particles.attribute(i) {
                attribute.check_len(n)?;
            }
        }

        let policy = if force_host_copy {
            CopyPolicy::ForceCopy
        } else {
            CopyPolicy::ReuseHostResident
        };
        let ids = ctx
            .buffers
            .set(label.clone(), mirror_to_host(particles.ids(), policy)?);
        let positions = ctx
            .buffers
            .attach(label.as_str(), mirror_to_host(particles.positions(), policy)?)?;

        let channel = ChannelKind::Particles.channel_name(label.as_str());
        let node = ctx.graph.fetch_mut(&channel_path(&channel));
        node.set_string("type", "mesh");
        let data = node.fetch_mut("data");

        if let Some((min, max)) = particles.region() {
            write_bounding_box(data, min, max);
        }

        let coords = data.fetch_mut(&format!("coordsets/{PARTICLE_COORDSET}"));
        coords.set_string("type", "explicit");
        for (c, axis) in AXIS_NAMES.iter().enumerate().take(dims) {
            coords.set_external(
                &format!("values/{axis}"),
                ExternalArray::component(positions, DType::F64, n, c, dims),
            );
        }

        let topo = data.fetch_mut(&format!("topologies/{PARTICLE_TOPOLOGY}"));
        topo.set_string("type", "unstructured");
        topo.set_string("coordset", PARTICLE_COORDSET);
        topo.set_string("elements/shape", "point");
        topo.set_external(
            "elements/connectivity",
            ExternalArray::contiguous(ids, DType::I64, n),
        );

        let position = data.fetch_mut("fields/position");
        position.set_string("association", "vertex");
        position.set_string("topology", PARTICLE_TOPOLOGY);
        position.set_string("volume_dependent", "false");
        for (c, axis) in AXIS_NAMES.iter().enumerate().take(dims) {
            position.set_external(
                &format!("values/{axis}"),
                ExternalArray::component(positions, DType::F64, n, c, dims),
            );
        }

        let extras = particles.attribute_count().saturating_sub(2);
        if extras > 0 {
            let fields = data.fetch_mut("fields");
            let mut scope = ctx.buffers.scope(label.as_str())?;
            for i in 2..particles.attribute_count() {
                if let Some(attribute) = particles.attribute(i) {
                    attribute.marshal_into(&mut scope, fields, n, force_host_copy)?;
                }
            }
        }

        tracing::debug!(
            label = %label,
            channel = %channel,
            particles = n,
            extras,
            "particles marshaled"
        );
        Ok(MarshalOutcome::Emitted { channel })
    }
}

/// Two-point-per-axis uniform box spanning `[min, max]`.
fn write_bounding_box(data: &mut Node, min: &[f64], max: &[f64]) {
    let coords = data.fetch_mut(&format!("coordsets/{BBOX_COORDSET}"));
    coords.set_string("type", "uniform");
    for (a, (lo, hi)) in min.iter().zip(max).enumerate().take(MAX_AXES) {
        coords.set(&format!("dims/{}", DIM_NAMES[a]), 2i64);
        coords.set(&format!("origin/{}", AXIS_NAMES[a]), *lo);
        coords.set(&format!("spacing/{}", SPACING_NAMES[a]), hi - lo);
    }
    let topo = data.fetch_mut(&format!("topologies/{BBOX_TOPOLOGY}"));
    topo.set_string("type", "uniform");
    topo.set_string("coordset", BBOX_COORDSET);
}
