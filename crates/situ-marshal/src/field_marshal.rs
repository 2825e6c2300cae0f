//! Field marshaling.
//!
//! A field becomes a channel holding a uniform coordset, a uniform
//! topology and one element-associated field whose values reference a
//! column-major host copy. With ghost masks enabled the halo is kept in
//! the copy and a `vtkGhostType` mask field is added next to it.

use std::sync::Arc;

use situ_core::{DType, ElementKind, Label, MAX_AXES};
use situ_graph::{ExternalArray, Node};

use crate::channel::{
    channel_path, ChannelKind, AXIS_NAMES, DIM_NAMES, GHOST_FIELD, GRID_COORDSET, GRID_TOPOLOGY,
    SPACING_NAMES,
};
use crate::context::{MarshalContext, MarshalOutcome};
use crate::error::MarshalError;
use crate::field::FieldSource;
use crate::mask::build_ghost_mask;

/// Writes field channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldMarshaler {
    ghost_masks: bool,
}

impl FieldMarshaler {
    /// A marshaler that strips halos (`ghost_masks = false`) or exports
    /// them with a ghost mask (`ghost_masks = true`).
    pub fn new(ghost_masks: bool) -> Self {
        Self { ghost_masks }
    }

    /// Whether halos are exported with a ghost mask.
    pub fn ghost_masks(&self) -> bool {
        self.ghost_masks
    }

    /// Marshal `field` under `label`.
    ///
    /// Returns [`MarshalOutcome::AlreadyPresent`] if `label` already has
    /// buffers this cycle and [`MarshalOutcome::Skipped`] if the element
    /// kind has no graph representation.
    pub fn marshal(
        &self,
        ctx: &mut MarshalContext<'_>,
        label: &Label,
        field: &dyn FieldSource,
    ) -> Result<MarshalOutcome, MarshalError> {
        if ctx.buffers.contains(label.as_str()) {
            return Ok(MarshalOutcome::AlreadyPresent);
        }

        let (kind, components) = match field.element_kind() {
            ElementKind::Scalar => (ChannelKind::ScalarField, 1),
            ElementKind::Vector { components } if (2..=MAX_AXES).contains(&components) => {
                (ChannelKind::VectorField, components)
            }
            other => {
                tracing::warn!(label = %label, kind = %other, "unsupported field element type, skipping");
                return Ok(MarshalOutcome::Skipped);
            }
        };

        let dims = field.dims();
        if dims == 0 || dims > MAX_AXES {
            return Err(MarshalError::UnsupportedDimensionality {
                label: label.clone(),
                dims,
                max: MAX_AXES,
            });
        }

        let channel = kind.channel_name(label.as_str());
        let ghosts = self.ghost_masks;
        let shift = if ghosts { field.halo() } else { 0 };

        let host = field.to_host(ghosts)?;
        let extents: Vec<usize> = host.extents().to_vec();
        let count = host.element_count();
        let dtype = field.dtype();
        let handle = ctx.buffers.set(label.clone(), host);

        let node = ctx.graph.fetch_mut(&channel_path(&channel));
        node.set_string("type", "mesh");
        let data = node.fetch_mut("data");
        write_uniform_grid(data, field, &extents, shift);

        let values = data.fetch_mut(&format!("fields/{label}"));
        values.set_string("association", "element");
        values.set_string("topology", GRID_TOPOLOGY);
        values.set_string("volume_dependent", "false");
        if components == 1 {
            values.set_external("values", ExternalArray::contiguous(handle, dtype, count));
        } else {
            for (c, axis) in AXIS_NAMES.iter().enumerate().take(components) {
                values.set_external(
                    &format!("values/{axis}"),
                    ExternalArray::component(handle, dtype, count, c, components),
                );
            }
        }

        if ghosts {
            let owned = field.owned_extents();
            let halo = field.halo();
            let mask = ctx
                .masks
                .get_or_create(field.geometry_key(), || build_ghost_mask(&owned, halo))?;
            let mask_count = mask.element_count();
            let mask_handle = ctx.buffers.attach(label.as_str(), Arc::clone(&mask))?;

            let data = ctx.graph.fetch_mut(&format!("{}/data", channel_path(&channel)));
            let ghost = data.fetch_mut(&format!("fields/{GHOST_FIELD}"));
            ghost.set_string("association", "element");
            ghost.set_string("topology", GRID_TOPOLOGY);
            ghost.set_string("volume_dependent", "false");
            ghost.set_external(
                "values",
                ExternalArray::contiguous(mask_handle, DType::U8, mask_count),
            );
            data.set_string(
                &format!("metadata/vtk_fields/{GHOST_FIELD}/attribute_type"),
                "Ghosts",
            );
        }

        tracing::debug!(
            label = %label,
            channel = %channel,
            dims,
            components,
            ghosts,
            "field marshaled"
        );
        Ok(MarshalOutcome::Emitted { channel })
    }
}

/// Coordset and topology of the uniform grid the host copy covers.
///
/// Point counts are one more than cell counts. The origin is shifted
/// back by `shift` cells when the halo is exported.
fn write_uniform_grid(data: &mut Node, field: &dyn FieldSource, cells: &[usize], shift: usize) {
    let origin = field.origin();
    let spacing = field.spacing();
    let ranges = field.local_ranges();

    let coords = data.fetch_mut(&format!("coordsets/{GRID_COORDSET}"));
    coords.set_string("type", "uniform");
    for a in 0..cells.len() {
        let first = ranges[a].first - shift as i64;
        coords.set(&format!("dims/{}", DIM_NAMES[a]), (cells[a] + 1) as i64);
        coords.set(
            &format!("origin/{}", AXIS_NAMES[a]),
            origin[a] + first as f64 * spacing[a],
        );
        coords.set(&format!("spacing/{}", SPACING_NAMES[a]), spacing[a]);
    }

    let topo = data.fetch_mut(&format!("topologies/{GRID_TOPOLOGY}"));
    topo.set_string("type", "uniform");
    topo.set_string("coordset", GRID_COORDSET);
}
