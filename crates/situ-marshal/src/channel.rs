//! Channel naming and graph path layout.
//!
//! Every entity is published as its own channel under
//! `insitu/channels/<prefix><label>`. Steering results come back under
//! `insitu/<steer_backward_prefix><label>`.

use std::fmt;

/// Root of everything Situ writes into a graph.
pub const ROOT: &str = "insitu";

/// Name of the ghost mask field. Analysis backends recognise this name.
pub const GHOST_FIELD: &str = "vtkGhostType";

/// Coordset of a field's uniform mesh.
pub const GRID_COORDSET: &str = "grid_coords";
/// Topology of a field's uniform mesh.
pub const GRID_TOPOLOGY: &str = "grid_topo";
/// Explicit coordset of a particle cloud.
pub const PARTICLE_COORDSET: &str = "p_coords";
/// Point topology of a particle cloud.
pub const PARTICLE_TOPOLOGY: &str = "p_topo";
/// Uniform coordset spanning a particle layout's region.
pub const BBOX_COORDSET: &str = "bbox_coords";
/// Topology over [`BBOX_COORDSET`].
pub const BBOX_TOPOLOGY: &str = "bbox_topo";
/// One-point coordset of a steering channel.
pub const STEER_COORDSET: &str = "s_coords";
/// Point topology of a steering channel.
pub const STEER_TOPOLOGY: &str = "s_topo";

/// Coordinate component names per axis.
pub const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];
/// Point-count names per axis in a uniform coordset.
pub const DIM_NAMES: [&str; 3] = ["i", "j", "k"];
/// Spacing names per axis in a uniform coordset.
pub const SPACING_NAMES: [&str; 3] = ["dx", "dy", "dz"];

/// Field name prefix inside a forward steering channel.
pub const STEER_FORWARD_FIELD: &str = "steer_f_";
/// Field name prefix inside a backward steering channel.
pub const STEER_BACKWARD_FIELD: &str = "steer_b_";

/// What a channel carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// A field of scalars.
    ScalarField,
    /// A field of 2- or 3-component vectors.
    VectorField,
    /// A particle collection.
    Particles,
    /// A scalar sent to the backend for steering.
    SteerForward,
    /// A steered scalar returned by the backend.
    SteerBackward,
}

impl ChannelKind {
    /// Prefix prepended to the label.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::ScalarField => "sfield_",
            Self::VectorField => "vfield_",
            Self::Particles => "particles_",
            Self::SteerForward => "steer_forward_",
            Self::SteerBackward => "steer_backward_",
        }
    }

    /// Channel name for `label`.
    pub fn channel_name(self, label: &str) -> String {
        format!("{}{label}", self.prefix())
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ScalarField => "scalar field",
            Self::VectorField => "vector field",
            Self::Particles => "particles",
            Self::SteerForward => "steer forward",
            Self::SteerBackward => "steer backward",
        };
        f.write_str(s)
    }
}

/// Graph path of the node holding channel `name`.
pub fn channel_path(name: &str) -> String {
    format!("{ROOT}/channels/{name}")
}

/// Path of the channels container.
pub fn channels_root() -> String {
    format!("{ROOT}/channels")
}

/// Path in the backend results where the steered value for `label` lives.
pub fn steer_backward_values_path(label: &str) -> String {
    format!(
        "{ROOT}/{}/fields/{STEER_BACKWARD_FIELD}{label}/values",
        ChannelKind::SteerBackward.channel_name(label)
    )
}
