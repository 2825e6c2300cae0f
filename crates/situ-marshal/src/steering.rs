//! Scalar steering through the exchange graph.
//!
//! Each steerable scalar travels out through a forward channel
//! (`steer_forward_<label>`, a single point carrying the value) and its
//! possibly-updated value comes back in the backend results under
//! `steer_backward_<label>/fields/steer_b_<label>/values`.

use situ_arena::HostData;
use situ_core::{DType, Label};
use situ_graph::{Node, Value};

use crate::channel::{
    channel_path, steer_backward_values_path, ChannelKind, STEER_COORDSET, STEER_FORWARD_FIELD,
    STEER_TOPOLOGY,
};
use crate::error::SteeringError;

/// A scalar type a steered value can be written back into.
pub trait SteerTarget: Copy {
    /// Runtime tag for diagnostics.
    const DTYPE: DType;

    /// Convert a numeric graph value, or `None` if it is not numeric.
    fn from_value(value: &Value) -> Option<Self>;

    /// Wrap the scalar as a graph value of its native type.
    fn into_value(self) -> Value;
}

macro_rules! impl_steer_target {
    ($($ty:ty => $tag:ident, $conv:ident);* $(;)?) => {
        $(
            impl SteerTarget for $ty {
                const DTYPE: DType = DType::$tag;

                fn from_value(value: &Value) -> Option<Self> {
                    if value.is_numeric() {
                        value.$conv()
                    } else {
                        None
                    }
                }

                fn into_value(self) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

impl_steer_target!(
    f64 => F64, to_f64;
    f32 => F32, to_f32;
    i32 => I32, to_i32;
    u32 => U32, to_u32;
);

/// Write the forward steering channel for `label` carrying `value`.
pub fn push(graph: &mut Node, label: &str, value: impl Into<Value>) {
    let ch = graph.fetch_mut(&channel_path(&ChannelKind::SteerForward.channel_name(label)));
    ch.set_string("type", "mesh");

    let coords = format!("data/coordsets/{STEER_COORDSET}");
    ch.set_string(&format!("{coords}/type"), "explicit");
    ch.set(&format!("{coords}/values/x"), HostData::F64(vec![0.0].into()));

    let topo = format!("data/topologies/{STEER_TOPOLOGY}");
    ch.set_string(&format!("{topo}/type"), "unstructured");
    ch.set_string(&format!("{topo}/coordset"), STEER_COORDSET);
    ch.set_string(&format!("{topo}/elements/shape"), "point");
    ch.set(
        &format!("{topo}/elements/connectivity"),
        HostData::I64(vec![0].into()),
    );

    let field = format!("data/fields/{STEER_FORWARD_FIELD}{label}");
    ch.set_string(&format!("{field}/association"), "vertex");
    ch.set_string(&format!("{field}/topology"), STEER_TOPOLOGY);
    ch.set_string(&format!("{field}/volume_dependent"), "false");
    ch.set(&format!("{field}/values"), value);
}

/// The value pushed for `label`, if a forward channel exists.
pub fn forward_value<'g>(graph: &'g Node, label: &str) -> Option<&'g Value> {
    graph.get(&format!(
        "{}/data/fields/{STEER_FORWARD_FIELD}{label}/values",
        channel_path(&ChannelKind::SteerForward.channel_name(label))
    ))
}

/// Write a steered value into a results graph. Used by backends.
pub fn write_backward(results: &mut Node, label: &str, value: impl Into<Value>) {
    results.set(&steer_backward_values_path(label), value);
}

/// Read the steered value for `label` from the backend results.
///
/// Fails with [`SteeringError::UnsupportedSteeringType`] if the value is
/// absent or not numeric.
pub fn pull<T: SteerTarget>(results: &Node, label: &str) -> Result<T, SteeringError> {
    let err = |found: &'static str| SteeringError::UnsupportedSteeringType {
        label: Label::from(label),
        found,
        target: T::DTYPE,
    };
    let value = results
        .get(&steer_backward_values_path(label))
        .ok_or_else(|| err("nothing"))?;
    T::from_value(value).ok_or_else(|| err(value.kind_name()))
}
