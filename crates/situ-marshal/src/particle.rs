//! Particle collections and their attributes.
//!
//! A particle collection always has an identifier attribute (index 0)
//! and a position attribute (index 1). Further attributes are stored as
//! trait objects and marshal themselves through
//! [`Attribute::marshal_into`], which receives a [`BufferScope`] so it
//! can register its host copy under the collection's label.

use smallvec::SmallVec;

use situ_arena::{mirror_to_host, ArenaError, BufferScope, CopyPolicy, HostBuffer, HostScalar};
use situ_core::{
    CoreError, DType, DeviceArray, ElementKind, FieldElement, MemorySpace, Scalar, SpatialRegion,
    Vector, MAX_AXES,
};
use situ_graph::{ExternalArray, Node};

use crate::channel::{AXIS_NAMES, PARTICLE_TOPOLOGY};
use crate::error::MarshalError;

/// A per-particle attribute that knows how to export itself.
pub trait Attribute {
    /// Field name in the graph.
    fn name(&self) -> &str;

    /// Structural kind of each value.
    fn element_kind(&self) -> ElementKind;

    /// Number of particles with a value.
    fn len(&self) -> usize;

    /// Fail unless there is a value for each of `count` particles.
    fn check_len(&self, count: usize) -> Result<(), MarshalError> {
        let len = self.len();
        if len < count {
            return Err(MarshalError::AttributeLength {
                attribute: self.name().to_owned(),
                len,
                count,
            });
        }
        Ok(())
    }

    /// Whether the attribute is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy (or share) this attribute's data to the host, register it in
    /// `scope`, and describe the first `count` values as a vertex field
    /// under `fields/<name>`.
    fn marshal_into(
        &self,
        scope: &mut BufferScope<'_>,
        fields: &mut Node,
        count: usize,
        force_host_copy: bool,
    ) -> Result<(), MarshalError>;
}

/// A per-particle attribute of `T` values.
#[derive(Clone, Debug)]
pub struct ParticleAttrib<T: FieldElement> {
    name: String,
    data: DeviceArray<T::Scalar>,
}

impl<T: FieldElement> ParticleAttrib<T> {
    /// An empty attribute in `space`.
    pub fn new(name: impl Into<String>, space: MemorySpace) -> Self {
        Self {
            name: name.into(),
            data: DeviceArray::zeros(&[0], T::COMPONENTS, space),
        }
    }

    /// An attribute holding `values`.
    pub fn from_values(name: impl Into<String>, values: &[T], space: MemorySpace) -> Self {
        let mut flat = Vec::with_capacity(values.len() * T::COMPONENTS);
        for v in values {
            for c in 0..T::COMPONENTS {
                flat.push(v.component(c));
            }
        }
        let data = DeviceArray::from_vec(flat, &[values.len()], T::COMPONENTS, space)
            .unwrap_or_else(|_| DeviceArray::zeros(&[0], T::COMPONENTS, space));
        Self {
            name: name.into(),
            data,
        }
    }

    /// Number of values.
    pub fn count(&self) -> usize {
        self.data.element_count()
    }

    /// Append a value.
    pub fn push(&mut self, value: T) -> Result<(), CoreError> {
        let comps: SmallVec<[T::Scalar; 4]> =
            (0..T::COMPONENTS).map(|c| value.component(c)).collect();
        self.data.push_element(&comps)
    }

    /// Value of particle `i`.
    pub fn get(&self, i: usize) -> Option<T> {
        let mut comps: SmallVec<[T::Scalar; 4]> = SmallVec::with_capacity(T::COMPONENTS);
        for c in 0..T::COMPONENTS {
            comps.push(self.data.get(&[i], c)?);
        }
        Some(T::from_components(&comps))
    }

    /// Overwrite the value of particle `i`.
    pub fn set(&mut self, i: usize, value: T) -> Result<(), CoreError> {
        for c in 0..T::COMPONENTS {
            self.data.set(&[i], c, value.component(c))?;
        }
        Ok(())
    }

    /// Raw storage.
    pub fn data(&self) -> &DeviceArray<T::Scalar> {
        &self.data
    }
}

impl<T> ParticleAttrib<T>
where
    T: FieldElement,
    T::Scalar: HostScalar,
{
    /// Export to the host under `policy`.
    pub fn to_host(&self, policy: CopyPolicy) -> Result<HostBuffer, ArenaError> {
        mirror_to_host(&self.data, policy)
    }
}

impl<T> Attribute for ParticleAttrib<T>
where
    T: FieldElement,
    T::Scalar: HostScalar,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn element_kind(&self) -> ElementKind {
        T::KIND
    }

    fn len(&self) -> usize {
        self.count()
    }

    fn marshal_into(
        &self,
        scope: &mut BufferScope<'_>,
        fields: &mut Node,
        count: usize,
        force_host_copy: bool,
    ) -> Result<(), MarshalError> {
        self.check_len(count)?;
        let components = match T::KIND {
            ElementKind::Scalar => 1,
            ElementKind::Vector { components } if components <= MAX_AXES => components,
            other => {
                tracing::warn!(
                    label = %scope.label(),
                    attribute = %self.name,
                    kind = %other,
                    "unsupported particle attribute type, skipping"
                );
                return Ok(());
            }
        };
        let policy = if force_host_copy {
            CopyPolicy::ForceCopy
        } else {
            CopyPolicy::ReuseHostResident
        };
        let handle = scope.attach(self.to_host(policy)?);
        let dtype: DType = <T::Scalar as Scalar>::DTYPE;

        let node = fields.fetch_mut(&self.name);
        node.set_string("association", "vertex");
        node.set_string("topology", PARTICLE_TOPOLOGY);
        node.set_string("volume_dependent", "false");
        if T::KIND == ElementKind::Scalar {
            node.set_external("values", ExternalArray::contiguous(handle, dtype, count));
        } else {
            for (c, axis) in AXIS_NAMES.iter().enumerate().take(components) {
                node.set_external(
                    &format!("values/{axis}"),
                    ExternalArray::component(handle, dtype, count, c, components),
                );
            }
        }
        Ok(())
    }
}

/// Type-erased view of a particle collection for marshaling.
pub trait ParticleSource {
    /// Number of particles held by this process.
    fn local_count(&self) -> usize;

    /// Number of spatial axes.
    fn dims(&self) -> usize;

    /// Identifier of each particle.
    fn ids(&self) -> &DeviceArray<i64>;

    /// Position of each particle, `dims()` components per particle.
    fn positions(&self) -> &DeviceArray<f64>;

    /// Lower and upper corner of the layout's region, if it has one.
    fn region(&self) -> Option<(&[f64], &[f64])>;

    /// Total attribute count, identifiers and positions included.
    fn attribute_count(&self) -> usize;

    /// Attribute `index`: 0 is identifiers, 1 is positions.
    fn attribute(&self, index: usize) -> Option<&dyn Attribute>;
}

/// Particles in a `D`-axis space.
pub struct ParticleCollection<const D: usize> {
    ids: ParticleAttrib<i64>,
    positions: ParticleAttrib<Vector<f64, D>>,
    extras: Vec<Box<dyn Attribute>>,
    region: Option<SpatialRegion<D>>,
}

impl<const D: usize> ParticleCollection<D> {
    /// An empty collection whose arrays live in `space`.
    pub fn new(space: MemorySpace) -> Self {
        Self {
            ids: ParticleAttrib::new("ID", space),
            positions: ParticleAttrib::new("R", space),
            extras: Vec::new(),
            region: None,
        }
    }

    /// Attach the spatial region of the particle layout.
    pub fn with_region(mut self, region: SpatialRegion<D>) -> Self {
        self.region = Some(region);
        self
    }

    /// Add a particle.
    pub fn push(&mut self, id: i64, position: [f64; D]) -> Result<(), CoreError> {
        self.ids.push(id)?;
        self.positions.push(Vector::new(position))
    }

    /// Register an extra attribute holding one value per particle.
    ///
    /// Attributes are not grown by [`push`](Self::push); add them once
    /// the collection is filled.
    pub fn add_attribute(&mut self, attribute: impl Attribute + 'static) -> Result<(), MarshalError> {
        let count = self.len();
        if attribute.len() != count {
            return Err(MarshalError::AttributeLength {
                attribute: attribute.name().to_owned(),
                len: attribute.len(),
                count,
            });
        }
        self.extras.push(Box::new(attribute));
        Ok(())
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.ids.count()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier attribute.
    pub fn id_attrib(&self) -> &ParticleAttrib<i64> {
        &self.ids
    }

    /// Position attribute.
    pub fn position_attrib(&self) -> &ParticleAttrib<Vector<f64, D>> {
        &self.positions
    }
}

impl<const D: usize> ParticleSource for ParticleCollection<D> {
    fn local_count(&self) -> usize {
        self.len()
    }

    fn dims(&self) -> usize {
        D
    }

    fn ids(&self) -> &DeviceArray<i64> {
        self.ids.data()
    }

    fn positions(&self) -> &DeviceArray<f64> {
        self.positions.data()
    }

    fn region(&self) -> Option<(&[f64], &[f64])> {
        self.region
            .as_ref()
            .map(|r| (r.min.as_slice(), r.max.as_slice()))
    }

    fn attribute_count(&self) -> usize {
        2 + self.extras.len()
    }

    fn attribute(&self, index: usize) -> Option<&dyn Attribute> {
        match index {
            0 => Some(&self.ids),
            1 => Some(&self.positions),
            i => self.extras.get(i - 2).map(|a| a.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_grows_ids_and_positions() {
        let mut p: ParticleCollection<3> = ParticleCollection::new(MemorySpace::Host);
        p.push(7, [1.0, 2.0, 3.0]).unwrap();
        p.push(8, [4.0, 5.0, 6.0]).unwrap();
        assert_eq!(p.local_count(), 2);
        assert_eq!(p.ids().as_slice(), &[7, 8]);
        assert_eq!(p.positions().as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(p.position_attrib().get(1), Some(Vector::new([4.0, 5.0, 6.0])));
    }

    #[test]
    fn attributes_indexed_after_ids_and_positions() {
        let mut p: ParticleCollection<2> = ParticleCollection::new(MemorySpace::Host);
        p.add_attribute(ParticleAttrib::<f32>::new("charge", MemorySpace::Host))
            .unwrap();
        assert_eq!(p.attribute_count(), 3);
        assert_eq!(p.attribute(0).map(|a| a.name()), Some("ID"));
        assert_eq!(p.attribute(1).map(|a| a.name()), Some("R"));
        assert_eq!(p.attribute(2).map(|a| a.name()), Some("charge"));
        assert!(p.attribute(3).is_none());
    }

    #[test]
    fn region_is_optional() {
        let p: ParticleCollection<2> = ParticleCollection::new(MemorySpace::Host);
        assert!(p.region().is_none());
        let p = p.with_region(SpatialRegion::new([0.0, 0.0], [1.0, 2.0]));
        let (min, max) = p.region().unwrap();
        assert_eq!(min, &[0.0, 0.0]);
        assert_eq!(max, &[1.0, 2.0]);
    }

    #[test]
    fn attrib_from_values_and_set() {
        let mut a = ParticleAttrib::from_values("q", &[1.0f64, 2.0, 3.0], MemorySpace::Device);
        assert_eq!(a.count(), 3);
        a.set(1, 9.0).unwrap();
        assert_eq!(a.get(1), Some(9.0));
        assert!(a.set(3, 0.0).is_err());
    }

    #[test]
    fn attribute_length_must_match_particle_count() {
        let mut p: ParticleCollection<1> = ParticleCollection::new(MemorySpace::Host);
        for i in 0..10 {
            p.push(i, [i as f64]).unwrap();
        }
        let short = ParticleAttrib::from_values("charge", &[1.0f64, -1.0], MemorySpace::Host);
        assert_eq!(
            p.add_attribute(short).unwrap_err(),
            MarshalError::AttributeLength {
                attribute: "charge".into(),
                len: 2,
                count: 10,
            }
        );
        assert_eq!(p.attribute_count(), 2);
        p.add_attribute(ParticleAttrib::from_values("charge", &[0.5f64; 10], MemorySpace::Host))
            .unwrap();
        assert_eq!(p.attribute_count(), 3);
    }

    #[test]
    fn short_attribute_refuses_to_marshal() {
        let short = ParticleAttrib::from_values("mass", &[1.0f64, 2.0], MemorySpace::Host);
        let mut buffers = situ_arena::BufferRegistry::new();
        buffers.set("ions", short.to_host(CopyPolicy::ForceCopy).unwrap());
        let mut fields = Node::new();
        let mut scope = buffers.scope("ions").unwrap();
        let err = short.marshal_into(&mut scope, &mut fields, 10, false).unwrap_err();
        assert!(matches!(err, MarshalError::AttributeLength { len: 2, count: 10, .. }));
        assert!(fields.is_empty());
        assert_eq!(buffers.len(), 1);
    }

    #[test]
    fn attribute_field_is_not_volume_dependent() {
        let q = ParticleAttrib::from_values("q", &[1.0f64, 2.0], MemorySpace::Host);
        let mut buffers = situ_arena::BufferRegistry::new();
        buffers.set("ions", q.to_host(CopyPolicy::ForceCopy).unwrap());
        let mut fields = Node::new();
        let mut scope = buffers.scope("ions").unwrap();
        q.marshal_into(&mut scope, &mut fields, 2, false).unwrap();
        assert_eq!(
            fields.get("q/volume_dependent").and_then(situ_graph::Value::as_str),
            Some("false")
        );
        assert_eq!(fields.get("q/association").and_then(situ_graph::Value::as_str), Some("vertex"));
    }
}
