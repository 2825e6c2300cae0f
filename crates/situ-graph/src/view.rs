//! Read-only view of a graph together with the buffers it references.

use situ_arena::{BufferRegistry, HostData};

use crate::error::GraphError;
use crate::node::Node;
use crate::value::{ExternalArray, Value};

/// A graph paired with the registry its external arrays point into.
///
/// This is what the analysis backend receives. Construction requires a
/// fenced registry, so every staged transfer has completed before any
/// external array can be read.
#[derive(Clone, Copy, Debug)]
pub struct GraphView<'a> {
    graph: &'a Node,
    buffers: &'a BufferRegistry,
}

impl<'a> GraphView<'a> {
    /// Pair `graph` with `buffers`.
    ///
    /// Fails with [`ArenaError::NotFenced`](situ_arena::ArenaError::NotFenced)
    /// if transfers were staged since the last fence.
    pub fn new(graph: &'a Node, buffers: &'a BufferRegistry) -> Result<Self, GraphError> {
        buffers.ensure_fenced()?;
        Ok(Self { graph, buffers })
    }

    /// The graph.
    pub fn graph(&self) -> &'a Node {
        self.graph
    }

    /// The registry.
    pub fn buffers(&self) -> &'a BufferRegistry {
        self.buffers
    }

    /// Gather the elements an external reference points at.
    pub fn resolve(&self, external: &ExternalArray) -> Result<HostData, GraphError> {
        let buffer = self.buffers.resolve(external.handle())?;
        if buffer.dtype() != external.dtype() {
            return Err(GraphError::DtypeMismatch {
                expected: external.dtype(),
                actual: buffer.dtype(),
            });
        }
        let size = external.dtype().size();
        if external.stride_bytes() % size != 0 || external.offset_bytes() % size != 0 {
            return Err(GraphError::Misaligned {
                stride_bytes: external.stride_bytes(),
                dtype: external.dtype(),
            });
        }
        let base = external.base() + external.offset_bytes() / size;
        let step = external.stride_bytes() / size;
        buffer
            .data()
            .gather(base, step, external.count())
            .ok_or(GraphError::OutOfBounds {
                count: external.count(),
                len: buffer.len(),
            })
    }

    /// The value at `path`, with external references resolved.
    pub fn values(&self, path: &str) -> Result<Value, GraphError> {
        match self.graph.get(path) {
            Some(Value::External(ext)) => self.resolve(ext).map(Value::Array),
            Some(v) => Ok(v.clone()),
            None => Err(GraphError::MissingPath {
                path: path.to_owned(),
            }),
        }
    }

    /// Every external reference in the graph as `(path, reference)`.
    pub fn externals(&self) -> Vec<(String, ExternalArray)> {
        self.graph
            .leaves()
            .into_iter()
            .filter_map(|(path, v)| match v {
                Value::External(e) => Some((path, *e)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use situ_arena::{ArenaError, HostBuffer, Layout};
    use situ_core::DType;

    fn interleaved_registry() -> (BufferRegistry, situ_arena::BufferHandle) {
        let mut reg = BufferRegistry::new();
        let buf = HostBuffer::from_vec(
            vec![1.0f64, 10.0, 100.0, 2.0, 20.0, 200.0],
            &[2],
            3,
            Layout::ColumnMajor,
        )
        .unwrap();
        let h = reg.set("v", buf);
        (reg, h)
    }

    #[test]
    fn unfenced_registry_rejected() {
        let (reg, _) = interleaved_registry();
        let graph = Node::new();
        assert_eq!(
            GraphView::new(&graph, &reg).unwrap_err(),
            GraphError::Arena(ArenaError::NotFenced)
        );
    }

    #[test]
    fn resolves_strided_components() {
        let (mut reg, h) = interleaved_registry();
        let mut graph = Node::new();
        graph.set_external("values/x", ExternalArray::component(h, DType::F64, 2, 0, 3));
        graph.set_external("values/z", ExternalArray::component(h, DType::F64, 2, 2, 3));
        reg.fence();
        let view = GraphView::new(&graph, &reg).unwrap();
        let x = view.values("values/x").unwrap();
        let z = view.values("values/z").unwrap();
        assert_eq!(x, Value::Array(HostData::F64(vec![1.0, 2.0].into())));
        assert_eq!(z, Value::Array(HostData::F64(vec![100.0, 200.0].into())));
        assert_eq!(view.externals().len(), 2);
    }

    #[test]
    fn dtype_mismatch_detected() {
        let (mut reg, h) = interleaved_registry();
        reg.fence();
        let graph = Node::new();
        let view = GraphView::new(&graph, &reg).unwrap();
        let err = view
            .resolve(&ExternalArray::contiguous(h, DType::F32, 2))
            .unwrap_err();
        assert!(matches!(err, GraphError::DtypeMismatch { .. }));
    }

    #[test]
    fn overlong_reference_out_of_bounds() {
        let (mut reg, h) = interleaved_registry();
        reg.fence();
        let graph = Node::new();
        let view = GraphView::new(&graph, &reg).unwrap();
        let err = view
            .resolve(&ExternalArray::component(h, DType::F64, 3, 0, 3))
            .unwrap_err();
        assert_eq!(err, GraphError::OutOfBounds { count: 3, len: 6 });
    }

    #[test]
    fn missing_path_reported() {
        let reg = BufferRegistry::new();
        let graph = Node::new();
        let view = GraphView::new(&graph, &reg).unwrap();
        assert!(matches!(
            view.values("nope"),
            Err(GraphError::MissingPath { .. })
        ));
    }
}
