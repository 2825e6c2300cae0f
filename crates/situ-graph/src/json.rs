//! JSON rendering of the exchange graph.
//!
//! [`Node::to_json`] renders external references as descriptors
//! (`{"external": {...}}`); [`GraphView::to_json`] resolves them into
//! plain arrays. Both are diagnostics: the backend never sees JSON.

use serde_json::{json, Map, Value as Json};

use situ_arena::HostData;

use crate::error::GraphError;
use crate::node::Node;
use crate::value::{ExternalArray, Value};
use crate::view::GraphView;

fn array_json(data: &HostData) -> Json {
    match data {
        HostData::F64(v) => Json::from(v.as_slice()),
        HostData::F32(v) => Json::from(v.as_slice()),
        HostData::I64(v) => Json::from(v.as_slice()),
        HostData::I32(v) => Json::from(v.as_slice()),
        HostData::U64(v) => Json::from(v.as_slice()),
        HostData::U32(v) => Json::from(v.as_slice()),
        HostData::U8(v) => Json::from(v.as_slice()),
    }
}

fn external_descriptor(e: &ExternalArray) -> Json {
    json!({
        "external": {
            "epoch": e.handle().epoch(),
            "slot": e.handle().slot(),
            "dtype": e.dtype().name(),
            "count": e.count(),
            "base": e.base(),
            "offset_bytes": e.offset_bytes(),
            "stride_bytes": e.stride_bytes(),
        }
    })
}

fn render<F>(node: &Node, external: &mut F) -> Result<Json, GraphError>
where
    F: FnMut(&ExternalArray) -> Result<Json, GraphError>,
{
    if let Some(v) = node.value() {
        return Ok(match v {
            Value::Str(s) => Json::from(s.as_str()),
            Value::StrList(l) => Json::from(l.clone()),
            Value::F64(x) => Json::from(*x),
            Value::F32(x) => Json::from(*x),
            Value::I64(x) => Json::from(*x),
            Value::I32(x) => Json::from(*x),
            Value::U64(x) => Json::from(*x),
            Value::U32(x) => Json::from(*x),
            Value::Array(a) => array_json(a),
            Value::External(e) => external(e)?,
        });
    }
    let mut map = Map::new();
    for (name, child) in node.children() {
        map.insert(name.to_owned(), render(child, external)?);
    }
    Ok(Json::Object(map))
}

impl Node {
    /// Render the tree as JSON with external references left unresolved.
    pub fn to_json(&self) -> Json {
        let mut describe =
            |e: &ExternalArray| -> Result<Json, GraphError> { Ok(external_descriptor(e)) };
        render(self, &mut describe).unwrap_or(Json::Null)
    }
}

impl GraphView<'_> {
    /// Render the tree as JSON with every external reference resolved.
    pub fn to_json(&self) -> Result<Json, GraphError> {
        let mut resolve = |e: &ExternalArray| -> Result<Json, GraphError> {
            self.resolve(e).map(|d| array_json(&d))
        };
        render(self.graph(), &mut resolve)
    }
}
