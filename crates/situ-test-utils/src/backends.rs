//! Mock backends.

use serde_json::Value as Json;

use situ_graph::{GraphView, Node, Value};
use situ_marshal::channel::{channels_root, STEER_FORWARD_FIELD};
use situ_marshal::{steering, ChannelKind};
use situ_engine::{Backend, BackendCall, BackendStatus};

/// Backend that accepts everything and counts calls.
#[derive(Debug, Default)]
pub struct NullBackend {
    pub initialized: usize,
    pub executed: usize,
    pub fetched: usize,
    pub finalized: usize,
}

impl Backend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn initialize(&mut self, _config: &Node) -> BackendStatus {
        self.initialized += 1;
        BackendStatus::Ok
    }

    fn execute(&mut self, _view: GraphView<'_>) -> BackendStatus {
        self.executed += 1;
        BackendStatus::Ok
    }

    fn fetch_results(&mut self, _results: &mut Node) -> BackendStatus {
        self.fetched += 1;
        BackendStatus::Ok
    }

    fn finalize(&mut self) -> BackendStatus {
        self.finalized += 1;
        BackendStatus::Ok
    }
}

/// A forward steering value captured during `execute`.
#[derive(Clone, Debug, PartialEq)]
pub struct SteeredValue {
    pub label: String,
    pub value: Value,
}

/// Forward steering values found in `graph`, in channel order.
fn forward_values(graph: &Node) -> Vec<SteeredValue> {
    let prefix = ChannelKind::SteerForward.prefix();
    let Some(channels) = graph.fetch(&channels_root()) else {
        return Vec::new();
    };
    channels
        .children()
        .filter_map(|(name, ch)| {
            let label = name.strip_prefix(prefix)?;
            let value = ch.get(&format!("data/fields/{STEER_FORWARD_FIELD}{label}/values"))?;
            Some(SteeredValue {
                label: label.to_owned(),
                value: value.clone(),
            })
        })
        .collect()
}

/// Backend that returns every forward steering value as its backward
/// value, optionally transformed.
pub struct EchoBackend {
    transform: Option<Box<dyn Fn(&str, &Value) -> Value>>,
    pending: Vec<SteeredValue>,
    pub executed: usize,
}

impl EchoBackend {
    /// Echo values unchanged.
    pub fn new() -> Self {
        Self {
            transform: None,
            pending: Vec::new(),
            executed: 0,
        }
    }

    /// Echo `transform(label, value)` instead of the value itself.
    pub fn with_transform(transform: impl Fn(&str, &Value) -> Value + 'static) -> Self {
        Self {
            transform: Some(Box::new(transform)),
            pending: Vec::new(),
            executed: 0,
        }
    }
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn initialize(&mut self, _config: &Node) -> BackendStatus {
        BackendStatus::Ok
    }

    fn execute(&mut self, view: GraphView<'_>) -> BackendStatus {
        self.executed += 1;
        self.pending = forward_values(view.graph());
        BackendStatus::Ok
    }

    fn fetch_results(&mut self, results: &mut Node) -> BackendStatus {
        for s in self.pending.drain(..) {
            let value = match &self.transform {
                Some(t) => t(&s.label, &s.value),
                None => s.value,
            };
            steering::write_backward(results, &s.label, value);
        }
        BackendStatus::Ok
    }

    fn finalize(&mut self) -> BackendStatus {
        BackendStatus::Ok
    }
}

/// Backend that keeps a resolved JSON dump of everything it receives.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// Configuration graph from `initialize`.
    pub config: Option<Json>,
    /// Resolved exchange graph of every `execute`.
    pub cycles: Vec<Json>,
    /// Channel names of every `execute`.
    pub channels: Vec<Vec<String>>,
    /// Values written into results on every `fetch_results`.
    pub respond: Vec<(String, Value)>,
    pub finalized: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer steering for `label` with `value` on every fetch.
    pub fn responding(mut self, label: &str, value: impl Into<Value>) -> Self {
        self.respond.push((label.to_owned(), value.into()));
        self
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn initialize(&mut self, config: &Node) -> BackendStatus {
        self.config = Some(config.to_json());
        BackendStatus::Ok
    }

    fn execute(&mut self, view: GraphView<'_>) -> BackendStatus {
        let names = view
            .graph()
            .fetch(&channels_root())
            .map(|c| c.children().map(|(n, _)| n.to_owned()).collect())
            .unwrap_or_default();
        self.channels.push(names);
        match view.to_json() {
            Ok(json) => {
                self.cycles.push(json);
                BackendStatus::Ok
            }
            Err(_) => BackendStatus::Failed { code: -2 },
        }
    }

    fn fetch_results(&mut self, results: &mut Node) -> BackendStatus {
        for (label, value) in &self.respond {
            steering::write_backward(results, label, value.clone());
        }
        BackendStatus::Ok
    }

    fn finalize(&mut self) -> BackendStatus {
        self.finalized = true;
        BackendStatus::Ok
    }
}

/// Backend that fails one kind of call and succeeds on the rest.
#[derive(Debug)]
pub struct FailingBackend {
    fail: BackendCall,
    code: i32,
    pub calls: Vec<BackendCall>,
}

impl FailingBackend {
    /// Fail every `call` with code `-1`.
    pub fn on(call: BackendCall) -> Self {
        Self {
            fail: call,
            code: -1,
            calls: Vec::new(),
        }
    }

    fn answer(&mut self, call: BackendCall) -> BackendStatus {
        self.calls.push(call);
        if call == self.fail {
            BackendStatus::Failed { code: self.code }
        } else {
            BackendStatus::Ok
        }
    }
}

impl Backend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn initialize(&mut self, _config: &Node) -> BackendStatus {
        self.answer(BackendCall::Initialize)
    }

    fn execute(&mut self, _view: GraphView<'_>) -> BackendStatus {
        self.answer(BackendCall::Execute)
    }

    fn fetch_results(&mut self, _results: &mut Node) -> BackendStatus {
        self.answer(BackendCall::FetchResults)
    }

    fn finalize(&mut self) -> BackendStatus {
        self.answer(BackendCall::Finalize)
    }
}
