//! The configuration graph handed to [`Backend::initialize`].
//!
//! Layout:
//!
//! ```text
//! insitu/scripts/pipeline/filename     resolved pipeline script
//! insitu/scripts/pipeline/args         --channel_names <ch>... --verbosity <n>
//!                                      --vtk_extract ON|OFF --steer ON|OFF
//!                                      --steer_channel_names <label>...
//! insitu/scripts/<label>/filename      per-entry extractor (PNG extracts on)
//! insitu/scripts/<label>/args          --channel_name <ch> --label <label>
//!                                      [--experiment_name <name>] --verbosity <n>
//! insitu/proxies/proxy_<label>/filename  steering proxy per steerable scalar
//! ```
//!
//! [`Backend::initialize`]: crate::Backend::initialize

use std::convert::Infallible;

use indexmap::IndexMap;

use situ_core::{ElementKind, Label, MAX_AXES};
use situ_graph::Node;
use situ_marshal::channel::ROOT;
use situ_marshal::{ChannelKind, EntryRegistry, EntryVisitor, FieldSource, ParticleSource, ScalarSlot};

use crate::config::AdaptorConfig;
use crate::proxy::write_proxy;

/// Path of the pipeline script node.
pub fn pipeline_path() -> String {
    format!("{ROOT}/scripts/pipeline")
}

/// Result of building the configuration graph.
#[derive(Debug, Default)]
pub struct ConfigGraph {
    /// The graph itself.
    pub graph: Node,
    /// Host-copy policy per visualization label; all start unforced.
    pub host_copy: IndexMap<Label, bool>,
    /// Visualization channels announced to the pipeline.
    pub channels: Vec<String>,
    /// Steerable labels whose proxy was registered.
    pub steered: Vec<Label>,
}

/// Build the configuration graph for the entries in `vis` and `steer`.
pub fn build_config_graph(
    config: &AdaptorConfig,
    vis: &mut EntryRegistry<'_>,
    steer: &mut EntryRegistry<'_>,
) -> ConfigGraph {
    let mut out = ConfigGraph::default();

    // With visualization off no channel is ever published.
    if config.vis {
        let mut init = InitVisitor {
            config,
            out: &mut out,
        };
        vis.for_each(&mut init).unwrap_or_else(|never| match never {});
    }

    if config.steer {
        let mut init = SteerInitVisitor {
            config,
            out: &mut out,
        };
        steer.for_each(&mut init).unwrap_or_else(|never| match never {});
    }

    let pipeline = pipeline_path();
    let script = config.pipeline_script();
    out.graph
        .set_string(&format!("{pipeline}/filename"), &script.to_string_lossy());
    let verbosity = config.verbosity.to_string();
    let mut args: Vec<String> = Vec::new();
    args.push("--channel_names".into());
    args.extend(out.channels.iter().cloned());
    args.extend(
        [
            "--verbosity",
            verbosity.as_str(),
            "--vtk_extract",
            config.vtk_extract_arg(),
            "--steer",
            config.steer_arg(),
            "--steer_channel_names",
        ]
        .map(String::from),
    );
    args.extend(out.steered.iter().map(|l| l.to_string()));
    out.graph.set(&format!("{pipeline}/args"), args);

    tracing::info!(
        pipeline = %script.display(),
        channels = out.channels.len(),
        steered = out.steered.len(),
        "configuration graph built"
    );
    out
}

struct InitVisitor<'c> {
    config: &'c AdaptorConfig,
    out: &'c mut ConfigGraph,
}

impl InitVisitor<'_> {
    fn announce(&mut self, label: &Label, kind: ChannelKind) {
        let channel = kind.channel_name(label.as_str());
        self.out.host_copy.insert(label.clone(), false);
        if self.config.png_extract {
            let node = self
                .out
                .graph
                .fetch_mut(&format!("{ROOT}/scripts/{label}"));
            let script = self.config.extractor_script(label.as_str(), kind);
            node.set_string("filename", &script.to_string_lossy());
            let mut args = vec![
                "--channel_name".to_owned(),
                channel.clone(),
                "--label".to_owned(),
                label.to_string(),
            ];
            if let Some(name) = &self.config.experiment_name {
                args.push("--experiment_name".to_owned());
                args.push(name.clone());
            }
            args.push("--verbosity".to_owned());
            args.push(self.config.verbosity.to_string());
            node.set("args", args);
        }
        self.out.channels.push(channel);
    }
}

impl EntryVisitor for InitVisitor<'_> {
    type Error = Infallible;

    fn visit_particles(&mut self, label: &Label, _p: &dyn ParticleSource) -> Result<(), Infallible> {
        self.announce(label, ChannelKind::Particles);
        Ok(())
    }

    fn visit_field(&mut self, label: &Label, field: &dyn FieldSource) -> Result<(), Infallible> {
        match field.element_kind() {
            ElementKind::Scalar => self.announce(label, ChannelKind::ScalarField),
            ElementKind::Vector { components } if (2..=MAX_AXES).contains(&components) => {
                self.announce(label, ChannelKind::VectorField)
            }
            other => {
                tracing::warn!(label = %label, kind = %other, "field will not be published");
            }
        }
        Ok(())
    }
}

struct SteerInitVisitor<'c> {
    config: &'c AdaptorConfig,
    out: &'c mut ConfigGraph,
}

impl EntryVisitor for SteerInitVisitor<'_> {
    type Error = Infallible;

    fn visit_scalar(&mut self, label: &Label, slot: &mut ScalarSlot<'_>) -> Result<(), Infallible> {
        let template = self.config.proxy_template();
        let rendered = self.config.rendered_proxy_path(label.as_str());
        match write_proxy(&template, &rendered, label.as_str()) {
            Ok(_) => {
                let proxy = self.config.proxy_path(label.as_str());
                self.out.graph.set_string(
                    &format!("{ROOT}/proxies/proxy_{label}/filename"),
                    &proxy.to_string_lossy(),
                );
                self.out.steered.push(label.clone());
                tracing::info!(label = %label, dtype = %slot.dtype(), "steerable scalar registered");
            }
            Err(e) => {
                tracing::warn!(label = %label, error = %e, "steering proxy not created, scalar not steerable");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use situ_core::{FieldLayout, MemorySpace, UniformMesh, Vector};
    use situ_graph::Value;
    use situ_marshal::{Field, ParticleCollection};
    use std::sync::Arc;

    fn args(node: &Node, path: &str) -> Vec<String> {
        node.get(path)
            .and_then(Value::as_str_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    #[test]
    fn pipeline_args_list_channels_in_order() {
        let rho: Field<f64, 3> = Field::new(
            Arc::new(UniformMesh::unit()),
            Arc::new(FieldLayout::from_extents([2, 2, 2])),
            0,
            MemorySpace::Host,
        );
        let e: Field<Vector<f64, 3>, 3> = Field::new(
            Arc::new(UniformMesh::unit()),
            Arc::new(FieldLayout::from_extents([2, 2, 2])),
            0,
            MemorySpace::Host,
        );
        let ions: ParticleCollection<3> = ParticleCollection::new(MemorySpace::Host);
        let mut vis = EntryRegistry::new();
        vis.add_field("rho", &rho);
        vis.add_field("E", &e);
        vis.add_particles("ions", &ions);
        let mut steer = EntryRegistry::new();

        let cfg = AdaptorConfig {
            verbosity: 2,
            ..AdaptorConfig::default()
        };
        let out = build_config_graph(&cfg, &mut vis, &mut steer);
        assert_eq!(
            args(&out.graph, "insitu/scripts/pipeline/args"),
            vec![
                "--channel_names",
                "sfield_rho",
                "vfield_E",
                "particles_ions",
                "--verbosity",
                "2",
                "--vtk_extract",
                "OFF",
                "--steer",
                "OFF",
                "--steer_channel_names",
            ]
        );
        assert_eq!(out.host_copy.len(), 3);
        assert!(out.host_copy.values().all(|&forced| !forced));
        assert!(!out.graph.has_path("insitu/scripts/rho"));
    }

    #[test]
    fn vis_off_announces_no_channels() {
        let rho: Field<f64, 2> = Field::new(
            Arc::new(UniformMesh::unit()),
            Arc::new(FieldLayout::from_extents([2, 2])),
            0,
            MemorySpace::Host,
        );
        let mut vis = EntryRegistry::new();
        vis.add_field("rho", &rho);
        let mut steer = EntryRegistry::new();

        let cfg = AdaptorConfig {
            vis: false,
            png_extract: true,
            ..AdaptorConfig::default()
        };
        let out = build_config_graph(&cfg, &mut vis, &mut steer);
        assert!(out.channels.is_empty());
        assert!(out.host_copy.is_empty());
        assert!(!out.graph.has_path("insitu/scripts/rho"));
        let args = args(&out.graph, "insitu/scripts/pipeline/args");
        assert_eq!(args[0], "--channel_names");
        assert_eq!(args[1], "--verbosity");
    }

    #[test]
    fn png_extract_adds_extractor_scripts() {
        let ions: ParticleCollection<2> = ParticleCollection::new(MemorySpace::Host);
        let mut vis = EntryRegistry::new();
        vis.add_particles("ions", &ions);
        let mut steer = EntryRegistry::new();
        let cfg = AdaptorConfig {
            png_extract: true,
            experiment_name: Some("run7".into()),
            ..AdaptorConfig::default()
        };
        let out = build_config_graph(&cfg, &mut vis, &mut steer);
        assert_eq!(
            out.graph
                .get("insitu/scripts/ions/filename")
                .and_then(Value::as_str),
            Some("situ_scripts/extractors/png_ext_particle.py")
        );
        assert_eq!(
            args(&out.graph, "insitu/scripts/ions/args"),
            vec![
                "--channel_name",
                "particles_ions",
                "--label",
                "ions",
                "--experiment_name",
                "run7",
                "--verbosity",
                "0",
            ]
        );
    }

    #[test]
    fn steer_proxies_rendered_from_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(AdaptorConfig::PROXY_TEMPLATE),
            "<Proxy name=\"EXAMPLE\"/>",
        )
        .unwrap();
        let mut alpha = 1.0f64;
        let mut vis = EntryRegistry::new();
        let mut steer = EntryRegistry::new();
        steer.add_scalar("alpha", &mut alpha);
        let cfg = AdaptorConfig {
            steer: true,
            script_dir: dir.path().to_path_buf(),
            ..AdaptorConfig::default()
        };
        let out = build_config_graph(&cfg, &mut vis, &mut steer);

        let rendered = cfg.rendered_proxy_path("alpha");
        let expected = rendered.to_string_lossy().into_owned();
        assert_eq!(
            std::fs::read_to_string(&rendered).unwrap(),
            "<Proxy name=\"alpha\"/>"
        );
        assert_eq!(
            out.graph
                .get("insitu/proxies/proxy_alpha/filename")
                .and_then(Value::as_str),
            Some(expected.as_str())
        );
        let pipeline = args(&out.graph, "insitu/scripts/pipeline/args");
        assert_eq!(pipeline.last().map(String::as_str), Some("alpha"));
        assert!(pipeline.contains(&"ON".to_string()));
    }

    #[test]
    fn missing_template_skips_steerable() {
        let dir = tempfile::tempdir().unwrap();
        let mut alpha = 1.0f64;
        let mut vis = EntryRegistry::new();
        let mut steer = EntryRegistry::new();
        steer.add_scalar("alpha", &mut alpha);
        let cfg = AdaptorConfig {
            steer: true,
            script_dir: dir.path().to_path_buf(),
            ..AdaptorConfig::default()
        };
        let out = build_config_graph(&cfg, &mut vis, &mut steer);
        assert!(out.steered.is_empty());
        assert!(!out.graph.has_path("insitu/proxies"));
        assert_eq!(
            args(&out.graph, "insitu/scripts/pipeline/args").last().map(String::as_str),
            Some("--steer_channel_names")
        );
    }
}
