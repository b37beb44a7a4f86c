use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use lazy_switch_core::{Config, SwitchRuntime};

pub mod world;

pub use world::{MockObject, MockWorld, ObjectType, Scene};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scenes: HashMap<String, String>,
}

/// Absolute path of a scene fixture, by manifest name.
fn scene_file(name: &str) -> Result<PathBuf> {
    let rel = MANIFEST
        .scenes
        .get(name)
        .ok_or_else(|| anyhow!("scene '{name}' is not listed in fixtures/manifest.json"))?;
    Ok(Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(rel))
}

pub mod scenes {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.scenes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Raw JSON text of a scene.
    pub fn json(name: &str) -> Result<String> {
        let path = scene_file(name)?;
        fs::read_to_string(&path).with_context(|| format!("reading scene {}", path.display()))
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let text = json(name)?;
        serde_json::from_str(&text).with_context(|| format!("scene '{name}' does not parse"))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        scene_file(name)
    }

    /// Mock world and runtime for a scene. Switch ids follow their order in
    /// the fixture.
    pub fn runtime(name: &str, cfg: Config) -> Result<(MockWorld, SwitchRuntime)> {
        let scene: Scene = load(name).with_context(|| format!("loading scene '{name}'"))?;
        let world = MockWorld::from_objects(scene.local_player, scene.objects);
        let runtime = SwitchRuntime::with_switches(cfg, scene.switches);
        Ok((world, runtime))
    }
}
