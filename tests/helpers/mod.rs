//! Test helpers: recording collaborators and a world builder for scripted scenarios.

#![allow(dead_code)]

use jurassic_valley::effects::{AudioSink, VfxSink, VfxTemplate};
use jurassic_valley::event_bus::{EventBus, GameEvent};
use jurassic_valley::{Effects, SimConfig, VfxRegistry};
use std::sync::{Arc, Mutex};

/// Records every requested sound id
#[derive(Default)]
pub struct RecordingAudio {
    pub played: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for RecordingAudio {
    fn play_sfx(&self, id: &str) {
        self.played.lock().unwrap().push(id.to_string());
    }
}

/// Records every foreground effect as (x, y, template type)
#[derive(Default)]
pub struct RecordingVfx {
    pub played: Mutex<Vec<(f32, f32, String)>>,
}

impl RecordingVfx {
    pub fn played(&self) -> Vec<(f32, f32, String)> {
        self.played.lock().unwrap().clone()
    }
}

impl VfxSink for RecordingVfx {
    fn play_foreground(&self, x: f32, y: f32, template: &VfxTemplate) {
        self.played
            .lock()
            .unwrap()
            .push((x, y, template.kind.clone()));
    }
}

/// Effects wired to fresh recorders, with the built-in templates registered
pub fn recording_effects() -> (Effects, Arc<RecordingAudio>, Arc<RecordingVfx>) {
    let audio = Arc::new(RecordingAudio::default());
    let vfx = Arc::new(RecordingVfx::default());
    let effects = Effects::new(VfxRegistry::with_templates(
        SimConfig::default().vfx_templates,
    ))
    .with_audio(audio.clone())
    .with_vfx(vfx.clone());
    (effects, audio, vfx)
}

/// Subscribes to the given event names and collects everything emitted
pub fn watch(bus: &EventBus, names: &[&str]) -> Arc<Mutex<Vec<GameEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in names {
        let log = log.clone();
        bus.on(name, move |event| log.lock().unwrap().push(event.clone()));
    }
    log
}
