//! 音频与特效协作方
//!
//! 模拟核心只发出"请求"：音效 id 与特效模板名。宿主可以不提供任何后端，
//! 此时所有请求被静默跳过。

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 资源复活时播放的粒子模板名
pub const RESOURCE_RESPAWN_FX: &str = "RESOURCE_RESPAWN_FX";

/// 音效播放后端
pub trait AudioSink: Send + Sync {
    fn play_sfx(&self, id: &str);
}

/// 前景特效播放后端
pub trait VfxSink: Send + Sync {
    fn play_foreground(&self, x: f32, y: f32, template: &VfxTemplate);
}

/// 粒子特效模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VfxTemplate {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
    pub speed: f32,
    pub gravity: f32,
    pub bias: Option<String>,
    /// 粒子寿命(毫秒)
    pub lifetime: f32,
    pub size: f32,
    pub drag: f32,
    pub colors: Vec<String>,
    pub blend_mode: Option<String>,
}

impl Default for VfxTemplate {
    fn default() -> Self {
        Self {
            kind: "spark".to_string(),
            count: 10,
            speed: 4.0,
            gravity: 0.0,
            bias: None,
            lifetime: 500.0,
            size: 3.0,
            drag: 0.95,
            colors: vec!["#FFFFFF".to_string()],
            blend_mode: None,
        }
    }
}

/// 内置特效模板
pub fn default_vfx_templates() -> BTreeMap<String, VfxTemplate> {
    let mut templates = BTreeMap::new();
    templates.insert(
        RESOURCE_RESPAWN_FX.to_string(),
        VfxTemplate {
            kind: "debris".to_string(),
            count: 25,
            speed: 6.0,
            gravity: -0.15,
            bias: Some("up".to_string()),
            lifetime: 1200.0,
            size: 5.0,
            drag: 0.92,
            colors: vec!["#FFFFFF".to_string(), "#00FFFF".to_string()],
            blend_mode: Some("lighter".to_string()),
        },
    );
    templates
}

/// 运行时填充的特效模板表
#[derive(Debug, Clone, Default)]
pub struct VfxRegistry {
    templates: BTreeMap<String, VfxTemplate>,
}

impl VfxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = (String, VfxTemplate)>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }

    /// 注册或替换模板
    pub fn register(&mut self, name: impl Into<String>, template: VfxTemplate) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&VfxTemplate> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// 世界系统持有的协作方集合，所有请求均为尽力而为
#[derive(Clone, Default)]
pub struct Effects {
    audio: Option<Arc<dyn AudioSink>>,
    vfx: Option<Arc<dyn VfxSink>>,
    registry: VfxRegistry,
}

impl Effects {
    /// 不带任何后端
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn new(registry: VfxRegistry) -> Self {
        Self {
            audio: None,
            vfx: None,
            registry,
        }
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_vfx(mut self, vfx: Arc<dyn VfxSink>) -> Self {
        self.vfx = Some(vfx);
        self
    }

    pub fn registry(&self) -> &VfxRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VfxRegistry {
        &mut self.registry
    }

    pub fn play_sfx(&self, id: &str) {
        if let Some(audio) = &self.audio {
            audio.play_sfx(id);
        }
    }

    /// 按模板名播放前景特效；没有后端或模板未注册时跳过
    pub fn play_vfx(&self, name: &str, x: f32, y: f32) {
        let Some(vfx) = &self.vfx else {
            return;
        };
        match self.registry.get(name) {
            Some(template) => vfx.play_foreground(x, y, template),
            None => warn!("vfx template {} not registered, skipping", name),
        }
    }
}

impl fmt::Debug for Effects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effects")
            .field("audio", &self.audio.is_some())
            .field("vfx", &self.vfx.is_some())
            .field("templates", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        played: Mutex<Vec<(f32, f32, String)>>,
    }

    impl VfxSink for Recorder {
        fn play_foreground(&self, x: f32, y: f32, template: &VfxTemplate) {
            self.played.lock().unwrap().push((x, y, template.kind.clone()));
        }
    }

    #[test]
    fn respawn_template_matches_builtin_values() {
        let templates = default_vfx_templates();
        let fx = &templates[RESOURCE_RESPAWN_FX];
        assert_eq!(fx.count, 25);
        assert_eq!(fx.lifetime, 1200.0);
        assert_eq!(fx.blend_mode.as_deref(), Some("lighter"));
    }

    #[test]
    fn template_json_uses_type_key() {
        let fx: VfxTemplate =
            serde_json::from_str(r#"{ "type": "dust", "count": 4, "blendMode": "screen" }"#)
                .unwrap();
        assert_eq!(fx.kind, "dust");
        assert_eq!(fx.count, 4);
        assert_eq!(fx.blend_mode.as_deref(), Some("screen"));
        assert_eq!(fx.drag, 0.95);
    }

    #[test]
    fn missing_template_or_sink_is_skipped() {
        let recorder = Arc::new(Recorder::default());
        let effects = Effects::new(VfxRegistry::new()).with_vfx(recorder.clone());
        effects.play_vfx(RESOURCE_RESPAWN_FX, 1.0, 2.0);
        assert!(recorder.played.lock().unwrap().is_empty());

        Effects::silent().play_vfx(RESOURCE_RESPAWN_FX, 0.0, 0.0);
        Effects::silent().play_sfx("sfx_respawn_metal");
    }

    #[test]
    fn registered_template_reaches_the_sink() {
        let recorder = Arc::new(Recorder::default());
        let effects = Effects::new(VfxRegistry::with_templates(default_vfx_templates()))
            .with_vfx(recorder.clone());
        effects.play_vfx(RESOURCE_RESPAWN_FX, 3.0, 4.0);
        assert_eq!(
            *recorder.played.lock().unwrap(),
            vec![(3.0, 4.0, "debris".to_string())]
        );
    }
}
