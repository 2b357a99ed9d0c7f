//! Reference images, addressed by typed ids and loaded once at startup.

use super::error::{AutomationError, AutomationResult};
use image::GrayImage;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Group of reference images belonging to one playbook. Each one lives in
/// its own directory: `<res_dir>/<component>/res/<name>.png`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    UnlockPhone,
    InitGame,
    BasicPlay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Lock,
    Ignore,
    ClickToStart,
    CancelOk,
    Ok,
    EmptySpace,
    Start,
    Start2,
    Inventory,
    LightWorld,
    World,
    Back,
    Auto,
    Victory,
    Continue,
    Defeat,
    PlayAgain,
}

/// A reference image: which component it belongs to and what it shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Template {
    pub component: Component,
    pub id: TemplateId,
}

impl Component {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Component::UnlockPhone => "unlock_phone",
            Component::InitGame => "init_game",
            Component::BasicPlay => "basic_play",
        }
    }

    /// Every reference image the component's playbook looks for.
    pub fn templates(&self) -> &'static [TemplateId] {
        use TemplateId::*;
        match self {
            Component::UnlockPhone => &[Lock],
            Component::InitGame => &[
                Ignore,
                ClickToStart,
                CancelOk,
                Ok,
                EmptySpace,
                Start,
                Inventory,
                LightWorld,
                World,
                Back,
            ],
            Component::BasicPlay => &[
                Inventory, Start, Start2, EmptySpace, Back, World, Auto, Victory, Continue,
                Defeat, PlayAgain,
            ],
        }
    }

    pub const fn template(self, id: TemplateId) -> Template {
        Template {
            component: self,
            id,
        }
    }
}

impl TemplateId {
    /// File stem of the reference image.
    pub fn file_stem(&self) -> &'static str {
        match self {
            TemplateId::Lock => "lock",
            TemplateId::Ignore => "ignore",
            TemplateId::ClickToStart => "click_to_start",
            TemplateId::CancelOk => "cancel_ok",
            TemplateId::Ok => "ok",
            TemplateId::EmptySpace => "empty_space",
            TemplateId::Start => "start",
            TemplateId::Start2 => "start_2",
            TemplateId::Inventory => "inventory",
            TemplateId::LightWorld => "light_world",
            TemplateId::World => "world",
            TemplateId::Back => "back",
            TemplateId::Auto => "auto",
            TemplateId::Victory => "victory",
            TemplateId::Continue => "continue",
            TemplateId::Defeat => "defeat",
            TemplateId::PlayAgain => "play_again",
        }
    }
}

impl Template {
    pub fn path(&self, res_dir: &Path) -> PathBuf {
        res_dir
            .join(self.component.dir_name())
            .join("res")
            .join(format!("{}.png", self.id.file_stem()))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component.dir_name(), self.id.file_stem())
    }
}

/// Grayscale reference images keyed by template. Read-only once built, so a
/// single registry is shared between all device workers.
#[derive(Default)]
pub struct TemplateRegistry {
    images: HashMap<Template, GrayImage>,
}

impl TemplateRegistry {
    /// Load every template of `components` from `res_dir`. The first file
    /// that is missing or unreadable aborts the load.
    pub fn load(res_dir: &Path, components: &[Component]) -> AutomationResult<Self> {
        let mut images = HashMap::new();
        for component in components {
            for id in component.templates() {
                let template = component.template(*id);
                let path = template.path(res_dir);
                let image = image::open(&path)
                    .map_err(|source| AutomationError::TemplateLoad {
                        path: path.clone(),
                        source,
                    })?
                    .to_luma8();
                log::debug!(
                    "🖼️ Loaded {} ({}x{})",
                    path.display(),
                    image.width(),
                    image.height()
                );
                images.insert(template, image);
            }
        }
        log::info!(
            "✅ Loaded {} templates from {}",
            images.len(),
            res_dir.display()
        );
        Ok(Self { images })
    }

    /// Registry built from images already in memory.
    pub fn from_images(images: impl IntoIterator<Item = (Template, GrayImage)>) -> Self {
        Self {
            images: images.into_iter().collect(),
        }
    }

    pub fn get(&self, template: Template) -> AutomationResult<&GrayImage> {
        self.images
            .get(&template)
            .ok_or_else(|| AutomationError::Config(format!("template {template} is not loaded")))
    }

    pub fn contains(&self, template: Template) -> bool {
        self.images.contains_key(&template)
    }

    /// True when every template of `component` is present.
    pub fn has_component(&self, component: Component) -> bool {
        component
            .templates()
            .iter()
            .all(|id| self.contains(component.template(*id)))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
