//! Renderer strategies.
//!
//! A renderer draws one scene object with one shader. The set of strategies is
//! closed; each variant states which shader inputs and object capabilities it
//! needs, resolves every handle once when it is assigned, and afterwards only
//! replays the cached state each frame.

mod ads;
mod position;
mod position_normal;

use std::fmt;
use std::sync::Arc;

use log::warn;

pub use ads::AdsRenderer;
pub use position::PositionRenderer;
pub use position_normal::PositionNormalRenderer;

use crate::render::RenderDevice;
use crate::scene::{SceneObject, Shader};

/// Most point lights a lighting renderer uploads.
pub const MAX_LIGHTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Position,
    PositionNormal,
    AdsLighting,
}

impl RendererKind {
    /// Most capable first.
    pub const ALL: [Self; 3] = [Self::AdsLighting, Self::PositionNormal, Self::Position];

    pub fn test_shader(self, shader: &Shader) -> bool {
        match self {
            Self::Position => PositionRenderer::test_shader(shader),
            Self::PositionNormal => PositionNormalRenderer::test_shader(shader),
            Self::AdsLighting => AdsRenderer::test_shader(shader),
        }
    }

    pub fn test_object(self, object: &dyn SceneObject) -> bool {
        match self {
            Self::Position => PositionRenderer::test_object(object),
            Self::PositionNormal => PositionNormalRenderer::test_object(object),
            Self::AdsLighting => AdsRenderer::test_object(object),
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Position => "position",
            Self::PositionNormal => "position+normal",
            Self::AdsLighting => "ads-lighting",
        })
    }
}

#[derive(Debug)]
pub enum Renderer {
    Position(PositionRenderer),
    PositionNormal(PositionNormalRenderer),
    AdsLighting(AdsRenderer),
}

impl Renderer {
    pub fn new(kind: RendererKind) -> Self {
        match kind {
            RendererKind::Position => Self::Position(PositionRenderer::default()),
            RendererKind::PositionNormal => Self::PositionNormal(PositionNormalRenderer::default()),
            RendererKind::AdsLighting => Self::AdsLighting(AdsRenderer::default()),
        }
    }

    pub fn kind(&self) -> RendererKind {
        match self {
            Self::Position(_) => RendererKind::Position,
            Self::PositionNormal(_) => RendererKind::PositionNormal,
            Self::AdsLighting(_) => RendererKind::AdsLighting,
        }
    }

    pub fn set_data_from_shader(&mut self, shader: &Shader) {
        match self {
            Self::Position(r) => r.set_data_from_shader(shader),
            Self::PositionNormal(r) => r.set_data_from_shader(shader),
            Self::AdsLighting(r) => r.set_data_from_shader(shader),
        }
    }

    pub fn set_data_from_object(&mut self, object: &dyn SceneObject) {
        match self {
            Self::Position(r) => r.set_data_from_object(object),
            Self::PositionNormal(r) => r.set_data_from_object(object),
            Self::AdsLighting(r) => r.set_data_from_object(object),
        }
    }

    /// Offers a light to the renderer; returns whether it was taken.
    pub fn add_light_source(&mut self, light: Arc<dyn SceneObject>) -> bool {
        match self {
            Self::AdsLighting(r) => r.add_light_source(light),
            _ => false,
        }
    }

    pub fn remove_light_source(&mut self, light: &Arc<dyn SceneObject>) -> bool {
        match self {
            Self::AdsLighting(r) => r.remove_light_source(light),
            _ => false,
        }
    }

    pub fn light_sources(&self) -> usize {
        match self {
            Self::AdsLighting(r) => r.light_sources(),
            _ => 0,
        }
    }

    pub fn can_render(&self) -> bool {
        match self {
            Self::Position(r) => r.can_render(),
            Self::PositionNormal(r) => r.can_render(),
            Self::AdsLighting(r) => r.can_render(),
        }
    }

    /// Draws the object. Assumes `can_render` holds.
    pub fn render(&self, device: &mut dyn RenderDevice) {
        match self {
            Self::Position(r) => r.render(device),
            Self::PositionNormal(r) => r.render(device),
            Self::AdsLighting(r) => r.render(device),
        }
    }
}

/// Logs every unset handle; returns whether all are set.
fn check_handles(renderer: &str, handles: &[(&str, bool)]) -> bool {
    let mut ok = true;
    for (name, set) in handles {
        if !set {
            warn!("{renderer} renderer: {name} is not set");
            ok = false;
        }
    }
    ok
}

#[cfg(test)]
mod tests;
