use std::sync::RwLock;

use glam::Vec3;

use super::{Hints, LightData, ObjectFlags, SceneObject};
use crate::sync::{read, write};

/// Point light broadcast to lighting renderers.
///
/// The position is in eye space; the application moves it along with the camera.
#[derive(Debug)]
pub struct PointLight {
    name: String,
    data: RwLock<LightData>,
}

impl PointLight {
    pub fn new(name: impl Into<String>, position: Vec3, color: Vec3) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(LightData {
                position,
                color,
                ambient: 0.1,
            }),
        }
    }

    pub fn with_ambient(self, ambient: f32) -> Self {
        write(&self.data).ambient = ambient.clamp(0.0, 1.0);
        self
    }

    pub fn set_position(&self, position: Vec3) {
        write(&self.data).position = position;
    }

    pub fn set_color(&self, color: Vec3) {
        write(&self.data).color = color;
    }
}

impl SceneObject for PointLight {
    fn name(&self) -> &str {
        &self.name
    }

    fn hints(&self) -> Hints {
        Hints {
            data_ready: true,
            flags: ObjectFlags {
                mesh: false,
                light_source: true,
            },
            ..Hints::default()
        }
    }

    fn light(&self) -> Option<LightData> {
        Some(*read(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_reports_current_data() {
        let light = PointLight::new("sun", Vec3::ZERO, Vec3::ONE).with_ambient(2.0);
        light.set_position(Vec3::new(1.0, 2.0, 3.0));
        let data = light.light().unwrap();
        assert_eq!(data.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(data.ambient, 1.0);
        assert!(light.hints().flags.light_source);
        assert!(!light.hints().flags.mesh);
    }
}
