use foundation::Color;
use foundation::math::Vec3;

use crate::World;
use crate::components::{Light, ShadowSettings};
use crate::entity::EntityId;
use crate::world::Object;

fn add_light(world: &mut World, name: &str, light: Light, position: Vec3) -> EntityId {
    let id = world.add(Object::Light(light), None);
    world.set_name(id, name);
    world.set_position(id, position);
    id
}

/// Ambient fill, a shadow-casting key light from the south-east, a weaker
/// fill light and a sky/ground hemisphere.
pub fn add_default_lights(world: &mut World) -> Vec<EntityId> {
    vec![
        add_light(
            world,
            "ambient",
            Light::Ambient {
                color: Color::WHITE,
                intensity: 0.5,
            },
            Vec3::ZERO,
        ),
        add_light(
            world,
            "key",
            Light::Directional {
                color: Color::WHITE,
                intensity: 0.8,
                shadow: Some(ShadowSettings {
                    map_size: 2048,
                    left: -100.0,
                    right: 100.0,
                    top: 100.0,
                    bottom: -100.0,
                }),
            },
            Vec3::new(50.0, -100.0, 50.0),
        ),
        add_light(
            world,
            "fill",
            Light::Directional {
                color: Color::WHITE,
                intensity: 0.3,
                shadow: None,
            },
            Vec3::new(-50.0, -50.0, 30.0),
        ),
        add_light(
            world,
            "hemisphere",
            Light::Hemisphere {
                sky: Color::from_hex(0x87ceeb),
                ground: Color::from_hex(0x0c0c0c),
                intensity: 0.4,
            },
            Vec3::new(0.0, -50.0, 0.0),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::add_default_lights;
    use crate::World;

    #[test]
    fn adds_four_lights_one_casting_shadows() {
        let mut world = World::new();
        let ids = add_default_lights(&mut world);
        assert_eq!(ids.len(), 4);

        let lights = world.lights();
        assert_eq!(lights.len(), 4);
        assert_eq!(lights.iter().filter(|(_, _, l)| l.casts_shadow()).count(), 1);
        let total: f32 = lights.iter().map(|(_, _, l)| l.intensity()).sum();
        assert!((total - 2.0).abs() < 1e-6);
    }
}
