use crate::components::{BufferGeometry, GeometryId, Light, LineSegments, Mesh, Transform};
use crate::entity::EntityId;
use foundation::handles::Handle;
use foundation::math::Vec3;
use foundation::{Aabb3, Color};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Group,
    Mesh(Mesh),
    LineSegments(LineSegments),
    Light(Light),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub transform: Transform,
    pub visible: bool,
    pub object: Object,
}

impl Node {
    fn new(object: Object, parent: Option<EntityId>) -> Self {
        Self {
            name: None,
            parent,
            children: Vec::new(),
            transform: Transform::identity(),
            visible: true,
            object,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.object {
            Object::Mesh(m) => Some(m),
            _ => None,
        }
    }
}

/// Retained scene graph.
///
/// Nodes live in a slot vector indexed by [`EntityId`]; removed slots are
/// never reused, so stale ids simply resolve to `None`. Geometries follow
/// the same rule and are freed once no remaining mesh refers to them.
#[derive(Debug, Default)]
pub struct World {
    /// `None` leaves the renderer's clear colour showing.
    pub background: Option<Color>,
    nodes: Vec<Option<Node>>,
    roots: Vec<EntityId>,
    geometries: Vec<Option<BufferGeometry>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(background: Color) -> Self {
        Self {
            background: Some(background),
            ..Self::default()
        }
    }

    pub fn add_geometry(&mut self, geometry: BufferGeometry) -> GeometryId {
        let id = GeometryId(self.geometries.len() as u32);
        self.geometries.push(Some(geometry));
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&BufferGeometry> {
        self.geometries.get(id.0 as usize)?.as_ref()
    }

    /// Adds `object` under `parent`, or at the root when `parent` is `None`
    /// or no longer alive.
    pub fn add(&mut self, object: Object, parent: Option<EntityId>) -> EntityId {
        let id = EntityId(Handle::new(self.nodes.len() as u32, 0));
        let parent = parent.filter(|p| self.node(*p).is_some());
        self.nodes.push(Some(Node::new(object, parent)));
        match parent.and_then(|p| self.node_mut(p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn add_group(&mut self, name: &str) -> EntityId {
        let id = self.add(Object::Group, None);
        self.set_name(id, name);
        id
    }

    pub fn add_child(&mut self, parent: EntityId, object: Object) -> EntityId {
        self.add(object, Some(parent))
    }

    pub fn node(&self, entity: EntityId) -> Option<&Node> {
        self.nodes.get(entity.index() as usize)?.as_ref()
    }

    pub fn node_mut(&mut self, entity: EntityId) -> Option<&mut Node> {
        self.nodes.get_mut(entity.index() as usize)?.as_mut()
    }

    pub fn mesh(&self, entity: EntityId) -> Option<&Mesh> {
        self.node(entity)?.as_mesh()
    }

    pub fn mesh_mut(&mut self, entity: EntityId) -> Option<&mut Mesh> {
        match &mut self.node_mut(entity)?.object {
            Object::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn set_name(&mut self, entity: EntityId, name: &str) {
        if let Some(node) = self.node_mut(entity) {
            node.name = Some(name.to_string());
        }
    }

    pub fn set_position(&mut self, entity: EntityId, position: Vec3) {
        if let Some(node) = self.node_mut(entity) {
            node.transform.position = position;
        }
    }

    pub fn set_visible(&mut self, entity: EntityId, visible: bool) {
        if let Some(node) = self.node_mut(entity) {
            node.visible = visible;
        }
    }

    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.node(entity).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Live node count.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position accumulated from the root down to `entity`.
    pub fn world_position(&self, entity: EntityId) -> Option<Vec3> {
        let mut node = self.node(entity)?;
        let mut pos = node.transform.position;
        while let Some(parent) = node.parent.and_then(|p| self.node(p)) {
            pos = pos + parent.transform.position;
            node = parent;
        }
        Some(pos)
    }

    /// Removes `entity` and its subtree. Returns the number of nodes removed.
    pub fn remove(&mut self, entity: EntityId) -> usize {
        let Some(node) = self.node(entity) else {
            return 0;
        };
        match node.parent {
            Some(parent) => {
                if let Some(p) = self.node_mut(parent) {
                    p.children.retain(|c| *c != entity);
                }
            }
            None => self.roots.retain(|r| *r != entity),
        }

        let mut removed = 0;
        let mut orphaned = Vec::new();
        let mut stack = vec![entity];
        while let Some(id) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(id.index() as usize)
                && let Some(node) = slot.take()
            {
                if let Object::Mesh(mesh) = &node.object {
                    orphaned.push(mesh.geometry);
                }
                stack.extend(node.children);
                removed += 1;
            }
        }

        let freed = self.free_unreferenced(orphaned);
        debug!(?entity, removed, freed, "subtree removed");
        removed
    }

    fn free_unreferenced(&mut self, mut candidates: Vec<GeometryId>) -> usize {
        candidates.sort_by_key(|g| g.0);
        candidates.dedup();
        if candidates.is_empty() {
            return 0;
        }
        let still_used: Vec<GeometryId> = self
            .nodes
            .iter()
            .flatten()
            .filter_map(|n| match &n.object {
                Object::Mesh(mesh) => Some(mesh.geometry),
                _ => None,
            })
            .collect();
        let mut freed = 0;
        for id in candidates {
            if still_used.contains(&id) {
                continue;
            }
            if let Some(slot) = self.geometries.get_mut(id.0 as usize)
                && slot.take().is_some()
            {
                freed += 1;
            }
        }
        freed
    }

    /// Depth-first walk over visible nodes with their world positions.
    /// A hidden node hides its whole subtree.
    pub fn visible_nodes(&self) -> Vec<(EntityId, Vec3, &Node)> {
        let mut out = Vec::new();
        let mut stack: Vec<(EntityId, Vec3)> =
            self.roots.iter().rev().map(|r| (*r, Vec3::ZERO)).collect();
        while let Some((id, parent_pos)) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if !node.visible {
                continue;
            }
            let pos = parent_pos + node.transform.position;
            out.push((id, pos, node));
            for child in node.children.iter().rev() {
                stack.push((*child, pos));
            }
        }
        out
    }

    pub fn meshes(&self) -> Vec<(EntityId, Vec3, &Mesh)> {
        self.visible_nodes()
            .into_iter()
            .filter_map(|(id, pos, node)| node.as_mesh().map(|m| (id, pos, m)))
            .collect()
    }

    pub fn line_segments(&self) -> Vec<(EntityId, Vec3, &LineSegments)> {
        self.visible_nodes()
            .into_iter()
            .filter_map(|(id, pos, node)| match &node.object {
                Object::LineSegments(l) => Some((id, pos, l)),
                _ => None,
            })
            .collect()
    }

    pub fn lights(&self) -> Vec<(EntityId, Vec3, Light)> {
        self.visible_nodes()
            .into_iter()
            .filter_map(|(id, pos, node)| match node.object {
                Object::Light(l) => Some((id, pos, l)),
                _ => None,
            })
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.nodes.iter().enumerate().find_map(|(idx, node)| {
            let node = node.as_ref()?;
            (node.name.as_deref() == Some(name)).then(|| EntityId(Handle::new(idx as u32, 0)))
        })
    }

    /// Meshes tagged with region `name`; one region may span several rings.
    pub fn find_region(&self, name: &str) -> Vec<EntityId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| {
                let region = node.as_ref()?.as_mesh()?.region.as_ref()?;
                (region.region_name == name).then(|| EntityId(Handle::new(idx as u32, 0)))
            })
            .collect()
    }

    /// World-space bounds of every mesh in the subtree rooted at `entity`.
    pub fn subtree_bounds(&self, entity: EntityId) -> Option<Aabb3> {
        let mut out: Option<Aabb3> = None;
        let mut stack = vec![entity];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            stack.extend(node.children.iter().copied());
            let Some(mesh) = node.as_mesh() else { continue };
            let Some(bb) = self.geometry(mesh.geometry).and_then(|g| g.bounding_box) else {
                continue;
            };
            let Some(pos) = self.world_position(id) else { continue };
            let bb = bb.translated(pos);
            out = Some(match out {
                Some(acc) => acc.union(bb),
                None => bb,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{Object, World};
    use crate::components::{BufferGeometry, Light, Mesh, RegionData, StandardMaterial};
    use foundation::Color;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    fn triangle_mesh(world: &mut World) -> Mesh {
        let mut g = BufferGeometry::new();
        g.push_triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        g.compute_bounding_box();
        let id = world.add_geometry(g);
        Mesh::new(id, vec![StandardMaterial::default()])
    }

    #[test]
    fn children_inherit_parent_position() {
        let mut world = World::new();
        let group = world.add_group("map");
        world.set_position(group, Vec3::new(10.0, 0.0, 0.0));
        let mesh = triangle_mesh(&mut world);
        let child = world.add_child(group, Object::Mesh(mesh));
        world.set_position(child, Vec3::new(0.0, 2.0, 0.0));

        assert_eq!(world.world_position(child), Some(Vec3::new(10.0, 2.0, 0.0)));
        let meshes = world.meshes();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].1, Vec3::new(10.0, 2.0, 0.0));

        let bb = world.subtree_bounds(group).expect("bounds");
        assert_eq!(bb.min, Vec3::new(10.0, 2.0, 0.0));
        assert_eq!(bb.max, Vec3::new(11.0, 3.0, 1.0));
    }

    #[test]
    fn hidden_groups_hide_their_subtree() {
        let mut world = World::new();
        let group = world.add_group("ground");
        let mesh = triangle_mesh(&mut world);
        world.add_child(group, Object::Mesh(mesh));
        world.add(
            Object::Light(Light::Ambient {
                color: Color::WHITE,
                intensity: 0.5,
            }),
            None,
        );

        world.set_visible(group, false);
        assert!(world.meshes().is_empty());
        assert_eq!(world.lights().len(), 1);
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut world = World::new();
        let group = world.add_group("map");
        let mesh = triangle_mesh(&mut world);
        let child = world.add_child(group, Object::Mesh(mesh));
        world.add_child(child, Object::Group);

        assert_eq!(world.len(), 3);
        assert_eq!(world.remove(group), 3);
        assert!(world.is_empty());
        assert!(world.roots().is_empty());
        assert!(world.node(child).is_none());
        assert_eq!(world.remove(group), 0);
    }

    #[test]
    fn remove_frees_geometry_no_longer_referenced() {
        let mut world = World::new();
        let shared = triangle_mesh(&mut world);
        let first = world.add(Object::Mesh(shared.clone()), None);
        let second = world.add(Object::Mesh(shared.clone()), None);
        let own = triangle_mesh(&mut world);
        let third = world.add(Object::Mesh(own.clone()), None);

        world.remove(first);
        assert!(world.geometry(shared.geometry).is_some());
        world.remove(second);
        assert!(world.geometry(shared.geometry).is_none());

        assert!(world.geometry(own.geometry).is_some());
        world.remove(third);
        assert!(world.geometry(own.geometry).is_none());
    }

    #[test]
    fn finds_nodes_by_name_and_region() {
        let mut world = World::new();
        let group = world.add_group("map");
        for _ in 0..2 {
            let mesh = triangle_mesh(&mut world).with_region(RegionData {
                original_color: Color::WHITE,
                region_name: "Yuexiu".to_string(),
            });
            world.add_child(group, Object::Mesh(mesh));
        }

        assert_eq!(world.find_by_name("map"), Some(group));
        assert_eq!(world.find_by_name("missing"), None);
        assert_eq!(world.find_region("Yuexiu").len(), 2);
        assert_eq!(world.children(group).len(), 2);
    }
}
