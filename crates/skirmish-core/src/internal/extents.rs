use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Deserialize;

use crate::component::Component;
use crate::error::RegistryError;
use crate::module::{Module, ModuleInfo};
use crate::ticking::Tickable;

use super::filters::{Filter, FilterResponse};

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A region of the world
pub trait Extent {
    fn contains(&self, point: Point) -> bool;
}

/// Axis-aligned box between two corners, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CuboidExtent {
    min: Point,
    max: Point,
}

impl CuboidExtent {
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }
}

impl Extent for CuboidExtent {
    fn contains(&self, point: Point) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }
}

/// Allows points inside the extent and abstains on anything that is not a point
pub struct ExtentFilter(pub Rc<dyn Extent>);

impl Filter for ExtentFilter {
    fn test(&self, candidate: &dyn Any) -> FilterResponse {
        match candidate.downcast_ref::<Point>() {
            Some(point) => FilterResponse::from_bool(self.0.contains(*point)),
            None => FilterResponse::Abstain,
        }
    }
}

/// Internal module holding the session's named extents
#[derive(Default)]
pub struct ExtentManager {
    extents: BTreeMap<String, Rc<dyn Extent>>,
    generated: u64,
}

impl ExtentManager {
    /// Filters registered for named extents use this prefix
    pub const FILTER_PREFIX: &'static str = "extent-";

    /// Add an extent. Without an id one is generated. Returns the id used.
    pub fn add_extent(
        &mut self,
        id: Option<&str>,
        extent: Rc<dyn Extent>,
    ) -> Result<String, RegistryError> {
        let id = match id {
            Some(id) if self.extents.contains_key(id) => {
                return Err(RegistryError::Duplicate {
                    kind: "extent",
                    id: id.to_string(),
                })
            }
            Some(id) => id.to_string(),
            None => loop {
                self.generated += 1;
                let id = format!("extent-{}", self.generated);
                if !self.extents.contains_key(&id) {
                    break id;
                }
            },
        };
        self.extents.insert(id.clone(), extent);
        Ok(id)
    }

    pub fn extent(&self, id: &str) -> Option<Rc<dyn Extent>> {
        self.extents.get(id).cloned()
    }

    pub fn require_extent(&self, id: &str) -> Result<Rc<dyn Extent>, RegistryError> {
        self.extent(id).ok_or_else(|| RegistryError::NotFound {
            kind: "extent",
            id: id.to_string(),
        })
    }

    /// Ids of every extent containing `point`
    pub fn extents_within(&self, point: Point) -> Vec<&str> {
        self.extents
            .iter()
            .filter(|(_, extent)| extent.contains(point))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.extents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }
}

impl Tickable for ExtentManager {}
impl Component for ExtentManager {}

impl Module for ExtentManager {
    fn info() -> ModuleInfo {
        ModuleInfo::internal("ExtentManager")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_corners_in_any_order() {
        let cuboid = CuboidExtent::new(Point::new(10.0, 0.0, 10.0), Point::new(0.0, 5.0, 0.0));
        assert!(cuboid.contains(Point::new(0.0, 0.0, 0.0)));
        assert!(cuboid.contains(Point::new(10.0, 5.0, 10.0)));
        assert!(!cuboid.contains(Point::new(10.1, 1.0, 1.0)));
    }

    #[test]
    fn test_extents_within() {
        let mut manager = ExtentManager::default();
        let small = CuboidExtent::new(Point::default(), Point::new(1.0, 1.0, 1.0));
        let large = CuboidExtent::new(Point::default(), Point::new(9.0, 9.0, 9.0));
        manager.add_extent(Some("small"), Rc::new(small)).unwrap();
        manager.add_extent(Some("large"), Rc::new(large)).unwrap();
        assert!(manager.add_extent(Some("small"), Rc::new(small)).is_err());

        assert_eq!(manager.extents_within(Point::new(0.5, 0.5, 0.5)), vec!["large", "small"]);
        assert_eq!(manager.extents_within(Point::new(5.0, 5.0, 5.0)), vec!["large"]);
        assert!(manager.require_extent("missing").is_err());
    }

    #[test]
    fn test_extent_filter() {
        let filter = ExtentFilter(Rc::new(CuboidExtent::new(
            Point::default(),
            Point::new(1.0, 1.0, 1.0),
        )));
        assert_eq!(filter.test(&Point::new(0.5, 0.5, 0.5)), FilterResponse::Allow);
        assert_eq!(filter.test(&Point::new(2.0, 0.5, 0.5)), FilterResponse::Deny);
        assert_eq!(filter.test(&"player"), FilterResponse::Abstain);
    }
}
