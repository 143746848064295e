//! Registries every session carries: filters, extents and teams.

mod extents;
mod filters;
mod teams;

pub use extents::{CuboidExtent, Extent, ExtentFilter, ExtentManager, Point};
pub use filters::{all_of, any_of, inverse, Filter, FilterManager, FilterResponse, StaticFilter};
pub use teams::{Team, TeamManager};
