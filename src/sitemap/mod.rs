pub mod model;
pub mod site_map;

pub use model::{
    CoverageStats, DiscoveryStatus, Element, ElementId, ElementKey, ElementKind, Priority, Region,
    Screen, ScreenId, Transition, VisitState,
};
pub use site_map::{MergeSummary, SiteMap};
