//! Route overlays for the map screen

use roadtrip_lib::geodesy::{self, MapRegion};
use roadtrip_lib::{LatLng, Roadtrip};

pub const SELECTED_ROUTE_COLOR: &str = "#FF385C";
pub const UNSELECTED_ROUTE_COLOR: &str = "#888888";

#[derive(Debug, Clone, PartialEq)]
pub struct MapRoute {
    pub id: String,
    pub coordinates: Vec<LatLng>,
    pub color: &'static str,
    pub is_selected: bool,
}

/// One route per roadtrip, the selected one highlighted
pub fn map_routes(roadtrips: &[Roadtrip], selected_roadtrip_id: Option<&str>) -> Vec<MapRoute> {
    roadtrips
        .iter()
        .map(|rt| {
            let is_selected = selected_roadtrip_id == Some(rt.id.as_str());
            MapRoute {
                id: rt.id.clone(),
                coordinates: rt.polyline.clone(),
                color: if is_selected {
                    SELECTED_ROUTE_COLOR
                } else {
                    UNSELECTED_ROUTE_COLOR
                },
                is_selected,
            }
        })
        .collect()
}

/// Initial viewport showing every route, `None` when there is nothing to show
pub fn overview_region(routes: &[MapRoute]) -> Option<MapRegion> {
    let coordinates: Vec<LatLng> = routes
        .iter()
        .flat_map(|r| r.coordinates.iter().copied())
        .collect();
    geodesy::overview_region(&coordinates)
}
