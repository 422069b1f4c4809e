//! Domain models shared by the mock backend and the client data layer
//!
//! Field names serialize in camelCase so the fixture files read like the
//! payloads a real backend would send.

use crate::geodesy;
use crate::repository::{Child, Entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kinds known to the backend, used for error messages and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Roadtrip,
    Point,
    Article,
    Gallery,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Roadtrip => "Roadtrip",
            Self::Point => "Point",
            Self::Article => "Article",
            Self::Gallery => "Gallery",
            Self::User => "User",
        };
        f.write_str(name)
    }
}

/// A WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<LatLng> for geo::Coord<f64> {
    fn from(value: LatLng) -> Self {
        geo::Coord {
            x: value.longitude,
            y: value.latitude,
        }
    }
}

impl From<geo::Coord<f64>> for LatLng {
    fn from(value: geo::Coord<f64>) -> Self {
        Self::new(value.y, value.x)
    }
}

/// Aggregate statistics stored on a roadtrip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadtripStats {
    /// Total distance in kilometers
    pub distance: u64,
    /// Duration in days
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadtrip {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub countries: Vec<String>,
    pub polyline: Vec<LatLng>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Point ids, in the order they were attached
    pub points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub stats: RoadtripStats,
}

impl Roadtrip {
    /// Recompute the statistics from the polyline and the trip dates.
    ///
    /// The stored `stats` are left untouched: callers decide whether to write
    /// the derived values back.
    pub fn derived_stats(&self) -> RoadtripStats {
        let days = (self.end_date - self.start_date).num_days().max(0);
        RoadtripStats {
            distance: geodesy::total_route_distance(&self.polyline),
            duration: u32::try_from(days).unwrap_or(u32::MAX),
        }
    }
}

/// Closed set of point categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    City,
    Monument,
    Nature,
    Food,
    Accommodation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub id: String,
    pub roadtrip_id: String,
    pub title: String,
    pub description: String,
    pub coordinates: LatLng,
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub date: DateTime<Utc>,
    /// Position within the trip. Not guaranteed contiguous or unique.
    pub order: i32,
    pub articles: Vec<String>,
    pub galleries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl Point {
    /// One-based number shown next to the point in the UI
    pub fn display_number(&self) -> i32 {
        self.order + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub point_id: String,
    pub title: String,
    /// Markdown body
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    pub published_at: DateTime<Utc>,
    /// Author user id
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub uri: String,
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub id: String,
    pub point_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub images: Vec<Image>,
    pub created_at: DateTime<Utc>,
}

/// Statistics derived from a user's roadtrips at read time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub roadtrips_count: usize,
    /// Sum of the trips' stored distances, in kilometers
    pub distance_traveled: u64,
    pub countries_visited: usize,
}

impl UserStats {
    pub fn from_roadtrips(roadtrips: &[Roadtrip]) -> Self {
        let countries: std::collections::HashSet<&str> = roadtrips
            .iter()
            .flat_map(|r| r.countries.iter().map(String::as_str))
            .collect();
        Self {
            roadtrips_count: roadtrips.len(),
            distance_traveled: roadtrips.iter().map(|r| r.stats.distance).sum(),
            countries_visited: countries.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Never persisted as authoritative state, filled in by the auth service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<UserStats>,
}

impl Entity for Roadtrip {
    const KIND: EntityKind = EntityKind::Roadtrip;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Roadtrips belong to the user who recorded them
impl Child for Roadtrip {
    fn parent_id(&self) -> &str {
        &self.user_id
    }
}

impl Entity for Point {
    const KIND: EntityKind = EntityKind::Point;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Child for Point {
    fn parent_id(&self) -> &str {
        &self.roadtrip_id
    }

    /// Ascending `order`; ties keep their storage order
    fn sort_siblings(siblings: &mut [Self]) {
        siblings.sort_by_key(|p| p.order);
    }
}

impl Entity for Article {
    const KIND: EntityKind = EntityKind::Article;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Child for Article {
    fn parent_id(&self) -> &str {
        &self.point_id
    }
}

impl Entity for Gallery {
    const KIND: EntityKind = EntityKind::Gallery;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Child for Gallery {
    fn parent_id(&self) -> &str {
        &self.point_id
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }
}
