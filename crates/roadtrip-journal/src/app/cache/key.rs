//! Structured query keys and invalidation filters

use std::fmt;

/// Resource families used for broad invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Roadtrips,
    Points,
    Articles,
    Galleries,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Roadtrips => "roadtrips",
            Self::Points => "points",
            Self::Articles => "articles",
            Self::Galleries => "galleries",
        })
    }
}

/// Identity of a cached read: a resource family plus its scoping id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Every roadtrip
    Roadtrips,
    Roadtrip(String),
    /// Roadtrips owned by a user
    UserRoadtrips(String),
    /// Points of a roadtrip
    RoadtripPoints(String),
    Point(String),
    /// Articles attached to a point
    PointArticles(String),
    Article(String),
    /// Galleries attached to a point
    PointGalleries(String),
    Gallery(String),
}

impl QueryKey {
    pub fn resource(&self) -> Resource {
        match self {
            Self::Roadtrips | Self::Roadtrip(_) | Self::UserRoadtrips(_) => Resource::Roadtrips,
            Self::RoadtripPoints(_) | Self::Point(_) => Resource::Points,
            Self::PointArticles(_) | Self::Article(_) => Resource::Articles,
            Self::PointGalleries(_) | Self::Gallery(_) => Resource::Galleries,
        }
    }

    /// The id that scopes this key, if it has one
    pub fn scope_id(&self) -> Option<&str> {
        match self {
            Self::Roadtrips => None,
            Self::Roadtrip(id)
            | Self::UserRoadtrips(id)
            | Self::RoadtripPoints(id)
            | Self::Point(id)
            | Self::PointArticles(id)
            | Self::Article(id)
            | Self::PointGalleries(id)
            | Self::Gallery(id) => Some(id),
        }
    }

    /// A key may only be fetched once its scoping id is known
    pub fn is_enabled(&self) -> bool {
        self.scope_id().is_none_or(|id| !id.is_empty())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource = self.resource();
        match self {
            Self::Roadtrips => write!(f, "{resource}"),
            Self::UserRoadtrips(id) => write!(f, "{resource}/user/{id}"),
            Self::RoadtripPoints(id) => write!(f, "{resource}/roadtrip/{id}"),
            Self::PointArticles(id) | Self::PointGalleries(id) => {
                write!(f, "{resource}/point/{id}")
            }
            Self::Roadtrip(id) | Self::Point(id) | Self::Article(id) | Self::Gallery(id) => {
                write!(f, "{resource}/{id}")
            }
        }
    }
}

/// Selects the cached queries affected by a mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyFilter {
    /// Every key of a resource family
    Resource(Resource),
    /// A single key
    Exact(QueryKey),
}

impl KeyFilter {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::Resource(resource) => key.resource() == *resource,
            Self::Exact(exact) => key == exact,
        }
    }
}

impl From<Resource> for KeyFilter {
    fn from(value: Resource) -> Self {
        Self::Resource(value)
    }
}

impl From<QueryKey> for KeyFilter {
    fn from(value: QueryKey) -> Self {
        Self::Exact(value)
    }
}
