//! MockBackend - one repository per resource plus the typed service queries
//!
//! This is the boundary a real HTTP backend would replace. It owns the
//! repositories, exposes the resource-specific lookups (points by roadtrip,
//! roadtrips by user, ...) and implements the cascading deletes.

use crate::{
    Article, DataError, FailureMode, Fixtures, Gallery, Image, MockLatency, Operation, Point,
    Repository, Result, Roadtrip, User, UserStats,
};

/// Records removed by a cascading delete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeReport {
    pub roadtrips: Vec<Roadtrip>,
    pub points: Vec<Point>,
    pub articles: Vec<Article>,
    pub galleries: Vec<Gallery>,
}

impl CascadeReport {
    /// Whether the delete removed anything at all
    pub fn is_empty(&self) -> bool {
        self.roadtrips.is_empty()
            && self.points.is_empty()
            && self.articles.is_empty()
            && self.galleries.is_empty()
    }

    /// Roadtrip ids whose point lists were affected
    pub fn affected_roadtrip_ids(&self) -> impl Iterator<Item = &str> {
        self.roadtrips
            .iter()
            .map(|r| r.id.as_str())
            .chain(self.points.iter().map(|p| p.roadtrip_id.as_str()))
    }
}

/// In-memory backend with an explicit lifecycle
pub struct MockBackend {
    pub roadtrips: Repository<Roadtrip>,
    pub points: Repository<Point>,
    pub articles: Repository<Article>,
    pub galleries: Repository<Gallery>,
    pub users: Repository<User>,
    latency: MockLatency,
}

impl MockBackend {
    /// Create a backend seeded with the given snapshot
    pub fn new(fixtures: Fixtures, latency: MockLatency) -> Self {
        Self {
            roadtrips: Repository::new(fixtures.roadtrips, latency),
            points: Repository::new(fixtures.points, latency),
            articles: Repository::new(fixtures.articles, latency),
            galleries: Repository::new(fixtures.galleries, latency),
            users: Repository::new(fixtures.users, latency),
            latency,
        }
    }

    /// Create a backend seeded with the embedded fixture files
    pub fn from_fixtures(latency: MockLatency) -> Result<Self> {
        Ok(Self::new(Fixtures::load()?, latency))
    }

    pub fn latency(&self) -> MockLatency {
        self.latency
    }

    /// Apply the same failure mode to every repository
    pub fn set_failure_mode(&self, mode: FailureMode) {
        tracing::debug!("Backend failure mode set to {:?}", mode);
        self.roadtrips.set_failure_mode(mode);
        self.points.set_failure_mode(mode);
        self.articles.set_failure_mode(mode);
        self.galleries.set_failure_mode(mode);
        self.users.set_failure_mode(mode);
    }

    // ------------------------------------------------------------------
    // Roadtrips
    // ------------------------------------------------------------------

    pub async fn roadtrips_by_user(&self, user_id: &str) -> Result<Vec<Roadtrip>> {
        self.roadtrips.get_by_parent_id(user_id).await
    }

    /// Delete a roadtrip together with its points and their content
    ///
    /// All or nothing: an injected failure in any repository involved aborts
    /// the cascade before anything is removed.
    pub async fn delete_roadtrip(&self, id: &str) -> Result<CascadeReport> {
        self.roadtrips.round_trip(Operation::Delete).await?;
        self.check_point_cascade()?;

        let roadtrips = self.roadtrips.remove_where(|r| r.id == id).await;
        let mut report = self.remove_points_where(|p| p.roadtrip_id == id).await;
        report.roadtrips = roadtrips;
        tracing::debug!(
            "Deleted roadtrip {} (cascade: {} points, {} articles, {} galleries)",
            id,
            report.points.len(),
            report.articles.len(),
            report.galleries.len()
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Points
    // ------------------------------------------------------------------

    /// Points of a roadtrip, ascending by `order`
    pub async fn points_by_roadtrip(&self, roadtrip_id: &str) -> Result<Vec<Point>> {
        self.points.get_by_parent_id(roadtrip_id).await
    }

    /// Delete a point together with its articles and galleries, all or nothing
    pub async fn delete_point(&self, id: &str) -> Result<CascadeReport> {
        self.points.round_trip(Operation::Delete).await?;
        self.check_point_cascade()?;
        Ok(self.remove_points_where(|p| p.id == id).await)
    }

    /// Every repository a point delete writes to must accept the call
    fn check_point_cascade(&self) -> Result<()> {
        self.points.check_failure(Operation::Delete)?;
        self.articles.check_failure(Operation::Delete)?;
        self.galleries.check_failure(Operation::Delete)
    }

    async fn remove_points_where<P>(&self, predicate: P) -> CascadeReport
    where
        P: Fn(&Point) -> bool,
    {
        let points = self.points.remove_where(predicate).await;
        if points.is_empty() {
            return CascadeReport::default();
        }

        let owned = |point_id: &str| points.iter().any(|p| p.id == point_id);
        let articles = self.articles.remove_where(|a| owned(&a.point_id)).await;
        let galleries = self.galleries.remove_where(|g| owned(&g.point_id)).await;

        CascadeReport {
            roadtrips: Vec::new(),
            points,
            articles,
            galleries,
        }
    }

    // ------------------------------------------------------------------
    // Articles & galleries
    // ------------------------------------------------------------------

    pub async fn articles_by_point(&self, point_id: &str) -> Result<Vec<Article>> {
        self.articles.get_by_parent_id(point_id).await
    }

    pub async fn galleries_by_point(&self, point_id: &str) -> Result<Vec<Gallery>> {
        self.galleries.get_by_parent_id(point_id).await
    }

    /// Append an image to an existing gallery and return the updated gallery
    pub async fn add_image(&self, gallery_id: &str, image: Image) -> Result<Gallery> {
        self.galleries
            .update(gallery_id, |g| g.images.push(image))
            .await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn user_by_email(&self, email: &str) -> Result<User> {
        self.users
            .find(|u| u.email == email)
            .await?
            .ok_or(DataError::InvalidCredentials)
    }

    /// Aggregate statistics over the user's current roadtrips
    pub async fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        let roadtrips = self.roadtrips_by_user(user_id).await?;
        Ok(UserStats::from_roadtrips(&roadtrips))
    }

    /// Fetch a user with freshly computed statistics attached
    pub async fn user_with_stats(&self, user: User) -> Result<User> {
        let stats = self.user_stats(&user.id).await?;
        Ok(User {
            stats: Some(stats),
            ..user
        })
    }
}
