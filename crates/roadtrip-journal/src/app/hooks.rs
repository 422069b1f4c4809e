//! Query and mutation hooks exposed to the screens
//!
//! Every read the UI performs is one of the query methods below, every write
//! one of the mutations. The invalidation rule of each mutation lists the keys
//! whose data depends on what it changed; cascading deletes invalidate every
//! resource family they touched.

use crate::app::cache::{
    KeyFilter, Mutation, Query, QueryCache, QueryKey, QueryOptions, Resource,
};
use crate::{JournalError, JournalResult};
use roadtrip_lib::{Article, CascadeReport, Gallery, Image, MockBackend, Point, Roadtrip};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The roadtrip list changes rarely; it is served from cache for this long
pub const ROADTRIPS_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Input of [`DataClient::add_image`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub gallery_id: String,
    pub image: Image,
}

#[derive(Clone)]
pub struct DataClient {
    backend: Arc<MockBackend>,
    cache: QueryCache,
}

impl DataClient {
    pub fn new(backend: Arc<MockBackend>, cache: QueryCache) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<MockBackend> {
        &self.backend
    }

    fn query<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetch: F) -> Query<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<MockBackend>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = roadtrip_lib::Result<T>> + Send + 'static,
    {
        let backend = self.backend.clone();
        self.cache.query(key, options, move || {
            let fut = fetch(backend.clone());
            async move { fut.await.map_err(JournalError::from) }
        })
    }

    fn mutation<I, O, F, Fut, V>(&self, run: F, invalidates: V) -> Mutation<I, O>
    where
        I: Send + 'static,
        O: Clone + Send + Sync + 'static,
        F: Fn(Arc<MockBackend>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = roadtrip_lib::Result<O>> + Send + 'static,
        V: Fn(&O) -> Vec<KeyFilter> + Send + Sync + 'static,
    {
        let backend = self.backend.clone();
        Mutation::new(
            self.cache.clone(),
            move |input| {
                let fut = run(backend.clone(), input);
                async move { fut.await.map_err(JournalError::from) }
            },
            invalidates,
        )
    }

    // ------------------------------------------------------------------
    // Roadtrips
    // ------------------------------------------------------------------

    pub fn roadtrips(&self) -> Query<Vec<Roadtrip>> {
        self.query(
            QueryKey::Roadtrips,
            QueryOptions::default().stale_time(ROADTRIPS_STALE_TIME),
            |backend| async move { backend.roadtrips.get_all().await },
        )
    }

    pub fn roadtrip(&self, id: &str) -> Query<Roadtrip> {
        let id = id.to_string();
        self.query(
            QueryKey::Roadtrip(id.clone()),
            QueryOptions::default(),
            move |backend| {
                let id = id.clone();
                async move { backend.roadtrips.get_by_id(&id).await }
            },
        )
    }

    pub fn user_roadtrips(&self, user_id: &str) -> Query<Vec<Roadtrip>> {
        let user_id = user_id.to_string();
        self.query(
            QueryKey::UserRoadtrips(user_id.clone()),
            QueryOptions::default(),
            move |backend| {
                let user_id = user_id.clone();
                async move { backend.roadtrips_by_user(&user_id).await }
            },
        )
    }

    pub fn create_roadtrip(&self) -> Mutation<Roadtrip, Roadtrip> {
        self.mutation(
            |backend, roadtrip| async move { backend.roadtrips.create(roadtrip).await },
            |_| vec![Resource::Roadtrips.into()],
        )
    }

    /// Deletes the roadtrip with its points and their articles and galleries
    pub fn delete_roadtrip(&self) -> Mutation<String, CascadeReport> {
        self.mutation(
            |backend, id: String| async move { backend.delete_roadtrip(&id).await },
            |_| {
                vec![
                    Resource::Roadtrips.into(),
                    Resource::Points.into(),
                    Resource::Articles.into(),
                    Resource::Galleries.into(),
                ]
            },
        )
    }

    // ------------------------------------------------------------------
    // Points
    // ------------------------------------------------------------------

    /// Points of a roadtrip, ascending by `order`
    pub fn points(&self, roadtrip_id: &str) -> Query<Vec<Point>> {
        let roadtrip_id = roadtrip_id.to_string();
        self.query(
            QueryKey::RoadtripPoints(roadtrip_id.clone()),
            QueryOptions::default(),
            move |backend| {
                let roadtrip_id = roadtrip_id.clone();
                async move { backend.points_by_roadtrip(&roadtrip_id).await }
            },
        )
    }

    pub fn point(&self, id: &str) -> Query<Point> {
        let id = id.to_string();
        self.query(
            QueryKey::Point(id.clone()),
            QueryOptions::default(),
            move |backend| {
                let id = id.clone();
                async move { backend.points.get_by_id(&id).await }
            },
        )
    }

    /// Invalidates the point list of the roadtrip and the roadtrip itself,
    /// whose stats depend on its points
    pub fn create_point(&self) -> Mutation<Point, Point> {
        self.mutation(
            |backend, point| async move { backend.points.create(point).await },
            |point: &Point| {
                vec![
                    QueryKey::RoadtripPoints(point.roadtrip_id.clone()).into(),
                    QueryKey::Roadtrip(point.roadtrip_id.clone()).into(),
                ]
            },
        )
    }

    pub fn delete_point(&self) -> Mutation<String, CascadeReport> {
        self.mutation(
            |backend, id: String| async move { backend.delete_point(&id).await },
            |report: &CascadeReport| {
                let roadtrip_ids: BTreeSet<&str> = report.affected_roadtrip_ids().collect();
                let mut filters: Vec<KeyFilter> = vec![
                    Resource::Points.into(),
                    Resource::Articles.into(),
                    Resource::Galleries.into(),
                ];
                filters.extend(
                    roadtrip_ids
                        .into_iter()
                        .map(|id| KeyFilter::Exact(QueryKey::Roadtrip(id.to_string()))),
                );
                filters
            },
        )
    }

    // ------------------------------------------------------------------
    // Articles
    // ------------------------------------------------------------------

    pub fn articles(&self, point_id: &str) -> Query<Vec<Article>> {
        let point_id = point_id.to_string();
        self.query(
            QueryKey::PointArticles(point_id.clone()),
            QueryOptions::default(),
            move |backend| {
                let point_id = point_id.clone();
                async move { backend.articles_by_point(&point_id).await }
            },
        )
    }

    pub fn article(&self, id: &str) -> Query<Article> {
        let id = id.to_string();
        self.query(
            QueryKey::Article(id.clone()),
            QueryOptions::default(),
            move |backend| {
                let id = id.clone();
                async move { backend.articles.get_by_id(&id).await }
            },
        )
    }

    pub fn create_article(&self) -> Mutation<Article, Article> {
        self.mutation(
            |backend, article| async move { backend.articles.create(article).await },
            |article: &Article| vec![QueryKey::PointArticles(article.point_id.clone()).into()],
        )
    }

    /// Resolves to whether an article was removed
    pub fn delete_article(&self) -> Mutation<String, bool> {
        self.mutation(
            |backend, id: String| async move { backend.articles.delete(&id).await },
            |_| vec![Resource::Articles.into()],
        )
    }

    // ------------------------------------------------------------------
    // Galleries
    // ------------------------------------------------------------------

    pub fn galleries(&self, point_id: &str) -> Query<Vec<Gallery>> {
        let point_id = point_id.to_string();
        self.query(
            QueryKey::PointGalleries(point_id.clone()),
            QueryOptions::default(),
            move |backend| {
                let point_id = point_id.clone();
                async move { backend.galleries_by_point(&point_id).await }
            },
        )
    }

    pub fn gallery(&self, id: &str) -> Query<Gallery> {
        let id = id.to_string();
        self.query(
            QueryKey::Gallery(id.clone()),
            QueryOptions::default(),
            move |backend| {
                let id = id.clone();
                async move { backend.galleries.get_by_id(&id).await }
            },
        )
    }

    pub fn create_gallery(&self) -> Mutation<Gallery, Gallery> {
        self.mutation(
            |backend, gallery| async move { backend.galleries.create(gallery).await },
            |gallery: &Gallery| vec![QueryKey::PointGalleries(gallery.point_id.clone()).into()],
        )
    }

    pub fn add_image(&self) -> Mutation<NewImage, Gallery> {
        self.mutation(
            |backend, input: NewImage| async move {
                backend.add_image(&input.gallery_id, input.image).await
            },
            |gallery: &Gallery| {
                vec![
                    QueryKey::Gallery(gallery.id.clone()).into(),
                    QueryKey::PointGalleries(gallery.point_id.clone()).into(),
                ]
            },
        )
    }

    pub fn delete_gallery(&self) -> Mutation<String, bool> {
        self.mutation(
            |backend, id: String| async move { backend.galleries.delete(&id).await },
            |_| vec![Resource::Galleries.into()],
        )
    }

    /// Fetch the roadtrip list through the cache without subscribing
    pub async fn prefetch_roadtrips(&self) -> JournalResult<Arc<Vec<Roadtrip>>> {
        let backend = self.backend.clone();
        self.cache
            .fetch_query_with(
                QueryKey::Roadtrips,
                QueryOptions::default().stale_time(ROADTRIPS_STALE_TIME),
                move || {
                    let backend = backend.clone();
                    async move { backend.roadtrips.get_all().await.map_err(JournalError::from) }
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache::CacheConfig;
    use chrono::{TimeZone, Utc};
    use roadtrip_lib::{LatLng, MockLatency, PointType};

    fn client() -> DataClient {
        let backend = Arc::new(MockBackend::from_fixtures(MockLatency::default()).unwrap());
        DataClient::new(backend, QueryCache::new(CacheConfig::no_retry()))
    }

    fn new_point(id: &str, roadtrip_id: &str, order: i32) -> Point {
        Point {
            id: id.to_string(),
            roadtrip_id: roadtrip_id.to_string(),
            title: "Big Sur".to_string(),
            description: "Bixby Creek Bridge at sunset".to_string(),
            coordinates: LatLng::new(36.3615, -121.8563),
            point_type: PointType::Nature,
            date: Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap(),
            order,
            articles: Vec::new(),
            galleries: Vec::new(),
            cover_image: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_points_query_is_sorted() {
        let client = client();
        let mut points = client.points("rt1");
        let state = points.settled().await;
        let orders: Vec<i32> = state.data.unwrap().iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_scope_disables_queries() {
        let client = client();
        assert!(!client.points("").is_enabled());
        assert!(!client.articles("").is_enabled());
        assert!(!client.gallery("").is_enabled());
        assert!(client.roadtrips().is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_point_refetches_dependent_queries() {
        let client = client();
        let mut points = client.points("rt1");
        let mut roadtrip = client.roadtrip("rt1");
        let mut other = client.points("rt2");
        points.settled().await;
        roadtrip.settled().await;
        other.settled().await;

        let create = client.create_point();
        create.mutate(new_point("p-new", "rt1", 4)).await.unwrap();
        assert!(create.state().is_success());

        assert!(points.state().is_fetching);
        assert!(roadtrip.state().is_fetching);
        assert!(!other.state().is_fetching);

        let state = points.settled().await;
        let ids: Vec<String> = state.data.unwrap().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.last().map(String::as_str), Some("p-new"));
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_roadtrip_cascades_and_invalidates() {
        let client = client();
        let mut list = client.roadtrips();
        let mut articles = client.articles("p1");
        assert_eq!(list.settled().await.data.unwrap().len(), 3);
        assert_eq!(articles.settled().await.data.unwrap().len(), 1);

        let report = client.delete_roadtrip().mutate("rt1".to_string()).await.unwrap();
        assert_eq!(report.points.len(), 4);

        assert_eq!(list.settled().await.data.unwrap().len(), 2);
        assert!(articles.settled().await.data.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_image_refetches_gallery() {
        let client = client();
        let mut gallery = client.gallery("g1");
        let before = gallery.settled().await.data.unwrap().images.len();

        let image = Image {
            id: "img-new".to_string(),
            uri: "https://images.example.com/bixby.jpg".to_string(),
            thumbnail: "https://images.example.com/bixby-thumb.jpg".to_string(),
            width: 1600,
            height: 1067,
            caption: None,
        };
        let updated = client
            .add_image()
            .mutate(NewImage {
                gallery_id: "g1".to_string(),
                image,
            })
            .await
            .unwrap();
        assert_eq!(updated.images.len(), before + 1);
        assert_eq!(gallery.settled().await.data.unwrap().images.len(), before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_roadtrip_refetches_list() {
        let client = client();
        let mut list = client.roadtrips();
        let mut points = client.points("rt1");
        assert_eq!(list.settled().await.data.unwrap().len(), 3);
        points.settled().await;

        let mut roadtrip = client.backend().roadtrips.get_by_id("rt1").await.unwrap();
        roadtrip.id = "rt-new".to_string();
        roadtrip.title = "Route 66".to_string();
        client.create_roadtrip().mutate(roadtrip).await.unwrap();

        assert!(list.state().is_refetching());
        assert!(!points.state().is_fetching);
        let titles: Vec<String> = list
            .settled()
            .await
            .data
            .unwrap()
            .iter()
            .map(|r| r.title.clone())
            .collect();
        assert_eq!(titles.len(), 4);
        assert!(titles.iter().any(|t| t == "Route 66"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_article_refetches_its_point_only() {
        let client = client();
        let mut p1 = client.articles("p1");
        let mut p2 = client.articles("p2");
        assert_eq!(p1.settled().await.data.unwrap().len(), 1);
        assert_eq!(p2.settled().await.data.unwrap().len(), 1);

        let mut article = client.backend().articles.get_by_id("a1").await.unwrap();
        article.id = "a-new".to_string();
        client.create_article().mutate(article).await.unwrap();

        assert!(p1.state().is_fetching);
        assert!(!p2.state().is_fetching);
        assert_eq!(p1.settled().await.data.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_article_refetches_articles() {
        let client = client();
        let mut articles = client.articles("p1");
        let mut galleries = client.galleries("p1");
        assert_eq!(articles.settled().await.data.unwrap().len(), 1);
        galleries.settled().await;

        assert!(client.delete_article().mutate("a1".to_string()).await.unwrap());

        assert!(articles.state().is_fetching);
        assert!(!galleries.state().is_fetching);
        assert!(articles.settled().await.data.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_gallery_refetches_its_point_only() {
        let client = client();
        let mut p1 = client.galleries("p1");
        let mut p3 = client.galleries("p3");
        assert_eq!(p1.settled().await.data.unwrap().len(), 1);
        p3.settled().await;

        let mut gallery = client.backend().galleries.get_by_id("g1").await.unwrap();
        gallery.id = "g-new".to_string();
        client.create_gallery().mutate(gallery).await.unwrap();

        assert!(p1.state().is_fetching);
        assert!(!p3.state().is_fetching);
        assert_eq!(p1.settled().await.data.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_gallery_refetches_galleries() {
        let client = client();
        let mut galleries = client.galleries("p1");
        let mut articles = client.articles("p1");
        assert_eq!(galleries.settled().await.data.unwrap().len(), 1);
        articles.settled().await;

        assert!(client.delete_gallery().mutate("g1".to_string()).await.unwrap());

        assert!(galleries.state().is_fetching);
        assert!(!articles.state().is_fetching);
        assert!(galleries.settled().await.data.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cascade_keeps_roadtrip_visible() {
        let client = client();
        let mut list = client.roadtrips();
        list.settled().await;

        client
            .backend()
            .points
            .set_failure_mode(roadtrip_lib::FailureMode::Always);
        let delete = client.delete_roadtrip();
        assert!(delete.mutate("rt1".to_string()).await.is_err());
        client
            .backend()
            .points
            .set_failure_mode(roadtrip_lib::FailureMode::Never);

        assert!(list.data().unwrap().iter().any(|r| r.id == "rt1"));
        assert!(client.backend().roadtrips.get_by_id("rt1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mutation_keeps_cache() {
        let client = client();
        let mut list = client.roadtrips();
        list.settled().await;

        let delete = client.delete_gallery();
        client
            .backend()
            .set_failure_mode(roadtrip_lib::FailureMode::Always);
        let err = delete.mutate("g1".to_string()).await.unwrap_err();
        assert!(matches!(err, JournalError::Data(roadtrip_lib::DataError::SimulatedFailure)));
        assert!(delete.state().is_error());
        assert!(!list.state().is_fetching);
        assert_eq!(list.data().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_roadtrip_list_is_cached() {
        let client = client();
        let first = client.prefetch_roadtrips().await.unwrap();
        let started = tokio::time::Instant::now();
        let second = client.prefetch_roadtrips().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
