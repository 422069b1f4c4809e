//! Static seed data for the mock backend
//!
//! The JSON files under `fixtures/` are embedded at compile time and parsed
//! once per backend instance, so every backend starts from the same snapshot.

use crate::{Article, DataError, Gallery, Point, Result, Roadtrip, User};
use serde::de::DeserializeOwned;

const ROADTRIPS_JSON: &str = include_str!("../fixtures/roadtrips.json");
const POINTS_JSON: &str = include_str!("../fixtures/points.json");
const ARTICLES_JSON: &str = include_str!("../fixtures/articles.json");
const GALLERIES_JSON: &str = include_str!("../fixtures/galleries.json");
const USERS_JSON: &str = include_str!("../fixtures/users.json");

/// Initial in-memory snapshot for every resource
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub roadtrips: Vec<Roadtrip>,
    pub points: Vec<Point>,
    pub articles: Vec<Article>,
    pub galleries: Vec<Gallery>,
    pub users: Vec<User>,
}

impl Fixtures {
    /// Parse the embedded seed collections
    pub fn load() -> Result<Self> {
        let fixtures = Self {
            roadtrips: parse("roadtrips", ROADTRIPS_JSON)?,
            points: parse("points", POINTS_JSON)?,
            articles: parse("articles", ARTICLES_JSON)?,
            galleries: parse("galleries", GALLERIES_JSON)?,
            users: parse("users", USERS_JSON)?,
        };
        tracing::debug!(
            "Loaded fixtures: {} roadtrips, {} points, {} articles, {} galleries, {} users",
            fixtures.roadtrips.len(),
            fixtures.points.len(),
            fixtures.articles.len(),
            fixtures.galleries.len(),
            fixtures.users.len()
        );
        Ok(fixtures)
    }
}

fn parse<T: DeserializeOwned>(name: &str, json: &str) -> Result<Vec<T>> {
    serde_json::from_str(json).map_err(|e| DataError::Fixture(format!("{name}.json: {e}")))
}
