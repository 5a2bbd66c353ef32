use axum::{
    extract::{Query, State},
    Extension, Json,
};
use common::types::Page;
use serde::Deserialize;
use service::{
    profile::search::{split_skills, ScoredProfile, SearchQuery},
    Actor,
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub skills: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[utoipa::path(get, path = "/search/profiles", tag = "search", params(("q" = Option<String>, Query, description = "Free text"), ("skills" = Option<String>, Query, description = "Comma separated skills"), ("sort" = Option<String>, Query, description = "relevance, rating, rate_asc, rate_desc, experience, newest, trending")), responses((status = 200, description = "Scored page of public profiles"), (status = 400, description = "Bad Request")))]
pub async fn profiles(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page<ScoredProfile>>, JsonApiError> {
    Ok(Json(state.search.search(&actor, query).await?))
}

#[utoipa::path(get, path = "/search/recommendations", tag = "search", params(("skills" = String, Query, description = "Comma separated skills"), ("limit" = Option<usize>, Query, description = "Max results")), responses((status = 200, description = "Developers ranked by fit")))]
pub async fn recommendations(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Query(q): Query<RecommendQuery>,
) -> Result<Json<Vec<ScoredProfile>>, JsonApiError> {
    let skills = split_skills(&q.skills);
    let found = state
        .search
        .recommend(&actor, &skills, q.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(found))
}

#[utoipa::path(get, path = "/search/trending", tag = "search", params(("limit" = Option<usize>, Query, description = "Max results")), responses((status = 200, description = "Trending developers")))]
pub async fn trending(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<Vec<ScoredProfile>>, JsonApiError> {
    Ok(Json(state.search.trending(&actor, q.limit.unwrap_or(DEFAULT_LIMIT)).await?))
}
