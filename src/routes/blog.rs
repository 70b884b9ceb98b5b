/**
 * Blog Routes
 * Read-only pages: home, post detail, tag filter and contacts
 */
use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::BlogResult;
use crate::pages::{
    self, ContactsContext, HomeContext, Page, PostDetailContext, TagFilterContext,
};
use crate::state::AppState;

/// GET / - Most popular posts, freshest posts and popular tags
pub async fn index(State(state): State<AppState>) -> BlogResult<Json<Page<HomeContext>>> {
    let page = pages::home_page(state.repo(), state.config()).await?;
    Ok(Json(page))
}

/// GET /posts/{slug}/ - One post with its comments
pub async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> BlogResult<Json<Page<PostDetailContext>>> {
    let page = pages::post_detail_page(state.repo(), state.config(), &slug).await?;
    Ok(Json(page))
}

/// GET /tags/{tag_title}/ - Most popular posts carrying a tag
pub async fn tag_filter(
    State(state): State<AppState>,
    Path(tag_title): Path<String>,
) -> BlogResult<Json<Page<TagFilterContext>>> {
    let page = pages::tag_filter_page(state.repo(), state.config(), &tag_title).await?;
    Ok(Json(page))
}

/// GET /contacts/ - Static contacts page
pub async fn contacts() -> Json<Page<ContactsContext>> {
    Json(pages::contacts_page())
}
