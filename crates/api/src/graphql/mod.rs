//! GraphQL API served at `/graphql`.
//!
//! `GET /graphql` serves GraphiQL; `POST /graphql` executes queries. The
//! handler attaches the request's [`RequestContext`] and caller to each
//! request, so resolvers see the same language, currency and visibility
//! rules as the REST API.

pub mod mutation;
pub mod query;
pub mod types;

use async_graphql::http::GraphiQLSource;
use async_graphql::{Context, EmptySubscription, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::response::{Html, IntoResponse};
use axum::{Extension, Router, routing::get};
use emporium_core::Permission;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::{OptionalPrincipal, RequestContext};
use crate::services::auth::{AuthError, Principal};
use crate::state::AppState;

pub use mutation::Mutation;
pub use query::Query;

pub type EmporiumSchema = Schema<Query, Mutation, EmptySubscription>;

/// Deepest query nesting accepted.
const MAX_DEPTH: usize = 12;
/// Highest query complexity accepted.
const MAX_COMPLEXITY: usize = 1000;

/// Caller of the current GraphQL request.
struct Viewer(Option<Principal>);

/// Build the schema with shared state attached.
#[must_use]
pub fn build_schema(state: AppState) -> EmporiumSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(state)
        .limit_depth(MAX_DEPTH)
        .limit_complexity(MAX_COMPLEXITY)
        .finish()
}

/// State and request context for a resolver.
pub(crate) fn request_parts<'a>(
    ctx: &Context<'a>,
) -> async_graphql::Result<(&'a AppState, &'a RequestContext)> {
    Ok((ctx.data::<AppState>()?, ctx.data::<RequestContext>()?))
}

/// The authenticated caller, if any.
pub(crate) fn viewer<'a>(ctx: &Context<'a>) -> Option<&'a Principal> {
    ctx.data_opt::<Viewer>().and_then(|viewer| viewer.0.as_ref())
}

/// Fail unless the caller holds `permission`.
pub(crate) fn require<'a>(
    ctx: &Context<'a>,
    permission: Permission,
) -> async_graphql::Result<&'a Principal> {
    let principal = viewer(ctx)
        .ok_or_else(|| AppError::Auth(AuthError::MissingToken).into_graphql())?;
    if !principal.has(permission) {
        tracing::debug!(role = %principal.role, permission = ?permission, "Permission denied");
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        )
        .into_graphql());
    }
    Ok(principal)
}

/// Map any API-level error into a GraphQL error.
pub(crate) trait GraphQLResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T, E: Into<AppError>> GraphQLResultExt<T> for Result<T, E> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.into().into_graphql())
    }
}

/// `GET /graphql`
async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// `POST /graphql`
#[instrument(skip_all)]
async fn graphql_handler(
    Extension(schema): Extension<EmporiumSchema>,
    context: RequestContext,
    OptionalPrincipal(principal): OptionalPrincipal,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let request = request.into_inner().data(context).data(Viewer(principal));
    schema.execute(request).await.into()
}

/// Create the GraphQL routes router.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .layer(Extension(build_schema(state.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_sdl_lists_operations() {
        let sdl = EmporiumSchema::build(Query, Mutation, EmptySubscription)
            .finish()
            .sdl();
        for field in [
            "product(",
            "products(",
            "category(",
            "categories(",
            "categoryTree",
            "collections(",
            "tags(",
            "suppliers(",
            "taxClasses(",
            "categoryCreate(",
            "productStatusUpdate(",
            "variantDelete(",
            "totalCount",
        ] {
            assert!(sdl.contains(field), "missing {field}");
        }
    }
}
