//! Route classification for the guard.
//!
//! # Responsibilities
//! - Compile configured paths into matchers once at startup
//! - Answer the three questions the dispatcher asks per request:
//!   excluded? vote mutation? which class?
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Admin API is checked before the admin UI because `/api/admin/` is not
//!   under `/admin` but must never fall into the strict API scope

use axum::http::Method;

use crate::config::RoutesConfig;
use crate::routing::matcher::{
    AndMatcher, AnyMatcher, ExactPathMatcher, Matcher, MethodMatcher, NotMatcher,
    PathPrefixMatcher, RouteRequest,
};

/// Broad category a path falls into after the vote check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// `/api/admin/...`: bypasses every check.
    AdminApi,
    /// `/admin...` except the login page: needs the admin cookie.
    AdminPage,
    /// `/api/...`: strict session scope.
    Api,
    /// Everything else, including the admin login page.
    Page,
}

impl RouteClass {
    /// Label used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            RouteClass::AdminApi => "admin_api",
            RouteClass::AdminPage => "admin_page",
            RouteClass::Api => "api",
            RouteClass::Page => "page",
        }
    }
}

#[derive(Debug)]
pub struct RouteTable {
    excluded: AnyMatcher,
    vote: AndMatcher,
    admin_api: PathPrefixMatcher,
    admin_page: AndMatcher,
    api: PathPrefixMatcher,
}

impl RouteTable {
    pub fn from_config(config: &RoutesConfig) -> Self {
        let excluded = AnyMatcher::new(
            config
                .excluded_prefixes
                .iter()
                .map(|p| Box::new(PathPrefixMatcher::new(p.clone())) as Box<dyn Matcher>)
                .collect(),
        );

        let vote = AndMatcher::new(vec![
            Box::new(MethodMatcher::new(Method::POST)),
            Box::new(ExactPathMatcher::new(config.vote_paths.iter().cloned())),
        ]);

        let admin_page = AndMatcher::new(vec![
            Box::new(PathPrefixMatcher::new(config.admin_prefix.clone())),
            Box::new(NotMatcher::new(Box::new(PathPrefixMatcher::new(
                config.admin_login_path.clone(),
            )))),
        ]);

        Self {
            excluded,
            vote,
            admin_api: PathPrefixMatcher::new(config.admin_api_prefix.clone()),
            admin_page,
            api: PathPrefixMatcher::new(config.api_prefix.clone()),
        }
    }

    /// Static assets the guard never touches.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.matches(&RouteRequest::new(&Method::GET, path))
    }

    /// `POST` to one of the vote endpoints.
    pub fn is_vote_mutation(&self, method: &Method, path: &str) -> bool {
        self.vote.matches(&RouteRequest::new(method, path))
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let req = RouteRequest::new(&Method::GET, path);
        if self.admin_api.matches(&req) {
            RouteClass::AdminApi
        } else if self.admin_page.matches(&req) {
            RouteClass::AdminPage
        } else if self.api.matches(&req) {
            RouteClass::Api
        } else {
            RouteClass::Page
        }
    }
}
