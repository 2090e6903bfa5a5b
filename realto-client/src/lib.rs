//! Realto Client - Authenticated access to the real-estate back-office API
//!
//! Provides the session lifecycle (token stores, session manager), the auth
//! interceptor fronting every outbound request, typed endpoint groups, and
//! the filterable paginated list loader.

pub mod api;
pub mod filters;
pub mod http;
pub mod pager;
pub mod session;
pub mod storage;

pub use api::{CurrentUserApi, RealtorListQuery, RealtorsApi, RealtyApi, RealtySection};
pub use filters::{RealtyFilterService, RealtyListFilter, SortDirection, TableSort};
pub use http::{
    create_http_client, ApiClient, ApiEnvelope, AuthInterceptor, ListPayload, LoginPayload,
    Navigator, OnUnauthorized,
};
pub use pager::{ListSource, RealtyPager};
pub use session::{
    CurrentUserGateway, ForcedLogout, SessionEvent, SessionManager, SessionState,
};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, TokenVault};
