//! Typed endpoint groups for the back-office API
//!
//! Each group holds the shared [`crate::http::ApiClient`] and exposes the
//! operations of one API area with explicit request/response types.

pub mod current_user;
pub mod realtors;
pub mod realty;

pub use current_user::CurrentUserApi;
pub use realtors::{RealtorListQuery, RealtorsApi};
pub use realty::{RealtyApi, RealtySection};
