//! Business logic layer for the restaurant backend.
//!
//! This crate wires the pure rules of the `domain` crate to a
//! [`repository::Store`]. Each operation runs inside a single unit of work:
//! it loads (and, where it decides on current state, locks) the rows it needs,
//! applies the domain rules, writes the results and commits, so callers never
//! observe a partially applied change.
//!
//! The API is split by concern into [`CatalogService`], [`TableService`],
//! [`CustomerService`], [`OrderService`], [`BillingService`] and
//! [`ReportService`]; [`RestaurantService`] bundles them for callers that
//! need the whole surface behind one trait object.

use domain::{DomainError, Entity};
use repository::{RepositoryError, Store};
use thiserror::Error;
use uuid::Uuid;

mod billing;
mod catalog;
mod customers;
mod orders;
mod reports;
mod tables;

pub use billing::BillingService;
pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use orders::OrderService;
pub use reports::ReportService;
pub use tables::TableService;

/// The main error type for all operations of the service traits.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The store failed; propagated unchanged.
    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// The business-rule violation behind this error, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Repository(_) => None,
        }
    }
}

/// Every service operation of the backend.
pub trait RestaurantService:
    CatalogService + TableService + CustomerService + OrderService + BillingService + ReportService
{
}

impl<T> RestaurantService for T where
    T: CatalogService
        + TableService
        + CustomerService
        + OrderService
        + BillingService
        + ReportService
{
}

/// Implementation of the service traits over any [`Store`].
///
/// The service holds no state of its own beyond the store handle, so it can
/// be shared freely between request handlers.
pub struct RestaurantServiceImpl<S> {
    store: S,
}

impl<S: Store> RestaurantServiceImpl<S> {
    /// Constructs a new [`RestaurantServiceImpl`] on top of `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

/// Unwraps a lookup result, turning a missing row into [`DomainError::NotFound`].
fn required<T>(row: Option<T>, entity: Entity, id: Uuid) -> Result<T, ServiceError> {
    row.ok_or_else(|| DomainError::not_found(entity, id).into())
}

fn require_text(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be blank")).into());
    }
    Ok(())
}
