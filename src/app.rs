use std::time::SystemTime;

use thiserror::Error;
use tracing::info;

use crate::{
    domain::{build_rows, valuate, FitSummary, LeastSquaresError, Listing, QueryView},
    infra::{CacheStatus, FeedClient, FeedDocument, FeedError},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("price model fit failed: {0}")]
    Model(#[from] LeastSquaresError),
}

/// Where the valuated document came from.
#[derive(Clone, Debug)]
pub struct FeedOrigin {
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

/// One valuation snapshot over one feed document.
#[derive(Clone, Debug)]
pub struct ServerAuction {
    fit: FitSummary,
    data: QueryView,
    origin: Option<FeedOrigin>,
}

impl ServerAuction {
    pub fn from_listings(listings: &[Listing]) -> Result<Self, LeastSquaresError> {
        let rows = build_rows(listings);
        let (fit, records) = valuate(rows)?;
        info!(
            listings = listings.len(),
            unscored = records.iter().filter(|r| !r.scored).count(),
            "valuated listings"
        );
        Ok(Self {
            fit,
            data: QueryView::new(records),
            origin: None,
        })
    }

    pub fn from_document(document: &FeedDocument) -> Result<Self, LeastSquaresError> {
        Self::from_listings(&document.listings())
    }

    pub async fn fetch(client: &FeedClient) -> Result<Self, AppError> {
        let payload = client.fetch().await?;
        let auction = Self::from_document(&payload.data)?;
        Ok(auction.with_origin(FeedOrigin {
            fetched_at: payload.fetched_at,
            status: payload.status,
        }))
    }

    fn with_origin(mut self, origin: FeedOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// All records, sorted by descending value.
    pub fn data(&self) -> &QueryView {
        &self.data
    }

    pub fn fit(&self) -> &FitSummary {
        &self.fit
    }

    pub fn origin(&self) -> Option<&FeedOrigin> {
        self.origin.as_ref()
    }
}
