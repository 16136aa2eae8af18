//! Remote design endpoints.

use reqwest::Method;
use tracing::{instrument, warn};

use kickforge_core::{Design, DesignId};

use super::conversions::{design_body, design_from_value};
use super::types::{DesignEnvelope, DesignList};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Designs saved to the signed-in account.
    ///
    /// Records that cannot be normalized are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session.
    #[instrument(skip(self))]
    pub async fn list_designs(&self) -> Result<Vec<Design>, ApiError> {
        let request = self.request(Method::GET, &["api", "designs"])?;
        let list: DesignList = self.send_json(request).await?;

        Ok(list
            .into_vec()
            .into_iter()
            .filter_map(|record| match design_from_value(record) {
                Ok(design) => Some(design),
                Err(e) => {
                    warn!(error = %e, "skipping malformed remote design");
                    None
                }
            })
            .collect())
    }

    /// Save a design to the account. Returns the design as stored remotely.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the design.
    #[instrument(skip(self, design), fields(design_id = %design.id))]
    pub async fn save_design(&self, design: &Design) -> Result<Design, ApiError> {
        let request = self
            .request(Method::POST, &["api", "designs"])?
            .json(&design_body(design));
        let envelope: DesignEnvelope = self.send_json(request).await?;
        Ok(design_from_value(envelope.design)?)
    }

    /// Delete a design from the account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the backend has no such design.
    #[instrument(skip(self))]
    pub async fn delete_design(&self, id: &DesignId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &["api", "designs", id.as_str()])?;
        self.send_unit(request).await
    }
}
