//! Design service: two-phase writes, reconciled listing and generation.
//!
//! Every write goes to the local store, and to the backend when a user is
//! signed in. The two phases are independent and never rolled back; the
//! returned [`SaveOutcome`] says what happened to each so the caller can word
//! a partial failure.

use tracing::{info, instrument, warn};

use kickforge_core::{Design, DesignId, reconcile};

use crate::api::ApiError;
use crate::error::{ClientError, Result, ValidationErrors, add_breadcrumb};
use crate::state::AppState;
use crate::toast::Toast;

/// Result of one phase of a two-phase write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseResult {
    Done,
    /// Not attempted because nobody is signed in.
    Skipped,
    Failed(String),
}

impl PhaseResult {
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Which write an outcome describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Save,
    Delete,
}

/// What happened to each phase of a design write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub kind: WriteKind,
    /// The design as it ended up, with any backend-assigned id.
    pub design_id: DesignId,
    pub local: PhaseResult,
    pub remote: PhaseResult,
}

impl SaveOutcome {
    /// Whether no phase failed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.local.is_failed() && !self.remote.is_failed()
    }

    /// The toast describing this outcome.
    #[must_use]
    pub fn toast(&self) -> Toast {
        let (done, verb) = match self.kind {
            WriteKind::Save => ("saved", "save"),
            WriteKind::Delete => ("deleted", "delete"),
        };
        match (&self.local, &self.remote) {
            (PhaseResult::Done, PhaseResult::Done) => Toast::success(format!("Design {done}.")),
            (PhaseResult::Done, PhaseResult::Skipped) => match self.kind {
                WriteKind::Save => Toast::info(
                    "Design saved on this device. Sign in to keep it in your account.",
                ),
                WriteKind::Delete => Toast::success("Design deleted."),
            },
            (PhaseResult::Done, PhaseResult::Failed(reason)) => Toast::warning(format!(
                "Design {done} on this device, but not in your account: {reason}"
            )),
            (PhaseResult::Failed(_), PhaseResult::Done) => Toast::warning(format!(
                "Design {done} in your account, but not on this device."
            )),
            _ => Toast::error(format!("Could not {verb} the design.")),
        }
    }
}

/// Design service.
pub struct DesignService<'a> {
    state: &'a AppState,
}

impl<'a> DesignService<'a> {
    /// Create a new design service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Save a design locally, and remotely when signed in.
    ///
    /// A signed-in user becomes the owner of an unowned design. If the backend
    /// stores the design under a different id, the local copy is re-keyed to
    /// match.
    #[instrument(skip(self, design), fields(design_id = %design.id))]
    pub async fn save(&self, mut design: Design) -> (Design, SaveOutcome) {
        let user = self.state.current_user().await;
        if design.owner.is_none() {
            design.owner = user.as_ref().map(|u| u.id.clone());
        }

        let local = self.save_local(&design).await;

        let remote = if user.is_some() {
            match self.state.api().save_design(&design).await {
                Ok(stored) => {
                    if stored.id != design.id {
                        design = self.rekey_local(&design, stored).await;
                    }
                    PhaseResult::Done
                }
                Err(e) => failed_remote(e),
            }
        } else {
            PhaseResult::Skipped
        };

        add_breadcrumb(
            "design",
            "Saved design",
            Some(&[("design_id", design.id.as_str())]),
        );
        let outcome = SaveOutcome {
            kind: WriteKind::Save,
            design_id: design.id.clone(),
            local,
            remote,
        };
        info!(local = ?outcome.local, remote = ?outcome.remote, "design saved");
        (design, outcome)
    }

    /// Delete a design locally, and remotely when signed in.
    ///
    /// A design that is already absent on either side counts as deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &DesignId) -> SaveOutcome {
        let local = match self.state.store().designs().delete(id).await {
            Ok(_) => PhaseResult::Done,
            Err(e) => failed_local(ClientError::Storage(e)),
        };

        let remote = if self.state.is_authenticated().await && !id.is_synthetic() {
            match self.state.api().delete_design(id).await {
                Ok(()) | Err(ApiError::NotFound(_)) => PhaseResult::Done,
                Err(e) => failed_remote(e),
            }
        } else {
            PhaseResult::Skipped
        };

        SaveOutcome {
            kind: WriteKind::Delete,
            design_id: id.clone(),
            local,
            remote,
        }
    }

    /// Local and (when signed in) remote designs, merged and newest first.
    ///
    /// A failing backend degrades to the local list.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the local store cannot be read.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Design>> {
        let user = self.state.current_user().await;
        let local: Vec<Design> = self
            .state
            .store()
            .designs()
            .list(None)
            .await?
            .into_iter()
            .filter(|d| match (&d.owner, &user) {
                (None, _) => true,
                (Some(owner), Some(user)) => *owner == user.id,
                (Some(_), None) => false,
            })
            .collect();

        let remote = if user.is_some() {
            match self.state.api().list_designs().await {
                Ok(remote) => remote,
                Err(e) => {
                    warn!(error = %e, "could not fetch remote designs; showing local only");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(reconcile(remote, local))
    }

    /// Generate a design from a text prompt and save it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty prompt, or the generator
    /// error. Save failures are reported in the outcome.
    #[instrument(skip(self))]
    pub async fn generate(&self, prompt: &str) -> Result<(Design, SaveOutcome)> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationErrors::field("prompt", "Describe the sneaker to generate").into());
        }

        let image = self.state.api().generate_image(prompt).await?;
        let owner = self.state.current_user().await.map(|u| u.id);
        Ok(self.save(Design::generated(prompt, image, owner)).await)
    }

    async fn save_local(&self, design: &Design) -> PhaseResult {
        match self.state.store().designs().save(design).await {
            Ok(()) => PhaseResult::Done,
            Err(e) => failed_local(ClientError::Storage(e)),
        }
    }

    /// Replace the local copy of `old` with the backend's version.
    async fn rekey_local(&self, old: &Design, stored: Design) -> Design {
        let designs = self.state.store().designs();
        if let Err(e) = designs.save(&stored).await {
            warn!(error = %e, "could not store backend copy of design");
            return old.clone();
        }
        if let Err(e) = designs.delete(&old.id).await {
            warn!(error = %e, "could not remove pre-save copy of design");
        }
        stored
    }
}

fn failed_local(e: ClientError) -> PhaseResult {
    e.report();
    PhaseResult::Failed(e.user_message())
}

fn failed_remote(e: ApiError) -> PhaseResult {
    let e = ClientError::Api(e);
    e.report();
    PhaseResult::Failed(e.user_message())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kickforge_core::{ColorMap, ColorValue, Email, PartName, User, UserId};
    use url::Url;

    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::ClientStore;
    use crate::toast::ToastLevel;

    fn state() -> AppState {
        let config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9").unwrap());
        AppState::with_store(config, ClientStore::in_memory()).unwrap()
    }

    fn design(name: &str) -> Design {
        let mut colors = ColorMap::new();
        colors.insert(
            PartName::parse("sole").unwrap(),
            ColorValue::parse("#112233").unwrap(),
        );
        Design::new(name, colors, None)
    }

    #[tokio::test]
    async fn test_anonymous_save_is_local_only() {
        let state = state();
        let (saved, outcome) = DesignService::new(&state).save(design("Court")).await;

        assert_eq!(outcome.local, PhaseResult::Done);
        assert_eq!(outcome.remote, PhaseResult::Skipped);
        assert!(outcome.is_complete());
        assert_eq!(outcome.toast().level, ToastLevel::Info);
        assert!(saved.owner.is_none());

        let listed = DesignService::new(&state).list().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_signed_in_save_reports_remote_failure() {
        let state = state();
        state
            .set_user(User {
                id: UserId::new("u1"),
                name: "Asha".to_owned(),
                email: Email::parse("asha@kickforge.in").unwrap(),
                profile_image_url: None,
                phone: None,
                verified: true,
            })
            .await
            .unwrap();

        let (saved, outcome) = DesignService::new(&state).save(design("Court")).await;
        assert_eq!(saved.owner, Some(UserId::new("u1")));
        assert_eq!(outcome.local, PhaseResult::Done);
        assert!(outcome.remote.is_failed());
        assert!(!outcome.is_complete());
        assert_eq!(outcome.toast().level, ToastLevel::Warning);

        // Remote listing fails too, so the local copy is still shown.
        let listed = DesignService::new(&state).list().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_design_counts_as_done() {
        let state = state();
        let outcome = DesignService::new(&state)
            .delete(&DesignId::new("missing"))
            .await;
        assert_eq!(outcome.local, PhaseResult::Done);
        assert_eq!(outcome.remote, PhaseResult::Skipped);
        assert_eq!(outcome.toast().message, "Design deleted.");
    }

    #[tokio::test]
    async fn test_list_hides_other_users_designs() {
        let state = state();
        let mut theirs = design("Theirs");
        theirs.owner = Some(UserId::new("someone-else"));
        state.store().designs().save(&theirs).await.unwrap();
        state.store().designs().save(&design("Mine")).await.unwrap();

        let listed = DesignService::new(&state).list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().unwrap().name, "Mine");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_prompt() {
        let state = state();
        let err = DesignService::new(&state).generate("   ").await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("prompt"));
    }

    #[test]
    fn test_toast_wording() {
        let outcome = SaveOutcome {
            kind: WriteKind::Save,
            design_id: DesignId::new("d"),
            local: PhaseResult::Failed("disk full".to_owned()),
            remote: PhaseResult::Skipped,
        };
        let toast = outcome.toast();
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.message, "Could not save the design.");

        let outcome = SaveOutcome {
            local: PhaseResult::Failed("disk full".to_owned()),
            remote: PhaseResult::Done,
            ..outcome
        };
        assert_eq!(outcome.toast().level, ToastLevel::Warning);
    }
}
