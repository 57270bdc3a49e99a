//! Dispute manager.
//!
//! Contestants file disputes about a match; administrators review and
//! resolve them. `admin_notes` never leave this module for non-admins.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{DisputeError, DisputeResult};
use super::models::{Dispute, DisputeId, DisputeMessage, DisputeStatus, NewDispute, Resolution};
use crate::db::{DisputeFilter, Repository};
use crate::events::{ChangeAction, EventHub, Topic};
use crate::matches::models::{MAX_MESSAGE_LEN, MatchId};
use crate::profile::models::PlayerId;

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5000;

fn required_text(field: &str, value: &str, max: usize) -> DisputeResult<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(DisputeError::InvalidInput(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(value.to_string())
}

/// Dispute manager
#[derive(Clone)]
pub struct DisputeManager {
    repo: Arc<dyn Repository>,
    events: EventHub,
}

impl DisputeManager {
    pub fn new(repo: Arc<dyn Repository>, events: EventHub) -> Self {
        Self { repo, events }
    }

    /// File a dispute against the caller's opponent in `match_id`
    pub async fn raise(
        &self,
        match_id: MatchId,
        reporter: PlayerId,
        request: NewDispute,
    ) -> DisputeResult<Dispute> {
        let m = self
            .repo
            .get_match(match_id)
            .await?
            .ok_or(DisputeError::MatchNotFound)?;
        let against_id = m.opponent_of(reporter).ok_or(DisputeError::NotParticipant)?;

        let title = required_text("title", &request.title, MAX_TITLE_LEN)?;
        let description = required_text("description", &request.description, MAX_DESCRIPTION_LEN)?;

        let open = self
            .repo
            .list_disputes(&DisputeFilter {
                match_id: Some(match_id),
                involving: Some(reporter),
                status: None,
            })
            .await?;
        if open
            .iter()
            .any(|d| d.reported_by_id == reporter && d.status.is_open())
        {
            return Err(DisputeError::AlreadyOpen);
        }

        let now = Utc::now();
        let dispute = Dispute {
            id: Uuid::new_v4(),
            match_id,
            reported_by_id: reporter,
            against_id,
            kind: request.kind,
            title,
            description,
            status: DisputeStatus::Pending,
            resolution: None,
            resolution_type: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_dispute(&dispute).await?;

        log::info!(
            "Dispute {} ({}) filed on match {match_id} by {reporter}",
            dispute.id,
            dispute.kind.as_str()
        );
        self.publish(&dispute, ChangeAction::Insert);
        Ok(dispute)
    }

    /// Fetch a dispute; parties get a redacted copy
    pub async fn get(&self, dispute_id: DisputeId, caller: PlayerId) -> DisputeResult<Dispute> {
        let dispute = self.load(dispute_id).await?;
        if self.repo.is_admin(caller).await? {
            return Ok(dispute);
        }
        if dispute.involves(caller) {
            return Ok(dispute.redacted());
        }
        Err(DisputeError::Unauthorized)
    }

    /// Administrators see every dispute matching `filter`; players only
    /// the ones they are party to.
    pub async fn list(
        &self,
        caller: PlayerId,
        mut filter: DisputeFilter,
    ) -> DisputeResult<Vec<Dispute>> {
        if self.repo.is_admin(caller).await? {
            return Ok(self.repo.list_disputes(&filter).await?);
        }
        filter.involving = Some(caller);
        Ok(self
            .repo
            .list_disputes(&filter)
            .await?
            .into_iter()
            .map(Dispute::redacted)
            .collect())
    }

    /// Administrator picks up a pending dispute
    pub async fn review(&self, dispute_id: DisputeId, admin: PlayerId) -> DisputeResult<Dispute> {
        self.ensure_admin(admin).await?;
        let mut dispute = self.load(dispute_id).await?;

        dispute.status = DisputeStatus::UnderReview;
        dispute.updated_at = Utc::now();
        self.apply(&dispute, &[DisputeStatus::Pending]).await?;

        log::info!("Dispute {dispute_id} under review by {admin}");
        self.publish(&dispute, ChangeAction::Update);
        Ok(dispute)
    }

    /// Close a dispute with an administrator decision
    pub async fn resolve(
        &self,
        dispute_id: DisputeId,
        admin: PlayerId,
        decision: Resolution,
    ) -> DisputeResult<Dispute> {
        self.ensure_admin(admin).await?;
        let resolution = required_text("resolution", &decision.resolution, MAX_DESCRIPTION_LEN)?;
        let mut dispute = self.load(dispute_id).await?;

        dispute.status = decision.resolution_type.final_status();
        dispute.resolution = Some(resolution);
        dispute.resolution_type = Some(decision.resolution_type);
        dispute.admin_notes = decision
            .admin_notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        dispute.updated_at = Utc::now();
        self.apply(&dispute, &[DisputeStatus::Pending, DisputeStatus::UnderReview])
            .await?;

        log::info!(
            "Dispute {dispute_id} {} by {admin} ({})",
            dispute.status.as_str(),
            decision.resolution_type.as_str()
        );
        self.publish(&dispute, ChangeAction::Update);
        Ok(dispute)
    }

    /// Add to the dispute thread as a party or administrator
    pub async fn post_message(
        &self,
        dispute_id: DisputeId,
        caller: PlayerId,
        text: &str,
    ) -> DisputeResult<DisputeMessage> {
        let dispute = self.load(dispute_id).await?;
        self.ensure_party_or_admin(&dispute, caller).await?;
        if !dispute.status.is_open() {
            return Err(DisputeError::InvalidState(dispute.status));
        }

        let message = DisputeMessage {
            id: Uuid::new_v4(),
            dispute_id,
            sender_id: caller,
            message: required_text("message", text, MAX_MESSAGE_LEN)?,
            created_at: Utc::now(),
        };
        self.repo.insert_dispute_message(&message).await?;
        Ok(message)
    }

    /// Dispute thread, oldest first
    pub async fn messages(
        &self,
        dispute_id: DisputeId,
        caller: PlayerId,
    ) -> DisputeResult<Vec<DisputeMessage>> {
        let dispute = self.load(dispute_id).await?;
        self.ensure_party_or_admin(&dispute, caller).await?;
        Ok(self.repo.list_dispute_messages(dispute_id).await?)
    }

    async fn load(&self, dispute_id: DisputeId) -> DisputeResult<Dispute> {
        self.repo
            .get_dispute(dispute_id)
            .await?
            .ok_or(DisputeError::NotFound)
    }

    /// Conditional write; a status that moved underneath is reported as-is
    async fn apply(&self, dispute: &Dispute, from: &[DisputeStatus]) -> DisputeResult<()> {
        if self.repo.update_dispute(dispute, from).await? {
            return Ok(());
        }
        let current = self.load(dispute.id).await?;
        Err(DisputeError::InvalidState(current.status))
    }

    async fn ensure_admin(&self, player_id: PlayerId) -> DisputeResult<()> {
        if self.repo.is_admin(player_id).await? {
            Ok(())
        } else {
            log::warn!("Player {player_id} attempted an administrator dispute action");
            Err(DisputeError::AdminRequired)
        }
    }

    async fn ensure_party_or_admin(&self, dispute: &Dispute, caller: PlayerId) -> DisputeResult<()> {
        if dispute.involves(caller) || self.repo.is_admin(caller).await? {
            Ok(())
        } else {
            Err(DisputeError::Unauthorized)
        }
    }

    fn publish(&self, dispute: &Dispute, action: ChangeAction) {
        self.events.publish_change(
            Topic::Disputes,
            action,
            dispute.id,
            Some(dispute.match_id),
            &dispute.clone().redacted(),
        );
    }
}
