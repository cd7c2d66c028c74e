// libs/waitlist-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, RETURN_REPRESENTATION};

use crate::error::WaitlistError;
use crate::models::{
    AgendaSlot, ConfirmWrite, EntryStatus, OfferClaim, Patient, QuotaSnapshot, Waitlist,
    WaitlistEntry,
};
use crate::services::store::{check_transition, EntryStore};

const ENTRY_COLUMNS: &str = "id,waitlist_id,patient_id,status,added_at,updated_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ClaimOutcome {
    Claimed,
    Busy,
    Empty,
}

#[derive(Debug, Deserialize)]
struct ClaimResponse {
    outcome: ClaimOutcome,
    entry: Option<WaitlistEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ConfirmRpcOutcome {
    Confirmed,
    SlotTaken,
    StatusChanged,
    NotFound,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    outcome: ConfirmRpcOutcome,
    entry: Option<WaitlistEntry>,
    status: Option<EntryStatus>,
}

/// Entry store backed by Supabase PostgREST. Single-row transitions are
/// filtered `PATCH`es; multi-row transactions go through the SQL functions in
/// `sql/waitlist_engine.sql`.
pub struct SupabaseEntryStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseEntryStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn get_rows<T>(&self, path: &str) -> Result<Vec<T>, WaitlistError>
    where
        T: serde::de::DeserializeOwned,
    {
        let rows: Vec<T> = self.supabase.request(Method::GET, path, None, None).await?;
        Ok(rows)
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encoded(value: DateTime<Utc>) -> String {
    urlencoding::encode(&timestamp(value)).into_owned()
}

#[async_trait]
impl EntryStore for SupabaseEntryStore {
    async fn get_waitlist(&self, waitlist_id: Uuid) -> Result<Option<Waitlist>, WaitlistError> {
        let path = format!(
            "/rest/v1/waitlists?id=eq.{}&select=id,tenant_id,name,is_active,created_at",
            waitlist_id
        );
        let rows: Vec<Waitlist> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_active_waitlists(&self) -> Result<Vec<Waitlist>, WaitlistError> {
        let path = "/rest/v1/waitlists?is_active=eq.true\
                    &select=id,tenant_id,name,is_active,created_at&order=created_at.asc,id.asc";
        self.get_rows(path).await
    }

    async fn list_entries(&self, waitlist_id: Uuid) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let path = format!(
            "/rest/v1/waitlist_entries?waitlist_id=eq.{}&select={}&order=added_at.asc,id.asc",
            waitlist_id, ENTRY_COLUMNS
        );
        self.get_rows(&path).await
    }

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<WaitlistEntry>, WaitlistError> {
        let path = format!(
            "/rest/v1/waitlist_entries?id=eq.{}&select={}",
            entry_id, ENTRY_COLUMNS
        );
        let rows: Vec<WaitlistEntry> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_entry(
        &self,
        waitlist_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<WaitlistEntry>, WaitlistError> {
        let path = format!(
            "/rest/v1/waitlist_entries?waitlist_id=eq.{}&patient_id=eq.{}&select={}\
             &order=added_at.desc,id.desc&limit=1",
            waitlist_id, patient_id, ENTRY_COLUMNS
        );
        let rows: Vec<WaitlistEntry> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, WaitlistError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select=id,tenant_id,name,phone",
            patient_id
        );
        let rows: Vec<Patient> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn claim_next_waiting(
        &self,
        waitlist_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OfferClaim, WaitlistError> {
        let response: ClaimResponse = self
            .supabase
            .rpc(
                "claim_next_waitlist_entry",
                json!({ "p_waitlist_id": waitlist_id, "p_now": timestamp(now) }),
            )
            .await?;

        debug!("claim_next_waitlist_entry({}) -> {:?}", waitlist_id, response.outcome);

        match (response.outcome, response.entry) {
            (ClaimOutcome::Claimed, Some(entry)) => Ok(OfferClaim::Claimed(entry)),
            (ClaimOutcome::Busy, Some(entry)) => Ok(OfferClaim::Busy(entry)),
            (ClaimOutcome::Empty, _) => Ok(OfferClaim::Empty),
            (outcome, None) => Err(WaitlistError::Database(format!(
                "claim_next_waitlist_entry returned {:?} without an entry",
                outcome
            ))),
        }
    }

    async fn transition_entry(
        &self,
        entry_id: Uuid,
        expected: EntryStatus,
        next: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>, WaitlistError> {
        check_transition(expected, next)?;

        let path = format!(
            "/rest/v1/waitlist_entries?id=eq.{}&status=eq.{}&select={}",
            entry_id, expected, ENTRY_COLUMNS
        );
        let rows: Vec<WaitlistEntry> = self
            .supabase
            .request(
                Method::PATCH,
                &path,
                Some(json!({ "status": next, "updated_at": timestamp(now) })),
                Some(RETURN_REPRESENTATION),
            )
            .await?;

        if rows.is_empty() {
            debug!("Transition {} -> {} on entry {} matched no row", expected, next, entry_id);
        }
        Ok(rows.into_iter().next())
    }

    async fn confirm_entry(
        &self,
        waitlist_id: Uuid,
        entry_id: Uuid,
        expected: EntryStatus,
        now: DateTime<Utc>,
    ) -> Result<ConfirmWrite, WaitlistError> {
        let response: ConfirmResponse = self
            .supabase
            .rpc(
                "confirm_waitlist_entry",
                json!({
                    "p_waitlist_id": waitlist_id,
                    "p_entry_id": entry_id,
                    "p_expected": expected,
                    "p_now": timestamp(now),
                }),
            )
            .await?;

        match response.outcome {
            ConfirmRpcOutcome::Confirmed => response
                .entry
                .map(ConfirmWrite::Confirmed)
                .ok_or_else(|| WaitlistError::Database("confirm returned no entry".to_string())),
            ConfirmRpcOutcome::SlotTaken => Ok(ConfirmWrite::SlotTaken),
            ConfirmRpcOutcome::StatusChanged => response
                .status
                .map(ConfirmWrite::StatusChanged)
                .ok_or_else(|| WaitlistError::Database("confirm returned no status".to_string())),
            ConfirmRpcOutcome::NotFound => Err(WaitlistError::EntryNotFound),
        }
    }

    async fn expire_offers(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let path = format!(
            "/rest/v1/waitlist_entries?status=eq.{}&updated_at=lt.{}&select={}",
            EntryStatus::Notified,
            encoded(cutoff),
            ENTRY_COLUMNS
        );
        let rows: Vec<WaitlistEntry> = self
            .supabase
            .request(
                Method::PATCH,
                &path,
                Some(json!({ "status": EntryStatus::Expired, "updated_at": timestamp(now) })),
                Some(RETURN_REPRESENTATION),
            )
            .await?;
        Ok(rows)
    }

    async fn get_quota(&self, tenant_id: Uuid) -> Result<Option<QuotaSnapshot>, WaitlistError> {
        let path = format!(
            "/rest/v1/tenants?id=eq.{}&select=tenant_id:id,messages_sent,message_limit",
            tenant_id
        );
        let rows: Vec<QuotaSnapshot> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn increment_messages_sent(&self, tenant_id: Uuid) -> Result<i64, WaitlistError> {
        let sent: Option<i64> = self
            .supabase
            .rpc("increment_messages_sent", json!({ "p_tenant_id": tenant_id }))
            .await?;

        sent.ok_or_else(|| {
            warn!("increment_messages_sent found no tenant {}", tenant_id);
            WaitlistError::Database(format!("no quota record for tenant {}", tenant_id))
        })
    }

    async fn earliest_free_slot(
        &self,
        tenant_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<AgendaSlot>, WaitlistError> {
        let path = format!(
            "/rest/v1/agenda_slots?tenant_id=eq.{}&is_booked=eq.false&starts_at=gt.{}\
             &select=id,tenant_id,starts_at,ends_at,is_booked&order=starts_at.asc,id.asc&limit=1",
            tenant_id,
            encoded(after)
        );
        let rows: Vec<AgendaSlot> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_timestamps_are_url_safe() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
        assert_eq!(timestamp(at), "2026-10-19T14:30:00.000000Z");
        assert_eq!(encoded(at), "2026-10-19T14%3A30%3A00.000000Z");
    }

    #[test]
    fn test_claim_response_parses() {
        let raw = serde_json::json!({ "outcome": "empty", "entry": null });
        let parsed: ClaimResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(parsed.outcome, ClaimOutcome::Empty));
    }
}
