use crate::error::Result;
use crate::storage::{column_error, Storage};
use crate::types::{Address, EventRecord, GameEvent, PayoutKind, PayoutRecord, PayoutStatus, Wei};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

pub struct EventStore<'a> {
    storage: &'a Storage,
}

impl<'a> EventStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Full event log in append order
    pub async fn load_events(&self) -> Result<Vec<EventRecord>> {
        self.load_events_since(0).await
    }

    /// Events with `sequence >= since`
    pub async fn load_events_since(&self, since: u64) -> Result<Vec<EventRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT sequence, round_id, payload, recorded_at
             FROM events WHERE sequence >= ?1 ORDER BY sequence ASC",
        )?;

        let since = i64::try_from(since).unwrap_or(i64::MAX);
        let event_iter = stmt.query_map(params![since], event_from_row)?;

        let mut events = Vec::new();
        for event in event_iter {
            events.push(event?);
        }

        Ok(events)
    }

    pub async fn load_payouts(&self) -> Result<Vec<PayoutRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT round_id, recipient, amount, kind, status
             FROM payouts ORDER BY id ASC",
        )?;

        let payout_iter = stmt.query_map([], payout_from_row)?;

        let mut payouts = Vec::new();
        for payout in payout_iter {
            payouts.push(payout?);
        }

        Ok(payouts)
    }

    pub async fn load_payouts_for(&self, recipient: &Address) -> Result<Vec<PayoutRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT round_id, recipient, amount, kind, status
             FROM payouts WHERE recipient = ?1 ORDER BY id ASC",
        )?;

        let payout_iter = stmt.query_map(params![recipient.as_str()], payout_from_row)?;

        let mut payouts = Vec::new();
        for payout in payout_iter {
            payouts.push(payout?);
        }

        Ok(payouts)
    }

    /// Sum of successful payouts per recipient, sorted by address.
    pub async fn paid_totals(&self) -> Result<Vec<(Address, Wei)>> {
        let mut totals: BTreeMap<Address, Wei> = BTreeMap::new();

        for payout in self.load_payouts().await? {
            if !payout.is_paid() {
                continue;
            }
            let total = totals.entry(payout.recipient.clone()).or_insert(Wei::ZERO);
            *total = total.checked_add(payout.amount).ok_or_else(|| {
                crate::GuessError::internal(format!(
                    "Paid total overflows for {}",
                    payout.recipient
                ))
            })?;
        }

        Ok(totals.into_iter().collect())
    }
}

pub(crate) fn insert_event(conn: &Connection, record: &EventRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO events (sequence, round_id, kind, payload, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.sequence as i64,
            record.round_id as i64,
            record.event.kind(),
            serde_json::to_string(&record.event)?,
            record.recorded_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub(crate) fn insert_payout(conn: &Connection, payout: &PayoutRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO payouts (round_id, recipient, amount, kind, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            payout.round_id as i64,
            payout.recipient.as_str(),
            payout.amount.to_string(),
            serde_json::to_string(&payout.kind)?,
            serde_json::to_string(&payout.status)?,
            Utc::now().timestamp(),
        ],
    )?;

    Ok(())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    let sequence: i64 = row.get(0)?;
    let round_id: i64 = row.get(1)?;
    let payload: String = row.get(2)?;
    let recorded_at_str: String = row.get(3)?;

    let event: GameEvent =
        serde_json::from_str(&payload).map_err(|_| column_error(2, "payload"))?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
        .map_err(|_| column_error(3, "recorded_at"))?
        .with_timezone(&Utc);

    Ok(EventRecord {
        sequence: sequence as u64,
        round_id: round_id as u64,
        recorded_at,
        event,
    })
}

fn payout_from_row(row: &Row<'_>) -> rusqlite::Result<PayoutRecord> {
    let round_id: i64 = row.get(0)?;
    let recipient_str: String = row.get(1)?;
    let amount_str: String = row.get(2)?;
    let kind_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;

    let kind: PayoutKind = serde_json::from_str(&kind_str).map_err(|_| column_error(3, "kind"))?;
    let status: PayoutStatus =
        serde_json::from_str(&status_str).map_err(|_| column_error(4, "status"))?;

    Ok(PayoutRecord {
        round_id: round_id as u64,
        recipient: Address::parse(&recipient_str).map_err(|_| column_error(1, "recipient"))?,
        amount: amount_str.parse().map_err(|_| column_error(2, "amount"))?,
        kind,
        status,
    })
}
