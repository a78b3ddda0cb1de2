use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::{bson::doc, Client};
use std::sync::Arc;

use crate::db::mongo;
use crate::models::usage::ApiUsage;

pub const DAILY_REQUEST_LIMIT: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The request may proceed; carries the counter value after this
    /// increment (at most `DAILY_REQUEST_LIMIT`).
    Allowed(i32),
    LimitReached,
}

/// Daily per-user request counter.
///
/// The counter is advanced with a conditional `find_one_and_update` so two
/// concurrent requests can never both slip past the limit; the counter value
/// itself never exceeds `DAILY_REQUEST_LIMIT`. Requires a unique index on
/// (user_id, usage_date).
pub struct QuotaService {
    client: Arc<Client>,
}

impl QuotaService {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Consume one unit of today's quota for the user. A request that fails
    /// later in the pipeline does not get its unit back.
    pub async fn consume(&self, user_id: ObjectId) -> Result<QuotaDecision, mongodb::error::Error> {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        self.consume_on(user_id, &today).await
    }

    pub async fn consume_on(
        &self,
        user_id: ObjectId,
        usage_date: &str,
    ) -> Result<QuotaDecision, mongodb::error::Error> {
        let collection = mongo::api_usage(&self.client);

        let filter = doc! {
            "user_id": user_id,
            "usage_date": usage_date,
            "request_count": { "$lt": DAILY_REQUEST_LIMIT }
        };
        let update = doc! { "$inc": { "request_count": 1 } };

        if let Some(updated) = collection
            .find_one_and_update(filter.clone(), update.clone())
            .return_document(ReturnDocument::After)
            .await?
        {
            return Ok(QuotaDecision::Allowed(updated.request_count));
        }

        // No row matched: either the user has no counter for today yet, or
        // the counter already sits at the limit.
        let fresh = ApiUsage {
            id: None,
            user_id,
            usage_date: usage_date.to_string(),
            request_count: 1,
        };

        match collection.insert_one(&fresh).await {
            Ok(_) => Ok(QuotaDecision::Allowed(1)),
            Err(err) if is_duplicate_key(&err) => {
                // Lost the first-request race; the row exists now, so one
                // more conditional increment settles it.
                match collection
                    .find_one_and_update(filter, update)
                    .return_document(ReturnDocument::After)
                    .await?
                {
                    Some(updated) => Ok(QuotaDecision::Allowed(updated.request_count)),
                    None => Ok(QuotaDecision::LimitReached),
                }
            }
            Err(err) => Err(err),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}
