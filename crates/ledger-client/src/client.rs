//! REST client for the remote transaction ledger.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use ledger_sync_core::transactions::{
    LedgerClientTrait, LedgerWindow, NewTransaction, Period, RemoteResult, Transaction,
};

use crate::config::LedgerClientConfig;
use crate::error::{LedgerClientError, Result};
use crate::types::*;

const MAX_LOG_BODY_CHARS: usize = 512;
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Client for the ledger's transaction endpoints.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl LedgerClient {
    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Create a new ledger client.
    pub fn new(config: &LedgerClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| LedgerClientError::auth("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    fn transactions_url(&self) -> String {
        format!("{}/transactions", self.base_url)
    }

    fn transaction_url(&self, transaction_id: i64) -> String {
        format!("{}/transactions/{}", self.base_url, transaction_id)
    }

    fn period_url(&self, account_id: i64, period: &Period) -> String {
        format!(
            "{}/transactions/account/{}/period?startDate={}&endDate={}",
            self.base_url,
            account_id,
            period.start.format(QUERY_DATE_FORMAT),
            period.end.format(QUERY_DATE_FORMAT)
        )
    }

    fn api_error(status: reqwest::StatusCode, body: &str) -> LedgerClientError {
        if let Some(message) = serde_json::from_str::<ApiErrorResponse>(body)
            .ok()
            .and_then(|e| e.describe())
        {
            return LedgerClientError::api(status.as_u16(), message);
        }
        LedgerClientError::api(status.as_u16(), format!("Request failed: {}", body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>(),
                e
            );
            LedgerClientError::decode(format!("Failed to parse response: {}", e))
        })
    }

    /// Check the status of a response whose body may be empty.
    async fn parse_empty_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// POST /transactions
    pub async fn create(&self, new_transaction: &NewTransaction) -> Result<Transaction> {
        let url = self.transactions_url();
        let body = TransactionRequest::from(new_transaction);
        debug!(
            "Creating transaction for account {} in category {}",
            body.account_id, body.category_id
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        Self::parse_response::<TransactionResponse>(response)
            .await?
            .into_domain()
    }

    /// PUT /transactions/{id}
    pub async fn update(&self, transaction: &Transaction) -> Result<Transaction> {
        let transaction_id = transaction.id.confirmed().ok_or_else(|| {
            LedgerClientError::invalid_request(format!(
                "Cannot update unconfirmed transaction {}",
                transaction.id
            ))
        })?;
        let url = self.transaction_url(transaction_id);

        let response = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(&TransactionRequest::from(transaction))
            .send()
            .await?;

        Self::parse_response::<TransactionResponse>(response)
            .await?
            .into_domain()
    }

    /// DELETE /transactions/{id}
    pub async fn delete(&self, transaction_id: i64) -> Result<()> {
        let url = self.transaction_url(transaction_id);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        Self::parse_empty_response(response).await
    }

    /// GET /transactions/account/{accountId}/period?startDate=&endDate=
    ///
    /// Records that fail to decode are left out; their ids, when readable,
    /// are reported in `undecodable_ids`.
    pub async fn list_for_period(&self, account_id: i64, period: &Period) -> Result<LedgerWindow> {
        let url = self.period_url(account_id, period);
        debug!("Listing transactions: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        let items: Vec<serde_json::Value> = Self::parse_response(response).await?;
        let total = items.len();
        let mut window = LedgerWindow::default();
        let mut skipped = 0usize;
        for item in items {
            let listed_id = item.get("id").and_then(serde_json::Value::as_i64);
            match serde_json::from_value::<TransactionResponse>(item)
                .map_err(LedgerClientError::from)
                .and_then(TransactionResponse::into_domain)
            {
                Ok(tx) => window.transactions.push(tx),
                Err(e) => {
                    skipped += 1;
                    debug!("Undecodable ledger record for account {}: {}", account_id, e);
                    window.undecodable_ids.extend(listed_id);
                }
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} of {} undecodable ledger records for account {}",
                skipped, total, account_id
            );
        }
        debug!(
            "Ledger returned {} of {} records for account {}",
            window.transactions.len(),
            total,
            account_id
        );
        Ok(window)
    }
}

#[async_trait]
impl LedgerClientTrait for LedgerClient {
    async fn create_transaction(&self, new_transaction: &NewTransaction) -> RemoteResult<Transaction> {
        Ok(self.create(new_transaction).await?)
    }

    async fn update_transaction(&self, transaction: &Transaction) -> RemoteResult<Transaction> {
        Ok(self.update(transaction).await?)
    }

    async fn delete_transaction(&self, transaction_id: i64) -> RemoteResult<()> {
        Ok(self.delete(transaction_id).await?)
    }

    async fn list_transactions(
        &self,
        account_id: i64,
        period: &Period,
    ) -> RemoteResult<LedgerWindow> {
        Ok(self.list_for_period(account_id, period).await?)
    }
}
