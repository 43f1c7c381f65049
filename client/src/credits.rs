//! Credit packs and purchases for the paid tier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    error::{Error, Result},
    http::HttpClient,
};

/// A purchasable bundle of generation credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPack {
    pub id: String,
    pub name: String,
    pub credits: u32,
    pub price_per_credit: f64,
    pub total_price: f64,
}

#[derive(Deserialize)]
struct PacksResponse {
    packs: Vec<CreditPack>,
}

#[derive(Serialize)]
struct PurchaseRequest<'a> {
    pack_id: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

/// Outcome of a purchase.
///
/// With a payment provider configured the backend returns a checkout URL to
/// open; otherwise it credits the account right away.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PurchaseResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_added: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
}

/// Credits service.
pub struct CreditsService {
    http: Arc<HttpClient>,
}

impl CreditsService {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Lists the available packs. No credential needed.
    pub async fn packs(&self) -> Result<Vec<CreditPack>> {
        let resp: PacksResponse = self.http.get("/api/credits/packs", &[]).await?;
        Ok(resp.packs)
    }

    /// Buys a pack for the signed-in user.
    pub async fn purchase(
        &self,
        pack_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<PurchaseResult> {
        if !self.http.is_authenticated() {
            return Err(Error::Config("buying credits needs an auth token".to_string()));
        }
        if pack_id.trim().is_empty() {
            return Err(Error::Validation("pack id must not be empty".to_string()));
        }

        let request = PurchaseRequest {
            pack_id,
            success_url,
            cancel_url,
        };
        let result: PurchaseResult = self.http.post("/api/credits/purchase", &request).await?;
        info!("purchase of {} accepted", pack_id);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_result_shapes() {
        let direct: PurchaseResult =
            serde_json::from_str(r#"{"success":true,"credits_added":15,"new_balance":18}"#).unwrap();
        assert_eq!(direct.credits_added, Some(15));
        assert_eq!(direct.new_balance, Some(18));
        assert_eq!(direct.checkout_url, None);

        let checkout: PurchaseResult =
            serde_json::from_str(r#"{"checkout_url":"https://pay.example/c/1"}"#).unwrap();
        assert_eq!(checkout.checkout_url.as_deref(), Some("https://pay.example/c/1"));
    }
}
