// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rewards backend API client.
//!
//! Handles:
//! - Nearby restaurant and directions lookups
//! - Step sync, check-in and redemption submissions
//! - Points balance and reward listing
//! - Bearer-token short-circuit when no user is signed in
//! - Error classification (no response / non-2xx / malformed body)

use crate::error::{AppError, NetworkError, Result};
use crate::models::{
    CheckInRecord, Coordinate, Directions, PointsBalance, RedemptionReceipt, Restaurant, Reward,
    StepRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Body of a step sync submission. Always the cumulative count for the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSyncRequest {
    pub date: NaiveDate,
    pub step_count: u64,
    pub points_earned: u64,
}

/// Backend acknowledgement of a check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    pub restaurant_id: String,
    pub points_awarded: u64,
    /// Check-ins at this restaurant today, including this one
    pub count_today: u32,
}

/// Outcome of posting a check-in.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInResponse {
    Accepted(CheckInReceipt),
    /// The server enforced the daily cap.
    DailyLimitReached,
}

/// Narrow interface to the remote rewards API.
#[async_trait]
pub trait RewardsBackend: Send + Sync {
    /// Install or clear the bearer token for authenticated calls.
    fn set_auth_token(&self, token: Option<String>);

    async fn nearby_restaurants(
        &self,
        at: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<Restaurant>>;

    async fn directions(&self, from: Coordinate, to: Coordinate) -> Result<Directions>;

    async fn post_step_sync(&self, request: &StepSyncRequest) -> Result<StepRecord>;

    /// Today's check-ins at `restaurant_id` as the backend counts them.
    async fn check_in_count(&self, restaurant_id: &str, date: NaiveDate)
        -> Result<CheckInRecord>;

    async fn post_check_in(&self, restaurant_id: &str, at: Coordinate)
        -> Result<CheckInResponse>;

    async fn points_balance(&self) -> Result<PointsBalance>;

    async fn list_rewards(&self) -> Result<Vec<Reward>>;

    async fn redeem_reward(&self, reward_id: &str) -> Result<RedemptionReceipt>;
}

/// Error code the backend uses for the daily check-in cap.
const DAILY_LIMIT_CODE: &str = "daily_limit_reached";

#[derive(Deserialize)]
struct CheckInCountResponse {
    count: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// REST/JSON implementation of [`RewardsBackend`].
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current token, or `Unauthorized` before anything is sent.
    fn require_token(&self) -> Result<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(AppError::Unauthorized)
    }

    fn optional_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| NetworkError::NoResponse(e.to_string()).into())
    }

    /// Check response status and return error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if status == 401 {
            tracing::warn!("Backend rejected bearer token (401)");
        }

        Err(NetworkError::Status { status, body }.into())
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| NetworkError::MalformedBody(e.to_string()).into())
    }

    /// Authenticated GET with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self.require_token()?;
        let response = self
            .send(self.http.get(self.url(path)).query(query).bearer_auth(token))
            .await?;
        Self::check_response_json(response).await
    }

    /// GET that attaches the token when one is present.
    async fn get_json_public<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.http.get(self.url(path)).query(query);
        if let Some(token) = self.optional_token() {
            request = request.bearer_auth(token);
        }
        let response = self.send(request).await?;
        Self::check_response_json(response).await
    }

    /// Authenticated POST with JSON body and response.
    async fn post_json<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.require_token()?;
        let response = self
            .send(self.http.post(self.url(path)).bearer_auth(token).json(body))
            .await?;
        Self::check_response_json(response).await
    }
}

fn format_coordinate(c: &Coordinate) -> String {
    format!("{},{}", c.latitude(), c.longitude())
}

#[async_trait]
impl RewardsBackend for HttpBackend {
    fn set_auth_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    async fn nearby_restaurants(
        &self,
        at: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<Restaurant>> {
        self.get_json_public(
            "/restaurants/nearby",
            &[
                ("lat", at.latitude().to_string()),
                ("lng", at.longitude().to_string()),
                ("radius", radius_meters.to_string()),
            ],
        )
        .await
    }

    async fn directions(&self, from: Coordinate, to: Coordinate) -> Result<Directions> {
        self.get_json_public(
            "/directions",
            &[
                ("origin", format_coordinate(&from)),
                ("destination", format_coordinate(&to)),
            ],
        )
        .await
    }

    async fn post_step_sync(&self, request: &StepSyncRequest) -> Result<StepRecord> {
        self.post_json("/steps/sync", request).await
    }

    async fn check_in_count(
        &self,
        restaurant_id: &str,
        date: NaiveDate,
    ) -> Result<CheckInRecord> {
        let response: CheckInCountResponse = self
            .get_json(
                "/check-ins/count",
                &[
                    ("restaurantId", restaurant_id.to_string()),
                    ("date", crate::time_utils::format_calendar_date(date)),
                ],
            )
            .await?;
        Ok(CheckInRecord {
            restaurant_id: restaurant_id.to_string(),
            date,
            count: response.count,
        })
    }

    async fn post_check_in(
        &self,
        restaurant_id: &str,
        at: Coordinate,
    ) -> Result<CheckInResponse> {
        let token = self.require_token()?;
        let body = serde_json::json!({
            "restaurantId": restaurant_id,
            "coordinate": at,
        });

        let response = self
            .send(
                self.http
                    .post(self.url("/check-ins"))
                    .bearer_auth(token)
                    .json(&body),
            )
            .await?;

        // The cap is a business outcome, not a failure
        if response.status().as_u16() == 409 {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_default();
            if code == DAILY_LIMIT_CODE {
                return Ok(CheckInResponse::DailyLimitReached);
            }
            return Err(NetworkError::Status { status: 409, body }.into());
        }

        let receipt: CheckInReceipt = Self::check_response_json(response).await?;
        Ok(CheckInResponse::Accepted(receipt))
    }

    async fn points_balance(&self) -> Result<PointsBalance> {
        let balance: PointsBalance = self.get_json("/points", &[]).await?;
        Ok(PointsBalance::confirmed(balance.total))
    }

    async fn list_rewards(&self) -> Result<Vec<Reward>> {
        self.get_json("/rewards", &[]).await
    }

    async fn redeem_reward(&self, reward_id: &str) -> Result<RedemptionReceipt> {
        let path = format!("/rewards/{}/redeem", reward_id);
        self.post_json(&path, &serde_json::json!({})).await
    }
}
