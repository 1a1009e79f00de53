//! HTTP operations against the sensor-cloud platform.
//!
//! Thin request/response wrappers around the platform's REST API:
//! - user login and registration (`/users/login`, `/users`)
//! - user lookup (`/users/{id}`)
//! - sensor registration and deletion (`/sensors`, `/sensors/{id}`)
//!
//! Success is HTTP 200 with a JSON body. Failures come back as typed
//! [`Error`](crate::error::Error) values: an auth rejection never tears
//! down the process, and sensor operations check session state before
//! touching the network.

mod session;

pub use session::Session;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request timeout for API calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ── Wire models ──────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default, rename = "userId")]
    user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SensorRequest<'a> {
    user_id: &'a str,
    /// The platform expects the field present even when unused.
    external_address: &'a str,
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
}

/// Registration body for `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub phone_number: String,
    pub password: String,
}

/// User record returned by `GET /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub phone_number: String,
}

// ── Client ───────────────────────────────────────────────────────

/// HTTP client for the platform's user and sensor API.
pub struct CloudClient {
    api_base: String,
    http: reqwest::Client,
}

impl CloudClient {
    /// Create a client for the given API base URL (trailing slash tolerated).
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Log a user in and record the returned user id on the session.
    ///
    /// A non-2xx status, an empty body, and a missing or empty `userId`
    /// all count as authentication failure; the session is left untouched
    /// in every failure case.
    pub async fn login(&self, session: &mut Session, username: &str, password: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.endpoint("/users/login"))
            .json(&LoginRequest {
                user_name: username,
                password,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::auth(format!("login rejected ({status})")));
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(Error::auth("login response was empty"));
        }
        let login: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| Error::protocol(format!("malformed login response: {e}")))?;

        let user_id = login
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::auth("login response carried no userId"))?;

        tracing::info!(user_id = %user_id, "logged in");
        session.authenticate(user_id);
        Ok(())
    }

    /// Register a new platform user and log the session in as them.
    ///
    /// Returns the new user id.
    pub async fn register_user(&self, session: &mut Session, user: &NewUser) -> Result<String> {
        let resp = self
            .http
            .post(self.endpoint("/users"))
            .json(user)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                operation: "user registration",
                status,
            });
        }

        let created: CreatedResponse = resp
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed registration response: {e}")))?;
        if created.id.is_empty() {
            return Err(Error::protocol("registration response carried an empty id"));
        }

        tracing::info!(user_id = %created.id, "registered user");
        session.authenticate(created.id.clone());
        Ok(created.id)
    }

    /// Fetch a user record by id.
    pub async fn fetch_user(&self, user_id: &str) -> Result<UserProfile> {
        let resp = self
            .http
            .get(self.endpoint(&format!("/users/{user_id}")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::auth(format!("user {user_id} not found ({status})")));
        }

        Ok(resp.json().await?)
    }

    /// Register a sensor for the logged-in user and record its id on the
    /// session. Requires a prior successful login.
    pub async fn register_sensor(&self, session: &mut Session) -> Result<String> {
        let user_id = session
            .user_id()
            .ok_or_else(|| Error::auth("log in before registering a sensor"))?
            .to_string();

        let resp = self
            .http
            .post(self.endpoint("/sensors"))
            .json(&SensorRequest {
                user_id: &user_id,
                external_address: "",
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                operation: "sensor registration",
                status,
            });
        }

        let created: CreatedResponse = resp
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed sensor response: {e}")))?;

        tracing::info!(sensor_id = %created.id, "registered sensor");
        session.attach_sensor(created.id.clone());
        Ok(created.id)
    }

    /// Delete the session's registered sensor.
    ///
    /// With no sensor registered this fails immediately, without issuing
    /// a request. On success the sensor id is cleared from the session.
    pub async fn delete_sensor(&self, session: &mut Session) -> Result<()> {
        let sensor_id = match session.sensor_id() {
            Some(id) => id.to_string(),
            None => return Err(Error::SensorNotRegistered),
        };

        let resp = self
            .http
            .delete(self.endpoint(&format!("/sensors/{sensor_id}")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                operation: "sensor deletion",
                status,
            });
        }

        tracing::info!(sensor_id = %sensor_id, "deleted sensor");
        session.detach_sensor();
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
