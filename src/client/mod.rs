//! Remote task-store client facade.
//!
//! Grounded on `packages/python-sdk/octopoid_sdk/client.py`'s `OctopoidSDK`:
//! a thin `reqwest`-based REST client with bearer auth, JSON bodies, and a
//! handful of status-code-to-error mappings. There is exactly one source of
//! truth for task state - the remote server - so every write here is a
//! network call, not a local mutation.

mod error;
pub mod models;

pub use error::ClientError;
pub use models::*;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `"none"` - the default tenant, used when a project hasn't opted into
/// multi-tenant isolation. Every request still carries it explicitly so the
/// server never has to special-case an absent query parameter.
const DEFAULT_SCOPE: &str = "default";

#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    scope: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_scope(base_url, api_key, DEFAULT_SCOPE)
    }

    /// Grounded on `sdk.py::OctopoidSDK.__init__`'s `scope` parameter: every
    /// request this client issues carries it as a query parameter, enabling
    /// multi-tenant isolation on the server side (§4.5, §6.4).
    pub fn with_scope(base_url: impl Into<String>, api_key: impl Into<String>, scope: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            scope: scope.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl serde::Serialize>,
    ) -> Result<Option<T>, ClientError> {
        let mut req = self
            .http
            .request(method, self.url(path))
            .query(&[("scope", &self.scope)])
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else if e.is_connect() {
                ClientError::Connection(e.to_string())
            } else {
                ClientError::Request(e)
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthenticated),
            status if status.is_success() => {
                let value = response.json::<T>().await?;
                Ok(Some(value))
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    // --- Tasks ---

    pub async fn create_task(&self, task: &Task) -> Result<Task, ClientError> {
        self.request(reqwest::Method::POST, "/api/v1/tasks", Some(task))
            .await?
            .ok_or(ClientError::NotFound)
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, ClientError> {
        self.request::<Task>(reqwest::Method::GET, &format!("/api/v1/tasks/{id}"), None::<&()>)
            .await
    }

    pub async fn list_tasks(&self, filter: &TaskListFilter) -> Result<Vec<Task>, ClientError> {
        Ok(self
            .request(reqwest::Method::GET, "/api/v1/tasks", Some(filter))
            .await?
            .unwrap_or_default())
    }

    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Option<Task>, ClientError> {
        self.request(
            reqwest::Method::PATCH,
            &format!("/api/v1/tasks/{id}"),
            Some(update),
        )
        .await
    }

    pub async fn claim_task(&self, request: &ClaimRequest) -> Result<Option<Task>, ClientError> {
        self.request(reqwest::Method::POST, "/api/v1/tasks/claim", Some(request))
            .await
    }

    pub async fn submit_task(&self, id: &str, request: &SubmitRequest) -> Result<Option<Task>, ClientError> {
        self.request(
            reqwest::Method::POST,
            &format!("/api/v1/tasks/{id}/submit"),
            Some(request),
        )
        .await
    }

    pub async fn accept_task(&self, id: &str, request: &AcceptRequest) -> Result<Option<Task>, ClientError> {
        self.request(
            reqwest::Method::POST,
            &format!("/api/v1/tasks/{id}/accept"),
            Some(request),
        )
        .await
    }

    pub async fn reject_task(&self, id: &str, request: &RejectRequest) -> Result<Option<Task>, ClientError> {
        self.request(
            reqwest::Method::POST,
            &format!("/api/v1/tasks/{id}/reject"),
            Some(request),
        )
        .await
    }

    pub async fn requeue_task(&self, id: &str) -> Result<Option<Task>, ClientError> {
        self.request::<Task>(
            reqwest::Method::POST,
            &format!("/api/v1/tasks/{id}/requeue"),
            None::<&()>,
        )
        .await
    }

    pub async fn task_messages(&self, id: &str) -> Result<Vec<Message>, ClientError> {
        Ok(self
            .request(
                reqwest::Method::GET,
                &format!("/api/v1/tasks/{id}/messages"),
                None::<&()>,
            )
            .await?
            .unwrap_or_default())
    }

    // --- Flows ---

    /// `PUT /api/v1/flows/:name` - expands the server's accepted `queue`
    /// set to include every state this flow introduces (§3.4, §9).
    pub async fn register_flow(&self, name: &str, flow: &crate::flow::Flow) -> Result<(), ClientError> {
        let body = FlowRegistration {
            name: name.to_string(),
            states: flow.all_states().into_iter().map(str::to_string).collect(),
        };
        self.request::<serde_json::Value>(
            reqwest::Method::PUT,
            &format!("/api/v1/flows/{name}"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    // --- Orchestrators ---

    pub async fn register_orchestrator(&self, orchestrator_id: &str) -> Result<(), ClientError> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            orchestrator_id: &'a str,
        }
        self.request::<serde_json::Value>(
            reqwest::Method::POST,
            "/api/v1/orchestrators/register",
            Some(&Body { orchestrator_id }),
        )
        .await?;
        Ok(())
    }

    /// Cheap per-tick queue-count poll, used to decide whether claiming is
    /// even worth attempting before paying for a full `tasks.claim` round
    /// trip.
    pub async fn poll(&self, orchestrator_id: &str) -> Result<PollResult, ClientError> {
        #[derive(serde::Serialize)]
        struct Query<'a> {
            orchestrator_id: &'a str,
        }
        self.request(
            reqwest::Method::GET,
            "/scheduler/poll",
            Some(&Query { orchestrator_id }),
        )
        .await?
        .ok_or(ClientError::NotFound)
    }

    // --- Projects ---

    pub async fn create_project(&self, project: &Project) -> Result<Project, ClientError> {
        self.request(reqwest::Method::POST, "/api/v1/projects", Some(project))
            .await?
            .ok_or(ClientError::NotFound)
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, ClientError> {
        self.request(
            reqwest::Method::GET,
            &format!("/api/v1/projects/{id}"),
            None::<&()>,
        )
        .await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        Ok(self
            .request(reqwest::Method::GET, "/api/v1/projects", None::<&()>)
            .await?
            .unwrap_or_default())
    }

    // --- Actions ---
    //
    // Grounded on `test_actions.py`'s generic "offer the human a clickable
    // action" surface: `create` posts an action for the dashboard, and
    // `list`/`execute`/`complete`/`fail` round out the lifecycle a human
    // operator (or a future dashboard, out of scope here) drives it through.

    pub async fn create_action(&self, action: &ActionRequest) -> Result<(), ClientError> {
        self.request::<serde_json::Value>(reqwest::Method::POST, "/api/v1/actions", Some(action))
            .await?;
        Ok(())
    }

    pub async fn list_actions(&self, entity_id: Option<&str>) -> Result<Vec<Action>, ClientError> {
        #[derive(serde::Serialize, Default)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            entity_id: Option<&'a str>,
        }
        Ok(self
            .request(reqwest::Method::GET, "/api/v1/actions", Some(&Query { entity_id }))
            .await?
            .unwrap_or_default())
    }

    pub async fn execute_action(&self, id: &str) -> Result<(), ClientError> {
        self.request::<serde_json::Value>(
            reqwest::Method::POST,
            &format!("/api/v1/actions/{id}/execute"),
            None::<&()>,
        )
        .await?;
        Ok(())
    }

    pub async fn complete_action(&self, id: &str, result: Option<&str>) -> Result<(), ClientError> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            result: Option<&'a str>,
        }
        self.request::<serde_json::Value>(
            reqwest::Method::POST,
            &format!("/api/v1/actions/{id}/complete"),
            Some(&Body { result }),
        )
        .await?;
        Ok(())
    }

    pub async fn fail_action(&self, id: &str, reason: &str) -> Result<(), ClientError> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            reason: &'a str,
        }
        self.request::<serde_json::Value>(
            reqwest::Method::POST,
            &format!("/api/v1/actions/{id}/fail"),
            Some(&Body { reason }),
        )
        .await?;
        Ok(())
    }

    // --- Messages (message dispatcher inbox) ---

    pub async fn list_messages(&self, role: &str, message_type: &str) -> Result<Vec<Message>, ClientError> {
        let request = MessageDispatchRequest { role, message_type };
        Ok(self
            .request(reqwest::Method::GET, "/api/v1/messages", Some(&request))
            .await?
            .unwrap_or_default())
    }

    pub async fn post_message(&self, role: &str, message_type: &str, content: &str) -> Result<(), ClientError> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            role: &'a str,
            message_type: &'a str,
            content: &'a str,
        }
        self.request::<serde_json::Value>(
            reqwest::Method::POST,
            "/api/v1/messages",
            Some(&Body {
                role,
                message_type,
                content,
            }),
        )
        .await?;
        Ok(())
    }

    // --- System ---

    pub async fn health_check(&self) -> Result<HealthStatus, ClientError> {
        self.request(reqwest::Method::GET, "/api/v1/health", None::<&()>)
            .await?
            .ok_or(ClientError::NotFound)
    }
}

/// Build the orchestrator id used when claiming tasks: `{cluster}-{machine_id}`.
///
/// Grounded on `orchestrator/sdk.py::get_orchestrator_id`, which falls back
/// to the hostname when it can't determine a stable machine id.
pub fn orchestrator_id(cluster: &str) -> String {
    let machine_id = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("{cluster}-{machine_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestrator_id_includes_cluster_prefix() {
        let id = orchestrator_id("prod");
        assert!(id.starts_with("prod-"));
    }
}
