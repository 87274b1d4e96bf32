//! HTTP routes for the chat page and its JSON API.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header::SET_COOKIE},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use regassist_core::CompletionClient;

use crate::{error::ApiError, session::Session, state::AppState};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Creates the router with all routes.
pub fn create_router<C>(state: AppState<C>) -> Router
where
    C: CompletionClient + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/ask", post(ask::<C>))
        .route("/reset", post(reset::<C>))
        .route("/health", get(health::<C>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    question: String,
    response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    sessions: usize,
    knowledge_base_chars: usize,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Answer a question within the caller's conversation.
///
/// A new session's cookie is returned with error responses too, so a failed
/// first question does not strand the session it created.
async fn ask<C>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    C: CompletionClient + 'static,
{
    let Json(body) = body?;
    let question = body.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Please enter a question".into()));
    }

    let session = state.sessions.resolve(&headers);
    let answer = {
        let mut conversation = session.conversation.lock().await;
        state.agent.ask(&mut conversation, question).await
    };

    let response = match answer {
        Ok(response) => response,
        Err(e) => return Ok(with_session_cookie(&session, ApiError::from(e))),
    };

    tracing::info!(session = %session.id, "question answered");

    let body = Json(AskResponse {
        question: question.to_string(),
        response,
    });
    Ok(with_session_cookie(&session, body))
}

/// Clear the caller's conversation.
async fn reset<C>(State(state): State<AppState<C>>, headers: HeaderMap) -> Response
where
    C: CompletionClient + 'static,
{
    let session = state.sessions.resolve(&headers);
    session.conversation.lock().await.reset();

    tracing::info!(session = %session.id, "conversation reset");

    let body = Json(ResetResponse {
        message: "Conversation reset".into(),
    });
    with_session_cookie(&session, body)
}

async fn health<C>(State(state): State<AppState<C>>) -> Json<HealthResponse>
where
    C: CompletionClient + 'static,
{
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
        knowledge_base_chars: state.agent.knowledge_base_chars(),
    })
}

fn with_session_cookie(session: &Session, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if let Some(cookie) = session.cookie() {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header::COOKIE};
    use tower::ServiceExt;

    use regassist_core::{Agent, Completion, CompletionRequest};
    use regassist_shared::{AgentConfig, RegAssistError, Result};

    use crate::session::SESSION_COOKIE;

    /// Replies with the turn count and the latest question.
    struct EchoClient;

    impl CompletionClient for EchoClient {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(Completion {
                text: format!("#{} {last}", request.messages.len()),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    struct FailingClient;

    impl CompletionClient for FailingClient {
        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<Completion> {
            Err(RegAssistError::Completion("API returned HTTP 529".into()))
        }
    }

    fn agent_config() -> AgentConfig {
        AgentConfig {
            model: "test-model".into(),
            max_tokens: 100,
            knowledge_base_path: PathBuf::from("unused.txt"),
        }
    }

    fn state<C: CompletionClient>(client: C) -> AppState<C> {
        AppState::new(Agent::new(client, &agent_config(), "registration facts"))
    }

    fn ask_request(question: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/ask").header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` part of the Set-Cookie header.
    fn session_cookie(response: &Response) -> String {
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn index_serves_chat_page() {
        let app = create_router(state(EchoClient));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("/ask"));
        assert!(html.contains("/reset"));
    }

    #[tokio::test]
    async fn ask_answers_and_starts_session() {
        let app = create_router(state(EchoClient));
        let response = app
            .oneshot(ask_request("  When does registration open?  ", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with(&format!("{SESSION_COOKIE}=")));
        let body = json_body(response).await;
        assert_eq!(body["question"], "When does registration open?");
        assert_eq!(body["response"], "#1 When does registration open?");
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let app = create_router(state(EchoClient));
        let response = app.oneshot(ask_request("   ", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Please enter a question" })
        );
    }

    #[tokio::test]
    async fn conversation_continues_within_session() {
        let app = create_router(state(EchoClient));

        let first = app.clone().oneshot(ask_request("Q1", None)).await.unwrap();
        let cookie = session_cookie(&first);

        let second = app
            .clone()
            .oneshot(ask_request("Q2", Some(&cookie)))
            .await
            .unwrap();
        assert!(second.headers().get(SET_COOKIE).is_none());
        // user, assistant, user
        assert_eq!(json_body(second).await["response"], "#3 Q2");

        let stranger = app.oneshot(ask_request("Q1", None)).await.unwrap();
        assert_eq!(json_body(stranger).await["response"], "#1 Q1");
    }

    #[tokio::test]
    async fn reset_clears_only_the_callers_conversation() {
        let app = create_router(state(EchoClient));

        let first = app.clone().oneshot(ask_request("Q1", None)).await.unwrap();
        let cookie = session_cookie(&first);

        let reset = app
            .clone()
            .oneshot(
                Request::post("/reset")
                    .header(COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(reset.status(), StatusCode::OK);
        assert_eq!(
            json_body(reset).await,
            serde_json::json!({ "message": "Conversation reset" })
        );

        let after = app.oneshot(ask_request("Q2", Some(&cookie))).await.unwrap();
        assert_eq!(json_body(after).await["response"], "#1 Q2");
    }

    #[tokio::test]
    async fn completion_failure_is_500_with_message() {
        let app = create_router(state(FailingClient));
        let response = app.oneshot(ask_request("Hi", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("529"));
    }

    #[tokio::test]
    async fn failed_first_question_still_hands_out_the_session() {
        let state = state(FailingClient);
        let app = create_router(state.clone());

        let first = app.clone().oneshot(ask_request("Hi", None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let cookie = session_cookie(&first);

        for _ in 0..2 {
            let retry = app
                .clone()
                .oneshot(ask_request("Hi", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(retry.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(retry.headers().get(SET_COOKIE).is_none());
        }

        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_gets_error_envelope() {
        let app = create_router(state(EchoClient));

        let no_content_type = app
            .clone()
            .oneshot(
                Request::post("/ask")
                    .body(Body::from(r#"{"question":"Hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(no_content_type.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(no_content_type).await["error"].is_string());

        let not_json = app
            .oneshot(
                Request::post("/ask")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(not_json).await["error"].is_string());
    }

    #[tokio::test]
    async fn health_reports_sessions_and_kb_size() {
        let app = create_router(state(EchoClient));
        app.clone().oneshot(ask_request("Q1", None)).await.unwrap();

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 1);
        assert_eq!(body["knowledge_base_chars"], "registration facts".len());
    }
}
