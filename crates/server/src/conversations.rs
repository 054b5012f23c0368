use axum::{
    extract::{Path, State},
    Json,
};
use hookrelay_core::{ConversationSummary, Customer, InboundMessage, InterfaceError};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::service::SharedService;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub id: String,
    pub name: String,
    pub customer: Customer,
    pub messages: Vec<InboundMessage>,
}

pub async fn list(State(service): State<SharedService>) -> Json<Vec<ConversationSummary>> {
    Json(service.store.list().await)
}

pub async fn detail(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = service.store.get(&id).await.ok_or_else(|| InterfaceError::NotFound {
        message: format!("conversation `{id}` not found"),
        correlation_id: Uuid::new_v4().to_string(),
    })?;

    Ok(Json(ConversationDetail {
        name: conversation.customer.display_name().to_string(),
        id: conversation.id,
        customer: conversation.customer,
        messages: conversation.messages,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use hookrelay_core::{Customer, InboundMessage, Sender};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::routes::router;
    use crate::testing::TestRelay;

    fn message(conversation_id: &str, content: &str, minutes_ago: i64) -> InboundMessage {
        InboundMessage {
            conversation_id: conversation_id.to_string(),
            sender: Sender::Customer,
            content: content.to_string(),
            received_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    async fn get(relay: &TestRelay, uri: &str) -> (StatusCode, Value) {
        let response = router(relay.service.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn list_returns_summaries_most_recent_first() {
        let relay = TestRelay::builder().build();
        let ada = Customer { name: Some("Ada".to_string()), phone_number: None };
        relay.service.store.append(&ada, message("older", "first", 10)).await;
        relay.service.store.append(&Customer::default(), message("newer", "second", 1)).await;

        let (status, body) = get(&relay, "/conversations").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "newer");
        assert_eq!(body[0]["name"], "Unknown");
        assert_eq!(body[1]["name"], "Ada");
        assert_eq!(body[1]["lastMessagePreview"], "first");
        assert_eq!(body[1]["messageCount"], 1);
    }

    #[tokio::test]
    async fn detail_returns_full_history() {
        let relay = TestRelay::builder().build();
        let customer = Customer { name: None, phone_number: Some("+905551112233".to_string()) };
        relay.service.store.append(&customer, message("c1", "Merhaba", 2)).await;
        relay.service.store.append(&Customer::default(), message("c1", "Orada mısınız?", 1)).await;

        let (status, body) = get(&relay, "/conversations/c1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "+905551112233");
        assert_eq!(body["customer"]["phoneNumber"], "+905551112233");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["messages"][1]["content"], "Orada mısınız?");
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let relay = TestRelay::builder().build();

        let (status, body) = get(&relay, "/conversations/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "The requested resource does not exist.");
        assert!(body["correlationId"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
