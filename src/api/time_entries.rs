use uuid::Uuid;

use super::{
    entities::{EntryPatch, EntryRange, NewTimeEntry, StartTimer, TimeEntry},
    transport::HttpRequest,
    ApiClient, ApiError,
};

impl ApiClient {
    pub async fn list_entries(&self, range: &EntryRange) -> Result<Vec<TimeEntry>, ApiError> {
        self.send(HttpRequest::get("/time-entries").query(range.query()))
            .await
    }

    /// The running entry, if any. The backend answers either `null` or 404 when nothing runs.
    pub async fn active_entry(&self) -> Result<Option<TimeEntry>, ApiError> {
        match self
            .send::<Option<TimeEntry>>(HttpRequest::get("/time-entries/active"))
            .await
        {
            Err(e) if e.is_not_found() => Ok(None),
            other => other,
        }
    }

    pub async fn start_timer(&self, activity_id: Uuid) -> Result<TimeEntry, ApiError> {
        self.send(HttpRequest::post("/time-entries/start").json(&StartTimer { activity_id })?)
            .await
    }

    pub async fn stop_timer(&self, id: Uuid) -> Result<TimeEntry, ApiError> {
        self.send(HttpRequest::post(format!("/time-entries/{id}/stop")))
            .await
    }

    pub async fn create_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, ApiError> {
        self.send(HttpRequest::post("/time-entries").json(entry)?)
            .await
    }

    pub async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> Result<TimeEntry, ApiError> {
        self.send(HttpRequest::patch(format!("/time-entries/{id}")).json(patch)?)
            .await
    }

    pub async fn delete_entry(&self, id: Uuid) -> Result<(), ApiError> {
        self.send_empty(HttpRequest::delete(format!("/time-entries/{id}")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::function;
    use uuid::Uuid;

    use crate::{
        api::{
            entities::User,
            transport::{HttpRequest, HttpResponse, Method, MockTransport},
            ApiClient,
        },
        session::AuthStore,
    };

    async fn client(transport: MockTransport) -> ApiClient {
        let store = AuthStore::in_memory();
        store
            .sign_in(
                User {
                    id: Uuid::nil(),
                    email: "ada@example.com".into(),
                    name: None,
                },
                "a1".into(),
                None,
            )
            .await
            .unwrap();
        ApiClient::new(Box::new(transport), Arc::new(store))
    }

    #[tokio::test]
    async fn missing_active_entry_is_none() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(404, r#"{"detail":"No running entry"}"#)));
        assert_eq!(client(transport).await.active_entry().await.unwrap(), None);

        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "null")));
        assert_eq!(client(transport).await.active_entry().await.unwrap(), None);
    }

    #[tokio::test]
    async fn start_posts_activity_id() {
        let activity = Uuid::from_u128(7);
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(function(move |r: &HttpRequest| {
                r.method == Method::Post
                    && r.path == "/time-entries/start"
                    && r.body == Some(serde_json::json!({ "activity_id": activity }))
            }))
            .times(1)
            .returning(move |_| {
                Ok(HttpResponse::new(
                    200,
                    serde_json::json!({
                        "id": Uuid::from_u128(1),
                        "owner_id": Uuid::nil(),
                        "activity_id": activity,
                        "start": "2025-01-01T10:00:00Z",
                    })
                    .to_string(),
                ))
            });

        let entry = client(transport).await.start_timer(activity).await.unwrap();
        assert!(entry.is_running());
        assert_eq!(entry.activity_id, activity);
    }
}
