use uuid::Uuid;

use super::{
    entities::{Activity, ActivityPatch, NewActivity},
    transport::HttpRequest,
    ApiClient, ApiError,
};

impl ApiClient {
    pub async fn list_activities(&self, include_archived: bool) -> Result<Vec<Activity>, ApiError> {
        self.send(
            HttpRequest::get("/activities")
                .query([("include_archived", include_archived.to_string())]),
        )
        .await
    }

    pub async fn create_activity(&self, activity: &NewActivity) -> Result<Activity, ApiError> {
        self.send(HttpRequest::post("/activities").json(activity)?)
            .await
    }

    pub async fn update_activity(
        &self,
        id: Uuid,
        patch: &ActivityPatch,
    ) -> Result<Activity, ApiError> {
        self.send(HttpRequest::patch(format!("/activities/{id}")).json(patch)?)
            .await
    }

    pub async fn set_activity_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Activity, ApiError> {
        self.update_activity(
            id,
            &ActivityPatch {
                archived: Some(archived),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete_activity(&self, id: Uuid) -> Result<(), ApiError> {
        self.send_empty(HttpRequest::delete(format!("/activities/{id}")))
            .await
    }
}
