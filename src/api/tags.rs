use uuid::Uuid;

use super::{
    entities::{NewTag, Tag},
    transport::HttpRequest,
    ApiClient, ApiError,
};

impl ApiClient {
    pub async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.send(HttpRequest::get("/tags")).await
    }

    pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ApiError> {
        self.send(HttpRequest::post("/tags").json(tag)?).await
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<(), ApiError> {
        self.send_empty(HttpRequest::delete(format!("/tags/{id}")))
            .await
    }
}
