use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, Error, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct JsonResponse<T> {
    pub(crate) status: String,
    pub(crate) message: String,
    pub(crate) code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) list: Option<Vec<T>>,
}

pub(crate) struct JsonResponseBuilder<T> {
    message: String,
    item: Option<T>,
    list: Option<Vec<T>>,
}

impl<T> Default for JsonResponseBuilder<T> {
    fn default() -> Self {
        Self {
            message: String::new(),
            item: None,
            list: None,
        }
    }
}

impl<T> JsonResponse<T>
where
    T: Serialize,
{
    pub(crate) fn build() -> JsonResponseBuilder<T> {
        JsonResponseBuilder::default()
    }
}

impl<T> JsonResponseBuilder<T>
where
    T: Serialize,
{
    pub(crate) fn set_msg<I: Into<String>>(mut self, msg: I) -> Self {
        self.message = msg.into();
        self
    }

    pub(crate) fn set_item(mut self, item: T) -> Self {
        self.item = Some(item);
        self
    }

    pub(crate) fn set_list(mut self, list: Vec<T>) -> Self {
        self.list = Some(list);
        self
    }

    fn to_json_response(self, status: StatusCode) -> JsonResponse<T> {
        JsonResponse {
            status: if status.is_success() { "OK" } else { "Error" }.to_string(),
            message: self.message,
            code: status.as_u16(),
            item: self.item,
            list: self.list,
        }
    }

    pub(crate) fn ok<I: Into<String>>(self, msg: I) -> web::Json<JsonResponse<T>> {
        web::Json(self.set_msg(msg).to_json_response(StatusCode::OK))
    }

    fn error<I: Into<String>>(self, status: StatusCode, msg: I) -> Error {
        let msg = msg.into();
        let body = self.set_msg(msg.clone()).to_json_response(status);
        InternalError::from_response(msg, HttpResponse::build(status).json(body)).into()
    }

    pub(crate) fn bad_request<I: Into<String>>(self, msg: I) -> Error {
        self.error(StatusCode::BAD_REQUEST, msg)
    }

    pub(crate) fn unauthorized<I: Into<String>>(self, msg: I) -> Error {
        self.error(StatusCode::UNAUTHORIZED, msg)
    }

    pub(crate) fn not_found<I: Into<String>>(self, msg: I) -> Error {
        self.error(StatusCode::NOT_FOUND, msg)
    }

    pub(crate) fn too_many_requests<I: Into<String>>(self, msg: I) -> Error {
        self.error(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub(crate) fn internal_server_error<I: Into<String>>(self, msg: I) -> Error {
        self.error(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn error_carries_status_and_message() {
        let err = JsonResponse::<String>::build().too_many_requests("Too many requests");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "Error");
        assert_eq!(body["code"], 429);
        assert_eq!(body["message"], "Too many requests");
        assert!(body.get("item").is_none());
    }

    #[test]
    fn ok_wraps_the_item() {
        let json = JsonResponse::build().set_item(7).ok("OK");
        assert_eq!(json.code, 200);
        assert_eq!(json.item, Some(7));
    }
}
