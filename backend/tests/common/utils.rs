use axum::response::Response;
use http_body_util::BodyExt;

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Read the raw response body
pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Value of the `Location` header
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .expect("Location header missing")
        .to_str()
        .unwrap()
        .to_string()
}
