/// GET /ping
pub async fn ping() -> &'static str {
    "OK"
}
