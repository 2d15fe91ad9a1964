use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::session::{SessionController, SessionError};

pub fn controller<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut SessionController, serde_json::Value> {
    state
        .session
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn confirmed(req: &Request) -> bool {
    req.params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

pub fn session_err(req: &Request, e: SessionError) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), None)
}
