use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{controller, required_i64, session_err};
use crate::ipc::types::{AppState, Request};
use crate::nav::{Focus, KeyEvent};
use serde_json::json;

// Marks arrive as whatever the cell holds: typed text or a number.
fn raw_value(req: &Request) -> Result<String, serde_json::Value> {
    match req.params.get("value") {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_json::Value::Null) | None => Ok(String::new()),
        Some(other) => Err(err(
            &req.id,
            "bad_params",
            "value must be a string or number",
            Some(json!({ "value": other })),
        )),
    }
}

fn focus_param(req: &Request) -> Result<Option<Focus>, serde_json::Value> {
    let row = req.params.get("row").and_then(|v| v.as_i64());
    let col = req.params.get("col").and_then(|v| v.as_i64());
    match (row, col) {
        (None, None) => Ok(None),
        (Some(row), Some(col)) => Focus::from_coords(row, col).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "row must be >= 0 and col >= -1",
                Some(json!({ "row": row, "col": col })),
            )
        }),
        _ => Err(err(
            &req.id,
            "bad_params",
            "row and col must be given together",
            None,
        )),
    }
}

fn handle_grid_set_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let section_id = match required_i64(req, "sectionId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let raw = match raw_value(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctl.set_mark(student_id, section_id, &raw) {
        Ok(cell) => ok(
            &req.id,
            json!({
                "cell": cell,
                "stats": ctl.statistics(),
            }),
        ),
        Err(e) => session_err(req, e),
    }
}

fn handle_grid_focus(state: &mut AppState, req: &Request) -> serde_json::Value {
    let focus = match focus_param(req) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "bad_params", "missing row/col", None),
        Err(e) => return e,
    };
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctl.set_focus(focus) {
        Ok(view) => ok(&req.id, json!({ "focus": view })),
        Err(e) => session_err(req, e),
    }
}

fn handle_grid_key(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(key) = req.params.get("key").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing key", None);
    };
    let event = KeyEvent::parse(key);
    let focus = match focus_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Some(f) = focus {
        if let Err(e) = ctl.set_focus(f) {
            return session_err(req, e);
        }
    }
    match ctl.handle_key(event) {
        Ok(outcome) => ok(
            &req.id,
            json!({
                "outcome": outcome,
                "stats": ctl.statistics(),
            }),
        ),
        Err(e) => session_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grid.setMark" => Some(handle_grid_set_mark(state, req)),
        "grid.focus" => Some(handle_grid_focus(state, req)),
        "grid.key" => Some(handle_grid_key(state, req)),
        _ => None,
    }
}
