use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{confirmed, controller, session_err};
use crate::ipc::types::{AppState, Request};
use crate::model::{compute_total, effective_mark};
use crate::nav::FocusView;
use crate::session::{ConfigUpdate, SessionController};
use serde_json::json;

/// Everything a renderer needs to redraw from scratch.
pub fn snapshot(ctl: &SessionController) -> serde_json::Value {
    let s = ctl.session();
    let students: Vec<serde_json::Value> = s
        .students
        .iter()
        .enumerate()
        .map(|(row, st)| {
            let effective: Vec<i64> = s.sections.iter().map(|sec| effective_mark(st, sec)).collect();
            json!({
                "row": row,
                "id": st.id,
                "name": st.name,
                "marks": effective,
                "total": compute_total(st, &s.sections),
            })
        })
        .collect();

    json!({
        "title": s.title,
        "displayTitle": s.display_title(),
        "marking": ctl.is_marking(),
        "sections": s.sections,
        "hotkeys": s.hotkeys,
        "students": students,
        "focus": ctl.focus().map(FocusView::held),
        "stats": ctl.statistics(),
        "persistFailures": ctl.persist_failures(),
    })
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, snapshot(ctl))
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let s = ctl.session();
    ok(
        &req.id,
        json!({
            "title": s.title,
            "sections": s.sections,
            "hotkeys": s.hotkeys,
        }),
    )
}

fn handle_config_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params = if req.params.is_null() {
        json!({})
    } else {
        req.params.clone()
    };
    let update: ConfigUpdate = match serde_json::from_value(params) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = ctl.configure(update) {
        return session_err(req, e);
    }
    let s = ctl.session();
    ok(
        &req.id,
        json!({
            "title": s.title,
            "sections": s.sections,
            "hotkeys": s.hotkeys,
        }),
    )
}

fn handle_mode_enter_marking(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctl.enter_marking_mode() {
        Ok(()) => ok(&req.id, snapshot(ctl)),
        Err(e) => session_err(req, e),
    }
}

fn handle_session_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctl.reset_session(confirmed(req)) {
        Ok(()) => ok(&req.id, snapshot(ctl)),
        Err(e) => session_err(req, e),
    }
}

fn handle_stats_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!(ctl.statistics()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.get" => Some(handle_session_get(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "config.set" => Some(handle_config_set(state, req)),
        "mode.enterMarking" => Some(handle_mode_enter_marking(state, req)),
        "session.reset" => Some(handle_session_reset(state, req)),
        "stats.get" => Some(handle_stats_get(state, req)),
        _ => None,
    }
}
