use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{confirmed, controller, required_i64, session_err};
use crate::ipc::types::{AppState, Request};
use crate::nav::{Focus, FocusView};
use serde_json::json;

fn handle_students_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let row = ctl.add_student();
    let student_id = ctl.session().students[row].id;
    let focus = if ctl.is_marking() {
        ctl.set_focus(Focus::Name { row }).ok()
    } else {
        None
    };
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "row": row,
            "focus": focus,
        }),
    )
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = ctl.delete_student(student_id, confirmed(req)) {
        return session_err(req, e);
    }
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "remaining": ctl.session().students.len(),
            "focus": ctl.focus().map(FocusView::held),
            "stats": ctl.statistics(),
        }),
    )
}

fn handle_students_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(name) = req.params.get("name").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = ctl.rename_student(student_id, name.to_string()) {
        return session_err(req, e);
    }
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "stats": ctl.statistics(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.add" => Some(handle_students_add(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.rename" => Some(handle_students_rename(state, req)),
        _ => None,
    }
}
