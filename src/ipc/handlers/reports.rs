use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::controller;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_reports_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let csv = export::marks_csv(ctl.session());
    let file_name = export::csv_file_name(chrono::Local::now().date_naive());
    let rows_exported = ctl.session().students.len();

    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    };
    if let Some(out_path) = &out_path {
        let out = PathBuf::from(out_path);
        if let Some(parent) = out.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return err(
                    &req.id,
                    "io_failed",
                    e.to_string(),
                    Some(json!({ "path": out_path })),
                );
            }
        }
        if let Err(e) = std::fs::write(&out, &csv) {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            );
        }
    }

    ok(
        &req.id,
        json!({
            "fileName": file_name,
            "path": out_path,
            "rowsExported": rows_exported,
            "csv": csv,
        }),
    )
}

fn handle_reports_session_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ctl = match controller(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let model = export::session_report(ctl.session(), chrono::Local::now().date_naive());
    ok(&req.id, json!(model))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.csv" => Some(handle_reports_csv(state, req)),
        "reports.sessionModel" => Some(handle_reports_session_model(state, req)),
        _ => None,
    }
}
