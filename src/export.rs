//! Read-only exports of a session: CSV text and the model a document
//! renderer turns into the printed report.

use crate::model::{
    compute_statistics, compute_total, effective_mark, round_off_1_decimal, Section, Session,
};
use chrono::NaiveDate;
use serde::Serialize;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn column_header(section: &Section) -> String {
    format!("{} ({})", section.name, section.max_marks)
}

/// Unset marks export as 0 here, unlike the live grid; totals still use
/// effective marks.
pub fn marks_csv(session: &Session) -> String {
    let mut csv = String::from("Name");
    for sec in &session.sections {
        csv.push(',');
        csv.push_str(&csv_quote(&column_header(sec)));
    }
    csv.push_str(",Total\n");

    for student in &session.students {
        csv.push_str(&format!("\"{}\"", student.name.replace('"', "\"\"")));
        for sec in &session.sections {
            let stored = student.marks.get(&sec.id).copied().unwrap_or(0);
            csv.push_str(&format!(",{}", stored));
        }
        csv.push_str(&format!(
            ",{}\n",
            compute_total(student, &session.sections)
        ));
    }
    csv
}

pub fn csv_file_name(date: NaiveDate) -> String {
    format!("marks_{}.csv", date.format("%Y-%m-%d"))
}

fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_id: i64,
    pub name: String,
    pub marks: Vec<i64>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub max_possible: i64,
    pub count: usize,
    pub average: Option<f64>,
    pub high: Option<i64>,
    pub low: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    pub title: String,
    pub date: String,
    pub file_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub stats: ReportStats,
}

/// Marks here are effective values, matching what the grid shows.
pub fn session_report(session: &Session, date: NaiveDate) -> ReportModel {
    let title = session.display_title().to_string();

    let mut columns = Vec::with_capacity(session.sections.len() + 2);
    columns.push("Name".to_string());
    columns.extend(session.sections.iter().map(column_header));
    columns.push("Total".to_string());

    let rows = session
        .students
        .iter()
        .map(|s| ReportRow {
            student_id: s.id,
            name: s.name.clone(),
            marks: session
                .sections
                .iter()
                .map(|sec| effective_mark(s, sec))
                .collect(),
            total: compute_total(s, &session.sections),
        })
        .collect();

    let stats = compute_statistics(&session.students, &session.sections);

    ReportModel {
        file_name: format!("{}_report.pdf", slug(&title)),
        title,
        date: date.format("%Y-%m-%d").to_string(),
        columns,
        rows,
        stats: ReportStats {
            max_possible: stats.max_possible,
            count: stats.count,
            average: stats.average.map(round_off_1_decimal),
            high: stats.high,
            low: stats.low,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Student;

    fn session() -> Session {
        let mut s = Session::with_defaults();
        s.students.push(Student {
            id: 10,
            name: "Doe, \"JJ\"".to_string(),
            marks: [(1, 16)].into_iter().collect(),
        });
        s.students.push(Student {
            id: 11,
            name: "Bo".to_string(),
            marks: [(1, 20), (2, 19), (3, 58)].into_iter().collect(),
        });
        s
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).expect("date")
    }

    #[test]
    fn csv_exports_unset_as_zero_but_totals_effective() {
        let csv = marks_csv(&session());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Name,Reading (20),Listening (20),Speaking (60),Total"
        );
        assert_eq!(lines[1], "\"Doe, \"\"JJ\"\"\",16,0,0,96");
        assert_eq!(lines[2], "\"Bo\",20,19,58,97");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_name_carries_date() {
        assert_eq!(csv_file_name(date()), "marks_2026-03-09.csv");
    }

    #[test]
    fn report_uses_effective_marks_and_no_action_column() {
        let model = session_report(&session(), date());
        assert_eq!(model.title, "Marking Session");
        assert_eq!(model.file_name, "marking_session_report.pdf");
        assert_eq!(model.date, "2026-03-09");
        assert_eq!(
            model.columns,
            vec!["Name", "Reading (20)", "Listening (20)", "Speaking (60)", "Total"]
        );
        assert_eq!(model.rows[0].marks, vec![16, 20, 60]);
        assert_eq!(model.rows[0].total, 96);
        assert_eq!(model.stats.count, 2);
        assert_eq!(model.stats.average, Some(96.5));
        assert_eq!(model.stats.high, Some(97));
        assert_eq!(model.stats.low, Some(96));
    }

    #[test]
    fn report_file_name_slugs_title() {
        let mut s = session();
        s.title = "Oral Test: 3B/Spring".to_string();
        assert_eq!(
            session_report(&s, date()).file_name,
            "oral_test__3b_spring_report.pdf"
        );
    }

    #[test]
    fn report_without_named_students_has_no_stats() {
        let mut s = Session::with_defaults();
        s.students.push(Student {
            id: 1,
            name: " ".to_string(),
            marks: Default::default(),
        });
        let model = session_report(&s, date());
        assert_eq!(model.rows.len(), 1);
        assert_eq!(model.stats.count, 0);
        assert_eq!(model.stats.average, None);
    }
}
