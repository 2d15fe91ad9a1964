use crate::model::{
    self, clamp_mark, compute_statistics, effective_mark, HotkeyBinding, Section, Session,
    Statistics, Student, MAX_SECTION_MARKS,
};
use crate::nav::{self, Advance, Decision, Focus, FocusView, GridShape, KeyEvent};
use crate::persist::Gateway;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no sections configured")]
    NoSections,

    #[error("{action} requires confirmation")]
    ConfirmationRequired { action: &'static str },

    #[error("student not found: {0}")]
    StudentNotFound(i64),

    #[error("section not found: {0}")]
    SectionNotFound(i64),

    #[error("not in marking mode")]
    NotMarking,

    #[error("configuration cannot change while marking")]
    MarkingActive,

    #[error("focus is outside the grid")]
    FocusOutOfRange,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSections => "no_sections",
            Self::ConfirmationRequired { .. } => "confirmation_required",
            Self::StudentNotFound(_) | Self::SectionNotFound(_) => "not_found",
            Self::NotMarking => "not_marking",
            Self::MarkingActive => "marking_active",
            Self::FocusOutOfRange | Self::InvalidConfig(_) => "bad_params",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub max_marks: i64,
}

/// Output of the configuration editor. Omitted fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sections: Option<Vec<SectionInput>>,
    #[serde(default)]
    pub hotkeys: Option<Vec<HotkeyBinding>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdate {
    pub student_id: i64,
    pub section_id: i64,
    pub value: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyAction {
    Move,
    Deduct,
    Append,
    Stay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyOutcome {
    pub action: KeyAction,
    pub focus: Option<FocusView>,
    pub cell: Option<CellUpdate>,
    pub created_student_id: Option<i64>,
}

pub struct SessionController {
    session: Session,
    gateway: Gateway,
    marking: bool,
    focus: Option<Focus>,
    persist_failures: u64,
}

impl SessionController {
    /// Loads the stored session (or the built-in defaults) and resumes marking
    /// mode when it was active at the last save.
    pub fn open(gateway: Gateway) -> Self {
        let session = match gateway.load() {
            Ok(Some(s)) if !s.sections.is_empty() => s,
            Ok(Some(mut s)) => {
                info!("stored configuration has no sections, seeding defaults");
                s.sections = model::default_sections();
                s.hotkeys = model::default_hotkeys();
                s
            }
            Ok(None) => Session::with_defaults(),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "failed to load session, using defaults");
                Session::with_defaults()
            }
        };

        let mut ctl = Self {
            session,
            gateway,
            marking: false,
            focus: None,
            persist_failures: 0,
        };

        match ctl.gateway.marking_mode() {
            Ok(true) => {
                if let Err(e) = ctl.enter_marking_mode() {
                    warn!(error = %e, "could not resume marking mode");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %format!("{e:#}"), "failed to read mode flag"),
        }
        ctl
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_marking(&self) -> bool {
        self.marking
    }

    pub fn focus(&self) -> Option<Focus> {
        self.focus
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures
    }

    pub fn statistics(&self) -> Statistics {
        compute_statistics(&self.session.students, &self.session.sections)
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            rows: self.session.students.len(),
            sections: self.session.sections.len(),
        }
    }

    pub fn configure(&mut self, update: ConfigUpdate) -> Result<(), SessionError> {
        if self.marking {
            return Err(SessionError::MarkingActive);
        }

        let sections = match update.sections {
            Some(inputs) => Some(self.validate_sections(inputs)?),
            None => None,
        };
        let hotkeys = match update.hotkeys {
            Some(list) => Some(validate_hotkeys(list)?),
            None => None,
        };

        if let Some(title) = update.title {
            self.session.title = title;
        }
        if let Some(sections) = sections {
            self.session.sections = sections;
            clamp_existing_marks(&mut self.session);
        }
        if let Some(hotkeys) = hotkeys {
            self.session.hotkeys = hotkeys;
        }
        self.persist();
        Ok(())
    }

    fn validate_sections(&self, inputs: Vec<SectionInput>) -> Result<Vec<Section>, SessionError> {
        let mut seen = HashSet::new();
        for input in &inputs {
            if input.max_marks < 0 {
                return Err(SessionError::InvalidConfig(format!(
                    "section {:?} has negative maxMarks",
                    input.name
                )));
            }
            if input.max_marks > MAX_SECTION_MARKS {
                return Err(SessionError::InvalidConfig(format!(
                    "section {:?} has maxMarks above {MAX_SECTION_MARKS}",
                    input.name
                )));
            }
            if let Some(id) = input.id {
                if !seen.insert(id) {
                    return Err(SessionError::InvalidConfig(format!(
                        "duplicate section id {id}"
                    )));
                }
            }
        }

        // Stored mark keys count as taken so a new section starts unmarked.
        let mut next_id = fresh_id(
            self.session
                .sections
                .iter()
                .map(|s| s.id)
                .chain(seen.iter().copied())
                .chain(
                    self.session
                        .students
                        .iter()
                        .flat_map(|st| st.marks.keys().copied()),
                ),
        );
        Ok(inputs
            .into_iter()
            .map(|input| {
                let id = input.id.unwrap_or_else(|| {
                    let id = next_id;
                    next_id += 1;
                    id
                });
                Section {
                    id,
                    name: input.name,
                    max_marks: input.max_marks,
                }
            })
            .collect())
    }

    /// Appends a blank student with every section at full marks and returns
    /// its row index.
    pub fn add_student(&mut self) -> usize {
        let id = fresh_id(self.session.students.iter().map(|s| s.id));
        let marks = self
            .session
            .sections
            .iter()
            .map(|s| (s.id, s.max_marks))
            .collect();
        self.session.students.push(Student {
            id,
            name: String::new(),
            marks,
        });
        self.persist();
        debug!(student_id = id, "student added");
        self.session.students.len() - 1
    }

    pub fn delete_student(&mut self, student_id: i64, confirmed: bool) -> Result<(), SessionError> {
        if !confirmed {
            return Err(SessionError::ConfirmationRequired {
                action: "deleting a student",
            });
        }
        let idx = self
            .session
            .student_index(student_id)
            .ok_or(SessionError::StudentNotFound(student_id))?;
        self.session.students.remove(idx);
        self.persist();

        // Keep focus on the same student when an earlier row disappears.
        let rows = self.session.students.len();
        self.focus = match self.focus {
            _ if rows == 0 => None,
            Some(f) if f.row() > idx => Some(with_row(f, f.row() - 1)),
            Some(f) if f.row() >= rows => Some(with_row(f, rows - 1)),
            other => other,
        };
        info!(student_id, "student deleted");
        Ok(())
    }

    pub fn rename_student(&mut self, student_id: i64, name: String) -> Result<(), SessionError> {
        let idx = self
            .session
            .student_index(student_id)
            .ok_or(SessionError::StudentNotFound(student_id))?;
        self.session.students[idx].name = name;
        self.persist();
        Ok(())
    }

    /// Direct edit of a cell; the raw text is clamped into range.
    pub fn set_mark(
        &mut self,
        student_id: i64,
        section_id: i64,
        raw: &str,
    ) -> Result<CellUpdate, SessionError> {
        let idx = self
            .session
            .student_index(student_id)
            .ok_or(SessionError::StudentNotFound(student_id))?;
        let max = self
            .session
            .section(section_id)
            .map(|s| s.max_marks)
            .ok_or(SessionError::SectionNotFound(section_id))?;

        let value = clamp_mark(raw, max);
        self.session.students[idx].marks.insert(section_id, value);
        self.persist();
        Ok(self.cell(idx, section_id, value))
    }

    pub fn enter_marking_mode(&mut self) -> Result<(), SessionError> {
        if self.session.sections.is_empty() {
            return Err(SessionError::NoSections);
        }
        if self.marking {
            return Ok(());
        }

        self.marking = true;
        self.persist_mode(true);
        self.persist();

        let row = if self.session.students.is_empty() {
            self.add_student()
        } else {
            0
        };
        self.focus = Some(Focus::Name { row });
        info!(
            sections = self.session.sections.len(),
            students = self.session.students.len(),
            "marking mode entered"
        );
        Ok(())
    }

    /// Clears the roster and leaves marking mode. Title, sections and hotkeys
    /// carry over to the next session.
    pub fn reset_session(&mut self, confirmed: bool) -> Result<(), SessionError> {
        if !confirmed {
            return Err(SessionError::ConfirmationRequired {
                action: "resetting the session",
            });
        }
        self.session.students.clear();
        self.marking = false;
        self.focus = None;
        self.persist_mode(false);
        self.persist();
        info!("session reset");
        Ok(())
    }

    pub fn set_focus(&mut self, focus: Focus) -> Result<FocusView, SessionError> {
        if !self.marking {
            return Err(SessionError::NotMarking);
        }
        if !self.shape().contains(focus) {
            return Err(SessionError::FocusOutOfRange);
        }
        self.focus = Some(focus);
        Ok(FocusView::arrived(focus))
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> Result<KeyOutcome, SessionError> {
        if !self.marking {
            return Err(SessionError::NotMarking);
        }
        let Some(focus) = self.focus else {
            return Ok(KeyOutcome {
                action: KeyAction::Stay,
                focus: None,
                cell: None,
                created_student_id: None,
            });
        };

        let decision = nav::decide(event, focus, self.shape(), &self.session.hotkeys);
        debug!(?event, ?focus, ?decision, "key decision");

        let outcome = match decision {
            Decision::MoveFocus(next) => self.move_to(next),
            Decision::ApplyDeduction(amount) => {
                let cell = self.apply_deduction(focus, amount)?;
                KeyOutcome {
                    action: KeyAction::Deduct,
                    focus: Some(FocusView::held(focus)),
                    cell: Some(cell),
                    created_student_id: None,
                }
            }
            Decision::AdvanceOrCreate => match nav::resolve_advance(focus, self.shape()) {
                Advance::MoveFocus(next) => self.move_to(next),
                Advance::AppendRow => {
                    let row = self.add_student();
                    let next = Focus::Name { row };
                    self.focus = Some(next);
                    KeyOutcome {
                        action: KeyAction::Append,
                        focus: Some(FocusView::arrived(next)),
                        cell: None,
                        created_student_id: Some(self.session.students[row].id),
                    }
                }
            },
            Decision::Stay => KeyOutcome {
                action: KeyAction::Stay,
                focus: Some(FocusView::held(focus)),
                cell: None,
                created_student_id: None,
            },
        };
        Ok(outcome)
    }

    fn move_to(&mut self, next: Focus) -> KeyOutcome {
        self.focus = Some(next);
        KeyOutcome {
            action: KeyAction::Move,
            focus: Some(FocusView::arrived(next)),
            cell: None,
            created_student_id: None,
        }
    }

    fn apply_deduction(&mut self, focus: Focus, amount: i64) -> Result<CellUpdate, SessionError> {
        let Focus::Section { row, col } = focus else {
            return Err(SessionError::FocusOutOfRange);
        };
        let section = self
            .session
            .sections
            .get(col)
            .cloned()
            .ok_or(SessionError::FocusOutOfRange)?;
        let student = self
            .session
            .students
            .get_mut(row)
            .ok_or(SessionError::FocusOutOfRange)?;

        let value = nav::deduct(effective_mark(student, &section), amount).min(section.max_marks);
        student.marks.insert(section.id, value);
        self.persist();
        Ok(self.cell(row, section.id, value))
    }

    fn cell(&self, idx: usize, section_id: i64, value: i64) -> CellUpdate {
        let student = &self.session.students[idx];
        CellUpdate {
            student_id: student.id,
            section_id,
            value,
            total: model::compute_total(student, &self.session.sections),
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.gateway.save(&self.session) {
            self.persist_failures += 1;
            warn!(error = %format!("{e:#}"), "failed to save session");
        }
    }

    fn persist_mode(&mut self, on: bool) {
        if let Err(e) = self.gateway.set_marking_mode(on) {
            self.persist_failures += 1;
            warn!(error = %format!("{e:#}"), "failed to save mode flag");
        }
    }
}

fn with_row(focus: Focus, row: usize) -> Focus {
    match focus {
        Focus::Name { .. } => Focus::Name { row },
        Focus::Section { col, .. } => Focus::Section { row, col },
    }
}

/// Millisecond timestamp, bumped past every id already in use.
fn fresh_id(existing: impl Iterator<Item = i64>) -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    match existing.max() {
        Some(max) => now.max(max.saturating_add(1)),
        None => now,
    }
}

fn validate_hotkeys(list: Vec<HotkeyBinding>) -> Result<Vec<HotkeyBinding>, SessionError> {
    list.into_iter()
        .map(|hk| {
            let key = hk.key.trim().to_lowercase();
            if key.chars().count() != 1 {
                return Err(SessionError::InvalidConfig(format!(
                    "hotkey {:?} must be a single character",
                    hk.key
                )));
            }
            if hk.deduction < 0 {
                return Err(SessionError::InvalidConfig(format!(
                    "hotkey {key:?} has a negative deduction"
                )));
            }
            Ok(HotkeyBinding { key, ..hk })
        })
        .collect()
}

// A lowered maximum must not leave stored marks above it.
fn clamp_existing_marks(session: &mut Session) {
    for student in &mut session.students {
        for section in &session.sections {
            if let Some(v) = student.marks.get_mut(&section.id) {
                *v = (*v).clamp(0, section.max_marks);
            }
        }
    }
}
