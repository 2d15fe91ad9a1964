use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TITLE: &str = "Marking Session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub max_marks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyBinding {
    pub key: String,
    pub deduction: i64,
    #[serde(default)]
    pub label: String,
}

impl HotkeyBinding {
    pub fn matches(&self, c: char) -> bool {
        let mut it = self.key.chars();
        match (it.next(), it.next()) {
            (Some(k), None) => k.to_lowercase().eq(c.to_lowercase()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// Section id -> stored mark. A missing key means "unset", which counts
    /// as full marks. Keys of removed sections may linger and are ignored.
    #[serde(default)]
    pub marks: BTreeMap<i64, i64>,
}

impl Student {
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub title: String,
    pub sections: Vec<Section>,
    pub hotkeys: Vec<HotkeyBinding>,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Session {
    pub fn with_defaults() -> Self {
        Self {
            title: String::new(),
            sections: default_sections(),
            hotkeys: default_hotkeys(),
            students: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        let t = self.title.trim();
        if t.is_empty() {
            DEFAULT_TITLE
        } else {
            t
        }
    }

    pub fn student_index(&self, student_id: i64) -> Option<usize> {
        self.students.iter().position(|s| s.id == student_id)
    }

    pub fn section(&self, section_id: i64) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }
}

/// First binding in configured order wins when keys collide.
pub fn find_hotkey(hotkeys: &[HotkeyBinding], c: char) -> Option<&HotkeyBinding> {
    hotkeys.iter().find(|hk| hk.matches(c))
}

pub fn default_sections() -> Vec<Section> {
    vec![
        Section {
            id: 1,
            name: "Reading".to_string(),
            max_marks: 20,
        },
        Section {
            id: 2,
            name: "Listening".to_string(),
            max_marks: 20,
        },
        Section {
            id: 3,
            name: "Speaking".to_string(),
            max_marks: 60,
        },
    ]
}

pub fn default_hotkeys() -> Vec<HotkeyBinding> {
    vec![
        HotkeyBinding {
            key: "q".to_string(),
            deduction: 2,
            label: "Minor Error".to_string(),
        },
        HotkeyBinding {
            key: "w".to_string(),
            deduction: 5,
            label: "Major Error".to_string(),
        },
    ]
}

pub fn effective_mark(student: &Student, section: &Section) -> i64 {
    student
        .marks
        .get(&section.id)
        .copied()
        .unwrap_or(section.max_marks)
}

/// Largest maximum a section may carry.
pub const MAX_SECTION_MARKS: i64 = u32::MAX as i64;

pub fn compute_total(student: &Student, sections: &[Section]) -> i64 {
    sections
        .iter()
        .map(|s| effective_mark(student, s))
        .fold(0, i64::saturating_add)
}

/// Parses the leading integer of `raw` (sign then digits, anything after is
/// ignored) and clamps it to `[0, max]`. Input without digits yields 0.
pub fn clamp_mark(raw: &str, max: i64) -> i64 {
    let parsed = parse_leading_int(raw).unwrap_or(0);
    parsed.clamp(0, max.max(0))
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut seen = false;
    let mut value: i64 = 0;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// VB6-style 1-decimal rounding: `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub max_possible: i64,
    pub count: usize,
    /// `None` means no named student yet; zero is a real score.
    pub average: Option<f64>,
    pub high: Option<i64>,
    pub low: Option<i64>,
}

pub fn compute_statistics(students: &[Student], sections: &[Section]) -> Statistics {
    let max_possible = sections
        .iter()
        .map(|s| s.max_marks)
        .fold(0, i64::saturating_add);

    let totals: Vec<i64> = students
        .iter()
        .filter(|s| s.is_named())
        .map(|s| compute_total(s, sections))
        .collect();

    if totals.is_empty() {
        return Statistics {
            max_possible,
            count: 0,
            average: None,
            high: None,
            low: None,
        };
    }

    let sum: f64 = totals.iter().map(|&t| t as f64).sum();
    Statistics {
        max_possible,
        count: totals.len(),
        average: Some(sum / totals.len() as f64),
        high: totals.iter().copied().max(),
        low: totals.iter().copied().min(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i64, name: &str, marks: &[(i64, i64)]) -> Student {
        Student {
            id,
            name: name.to_string(),
            marks: marks.iter().copied().collect(),
        }
    }

    #[test]
    fn unset_marks_count_as_full_marks() {
        let s = student(1, "Ana", &[]);
        assert_eq!(compute_total(&s, &default_sections()), 100);
    }

    #[test]
    fn set_marks_replace_the_default() {
        let s = student(1, "Ana", &[(1, 16), (3, 41)]);
        assert_eq!(compute_total(&s, &default_sections()), 16 + 20 + 41);
    }

    #[test]
    fn stale_keys_from_removed_sections_are_ignored() {
        let s = student(1, "Ana", &[(99, 5)]);
        assert_eq!(compute_total(&s, &default_sections()), 100);
    }

    #[test]
    fn huge_stored_maxima_saturate_instead_of_overflowing() {
        let sections = vec![
            Section {
                id: 1,
                name: "A".to_string(),
                max_marks: i64::MAX,
            },
            Section {
                id: 2,
                name: "B".to_string(),
                max_marks: 1,
            },
        ];
        let s = student(1, "Ana", &[]);
        assert_eq!(compute_total(&s, &sections), i64::MAX);
        let stats = compute_statistics(&[s], &sections);
        assert_eq!(stats.max_possible, i64::MAX);
        assert_eq!(stats.high, Some(i64::MAX));
    }

    #[test]
    fn clamp_mark_handles_garbage_and_bounds() {
        assert_eq!(clamp_mark("abc", 20), 0);
        assert_eq!(clamp_mark("", 20), 0);
        assert_eq!(clamp_mark("-4", 20), 0);
        assert_eq!(clamp_mark("25", 20), 20);
        assert_eq!(clamp_mark("12abc", 20), 12);
        assert_eq!(clamp_mark(" 7", 20), 7);
        assert_eq!(clamp_mark("3.7", 20), 3);
        assert_eq!(clamp_mark("99999999999999999999999", 60), 60);
        assert_eq!(clamp_mark("5", 0), 0);
    }

    #[test]
    fn statistics_skip_blank_names() {
        let sections = default_sections();
        let students = vec![
            student(1, "Ana", &[(1, 10)]),
            student(2, "   ", &[(1, 0), (2, 0), (3, 0)]),
        ];
        let stats = compute_statistics(&students, &sections);
        assert_eq!(stats.max_possible, 100);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.average, Some(90.0));
        assert_eq!(stats.high, Some(90));
        assert_eq!(stats.low, Some(90));
    }

    #[test]
    fn statistics_report_no_data_rather_than_zero() {
        let stats = compute_statistics(&[student(1, "", &[])], &default_sections());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average, None);
        assert_eq!(stats.high, None);
        assert_eq!(stats.low, None);
    }

    #[test]
    fn hotkey_lookup_is_case_insensitive_and_first_wins() {
        let mut session = Session::with_defaults();
        session.hotkeys.push(HotkeyBinding {
            key: "q".to_string(),
            deduction: 9,
            label: "Shadowed".to_string(),
        });
        let hk = find_hotkey(&session.hotkeys, 'Q').expect("hotkey");
        assert_eq!(hk.deduction, 2);
        assert!(find_hotkey(&session.hotkeys, 'z').is_none());
    }

    #[test]
    fn round_off_matches_vb6() {
        assert_eq!(round_off_1_decimal(0.0), 0.0);
        assert_eq!(round_off_1_decimal(3.54), 3.5);
        assert_eq!(round_off_1_decimal(3.55), 3.6);
        assert_eq!(round_off_1_decimal(96.666), 96.7);
    }
}
