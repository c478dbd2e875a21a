//! Multi-day BOE summary scans.
//!
//! A scan covers `days` calendar days from a start date, skipping Sundays
//! (the BOE does not publish on Sundays). Each published summary is walked
//! `diario > seccion > departamento > [epigrafe >] item` and every item that
//! passes the filters becomes a [`SummaryEntry`].

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::document::GenericDocument;
use crate::error::{ApiError, Result};
use crate::params;

/// Longest span one scan may cover.
pub const MAX_SCAN_DAYS: u32 = 31;

pub const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryScan {
    /// `YYYYMMDD` or `YYYY-MM-DD`.
    pub start_date: String,
    pub days: u32,
    /// Case-insensitive substring of the item title.
    pub terms: Option<String>,
    /// Section code, e.g. `1` or `2A`.
    pub section: Option<String>,
    /// Department code, e.g. `7723`.
    pub department: Option<String>,
}

impl SummaryScan {
    pub fn new(start_date: impl Into<String>, days: u32) -> Self {
        Self {
            start_date: start_date.into(),
            days,
            terms: None,
            section: None,
            department: None,
        }
    }

    /// Seven days from `start_date`.
    pub fn week(start_date: impl Into<String>) -> Self {
        Self::new(start_date, WEEK_DAYS)
    }

    pub fn with_terms(mut self, terms: impl Into<String>) -> Self {
        self.terms = Some(terms.into());
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// First and last calendar day covered.
    pub fn window(&self) -> Result<(NaiveDate, NaiveDate)> {
        if !(1..=MAX_SCAN_DAYS).contains(&self.days) {
            return Err(ApiError::validation(
                "days",
                &self.days.to_string(),
                &format!("a number between 1 and {}", MAX_SCAN_DAYS),
            ));
        }
        let start = params::parse_date("start_date", &self.start_date)?;
        let end = start
            .checked_add_days(Days::new(u64::from(self.days - 1)))
            .ok_or_else(|| {
                ApiError::validation("start_date", &self.start_date, "a date early enough to scan")
            })?;
        Ok((start, end))
    }

    /// `YYYYMMDD` publication days in the window, in order.
    pub fn dates(&self) -> Result<Vec<String>> {
        let (start, end) = self.window()?;
        Ok(start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| day.weekday() != Weekday::Sun)
            .map(params::to_api_date)
            .collect())
    }

    /// Items of one day's summary `data` that pass the filters.
    pub fn entries_in(&self, date: &str, data: &GenericDocument) -> Vec<SummaryEntry> {
        let terms = self
            .terms
            .as_deref()
            .map(str::trim)
            .filter(|terms| !terms.is_empty())
            .map(str::to_lowercase);
        let summary = data.get("sumario").unwrap_or(data);

        let mut entries = Vec::new();
        for diario in summary.children("diario") {
            for section in diario.children("seccion") {
                let section_code = section.field("codigo").unwrap_or_default();
                if self.section.as_deref().is_some_and(|want| want != section_code) {
                    continue;
                }
                for department in section.children("departamento") {
                    let department_code = department.field("codigo").unwrap_or_default();
                    if self
                        .department
                        .as_deref()
                        .is_some_and(|want| want != department_code)
                    {
                        continue;
                    }

                    let items = department.children("item").into_iter().chain(
                        department
                            .children("epigrafe")
                            .into_iter()
                            .flat_map(|heading| heading.children("item")),
                    );
                    for item in items {
                        let title = item.field("titulo").unwrap_or_default();
                        if let Some(terms) = &terms {
                            if !title.to_lowercase().contains(terms.as_str()) {
                                continue;
                            }
                        }
                        entries.push(SummaryEntry {
                            date: date.to_string(),
                            id: item.field("identificador").unwrap_or_default().to_string(),
                            title: title.to_string(),
                            section_code: section_code.to_string(),
                            section: section.field("nombre").unwrap_or_default().to_string(),
                            department_code: department_code.to_string(),
                            department: department.field("nombre").unwrap_or_default().to_string(),
                            pdf_url: pdf_url(item),
                        });
                    }
                }
            }
        }
        entries
    }
}

/// The PDF link is plain text in some answers and `{text, szBytes, ...}` in others.
fn pdf_url(item: &GenericDocument) -> Option<String> {
    let node = item.get("url_pdf")?;
    node.as_str()
        .or_else(|| node.text_at("text"))
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// One published item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub date: String,
    pub id: String,
    pub title: String,
    pub section_code: String,
    pub section: String,
    pub department_code: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub start_date: String,
    pub end_date: String,
    /// Days with a summary.
    pub published: Vec<String>,
    /// Days the service had no summary for (holidays).
    pub missing: Vec<String>,
    pub entries: Vec<SummaryEntry>,
}

impl ScanReport {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: params::to_api_date(start),
            end_date: params::to_api_date(end),
            published: Vec::new(),
            missing: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Per-day, per-section and per-department counts.
    pub fn tally(&self) -> ScanTally {
        let mut tally = ScanTally {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            total: self.entries.len(),
            days_published: self.published.len(),
            missing: self.missing.clone(),
            ..ScanTally::default()
        };
        for date in &self.published {
            tally.by_day.insert(date.clone(), 0);
        }
        for entry in &self.entries {
            *tally.by_day.entry(entry.date.clone()).or_default() += 1;
            *tally.by_section.entry(entry.section.clone()).or_default() += 1;
            *tally.by_department.entry(entry.department.clone()).or_default() += 1;
        }
        tally
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanTally {
    pub start_date: String,
    pub end_date: String,
    pub total: usize,
    pub days_published: usize,
    pub missing: Vec<String>,
    pub by_day: BTreeMap<String, usize>,
    pub by_section: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn summary() -> GenericDocument {
        GenericDocument::from(json!({
            "sumario": {
                "diario": [{
                    "seccion": [
                        {
                            "codigo": "1",
                            "nombre": "I. Disposiciones generales",
                            "departamento": [
                                {
                                    "codigo": "7723",
                                    "nombre": "JEFATURA DEL ESTADO",
                                    "epigrafe": {
                                        "nombre": "Leyes",
                                        "item": [
                                            {
                                                "identificador": "BOE-A-2024-1",
                                                "titulo": "Ley 1/2024, de pesca sostenible",
                                                "url_pdf": {"szBytes": "1", "text": "https://boe.es/1.pdf"}
                                            },
                                            {"identificador": "BOE-A-2024-2", "titulo": "Ley 2/2024, de aguas"}
                                        ]
                                    }
                                },
                                {
                                    "codigo": "9574",
                                    "nombre": "MINISTERIO DE HACIENDA",
                                    "item": {"identificador": "BOE-A-2024-3", "titulo": "Orden sobre pesca"}
                                }
                            ]
                        },
                        {
                            "codigo": "2A",
                            "nombre": "II. Autoridades y personal",
                            "departamento": {
                                "codigo": "7723",
                                "nombre": "JEFATURA DEL ESTADO",
                                "item": {"identificador": "BOE-A-2024-4", "titulo": "Real Decreto de nombramiento"}
                            }
                        }
                    ]
                }]
            }
        }))
    }

    fn ids(entries: &[SummaryEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn test_dates_skip_sundays() {
        // 2024-06-01 is a Saturday.
        let dates = SummaryScan::new("2024-06-01", 3).dates().unwrap();
        assert_eq!(dates, vec!["20240601", "20240603"]);

        let week = SummaryScan::week("20240603").dates().unwrap();
        assert_eq!(week.len(), 6);
        assert_eq!(week.last().map(String::as_str), Some("20240608"));
    }

    #[test]
    fn test_window_rejects_bad_input() {
        for scan in [
            SummaryScan::new("20240601", 0),
            SummaryScan::new("20240601", MAX_SCAN_DAYS + 1),
            SummaryScan::new("2024/06/01", 7),
        ] {
            assert_eq!(scan.window().unwrap_err().kind, ErrorKind::Validation);
        }
    }

    #[test]
    fn test_entries_walk_items_and_headings() {
        let entries = SummaryScan::week("20240603").entries_in("20240603", &summary());
        assert_eq!(
            ids(&entries),
            vec!["BOE-A-2024-1", "BOE-A-2024-2", "BOE-A-2024-3", "BOE-A-2024-4"]
        );
        assert_eq!(entries[0].department, "JEFATURA DEL ESTADO");
        assert_eq!(entries[0].pdf_url.as_deref(), Some("https://boe.es/1.pdf"));
        assert_eq!(entries[2].pdf_url, None);
        assert_eq!(entries[3].section_code, "2A");
    }

    #[test]
    fn test_filters_combine() {
        let data = summary();
        let scan = SummaryScan::week("20240603").with_terms("PESCA");
        assert_eq!(ids(&scan.entries_in("d", &data)), vec!["BOE-A-2024-1", "BOE-A-2024-3"]);

        let scan = scan.with_department("7723");
        assert_eq!(ids(&scan.entries_in("d", &data)), vec!["BOE-A-2024-1"]);

        let scan = SummaryScan::week("20240603")
            .with_section("2A")
            .with_department("7723");
        assert_eq!(ids(&scan.entries_in("d", &data)), vec!["BOE-A-2024-4"]);
    }

    #[test]
    fn test_xml_shaped_summary() {
        let raw = r#"<response><status><code>200</code><text>ok</text></status><data><sumario><diario>
            <seccion codigo="1" nombre="I"><departamento codigo="7723" nombre="JEFATURA">
                <item><identificador>BOE-A-2024-9</identificador><titulo>Ley de pesca</titulo></item>
            </departamento></seccion>
        </diario></sumario></data></response>"#;
        let response = crate::response::ApiResponse::parse(raw, crate::DocumentFormat::Xml).unwrap();
        let entries = SummaryScan::week("20240603")
            .with_section("1")
            .entries_in("20240603", &response.data);
        assert_eq!(ids(&entries), vec!["BOE-A-2024-9"]);
        assert_eq!(entries[0].department_code, "7723");
    }

    #[test]
    fn test_tally_counts() {
        let (start, end) = SummaryScan::week("20240603").window().unwrap();
        let mut report = ScanReport::new(start, end);
        report.published = vec!["20240603".into(), "20240604".into()];
        report.missing = vec!["20240605".into()];
        report.entries = SummaryScan::week("20240603").entries_in("20240603", &summary());

        let tally = report.tally();
        assert_eq!(tally.end_date, "20240609");
        assert_eq!(tally.total, 4);
        assert_eq!(tally.days_published, 2);
        assert_eq!(tally.by_day["20240603"], 4);
        assert_eq!(tally.by_day["20240604"], 0);
        assert_eq!(tally.by_department["JEFATURA DEL ESTADO"], 3);
        assert_eq!(tally.by_section["II. Autoridades y personal"], 1);
    }
}
