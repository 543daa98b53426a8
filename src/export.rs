//! CSV rendition of the detail report.

use anyhow::Context;
use serde::Serialize;

use crate::reports::DetailReport;

#[derive(Serialize)]
struct Row<'a> {
    #[serde(rename = "jenis")]
    kind: &'static str,
    #[serde(rename = "tanggal")]
    date: String,
    #[serde(rename = "keterangan")]
    description: &'a str,
    #[serde(rename = "kategori")]
    category: Option<&'a str>,
    #[serde(rename = "jumlah")]
    amount: Option<String>,
    status: Option<&'static str>,
    #[serde(rename = "catatan")]
    note: Option<&'a str>,
}

/// Income rows, then expense rows, then the meal schedule, each in the
/// order the report holds them.
pub fn detail_csv(report: &DetailReport) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    for r in &report.income_records {
        wtr.serialize(Row {
            kind: "pemasukan",
            date: r.date.to_string(),
            description: &r.source,
            category: Some(&r.category),
            amount: Some(r.amount.to_string()),
            status: None,
            note: r.note.as_deref(),
        })?;
    }
    for r in &report.expense_records {
        wtr.serialize(Row {
            kind: "pengeluaran",
            date: r.date.to_string(),
            description: &r.purpose,
            category: Some(&r.category),
            amount: Some(r.amount.to_string()),
            status: None,
            note: r.note.as_deref(),
        })?;
    }
    for r in &report.meal_provider_records {
        wtr.serialize(Row {
            kind: "buka_puasa",
            date: r.date.to_string(),
            description: &r.provider_name,
            category: None,
            amount: None,
            status: Some(r.status.as_str()),
            note: r.note.as_deref(),
        })?;
    }

    wtr.flush()?;
    wtr.into_inner().context("cannot finish csv export")
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::{IncomeRecord, MealProviderRecord, MealStatus};

    #[test]
    fn rows_are_written_under_one_header() {
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let report = DetailReport {
            income_records: vec![IncomeRecord {
                id: Uuid::new_v4(),
                date,
                source: "Jamaah, Shaf Depan".into(),
                amount: BigDecimal::from(150_000),
                category: "tarwih".into(),
                note: None,
                created_at: now,
                updated_at: now,
            }],
            expense_records: vec![],
            meal_provider_records: vec![MealProviderRecord {
                id: Uuid::new_v4(),
                provider_name: "Bu Aminah".into(),
                address: None,
                phone: None,
                date,
                status: MealStatus::Confirmed,
                note: Some("nasi kotak".into()),
                created_at: now,
                updated_at: now,
            }],
        };

        let out = String::from_utf8(detail_csv(&report).unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "jenis,tanggal,keterangan,kategori,jumlah,status,catatan"
        );
        assert_eq!(
            lines[1],
            "pemasukan,2026-02-20,\"Jamaah, Shaf Depan\",tarwih,150000,,"
        );
        assert_eq!(
            lines[2],
            "buka_puasa,2026-02-20,Bu Aminah,,,confirmed,nasi kotak"
        );
    }

    #[test]
    fn empty_report_is_empty_output() {
        let report = DetailReport {
            income_records: vec![],
            expense_records: vec![],
            meal_provider_records: vec![],
        };
        assert!(detail_csv(&report).unwrap().is_empty());
    }
}
