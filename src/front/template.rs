use std::{
    fs,
    path::Path,
    str::FromStr,
    sync::{Arc, RwLock},
};

use anyhow::{anyhow, Context};
use axum::response::{Html, IntoResponse, Response};
use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use handlebars::handlebars_helper;
use serde::Serialize;
use serde_json::Value;

use crate::calendar::month_name;

#[derive(Clone)]
pub struct Template {
    r: Arc<RwLock<handlebars::Handlebars<'static>>>,
}

/// `Rp 1.250.000`, with `,50` style cents only when present.
pub fn format_rupiah(amount: &BigDecimal) -> String {
    let rounded = amount.round(2).to_string();
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (whole, cents) = digits.split_once('.').unwrap_or((digits, ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let cents = cents.trim_end_matches('0');
    if cents.is_empty() {
        format!("{sign}Rp {grouped}")
    } else {
        format!("{sign}Rp {grouped},{cents:0<2}")
    }
}

/// `2026-02-19` becomes `19 Februari 2026`; anything else is returned as is.
pub fn format_tanggal(raw: &str) -> String {
    match NaiveDate::from_str(raw) {
        Ok(d) => format!(
            "{} {} {}",
            d.day(),
            month_name(d.month()).unwrap_or_default(),
            d.year()
        ),
        Err(_) => raw.to_string(),
    }
}

fn amount_from_json(v: &Value) -> Option<BigDecimal> {
    match v {
        Value::String(s) => BigDecimal::from_str(s).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

impl Template {
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        let mut handlebars = handlebars::Handlebars::new();
        handlebars.set_strict_mode(false);

        let entries = fs::read_dir(dir)
            .with_context(|| format!("cannot read templates in {}", dir.display()))?;
        for entity in entries {
            let entity = entity?;
            let path = entity.path();
            if path.extension().and_then(|e| e.to_str()) != Some("hbs") {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("bad template name {}", path.display()))?
                .to_string();
            handlebars
                .register_template_file(&name, &path)
                .with_context(|| format!("template {} does not compile", path.display()))?;
            log::debug!("registered template '{}'", name);
        }

        handlebars_helper!(rupiah: |v: Json| amount_from_json(v)
            .map(|a| format_rupiah(&a))
            .unwrap_or_default());
        handlebars_helper!(tanggal: |s: str| format_tanggal(s));
        handlebars_helper!(pct: |f: f64| format!("{:.1}%", f));

        handlebars.register_helper("rupiah", Box::new(rupiah));
        handlebars.register_helper("tanggal", Box::new(tanggal));
        handlebars.register_helper("pct", Box::new(pct));

        Ok(Self {
            r: Arc::new(RwLock::new(handlebars)),
        })
    }

    pub fn render<T>(&self, name: &str, data: &T) -> anyhow::Result<Response>
    where
        T: Serialize,
    {
        log::debug!("render '{}'", name);
        let registry = self
            .r
            .read()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        let html = registry
            .render(name, data)
            .with_context(|| format!("failed to render template '{name}'"))?;
        Ok(Html(html).into_response())
    }

    /// Renders to a string, for callers that wrap the page themselves.
    pub fn render_string<T>(&self, name: &str, data: &T) -> anyhow::Result<String>
    where
        T: Serialize,
    {
        let registry = self
            .r
            .read()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        Ok(registry.render(name, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupiah_groups_thousands() {
        assert_eq!(format_rupiah(&BigDecimal::from(1_250_000)), "Rp 1.250.000");
        assert_eq!(format_rupiah(&BigDecimal::from(500)), "Rp 500");
        assert_eq!(format_rupiah(&BigDecimal::from(-50_000)), "-Rp 50.000");
    }

    #[test]
    fn rupiah_keeps_cents_when_present() {
        let amount = BigDecimal::from_str("75000.5").unwrap();
        assert_eq!(format_rupiah(&amount), "Rp 75.000,50");
        let whole = BigDecimal::from_str("75000.00").unwrap();
        assert_eq!(format_rupiah(&whole), "Rp 75.000");
    }

    #[test]
    fn tanggal_uses_indonesian_month() {
        assert_eq!(format_tanggal("2026-02-19"), "19 Februari 2026");
        assert_eq!(format_tanggal("kemarin"), "kemarin");
    }

    #[test]
    fn bundled_templates_compile() {
        let t = Template::new(Path::new("./src/front/templates")).unwrap();
        let html = t
            .render_string("error", &serde_json::json!({ "title": "Galat", "error": "boom" }))
            .unwrap();
        assert!(html.contains("boom"));
    }
}
