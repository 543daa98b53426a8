use std::{fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context};
use chrono::NaiveDate;

use crate::calendar::RamadanWindow;

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the app on the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub templates_dir: PathBuf,
    pub public_dir: PathBuf,
    pub migrations_dir: PathBuf,
    pub ramadan: RamadanWindow,
    pub ramadan_placeholders: bool,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err).context("cannot load .env");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RamadanWindow::default();
        let start: NaiveDate = parse_or(&lookup, "RAMADAN_START", defaults.start)?;
        let end: NaiveDate = parse_or(&lookup, "RAMADAN_END", defaults.end)?;
        let hijri_year: u32 = parse_or(&lookup, "RAMADAN_HIJRI_YEAR", defaults.hijri_year)?;
        let ramadan = RamadanWindow::new(start, end, hijri_year)
            .context("RAMADAN_START must not be after RAMADAN_END")?;

        let placeholders = match lookup("RAMADAN_REPORT_PLACEHOLDER") {
            None => true,
            Some(v) => parse_flag(&v)
                .ok_or_else(|| anyhow!("RAMADAN_REPORT_PLACEHOLDER: '{v}' is not a boolean"))?,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            templates_dir: path_or(&lookup, "TEMPLATES_DIR", "./src/front/templates"),
            public_dir: path_or(&lookup, "PUBLIC_DIR", "./src/front/public"),
            migrations_dir: path_or(&lookup, "MIGRATIONS_DIR", "./migrations"),
            ramadan,
            ramadan_placeholders: placeholders,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| anyhow!("{key}: cannot parse '{raw}': {err}")),
    }
}

fn path_or<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
