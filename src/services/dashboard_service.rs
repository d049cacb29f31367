// src/services/dashboard_service.rs

use chrono::{Datelike, Local, NaiveDate};

use crate::{common::error::AppError, db::DashboardRepository, models::dashboard::DashboardSummary};

const EXPIRY_WINDOW_DAYS: i64 = 30;
const EXPIRY_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    EXPIRY_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// (a vencer na janela, já vencidos). Texto que não é data fica de fora.
fn classify_expiries<'a>(expiries: impl IntoIterator<Item = &'a str>, today: NaiveDate) -> (i64, i64) {
    let mut expiring = 0;
    let mut expired = 0;
    for date in expiries.into_iter().filter_map(parse_expiry) {
        let days_left = (date - today).num_days();
        if days_left < 0 {
            expired += 1;
        } else if days_left <= EXPIRY_WINDOW_DAYS {
            expiring += 1;
        }
    }
    (expiring, expired)
}

#[derive(Clone)]
pub struct DashboardService {
    dashboard_repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(dashboard_repo: DashboardRepository) -> Self {
        Self { dashboard_repo }
    }

    pub async fn summary(&self) -> Result<DashboardSummary, AppError> {
        let today = Local::now().date_naive();

        let total_clients = self.dashboard_repo.active_clients().await?;
        let expiries = self.dashboard_repo.recharge_expiries().await?;
        let (expiring_soon, expired) = classify_expiries(expiries.iter().map(String::as_str), today);
        let (maintenance_this_month, income_this_month) =
            self.dashboard_repo.maintenance_since(month_start(today)).await?;

        Ok(DashboardSummary {
            total_clients,
            total_extinguishers: expiries.len() as i64,
            expiring_soon,
            expired,
            maintenance_this_month,
            income_this_month,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("data válida")
    }

    #[test]
    fn month_starts_on_day_one() {
        assert_eq!(month_start(date(2026, 10, 19)), date(2026, 10, 1));
        assert_eq!(month_start(date(2026, 3, 1)), date(2026, 3, 1));
    }

    #[test]
    fn expiries_split_into_expired_and_due_soon() {
        let today = date(2026, 10, 19);
        let expiries = [
            "2026-10-18", // vencido ontem
            "2026-10-19", // vence hoje
            "18/11/2026", // 30 dias
            "2026-11-19", // 31 dias
            "",
            "sin dato",
        ];
        assert_eq!(classify_expiries(expiries, today), (2, 1));
    }
}
