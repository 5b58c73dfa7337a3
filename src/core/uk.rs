use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Serialize, Serializer};
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no tax year configuration registered for '{key}'")]
    NotFound { key: String },
    #[error("invalid tax year '{0}' (expected e.g. 2025_26, 2025/26 or 2026)")]
    InvalidKey(String),
}

/// UK Tax Year (runs 6 April to 5 April)
/// The year value represents the end year (e.g., 2026 = 2025/26 tax year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Create a tax year from a date
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        // 6 April or later belongs to the tax year ending next April
        match NaiveDate::from_ymd_opt(year, 4, 6) {
            Some(start) if date >= start => TaxYear(year + 1),
            _ => TaxYear(year),
        }
    }

    /// Tax year containing today's local date
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Display as "2025/26" format
    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0 - 1, self.0 % 100)
    }

    /// Registry key, e.g. "2025_26"
    pub fn key(&self) -> String {
        format!("{}_{:02}", self.0 - 1, self.0 % 100)
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Serialize for TaxYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display())
    }
}

impl FromStr for TaxYear {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ConfigError::InvalidKey(s.to_string());

        match s.split_once(&['_', '/', '-'][..]) {
            Some((start, end)) => {
                if end.len() != 2 {
                    return Err(invalid());
                }
                let start: i32 = start.parse().map_err(|_| invalid())?;
                let end: i32 = end.parse().map_err(|_| invalid())?;
                if (start + 1) % 100 != end {
                    return Err(invalid());
                }
                Ok(TaxYear(start + 1))
            }
            None => s.parse().map(TaxYear).map_err(|_| invalid()),
        }
    }
}

/// National Insurance band. `limit` of `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NiBand {
    pub threshold: Decimal,
    pub rate: Decimal,
    pub limit: Option<Decimal>,
}

/// Bands, rates and thresholds for a single tax year.
///
/// Configurations are immutable and live in a static registry; a new year is
/// added by registering a new entry in [`TAX_YEARS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxYearConfig {
    pub tax_year: TaxYear,
    pub personal_allowance: Decimal,
    /// Gross income above which the personal allowance is withdrawn at £1 per £2
    pub taper_threshold: Decimal,
    pub basic_rate_limit: Decimal,
    pub higher_rate_limit: Decimal,
    /// Always unbounded for the modelled years
    pub additional_rate_limit: Option<Decimal>,
    pub basic_rate: Decimal,
    pub higher_rate: Decimal,
    pub additional_rate: Decimal,
    pub ni_bands: &'static [NiBand],
    /// Plan 2 repayment threshold
    pub student_loan_threshold: Decimal,
    pub student_loan_rate: Decimal,
    /// Suggested workplace pension rate for callers; the engine defaults to 0
    pub pension_rate: Decimal,
    pub hicbc_start: Decimal,
    pub hicbc_full: Decimal,
    pub child_benefit_eldest_weekly: Decimal,
    pub child_benefit_others_weekly: Decimal,
}

impl TaxYearConfig {
    pub fn key(&self) -> String {
        self.tax_year.key()
    }

    pub fn label(&self) -> String {
        self.tax_year.display()
    }
}

// Employee class 1 rates were 12% until 5 Jan 2024; the year is modelled at the
// rate in force for most of it.
const NI_BANDS_2023_24: &[NiBand] = &[
    NiBand { threshold: dec!(0), rate: dec!(0), limit: Some(dec!(12570)) },
    NiBand { threshold: dec!(12570), rate: dec!(0.12), limit: Some(dec!(50270)) },
    NiBand { threshold: dec!(50270), rate: dec!(0.02), limit: None },
];

const NI_BANDS_FROM_2024_25: &[NiBand] = &[
    NiBand { threshold: dec!(0), rate: dec!(0), limit: Some(dec!(12570)) },
    NiBand { threshold: dec!(12570), rate: dec!(0.08), limit: Some(dec!(50270)) },
    NiBand { threshold: dec!(50270), rate: dec!(0.02), limit: None },
];

/// Registered tax years, ascending
pub static TAX_YEARS: &[TaxYearConfig] = &[
    TaxYearConfig {
        tax_year: TaxYear(2024),
        personal_allowance: dec!(12570),
        taper_threshold: dec!(100000),
        basic_rate_limit: dec!(50270),
        higher_rate_limit: dec!(125140),
        additional_rate_limit: None,
        basic_rate: dec!(0.20),
        higher_rate: dec!(0.40),
        additional_rate: dec!(0.45),
        ni_bands: NI_BANDS_2023_24,
        student_loan_threshold: dec!(27295),
        student_loan_rate: dec!(0.09),
        pension_rate: dec!(0.15),
        hicbc_start: dec!(50000),
        hicbc_full: dec!(60000),
        child_benefit_eldest_weekly: dec!(24.00),
        child_benefit_others_weekly: dec!(15.90),
    },
    TaxYearConfig {
        tax_year: TaxYear(2025),
        personal_allowance: dec!(12570),
        taper_threshold: dec!(100000),
        basic_rate_limit: dec!(50270),
        higher_rate_limit: dec!(125140),
        additional_rate_limit: None,
        basic_rate: dec!(0.20),
        higher_rate: dec!(0.40),
        additional_rate: dec!(0.45),
        ni_bands: NI_BANDS_FROM_2024_25,
        student_loan_threshold: dec!(27295),
        student_loan_rate: dec!(0.09),
        pension_rate: dec!(0.15),
        hicbc_start: dec!(60000),
        hicbc_full: dec!(80000),
        child_benefit_eldest_weekly: dec!(25.60),
        child_benefit_others_weekly: dec!(16.95),
    },
    TaxYearConfig {
        tax_year: TaxYear(2026),
        personal_allowance: dec!(12570),
        taper_threshold: dec!(100000),
        basic_rate_limit: dec!(50270),
        higher_rate_limit: dec!(125140),
        additional_rate_limit: None,
        basic_rate: dec!(0.20),
        higher_rate: dec!(0.40),
        additional_rate: dec!(0.45),
        ni_bands: NI_BANDS_FROM_2024_25,
        student_loan_threshold: dec!(28470),
        student_loan_rate: dec!(0.09),
        pension_rate: dec!(0.15),
        hicbc_start: dec!(60000),
        hicbc_full: dec!(80000),
        child_benefit_eldest_weekly: dec!(26.05),
        child_benefit_others_weekly: dec!(17.25),
    },
];

/// All registered configurations, ascending by year
pub fn tax_years() -> &'static [TaxYearConfig] {
    TAX_YEARS
}

pub fn config_for(year: TaxYear) -> Result<&'static TaxYearConfig, ConfigError> {
    TAX_YEARS
        .iter()
        .find(|c| c.tax_year == year)
        .ok_or_else(|| ConfigError::NotFound { key: year.key() })
}

/// Look up a configuration by key ("2025_26", "2025/26" or "2026")
pub fn config_for_key(key: &str) -> Result<&'static TaxYearConfig, ConfigError> {
    let year: TaxYear = key.parse()?;
    config_for(year)
}

pub fn latest() -> &'static TaxYearConfig {
    &TAX_YEARS[TAX_YEARS.len() - 1]
}

/// Configuration for the current tax year, or the latest registered one
pub fn default_config() -> &'static TaxYearConfig {
    let current = TaxYear::current();
    config_for(current).unwrap_or_else(|_| {
        let fallback = latest();
        log::warn!(
            "No configuration for current tax year {}, using {}",
            current,
            fallback.tax_year
        );
        fallback
    })
}
