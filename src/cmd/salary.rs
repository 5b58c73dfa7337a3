//! Salary command - take-home pay breakdown for one gross salary

use crate::{
    cmd::{format_gbp, format_rate},
    core::{
        calculate_breakdown, calculate_hicbc,
        input::parse_number,
        salary::{PeriodAmounts, MONTHS_PER_YEAR},
        uk, Hicbc, SalaryBreakdown, SalaryOptions, TaxYearConfig,
    },
    store::{JsonFileStore, KeyValueStore},
};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SalaryCommand {
    /// Gross yearly salary (£)
    gross: Option<String>,
    /// Tax year, e.g. 2025_26 or 2025/26 (defaults to the current tax year)
    #[arg(short, long)]
    year: Option<String>,
    /// Pension salary sacrifice, percent of gross (defaults to 15)
    #[arg(short, long)]
    pension: Option<String>,
    /// Additional salary sacrifice (£)
    #[arg(short, long)]
    extra_sacrifice: Option<String>,
    /// Whether the additional salary sacrifice is per year or per month
    #[arg(long, value_enum)]
    extra_unit: Option<SacrificeUnit>,
    /// Exclude Plan 2 student loan repayments
    #[arg(long)]
    no_student_loan: bool,
    /// Include the High Income Child Benefit Charge
    #[arg(long)]
    hicbc: bool,
    /// Number of children receiving child benefit
    #[arg(long)]
    children: Option<u32>,
    /// Save these inputs under a label
    #[arg(long)]
    save: Option<String>,
    /// Start from inputs previously saved under a label
    #[arg(long)]
    load: Option<String>,
    /// Output JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SacrificeUnit {
    #[default]
    Year,
    Month,
}

/// Salary inputs as entered, persisted per saved tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryTabInputs {
    pub salary: String,
    pub tax_year: String,
    pub pension_percent: String,
    pub extra_salary_sacrifice: String,
    pub extra_salary_sacrifice_unit: SacrificeUnit,
    pub include_student_loan: bool,
    pub include_hicbc: bool,
    pub children: u32,
}

impl Default for SalaryTabInputs {
    fn default() -> Self {
        Self {
            salary: String::new(),
            tax_year: uk::default_config().key(),
            pension_percent: "15".to_string(),
            extra_salary_sacrifice: String::new(),
            extra_salary_sacrifice_unit: SacrificeUnit::Year,
            include_student_loan: true,
            include_hicbc: false,
            children: 1,
        }
    }
}

/// Why no breakdown can be shown for the entered inputs
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SalaryInputError {
    #[error("enter a gross salary above £0")]
    Salary,
    #[error("pension contribution must be a percentage between 0 and 100")]
    PensionPercent,
    #[error("extra salary sacrifice must be an amount of £0 or more")]
    ExtraSacrifice,
}

impl SalaryTabInputs {
    /// Validated gross salary and engine options
    pub fn options(&self) -> Result<(Decimal, SalaryOptions), SalaryInputError> {
        let gross = parse_number(&self.salary)
            .filter(|g| *g > Decimal::ZERO)
            .ok_or(SalaryInputError::Salary)?;

        let pension_rate = if self.pension_percent.trim().is_empty() {
            Decimal::ZERO
        } else {
            parse_number(&self.pension_percent)
                .filter(|p| (Decimal::ZERO..=dec!(100)).contains(p))
                .ok_or(SalaryInputError::PensionPercent)?
                / dec!(100)
        };

        let extra = if self.extra_salary_sacrifice.trim().is_empty() {
            Decimal::ZERO
        } else {
            parse_number(&self.extra_salary_sacrifice)
                .filter(|e| *e >= Decimal::ZERO)
                .ok_or(SalaryInputError::ExtraSacrifice)?
        };
        let extra_salary_sacrifice = match self.extra_salary_sacrifice_unit {
            SacrificeUnit::Year => extra,
            SacrificeUnit::Month => extra * MONTHS_PER_YEAR,
        };

        Ok((
            gross,
            SalaryOptions {
                pension_rate,
                extra_salary_sacrifice,
                include_student_loan: self.include_student_loan,
            },
        ))
    }
}

#[derive(Debug, Serialize)]
struct SalaryReport {
    inputs: SalaryTabInputs,
    breakdown: SalaryBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    hicbc: Option<Hicbc>,
}

#[derive(Tabled)]
struct PeriodRow {
    #[tabled(rename = "Item")]
    item: &'static str,
    #[tabled(rename = "Yearly")]
    yearly: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
    #[tabled(rename = "Weekly")]
    weekly: String,
    #[tabled(rename = "Daily")]
    daily: String,
}

impl PeriodRow {
    fn new(item: &'static str, amounts: &PeriodAmounts) -> Self {
        Self {
            item,
            yearly: format_gbp(amounts.yearly),
            monthly: format_gbp(amounts.monthly),
            weekly: format_gbp(amounts.weekly),
            daily: format_gbp(amounts.daily),
        }
    }
}

#[derive(Tabled)]
struct BandRow {
    #[tabled(rename = "Band")]
    band: &'static str,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Tax")]
    tax: String,
}

pub fn salary_key(label: &str) -> String {
    format!("salary.{label}")
}

impl SalaryCommand {
    pub fn exec(&self, store_path: &Path) -> anyhow::Result<()> {
        let mut store = JsonFileStore::open(store_path)?;

        let mut inputs = match &self.load {
            Some(label) => {
                let key = salary_key(label);
                if !store.contains(&key) {
                    anyhow::bail!(
                        "No salary saved as '{}' in {}",
                        label,
                        store.path().display()
                    );
                }
                store.get(&key, SalaryTabInputs::default())?
            }
            None => SalaryTabInputs::default(),
        };
        self.apply_overrides(&mut inputs);

        let config = self.resolve_config(&inputs)?;
        inputs.tax_year = config.key();

        if let Some(label) = &self.save {
            store.set(&salary_key(label), &inputs)?;
            log::info!("Saved salary '{}' to {}", label, store.path().display());
        }

        let (gross, options) = match inputs.options() {
            Ok(valid) => valid,
            Err(reason) => {
                log::debug!("Invalid salary inputs {:?}: {}", inputs, reason);
                println!("No breakdown: {}", reason);
                return Ok(());
            }
        };

        let breakdown = calculate_breakdown(gross, config, &options);
        let hicbc = inputs
            .include_hicbc
            .then(|| calculate_hicbc(breakdown.hicbc_income(), config, inputs.children));

        if self.json {
            let report = SalaryReport {
                inputs,
                breakdown,
                hicbc,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        print_breakdown(&breakdown, config);
        if let Some(hicbc) = hicbc {
            print_hicbc(&hicbc, &breakdown);
        }
        Ok(())
    }

    fn apply_overrides(&self, inputs: &mut SalaryTabInputs) {
        if let Some(gross) = &self.gross {
            inputs.salary = gross.clone();
        }
        if let Some(year) = &self.year {
            inputs.tax_year = year.clone();
        }
        if let Some(pension) = &self.pension {
            inputs.pension_percent = pension.clone();
        }
        if let Some(extra) = &self.extra_sacrifice {
            inputs.extra_salary_sacrifice = extra.clone();
        }
        if let Some(unit) = self.extra_unit {
            inputs.extra_salary_sacrifice_unit = unit;
        }
        if self.no_student_loan {
            inputs.include_student_loan = false;
        }
        if self.hicbc {
            inputs.include_hicbc = true;
        }
        if let Some(children) = self.children {
            inputs.children = children;
        }
    }

    /// An unknown year given on the command line is an error; a stale saved
    /// year falls back to the default.
    fn resolve_config(&self, inputs: &SalaryTabInputs) -> anyhow::Result<&'static TaxYearConfig> {
        match uk::config_for_key(&inputs.tax_year) {
            Ok(config) => Ok(config),
            Err(err) if self.year.is_some() => Err(err.into()),
            Err(err) => {
                let fallback = uk::default_config();
                log::warn!("{}, using {}", err, fallback.label());
                Ok(fallback)
            }
        }
    }
}

fn print_breakdown(breakdown: &SalaryBreakdown, config: &TaxYearConfig) {
    println!("Tax year {}", breakdown.tax_year);
    println!();

    let mut rows = vec![PeriodRow::new("Gross salary", &breakdown.gross)];
    if breakdown.pension.yearly > Decimal::ZERO {
        rows.push(PeriodRow::new("Pension", &breakdown.pension));
    }
    if breakdown.extra_salary_sacrifice.yearly > Decimal::ZERO {
        rows.push(PeriodRow::new(
            "Extra salary sacrifice",
            &breakdown.extra_salary_sacrifice,
        ));
    }
    rows.extend([
        PeriodRow::new("Taxable income", &breakdown.taxable_income),
        PeriodRow::new("Income tax", &breakdown.tax),
        PeriodRow::new("National Insurance", &breakdown.ni),
    ]);
    if breakdown.student_loan.yearly > Decimal::ZERO {
        rows.push(PeriodRow::new("Student loan", &breakdown.student_loan));
    }
    rows.push(PeriodRow::new("Take home", &breakdown.take_home));

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    let bands = &breakdown.tax_breakdown;
    let band_rows = vec![
        BandRow {
            band: "Personal allowance",
            rate: format_rate(Decimal::ZERO),
            income: format_gbp(bands.personal_allowance.income),
            tax: format_gbp(bands.personal_allowance.tax),
        },
        BandRow {
            band: "Basic",
            rate: format_rate(config.basic_rate),
            income: format_gbp(bands.basic.income),
            tax: format_gbp(bands.basic.tax),
        },
        BandRow {
            band: "Higher",
            rate: format_rate(config.higher_rate),
            income: format_gbp(bands.higher.income),
            tax: format_gbp(bands.higher.tax),
        },
        BandRow {
            band: "Additional",
            rate: format_rate(config.additional_rate),
            income: format_gbp(bands.additional.income),
            tax: format_gbp(bands.additional.tax),
        },
    ];

    println!();
    println!(
        "Personal allowance {} (tapered above {})",
        format_gbp(breakdown.personal_allowance),
        format_gbp(config.taper_threshold)
    );
    let table = Table::new(band_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

fn print_hicbc(hicbc: &Hicbc, breakdown: &SalaryBreakdown) {
    println!();
    println!(
        "High Income Child Benefit Charge on {} income, {} {}",
        format_gbp(breakdown.hicbc_income()),
        hicbc.children,
        if hicbc.children == 1 { "child" } else { "children" }
    );
    println!(
        "  Child benefit {} per year, {}% repaid: {}",
        format_gbp(hicbc.total_benefit),
        hicbc.percent,
        format_gbp(hicbc.charge)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(salary: &str) -> SalaryTabInputs {
        SalaryTabInputs {
            salary: salary.to_string(),
            tax_year: "2025_26".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_new_tab() {
        let defaults = SalaryTabInputs::default();
        assert_eq!(defaults.pension_percent, "15");
        assert!(defaults.include_student_loan);
        assert!(!defaults.include_hicbc);
        assert_eq!(defaults.children, 1);
    }

    #[test]
    fn options_convert_percent_and_monthly_sacrifice() {
        let mut tab = inputs("60000");
        tab.pension_percent = "5".to_string();
        tab.extra_salary_sacrifice = "100".to_string();
        tab.extra_salary_sacrifice_unit = SacrificeUnit::Month;

        let (gross, options) = tab.options().unwrap();
        assert_eq!(gross, dec!(60000));
        assert_eq!(options.pension_rate, dec!(0.05));
        assert_eq!(options.extra_salary_sacrifice, dec!(1200));
        assert!(options.include_student_loan);
    }

    #[test]
    fn empty_pension_means_none() {
        let mut tab = inputs("30000");
        tab.pension_percent = String::new();
        let (_, options) = tab.options().unwrap();
        assert_eq!(options.pension_rate, Decimal::ZERO);
    }

    #[test]
    fn invalid_inputs_give_no_breakdown() {
        assert_eq!(inputs("").options(), Err(SalaryInputError::Salary));
        assert_eq!(inputs("0").options(), Err(SalaryInputError::Salary));
        assert_eq!(inputs("-5").options(), Err(SalaryInputError::Salary));
        assert_eq!(inputs("lots").options(), Err(SalaryInputError::Salary));

        let mut tab = inputs("30000");
        tab.pension_percent = "101".to_string();
        assert_eq!(tab.options(), Err(SalaryInputError::PensionPercent));
        tab.pension_percent = "-1".to_string();
        assert_eq!(tab.options(), Err(SalaryInputError::PensionPercent));

        let mut tab = inputs("30000");
        tab.extra_salary_sacrifice = "-10".to_string();
        assert_eq!(tab.options(), Err(SalaryInputError::ExtraSacrifice));
    }

    #[test]
    fn saved_tab_missing_fields_take_defaults() {
        let tab: SalaryTabInputs = serde_json::from_str(r#"{"salary": "45000"}"#).unwrap();
        assert_eq!(tab.salary, "45000");
        assert_eq!(tab.pension_percent, "15");
        assert_eq!(tab.children, 1);
    }

    #[test]
    fn report_identity_holds() {
        let (gross, options) = inputs("52000").options().unwrap();
        let config = uk::config_for_key("2025_26").unwrap();
        let b = calculate_breakdown(gross, config, &options);
        assert_eq!(
            b.take_home.yearly,
            b.gross.yearly
                - b.pension.yearly
                - b.extra_salary_sacrifice.yearly
                - b.tax.yearly
                - b.ni.yearly
                - b.student_loan.yearly
        );
    }
}
