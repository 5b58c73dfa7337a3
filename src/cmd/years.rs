//! Years command - list the tax years the calculator knows about

use crate::{
    cmd::{format_gbp, format_rate},
    core::{uk, TaxYear},
};
use clap::Args;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct YearsCommand {
    /// Output the full configuration as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Tabled)]
struct YearRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Tax year")]
    label: String,
    #[tabled(rename = "Allowance")]
    personal_allowance: String,
    #[tabled(rename = "Basic / Higher limit")]
    limits: String,
    #[tabled(rename = "Rates")]
    rates: String,
    #[tabled(rename = "NI main rate")]
    ni_rate: String,
    #[tabled(rename = "Student loan")]
    student_loan: String,
    #[tabled(rename = "HICBC")]
    hicbc: String,
    #[tabled(rename = "")]
    current: &'static str,
}

impl YearsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let years = uk::tax_years();
        if self.json {
            println!("{}", serde_json::to_string_pretty(years)?);
            return Ok(());
        }

        let current = TaxYear::current();
        let rows = years.iter().map(|c| YearRow {
            key: c.key(),
            label: c.label(),
            personal_allowance: format_gbp(c.personal_allowance),
            limits: format!(
                "{} / {}",
                format_gbp(c.basic_rate_limit),
                format_gbp(c.higher_rate_limit)
            ),
            rates: format!(
                "{} / {} / {}",
                format_rate(c.basic_rate),
                format_rate(c.higher_rate),
                format_rate(c.additional_rate)
            ),
            ni_rate: c
                .ni_bands
                .iter()
                .map(|band| band.rate)
                .max()
                .map(format_rate)
                .unwrap_or_default(),
            student_loan: format!(
                "{} over {}",
                format_rate(c.student_loan_rate),
                format_gbp(c.student_loan_threshold)
            ),
            hicbc: format!("{} - {}", format_gbp(c.hicbc_start), format_gbp(c.hicbc_full)),
            current: if c.tax_year == current { "current" } else { "" },
        });

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}
