use super::uk::TaxYearConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

pub const MONTHS_PER_YEAR: Decimal = dec!(12);
pub const WEEKS_PER_YEAR: Decimal = dec!(52);
/// 5 working days a week for 52 weeks
pub const WORKDAYS_PER_YEAR: Decimal = dec!(260);

/// Salary sacrifice and student loan options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryOptions {
    /// Pension contribution as a fraction of gross (0.05 = 5%)
    pub pension_rate: Decimal,
    /// Additional yearly salary sacrifice (cycle to work, EV scheme etc.)
    pub extra_salary_sacrifice: Decimal,
    /// Plan 2 student loan repayments
    pub include_student_loan: bool,
}

impl Default for SalaryOptions {
    fn default() -> Self {
        Self {
            pension_rate: Decimal::ZERO,
            extra_salary_sacrifice: Decimal::ZERO,
            include_student_loan: true,
        }
    }
}

/// A yearly figure with its monthly, weekly and working-day equivalents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PeriodAmounts {
    pub yearly: Decimal,
    pub monthly: Decimal,
    pub weekly: Decimal,
    pub daily: Decimal,
}

impl PeriodAmounts {
    pub fn from_yearly(yearly: Decimal) -> Self {
        Self {
            yearly,
            monthly: yearly / MONTHS_PER_YEAR,
            weekly: yearly / WEEKS_PER_YEAR,
            daily: yearly / WORKDAYS_PER_YEAR,
        }
    }
}

/// Income consumed by a band and the tax charged on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BandSlice {
    pub income: Decimal,
    pub tax: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaxBreakdown {
    pub personal_allowance: BandSlice,
    pub basic: BandSlice,
    pub higher: BandSlice,
    pub additional: BandSlice,
}

impl TaxBreakdown {
    pub fn total(&self) -> Decimal {
        self.personal_allowance.tax + self.basic.tax + self.higher.tax + self.additional.tax
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryBreakdown {
    pub tax_year: String,
    pub gross: PeriodAmounts,
    pub pension: PeriodAmounts,
    pub extra_salary_sacrifice: PeriodAmounts,
    /// Personal allowance after the high-income taper
    pub personal_allowance: Decimal,
    pub taxable_income: PeriodAmounts,
    pub tax: PeriodAmounts,
    pub tax_breakdown: TaxBreakdown,
    pub ni: PeriodAmounts,
    pub student_loan: PeriodAmounts,
    pub take_home: PeriodAmounts,
}

impl SalaryBreakdown {
    /// Adjusted net income used for the child benefit charge: gross after
    /// salary sacrifice.
    pub fn hicbc_income(&self) -> Decimal {
        self.take_home.yearly + self.tax.yearly + self.ni.yearly + self.student_loan.yearly
    }
}

/// Personal allowance after withdrawing £1 for every £2 of gross over the
/// taper threshold. Keyed on gross, before any salary sacrifice.
pub fn personal_allowance(gross: Decimal, config: &TaxYearConfig) -> Decimal {
    if gross > config.taper_threshold {
        let reduction = ((gross - config.taper_threshold) / dec!(2)).floor();
        (config.personal_allowance - reduction).max(Decimal::ZERO)
    } else {
        config.personal_allowance
    }
}

/// Walk income through the allowance, basic, higher and additional bands.
///
/// The basic band is narrowed by the (possibly tapered) allowance; the higher
/// band keeps its full configured width.
fn apply_tax_bands(income: Decimal, allowance: Decimal, config: &TaxYearConfig) -> TaxBreakdown {
    let mut remaining = income;
    let mut breakdown = TaxBreakdown::default();

    let allowance_used = allowance.min(remaining).max(Decimal::ZERO);
    breakdown.personal_allowance.income = allowance_used;
    remaining -= allowance_used;

    if remaining > Decimal::ZERO {
        let basic = (config.basic_rate_limit - allowance).min(remaining);
        breakdown.basic = BandSlice {
            income: basic,
            tax: basic * config.basic_rate,
        };
        remaining -= basic;
    }

    if remaining > Decimal::ZERO {
        let higher = (config.higher_rate_limit - config.basic_rate_limit).min(remaining);
        breakdown.higher = BandSlice {
            income: higher,
            tax: higher * config.higher_rate,
        };
        remaining -= higher;
    }

    if remaining > Decimal::ZERO {
        breakdown.additional = BandSlice {
            income: remaining,
            tax: remaining * config.additional_rate,
        };
    }

    breakdown
}

pub fn national_insurance(income: Decimal, config: &TaxYearConfig) -> Decimal {
    config
        .ni_bands
        .iter()
        .filter(|band| income > band.threshold)
        .map(|band| {
            let upper = band.limit.map_or(income, |limit| limit.min(income));
            (upper - band.threshold).max(Decimal::ZERO) * band.rate
        })
        .sum()
}

pub fn student_loan(income: Decimal, config: &TaxYearConfig) -> Decimal {
    if income > config.student_loan_threshold {
        (income - config.student_loan_threshold) * config.student_loan_rate
    } else {
        Decimal::ZERO
    }
}

/// Calculate the take-home breakdown for a gross yearly salary.
///
/// `gross` is expected to be positive; validation is the caller's job.
pub fn calculate_breakdown(
    gross: Decimal,
    config: &TaxYearConfig,
    opts: &SalaryOptions,
) -> SalaryBreakdown {
    let pension = if opts.pension_rate > Decimal::ZERO {
        gross * opts.pension_rate
    } else {
        Decimal::ZERO
    };
    let extra = opts.extra_salary_sacrifice;
    let total_sacrifice = pension + extra;

    let allowance = personal_allowance(gross, config);
    let post_sacrifice = gross - total_sacrifice;
    let taxable_income = (post_sacrifice - allowance).max(Decimal::ZERO);

    let tax_breakdown = apply_tax_bands(post_sacrifice, allowance, config);
    let tax = tax_breakdown.total();
    let ni = national_insurance(post_sacrifice, config);
    let student_loan = if opts.include_student_loan {
        student_loan(post_sacrifice, config)
    } else {
        Decimal::ZERO
    };

    let take_home = gross - pension - extra - tax - ni - student_loan;

    log::debug!(
        "{} gross {} allowance {} taxable {} tax {} ni {} student loan {}",
        config.tax_year,
        gross,
        allowance,
        taxable_income,
        tax,
        ni,
        student_loan
    );

    SalaryBreakdown {
        tax_year: config.label(),
        gross: PeriodAmounts::from_yearly(gross),
        pension: PeriodAmounts::from_yearly(pension),
        extra_salary_sacrifice: PeriodAmounts::from_yearly(extra),
        personal_allowance: allowance,
        taxable_income: PeriodAmounts::from_yearly(taxable_income),
        tax: PeriodAmounts::from_yearly(tax),
        tax_breakdown,
        ni: PeriodAmounts::from_yearly(ni),
        student_loan: PeriodAmounts::from_yearly(student_loan),
        take_home: PeriodAmounts::from_yearly(take_home),
    }
}

/// High Income Child Benefit Charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hicbc {
    pub children: u32,
    /// Yearly child benefit received
    pub total_benefit: Decimal,
    /// Percentage of the benefit clawed back (0..=100)
    pub percent: Decimal,
    pub charge: Decimal,
}

/// Child benefit clawback: 1% of the benefit for every complete £100 of
/// `net_income` above the start threshold, capped at 100%, and all of it at
/// or above the full threshold. At least one child is assumed.
pub fn calculate_hicbc(net_income: Decimal, config: &TaxYearConfig, children: u32) -> Hicbc {
    let children = children.max(1);
    let eldest = config.child_benefit_eldest_weekly * WEEKS_PER_YEAR;
    let others =
        Decimal::from(children - 1) * config.child_benefit_others_weekly * WEEKS_PER_YEAR;
    let total_benefit = eldest + others;

    let percent = if net_income <= config.hicbc_start {
        Decimal::ZERO
    } else if net_income >= config.hicbc_full {
        dec!(100)
    } else {
        ((net_income - config.hicbc_start) / dec!(100))
            .floor()
            .min(dec!(100))
    };
    let charge = percent / dec!(100) * total_benefit;

    Hicbc {
        children,
        total_benefit,
        percent,
        charge,
    }
}
