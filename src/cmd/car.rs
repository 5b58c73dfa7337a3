//! Car command - running costs and ten-year ownership forecast per car

use crate::{
    cmd::{format_gbp, format_gbp_signed, schema::CsvField},
    core::{
        calculate_car_finance_breakdown, calculate_forecast_rows, CarFinanceBreakdown,
        CarFinanceInputs, CarForecastInputs, FieldParser, ForecastRow, FuelType, MileageUnit,
        OwnershipType, Strict, FORECAST_YEARS,
    },
    store::{JsonFileStore, KeyValueStore},
};
use anyhow::Context;
use clap::Args;
use payc_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CarCommand {
    /// JSON ({"cars": [...]}) or CSV file of cars to compare
    file: Option<PathBuf>,
    /// Also include cars previously saved under these labels
    #[arg(short, long)]
    load: Vec<String>,
    /// Save every car under its label
    #[arg(long)]
    save: bool,
    /// Reject numeric fields that are not numbers instead of treating them as zero
    #[arg(long)]
    strict: bool,
    /// Output forecast rows as CSV
    #[arg(long, conflicts_with = "json")]
    csv: bool,
    /// Output JSON instead of tables
    #[arg(long)]
    json: bool,
}

/// One car tab: a label plus everything typed in for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CarTab {
    /// Name shown for this car
    pub label: String,
    #[serde(flatten)]
    pub inputs: CarForecastInputs,
}

/// JSON input file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CarFile {
    pub cars: Vec<CarTab>,
}

/// CSV input row, one car per row
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct CarRecord {
    /// Name shown for this car
    pub label: String,
    /// lease, PCP, HP or owned
    pub ownership: Option<OwnershipType>,
    /// Yearly finance or lease payments (£)
    pub finance: Option<String>,
    /// Years of finance payments remaining
    pub finance_years: Option<String>,
    /// Final PCP payment (£)
    pub balloon_payment: Option<String>,
    /// Yearly vehicle excise duty (£)
    pub road_tax: Option<String>,
    /// Yearly servicing and maintenance (£)
    pub servicing: Option<String>,
    /// Yearly insurance premium (£)
    pub insurance: Option<String>,
    /// Any other yearly cost (£)
    pub extra: Option<String>,
    /// Miles driven per mileage_unit
    pub mileage: Option<String>,
    /// year or month
    pub mileage_unit: Option<MileageUnit>,
    /// unleaded or electric
    pub fuel_type: Option<FuelType>,
    /// Pence per litre (unleaded) or per kWh (electric)
    pub fuel_price: Option<String>,
    /// Miles per gallon (unleaded) or miles per kWh (electric)
    pub fuel_efficiency: Option<String>,
    /// Current market value (£)
    pub current_value: Option<String>,
    /// Current age in years
    pub current_age: Option<String>,
    /// Odometer reading in miles
    pub current_mileage: Option<String>,
    /// First-year one-off cost, negative for a saving (£)
    pub one_off: Option<String>,
}

impl From<CarRecord> for CarTab {
    fn from(record: CarRecord) -> Self {
        CarTab {
            label: record.label,
            inputs: CarForecastInputs {
                costs: CarFinanceInputs {
                    finance: record.finance.unwrap_or_default(),
                    road_tax: record.road_tax.unwrap_or_default(),
                    servicing: record.servicing.unwrap_or_default(),
                    insurance: record.insurance.unwrap_or_default(),
                    extra: record.extra.unwrap_or_default(),
                    mileage: record.mileage.unwrap_or_default(),
                    mileage_unit: record.mileage_unit.unwrap_or_default(),
                    fuel_type: record.fuel_type.unwrap_or_default(),
                    fuel_price: record.fuel_price.unwrap_or_default(),
                    fuel_efficiency: record.fuel_efficiency.unwrap_or_default(),
                    ownership: record.ownership.unwrap_or_default(),
                    balloon_payment: record.balloon_payment.unwrap_or_default(),
                },
                current_value: record.current_value,
                current_age: record.current_age,
                current_mileage: record.current_mileage,
                finance_years: record.finance_years.unwrap_or_default(),
                one_off: record.one_off.unwrap_or_default(),
            },
        }
    }
}

/// Read cars from a JSON file, or a CSV file when the extension says so
pub fn read_cars(path: &Path) -> anyhow::Result<Vec<CarTab>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let cars = if is_csv {
        read_cars_csv(reader)?
    } else {
        let file: CarFile = serde_json::from_reader(reader)
            .with_context(|| format!("parsing {}", path.display()))?;
        file.cars
    };
    log::debug!("Read {} cars from {}", cars.len(), path.display());
    Ok(cars)
}

pub fn read_cars_csv<R: io::Read>(reader: R) -> anyhow::Result<Vec<CarTab>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut cars = Vec::new();
    for (index, result) in rdr.deserialize::<CarRecord>().enumerate() {
        let record = result.with_context(|| format!("car record {}", index + 1))?;
        cars.push(record.into());
    }
    Ok(cars)
}

/// Check every numeric field of a car parses, empty fields allowed
pub fn validate_strict(inputs: &CarForecastInputs) -> anyhow::Result<()> {
    inputs.costs.resolve(&Strict)?;
    Strict.parse("finance_years", &inputs.finance_years)?;
    Strict.parse("one_off", &inputs.one_off)?;
    for (field, raw) in [
        ("current_value", &inputs.current_value),
        ("current_age", &inputs.current_age),
        ("current_mileage", &inputs.current_mileage),
    ] {
        if let Some(raw) = raw {
            Strict.parse(field, raw)?;
        }
    }
    Ok(())
}

pub fn car_key(label: &str) -> String {
    format!("car.{label}")
}

#[derive(Debug, Serialize)]
struct CarReport<'a> {
    label: &'a str,
    ownership: OwnershipType,
    breakdown: CarFinanceBreakdown,
    monthly: Decimal,
    forecast: Vec<ForecastRow>,
}

impl<'a> CarReport<'a> {
    fn new(tab: &'a CarTab) -> Self {
        let breakdown = calculate_car_finance_breakdown(&tab.inputs.costs);
        Self {
            label: &tab.label,
            ownership: tab.inputs.costs.ownership,
            monthly: breakdown.monthly(),
            breakdown,
            forecast: calculate_forecast_rows(&tab.inputs),
        }
    }
}

#[derive(Tabled)]
struct CostRow {
    #[tabled(rename = "Cost")]
    item: &'static str,
    #[tabled(rename = "Yearly")]
    yearly: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

impl CostRow {
    fn new(item: &'static str, yearly: Decimal) -> Self {
        Self {
            item,
            yearly: format_gbp(yearly),
            monthly: format_gbp(yearly / crate::core::salary::MONTHS_PER_YEAR),
        }
    }
}

#[derive(Tabled)]
struct ForecastTableRow {
    #[tabled(rename = "Year")]
    year: u32,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Value")]
    residual_value: String,
    #[tabled(rename = "Depreciation")]
    depreciation: String,
    #[tabled(rename = "Maintenance")]
    maintenance: String,
    #[tabled(rename = "Finance")]
    finance: String,
    #[tabled(rename = "One-off")]
    one_off: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Total cost")]
    total_cost: String,
}

impl From<&ForecastRow> for ForecastTableRow {
    fn from(row: &ForecastRow) -> Self {
        Self {
            year: row.year,
            age: row.age.normalize().to_string(),
            residual_value: format_gbp(row.residual_value),
            depreciation: format_gbp_signed(row.depreciation),
            maintenance: format_gbp(row.maintenance),
            finance: format_gbp(row.finance),
            one_off: format_gbp_signed(row.one_off),
            cost: format_gbp_signed(row.cost),
            total_cost: format_gbp_signed(row.total_cost),
        }
    }
}

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Car")]
    label: String,
    #[tabled(rename = "Ownership")]
    ownership: &'static str,
    #[tabled(rename = "Yearly")]
    yearly: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
    #[tabled(rename = "Running costs")]
    running: String,
    #[tabled(rename = "Total cost")]
    total_cost: String,
    #[tabled(rename = "Final value")]
    final_value: String,
}

/// Forecast row flattened for CSV output
#[derive(Serialize)]
struct ForecastCsvRow<'a> {
    label: &'a str,
    year: u32,
    age: Decimal,
    residual_value: Decimal,
    depreciation: Decimal,
    maintenance: Decimal,
    finance: Decimal,
    one_off: Decimal,
    cost: Decimal,
    total_cost: Decimal,
}

impl CarCommand {
    pub fn exec(&self, store_path: &Path) -> anyhow::Result<()> {
        let mut store = JsonFileStore::open(store_path)?;

        let mut cars = Vec::new();
        if let Some(path) = &self.file {
            cars.extend(read_cars(path)?);
        }
        for label in &self.load {
            let key = car_key(label);
            if !store.contains(&key) {
                anyhow::bail!("No car saved as '{}' in {}", label, store.path().display());
            }
            let inputs: CarForecastInputs = store.get(&key, CarForecastInputs::default())?;
            cars.push(CarTab {
                label: label.clone(),
                inputs,
            });
        }
        if cars.is_empty() {
            anyhow::bail!("No cars given: pass an input file or --load a saved car");
        }

        if self.strict {
            for car in &cars {
                validate_strict(&car.inputs).with_context(|| format!("car '{}'", car.label))?;
            }
        }

        if self.save {
            for car in &cars {
                store.set(&car_key(&car.label), &car.inputs)?;
            }
            log::info!("Saved {} cars to {}", cars.len(), store.path().display());
        }

        let reports: Vec<_> = cars.iter().map(CarReport::new).collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else if self.csv {
            let rows = reports.iter().flat_map(|report| {
                report.forecast.iter().map(move |row| ForecastCsvRow {
                    label: report.label,
                    year: row.year,
                    age: row.age,
                    residual_value: row.residual_value,
                    depreciation: row.depreciation,
                    maintenance: row.maintenance,
                    finance: row.finance,
                    one_off: row.one_off,
                    cost: row.cost,
                    total_cost: row.total_cost,
                })
            });
            crate::utils::write_csv(rows, io::stdout())?;
        } else {
            for report in &reports {
                print_report(report);
            }
            if reports.len() > 1 {
                print_comparison(&reports);
            }
        }
        Ok(())
    }
}

fn print_report(report: &CarReport) {
    let b = &report.breakdown;
    println!("{} ({})", report.label, report.ownership.as_str());

    let mut rows = vec![
        CostRow::new("Finance", b.finance),
        CostRow::new("Fuel", b.fuel),
        CostRow::new("Road tax", b.road_tax),
        CostRow::new("Servicing", b.servicing),
        CostRow::new("Insurance", b.insurance),
        CostRow::new("Extra", b.extra),
        CostRow::new("Total", b.total),
    ];
    if let Some(balloon) = b.balloon_payment {
        rows.push(CostRow {
            item: "Balloon payment",
            yearly: format_gbp(balloon),
            monthly: String::new(),
        });
    }
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    if report.forecast.is_empty() {
        println!("No forecast: current value, age and mileage are required");
    } else {
        let rows: Vec<ForecastTableRow> = report.forecast.iter().map(Into::into).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}-year forecast", FORECAST_YEARS);
        println!("{}", table);
    }
    println!();
}

fn print_comparison(reports: &[CarReport]) {
    let rows = reports.iter().map(|report| {
        let last = report.forecast.last();
        ComparisonRow {
            label: report.label.to_string(),
            ownership: report.ownership.as_str(),
            yearly: format_gbp(report.breakdown.total),
            monthly: format_gbp(report.monthly),
            running: format_gbp(report.breakdown.over_years(FORECAST_YEARS)),
            total_cost: last
                .map(|row| format_gbp_signed(row.total_cost))
                .unwrap_or_else(|| "-".to_string()),
            final_value: last
                .map(|row| format_gbp(row.residual_value))
                .unwrap_or_else(|| "-".to_string()),
        }
    });
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("Comparison over {} years", FORECAST_YEARS);
    println!("{}", table);
}
