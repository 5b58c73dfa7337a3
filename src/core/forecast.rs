use super::car::{checked_sum, or_zero, CarFinanceInputs, OwnershipType};
use super::input::{deserialize_raw, deserialize_raw_opt, parse_number, parse_or_zero};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const FORECAST_YEARS: u32 = 10;
pub const DEFAULT_ANNUAL_MILES: Decimal = dec!(9000);
/// Value lost (or gained) per 1,000 miles above (or below) the expected mileage
pub const MILEAGE_ADJUSTMENT_PER_1000: Decimal = dec!(75);
pub const SCRAP_AGE: Decimal = dec!(20);

/// Fraction of value kept over a year, by age at the end of that year.
/// `None` once the car has reached scrap age.
fn retention(age: Decimal) -> Option<Decimal> {
    if age < dec!(3) {
        Some(dec!(0.75))
    } else if age < dec!(7) {
        Some(dec!(0.85))
    } else if age < SCRAP_AGE {
        Some(dec!(0.90))
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CarValueForecastPoint {
    pub age: Decimal,
    pub value: Decimal,
}

/// Forecast residual values for `years_ahead` years.
///
/// Each year the value is depreciated by the age band the car moves into, then
/// adjusted by £75 per 1,000 miles the car is over (or under) `annual_miles`
/// per year of age, and floored at zero.
pub fn forecast_car_values(
    current_value: Decimal,
    current_age: Decimal,
    years_ahead: u32,
    current_miles: Decimal,
    annual_miles: Decimal,
) -> Vec<CarValueForecastPoint> {
    let mut value = current_value;
    let mut points = Vec::with_capacity(years_ahead as usize);

    for year in 1..=years_ahead {
        let year = Decimal::from(year);
        let age = current_age.checked_add(year).unwrap_or(Decimal::MAX);

        value = match retention(age) {
            Some(kept) => {
                let kept = or_zero("residual value", value.checked_mul(kept));
                let adjustment = mileage_adjustment(age, year, current_miles, annual_miles);
                or_zero("residual value", kept.checked_sub(adjustment)).max(Decimal::ZERO)
            }
            // scrapped, mileage no longer matters
            None => Decimal::ZERO,
        };

        points.push(CarValueForecastPoint { age, value });
    }

    points
}

fn mileage_adjustment(
    age: Decimal,
    year: Decimal,
    current_miles: Decimal,
    annual_miles: Decimal,
) -> Decimal {
    let adjustment = (|| {
        let expected_miles = age.checked_mul(annual_miles)?;
        let actual_miles = current_miles.checked_add(year.checked_mul(annual_miles)?)?;
        actual_miles
            .checked_sub(expected_miles)?
            .checked_div(dec!(1000))?
            .checked_mul(MILEAGE_ADJUSTMENT_PER_1000)
    })();
    or_zero("mileage adjustment", adjustment)
}

/// A car as entered in the planner: running costs plus what is needed to
/// forecast its value and finance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CarForecastInputs {
    #[serde(flatten)]
    pub costs: CarFinanceInputs,
    /// Current market value (£)
    #[serde(default, deserialize_with = "deserialize_raw_opt")]
    #[schemars(with = "Option<String>")]
    pub current_value: Option<String>,
    /// Current age in years
    #[serde(default, deserialize_with = "deserialize_raw_opt")]
    #[schemars(with = "Option<String>")]
    pub current_age: Option<String>,
    /// Odometer reading in miles
    #[serde(default, deserialize_with = "deserialize_raw_opt")]
    #[schemars(with = "Option<String>")]
    pub current_mileage: Option<String>,
    /// Years of finance payments remaining
    #[serde(default, deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub finance_years: String,
    /// First-year one-off cost, or saving if negative (deposit, part exchange)
    #[serde(default, deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub one_off: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastRow {
    pub year: u32,
    pub age: Decimal,
    pub residual_value: Decimal,
    pub maintenance: Decimal,
    pub depreciation: Decimal,
    pub finance: Decimal,
    pub one_off: Decimal,
    /// Cash spent this year
    pub cost: Decimal,
    /// Cumulative cash spent up to and including this year
    pub total_cost: Decimal,
}

fn present(raw: &Option<String>) -> Option<Decimal> {
    raw.as_deref().and_then(parse_number)
}

/// Ten-year ownership forecast for one car.
///
/// Empty unless the current value, age and mileage are all given, except for
/// leases which have no residual value to track.
pub fn calculate_forecast_rows(inputs: &CarForecastInputs) -> Vec<ForecastRow> {
    let costs = inputs.costs.resolve_or_zero();
    let breakdown = costs.breakdown();
    let mut finance_years = parse_or_zero(&inputs.finance_years)
        .trunc()
        .to_u32()
        .unwrap_or(0);

    let vehicle = match costs.ownership {
        OwnershipType::Lease => {
            finance_years = FORECAST_YEARS;
            Some((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO))
        }
        ownership => {
            if ownership == OwnershipType::Owned {
                finance_years = 0;
            }
            match (
                present(&inputs.current_value),
                present(&inputs.current_age),
                present(&inputs.current_mileage),
            ) {
                (Some(value), Some(age), Some(mileage)) => Some((value, age, mileage)),
                _ => None,
            }
        }
    };

    let Some((current_value, current_age, current_mileage)) = vehicle else {
        log::debug!("Skipping forecast: current value, age and mileage are required");
        return Vec::new();
    };

    let annual_miles = if costs.yearly_mileage > Decimal::ZERO {
        costs.yearly_mileage
    } else {
        DEFAULT_ANNUAL_MILES
    };
    let points = forecast_car_values(
        current_value,
        current_age,
        FORECAST_YEARS,
        current_mileage,
        annual_miles,
    );

    let maintenance = breakdown.maintenance();
    let one_off = parse_or_zero(&inputs.one_off);
    let balloon = breakdown.balloon_payment.unwrap_or(Decimal::ZERO);

    let mut previous_value = current_value;
    let mut total_cost = Decimal::ZERO;
    let mut rows = Vec::with_capacity(points.len());

    for (index, point) in (0u32..).zip(points) {
        let mut finance = if index < finance_years {
            breakdown.finance
        } else {
            Decimal::ZERO
        };
        if costs.ownership == OwnershipType::Pcp && index + 1 == finance_years {
            finance = or_zero("finance", finance.checked_add(balloon));
        }
        let one_off = if index == 0 { one_off } else { Decimal::ZERO };
        let cost = or_zero("yearly cost", checked_sum(&[maintenance, finance, one_off]));
        total_cost = or_zero("total cost", total_cost.checked_add(cost));

        rows.push(ForecastRow {
            year: index + 1,
            age: point.age,
            residual_value: point.value,
            maintenance,
            depreciation: or_zero("depreciation", previous_value.checked_sub(point.value)),
            finance,
            one_off,
            cost,
            total_cost,
        });
        previous_value = point.value;
    }

    log::debug!(
        "Forecast {} years, {} ownership, final value {}, total cost {}",
        rows.len(),
        costs.ownership.as_str(),
        previous_value,
        total_cost
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::FuelType;

    fn car(ownership: OwnershipType) -> CarForecastInputs {
        CarForecastInputs {
            costs: CarFinanceInputs {
                finance: "2400".to_string(),
                road_tax: "190".to_string(),
                servicing: "300".to_string(),
                insurance: "510".to_string(),
                mileage: "9000".to_string(),
                fuel_type: FuelType::Unknown,
                ownership,
                ..Default::default()
            },
            current_value: Some("20000".to_string()),
            current_age: Some("2".to_string()),
            current_mileage: Some("18000".to_string()),
            finance_years: "3".to_string(),
            one_off: "".to_string(),
        }
    }

    #[test]
    fn first_year_uses_band_of_new_age() {
        let points = forecast_car_values(dec!(20000), dec!(2), 1, dec!(18000), dec!(9000));
        assert_eq!(
            points,
            vec![CarValueForecastPoint {
                age: dec!(3),
                value: dec!(17000)
            }]
        );
    }

    #[test]
    fn young_car_loses_a_quarter() {
        let points = forecast_car_values(dec!(30000), dec!(0), 2, dec!(0), dec!(9000));
        assert_eq!(points[0].value, dec!(22500));
        assert_eq!(points[1].value, dec!(16875));
    }

    #[test]
    fn scrapped_at_twenty() {
        let points = forecast_car_values(dec!(2000), dec!(18), 3, dec!(162000), dec!(9000));
        assert_eq!(points[0].age, dec!(19));
        assert_eq!(points[0].value, dec!(1800));
        assert_eq!(points[1].value, dec!(0));
        assert_eq!(points[2].value, dec!(0));
    }

    #[test]
    fn scrapped_car_stays_worthless_with_low_mileage() {
        // far below the expected mileage, which would otherwise add value back
        let points = forecast_car_values(dec!(2000), dec!(19), 2, dec!(0), dec!(9000));
        assert_eq!(points[0].age, dec!(20));
        assert_eq!(points[0].value, dec!(0));
        assert_eq!(points[1].age, dec!(21));
        assert_eq!(points[1].value, dec!(0));
    }

    #[test]
    fn oversized_inputs_do_not_panic() {
        let huge = Decimal::MAX;
        let points = forecast_car_values(huge, dec!(1), 2, huge, huge);
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.value >= Decimal::ZERO));

        let points = forecast_car_values(dec!(10000), huge, 1, dec!(0), dec!(9000));
        assert_eq!(points[0].age, huge);
        assert_eq!(points[0].value, dec!(0));

        let mut inputs = car(OwnershipType::Pcp);
        inputs.costs.finance = "79228162514264337593543950335".to_string();
        inputs.costs.balloon_payment = "1".to_string();
        inputs.current_mileage = Some("79228162514264337593543950335".to_string());
        let rows = calculate_forecast_rows(&inputs);
        assert_eq!(rows.len(), FORECAST_YEARS as usize);
        // balloon on top of the largest payment overflows
        assert_eq!(rows[2].finance, dec!(0));
    }

    #[test]
    fn high_mileage_reduces_value() {
        let points = forecast_car_values(dec!(10000), dec!(5), 1, dec!(60000), dec!(10000));
        // 8,500 after depreciation, 10,000 miles over expectation
        assert_eq!(points[0].value, dec!(7750));
    }

    #[test]
    fn low_mileage_increases_value() {
        let points = forecast_car_values(dec!(10000), dec!(5), 1, dec!(40000), dec!(10000));
        assert_eq!(points[0].value, dec!(9250));
    }

    #[test]
    fn value_never_negative() {
        let points = forecast_car_values(dec!(1000), dec!(10), 10, dec!(400000), dec!(9000));
        assert_eq!(points.len(), 10);
        assert!(points.iter().all(|p| p.value == Decimal::ZERO));
    }

    #[test]
    fn forecast_length_matches_years_ahead() {
        assert!(forecast_car_values(dec!(1), dec!(1), 0, dec!(0), dec!(9000)).is_empty());
        assert_eq!(
            forecast_car_values(dec!(1), dec!(1), 7, dec!(0), dec!(9000)).len(),
            7
        );
    }

    #[test]
    fn owned_car_has_no_finance() {
        let rows = calculate_forecast_rows(&car(OwnershipType::Owned));
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.finance == Decimal::ZERO));
        assert_eq!(rows[0].maintenance, dec!(1000));
        assert_eq!(rows[0].residual_value, dec!(17000));
        assert_eq!(rows[0].depreciation, dec!(3000));
        assert_eq!(rows[1].residual_value, dec!(14450));
        assert_eq!(rows[1].depreciation, dec!(2550));
        assert_eq!(rows[9].total_cost, dec!(10000));
    }

    #[test]
    fn hire_purchase_finance_runs_for_finance_years() {
        let rows = calculate_forecast_rows(&car(OwnershipType::Hp));
        let finance: Vec<_> = rows.iter().map(|r| r.finance).collect();
        assert_eq!(&finance[..4], &[dec!(2400), dec!(2400), dec!(2400), dec!(0)]);
        assert_eq!(rows[2].cost, dec!(3400));
    }

    #[test]
    fn pcp_balloon_lands_in_last_financed_year() {
        let mut inputs = car(OwnershipType::Pcp);
        inputs.costs.balloon_payment = "8000".to_string();
        let rows = calculate_forecast_rows(&inputs);
        assert_eq!(rows[0].finance, dec!(2400));
        assert_eq!(rows[1].finance, dec!(2400));
        assert_eq!(rows[2].finance, dec!(10400));
        assert_eq!(rows[3].finance, dec!(0));
    }

    #[test]
    fn lease_ignores_vehicle_value_and_finances_every_year() {
        let mut inputs = car(OwnershipType::Lease);
        inputs.current_value = None;
        inputs.current_age = None;
        inputs.current_mileage = Some("not a number".to_string());
        inputs.finance_years = "2".to_string();

        let rows = calculate_forecast_rows(&inputs);
        assert_eq!(rows.len(), 10);
        for row in &rows {
            assert_eq!(row.finance, dec!(2400));
            assert_eq!(row.residual_value, dec!(0));
            assert_eq!(row.depreciation, dec!(0));
        }
        assert_eq!(rows[9].total_cost, dec!(34000));
    }

    #[test]
    fn missing_vehicle_details_give_empty_forecast() {
        let mut missing = car(OwnershipType::Owned);
        missing.current_age = None;
        assert!(calculate_forecast_rows(&missing).is_empty());

        let mut blank = car(OwnershipType::Hp);
        blank.current_value = Some("".to_string());
        assert!(calculate_forecast_rows(&blank).is_empty());

        let mut garbage = car(OwnershipType::Pcp);
        garbage.current_mileage = Some("lots".to_string());
        assert!(calculate_forecast_rows(&garbage).is_empty());
    }

    #[test]
    fn one_off_only_in_first_year() {
        let mut inputs = car(OwnershipType::Owned);
        inputs.one_off = "1500".to_string();
        let rows = calculate_forecast_rows(&inputs);
        assert_eq!(rows[0].one_off, dec!(1500));
        assert_eq!(rows[0].cost, dec!(2500));
        assert!(rows[1..].iter().all(|r| r.one_off == Decimal::ZERO));
        assert_eq!(rows[9].total_cost, dec!(11500));
    }

    #[test]
    fn total_cost_is_running_sum() {
        let rows = calculate_forecast_rows(&car(OwnershipType::Hp));
        let mut running = Decimal::ZERO;
        for row in &rows {
            running += row.cost;
            assert_eq!(row.total_cost, running);
        }
        assert!(rows.windows(2).all(|w| w[1].total_cost >= w[0].total_cost));
    }

    #[test]
    fn default_annual_miles_when_mileage_missing() {
        let mut inputs = car(OwnershipType::Owned);
        inputs.costs.mileage = "".to_string();
        let rows = calculate_forecast_rows(&inputs);
        // 18,000 miles at age 2 is on the default 9,000/yr pace
        assert_eq!(rows[0].residual_value, dec!(17000));
    }

    #[test]
    fn forecast_is_restartable() {
        let inputs = car(OwnershipType::Pcp);
        assert_eq!(calculate_forecast_rows(&inputs), calculate_forecast_rows(&inputs));
    }

    #[test]
    fn deserializes_flat_json_car() {
        let inputs: CarForecastInputs = serde_json::from_str(
            r#"{
                "finance": 2400,
                "ownership": "PCP",
                "balloon_payment": "8000",
                "current_value": 20000,
                "current_age": "2",
                "finance_years": 3
            }"#,
        )
        .unwrap();
        assert_eq!(inputs.costs.ownership, OwnershipType::Pcp);
        assert_eq!(inputs.costs.finance, "2400");
        assert_eq!(inputs.current_value.as_deref(), Some("20000"));
        assert_eq!(inputs.current_mileage, None);
        assert_eq!(inputs.finance_years, "3");
    }
}
