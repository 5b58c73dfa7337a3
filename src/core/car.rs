use super::input::{deserialize_raw, FieldParser, ParseOrZero};
use super::salary::MONTHS_PER_YEAR;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Litres in an imperial gallon, the gallon UK MPG figures use
pub const LITRES_PER_GALLON: Decimal = dec!(4.54609);
pub const PENCE_PER_POUND: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MileageUnit {
    #[serde(alias = "Month")]
    Month,
    /// Miles per year. Anything other than "month" is read as yearly.
    #[default]
    #[serde(other)]
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    /// Price in pence per litre, efficiency in miles per gallon
    #[default]
    Unleaded,
    /// Price in pence per kWh, efficiency in miles per kWh
    Electric,
    /// Unrecognised fuel, costs nothing
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum OwnershipType {
    #[serde(alias = "lease")]
    Lease,
    #[serde(rename = "PCP", alias = "pcp")]
    Pcp,
    #[serde(rename = "HP", alias = "hp")]
    Hp,
    /// Bought outright; also the fallback for unrecognised values
    #[default]
    #[serde(other)]
    Owned,
}

impl OwnershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipType::Lease => "Lease",
            OwnershipType::Pcp => "PCP",
            OwnershipType::Hp => "HP",
            OwnershipType::Owned => "Owned",
        }
    }
}

/// Running costs for one car as typed into the planner. Money fields are
/// yearly pounds; numeric fields stay raw text until resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CarFinanceInputs {
    /// Yearly finance or lease payments (£)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub finance: String,
    /// Yearly vehicle excise duty (£)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub road_tax: String,
    /// Yearly servicing and maintenance (£)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub servicing: String,
    /// Yearly insurance premium (£)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub insurance: String,
    /// Any other yearly cost (£)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub extra: String,
    /// Miles driven per `mileage_unit`
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub mileage: String,
    pub mileage_unit: MileageUnit,
    pub fuel_type: FuelType,
    /// Pence per litre (unleaded) or per kWh (electric)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub fuel_price: String,
    /// Miles per gallon (unleaded) or miles per kWh (electric)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub fuel_efficiency: String,
    pub ownership: OwnershipType,
    /// Optional final payment, PCP only (£)
    #[serde(deserialize_with = "deserialize_raw")]
    #[schemars(with = "String")]
    pub balloon_payment: String,
}

/// Resolved yearly costs for one car
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarCosts {
    pub finance: Decimal,
    pub road_tax: Decimal,
    pub servicing: Decimal,
    pub insurance: Decimal,
    pub extra: Decimal,
    pub yearly_mileage: Decimal,
    pub fuel_type: FuelType,
    pub fuel_price: Decimal,
    pub fuel_efficiency: Decimal,
    pub ownership: OwnershipType,
    pub balloon_payment: Decimal,
}

impl CarFinanceInputs {
    pub fn resolve<P: FieldParser>(&self, parser: &P) -> Result<CarCosts, P::Error> {
        let mileage = parser.parse("mileage", &self.mileage)?;
        let yearly_mileage = match self.mileage_unit {
            MileageUnit::Month => or_zero("yearly mileage", mileage.checked_mul(MONTHS_PER_YEAR)),
            MileageUnit::Year => mileage,
        };

        Ok(CarCosts {
            finance: parser.parse("finance", &self.finance)?,
            road_tax: parser.parse("road_tax", &self.road_tax)?,
            servicing: parser.parse("servicing", &self.servicing)?,
            insurance: parser.parse("insurance", &self.insurance)?,
            extra: parser.parse("extra", &self.extra)?,
            yearly_mileage,
            fuel_type: self.fuel_type,
            fuel_price: parser.parse("fuel_price", &self.fuel_price)?,
            fuel_efficiency: parser.parse("fuel_efficiency", &self.fuel_efficiency)?,
            ownership: self.ownership,
            balloon_payment: parser.parse("balloon_payment", &self.balloon_payment)?,
        })
    }

    /// Resolve with the permissive parse-or-zero policy
    pub fn resolve_or_zero(&self) -> CarCosts {
        match self.resolve(&ParseOrZero) {
            Ok(costs) => costs,
            Err(never) => match never {},
        }
    }
}

impl CarCosts {
    pub fn yearly_fuel_cost(&self) -> Decimal {
        if self.fuel_efficiency <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let cost = (|| {
            let price = self.fuel_price.checked_div(PENCE_PER_POUND)?;
            let units = self.yearly_mileage.checked_div(self.fuel_efficiency)?;
            match self.fuel_type {
                FuelType::Unleaded => units.checked_mul(LITRES_PER_GALLON)?.checked_mul(price),
                FuelType::Electric => units.checked_mul(price),
                FuelType::Unknown => Some(Decimal::ZERO),
            }
        })();
        or_zero("fuel", cost)
    }

    pub fn breakdown(&self) -> CarFinanceBreakdown {
        let fuel = self.yearly_fuel_cost();
        let total = or_zero(
            "total",
            checked_sum(&[
                self.finance,
                fuel,
                self.road_tax,
                self.servicing,
                self.insurance,
                self.extra,
            ]),
        );
        let balloon_payment = match self.ownership {
            OwnershipType::Pcp => Some(self.balloon_payment),
            _ => None,
        };

        CarFinanceBreakdown {
            finance: self.finance,
            fuel,
            road_tax: self.road_tax,
            servicing: self.servicing,
            insurance: self.insurance,
            extra: self.extra,
            balloon_payment,
            total,
        }
    }
}

/// Yearly cost of running a car. The balloon payment is reported but never
/// counted in `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CarFinanceBreakdown {
    pub finance: Decimal,
    pub fuel: Decimal,
    pub road_tax: Decimal,
    pub servicing: Decimal,
    pub insurance: Decimal,
    pub extra: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balloon_payment: Option<Decimal>,
    pub total: Decimal,
}

impl CarFinanceBreakdown {
    /// Everything except finance
    pub fn maintenance(&self) -> Decimal {
        or_zero(
            "maintenance",
            checked_sum(&[self.fuel, self.road_tax, self.servicing, self.insurance, self.extra]),
        )
    }

    pub fn monthly(&self) -> Decimal {
        self.total / MONTHS_PER_YEAR
    }

    pub fn over_years(&self, years: u32) -> Decimal {
        or_zero("multi-year total", self.total.checked_mul(Decimal::from(years)))
    }
}

/// Sum of amounts, `None` on overflow
pub fn checked_sum(amounts: &[Decimal]) -> Option<Decimal> {
    amounts
        .iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
}

/// An amount too large to represent counts as zero, the same as an
/// unparsable field.
pub fn or_zero(what: &str, amount: Option<Decimal>) -> Decimal {
    amount.unwrap_or_else(|| {
        log::warn!("{} overflows, counting it as zero", what);
        Decimal::ZERO
    })
}

#[allow(dead_code)]
pub fn calculate_yearly_fuel_cost(inputs: &CarFinanceInputs) -> Decimal {
    inputs.resolve_or_zero().yearly_fuel_cost()
}

pub fn calculate_car_finance_breakdown(inputs: &CarFinanceInputs) -> CarFinanceBreakdown {
    inputs.resolve_or_zero().breakdown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{InputError, Strict};

    fn petrol() -> CarFinanceInputs {
        CarFinanceInputs {
            finance: "3000".to_string(),
            road_tax: "190".to_string(),
            servicing: "250".to_string(),
            insurance: "600".to_string(),
            extra: "".to_string(),
            mileage: "12000".to_string(),
            mileage_unit: MileageUnit::Year,
            fuel_type: FuelType::Unleaded,
            fuel_price: "135".to_string(),
            fuel_efficiency: "40".to_string(),
            ownership: OwnershipType::Hp,
            balloon_payment: "".to_string(),
        }
    }

    #[test]
    fn unleaded_fuel_cost_uses_imperial_gallons() {
        assert_eq!(calculate_yearly_fuel_cost(&petrol()), dec!(1841.16645));
    }

    #[test]
    fn monthly_mileage_is_annualised() {
        let inputs = CarFinanceInputs {
            mileage: "1000".to_string(),
            mileage_unit: MileageUnit::Month,
            ..petrol()
        };
        assert_eq!(calculate_yearly_fuel_cost(&inputs), dec!(1841.16645));
    }

    #[test]
    fn electric_fuel_cost() {
        let inputs = CarFinanceInputs {
            mileage: "10000".to_string(),
            fuel_type: FuelType::Electric,
            fuel_price: "28".to_string(),
            fuel_efficiency: "4".to_string(),
            ..petrol()
        };
        assert_eq!(calculate_yearly_fuel_cost(&inputs), dec!(700));
    }

    #[test]
    fn zero_or_missing_efficiency_costs_nothing() {
        let zero = CarFinanceInputs {
            fuel_efficiency: "0".to_string(),
            ..petrol()
        };
        let missing = CarFinanceInputs {
            fuel_efficiency: "".to_string(),
            ..petrol()
        };
        assert_eq!(calculate_yearly_fuel_cost(&zero), dec!(0));
        assert_eq!(calculate_yearly_fuel_cost(&missing), dec!(0));
    }

    #[test]
    fn unknown_fuel_costs_nothing() {
        let inputs: CarFinanceInputs = serde_json::from_str(
            r#"{"mileage": "12000", "fuel_type": "diesel", "fuel_price": "150", "fuel_efficiency": "50"}"#,
        )
        .unwrap();
        assert_eq!(inputs.fuel_type, FuelType::Unknown);
        assert_eq!(calculate_yearly_fuel_cost(&inputs), dec!(0));
    }

    #[test]
    fn breakdown_totals_all_components() {
        let b = calculate_car_finance_breakdown(&petrol());
        assert_eq!(b.fuel, dec!(1841.16645));
        assert_eq!(b.total, dec!(3000) + dec!(1841.16645) + dec!(190) + dec!(250) + dec!(600));
        assert_eq!(b.maintenance(), b.total - b.finance);
        assert_eq!(b.balloon_payment, None);
    }

    #[test]
    fn invalid_fields_count_as_zero() {
        let inputs = CarFinanceInputs {
            finance: "lots".to_string(),
            insurance: "  ".to_string(),
            extra: "12x".to_string(),
            fuel_type: FuelType::Unknown,
            ..petrol()
        };
        let b = calculate_car_finance_breakdown(&inputs);
        assert_eq!(b.finance, dec!(0));
        assert_eq!(b.insurance, dec!(0));
        assert_eq!(b.extra, dec!(0));
        assert_eq!(b.total, dec!(440));
    }

    #[test]
    fn strict_resolution_reports_bad_field() {
        let inputs = CarFinanceInputs {
            servicing: "two hundred".to_string(),
            ..petrol()
        };
        assert_eq!(
            inputs.resolve(&Strict),
            Err(InputError::InvalidNumber {
                field: "servicing",
                value: "two hundred".to_string()
            })
        );
        assert!(petrol().resolve(&Strict).is_ok());
    }

    #[test]
    fn balloon_excluded_from_total_and_only_for_pcp() {
        let pcp = CarFinanceInputs {
            ownership: OwnershipType::Pcp,
            balloon_payment: "8000".to_string(),
            ..petrol()
        };
        let b = calculate_car_finance_breakdown(&pcp);
        assert_eq!(b.balloon_payment, Some(dec!(8000)));
        assert_eq!(b.total, calculate_car_finance_breakdown(&petrol()).total);

        let hp = CarFinanceInputs {
            balloon_payment: "8000".to_string(),
            ..petrol()
        };
        assert_eq!(calculate_car_finance_breakdown(&hp).balloon_payment, None);
    }

    #[test]
    fn monthly_and_multi_year_views() {
        let inputs = CarFinanceInputs {
            finance: "1200".to_string(),
            fuel_efficiency: "".to_string(),
            road_tax: "".to_string(),
            servicing: "".to_string(),
            insurance: "".to_string(),
            ..petrol()
        };
        let b = calculate_car_finance_breakdown(&inputs);
        assert_eq!(b.monthly(), dec!(100));
        assert_eq!(b.over_years(3), dec!(3600));
    }

    #[test]
    fn tiny_efficiency_overflow_counts_as_zero() {
        let inputs = CarFinanceInputs {
            mileage: "100000".to_string(),
            fuel_efficiency: "0.0000000000000000000000001".to_string(),
            ..petrol()
        };
        let b = calculate_car_finance_breakdown(&inputs);
        assert_eq!(b.fuel, dec!(0));
        assert_eq!(b.total, dec!(3000) + dec!(190) + dec!(250) + dec!(600));
        assert_eq!(calculate_yearly_fuel_cost(&inputs), dec!(0));
    }

    #[test]
    fn huge_total_overflow_counts_as_zero() {
        let inputs = CarFinanceInputs {
            finance: "79228162514264337593543950335".to_string(),
            road_tax: "1".to_string(),
            fuel_type: FuelType::Unknown,
            ..petrol()
        };
        let b = calculate_car_finance_breakdown(&inputs);
        assert_eq!(b.finance, Decimal::MAX);
        assert_eq!(b.total, dec!(0));
        assert_eq!(b.monthly(), dec!(0));
        assert_eq!(b.maintenance(), dec!(851));
        assert_eq!(b.over_years(10), dec!(0));
    }

    #[test]
    fn huge_monthly_mileage_counts_as_zero() {
        let inputs = CarFinanceInputs {
            mileage: "79228162514264337593543950335".to_string(),
            mileage_unit: MileageUnit::Month,
            ..petrol()
        };
        assert_eq!(inputs.resolve_or_zero().yearly_mileage, dec!(0));
    }

    #[test]
    fn ownership_names_round_trip_through_json() {
        let inputs: CarFinanceInputs =
            serde_json::from_str(r#"{"ownership": "PCP", "finance": 2400}"#).unwrap();
        assert_eq!(inputs.ownership, OwnershipType::Pcp);
        assert_eq!(inputs.finance, "2400");
        assert_eq!(OwnershipType::Pcp.as_str(), "PCP");
    }
}
