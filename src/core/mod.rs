pub mod car;
pub mod forecast;
pub mod input;
pub mod salary;
pub mod uk;

pub use car::{
    calculate_car_finance_breakdown, CarFinanceBreakdown, CarFinanceInputs, FuelType,
    MileageUnit, OwnershipType,
};
pub use forecast::{calculate_forecast_rows, CarForecastInputs, ForecastRow, FORECAST_YEARS};
pub use input::{FieldParser, Strict};
pub use salary::{calculate_breakdown, calculate_hicbc, Hicbc, SalaryBreakdown, SalaryOptions};
pub use uk::{TaxYear, TaxYearConfig};
