//! Schema command - print expected car input formats

use crate::cmd::car::{CarFile, CarRecord};
use clap::Args;
use schemars::schema_for;

/// One CSV column of an input record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the car input file
    JsonSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(CarFile);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => println!("{}", CarRecord::csv_header().join(",")),
            SchemaFormat::CsvFields => print_csv_fields(),
        }
        Ok(())
    }
}

fn print_csv_fields() {
    println!("Car CSV Input Format");
    println!("====================");
    println!();
    for field in CarRecord::csv_schema() {
        let req = if field.required { "required" } else { "optional" };
        println!("{:16} ({:8})  {}", field.name, req, field.description);
    }
    println!();
    println!("Numeric fields that are empty or not numbers count as zero unless --strict is given");
}
