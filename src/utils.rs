/// Serialize records as CSV with a header row taken from the first record
pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut count = 0usize;
    for record in records.into_iter() {
        wtr.serialize(record)?;
        count += 1;
    }
    wtr.flush()?;
    log::debug!("Wrote {} CSV records", count);
    Ok(())
}
