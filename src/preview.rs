use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, io_utils, mapping::Mapping, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let input = io_utils::read_table(&args.input, delimiter, encoding, args.skip_rows)?;

    let records = input.records();
    let shown = &records[..records.len().min(args.rows)];
    table::print_table(&input.headers, shown);

    let mut mapping = Mapping::default();
    mapping.guess(&input.headers);
    let describe = |column: &Option<String>| column.clone().unwrap_or_else(|| "-".to_string());
    println!();
    println!("code:        {}", describe(&mapping.code));
    println!("quantity:    {}", describe(&mapping.quantity));
    println!("description: {}", describe(&mapping.description));
    println!("revision:    {}", describe(&mapping.revision));
    println!("category:    {}", describe(&mapping.category));

    info!(
        "Displayed {} of {} row(s) from {:?}",
        shown.len(),
        input.len(),
        args.input
    );
    Ok(())
}
