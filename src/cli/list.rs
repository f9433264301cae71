use table::{IntoTable, Table};
mod table;

use super::Context;
use crate::die;
use crate::model::ModelDescriptor;
use crate::{ListArgs, ListingFormat};

impl From<Vec<ModelDescriptor>> for Table {
    fn from(value: Vec<ModelDescriptor>) -> Self {
        let mut tab = Table::new(["NAME", "MODEL", "BACKEND", "ENDPOINT"]);

        for model in value {
            let endpoint = model.endpoint().unwrap_or("-").to_string();

            tab.add_row([model.name, model.model, model.backend.to_string(), endpoint]);
        }

        tab
    }
}

pub(super) fn format_output<O: IntoTable + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize listing: {}", err),
        },
        ListingFormat::Table => {
            print!("{}", object.into_table());
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) fn list_cmd(ctx: &Context, args: &ListArgs) {
    let document = match ctx.store.load() {
        Ok(document) => document,
        Err(err) => die!("{}", err),
    };

    let models: Vec<ModelDescriptor> = document
        .models(args.category)
        .iter()
        .filter(|m| args.backend.map_or(true, |backend| m.backend == backend))
        .cloned()
        .collect();

    format_output(models, args.format);
}
