use super::{fail, Context};
use crate::color::Outcome;
use crate::discovery::ModelSource;
use crate::registry::{self, SyncReport};
use crate::SyncArgs;

fn print_report(report: &SyncReport) {
    for name in &report.added {
        println!("{}  {}", Outcome::Added.tag(), name);
    }

    for name in &report.skipped {
        println!(
            "{}  {} (already registered)",
            Outcome::Skipped.tag(),
            name
        );
    }
}

pub(crate) async fn sync_cmd(ctx: &Context, args: &SyncArgs) {
    let ollama = ctx.ollama(args.url.as_deref());

    match registry::sync(&ctx.store, &ollama, args.category, args.overwrite).await {
        Ok(report) => {
            print_report(&report);

            println!(
                "{} new {} model(s) from {} written to {}",
                report.added.len(),
                args.category,
                ollama.location(),
                ctx.store.path().display()
            );
        }
        Err(err) => fail(err),
    }
}
