use super::{fail, Context};
use crate::color::Outcome;
use crate::registry::remove_model;
use crate::RemoveArgs;

pub(crate) fn remove_cmd(ctx: &Context, args: &RemoveArgs) {
    match remove_model(&ctx.store, args.category, &args.name) {
        Ok(1) => println!("{}  {}", Outcome::Removed.tag(), args.name),
        Ok(n) => println!(
            "{}  {} ({} entries)",
            Outcome::Removed.tag(),
            args.name,
            n
        ),
        Err(err) => fail(err),
    }
}
