use super::list::format_output;
use super::{fail, Context};
use crate::discovery::ModelSource;
use crate::registry;
use crate::DiscoverArgs;

pub(crate) async fn discover_cmd(ctx: &Context, args: &DiscoverArgs) {
    let ollama = ctx.ollama(args.url.as_deref());

    match ollama.list_models(args.category).await {
        Ok(models) => format_output(models, args.format),
        Err(source) => fail(registry::Error::Discovery {
            category: args.category,
            location: ollama.location().to_string(),
            source,
        }),
    }
}
