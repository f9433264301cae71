use super::Context;
use crate::die;

pub(crate) fn init_cmd(ctx: &Context) {
    let path = ctx.store.path().display();

    match ctx.store.init() {
        Ok(true) => println!("created model registry {}", path),
        Ok(false) => println!("model registry {} already exists, leaving it unchanged", path),
        Err(err) => die!("{}", err),
    }
}
